use log::debug;

/// Mutating actions on the working LP. Each action clears the downstream
/// status flags that it invalidates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LpAction {
    Transpose,
    Scale,
    Permute,
    Tighten,
    NewCosts,
    NewBounds,
    NewBasis,
    NewCols,
    NewRows,
    DelCols,
    DelRows,
    DelRowsBasisOk,
}

/// Lifecycle flags of the working LP and the data derived from it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Status {
    pub valid: bool,
    pub is_transposed: bool,
    pub is_scaled: bool,
    pub is_permuted: bool,
    pub is_tightened: bool,
    pub has_basis: bool,
    pub has_matrix_col_wise: bool,
    pub has_matrix_row_wise: bool,
    pub has_dual_steepest_edge_weights: bool,
    pub has_nonbasic_dual_values: bool,
    pub has_basic_primal_values: bool,
    pub has_invert: bool,
    pub has_fresh_invert: bool,
    pub has_fresh_rebuild: bool,
    pub has_dual_objective_value: bool,
}

impl Status {
    /// Clear everything derived from the working LP, keeping the transform
    /// flags.
    pub fn invalidate_data(&mut self) {
        self.has_basis = false;
        self.has_matrix_col_wise = false;
        self.has_matrix_row_wise = false;
        self.has_dual_steepest_edge_weights = false;
        self.has_nonbasic_dual_values = false;
        self.has_basic_primal_values = false;
        self.has_invert = false;
        self.has_fresh_invert = false;
        self.has_fresh_rebuild = false;
        self.has_dual_objective_value = false;
    }

    /// Clear the transform flags as well: the working LP itself is stale.
    pub fn invalidate(&mut self) {
        self.valid = false;
        self.is_transposed = false;
        self.is_scaled = false;
        self.is_permuted = false;
        self.is_tightened = false;
        self.invalidate_data();
    }

    /// Log the lifecycle flags.
    pub fn report(&self) {
        debug!("simplex lp status: {:?}", self);
    }

    /// Deduce the consequences of `action` on the flags.
    pub fn update(&mut self, action: LpAction) {
        debug!("lp action: {:?}", action);
        match action {
            LpAction::Transpose => {
                self.is_transposed = true;
                self.invalidate_data();
            }
            LpAction::Scale => {
                self.is_scaled = true;
                self.invalidate_data();
            }
            LpAction::Permute => {
                self.is_permuted = true;
                self.invalidate_data();
            }
            LpAction::Tighten => {
                self.is_tightened = true;
                self.invalidate_data();
            }
            LpAction::NewCosts => {
                self.has_nonbasic_dual_values = false;
                self.has_fresh_rebuild = false;
                self.has_dual_objective_value = false;
            }
            LpAction::NewBounds => {
                self.has_basic_primal_values = false;
                self.has_fresh_rebuild = false;
                self.has_dual_objective_value = false;
            }
            LpAction::NewBasis
            | LpAction::NewCols
            | LpAction::NewRows
            | LpAction::DelCols
            | LpAction::DelRows => {
                self.invalidate_data();
            }
            LpAction::DelRowsBasisOk => {}
        }
    }
}
