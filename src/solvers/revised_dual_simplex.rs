//! Dual revised simplex core: the model aggregate, its preparation
//! transforms and the pivot pipeline.
//!
//! The pricing loop drives this state machine from outside: it prepares the
//! LP, installs a basis, builds the factor, then per pivot calls
//! `update_pivots`, `update_factor` and `update_matrix`, periodically
//! recomputing primals, duals and the dual objective, and repairing dual
//! feasibility through `correct_dual`.

pub mod basis;
pub mod eta_matrices;
pub mod factor;
pub mod lu;
pub mod matrix;
pub mod options;
pub mod status;
pub mod timing;
pub mod transform;
pub mod work;

use log::{debug, error, warn};

use crate::consts::INF;
use crate::problem::Lp;
use crate::random::Random;
use crate::solution::SolutionStatus;
use crate::solver::Error;
use crate::sparse::ScatteredVec;

use self::basis::{Basis, MOVE_DOWN, MOVE_UP, MOVE_ZERO};
use self::factor::{Factor, RebuildReason};
use self::matrix::Matrix;
use self::options::Options;
use self::status::{LpAction, Status};
use self::timing::Clocks;
use self::transform::Scale;
use self::work::SimplexInfo;

/// The model aggregate: input and working LPs, scale, basis, work arrays,
/// status flags, random stream, matrix view and basis factor. Every core
/// operation takes the aggregate by exclusive reference.
#[derive(Debug)]
pub struct Model {
    /// The LP as given.
    pub lp: Lp,
    /// The LP the simplex works on, after transposition, scaling,
    /// permutation and tightening.
    pub simplex_lp: Lp,
    pub scale: Scale,
    pub basis: Basis,
    pub info: SimplexInfo,
    pub status: Status,
    pub random: Random,
    pub matrix: Matrix,
    pub factor: Factor,
    pub clocks: Clocks,
    pub solution_status: SolutionStatus,
}

impl Model {
    pub fn new(lp: Lp, options: &Options) -> Result<Model, Error> {
        lp.validate()?;
        let simplex_lp = lp.clone();
        let mut info = SimplexInfo::new(options);
        let mut random = Random::new();
        // The perturbation fractions must exist even when permutation is
        // disabled.
        info.initialise_random_vectors(&simplex_lp, &mut random);
        let scale = Scale::identity(simplex_lp.num_col, simplex_lp.num_row);
        let basis = Basis::new(simplex_lp.num_col, simplex_lp.num_row);
        let mut status = Status::default();
        status.valid = true;
        Ok(Model {
            lp,
            simplex_lp,
            scale,
            basis,
            info,
            status,
            random,
            matrix: Matrix::new(),
            factor: Factor::new(),
            clocks: Clocks::default(),
            solution_status: SolutionStatus::Unset,
        })
    }

    /// Run the enabled preparation transforms in their canonical order.
    pub fn prepare(&mut self) {
        if self.info.transpose_simplex_lp {
            self.transpose_simplex_lp();
        }
        if self.info.scale_simplex_lp {
            self.scale_simplex_lp();
        }
        if self.info.permute_simplex_lp {
            self.permute_simplex_lp();
        }
        if self.info.tighten_simplex_lp {
            self.tighten_simplex_lp();
        }
    }

    /// Install a basis if none is valid, set up the matrix copies and the
    /// factor arrays.
    pub fn setup_for_solve(&mut self) {
        if self.simplex_lp.num_row == 0 {
            return;
        }
        self.status.report();
        if self.basis.valid {
            self.setup_num_basic_logicals();
        } else {
            self.replace_with_logical_basis();
        }

        if !(self.status.has_matrix_col_wise && self.status.has_matrix_row_wise) {
            if self.info.num_basic_logicals == self.simplex_lp.num_row {
                self.matrix.setup_logical_basis(
                    self.simplex_lp.num_col,
                    self.simplex_lp.num_row,
                    &self.simplex_lp.a_start,
                    &self.simplex_lp.a_index,
                    &self.simplex_lp.a_value,
                );
            } else {
                self.matrix.setup(
                    self.simplex_lp.num_col,
                    self.simplex_lp.num_row,
                    &self.simplex_lp.a_start,
                    &self.simplex_lp.a_index,
                    &self.simplex_lp.a_value,
                    &self.basis.nonbasic_flag,
                );
            }
            self.status.has_matrix_col_wise = true;
            self.status.has_matrix_row_wise = true;
        }

        self.factor.setup(self.simplex_lp.num_row);
    }

    /// Install the logical basis, allocate and populate the work arrays.
    pub fn initialise_with_logical_basis(&mut self) {
        self.basis
            .set_logical(self.simplex_lp.num_col, self.simplex_lp.num_row);
        self.info.num_basic_logicals = self.simplex_lp.num_row;
        self.info.allocate_work_and_base_arrays(&self.simplex_lp);
        self.populate_work_arrays();
        self.status.update(LpAction::NewBasis);
        self.status.has_basis = true;
    }

    /// Replace whatever basis is installed by the logical basis.
    pub fn replace_with_logical_basis(&mut self) {
        self.initialise_with_logical_basis();
    }

    /// Replace the basis by the given basic variables, everything else
    /// nonbasic.
    pub fn replace_with_new_basis(&mut self, basic_index: &[usize]) {
        debug_assert_eq!(basic_index.len(), self.simplex_lp.num_row);
        for flag in self.basis.nonbasic_flag.iter_mut() {
            *flag = true;
        }
        self.info.num_basic_logicals = 0;
        for (row, &var) in basic_index.iter().enumerate() {
            if var >= self.simplex_lp.num_col {
                self.info.num_basic_logicals += 1;
            }
            self.basis.basic_index[row] = var;
            self.basis.nonbasic_flag[var] = false;
        }
        self.basis.valid = true;
        self.info.allocate_work_and_base_arrays(&self.simplex_lp);
        self.populate_work_arrays();
        self.status.update(LpAction::NewBasis);
        self.status.has_basis = true;
    }

    /// Rebuild `basic_index` from the nonbasic flags, then allocate and
    /// populate the work arrays.
    pub fn initialise_from_nonbasic(&mut self) {
        self.basis
            .initialise_basic_index(self.simplex_lp.num_col, self.simplex_lp.num_row);
        self.info.allocate_work_and_base_arrays(&self.simplex_lp);
        self.setup_num_basic_logicals();
        self.populate_work_arrays();
        self.status.update(LpAction::NewBasis);
        self.status.has_basis = true;
    }

    /// Rebuild `basic_index` from the nonbasic flags and repopulate the work
    /// arrays without reallocating.
    pub fn replace_from_nonbasic(&mut self) {
        self.basis
            .initialise_basic_index(self.simplex_lp.num_col, self.simplex_lp.num_row);
        self.setup_num_basic_logicals();
        self.populate_work_arrays();
        self.status.update(LpAction::NewBasis);
        self.status.has_basis = true;
    }

    fn populate_work_arrays(&mut self) {
        self.info.initialise_cost(&self.simplex_lp, false);
        self.info.initialise_bound(&self.simplex_lp, 2);
        self.initialise_value();
    }

    /// Reset value and move of every nonbasic variable from its bounds.
    pub fn initialise_value(&mut self) {
        if self.simplex_lp.num_tot() > 0 {
            self.info.initialise_value_from_nonbasic(
                &mut self.basis,
                0,
                self.simplex_lp.num_tot() - 1,
            );
        }
    }

    /// Extend the basis after columns were appended to the working LP: the
    /// new structurals come in nonbasic and the work arrays are resized.
    /// Downstream data is invalidated; populate before the next solve.
    pub fn append_nonbasic_cols_to_basis(&mut self, num_new_col: usize) {
        if num_new_col == 0 {
            return;
        }
        let old_num_col = self.simplex_lp.num_col - num_new_col;
        self.basis
            .append_nonbasic_cols(old_num_col, self.simplex_lp.num_row, num_new_col);
        self.info.allocate_work_and_base_arrays(&self.simplex_lp);
        self.status.update(LpAction::NewCols);
    }

    /// Extend the basis after rows were appended to the working LP: the new
    /// logicals come in basic and the work and base arrays are resized.
    pub fn append_basic_rows_to_basis(&mut self, num_new_row: usize) {
        if num_new_row == 0 {
            return;
        }
        let old_num_row = self.simplex_lp.num_row - num_new_row;
        self.basis
            .append_basic_rows(self.simplex_lp.num_col, old_num_row, num_new_row);
        self.info.num_basic_logicals += num_new_row;
        self.info.allocate_work_and_base_arrays(&self.simplex_lp);
        self.status.update(LpAction::NewRows);
    }

    /// Populate the costs for a solve phase, perturbing when enabled.
    pub fn initialise_cost(&mut self, perturb: bool) {
        self.info.initialise_cost(&self.simplex_lp, perturb);
    }

    /// Populate the bounds for the given phase.
    pub fn initialise_bound(&mut self, phase: i32) {
        self.info.initialise_bound(&self.simplex_lp, phase);
    }

    pub fn setup_num_basic_logicals(&mut self) {
        self.info.num_basic_logicals = self
            .basis
            .basic_index
            .iter()
            .filter(|&&var| var >= self.simplex_lp.num_col)
            .count();
    }

    /// Forget everything derived from the working LP.
    pub fn invalidate_simplex_lp_data(&mut self) {
        self.status.invalidate_data();
        self.basis.valid = false;
    }

    /// Forget the working LP entirely, transforms included.
    pub fn invalidate_simplex_lp(&mut self) {
        self.status.invalidate();
        self.basis.valid = false;
    }

    /// Abort between pivots once the iteration count or wall clock exceeds
    /// its limit. Work arrays stay internally consistent, so the partial
    /// state is safe to report as out of time.
    pub fn check_budget(&mut self) -> Result<(), Error> {
        let exhausted = self.info.iteration_count >= self.info.iteration_limit
            || (self.info.run_time_limit < INF
                && self.clocks.run_time() >= self.info.run_time_limit);
        if exhausted {
            self.solution_status = SolutionStatus::OutOfTime;
            return Err(Error::BudgetExhausted);
        }
        Ok(())
    }

    /// Early-exit test of the incrementally maintained dual objective
    /// against its configured upper bound.
    pub fn reached_dual_objective_value_upper_bound(&self) -> bool {
        self.info.updated_dual_objective_value > self.info.dual_objective_value_upper_bound
    }

    /// Σ work_value · work_dual over the nonbasic variables. Outside phase 1
    /// the result is unscaled and the LP offset removed.
    pub fn compute_dual_objective_value(&mut self, phase: i32) {
        let num_tot = self.simplex_lp.num_tot();
        let mut dual_objective_value = 0.0;
        for i in 0..num_tot {
            if self.basis.nonbasic_flag[i] {
                dual_objective_value += self.info.work_value[i] * self.info.work_dual[i];
            }
        }
        if phase != 1 {
            dual_objective_value *= self.scale.cost;
            dual_objective_value -= self.simplex_lp.offset;
        }
        self.info.dual_objective_value = dual_objective_value;
        self.status.has_dual_objective_value = true;
    }

    /// Objective value of the primal solution held in the work arrays.
    pub fn compute_primal_objective_function_value(&self) -> f64 {
        let mut value = 0.0;
        for row in 0..self.simplex_lp.num_row {
            let var = self.basis.basic_index[row];
            if var < self.simplex_lp.num_col {
                value += self.info.base_value[row] * self.simplex_lp.col_cost[var];
            }
        }
        for col in 0..self.simplex_lp.num_col {
            if self.basis.nonbasic_flag[col] {
                value += self.info.work_value[col] * self.simplex_lp.col_cost[col];
            }
        }
        value * self.scale.cost
    }

    /// Compute the values of the basic variables: FTRAN the accumulated
    /// nonbasic contributions and negate, then copy the bounds of each basic
    /// variable into the base arrays.
    pub fn compute_primal(&mut self) {
        let num_row = self.simplex_lp.num_row;
        let mut buffer = ScatteredVec::empty(num_row);
        for i in 0..self.simplex_lp.num_tot() {
            if self.basis.nonbasic_flag[i] && self.info.work_value[i] != 0.0 {
                self.matrix.collect_aj(&mut buffer, i, self.info.work_value[i]);
            }
        }
        self.factor.ftran(&mut buffer);

        for row in 0..num_row {
            let var = self.basis.basic_index[row];
            self.info.base_value[row] = -buffer.values[row];
            self.info.base_lower[row] = self.info.work_lower[var];
            self.info.base_upper[row] = self.info.work_upper[var];
        }
        self.status.has_basic_primal_values = true;
    }

    /// Compute the nonbasic duals: BTRAN the basic costs (shifts included)
    /// into π, then price the structural columns and read the logicals off π.
    pub fn compute_dual(&mut self) {
        let num_col = self.simplex_lp.num_col;
        let num_row = self.simplex_lp.num_row;

        let mut pi = ScatteredVec::empty(num_row);
        for row in 0..num_row {
            let var = self.basis.basic_index[row];
            let value = self.info.work_cost[var] + self.info.work_shift[var];
            if value != 0.0 {
                *pi.get_mut(row) = value;
            }
        }
        self.factor.btran(&mut pi);

        let mut price = vec![0.0; num_col];
        self.matrix.price_by_col(&mut price, &pi);
        for col in 0..num_col {
            self.info.work_dual[col] = self.info.work_cost[col] - price[col];
        }
        for row in 0..num_row {
            let var = num_col + row;
            self.info.work_dual[var] = self.info.work_cost[var] - pi.values[row];
        }
        self.status.has_nonbasic_dual_values = true;
    }

    /// Repair dual infeasibilities of nonbasic variables: flip boxed
    /// variables to their other bound, shift the cost of one-sided variables
    /// to a feasible dual of ±(1 + u)·τ_d. Free variables cannot be repaired
    /// here; their count is returned for the pricing loop to handle.
    pub fn correct_dual(&mut self) -> usize {
        let tau_d = self.info.dual_feasibility_tolerance;
        let num_tot = self.simplex_lp.num_tot();
        let mut free_infeasibility_count = 0;
        for i in 0..num_tot {
            if !self.basis.nonbasic_flag[i] {
                continue;
            }
            if self.info.work_lower[i] <= -INF && self.info.work_upper[i] >= INF {
                if self.info.work_dual[i].abs() >= tau_d {
                    free_infeasibility_count += 1;
                }
            } else if self.basis.nonbasic_move[i] as f64 * self.info.work_dual[i] <= -tau_d {
                if self.info.work_lower[i] > -INF && self.info.work_upper[i] < INF {
                    self.flip_bound(i);
                } else {
                    let dual = if self.basis.nonbasic_move[i] == MOVE_UP {
                        (1.0 + self.random.fraction()) * tau_d
                    } else {
                        -(1.0 + self.random.fraction()) * tau_d
                    };
                    let shift = dual - self.info.work_dual[i];
                    self.shift_cost(i, shift);
                    self.info.work_dual[i] = dual;
                }
            }
        }
        free_infeasibility_count
    }

    /// Dual infeasibility count as the dual simplex sees it: boxed variables
    /// are flippable, so only one-sided and free variables contribute.
    pub fn compute_dual_infeasible_in_dual(&self) -> usize {
        let tau_d = self.info.dual_feasibility_tolerance;
        let mut count = 0;
        for i in 0..self.simplex_lp.num_tot() {
            if !self.basis.nonbasic_flag[i] {
                continue;
            }
            let free_lower = self.info.work_lower[i] <= -INF;
            let free_upper = self.info.work_upper[i] >= INF;
            if free_lower && free_upper {
                count += (self.info.work_dual[i].abs() >= tau_d) as usize;
            }
            if free_lower || free_upper {
                count += (self.basis.nonbasic_move[i] as f64 * self.info.work_dual[i] <= -tau_d)
                    as usize;
            }
        }
        count
    }

    /// Dual infeasibility count as the primal simplex sees it: no flips
    /// assumed, every nonbasic variable contributes.
    pub fn compute_dual_infeasible_in_primal(&self) -> usize {
        let tau_d = self.info.dual_feasibility_tolerance;
        let mut count = 0;
        for i in 0..self.simplex_lp.num_tot() {
            if !self.basis.nonbasic_flag[i] {
                continue;
            }
            if self.info.work_lower[i] <= -INF && self.info.work_upper[i] >= INF {
                count += (self.info.work_dual[i].abs() >= tau_d) as usize;
            }
            count +=
                (self.basis.nonbasic_move[i] as f64 * self.info.work_dual[i] <= -tau_d) as usize;
        }
        count
    }

    /// Refactorize the basis. Returns the rank deficiency reported by the
    /// factor; recovery is left to the caller.
    pub fn compute_factor(&mut self) -> usize {
        let _clock = self.clocks.invert.start();
        let rank_deficiency = self.factor.build(&self.matrix, &self.basis.basic_index);
        if rank_deficiency > 0 {
            error!("INVERT has rank deficiency {}", rank_deficiency);
        }
        self.info.update_count = 0;
        self.status.has_invert = true;
        self.status.has_fresh_invert = true;
        rank_deficiency
    }

    /// Move a nonbasic boxed variable to its other bound.
    pub fn flip_bound(&mut self, var: usize) {
        let mv = -self.basis.nonbasic_move[var];
        self.basis.nonbasic_move[var] = mv;
        self.info.work_value[var] = if mv == MOVE_UP {
            self.info.work_lower[var]
        } else {
            self.info.work_upper[var]
        };
    }

    /// Record a cost shift for a column. The column must not already carry a
    /// shift.
    pub fn shift_cost(&mut self, var: usize, amount: f64) {
        self.info.costs_perturbed = true;
        debug_assert!(self.info.work_shift[var] == 0.0);
        self.info.work_shift[var] = amount;
    }

    /// Undo the cost shift of a column, restoring its dual.
    pub fn shift_back(&mut self, var: usize) {
        self.info.work_dual[var] -= self.info.work_shift[var];
        self.info.work_shift[var] = 0.0;
    }

    /// Which bound the leaving variable should move to: -1 for its lower
    /// bound, +1 for its upper bound, 0 if fixed.
    pub fn set_source_out_from_bound(&self, column_out: usize) -> i8 {
        let mut source_out = 0;
        if self.info.work_lower[column_out] != self.info.work_upper[column_out] {
            if self.info.work_lower[column_out] > -INF {
                source_out = -1;
            } else {
                source_out = 1;
                if self.info.work_upper[column_out] >= INF {
                    warn!("free variable {} is leaving the basis", column_out);
                }
            }
        }
        source_out
    }

    /// Exchange the basis for a pivot: `column_in` becomes basic in
    /// `row_out`, the variable previously there leaves to the bound selected
    /// by `source_out`.
    ///
    /// The incremental dual objective uses the leaver's new value against its
    /// current dual, so callers must not touch `work_value[column_out]`
    /// before this.
    pub fn update_pivots(&mut self, column_in: usize, row_out: usize, source_out: i8) {
        let _clock = self.clocks.update_pivots.start();
        let column_out = self.basis.basic_index[row_out];

        // Incoming variable
        self.basis.basic_index[row_out] = column_in;
        self.basis.nonbasic_flag[column_in] = false;
        self.basis.nonbasic_move[column_in] = MOVE_ZERO;
        self.info.base_lower[row_out] = self.info.work_lower[column_in];
        self.info.base_upper[row_out] = self.info.work_upper[column_in];

        // Outgoing variable
        self.basis.nonbasic_flag[column_out] = true;
        if self.info.work_lower[column_out] == self.info.work_upper[column_out] {
            self.info.work_value[column_out] = self.info.work_lower[column_out];
            self.basis.nonbasic_move[column_out] = MOVE_ZERO;
        } else if source_out == -1 {
            self.info.work_value[column_out] = self.info.work_lower[column_out];
            self.basis.nonbasic_move[column_out] = MOVE_UP;
        } else {
            self.info.work_value[column_out] = self.info.work_upper[column_out];
            self.basis.nonbasic_move[column_out] = MOVE_DOWN;
        }
        let new_value = self.info.work_value[column_out];
        let dual = self.info.work_dual[column_out];
        self.info.updated_dual_objective_value += new_value * dual;

        self.info.update_count += 1;
        self.info.iteration_count += 1;
        if column_out >= self.simplex_lp.num_col {
            self.info.num_basic_logicals -= 1;
        }
        if column_in >= self.simplex_lp.num_col {
            self.info.num_basic_logicals += 1;
        }

        // No longer have a representation of B⁻¹, and certainly not fresh.
        self.status.has_invert = false;
        self.status.has_fresh_invert = false;
        self.status.has_fresh_rebuild = false;
    }

    /// Absorb the pivot into the factor. Returns a rebuild hint once the
    /// update limit is reached.
    pub fn update_factor(
        &mut self,
        column: &ScatteredVec,
        row_ep: &ScatteredVec,
        row_out: usize,
    ) -> Option<RebuildReason> {
        let _clock = self.clocks.update_factor.start();
        self.factor.update(column, row_ep, row_out);
        // B⁻¹ is represented again, but not freshly.
        self.status.has_invert = true;
        if self.info.update_count >= self.info.update_limit {
            debug!(
                "update count {} reached the update limit",
                self.info.update_count
            );
            Some(RebuildReason::UpdateLimitReached)
        } else {
            None
        }
    }

    /// Re-partition the row-wise matrix for the basis swap.
    pub fn update_matrix(&mut self, column_in: usize, column_out: usize) {
        let _clock = self.clocks.update_matrix.start();
        self.matrix.update(column_in, column_out);
    }

    // Structural self-checks. Failures are logged and reported as false;
    // callers decide whether to abort with `Failed`.

    /// Work arrays agree with the LP bounds and costs. Phase 1 bounds and
    /// perturbed costs are set by the solve and trusted.
    pub fn work_arrays_ok(&self, phase: i32) -> bool {
        let lp = &self.simplex_lp;
        if phase == 2 {
            for col in 0..lp.num_col {
                if self.info.work_lower[col] > -INF
                    && self.info.work_lower[col] != lp.col_lower[col]
                {
                    error!(
                        "work_lower for col {} should be {} but is {}",
                        col, lp.col_lower[col], self.info.work_lower[col]
                    );
                    return false;
                }
                if self.info.work_upper[col] < INF
                    && self.info.work_upper[col] != lp.col_upper[col]
                {
                    error!(
                        "work_upper for col {} should be {} but is {}",
                        col, lp.col_upper[col], self.info.work_upper[col]
                    );
                    return false;
                }
            }
            for row in 0..lp.num_row {
                let var = lp.num_col + row;
                if self.info.work_lower[var] > -INF
                    && self.info.work_lower[var] != -lp.row_upper[row]
                {
                    error!(
                        "work_lower for row {} should be {} but is {}",
                        row, -lp.row_upper[row], self.info.work_lower[var]
                    );
                    return false;
                }
                if self.info.work_upper[var] < INF
                    && self.info.work_upper[var] != -lp.row_lower[row]
                {
                    error!(
                        "work_upper for row {} should be {} but is {}",
                        row, -lp.row_lower[row], self.info.work_upper[var]
                    );
                    return false;
                }
            }
        }
        for var in 0..lp.num_tot() {
            if self.info.work_range[var]
                != self.info.work_upper[var] - self.info.work_lower[var]
            {
                error!(
                    "work_range for variable {} should be {} but is {}",
                    var,
                    self.info.work_upper[var] - self.info.work_lower[var],
                    self.info.work_range[var]
                );
                return false;
            }
        }
        if !self.info.costs_perturbed {
            for col in 0..lp.num_col {
                if self.info.work_cost[col] != lp.sense.sign() * lp.col_cost[col] {
                    error!(
                        "work_cost for col {} should be {} but is {}",
                        col,
                        lp.sense.sign() * lp.col_cost[col],
                        self.info.work_cost[col]
                    );
                    return false;
                }
            }
            for row in 0..lp.num_row {
                let var = lp.num_col + row;
                if self.info.work_cost[var] != 0.0 {
                    error!(
                        "work_cost for row {} should be zero but is {}",
                        row, self.info.work_cost[var]
                    );
                    return false;
                }
            }
        }
        true
    }

    /// The bound/move/value contract for one nonbasic variable.
    pub fn one_nonbasic_move_vs_work_arrays_ok(&self, var: usize) -> bool {
        if !self.basis.nonbasic_flag[var] {
            return true;
        }
        let lower = self.info.work_lower[var];
        let upper = self.info.work_upper[var];
        let value = self.info.work_value[var];
        let mv = self.basis.nonbasic_move[var];
        if lower > -INF {
            if upper < INF {
                if lower == upper {
                    if mv != MOVE_ZERO {
                        error!("fixed variable {} has move {}", var, mv);
                        return false;
                    }
                    if value != lower {
                        error!("fixed variable {} has value {} not {}", var, value, lower);
                        return false;
                    }
                } else {
                    if mv != MOVE_UP && mv != MOVE_DOWN {
                        error!("boxed variable {} has move {}", var, mv);
                        return false;
                    }
                    let expected = if mv == MOVE_UP { lower } else { upper };
                    if value != expected {
                        error!(
                            "boxed variable {} with move {} has value {} not {}",
                            var, mv, value, expected
                        );
                        return false;
                    }
                }
            } else {
                if mv != MOVE_UP {
                    error!("lower-bounded variable {} has move {}", var, mv);
                    return false;
                }
                if value != lower {
                    error!(
                        "lower-bounded variable {} has value {} not {}",
                        var, value, lower
                    );
                    return false;
                }
            }
        } else if upper < INF {
            if mv != MOVE_DOWN {
                error!("upper-bounded variable {} has move {}", var, mv);
                return false;
            }
            if value != upper {
                error!(
                    "upper-bounded variable {} has value {} not {}",
                    var, value, upper
                );
                return false;
            }
        } else {
            if mv != MOVE_ZERO {
                error!("free variable {} has move {}", var, mv);
                return false;
            }
            if value != 0.0 {
                error!("free variable {} has value {}", var, value);
                return false;
            }
        }
        true
    }

    /// The bound/move/value contract for every nonbasic variable.
    pub fn all_nonbasic_move_vs_work_arrays_ok(&self) -> bool {
        for var in 0..self.simplex_lp.num_tot() {
            if !self.basis.nonbasic_flag[var] {
                continue;
            }
            if !self.one_nonbasic_move_vs_work_arrays_ok(var) {
                error!("move/value contract broken for nonbasic variable {}", var);
                return false;
            }
        }
        true
    }

    /// Level 0 trusts the flags; level 1 adds the basis partition, work
    /// array and move/value checks.
    pub fn ok_to_solve(&self, level: i32, phase: i32) -> bool {
        let ok = self.basis.valid
            && self.status.has_matrix_col_wise
            && self.status.has_matrix_row_wise
            && self.status.has_invert;
        if !ok {
            if !self.basis.valid {
                error!("not ok to solve: no valid basis");
            }
            if !self.status.has_matrix_col_wise {
                error!("not ok to solve: no column-wise matrix");
            }
            if !self.status.has_matrix_row_wise {
                error!("not ok to solve: no row-wise matrix");
            }
            if !self.status.has_invert {
                error!("not ok to solve: no basis inverse");
            }
            return false;
        }
        if level <= 0 {
            return true;
        }
        if !self
            .basis
            .nonbasic_flag_basic_index_ok(self.simplex_lp.num_col, self.simplex_lp.num_row)
        {
            error!("error in nonbasic_flag and basic_index");
            return false;
        }
        if !self.work_arrays_ok(phase) {
            error!("error in work arrays");
            return false;
        }
        if !self.all_nonbasic_move_vs_work_arrays_ok() {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::INF;
    use crate::problem::{ComparisonOp, ObjSense, Problem};

    fn boxed_lp() -> Lp {
        // min x1 + x2  s.t.  x1 + x2 >= 1,  0 <= x <= 1
        let mut problem = Problem::new(ObjSense::Minimise).with_name("boxed");
        let x1 = problem.add_var(1.0, (0.0, 1.0));
        let x2 = problem.add_var(1.0, (0.0, 1.0));
        problem.add_constraint([(x1, 1.0), (x2, 1.0)], ComparisonOp::Ge, 1.0);
        problem.build()
    }

    fn ready_model(lp: Lp) -> Model {
        let mut model = Model::new(lp, &Options::default()).unwrap();
        model.setup_for_solve();
        let deficiency = model.compute_factor();
        assert_eq!(deficiency, 0);
        model
    }

    #[test]
    fn setup_installs_a_consistent_logical_basis() {
        let model = ready_model(boxed_lp());
        assert!(model.status.has_basis);
        assert!(model.status.has_invert);
        assert!(model.status.has_fresh_invert);
        assert_eq!(model.info.num_basic_logicals, 1);
        assert!(model.ok_to_solve(1, 2));
    }

    #[test]
    fn compute_dual_prices_the_logical_basis() {
        let mut model = ready_model(boxed_lp());
        model.compute_dual();
        // Logical basis: pi = 0, duals are the costs.
        assert_eq!(model.info.work_dual[0], 1.0);
        assert_eq!(model.info.work_dual[1], 1.0);
        assert_eq!(model.info.work_dual[2], 0.0);
        assert!(model.status.has_nonbasic_dual_values);
    }

    #[test]
    fn compute_primal_accumulates_nonbasic_values() {
        let mut model = ready_model(boxed_lp());
        // Move x1 to its upper bound: row activity 1, slack variable -1.
        model.flip_bound(0);
        model.compute_primal();
        assert_eq!(model.info.base_value[0], -1.0);
        assert_eq!(model.info.base_lower[0], -INF);
        assert_eq!(model.info.base_upper[0], -1.0);
        assert!(model.status.has_basic_primal_values);
    }

    #[test]
    fn update_pivots_accounts_the_exchange() {
        let mut model = ready_model(boxed_lp());
        model.compute_dual();
        model.info.work_dual[2] = 0.5;
        let updated_before = model.info.updated_dual_objective_value;

        // Structural 0 enters, the logical of row 0 leaves to its upper
        // bound (the row is Ge, so the logical has bounds (-inf, -1]).
        let column_out = model.basis.basic_index[0];
        assert_eq!(column_out, 2);
        let source_out = model.set_source_out_from_bound(column_out);
        assert_eq!(source_out, 1);
        model.update_pivots(0, 0, source_out);

        assert_eq!(model.basis.basic_index[0], 0);
        assert!(!model.basis.nonbasic_flag[0]);
        assert!(model.basis.nonbasic_flag[2]);
        assert_eq!(model.basis.nonbasic_move[2], MOVE_DOWN);
        assert_eq!(model.info.work_value[2], -1.0);
        assert_eq!(model.info.num_basic_logicals, 0);
        assert_eq!(model.info.update_count, 1);
        assert!(!model.status.has_invert);
        assert!(!model.status.has_fresh_invert);
        assert!(!model.status.has_fresh_rebuild);

        // The incremental objective moved by value_new * dual_old.
        let expected = model.info.work_value[2] * model.info.work_dual[2];
        assert_eq!(
            model.info.updated_dual_objective_value - updated_before,
            expected
        );
    }

    #[test]
    fn update_factor_hints_at_the_update_limit() {
        let lp = boxed_lp();
        let mut options = Options::default();
        options.simplex_update_limit = 1;
        let mut model = Model::new(lp, &options).unwrap();
        model.setup_for_solve();
        model.compute_factor();
        model.compute_dual();

        let mut column = ScatteredVec::empty(1);
        model.matrix.collect_aj(&mut column, 0, 1.0);
        model.factor.ftran(&mut column);

        let source_out = model.set_source_out_from_bound(2);
        model.update_pivots(0, 0, source_out);
        let hint = model.update_factor(&column, &ScatteredVec::empty(1), 0);
        assert_eq!(hint, Some(RebuildReason::UpdateLimitReached));
        assert!(model.status.has_invert);
        assert!(!model.status.has_fresh_invert);
        model.update_matrix(0, 2);
    }

    #[test]
    fn shift_cost_and_back_are_inverse() {
        let mut model = ready_model(boxed_lp());
        model.compute_dual();
        let dual_before = model.info.work_dual[0];
        model.shift_cost(0, 0.25);
        model.info.work_dual[0] += 0.25;
        model.shift_back(0);
        assert_eq!(model.info.work_dual[0], dual_before);
        assert_eq!(model.info.work_shift[0], 0.0);
        assert!(model.info.costs_perturbed);
    }

    #[test]
    fn budget_is_enforced_between_pivots() {
        let lp = boxed_lp();
        let mut options = Options::default();
        options.simplex_iteration_limit = 0;
        let mut model = Model::new(lp, &options).unwrap();
        assert_eq!(model.check_budget(), Err(Error::BudgetExhausted));
        assert_eq!(model.solution_status, SolutionStatus::OutOfTime);
        assert!(!model.reached_dual_objective_value_upper_bound());
    }

    #[test]
    fn invalidate_then_reinstall_matches_fresh_model() {
        let mut model = ready_model(boxed_lp());
        model.compute_dual();
        model.invalidate_simplex_lp();
        model.setup_for_solve();
        model.compute_factor();

        let fresh = ready_model(boxed_lp());
        assert_eq!(model.basis, fresh.basis);
        assert_eq!(model.info.work_value, fresh.info.work_value);
        assert_eq!(model.info.work_cost, fresh.info.work_cost);
        assert_eq!(model.info.work_lower, fresh.info.work_lower);
        assert_eq!(model.info.work_upper, fresh.info.work_upper);
        assert_eq!(model.info.num_basic_logicals, fresh.info.num_basic_logicals);
    }

    #[test]
    fn validation_passes_on_a_fresh_setup() {
        let model = ready_model(boxed_lp());
        assert!(model.work_arrays_ok(2));
        assert!(model.all_nonbasic_move_vs_work_arrays_ok());
        assert!(model
            .basis
            .nonbasic_flag_basic_index_ok(model.simplex_lp.num_col, model.simplex_lp.num_row));
    }
}
