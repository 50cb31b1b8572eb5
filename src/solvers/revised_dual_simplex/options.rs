use crate::consts::{DUAL_FEASIBILITY_TOLERANCE, INF, PRIMAL_FEASIBILITY_TOLERANCE};

/// Configuration of the simplex core. Strategy codes are passed through to
/// the pricing loop untouched.
#[derive(Clone, Debug)]
pub struct Options {
    pub simplex_strategy: i32,
    pub simplex_crash_strategy: i32,
    pub simplex_dual_edge_weight_strategy: i32,
    pub simplex_price_strategy: i32,
    pub primal_feasibility_tolerance: f64,
    pub dual_feasibility_tolerance: f64,
    pub dual_objective_value_upper_bound: f64,
    pub simplex_perturb_costs: bool,
    pub simplex_iteration_limit: usize,
    pub simplex_update_limit: usize,
    /// Wall-clock budget in seconds.
    pub run_time_limit: f64,
    pub transpose_simplex_lp: bool,
    pub scale_simplex_lp: bool,
    pub permute_simplex_lp: bool,
    pub tighten_simplex_lp: bool,
    /// Rescale the costs after matrix scaling when the largest nonzero cost
    /// falls outside [1/16, 16].
    pub scale_costs: bool,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            simplex_strategy: 0,
            simplex_crash_strategy: 0,
            simplex_dual_edge_weight_strategy: 0,
            simplex_price_strategy: 0,
            primal_feasibility_tolerance: PRIMAL_FEASIBILITY_TOLERANCE,
            dual_feasibility_tolerance: DUAL_FEASIBILITY_TOLERANCE,
            dual_objective_value_upper_bound: INF,
            simplex_perturb_costs: true,
            simplex_iteration_limit: usize::MAX,
            simplex_update_limit: 5000,
            run_time_limit: INF,
            transpose_simplex_lp: false,
            scale_simplex_lp: true,
            permute_simplex_lp: false,
            tighten_simplex_lp: false,
            scale_costs: false,
        }
    }
}
