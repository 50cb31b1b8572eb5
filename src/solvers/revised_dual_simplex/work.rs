use crate::consts::INF;
use crate::problem::Lp;
use crate::random::Random;

use super::basis::{Basis, MOVE_DOWN, MOVE_UP, MOVE_ZERO};
use super::options::Options;

/// Work arrays, counters and copied configuration of the simplex state.
///
/// All `work_*` arrays have length n + m, the `base_*` arrays length m.
/// For a nonbasic variable, `work_value` and `nonbasic_move` satisfy the
/// bound contract enforced by `initialise_value_from_nonbasic`; for a basic
/// variable the move is zero and `work_value` holds the primal value last
/// seen when it went basic.
#[derive(Clone, Debug)]
pub struct SimplexInfo {
    pub work_cost: Vec<f64>,
    pub work_dual: Vec<f64>,
    pub work_shift: Vec<f64>,
    pub work_lower: Vec<f64>,
    pub work_upper: Vec<f64>,
    pub work_range: Vec<f64>,
    pub work_value: Vec<f64>,

    pub base_lower: Vec<f64>,
    pub base_upper: Vec<f64>,
    pub base_value: Vec<f64>,

    pub num_col_permutation: Vec<usize>,
    pub num_tot_permutation: Vec<usize>,
    pub num_tot_random_value: Vec<f64>,

    pub num_basic_logicals: usize,
    pub iteration_count: usize,
    pub update_count: usize,
    pub dual_objective_value: f64,
    pub updated_dual_objective_value: f64,
    pub costs_perturbed: bool,

    // Configuration copied from Options.
    pub simplex_strategy: i32,
    pub crash_strategy: i32,
    pub dual_edge_weight_strategy: i32,
    pub price_strategy: i32,
    pub primal_feasibility_tolerance: f64,
    pub dual_feasibility_tolerance: f64,
    pub dual_objective_value_upper_bound: f64,
    pub perturb_costs: bool,
    pub iteration_limit: usize,
    pub update_limit: usize,
    pub run_time_limit: f64,
    pub transpose_simplex_lp: bool,
    pub scale_simplex_lp: bool,
    pub permute_simplex_lp: bool,
    pub tighten_simplex_lp: bool,
    pub scale_costs: bool,
}

impl SimplexInfo {
    pub fn new(options: &Options) -> SimplexInfo {
        SimplexInfo {
            work_cost: vec![],
            work_dual: vec![],
            work_shift: vec![],
            work_lower: vec![],
            work_upper: vec![],
            work_range: vec![],
            work_value: vec![],
            base_lower: vec![],
            base_upper: vec![],
            base_value: vec![],
            num_col_permutation: vec![],
            num_tot_permutation: vec![],
            num_tot_random_value: vec![],
            num_basic_logicals: 0,
            iteration_count: 0,
            update_count: 0,
            dual_objective_value: 0.0,
            updated_dual_objective_value: 0.0,
            costs_perturbed: false,
            simplex_strategy: options.simplex_strategy,
            crash_strategy: options.simplex_crash_strategy,
            dual_edge_weight_strategy: options.simplex_dual_edge_weight_strategy,
            price_strategy: options.simplex_price_strategy,
            primal_feasibility_tolerance: options.primal_feasibility_tolerance,
            dual_feasibility_tolerance: options.dual_feasibility_tolerance,
            dual_objective_value_upper_bound: options.dual_objective_value_upper_bound,
            perturb_costs: options.simplex_perturb_costs,
            iteration_limit: options.simplex_iteration_limit,
            update_limit: options.simplex_update_limit,
            run_time_limit: options.run_time_limit,
            transpose_simplex_lp: options.transpose_simplex_lp,
            scale_simplex_lp: options.scale_simplex_lp,
            permute_simplex_lp: options.permute_simplex_lp,
            tighten_simplex_lp: options.tighten_simplex_lp,
            scale_costs: options.scale_costs,
        }
    }

    pub fn allocate_work_and_base_arrays(&mut self, lp: &Lp) {
        let num_tot = lp.num_tot();
        self.work_cost.resize(num_tot, 0.0);
        self.work_dual.resize(num_tot, 0.0);
        self.work_shift.resize(num_tot, 0.0);
        self.work_lower.resize(num_tot, 0.0);
        self.work_upper.resize(num_tot, 0.0);
        self.work_range.resize(num_tot, 0.0);
        self.work_value.resize(num_tot, 0.0);
        self.base_lower.resize(lp.num_row, 0.0);
        self.base_upper.resize(lp.num_row, 0.0);
        self.base_value.resize(lp.num_row, 0.0);
    }

    /// Generate the column permutation, the full permutation and the random
    /// fractions, restarting the generator so runs are bit-reproducible. The
    /// generator is reinitialised between the two permutations so the full
    /// permutation and fractions never depend on the column count draw.
    pub fn initialise_random_vectors(&mut self, lp: &Lp, random: &mut Random) {
        let num_col = lp.num_col;
        let num_tot = lp.num_tot();

        random.reinitialise();
        self.num_col_permutation = (0..num_col).collect();
        for i in (1..num_col).rev() {
            let j = random.integer() % (i + 1);
            self.num_col_permutation.swap(i, j);
        }

        random.reinitialise();
        self.num_tot_permutation = (0..num_tot).collect();
        for i in (1..num_tot).rev() {
            let j = random.integer() % (i + 1);
            self.num_tot_permutation.swap(i, j);
        }

        self.num_tot_random_value = (0..num_tot).map(|_| random.fraction()).collect();
    }

    pub fn initialise_phase2_col_bound(&mut self, lp: &Lp, first_col: usize, last_col: usize) {
        for col in first_col..=last_col {
            self.work_lower[col] = lp.col_lower[col];
            self.work_upper[col] = lp.col_upper[col];
            self.work_range[col] = self.work_upper[col] - self.work_lower[col];
        }
    }

    pub fn initialise_phase2_row_bound(&mut self, lp: &Lp, first_row: usize, last_row: usize) {
        for row in first_row..=last_row {
            let var = lp.num_col + row;
            self.work_lower[var] = -lp.row_upper[row];
            self.work_upper[var] = -lp.row_lower[row];
            self.work_range[var] = self.work_upper[var] - self.work_lower[var];
        }
    }

    /// Populate bounds. Phase 2 copies the LP bounds (rows negated into the
    /// logical block); phase 1 replaces them with the dual-phase-1 bounds.
    pub fn initialise_bound(&mut self, lp: &Lp, phase: i32) {
        if lp.num_col > 0 {
            self.initialise_phase2_col_bound(lp, 0, lp.num_col - 1);
        }
        if lp.num_row > 0 {
            self.initialise_phase2_row_bound(lp, 0, lp.num_row - 1);
        }
        if phase == 2 {
            return;
        }

        for i in 0..lp.num_tot() {
            if self.work_lower[i] <= -INF && self.work_upper[i] >= INF {
                // Free logicals never leave the basis, so keep their bounds.
                if i >= lp.num_col {
                    continue;
                }
                self.work_lower[i] = -1000.0;
                self.work_upper[i] = 1000.0;
            } else if self.work_lower[i] <= -INF {
                self.work_lower[i] = -1.0;
                self.work_upper[i] = 0.0;
            } else if self.work_upper[i] >= INF {
                self.work_lower[i] = 0.0;
                self.work_upper[i] = 1.0;
            } else {
                self.work_lower[i] = 0.0;
                self.work_upper[i] = 0.0;
            }
            self.work_range[i] = self.work_upper[i] - self.work_lower[i];
        }
    }

    pub fn initialise_phase2_col_cost(&mut self, lp: &Lp, first_col: usize, last_col: usize) {
        for col in first_col..=last_col {
            self.work_cost[col] = lp.sense.sign() * lp.col_cost[col];
            self.work_shift[col] = 0.0;
        }
    }

    pub fn initialise_phase2_row_cost(&mut self, lp: &Lp, first_row: usize, last_row: usize) {
        for row in first_row..=last_row {
            let var = lp.num_col + row;
            self.work_cost[var] = 0.0;
            self.work_shift[var] = 0.0;
        }
    }

    /// Populate the costs, optionally perturbing them to break dual ties.
    /// Perturbation needs the random fractions of
    /// [`SimplexInfo::initialise_random_vectors`] and the phase-2 ranges.
    pub fn initialise_cost(&mut self, lp: &Lp, perturb: bool) {
        if lp.num_col > 0 {
            self.initialise_phase2_col_cost(lp, 0, lp.num_col - 1);
        }
        if lp.num_row > 0 {
            self.initialise_phase2_row_cost(lp, 0, lp.num_row - 1);
        }
        self.costs_perturbed = false;
        if !perturb || !self.perturb_costs {
            return;
        }
        self.costs_perturbed = true;

        let mut bigc: f64 = 0.0;
        for col in 0..lp.num_col {
            bigc = bigc.max(self.work_cost[col].abs());
        }
        if bigc > 100.0 {
            bigc = bigc.sqrt().sqrt();
        }

        // With few boxed variables a tiny perturbation is enough.
        let num_tot = lp.num_tot();
        let boxed: usize = (0..num_tot)
            .filter(|&i| self.work_range[i] < 1e30)
            .count();
        if (boxed as f64) < 0.01 * num_tot as f64 {
            bigc = bigc.min(1.0);
        }

        let base = 5e-7 * bigc;
        for col in 0..lp.num_col {
            let lower = lp.col_lower[col];
            let upper = lp.col_upper[col];
            let xpert = (self.work_cost[col].abs() + 1.0)
                * base
                * (1.0 + self.num_tot_random_value[col]);
            if lower <= -INF && upper >= INF {
                // Free: no perturbation.
            } else if upper >= INF {
                self.work_cost[col] += xpert;
            } else if lower <= -INF {
                self.work_cost[col] -= xpert;
            } else if lower != upper {
                self.work_cost[col] += if self.work_cost[col] >= 0.0 {
                    xpert
                } else {
                    -xpert
                };
            }
            // Fixed: no perturbation.
        }
        for i in lp.num_col..num_tot {
            self.work_cost[i] += (0.5 - self.num_tot_random_value[i]) * 1e-12;
        }
    }

    /// Set `work_value` and `nonbasic_move` from the bounds for nonbasic
    /// variables in `[first_var, last_var]`; basic variables get move zero.
    /// A boxed variable keeps a valid preexisting move, so replaying this
    /// after a bound flip does not lose the chosen side.
    pub fn initialise_value_from_nonbasic(
        &mut self,
        basis: &mut Basis,
        first_var: usize,
        last_var: usize,
    ) {
        for var in first_var..=last_var {
            if !basis.nonbasic_flag[var] {
                basis.nonbasic_move[var] = MOVE_ZERO;
                continue;
            }
            if self.work_lower[var] == self.work_upper[var] {
                // Fixed
                self.work_value[var] = self.work_lower[var];
                basis.nonbasic_move[var] = MOVE_ZERO;
            } else if self.work_lower[var] > -INF {
                if self.work_upper[var] < INF {
                    // Boxed: keep a valid move, default to the lower bound.
                    if basis.nonbasic_move[var] == MOVE_UP {
                        self.work_value[var] = self.work_lower[var];
                    } else if basis.nonbasic_move[var] == MOVE_DOWN {
                        self.work_value[var] = self.work_upper[var];
                    } else {
                        basis.nonbasic_move[var] = MOVE_UP;
                        self.work_value[var] = self.work_lower[var];
                    }
                } else {
                    // Lower bound only
                    self.work_value[var] = self.work_lower[var];
                    basis.nonbasic_move[var] = MOVE_UP;
                }
            } else if self.work_upper[var] < INF {
                // Upper bound only
                self.work_value[var] = self.work_upper[var];
                basis.nonbasic_move[var] = MOVE_DOWN;
            } else {
                // Free
                self.work_value[var] = 0.0;
                basis.nonbasic_move[var] = MOVE_ZERO;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{ComparisonOp, ObjSense, Problem};

    fn small_lp() -> Lp {
        let mut problem = Problem::new(ObjSense::Minimise);
        let x = problem.add_var(1.0, (0.0, 1.0)); // boxed
        let y = problem.add_var(-2.0, (0.0, INF)); // lower only
        let z = problem.add_var(0.5, (-INF, 3.0)); // upper only
        let w = problem.add_var(0.0, (-INF, INF)); // free
        let v = problem.add_var(4.0, (2.0, 2.0)); // fixed
        problem.add_constraint(
            [(x, 1.0), (y, 1.0), (z, 1.0), (w, 1.0), (v, 1.0)],
            ComparisonOp::Ge,
            1.0,
        );
        problem.build()
    }

    fn populated(lp: &Lp) -> (SimplexInfo, Basis, Random) {
        let mut info = SimplexInfo::new(&Options::default());
        let mut random = Random::new();
        info.allocate_work_and_base_arrays(lp);
        info.initialise_random_vectors(lp, &mut random);
        info.initialise_cost(lp, false);
        info.initialise_bound(lp, 2);
        let mut basis = Basis::new(lp.num_col, lp.num_row);
        basis.set_logical(lp.num_col, lp.num_row);
        info.initialise_value_from_nonbasic(&mut basis, 0, lp.num_tot() - 1);
        (info, basis, random)
    }

    #[test]
    fn phase2_bounds_negate_rows_into_logicals() {
        let lp = small_lp();
        let (info, _, _) = populated(&lp);
        assert_eq!(info.work_lower[5], -INF);
        assert_eq!(info.work_upper[5], -1.0);
        for i in 0..lp.num_tot() {
            assert_eq!(info.work_range[i], info.work_upper[i] - info.work_lower[i]);
        }
    }

    #[test]
    fn value_and_move_follow_the_bound_contract() {
        let lp = small_lp();
        let (info, basis, _) = populated(&lp);
        // boxed at lower
        assert_eq!(basis.nonbasic_move[0], MOVE_UP);
        assert_eq!(info.work_value[0], 0.0);
        // lower only
        assert_eq!(basis.nonbasic_move[1], MOVE_UP);
        assert_eq!(info.work_value[1], 0.0);
        // upper only
        assert_eq!(basis.nonbasic_move[2], MOVE_DOWN);
        assert_eq!(info.work_value[2], 3.0);
        // free
        assert_eq!(basis.nonbasic_move[3], MOVE_ZERO);
        assert_eq!(info.work_value[3], 0.0);
        // fixed
        assert_eq!(basis.nonbasic_move[4], MOVE_ZERO);
        assert_eq!(info.work_value[4], 2.0);
        // basic logical
        assert_eq!(basis.nonbasic_move[5], MOVE_ZERO);
    }

    #[test]
    fn boxed_variable_keeps_its_side() {
        let lp = small_lp();
        let (mut info, mut basis, _) = populated(&lp);
        basis.nonbasic_move[0] = MOVE_DOWN;
        info.initialise_value_from_nonbasic(&mut basis, 0, 0);
        assert_eq!(basis.nonbasic_move[0], MOVE_DOWN);
        assert_eq!(info.work_value[0], 1.0);
    }

    #[test]
    fn phase1_bounds_are_artificial() {
        let lp = small_lp();
        let (mut info, _, _) = populated(&lp);
        info.initialise_bound(&lp, 1);
        // boxed collapses
        assert_eq!((info.work_lower[0], info.work_upper[0]), (0.0, 0.0));
        // lower only
        assert_eq!((info.work_lower[1], info.work_upper[1]), (0.0, 1.0));
        // upper only
        assert_eq!((info.work_lower[2], info.work_upper[2]), (-1.0, 0.0));
        // free structural
        assert_eq!((info.work_lower[3], info.work_upper[3]), (-1000.0, 1000.0));
        // fixed collapses
        assert_eq!((info.work_lower[4], info.work_upper[4]), (0.0, 0.0));
        // row logical with upper only
        assert_eq!((info.work_lower[5], info.work_upper[5]), (-1.0, 0.0));
    }

    #[test]
    fn costs_carry_the_sense_sign() {
        let mut lp = small_lp();
        lp.sense = ObjSense::Maximise;
        let (info, _, _) = populated(&lp);
        assert_eq!(info.work_cost[0], -1.0);
        assert_eq!(info.work_cost[1], 2.0);
        assert_eq!(info.work_cost[5], 0.0);
        assert!(!info.costs_perturbed);
    }

    #[test]
    fn perturbation_respects_bound_shapes() {
        let lp = small_lp();
        let (mut info, _, mut random) = populated(&lp);
        info.initialise_random_vectors(&lp, &mut random);
        info.initialise_cost(&lp, true);
        assert!(info.costs_perturbed);
        // lower-only cost moves up, upper-only moves down
        assert!(info.work_cost[1] > -2.0);
        assert!(info.work_cost[2] < 0.5);
        // boxed moves away from zero
        assert!(info.work_cost[0] > 1.0);
        // free and fixed stay exact
        assert_eq!(info.work_cost[3], 0.0);
        assert_eq!(info.work_cost[4], 4.0);
        // logicals get a tiny symmetric jitter
        assert!(info.work_cost[5].abs() <= 0.5e-12);
        assert!(info.work_cost[5] != 0.0);
    }

    #[test]
    fn random_vectors_are_reproducible() {
        let lp = small_lp();
        let mut info_a = SimplexInfo::new(&Options::default());
        let mut info_b = SimplexInfo::new(&Options::default());
        let mut random = Random::new();
        random.integer();
        info_a.initialise_random_vectors(&lp, &mut random);
        info_b.initialise_random_vectors(&lp, &mut Random::new());
        assert_eq!(info_a.num_col_permutation, info_b.num_col_permutation);
        assert_eq!(info_a.num_tot_permutation, info_b.num_tot_permutation);
        assert_eq!(info_a.num_tot_random_value, info_b.num_tot_random_value);
    }
}
