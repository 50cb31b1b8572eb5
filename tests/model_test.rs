use dualix::consts::INF;
use dualix::problem::{ComparisonOp, ObjSense, Problem};
use dualix::solver::Error;
use dualix::solvers::revised_dual_simplex::basis::{MOVE_DOWN, MOVE_UP, MOVE_ZERO};
use dualix::solvers::revised_dual_simplex::options::Options;
use dualix::solvers::revised_dual_simplex::Model;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// min x1 + x2  s.t.  x1 + x2 >= 1,  0 <= x <= 1
fn boxed_lp() -> dualix::problem::Lp {
    let mut problem = Problem::new(ObjSense::Minimise).with_name("boxed");
    let x1 = problem.add_var(1.0, (0.0, 1.0));
    let x2 = problem.add_var(1.0, (0.0, 1.0));
    problem.add_constraint([(x1, 1.0), (x2, 1.0)], ComparisonOp::Ge, 1.0);
    problem.build()
}

#[test]
fn primal_dual_and_objective_agree_on_an_optimal_basis() {
    init_logging();
    let mut model = Model::new(boxed_lp(), &Options::default()).unwrap();
    model.setup_for_solve();

    // Make x1 basic in the only row; x2 and the slack become nonbasic, the
    // slack at its upper bound -1 (the row is x1 + x2 >= 1).
    model.replace_with_new_basis(&[0]);
    model.setup_for_solve();
    assert_eq!(model.compute_factor(), 0);
    assert!(model.ok_to_solve(1, 2));

    assert_eq!(model.basis.nonbasic_move[2], MOVE_DOWN);
    assert_eq!(model.info.work_value[2], -1.0);

    model.compute_primal();
    assert_eq!(model.info.base_value[0], 1.0);

    model.compute_dual();
    assert_eq!(model.info.work_dual[0], 0.0);
    assert_eq!(model.info.work_dual[1], 0.0);
    assert_eq!(model.info.work_dual[2], -1.0);

    model.compute_dual_objective_value(2);
    assert!(model.status.has_dual_objective_value);
    assert_eq!(model.info.dual_objective_value, 1.0);
    assert_eq!(model.compute_primal_objective_function_value(), 1.0);
}

#[test]
fn transpose_is_cancelled_by_the_shape_ratio() {
    init_logging();
    // n = 10, m = 2: n/m = 5 > 0.2, so the transpose must cancel and leave
    // the working LP bit-identical to the input.
    let mut problem = Problem::new(ObjSense::Minimise).with_name("wide");
    let vars: Vec<_> = (0..10).map(|_| problem.add_var(1.0, (0.0, INF))).collect();
    problem.add_constraint(vars.iter().map(|&v| (v, 1.0)), ComparisonOp::Ge, 1.0);
    problem.add_constraint(vars.iter().map(|&v| (v, 2.0)), ComparisonOp::Le, 8.0);
    let lp = problem.build();

    let mut options = Options::default();
    options.transpose_simplex_lp = true;
    options.scale_simplex_lp = false;
    let mut model = Model::new(lp, &options).unwrap();
    model.prepare();

    assert!(!model.status.is_transposed);
    assert_eq!(model.simplex_lp, model.lp);
}

#[test]
fn transpose_builds_the_dual_of_a_tall_lp() {
    init_logging();
    // n = 1, m = 5: n/m = 0.2, not above the threshold, and all bound
    // shapes are dualizable.
    let mut problem = Problem::new(ObjSense::Minimise).with_name("tall");
    let x = problem.add_var(3.0, (0.0, INF));
    for i in 0..5 {
        problem.add_constraint([(x, (i + 1) as f64)], ComparisonOp::Ge, i as f64);
    }
    let lp = problem.build();

    let mut options = Options::default();
    options.transpose_simplex_lp = true;
    options.scale_simplex_lp = false;
    let mut model = Model::new(lp, &options).unwrap();
    model.prepare();

    assert!(model.status.is_transposed);
    assert_eq!(model.simplex_lp.num_col, 5);
    assert_eq!(model.simplex_lp.num_row, 1);
    // Row i of the primal (>= b_i) becomes column i: [0, inf) with cost -b_i.
    for i in 0..5 {
        assert_eq!(model.simplex_lp.col_lower[i], 0.0);
        assert_eq!(model.simplex_lp.col_upper[i], INF);
        assert_eq!(model.simplex_lp.col_cost[i], -(i as f64));
        assert_eq!(model.simplex_lp.a_value[i], (i + 1) as f64);
        assert_eq!(model.simplex_lp.a_index[i], 0);
    }
    // Column x of the primal ([0, inf), cost 3) becomes the row (-inf, 3].
    assert_eq!(model.simplex_lp.row_lower[0], -INF);
    assert_eq!(model.simplex_lp.row_upper[0], 3.0);
    // Downstream flags are gone.
    assert!(!model.status.has_basis);
    assert!(!model.status.has_invert);
}

#[test]
fn scaling_skips_a_well_scaled_matrix() {
    init_logging();
    // A = I, c = (1, 1, 1): min |A| = max |A| = 1 in [0.2, 5], and the
    // largest cost is inside [1/16, 16], so nothing changes.
    let mut problem = Problem::new(ObjSense::Minimise).with_name("identity");
    let vars: Vec<_> = (0..3).map(|_| problem.add_var(1.0, (0.0, INF))).collect();
    for (i, &v) in vars.iter().enumerate() {
        problem.add_constraint([(v, 1.0)], ComparisonOp::Le, i as f64 + 1.0);
    }
    let lp = problem.build();

    let mut options = Options::default();
    options.scale_costs = true;
    let mut model = Model::new(lp.clone(), &options).unwrap();
    model.scale_simplex_lp();

    assert!(model.status.is_scaled);
    assert_eq!(model.scale.col, vec![1.0; 3]);
    assert_eq!(model.scale.row, vec![1.0; 3]);
    assert_eq!(model.scale.cost, 1.0);
    assert_eq!(model.simplex_lp, lp);
}

#[test]
fn scaling_is_idempotent_under_the_status_flag() {
    init_logging();
    let mut problem = Problem::new(ObjSense::Minimise).with_name("badly_scaled");
    let x = problem.add_var(0.05, (0.0, 8.0));
    let y = problem.add_var(20.0, (0.0, 1.0));
    problem.add_constraint([(x, 100.0), (y, 0.5)], ComparisonOp::Le, 50.0);
    problem.add_constraint([(x, 0.01), (y, 40.0)], ComparisonOp::Ge, 1.0);
    let lp = problem.build();

    let mut model = Model::new(lp, &Options::default()).unwrap();
    model.scale_simplex_lp();
    assert!(model.status.is_scaled);

    // Every scale factor is an exact power of two.
    for &scale in model.scale.col.iter().chain(model.scale.row.iter()) {
        assert!(scale > 0.0);
        assert_eq!(scale.log2().fract(), 0.0, "scale {} not a power of two", scale);
    }
    // Finite bounds were rescaled, infinite ones untouched.
    assert_eq!(model.simplex_lp.col_upper[0], 8.0 / model.scale.col[0]);
    assert_eq!(model.simplex_lp.col_upper[1], 1.0 / model.scale.col[1]);

    let once = model.simplex_lp.clone();
    model.scale_simplex_lp();
    assert_eq!(model.simplex_lp, once);
}

#[test]
fn cost_scaling_divides_large_costs_by_a_power_of_two() {
    init_logging();
    let mut problem = Problem::new(ObjSense::Minimise).with_name("big_costs");
    let vars: Vec<_> = (0..3).map(|_| problem.add_var(100.0, (0.0, INF))).collect();
    for &v in &vars {
        problem.add_constraint([(v, 1.0)], ComparisonOp::Le, 1.0);
    }
    let lp = problem.build();

    let mut options = Options::default();
    options.scale_costs = true;
    let mut model = Model::new(lp, &options).unwrap();
    model.scale_simplex_lp();

    assert_eq!(model.scale.cost, 128.0);
    for col in 0..3 {
        assert_eq!(model.simplex_lp.col_cost[col], 100.0 / 128.0);
    }
}

#[test]
fn permutation_reorders_columns_deterministically() {
    init_logging();
    let mut problem = Problem::new(ObjSense::Minimise).with_name("permute");
    for i in 0..6 {
        let v = problem.add_var(i as f64, (0.0, i as f64 + 1.0));
        problem.add_constraint([(v, i as f64 + 1.0)], ComparisonOp::Le, 1.0);
    }
    let lp = problem.build();

    let mut options = Options::default();
    options.permute_simplex_lp = true;
    options.scale_simplex_lp = false;
    let mut model = Model::new(lp.clone(), &options).unwrap();
    model.prepare();
    assert!(model.status.is_permuted);

    let permutation = model.info.num_col_permutation.clone();
    let mut seen = permutation.clone();
    seen.sort_unstable();
    assert_eq!(seen, (0..6).collect::<Vec<_>>());

    // Column i of the working LP is column permutation[i] of the input.
    for i in 0..6 {
        let from = permutation[i];
        assert_eq!(model.simplex_lp.col_cost[i], lp.col_cost[from]);
        assert_eq!(model.simplex_lp.col_lower[i], lp.col_lower[from]);
        assert_eq!(model.simplex_lp.col_upper[i], lp.col_upper[from]);
        let col: Vec<(usize, f64)> = (model.simplex_lp.a_start[i]
            ..model.simplex_lp.a_start[i + 1])
            .map(|k| (model.simplex_lp.a_index[k], model.simplex_lp.a_value[k]))
            .collect();
        let expected: Vec<(usize, f64)> = (lp.a_start[from]..lp.a_start[from + 1])
            .map(|k| (lp.a_index[k], lp.a_value[k]))
            .collect();
        assert_eq!(col, expected);
    }

    // Runs are bit-reproducible.
    let mut again = Model::new(lp, &options).unwrap();
    again.prepare();
    assert_eq!(again.info.num_col_permutation, permutation);
    assert_eq!(again.simplex_lp, model.simplex_lp);
}

#[test]
fn tightening_propagates_row_bounds_onto_columns() {
    init_logging();
    // 2x + 3y <= 12 with x, y >= 0 tightens x <= 6, y <= 4; both are then
    // relaxed back by 0.1.
    let mut problem = Problem::new(ObjSense::Minimise).with_name("tighten");
    let x = problem.add_var(1.0, (0.0, INF));
    let y = problem.add_var(1.0, (0.0, INF));
    problem.add_constraint([(x, 2.0), (y, 3.0)], ComparisonOp::Le, 12.0);
    let lp = problem.build();

    let mut options = Options::default();
    options.tighten_simplex_lp = true;
    options.scale_simplex_lp = false;
    let mut model = Model::new(lp, &options).unwrap();
    model.prepare();

    assert!(model.status.is_tightened);
    assert!((model.simplex_lp.col_upper[0] - 6.1).abs() <= 1e-7);
    assert!((model.simplex_lp.col_upper[1] - 4.1).abs() <= 1e-7);
    assert_eq!(model.simplex_lp.col_lower[0], 0.0);
    assert_eq!(model.simplex_lp.col_lower[1], 0.0);

    // A second call does not tighten further.
    let once = model.simplex_lp.clone();
    model.tighten_simplex_lp();
    assert_eq!(model.simplex_lp, once);
}

#[test]
fn correct_dual_flips_a_boxed_variable_without_perturbing() {
    init_logging();
    let mut model = Model::new(boxed_lp(), &Options::default()).unwrap();
    model.setup_for_solve();
    model.compute_factor();
    model.compute_dual();

    let tau_d = model.info.dual_feasibility_tolerance;
    assert_eq!(model.basis.nonbasic_move[0], MOVE_UP);
    assert_eq!(model.info.work_value[0], 0.0);
    model.info.work_dual[0] = -2.0 * tau_d;

    let free_count = model.correct_dual();
    assert_eq!(free_count, 0);
    assert_eq!(model.basis.nonbasic_move[0], MOVE_DOWN);
    assert_eq!(model.info.work_value[0], 1.0);
    assert_eq!(model.info.work_dual[0], -2.0 * tau_d);
    assert!(!model.info.costs_perturbed);
    assert!(model.all_nonbasic_move_vs_work_arrays_ok());
}

#[test]
fn correct_dual_shifts_one_sided_variables_and_counts_free_ones() {
    init_logging();
    // y has only a lower bound (not flippable), w is free (not repairable).
    let mut problem = Problem::new(ObjSense::Minimise).with_name("shift");
    let y = problem.add_var(1.0, (0.0, INF));
    let w = problem.add_var(0.0, (-INF, INF));
    problem.add_constraint([(y, 1.0), (w, 1.0)], ComparisonOp::Ge, 1.0);
    let lp = problem.build();

    let mut model = Model::new(lp, &Options::default()).unwrap();
    model.setup_for_solve();
    model.compute_factor();
    model.compute_dual();

    let tau_d = model.info.dual_feasibility_tolerance;
    model.info.work_dual[0] = -3.0 * tau_d;
    model.info.work_dual[1] = 5.0 * tau_d;

    let free_count = model.correct_dual();
    assert_eq!(free_count, 1);
    // The one-sided variable was shifted to a feasible dual in
    // [tau_d, 2 tau_d).
    assert!(model.info.work_dual[0] >= tau_d);
    assert!(model.info.work_dual[0] < 2.0 * tau_d);
    assert!(model.info.work_shift[0] != 0.0);
    assert!(model.info.costs_perturbed);
    // The free variable is untouched.
    assert_eq!(model.info.work_dual[1], 5.0 * tau_d);
    assert_eq!(model.info.work_shift[1], 0.0);
}

#[test]
fn dual_infeasibility_counts_differ_between_phases() {
    init_logging();
    let mut model = Model::new(boxed_lp(), &Options::default()).unwrap();
    model.setup_for_solve();
    model.compute_factor();
    model.compute_dual();

    let tau_d = model.info.dual_feasibility_tolerance;
    // A boxed variable with an infeasible dual: flippable in the dual count,
    // infeasible in the primal count.
    model.info.work_dual[0] = -2.0 * tau_d;
    assert_eq!(model.compute_dual_infeasible_in_dual(), 0);
    assert_eq!(model.compute_dual_infeasible_in_primal(), 1);
}

#[test]
fn a_full_pivot_keeps_the_state_machine_consistent() {
    init_logging();
    let mut model = Model::new(boxed_lp(), &Options::default()).unwrap();
    model.setup_for_solve();
    model.compute_factor();
    model.compute_primal();
    model.compute_dual();

    // Bring structural 0 into the basis in place of the slack of row 0.
    let column_in = 0;
    let row_out = 0;
    let column_out = model.basis.basic_index[row_out];
    assert_eq!(column_out, 2);

    let mut column = dualix::sparse::ScatteredVec::empty(1);
    model.matrix.collect_aj(&mut column, column_in, 1.0);
    model.factor.ftran(&mut column);
    let row_ep = dualix::sparse::ScatteredVec::empty(1);

    let source_out = model.set_source_out_from_bound(column_out);
    model.update_pivots(column_in, row_out, source_out);
    let hint = model.update_factor(&column, &row_ep, row_out);
    assert_eq!(hint, None);
    model.update_matrix(column_in, column_out);

    assert_eq!(model.info.iteration_count, 1);
    assert_eq!(model.info.num_basic_logicals, 0);
    assert!(model.status.has_invert);
    assert!(!model.status.has_fresh_invert);
    assert!(model.ok_to_solve(1, 2));

    // The updated factor answers for the new basis: B = [a_0] = [1].
    model.compute_primal();
    assert_eq!(model.info.base_value[0], 1.0);
    model.compute_dual();
    assert_eq!(model.info.work_dual[2], -1.0);
    model.compute_dual_objective_value(2);
    assert_eq!(model.info.dual_objective_value, 1.0);

    // A refactorization gives the same answers, freshly.
    assert_eq!(model.compute_factor(), 0);
    assert!(model.status.has_fresh_invert);
    model.compute_primal();
    assert_eq!(model.info.base_value[0], 1.0);
}

#[test]
fn rank_deficiency_is_reported_not_fatal() {
    init_logging();
    let mut problem = Problem::new(ObjSense::Minimise).with_name("deficient");
    let x = problem.add_var(1.0, (0.0, 1.0));
    problem.add_constraint([(x, 1.0)], ComparisonOp::Ge, 0.0);
    problem.add_constraint([(x, 1.0)], ComparisonOp::Ge, 0.0);
    let lp = problem.build();

    let mut model = Model::new(lp, &Options::default()).unwrap();
    model.setup_for_solve();
    // Force both rows to pick the same structural column: singular.
    model.replace_with_new_basis(&[0, 0]);
    model.setup_for_solve();
    let rank_deficiency = model.compute_factor();
    assert!(rank_deficiency > 0);
    // The factor is still usable after the logical patch.
    model.compute_primal();
    assert!(model.info.base_value.iter().all(|v| v.is_finite()));
}

#[test]
fn out_of_time_is_reported_between_pivots() {
    init_logging();
    let mut options = Options::default();
    options.run_time_limit = 0.0;
    let mut model = Model::new(boxed_lp(), &options).unwrap();
    assert_eq!(model.check_budget(), Err(Error::BudgetExhausted));
    assert_eq!(
        model.solution_status,
        dualix::solution::SolutionStatus::OutOfTime
    );
}

#[test]
fn appended_columns_and_rows_extend_the_basis() {
    init_logging();
    let mut model = Model::new(boxed_lp(), &Options::default()).unwrap();
    model.setup_for_solve();

    // Append a third column x3 with coefficient 1 in the existing row.
    model.simplex_lp.num_col += 1;
    model.simplex_lp.col_cost.push(2.0);
    model.simplex_lp.col_lower.push(0.0);
    model.simplex_lp.col_upper.push(5.0);
    model.simplex_lp.a_index.push(0);
    model.simplex_lp.a_value.push(1.0);
    let num_nz = model.simplex_lp.a_index.len();
    model.simplex_lp.a_start.push(num_nz);
    model.append_nonbasic_cols_to_basis(1);

    assert!(!model.status.has_basis);
    assert_eq!(model.basis.nonbasic_flag.len(), 4);
    assert!(model.basis.nonbasic_flag[2]);
    assert_eq!(model.basis.basic_index, vec![3]);

    // Append a row x3 <= 4 with its logical basic.
    model.simplex_lp.num_row += 1;
    model.simplex_lp.row_lower.push(-INF);
    model.simplex_lp.row_upper.push(4.0);
    model.simplex_lp.a_index.push(1);
    model.simplex_lp.a_value.push(1.0);
    *model.simplex_lp.a_start.last_mut().unwrap() += 1;
    model.append_basic_rows_to_basis(1);

    assert_eq!(model.basis.basic_index, vec![3, 4]);
    assert!(model
        .basis
        .nonbasic_flag_basic_index_ok(model.simplex_lp.num_col, model.simplex_lp.num_row));
    assert_eq!(model.info.work_cost.len(), 5);
    assert_eq!(model.info.base_value.len(), 2);

    // Repopulate over the extended LP; the model is solvable again.
    model.initialise_from_nonbasic();
    model.setup_for_solve();
    assert_eq!(model.compute_factor(), 0);
    assert!(model.ok_to_solve(1, 2));
}

#[test]
fn free_and_fixed_variables_follow_the_move_contract() {
    init_logging();
    let mut problem = Problem::new(ObjSense::Minimise).with_name("contract");
    let a = problem.add_var(1.0, (-INF, INF));
    let b = problem.add_var(1.0, (2.0, 2.0));
    let c = problem.add_var(1.0, (-INF, 4.0));
    problem.add_constraint([(a, 1.0), (b, 1.0), (c, 1.0)], ComparisonOp::Eq, 3.0);
    let lp = problem.build();

    let mut model = Model::new(lp, &Options::default()).unwrap();
    model.setup_for_solve();

    assert_eq!(model.basis.nonbasic_move[0], MOVE_ZERO);
    assert_eq!(model.info.work_value[0], 0.0);
    assert_eq!(model.basis.nonbasic_move[1], MOVE_ZERO);
    assert_eq!(model.info.work_value[1], 2.0);
    assert_eq!(model.basis.nonbasic_move[2], MOVE_DOWN);
    assert_eq!(model.info.work_value[2], 4.0);
    // The Eq row's logical is fixed at -3.
    assert_eq!(model.info.work_lower[3], -3.0);
    assert_eq!(model.info.work_upper[3], -3.0);
    assert!(model.all_nonbasic_move_vs_work_arrays_ok());
}
