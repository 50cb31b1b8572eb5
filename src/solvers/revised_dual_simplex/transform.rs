use log::debug;

use crate::consts::{pow2_round, BIG_BOUND, INF};

use super::status::LpAction;
use super::Model;

/// Scaling factors applied to the working LP. Every factor is rounded to a
/// power of two, so scaling is exact in floating point.
#[derive(Clone, Debug)]
pub struct Scale {
    pub col: Vec<f64>,
    pub row: Vec<f64>,
    pub cost: f64,
}

impl Scale {
    pub fn identity(num_col: usize, num_row: usize) -> Scale {
        Scale {
            col: vec![1.0; num_col],
            row: vec![1.0; num_row],
            cost: 1.0,
        }
    }

    pub fn reset(&mut self, num_col: usize, num_row: usize) {
        self.col.clear();
        self.col.resize(num_col, 1.0);
        self.row.clear();
        self.row.resize(num_row, 1.0);
        self.cost = 1.0;
    }
}

// Scale factors are kept within a power-of-two band either side of one.
const MAX_ALLOWED_COST_SCALE: f64 = 1024.0;

/// Bring the largest nonzero cost towards one by a power of two, at most
/// 1024. Scaling costs up effectively loosens the dual tolerance, so the
/// factor is clamped.
fn scale_costs(col_cost: &mut [f64], cost_scale_out: &mut f64) {
    let mut max_nz_cost = 0.0f64;
    for &cost in col_cost.iter() {
        if cost != 0.0 {
            max_nz_cost = max_nz_cost.max(cost.abs());
        }
    }
    let mut cost_scale = 1.0;
    if max_nz_cost > 0.0 && !(1.0 / 16.0..=16.0).contains(&max_nz_cost) {
        cost_scale = pow2_round(max_nz_cost).min(MAX_ALLOWED_COST_SCALE);
    }
    debug!("max nonzero cost {} scaled by {}", max_nz_cost, cost_scale);
    if cost_scale == 1.0 {
        return;
    }
    for cost in col_cost.iter_mut() {
        *cost /= cost_scale;
    }
    *cost_scale_out = cost_scale;
}

impl Model {
    /// Replace the working LP by the dual of the input LP when the shape
    /// heuristic favours it. Any column or row whose bounds do not fit the
    /// dualizable shapes cancels the operation, leaving the working LP equal
    /// to the input LP.
    pub fn transpose_simplex_lp(&mut self) {
        if self.status.is_transposed {
            return;
        }
        let primal_num_col = self.lp.num_col;
        let primal_num_row = self.lp.num_row;

        if primal_num_col as f64 / primal_num_row as f64 > 0.2 {
            debug!("transpose cancelled by shape ratio");
            return;
        }

        // Primal column bounds become dual row bounds:
        //   free     -> [c, c]
        //   x >= 0   -> [-inf, c]
        //   x <= 0   -> [c, +inf]
        //   x == 0   -> free
        let mut dual_row_lower = Vec::with_capacity(primal_num_col);
        let mut dual_row_upper = Vec::with_capacity(primal_num_col);
        for j in 0..primal_num_col {
            let lower = self.lp.col_lower[j];
            let upper = self.lp.col_upper[j];
            let cost = self.lp.col_cost[j];
            if lower <= -INF && upper >= INF {
                dual_row_lower.push(cost);
                dual_row_upper.push(cost);
            } else if lower == 0.0 && upper >= INF {
                dual_row_lower.push(-INF);
                dual_row_upper.push(cost);
            } else if lower <= -INF && upper == 0.0 {
                dual_row_lower.push(cost);
                dual_row_upper.push(INF);
            } else if lower == 0.0 && upper == 0.0 {
                dual_row_lower.push(-INF);
                dual_row_upper.push(INF);
            } else {
                debug!("transpose cancelled by column {}", j);
                return;
            }
        }

        // Primal row bounds become dual column bounds and costs:
        //   row == b    -> free,      cost -b
        //   row <= b    -> y <= 0,    cost -b
        //   row >= b    -> y >= 0,    cost -b
        //   row free    -> y == 0,    cost 0
        let mut dual_col_lower = Vec::with_capacity(primal_num_row);
        let mut dual_col_upper = Vec::with_capacity(primal_num_row);
        let mut dual_cost = Vec::with_capacity(primal_num_row);
        for i in 0..primal_num_row {
            let lower = self.lp.row_lower[i];
            let upper = self.lp.row_upper[i];
            if lower == upper {
                dual_col_lower.push(-INF);
                dual_col_upper.push(INF);
                dual_cost.push(-lower);
            } else if lower <= -INF && upper < INF {
                dual_col_lower.push(-INF);
                dual_col_upper.push(0.0);
                dual_cost.push(-upper);
            } else if lower > -INF && upper >= INF {
                dual_col_lower.push(0.0);
                dual_col_upper.push(INF);
                dual_cost.push(-lower);
            } else if lower <= -INF && upper >= INF {
                dual_col_lower.push(0.0);
                dual_col_upper.push(0.0);
                dual_cost.push(0.0);
            } else {
                debug!("transpose cancelled by row {}", i);
                return;
            }
        }

        // The dual matrix is the transpose, built by CSR construction.
        let num_nz = self.lp.num_nz();
        let mut ar_start = vec![0usize; primal_num_row + 1];
        let mut iwork = vec![0usize; primal_num_row];
        for &row in &self.lp.a_index {
            iwork[row] += 1;
        }
        for i in 1..=primal_num_row {
            ar_start[i] = ar_start[i - 1] + iwork[i - 1];
        }
        iwork.copy_from_slice(&ar_start[..primal_num_row]);
        let mut ar_index = vec![0usize; num_nz];
        let mut ar_value = vec![0.0; num_nz];
        for col in 0..primal_num_col {
            for k in self.lp.a_start[col]..self.lp.a_start[col + 1] {
                let row = self.lp.a_index[k];
                let put = iwork[row];
                iwork[row] += 1;
                ar_index[put] = col;
                ar_value[put] = self.lp.a_value[k];
            }
        }

        self.simplex_lp.num_col = primal_num_row;
        self.simplex_lp.num_row = primal_num_col;
        self.simplex_lp.a_start = ar_start;
        self.simplex_lp.a_index = ar_index;
        self.simplex_lp.a_value = ar_value;
        self.simplex_lp.col_cost = dual_cost;
        self.simplex_lp.col_lower = dual_col_lower;
        self.simplex_lp.col_upper = dual_col_upper;
        self.simplex_lp.row_lower = dual_row_lower;
        self.simplex_lp.row_upper = dual_row_upper;
        self.scale
            .reset(self.simplex_lp.num_col, self.simplex_lp.num_row);
        self.status.update(LpAction::Transpose);
    }

    /// Equilibrate the working LP. Matrix scaling is skipped when all entry
    /// magnitudes already sit in [0.2, 5]; cost scaling runs only when the
    /// `scale_costs` option is set.
    pub fn scale_simplex_lp(&mut self) {
        if self.status.is_scaled {
            return;
        }
        let _clock = self.clocks.scale.start();
        self.scale
            .reset(self.simplex_lp.num_col, self.simplex_lp.num_row);
        let num_col = self.simplex_lp.num_col;
        let num_row = self.simplex_lp.num_row;

        let mut min0 = INF;
        let mut max0 = 0.0f64;
        for &value in &self.simplex_lp.a_value {
            let value = value.abs();
            min0 = min0.min(value);
            max0 = max0.max(value);
        }
        if min0 >= 0.2 && max0 <= 5.0 {
            if self.info.scale_costs {
                scale_costs(&mut self.simplex_lp.col_cost, &mut self.scale.cost);
            }
            self.status.update(LpAction::Scale);
            return;
        }

        // Include the costs in the column measure when the smallest nonzero
        // cost is below 0.1.
        let mut min_nz_cost = INF;
        for &cost in &self.simplex_lp.col_cost {
            if cost != 0.0 {
                min_nz_cost = min_nz_cost.min(cost.abs());
            }
        }
        let include_cost = min_nz_cost < 0.1;

        let col_scale = &mut self.scale.col;
        let row_scale = &mut self.scale.row;
        let a_start = &self.simplex_lp.a_start;
        let a_index = &self.simplex_lp.a_index;
        let a_value = &self.simplex_lp.a_value;
        let col_cost = &self.simplex_lp.col_cost;

        let mut row_min = vec![INF; num_row];
        let mut row_max = vec![1.0 / INF; num_row];
        for _ in 0..6 {
            for col in 0..num_col {
                let mut col_min = INF;
                let mut col_max = 1.0 / INF;
                let cost = col_cost[col].abs();
                if include_cost && cost != 0.0 {
                    col_min = col_min.min(cost);
                    col_max = col_max.max(cost);
                }
                for k in a_start[col]..a_start[col + 1] {
                    let value = a_value[k].abs() * row_scale[a_index[k]];
                    col_min = col_min.min(value);
                    col_max = col_max.max(value);
                }
                col_scale[col] = 1.0 / (col_min * col_max).sqrt();
                for k in a_start[col]..a_start[col + 1] {
                    let row = a_index[k];
                    let value = a_value[k].abs() * col_scale[col];
                    row_min[row] = row_min[row].min(value);
                    row_max[row] = row_max[row].max(value);
                }
            }
            for row in 0..num_row {
                row_scale[row] = 1.0 / (row_min[row] * row_max[row]).sqrt();
            }
            row_min.clear();
            row_min.resize(num_row, INF);
            row_max.clear();
            row_max.resize(num_row, 1.0 / INF);
        }

        for scale in col_scale.iter_mut().chain(row_scale.iter_mut()) {
            *scale = pow2_round(*scale);
        }

        for col in 0..num_col {
            for k in a_start[col]..a_start[col + 1] {
                self.simplex_lp.a_value[k] *= col_scale[col] * row_scale[a_index[k]];
            }
        }
        for col in 0..num_col {
            if self.simplex_lp.col_lower[col] > -INF {
                self.simplex_lp.col_lower[col] /= col_scale[col];
            }
            if self.simplex_lp.col_upper[col] < INF {
                self.simplex_lp.col_upper[col] /= col_scale[col];
            }
            self.simplex_lp.col_cost[col] *= col_scale[col];
        }
        for row in 0..num_row {
            if self.simplex_lp.row_lower[row] > -INF {
                self.simplex_lp.row_lower[row] *= row_scale[row];
            }
            if self.simplex_lp.row_upper[row] < INF {
                self.simplex_lp.row_upper[row] *= row_scale[row];
            }
        }
        self.status.update(LpAction::Scale);
        if self.info.scale_costs {
            scale_costs(&mut self.simplex_lp.col_cost, &mut self.scale.cost);
        }
    }

    /// Reorder the columns of the working LP by the deterministic random
    /// permutation.
    pub fn permute_simplex_lp(&mut self) {
        if self.status.is_permuted {
            return;
        }
        self.info
            .initialise_random_vectors(&self.simplex_lp, &mut self.random);

        let num_col = self.simplex_lp.num_col;
        let permutation = &self.info.num_col_permutation;

        let save_a_start = self.simplex_lp.a_start.clone();
        let save_a_index = self.simplex_lp.a_index.clone();
        let save_a_value = self.simplex_lp.a_value.clone();
        let save_col_cost = self.simplex_lp.col_cost.clone();
        let save_col_lower = self.simplex_lp.col_lower.clone();
        let save_col_upper = self.simplex_lp.col_upper.clone();
        let save_col_scale = self.scale.col.clone();

        let mut count_x = 0;
        for i in 0..num_col {
            let from_col = permutation[i];
            self.simplex_lp.a_start[i] = count_x;
            for k in save_a_start[from_col]..save_a_start[from_col + 1] {
                self.simplex_lp.a_index[count_x] = save_a_index[k];
                self.simplex_lp.a_value[count_x] = save_a_value[k];
                count_x += 1;
            }
            self.simplex_lp.col_cost[i] = save_col_cost[from_col];
            self.simplex_lp.col_lower[i] = save_col_lower[from_col];
            self.simplex_lp.col_upper[i] = save_col_upper[from_col];
            self.scale.col[i] = save_col_scale[from_col];
        }
        debug_assert_eq!(self.simplex_lp.a_start[num_col], count_x);
        self.status.update(LpAction::Permute);
    }

    /// Row-by-row bound tightening: propagate each non-free row's activity
    /// range onto its columns, then relax bounds that closed up too far back
    /// towards their originals.
    pub fn tighten_simplex_lp(&mut self) {
        if self.status.is_tightened {
            return;
        }
        let num_col = self.simplex_lp.num_col;
        let num_row = self.simplex_lp.num_row;

        // Row-wise copy of the matrix.
        let num_nz = self.simplex_lp.num_nz();
        let mut ar_start = vec![0usize; num_row + 1];
        let mut iwork = vec![0usize; num_row];
        for &row in &self.simplex_lp.a_index {
            iwork[row] += 1;
        }
        for i in 1..=num_row {
            ar_start[i] = ar_start[i - 1] + iwork[i - 1];
        }
        iwork.copy_from_slice(&ar_start[..num_row]);
        let mut ar_index = vec![0usize; num_nz];
        let mut ar_value = vec![0.0; num_nz];
        for col in 0..num_col {
            for k in self.simplex_lp.a_start[col]..self.simplex_lp.a_start[col + 1] {
                let row = self.simplex_lp.a_index[k];
                let put = iwork[row];
                iwork[row] += 1;
                ar_index[put] = col;
                ar_value[put] = self.simplex_lp.a_value[k];
            }
        }

        let col_lower_0 = self.simplex_lp.col_lower.clone();
        let col_upper_0 = self.simplex_lp.col_upper.clone();

        let col_lower = &mut self.simplex_lp.col_lower;
        let col_upper = &mut self.simplex_lp.col_upper;
        let row_lower = &self.simplex_lp.row_lower;
        let row_upper = &self.simplex_lp.row_upper;

        let mut pass = 0;
        loop {
            let mut number_changed = 0;
            for row in 0..num_row {
                if row_lower[row] < -BIG_BOUND && row_upper[row] > BIG_BOUND {
                    continue;
                }

                // Activity range of the row, counting infinite contributions.
                let mut ninf_u = 0;
                let mut ninf_l = 0;
                let mut xmax_u = 0.0;
                let mut xmin_l = 0.0;
                for k in ar_start[row]..ar_start[row + 1] {
                    let col = ar_index[k];
                    let value = ar_value[k];
                    let upper = if value > 0.0 {
                        col_upper[col]
                    } else {
                        -col_lower[col]
                    };
                    let lower = if value > 0.0 {
                        col_lower[col]
                    } else {
                        -col_upper[col]
                    };
                    let value = value.abs();
                    if upper < BIG_BOUND {
                        xmax_u += upper * value;
                    } else {
                        ninf_u += 1;
                    }
                    if lower > -BIG_BOUND {
                        xmin_l += lower * value;
                    } else {
                        ninf_l += 1;
                    }
                }

                xmax_u += 1e-8 * xmax_u.abs();
                xmin_l -= 1e-8 * xmin_l.abs();

                let xmin_l_margin = if xmin_l.abs() > 1e8 {
                    1e-12 * xmin_l.abs()
                } else {
                    0.0
                };
                let xmax_u_margin = if xmax_u.abs() > 1e8 {
                    1e-12 * xmax_u.abs()
                } else {
                    0.0
                };

                // Redundant row: its whole activity range fits the bounds.
                let comp_u = xmax_u + ninf_u as f64 * 1e31;
                let comp_l = xmin_l - ninf_l as f64 * 1e31;
                if comp_u <= row_upper[row] + 1e-7 && comp_l >= row_lower[row] - 1e-7 {
                    continue;
                }

                let row_l = row_lower[row];
                let row_u = row_upper[row];

                for k in ar_start[row]..ar_start[row + 1] {
                    let value = ar_value[k];
                    let col = ar_index[k];
                    let col_l = col_lower[col];
                    let col_u = col_upper[col];
                    let mut new_l = -INF;
                    let mut new_u = INF;

                    if value > 0.0 {
                        if row_l > -BIG_BOUND && ninf_u <= 1 && (ninf_u == 0 || col_u > BIG_BOUND) {
                            new_l = (row_l - xmax_u) / value + (1 - ninf_u) as f64 * col_u
                                - xmax_u_margin;
                        }
                        if row_u < BIG_BOUND && ninf_l <= 1 && (ninf_l == 0 || col_l < -BIG_BOUND) {
                            new_u = (row_u - xmin_l) / value + (1 - ninf_l) as f64 * col_l
                                + xmin_l_margin;
                        }
                    } else {
                        if row_l > -BIG_BOUND && ninf_u <= 1 && (ninf_u == 0 || col_l < -BIG_BOUND) {
                            new_u = (row_l - xmax_u) / value + (1 - ninf_u) as f64 * col_l
                                + xmax_u_margin;
                        }
                        if row_u < BIG_BOUND && ninf_l <= 1 && (ninf_l == 0 || col_u > BIG_BOUND) {
                            new_l = (row_u - xmin_l) / value + (1 - ninf_l) as f64 * col_u
                                - xmin_l_margin;
                        }
                    }

                    if new_u < col_u - 1e-12 && new_u < BIG_BOUND {
                        col_upper[col] = new_u.max(col_l);
                        number_changed += 1;
                    }
                    if new_l > col_l + 1e-12 && new_l > -BIG_BOUND {
                        col_lower[col] = new_l.min(col_u);
                        number_changed += 1;
                    }
                }
            }

            if number_changed == 0 {
                break;
            }
            pass += 1;
            if pass > 10 {
                break;
            }
        }

        // Relax tightened bounds back towards the originals, never past them.
        let use_tolerance = 1e-3;
        let relax = 100.0 * use_tolerance;
        for col in 0..num_col {
            if col_upper_0[col] > col_lower_0[col] + use_tolerance {
                if col_upper[col] - col_lower[col] < use_tolerance + 1e-8 {
                    col_lower[col] = col_lower_0[col].max(col_lower[col] - relax);
                    col_upper[col] = col_upper_0[col].min(col_upper[col] + relax);
                } else {
                    if col_upper[col] < col_upper_0[col] {
                        col_upper[col] = (col_upper[col] + relax).min(col_upper_0[col]);
                    }
                    if col_lower[col] > col_lower_0[col] {
                        col_lower[col] = (col_lower[col] - relax).max(col_lower_0[col]);
                    }
                }
            }
        }
        self.status.update(LpAction::Tighten);
    }
}
