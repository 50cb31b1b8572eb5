use std::cmp::Ordering;

use crate::consts::SINGULARITY_TOLERANCE;
use crate::sparse::{ScatteredVec, SparseMat};

use super::{LuFactors, Permutation, TriangleMat};

/// Left-looking GPLU factorization with threshold partial pivoting.
///
/// Columns are preordered by sparsity; each column is solved against the
/// already-factored lower triangle, then the pivot is chosen among the
/// eligible rows as the sparsest row within `stability_coeff` of the largest
/// candidate. A column with no candidate above the singularity tolerance is
/// replaced by a logical unit column and counted as rank deficient.
pub struct GpluFactorizer {
    stability_coeff: f64,
}

impl GpluFactorizer {
    pub fn new(stability_coeff: f64) -> GpluFactorizer {
        GpluFactorizer { stability_coeff }
    }

    /// Factorize the matrix whose columns are supplied by `get_col`.
    /// Returns the factors and the number of deficient columns.
    pub fn lu_factorize<'a>(
        &self,
        size: usize,
        get_col: impl Fn(usize) -> (&'a [usize], &'a [f64]),
    ) -> (LuFactors, usize) {
        let mut lower = SparseMat::new(size);
        let mut upper = SparseMat::new(size);
        let mut upper_diag: Vec<f64> = Vec::with_capacity(size);
        let mut rank_deficiency = 0;

        let mut orig_from_new_row: Vec<usize> = (0..size).collect();
        let mut new_from_orig_row = orig_from_new_row.clone();

        let col_permutation = order_simple(size, |c| get_col(c).0);

        let mut elt_count_from_orig_row = vec![0usize; size];
        for c in 0..size {
            for &orig_r in get_col(c).0 {
                elt_count_from_orig_row[orig_r] += 1;
            }
        }

        let mut u_j = ScatteredVec::empty(size);
        let mut topo = TopoScratch::new(size);

        for i_col in 0..size {
            let mat_col = get_col(col_permutation.orig_from_new[i_col]);
            u_j.set(mat_col.0.iter().copied().zip(mat_col.1));

            // Entries reachable through the factored part of L join the
            // pattern, dependencies first.
            topo_sorted_reachables(
                &mut topo,
                &u_j.nonzero,
                |new_i| lower.col_rows(new_i),
                |new_i| new_i < i_col,
                |orig_row| new_from_orig_row[orig_row],
            );
            for i in 0..topo.visited.len() {
                let orig_row = topo.visited[i];
                if !u_j.is_nonzero[orig_row] {
                    u_j.is_nonzero[orig_row] = true;
                    u_j.nonzero.push(orig_row);
                }
            }

            for i in (0..topo.visited.len()).rev() {
                let orig_i = topo.visited[i];
                let new_i = new_from_orig_row[orig_i];
                if new_i < i_col {
                    let x_val = u_j.values[orig_i];
                    for (orig_row, &coeff) in lower.col_iter(new_i) {
                        u_j.values[orig_row] -= x_val * coeff;
                    }
                }
            }

            let pivot_orig_row = {
                let mut max_abs = 0.0;
                for &orig_row in &u_j.nonzero {
                    if new_from_orig_row[orig_row] < i_col {
                        continue;
                    }
                    let abs = f64::abs(u_j.values[orig_row]);
                    if abs > max_abs {
                        max_abs = abs;
                    }
                }

                if max_abs < SINGULARITY_TOLERANCE {
                    None
                } else {
                    // Sparsest row among those within the stability threshold.
                    let mut best_orig_row = None;
                    let mut best_elt_count = usize::MAX;
                    for &orig_row in &u_j.nonzero {
                        if new_from_orig_row[orig_row] < i_col {
                            continue;
                        }
                        if f64::abs(u_j.values[orig_row]) >= self.stability_coeff * max_abs {
                            let elt_count = elt_count_from_orig_row[orig_row];
                            if elt_count < best_elt_count {
                                best_orig_row = Some(orig_row);
                                best_elt_count = elt_count;
                            }
                        }
                    }
                    best_orig_row
                }
            };

            let (pivot_orig_row, pivot_val, patched) = match pivot_orig_row {
                Some(orig_row) => (orig_row, u_j.values[orig_row], false),
                None => {
                    // Deficient column: substitute the unit column of the row
                    // currently mapped to this position.
                    rank_deficiency += 1;
                    (orig_from_new_row[i_col], 1.0, true)
                }
            };

            {
                let orig_row = orig_from_new_row[i_col];
                let pivot_new_row = new_from_orig_row[pivot_orig_row];
                orig_from_new_row.swap(i_col, pivot_new_row);
                new_from_orig_row.swap(orig_row, pivot_orig_row);
            }

            if patched {
                upper_diag.push(1.0);
            } else {
                for &orig_row in &u_j.nonzero {
                    let val = u_j.values[orig_row];
                    if val == 0.0 {
                        continue;
                    }
                    let new_row = new_from_orig_row[orig_row];
                    match new_row.cmp(&i_col) {
                        Ordering::Less => upper.push(new_row, val),
                        Ordering::Equal => upper_diag.push(pivot_val),
                        Ordering::Greater => lower.push(orig_row, val / pivot_val),
                    }
                }
            }

            upper.seal_column();
            lower.seal_column();
        }

        // L was built with original row indices; renumber into factored order.
        for col in 0..lower.cols() {
            for row in lower.col_rows_mut(col) {
                *row = new_from_orig_row[*row];
            }
        }

        let factors = LuFactors {
            lower: TriangleMat {
                nondiag: lower,
                diag: None,
            },
            upper: TriangleMat {
                nondiag: upper,
                diag: Some(upper_diag),
            },
            row_permutation: Permutation {
                new_from_orig: new_from_orig_row,
                orig_from_new: orig_from_new_row,
            },
            col_permutation,
        };
        (factors, rank_deficiency)
    }
}

/// Preordering: process columns in order of increasing size.
fn order_simple<'a>(col_size: usize, get_col: impl Fn(usize) -> &'a [usize]) -> Permutation {
    let mut cols_queue = ColsQueue::new(col_size);
    for c in 0..col_size {
        cols_queue.add(c, get_col(c).len().saturating_sub(1));
    }

    let mut orig_from_new = Vec::with_capacity(col_size);
    while orig_from_new.len() < col_size {
        orig_from_new.push(cols_queue.pop_min().unwrap());
    }

    let mut new_from_orig = vec![0; col_size];
    for (new, &orig) in orig_from_new.iter().enumerate() {
        new_from_orig[orig] = new;
    }

    Permutation {
        new_from_orig,
        orig_from_new,
    }
}

/// Bucket queue of columns keyed by score, popped in increasing order.
#[derive(Debug)]
struct ColsQueue {
    head_from_score: Vec<Option<usize>>,
    prev: Vec<usize>,
    next: Vec<usize>,
    min_score: usize,
}

impl ColsQueue {
    fn new(num_cols: usize) -> ColsQueue {
        ColsQueue {
            head_from_score: vec![None; num_cols],
            prev: vec![0; num_cols],
            next: vec![0; num_cols],
            min_score: num_cols,
        }
    }

    fn pop_min(&mut self) -> Option<usize> {
        let col = loop {
            if self.min_score >= self.head_from_score.len() {
                return None;
            }
            if let Some(col) = self.head_from_score[self.min_score] {
                break col;
            }
            self.min_score += 1;
        };

        self.remove(col, self.min_score);
        Some(col)
    }

    fn add(&mut self, col: usize, score: usize) {
        self.min_score = std::cmp::min(self.min_score, score);

        if let Some(head) = self.head_from_score[score] {
            self.prev[col] = self.prev[head];
            self.next[col] = head;
            self.next[self.prev[head]] = col;
            self.prev[head] = col;
        } else {
            self.prev[col] = col;
            self.next[col] = col;
            self.head_from_score[score] = Some(col);
        }
    }

    fn remove(&mut self, col: usize, score: usize) {
        if self.next[col] == col {
            self.head_from_score[score] = None;
        } else {
            self.next[self.prev[col]] = self.next[col];
            self.prev[self.next[col]] = self.prev[col];
            if self.head_from_score[score].unwrap() == col {
                self.head_from_score[score] = Some(self.next[col]);
            }
        }
    }
}

#[derive(Clone, Debug)]
struct DfsStep {
    orig_i: usize,
    cur_child: usize,
}

/// Reusable state for the reachability DFS. After a call to
/// [`topo_sorted_reachables`], `visited` holds the reachable nodes with every
/// node preceded by its dependencies (reverse iteration gives elimination
/// order).
#[derive(Clone, Debug)]
pub(crate) struct TopoScratch {
    dfs_stack: Vec<DfsStep>,
    is_visited: Vec<bool>,
    pub(crate) visited: Vec<usize>,
}

impl TopoScratch {
    pub(crate) fn new(n: usize) -> TopoScratch {
        TopoScratch {
            dfs_stack: Vec::with_capacity(n),
            is_visited: vec![false; n],
            visited: vec![],
        }
    }

    fn clear(&mut self) {
        debug_assert!(self.dfs_stack.is_empty());
        for i in 0..self.visited.len() {
            self.is_visited[self.visited[i]] = false;
        }
        self.visited.clear();
    }

    pub(crate) fn clear_and_resize(&mut self, n: usize) {
        self.clear();
        self.is_visited.clear();
        self.is_visited.resize(n, false);
    }
}

/// Depth-first search from `initial` through `get_children`, restricted to
/// nodes accepted by `should_visit` (in renumbered space). Results are left
/// in `topo.visited`.
pub(crate) fn topo_sorted_reachables<'a>(
    topo: &mut TopoScratch,
    initial: &[usize],
    get_children: impl Fn(usize) -> &'a [usize] + 'a,
    should_visit: impl Fn(usize) -> bool,
    new_from_orig: impl Fn(usize) -> usize,
) {
    topo.clear();

    for &orig_row in initial {
        let new_row = new_from_orig(orig_row);
        if !should_visit(new_row) {
            continue;
        }
        if topo.is_visited[orig_row] {
            continue;
        }

        topo.dfs_stack.push(DfsStep {
            orig_i: orig_row,
            cur_child: 0,
        });
        while let Some(current_node) = topo.dfs_stack.last_mut() {
            let new_i = new_from_orig(current_node.orig_i);
            let children = if should_visit(new_i) {
                get_children(new_i)
            } else {
                &[]
            };

            let cur_i = current_node.orig_i;
            if !topo.is_visited[cur_i] {
                topo.is_visited[cur_i] = true;
            }

            while current_node.cur_child < children.len()
                && topo.is_visited[children[current_node.cur_child]]
            {
                current_node.cur_child += 1;
            }

            if current_node.cur_child < children.len() {
                let child = children[current_node.cur_child];
                topo.dfs_stack.push(DfsStep {
                    orig_i: child,
                    cur_child: 0,
                });
            } else {
                topo.visited.push(cur_i);
                topo.dfs_stack.pop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::helpers::mat_from_triplets;

    #[test]
    fn factorizes_a_rectangular_basis_selection() {
        let gplu = GpluFactorizer::new(0.9);

        // [2.0, 2.0, (0.0,) 0.0]
        // [0.0, 0.0, (0.0,) 1.0]
        // [4.0, 3.0, (0.0,) 1.0]
        let test_mat = mat_from_triplets(
            3,
            4,
            &[
                (0, 0, 2.0),
                (0, 1, 2.0),
                (1, 3, 1.0),
                (2, 0, 4.0),
                (2, 1, 3.0),
                (2, 3, 1.0),
            ],
        );

        let (factors, deficiency) = gplu.lu_factorize(test_mat.rows(), |c| {
            test_mat
                .outer_view([0, 1, 3][c])
                .unwrap()
                .into_raw_storage()
        });
        assert_eq!(deficiency, 0);
        assert!(factors.nnz() >= 3);
    }

    #[test]
    fn factorizes_a_dense_matrix() {
        let gplu = GpluFactorizer::new(0.9);

        let test_mat = mat_from_triplets(
            6,
            6,
            &[
                (0, 0, 1.0),
                (0, 4, 5.0),
                (0, 5, 1.0),
                (1, 0, 10.0),
                (1, 1, -3.0),
                (1, 2, 6.0),
                (1, 3, 1.0),
                (1, 5, 2.0),
                (2, 0, 3.0),
                (2, 1, 5.0),
                (2, 3, 8.0),
                (2, 4, 4.0),
                (2, 5, 3.0),
                (3, 0, 2.0),
                (3, 1, 4.0),
                (3, 2, 5.0),
                (3, 4, 9.0),
                (3, 5, 4.0),
                (4, 0, 2.0),
                (4, 1, 4.0),
                (4, 2, 5.0),
                (4, 3, 6.0),
                (4, 5, 5.0),
                (5, 0, 9.0),
                (5, 1, 7.0),
                (5, 2, 6.0),
                (5, 3, 3.0),
                (5, 4, 1.0),
            ],
        );

        let (factors, deficiency) = gplu.lu_factorize(test_mat.rows(), |c| {
            test_mat.outer_view(c).unwrap().into_raw_storage()
        });
        assert_eq!(deficiency, 0);

        // Check LU = PAQ by solving for a known vector: A x = b with
        // x = (1, 1, 1, 1, 1, 1) gives b = row sums.
        let mut scratch = crate::solvers::revised_dual_simplex::lu::SolveScratch::new(6);
        let mut rhs = crate::sparse::ScatteredVec::empty(6);
        let row_sums = [7.0, 16.0, 23.0, 24.0, 22.0, 26.0];
        rhs.set(row_sums.iter().enumerate().map(|(i, v)| (i, v)));
        factors.solve_inplace(&mut rhs, &mut scratch);
        for i in 0..6 {
            assert!(
                (rhs.values[i] - 1.0).abs() < 1e-12,
                "x[{}] = {}",
                i,
                rhs.values[i]
            );
        }
    }

    #[test]
    fn deficient_column_is_patched_and_counted() {
        let gplu = GpluFactorizer::new(0.9);

        // Column 1 is identically zero: rank deficiency of one.
        let test_mat = mat_from_triplets(2, 2, &[(0, 0, 1.0), (1, 0, 1.0)]);
        let (factors, deficiency) =
            gplu.lu_factorize(2, |c| test_mat.outer_view(c).unwrap().into_raw_storage());
        assert_eq!(deficiency, 1);

        // The patched factorization stays solvable.
        let mut scratch = crate::solvers::revised_dual_simplex::lu::SolveScratch::new(2);
        let mut rhs = crate::sparse::ScatteredVec::empty(2);
        rhs.set([(0, &1.0)]);
        factors.solve_inplace(&mut rhs, &mut scratch);
        assert!(rhs.values.iter().all(|v| v.is_finite()));
    }
}
