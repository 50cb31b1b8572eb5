pub mod gplu;

use crate::sparse::{ScatteredVec, SparseMat};

use self::gplu::{topo_sorted_reachables, TopoScratch};

/// LU factors of PBQ = LU for a basis matrix B, with P/Q the row and column
/// permutations chosen during factorization.
#[derive(Clone, Debug)]
pub struct LuFactors {
    lower: TriangleMat,
    upper: TriangleMat,
    row_permutation: Permutation,
    col_permutation: Permutation,
}

/// Scratch space reused across triangular solves.
#[derive(Clone, Debug)]
pub struct SolveScratch {
    tmp: ScatteredVec,
    topo: TopoScratch,
}

impl SolveScratch {
    pub fn new(n: usize) -> SolveScratch {
        SolveScratch {
            tmp: ScatteredVec::empty(n),
            topo: TopoScratch::new(n),
        }
    }

    pub fn clear_and_resize(&mut self, n: usize) {
        self.tmp.clear_and_resize(n);
        self.topo.clear_and_resize(n);
    }
}

impl LuFactors {
    pub fn transpose(&self) -> LuFactors {
        LuFactors {
            lower: self.upper.transpose(),
            upper: self.lower.transpose(),
            row_permutation: self.col_permutation.clone(),
            col_permutation: self.row_permutation.clone(),
        }
    }

    pub fn nnz(&self) -> usize {
        self.lower.nondiag.nnz() + self.upper.nondiag.nnz() + self.lower.nondiag.cols()
    }

    /// Solve LUx = b in place: `rhs` comes in as b and leaves as x.
    pub fn solve_inplace(&self, rhs: &mut ScatteredVec, scratch: &mut SolveScratch) {
        let n = rhs.len();
        if scratch.tmp.len() != n {
            scratch.clear_and_resize(n);
        }

        // Move the rhs into factored row order.
        scratch.tmp.clear();
        for i in 0..rhs.nonzero.len() {
            let orig_i = rhs.nonzero[i];
            let new_i = self.row_permutation.new_from_orig[orig_i];
            scratch.tmp.nonzero.push(new_i);
            scratch.tmp.is_nonzero[new_i] = true;
            scratch.tmp.values[new_i] = rhs.values[orig_i];
        }

        // Ly = b, then Ux = y.
        tri_solve_sparse_inplace(&self.lower, &mut scratch.tmp, &mut scratch.topo);
        tri_solve_sparse_inplace(&self.upper, &mut scratch.tmp, &mut scratch.topo);

        // Move the solution back into original column order.
        rhs.clear();
        for i in 0..scratch.tmp.nonzero.len() {
            let new_i = scratch.tmp.nonzero[i];
            let orig_i = self.col_permutation.orig_from_new[new_i];
            rhs.nonzero.push(orig_i);
            rhs.is_nonzero[orig_i] = true;
            rhs.values[orig_i] = scratch.tmp.values[new_i];
        }
    }
}

fn tri_solve_sparse_inplace(
    triangle_mat: &TriangleMat,
    rhs: &mut ScatteredVec,
    topo: &mut TopoScratch,
) {
    topo_sorted_reachables(
        topo,
        &rhs.nonzero,
        |col| triangle_mat.nondiag.col_rows(col),
        |_| true,
        |i| i,
    );

    for i in 0..topo.visited.len() {
        let row = topo.visited[i];
        if !rhs.is_nonzero[row] {
            rhs.is_nonzero[row] = true;
            rhs.nonzero.push(row);
        }
    }

    for &col in topo.visited.iter().rev() {
        tri_solve_process_col(triangle_mat, col, &mut rhs.values);
    }
}

fn tri_solve_process_col(triangle_mat: &TriangleMat, col: usize, rhs: &mut [f64]) {
    // All other variables of this row have already been subtracted from
    // rhs[col] by earlier columns in topological order.
    let x_val = if let Some(diag) = triangle_mat.diag.as_ref() {
        rhs[col] / diag[col]
    } else {
        rhs[col]
    };

    rhs[col] = x_val;
    for (r, &coeff) in triangle_mat.nondiag.col_iter(col) {
        rhs[r] -= x_val * coeff;
    }
}

/// Triangular factor stored without its diagonal; `diag` is `None` when every
/// diagonal element is one.
#[derive(Clone, Debug)]
pub(crate) struct TriangleMat {
    pub(crate) nondiag: SparseMat,
    pub(crate) diag: Option<Vec<f64>>,
}

impl TriangleMat {
    pub(crate) fn transpose(&self) -> TriangleMat {
        TriangleMat {
            nondiag: self.nondiag.transpose(),
            diag: self.diag.clone(),
        }
    }

    #[cfg(test)]
    pub(crate) fn to_csmat(&self) -> crate::datatype::CsMat {
        let rows = self.nondiag.rows();
        let mut tri_mat = sprs::TriMat::new((rows, self.nondiag.cols()));
        if let Some(diag) = self.diag.as_ref() {
            for (i, &val) in diag.iter().enumerate() {
                tri_mat.add_triplet(i, i, val);
            }
        } else {
            for i in 0..rows {
                tri_mat.add_triplet(i, i, 1.0);
            }
        }
        for c in 0..self.nondiag.cols() {
            for (r, &val) in self.nondiag.col_iter(c) {
                tri_mat.add_triplet(r, c, val);
            }
        }
        tri_mat.to_csc()
    }
}

#[derive(Clone, Debug)]
pub struct Permutation {
    pub new_from_orig: Vec<usize>,
    pub orig_from_new: Vec<usize>,
}
