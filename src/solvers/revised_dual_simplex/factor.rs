use log::debug;

use crate::consts::STABILITY_COEFF;
use crate::sparse::{ScatteredVec, SparseMat, SparseVec};

use super::eta_matrices::EtaMatrices;
use super::lu::gplu::GpluFactorizer;
use super::lu::{LuFactors, SolveScratch};
use super::matrix::Matrix;

/// Reasons the caller should refactorize instead of continuing to update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RebuildReason {
    UpdateLimitReached,
}

/// Refactorized representation of the basis inverse.
///
/// `build` gathers the current basic columns and refactorizes; between
/// rebuilds, `update` extends a product-form eta file. The basis is borrowed
/// as a slice only for the duration of `build`.
#[derive(Clone, Debug)]
pub struct Factor {
    num_row: usize,
    stability_coeff: f64,
    lu: Option<LuFactors>,
    lu_transpose: Option<LuFactors>,
    eta: EtaMatrices,
    scratch: SolveScratch,
    eta_coeffs: SparseVec,
}

impl Factor {
    pub fn new() -> Factor {
        Factor {
            num_row: 0,
            stability_coeff: STABILITY_COEFF,
            lu: None,
            lu_transpose: None,
            eta: EtaMatrices::new(0),
            scratch: SolveScratch::new(0),
            eta_coeffs: SparseVec::new(),
        }
    }

    pub fn setup(&mut self, num_row: usize) {
        self.num_row = num_row;
        self.lu = None;
        self.lu_transpose = None;
        self.eta.clear_and_resize(num_row);
        self.scratch.clear_and_resize(num_row);
    }

    /// Refactorize from the current basic columns. Returns the rank
    /// deficiency: 0 on success, k > 0 when k columns had to be patched with
    /// logicals. The patched factorization remains solvable; recovery is the
    /// caller's decision.
    pub fn build(&mut self, matrix: &Matrix, basic_index: &[usize]) -> usize {
        debug_assert_eq!(basic_index.len(), self.num_row);

        let mut basis_cols = SparseMat::new(self.num_row);
        for &var in basic_index {
            if var < matrix.num_col() {
                let (rows, values) = matrix.col_storage(var);
                for (&row, &value) in rows.iter().zip(values) {
                    basis_cols.push(row, value);
                }
            } else {
                basis_cols.push(var - matrix.num_col(), 1.0);
            }
            basis_cols.seal_column();
        }

        let gplu = GpluFactorizer::new(self.stability_coeff);
        let (lu, rank_deficiency) =
            gplu.lu_factorize(self.num_row, |c| basis_cols.col_storage(c));
        if rank_deficiency > 0 {
            debug!("basis factorization patched {} columns", rank_deficiency);
        }
        self.lu_transpose = Some(lu.transpose());
        self.lu = Some(lu);
        self.eta.clear_and_resize(self.num_row);
        rank_deficiency
    }

    pub fn has_factors(&self) -> bool {
        self.lu.is_some()
    }

    /// rhs := B⁻¹ rhs.
    pub fn ftran(&mut self, rhs: &mut ScatteredVec) {
        let lu = self.lu.as_ref().expect("ftran before factor build");
        lu.solve_inplace(rhs, &mut self.scratch);

        for idx in 0..self.eta.len() {
            let leaving_row = self.eta.leaving_rows[idx];
            let coeff = *rhs.get(leaving_row);
            if coeff == 0.0 {
                continue;
            }
            for (r, &val) in self.eta.coeff_cols.col_iter(idx) {
                *rhs.get_mut(r) -= coeff * val;
            }
        }
    }

    /// rhs := B⁻ᵀ rhs.
    pub fn btran(&mut self, rhs: &mut ScatteredVec) {
        for idx in (0..self.eta.len()).rev() {
            let mut coeff = 0.0;
            for (i, &val) in self.eta.coeff_cols.col_iter(idx) {
                coeff += val * rhs.values[i];
            }
            if coeff != 0.0 {
                *rhs.get_mut(self.eta.leaving_rows[idx]) -= coeff;
            }
        }

        let lu_transpose = self
            .lu_transpose
            .as_ref()
            .expect("btran before factor build");
        lu_transpose.solve_inplace(rhs, &mut self.scratch);
    }

    /// Extend the eta file with the pivot on `row_out`. `column` is the
    /// entering column in FTRAN form; `row_ep` (the BTRAN pivot row) is part
    /// of the update contract but unused by the product-form file.
    pub fn update(&mut self, column: &ScatteredVec, _row_ep: &ScatteredVec, row_out: usize) {
        let pivot = *column.get(row_out);
        debug_assert!(pivot != 0.0);
        self.eta_coeffs.clear();
        for (r, &value) in column.iter() {
            let coeff = if r == row_out {
                1.0 - 1.0 / pivot
            } else {
                value / pivot
            };
            if coeff != 0.0 {
                self.eta_coeffs.push(r, coeff);
            }
        }
        self.eta.push(row_out, &self.eta_coeffs);
    }

    /// Number of updates absorbed since the last rebuild.
    pub fn update_count(&self) -> usize {
        self.eta.len()
    }
}

impl Default for Factor {
    fn default() -> Factor {
        Factor::new()
    }
}
