use crate::sparse::{SparseMat, SparseVec};

/// Product-form update file: one eta column per pivot since the last
/// refactorization.
#[derive(Clone, Debug)]
pub struct EtaMatrices {
    pub leaving_rows: Vec<usize>,
    pub coeff_cols: SparseMat,
}

impl EtaMatrices {
    pub fn new(n_rows: usize) -> EtaMatrices {
        EtaMatrices {
            leaving_rows: vec![],
            coeff_cols: SparseMat::new(n_rows),
        }
    }

    pub fn len(&self) -> usize {
        self.leaving_rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaving_rows.is_empty()
    }

    pub fn nnz(&self) -> usize {
        self.coeff_cols.nnz()
    }

    pub fn clear_and_resize(&mut self, n_rows: usize) {
        self.leaving_rows.clear();
        self.coeff_cols.clear_and_resize(n_rows);
    }

    pub fn push(&mut self, leaving_row: usize, coeffs: &SparseVec) {
        self.leaving_rows.push(leaving_row);
        self.coeff_cols.append_col(coeffs.iter());
    }
}
