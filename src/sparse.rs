//! Sparse work buffers for the simplex core.
//!
//! `ScatteredVec` is the dense-sparse buffer passed through the factor and
//! matrix contracts: dense values plus an explicit nonzero pattern, so that
//! FTRAN/BTRAN and column gathers touch only the entries they produce.

#[derive(Clone, Debug, PartialEq)]
pub struct ScatteredVec {
    pub values: Vec<f64>,
    pub is_nonzero: Vec<bool>,
    pub nonzero: Vec<usize>,
}

impl ScatteredVec {
    pub fn empty(n: usize) -> ScatteredVec {
        ScatteredVec {
            values: vec![0.0; n],
            is_nonzero: vec![false; n],
            nonzero: vec![],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        for &i in &self.nonzero {
            self.values[i] = 0.0;
            self.is_nonzero[i] = false;
        }
        self.nonzero.clear();
    }

    pub fn clear_and_resize(&mut self, n: usize) {
        self.clear();
        self.values.resize(n, 0.0);
        self.is_nonzero.resize(n, false);
    }

    pub fn get(&self, i: usize) -> &f64 {
        &self.values[i]
    }

    pub fn get_mut(&mut self, i: usize) -> &mut f64 {
        if !self.is_nonzero[i] {
            self.is_nonzero[i] = true;
            self.nonzero.push(i);
        }
        &mut self.values[i]
    }

    /// Accumulate `value` into entry `i`, tracking the pattern.
    pub fn add(&mut self, i: usize, value: f64) {
        *self.get_mut(i) += value;
    }

    pub fn set<'a>(&mut self, entries: impl IntoIterator<Item = (usize, &'a f64)>) {
        self.clear();
        for (i, &value) in entries {
            self.is_nonzero[i] = true;
            self.nonzero.push(i);
            self.values[i] = value;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &f64)> {
        self.nonzero.iter().map(move |&i| (i, &self.values[i]))
    }

    pub fn to_sparse_vec(&self, result: &mut SparseVec) {
        result.clear();
        for (i, &value) in self.iter() {
            if value != 0.0 {
                result.push(i, value);
            }
        }
    }
}

/// Plain (index, value) pair list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SparseVec {
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
}

impl SparseVec {
    pub fn new() -> SparseVec {
        SparseVec {
            indices: vec![],
            values: vec![],
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn clear(&mut self) {
        self.indices.clear();
        self.values.clear();
    }

    pub fn push(&mut self, i: usize, value: f64) {
        self.indices.push(i);
        self.values.push(value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &f64)> {
        self.indices.iter().copied().zip(self.values.iter())
    }
}

/// Column-appendable compressed sparse matrix. Columns are built by pushing
/// entries and sealed one at a time; rows within a column are unordered.
#[derive(Clone, Debug, PartialEq)]
pub struct SparseMat {
    n_rows: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    values: Vec<f64>,
}

impl SparseMat {
    pub fn new(n_rows: usize) -> SparseMat {
        SparseMat {
            n_rows,
            indptr: vec![0],
            indices: vec![],
            values: vec![],
        }
    }

    pub fn rows(&self) -> usize {
        self.n_rows
    }

    pub fn cols(&self) -> usize {
        self.indptr.len() - 1
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn clear_and_resize(&mut self, n_rows: usize) {
        self.n_rows = n_rows;
        self.indptr.clear();
        self.indptr.push(0);
        self.indices.clear();
        self.values.clear();
    }

    /// Append an entry to the currently open column.
    pub fn push(&mut self, row: usize, value: f64) {
        self.indices.push(row);
        self.values.push(value);
    }

    /// Close the currently open column.
    pub fn seal_column(&mut self) {
        self.indptr.push(self.indices.len());
    }

    pub fn append_col<'a>(&mut self, entries: impl Iterator<Item = (usize, &'a f64)>) {
        for (row, &value) in entries {
            self.push(row, value);
        }
        self.seal_column();
    }

    pub fn col_rows(&self, col: usize) -> &[usize] {
        &self.indices[self.indptr[col]..self.indptr[col + 1]]
    }

    pub fn col_storage(&self, col: usize) -> (&[usize], &[f64]) {
        let range = self.indptr[col]..self.indptr[col + 1];
        (&self.indices[range.clone()], &self.values[range])
    }

    pub fn col_rows_mut(&mut self, col: usize) -> &mut [usize] {
        &mut self.indices[self.indptr[col]..self.indptr[col + 1]]
    }

    pub fn col_iter(&self, col: usize) -> impl Iterator<Item = (usize, &f64)> {
        let range = self.indptr[col]..self.indptr[col + 1];
        self.indices[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter())
    }

    pub fn transpose(&self) -> SparseMat {
        let n_cols = self.cols();
        let mut counts = vec![0usize; self.n_rows];
        for &row in &self.indices {
            counts[row] += 1;
        }
        let mut indptr = Vec::with_capacity(self.n_rows + 1);
        indptr.push(0);
        for row in 0..self.n_rows {
            indptr.push(indptr[row] + counts[row]);
        }
        let mut cursor = indptr[..self.n_rows].to_vec();
        let mut indices = vec![0usize; self.nnz()];
        let mut values = vec![0.0; self.nnz()];
        for col in 0..n_cols {
            for (row, &value) in self.col_iter(col) {
                let put = cursor[row];
                cursor[row] += 1;
                indices[put] = col;
                values[put] = value;
            }
        }
        SparseMat {
            n_rows: n_cols,
            indptr,
            indices,
            values,
        }
    }

    pub fn to_csmat(&self) -> crate::datatype::CsMat {
        let mut tri_mat = sprs::TriMat::new((self.n_rows, self.cols()));
        for col in 0..self.cols() {
            for (row, &value) in self.col_iter(col) {
                tri_mat.add_triplet(row, col, value);
            }
        }
        tri_mat.to_csc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scattered_vec_tracks_pattern() {
        let mut v = ScatteredVec::empty(4);
        v.add(2, 1.5);
        v.add(0, -1.0);
        v.add(2, 0.5);
        assert_eq!(v.nonzero, vec![2, 0]);
        assert_eq!(v.values, vec![-1.0, 0.0, 2.0, 0.0]);

        v.clear();
        assert_eq!(v.values, vec![0.0; 4]);
        assert!(v.nonzero.is_empty());

        v.set([(1, &3.0), (3, &4.0)]);
        let collected: Vec<(usize, f64)> = v.iter().map(|(i, &x)| (i, x)).collect();
        assert_eq!(collected, vec![(1, 3.0), (3, 4.0)]);
    }

    #[test]
    fn sparse_mat_transpose_round_trip() {
        let mut mat = SparseMat::new(3);
        // col 0: rows 0, 2
        mat.push(0, 1.0);
        mat.push(2, 2.0);
        mat.seal_column();
        // col 1: row 1
        mat.push(1, 3.0);
        mat.seal_column();

        let t = mat.transpose();
        assert_eq!(t.rows(), 2);
        assert_eq!(t.cols(), 3);
        assert_eq!(t.col_rows(0), &[0]);
        assert_eq!(t.col_rows(2), &[0]);
        let back = t.transpose();
        assert_eq!(back, mat);
    }
}
