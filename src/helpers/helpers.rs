use sprs::CsVecBase;
use std::ops::Deref;

pub fn to_dense<IStorage, DStorage>(vec: &CsVecBase<IStorage, DStorage, f64>) -> Vec<f64>
where
    IStorage: Deref<Target = [usize]>,
    DStorage: Deref<Target = [f64]>,
{
    let mut dense = vec![0.0; vec.dim()];
    vec.scatter(&mut dense);
    dense
}

use crate::datatype::CsMat;

pub fn mat_from_triplets(rows: usize, cols: usize, triplets: &[(usize, usize, f64)]) -> CsMat {
    let mut mat = sprs::TriMat::new((rows, cols));
    for &(r, c, val) in triplets {
        mat.add_triplet(r, c, val);
    }
    mat.to_csc()
}

#[cfg(test)]
use crate::datatype::CsVec;

#[cfg(test)]
pub(crate) fn to_sparse(slice: &[f64]) -> CsVec {
    let mut res = CsVec::empty(slice.len());
    for (i, &val) in slice.iter().enumerate() {
        if val != 0.0 {
            res.append(i, val);
        }
    }
    res
}

#[cfg(test)]
pub(crate) fn assert_matrix_eq(mat: &CsMat, reference: &[Vec<f64>]) {
    let mat = mat.to_csr();
    assert_eq!(mat.rows(), reference.len());
    for (r, row) in mat.outer_iterator().enumerate() {
        assert_eq!(to_dense(&row), reference[r], "matrices differ in row {}", r);
    }
}
