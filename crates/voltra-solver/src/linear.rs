//! Dense and sparse linear-system solves shared by the transient MNA loop
//! and the MCP/LCP Schur-complement elimination.

use faer::prelude::*;
use faer::sparse::{SparseColMat, Triplet};
use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};

/// Systems with this many or more variables use the sparse solver path.
pub const SPARSE_THRESHOLD: usize = 50;

/// Solve a linear system `Ax = b` with dense LU decomposition.
pub fn solve_dense(a: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>> {
    if a.nrows() != a.ncols() {
        return Err(Error::DimensionMismatch {
            expected: a.nrows(),
            actual: a.ncols(),
        });
    }
    if a.nrows() != b.len() {
        return Err(Error::DimensionMismatch {
            expected: a.nrows(),
            actual: b.len(),
        });
    }

    a.clone().lu().solve(b).ok_or(Error::SingularMatrix)
}

/// Solve a linear system `Ax = b` from sparse triplets, via `faer`'s sparse
/// LU. Duplicate `(row, col)` entries are summed.
pub fn solve_sparse(size: usize, triplets: &[(usize, usize, f64)], rhs: &DVector<f64>) -> Result<DVector<f64>> {
    if size != rhs.len() {
        return Err(Error::DimensionMismatch {
            expected: size,
            actual: rhs.len(),
        });
    }

    let faer_triplets: Vec<_> = triplets.iter().map(|&(r, c, v)| Triplet::new(r, c, v)).collect();

    let sparse_mat =
        SparseColMat::<usize, f64>::try_new_from_triplets(size, size, &faer_triplets).map_err(|_| Error::SingularMatrix)?;

    let lu = sparse_mat.sp_lu().map_err(|_| Error::SingularMatrix)?;

    let faer_rhs = Col::<f64>::from_fn(size, |i| rhs[i]);
    let faer_x = lu.solve(&faer_rhs);

    Ok(DVector::from_fn(size, |i, _| faer_x[i]))
}

/// Dispatch to the sparse or dense path by system size, per
/// [`SPARSE_THRESHOLD`].
pub fn solve(a: &DMatrix<f64>, triplets: &[(usize, usize, f64)], rhs: &DVector<f64>) -> Result<DVector<f64>> {
    if a.nrows() >= SPARSE_THRESHOLD {
        solve_sparse(a.nrows(), triplets, rhs)
    } else {
        solve_dense(a, rhs)
    }
}
