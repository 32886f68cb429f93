//! Packing of flat vectors into lower triangular matrices.

use crate::errors::{GpError, Result};
use linfa::Float;
use ndarray::{Array2, Array3, ArrayBase, Data, Ix2, Ix3, Zip};

/// Row and column indices of the lower triangle (diagonal included) of a (n, n) matrix,
/// listed row by row, left to right within a row.
pub fn tril_indices(n: usize) -> Vec<(usize, usize)> {
    (0..n)
        .flat_map(|i| (0..=i).map(move |j| (i, j)))
        .collect()
}

/// Map a (d, m) matrix of `vectors` to d (n, n) lower triangular matrices
/// where the lower triangle of the k-th matrix is filled with the k-th vector
/// in [`tril_indices`] order. Upper triangles are zero.
///
/// `m` has to be the triangular number n(n+1)/2, an error is returned otherwise.
pub fn vec_to_tri<F: Float>(
    vectors: &ArrayBase<impl Data<Elem = F>, Ix2>,
    n: usize,
) -> Result<Array3<F>> {
    let m = vectors.ncols();
    if m != n * (n + 1) / 2 {
        return Err(GpError::InvalidValueError(format!(
            "Vector length {m} does not fill the lower triangle of a ({n}, {n}) matrix, expected {}",
            n * (n + 1) / 2
        )));
    }
    let indices = tril_indices(n);
    let mut tri = Array3::zeros((vectors.nrows(), n, n));
    Zip::from(tri.outer_iter_mut())
        .and(vectors.rows())
        .for_each(|mut mat, vec| {
            indices
                .iter()
                .zip(vec.iter())
                .for_each(|(&(i, j), &v)| mat[[i, j]] = v);
        });
    Ok(tri)
}

/// Inverse of [`vec_to_tri`]: read the lower triangles of (d, n, n) matrices
/// back into a (d, n(n+1)/2) matrix.
pub fn tri_to_vec<F: Float>(matrices: &ArrayBase<impl Data<Elem = F>, Ix3>) -> Array2<F> {
    let n = matrices.shape()[1];
    let indices = tril_indices(n);
    let mut vectors = Array2::zeros((matrices.shape()[0], indices.len()));
    Zip::from(vectors.rows_mut())
        .and(matrices.outer_iter())
        .for_each(|mut vec, mat| {
            vec.iter_mut()
                .zip(indices.iter())
                .for_each(|(v, &(i, j))| *v = mat[[i, j]]);
        });
    vectors
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, s, Array};

    #[test]
    fn test_tril_indices() {
        assert_eq!(
            vec![(0, 0), (1, 0), (1, 1), (2, 0), (2, 1), (2, 2)],
            tril_indices(3)
        );
        assert!(tril_indices(0).is_empty());
    }

    #[test]
    fn test_vec_to_tri() {
        let vectors = array![[1., 2., 3., 4., 5., 6.]];
        let tri = vec_to_tri(&vectors, 3).unwrap();
        assert_eq!((1, 3, 3), tri.dim());
        assert_abs_diff_eq!(
            array![[1., 0., 0.], [2., 3., 0.], [4., 5., 6.]],
            tri.slice(s![0, .., ..])
        );
    }

    #[test]
    fn test_vec_to_tri_batch() {
        let vectors = array![[1., 2., 3., 4., 5., 6.], [-1., -2., -3., -4., -5., -6.]];
        let tri = vec_to_tri(&vectors, 3).unwrap();
        for k in 0..2 {
            let single = vec_to_tri(&vectors.slice(s![k..k + 1, ..]), 3).unwrap();
            assert_abs_diff_eq!(single.slice(s![0, .., ..]), tri.slice(s![k, .., ..]));
        }
        assert_abs_diff_eq!(tri.slice(s![1, .., ..]), -&tri.slice(s![0, .., ..]));
    }

    #[test]
    fn test_read_back() {
        let vectors = Array::linspace(0.5, 10., 20).into_shape((2, 10)).unwrap();
        let tri = vec_to_tri(&vectors, 4).unwrap();
        assert_abs_diff_eq!(vectors, tri_to_vec(&tri));
        for k in 0..2 {
            for i in 0..4 {
                for j in (i + 1)..4 {
                    assert_eq!(0., tri[[k, i, j]]);
                }
            }
        }
    }

    #[test]
    fn test_vec_to_tri_bad_size() {
        let vectors = array![[1., 2., 3., 4., 5.]];
        assert!(matches!(
            vec_to_tri(&vectors, 3),
            Err(GpError::InvalidValueError(_))
        ));
    }
}
