use linfa::Float;
use ndarray::{Array2, ArrayBase, Data, Ix2};

/// Computes differences between each element of x and each element of y
/// resulting in a 2d array of shape (nrows(x) * nrows(y), ncols(x));
/// *Panics* if x and y have not the same column numbers
pub fn pairwise_differences<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    y: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Array2<F> {
    assert!(x.ncols() == y.ncols());

    let nx = x.nrows();
    let ny = y.nrows();
    let ncols = x.ncols();
    let mut result = Array2::zeros((nx * ny, ncols));

    for (i, x_row) in x.rows().into_iter().enumerate() {
        for (j, y_row) in y.rows().into_iter().enumerate() {
            let idx = i * ny + j;
            for k in 0..ncols {
                result[[idx, k]] = x_row[k] - y_row[k];
            }
        }
    }

    result
}

/// Numerically stable `ln(sum(exp(values)))`
pub fn log_sum_exp<F: Float>(values: impl IntoIterator<Item = F> + Clone) -> F {
    let max = values
        .clone()
        .into_iter()
        .fold(F::neg_infinity(), |acc, v| acc.max(v));
    if max == F::neg_infinity() {
        return max;
    }
    max + values
        .into_iter()
        .fold(F::zero(), |acc, v| acc + (v - max).exp())
        .ln()
}
