//! Posterior of the latent GP at new points given its values at inducing points.
//!
//! With `Kmm = Kuu + jitter I = Lm Lm^T` and `A = Lm^-1 Kmn`, the conditional is
//! * mean: `A^T f` (whitened) or `(Lm^-T A)^T f`,
//! * variance: `Knn - A^T A`, plus `B^T S B` when a square root `S = L L^T` of the
//!   inducing values covariance is given.

use crate::correlation_models::CorrelationModel;
use crate::errors::{GpError, Result};
use crate::features::InducingPoints;
use crate::kernels::Kernel;
use crate::triangular::vec_to_tri;
use linfa::Float;
use linfa_linalg::{cholesky::*, triangular::*};
use ndarray::{Array2, Array3, ArrayBase, Axis, Data, Ix2};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Square root of the covariance of the inducing values, one per latent function
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(serialize = "F: Serialize", deserialize = "F: Deserialize<'de>"))
)]
pub enum QSqrt<F: Float> {
    /// Standard deviations as a (M, nlatent) matrix
    Diag(Array2<F>),
    /// Lower triangular factors as a (nlatent, M, M) array
    Full(Array3<F>),
}

impl<F: Float> QSqrt<F> {
    /// Lower triangular factors from (nlatent, M(M+1)/2) packed rows
    pub fn from_packed(vectors: &ArrayBase<impl Data<Elem = F>, Ix2>, m: usize) -> Result<Self> {
        Ok(QSqrt::Full(vec_to_tri(vectors, m)?))
    }

    fn check(&self, m: usize, nlatent: usize) -> Result<()> {
        let ok = match self {
            QSqrt::Diag(s) => s.shape() == [m, nlatent],
            QSqrt::Full(s) => s.shape() == [nlatent, m, m],
        };
        if ok {
            Ok(())
        } else {
            Err(GpError::InvalidValueError(format!(
                "q_sqrt shape does not match {m} inducing points and {nlatent} latent functions"
            )))
        }
    }
}

/// Predictive covariance of the latent functions
#[derive(Clone, Debug, PartialEq)]
pub enum Covariance<F: Float> {
    /// Marginal variances as a (n, nlatent) matrix
    Marginals(Array2<F>),
    /// Full covariances as a (nlatent, n, n) array
    Full(Array3<F>),
}

impl<F: Float> Covariance<F> {
    /// Marginal variances (n, nlatent), diagonals are extracted from full covariances
    pub fn marginals(&self) -> Array2<F> {
        match self {
            Covariance::Marginals(var) => var.to_owned(),
            Covariance::Full(cov) => {
                let mut var = Array2::zeros((cov.len_of(Axis(1)), cov.len_of(Axis(0))));
                for (mut col, c) in var.columns_mut().into_iter().zip(cov.outer_iter()) {
                    col.assign(&c.diag());
                }
                var
            }
        }
    }
}

/// Cholesky factor `Lm` of `Kuu + jitter I` and `A = Lm^-1 Kuf(x)`
pub(crate) fn projection<F: Float, Corr: CorrelationModel<F>>(
    feature: &InducingPoints<F>,
    kernel: &Kernel<F, Corr>,
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    jitter: F,
) -> Result<(Array2<F>, Array2<F>)> {
    let kmm = feature.kuu(kernel, jitter)?;
    let kmn = feature.kuf(kernel, x)?;
    let lm = kmm.cholesky()?;
    let a = lm.solve_triangular(&kmn, UPLO::Lower)?;
    Ok((lm, a))
}

/// Mean (n, nlatent) and covariance of the latent GP at `xnew` given the values `f` (M, nlatent)
/// at the `feature` inducing points.
///
/// When `white` is true, `f` is the whitened representation `V` and inducing values are `Lm V`.
/// `q_sqrt` adds the uncertainty of the inducing values, `None` stands for a point mass.
#[allow(clippy::too_many_arguments)]
pub fn conditional<F: Float, Corr: CorrelationModel<F>>(
    feature: &InducingPoints<F>,
    kernel: &Kernel<F, Corr>,
    xnew: &ArrayBase<impl Data<Elem = F>, Ix2>,
    f: &ArrayBase<impl Data<Elem = F>, Ix2>,
    full_cov: bool,
    q_sqrt: Option<&QSqrt<F>>,
    white: bool,
    jitter: F,
) -> Result<(Array2<F>, Covariance<F>)> {
    let m = feature.len();
    let nlatent = f.ncols();
    if f.nrows() != m {
        return Err(GpError::InvalidValueError(format!(
            "Inducing values should have {} rows, got {}",
            m,
            f.nrows()
        )));
    }
    if let Some(q) = q_sqrt {
        q.check(m, nlatent)?;
    }

    let (lm, mut a) = projection(feature, kernel, xnew, jitter)?;

    let n = xnew.nrows();
    let mut cov = if full_cov {
        let base = kernel.k(xnew, xnew)? - a.t().dot(&a);
        let mut cov = Array3::zeros((nlatent, n, n));
        cov.outer_iter_mut().for_each(|mut c| c.assign(&base));
        Covariance::Full(cov)
    } else {
        let base = kernel.k_diag(xnew) - (&a * &a).sum_axis(Axis(0));
        let mut var = Array2::zeros((n, nlatent));
        var.columns_mut()
            .into_iter()
            .for_each(|mut c| c.assign(&base));
        Covariance::Marginals(var)
    };

    if !white {
        a = lm.t().solve_triangular(&a, UPLO::Upper)?;
    }
    let fmean = a.t().dot(f);

    if let Some(q) = q_sqrt {
        for l in 0..nlatent {
            let lta = match q {
                QSqrt::Diag(s) => &a * &s.column(l).insert_axis(Axis(1)),
                QSqrt::Full(s) => s.index_axis(Axis(0), l).t().dot(&a),
            };
            match &mut cov {
                Covariance::Full(c) => {
                    let mut cl = c.index_axis_mut(Axis(0), l);
                    cl += &lta.t().dot(&lta);
                }
                Covariance::Marginals(v) => {
                    let mut vl = v.column_mut(l);
                    vl += &(&lta * &lta).sum_axis(Axis(0));
                }
            }
        }
    }

    Ok((fmean, cov))
}
