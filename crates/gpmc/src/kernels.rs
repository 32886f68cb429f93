use crate::correlation_models::{CorrelationModel, SquaredExponentialCorr};
use crate::errors::{GpError, Result};
use crate::utils::pairwise_differences;
use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, Data, Ix2};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stationary covariance function `k(x, x') = variance * r(x - x'; theta)`
/// where `r` is a [`CorrelationModel`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(
        serialize = "F: Serialize, Corr: Serialize",
        deserialize = "F: Deserialize<'de>, Corr: Deserialize<'de>"
    ))
)]
pub struct Kernel<F: Float, Corr: CorrelationModel<F>> {
    /// Correlation model
    corr: Corr,
    /// Inverse length-scales, either one per input component or a single shared value
    theta: Array1<F>,
    /// Signal variance
    variance: F,
}

/// Squared exponential kernel
pub type RbfKernel<F> = Kernel<F, SquaredExponentialCorr>;

impl<F: Float, Corr: CorrelationModel<F>> Kernel<F, Corr> {
    /// Kernel constructor, `theta` values and `variance` have to be positive
    pub fn new(corr: Corr, theta: Array1<F>, variance: F) -> Result<Self> {
        if theta.is_empty() || theta.iter().any(|t| *t <= F::zero()) {
            return Err(GpError::InvalidValueError(format!(
                "Kernel theta should be non empty with positive values, got {theta}"
            )));
        }
        if variance <= F::zero() {
            return Err(GpError::InvalidValueError(format!(
                "Kernel variance should be positive, got {variance}"
            )));
        }
        Ok(Kernel {
            corr,
            theta,
            variance,
        })
    }

    /// Correlation model
    pub fn corr(&self) -> &Corr {
        &self.corr
    }

    /// Inverse length-scales
    pub fn theta(&self) -> &Array1<F> {
        &self.theta
    }

    /// Signal variance
    pub fn variance(&self) -> F {
        self.variance
    }

    fn theta_for(&self, nx: usize) -> Result<Array1<F>> {
        if self.theta.len() == nx {
            Ok(self.theta.to_owned())
        } else if self.theta.len() == 1 {
            Ok(Array1::from_elem(nx, self.theta[0]))
        } else {
            Err(GpError::InvalidValueError(format!(
                "Kernel theta of length {} does not match input dimension {}",
                self.theta.len(),
                nx
            )))
        }
    }

    /// Covariance matrix (na, nb) between points of `a` (na, nx) and `b` (nb, nx)
    pub fn k(
        &self,
        a: &ArrayBase<impl Data<Elem = F>, Ix2>,
        b: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<Array2<F>> {
        if a.ncols() != b.ncols() {
            return Err(GpError::InvalidValueError(format!(
                "Points dimensions mismatch: {} vs {}",
                a.ncols(),
                b.ncols()
            )));
        }
        let theta = self.theta_for(a.ncols())?;
        // Get pairwise componentwise differences
        let dx = pairwise_differences(a, b);
        let r = self.corr.value(&dx, &theta);
        Ok(r
            .into_shape((a.nrows(), b.nrows()))?
            .mapv(|v| v * self.variance))
    }

    /// Variances (n,) at points of `x` (n, nx), i.e. diagonal of `k(x, x)`
    pub fn k_diag(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F> {
        Array1::from_elem(x.nrows(), self.variance)
    }
}

impl<F: Float, Corr: CorrelationModel<F>> fmt::Display for Kernel<F, Corr> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}(theta={}, variance={})",
            self.corr, self.theta, self.variance
        )
    }
}
