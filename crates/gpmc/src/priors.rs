//! Prior distributions attached to parameters.

use linfa::Float;
use ndarray::{ArrayBase, ArrayD, Data, Dimension};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Element-wise prior distribution
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum Prior<F: Float> {
    /// Normal distribution with given mean and variance
    Gaussian {
        /// Mean
        mu: F,
        /// Variance
        var: F,
    },
}

impl<F: Float> Prior<F> {
    /// Standard normal N(0, 1)
    pub fn standard_normal() -> Self {
        Prior::Gaussian {
            mu: F::zero(),
            var: F::one(),
        }
    }

    /// Log density summed over all elements of `x`
    pub fn log_density<D: Dimension>(&self, x: &ArrayBase<impl Data<Elem = F>, D>) -> F {
        match self {
            Prior::Gaussian { mu, var } => {
                let log_norm = F::cast(-0.5) * (F::cast(2. * std::f64::consts::PI) * *var).ln();
                x.fold(F::zero(), |acc, &v| {
                    acc + log_norm - (v - *mu) * (v - *mu) / (F::cast(2.) * *var)
                })
            }
        }
    }

    /// Gradient of [`Prior::log_density`] wrt `x`
    pub fn dlog_density<D: Dimension>(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, D>,
    ) -> ArrayD<F> {
        match self {
            Prior::Gaussian { mu, var } => x.mapv(|v| -(v - *mu) / *var).into_dyn(),
        }
    }
}

impl<F: Float> fmt::Display for Prior<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Prior::Gaussian { mu, var } => write!(f, "N({mu},{var})"),
        }
    }
}
