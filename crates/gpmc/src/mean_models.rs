//! A module for mean functions added to the latent GP.
//!
//! The following mean functions are implemented:
//! * zero,
//! * constant,
//! * linear (affine).
//!
//! Mean functions are deterministic: they shift the predictive mean and leave
//! the predictive variance untouched.

use crate::errors::{GpError, Result};
use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, Data, Ix2};
use paste::paste;
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// A trait for mean functions used in GP models
pub trait MeanFunction<F: Float>: Clone + fmt::Display + Sync {
    /// Mean values at the given `x` data points specified as (n, nx) matrix.
    /// Returns either a (n, 1) matrix broadcast over latent functions
    /// or a (n, nlatent) matrix.
    fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>>;
}

/// A zero function as mean of the GP
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct ZeroMean();

impl<F: Float> MeanFunction<F> for ZeroMean {
    fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        Ok(Array2::zeros((x.nrows(), 1)))
    }
}

/// A constant function as mean of the GP
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(serialize = "F: Serialize", deserialize = "F: Deserialize<'de>"))
)]
pub struct ConstantMean<F: Float> {
    c: Array1<F>,
}

impl<F: Float> ConstantMean<F> {
    /// Same constant `c` for every latent function
    pub fn new(c: F) -> Self {
        ConstantMean {
            c: Array1::from_elem(1, c),
        }
    }

    /// One constant per latent function
    pub fn per_latent(c: Array1<F>) -> Self {
        ConstantMean { c }
    }
}

impl<F: Float> MeanFunction<F> for ConstantMean<F> {
    fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        let c = self.c.view().insert_axis(ndarray::Axis(0));
        Ok(c.broadcast((x.nrows(), self.c.len()))
            .ok_or_else(|| GpError::InvalidValueError("Constant mean broadcast".to_string()))?
            .to_owned())
    }
}

/// An affine function `x A + b` as mean of the GP
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(serialize = "F: Serialize", deserialize = "F: Deserialize<'de>"))
)]
pub struct LinearMean<F: Float> {
    /// (nx, nlatent) matrix
    a: Array2<F>,
    /// (nlatent,) vector
    b: Array1<F>,
}

impl<F: Float> LinearMean<F> {
    /// Constructor, `a` is (nx, nlatent), `b` is (nlatent,)
    pub fn new(a: Array2<F>, b: Array1<F>) -> Result<Self> {
        if a.ncols() != b.len() {
            return Err(GpError::InvalidValueError(format!(
                "Linear mean coefficients mismatch: A has {} columns, b has {} values",
                a.ncols(),
                b.len()
            )));
        }
        Ok(LinearMean { a, b })
    }
}

impl<F: Float> MeanFunction<F> for LinearMean<F> {
    fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        if x.ncols() != self.a.nrows() {
            return Err(GpError::InvalidValueError(format!(
                "Linear mean expects {} input components, got {}",
                self.a.nrows(),
                x.ncols()
            )));
        }
        Ok(x.dot(&self.a) + &self.b)
    }
}

macro_rules! declare_mean_util_impls {
    ($mean:ident) => {
        paste! {
            impl<F: Float> fmt::Display for [<$mean Mean>]<F> {
                fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                    write!(f, "{}Mean", stringify!($mean))
                }
            }
        }
    };
}

declare_mean_util_impls!(Constant);
declare_mean_util_impls!(Linear);

impl fmt::Display for ZeroMean {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ZeroMean")
    }
}
