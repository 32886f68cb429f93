use crate::correlation_models::CorrelationModel;
use crate::errors::{GpError, Result};
use crate::kernels::Kernel;
use linfa::Float;
use log::warn;
use ndarray::{Array1, Array2, ArrayBase, Data, Ix2, Zip};
use ndarray_rand::rand::seq::SliceRandom;
use rand_xoshiro::Xoshiro256Plus;
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inducing points specification
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(deserialize = "F: Deserialize<'de>"))
)]
pub enum Inducings<F: Float> {
    /// `usize` points are selected randomly in the training dataset
    Randomized(usize),
    /// Points are given as a (npoints, nx) matrix
    Located(Array2<F>),
}

impl<F: Float> Default for Inducings<F> {
    fn default() -> Inducings<F> {
        Self::Randomized(10)
    }
}

/// Inducing point locations `Z` (M, nx) summarizing the latent GP
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(serialize = "F: Serialize", deserialize = "F: Deserialize<'de>"))
)]
pub struct InducingPoints<F: Float> {
    z: Array2<F>,
}

impl<F: Float> InducingPoints<F> {
    /// Wrap (M, nx) locations, M has to be positive
    pub fn new(z: Array2<F>) -> Result<Self> {
        if z.nrows() == 0 || z.ncols() == 0 {
            return Err(GpError::InvalidValueError(format!(
                "Inducing points should be a non empty matrix, got shape {:?}",
                z.shape()
            )));
        }
        Ok(InducingPoints { z })
    }

    /// Inducing locations
    pub fn z(&self) -> &Array2<F> {
        &self.z
    }

    /// Number of inducing points M
    pub fn len(&self) -> usize {
        self.z.nrows()
    }

    /// Always false once built
    pub fn is_empty(&self) -> bool {
        self.z.nrows() == 0
    }

    /// Covariance between inducing points with `jitter` added on the diagonal (M, M)
    pub fn kuu<Corr: CorrelationModel<F>>(
        &self,
        kernel: &Kernel<F, Corr>,
        jitter: F,
    ) -> Result<Array2<F>> {
        let mut kuu = kernel.k(&self.z, &self.z)?;
        kuu.diag_mut().mapv_inplace(|v| v + jitter);
        Ok(kuu)
    }

    /// Cross covariance between inducing points and `x` (M, n)
    pub fn kuf<Corr: CorrelationModel<F>>(
        &self,
        kernel: &Kernel<F, Corr>,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<Array2<F>> {
        kernel.k(&self.z, x)
    }
}

impl<F: Float> fmt::Display for InducingPoints<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InducingPoints(M={}, nx={})", self.z.nrows(), self.z.ncols())
    }
}

/// Build inducing points from their specification, random ones are picked
/// among `xt` training rows without replacement.
pub fn inducingpoint_wrapper<F: Float>(
    inducings: &Inducings<F>,
    xt: &ArrayBase<impl Data<Elem = F>, Ix2>,
    rng: &mut Xoshiro256Plus,
) -> Result<InducingPoints<F>> {
    match inducings {
        Inducings::Randomized(n) => {
            if *n > xt.nrows() {
                warn!(
                    "{} inducing points requested from {} training points, using {}",
                    n,
                    xt.nrows(),
                    xt.nrows()
                );
            }
            InducingPoints::new(make_inducings(*n, xt, rng))
        }
        Inducings::Located(z) => {
            if z.ncols() != xt.ncols() {
                return Err(GpError::InvalidValueError(format!(
                    "Inducing points dimension {} does not match input dimension {}",
                    z.ncols(),
                    xt.ncols()
                )));
            }
            InducingPoints::new(z.to_owned())
        }
    }
}

fn make_inducings<F: Float>(
    n_inducing: usize,
    xt: &ArrayBase<impl Data<Elem = F>, Ix2>,
    rng: &mut Xoshiro256Plus,
) -> Array2<F> {
    let mut indices = (0..xt.nrows()).collect::<Vec<_>>();
    indices.shuffle(rng);
    let n = n_inducing.min(xt.nrows());
    let mut z = Array2::zeros((n, xt.ncols()));
    let idx = indices[..n].to_vec();
    Zip::from(z.rows_mut())
        .and(&Array1::from_vec(idx))
        .for_each(|mut zi, i| zi.assign(&xt.row(*i)));
    z
}
