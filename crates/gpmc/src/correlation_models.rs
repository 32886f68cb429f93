//! A module for stationary correlation models used to build GP kernels.
//!
//! The following correlation models are implemented:
//! * squared exponential,
//! * absolute exponential,
//! * matern 3/2,
//! * matern 5/2.
//!
//! Each model is parameterized by `theta`, a vector of inverse length-scales,
//! one per input component.

use linfa::Float;
use ndarray::{Array1, ArrayBase, Axis, Data, Ix1, Ix2, Zip};
use paste::paste;
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;

/// A trait for using a correlation model in GP kernels
pub trait CorrelationModel<F: Float>: Clone + Copy + Default + fmt::Display + Sync {
    /// Compute correlation values r(x, x') given differences `d` between x and x'
    /// and `theta` parameters, where:
    /// `theta` : hyperparameters (nx,)
    /// `d`     : differences (n, nx)
    /// Returns correlation values as (n,) vector.
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array1<F>;
}

/// Squared exponential correlation models
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(into = "String"),
    serde(try_from = "String")
)]
pub struct SquaredExponentialCorr();

impl<F: Float> CorrelationModel<F> for SquaredExponentialCorr {
    ///  nx
    /// prod exp( - |theta_j * d_j|^2 / 2 )
    ///  j=1
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array1<F> {
        let theta2 = theta.mapv(|v| v * v);
        let r = d.mapv(|v| v * v).dot(&theta2);
        r.mapv(|v| F::exp(F::cast(-0.5) * v))
    }
}

/// Absolute exponential correlation models
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(into = "String"),
    serde(try_from = "String")
)]
pub struct AbsoluteExponentialCorr();

impl<F: Float> CorrelationModel<F> for AbsoluteExponentialCorr {
    ///  nx
    /// prod exp( - theta_j * |d_j| )
    ///  j=1
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array1<F> {
        let r = d.mapv(|v| v.abs()).dot(theta);
        r.mapv(|v| F::exp(-v))
    }
}

/// Matern 3/2 correlation model
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(into = "String"),
    serde(try_from = "String")
)]
pub struct Matern32Corr();

impl<F: Float> CorrelationModel<F> for Matern32Corr {
    ///  nx
    /// prod (1 + sqrt(3) * theta_j * |d_j|) exp( - sqrt(3) * theta_j * |d_j| )
    ///  j=1
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array1<F> {
        let sqrt3 = F::cast(3.).sqrt();
        let d_theta = d.mapv(|v| v.abs()) * theta;
        let a = d_theta.map_axis(Axis(1), |row| {
            row.fold(F::one(), |acc, v| acc * (F::one() + sqrt3 * *v))
        });
        let b = d_theta.sum_axis(Axis(1)).mapv(|v| F::exp(-sqrt3 * v));
        a * b
    }
}

/// Matern 5/2 correlation model
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(into = "String"),
    serde(try_from = "String")
)]
pub struct Matern52Corr();

impl<F: Float> CorrelationModel<F> for Matern52Corr {
    ///  nx
    /// prod (1 + sqrt(5) * theta_j * |d_j| + (5./3.) * theta_j^2 * |d_j|^2) exp( - sqrt(5) * theta_j * |d_j| )
    ///  j=1
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array1<F> {
        let sqrt5 = F::cast(5.).sqrt();
        let div5_3 = F::cast(5. / 3.);
        let d_theta = d.mapv(|v| v.abs()) * theta;
        let mut a = Array1::ones(d.nrows());
        Zip::from(&mut a)
            .and(d_theta.rows())
            .for_each(|a_i, d_theta_i| {
                *a_i = d_theta_i.fold(F::one(), |acc, v| {
                    acc * (F::one() + sqrt5 * *v + div5_3 * *v * *v)
                });
            });
        let b = d_theta.sum_axis(Axis(1)).mapv(|v| F::exp(-sqrt5 * v));
        a * b
    }
}

macro_rules! declare_corr_util_impls {
    ($corr:ident) => {
        paste! {
            impl fmt::Display for [<$corr Corr>] {
                fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                    write!(f, "{}", stringify!($corr))
                }
            }

            impl From<[<$corr Corr>]> for String {
                fn from(_item: [<$corr Corr>]) -> String {
                    stringify!($corr).to_string()
                }
            }

            impl TryFrom<String> for [<$corr Corr>] {
                type Error = &'static str;
                fn try_from(s: String) -> Result<Self, Self::Error> {
                    if s == stringify!($corr) {
                        Ok(Self::default())
                    } else {
                        Err(concat!(
                            "Bad string value for ",
                            stringify!([<$corr Corr>]),
                            ", should be '",
                            stringify!($corr),
                            "'"
                        ))
                    }
                }
            }
        }
    };
}

declare_corr_util_impls!(SquaredExponential);
declare_corr_util_impls!(AbsoluteExponential);
declare_corr_util_impls!(Matern32);
declare_corr_util_impls!(Matern52);
