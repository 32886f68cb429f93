//! This library implements a sparse variational [Gaussian Process](https://en.wikipedia.org/wiki/Gaussian_process)
//! whose latent values at inducing points are sampled by MCMC (SGPMC).
//!
//! Given M inducing points Z, the latent GP values at Z are represented in whitened form
//! `U = Lm V` where `Lm` is the Cholesky factor of the inducing points covariance and `V`
//! is a (M, nlatent) parameter with a standard normal prior. Conditioned on `V`, the latent GP
//! at new points is gaussian, the posterior of `V` is explored by Hamiltonian Monte Carlo,
//! which allows non gaussian likelihoods (poisson, bernoulli) to be used.
//! The complexity of one evaluation is in O(N.M^2) in processing time where N is the
//! number of training points.
//!
//! SGPMC is implemented by [Sgpmc] parameterized by [SgpmcParams], sampling is
//! parameterized by [HmcParams] and returns [SgpmcSamples].
//!
//! The crate also provides the building blocks used along the way: correlation models and
//! kernels, mean functions, likelihoods, the gaussian conditional, and parameter utilities
//! (value predicates, numeric type normalization, vector to triangular matrix packing).
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
pub mod conditionals;
pub mod correlation_models;
mod dtype;
mod errors;
mod features;
mod hmc;
mod kernels;
pub mod likelihoods;
pub mod mean_models;
mod param_value;
mod parameter;
mod priors;
mod sgpmc_algorithm;
mod sgpmc_parameters;
mod triangular;
mod utils;

pub use conditionals::{conditional, Covariance, QSqrt};
pub use correlation_models::*;
pub use dtype::*;
pub use errors::*;
pub use features::*;
pub use hmc::*;
pub use kernels::*;
pub use likelihoods::{Bernoulli, Gaussian, Likelihood, Poisson};
pub use mean_models::*;
pub use param_value::*;
pub use parameter::*;
pub use priors::*;
pub use sgpmc_algorithm::*;
pub use sgpmc_parameters::*;
pub use triangular::*;
