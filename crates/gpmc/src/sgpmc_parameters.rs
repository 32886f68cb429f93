use crate::correlation_models::CorrelationModel;
use crate::dtype::{NumType, NumericSettings};
use crate::errors::{GpError, Result};
use crate::features::Inducings;
use crate::kernels::Kernel;
use crate::likelihoods::Likelihood;
use crate::mean_models::{MeanFunction, ZeroMean};
use linfa::{Float, ParamGuard};
use ndarray::Array2;

/// Default jitter added to the inducing points covariance diagonal
pub const SGPMC_DEFAULT_JITTER: f64 = 1e-6;

/// A set of validated SGPMC parameters.
#[derive(Clone, Debug)]
pub struct SgpmcValidParams<F, Corr, Mean, Lik>
where
    F: Float,
    Corr: CorrelationModel<F>,
    Mean: MeanFunction<F>,
    Lik: Likelihood<F>,
{
    /// Covariance function of the latent GP
    pub(crate) kernel: Kernel<F, Corr>,
    /// Observation model
    pub(crate) likelihood: Lik,
    /// Mean function of the latent GP
    pub(crate) mean: Mean,
    /// Inducing points specification
    pub(crate) z: Inducings<F>,
    /// Number of latent functions, output dimension when `None`
    pub(crate) num_latent: Option<usize>,
    /// Jitter added to Kuu diagonal
    pub(crate) jitter: F,
    /// Random generator seed used to pick inducing points
    pub(crate) seed: Option<u64>,
    /// Canonical numeric types of parameters
    pub(crate) numeric_settings: NumericSettings,
}

impl<F, Corr, Mean, Lik> SgpmcValidParams<F, Corr, Mean, Lik>
where
    F: Float,
    Corr: CorrelationModel<F>,
    Mean: MeanFunction<F>,
    Lik: Likelihood<F>,
{
    /// Get kernel
    pub fn kernel(&self) -> &Kernel<F, Corr> {
        &self.kernel
    }

    /// Get likelihood
    pub fn likelihood(&self) -> &Lik {
        &self.likelihood
    }

    /// Get mean function
    pub fn mean_function(&self) -> &Mean {
        &self.mean
    }

    /// Get inducing points specification
    pub fn inducings(&self) -> &Inducings<F> {
        &self.z
    }

    /// Get the number of latent functions if specified
    pub fn num_latent(&self) -> Option<usize> {
        self.num_latent
    }

    /// Get jitter
    pub fn jitter(&self) -> F {
        self.jitter
    }

    /// Get seed
    pub fn seed(&self) -> Option<&u64> {
        self.seed.as_ref()
    }

    /// Get numeric settings
    pub fn numeric_settings(&self) -> &NumericSettings {
        &self.numeric_settings
    }
}

#[derive(Clone, Debug)]
/// The set of hyperparameters that can be specified for the construction of
/// a [SGPMC model](crate::Sgpmc).
pub struct SgpmcParams<F, Corr, Mean, Lik>(SgpmcValidParams<F, Corr, Mean, Lik>)
where
    F: Float,
    Corr: CorrelationModel<F>,
    Mean: MeanFunction<F>,
    Lik: Likelihood<F>;

impl<F, Corr, Lik> SgpmcParams<F, Corr, ZeroMean, Lik>
where
    F: Float,
    Corr: CorrelationModel<F>,
    Lik: Likelihood<F>,
{
    /// A constructor for SGPMC parameters given kernel, likelihood and inducing points
    /// with a zero mean function.
    pub fn new(
        kernel: Kernel<F, Corr>,
        likelihood: Lik,
        inducings: Inducings<F>,
    ) -> SgpmcParams<F, Corr, ZeroMean, Lik> {
        Self(SgpmcValidParams {
            kernel,
            likelihood,
            mean: ZeroMean(),
            z: inducings,
            num_latent: None,
            jitter: F::cast(SGPMC_DEFAULT_JITTER),
            seed: None,
            numeric_settings: NumericSettings::for_float::<F>(),
        })
    }
}

impl<F, Corr, Mean, Lik> SgpmcParams<F, Corr, Mean, Lik>
where
    F: Float,
    Corr: CorrelationModel<F>,
    Mean: MeanFunction<F>,
    Lik: Likelihood<F>,
{
    /// A constructor for SGPMC parameters from validated parameters
    pub fn new_from_valid(params: &SgpmcValidParams<F, Corr, Mean, Lik>) -> Self {
        Self(params.clone())
    }

    /// Set mean function.
    pub fn mean_function<M: MeanFunction<F>>(self, mean: M) -> SgpmcParams<F, Corr, M, Lik> {
        let p = self.0;
        SgpmcParams(SgpmcValidParams {
            kernel: p.kernel,
            likelihood: p.likelihood,
            mean,
            z: p.z,
            num_latent: p.num_latent,
            jitter: p.jitter,
            seed: p.seed,
            numeric_settings: p.numeric_settings,
        })
    }

    /// Set kernel.
    pub fn kernel(mut self, kernel: Kernel<F, Corr>) -> Self {
        self.0.kernel = kernel;
        self
    }

    /// Set likelihood.
    pub fn likelihood(mut self, likelihood: Lik) -> Self {
        self.0.likelihood = likelihood;
        self
    }

    /// Specify nz inducing points as (nz, x_dim) matrix.
    pub fn inducings(mut self, z: Array2<F>) -> Self {
        self.0.z = Inducings::Located(z);
        self
    }

    /// Specify nz number of inducing points which will be picked randomly in the input training dataset.
    pub fn n_inducings(mut self, nz: usize) -> Self {
        self.0.z = Inducings::Randomized(nz);
        self
    }

    /// Set the number of latent functions, defaults to the output dimension.
    pub fn num_latent(mut self, num_latent: Option<usize>) -> Self {
        self.0.num_latent = num_latent;
        self
    }

    /// Set jitter.
    ///
    /// Jitter is added to the inducing points covariance to improve numerical stability
    pub fn jitter(mut self, jitter: F) -> Self {
        self.0.jitter = jitter;
        self
    }

    /// Set random generator seed.
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.0.seed = seed;
        self
    }

    /// Set canonical numeric types.
    ///
    /// The float type has to be the storage type `F` of the model values.
    pub fn numeric_settings(mut self, settings: NumericSettings) -> Self {
        self.0.numeric_settings = settings;
        self
    }
}

impl<F, Corr, Mean, Lik> From<SgpmcValidParams<F, Corr, Mean, Lik>> for SgpmcParams<F, Corr, Mean, Lik>
where
    F: Float,
    Corr: CorrelationModel<F>,
    Mean: MeanFunction<F>,
    Lik: Likelihood<F>,
{
    fn from(valid: SgpmcValidParams<F, Corr, Mean, Lik>) -> Self {
        SgpmcParams(valid)
    }
}

impl<F, Corr, Mean, Lik> ParamGuard for SgpmcParams<F, Corr, Mean, Lik>
where
    F: Float,
    Corr: CorrelationModel<F>,
    Mean: MeanFunction<F>,
    Lik: Likelihood<F>,
{
    type Checked = SgpmcValidParams<F, Corr, Mean, Lik>;
    type Error = GpError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        if self.0.num_latent == Some(0) {
            return Err(GpError::InvalidValueError(
                "`num_latent` cannot be 0!".to_string(),
            ));
        }
        if self.0.jitter < F::zero() {
            return Err(GpError::InvalidValueError(format!(
                "`jitter` should be non negative, got {}",
                self.0.jitter
            )));
        }
        if self.0.numeric_settings.float_type != NumType::of_float::<F>() {
            return Err(GpError::InvalidValueError(format!(
                "Float type {} does not match model values stored as {}",
                self.0.numeric_settings.float_type,
                NumType::of_float::<F>()
            )));
        }
        match &self.0.z {
            Inducings::Randomized(0) => {
                return Err(GpError::InvalidValueError(
                    "Number of inducing points cannot be 0!".to_string(),
                ))
            }
            Inducings::Located(z) if z.is_empty() => {
                return Err(GpError::InvalidValueError(
                    "Inducing points cannot be empty!".to_string(),
                ))
            }
            _ => (),
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
