use crate::conditionals::{conditional, projection, Covariance};
use crate::correlation_models::CorrelationModel;
use crate::errors::{GpError, Result};
use crate::features::{inducingpoint_wrapper, Inducings, InducingPoints};
use crate::kernels::Kernel;
use crate::likelihoods::Likelihood;
use crate::mean_models::{MeanFunction, ZeroMean};
use crate::parameter::Parameter;
use crate::priors::Prior;
use crate::sgpmc_parameters::{SgpmcParams, SgpmcValidParams};
use linfa::prelude::{DatasetBase, Fit, Float, PredictInplace};
use ndarray::{Array2, ArrayBase, Axis, Data, Ix2};
use ndarray_rand::rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

use log::debug;
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

#[cfg(feature = "persistent")]
use std::fs;
#[cfg(feature = "persistent")]
use std::io::Write;

/// Name of the whitened inducing values parameter
pub const V_NAME: &str = "V";

/// Sparse variational Gaussian process whose whitened inducing values `V` are
/// meant to be sampled by MCMC.
///
/// The latent GP values at inducing points are `U = Lm V` where `Lm` is the Cholesky
/// factor of the inducing points covariance and `V` has a standard normal prior.
/// The model carries no variational covariance: given `V`, inducing values are a point mass
/// and the uncertainty about them comes from sampling `V` (see [`Sgpmc::sample`]).
///
/// # Example
///
/// ```
/// use gpmc::{Gaussian, Inducings, Kernel, Sgpmc, SquaredExponentialCorr};
/// use linfa::prelude::{Dataset, Fit};
/// use ndarray::{array, Array, Axis};
///
/// let xt = Array::linspace(0., 1., 20).insert_axis(Axis(1));
/// let yt = xt.mapv(|x: f64| (6. * x).sin());
///
/// let kernel = Kernel::new(SquaredExponentialCorr(), array![5.], 1.).unwrap();
/// let model = Sgpmc::params(kernel, Gaussian::new(0.01).unwrap(), Inducings::Randomized(5))
///     .seed(Some(42))
///     .fit(&Dataset::new(xt, yt))
///     .expect("SGPMC model built");
///
/// // whitened inducing values start at zero
/// assert_eq!(&[5, 1], model.v().shape());
/// let objective = model.compute_likelihood().expect("data fit term");
/// assert!(objective.is_finite());
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(
        serialize = "F: Serialize, Corr: Serialize, Mean: Serialize, Lik: Serialize",
        deserialize = "F: Deserialize<'de>, Corr: Deserialize<'de>, Mean: Deserialize<'de>, Lik: Deserialize<'de>"
    ))
)]
pub struct Sgpmc<F, Corr, Mean, Lik>
where
    F: Float,
    Corr: CorrelationModel<F>,
    Mean: MeanFunction<F>,
    Lik: Likelihood<F>,
{
    /// Covariance function
    kernel: Kernel<F, Corr>,
    /// Observation model
    likelihood: Lik,
    /// Mean function
    mean: Mean,
    /// Inducing points
    feature: InducingPoints<F>,
    /// Whitened inducing values (M, nlatent)
    v: Parameter<F>,
    /// Jitter added to Kuu diagonal
    jitter: F,
    /// Training inputs (N, nx)
    xt: Array2<F>,
    /// Training outputs (N, ny)
    yt: Array2<F>,
}

/// Part of the training data fit which does not depend on `V`: the projection
/// `A = Lm^-1 Kuf(X)`, the marginal variances and the mean function at training inputs.
#[derive(Debug, Clone)]
pub(crate) struct TrainingProjection<F: Float> {
    a: Array2<F>,
    fvar: Array2<F>,
    mean: Array2<F>,
}

/// Mean function values are either shared by latent functions (n, 1) or given per latent (n, nlatent)
fn check_mean_shape<F: Float>(mean: &Array2<F>, n: usize, num_latent: usize) -> Result<()> {
    if mean.nrows() != n || (mean.ncols() != 1 && mean.ncols() != num_latent) {
        return Err(GpError::InvalidValueError(format!(
            "Mean function values should have shape ({n}, 1) or ({n}, {num_latent}), got {:?}",
            mean.shape()
        )));
    }
    Ok(())
}

impl<F, Corr, Lik> Sgpmc<F, Corr, ZeroMean, Lik>
where
    F: Float,
    Corr: CorrelationModel<F>,
    Lik: Likelihood<F>,
{
    /// Sgpmc parameters builder
    pub fn params(
        kernel: Kernel<F, Corr>,
        likelihood: Lik,
        inducings: Inducings<F>,
    ) -> SgpmcParams<F, Corr, ZeroMean, Lik> {
        SgpmcParams::new(kernel, likelihood, inducings)
    }
}

impl<F, Corr, Mean, Lik> Sgpmc<F, Corr, Mean, Lik>
where
    F: Float,
    Corr: CorrelationModel<F>,
    Mean: MeanFunction<F>,
    Lik: Likelihood<F>,
{
    /// Current value of the whitened inducing values `V` as a (M, nlatent) matrix.
    ///
    /// This is a copy, use [`Sgpmc::set_v`] to change the model value.
    pub fn v(&self) -> Array2<F> {
        let value = self.v.value();
        Array2::from_shape_fn((self.feature.len(), self.num_latent()), |(i, j)| {
            value[[i, j]]
        })
    }

    /// Set whitened inducing values, `v` has to be a (M, nlatent) matrix
    pub fn set_v(&mut self, v: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<()> {
        self.v.assign(v)
    }

    /// Trainable parameters of the model
    pub fn parameters(&self) -> Vec<&Parameter<F>> {
        vec![&self.v]
    }

    /// Covariance function
    pub fn kernel(&self) -> &Kernel<F, Corr> {
        &self.kernel
    }

    /// Likelihood
    pub fn likelihood(&self) -> &Lik {
        &self.likelihood
    }

    /// Mean function
    pub fn mean_function(&self) -> &Mean {
        &self.mean
    }

    /// Inducing points
    pub fn feature(&self) -> &InducingPoints<F> {
        &self.feature
    }

    /// Jitter added to the inducing points covariance
    pub fn jitter(&self) -> F {
        self.jitter
    }

    /// Number of training points N
    pub fn num_data(&self) -> usize {
        self.xt.nrows()
    }

    /// Number of latent functions
    pub fn num_latent(&self) -> usize {
        self.v.shape()[1]
    }

    /// Training dataset (X, Y)
    pub fn training_data(&self) -> (&Array2<F>, &Array2<F>) {
        (&self.xt, &self.yt)
    }

    /// Sum over training points and outputs of the variational expectations of
    /// the likelihood under the marginals of the latent GP at training inputs.
    ///
    /// This is the data fit term only, see [`Sgpmc::log_joint`] for the density including
    /// the `V` prior.
    pub fn compute_likelihood(&self) -> Result<F> {
        let (fmean, cov) = self.predict_f(&self.xt, false)?;
        let ve = self
            .likelihood
            .variational_expectations(&fmean, &cov.marginals(), &self.yt)?;
        Ok(ve.sum())
    }

    /// Log prior density of the current `V`
    pub fn log_prior(&self) -> F {
        self.v.log_prior()
    }

    /// Unnormalized log posterior density of the current `V`
    pub fn log_joint(&self) -> Result<F> {
        Ok(self.compute_likelihood()? + self.log_prior())
    }

    /// Unnormalized log posterior density at `v` and its gradient wrt `v`
    pub fn log_joint_and_grad(
        &self,
        v: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<(F, Array2<F>)> {
        let proj = self.training_projection()?;
        self.log_joint_and_grad_with(&proj, v)
    }

    pub(crate) fn training_projection(&self) -> Result<TrainingProjection<F>> {
        let (_, a) = projection(&self.feature, &self.kernel, &self.xt, self.jitter)?;
        let var = self.kernel.k_diag(&self.xt) - (&a * &a).sum_axis(Axis(0));
        let fvar = Array2::from_shape_fn((self.num_data(), self.num_latent()), |(i, _)| var[i]);
        let mean = self.mean_value(&self.xt)?;
        Ok(TrainingProjection { a, fvar, mean })
    }

    pub(crate) fn log_joint_and_grad_with(
        &self,
        proj: &TrainingProjection<F>,
        v: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<(F, Array2<F>)> {
        if v.shape() != self.v.shape() {
            return Err(GpError::InvalidValueError(format!(
                "V should have shape {:?}, got {:?}",
                self.v.shape(),
                v.shape()
            )));
        }
        let fmean = proj.a.t().dot(v) + &proj.mean;
        let ve = self
            .likelihood
            .variational_expectations(&fmean, &proj.fvar, &self.yt)?;
        let dve = self
            .likelihood
            .dvariational_expectations_dmean(&fmean, &proj.fvar, &self.yt)?;
        let mut grad = proj.a.dot(&dve);
        let mut value = ve.sum();
        if let Some(prior) = self.v.prior() {
            value += prior.log_density(v);
            grad += &prior.dlog_density(v).into_dimensionality::<Ix2>()?;
        }
        Ok((value, grad))
    }

    /// Mean (n, nlatent) and covariance of the latent GP at `xnew` given the current `V`.
    ///
    /// The mean function is added to the mean, the covariance is left untouched.
    pub fn predict_f(
        &self,
        xnew: &ArrayBase<impl Data<Elem = F>, Ix2>,
        full_cov: bool,
    ) -> Result<(Array2<F>, Covariance<F>)> {
        self.predict_f_at(&self.v(), xnew, full_cov)
    }

    /// Same as [`Sgpmc::predict_f`] for given whitened inducing values `v` (M, nlatent)
    pub fn predict_f_at(
        &self,
        v: &ArrayBase<impl Data<Elem = F>, Ix2>,
        xnew: &ArrayBase<impl Data<Elem = F>, Ix2>,
        full_cov: bool,
    ) -> Result<(Array2<F>, Covariance<F>)> {
        if v.shape() != self.v.shape() {
            return Err(GpError::InvalidValueError(format!(
                "V should have shape {:?}, got {:?}",
                self.v.shape(),
                v.shape()
            )));
        }
        let (mean, cov) = conditional(
            &self.feature,
            &self.kernel,
            xnew,
            v,
            full_cov,
            None,
            true,
            self.jitter,
        )?;
        Ok((mean + &self.mean_value(xnew)?, cov))
    }

    fn mean_value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        let mean = self.mean.value(x)?;
        check_mean_shape(&mean, x.nrows(), self.num_latent())?;
        Ok(mean)
    }

    /// Predict latent mean (n, nlatent) at `x` points given as (n, nx) matrix
    pub fn predict(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        Ok(self.predict_f(x, false)?.0)
    }

    /// Predict latent marginal variances (n, nlatent) at `x` points
    pub fn predict_var(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        Ok(self.predict_f(x, false)?.1.marginals())
    }

    /// Mean and variance of observations at `xnew`
    pub fn predict_y(
        &self,
        xnew: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<(Array2<F>, Array2<F>)> {
        let (fmean, cov) = self.predict_f(xnew, false)?;
        self.likelihood.predict_mean_and_var(&fmean, &cov.marginals())
    }

    /// Log predictive density of observations `ynew` at `xnew`
    pub fn predict_log_density(
        &self,
        xnew: &ArrayBase<impl Data<Elem = F>, Ix2>,
        ynew: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<Array2<F>> {
        let (fmean, cov) = self.predict_f(xnew, false)?;
        self.likelihood
            .predict_log_density(&fmean, &cov.marginals(), ynew)
    }
}

#[cfg(feature = "persistent")]
impl<F, Corr, Mean, Lik> Sgpmc<F, Corr, Mean, Lik>
where
    F: Float + Serialize + for<'de> Deserialize<'de>,
    Corr: CorrelationModel<F> + Serialize + for<'de> Deserialize<'de>,
    Mean: MeanFunction<F> + Serialize + for<'de> Deserialize<'de>,
    Lik: Likelihood<F> + Serialize + for<'de> Deserialize<'de>,
{
    /// Save model in given file as json.
    pub fn save(&self, path: &str) -> Result<()> {
        let mut file = fs::File::create(path)?;
        let bytes = serde_json::to_vec(self)?;
        file.write_all(&bytes)?;
        Ok(())
    }

    /// Load model from given json file.
    pub fn load(path: &str) -> Result<Box<Self>> {
        let data = fs::read(path)?;
        let model = serde_json::from_slice(&data).map_err(|e| GpError::LoadError(e.to_string()))?;
        Ok(Box::new(model))
    }
}

impl<F, Corr, Mean, Lik> fmt::Display for Sgpmc<F, Corr, Mean, Lik>
where
    F: Float,
    Corr: CorrelationModel<F>,
    Mean: MeanFunction<F>,
    Lik: Likelihood<F>,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Sgpmc(kernel={}, likelihood={}, mean={}, {}, {})",
            self.kernel, self.likelihood, self.mean, self.feature, self.v
        )
    }
}

impl<F, D, Corr, Mean, Lik> PredictInplace<ArrayBase<D, Ix2>, Array2<F>> for Sgpmc<F, Corr, Mean, Lik>
where
    F: Float,
    D: Data<Elem = F>,
    Corr: CorrelationModel<F>,
    Mean: MeanFunction<F>,
    Lik: Likelihood<F>,
{
    fn predict_inplace(&self, x: &ArrayBase<D, Ix2>, y: &mut Array2<F>) {
        assert_eq!(
            x.nrows(),
            y.nrows(),
            "The number of data points must match the number of output targets."
        );

        let values = self.predict(x).expect("SGPMC Prediction");
        *y = values;
    }

    fn default_target(&self, x: &ArrayBase<D, Ix2>) -> Array2<F> {
        Array2::zeros((x.nrows(), self.num_latent()))
    }
}

impl<F, D, Corr, Mean, Lik> Fit<ArrayBase<D, Ix2>, ArrayBase<D, Ix2>, GpError>
    for SgpmcValidParams<F, Corr, Mean, Lik>
where
    F: Float,
    D: Data<Elem = F> + Sync,
    Corr: CorrelationModel<F>,
    Mean: MeanFunction<F>,
    Lik: Likelihood<F>,
{
    type Object = Sgpmc<F, Corr, Mean, Lik>;

    /// Build the model: pick inducing points and allocate zero whitened values
    fn fit(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, ArrayBase<D, Ix2>>,
    ) -> Result<Self::Object> {
        let now = Instant::now();
        let x = dataset.records();
        let y = dataset.targets();
        if x.nrows() == 0 || x.nrows() != y.nrows() {
            return Err(GpError::InvalidValueError(format!(
                "Training data should have the same positive number of rows, got {} inputs and {} outputs",
                x.nrows(),
                y.nrows()
            )));
        }

        let mut rng = match self.seed() {
            Some(seed) => Xoshiro256Plus::seed_from_u64(*seed),
            None => Xoshiro256Plus::from_entropy(),
        };
        let feature = inducingpoint_wrapper(self.inducings(), x, &mut rng)?;

        let num_latent = self.num_latent().unwrap_or(y.ncols());
        check_mean_shape(&self.mean_function().value(x)?, x.nrows(), num_latent)?;
        let v = Parameter::new(
            Array2::<F>::zeros((feature.len(), num_latent)),
            V_NAME,
            self.numeric_settings(),
        )?
        .with_prior(Prior::standard_normal());

        debug!(
            "SGPMC built with {} training points, {} inducing points, {} latent functions in {:?}",
            x.nrows(),
            feature.len(),
            num_latent,
            now.elapsed()
        );
        Ok(Sgpmc {
            kernel: self.kernel().clone(),
            likelihood: *self.likelihood(),
            mean: self.mean_function().clone(),
            feature,
            v,
            jitter: self.jitter(),
            xt: x.to_owned(),
            yt: y.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation_models::{Matern52Corr, SquaredExponentialCorr};
    use crate::likelihoods::{Gaussian, Poisson};
    use crate::mean_models::{ConstantMean, LinearMean};
    use approx::assert_abs_diff_eq;
    use finitediff::FiniteDiff;
    use linfa::prelude::{Dataset, ParamGuard};
    use ndarray::{array, concatenate, Array, Array1};
    use ndarray_rand::rand_distr::StandardNormal;
    use ndarray_rand::RandomExt;

    fn training_data() -> (Array2<f64>, Array2<f64>) {
        let xt: Array2<f64> = Array::linspace(0., 1., 20).insert_axis(Axis(1));
        let yt = xt.mapv(|x| (6. * x).sin() + 0.3 * x);
        (xt, yt)
    }

    fn rbf() -> Kernel<f64, SquaredExponentialCorr> {
        Kernel::new(SquaredExponentialCorr(), array![4.], 1.2).unwrap()
    }

    #[test]
    fn test_construction() {
        let (xt, yt) = training_data();
        let model = Sgpmc::params(rbf(), Gaussian::new(0.01).unwrap(), Inducings::Randomized(6))
            .seed(Some(42))
            .fit(&Dataset::new(xt, yt))
            .expect("SGPMC fit");
        assert_eq!(Array2::<f64>::zeros((6, 1)), model.v());
        assert_eq!(20, model.num_data());
        assert_eq!(1, model.num_latent());
        assert_eq!(6, model.feature().len());

        let params = model.parameters();
        assert_eq!(1, params.len());
        assert_eq!("V", params[0].name());
        assert_eq!(Some(&Prior::standard_normal()), params[0].prior());
        assert_eq!("V: shape=[6, 1], dtype=float64, prior=N(0,1)", params[0].to_string());
    }

    #[test]
    fn test_construction_num_latent_override() {
        let (xt, yt) = training_data();
        let z = array![[0.1], [0.5], [0.9]];
        let model = Sgpmc::params(rbf(), Gaussian::new(0.01).unwrap(), Inducings::Located(z))
            .num_latent(Some(3))
            .fit(&Dataset::new(xt, yt))
            .expect("SGPMC fit");
        assert_eq!(&[3, 3], model.v().shape());
        assert!(model.v().iter().all(|v| *v == 0.));
    }

    #[test]
    fn test_construction_errors() {
        let (xt, _) = training_data();
        let res = Sgpmc::params(
            rbf(),
            Gaussian::new(0.01).unwrap(),
            Inducings::Located(array![[0., 1.]]),
        )
        .fit(&Dataset::new(xt.to_owned(), xt));
        assert!(res.is_err());
    }

    #[test]
    fn test_zero_v_predicts_mean_function() {
        let (xt, yt) = training_data();
        let model = Sgpmc::params(rbf(), Gaussian::new(0.01).unwrap(), Inducings::Randomized(5))
            .mean_function(ConstantMean::new(1.5))
            .seed(Some(42))
            .fit(&Dataset::new(xt.to_owned(), yt))
            .expect("SGPMC fit");
        let (mean, cov) = model.predict_f(&xt, false).unwrap();
        assert_eq!(Array2::from_elem((20, 1), 1.5), mean);
        let var = cov.marginals();
        assert!(var.iter().all(|v| *v >= -1e-10 && *v <= 1.2 + 1e-10));

        // two outputs with an affine mean function
        let yt2 = concatenate![Axis(1), xt.mapv(|x| x.sin()), xt.mapv(|x| x.cos())];
        let lin = LinearMean::new(array![[2., -1.]], array![0.5, 0.]).unwrap();
        let model = Sgpmc::params(rbf(), Gaussian::new(0.01).unwrap(), Inducings::Randomized(5))
            .mean_function(lin.clone())
            .seed(Some(0))
            .fit(&Dataset::new(xt.to_owned(), yt2))
            .expect("SGPMC fit");
        let xnew = array![[0.25], [2.]];
        let (mean, cov) = model.predict_f(&xnew, true).unwrap();
        assert_eq!(lin.value(&xnew).unwrap(), mean);
        assert!(matches!(cov, Covariance::Full(ref c) if c.shape() == [2, 2, 2]));
    }

    #[test]
    fn test_compute_likelihood() {
        let (xt, yt) = training_data();
        let lik = Gaussian::new(0.05).unwrap();
        let mut model = Sgpmc::params(rbf(), lik, Inducings::Randomized(8))
            .seed(Some(42))
            .fit(&Dataset::new(xt.to_owned(), yt.to_owned()))
            .expect("SGPMC fit");
        let l1 = model.compute_likelihood().unwrap();
        let l2 = model.compute_likelihood().unwrap();
        assert_eq!(l1, l2);

        // with zero V, f marginals are N(0, var)
        let var = model.predict_var(&xt).unwrap();
        let expected: f64 = yt
            .iter()
            .zip(var.iter())
            .map(|(y, v)| -0.5 * (2. * std::f64::consts::PI * 0.05).ln() - 0.5 * (y * y + v) / 0.05)
            .sum();
        assert_abs_diff_eq!(expected, l1, epsilon = 1e-10);

        let log_prior = 8. * -0.5 * (2. * std::f64::consts::PI).ln();
        assert_abs_diff_eq!(log_prior, model.log_prior(), epsilon = 1e-12);
        assert_abs_diff_eq!(l1 + log_prior, model.log_joint().unwrap(), epsilon = 1e-10);

        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let v: Array2<f64> = Array2::random_using((8, 1), StandardNormal, &mut rng);
        model.set_v(&v).unwrap();
        assert_eq!(v, model.v());
        assert_ne!(l1, model.compute_likelihood().unwrap());
        assert!(model.set_v(&Array2::zeros((8, 2))).is_err());
    }

    #[test]
    fn test_mean_function_width_mismatch() {
        let (xt, yt) = training_data();
        let res = Sgpmc::params(rbf(), Gaussian::new(0.01).unwrap(), Inducings::Randomized(5))
            .mean_function(ConstantMean::per_latent(array![1., 2., 3.]))
            .num_latent(Some(2))
            .seed(Some(42))
            .fit(&Dataset::new(xt.to_owned(), yt.to_owned()));
        assert!(matches!(res, Err(GpError::InvalidValueError(_))));

        let res = Sgpmc::params(rbf(), Gaussian::new(0.01).unwrap(), Inducings::Randomized(5))
            .mean_function(LinearMean::new(array![[1., 2.]], array![0., 0.]).unwrap())
            .seed(Some(42))
            .fit(&Dataset::new(xt.to_owned(), yt.to_owned()));
        assert!(matches!(res, Err(GpError::InvalidValueError(_))));

        let model = Sgpmc::params(rbf(), Gaussian::new(0.01).unwrap(), Inducings::Randomized(5))
            .mean_function(ConstantMean::new(1.))
            .num_latent(Some(2))
            .seed(Some(42))
            .fit(&Dataset::new(xt.to_owned(), yt))
            .expect("SGPMC fit");
        let model = Sgpmc {
            mean: ConstantMean::per_latent(array![1., 2., 3.]),
            ..model
        };
        assert!(matches!(
            model.predict_f(&xt, false),
            Err(GpError::InvalidValueError(_))
        ));
        assert!(matches!(
            model.log_joint_and_grad(&Array2::<f64>::zeros((5, 2))),
            Err(GpError::InvalidValueError(_))
        ));
        assert!(model.compute_likelihood().is_err());
    }

    #[test]
    fn test_v_shape_checked_on_evaluation() {
        let (xt, yt) = training_data();
        let model = Sgpmc::params(rbf(), Gaussian::new(0.01).unwrap(), Inducings::Randomized(5))
            .seed(Some(42))
            .fit(&Dataset::new(xt.to_owned(), yt))
            .expect("SGPMC fit");
        let wide = Array2::<f64>::zeros((5, 2));
        assert!(matches!(
            model.log_joint_and_grad(&wide),
            Err(GpError::InvalidValueError(_))
        ));
        assert!(matches!(
            model.predict_f_at(&wide, &xt, false),
            Err(GpError::InvalidValueError(_))
        ));
        assert!(model.predict_f_at(&Array2::<f64>::zeros((4, 1)), &xt, true).is_err());
        assert!(model.log_joint_and_grad(&Array2::<f64>::zeros((5, 1))).is_ok());
    }

    fn check_gradient<Lik: Likelihood<f64>>(lik: Lik, yt: Array2<f64>) {
        let (xt, _) = training_data();
        let kernel = Kernel::new(Matern52Corr(), array![3.], 0.8).unwrap();
        let model = Sgpmc::params(kernel, lik, Inducings::Randomized(5))
            .mean_function(ConstantMean::new(0.2))
            .seed(Some(1))
            .fit(&Dataset::new(xt, yt))
            .expect("SGPMC fit");

        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let v: Array2<f64> = Array2::random_using((5, 1), StandardNormal, &mut rng);
        let (value, grad) = model.log_joint_and_grad(&v).unwrap();

        let mut other = model.clone();
        other.set_v(&v).unwrap();
        assert_abs_diff_eq!(other.log_joint().unwrap(), value, epsilon = 1e-9);

        let f = |x: &Vec<f64>| -> f64 {
            let v = Array2::from_shape_vec((5, 1), x.to_vec()).unwrap();
            model.log_joint_and_grad(&v).unwrap().0
        };
        let grad_central = v.iter().cloned().collect::<Vec<_>>().central_diff(&f);
        let grad_central = Array1::from_vec(grad_central).into_shape((5, 1)).unwrap();
        assert_abs_diff_eq!(grad_central, grad, epsilon = 1e-4);
    }

    #[test]
    fn test_log_joint_gradient_gaussian() {
        let (xt, _) = training_data();
        check_gradient(Gaussian::new(0.1).unwrap(), xt.mapv(|x| (6. * x).sin()));
    }

    #[test]
    fn test_log_joint_gradient_poisson() {
        let (xt, _) = training_data();
        check_gradient(Poisson::default(), xt.mapv(|x| (3. * x).round()));
    }

    #[test]
    fn test_predict_y() {
        let (xt, yt) = training_data();
        let model = Sgpmc::params(rbf(), Gaussian::new(0.1).unwrap(), Inducings::Randomized(5))
            .seed(Some(42))
            .fit(&Dataset::new(xt.to_owned(), yt.to_owned()))
            .expect("SGPMC fit");
        let xnew = array![[0.3], [0.6]];
        let (ymean, yvar) = model.predict_y(&xnew).unwrap();
        assert_abs_diff_eq!(model.predict(&xnew).unwrap(), ymean);
        assert_abs_diff_eq!(
            model.predict_var(&xnew).unwrap().mapv(|v| v + 0.1),
            yvar,
            epsilon = 1e-12
        );
        let lpd = model.predict_log_density(&xnew, &array![[0.], [1.]]).unwrap();
        assert_eq!(&[2, 1], lpd.shape());
        assert!(lpd.iter().all(|v| v.is_finite()));

        let mut y = model.default_target(&xnew);
        model.predict_inplace(&xnew, &mut y);
        assert_abs_diff_eq!(ymean, y);
        assert!(model.to_string().starts_with(
            "Sgpmc(kernel=SquaredExponential(theta=[4], variance=1.2), likelihood=Gaussian(variance=0.1), mean=ZeroMean"
        ));
    }

    #[test]
    fn test_params_guard_used_by_fit() {
        let (xt, yt) = training_data();
        let res = Sgpmc::params(rbf(), Gaussian::new(0.1).unwrap(), Inducings::Randomized(5))
            .jitter(-1.)
            .fit(&Dataset::new(xt, yt));
        assert!(res.is_err());
        let params = Sgpmc::params(rbf(), Gaussian::new(0.1).unwrap(), Inducings::Randomized(5));
        assert!(params.check_ref().is_ok());
    }

    #[cfg(feature = "persistent")]
    #[test]
    fn test_save_load() {
        let (xt, yt) = training_data();
        let mut model = Sgpmc::params(rbf(), Gaussian::new(0.1).unwrap(), Inducings::Randomized(5))
            .seed(Some(42))
            .fit(&Dataset::new(xt, yt))
            .expect("SGPMC fit");
        model.set_v(&array![[0.1], [0.2], [-0.3], [0.4], [0.]]).unwrap();
        let test_dir = "target/tests";
        std::fs::create_dir_all(test_dir).ok();
        let file_path = format!("{test_dir}/sgpmc.json");
        model.save(&file_path).expect("SGPMC saved");
        let loaded = Sgpmc::<f64, SquaredExponentialCorr, ZeroMean, Gaussian<f64>>::load(&file_path)
            .expect("SGPMC loaded");
        let xnew = array![[0.3], [0.6]];
        assert_abs_diff_eq!(
            model.predict(&xnew).unwrap(),
            loaded.predict(&xnew).unwrap(),
            epsilon = 1e-12
        );
    }
}
