//! Hamiltonian Monte Carlo sampling of the whitened inducing values of a [`Sgpmc`] model.
//!
//! Kernel, likelihood and mean function are kept fixed, only `V` is sampled from
//! its posterior `p(V | Y)` proportional to `exp(log_joint(V))`.
//! A static trajectory of `n_leapfrog` leapfrog steps with unit mass is used,
//! several chains may be run in parallel.

use crate::correlation_models::CorrelationModel;
use crate::errors::{GpError, Result};
use crate::likelihoods::Likelihood;
use crate::mean_models::MeanFunction;
use crate::sgpmc_algorithm::{Sgpmc, TrainingProjection};
use linfa::{Float, ParamGuard};
use ndarray::{Array2, ArrayBase, Data, Ix2, Zip};
use ndarray_rand::rand::{Rng, SeedableRng};
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use rand_xoshiro::Xoshiro256Plus;

use log::{debug, info, warn};
use rayon::prelude::*;
use std::time::Instant;

/// Below this rate a smaller step size should be used
const LOW_ACCEPTANCE_RATE: f64 = 0.1;

/// A set of validated HMC parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct HmcValidParams<F: Float> {
    /// Number of kept samples per chain
    n_samples: usize,
    /// Number of discarded iterations at the beginning of each chain
    n_burnin: usize,
    /// Keep one iteration out of `thin`
    thin: usize,
    /// Leapfrog step size
    step_size: F,
    /// Number of leapfrog steps per iteration
    n_leapfrog: usize,
    /// Random generator seed
    seed: Option<u64>,
    /// Number of chains
    n_chains: usize,
}

impl<F: Float> Default for HmcValidParams<F> {
    fn default() -> HmcValidParams<F> {
        HmcValidParams {
            n_samples: 100,
            n_burnin: 100,
            thin: 1,
            step_size: F::cast(0.05),
            n_leapfrog: 20,
            seed: None,
            n_chains: 1,
        }
    }
}

impl<F: Float> HmcValidParams<F> {
    /// Get number of kept samples per chain
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Get number of burn-in iterations
    pub fn n_burnin(&self) -> usize {
        self.n_burnin
    }

    /// Get thinning interval
    pub fn thin(&self) -> usize {
        self.thin
    }

    /// Get leapfrog step size
    pub fn step_size(&self) -> F {
        self.step_size
    }

    /// Get number of leapfrog steps
    pub fn n_leapfrog(&self) -> usize {
        self.n_leapfrog
    }

    /// Get seed
    pub fn seed(&self) -> Option<&u64> {
        self.seed.as_ref()
    }

    /// Get number of chains
    pub fn n_chains(&self) -> usize {
        self.n_chains
    }
}

#[derive(Clone, Debug, Default)]
/// The set of parameters that can be specified for sampling with [`Sgpmc::sample`].
pub struct HmcParams<F: Float>(HmcValidParams<F>);

impl<F: Float> HmcParams<F> {
    /// Default HMC parameters
    pub fn new() -> HmcParams<F> {
        Self(HmcValidParams::default())
    }

    /// Set number of kept samples per chain
    pub fn n_samples(mut self, n_samples: usize) -> Self {
        self.0.n_samples = n_samples;
        self
    }

    /// Set number of burn-in iterations
    pub fn n_burnin(mut self, n_burnin: usize) -> Self {
        self.0.n_burnin = n_burnin;
        self
    }

    /// Set thinning interval
    pub fn thin(mut self, thin: usize) -> Self {
        self.0.thin = thin;
        self
    }

    /// Set leapfrog step size
    pub fn step_size(mut self, step_size: F) -> Self {
        self.0.step_size = step_size;
        self
    }

    /// Set number of leapfrog steps per iteration
    pub fn n_leapfrog(mut self, n_leapfrog: usize) -> Self {
        self.0.n_leapfrog = n_leapfrog;
        self
    }

    /// Set random generator seed, chain `i` is seeded with `seed + i`
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.0.seed = seed;
        self
    }

    /// Set number of chains run in parallel
    pub fn n_chains(mut self, n_chains: usize) -> Self {
        self.0.n_chains = n_chains;
        self
    }
}

impl<F: Float> ParamGuard for HmcParams<F> {
    type Checked = HmcValidParams<F>;
    type Error = GpError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        let p = &self.0;
        for (name, value) in [
            ("n_samples", p.n_samples),
            ("thin", p.thin),
            ("n_leapfrog", p.n_leapfrog),
            ("n_chains", p.n_chains),
        ] {
            if value == 0 {
                return Err(GpError::InvalidValueError(format!("`{name}` cannot be 0!")));
            }
        }
        if p.step_size.is_nan() || p.step_size <= F::zero() {
            return Err(GpError::InvalidValueError(format!(
                "`step_size` should be positive, got {}",
                p.step_size
            )));
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

/// Samples of the whitened inducing values drawn by [`Sgpmc::sample`]
#[derive(Clone, Debug)]
pub struct SgpmcSamples<F: Float> {
    /// `V` samples, chains one after the other
    samples: Vec<Array2<F>>,
    /// Log joint density of each sample
    log_joint: Vec<F>,
    /// Rate of accepted proposals after burn-in over all chains
    acceptance_rate: F,
}

impl<F: Float> SgpmcSamples<F> {
    /// `V` samples
    pub fn samples(&self) -> &[Array2<F>] {
        &self.samples
    }

    /// Log joint density of each sample
    pub fn log_joint(&self) -> &[F] {
        &self.log_joint
    }

    /// Acceptance rate
    pub fn acceptance_rate(&self) -> F {
        self.acceptance_rate
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether there is no sample
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample mean of `V`
    pub fn mean(&self) -> Result<Array2<F>> {
        let first = self
            .samples
            .first()
            .ok_or_else(|| GpError::InvalidValueError("No sample".to_string()))?;
        let sum = self
            .samples
            .iter()
            .fold(Array2::<F>::zeros(first.raw_dim()), |acc, s| acc + s);
        Ok(sum.mapv(|v| v / F::cast(self.samples.len())))
    }

    /// Latent mean and marginal variance (n, nlatent) at `xnew` averaged over samples:
    /// mixture of the per sample gaussian marginals of `model` latent GP.
    pub fn predict_f<Corr, Mean, Lik>(
        &self,
        model: &Sgpmc<F, Corr, Mean, Lik>,
        xnew: &ArrayBase<impl Data<Elem = F> + Sync, Ix2>,
    ) -> Result<(Array2<F>, Array2<F>)>
    where
        Corr: CorrelationModel<F>,
        Mean: MeanFunction<F>,
        Lik: Likelihood<F>,
    {
        if self.samples.is_empty() {
            return Err(GpError::InvalidValueError("No sample".to_string()));
        }
        let n = F::cast(self.samples.len());
        let moments = self
            .samples
            .par_iter()
            .map(|v| {
                let (mean, cov) = model.predict_f_at(v, xnew, false)?;
                let var = cov.marginals();
                let mean2 = &mean * &mean;
                Ok((mean, var + mean2))
            })
            .collect::<Result<Vec<_>>>()?;
        let shape = moments[0].0.raw_dim();
        let (sum, sum2) = moments.into_iter().fold(
            (Array2::<F>::zeros(shape.clone()), Array2::<F>::zeros(shape)),
            |(s, s2), (m, m2)| (s + &m, s2 + &m2),
        );
        let mean = sum.mapv(|v| v / n);
        let mut var = sum2.mapv(|v| v / n);
        Zip::from(&mut var)
            .and(&mean)
            .for_each(|v, &m| *v = (*v - m * m).max(F::zero()));
        Ok((mean, var))
    }
}

/// Outcome of one chain
struct Chain<F: Float> {
    samples: Vec<Array2<F>>,
    log_joint: Vec<F>,
    n_accepted: usize,
}

impl<F, Corr, Mean, Lik> Sgpmc<F, Corr, Mean, Lik>
where
    F: Float,
    Corr: CorrelationModel<F>,
    Mean: MeanFunction<F>,
    Lik: Likelihood<F>,
{
    /// Sample the posterior of the whitened inducing values with HMC
    /// starting every chain from the current `V`.
    ///
    /// The model is left unchanged, use [`Sgpmc::set_v`] to install a sample.
    pub fn sample(&self, params: HmcParams<F>) -> Result<SgpmcSamples<F>> {
        let params = params.check()?;
        let now = Instant::now();
        let proj = self.training_projection()?;
        let v0 = self.v();

        let chains = (0..params.n_chains())
            .into_par_iter()
            .map(|i| {
                let mut rng = match params.seed() {
                    Some(seed) => Xoshiro256Plus::seed_from_u64(seed.wrapping_add(i as u64)),
                    None => Xoshiro256Plus::from_entropy(),
                };
                self.run_chain(&proj, &params, &v0, &mut rng)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut samples = Vec::with_capacity(params.n_chains() * params.n_samples());
        let mut log_joint = Vec::with_capacity(params.n_chains() * params.n_samples());
        let mut n_accepted = 0;
        for chain in chains {
            samples.extend(chain.samples);
            log_joint.extend(chain.log_joint);
            n_accepted += chain.n_accepted;
        }
        let n_iter = params.n_chains() * params.n_samples() * params.thin();
        let acceptance_rate = F::cast(n_accepted) / F::cast(n_iter);

        info!(
            "HMC: {} samples from {} chain(s), acceptance rate {:.3} in {:?}",
            samples.len(),
            params.n_chains(),
            acceptance_rate,
            now.elapsed()
        );
        if acceptance_rate < F::cast(LOW_ACCEPTANCE_RATE) {
            warn!(
                "HMC acceptance rate is low ({:.3}), consider decreasing step size (currently {})",
                acceptance_rate,
                params.step_size()
            );
        }
        Ok(SgpmcSamples {
            samples,
            log_joint,
            acceptance_rate,
        })
    }

    fn run_chain(
        &self,
        proj: &TrainingProjection<F>,
        params: &HmcValidParams<F>,
        v0: &Array2<F>,
        rng: &mut Xoshiro256Plus,
    ) -> Result<Chain<F>> {
        let half = F::cast(0.5);
        let eps = params.step_size();
        let n_iter = params.n_burnin() + params.n_samples() * params.thin();

        let mut v = v0.to_owned();
        let (mut logp, mut grad) = self.log_joint_and_grad_with(proj, &v)?;
        let mut chain = Chain {
            samples: Vec::with_capacity(params.n_samples()),
            log_joint: Vec::with_capacity(params.n_samples()),
            n_accepted: 0,
        };

        for it in 0..n_iter {
            let p0 = Array2::<f64>::random_using(v.raw_dim(), StandardNormal, &mut *rng).mapv(F::cast);
            let mut q = v.to_owned();
            let mut p = &p0 + &grad.mapv(|g| half * eps * g);
            let mut logp_new = logp;
            let mut grad_new = grad.to_owned();
            for l in 0..params.n_leapfrog() {
                q.scaled_add(eps, &p);
                (logp_new, grad_new) = self.log_joint_and_grad_with(proj, &q)?;
                let step = if l + 1 == params.n_leapfrog() { half * eps } else { eps };
                p.scaled_add(step, &grad_new);
            }

            let kinetic0 = half * p0.iter().fold(F::zero(), |acc, v| acc + *v * *v);
            let kinetic = half * p.iter().fold(F::zero(), |acc, v| acc + *v * *v);
            let log_ratio = (logp_new - kinetic) - (logp - kinetic0);
            let u: f64 = rng.gen();
            let accepted = log_ratio.is_finite() && F::cast(u).ln() < log_ratio;
            if accepted {
                v = q;
                logp = logp_new;
                grad = grad_new;
            }

            if it >= params.n_burnin() {
                if accepted {
                    chain.n_accepted += 1;
                }
                if (it - params.n_burnin()) % params.thin() == 0 {
                    chain.samples.push(v.to_owned());
                    chain.log_joint.push(logp);
                }
            }
        }
        debug!(
            "HMC chain done: {} accepted out of {} kept iterations, final log joint {}",
            chain.n_accepted,
            n_iter - params.n_burnin(),
            logp
        );
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditionals::projection;
    use crate::correlation_models::SquaredExponentialCorr;
    use crate::features::Inducings;
    use crate::kernels::Kernel;
    use crate::likelihoods::Gaussian;
    use approx::assert_abs_diff_eq;
    use linfa::prelude::{Dataset, Fit};
    use linfa_linalg::{cholesky::*, triangular::*};
    use ndarray::{array, Array, Axis};

    fn gaussian_model() -> Sgpmc<f64, SquaredExponentialCorr, crate::ZeroMean, Gaussian<f64>> {
        let xt: Array2<f64> = Array::linspace(0., 1., 20).insert_axis(Axis(1));
        let yt = xt.mapv(|x| (4. * x).sin());
        let kernel = Kernel::new(SquaredExponentialCorr(), array![3.], 1.).unwrap();
        Sgpmc::params(kernel, Gaussian::new(0.1).unwrap(), Inducings::Located(array![[0.1], [0.5], [0.9]]))
            .fit(&Dataset::new(xt, yt))
            .expect("SGPMC fit")
    }

    #[test]
    fn test_hmc_params() {
        assert!(HmcParams::<f64>::new().check_ref().is_ok());
        assert!(HmcParams::<f64>::new().n_samples(0).check_ref().is_err());
        assert!(HmcParams::<f64>::new().thin(0).check_ref().is_err());
        assert!(HmcParams::<f64>::new().n_leapfrog(0).check_ref().is_err());
        assert!(HmcParams::<f64>::new().n_chains(0).check_ref().is_err());
        assert!(HmcParams::new().step_size(0.).check_ref().is_err());
        assert!(HmcParams::new().step_size(f64::NAN).check_ref().is_err());
        let valid = HmcParams::new().step_size(0.01).seed(Some(3)).check().unwrap();
        assert_eq!(0.01, valid.step_size());
        assert_eq!(Some(&3), valid.seed());
    }

    #[test]
    fn test_sample_reproducible() {
        let model = gaussian_model();
        let params = HmcParams::new()
            .n_samples(20)
            .n_burnin(10)
            .thin(2)
            .step_size(0.02)
            .n_leapfrog(10)
            .n_chains(2)
            .seed(Some(42));
        let s1 = model.sample(params.clone()).unwrap();
        let s2 = model.sample(params).unwrap();
        assert_eq!(40, s1.len());
        assert_eq!(40, s1.log_joint().len());
        assert_eq!(s1.samples(), s2.samples());
        assert!(s1.acceptance_rate() > 0. && s1.acceptance_rate() <= 1.);
        assert_eq!(&[3, 1], s1.samples()[0].shape());
        // model is untouched
        assert_eq!(Array2::<f64>::zeros((3, 1)), model.v());
    }

    #[test]
    fn test_sample_chain_seeds_wrap() {
        let model = gaussian_model();
        let params = HmcParams::new()
            .n_samples(2)
            .n_burnin(0)
            .n_chains(2)
            .seed(Some(u64::MAX));
        let samples = model.sample(params.clone()).unwrap();
        assert_eq!(4, samples.len());
        // second chain is seeded with u64::MAX + 1 wrapped to 0
        let first = model.sample(params.seed(Some(0)).n_chains(1)).unwrap();
        assert_eq!(&first.samples()[..2], &samples.samples()[2..]);
    }

    #[test]
    fn test_sample_gaussian_posterior() {
        let model = gaussian_model();
        let (xt, yt) = model.training_data();
        // with a gaussian likelihood the posterior of V is gaussian with
        // precision A A^T / noise + I and mean P^-1 A y / noise
        let (_, a) = projection(model.feature(), model.kernel(), xt, model.jitter()).unwrap();
        let prec = a.dot(&a.t()).mapv(|v| v / 0.1) + Array2::<f64>::eye(3);
        let b = a.dot(yt).mapv(|v| v / 0.1);
        let l = prec.cholesky().unwrap();
        let tmp = l.solve_triangular(&b, UPLO::Lower).unwrap();
        let expected = l.t().solve_triangular(&tmp, UPLO::Upper).unwrap();

        let samples = model
            .sample(
                HmcParams::new()
                    .n_samples(1000)
                    .n_burnin(200)
                    .step_size(0.02)
                    .n_leapfrog(25)
                    .seed(Some(0)),
            )
            .unwrap();
        assert!(samples.acceptance_rate() > 0.5);
        assert_abs_diff_eq!(expected, samples.mean().unwrap(), epsilon = 0.15);

        // log joint is maximal at the posterior mean
        let (lmax, grad) = model.log_joint_and_grad(&expected).unwrap();
        assert_abs_diff_eq!(Array2::<f64>::zeros((3, 1)), grad, epsilon = 1e-6);
        assert!(samples.log_joint().iter().all(|l| *l <= lmax + 1e-9));
    }

    #[test]
    fn test_samples_predict_f() {
        let mut model = gaussian_model();
        let samples = model
            .sample(
                HmcParams::new()
                    .n_samples(30)
                    .n_burnin(20)
                    .step_size(0.02)
                    .seed(Some(1)),
            )
            .unwrap();
        let xnew = array![[0.2], [0.7], [3.]];
        let (mean, var) = samples.predict_f(&model, &xnew).unwrap();
        assert_eq!(&[3, 1], mean.shape());

        let base_var = model.predict_var(&xnew).unwrap();
        assert!(var.iter().zip(base_var.iter()).all(|(v, b)| *v >= *b - 1e-10));

        model.set_v(&samples.mean().unwrap()).unwrap();
        // latent mean is linear in V
        assert_abs_diff_eq!(model.predict(&xnew).unwrap(), mean, epsilon = 1e-10);

        let one = SgpmcSamples {
            samples: vec![samples.samples()[0].to_owned()],
            log_joint: vec![samples.log_joint()[0]],
            acceptance_rate: 1.,
        };
        model.set_v(&samples.samples()[0]).unwrap();
        let (mean1, var1) = one.predict_f(&model, &xnew).unwrap();
        assert_abs_diff_eq!(model.predict(&xnew).unwrap(), mean1, epsilon = 1e-12);
        assert_abs_diff_eq!(model.predict_var(&xnew).unwrap(), var1, epsilon = 1e-10);
    }
}
