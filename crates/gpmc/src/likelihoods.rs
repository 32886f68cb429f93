//! A module for likelihoods linking latent GP values `f` to observations `y`.
//!
//! The following likelihoods are implemented:
//! * gaussian (homoscedastic noise),
//! * poisson with exponential link,
//! * bernoulli with probit link.
//!
//! Expectations under a gaussian marginal q(f) = N(fmean, fvar) default to
//! Gauss-Hermite quadrature, likelihoods override them with closed forms when available.

use crate::errors::{GpError, Result};
use crate::utils::log_sum_exp;
use linfa::Float;
use ndarray::{Array2, ArrayBase, Data, Ix2, Zip};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Number of Gauss-Hermite points used by quadrature
pub const N_GAUSS_HERMITE: usize = 20;

const PROBIT_JITTER: f64 = 1e-3;

/// Gauss-Hermite nodes and weights for `int exp(-x^2) g(x) dx`, nodes in decreasing order.
///
/// Roots of the orthonormal Hermite polynomial are found by Newton iterations
/// (Numerical Recipes `gauher`).
pub fn gauss_hermite(n: usize) -> (Vec<f64>, Vec<f64>) {
    const EPS: f64 = 1e-14;
    const PIM4: f64 = 0.751_125_544_464_942_5; // pi^(-1/4)
    const MAXIT: usize = 100;

    let mut x = vec![0.; n];
    let mut w = vec![0.; n];
    let nf = n as f64;
    let mut z = 0.;
    for i in 0..(n + 1) / 2 {
        z = match i {
            0 => (2. * nf + 1.).sqrt() - 1.85575 * (2. * nf + 1.).powf(-1. / 6.),
            1 => z - 1.14 * nf.powf(0.426) / z,
            2 => 1.86 * z - 0.86 * x[0],
            3 => 1.91 * z - 0.91 * x[1],
            _ => 2. * z - x[i - 2],
        };
        let mut pp = 0.;
        for _ in 0..MAXIT {
            let mut p1 = PIM4;
            let mut p2 = 0.;
            for j in 0..n {
                let p3 = p2;
                p2 = p1;
                let jf = j as f64;
                p1 = z * (2. / (jf + 1.)).sqrt() * p2 - (jf / (jf + 1.)).sqrt() * p3;
            }
            pp = (2. * nf).sqrt() * p2;
            let z1 = z;
            z = z1 - p1 / pp;
            if (z - z1).abs() <= EPS {
                break;
            }
        }
        x[i] = z;
        x[n - 1 - i] = -z;
        w[i] = 2. / (pp * pp);
        w[n - 1 - i] = w[i];
    }
    (x, w)
}

fn gauss_hermite_cached() -> &'static (Vec<f64>, Vec<f64>) {
    static GH: OnceLock<(Vec<f64>, Vec<f64>)> = OnceLock::new();
    GH.get_or_init(|| gauss_hermite(N_GAUSS_HERMITE))
}

/// `E[g(f, y)]` for f ~ N(fmean, fvar) computed element-wise by Gauss-Hermite quadrature
pub fn quadrature_expectation<F: Float>(
    fmean: &ArrayBase<impl Data<Elem = F>, Ix2>,
    fvar: &ArrayBase<impl Data<Elem = F>, Ix2>,
    y: &ArrayBase<impl Data<Elem = F>, Ix2>,
    g: impl Fn(F, F) -> F,
) -> Array2<F> {
    let (nodes, weights) = gauss_hermite_cached();
    let inv_sqrt_pi = F::cast(1. / std::f64::consts::PI.sqrt());
    let mut out = Array2::zeros(fmean.raw_dim());
    Zip::from(&mut out)
        .and(fmean)
        .and(fvar)
        .and(y)
        .for_each(|o, &m, &v, &yi| {
            let s = (F::cast(2.) * v).sqrt();
            *o = nodes
                .iter()
                .zip(weights.iter())
                .fold(F::zero(), |acc, (&x, &w)| {
                    acc + F::cast(w) * g(m + s * F::cast(x), yi)
                })
                * inv_sqrt_pi;
        });
    out
}

fn check_shapes<F: Float>(
    fmean: &ArrayBase<impl Data<Elem = F>, Ix2>,
    fvar: &ArrayBase<impl Data<Elem = F>, Ix2>,
    y: Option<&ArrayBase<impl Data<Elem = F>, Ix2>>,
) -> Result<()> {
    let y_shape = y.map(|y| y.shape()).unwrap_or(fmean.shape());
    if fmean.shape() != fvar.shape() || fmean.shape() != y_shape {
        return Err(GpError::InvalidValueError(format!(
            "Likelihood shapes mismatch: fmean {:?}, fvar {:?}, y {:?}",
            fmean.shape(),
            fvar.shape(),
            y_shape
        )));
    }
    Ok(())
}

/// A trait for likelihoods `p(y | f)`
pub trait Likelihood<F: Float>: Clone + Copy + fmt::Display + Sync {
    /// Log density `log p(y | f)`
    fn log_prob(&self, f: F, y: F) -> F;

    /// Derivative of `log p(y | f)` wrt `f`
    fn dlog_prob_df(&self, f: F, y: F) -> F;

    /// Mean of `y` given `f`
    fn conditional_mean(&self, f: F) -> F;

    /// Variance of `y` given `f`
    fn conditional_variance(&self, f: F) -> F;

    /// Variational expectations `E_q(f)[log p(y | f)]` where q(f) = N(fmean, fvar),
    /// all arrays being (n, nlatent) matrices.
    fn variational_expectations(
        &self,
        fmean: &ArrayBase<impl Data<Elem = F>, Ix2>,
        fvar: &ArrayBase<impl Data<Elem = F>, Ix2>,
        y: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<Array2<F>> {
        check_shapes(fmean, fvar, Some(y))?;
        Ok(quadrature_expectation(fmean, fvar, y, |f, yi| {
            self.log_prob(f, yi)
        }))
    }

    /// Derivatives of [`Likelihood::variational_expectations`] wrt `fmean`
    fn dvariational_expectations_dmean(
        &self,
        fmean: &ArrayBase<impl Data<Elem = F>, Ix2>,
        fvar: &ArrayBase<impl Data<Elem = F>, Ix2>,
        y: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<Array2<F>> {
        check_shapes(fmean, fvar, Some(y))?;
        Ok(quadrature_expectation(fmean, fvar, y, |f, yi| {
            self.dlog_prob_df(f, yi)
        }))
    }

    /// Mean and variance of `y` when f ~ N(fmean, fvar)
    fn predict_mean_and_var(
        &self,
        fmean: &ArrayBase<impl Data<Elem = F>, Ix2>,
        fvar: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<(Array2<F>, Array2<F>)> {
        check_shapes(fmean, fvar, None::<&Array2<F>>)?;
        let mean = quadrature_expectation(fmean, fvar, fmean, |f, _| self.conditional_mean(f));
        let mean2 = quadrature_expectation(fmean, fvar, fmean, |f, _| {
            let m = self.conditional_mean(f);
            self.conditional_variance(f) + m * m
        });
        let var = mean2 - mean.mapv(|m| m * m);
        Ok((mean, var))
    }

    /// Log predictive density `log E_q(f)[p(y | f)]`
    fn predict_log_density(
        &self,
        fmean: &ArrayBase<impl Data<Elem = F>, Ix2>,
        fvar: &ArrayBase<impl Data<Elem = F>, Ix2>,
        y: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<Array2<F>> {
        check_shapes(fmean, fvar, Some(y))?;
        let (nodes, weights) = gauss_hermite_cached();
        let log_sqrt_pi = F::cast(0.5 * std::f64::consts::PI.ln());
        let mut out = Array2::zeros(fmean.raw_dim());
        Zip::from(&mut out)
            .and(fmean)
            .and(fvar)
            .and(y)
            .for_each(|o, &m, &v, &yi| {
                let s = (F::cast(2.) * v).sqrt();
                let terms = nodes.iter().zip(weights.iter()).map(|(&x, &w)| {
                    F::cast(w).ln() + self.log_prob(m + s * F::cast(x), yi)
                });
                *o = log_sum_exp(terms) - log_sqrt_pi;
            });
        Ok(out)
    }
}

fn to_f64<F: Float>(v: F) -> f64 {
    v.to_f64().unwrap_or(f64::NAN)
}

/// Gaussian likelihood `y | f ~ N(f, variance)`
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Gaussian<F: Float> {
    variance: F,
}

impl<F: Float> Gaussian<F> {
    /// Constructor, noise `variance` has to be positive
    pub fn new(variance: F) -> Result<Self> {
        if variance <= F::zero() {
            return Err(GpError::InvalidValueError(format!(
                "Gaussian likelihood variance should be positive, got {variance}"
            )));
        }
        Ok(Gaussian { variance })
    }

    /// Noise variance
    pub fn variance(&self) -> F {
        self.variance
    }

    fn log_norm(&self) -> F {
        F::cast(-0.5) * (F::cast(2. * std::f64::consts::PI) * self.variance).ln()
    }
}

impl<F: Float> Likelihood<F> for Gaussian<F> {
    fn log_prob(&self, f: F, y: F) -> F {
        self.log_norm() - F::cast(0.5) * (y - f) * (y - f) / self.variance
    }

    fn dlog_prob_df(&self, f: F, y: F) -> F {
        (y - f) / self.variance
    }

    fn conditional_mean(&self, f: F) -> F {
        f
    }

    fn conditional_variance(&self, _f: F) -> F {
        self.variance
    }

    fn variational_expectations(
        &self,
        fmean: &ArrayBase<impl Data<Elem = F>, Ix2>,
        fvar: &ArrayBase<impl Data<Elem = F>, Ix2>,
        y: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<Array2<F>> {
        check_shapes(fmean, fvar, Some(y))?;
        let log_norm = self.log_norm();
        let mut out = Array2::zeros(fmean.raw_dim());
        Zip::from(&mut out)
            .and(fmean)
            .and(fvar)
            .and(y)
            .for_each(|o, &m, &v, &yi| {
                *o = log_norm - F::cast(0.5) * ((yi - m) * (yi - m) + v) / self.variance;
            });
        Ok(out)
    }

    fn dvariational_expectations_dmean(
        &self,
        fmean: &ArrayBase<impl Data<Elem = F>, Ix2>,
        fvar: &ArrayBase<impl Data<Elem = F>, Ix2>,
        y: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<Array2<F>> {
        check_shapes(fmean, fvar, Some(y))?;
        Ok((y.to_owned() - fmean).mapv(|v| v / self.variance))
    }

    fn predict_mean_and_var(
        &self,
        fmean: &ArrayBase<impl Data<Elem = F>, Ix2>,
        fvar: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<(Array2<F>, Array2<F>)> {
        check_shapes(fmean, fvar, None::<&Array2<F>>)?;
        Ok((fmean.to_owned(), fvar.mapv(|v| v + self.variance)))
    }

    fn predict_log_density(
        &self,
        fmean: &ArrayBase<impl Data<Elem = F>, Ix2>,
        fvar: &ArrayBase<impl Data<Elem = F>, Ix2>,
        y: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<Array2<F>> {
        check_shapes(fmean, fvar, Some(y))?;
        let two_pi = F::cast(2. * std::f64::consts::PI);
        let mut out = Array2::zeros(fmean.raw_dim());
        Zip::from(&mut out)
            .and(fmean)
            .and(fvar)
            .and(y)
            .for_each(|o, &m, &v, &yi| {
                let s2 = v + self.variance;
                *o = F::cast(-0.5) * (two_pi * s2).ln() - F::cast(0.5) * (yi - m) * (yi - m) / s2;
            });
        Ok(out)
    }
}

/// Poisson likelihood with exponential link, `y | f ~ Poisson(binsize * exp(f))`
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Poisson<F: Float> {
    binsize: F,
}

impl<F: Float> Default for Poisson<F> {
    fn default() -> Self {
        Poisson { binsize: F::one() }
    }
}

impl<F: Float> Poisson<F> {
    /// Constructor with a positive `binsize` scaling the rate
    pub fn new(binsize: F) -> Result<Self> {
        if binsize <= F::zero() {
            return Err(GpError::InvalidValueError(format!(
                "Poisson binsize should be positive, got {binsize}"
            )));
        }
        Ok(Poisson { binsize })
    }

    fn log_gamma(y: F) -> F {
        F::cast(libm::lgamma(to_f64(y) + 1.))
    }
}

impl<F: Float> Likelihood<F> for Poisson<F> {
    fn log_prob(&self, f: F, y: F) -> F {
        y * (f + self.binsize.ln()) - self.binsize * f.exp() - Self::log_gamma(y)
    }

    fn dlog_prob_df(&self, f: F, y: F) -> F {
        y - self.binsize * f.exp()
    }

    fn conditional_mean(&self, f: F) -> F {
        self.binsize * f.exp()
    }

    fn conditional_variance(&self, f: F) -> F {
        self.binsize * f.exp()
    }

    fn variational_expectations(
        &self,
        fmean: &ArrayBase<impl Data<Elem = F>, Ix2>,
        fvar: &ArrayBase<impl Data<Elem = F>, Ix2>,
        y: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<Array2<F>> {
        check_shapes(fmean, fvar, Some(y))?;
        let half = F::cast(0.5);
        let mut out = Array2::zeros(fmean.raw_dim());
        Zip::from(&mut out)
            .and(fmean)
            .and(fvar)
            .and(y)
            .for_each(|o, &m, &v, &yi| {
                *o = yi * (m + self.binsize.ln())
                    - self.binsize * (m + half * v).exp()
                    - Self::log_gamma(yi);
            });
        Ok(out)
    }

    fn dvariational_expectations_dmean(
        &self,
        fmean: &ArrayBase<impl Data<Elem = F>, Ix2>,
        fvar: &ArrayBase<impl Data<Elem = F>, Ix2>,
        y: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<Array2<F>> {
        check_shapes(fmean, fvar, Some(y))?;
        let half = F::cast(0.5);
        let mut out = Array2::zeros(fmean.raw_dim());
        Zip::from(&mut out)
            .and(fmean)
            .and(fvar)
            .and(y)
            .for_each(|o, &m, &v, &yi| {
                *o = yi - self.binsize * (m + half * v).exp();
            });
        Ok(out)
    }

    fn predict_mean_and_var(
        &self,
        fmean: &ArrayBase<impl Data<Elem = F>, Ix2>,
        fvar: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<(Array2<F>, Array2<F>)> {
        check_shapes(fmean, fvar, None::<&Array2<F>>)?;
        let half = F::cast(0.5);
        let mean = Zip::from(fmean)
            .and(fvar)
            .map_collect(|&m, &v| self.binsize * (m + half * v).exp());
        let var = Zip::from(&mean)
            .and(fvar)
            .map_collect(|&mu, &v| mu + mu * mu * (v.exp() - F::one()));
        Ok((mean, var))
    }
}

/// Bernoulli likelihood with probit link, `y | f ~ Bernoulli(Phi(f))` with y in {0, 1}
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Bernoulli();

impl Bernoulli {
    /// Standard normal cdf squeezed into [jitter, 1 - jitter]
    fn inv_probit<F: Float>(f: F) -> F {
        let jitter = F::cast(PROBIT_JITTER);
        let cdf = F::cast(0.5 * (1. + libm::erf(to_f64(f) / std::f64::consts::SQRT_2)));
        cdf * (F::one() - F::cast(2.) * jitter) + jitter
    }

    fn dinv_probit<F: Float>(f: F) -> F {
        let jitter = F::cast(PROBIT_JITTER);
        let pdf = (F::cast(-0.5) * f * f).exp() / F::cast((2. * std::f64::consts::PI).sqrt());
        pdf * (F::one() - F::cast(2.) * jitter)
    }
}

impl<F: Float> Likelihood<F> for Bernoulli {
    fn log_prob(&self, f: F, y: F) -> F {
        let p = Self::inv_probit(f);
        y * p.ln() + (F::one() - y) * (F::one() - p).ln()
    }

    fn dlog_prob_df(&self, f: F, y: F) -> F {
        let p = Self::inv_probit(f);
        (y / p - (F::one() - y) / (F::one() - p)) * Self::dinv_probit(f)
    }

    fn conditional_mean(&self, f: F) -> F {
        Self::inv_probit(f)
    }

    fn conditional_variance(&self, f: F) -> F {
        let p = Self::inv_probit(f);
        p - p * p
    }

    fn predict_mean_and_var(
        &self,
        fmean: &ArrayBase<impl Data<Elem = F>, Ix2>,
        fvar: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<(Array2<F>, Array2<F>)> {
        check_shapes(fmean, fvar, None::<&Array2<F>>)?;
        let p = Zip::from(fmean)
            .and(fvar)
            .map_collect(|&m, &v| Self::inv_probit(m / (F::one() + v).sqrt()));
        let var = p.mapv(|p| p - p * p);
        Ok((p, var))
    }

    fn predict_log_density(
        &self,
        fmean: &ArrayBase<impl Data<Elem = F>, Ix2>,
        fvar: &ArrayBase<impl Data<Elem = F>, Ix2>,
        y: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<Array2<F>> {
        let (p, _) = self.predict_mean_and_var(fmean, fvar)?;
        check_shapes(fmean, fvar, Some(y))?;
        Ok(Zip::from(&p)
            .and(y)
            .map_collect(|&p, &yi| yi * p.ln() + (F::one() - yi) * (F::one() - p).ln()))
    }
}

impl<F: Float> fmt::Display for Gaussian<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Gaussian(variance={})", self.variance)
    }
}

impl<F: Float> fmt::Display for Poisson<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Poisson(binsize={})", self.binsize)
    }
}

impl fmt::Display for Bernoulli {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Bernoulli")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_gauss_hermite() {
        let (x, w) = gauss_hermite(N_GAUSS_HERMITE);
        let sqrt_pi = std::f64::consts::PI.sqrt();
        assert_abs_diff_eq!(sqrt_pi, w.iter().sum::<f64>(), epsilon = 1e-10);
        let m2: f64 = x.iter().zip(&w).map(|(x, w)| w * x * x).sum();
        assert_abs_diff_eq!(sqrt_pi / 2., m2, epsilon = 1e-10);
        let m4: f64 = x.iter().zip(&w).map(|(x, w)| w * x.powi(4)).sum();
        assert_abs_diff_eq!(3. * sqrt_pi / 4., m4, epsilon = 1e-10);
        assert!(x.windows(2).all(|p| p[0] > p[1]));
        let (x3, w3) = gauss_hermite(3);
        assert_abs_diff_eq!(1.5f64.sqrt(), x3[0], epsilon = 1e-12);
        assert_abs_diff_eq!(0., x3[1], epsilon = 1e-12);
        assert_abs_diff_eq!(2. * sqrt_pi / 3., w3[1], epsilon = 1e-12);
    }

    fn marginals() -> (Array2<f64>, Array2<f64>, Array2<f64>) {
        let fmean = array![[0.3, -1.2], [1.5, 0.1], [-0.4, 0.8]];
        let fvar = array![[0.2, 0.05], [1.1, 0.4], [0.01, 0.7]];
        let y = array![[0.5, -1.], [2., 0.], [-0.3, 1.1]];
        (fmean, fvar, y)
    }

    #[test]
    fn test_gaussian_closed_forms_match_quadrature() {
        let lik = Gaussian::new(0.3).unwrap();
        let (fmean, fvar, y) = marginals();
        let ve = lik.variational_expectations(&fmean, &fvar, &y).unwrap();
        let ve_quad = quadrature_expectation(&fmean, &fvar, &y, |f, yi| lik.log_prob(f, yi));
        assert_abs_diff_eq!(ve, ve_quad, epsilon = 1e-10);

        let dve = lik.dvariational_expectations_dmean(&fmean, &fvar, &y).unwrap();
        let dve_quad =
            quadrature_expectation(&fmean, &fvar, &y, |f, yi| lik.dlog_prob_df(f, yi));
        assert_abs_diff_eq!(dve, dve_quad, epsilon = 1e-10);

        let lpd = lik.predict_log_density(&fmean, &fvar, &y).unwrap();
        let (nodes, weights) = gauss_hermite(N_GAUSS_HERMITE);
        let m = fmean[[2, 0]];
        let s = (2. * fvar[[2, 0]]).sqrt();
        let p: f64 = nodes
            .iter()
            .zip(&weights)
            .map(|(x, w)| w * lik.log_prob(m + s * x, y[[2, 0]]).exp())
            .sum::<f64>()
            / std::f64::consts::PI.sqrt();
        assert_abs_diff_eq!(p.ln(), lpd[[2, 0]], epsilon = 1e-8);
    }

    #[test]
    fn test_gaussian_predict() {
        let lik = Gaussian::new(0.1).unwrap();
        let (fmean, fvar, _) = marginals();
        let (mean, var) = lik.predict_mean_and_var(&fmean, &fvar).unwrap();
        assert_abs_diff_eq!(fmean, mean);
        assert_abs_diff_eq!(fvar.mapv(|v| v + 0.1), var, epsilon = 1e-14);
        assert!(Gaussian::new(0.).is_err());
    }

    #[test]
    fn test_poisson_closed_forms_match_quadrature() {
        let lik = Poisson::new(2.).unwrap();
        let (fmean, fvar, _) = marginals();
        let y = array![[0., 1.], [3., 2.], [0., 5.]];
        let ve = lik.variational_expectations(&fmean, &fvar, &y).unwrap();
        let ve_quad = quadrature_expectation(&fmean, &fvar, &y, |f, yi| lik.log_prob(f, yi));
        assert_abs_diff_eq!(ve, ve_quad, epsilon = 1e-7);

        let dve = lik.dvariational_expectations_dmean(&fmean, &fvar, &y).unwrap();
        let dve_quad =
            quadrature_expectation(&fmean, &fvar, &y, |f, yi| lik.dlog_prob_df(f, yi));
        assert_abs_diff_eq!(dve, dve_quad, epsilon = 1e-7);

        let (mean, var) = lik.predict_mean_and_var(&fmean, &fvar).unwrap();
        let mean_quad = quadrature_expectation(&fmean, &fvar, &fmean, |f, _| lik.conditional_mean(f));
        assert_abs_diff_eq!(mean, mean_quad, epsilon = 1e-7);
        assert!(var.iter().zip(mean.iter()).all(|(v, m)| v >= m));
    }

    #[test]
    fn test_poisson_log_prob() {
        let lik = Poisson::<f64>::default();
        // log Poisson(y=2 | rate=e) = 2 - e - ln 2
        assert_abs_diff_eq!(
            2. - std::f64::consts::E - 2f64.ln(),
            lik.log_prob(1., 2.),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_bernoulli() {
        let lik = Bernoulli();
        assert_abs_diff_eq!(0.5f64.ln(), lik.log_prob(0., 1.), epsilon = 1e-12);
        assert_abs_diff_eq!(0.5f64.ln(), lik.log_prob(0., 0.), epsilon = 1e-12);
        let h = 1e-6;
        for (f, y) in [(0.3, 1.), (-1.2, 0.), (2.5, 1.)] {
            let fd = (lik.log_prob(f + h, y) - lik.log_prob(f - h, y)) / (2. * h);
            assert_abs_diff_eq!(fd, lik.dlog_prob_df(f, y), epsilon = 1e-6);
        }

        let fmean = array![[0.], [1.], [-2.]];
        let fvar = array![[1.], [0.5], [0.1]];
        let (p, var) = lik.predict_mean_and_var(&fmean, &fvar).unwrap();
        let p_quad = quadrature_expectation(&fmean, &fvar, &fmean, |f, _| {
            <Bernoulli as Likelihood<f64>>::conditional_mean(&lik, f)
        });
        assert_abs_diff_eq!(p, p_quad, epsilon = 1e-5);
        assert_abs_diff_eq!(p.mapv(|p| p * (1. - p)), var, epsilon = 1e-14);

        let y = array![[1.], [0.], [0.]];
        let lpd = lik.predict_log_density(&fmean, &fvar, &y).unwrap();
        assert_abs_diff_eq!(0.5f64.ln(), lpd[[0, 0]], epsilon = 1e-12);
        assert!(lpd.iter().all(|v| *v < 0.));
    }

    #[test]
    fn test_shape_mismatch() {
        let lik = Gaussian::new(1.).unwrap();
        let (fmean, fvar, _) = marginals();
        let y = array![[0.], [1.], [2.]];
        assert!(lik.variational_expectations(&fmean, &fvar, &y).is_err());
    }
}
