//! Observation models for Gaussian-process latent values.
//!
//! Every likelihood supplies a `link_function` (latent value -> observation
//! distribution) and a `predict` (latent posterior -> predictive
//! distribution). The expected log-likelihood is shared: it builds
//! g(f, y) = log p(y | link_function(f)) and hands it to the likelihood's
//! integrator.
//!
//! | likelihood | link | default integrator |
//! |---|---|---|
//! | `Gaussian` | N(f, σ²) | analytical |
//! | `Bernoulli` | Bernoulli(Φ(f)) | Gauss-Hermite |
//! | `Poisson` | Poisson(exp(f)) | Gauss-Hermite |

mod bernoulli;
mod gaussian;
mod poisson;

pub use bernoulli::Bernoulli;
pub use gaussian::Gaussian;
pub use poisson::Poisson;

use candle_core::{Result, Tensor, Var};

use crate::distributions::{GaussianDistribution, ObservationDist};
use crate::integrators::{GHQuadratureIntegrator, Integrator};

const INV_PROBIT_JITTER: f64 = 1e-3;

/// Operations each observation model must provide.
pub trait LikelihoodFunction {
    /// Number of data points the likelihood was set up for
    fn num_datapoints(&self) -> usize;

    /// Distribution of y given latent values f (any shape); differentiable
    /// in f and in the likelihood parameters.
    fn link_function(&self, f: &Tensor) -> Result<ObservationDist>;

    /// Predictive distribution of y given the latent posterior at the same
    /// points.
    fn predict(&self, dist: &GaussianDistribution) -> Result<ObservationDist>;
}

/// Likelihoods without a closed-form expected log-likelihood; they always
/// integrate by quadrature.
pub trait NonGaussian: LikelihoodFunction {
    fn quadrature(&self) -> &GHQuadratureIntegrator;
}

/// The closed set of supported likelihoods.
#[derive(Clone, Debug)]
pub enum Likelihood {
    Gaussian(Gaussian),
    Bernoulli(Bernoulli),
    Poisson(Poisson),
}

impl Likelihood {
    pub fn name(&self) -> &'static str {
        match self {
            Likelihood::Gaussian(_) => "Gaussian",
            Likelihood::Bernoulli(_) => "Bernoulli",
            Likelihood::Poisson(_) => "Poisson",
        }
    }

    pub fn integrator(&self) -> Integrator {
        match self {
            Likelihood::Gaussian(g) => g.integrator(),
            Likelihood::Bernoulli(b) => Integrator::GaussHermite(*b.quadrature()),
            Likelihood::Poisson(p) => Integrator::GaussHermite(*p.quadrature()),
        }
    }

    /// Variables an optimizer should update (the Gaussian noise, if trainable).
    pub fn trainable_vars(&self) -> Vec<Var> {
        match self {
            Likelihood::Gaussian(g) => g.obs_stddev().trainable_vars(),
            Likelihood::Bernoulli(_) | Likelihood::Poisson(_) => vec![],
        }
    }

    /// See [`expected_log_likelihood`].
    pub fn expected_log_likelihood(
        &self,
        y: &Tensor,
        mean: &Tensor,
        variance: &Tensor,
    ) -> Result<Tensor> {
        expected_log_likelihood(self, y, mean, variance)
    }
}

impl LikelihoodFunction for Likelihood {
    fn num_datapoints(&self) -> usize {
        match self {
            Likelihood::Gaussian(g) => g.num_datapoints(),
            Likelihood::Bernoulli(b) => b.num_datapoints(),
            Likelihood::Poisson(p) => p.num_datapoints(),
        }
    }

    fn link_function(&self, f: &Tensor) -> Result<ObservationDist> {
        match self {
            Likelihood::Gaussian(g) => g.link_function(f),
            Likelihood::Bernoulli(b) => b.link_function(f),
            Likelihood::Poisson(p) => p.link_function(f),
        }
    }

    fn predict(&self, dist: &GaussianDistribution) -> Result<ObservationDist> {
        match self {
            Likelihood::Gaussian(g) => g.predict(dist),
            Likelihood::Bernoulli(b) => b.predict(dist),
            Likelihood::Poisson(p) => p.predict(dist),
        }
    }
}

impl From<Gaussian> for Likelihood {
    fn from(g: Gaussian) -> Self {
        Likelihood::Gaussian(g)
    }
}

impl From<Bernoulli> for Likelihood {
    fn from(b: Bernoulli) -> Self {
        Likelihood::Bernoulli(b)
    }
}

impl From<Poisson> for Likelihood {
    fn from(p: Poisson) -> Self {
        Likelihood::Poisson(p)
    }
}

/// Expected log-likelihood E_{q(f)}[log p(y | f)] for q(f) = N(mean, variance).
///
/// Each entry depends only on its own `y`, `mean` and `variance`; nothing
/// couples data points. The caller sums or rescales the result.
///
/// # Arguments
/// * `likelihood` - observation model and its integrator
/// * `y` - observations, shape (N, D) or (N,)
/// * `mean` - variational mean, same shape as `y`
/// * `variance` - variational variance, same shape as `y`
///
/// # Returns
/// One expected value per data point, shape (N,)
pub fn expected_log_likelihood(
    likelihood: &Likelihood,
    y: &Tensor,
    mean: &Tensor,
    variance: &Tensor,
) -> Result<Tensor> {
    let log_prob = |f: &Tensor, y: &Tensor| likelihood.link_function(f)?.log_prob(y);
    likelihood
        .integrator()
        .integrate(&log_prob, y, mean, variance, likelihood)
}

/// Standard normal CDF squeezed into [ε, 1 - ε] with ε = 1e-3,
/// so that Bernoulli log-probabilities stay finite.
///
/// ```text
/// Φ_ε(x) = 0.5 * (1 + erf(x / √2)) * (1 - 2ε) + ε
/// ```
pub fn inv_probit(x: &Tensor) -> Result<Tensor> {
    let cdf = (x / std::f64::consts::SQRT_2)?.erf()?.affine(0.5, 0.5)?;
    cdf.affine(1.0 - 2.0 * INV_PROBIT_JITTER, INV_PROBIT_JITTER)
}
