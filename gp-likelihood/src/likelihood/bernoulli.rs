//! Probit-link Bernoulli likelihood for binary data.

use candle_core::{Result, Tensor};

use super::{inv_probit, LikelihoodFunction, NonGaussian};
use crate::distributions::{GaussianDistribution, ObservationDist};
use crate::integrators::GHQuadratureIntegrator;

/// y ~ Bernoulli(Φ(f)), with Φ the squeezed standard normal CDF
/// ([`inv_probit`]).
#[derive(Clone, Debug)]
pub struct Bernoulli {
    num_datapoints: usize,
    integrator: GHQuadratureIntegrator,
}

impl Bernoulli {
    pub fn new(num_datapoints: usize) -> Self {
        Self::with_integrator(num_datapoints, GHQuadratureIntegrator::default())
    }

    pub fn with_integrator(num_datapoints: usize, integrator: GHQuadratureIntegrator) -> Self {
        Self {
            num_datapoints,
            integrator,
        }
    }
}

impl LikelihoodFunction for Bernoulli {
    fn num_datapoints(&self) -> usize {
        self.num_datapoints
    }

    fn link_function(&self, f: &Tensor) -> Result<ObservationDist> {
        Ok(ObservationDist::Bernoulli {
            probs: inv_probit(f)?,
        })
    }

    /// Probit approximation of E[Φ(f)] under f ~ N(μ, σ²):
    /// Φ(μ / √(1 + σ²)), using only the marginal variances.
    fn predict(&self, dist: &GaussianDistribution) -> Result<ObservationDist> {
        let variance = dist.variance()?;
        let mean = dist.mean().flatten_all()?;
        let scaled = (mean / (variance + 1.0)?.sqrt()?)?;
        self.link_function(&scaled)
    }
}

impl NonGaussian for Bernoulli {
    fn quadrature(&self) -> &GHQuadratureIntegrator {
        &self.integrator
    }
}
