//! Log-link Poisson likelihood for count data.

use candle_core::{Result, Tensor};

use super::{LikelihoodFunction, NonGaussian};
use crate::distributions::{GaussianDistribution, ObservationDist};
use crate::integrators::GHQuadratureIntegrator;

/// y ~ Poisson(exp(f))
#[derive(Clone, Debug)]
pub struct Poisson {
    num_datapoints: usize,
    integrator: GHQuadratureIntegrator,
}

impl Poisson {
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

impl LikelihoodFunction for Poisson {
    fn num_datapoints(&self) -> usize {
        self.num_datapoints
    }

    fn link_function(&self, f: &Tensor) -> Result<ObservationDist> {
        Ok(ObservationDist::Poisson { rate: f.exp()? })
    }

    /// Plug-in prediction at the posterior mean; the posterior variance is
    /// not propagated.
    fn predict(&self, dist: &GaussianDistribution) -> Result<ObservationDist> {
        self.link_function(dist.mean())
    }
}

impl NonGaussian for Poisson {
    fn quadrature(&self) -> &GHQuadratureIntegrator {
        &self.integrator
    }
}
