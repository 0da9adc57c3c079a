//! Gaussian likelihood with homoscedastic or per-point observation noise.

use candle_core::{Device, Result, Tensor};

use super::LikelihoodFunction;
use crate::distributions::{GaussianDistribution, ObservationDist};
use crate::integrators::{AnalyticalGaussianIntegrator, Integrator};
use crate::parameters::{Parameter, PositiveReal};

/// y ~ N(f, σ²)
///
/// `obs_stddev` σ is a scalar or a vector with one entry per data point.
/// Plain values are wrapped into a trainable `PositiveReal`.
#[derive(Clone, Debug)]
pub struct Gaussian {
    num_datapoints: usize,
    obs_stddev: Parameter,
    integrator: Integrator,
}

impl Gaussian {
    /// # Arguments
    /// * `num_datapoints` - number of data points
    /// * `obs_stddev` - initial noise standard deviation σ > 0
    /// * `device` - where σ lives
    pub fn new(num_datapoints: usize, obs_stddev: f64, device: &Device) -> Result<Self> {
        let obs_stddev = PositiveReal::from_f64(obs_stddev, device)?;
        Ok(Self::with_parameter(num_datapoints, obs_stddev.into()))
    }

    /// Noise given as a tensor, scalar or shape (num_datapoints,)
    pub fn from_tensor(num_datapoints: usize, obs_stddev: &Tensor) -> Result<Self> {
        let obs_stddev = PositiveReal::new(obs_stddev)?;
        Ok(Self::with_parameter(num_datapoints, obs_stddev.into()))
    }

    /// Noise given as an already constrained (`PositiveReal`) or fixed
    /// (`Static`) parameter
    pub fn with_parameter(num_datapoints: usize, obs_stddev: Parameter) -> Self {
        Self {
            num_datapoints,
            obs_stddev,
            integrator: AnalyticalGaussianIntegrator::new().into(),
        }
    }

    /// Replace the default analytical integrator, e.g. by quadrature.
    pub fn with_integrator(mut self, integrator: impl Into<Integrator>) -> Self {
        self.integrator = integrator.into();
        self
    }

    pub fn obs_stddev(&self) -> &Parameter {
        &self.obs_stddev
    }

    pub fn integrator(&self) -> Integrator {
        self.integrator
    }

    /// σ in `f`'s dtype, broadcast to `f`'s shape. A per-point σ lines up
    /// with the leading axis of `f`.
    pub(crate) fn scale_like(&self, f: &Tensor) -> Result<Tensor> {
        let scale = self.obs_stddev.value()?.to_dtype(f.dtype())?;
        if scale.elem_count() == 1 {
            return scale.reshape(())?.broadcast_as(f.dims());
        }
        let mut dims = vec![1usize; f.rank().max(1)];
        dims[0] = scale.elem_count();
        scale.reshape(dims)?.broadcast_as(f.dims())
    }
}

impl LikelihoodFunction for Gaussian {
    fn num_datapoints(&self) -> usize {
        self.num_datapoints
    }

    fn link_function(&self, f: &Tensor) -> Result<ObservationDist> {
        Ok(ObservationDist::Normal {
            loc: f.clone(),
            scale: self.scale_like(f)?,
        })
    }

    /// Adds σ² to the diagonal of the posterior covariance; the mean and the
    /// off-diagonal entries pass through unchanged.
    fn predict(&self, dist: &GaussianDistribution) -> Result<ObservationDist> {
        let n = dist.event_size();
        let cov = dist.covariance();

        let noise = self.obs_stddev.value()?.to_dtype(cov.dtype())?.sqr()?;
        let noise = if noise.elem_count() == 1 {
            noise.reshape((1, 1))?
        } else {
            noise.reshape((1, n))?
        };
        let eye = Tensor::eye(n, cov.dtype(), cov.device())?;
        let noisy_cov = (cov + eye.broadcast_mul(&noise)?)?;

        Ok(ObservationDist::MultivariateNormal {
            mean: dist.mean().clone(),
            covariance: noisy_cov,
        })
    }
}
