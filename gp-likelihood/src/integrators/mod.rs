//! Expectations of a log-density under per-datapoint Gaussian marginals.
//!
//! Given observations `y`, marginal means `m` and variances `v` (each of
//! shape (N, D)), an integrator approximates or computes exactly
//!
//! ```text
//! E_{f ~ N(m, v)} [ g(f, y) ]
//! ```
//!
//! for every entry and sums over `D`, returning shape (N,).

mod analytical;
mod gauss_hermite;

pub use analytical::AnalyticalGaussianIntegrator;
pub use gauss_hermite::{gauss_hermite, GHQuadratureIntegrator};

use candle_core::{Error, Result, Tensor};

use crate::likelihood::Likelihood;

/// Log-density functional g(f, y), applied elementwise over broadcast
/// tensors of latent values `f` and observations `y`.
pub type LogDensityFn<'a> = dyn Fn(&Tensor, &Tensor) -> Result<Tensor> + 'a;

/// Integration strategy used by a likelihood's expected log-likelihood.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Integrator {
    /// Closed form; only valid for the Gaussian likelihood
    Analytical(AnalyticalGaussianIntegrator),
    /// Gauss-Hermite quadrature; valid for any smooth log-density
    GaussHermite(GHQuadratureIntegrator),
}

impl Integrator {
    /// # Arguments
    /// * `fun` - log-density g(f, y)
    /// * `y` - observations, shape (N, D) or (N,)
    /// * `mean` - marginal means, same shape as `y`
    /// * `variance` - marginal variances, same shape as `y`
    /// * `likelihood` - the likelihood that produced `fun`
    ///
    /// # Returns
    /// Expected values, shape (N,)
    pub fn integrate(
        &self,
        fun: &LogDensityFn,
        y: &Tensor,
        mean: &Tensor,
        variance: &Tensor,
        likelihood: &Likelihood,
    ) -> Result<Tensor> {
        match self {
            Integrator::Analytical(a) => a.integrate(fun, y, mean, variance, likelihood),
            Integrator::GaussHermite(gh) => gh.integrate(fun, y, mean, variance, likelihood),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Integrator::Analytical(_) => "analytical",
            Integrator::GaussHermite(_) => "gauss-hermite",
        }
    }
}

impl From<AnalyticalGaussianIntegrator> for Integrator {
    fn from(a: AnalyticalGaussianIntegrator) -> Self {
        Integrator::Analytical(a)
    }
}

impl From<GHQuadratureIntegrator> for Integrator {
    fn from(gh: GHQuadratureIntegrator) -> Self {
        Integrator::GaussHermite(gh)
    }
}

/// Read (N,) as (N, 1); keep (N, D) as is.
pub(crate) fn as_matrix(x: &Tensor) -> Result<Tensor> {
    match x.rank() {
        1 => x.unsqueeze(1),
        2 => Ok(x.clone()),
        r => Err(Error::Msg(format!(
            "expected observations of shape (N, D) or (N,), got rank {}",
            r
        ))),
    }
}
