use candle_core::{Error, Result, Tensor};

use super::{as_matrix, LogDensityFn};
use crate::likelihood::Likelihood;

/// Exact expected log-likelihood for the Gaussian likelihood.
///
/// ```text
/// E_{f ~ N(m, v)} [log N(y | f, σ²)] = -0.5 * [ln(2π) + ln(σ²) + ((y - m)² + v) / σ²]
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AnalyticalGaussianIntegrator;

impl AnalyticalGaussianIntegrator {
    pub fn new() -> Self {
        Self
    }

    /// The log-density is implied by the likelihood, so `_fun` is unused;
    /// a non-Gaussian likelihood is an error.
    pub fn integrate(
        &self,
        _fun: &LogDensityFn,
        y: &Tensor,
        mean: &Tensor,
        variance: &Tensor,
        likelihood: &Likelihood,
    ) -> Result<Tensor> {
        let gaussian = match likelihood {
            Likelihood::Gaussian(g) => g,
            other => {
                return Err(Error::Msg(format!(
                    "analytical integration is only defined for the Gaussian likelihood, got {}",
                    other.name()
                )))
            }
        };

        let y = as_matrix(y)?;
        let mean = as_matrix(mean)?.to_dtype(y.dtype())?;
        let variance = as_matrix(variance)?.to_dtype(y.dtype())?;

        // σ² broadcast to (N, D)
        let obs_var = gaussian.scale_like(&y)?.sqr()?;
        let ln_2pi = (2.0 * std::f64::consts::PI).ln();

        let sq_error = (&y - &mean)?.sqr()?;
        let scaled = ((sq_error + variance)? / &obs_var)?;
        let val = ((scaled + obs_var.log()?)? + ln_2pi)?;

        val.sum(1)? * (-0.5)
    }
}
