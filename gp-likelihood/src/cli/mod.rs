pub mod expected_loglik;
pub mod predict;

use candle_core::Device;
use clap::{Parser, Subcommand, ValueEnum};

use crate::integrators::GHQuadratureIntegrator;
use crate::likelihood::{Bernoulli, Gaussian, Likelihood, Poisson};

pub use expected_loglik::ExpectedLoglikArgs;
pub use predict::PredictArgs;

#[derive(Parser)]
#[command(name = "gp-likelihood")]
#[command(about = "Expected log-likelihoods and predictive moments for GP likelihoods")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// E_q[log p(y|f)] per row, for q(f) = N(mean, variance)
    ExpectedLoglik(ExpectedLoglikArgs),
    /// Predictive mean and variance from a latent posterior
    Predict(PredictArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LikelihoodType {
    /// Gaussian: y ~ N(f, σ²)
    Gaussian,
    /// Bernoulli: y ~ Bernoulli(Φ(f))
    Bernoulli,
    /// Poisson: y ~ Poisson(exp(f))
    Poisson,
}

/// Build the requested likelihood for `n` data points.
///
/// * `obs_stddev` - Gaussian noise σ (ignored otherwise)
/// * `quad_points` - Gauss-Hermite points; for the Gaussian likelihood this
///   replaces the closed form
pub fn build_likelihood(
    kind: LikelihoodType,
    n: usize,
    obs_stddev: f64,
    quad_points: Option<usize>,
    device: &Device,
) -> candle_core::Result<Likelihood> {
    let quadrature = quad_points.map(GHQuadratureIntegrator::new);
    Ok(match kind {
        LikelihoodType::Gaussian => {
            let gauss = Gaussian::new(n, obs_stddev, device)?;
            match quadrature {
                Some(gh) => gauss.with_integrator(gh).into(),
                None => gauss.into(),
            }
        }
        LikelihoodType::Bernoulli => {
            Bernoulli::with_integrator(n, quadrature.unwrap_or_default()).into()
        }
        LikelihoodType::Poisson => {
            Poisson::with_integrator(n, quadrature.unwrap_or_default()).into()
        }
    })
}
