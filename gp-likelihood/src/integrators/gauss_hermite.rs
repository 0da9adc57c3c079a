use candle_core::{Error, Result, Tensor};
use log::debug;
use nalgebra::DMatrix;

use super::{as_matrix, LogDensityFn};
use crate::likelihood::Likelihood;

const DEFAULT_NUM_POINTS: usize = 20;

/// Gauss-Hermite quadrature under a Gaussian marginal.
///
/// With f = m + √2 · √v · x,
/// ```text
/// E_{f ~ N(m, v)} [g(f, y)] ≈ Σ_k (w_k / √π) · g(m + √2 √v x_k, y)
/// ```
/// where (x_k, w_k) is the `num_points` rule for the weight exp(-x²).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GHQuadratureIntegrator {
    /// Number of quadrature nodes
    pub num_points: usize,
}

impl Default for GHQuadratureIntegrator {
    fn default() -> Self {
        Self {
            num_points: DEFAULT_NUM_POINTS,
        }
    }
}

impl GHQuadratureIntegrator {
    pub fn new(num_points: usize) -> Self {
        Self { num_points }
    }

    pub fn integrate(
        &self,
        fun: &LogDensityFn,
        y: &Tensor,
        mean: &Tensor,
        variance: &Tensor,
        _likelihood: &Likelihood,
    ) -> Result<Tensor> {
        let (nodes, weights) = gauss_hermite(self.num_points)?;
        let num_points = nodes.len();

        let y = as_matrix(y)?;
        let mean = as_matrix(mean)?;
        let variance = as_matrix(variance)?.to_dtype(mean.dtype())?;
        let (dtype, device) = (mean.dtype(), mean.device());

        debug!(
            "gauss-hermite: {} points over {:?} marginals",
            num_points,
            mean.dims()
        );

        let sqrt_pi = std::f64::consts::PI.sqrt();
        let nodes: Vec<f64> = nodes.iter().map(|x| x * std::f64::consts::SQRT_2).collect();
        let weights: Vec<f64> = weights.iter().map(|w| w / sqrt_pi).collect();

        // (1, 1, P) so they broadcast against (N, D, 1)
        let nodes = Tensor::from_vec(nodes, (1, 1, num_points), device)?.to_dtype(dtype)?;
        let weights = Tensor::from_vec(weights, (1, 1, num_points), device)?.to_dtype(dtype)?;

        // f: (N, D, P)
        let sd = variance.sqrt()?.unsqueeze(2)?;
        let f = mean.unsqueeze(2)?.broadcast_add(&sd.broadcast_mul(&nodes)?)?;
        let y = y
            .to_dtype(dtype)?
            .unsqueeze(2)?
            .broadcast_as(f.dims())?
            .contiguous()?;

        let log_prob = fun(&f, &y)?;
        log_prob.broadcast_mul(&weights)?.sum(2)?.sum(1)
    }
}

/// Nodes and weights of the `num_points` Gauss-Hermite rule for the
/// weight function exp(-x²), by Golub-Welsch.
///
/// The nodes are the eigenvalues of the symmetric tridiagonal Jacobi
/// matrix with off-diagonal entries √(k/2); the weight of node i is
/// √π · (first component of its unit eigenvector)².
///
/// # Returns
/// (nodes, weights), nodes ascending
pub fn gauss_hermite(num_points: usize) -> Result<(Vec<f64>, Vec<f64>)> {
    if num_points == 0 {
        return Err(Error::Msg(
            "Gauss-Hermite quadrature needs at least one point".into(),
        ));
    }

    let mut jacobi = DMatrix::<f64>::zeros(num_points, num_points);
    for k in 1..num_points {
        let b = (k as f64 / 2.0).sqrt();
        jacobi[(k - 1, k)] = b;
        jacobi[(k, k - 1)] = b;
    }

    let eigen = jacobi.symmetric_eigen();
    let sqrt_pi = std::f64::consts::PI.sqrt();

    let mut rule: Vec<(f64, f64)> = (0..num_points)
        .map(|i| {
            let v0 = eigen.eigenvectors[(0, i)];
            (eigen.eigenvalues[i], sqrt_pi * v0 * v0)
        })
        .collect();
    rule.sort_by(|a, b| a.0.total_cmp(&b.0));

    Ok(rule.into_iter().unzip())
}
