//! Latent Gaussian posterior and the observation-space distribution family.

use candle_core::{DType, Error, Result, Tensor};
use nalgebra::{DMatrix, DVector};
use special::Gamma;

/// Gaussian over latent function values at a finite set of points,
/// q(f) = N(μ, Σ)
#[derive(Clone, Debug)]
pub struct GaussianDistribution {
    /// mean μ: shape (n,)
    mean: Tensor,
    /// covariance Σ: shape (n, n)
    covariance: Tensor,
}

impl GaussianDistribution {
    /// # Arguments
    /// * `mean` - latent mean; flattened to shape (n,)
    /// * `covariance` - full covariance, shape (n, n)
    pub fn new(mean: Tensor, covariance: Tensor) -> Result<Self> {
        let mean = mean.flatten_all()?;
        let n = mean.dim(0)?;
        let (r, c) = covariance.dims2()?;
        if r != n || c != n {
            return Err(Error::Msg(format!(
                "covariance must be {} x {} to match the mean, got {} x {}",
                n, n, r, c
            )));
        }
        Ok(Self { mean, covariance })
    }

    /// Mean-field posterior N(μ, diag(σ²))
    pub fn from_diagonal(mean: Tensor, variance: &Tensor) -> Result<Self> {
        let variance = variance.flatten_all()?;
        let n = variance.dim(0)?;
        let eye = Tensor::eye(n, variance.dtype(), variance.device())?;
        let covariance = eye.broadcast_mul(&variance.unsqueeze(0)?)?;
        Self::new(mean, covariance)
    }

    pub fn mean(&self) -> &Tensor {
        &self.mean
    }

    pub fn covariance(&self) -> &Tensor {
        &self.covariance
    }

    /// Marginal variances diag(Σ): shape (n,)
    pub fn variance(&self) -> Result<Tensor> {
        diagonal(&self.covariance)
    }

    /// Number of latent points n
    pub fn event_size(&self) -> usize {
        self.mean.elem_count()
    }
}

/// Diagonal of a square matrix as a vector; differentiable.
pub(crate) fn diagonal(mat: &Tensor) -> Result<Tensor> {
    let (n, _) = mat.dims2()?;
    let eye = Tensor::eye(n, mat.dtype(), mat.device())?;
    (mat * eye)?.sum(1)
}

/// Distribution over observations, either conditional on latent values
/// (`link_function`) or marginal (`predict`).
#[derive(Clone, Debug)]
pub enum ObservationDist {
    /// y ~ N(loc, scale²), elementwise
    Normal { loc: Tensor, scale: Tensor },
    /// y ~ N(mean, covariance) over the whole vector
    MultivariateNormal { mean: Tensor, covariance: Tensor },
    /// y ~ Bernoulli(probs), elementwise
    Bernoulli { probs: Tensor },
    /// y ~ Poisson(rate), elementwise
    Poisson { rate: Tensor },
}

impl ObservationDist {
    pub fn name(&self) -> &'static str {
        match self {
            ObservationDist::Normal { .. } => "Normal",
            ObservationDist::MultivariateNormal { .. } => "MultivariateNormal",
            ObservationDist::Bernoulli { .. } => "Bernoulli",
            ObservationDist::Poisson { .. } => "Poisson",
        }
    }

    /// Log density/mass at `y`.
    ///
    /// Elementwise families broadcast `y` against their parameters and return
    /// that broadcast shape. `MultivariateNormal` takes `y` of shape (n,) or
    /// (m, n) and returns a scalar or (m,); it is evaluated on the host and is
    /// not tracked by autograd.
    pub fn log_prob(&self, y: &Tensor) -> Result<Tensor> {
        match self {
            ObservationDist::Normal { loc, scale } => normal_log_prob(y, loc, scale),
            ObservationDist::MultivariateNormal { mean, covariance } => {
                mvn_log_prob(y, mean, covariance)
            }
            ObservationDist::Bernoulli { probs } => bernoulli_log_prob(y, probs),
            ObservationDist::Poisson { rate } => poisson_log_prob(y, rate),
        }
    }

    pub fn mean(&self) -> Result<Tensor> {
        match self {
            ObservationDist::Normal { loc, .. } => Ok(loc.clone()),
            ObservationDist::MultivariateNormal { mean, .. } => Ok(mean.clone()),
            ObservationDist::Bernoulli { probs } => Ok(probs.clone()),
            ObservationDist::Poisson { rate } => Ok(rate.clone()),
        }
    }

    /// Marginal variance of each observation
    pub fn variance(&self) -> Result<Tensor> {
        match self {
            ObservationDist::Normal { scale, .. } => scale.sqr(),
            ObservationDist::MultivariateNormal { covariance, .. } => diagonal(covariance),
            ObservationDist::Bernoulli { probs } => probs * probs.affine(-1.0, 1.0)?,
            ObservationDist::Poisson { rate } => Ok(rate.clone()),
        }
    }
}

/// log N(y; μ, s²) = -0.5 * ln(2π) - ln(s) - (y - μ)² / (2s²)
fn normal_log_prob(y: &Tensor, loc: &Tensor, scale: &Tensor) -> Result<Tensor> {
    let half_ln_2pi = 0.5 * (2.0 * std::f64::consts::PI).ln();
    let z = y.broadcast_sub(loc)?.broadcast_div(scale)?;
    let log_scale = scale.log()?;
    ((z.sqr()? * (-0.5))?.broadcast_sub(&log_scale)? - half_ln_2pi)
}

/// log p(y) = y * ln(p) + (1 - y) * ln(1 - p)
fn bernoulli_log_prob(y: &Tensor, probs: &Tensor) -> Result<Tensor> {
    let log_p = probs.log()?;
    let log_1mp = probs.affine(-1.0, 1.0)?.log()?;
    let y = y.to_dtype(probs.dtype())?;
    let one_minus_y = y.affine(-1.0, 1.0)?;
    y.broadcast_mul(&log_p)? + one_minus_y.broadcast_mul(&log_1mp)?
}

/// log p(y) = y * ln(λ) - λ - lgamma(y + 1)
fn poisson_log_prob(y: &Tensor, rate: &Tensor) -> Result<Tensor> {
    let y = y.to_dtype(rate.dtype())?;
    let y_log_rate = y.broadcast_mul(&rate.log()?)?;
    let log_factorial = lgamma_plus_one(&y)?;
    y_log_rate.broadcast_sub(rate)?.broadcast_sub(&log_factorial)
}

/// lgamma(y + 1), evaluated on the host; depends on data only.
fn lgamma_plus_one(y: &Tensor) -> Result<Tensor> {
    let values: Vec<f64> = y.to_dtype(DType::F64)?.flatten_all()?.to_vec1()?;
    let lg: Vec<f64> = values.into_iter().map(|v| (v + 1.0).ln_gamma().0).collect();
    Tensor::from_vec(lg, y.dims(), y.device())?.to_dtype(y.dtype())
}

/// -0.5 * [n ln(2π) + ln|Σ| + (y - μ)ᵀ Σ⁻¹ (y - μ)] via Cholesky
fn mvn_log_prob(y: &Tensor, mean: &Tensor, covariance: &Tensor) -> Result<Tensor> {
    let n = mean.elem_count();
    let (dtype, device) = (mean.dtype(), mean.device());

    let (rows, vectorised) = match y.rank() {
        0 | 1 => (1, false),
        _ => (y.dim(0)?, true),
    };

    // zero-dimensional event: the density of the empty vector is 1
    if n == 0 {
        if y.elem_count() != 0 {
            return Err(Error::Msg(format!(
                "observations have {} values for an empty event",
                y.elem_count()
            )));
        }
        return if vectorised {
            Tensor::zeros(rows, dtype, device)
        } else {
            Tensor::zeros((), dtype, device)
        };
    }

    let mu: Vec<f64> = mean.to_dtype(DType::F64)?.flatten_all()?.to_vec1()?;
    let sigma: Vec<f64> = covariance.to_dtype(DType::F64)?.flatten_all()?.to_vec1()?;
    let chol = DMatrix::from_row_slice(n, n, &sigma)
        .cholesky()
        .ok_or_else(|| Error::Msg("covariance is not positive definite".into()))?;

    let log_det: f64 = 2.0 * chol.l().diagonal().iter().map(|d| d.ln()).sum::<f64>();
    let ln_2pi = (2.0 * std::f64::consts::PI).ln();

    let y_all: Vec<f64> = y.to_dtype(DType::F64)?.flatten_all()?.to_vec1()?;
    if y_all.len() != rows * n {
        return Err(Error::Msg(format!(
            "observations have {} values, expected {} x {}",
            y_all.len(),
            rows,
            n
        )));
    }

    let out: Vec<f64> = y_all
        .chunks(n)
        .map(|row| {
            let resid = DVector::from_iterator(n, row.iter().zip(mu.iter()).map(|(a, b)| a - b));
            let maha = resid.dot(&chol.solve(&resid));
            -0.5 * (n as f64 * ln_2pi + log_det + maha)
        })
        .collect();

    let out = if vectorised {
        Tensor::from_vec(out, rows, device)?
    } else {
        Tensor::new(out[0], device)?
    };
    out.to_dtype(dtype)
}
