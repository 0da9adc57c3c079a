//! Trainable and fixed likelihood parameters.

use candle_core::{DType, Device, Error, Result, Tensor, Var};

/// softplus(x) = log(1 + exp(x)), computed as max(x, 0) + log(1 + exp(-|x|)).
///
/// Once exp(-|x|) is below the dtype's resolution next to 1, the tail
/// switches to its series e - e²/2 with e = exp(-|x|). The result never
/// drops below [`positive_floor`], so σ² of a softplus-constrained σ stays
/// a normal float.
pub fn softplus(x: &Tensor) -> Result<Tensor> {
    let abs_x = x.abs()?;
    let e = abs_x.neg()?.exp()?;
    let near = (&e + 1.0)?.log()?;
    let far = (&e * (&e * -0.5)?.affine(1.0, 1.0)?)?;

    let tail = abs_x.ge(series_switch(x.dtype()))?.where_cond(&far, &near)?;
    (x.relu()? + tail)?.maximum(positive_floor(x.dtype()))
}

/// |x| beyond which the log1p tail is replaced by its series
fn series_switch(dtype: DType) -> f64 {
    match dtype {
        DType::F64 => 12.0,
        _ => 5.0,
    }
}

/// Smallest value `softplus` returns for a given dtype
pub fn positive_floor(dtype: DType) -> f64 {
    match dtype {
        DType::F64 => 1e-150,
        DType::F16 => 1e-2,
        _ => 1e-18,
    }
}

/// log(exp(x) - 1), the inverse of `softplus` for x > 0
fn inverse_softplus(x: f64) -> f64 {
    x + (-(-x).exp_m1()).ln()
}

/// Strictly positive parameter σ = softplus(u) over an unconstrained
/// trainable variable u.
///
/// An optimizer updates `u` freely; the constrained value stays > 0.
#[derive(Clone, Debug)]
pub struct PositiveReal {
    /// unconstrained u, same shape as the constrained value
    raw: Var,
}

impl PositiveReal {
    /// Wrap a tensor of strictly positive, finite values.
    ///
    /// # Arguments
    /// * `value` - initial constrained value, scalar or vector
    pub fn new(value: &Tensor) -> Result<Self> {
        let values: Vec<f64> = value.to_dtype(DType::F64)?.flatten_all()?.to_vec1()?;

        if let Some(bad) = values.iter().find(|v| !(v.is_finite() && **v > 0.0)) {
            return Err(Error::Msg(format!(
                "PositiveReal requires finite values > 0, got {}",
                bad
            )));
        }

        let raw: Vec<f64> = values.into_iter().map(inverse_softplus).collect();
        let raw = Tensor::from_vec(raw, value.dims(), value.device())?.to_dtype(value.dtype())?;

        Ok(Self {
            raw: Var::from_tensor(&raw)?,
        })
    }

    /// Scalar convenience constructor (stored as f64).
    pub fn from_f64(value: f64, device: &Device) -> Result<Self> {
        Self::new(&Tensor::new(value, device)?)
    }

    /// Constrained value σ = softplus(u); differentiable w.r.t. u.
    pub fn value(&self) -> Result<Tensor> {
        softplus(self.raw.as_tensor())
    }

    /// The unconstrained variable u, to hand to an optimizer.
    pub fn unconstrained(&self) -> &Var {
        &self.raw
    }
}

/// Fixed parameter; never receives gradients.
#[derive(Clone, Debug)]
pub struct Static {
    value: Tensor,
}

impl Static {
    pub fn new(value: &Tensor) -> Self {
        Self {
            value: value.detach(),
        }
    }

    pub fn from_f64(value: f64, device: &Device) -> Result<Self> {
        Ok(Self::new(&Tensor::new(value, device)?))
    }

    pub fn value(&self) -> Result<Tensor> {
        Ok(self.value.clone())
    }
}

/// Either a trainable positive parameter or a fixed one.
#[derive(Clone, Debug)]
pub enum Parameter {
    Positive(PositiveReal),
    Static(Static),
}

impl Parameter {
    pub fn value(&self) -> Result<Tensor> {
        match self {
            Parameter::Positive(p) => p.value(),
            Parameter::Static(s) => s.value(),
        }
    }

    /// Variables an optimizer should update (empty for `Static`).
    pub fn trainable_vars(&self) -> Vec<Var> {
        match self {
            Parameter::Positive(p) => vec![p.unconstrained().clone()],
            Parameter::Static(_) => vec![],
        }
    }
}

impl From<PositiveReal> for Parameter {
    fn from(p: PositiveReal) -> Self {
        Parameter::Positive(p)
    }
}

impl From<Static> for Parameter {
    fn from(s: Static) -> Self {
        Parameter::Static(s)
    }
}
