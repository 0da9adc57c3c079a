//! Likelihoods for variational Gaussian-process models.
//!
//! A likelihood turns latent function values `f` into an observation
//! distribution (`link_function`), turns a latent Gaussian posterior into a
//! predictive distribution (`predict`), and computes the expected
//! log-likelihood `E_q[log p(y | f)]` under per-datapoint Gaussian marginals
//! by handing the log-density to an integrator.
//!
//! # Example
//!
//! ```ignore
//! use candle_core::{Device, Tensor};
//! use gp_likelihood::likelihood::{Bernoulli, Gaussian, Likelihood};
//!
//! let dev = Device::Cpu;
//! let y = Tensor::new(&[[1.0f64], [0.0]], &dev)?;
//! let m = Tensor::new(&[[0.3f64], [-0.2]], &dev)?;
//! let v = Tensor::new(&[[0.5f64], [0.1]], &dev)?;
//!
//! let gauss = Likelihood::from(Gaussian::new(2, 1.0, &dev)?);
//! let ell = gauss.expected_log_likelihood(&y, &m, &v)?; // closed form, shape (2,)
//!
//! let probit = Likelihood::from(Bernoulli::new(2));
//! let ell = probit.expected_log_likelihood(&y, &m, &v)?; // Gauss-Hermite, shape (2,)
//! ```

pub mod cli;
pub mod distributions;
pub mod integrators;
pub mod io;
pub mod likelihood;
pub mod parameters;

pub use candle_core;
pub use candle_nn;
