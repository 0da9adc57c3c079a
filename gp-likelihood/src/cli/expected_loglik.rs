use anyhow::Result;
use candle_core::Device;
use clap::Args;
use log::info;
use std::path::PathBuf;

use super::{build_likelihood, LikelihoodType};
use crate::io::{read_tensor, write_columns};

#[derive(Args, Debug)]
pub struct ExpectedLoglikArgs {
    #[arg(short, long, default_value = "gaussian")]
    pub likelihood: LikelihoodType,

    #[arg(short, long, help = "Observations (N x D)")]
    pub y: PathBuf,

    #[arg(short, long, help = "Variational means (N x D)")]
    pub mean: PathBuf,

    #[arg(short, long, help = "Variational variances (N x D)")]
    pub variance: PathBuf,

    #[arg(long, default_value = "1.0", help = "Gaussian observation noise σ")]
    pub obs_stddev: f64,

    #[arg(long, help = "Gauss-Hermite points (default: closed form for Gaussian, 20 otherwise)")]
    pub quad_points: Option<usize>,

    #[arg(short, long, default_value = "stdout", help = "Output file (.gz to compress)")]
    pub output: String,
}

pub fn run(args: &ExpectedLoglikArgs) -> Result<()> {
    let device = Device::Cpu;

    let path_str = |p: &PathBuf| -> Result<String> {
        Ok(p.to_str().ok_or_else(|| anyhow::anyhow!("Invalid path"))?.to_string())
    };

    let y = read_tensor(&path_str(&args.y)?, &device)?;
    let mean = read_tensor(&path_str(&args.mean)?, &device)?;
    let variance = read_tensor(&path_str(&args.variance)?, &device)?;
    info!("y: {:?}, mean: {:?}, variance: {:?}", y.dims(), mean.dims(), variance.dims());

    if y.dims() != mean.dims() || y.dims() != variance.dims() {
        anyhow::bail!("y, mean and variance must have the same shape");
    }

    let n = y.dim(0)?;
    let likelihood = build_likelihood(
        args.likelihood,
        n,
        args.obs_stddev,
        args.quad_points,
        &device,
    )?;
    info!(
        "{} likelihood, {} integration over {} data points",
        likelihood.name(),
        likelihood.integrator().name(),
        n
    );

    let ell: Vec<f64> = likelihood
        .expected_log_likelihood(&y, &mean, &variance)?
        .to_vec1()?;
    info!("sum of expected log-likelihoods: {:.6}", ell.iter().sum::<f64>());

    write_columns(&args.output, &["expected_loglik"], &[ell])
}
