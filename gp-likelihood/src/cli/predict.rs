use anyhow::Result;
use candle_core::Device;
use clap::Args;
use log::info;
use std::path::PathBuf;

use super::{build_likelihood, LikelihoodType};
use crate::distributions::GaussianDistribution;
use crate::io::{read_tensor, write_columns};
use crate::likelihood::LikelihoodFunction;

#[derive(Args, Debug)]
pub struct PredictArgs {
    #[arg(short, long, default_value = "gaussian")]
    pub likelihood: LikelihoodType,

    #[arg(short, long, help = "Latent posterior mean (n values)")]
    pub mean: PathBuf,

    #[arg(short, long, help = "Latent posterior covariance (n x n)")]
    pub covariance: Option<PathBuf>,

    #[arg(short, long, help = "Latent marginal variances (n values), if no covariance")]
    pub variance: Option<PathBuf>,

    #[arg(long, default_value = "1.0", help = "Gaussian observation noise σ")]
    pub obs_stddev: f64,

    #[arg(short, long, default_value = "stdout", help = "Output file (.gz to compress)")]
    pub output: String,
}

pub fn run(args: &PredictArgs) -> Result<()> {
    let device = Device::Cpu;

    let path_str = |p: &PathBuf| -> Result<String> {
        Ok(p.to_str().ok_or_else(|| anyhow::anyhow!("Invalid path"))?.to_string())
    };

    let mean = read_tensor(&path_str(&args.mean)?, &device)?;
    let posterior = match (&args.covariance, &args.variance) {
        (Some(cov), None) => {
            let cov = read_tensor(&path_str(cov)?, &device)?;
            GaussianDistribution::new(mean, cov)?
        }
        (None, Some(var)) => {
            let var = read_tensor(&path_str(var)?, &device)?;
            GaussianDistribution::from_diagonal(mean, &var)?
        }
        _ => anyhow::bail!("give exactly one of --covariance or --variance"),
    };

    let n = posterior.event_size();
    let likelihood = build_likelihood(args.likelihood, n, args.obs_stddev, None, &device)?;
    info!("{} predictive over {} points", likelihood.name(), n);

    let predictive = likelihood.predict(&posterior)?;
    info!("predictive family: {}", predictive.name());

    let pred_mean: Vec<f64> = predictive.mean()?.flatten_all()?.to_vec1()?;
    let pred_var: Vec<f64> = predictive.variance()?.flatten_all()?.to_vec1()?;

    write_columns(&args.output, &["mean", "variance"], &[pred_mean, pred_var])
}
