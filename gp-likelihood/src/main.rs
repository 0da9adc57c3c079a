use anyhow::Result;
use clap::Parser;
use gp_likelihood::cli::{expected_loglik, predict, Cli, Commands};

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::ExpectedLoglik(args) => {
            expected_loglik::run(args)?;
        }
        Commands::Predict(args) => {
            predict::run(args)?;
        }
    }

    Ok(())
}
