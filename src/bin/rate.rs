#![recursion_limit = "256"]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cube_whisper::config::AppConfig;
use cube_whisper::dataset::load_sample_set;
use cube_whisper::inference::{rate_samples, Classifier};

/// Score every sample in a dataset by how likely the model finds its label.
#[derive(Parser)]
#[command(name = "rate", about = "Rank samples by CTC log-likelihood, worst first")]
struct Cli {
    /// Trained checkpoint file
    checkpoint: PathBuf,

    /// Directory containing index.json and the recordings
    sample_dir: PathBuf,

    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let app_config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    let classifier = Classifier::load(&cli.checkpoint)
        .with_context(|| format!("loading checkpoint {}", cli.checkpoint.display()))?;
    let mut rng = StdRng::seed_from_u64(app_config.training.seed);
    let samples = load_sample_set(&cli.sample_dir, classifier.extractor(), &mut rng)
        .with_context(|| format!("loading samples from {}", cli.sample_dir.display()))?;
    info!(samples = samples.len(), "rating samples");

    let training = &app_config.training;
    let ratings = rate_samples(
        &classifier,
        &samples,
        training.cost_batch_size,
        training.max_concurrency,
    )
    .context("computing log-likelihoods")?;

    for (rank, rating) in ratings.iter().enumerate() {
        println!("{}. {} - {:e}", rank, rating.id, rating.log_likelihood);
    }
    Ok(())
}
