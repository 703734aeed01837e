#![recursion_limit = "256"]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

use cube_whisper::config::AppConfig;
use cube_whisper::inference::{Classifier, DecodeMode};
use cube_whisper::labels::format_labels;

/// Decode a single recording into cube notation.
#[derive(Parser)]
#[command(name = "classify", about = "Transcribe a spoken cube algorithm")]
struct Cli {
    /// Trained checkpoint file
    checkpoint: PathBuf,

    /// WAV recording to classify
    sample: PathBuf,

    /// Decode with prefix search instead of the best path
    #[arg(long)]
    prefix_search: bool,

    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
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
    let mut app_config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    if cli.prefix_search {
        app_config.decode.mode = DecodeMode::PrefixSearch;
    }

    let classifier = Classifier::load(&cli.checkpoint)
        .with_context(|| format!("loading checkpoint {}", cli.checkpoint.display()))?;
    let mut rng = StdRng::seed_from_u64(app_config.training.seed);
    let result = classifier
        .classify_file(&cli.sample, &app_config.decode, &mut rng)
        .with_context(|| format!("classifying {}", cli.sample.display()))?;

    println!("{}", result.moves);
    println!("raw labels: {}", format_labels(&result.labels));
    Ok(())
}
