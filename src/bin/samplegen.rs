use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use cube_whisper::dataset::scramble::generate_samples;

/// Print a manifest of random scrambles to record.
#[derive(Parser)]
#[command(name = "samplegen", about = "Generate a sample manifest of random scrambles")]
struct Cli {
    /// Number of samples to generate
    count: usize,
}

fn main() -> ExitCode {
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
    let mut rng = StdRng::from_os_rng();
    let samples = generate_samples(cli.count, &mut rng);
    let json = serde_json::to_string_pretty(&samples).context("encoding manifest")?;
    println!("{json}");
    Ok(())
}
