#![recursion_limit = "256"]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cube_whisper::checkpoint::CheckpointManager;
use cube_whisper::config::AppConfig;
use cube_whisper::training::dashboard_msg::TrainingUpdate;
use cube_whisper::training::trainer::{Trainer, TrainingSummary};
use cube_whisper::ui::training_dashboard::{DashboardState, TrainingStatus};
use cube_whisper::ui::training_view;

/// Train the speech network on a directory of recorded samples.
#[derive(Parser)]
#[command(name = "train", about = "Train a cube algorithm recognizer")]
struct Cli {
    /// Checkpoint file to resume from and save to
    checkpoint: PathBuf,

    /// Directory containing index.json and the recordings
    sample_dir: PathBuf,

    /// Override the optimizer step size
    step_size: Option<f64>,

    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Run in headless mode (log output, no TUI dashboard)
    #[arg(long)]
    headless: bool,

    /// Stop after this many epochs
    #[arg(long)]
    epochs: Option<usize>,

    /// Override the random seed
    #[arg(long)]
    seed: Option<u64>,
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
    let mut app_config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    // Apply CLI overrides
    if let Some(step_size) = cli.step_size {
        app_config.training.step_size = step_size;
    }
    if let Some(epochs) = cli.epochs {
        app_config.training.max_epochs = Some(epochs);
    }
    if let Some(seed) = cli.seed {
        app_config.training.seed = seed;
    }
    app_config.validate().context("validating command line overrides")?;

    let manager = CheckpointManager::new(&cli.checkpoint);
    let trainer = Trainer::initialize(&app_config, manager, &cli.sample_dir)
        .context("initializing trainer")?;

    let summary = if cli.headless {
        let stop = Arc::new(AtomicBool::new(false));
        install_interrupt_handler(stop.clone())?;
        trainer.run_headless(stop).context("training")?
    } else {
        run_dashboard(trainer)?
    };

    info!(
        epochs = summary.epochs_this_run,
        total = summary.epochs_total,
        path = %cli.checkpoint.display(),
        "saved checkpoint"
    );
    Ok(())
}

/// The first Ctrl-C finishes the current epoch and saves; a second one exits
/// without saving.
fn install_interrupt_handler(stop: Arc<AtomicBool>) -> Result<()> {
    ctrlc::set_handler(move || {
        if stop.swap(true, Ordering::Relaxed) {
            std::process::exit(130);
        }
        warn!("interrupted, stopping after the current epoch");
    })
    .context("installing Ctrl-C handler")
}

fn run_dashboard(trainer: Trainer) -> Result<TrainingSummary> {
    let (update_tx, update_rx) = mpsc::channel::<TrainingUpdate>();

    let pause = Arc::new(AtomicBool::new(false));
    let quit = Arc::new(AtomicBool::new(false));

    let pause_clone = pause.clone();
    let quit_clone = quit.clone();

    let training_handle = std::thread::spawn(move || {
        trainer.run_with_dashboard(update_tx, pause_clone, quit_clone)
    });

    let ui_result = run_dashboard_ui(update_rx, pause, quit.clone());
    // Stops the trainer at its next epoch boundary if the UI bailed out early
    quit.store(true, Ordering::Relaxed);

    let summary = training_handle
        .join()
        .map_err(|_| anyhow::anyhow!("training thread panicked"))?
        .context("training")?;
    ui_result?;
    Ok(summary)
}

fn run_dashboard_ui(
    update_rx: mpsc::Receiver<TrainingUpdate>,
    pause: Arc<AtomicBool>,
    quit: Arc<AtomicBool>,
) -> Result<()> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("creating terminal")?;

    let mut dashboard = DashboardState::new();
    let frame_duration = Duration::from_millis(100);
    let mut quitting = false;

    let result = loop {
        loop {
            match update_rx.try_recv() {
                Ok(update) => dashboard.apply_update(update),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if dashboard.status != TrainingStatus::Failed {
                        dashboard.status = TrainingStatus::Finished;
                    }
                    break;
                }
            }
        }

        if let Err(e) = terminal.draw(|f| training_view::render(f, &dashboard)) {
            break Err(anyhow::Error::new(e).context("drawing dashboard"));
        }

        let finished = matches!(
            dashboard.status,
            TrainingStatus::Finished | TrainingStatus::Failed
        );
        // Leave once the final save after a quit request has been reported
        if quitting && finished {
            break Ok(());
        }

        if event::poll(frame_duration).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Char('Q') => {
                        quit.store(true, Ordering::Relaxed);
                        quitting = true;
                    }
                    KeyCode::Char('p') | KeyCode::Char('P') if !finished && !quitting => {
                        let was_paused = pause.load(Ordering::Relaxed);
                        pause.store(!was_paused, Ordering::Relaxed);
                        dashboard.status = if was_paused {
                            TrainingStatus::Running
                        } else {
                            TrainingStatus::Paused
                        };
                    }
                    _ => {}
                }
            }
        }
    };

    // Terminal cleanup; use let _ = to avoid a double panic
    let _ = disable_raw_mode();
    let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen);
    let _ = terminal.show_cursor();
    result
}
