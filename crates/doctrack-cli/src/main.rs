//! # doctrack CLI entry point
//!
//! Parses command-line arguments, loads configuration and dispatches to
//! subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use doctrack_cli::check::{run_check, CheckArgs};
use doctrack_cli::config::DoctrackConfig;
use doctrack_cli::daemon::{run_daemon, DaemonArgs};
use doctrack_cli::document::{run_save, run_submit, SaveArgs, SubmitArgs};
use doctrack_cli::sweep::{run_sweep, SweepArgs};

/// Doctrack: document expiry tracking.
///
/// Validates and finalizes Document Applications, and runs the daily sweep
/// that expires lapsed documents and sends reminders.
#[derive(Parser, Debug)]
#[command(name = "doctrack", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Dataset file; overrides the configured `data_path`.
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Re-validate every stored document without writing.
    Check(CheckArgs),

    /// Validate, calculate expiry and store one Document Application.
    Save(SaveArgs),

    /// Submit a stored document, superseding its predecessor.
    Submit(SubmitArgs),

    /// Run the expiry sweep once.
    Sweep(SweepArgs),

    /// Run the expiry sweep every day at the configured hour.
    Daemon(DaemonArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match DoctrackConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };
    if let Some(data) = cli.data.clone() {
        config.data_path = data;
    }

    init_tracing(cli.verbose, config.log.json);
    tracing::debug!(data_path = %config.data_path.display(), "doctrack CLI starting");

    let result = match cli.command {
        Commands::Check(args) => run_check(&args, &config),
        Commands::Save(args) => run_save(&args, &config),
        Commands::Submit(args) => run_submit(&args, &config),
        Commands::Sweep(args) => run_sweep(&args, &config),
        Commands::Daemon(args) => run_daemon(&args, &config),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

/// `RUST_LOG` wins over `-v` when set.
fn init_tracing(verbose: u8, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}
