//! # Sweep Subcommand
//!
//! Runs the expiry sweep once against the dataset file and prints the run
//! report as JSON. Each document's flags and status reach the file before
//! its notification is dispatched, so a failed write means no send and a
//! later run retries the document.
//!
//! `--today` pins the evaluation date for backfills and rehearsals.
//! `--outbox` collects the notifications into a JSON file instead of
//! logging them.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;

use doctrack_core::{Clock, FixedClock, SystemClock};
use doctrack_engine::{
    ExpirySweep, NotificationDispatcher, OutboxDispatcher, SweepReport, TracingDispatcher,
};

use crate::config::DoctrackConfig;
use crate::data::FileStore;

/// Arguments for `doctrack sweep`.
#[derive(Args, Debug)]
pub struct SweepArgs {
    /// Evaluate as of this date (YYYY-MM-DD) instead of today.
    #[arg(long)]
    pub today: Option<NaiveDate>,

    /// Write notifications to this JSON file instead of the log.
    #[arg(long)]
    pub outbox: Option<PathBuf>,
}

/// Run one sweep against the dataset file.
///
/// Documents whose update could not be written stay untouched on disk, get
/// no notification and are listed in the report.
pub fn sweep_data_file(
    config: &DoctrackConfig,
    clock: Arc<dyn Clock>,
    dispatcher: Arc<dyn NotificationDispatcher>,
) -> Result<SweepReport> {
    let store = FileStore::open(&config.data_path)?;
    let sweep = ExpirySweep::new(Arc::new(store), dispatcher, clock, config.recipient_policy());
    sweep.run().context("expiry sweep failed")
}

/// Execute `doctrack sweep`.
pub fn run_sweep(args: &SweepArgs, config: &DoctrackConfig) -> Result<u8> {
    let clock: Arc<dyn Clock> = match args.today {
        Some(date) => Arc::new(FixedClock::new(date)),
        None => Arc::new(SystemClock),
    };

    let report = match &args.outbox {
        Some(path) => {
            let outbox = Arc::new(OutboxDispatcher::new());
            let report = sweep_data_file(config, clock, outbox.clone())?;
            let json = serde_json::to_string_pretty(&outbox.drain())?;
            std::fs::write(path, json)
                .with_context(|| format!("failed to write outbox: {}", path.display()))?;
            report
        }
        None => sweep_data_file(config, clock, Arc::new(TracingDispatcher))?,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(if report.failures.is_empty() { 0 } else { 1 })
}
