//! # Daemon Subcommand
//!
//! Long-running process that runs the expiry sweep once per day at the
//! configured UTC hour. The dataset file is re-read on every run, so edits
//! made by `save` and `submit` between runs are picked up.
//!
//! When `metrics.listen` is configured, a Prometheus scrape endpoint is
//! served on that address for the sweep counters.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use metrics_exporter_prometheus::PrometheusBuilder;

use doctrack_core::{Clock, SystemClock};
use doctrack_engine::{DailySchedule, NotificationDispatcher, SweepReport, TracingDispatcher};

use crate::config::DoctrackConfig;
use crate::sweep::sweep_data_file;

/// Arguments for `doctrack daemon`.
#[derive(Args, Debug)]
pub struct DaemonArgs {
    /// Run the sweep immediately on startup, regardless of the hour. A
    /// completed run counts as that day's sweep.
    #[arg(long)]
    pub run_now: bool,
}

/// Execute `doctrack daemon`. Returns when interrupted.
pub fn run_daemon(args: &DaemonArgs, config: &DoctrackConfig) -> Result<u8> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(serve(args.run_now, config.clone()))
}

async fn serve(run_now: bool, config: DoctrackConfig) -> Result<u8> {
    if let Some(addr) = config.metrics.listen {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .with_context(|| format!("failed to start metrics endpoint on {addr}"))?;
        tracing::info!(%addr, "metrics endpoint listening");
    }

    let mut schedule = DailySchedule::new(config.sweep.hour_utc)?;
    let config = Arc::new(config);
    let dispatcher: Arc<dyn NotificationDispatcher> = Arc::new(TracingDispatcher);
    let mut interval = tokio::time::interval(Duration::from_secs(config.sweep.poll_interval_secs));

    tracing::info!(
        hour_utc = schedule.hour_utc(),
        poll_interval_secs = config.sweep.poll_interval_secs,
        data_path = %config.data_path.display(),
        "doctrack daemon started"
    );

    if run_now {
        sweep_and_mark(&mut schedule, Utc::now(), config.clone(), dispatcher.clone()).await;
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = Utc::now();
                if !schedule.should_fire(now) {
                    continue;
                }
                sweep_and_mark(&mut schedule, now, config.clone(), dispatcher.clone()).await;
            }
            _ = &mut shutdown => {
                tracing::info!("interrupt received; shutting down");
                return Ok(0);
            }
        }
    }
}

/// Run one sweep and, when it completes, mark the schedule as fired for the
/// day of `now` so later polls that day skip it.
async fn sweep_and_mark(
    schedule: &mut DailySchedule,
    now: DateTime<Utc>,
    config: Arc<DoctrackConfig>,
    dispatcher: Arc<dyn NotificationDispatcher>,
) -> Option<SweepReport> {
    let report = run_sweep_blocking(config, dispatcher).await?;
    schedule.mark_fired(now.date_naive());
    Some(report)
}

/// Run one sweep on the blocking pool. Failures are logged and yield
/// `None`, leaving the schedule unmarked so the next poll retries.
async fn run_sweep_blocking(
    config: Arc<DoctrackConfig>,
    dispatcher: Arc<dyn NotificationDispatcher>,
) -> Option<SweepReport> {
    let result = tokio::task::spawn_blocking(move || {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        sweep_data_file(&config, clock, dispatcher)
    })
    .await;
    match result {
        Ok(Ok(report)) => Some(report),
        Ok(Err(e)) => {
            tracing::error!("daily sweep failed: {e:#}");
            None
        }
        Err(e) => {
            tracing::error!("daily sweep task panicked: {e}");
            None
        }
    }
}
