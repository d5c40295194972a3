//! # Check Subcommand
//!
//! Re-runs validation and expiry calculation on every draft Document
//! Application in the dataset without writing anything. Submitted
//! documents get the duplicate-Active and date-order checks only. Prints
//! one line per document and exits non-zero when any document fails.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use doctrack_core::SystemClock;
use doctrack_engine::{ApplicationFilter, DocumentService, DocumentStore, Validator};

use crate::config::DoctrackConfig;
use crate::data::load_store;

/// Arguments for `doctrack check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Only report failing documents.
    #[arg(long)]
    pub quiet: bool,
}

/// Result of checking one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckLine {
    /// The document.
    pub id: String,
    /// `None` when valid, else the error message.
    pub error: Option<String>,
}

/// Validate every stored document. Returns one line per document, in
/// creation order.
pub fn check_store(store: Arc<dyn DocumentStore>) -> Result<Vec<CheckLine>> {
    let documents = store.query_applications(&ApplicationFilter::new())?;
    let service = DocumentService::new(store.clone(), Arc::new(SystemClock));
    let validator = Validator::new(store.as_ref());
    Ok(documents
        .into_iter()
        .map(|doc| {
            let id = doc.id.to_string();
            // A submitted successor's predecessor has already been
            // superseded, so only the invariants that still hold are checked.
            let result = if doc.is_submitted() {
                validator.check_cascade(&doc)
            } else {
                service.validate(doc).map(|_| ())
            };
            CheckLine {
                id,
                error: result.err().map(|e| e.to_string()),
            }
        })
        .collect())
}

/// Execute `doctrack check`.
pub fn run_check(args: &CheckArgs, config: &DoctrackConfig) -> Result<u8> {
    let store = load_store(&config.data_path)?;
    let lines = check_store(Arc::new(store))?;
    let failed = lines.iter().filter(|l| l.error.is_some()).count();

    for line in &lines {
        match &line.error {
            Some(err) => println!("FAIL {}: {err}", line.id),
            None if !args.quiet => println!("OK   {}", line.id),
            None => {}
        }
    }
    println!("{} checked, {failed} failed", lines.len());
    Ok(if failed == 0 { 0 } else { 1 })
}
