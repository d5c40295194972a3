//! # Save and Submit Subcommands
//!
//! - `save --file DOC.yaml` runs the save pipeline for one Document
//!   Application read from a YAML file.
//! - `submit --id UUID` finalizes a stored document, superseding its
//!   predecessor.
//!
//! Both write through [`FileStore`], so every step of a submission and
//! any compensating write reach the dataset file as they happen. The saved
//! or submitted document is printed as YAML.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use uuid::Uuid;

use doctrack_core::{ApplicationId, SystemClock};
use doctrack_engine::DocumentService;
use doctrack_state::DocumentApplication;

use crate::config::DoctrackConfig;
use crate::data::{read_yaml, FileStore};

/// Arguments for `doctrack save`.
#[derive(Args, Debug)]
pub struct SaveArgs {
    /// YAML file holding one Document Application.
    #[arg(long)]
    pub file: PathBuf,
}

/// Arguments for `doctrack submit`.
#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Identifier of the stored document.
    #[arg(long)]
    pub id: Uuid,
}

/// Execute `doctrack save`.
pub fn run_save(args: &SaveArgs, config: &DoctrackConfig) -> Result<u8> {
    let doc: DocumentApplication = read_yaml(&args.file)?;
    let store = FileStore::open(&config.data_path)?;
    let service = DocumentService::new(Arc::new(store), Arc::new(SystemClock));

    let saved = service
        .save(doc)
        .with_context(|| format!("document in {} was not saved", args.file.display()))?;
    print!("{}", serde_yaml::to_string(&saved)?);
    Ok(0)
}

/// Execute `doctrack submit`.
pub fn run_submit(args: &SubmitArgs, config: &DoctrackConfig) -> Result<u8> {
    let id = ApplicationId::from_uuid(args.id);
    let store = FileStore::open(&config.data_path)?;
    let service = DocumentService::new(Arc::new(store), Arc::new(SystemClock));

    let submitted = service
        .submit(id)
        .with_context(|| format!("document {id} was not submitted"))?;
    print!("{}", serde_yaml::to_string(&submitted)?);
    Ok(0)
}
