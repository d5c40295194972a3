//! # doctrack-cli: Doctrack Command-Line Interface
//!
//! Operates on a single YAML dataset file holding master records and
//! Document Applications.
//!
//! ## Subcommands
//!
//! - `check`: re-validate every stored document without writing
//! - `save`: run the save pipeline for one document
//! - `submit`: finalize a document and supersede its predecessor
//! - `sweep`: run the expiry sweep once
//! - `daemon`: run the expiry sweep daily
//!
//! ## Crate Policy
//!
//! - Handler functions delegate to `doctrack-engine`; no business rules here.
//! - Handlers return `anyhow::Result<u8>` where the `u8` is the exit code.

pub mod check;
pub mod config;
pub mod daemon;
pub mod data;
pub mod document;
pub mod sweep;
