//! # Engine Error Types
//!
//! [`DocumentError`] is what the save and submit pipeline returns. It wraps
//! the per-crate error enums so that callers can match on the category
//! (correctable input, master data misconfiguration, backend failure,
//! illegal status move, failed cascade) without string inspection.
//!
//! Sweep-level and dispatcher errors have their own types: per-document
//! sweep failures never reach the caller as errors, they are collected in
//! the [`SweepReport`](crate::sweep::SweepReport).

use thiserror::Error;

use doctrack_core::{ConfigurationError, StoreError, ValidationError};
use doctrack_state::LifecycleError;

use crate::lifecycle::CascadeError;

/// Failure of a save, submit or validate call. Nothing is persisted when
/// one of these is returned, except as described on
/// [`CascadeError::CompensationFailed`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// The document breaks a data-integrity or business rule.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Master data lacks a required setting.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An illegal status or submission transition.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// The predecessor status cascade failed.
    #[error(transparent)]
    Cascade(#[from] CascadeError),
}

/// A whole sweep run could not proceed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SweepError {
    /// Another run holds the job lock.
    #[error("an expiry sweep is already running")]
    AlreadyRunning,

    /// The candidate documents could not be loaded.
    #[error("failed to load documents for sweep: {0}")]
    Load(#[source] StoreError),
}

/// A notification could not be delivered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The transport (mail relay, alert service) failed.
    #[error("notification transport failed: {0}")]
    Transport(String),

    /// The transport refused a recipient.
    #[error("recipient {recipient} rejected: {reason}")]
    Rejected {
        /// The refused address or user.
        recipient: String,
        /// Reason reported by the transport.
        reason: String,
    },
}

/// Invalid daily schedule parameters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// Hour outside 0..=23.
    #[error("sweep hour must be between 0 and 23, got {hour}")]
    InvalidHour {
        /// The rejected hour.
        hour: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use doctrack_core::RecordKind;

    #[test]
    fn test_document_error_is_transparent() {
        let err: DocumentError = ValidationError::not_found(RecordKind::Applicant, "APP-9").into();
        assert_eq!(err.to_string(), "Applicant APP-9 not found");
    }

    #[test]
    fn test_sweep_error_display() {
        let err = SweepError::Load(StoreError::Backend("disk full".into()));
        assert_eq!(
            err.to_string(),
            "failed to load documents for sweep: store backend error: disk full"
        );
    }
}
