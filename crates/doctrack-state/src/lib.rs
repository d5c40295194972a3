//! # doctrack-state: Document Lifecycle and Master Data
//!
//! Holds the records Doctrack operates on and the rules that belong to a
//! single record in isolation.
//!
//! ## Records
//!
//! - **Document Application** (`document.rs`): a document issued to an
//!   applicant, with the status lifecycle
//!   `Draft → Issued → Active → Renewed | Extended | Expired`, the
//!   separate submission marker, predecessor links for renewals and
//!   extensions, and the supporting-document rows.
//!
//! - **Master data** (`master.rs`): document categories, document types
//!   (validity period, renewal and reminder rules), applicants and
//!   employees.
//!
//! ## Design
//!
//! Status is a runtime enum rather than a typestate: documents are loaded
//! from a store in arbitrary status, and the expiry sweep operates over
//! mixed collections. Every transition method checks the source status and
//! appends a [`TransitionRecord`], so an illegal move is an error value and
//! never a silent overwrite. Cross-record rules (predecessor eligibility,
//! duplicate detection) live in `doctrack-engine`.

pub mod document;
pub mod master;

// ─── Document re-exports ────────────────────────────────────────────

pub use document::{
    DocumentApplication, DocumentStatus, LifecycleError, SubmissionState, SupportingDocument,
    TransactionType, TransitionEvidence, TransitionRecord,
};

// ─── Master data re-exports ─────────────────────────────────────────

pub use master::{Applicant, ApplicantType, DocumentCategory, DocumentType, Employee, ExpiryRule};
