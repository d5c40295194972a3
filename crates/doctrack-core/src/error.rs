//! # Error Types: Save-Time Error Taxonomy
//!
//! Defines the errors shared by every Doctrack crate. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - [`ValidationError`]: the document (or its references) is wrong and the
//!   caller must correct it before saving again. Missing referenced records
//!   are reported here as [`ValidationError::NotFound`].
//! - [`ConfigurationError`]: master data lacks a required setting. Treated
//!   as a hard stop exactly like a validation failure.
//! - [`StoreError`]: the document store backend failed.
//!
//! Every variant carries the identifiers involved so the message can be
//! surfaced to the caller verbatim.

use chrono::NaiveDate;
use thiserror::Error;

use crate::identity::{ApplicantId, ApplicationId, CategoryId, DocumentTypeId, EmployeeId};
use crate::temporal::ValidityPeriod;

/// Kind of record a lookup was made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// A document application.
    DocumentApplication,
    /// A document type master record.
    DocumentType,
    /// A document category master record.
    DocumentCategory,
    /// An applicant record.
    Applicant,
    /// An employee record.
    Employee,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::DocumentApplication => "Document Application",
            Self::DocumentType => "Document Type",
            Self::DocumentCategory => "Document Category",
            Self::Applicant => "Applicant",
            Self::Employee => "Employee",
        };
        f.write_str(s)
    }
}

/// A document failed a data-integrity or business rule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is empty.
    #[error("{field} is required")]
    MissingField {
        /// Human-readable field name.
        field: &'static str,
    },

    /// Expiry override enabled without a reason.
    #[error("override reason is required when expiry override is enabled")]
    OverrideReasonRequired,

    /// Referenced category is inactive.
    #[error("document category {category} is inactive")]
    InactiveCategory {
        /// The inactive category.
        category: CategoryId,
    },

    /// Referenced document type is inactive.
    #[error("document type {document_type} is inactive")]
    InactiveDocumentType {
        /// The inactive document type.
        document_type: DocumentTypeId,
    },

    /// Document type belongs to a different category than the document.
    #[error("document type {document_type} does not belong to category {category}")]
    CategoryMismatch {
        /// The document type.
        document_type: DocumentTypeId,
        /// The category selected on the document.
        category: CategoryId,
    },

    /// The document type does not permit renewal.
    #[error("renewal is not allowed for document type {document_type}")]
    RenewalNotAllowed {
        /// The document type.
        document_type: DocumentTypeId,
    },

    /// A renewal or extension has no predecessor reference.
    #[error("previous document is required for {transaction}")]
    PredecessorRequired {
        /// Transaction type name.
        transaction: &'static str,
    },

    /// The predecessor has not been submitted.
    #[error("this application cannot be {action} because previous document {predecessor} is not submitted")]
    PredecessorNotSubmitted {
        /// The predecessor.
        predecessor: ApplicationId,
        /// "renewed" or "extended".
        action: &'static str,
    },

    /// The predecessor is not in an eligible status.
    #[error("only Active / Issued documents can be {action}; {predecessor} is {status}")]
    PredecessorIneligible {
        /// The predecessor.
        predecessor: ApplicationId,
        /// Its current status.
        status: String,
        /// "renewed" or "extended".
        action: &'static str,
    },

    /// The predecessor is of a different document type.
    #[error("transaction must be for the same document type: expected {expected}, previous document is {found}")]
    PredecessorTypeMismatch {
        /// This document's type.
        expected: DocumentTypeId,
        /// The predecessor's type.
        found: DocumentTypeId,
    },

    /// The predecessor's expiry date is not set.
    #[error("previous document {predecessor} has no expiry date")]
    PredecessorExpiryUnknown {
        /// The predecessor.
        predecessor: ApplicationId,
    },

    /// The extension does not move the end date forward.
    #[error("extended date {extended_date} must be after current expiry date {expiry_date}")]
    ExtendedDateNotAfterExpiry {
        /// Requested extension end date.
        extended_date: NaiveDate,
        /// The predecessor's expiry date.
        expiry_date: NaiveDate,
    },

    /// Another Active document exists for the same applicant and type.
    #[error("another Active document ({existing}) already exists for applicant {applicant} and document type {document_type}")]
    DuplicateActive {
        /// The applicant.
        applicant: ApplicantId,
        /// The document type.
        document_type: DocumentTypeId,
        /// The conflicting document.
        existing: ApplicationId,
    },

    /// Expiry date is on or before the issue date.
    #[error("expiry date {expiry_date} must be after issue date {issue_date}")]
    ExpiryNotAfterIssue {
        /// Issue date.
        issue_date: NaiveDate,
        /// Expiry date.
        expiry_date: NaiveDate,
    },

    /// Adding the validity period leaves the supported calendar range.
    #[error("{date} plus {period} is outside the supported date range")]
    DateOutOfRange {
        /// Reference date.
        date: NaiveDate,
        /// Period being added.
        period: ValidityPeriod,
    },

    /// Employee applicant without an employee reference.
    #[error("employee is required when applicant type is Employee")]
    EmployeeRequired,

    /// The employee record carries no name.
    #[error("unable to fetch employee name for {employee}")]
    EmployeeNameUnavailable {
        /// The employee.
        employee: EmployeeId,
    },

    /// External applicant without a full name.
    #[error("full name is required for an External applicant")]
    FullNameRequired,

    /// Only Issued or Active documents can be finalized.
    #[error("document in status {status} cannot be submitted; it must be Issued or Active")]
    NotSubmittable {
        /// The current status.
        status: String,
    },

    /// A referenced record does not exist.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Kind of record.
        kind: RecordKind,
        /// Identifier that was looked up.
        id: String,
    },
}

impl ValidationError {
    /// Construct a not-found error for any displayable identifier.
    pub fn not_found(kind: RecordKind, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/// Master data is missing a setting required to process a document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// `has_expiry` is set but no (non-zero) validity period is configured.
    #[error("validity period not defined in document type {document_type}")]
    ValidityPeriodNotDefined {
        /// The misconfigured document type.
        document_type: DocumentTypeId,
    },

    /// The document type is not linked to a category.
    #[error("document category is not defined in document type {document_type}")]
    CategoryNotDefined {
        /// The misconfigured document type.
        document_type: DocumentTypeId,
    },
}

/// Failure inside a document store backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backend rejected or failed the operation.
    #[error("store backend error: {0}")]
    Backend(String),

    /// Stored data could not be decoded.
    #[error("corrupt stored data: {0}")]
    Corrupt(String),
}
