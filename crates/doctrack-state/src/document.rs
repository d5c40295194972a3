//! # Document Application Lifecycle State Machine
//!
//! Models the lifecycle of a time-bound document (license, permit,
//! certification) issued to an applicant, from drafting through renewal,
//! extension or expiry.
//!
//! ## States
//!
//! ```text
//! Draft ──▶ Issued ──▶ Active ──▶ Renewed  (terminal)
//!   │          │         │
//!   │          │         ├──▶ Extended (terminal)
//!   └──────────┴──▶      │
//!                        └──▶ Expired  (terminal)
//! ```
//!
//! `Renewed`, `Extended` and `Expired` are reachable from both `Issued` and
//! `Active`. Once a document reaches one of them no further status change
//! is accepted.
//!
//! ## Submission
//!
//! Status is the business lifecycle; [`SubmissionState`] is the separate
//! finalization marker. A document is edited as a draft, then submitted
//! once. Only submitted documents can be renewed or extended.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use doctrack_core::{ApplicantId, ApplicationId, CategoryId, DocumentTypeId, EmployeeId};

use crate::master::ApplicantType;

// ─── Document Status ─────────────────────────────────────────────────

/// The lifecycle status of a Document Application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DocumentStatus {
    /// Being prepared; not yet issued.
    #[default]
    Draft,
    /// Issued to the applicant but not yet active.
    Issued,
    /// Active and valid.
    Active,
    /// Superseded by a renewal (terminal).
    Renewed,
    /// Superseded by an extension (terminal).
    Extended,
    /// Validity ended (terminal).
    Expired,
}

impl DocumentStatus {
    /// Statuses a predecessor may be in to be renewed or extended, and the
    /// statuses the expiry sweep scans.
    pub const IN_FORCE: [DocumentStatus; 2] = [DocumentStatus::Active, DocumentStatus::Issued];

    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Renewed | Self::Extended | Self::Expired)
    }

    /// Whether the document is in force (Active or Issued).
    pub fn is_in_force(&self) -> bool {
        Self::IN_FORCE.contains(self)
    }

    /// Canonical name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Issued => "Issued",
            Self::Active => "Active",
            Self::Renewed => "Renewed",
            Self::Extended => "Extended",
            Self::Expired => "Expired",
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Transaction Type ────────────────────────────────────────────────

/// What kind of transaction a Document Application records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TransactionType {
    /// A first issue of the document.
    #[default]
    #[serde(rename = "New Application")]
    NewApplication,
    /// Renewal of a prior document for a new validity cycle.
    Renewal,
    /// Extension of a prior document's end date.
    Extension,
}

impl TransactionType {
    /// Whether this transaction chains to a predecessor document.
    pub fn has_predecessor(&self) -> bool {
        matches!(self, Self::Renewal | Self::Extension)
    }

    /// Past-tense verb used in messages about the predecessor.
    pub fn predecessor_action(&self) -> &'static str {
        match self {
            Self::NewApplication => "issued",
            Self::Renewal => "renewed",
            Self::Extension => "extended",
        }
    }

    /// Canonical name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewApplication => "New Application",
            Self::Renewal => "Renewal",
            Self::Extension => "Extension",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Submission ──────────────────────────────────────────────────────

/// Finalization marker, independent of the business status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SubmissionState {
    /// Editable.
    #[default]
    Draft,
    /// Finalized.
    Submitted,
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors that can occur during document lifecycle transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// Attempted transition is not valid from the current status.
    #[error("invalid document transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: DocumentStatus,
        /// Attempted target status.
        to: DocumentStatus,
    },

    /// Document is in a terminal status.
    #[error("document is in terminal status {status}")]
    TerminalState {
        /// The terminal status.
        status: DocumentStatus,
    },

    /// Document was already submitted.
    #[error("document {id} is already submitted")]
    AlreadySubmitted {
        /// The document.
        id: ApplicationId,
    },
}

// ─── Transition Evidence ─────────────────────────────────────────────

/// Evidence for a lifecycle transition.
#[derive(Debug, Clone)]
pub struct TransitionEvidence {
    /// Reason for the transition.
    pub reason: String,
    /// Who initiated it (user id, or a system job name).
    pub actor: Option<String>,
    /// When it happened.
    pub at: DateTime<Utc>,
}

impl TransitionEvidence {
    /// Evidence with a reason and timestamp and no actor.
    pub fn new(reason: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            reason: reason.into(),
            actor: None,
            at,
        }
    }

    /// Attach the initiating actor.
    pub fn by(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }
}

/// Record of a status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Status before the transition.
    pub from: DocumentStatus,
    /// Status after the transition.
    pub to: DocumentStatus,
    /// When the transition occurred.
    pub at: DateTime<Utc>,
    /// Reason for the transition.
    pub reason: String,
    /// Initiating actor, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
}

// ─── Supporting Documents ────────────────────────────────────────────

/// An attachment row with its own document type and expiry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportingDocument {
    /// Type of the attachment; rows without a type are not evaluated.
    #[serde(default)]
    pub document_type: Option<DocumentTypeId>,
    /// Date the attachment was issued.
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    /// Computed expiry of the attachment.
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    /// Location of the attached file.
    #[serde(default)]
    pub attachment: Option<String>,
    /// Free-text remarks.
    #[serde(default)]
    pub remarks: Option<String>,
}

// ─── Document Application ────────────────────────────────────────────

/// A document issued (or being issued) to an applicant.
///
/// Fields are public: the record is edited by callers and checked by the
/// validator on every save. Status changes go through the transition
/// methods so every change lands in [`DocumentApplication::transitions`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentApplication {
    /// Unique identifier.
    pub id: ApplicationId,
    /// The applicant the document is issued to.
    pub applicant: ApplicantId,
    /// Employee or External.
    #[serde(default)]
    pub applicant_type: ApplicantType,
    /// Linked employee for Employee applicants.
    #[serde(default)]
    pub employee: Option<EmployeeId>,
    /// Applicant's name (derived from the employee for Employee applicants).
    #[serde(default)]
    pub applicant_full_name: Option<String>,
    /// The document type.
    pub document_type: DocumentTypeId,
    /// Category, derived from the document type on save.
    #[serde(default)]
    pub document_category: Option<CategoryId>,
    /// User that created the record; receives in-app alerts.
    #[serde(default)]
    pub owner: Option<String>,
    /// Creation time, used to order candidates for predecessor lookup.
    pub created_at: DateTime<Utc>,

    /// New Application, Renewal or Extension.
    #[serde(default)]
    pub transaction_type: TransactionType,
    /// Document being renewed.
    #[serde(default)]
    pub previous_document: Option<ApplicationId>,
    /// Document being extended.
    #[serde(default)]
    pub previous_referred_document: Option<ApplicationId>,
    /// Expiry of `previous_document` at the time of linking.
    #[serde(default)]
    pub previous_expiry_date: Option<NaiveDate>,
    /// Expiry of `previous_referred_document` at the time of linking.
    #[serde(default)]
    pub previous_referred_expiry_date: Option<NaiveDate>,

    /// Date the document was issued.
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    /// End of the current validity.
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    /// For renewals, the end of the next validity cycle.
    #[serde(default)]
    pub new_expiry_date: Option<NaiveDate>,
    /// For extensions, the new end date.
    #[serde(default)]
    pub extended_date: Option<NaiveDate>,

    /// Keep a manually entered expiry date instead of computing it.
    #[serde(default)]
    pub allow_expiry_override: bool,
    /// Why the override is in place.
    #[serde(default)]
    pub override_reason: Option<String>,

    /// Business lifecycle status.
    #[serde(default)]
    pub status: DocumentStatus,
    /// Finalization marker.
    #[serde(default)]
    pub submission: SubmissionState,

    /// Set once the expiry reminder has been dispatched.
    #[serde(default)]
    pub expiry_reminder_sent: bool,
    /// Set once the expired notification has been dispatched.
    #[serde(default)]
    pub expired_notification_sent: bool,

    /// Attachments with independently computed expiry.
    #[serde(default)]
    pub supporting_documents: Vec<SupportingDocument>,

    /// Ordered log of status transitions.
    #[serde(default)]
    pub transitions: Vec<TransitionRecord>,
}

impl DocumentApplication {
    /// Create a draft document application.
    pub fn new(
        applicant: ApplicantId,
        document_type: DocumentTypeId,
        transaction_type: TransactionType,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ApplicationId::new(),
            applicant,
            applicant_type: ApplicantType::default(),
            employee: None,
            applicant_full_name: None,
            document_type,
            document_category: None,
            owner: None,
            created_at,
            transaction_type,
            previous_document: None,
            previous_referred_document: None,
            previous_expiry_date: None,
            previous_referred_expiry_date: None,
            issue_date: None,
            expiry_date: None,
            new_expiry_date: None,
            extended_date: None,
            allow_expiry_override: false,
            override_reason: None,
            status: DocumentStatus::Draft,
            submission: SubmissionState::Draft,
            expiry_reminder_sent: false,
            expired_notification_sent: false,
            supporting_documents: Vec::new(),
            transitions: Vec::new(),
        }
    }

    /// Builder: set the issue date.
    pub fn with_issue_date(mut self, date: NaiveDate) -> Self {
        self.issue_date = Some(date);
        self
    }

    /// Builder: set the expiry date.
    pub fn with_expiry_date(mut self, date: NaiveDate) -> Self {
        self.expiry_date = Some(date);
        self
    }

    /// Builder: set the extension end date.
    pub fn with_extended_date(mut self, date: NaiveDate) -> Self {
        self.extended_date = Some(date);
        self
    }

    /// Builder: link the predecessor for this transaction type.
    pub fn with_predecessor(mut self, predecessor: ApplicationId) -> Self {
        match self.transaction_type {
            TransactionType::Renewal => self.previous_document = Some(predecessor),
            TransactionType::Extension => self.previous_referred_document = Some(predecessor),
            TransactionType::NewApplication => {}
        }
        self
    }

    /// Builder: mark as an Employee applicant.
    pub fn for_employee(mut self, employee: EmployeeId) -> Self {
        self.applicant_type = ApplicantType::Employee;
        self.employee = Some(employee);
        self
    }

    /// Builder: set the owning user.
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Builder: keep a manual expiry date.
    pub fn with_expiry_override(mut self, expiry: NaiveDate, reason: impl Into<String>) -> Self {
        self.allow_expiry_override = true;
        self.expiry_date = Some(expiry);
        self.override_reason = Some(reason.into());
        self
    }

    /// The predecessor reference for this transaction type, if any.
    pub fn predecessor(&self) -> Option<ApplicationId> {
        match self.transaction_type {
            TransactionType::Renewal => self.previous_document,
            TransactionType::Extension => self.previous_referred_document,
            TransactionType::NewApplication => None,
        }
    }

    /// Link a predecessor and snapshot its expiry into the matching fields.
    pub fn link_predecessor(&mut self, predecessor: ApplicationId, expiry: Option<NaiveDate>) {
        match self.transaction_type {
            TransactionType::Renewal => {
                self.previous_document = Some(predecessor);
                self.previous_expiry_date = expiry;
            }
            TransactionType::Extension => {
                self.previous_referred_document = Some(predecessor);
                self.previous_referred_expiry_date = expiry;
            }
            TransactionType::NewApplication => {}
        }
    }

    /// Whether the document has been finalized.
    pub fn is_submitted(&self) -> bool {
        self.submission == SubmissionState::Submitted
    }

    /// Finalize the document (DRAFT → SUBMITTED).
    pub fn submit(&mut self) -> Result<(), LifecycleError> {
        if self.is_submitted() {
            return Err(LifecycleError::AlreadySubmitted { id: self.id });
        }
        self.submission = SubmissionState::Submitted;
        Ok(())
    }

    /// Issue the document (DRAFT → ISSUED).
    pub fn issue(&mut self, evidence: TransitionEvidence) -> Result<(), LifecycleError> {
        self.require_status(&[DocumentStatus::Draft], DocumentStatus::Issued)?;
        self.do_transition(DocumentStatus::Issued, evidence);
        Ok(())
    }

    /// Activate the document (DRAFT or ISSUED → ACTIVE).
    pub fn activate(&mut self, evidence: TransitionEvidence) -> Result<(), LifecycleError> {
        self.require_status(
            &[DocumentStatus::Draft, DocumentStatus::Issued],
            DocumentStatus::Active,
        )?;
        self.do_transition(DocumentStatus::Active, evidence);
        Ok(())
    }

    /// Mark as superseded by a renewal (ACTIVE or ISSUED → RENEWED).
    pub fn mark_renewed(&mut self, evidence: TransitionEvidence) -> Result<(), LifecycleError> {
        self.require_status(&DocumentStatus::IN_FORCE, DocumentStatus::Renewed)?;
        self.do_transition(DocumentStatus::Renewed, evidence);
        Ok(())
    }

    /// Mark as superseded by an extension (ACTIVE or ISSUED → EXTENDED).
    pub fn mark_extended(&mut self, evidence: TransitionEvidence) -> Result<(), LifecycleError> {
        self.require_status(&DocumentStatus::IN_FORCE, DocumentStatus::Extended)?;
        self.do_transition(DocumentStatus::Extended, evidence);
        Ok(())
    }

    /// Expire the document (ACTIVE or ISSUED → EXPIRED).
    ///
    /// Triggered by the daily expiry sweep.
    pub fn expire(&mut self, evidence: TransitionEvidence) -> Result<(), LifecycleError> {
        self.require_status(&DocumentStatus::IN_FORCE, DocumentStatus::Expired)?;
        self.do_transition(DocumentStatus::Expired, evidence);
        Ok(())
    }

    /// Whether the document is in a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn require_status(
        &self,
        allowed: &[DocumentStatus],
        target: DocumentStatus,
    ) -> Result<(), LifecycleError> {
        if self.status.is_terminal() {
            return Err(LifecycleError::TerminalState {
                status: self.status,
            });
        }
        if !allowed.contains(&self.status) {
            return Err(LifecycleError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }
        Ok(())
    }

    fn do_transition(&mut self, to: DocumentStatus, evidence: TransitionEvidence) {
        self.transitions.push(TransitionRecord {
            from: self.status,
            to,
            at: evidence.at,
            reason: evidence.reason,
            actor: evidence.actor,
        });
        self.status = to;
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
