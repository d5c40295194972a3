//! # Lifecycle Transition Engine
//!
//! Finalizing a Renewal or Extension supersedes its predecessor: the
//! predecessor moves to `Renewed` or `Extended`. Two documents change, and
//! the store offers no multi-record transaction, so submission runs as a
//! two-step saga:
//!
//! ```text
//! prepare ── load predecessor, flip it in memory, run cascade checks
//!    │
//! step 1 ── persist the submitted successor
//!    │
//! step 2 ── persist the flipped predecessor
//!    │ on failure
//!    └──▶ compensate ── restore the successor's pre-submission snapshot
//! ```
//!
//! Every compensation attempt is captured as a [`CompensationRecord`]. A
//! failed compensation is reported with its detail preserved; it is never
//! swallowed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use doctrack_core::{ApplicationId, RecordKind, StoreError, ValidationError};
use doctrack_state::{DocumentApplication, TransactionType, TransitionEvidence};

use crate::error::DocumentError;
use crate::store::DocumentStore;
use crate::validation::Validator;

/// Actor recorded on cascade transitions.
pub const CASCADE_ACTOR: &str = "system:cascade";

// ── Errors ───────────────────────────────────────────────────────────

/// The predecessor cascade did not complete.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CascadeError {
    /// Step 2 failed and the successor was restored.
    #[error("could not update previous document {predecessor}; submission of {successor} was rolled back: {source}")]
    RolledBack {
        /// The document being submitted.
        successor: ApplicationId,
        /// The predecessor that could not be written.
        predecessor: ApplicationId,
        /// The store failure.
        #[source]
        source: StoreError,
    },

    /// Step 2 failed and restoring the successor failed as well. The
    /// successor is stored as submitted while its predecessor is unchanged.
    #[error("compensation failed for {successor}: {detail}")]
    CompensationFailed {
        /// The document being submitted.
        successor: ApplicationId,
        /// Both failures, in order.
        detail: String,
    },
}

// ── Compensation Record ──────────────────────────────────────────────

/// A compensation action taken while rolling back a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationRecord {
    /// The successor whose submission was rolled back.
    pub successor: ApplicationId,
    /// What was attempted.
    pub action: String,
    /// Whether it succeeded.
    pub succeeded: bool,
    /// Error detail when it failed.
    pub error_detail: Option<String>,
    /// When it ran.
    pub at: DateTime<Utc>,
}

// ── Saga ─────────────────────────────────────────────────────────────

/// Submission of one document together with its predecessor cascade.
pub struct SubmissionSaga<'a> {
    store: &'a dyn DocumentStore,
    snapshot: DocumentApplication,
    successor: DocumentApplication,
    predecessor: Option<DocumentApplication>,
    compensation_log: Vec<CompensationRecord>,
}

impl<'a> SubmissionSaga<'a> {
    /// Start a saga for `successor`, already marked submitted.
    /// `snapshot` is the stored version before submission, used for
    /// compensation.
    pub fn new(
        store: &'a dyn DocumentStore,
        snapshot: DocumentApplication,
        successor: DocumentApplication,
    ) -> Self {
        Self {
            store,
            snapshot,
            successor,
            predecessor: None,
            compensation_log: Vec::new(),
        }
    }

    /// Load the predecessor and apply its status change in memory.
    ///
    /// A predecessor that is no longer Active or Issued is left untouched.
    pub fn prepare(&mut self, validator: &Validator<'_>, at: DateTime<Utc>) -> Result<(), DocumentError> {
        let transaction = self.successor.transaction_type;
        if !transaction.has_predecessor() {
            return Ok(());
        }
        if transaction == TransactionType::Extension && self.successor.extended_date.is_none() {
            return Err(ValidationError::MissingField {
                field: "extended date",
            }
            .into());
        }
        let predecessor_id = self
            .successor
            .predecessor()
            .ok_or(ValidationError::PredecessorRequired {
                transaction: transaction.as_str(),
            })?;
        let mut predecessor = self.store.application(&predecessor_id)?.ok_or_else(|| {
            ValidationError::not_found(RecordKind::DocumentApplication, predecessor_id)
        })?;

        if !predecessor.status.is_in_force() {
            tracing::info!(
                document_id = %self.successor.id,
                predecessor = %predecessor.id,
                status = %predecessor.status,
                "previous document no longer in force; leaving it unchanged"
            );
            return Ok(());
        }

        let evidence = TransitionEvidence::new(
            format!("{} by {}", transaction.predecessor_action(), self.successor.id),
            at,
        )
        .by(CASCADE_ACTOR);
        match transaction {
            TransactionType::Renewal => predecessor.mark_renewed(evidence)?,
            _ => predecessor.mark_extended(evidence)?,
        }
        validator.check_cascade(&predecessor)?;
        self.predecessor = Some(predecessor);
        Ok(())
    }

    /// Run both steps, compensating step 1 if step 2 fails.
    pub fn execute(&mut self, at: DateTime<Utc>) -> Result<(), DocumentError> {
        self.store.put_application(&self.successor)?;

        let Some(predecessor) = &self.predecessor else {
            return Ok(());
        };
        let write_err = match self.store.put_application(predecessor) {
            Ok(()) => {
                tracing::info!(
                    document_id = %self.successor.id,
                    predecessor = %predecessor.id,
                    status = %predecessor.status,
                    "previous document superseded"
                );
                return Ok(());
            }
            Err(e) => e,
        };
        let predecessor_id = predecessor.id;

        tracing::warn!(
            document_id = %self.successor.id,
            predecessor = %predecessor_id,
            error = %write_err,
            "previous document update failed; restoring submission snapshot"
        );
        match self.store.put_application(&self.snapshot) {
            Ok(()) => {
                self.record_compensation("restore pre-submission snapshot", None, at);
                Err(CascadeError::RolledBack {
                    successor: self.successor.id,
                    predecessor: predecessor_id,
                    source: write_err,
                }
                .into())
            }
            Err(restore_err) => {
                let detail = format!(
                    "previous document {predecessor_id} update failed ({write_err}); restore failed ({restore_err})"
                );
                tracing::error!(document_id = %self.successor.id, %detail, "compensation failed");
                self.record_compensation(
                    "restore pre-submission snapshot",
                    Some(restore_err.to_string()),
                    at,
                );
                Err(CascadeError::CompensationFailed {
                    successor: self.successor.id,
                    detail,
                }
                .into())
            }
        }
    }

    /// The submitted successor.
    pub fn successor(&self) -> &DocumentApplication {
        &self.successor
    }

    /// The predecessor after its status change, if one was applied.
    pub fn predecessor(&self) -> Option<&DocumentApplication> {
        self.predecessor.as_ref()
    }

    /// Compensation actions taken so far.
    pub fn compensation_log(&self) -> &[CompensationRecord] {
        &self.compensation_log
    }

    fn record_compensation(&mut self, action: &str, error_detail: Option<String>, at: DateTime<Utc>) {
        self.compensation_log.push(CompensationRecord {
            successor: self.successor.id,
            action: action.to_string(),
            succeeded: error_detail.is_none(),
            error_detail,
            at,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use doctrack_core::{ApplicantId, CategoryId, DocumentTypeId};
    use doctrack_state::DocumentStatus;
    use parking_lot::Mutex;

    use crate::store::{ApplicationFilter, InMemoryStore};

    /// Delegates to an in-memory store, failing writes of chosen documents.
    struct FlakyStore {
        inner: InMemoryStore,
        fail_writes: Mutex<Vec<ApplicationId>>,
        writes: Mutex<usize>,
        fail_after: Mutex<Option<usize>>,
    }

    impl FlakyStore {
        fn new(inner: InMemoryStore) -> Self {
            Self {
                inner,
                fail_writes: Mutex::new(Vec::new()),
                writes: Mutex::new(0),
                fail_after: Mutex::new(None),
            }
        }
    }

    impl DocumentStore for FlakyStore {
        fn application(&self, id: &ApplicationId) -> Result<Option<DocumentApplication>, StoreError> {
            self.inner.application(id)
        }
        fn put_application(&self, doc: &DocumentApplication) -> Result<(), StoreError> {
            let mut writes = self.writes.lock();
            *writes += 1;
            let fail_after = *self.fail_after.lock();
            if fail_after.is_some_and(|n| *writes > n) {
                return Err(StoreError::Backend("store offline".into()));
            }
            if self.fail_writes.lock().contains(&doc.id) {
                return Err(StoreError::Backend("write rejected".into()));
            }
            self.inner.put_application(doc)
        }
        fn query_applications(
            &self,
            filter: &ApplicationFilter,
        ) -> Result<Vec<DocumentApplication>, StoreError> {
            self.inner.query_applications(filter)
        }
        fn document_type(&self, id: &DocumentTypeId) -> Result<Option<doctrack_state::DocumentType>, StoreError> {
            self.inner.document_type(id)
        }
        fn put_document_type(&self, record: &doctrack_state::DocumentType) -> Result<(), StoreError> {
            self.inner.put_document_type(record)
        }
        fn category(&self, id: &CategoryId) -> Result<Option<doctrack_state::DocumentCategory>, StoreError> {
            self.inner.category(id)
        }
        fn put_category(&self, record: &doctrack_state::DocumentCategory) -> Result<(), StoreError> {
            self.inner.put_category(record)
        }
        fn applicant(&self, id: &ApplicantId) -> Result<Option<doctrack_state::Applicant>, StoreError> {
            self.inner.applicant(id)
        }
        fn put_applicant(&self, record: &doctrack_state::Applicant) -> Result<(), StoreError> {
            self.inner.put_applicant(record)
        }
        fn employee(&self, id: &doctrack_core::EmployeeId) -> Result<Option<doctrack_state::Employee>, StoreError> {
            self.inner.employee(id)
        }
        fn put_employee(&self, record: &doctrack_state::Employee) -> Result<(), StoreError> {
            self.inner.put_employee(record)
        }
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn active_predecessor() -> DocumentApplication {
        let mut doc = DocumentApplication::new(
            ApplicantId::new("APP-1").unwrap(),
            DocumentTypeId::new("Work Permit").unwrap(),
            TransactionType::NewApplication,
            now(),
        )
        .with_issue_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        .with_expiry_date(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        doc.activate(TransitionEvidence::new("test", now())).unwrap();
        doc.submit().unwrap();
        doc
    }

    fn successor_of(prev: &DocumentApplication, transaction: TransactionType) -> (DocumentApplication, DocumentApplication) {
        let mut draft = DocumentApplication::new(
            prev.applicant.clone(),
            prev.document_type.clone(),
            transaction,
            now(),
        )
        .with_predecessor(prev.id)
        .with_extended_date(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        draft.issue(TransitionEvidence::new("test", now())).unwrap();
        let mut submitted = draft.clone();
        submitted.submit().unwrap();
        (draft, submitted)
    }

    #[test]
    fn test_renewal_flips_predecessor() {
        let store = InMemoryStore::new();
        let prev = active_predecessor();
        store.put_application(&prev).unwrap();
        let (draft, submitted) = successor_of(&prev, TransactionType::Renewal);
        store.put_application(&draft).unwrap();

        let validator = Validator::new(&store);
        let mut saga = SubmissionSaga::new(&store, draft, submitted.clone());
        saga.prepare(&validator, now()).unwrap();
        saga.execute(now()).unwrap();

        let stored_prev = store.application(&prev.id).unwrap().unwrap();
        assert_eq!(stored_prev.status, DocumentStatus::Renewed);
        let last = stored_prev.transitions.last().unwrap();
        assert_eq!(last.actor.as_deref(), Some(CASCADE_ACTOR));
        assert!(store.application(&submitted.id).unwrap().unwrap().is_submitted());
        assert!(saga.compensation_log().is_empty());
    }

    #[test]
    fn test_extension_flips_predecessor() {
        let store = InMemoryStore::new();
        let prev = active_predecessor();
        store.put_application(&prev).unwrap();
        let (draft, submitted) = successor_of(&prev, TransactionType::Extension);

        let validator = Validator::new(&store);
        let mut saga = SubmissionSaga::new(&store, draft, submitted);
        saga.prepare(&validator, now()).unwrap();
        assert_eq!(saga.predecessor().map(|p| p.status), Some(DocumentStatus::Extended));
        saga.execute(now()).unwrap();
        assert_eq!(
            store.application(&prev.id).unwrap().unwrap().status,
            DocumentStatus::Extended
        );
    }

    #[test]
    fn test_extension_requires_extended_date() {
        let store = InMemoryStore::new();
        let prev = active_predecessor();
        store.put_application(&prev).unwrap();
        let (draft, mut submitted) = successor_of(&prev, TransactionType::Extension);
        submitted.extended_date = None;

        let validator = Validator::new(&store);
        let mut saga = SubmissionSaga::new(&store, draft, submitted);
        assert_eq!(
            saga.prepare(&validator, now()).unwrap_err(),
            DocumentError::Validation(ValidationError::MissingField {
                field: "extended date"
            })
        );
    }

    #[test]
    fn test_predecessor_out_of_force_left_alone() {
        let store = InMemoryStore::new();
        let mut prev = active_predecessor();
        prev.expire(TransitionEvidence::new("ended", now())).unwrap();
        store.put_application(&prev).unwrap();
        let (draft, submitted) = successor_of(&prev, TransactionType::Renewal);

        let validator = Validator::new(&store);
        let mut saga = SubmissionSaga::new(&store, draft, submitted);
        saga.prepare(&validator, now()).unwrap();
        assert!(saga.predecessor().is_none());
        saga.execute(now()).unwrap();
        assert_eq!(
            store.application(&prev.id).unwrap().unwrap().status,
            DocumentStatus::Expired
        );
    }

    #[test]
    fn test_failed_predecessor_write_rolls_back_successor() {
        let inner = InMemoryStore::new();
        let prev = active_predecessor();
        inner.put_application(&prev).unwrap();
        let (draft, submitted) = successor_of(&prev, TransactionType::Renewal);
        inner.put_application(&draft).unwrap();

        let store = FlakyStore::new(inner.clone());
        store.fail_writes.lock().push(prev.id);
        let validator = Validator::new(&store);
        let mut saga = SubmissionSaga::new(&store, draft, submitted.clone());
        saga.prepare(&validator, now()).unwrap();
        let err = saga.execute(now()).unwrap_err();

        assert!(matches!(
            err,
            DocumentError::Cascade(CascadeError::RolledBack { .. })
        ));
        assert!(!inner.application(&submitted.id).unwrap().unwrap().is_submitted());
        assert_eq!(
            inner.application(&prev.id).unwrap().unwrap().status,
            DocumentStatus::Active
        );
        let log = saga.compensation_log();
        assert_eq!(log.len(), 1);
        assert!(log[0].succeeded);
    }

    #[test]
    fn test_failed_compensation_is_reported() {
        let inner = InMemoryStore::new();
        let prev = active_predecessor();
        inner.put_application(&prev).unwrap();
        let (draft, submitted) = successor_of(&prev, TransactionType::Renewal);
        inner.put_application(&draft).unwrap();

        let store = FlakyStore::new(inner);
        *store.fail_after.lock() = Some(1);
        let validator = Validator::new(&store);
        let mut saga = SubmissionSaga::new(&store, draft, submitted);
        saga.prepare(&validator, now()).unwrap();
        let err = saga.execute(now()).unwrap_err();

        match err {
            DocumentError::Cascade(CascadeError::CompensationFailed { detail, .. }) => {
                assert!(detail.contains("store offline"));
            }
            other => panic!("expected CompensationFailed, got {other:?}"),
        }
        let log = saga.compensation_log();
        assert_eq!(log.len(), 1);
        assert!(!log[0].succeeded);
        assert!(log[0].error_detail.is_some());
    }
}
