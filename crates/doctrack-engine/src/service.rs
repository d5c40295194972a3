//! # Document Service
//!
//! The save and submit pipeline:
//!
//! ```text
//! save:    validate ─▶ calculate expiry ─▶ persist
//! submit:  validate ─▶ calculate expiry ─▶ mark submitted ─▶ cascade saga
//! ```
//!
//! Validation reads the store and the write follows; both run under one
//! save lock so the duplicate-Active check cannot race another save
//! through the same service.

use std::sync::Arc;

use parking_lot::Mutex;

use doctrack_core::{ApplicationId, Clock, RecordKind, ValidationError};
use doctrack_state::{Applicant, DocumentApplication, LifecycleError};

use crate::error::DocumentError;
use crate::expiry::ExpiryCalculator;
use crate::lifecycle::{CompensationRecord, SubmissionSaga};
use crate::store::DocumentStore;
use crate::validation::Validator;

/// Entry point for creating, editing and finalizing Document Applications.
pub struct DocumentService {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    save_lock: Mutex<()>,
    compensation_log: Mutex<Vec<CompensationRecord>>,
}

impl DocumentService {
    /// Create a service over `store`.
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            save_lock: Mutex::new(()),
            compensation_log: Mutex::new(Vec::new()),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Run validation and expiry calculation without persisting.
    pub fn validate(&self, doc: DocumentApplication) -> Result<DocumentApplication, DocumentError> {
        let store = self.store.as_ref();
        let mut doc = Validator::new(store).validate(doc)?;
        ExpiryCalculator::new(store).apply(&mut doc)?;
        Ok(doc)
    }

    /// Validate, calculate and persist a draft document.
    ///
    /// Submitted documents cannot be saved again.
    pub fn save(&self, doc: DocumentApplication) -> Result<DocumentApplication, DocumentError> {
        let _guard = self.save_lock.lock();
        let stored_submitted = self
            .store
            .application(&doc.id)?
            .is_some_and(|stored| stored.is_submitted());
        if doc.is_submitted() || stored_submitted {
            return Err(LifecycleError::AlreadySubmitted { id: doc.id }.into());
        }

        let doc = self.validate(doc)?;
        self.store.put_application(&doc)?;
        tracing::info!(
            document_id = %doc.id,
            status = %doc.status,
            transaction = %doc.transaction_type,
            expiry = ?doc.expiry_date,
            "document saved"
        );
        Ok(doc)
    }

    /// Finalize a stored document and supersede its predecessor.
    ///
    /// Only Issued or Active documents can be submitted. When the
    /// predecessor update fails the submission is rolled back; see
    /// [`SubmissionSaga`].
    pub fn submit(&self, id: ApplicationId) -> Result<DocumentApplication, DocumentError> {
        let _guard = self.save_lock.lock();
        let snapshot = self
            .store
            .application(&id)?
            .ok_or_else(|| ValidationError::not_found(RecordKind::DocumentApplication, id))?;
        if snapshot.is_submitted() {
            return Err(LifecycleError::AlreadySubmitted { id }.into());
        }
        if !snapshot.status.is_in_force() {
            return Err(ValidationError::NotSubmittable {
                status: snapshot.status.to_string(),
            }
            .into());
        }

        let mut doc = self.validate(snapshot.clone())?;
        doc.submit()?;

        let store = self.store.as_ref();
        let validator = Validator::new(store);
        let mut saga = SubmissionSaga::new(store, snapshot, doc);
        saga.prepare(&validator, self.clock.now())?;
        let result = saga.execute(self.clock.now());
        self.compensation_log
            .lock()
            .extend(saga.compensation_log().iter().cloned());
        result?;

        tracing::info!(
            document_id = %id,
            transaction = %saga.successor().transaction_type,
            predecessor = ?saga.predecessor().map(|p| p.id),
            "document submitted"
        );
        Ok(saga.successor().clone())
    }

    /// Validate and persist an Applicant master record.
    pub fn save_applicant(&self, applicant: Applicant) -> Result<Applicant, DocumentError> {
        let applicant = Validator::new(self.store.as_ref()).validate_applicant(applicant)?;
        self.store.put_applicant(&applicant)?;
        Ok(applicant)
    }

    /// Compensation actions taken by failed submissions.
    pub fn compensation_log(&self) -> Vec<CompensationRecord> {
        self.compensation_log.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use doctrack_core::{ApplicantId, CategoryId, DocumentTypeId, FixedClock, ValidityPeriod};
    use doctrack_state::{
        ApplicantType, DocumentCategory, DocumentStatus, DocumentType, TransactionType,
        TransitionEvidence,
    };

    use crate::store::InMemoryStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn service() -> (InMemoryStore, Arc<FixedClock>, DocumentService) {
        let store = InMemoryStore::new();
        store
            .put_category(&DocumentCategory {
                id: CategoryId::new("Licensing").unwrap(),
                name: None,
                is_active: true,
            })
            .unwrap();
        store
            .put_document_type(&DocumentType {
                id: DocumentTypeId::new("Trade License").unwrap(),
                name: None,
                category: Some(CategoryId::new("Licensing").unwrap()),
                is_active: true,
                has_expiry: true,
                validity: Some(ValidityPeriod::Days(30)),
                renewal_allowed: true,
                reminder_days_before_expiry: Some(5),
            })
            .unwrap();
        let clock = Arc::new(FixedClock::new(date(2024, 1, 1)));
        let svc = DocumentService::new(Arc::new(store.clone()), clock.clone());
        (store, clock, svc)
    }

    fn new_doc(clock: &FixedClock, transaction: TransactionType) -> DocumentApplication {
        DocumentApplication::new(
            ApplicantId::new("APP-1").unwrap(),
            DocumentTypeId::new("Trade License").unwrap(),
            transaction,
            clock.now(),
        )
    }

    fn issued(mut doc: DocumentApplication) -> DocumentApplication {
        doc.issue(TransitionEvidence::new("issued", doc.created_at))
            .unwrap();
        doc
    }

    #[test]
    fn test_save_computes_expiry_for_issued_documents() {
        let (store, clock, svc) = service();
        let doc = issued(new_doc(&clock, TransactionType::NewApplication).with_issue_date(date(2024, 1, 1)));
        let saved = svc.save(doc).unwrap();
        assert_eq!(saved.expiry_date, Some(date(2024, 1, 31)));
        assert_eq!(store.application(&saved.id).unwrap(), Some(saved));
    }

    #[test]
    fn test_draft_status_skips_main_expiry() {
        let (_, clock, svc) = service();
        let doc = new_doc(&clock, TransactionType::NewApplication).with_issue_date(date(2024, 1, 1));
        assert_eq!(svc.save(doc).unwrap().expiry_date, None);
    }

    #[test]
    fn test_failed_save_persists_nothing() {
        let (store, clock, svc) = service();
        let doc = issued(new_doc(&clock, TransactionType::NewApplication));
        assert!(svc.save(doc).is_err());
        assert_eq!(store.application_count(), 0);
    }

    #[test]
    fn test_submit_requires_in_force_status() {
        let (_, clock, svc) = service();
        let draft = svc
            .save(new_doc(&clock, TransactionType::NewApplication).with_issue_date(date(2024, 1, 1)))
            .unwrap();
        assert_eq!(
            svc.submit(draft.id).unwrap_err(),
            DocumentError::Validation(ValidationError::NotSubmittable {
                status: "Draft".into()
            })
        );
    }

    #[test]
    fn test_submitted_documents_are_frozen() {
        let (_, clock, svc) = service();
        let doc = svc
            .save(issued(new_doc(&clock, TransactionType::NewApplication).with_issue_date(date(2024, 1, 1))))
            .unwrap();
        let submitted = svc.submit(doc.id).unwrap();
        assert!(submitted.is_submitted());
        assert!(matches!(
            svc.submit(doc.id),
            Err(DocumentError::Lifecycle(LifecycleError::AlreadySubmitted { .. }))
        ));
        assert!(matches!(
            svc.save(doc),
            Err(DocumentError::Lifecycle(LifecycleError::AlreadySubmitted { .. }))
        ));
    }

    #[test]
    fn test_renewal_end_to_end() {
        let (store, clock, svc) = service();
        let first = svc
            .save(issued(new_doc(&clock, TransactionType::NewApplication).with_issue_date(date(2024, 1, 1))))
            .unwrap();
        svc.submit(first.id).unwrap();

        clock.advance_days(20);
        let renewal = svc
            .save(issued(new_doc(&clock, TransactionType::Renewal)))
            .unwrap();
        assert_eq!(renewal.previous_document, Some(first.id));
        assert_eq!(renewal.expiry_date, Some(date(2024, 1, 31)));
        assert_eq!(renewal.new_expiry_date, Some(date(2024, 3, 1)));

        svc.submit(renewal.id).unwrap();
        assert_eq!(
            store.application(&first.id).unwrap().unwrap().status,
            DocumentStatus::Renewed
        );
        assert!(svc.compensation_log().is_empty());
    }

    #[test]
    fn test_save_applicant() {
        let (store, _, svc) = service();
        let applicant = Applicant {
            id: ApplicantId::new("APP-9").unwrap(),
            applicant_type: ApplicantType::External,
            full_name: None,
            employee: None,
            email: None,
        };
        assert_eq!(
            svc.save_applicant(applicant.clone()).unwrap_err(),
            DocumentError::Validation(ValidationError::FullNameRequired)
        );
        let named = Applicant {
            full_name: Some("Marco Diaz".into()),
            ..applicant
        };
        svc.save_applicant(named.clone()).unwrap();
        assert_eq!(store.applicant(&named.id).unwrap(), Some(named));
    }
}
