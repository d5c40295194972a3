//! # Document Application Validator
//!
//! Runs on every persist attempt. Checks are applied in a fixed order and
//! the first failure is returned:
//!
//! 1. Auto-fetch the predecessor of a Renewal or Extension when unset.
//! 2. Override reason present when the expiry override is enabled.
//! 3. Master data: category active, document type present and active,
//!    type belongs to the selected category, renewal permitted.
//! 4. Transaction rules: predecessor referenced, present, submitted, in
//!    force and of the same document type.
//! 5. No other Active document for the same applicant and type.
//! 6. Expiry date after issue date.
//! 7. Employee applicants: employee present with a name, copied onto the
//!    document.
//! 8. Document category derived from the document type.
//!
//! The validator only reads from the store. It returns the enriched
//! document and leaves persisting to the caller.

use doctrack_core::{RecordKind, ValidationError};
use doctrack_state::{
    Applicant, ApplicantType, DocumentApplication, DocumentStatus, DocumentType, SubmissionState,
    TransactionType,
};

use crate::error::DocumentError;
use crate::store::{ApplicationFilter, DocumentStore};

/// Data-integrity and business-rule checks for Document Applications.
pub struct Validator<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> Validator<'a> {
    /// Create a validator reading from `store`.
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Validate `doc` and return it with derived fields populated.
    pub fn validate(
        &self,
        mut doc: DocumentApplication,
    ) -> Result<DocumentApplication, DocumentError> {
        self.auto_fetch_predecessor(&mut doc)?;
        check_override_reason(&doc)?;
        let doc_type = self.check_master_data(&doc)?;
        self.check_transaction_rules(&doc)?;
        self.check_duplicate_active(&doc)?;
        check_date_order(&doc)?;
        self.resolve_employee_name(&mut doc)?;
        derive_category(&mut doc, &doc_type)?;
        Ok(doc)
    }

    /// The checks a predecessor must still pass when the renewal/extension
    /// cascade changes its status.
    ///
    /// The predecessor's own transaction rules are not re-run: they held
    /// when it was submitted, and its own predecessor has since left the
    /// in-force statuses.
    pub fn check_cascade(&self, predecessor: &DocumentApplication) -> Result<(), DocumentError> {
        self.check_duplicate_active(predecessor)?;
        check_date_order(predecessor)?;
        Ok(())
    }

    /// Apply the applicant-type rule to an Applicant master record.
    pub fn validate_applicant(&self, mut applicant: Applicant) -> Result<Applicant, DocumentError> {
        let employee = match (&applicant.applicant_type, &applicant.employee) {
            (ApplicantType::Employee, Some(id)) => self.store.employee(id)?,
            _ => None,
        };
        applicant.resolve_full_name(employee.as_ref())?;
        Ok(applicant)
    }

    // ---- 1. predecessor auto-fetch ----

    fn auto_fetch_predecessor(&self, doc: &mut DocumentApplication) -> Result<(), DocumentError> {
        if !doc.transaction_type.has_predecessor() || doc.predecessor().is_some() {
            return Ok(());
        }
        let filter = ApplicationFilter::for_pair(&doc.applicant, &doc.document_type)
            .with_statuses(&DocumentStatus::IN_FORCE)
            .with_submission(SubmissionState::Submitted)
            .excluding(doc.id)
            .newest_first()
            .limit(1);
        if let Some(found) = self.store.query_applications(&filter)?.into_iter().next() {
            tracing::debug!(
                document_id = %doc.id,
                predecessor = %found.id,
                "linked most recent in-force predecessor"
            );
            doc.link_predecessor(found.id, found.expiry_date);
        }
        Ok(())
    }

    // ---- 3. master data ----

    fn check_master_data(&self, doc: &DocumentApplication) -> Result<DocumentType, DocumentError> {
        if let Some(category_id) = &doc.document_category {
            let category = self
                .store
                .category(category_id)?
                .ok_or_else(|| ValidationError::not_found(RecordKind::DocumentCategory, category_id))?;
            if !category.is_active {
                return Err(ValidationError::InactiveCategory {
                    category: category.id,
                }
                .into());
            }
        }

        let doc_type = self
            .store
            .document_type(&doc.document_type)?
            .ok_or_else(|| ValidationError::not_found(RecordKind::DocumentType, &doc.document_type))?;
        if !doc_type.is_active {
            return Err(ValidationError::InactiveDocumentType {
                document_type: doc_type.id,
            }
            .into());
        }

        if let (Some(selected), Some(owning)) = (&doc.document_category, &doc_type.category) {
            if selected != owning {
                return Err(ValidationError::CategoryMismatch {
                    document_type: doc_type.id.clone(),
                    category: selected.clone(),
                }
                .into());
            }
        }

        if doc.transaction_type == TransactionType::Renewal && !doc_type.renewal_allowed {
            return Err(ValidationError::RenewalNotAllowed {
                document_type: doc_type.id,
            }
            .into());
        }
        Ok(doc_type)
    }

    // ---- 4. transaction rules ----

    fn check_transaction_rules(&self, doc: &DocumentApplication) -> Result<(), DocumentError> {
        if !doc.transaction_type.has_predecessor() {
            return Ok(());
        }
        let action = doc.transaction_type.predecessor_action();
        let predecessor_id = doc.predecessor().ok_or(ValidationError::PredecessorRequired {
            transaction: doc.transaction_type.as_str(),
        })?;
        let predecessor = self.store.application(&predecessor_id)?.ok_or_else(|| {
            ValidationError::not_found(RecordKind::DocumentApplication, predecessor_id)
        })?;

        if !predecessor.is_submitted() {
            return Err(ValidationError::PredecessorNotSubmitted {
                predecessor: predecessor.id,
                action,
            }
            .into());
        }
        if !predecessor.status.is_in_force() || predecessor.id == doc.id {
            return Err(ValidationError::PredecessorIneligible {
                predecessor: predecessor.id,
                status: predecessor.status.to_string(),
                action,
            }
            .into());
        }
        if predecessor.document_type != doc.document_type {
            return Err(ValidationError::PredecessorTypeMismatch {
                expected: doc.document_type.clone(),
                found: predecessor.document_type,
            }
            .into());
        }
        Ok(())
    }

    // ---- 5. duplicate active ----

    fn check_duplicate_active(&self, doc: &DocumentApplication) -> Result<(), DocumentError> {
        if doc.status != DocumentStatus::Active {
            return Ok(());
        }
        let filter = ApplicationFilter::for_pair(&doc.applicant, &doc.document_type)
            .with_statuses(&[DocumentStatus::Active])
            .excluding(doc.id)
            .limit(1);
        if let Some(existing) = self.store.query_applications(&filter)?.into_iter().next() {
            return Err(ValidationError::DuplicateActive {
                applicant: doc.applicant.clone(),
                document_type: doc.document_type.clone(),
                existing: existing.id,
            }
            .into());
        }
        Ok(())
    }

    // ---- 7. employee name ----

    fn resolve_employee_name(&self, doc: &mut DocumentApplication) -> Result<(), DocumentError> {
        if doc.applicant_type != ApplicantType::Employee {
            return Ok(());
        }
        let employee_id = doc.employee.as_ref().ok_or(ValidationError::EmployeeRequired)?;
        let employee = self
            .store
            .employee(employee_id)?
            .ok_or_else(|| ValidationError::not_found(RecordKind::Employee, employee_id))?;
        let name = employee
            .name()
            .ok_or_else(|| ValidationError::EmployeeNameUnavailable {
                employee: employee.id.clone(),
            })?;
        doc.applicant_full_name = Some(name.to_string());
        Ok(())
    }
}

// ---- 2. override reason ----

fn check_override_reason(doc: &DocumentApplication) -> Result<(), ValidationError> {
    let has_reason = doc
        .override_reason
        .as_deref()
        .is_some_and(|r| !r.trim().is_empty());
    if doc.allow_expiry_override && !has_reason {
        return Err(ValidationError::OverrideReasonRequired);
    }
    Ok(())
}

// ---- 6. date order ----

fn check_date_order(doc: &DocumentApplication) -> Result<(), ValidationError> {
    if let (Some(issue_date), Some(expiry_date)) = (doc.issue_date, doc.expiry_date) {
        if expiry_date <= issue_date {
            return Err(ValidationError::ExpiryNotAfterIssue {
                issue_date,
                expiry_date,
            });
        }
    }
    Ok(())
}

// ---- 8. category ----

fn derive_category(
    doc: &mut DocumentApplication,
    doc_type: &DocumentType,
) -> Result<(), DocumentError> {
    let category = doc_type.category.clone().ok_or_else(|| {
        doctrack_core::ConfigurationError::CategoryNotDefined {
            document_type: doc_type.id.clone(),
        }
    })?;
    doc.document_category = Some(category);
    Ok(())
}
