//! # Expiry Calculator
//!
//! Derives the date fields of a Document Application from its Document
//! Type's validity rule and, for renewals and extensions, from the
//! predecessor document.
//!
//! | Transaction     | `expiry_date`         | `new_expiry_date`               |
//! |-----------------|-----------------------|---------------------------------|
//! | New Application | issue + validity      | unchanged                       |
//! | Renewal         | predecessor expiry    | predecessor expiry + validity   |
//! | Extension       | predecessor expiry    | cleared                         |
//!
//! A manual override skips the main calculation entirely. Supporting
//! document rows are computed independently of the parent, each from its
//! own type and issue date.
//!
//! The core functions are pure; [`ExpiryCalculator`] resolves the records
//! they need from a [`DocumentStore`].

use chrono::NaiveDate;

use doctrack_core::{DocumentTypeId, RecordKind, ValidationError, ValidityPeriod};
use doctrack_state::{
    DocumentApplication, DocumentType, ExpiryRule, SupportingDocument, TransactionType,
};

use crate::error::DocumentError;
use crate::store::DocumentStore;

/// The date on which a document's current validity actually ends.
///
/// Renewals run until `new_expiry_date`, extensions until `extended_date`,
/// everything else until `expiry_date`.
pub fn effective_expiry(doc: &DocumentApplication) -> Option<NaiveDate> {
    match doc.transaction_type {
        TransactionType::Renewal => doc.new_expiry_date,
        TransactionType::Extension => doc.extended_date,
        TransactionType::NewApplication => doc.expiry_date,
    }
}

fn add_period(date: NaiveDate, period: ValidityPeriod) -> Result<NaiveDate, ValidationError> {
    period
        .add_to(date)
        .ok_or(ValidationError::DateOutOfRange { date, period })
}

/// Compute the main expiry fields of `doc`.
///
/// `predecessor` must be the record referenced by `doc.predecessor()` for
/// renewals and extensions; it is ignored for new applications.
pub fn calculate_expiry(
    doc: &mut DocumentApplication,
    doc_type: &DocumentType,
    predecessor: Option<&DocumentApplication>,
) -> Result<(), DocumentError> {
    if doc.allow_expiry_override {
        return Ok(());
    }

    let period = match doc_type.expiry_rule()? {
        ExpiryRule::NoExpiry => {
            doc.expiry_date = None;
            doc.new_expiry_date = None;
            return Ok(());
        }
        ExpiryRule::Validity(period) => period,
    };

    match doc.transaction_type {
        TransactionType::NewApplication => {
            let issue = doc
                .issue_date
                .ok_or(ValidationError::MissingField { field: "issue date" })?;
            doc.expiry_date = Some(add_period(issue, period)?);
        }
        TransactionType::Renewal => {
            let predecessor = predecessor.ok_or(ValidationError::PredecessorRequired {
                transaction: TransactionType::Renewal.as_str(),
            })?;
            let current = predecessor.expiry_date.ok_or(
                ValidationError::PredecessorExpiryUnknown {
                    predecessor: predecessor.id,
                },
            )?;
            doc.previous_expiry_date = Some(current);
            doc.expiry_date = Some(current);
            doc.new_expiry_date = Some(add_period(current, period)?);
        }
        TransactionType::Extension => {
            let predecessor = predecessor.ok_or(ValidationError::PredecessorRequired {
                transaction: TransactionType::Extension.as_str(),
            })?;
            let extended = doc.extended_date.ok_or(ValidationError::MissingField {
                field: "extended date",
            })?;
            // A renewed or extended predecessor runs past its expiry_date.
            let runs_until = effective_expiry(predecessor).or(predecessor.expiry_date);
            if let Some(current) = runs_until {
                if extended <= current {
                    return Err(ValidationError::ExtendedDateNotAfterExpiry {
                        extended_date: extended,
                        expiry_date: current,
                    }
                    .into());
                }
            }
            doc.previous_referred_expiry_date = predecessor.expiry_date;
            doc.expiry_date = predecessor.expiry_date;
            doc.new_expiry_date = None;
        }
    }
    Ok(())
}

/// Compute the expiry of each supporting document row.
///
/// Rows without a type are left alone, as are rows whose type expires but
/// which carry no issue date yet. `lookup` resolves a row's type and
/// reports unknown types as errors.
pub fn calculate_supporting_expiry<F>(
    rows: &mut [SupportingDocument],
    mut lookup: F,
) -> Result<(), DocumentError>
where
    F: FnMut(&DocumentTypeId) -> Result<DocumentType, DocumentError>,
{
    for row in rows.iter_mut() {
        let Some(type_id) = row.document_type.as_ref() else {
            continue;
        };
        let doc_type = lookup(type_id)?;
        match doc_type.expiry_rule()? {
            ExpiryRule::NoExpiry => row.expiry_date = None,
            ExpiryRule::Validity(period) => {
                if let Some(issue) = row.issue_date {
                    row.expiry_date = Some(add_period(issue, period)?);
                }
            }
        }
    }
    Ok(())
}

/// Store-backed front end to the pure calculation functions.
pub struct ExpiryCalculator<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> ExpiryCalculator<'a> {
    /// Create a calculator reading master data from `store`.
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Load a Document Type, treating absence as a validation failure.
    pub fn document_type(&self, id: &DocumentTypeId) -> Result<DocumentType, DocumentError> {
        self.store
            .document_type(id)?
            .ok_or_else(|| ValidationError::not_found(RecordKind::DocumentType, id).into())
    }

    /// Apply every expiry rule to `doc`.
    ///
    /// The main fields are computed only while the document is Issued or
    /// Active; supporting rows are computed on every call.
    pub fn apply(&self, doc: &mut DocumentApplication) -> Result<(), DocumentError> {
        if doc.status.is_in_force() {
            let doc_type = self.document_type(&doc.document_type)?;
            let predecessor = match doc.predecessor() {
                Some(id) => Some(self.store.application(&id)?.ok_or_else(|| {
                    ValidationError::not_found(RecordKind::DocumentApplication, id)
                })?),
                None => None,
            };
            calculate_expiry(doc, &doc_type, predecessor.as_ref())?;
        }
        calculate_supporting_expiry(&mut doc.supporting_documents, |id| self.document_type(id))
    }
}
