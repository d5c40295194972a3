//! # Master Data Records
//!
//! Reference data that a Document Application points at: document
//! categories, document types (with their validity rule), applicants and
//! employees.

use serde::{Deserialize, Serialize};

use doctrack_core::{
    ApplicantId, CategoryId, ConfigurationError, DocumentTypeId, EmployeeId, ValidationError,
    ValidityPeriod,
};

fn default_true() -> bool {
    true
}

/// A grouping of document types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentCategory {
    /// Identifier.
    pub id: CategoryId,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Inactive categories cannot be used on new saves.
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// How a document type's expiry is derived, once its configuration has
/// been checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryRule {
    /// Documents of this type never expire.
    NoExpiry,
    /// Documents expire after the given period.
    Validity(ValidityPeriod),
}

/// A class of documents with its validity and renewal rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentType {
    /// Identifier.
    pub id: DocumentTypeId,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Category this type belongs to.
    #[serde(default)]
    pub category: Option<CategoryId>,
    /// Inactive types cannot be used on new saves.
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Whether documents of this type expire at all.
    #[serde(default)]
    pub has_expiry: bool,
    /// Validity period; required when `has_expiry` is set.
    #[serde(default)]
    pub validity: Option<ValidityPeriod>,
    /// Whether Renewal transactions are allowed.
    #[serde(default = "default_true")]
    pub renewal_allowed: bool,
    /// Days before expiry at which the reminder is sent.
    #[serde(default)]
    pub reminder_days_before_expiry: Option<u32>,
}

impl DocumentType {
    /// Resolve the expiry rule, enforcing that `has_expiry` implies a
    /// non-zero validity period.
    pub fn expiry_rule(&self) -> Result<ExpiryRule, ConfigurationError> {
        if !self.has_expiry {
            return Ok(ExpiryRule::NoExpiry);
        }
        match self.validity {
            Some(period) if period.is_defined() => Ok(ExpiryRule::Validity(period)),
            _ => Err(ConfigurationError::ValidityPeriodNotDefined {
                document_type: self.id.clone(),
            }),
        }
    }

    /// Reminder lead time in days; zero counts as unset.
    pub fn reminder_days(&self) -> Option<u32> {
        self.reminder_days_before_expiry.filter(|d| *d > 0)
    }
}

/// An employee record, owned by the HR system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    /// Identifier.
    pub id: EmployeeId,
    /// Name as recorded by HR.
    #[serde(default)]
    pub employee_name: Option<String>,
    /// Work email.
    #[serde(default)]
    pub email: Option<String>,
}

impl Employee {
    /// The employee's name, if non-blank.
    pub fn name(&self) -> Option<&str> {
        self.employee_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }
}

/// Whether an applicant is an employee or an external party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ApplicantType {
    /// An employee; name comes from the employee record.
    Employee,
    /// An external party; name is entered directly.
    #[default]
    External,
}

/// A person to whom documents are issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applicant {
    /// Identifier.
    pub id: ApplicantId,
    /// Employee or External.
    #[serde(default)]
    pub applicant_type: ApplicantType,
    /// Full name.
    #[serde(default)]
    pub full_name: Option<String>,
    /// Linked employee for Employee applicants.
    #[serde(default)]
    pub employee: Option<EmployeeId>,
    /// Contact email for notifications.
    #[serde(default)]
    pub email: Option<String>,
}

impl Applicant {
    /// Apply the applicant-type rule to this record.
    ///
    /// Employee applicants take their name from `employee`, which must be
    /// the record referenced by `self.employee`. External applicants must
    /// carry a non-blank `full_name`.
    pub fn resolve_full_name(&mut self, employee: Option<&Employee>) -> Result<(), ValidationError> {
        match self.applicant_type {
            ApplicantType::Employee => {
                let employee_id = self
                    .employee
                    .as_ref()
                    .ok_or(ValidationError::EmployeeRequired)?;
                let employee = employee.filter(|e| &e.id == employee_id).ok_or_else(|| {
                    ValidationError::not_found(doctrack_core::RecordKind::Employee, employee_id)
                })?;
                let name = employee
                    .name()
                    .ok_or_else(|| ValidationError::EmployeeNameUnavailable {
                        employee: employee.id.clone(),
                    })?;
                self.full_name = Some(name.to_string());
            }
            ApplicantType::External => {
                let has_name = self
                    .full_name
                    .as_deref()
                    .is_some_and(|n| !n.trim().is_empty());
                if !has_name {
                    return Err(ValidationError::FullNameRequired);
                }
            }
        }
        Ok(())
    }
}
