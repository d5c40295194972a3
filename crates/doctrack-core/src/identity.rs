//! # Identity Newtypes
//!
//! Newtype wrappers for every identifier in Doctrack. Each identifier is a
//! distinct type: a [`DocumentTypeId`] cannot be passed where a
//! [`CategoryId`] is expected.
//!
//! ## Validation
//!
//! Master-data identifiers are human-assigned names (e.g. `"Trade License"`,
//! `"EMP-0042"`) and must be non-blank after trimming. Validation happens at
//! construction and at deserialization time. [`ApplicationId`] is a UUID and
//! is always valid by construction.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Implements `Deserialize` for string newtypes by routing the raw string
/// through the type's `new()` constructor, so blank identifiers are rejected
/// when a dataset is loaded rather than when they are first used.
macro_rules! impl_validating_deserialize {
    ($ty:ident) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::new(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

fn non_blank(value: impl Into<String>, field: &'static str) -> Result<String, ValidationError> {
    let value = value.into();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField { field });
    }
    Ok(trimmed.to_string())
}

// ---------------------------------------------------------------------------
// UUID-based identifiers
// ---------------------------------------------------------------------------

/// Unique identifier of a Document Application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(Uuid);

impl ApplicationId {
    /// Generate a new random application identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an application identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ApplicationId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ApplicationId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Master-data identifiers (validated names)
// ---------------------------------------------------------------------------

/// Identifier of an applicant (employee or external party).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ApplicantId(String);

impl ApplicantId {
    /// Create an applicant identifier. Rejects blank values.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        non_blank(value, "applicant").map(Self)
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl_validating_deserialize!(ApplicantId);

impl std::fmt::Display for ApplicantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a Document Type master record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DocumentTypeId(String);

impl DocumentTypeId {
    /// Create a document type identifier. Rejects blank values.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        non_blank(value, "document type").map(Self)
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl_validating_deserialize!(DocumentTypeId);

impl std::fmt::Display for DocumentTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a Document Category master record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CategoryId(String);

impl CategoryId {
    /// Create a category identifier. Rejects blank values.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        non_blank(value, "document category").map(Self)
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl_validating_deserialize!(CategoryId);

impl std::fmt::Display for CategoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of an Employee record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EmployeeId(String);

impl EmployeeId {
    /// Create an employee identifier. Rejects blank values.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        non_blank(value, "employee").map(Self)
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl_validating_deserialize!(EmployeeId);

impl std::fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
