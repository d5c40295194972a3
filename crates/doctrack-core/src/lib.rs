//! # doctrack-core: Foundational Types for Doctrack
//!
//! This crate is the bedrock of the Doctrack workspace. It defines the
//! primitives every other crate builds on and depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `ApplicationId`, `ApplicantId`,
//!    `DocumentTypeId`, `CategoryId` and `EmployeeId`. No bare strings cross
//!    crate boundaries, so a document type can never be passed where a
//!    category is expected.
//!
//! 2. **One error taxonomy.** Save-time failures are either a
//!    [`ValidationError`] (the caller must correct the document) or a
//!    [`ConfigurationError`] (master data is missing a required setting).
//!    Missing records surface as `ValidationError::NotFound`.
//!
//! 3. **Typed validity periods.** [`ValidityPeriod`] carries its unit
//!    (days or months) so date arithmetic is never ambiguous.
//!
//! 4. **Injectable time.** Everything that asks "what day is it?" goes through
//!    the [`Clock`] trait. Tests pin the date with [`FixedClock`].
//!
//! ## Crate Policy
//!
//! - No dependencies on other `doctrack-*` crates (leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use error::{ConfigurationError, RecordKind, StoreError, ValidationError};
pub use identity::{ApplicantId, ApplicationId, CategoryId, DocumentTypeId, EmployeeId};
pub use temporal::{Clock, FixedClock, SystemClock, ValidityPeriod};
