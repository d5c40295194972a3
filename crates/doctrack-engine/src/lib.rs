//! # doctrack-engine: Document Processing Engine
//!
//! Everything that looks at more than one record at a time.
//!
//! ## Architecture
//!
//! - **Expiry** (`expiry.rs`): expiry and new-expiry calculation for new
//!   applications, renewals, extensions and supporting documents, plus the
//!   effective-expiry projection used by the sweep.
//!
//! - **Validation** (`validation.rs`): the ordered data-integrity and
//!   business-rule checks run on every save.
//!
//! - **Lifecycle** (`lifecycle.rs`): the submission saga that supersedes a
//!   renewed or extended predecessor, with compensation on failure.
//!
//! - **Sweep** (`sweep.rs`) and **Schedule** (`schedule.rs`): the daily
//!   expiry job and its once-per-day trigger.
//!
//! - **Notify** (`notify.rs`): the email and in-app alert seam.
//!
//! - **Store** (`store.rs`): the persistence seam and the in-memory
//!   implementation.
//!
//! - **Service** (`service.rs`): the save/submit pipeline composing the
//!   above.
//!
//! ## Crate Policy
//!
//! - Depends on `doctrack-core` and `doctrack-state` internally.
//! - No async: callers drive the sweep from whatever runtime they use.

pub mod error;
pub mod expiry;
pub mod lifecycle;
pub mod notify;
pub mod schedule;
pub mod service;
pub mod store;
pub mod sweep;
pub mod validation;

pub use error::{DocumentError, NotifyError, ScheduleError, SweepError};
pub use expiry::{effective_expiry, ExpiryCalculator};
pub use lifecycle::{CascadeError, CompensationRecord, SubmissionSaga};
pub use notify::{
    AlertLog, EmailMessage, NotificationDispatcher, NotificationKind, Outbox, OutboxDispatcher,
    TracingDispatcher,
};
pub use schedule::DailySchedule;
pub use service::DocumentService;
pub use store::{ApplicationFilter, CreationOrder, Dataset, DocumentStore, InMemoryStore};
pub use sweep::{ExpirySweep, RecipientPolicy, SweepFailure, SweepReport};
pub use validation::Validator;
