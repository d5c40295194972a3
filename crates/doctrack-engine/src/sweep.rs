//! # Expiry Sweep
//!
//! The daily job that expires documents and sends reminders. For every
//! Active or Issued document:
//!
//! 1. Project the effective expiry (renewal and extension aware).
//! 2. If that date has passed and the expired notification has not gone
//!    out: move the document to `Expired`, set the flag, persist, then
//!    dispatch "Document Expired".
//! 3. Otherwise, if the document type configures a reminder lead time and
//!    `expiry - lead <= today` (inclusive, so a missed day still sends):
//!    set the reminder flag, persist, then dispatch "Document Expiry
//!    Reminder".
//!
//! ## Delivery Guarantee
//!
//! Flags are persisted before dispatch. A crash or dispatcher failure
//! after the write means the notification is lost, never repeated:
//! at-most-once delivery. A document whose write fails is left for the
//! next run.
//!
//! ## Failure Isolation
//!
//! Per-document failures (lookup, persist, dispatch) are logged, counted
//! and collected in the [`SweepReport`]; the run continues with the next
//! document. Only an inability to load the candidate set fails the whole
//! run.

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use doctrack_core::{ApplicationId, Clock, RecordKind, ValidationError};
use doctrack_state::{DocumentApplication, DocumentStatus, TransitionEvidence};

use crate::error::{DocumentError, SweepError};
use crate::expiry::effective_expiry;
use crate::notify::{AlertLog, EmailMessage, NotificationDispatcher, NotificationKind};
use crate::store::{ApplicationFilter, DocumentStore};

/// Actor recorded on sweep transitions.
pub const SWEEP_ACTOR: &str = "system:expiry-sweep";

/// Where notifications go when the document itself names nobody.
///
/// Resolution order: the applicant's email, the linked employee's email,
/// then `default_recipient`. The alert goes to the document owner, or to
/// the resolved email when the document has no owner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientPolicy {
    /// Fallback address.
    #[serde(default)]
    pub default_recipient: Option<String>,
}

/// A document the sweep could not process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepFailure {
    /// The document.
    pub document: ApplicationId,
    /// What went wrong.
    pub reason: String,
}

/// Outcome of one sweep run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// The date the run evaluated against.
    pub date: NaiveDate,
    /// Active or Issued documents examined.
    pub scanned: usize,
    /// Documents moved to Expired.
    pub expired: usize,
    /// Reminders flagged.
    pub reminded: usize,
    /// Notifications due but not sent for lack of a recipient.
    pub skipped: usize,
    /// Per-document failures.
    pub failures: Vec<SweepFailure>,
}

impl SweepReport {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            scanned: 0,
            expired: 0,
            reminded: 0,
            skipped: 0,
            failures: Vec::new(),
        }
    }
}

#[derive(Debug)]
enum Action {
    Expire,
    Remind,
}

/// The daily expiry job.
pub struct ExpirySweep {
    store: Arc<dyn DocumentStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    clock: Arc<dyn Clock>,
    recipients: RecipientPolicy,
    job_lock: Mutex<()>,
}

impl ExpirySweep {
    /// Create a sweep over `store`.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        clock: Arc<dyn Clock>,
        recipients: RecipientPolicy,
    ) -> Self {
        Self {
            store,
            dispatcher,
            clock,
            recipients,
            job_lock: Mutex::new(()),
        }
    }

    /// Run one sweep against the clock's current date.
    pub fn run(&self) -> Result<SweepReport, SweepError> {
        let _guard = self.job_lock.try_lock().ok_or(SweepError::AlreadyRunning)?;
        let today = self.clock.today();
        metrics::counter!("doctrack_sweep_runs_total").increment(1);

        let filter = ApplicationFilter::new().with_statuses(&DocumentStatus::IN_FORCE);
        let candidates = self
            .store
            .query_applications(&filter)
            .map_err(SweepError::Load)?;

        let mut report = SweepReport::new(today);
        for doc in candidates {
            report.scanned += 1;
            let id = doc.id;
            if let Err(reason) = self.process(doc, today, &mut report) {
                tracing::warn!(document_id = %id, %reason, "expiry sweep skipped document");
                metrics::counter!("doctrack_sweep_failures_total").increment(1);
                report.failures.push(SweepFailure {
                    document: id,
                    reason,
                });
            }
        }

        tracing::info!(
            date = %report.date,
            scanned = report.scanned,
            expired = report.expired,
            reminded = report.reminded,
            skipped = report.skipped,
            failures = report.failures.len(),
            "expiry sweep complete"
        );
        Ok(report)
    }

    fn process(
        &self,
        mut doc: DocumentApplication,
        today: NaiveDate,
        report: &mut SweepReport,
    ) -> Result<(), String> {
        let Some(expiry) = effective_expiry(&doc) else {
            return Ok(());
        };

        let action = if expiry < today {
            if doc.expired_notification_sent {
                return Ok(());
            }
            Action::Expire
        } else {
            let doc_type = self
                .store
                .document_type(&doc.document_type)
                .map_err(|e| e.to_string())?
                .ok_or_else(|| {
                    ValidationError::not_found(RecordKind::DocumentType, &doc.document_type)
                        .to_string()
                })?;
            let Some(days) = doc_type.reminder_days() else {
                return Ok(());
            };
            let due = expiry
                .checked_sub_days(Days::new(u64::from(days)))
                .map_or(true, |reminder_date| reminder_date <= today);
            if !due || doc.expiry_reminder_sent {
                return Ok(());
            }
            Action::Remind
        };

        let kind = match action {
            Action::Expire => {
                doc.expire(
                    TransitionEvidence::new(format!("validity ended on {expiry}"), self.clock.now())
                        .by(SWEEP_ACTOR),
                )
                .map_err(|e| e.to_string())?;
                doc.expired_notification_sent = true;
                NotificationKind::Expired
            }
            Action::Remind => {
                doc.expiry_reminder_sent = true;
                NotificationKind::ExpiryReminder
            }
        };

        self.store
            .put_application(&doc)
            .map_err(|e| e.to_string())?;
        match kind {
            NotificationKind::Expired => report.expired += 1,
            NotificationKind::ExpiryReminder => report.reminded += 1,
        }

        let message = match kind {
            NotificationKind::Expired => format!("Document {} expired on {expiry}", doc.id),
            NotificationKind::ExpiryReminder => {
                format!("Document {} is expiring on {expiry}", doc.id)
            }
        };
        let Some(email) = self.resolve_recipient(&doc).map_err(|e| e.to_string())? else {
            tracing::warn!(
                document_id = %doc.id,
                kind = kind.as_str(),
                "no notification recipient; flag committed without sending"
            );
            report.skipped += 1;
            return Ok(());
        };
        self.dispatch(&doc, kind, email, message)
    }

    fn resolve_recipient(&self, doc: &DocumentApplication) -> Result<Option<String>, DocumentError> {
        let applicant = self.store.applicant(&doc.applicant)?;
        if let Some(email) = applicant.as_ref().and_then(|a| non_blank(a.email.as_deref())) {
            return Ok(Some(email));
        }

        let employee_id = doc
            .employee
            .clone()
            .or_else(|| applicant.and_then(|a| a.employee));
        if let Some(employee_id) = employee_id {
            let employee = self.store.employee(&employee_id)?;
            if let Some(email) = employee.and_then(|e| non_blank(e.email.as_deref())) {
                return Ok(Some(email));
            }
        }

        Ok(non_blank(self.recipients.default_recipient.as_deref()))
    }

    fn dispatch(
        &self,
        doc: &DocumentApplication,
        kind: NotificationKind,
        email: String,
        message: String,
    ) -> Result<(), String> {
        let user = non_blank(doc.owner.as_deref()).unwrap_or_else(|| email.clone());
        let mail = EmailMessage {
            recipients: vec![email],
            subject: kind.subject().to_string(),
            message: message.clone(),
            document: doc.id,
            kind,
        };
        let alert = AlertLog {
            user,
            subject: kind.subject().to_string(),
            message,
            document: doc.id,
            kind,
        };

        // Both channels are attempted; the first failure is reported.
        let sent = self.dispatcher.send_email(&mail);
        let alerted = self.dispatcher.create_alert(&alert);
        if sent.is_ok() {
            metrics::counter!("doctrack_notifications_total", "kind" => kind.as_str()).increment(1);
        }
        sent.and(alerted).map_err(|e| e.to_string())
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use doctrack_core::{
        ApplicantId, DocumentTypeId, EmployeeId, FixedClock, StoreError, ValidityPeriod,
    };
    use doctrack_state::{
        Applicant, ApplicantType, DocumentType, Employee, TransactionType,
    };

    use crate::error::NotifyError;
    use crate::notify::OutboxDispatcher;
    use crate::store::InMemoryStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn permit_type(reminder: Option<u32>) -> DocumentType {
        DocumentType {
            id: DocumentTypeId::new("Work Permit").unwrap(),
            name: None,
            category: None,
            is_active: true,
            has_expiry: true,
            validity: Some(ValidityPeriod::Days(365)),
            renewal_allowed: true,
            reminder_days_before_expiry: reminder,
        }
    }

    fn active(applicant: &str, expiry: NaiveDate) -> DocumentApplication {
        let mut doc = DocumentApplication::new(
            ApplicantId::new(applicant).unwrap(),
            DocumentTypeId::new("Work Permit").unwrap(),
            TransactionType::NewApplication,
            Utc::now(),
        )
        .with_expiry_date(expiry)
        .with_owner("officer@example.com");
        doc.activate(TransitionEvidence::new("test", Utc::now()))
            .unwrap();
        doc
    }

    fn applicant(id: &str, email: Option<&str>) -> Applicant {
        Applicant {
            id: ApplicantId::new(id).unwrap(),
            applicant_type: ApplicantType::External,
            full_name: Some(id.to_string()),
            employee: None,
            email: email.map(str::to_string),
        }
    }

    struct Fixture {
        store: InMemoryStore,
        outbox: Arc<OutboxDispatcher>,
        clock: Arc<FixedClock>,
        sweep: ExpirySweep,
    }

    fn fixture(today: NaiveDate, reminder: Option<u32>, default_recipient: Option<&str>) -> Fixture {
        let store = InMemoryStore::new();
        store.put_document_type(&permit_type(reminder)).unwrap();
        let outbox = Arc::new(OutboxDispatcher::new());
        let clock = Arc::new(FixedClock::new(today));
        let sweep = ExpirySweep::new(
            Arc::new(store.clone()),
            outbox.clone(),
            clock.clone(),
            RecipientPolicy {
                default_recipient: default_recipient.map(str::to_string),
            },
        );
        Fixture {
            store,
            outbox,
            clock,
            sweep,
        }
    }

    #[test]
    fn test_expires_past_documents_once() {
        let f = fixture(date(2024, 3, 10), None, None);
        f.store.put_applicant(&applicant("APP-1", Some("a@example.com"))).unwrap();
        let doc = active("APP-1", date(2024, 3, 9));
        f.store.put_application(&doc).unwrap();

        let report = f.sweep.run().unwrap();
        assert_eq!(report.scanned, 1);
        assert_eq!(report.expired, 1);
        let stored = f.store.application(&doc.id).unwrap().unwrap();
        assert_eq!(stored.status, DocumentStatus::Expired);
        assert!(stored.expired_notification_sent);

        let outbox = f.outbox.snapshot();
        assert_eq!(outbox.emails.len(), 1);
        assert_eq!(outbox.emails[0].subject, "Document Expired");
        assert_eq!(outbox.emails[0].recipients, vec!["a@example.com".to_string()]);
        assert_eq!(
            outbox.emails[0].message,
            format!("Document {} expired on 2024-03-09", doc.id)
        );
        assert_eq!(outbox.alerts[0].user, "officer@example.com");

        // Expired documents leave the candidate set.
        let again = f.sweep.run().unwrap();
        assert_eq!(again.scanned, 0);
        assert_eq!(f.outbox.snapshot().emails.len(), 1);
    }

    #[test]
    fn test_expiry_day_itself_is_not_expired() {
        let f = fixture(date(2024, 3, 10), None, Some("ops@example.com"));
        let doc = active("APP-1", date(2024, 3, 10));
        f.store.put_application(&doc).unwrap();
        let report = f.sweep.run().unwrap();
        assert_eq!(report.expired, 0);
        assert_eq!(
            f.store.application(&doc.id).unwrap().unwrap().status,
            DocumentStatus::Active
        );
    }

    #[test]
    fn test_reminder_inclusive_and_sent_once() {
        let f = fixture(date(2024, 3, 1), Some(10), Some("ops@example.com"));
        // reminder date = 2024-03-01 exactly
        let due = active("APP-1", date(2024, 3, 11));
        // reminder date already passed (missed run)
        let overdue = active("APP-2", date(2024, 3, 5));
        // reminder date in the future
        let later = active("APP-3", date(2024, 3, 20));
        for d in [&due, &overdue, &later] {
            f.store.put_application(d).unwrap();
        }

        let report = f.sweep.run().unwrap();
        assert_eq!(report.reminded, 2);
        assert!(f.store.application(&due.id).unwrap().unwrap().expiry_reminder_sent);
        assert!(f.store.application(&overdue.id).unwrap().unwrap().expiry_reminder_sent);
        assert!(!f.store.application(&later.id).unwrap().unwrap().expiry_reminder_sent);
        let outbox = f.outbox.snapshot();
        assert_eq!(outbox.emails.len(), 2);
        assert!(outbox
            .emails
            .iter()
            .all(|e| e.subject == "Document Expiry Reminder"));
        assert_eq!(outbox.emails[0].recipients, vec!["ops@example.com".to_string()]);

        let again = f.sweep.run().unwrap();
        assert_eq!(again.reminded, 0);
        assert_eq!(f.outbox.snapshot().emails.len(), 2);

        f.clock.set(date(2024, 3, 10));
        assert_eq!(f.sweep.run().unwrap().reminded, 1);
    }

    #[test]
    fn test_no_reminder_without_lead_time() {
        for reminder in [None, Some(0)] {
            let f = fixture(date(2024, 3, 1), reminder, Some("ops@example.com"));
            f.store.put_application(&active("APP-1", date(2024, 3, 2))).unwrap();
            assert_eq!(f.sweep.run().unwrap().reminded, 0);
        }
    }

    #[test]
    fn test_renewal_uses_new_expiry() {
        let f = fixture(date(2024, 3, 10), None, Some("ops@example.com"));
        let mut renewal = active("APP-1", date(2024, 3, 1));
        renewal.transaction_type = TransactionType::Renewal;
        renewal.new_expiry_date = Some(date(2025, 3, 1));
        f.store.put_application(&renewal).unwrap();
        assert_eq!(f.sweep.run().unwrap().expired, 0);
    }

    #[test]
    fn test_recipient_falls_back_to_employee() {
        let f = fixture(date(2024, 3, 10), None, Some("ops@example.com"));
        f.store
            .put_employee(&Employee {
                id: EmployeeId::new("EMP-1").unwrap(),
                employee_name: Some("Asha".into()),
                email: Some("asha@corp.example".into()),
            })
            .unwrap();
        let mut a = applicant("APP-1", None);
        a.employee = Some(EmployeeId::new("EMP-1").unwrap());
        f.store.put_applicant(&a).unwrap();
        f.store.put_application(&active("APP-1", date(2024, 1, 1))).unwrap();

        f.sweep.run().unwrap();
        assert_eq!(
            f.outbox.snapshot().emails[0].recipients,
            vec!["asha@corp.example".to_string()]
        );
    }

    #[test]
    fn test_no_recipient_commits_flag_and_skips() {
        let f = fixture(date(2024, 3, 10), None, None);
        let mut doc = active("APP-1", date(2024, 1, 1));
        doc.owner = None;
        f.store.put_application(&doc).unwrap();

        let report = f.sweep.run().unwrap();
        assert_eq!(report.expired, 1);
        assert_eq!(report.skipped, 1);
        assert!(report.failures.is_empty());
        assert!(f.outbox.snapshot().emails.is_empty());
        assert!(f.store.application(&doc.id).unwrap().unwrap().expired_notification_sent);
    }

    struct FailingFor {
        inner: OutboxDispatcher,
        bad_document: ApplicationId,
    }

    impl NotificationDispatcher for FailingFor {
        fn send_email(&self, email: &EmailMessage) -> Result<(), NotifyError> {
            if email.document == self.bad_document {
                return Err(NotifyError::Transport("relay down".into()));
            }
            self.inner.send_email(email)
        }
        fn create_alert(&self, alert: &AlertLog) -> Result<(), NotifyError> {
            self.inner.create_alert(alert)
        }
    }

    #[test]
    fn test_dispatch_failure_is_isolated() {
        let store = InMemoryStore::new();
        store.put_document_type(&permit_type(None)).unwrap();
        let bad = active("APP-1", date(2024, 1, 1));
        let good = active("APP-2", date(2024, 1, 1));
        store.put_application(&bad).unwrap();
        store.put_application(&good).unwrap();
        let dispatcher = Arc::new(FailingFor {
            inner: OutboxDispatcher::new(),
            bad_document: bad.id,
        });
        let sweep = ExpirySweep::new(
            Arc::new(store.clone()),
            dispatcher.clone(),
            Arc::new(FixedClock::new(date(2024, 3, 10))),
            RecipientPolicy {
                default_recipient: Some("ops@example.com".into()),
            },
        );

        let report = sweep.run().unwrap();
        assert_eq!(report.expired, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].document, bad.id);
        assert!(report.failures[0].reason.contains("relay down"));
        assert_eq!(dispatcher.inner.snapshot().emails.len(), 1);
        // Flag stays committed: no retry next run.
        assert!(store.application(&bad.id).unwrap().unwrap().expired_notification_sent);
    }

    #[test]
    fn test_missing_document_type_is_isolated() {
        let f = fixture(date(2024, 3, 1), Some(10), Some("ops@example.com"));
        let mut orphan = active("APP-1", date(2024, 3, 5));
        orphan.document_type = DocumentTypeId::new("Ghost").unwrap();
        let fine = active("APP-2", date(2024, 3, 5));
        f.store.put_application(&orphan).unwrap();
        f.store.put_application(&fine).unwrap();

        let report = f.sweep.run().unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.reminded, 1);
        assert_eq!(report.failures[0].reason, "Document Type Ghost not found");
    }

    #[test]
    fn test_overlapping_run_rejected() {
        let f = fixture(date(2024, 3, 1), None, None);
        let _held = f.sweep.job_lock.lock();
        assert_eq!(f.sweep.run().unwrap_err(), SweepError::AlreadyRunning);
    }

    struct BrokenStore;

    impl DocumentStore for BrokenStore {
        fn application(&self, _: &ApplicationId) -> Result<Option<DocumentApplication>, StoreError> {
            Err(StoreError::Backend("down".into()))
        }
        fn put_application(&self, _: &DocumentApplication) -> Result<(), StoreError> {
            Err(StoreError::Backend("down".into()))
        }
        fn query_applications(&self, _: &ApplicationFilter) -> Result<Vec<DocumentApplication>, StoreError> {
            Err(StoreError::Backend("down".into()))
        }
        fn document_type(&self, _: &DocumentTypeId) -> Result<Option<DocumentType>, StoreError> {
            Err(StoreError::Backend("down".into()))
        }
        fn put_document_type(&self, _: &DocumentType) -> Result<(), StoreError> {
            Err(StoreError::Backend("down".into()))
        }
        fn category(&self, _: &doctrack_core::CategoryId) -> Result<Option<doctrack_state::DocumentCategory>, StoreError> {
            Err(StoreError::Backend("down".into()))
        }
        fn put_category(&self, _: &doctrack_state::DocumentCategory) -> Result<(), StoreError> {
            Err(StoreError::Backend("down".into()))
        }
        fn applicant(&self, _: &ApplicantId) -> Result<Option<Applicant>, StoreError> {
            Err(StoreError::Backend("down".into()))
        }
        fn put_applicant(&self, _: &Applicant) -> Result<(), StoreError> {
            Err(StoreError::Backend("down".into()))
        }
        fn employee(&self, _: &EmployeeId) -> Result<Option<Employee>, StoreError> {
            Err(StoreError::Backend("down".into()))
        }
        fn put_employee(&self, _: &Employee) -> Result<(), StoreError> {
            Err(StoreError::Backend("down".into()))
        }
    }

    #[test]
    fn test_load_failure_fails_run() {
        let sweep = ExpirySweep::new(
            Arc::new(BrokenStore),
            Arc::new(OutboxDispatcher::new()),
            Arc::new(FixedClock::new(date(2024, 3, 1))),
            RecipientPolicy::default(),
        );
        assert!(matches!(sweep.run(), Err(SweepError::Load(_))));
    }
}
