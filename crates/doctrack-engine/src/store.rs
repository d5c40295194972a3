//! # Document Store
//!
//! The persistence seam. [`DocumentStore`] is the only way the engine reads
//! or writes records; [`InMemoryStore`] is the bundled implementation,
//! backed by `Arc<RwLock<..>>` maps and serializable to a [`Dataset`] for
//! the CLI's file round trip.
//!
//! ## Query Model
//!
//! [`ApplicationFilter`] covers the queries the engine issues: equality on
//! applicant, document type and submission state, membership on status, a
//! single excluded id, creation-time ordering and a limit. Documents with
//! identical `created_at` keep their insertion order.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use doctrack_core::{ApplicantId, ApplicationId, CategoryId, DocumentTypeId, EmployeeId, StoreError};
use doctrack_state::{
    Applicant, DocumentApplication, DocumentCategory, DocumentStatus, DocumentType, Employee,
    SubmissionState,
};

// ─── Filter ──────────────────────────────────────────────────────────

/// Ordering by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CreationOrder {
    /// Oldest first.
    #[default]
    Ascending,
    /// Newest first.
    Descending,
}

/// Selection criteria for Document Applications.
///
/// Unset criteria match everything; an empty `statuses` list matches any
/// status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationFilter {
    /// Applicant equality.
    pub applicant: Option<ApplicantId>,
    /// Document type equality.
    pub document_type: Option<DocumentTypeId>,
    /// Status membership.
    pub statuses: Vec<DocumentStatus>,
    /// Submission state equality.
    pub submission: Option<SubmissionState>,
    /// Document to leave out.
    pub exclude: Option<ApplicationId>,
    /// Result ordering.
    pub order: CreationOrder,
    /// Maximum number of results.
    pub limit: Option<usize>,
}

impl ApplicationFilter {
    /// A filter matching every document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Documents of `applicant` and `document_type`.
    pub fn for_pair(applicant: &ApplicantId, document_type: &DocumentTypeId) -> Self {
        Self {
            applicant: Some(applicant.clone()),
            document_type: Some(document_type.clone()),
            ..Self::default()
        }
    }

    /// Restrict to the given statuses.
    pub fn with_statuses(mut self, statuses: &[DocumentStatus]) -> Self {
        self.statuses = statuses.to_vec();
        self
    }

    /// Restrict to a submission state.
    pub fn with_submission(mut self, submission: SubmissionState) -> Self {
        self.submission = Some(submission);
        self
    }

    /// Leave out one document.
    pub fn excluding(mut self, id: ApplicationId) -> Self {
        self.exclude = Some(id);
        self
    }

    /// Newest first.
    pub fn newest_first(mut self) -> Self {
        self.order = CreationOrder::Descending;
        self
    }

    /// Cap the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `doc` satisfies every criterion (ordering and limit aside).
    pub fn matches(&self, doc: &DocumentApplication) -> bool {
        self.applicant.as_ref().map_or(true, |a| &doc.applicant == a)
            && self
                .document_type
                .as_ref()
                .map_or(true, |t| &doc.document_type == t)
            && (self.statuses.is_empty() || self.statuses.contains(&doc.status))
            && self.submission.map_or(true, |s| doc.submission == s)
            && self.exclude.map_or(true, |id| doc.id != id)
    }
}

// ─── Store trait ─────────────────────────────────────────────────────

/// Record persistence used by the validator, the cascade and the sweep.
///
/// Lookups return `Ok(None)` for a missing record; the caller decides
/// whether absence is an error.
pub trait DocumentStore: Send + Sync {
    /// Fetch a Document Application.
    fn application(&self, id: &ApplicationId) -> Result<Option<DocumentApplication>, StoreError>;

    /// Insert or replace a Document Application.
    fn put_application(&self, doc: &DocumentApplication) -> Result<(), StoreError>;

    /// Select Document Applications.
    fn query_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<DocumentApplication>, StoreError>;

    /// Fetch a Document Type.
    fn document_type(&self, id: &DocumentTypeId) -> Result<Option<DocumentType>, StoreError>;

    /// Insert or replace a Document Type.
    fn put_document_type(&self, record: &DocumentType) -> Result<(), StoreError>;

    /// Fetch a Document Category.
    fn category(&self, id: &CategoryId) -> Result<Option<DocumentCategory>, StoreError>;

    /// Insert or replace a Document Category.
    fn put_category(&self, record: &DocumentCategory) -> Result<(), StoreError>;

    /// Fetch an Applicant.
    fn applicant(&self, id: &ApplicantId) -> Result<Option<Applicant>, StoreError>;

    /// Insert or replace an Applicant.
    fn put_applicant(&self, record: &Applicant) -> Result<(), StoreError>;

    /// Fetch an Employee.
    fn employee(&self, id: &EmployeeId) -> Result<Option<Employee>, StoreError>;

    /// Insert or replace an Employee.
    fn put_employee(&self, record: &Employee) -> Result<(), StoreError>;
}

// ─── Dataset ─────────────────────────────────────────────────────────

/// Serializable snapshot of every record in a store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    /// Document categories.
    #[serde(default)]
    pub document_categories: Vec<DocumentCategory>,
    /// Document types.
    #[serde(default)]
    pub document_types: Vec<DocumentType>,
    /// Employees.
    #[serde(default)]
    pub employees: Vec<Employee>,
    /// Applicants.
    #[serde(default)]
    pub applicants: Vec<Applicant>,
    /// Document Applications, in creation order.
    #[serde(default)]
    pub applications: Vec<DocumentApplication>,
}

impl Dataset {
    /// Parse a YAML (or JSON) dataset.
    pub fn from_yaml_str(input: &str) -> Result<Self, StoreError> {
        serde_yaml::from_str(input).map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    /// Render the dataset as YAML.
    pub fn to_yaml_string(&self) -> Result<String, StoreError> {
        serde_yaml::to_string(self).map_err(|e| StoreError::Corrupt(e.to_string()))
    }
}

// ─── In-memory store ─────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct StoredApplication {
    seq: u64,
    doc: DocumentApplication,
}

#[derive(Debug, Default)]
struct Tables {
    applications: HashMap<ApplicationId, StoredApplication>,
    next_seq: u64,
    document_types: BTreeMap<DocumentTypeId, DocumentType>,
    categories: BTreeMap<CategoryId, DocumentCategory>,
    applicants: BTreeMap<ApplicantId, Applicant>,
    employees: BTreeMap<EmployeeId, Employee>,
}

/// Thread-safe in-memory [`DocumentStore`].
///
/// Clones share the same underlying tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a dataset, keeping the dataset's application order
    /// as the insertion order.
    pub fn from_dataset(dataset: Dataset) -> Self {
        let store = Self::new();
        {
            let mut tables = store.tables.write();
            for record in dataset.document_categories {
                tables.categories.insert(record.id.clone(), record);
            }
            for record in dataset.document_types {
                tables.document_types.insert(record.id.clone(), record);
            }
            for record in dataset.employees {
                tables.employees.insert(record.id.clone(), record);
            }
            for record in dataset.applicants {
                tables.applicants.insert(record.id.clone(), record);
            }
            for doc in dataset.applications {
                insert_application(&mut tables, doc);
            }
        }
        store
    }

    /// Snapshot every record.
    pub fn to_dataset(&self) -> Dataset {
        let tables = self.tables.read();
        let mut stored: Vec<&StoredApplication> = tables.applications.values().collect();
        stored.sort_by(|a, b| (a.doc.created_at, a.seq).cmp(&(b.doc.created_at, b.seq)));
        Dataset {
            document_categories: tables.categories.values().cloned().collect(),
            document_types: tables.document_types.values().cloned().collect(),
            employees: tables.employees.values().cloned().collect(),
            applicants: tables.applicants.values().cloned().collect(),
            applications: stored.into_iter().map(|s| s.doc.clone()).collect(),
        }
    }

    /// Number of stored Document Applications.
    pub fn application_count(&self) -> usize {
        self.tables.read().applications.len()
    }
}

fn insert_application(tables: &mut Tables, doc: DocumentApplication) {
    // Replacing a document keeps its original insertion slot.
    let seq = match tables.applications.get(&doc.id) {
        Some(existing) => existing.seq,
        None => {
            tables.next_seq += 1;
            tables.next_seq
        }
    };
    tables
        .applications
        .insert(doc.id, StoredApplication { seq, doc });
}

impl DocumentStore for InMemoryStore {
    fn application(&self, id: &ApplicationId) -> Result<Option<DocumentApplication>, StoreError> {
        Ok(self
            .tables
            .read()
            .applications
            .get(id)
            .map(|s| s.doc.clone()))
    }

    fn put_application(&self, doc: &DocumentApplication) -> Result<(), StoreError> {
        insert_application(&mut self.tables.write(), doc.clone());
        Ok(())
    }

    fn query_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<DocumentApplication>, StoreError> {
        let tables = self.tables.read();
        let mut hits: Vec<&StoredApplication> = tables
            .applications
            .values()
            .filter(|s| filter.matches(&s.doc))
            .collect();
        hits.sort_by(|a, b| {
            let ord = (a.doc.created_at, a.seq).cmp(&(b.doc.created_at, b.seq));
            match filter.order {
                CreationOrder::Ascending => ord,
                CreationOrder::Descending => ord.reverse(),
            }
        });
        let limit = filter.limit.unwrap_or(usize::MAX);
        Ok(hits.into_iter().take(limit).map(|s| s.doc.clone()).collect())
    }

    fn document_type(&self, id: &DocumentTypeId) -> Result<Option<DocumentType>, StoreError> {
        Ok(self.tables.read().document_types.get(id).cloned())
    }

    fn put_document_type(&self, record: &DocumentType) -> Result<(), StoreError> {
        self.tables
            .write()
            .document_types
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn category(&self, id: &CategoryId) -> Result<Option<DocumentCategory>, StoreError> {
        Ok(self.tables.read().categories.get(id).cloned())
    }

    fn put_category(&self, record: &DocumentCategory) -> Result<(), StoreError> {
        self.tables
            .write()
            .categories
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn applicant(&self, id: &ApplicantId) -> Result<Option<Applicant>, StoreError> {
        Ok(self.tables.read().applicants.get(id).cloned())
    }

    fn put_applicant(&self, record: &Applicant) -> Result<(), StoreError> {
        self.tables
            .write()
            .applicants
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn employee(&self, id: &EmployeeId) -> Result<Option<Employee>, StoreError> {
        Ok(self.tables.read().employees.get(id).cloned())
    }

    fn put_employee(&self, record: &Employee) -> Result<(), StoreError> {
        self.tables
            .write()
            .employees
            .insert(record.id.clone(), record.clone());
        Ok(())
    }
}
