//! Dataset file access.
//!
//! The CLI keeps all records in one YAML file. Commands that only read use
//! [`load_store`]; commands that write go through [`FileStore`], which
//! persists the whole dataset on every write before the write counts as
//! done. Writes go to a sibling temporary file that is then renamed over
//! the original, so a failed write never leaves a truncated dataset.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use parking_lot::Mutex;

use doctrack_core::{ApplicantId, ApplicationId, CategoryId, DocumentTypeId, EmployeeId, StoreError};
use doctrack_engine::{ApplicationFilter, Dataset, DocumentStore, InMemoryStore};
use doctrack_state::{Applicant, DocumentApplication, DocumentCategory, DocumentType, Employee};

/// Load the dataset at `path`. A missing file yields an empty store.
pub fn load_store(path: &Path) -> Result<InMemoryStore> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "dataset file not found; starting empty");
        return Ok(InMemoryStore::new());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read dataset: {}", path.display()))?;
    let dataset = Dataset::from_yaml_str(&raw)
        .with_context(|| format!("invalid dataset in {}", path.display()))?;
    tracing::debug!(
        path = %path.display(),
        applications = dataset.applications.len(),
        document_types = dataset.document_types.len(),
        "dataset loaded"
    );
    Ok(InMemoryStore::from_dataset(dataset))
}

/// Read a single YAML (or JSON) value from `path`.
pub fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("invalid YAML in {}", path.display()))
}

fn write_dataset(path: &Path, dataset: &Dataset) -> Result<(), StoreError> {
    let yaml = dataset.to_yaml_string()?;
    let tmp = temp_path(path);
    std::fs::write(&tmp, yaml).map_err(|e| {
        StoreError::Backend(format!("failed to write dataset {}: {e}", tmp.display()))
    })?;
    std::fs::rename(&tmp, path).map_err(|e| {
        StoreError::Backend(format!("failed to replace dataset {}: {e}", path.display()))
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

// ─── Write-through store ─────────────────────────────────────────────

/// [`DocumentStore`] over the dataset file.
///
/// Each write is applied to a staged copy of the records, the staged
/// dataset is written to disk, and only then is the write applied to the
/// records served to readers. When the disk write fails the call returns
/// [`StoreError::Backend`] and neither the file nor the records change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    records: InMemoryStore,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open the dataset at `path`. A missing file is created on first write.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            records: load_store(path)?,
            write_lock: Mutex::new(()),
        })
    }

    /// Snapshot every record.
    pub fn to_dataset(&self) -> Dataset {
        self.records.to_dataset()
    }

    fn commit<F>(&self, apply: F) -> Result<(), StoreError>
    where
        F: Fn(&InMemoryStore) -> Result<(), StoreError>,
    {
        let _guard = self.write_lock.lock();
        let staged = InMemoryStore::from_dataset(self.records.to_dataset());
        apply(&staged)?;
        if let Err(e) = write_dataset(&self.path, &staged.to_dataset()) {
            tracing::error!(path = %self.path.display(), error = %e, "dataset write failed");
            return Err(e);
        }
        apply(&self.records)
    }
}

impl DocumentStore for FileStore {
    fn application(&self, id: &ApplicationId) -> Result<Option<DocumentApplication>, StoreError> {
        self.records.application(id)
    }

    fn put_application(&self, doc: &DocumentApplication) -> Result<(), StoreError> {
        self.commit(|store| store.put_application(doc))
    }

    fn query_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<DocumentApplication>, StoreError> {
        self.records.query_applications(filter)
    }

    fn document_type(&self, id: &DocumentTypeId) -> Result<Option<DocumentType>, StoreError> {
        self.records.document_type(id)
    }

    fn put_document_type(&self, record: &DocumentType) -> Result<(), StoreError> {
        self.commit(|store| store.put_document_type(record))
    }

    fn category(&self, id: &CategoryId) -> Result<Option<DocumentCategory>, StoreError> {
        self.records.category(id)
    }

    fn put_category(&self, record: &DocumentCategory) -> Result<(), StoreError> {
        self.commit(|store| store.put_category(record))
    }

    fn applicant(&self, id: &ApplicantId) -> Result<Option<Applicant>, StoreError> {
        self.records.applicant(id)
    }

    fn put_applicant(&self, record: &Applicant) -> Result<(), StoreError> {
        self.commit(|store| store.put_applicant(record))
    }

    fn employee(&self, id: &EmployeeId) -> Result<Option<Employee>, StoreError> {
        self.records.employee(id)
    }

    fn put_employee(&self, record: &Employee) -> Result<(), StoreError> {
        self.commit(|store| store.put_employee(record))
    }
}
