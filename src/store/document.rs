use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::{write_atomic, BackupArtifact, BackupManager, StoreError};
use crate::security::validation::sanitize_collection_name;

/// One schemaless record: a caller-chosen id plus an ordered field map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentRecord {
    pub id: String,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl DocumentRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: serde_json::Map::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }
}

/// Named JSON-document collections, one file per collection, independent of
/// the relational connection.
///
/// Every mutation is a whole-file read-modify-write; writers on the same
/// collection are serialized through a per-collection lock so interleaved
/// mutations cannot lose updates, and files land via atomic rename. Reads
/// take no lock.
pub struct DocumentStore {
    data_dir: PathBuf,
    backups: BackupManager,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl DocumentStore {
    pub fn new(data_dir: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            backups: BackupManager::new(backup_dir),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// All records of a collection. A collection that was never written is
    /// an empty sequence, not an error.
    pub async fn list(&self, collection: &str) -> Result<Vec<DocumentRecord>, StoreError> {
        let (_, path) = self.collection_path(collection)?;
        self.read_collection(&path).await
    }

    /// One record by id.
    pub async fn get(&self, collection: &str, id: &str) -> Result<DocumentRecord, StoreError> {
        let (_, path) = self.collection_path(collection)?;
        let records = self.read_collection(&path).await?;
        records
            .into_iter()
            .find(|record| record.id == id)
            .ok_or_else(|| StoreError::RecordNotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })
    }

    /// Append a record; its id must be new within the collection.
    pub async fn create(
        &self,
        collection: &str,
        record: DocumentRecord,
    ) -> Result<DocumentRecord, StoreError> {
        if record.id.is_empty() {
            return Err(StoreError::MissingId);
        }
        let (safe, path) = self.collection_path(collection)?;
        let lock = self.collection_lock(&safe).await;
        let _guard = lock.lock().await;

        let mut records = self.read_collection(&path).await?;
        if records.iter().any(|existing| existing.id == record.id) {
            return Err(StoreError::DuplicateId {
                collection: collection.to_string(),
                id: record.id,
            });
        }
        records.push(record.clone());
        self.write_collection(&path, &records).await?;
        Ok(record)
    }

    /// Replace the record at `id`. The replacement must carry the same id.
    pub async fn update(
        &self,
        collection: &str,
        id: &str,
        record: DocumentRecord,
    ) -> Result<DocumentRecord, StoreError> {
        if record.id != id {
            return Err(StoreError::IdMismatch {
                expected: id.to_string(),
                actual: record.id,
            });
        }
        let (safe, path) = self.collection_path(collection)?;
        let lock = self.collection_lock(&safe).await;
        let _guard = lock.lock().await;

        let mut records = self.read_collection(&path).await?;
        match records.iter_mut().find(|existing| existing.id == id) {
            Some(existing) => *existing = record.clone(),
            None => {
                return Err(StoreError::RecordNotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                })
            }
        }
        self.write_collection(&path, &records).await?;
        Ok(record)
    }

    /// Remove the record at `id`.
    pub async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let (safe, path) = self.collection_path(collection)?;
        let lock = self.collection_lock(&safe).await;
        let _guard = lock.lock().await;

        let mut records = self.read_collection(&path).await?;
        let before = records.len();
        records.retain(|record| record.id != id);
        if records.len() == before {
            return Err(StoreError::RecordNotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        self.write_collection(&path, &records).await?;
        Ok(())
    }

    /// Replace the whole collection with `records`, returning how many were
    /// written. When the collection already exists its current content is
    /// snapshotted first, so the state before the import stays recoverable
    /// through [`DocumentStore::restore`].
    pub async fn import_all(
        &self,
        collection: &str,
        records: Vec<DocumentRecord>,
    ) -> Result<usize, StoreError> {
        let (safe, path) = self.collection_path(collection)?;
        let lock = self.collection_lock(&safe).await;
        let _guard = lock.lock().await;

        match tokio::fs::read(&path).await {
            Ok(current) => {
                self.backups.snapshot(&safe, &current).await?;
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        self.write_collection(&path, &records).await?;
        log::info!(
            "imported {} records into collection {}",
            records.len(),
            safe
        );
        Ok(records.len())
    }

    /// Snapshot the collection's current content into a new timestamped
    /// artifact.
    pub async fn backup(&self, collection: &str) -> Result<BackupArtifact, StoreError> {
        let (safe, path) = self.collection_path(collection)?;
        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StoreError::CollectionNotFound {
                    collection: collection.to_string(),
                })
            }
            Err(err) => return Err(err.into()),
        };
        self.backups.snapshot(&safe, &content).await
    }

    /// Overwrite the live collection with its most recent backup in full.
    pub async fn restore(&self, collection: &str) -> Result<(), StoreError> {
        let (safe, path) = self.collection_path(collection)?;
        let lock = self.collection_lock(&safe).await;
        let _guard = lock.lock().await;

        let content = self.backups.latest_content(&safe).await?;
        tokio::fs::create_dir_all(&self.data_dir).await?;
        write_atomic(&path, &content).await?;
        log::info!("restored collection {} from latest backup", safe);
        Ok(())
    }

    fn collection_path(&self, collection: &str) -> Result<(String, PathBuf), StoreError> {
        let safe = sanitize_collection_name(collection);
        if safe.is_empty() {
            return Err(StoreError::InvalidCollection {
                name: collection.to_string(),
            });
        }
        let path = self.data_dir.join(format!("{}.json", safe));
        Ok((safe, path))
    }

    async fn collection_lock(&self, safe: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(safe.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn read_collection(&self, path: &Path) -> Result<Vec<DocumentRecord>, StoreError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn write_collection(
        &self,
        path: &Path,
        records: &[DocumentRecord],
    ) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        let bytes = serde_json::to_vec_pretty(records)?;
        write_atomic(path, &bytes).await?;
        Ok(())
    }
}
