pub mod backup;
pub mod document;

use std::path::Path;

use thiserror::Error;

pub use backup::{BackupArtifact, BackupManager};
pub use document::{DocumentRecord, DocumentStore};

/// Failures of the document store and its backup manager. The first group
/// are expected, recoverable conditions; `Io`/`Json` wrap the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record '{id}' not found in collection '{collection}'")]
    RecordNotFound { collection: String, id: String },
    #[error("a record with id '{id}' already exists in collection '{collection}'")]
    DuplicateId { collection: String, id: String },
    #[error("record id '{actual}' does not match requested id '{expected}'")]
    IdMismatch { expected: String, actual: String },
    #[error("record id must not be empty")]
    MissingId,
    #[error("collection '{collection}' has no data file")]
    CollectionNotFound { collection: String },
    #[error("no backup found for collection '{collection}'")]
    NoBackup { collection: String },
    #[error("collection name '{name}' is empty after sanitization")]
    InvalidCollection { name: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Write a file through a temp-file-and-rename so readers only ever observe
/// the old content or the complete new content.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await
}
