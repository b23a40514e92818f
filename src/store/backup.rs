use std::path::PathBuf;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use super::{write_atomic, StoreError};

/// An immutable snapshot of a collection's full content at one instant.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BackupArtifact {
    pub collection: String,
    pub timestamp: String,
    pub path: PathBuf,
}

/// Owns the backup artifacts for every collection: snapshots in, restore
/// content out. Nothing else reads or writes the backup directory.
pub struct BackupManager {
    backup_dir: PathBuf,
}

impl BackupManager {
    pub fn new(backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            backup_dir: backup_dir.into(),
        }
    }

    /// Snapshot `content` under a fresh timestamped artifact name.
    pub async fn snapshot(
        &self,
        collection: &str,
        content: &[u8],
    ) -> Result<BackupArtifact, StoreError> {
        self.snapshot_at(collection, content, Utc::now()).await
    }

    pub(crate) async fn snapshot_at(
        &self,
        collection: &str,
        content: &[u8],
        now: DateTime<Utc>,
    ) -> Result<BackupArtifact, StoreError> {
        tokio::fs::create_dir_all(&self.backup_dir).await?;
        let timestamp = timestamp_slug(now);
        let path = self.backup_dir.join(artifact_name(collection, &timestamp));
        write_atomic(&path, content).await?;
        log::info!("backed up collection {} to {}", collection, path.display());
        Ok(BackupArtifact {
            collection: collection.to_string(),
            timestamp,
            path,
        })
    }

    /// Content of the most recent backup for `collection`; artifact names
    /// embed the timestamp, so the lexicographically greatest name is the
    /// newest snapshot.
    pub async fn latest_content(&self, collection: &str) -> Result<Vec<u8>, StoreError> {
        match self.latest_artifact(collection).await? {
            Some(path) => Ok(tokio::fs::read(&path).await?),
            None => Err(StoreError::NoBackup {
                collection: collection.to_string(),
            }),
        }
    }

    pub async fn latest_artifact(&self, collection: &str) -> Result<Option<PathBuf>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.backup_dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let prefix = format!("{}_", collection);
        let mut best: Option<String> = None;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(&prefix) || !name.ends_with(".json") {
                continue;
            }
            if best.as_deref().map_or(true, |current| name.as_str() > current) {
                best = Some(name);
            }
        }

        Ok(best.map(|name| self.backup_dir.join(name)))
    }
}

/// `<collection>_<timestamp>.json`, with the stamp's `:` and `.` replaced by
/// `-` so the name stays filesystem-safe on every platform.
fn artifact_name(collection: &str, timestamp: &str) -> String {
    format!("{}_{}.json", collection, timestamp)
}

fn timestamp_slug(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Secs, true)
        .replace([':', '.'], "-")
}
