//! Local file system record store
//!
//! Records are written as pretty JSON, one file per record, grouped in a
//! directory per session: `{base_dir}/{session}/{uuid}.json`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs as tokio_fs;
use uuid::Uuid;

use super::{RecordStore, StorageError};
use crate::types::{MonitoringRecord, RecordId};

/// A record store that uses the local file system
pub struct LocalRecordStore {
    /// Base directory for storage
    base_dir: PathBuf,
}

impl LocalRecordStore {
    /// Create a new local store, creating the base directory if needed
    pub async fn new(base_dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let base_dir = base_dir.as_ref().to_path_buf();

        tokio_fs::create_dir_all(&base_dir).await?;

        Ok(Self { base_dir })
    }

    /// Directory holding one session's records
    fn session_dir(&self, session_id: &str) -> PathBuf {
        let safe: String = session_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_dir.join(safe)
    }

    async fn read_record(path: &Path) -> Result<MonitoringRecord, StorageError> {
        let data = tokio_fs::read(path).await?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Find the file of a record by scanning the session directories
    async fn find_record_file(&self, id: &RecordId) -> Result<Option<PathBuf>, StorageError> {
        let file_name = format!("{}.json", id);

        let mut sessions = tokio_fs::read_dir(&self.base_dir).await?;
        while let Some(entry) = sessions.next_entry().await? {
            let candidate = entry.path().join(&file_name);
            // Stray files in the base dir fail here and are skipped
            let is_file = tokio_fs::metadata(&candidate)
                .await
                .map(|meta| meta.is_file())
                .unwrap_or(false);
            if is_file {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl RecordStore for LocalRecordStore {
    async fn submit(&self, record: &MonitoringRecord) -> Result<MonitoringRecord, StorageError> {
        let mut stored = record.clone();
        let id = stored
            .id
            .get_or_insert_with(|| RecordId::Text(Uuid::new_v4().to_string()))
            .clone();

        let dir = self.session_dir(&stored.session_id);
        tokio_fs::create_dir_all(&dir).await?;

        let json = serde_json::to_vec_pretty(&stored)?;
        tokio_fs::write(dir.join(format!("{}.json", id)), json).await?;

        log::debug!("[LocalStore] Saved record {} for session {}", id, stored.session_id);
        Ok(stored)
    }

    async fn records_for_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<MonitoringRecord>, StorageError> {
        let dir = self.session_dir(session_id);
        let mut records = Vec::new();

        if !tokio_fs::try_exists(&dir).await? {
            return Ok(records);
        }

        let mut entries = tokio_fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }

            let record = Self::read_record(&path).await?;
            // Sanitized directory names may collide
            if record.session_id == session_id {
                records.push(record);
            }
        }

        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }

    async fn delete_record(&self, id: &RecordId) -> Result<(), StorageError> {
        let path = self
            .find_record_file(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(id.clone()))?;

        tokio_fs::remove_file(&path).await?;

        // Try to clean up empty directory
        if let Some(parent) = path.parent() {
            if let Ok(mut entries) = tokio_fs::read_dir(parent).await {
                if let Ok(None) = entries.next_entry().await {
                    tokio_fs::remove_dir(parent).await.ok();
                }
            }
        }

        Ok(())
    }
}
