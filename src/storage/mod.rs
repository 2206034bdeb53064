//! Storage of finalized monitoring records
//!
//! The record store is an external collaborator reached through request and
//! response calls. This module defines the seam and ships three providers:
//! the REST store used in production, a local file store, and an in-memory
//! store for demos and tests.

pub mod http;
pub mod local;
pub mod memory;

use async_trait::async_trait;
use futures_util::future::try_join_all;
use thiserror::Error;

use crate::types::{MonitoringRecord, RecordId};

pub use http::HttpRecordStore;
pub use local::LocalRecordStore;
pub use memory::InMemoryRecordStore;

/// Error types for storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Record not found: {0}")]
    NotFound(RecordId),

    #[error("Record has no identifier")]
    MissingId,

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Store rejected request with status {0}")]
    Rejected(u16),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::SerializationError(e.to_string())
    }
}

/// Trait for record stores
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist a finalized record and return the stored form
    async fn submit(&self, record: &MonitoringRecord) -> Result<MonitoringRecord, StorageError>;

    /// All records belonging to a clinical session, in store order
    async fn records_for_session(&self, session_id: &str)
        -> Result<Vec<MonitoringRecord>, StorageError>;

    /// Delete one record by its identifier
    async fn delete_record(&self, id: &RecordId) -> Result<(), StorageError>;

    /// Delete every record of a session and return how many were removed.
    ///
    /// Must complete before the session itself is removed.
    async fn delete_records_for_session(&self, session_id: &str) -> Result<usize, StorageError> {
        let records = self.records_for_session(session_id).await?;
        let ids = records
            .into_iter()
            .map(|record| record.id.ok_or(StorageError::MissingId))
            .collect::<Result<Vec<_>, _>>()?;

        try_join_all(ids.iter().map(|id| self.delete_record(id))).await?;

        log::info!("Deleted {} monitoring records for session {}", ids.len(), session_id);
        Ok(ids.len())
    }
}
