//! In-memory record store

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{RecordStore, StorageError};
use crate::types::{MonitoringRecord, RecordId};

/// Keeps records in process memory and numbers them sequentially
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<Vec<MonitoringRecord>>,
    next_id: AtomicU64,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with already-persisted records
    pub fn with_records(records: Vec<MonitoringRecord>) -> Self {
        let highest = records
            .iter()
            .filter_map(|r| match r.id {
                Some(RecordId::Number(n)) => Some(n),
                _ => None,
            })
            .max()
            .unwrap_or(0);

        Self {
            records: RwLock::new(records),
            next_id: AtomicU64::new(highest),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn submit(&self, record: &MonitoringRecord) -> Result<MonitoringRecord, StorageError> {
        let mut stored = record.clone();
        if stored.id.is_none() {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            stored.id = Some(RecordId::Number(id));
        }

        self.records.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn records_for_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<MonitoringRecord>, StorageError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn delete_record(&self, id: &RecordId) -> Result<(), StorageError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.id.as_ref() != Some(id));

        if records.len() == before {
            return Err(StorageError::NotFound(id.clone()));
        }
        Ok(())
    }
}
