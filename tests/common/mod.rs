//! Shared test doubles for the integration tests
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::time::Instant;

use heartwatch::feed::{FeedError, TelemetryFeed};
use heartwatch::storage::{InMemoryRecordStore, RecordStore, StorageError};
use heartwatch::types::{Clock, ExternalId, MonitoringRecord, RecordId, Sample};

/// Wall clock that follows tokio's (possibly paused) time
pub struct VirtualClock {
    base: DateTime<Utc>,
    origin: Instant,
}

impl VirtualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            base: Utc.with_ymd_and_hms(2026, 3, 10, 14, 0, 0).unwrap(),
            origin: Instant::now(),
        })
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = Instant::now().duration_since(self.origin);
        self.base + Duration::from_std(elapsed).unwrap()
    }
}

enum Fault {
    Fail(FeedError),
    Hang,
}

/// Feed that returns its whole history on every read, like the real one.
/// Queued faults are served before the history.
#[derive(Default)]
pub struct ScriptedFeed {
    history: Mutex<Vec<Sample>>,
    faults: Mutex<VecDeque<Fault>>,
    fetches: AtomicUsize,
}

impl ScriptedFeed {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn publish(&self, sample: Sample) {
        self.history.lock().unwrap().push(sample);
    }

    pub fn fail_next(&self, error: FeedError) {
        self.faults.lock().unwrap().push_back(Fault::Fail(error));
    }

    /// The next read never completes
    pub fn hang_next(&self) {
        self.faults.lock().unwrap().push_back(Fault::Hang);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TelemetryFeed for ScriptedFeed {
    async fn fetch_snapshot(&self) -> Result<Vec<Sample>, FeedError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let fault = self.faults.lock().unwrap().pop_front();
        match fault {
            Some(Fault::Fail(error)) => Err(error),
            Some(Fault::Hang) => std::future::pending().await,
            None => Ok(self.history.lock().unwrap().clone()),
        }
    }
}

/// In-memory store whose submissions can be made to fail
#[derive(Default)]
pub struct FlakyStore {
    inner: InMemoryRecordStore,
    failing: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.inner.len().await
    }
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn submit(&self, record: &MonitoringRecord) -> Result<MonitoringRecord, StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Rejected(503));
        }
        self.inner.submit(record).await
    }

    async fn records_for_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<MonitoringRecord>, StorageError> {
        self.inner.records_for_session(session_id).await
    }

    async fn delete_record(&self, id: &RecordId) -> Result<(), StorageError> {
        self.inner.delete_record(id).await
    }
}

pub fn sample(id: u64, recorded_at: i64, avg: u32) -> Sample {
    Sample {
        id: Some(ExternalId::Number(id)),
        device_id: "band-7".into(),
        avg_heart_rate: avg,
        min_heart_rate: avg.saturating_sub(6),
        max_heart_rate: avg + 9,
        recorded_at: Some(recorded_at),
        sync_timestamp: Some(recorded_at + 250),
        local_timestamp: None,
    }
}
