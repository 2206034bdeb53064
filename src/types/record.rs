//! types/record.rs
//!
//! A finalized monitoring run as persisted by the record store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::sample::{ExternalId, Sample};

/// Store-assigned record identifier
pub type RecordId = ExternalId;

/// One finalized capture run.
///
/// Produced only by the capture controller on stop and immutable afterwards.
/// Field aliases accept the legacy wire names (`duration`, `totalRecords`,
/// `records`) still served by older stores.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringRecord {
    /// Filled in by the store on submission
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,

    pub session_id: String,
    pub patient_id: String,

    /// UTC epoch ms
    pub start_time: i64,
    pub end_time: i64,

    /// Clinic-local epoch ms
    pub start_time_local: i64,
    pub end_time_local: i64,

    #[serde(alias = "duration")]
    pub duration_seconds: u64,

    #[serde(alias = "totalRecords")]
    pub total_samples: usize,

    #[serde(default)]
    pub avg_heart_rate: u32,
    #[serde(default)]
    pub min_heart_rate: u32,
    #[serde(default)]
    pub max_heart_rate: u32,

    /// Distinct samples that reached the feed after the watermark had passed them
    #[serde(default)]
    pub late_samples_dropped: usize,

    /// Most recent first. Stores may omit the detail on read.
    #[serde(default, alias = "records")]
    pub samples: Vec<Sample>,

    pub created_at: DateTime<Utc>,
}

impl MonitoringRecord {
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}
