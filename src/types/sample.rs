//! types/sample.rs
//!
//! A single telemetry sample as served by the external heart rate feed, plus
//! the rule that decides which of its clocks a capture run trusts.

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use super::clinic_time::ClinicOffset;

/// Identifier assigned by an external system (feed or record store).
///
/// Upstream systems hand out either numeric or string ids, and neither is
/// guaranteed to be ordered across devices.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExternalId {
    Number(u64),
    Text(String),
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExternalId::Number(n) => write!(f, "{}", n),
            ExternalId::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for ExternalId {
    fn from(value: u64) -> Self {
        ExternalId::Number(value)
    }
}

impl From<&str> for ExternalId {
    fn from(value: &str) -> Self {
        ExternalId::Text(value.to_string())
    }
}

impl From<String> for ExternalId {
    fn from(value: String) -> Self {
        ExternalId::Text(value)
    }
}

/// Which field a sample's effective timestamp was taken from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimestampSource {
    /// Already normalized to the clinic offset
    Local,

    /// Source clock on the device
    Recorded,

    /// Clock of the feed when it received the sample
    Sync,

    /// None of the above were present; the poll time stands in
    PollTime,
}

/// Heart rate telemetry unit. Immutable once received.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ExternalId>,

    #[serde(default)]
    pub device_id: String,

    #[serde(deserialize_with = "deserialize_bpm")]
    pub avg_heart_rate: u32,

    #[serde(deserialize_with = "deserialize_bpm")]
    pub min_heart_rate: u32,

    #[serde(deserialize_with = "deserialize_bpm")]
    pub max_heart_rate: u32,

    /// Epoch ms, device clock
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<i64>,

    /// Epoch ms, feed-received clock
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_timestamp: Option<i64>,

    /// Epoch ms shifted to the clinic offset. Stamped at finalization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_timestamp: Option<i64>,
}

/// Identity of a sample at a given effective timestamp.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SampleKey {
    pub device_id: String,
    pub id: Option<ExternalId>,
    pub timestamp: i64,
}

impl Sample {
    /// Resolve the effective timestamp.
    ///
    /// Lookup order is `localTimestamp`, `recordedAt`, `syncTimestamp`, and
    /// finally the time of the poll that observed the sample. Zero or negative
    /// values count as absent, matching feeds that zero-fill missing clocks.
    pub fn resolve_timestamp(&self, poll_time_ms: i64) -> (i64, TimestampSource) {
        let chain = [
            (self.local_timestamp, TimestampSource::Local),
            (self.recorded_at, TimestampSource::Recorded),
            (self.sync_timestamp, TimestampSource::Sync),
        ];

        chain
            .into_iter()
            .find_map(|(value, source)| value.filter(|ms| *ms > 0).map(|ms| (ms, source)))
            .unwrap_or((poll_time_ms, TimestampSource::PollTime))
    }

    /// Effective timestamp alone
    pub fn effective_timestamp(&self, poll_time_ms: i64) -> i64 {
        self.resolve_timestamp(poll_time_ms).0
    }

    pub fn key(&self, timestamp: i64) -> SampleKey {
        SampleKey {
            device_id: self.device_id.clone(),
            id: self.id.clone(),
            timestamp,
        }
    }

    /// Same device and same feed id. Without an id the whole reading has to
    /// match, since nothing else tells two polls' copies apart.
    pub fn same_identity(&self, other: &Sample) -> bool {
        match self.id {
            Some(_) => self.id == other.id && self.device_id == other.device_id,
            None => self == other,
        }
    }

    /// Copy of this sample carrying a clinic-local timestamp derived from
    /// `effective_ms`. A sample that already has one keeps it.
    pub fn with_local_timestamp(&self, effective_ms: i64, offset: ClinicOffset) -> Sample {
        let mut stamped = self.clone();
        if stamped.local_timestamp.filter(|ms| *ms > 0).is_none() {
            stamped.local_timestamp = Some(offset.normalize(effective_ms));
        }
        stamped
    }
}

/// Heart rates arrive as JSON numbers that are not always integral.
fn deserialize_bpm<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() || value < 0.0 || value > u32::MAX as f64 {
        return Err(D::Error::custom(format!("invalid heart rate: {}", value)));
    }
    Ok(value.round() as u32)
}
