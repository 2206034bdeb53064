//! Session analytics
//!
//! Reports are recomputed from the stored records on every request and never
//! persisted. [`build_report`] is pure: the same records and `as_of` always
//! give the same report.

pub mod health;
pub mod time_of_day;
pub mod trend;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::capture::rounded_mean;
use crate::format::format_report_duration;
use crate::storage::{RecordStore, StorageError};
use crate::types::MonitoringRecord;

pub use health::HealthStatus;
pub use time_of_day::{BucketSummary, TimeOfDay, TimeOfDayBreakdown};
pub use trend::Trend;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Failed to fetch monitoring records: {0}")]
    FetchFailed(#[from] StorageError),
}

/// Aggregate view over every record of one session
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAnalyticsReport {
    pub session_id: String,
    pub total_monitoring_sessions: usize,
    /// Sum of record durations, in seconds
    pub total_duration: u64,
    /// Sum of samples over all records
    pub total_records: usize,
    pub avg_heart_rate_overall: u32,
    pub min_heart_rate_overall: u32,
    pub max_heart_rate_overall: u32,
    pub most_recent_monitoring: Option<MonitoringRecord>,
    pub longest_session: Option<MonitoringRecord>,
    pub health_status: HealthStatus,
    pub trend: Trend,
    pub sessions_this_week: usize,
    pub time_of_day: TimeOfDayBreakdown,
}

impl SessionAnalyticsReport {
    pub fn empty(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            total_monitoring_sessions: 0,
            total_duration: 0,
            total_records: 0,
            avg_heart_rate_overall: 0,
            min_heart_rate_overall: 0,
            max_heart_rate_overall: 0,
            most_recent_monitoring: None,
            longest_session: None,
            health_status: HealthStatus::Normal,
            trend: Trend::Stable,
            sessions_this_week: 0,
            time_of_day: TimeOfDayBreakdown::default(),
        }
    }

    pub fn total_duration_display(&self) -> String {
        format_report_duration(self.total_duration)
    }
}

/// Build a report from records ordered most recent first.
///
/// `week_window` is the trailing span before `as_of` counted by
/// `sessions_this_week`.
pub fn build_report(
    session_id: &str,
    records: &[MonitoringRecord],
    as_of: DateTime<Utc>,
    week_window: Duration,
) -> SessionAnalyticsReport {
    let Some(most_recent) = records.first() else {
        return SessionAnalyticsReport::empty(session_id);
    };

    // First record wins ties
    let mut longest = most_recent;
    for record in records {
        if record.duration_seconds > longest.duration_seconds {
            longest = record;
        }
    }

    let avg_overall = rounded_mean(records.iter().map(|r| r.avg_heart_rate)).unwrap_or(0);
    let averages: Vec<u32> = records.iter().map(|r| r.avg_heart_rate).collect();
    let week_start = as_of
        .checked_sub_signed(week_window)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    SessionAnalyticsReport {
        session_id: session_id.to_string(),
        total_monitoring_sessions: records.len(),
        total_duration: records.iter().map(|r| r.duration_seconds).sum(),
        total_records: records.iter().map(|r| r.total_samples).sum(),
        avg_heart_rate_overall: avg_overall,
        min_heart_rate_overall: records.iter().map(|r| r.min_heart_rate).min().unwrap_or(0),
        max_heart_rate_overall: records.iter().map(|r| r.max_heart_rate).max().unwrap_or(0),
        most_recent_monitoring: Some(most_recent.clone()),
        longest_session: Some(longest.clone()),
        health_status: HealthStatus::classify(avg_overall),
        trend: Trend::from_recent(&averages),
        sessions_this_week: records.iter().filter(|r| r.created_at > week_start).count(),
        time_of_day: TimeOfDayBreakdown::from_records(records),
    }
}

/// Loads a session's records and reports on them
pub struct SessionAnalytics {
    store: Arc<dyn RecordStore>,
    week_window: Duration,
}

impl SessionAnalytics {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            week_window: Duration::days(7),
        }
    }

    pub fn with_week_window(mut self, week_window: Duration) -> Self {
        self.week_window = week_window;
        self
    }

    pub async fn report_for_session(
        &self,
        session_id: &str,
        as_of: DateTime<Utc>,
    ) -> Result<SessionAnalyticsReport, AnalyticsError> {
        let mut records = self.store.records_for_session(session_id).await?;
        // Stable, so equal timestamps keep store order
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        log::debug!(
            "Building report for session {} from {} records",
            session_id,
            records.len()
        );
        Ok(build_report(session_id, &records, as_of, self.week_window))
    }
}
