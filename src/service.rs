//! Command surface over capture and analytics
//!
//! One capture controller is kept per live session id, so two sessions can
//! run side by side while a second start of the same session fails fast.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::analytics::{AnalyticsError, SessionAnalytics, SessionAnalyticsReport};
use crate::capture::{CaptureController, CaptureError, CaptureOptions, CaptureStatus};
use crate::config::{ConfigError, MonitorConfig};
use crate::feed::{FeedError, HttpTelemetryFeed, TelemetryFeed};
use crate::storage::{HttpRecordStore, LocalRecordStore, RecordStore, StorageError};
use crate::types::MonitoringRecord;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Analytics(#[from] AnalyticsError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Session {0} has a capture in progress")]
    SessionBusy(String),
}

pub struct MonitoringService {
    feed: Arc<dyn TelemetryFeed>,
    store: Arc<dyn RecordStore>,
    options: CaptureOptions,
    analytics: SessionAnalytics,
    live: Mutex<HashMap<String, CaptureController>>,
}

impl MonitoringService {
    pub fn new(
        feed: Arc<dyn TelemetryFeed>,
        store: Arc<dyn RecordStore>,
        options: CaptureOptions,
        week_window: Duration,
    ) -> Self {
        let analytics = SessionAnalytics::new(Arc::clone(&store)).with_week_window(week_window);
        Self {
            feed,
            store,
            options,
            analytics,
            live: Mutex::new(HashMap::new()),
        }
    }

    /// Wire up the HTTP feed and whichever store the config names
    pub async fn from_config(config: &MonitorConfig) -> Result<Self, ServiceError> {
        config.validate()?;

        let feed = Arc::new(HttpTelemetryFeed::new(
            config.feed_url.clone(),
            config.request_timeout(),
        )?);

        let store: Arc<dyn RecordStore> = match &config.store_url {
            Some(url) => Arc::new(HttpRecordStore::new(url.clone(), config.request_timeout())?),
            None => Arc::new(LocalRecordStore::new(&config.store_dir).await?),
        };

        Ok(Self::new(
            feed,
            store,
            CaptureOptions::from_config(config)?,
            config.week_window(),
        ))
    }

    pub async fn start_session(
        &self,
        session_id: &str,
        patient_id: &str,
    ) -> Result<CaptureStatus, ServiceError> {
        let mut live = self.live.lock().await;
        if live.contains_key(session_id) {
            return Err(CaptureError::InvalidState(format!(
                "capture already running for session {}",
                session_id
            ))
            .into());
        }

        let controller = CaptureController::spawn(
            Arc::clone(&self.feed),
            Arc::clone(&self.store),
            self.options.clone(),
        );
        let status = controller.start(session_id, patient_id).await?;
        live.insert(session_id.to_string(), controller);

        Ok(status)
    }

    /// Stop a live session. The session is no longer live afterwards, even
    /// when the capture was empty or the record could not be submitted.
    pub async fn stop_session(&self, session_id: &str) -> Result<MonitoringRecord, ServiceError> {
        let controller = self.live.lock().await.remove(session_id).ok_or_else(|| {
            CaptureError::InvalidState(format!("no capture is running for session {}", session_id))
        })?;

        Ok(controller.stop().await?)
    }

    /// Abandon a live session without saving anything, as when the clinician
    /// leaves the monitoring view. The session's actor shuts down.
    pub async fn cancel_session(&self, session_id: &str) -> Result<usize, ServiceError> {
        let controller = self.live.lock().await.remove(session_id).ok_or_else(|| {
            CaptureError::InvalidState(format!("no capture is running for session {}", session_id))
        })?;

        Ok(controller.cancel().await?)
    }

    pub async fn status(&self, session_id: &str) -> Result<CaptureStatus, ServiceError> {
        let controller = self.live.lock().await.get(session_id).cloned();
        match controller {
            Some(controller) => Ok(controller.status().await?),
            None => Ok(CaptureStatus::idle()),
        }
    }

    pub async fn live_sessions(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.live.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Submit a record again after a failed stop, unchanged
    pub async fn retry_submission(
        &self,
        record: &MonitoringRecord,
    ) -> Result<MonitoringRecord, ServiceError> {
        log::info!("Retrying submission of record for session {}", record.session_id);
        Ok(self.store.submit(record).await?)
    }

    pub async fn get_report(
        &self,
        session_id: &str,
        as_of: DateTime<Utc>,
    ) -> Result<SessionAnalyticsReport, ServiceError> {
        Ok(self.analytics.report_for_session(session_id, as_of).await?)
    }

    /// Remove every record of a session. Must complete before the session
    /// itself is deleted. Refused while the session is live.
    pub async fn delete_session_records(&self, session_id: &str) -> Result<usize, ServiceError> {
        if self.live.lock().await.contains_key(session_id) {
            return Err(ServiceError::SessionBusy(session_id.to_string()));
        }

        Ok(self.store.delete_records_for_session(session_id).await?)
    }
}
