//! Live capture of heart rate telemetry
//!
//! A [`CaptureController`] is a cheap handle onto a single actor task that
//! owns the run: it polls the feed on a fixed interval, admits only samples
//! produced during the run, and turns the buffer into a [`MonitoringRecord`]
//! on stop.

mod actor;
pub mod buffer;
pub mod stats;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::config::MonitorConfig;
use crate::feed::{FeedError, TelemetryFeed};
use crate::format::HeartRateZone;
use crate::storage::{RecordStore, StorageError};
use crate::types::{ClinicOffset, Clock, MonitoringRecord, Sample, SystemClock};

use actor::{CaptureActor, Command};

pub use buffer::{PollSummary, SampleBuffer};
pub use stats::{rounded_mean, VitalStats};

/// Errors surfaced by a capture run
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Telemetry feed unavailable: {0}")]
    FeedUnavailable(#[from] FeedError),

    #[error("No samples captured for session {session_id}")]
    EmptyCapture { session_id: String },

    /// The record was computed but not stored. It is carried here so the
    /// caller can submit it again.
    #[error("Failed to submit monitoring record for session {}: {source}", .record.session_id)]
    SubmissionFailed {
        record: Box<MonitoringRecord>,
        #[source]
        source: StorageError,
    },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Capture controller has shut down")]
    ControllerClosed,
}

impl CaptureError {
    /// The finalized record of a failed submission
    pub fn unsubmitted_record(&self) -> Option<&MonitoringRecord> {
        match self {
            CaptureError::SubmissionFailed { record, .. } => Some(record),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureState {
    Idle,
    Running,
}

/// Point-in-time view of a controller
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureStatus {
    pub state: CaptureState,
    pub session_id: Option<String>,
    pub patient_id: Option<String>,
    pub start_time: Option<i64>,
    pub start_time_local: Option<i64>,
    pub elapsed_seconds: u64,
    pub samples_retained: usize,
    pub watermark: Option<i64>,
    pub late_samples_dropped: usize,
    pub polls_completed: u64,
    pub polls_failed: u64,
    pub last_error: Option<String>,
    pub latest_sample: Option<Sample>,
    pub latest_zone: Option<HeartRateZone>,
}

impl CaptureStatus {
    pub fn idle() -> Self {
        Self {
            state: CaptureState::Idle,
            session_id: None,
            patient_id: None,
            start_time: None,
            start_time_local: None,
            elapsed_seconds: 0,
            samples_retained: 0,
            watermark: None,
            late_samples_dropped: 0,
            polls_completed: 0,
            polls_failed: 0,
            last_error: None,
            latest_sample: None,
            latest_zone: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == CaptureState::Running
    }
}

/// Settings for a capture controller
#[derive(Clone)]
pub struct CaptureOptions {
    pub poll_interval: Duration,
    pub offset: ClinicOffset,
    pub clock: Arc<dyn Clock>,
    pub command_buffer: usize,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(6),
            offset: ClinicOffset::default(),
            clock: Arc::new(SystemClock),
            command_buffer: 32,
        }
    }
}

impl CaptureOptions {
    pub fn from_config(config: &MonitorConfig) -> Result<Self, crate::config::ConfigError> {
        Ok(Self {
            poll_interval: config.poll_interval(),
            offset: config.clinic_offset()?,
            clock: Arc::new(SystemClock),
            command_buffer: config.command_buffer.max(1),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// Handle to a capture actor. Clones share the same run.
///
/// The actor shuts down once every handle has been dropped.
#[derive(Clone)]
pub struct CaptureController {
    commands: mpsc::Sender<Command>,
}

impl CaptureController {
    /// Spawn the actor onto the current tokio runtime
    pub fn spawn(
        feed: Arc<dyn TelemetryFeed>,
        store: Arc<dyn RecordStore>,
        options: CaptureOptions,
    ) -> Self {
        let (tx, rx) = mpsc::channel(options.command_buffer.max(1));
        let actor = CaptureActor::new(
            feed,
            store,
            options.clock,
            options.offset,
            options.poll_interval,
            rx,
        );
        tokio::spawn(actor.run());

        Self { commands: tx }
    }

    /// Begin a run. Fails with `InvalidState` if one is already in progress.
    pub async fn start(
        &self,
        session_id: impl Into<String>,
        patient_id: impl Into<String>,
    ) -> Result<CaptureStatus, CaptureError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Start {
            session_id: session_id.into(),
            patient_id: patient_id.into(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| CaptureError::ControllerClosed)?
    }

    /// End the run and submit its record.
    ///
    /// The controller is idle again afterwards whatever the outcome.
    pub async fn stop(&self) -> Result<MonitoringRecord, CaptureError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Stop { reply }).await?;
        rx.await.map_err(|_| CaptureError::ControllerClosed)?
    }

    /// Abandon the run without finalizing it. Nothing is submitted; returns
    /// the number of samples discarded.
    pub async fn cancel(&self) -> Result<usize, CaptureError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Cancel { reply }).await?;
        rx.await.map_err(|_| CaptureError::ControllerClosed)?
    }

    pub async fn status(&self) -> Result<CaptureStatus, CaptureError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Status { reply }).await?;
        rx.await.map_err(|_| CaptureError::ControllerClosed)
    }

    async fn send(&self, command: Command) -> Result<(), CaptureError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| CaptureError::ControllerClosed)
    }
}
