//! The capture actor
//!
//! One task owns the run state. Commands and poll ticks are serialized
//! through it, so the buffer has a single writer and a stop can never race a
//! poll result into an already-finalized record.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior};

use super::buffer::SampleBuffer;
use super::stats::VitalStats;
use super::{CaptureError, CaptureState, CaptureStatus};
use crate::feed::{FeedError, TelemetryFeed};
use crate::format::{format_clock_duration, HeartRateZone};
use crate::storage::RecordStore;
use crate::types::{ClinicOffset, Clock, MonitoringRecord};

pub(crate) enum Command {
    Start {
        session_id: String,
        patient_id: String,
        reply: oneshot::Sender<Result<CaptureStatus, CaptureError>>,
    },
    Stop {
        reply: oneshot::Sender<Result<MonitoringRecord, CaptureError>>,
    },
    /// End the run without producing a record
    Cancel {
        reply: oneshot::Sender<Result<usize, CaptureError>>,
    },
    Status {
        reply: oneshot::Sender<CaptureStatus>,
    },
}

enum Event {
    Tick,
    Command(Option<Command>),
}

enum FetchEvent {
    Settled(Result<Vec<crate::types::Sample>, FeedError>),
    Command(Option<Command>),
}

/// State of the run in progress
struct ActiveRun {
    session_id: String,
    patient_id: String,
    start_time: DateTime<Utc>,
    start_time_local: i64,
    buffer: SampleBuffer,
    polls_completed: u64,
    polls_failed: u64,
    last_error: Option<String>,
}

impl ActiveRun {
    fn start_ms(&self) -> i64 {
        self.start_time.timestamp_millis()
    }

    /// Turn the buffer into a record. The caller has checked it is not empty.
    fn finalize(self, end_time: DateTime<Utc>, offset: ClinicOffset) -> Result<MonitoringRecord, CaptureError> {
        let stats = VitalStats::from_samples(self.buffer.samples()).ok_or_else(|| {
            CaptureError::EmptyCapture {
                session_id: self.session_id.clone(),
            }
        })?;

        let start_ms = self.start_ms();
        let end_ms = end_time.timestamp_millis();
        let late_samples_dropped = self.buffer.late_dropped();

        let samples = self
            .buffer
            .into_samples()
            .into_iter()
            .map(|(timestamp, sample)| sample.with_local_timestamp(timestamp, offset))
            .collect::<Vec<_>>();

        Ok(MonitoringRecord {
            id: None,
            session_id: self.session_id,
            patient_id: self.patient_id,
            start_time: start_ms,
            end_time: end_ms,
            start_time_local: self.start_time_local,
            end_time_local: offset.normalize(end_ms),
            duration_seconds: ((end_ms - start_ms).max(0) / 1000) as u64,
            total_samples: samples.len(),
            avg_heart_rate: stats.avg_heart_rate,
            min_heart_rate: stats.min_heart_rate,
            max_heart_rate: stats.max_heart_rate,
            late_samples_dropped,
            samples,
            created_at: end_time,
        })
    }
}

pub(crate) struct CaptureActor {
    feed: Arc<dyn TelemetryFeed>,
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    offset: ClinicOffset,
    poll_interval: Duration,
    commands: mpsc::Receiver<Command>,
    run: Option<ActiveRun>,
}

impl CaptureActor {
    pub(crate) fn new(
        feed: Arc<dyn TelemetryFeed>,
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
        offset: ClinicOffset,
        poll_interval: Duration,
        commands: mpsc::Receiver<Command>,
    ) -> Self {
        Self {
            feed,
            store,
            clock,
            offset,
            poll_interval,
            commands,
            run: None,
        }
    }

    /// Serve commands until every controller handle is dropped
    pub(crate) async fn run(mut self) {
        let mut schedule: Option<Interval> = None;

        loop {
            let event = match schedule.as_mut() {
                Some(interval) => tokio::select! {
                    biased;
                    _ = interval.tick() => Event::Tick,
                    command = self.commands.recv() => Event::Command(command),
                },
                None => Event::Command(self.commands.recv().await),
            };

            let mut pending = match event {
                Event::Tick => self.poll().await,
                Event::Command(Some(command)) => Some(command),
                Event::Command(None) => break,
            };

            while let Some(command) = pending.take() {
                pending = self.handle(command, &mut schedule).await;
            }
        }

        if let Some(run) = self.run.take() {
            log::warn!(
                "Capture for session {} abandoned with {} samples: all controller handles dropped",
                run.session_id,
                run.buffer.len()
            );
        }
    }

    /// Handle one command. Returns a stop or cancel that interrupted the first poll.
    async fn handle(&mut self, command: Command, schedule: &mut Option<Interval>) -> Option<Command> {
        match command {
            Command::Start {
                session_id,
                patient_id,
                reply,
            } => {
                if let Some(run) = &self.run {
                    let _ = reply.send(Err(CaptureError::InvalidState(format!(
                        "capture already running for session {}",
                        run.session_id
                    ))));
                    return None;
                }

                let start_time = self.clock.now();
                let start_ms = start_time.timestamp_millis();
                log::info!(
                    "Starting capture for session {} (patient {}) at {}",
                    session_id,
                    patient_id,
                    start_time.to_rfc3339()
                );

                self.run = Some(ActiveRun {
                    session_id,
                    patient_id,
                    start_time,
                    start_time_local: self.offset.normalize(start_ms),
                    buffer: SampleBuffer::new(start_ms),
                    polls_completed: 0,
                    polls_failed: 0,
                    last_error: None,
                });

                let mut interval =
                    tokio::time::interval_at(Instant::now() + self.poll_interval, self.poll_interval);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                *schedule = Some(interval);

                let _ = reply.send(Ok(self.status()));

                // Immediate first poll
                self.poll().await
            }
            Command::Stop { reply } => {
                // Scheduler goes before any state changes
                *schedule = None;
                let _ = reply.send(self.stop().await);
                None
            }
            Command::Cancel { reply } => {
                *schedule = None;
                let _ = reply.send(self.cancel());
                None
            }
            Command::Status { reply } => {
                let _ = reply.send(self.status());
                None
            }
        }
    }

    /// Fetch one snapshot and merge it.
    ///
    /// Commands that arrive while the fetch is in flight are answered in place,
    /// except a stop or cancel, which abandons the fetch and is handed back to
    /// the caller.
    async fn poll(&mut self) -> Option<Command> {
        let feed = Arc::clone(&self.feed);
        let mut fetch = feed.fetch_snapshot();
        let mut inbox_open = true;

        let result = loop {
            let event = tokio::select! {
                biased;
                result = &mut fetch => FetchEvent::Settled(result),
                command = self.commands.recv(), if inbox_open => FetchEvent::Command(command),
            };

            match event {
                FetchEvent::Settled(result) => break result,
                FetchEvent::Command(None) => inbox_open = false,
                FetchEvent::Command(Some(Command::Status { reply })) => {
                    let _ = reply.send(self.status());
                }
                FetchEvent::Command(Some(Command::Start { reply, .. })) => {
                    let _ = reply.send(Err(CaptureError::InvalidState(
                        "capture already running".to_string(),
                    )));
                }
                FetchEvent::Command(Some(end @ (Command::Stop { .. } | Command::Cancel { .. }))) => {
                    log::debug!("Run ended mid-fetch; discarding the in-flight snapshot");
                    return Some(end);
                }
            }
        };

        let poll_time = self.clock.now_ms();
        let Some(run) = self.run.as_mut() else {
            return None;
        };

        match result {
            Ok(snapshot) => {
                let summary = run.buffer.ingest(snapshot, poll_time);
                run.polls_completed += 1;
                run.last_error = None;

                if summary.newly_late > 0 {
                    log::warn!(
                        "Session {}: dropped {} late samples behind watermark {}",
                        run.session_id,
                        summary.newly_late,
                        summary.watermark
                    );
                }
                log::debug!(
                    "Session {}: snapshot {} samples, {} new, {} deferred, {} retained, watermark {}",
                    run.session_id,
                    summary.snapshot_len,
                    summary.admitted,
                    summary.deferred,
                    run.buffer.len(),
                    summary.watermark
                );
            }
            Err(e) => {
                // Retried on the next tick; watermark and buffer untouched
                let err = CaptureError::FeedUnavailable(e);
                log::warn!("Session {}: {}", run.session_id, err);
                run.polls_failed += 1;
                run.last_error = Some(err.to_string());
            }
        }

        None
    }

    async fn stop(&mut self) -> Result<MonitoringRecord, CaptureError> {
        let run = self
            .run
            .take()
            .ok_or_else(|| CaptureError::InvalidState("no capture is running".to_string()))?;

        let end_time = self.clock.now();
        let elapsed = ((end_time.timestamp_millis() - run.start_ms()).max(0) / 1000) as u64;

        if run.buffer.is_empty() {
            log::warn!(
                "Stopping capture for session {} after {}: no samples captured",
                run.session_id,
                format_clock_duration(elapsed)
            );
            return Err(CaptureError::EmptyCapture {
                session_id: run.session_id,
            });
        }

        let record = run.finalize(end_time, self.offset)?;
        log::info!(
            "Stopping capture for session {}: {} samples over {}, avg {} bpm ({}-{})",
            record.session_id,
            record.total_samples,
            format_clock_duration(record.duration_seconds),
            record.avg_heart_rate,
            record.min_heart_rate,
            record.max_heart_rate
        );

        match self.store.submit(&record).await {
            Ok(stored) => Ok(stored),
            Err(source) => {
                log::error!(
                    "Failed to submit monitoring record for session {}: {}",
                    record.session_id,
                    source
                );
                Err(CaptureError::SubmissionFailed {
                    record: Box::new(record),
                    source,
                })
            }
        }
    }

    /// Drop the run and its buffer. Returns how many samples were discarded.
    fn cancel(&mut self) -> Result<usize, CaptureError> {
        let run = self
            .run
            .take()
            .ok_or_else(|| CaptureError::InvalidState("no capture is running".to_string()))?;

        let discarded = run.buffer.len();
        log::info!(
            "Cancelled capture for session {}: discarded {} samples",
            run.session_id,
            discarded
        );
        Ok(discarded)
    }

    fn status(&self) -> CaptureStatus {
        let Some(run) = &self.run else {
            return CaptureStatus::idle();
        };

        let latest_sample = run.buffer.latest().cloned();
        let elapsed_ms = (self.clock.now_ms() - run.start_ms()).max(0);

        CaptureStatus {
            state: CaptureState::Running,
            session_id: Some(run.session_id.clone()),
            patient_id: Some(run.patient_id.clone()),
            start_time: Some(run.start_ms()),
            start_time_local: Some(run.start_time_local),
            elapsed_seconds: (elapsed_ms / 1000) as u64,
            samples_retained: run.buffer.len(),
            watermark: Some(run.buffer.watermark()),
            late_samples_dropped: run.buffer.late_dropped(),
            polls_completed: run.polls_completed,
            polls_failed: run.polls_failed,
            last_error: run.last_error.clone(),
            latest_zone: latest_sample
                .as_ref()
                .map(|sample| HeartRateZone::classify(sample.avg_heart_rate)),
            latest_sample,
        }
    }
}
