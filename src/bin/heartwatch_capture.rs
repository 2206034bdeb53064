// src/bin/heartwatch_capture.rs
//! Run one live capture against the configured feed, then print the record
//! and the session report.
//!
//! Usage: heartwatch_capture <session-id> <patient-id> [seconds]
//!
//! Without a duration the capture runs until Ctrl-C. A JSON config file may be
//! named by HEARTWATCH_CONFIG; HEARTWATCH_* variables override it.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tokio::time::sleep;

use heartwatch::format::{format_clock_duration, format_report_duration};
use heartwatch::{CaptureError, MonitorConfig, MonitoringService, ServiceError};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (session_id, patient_id) = match args.as_slice() {
        [session, patient, ..] => (session.clone(), patient.clone()),
        _ => bail!("usage: heartwatch_capture <session-id> <patient-id> [seconds]"),
    };
    let run_for = args
        .get(2)
        .map(|raw| raw.parse::<u64>().map(Duration::from_secs))
        .transpose()
        .context("duration must be a whole number of seconds")?;

    let config = match std::env::var("HEARTWATCH_CONFIG") {
        Ok(path) => MonitorConfig::from_json_file(&path)
            .with_context(|| format!("failed to load config from {}", path))?,
        Err(_) => MonitorConfig::default(),
    }
    .with_env_overrides()?;

    let service = MonitoringService::from_config(&config).await?;

    println!("Starting capture for session {} from {}", session_id, config.feed_url);
    service.start_session(&session_id, &patient_id).await?;

    let status_every = config.poll_interval();
    let capture = async {
        loop {
            sleep(status_every).await;
            match service.status(&session_id).await {
                Ok(status) => println!(
                    "[{}] {} samples, latest {} ({}), {} late",
                    format_clock_duration(status.elapsed_seconds),
                    status.samples_retained,
                    status
                        .latest_sample
                        .as_ref()
                        .map(|s| format!("{} bpm", s.avg_heart_rate))
                        .unwrap_or_else(|| "-".to_string()),
                    status
                        .latest_zone
                        .map(|z| z.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    status.late_samples_dropped,
                ),
                Err(e) => log::warn!("Status unavailable: {}", e),
            }
        }
    };

    match run_for {
        Some(limit) => {
            tokio::select! {
                _ = capture => {}
                _ = sleep(limit) => {}
            }
        }
        None => {
            tokio::select! {
                _ = capture => {}
                result = tokio::signal::ctrl_c() => result.context("failed to listen for Ctrl-C")?,
            }
        }
    }

    let record = match service.stop_session(&session_id).await {
        Ok(record) => record,
        Err(ServiceError::Capture(CaptureError::SubmissionFailed { record, source })) => {
            log::warn!("Submission failed ({}); retrying once", source);
            service
                .retry_submission(&record)
                .await
                .context("record could not be stored")?
        }
        Err(e) => return Err(e.into()),
    };

    println!(
        "Stored record {} for session {}: {} samples over {}, avg {} bpm ({}-{})",
        record.id.as_ref().map(|id| id.to_string()).unwrap_or_default(),
        record.session_id,
        record.total_samples,
        format_report_duration(record.duration_seconds),
        record.avg_heart_rate,
        record.min_heart_rate,
        record.max_heart_rate,
    );

    let report = service.get_report(&session_id, Utc::now()).await?;
    println!(
        "Session {}: {} captures totalling {}",
        session_id,
        report.total_monitoring_sessions,
        report.total_duration_display()
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
