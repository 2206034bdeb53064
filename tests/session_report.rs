mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use tokio::time::sleep;

use common::{sample, FlakyStore, ScriptedFeed, VirtualClock};
use heartwatch::analytics::{HealthStatus, Trend};
use heartwatch::capture::{CaptureError, CaptureOptions};
use heartwatch::types::Clock;
use heartwatch::{MonitoringService, ServiceError};

struct Harness {
    clock: Arc<VirtualClock>,
    feed: Arc<ScriptedFeed>,
    store: Arc<FlakyStore>,
    service: MonitoringService,
}

fn harness() -> Harness {
    let clock = VirtualClock::new();
    let feed = ScriptedFeed::new();
    let store = FlakyStore::new();
    let options = CaptureOptions::default().with_clock(clock.clone());
    let service = MonitoringService::new(
        feed.clone(),
        store.clone(),
        options,
        ChronoDuration::days(7),
    );

    Harness {
        clock,
        feed,
        store,
        service,
    }
}

/// Run one capture of `minutes` during which the feed reports `bpm`
async fn capture(h: &Harness, session_id: &str, id: u64, bpm: u32, minutes: u64) {
    h.service.start_session(session_id, "p-1").await.unwrap();
    sleep(Duration::from_secs(1)).await;
    h.feed.publish(sample(id, h.clock.now_ms(), bpm));
    sleep(Duration::from_secs(minutes * 60)).await;
    h.service.stop_session(session_id).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn report_over_captured_sessions() {
    let h = harness();
    capture(&h, "s-1", 1, 70, 5).await;
    capture(&h, "s-1", 2, 90, 10).await;
    capture(&h, "s-1", 3, 90, 2).await;
    capture(&h, "s-other", 4, 150, 1).await;

    let report = h.service.get_report("s-1", h.clock.now()).await.unwrap();

    assert_eq!(report.total_monitoring_sessions, 3);
    assert_eq!(report.total_records, 3);
    assert_eq!(report.total_duration_display(), "17m 3s");
    assert_eq!(report.avg_heart_rate_overall, 83);
    assert_eq!(report.health_status, HealthStatus::Normal);
    // Most recent first: [90, 90, 70]
    assert_eq!(report.trend, Trend::Decreasing);
    assert_eq!(report.sessions_this_week, 3);
    assert_eq!(report.longest_session.as_ref().map(|r| r.avg_heart_rate), Some(90));
    assert_eq!(report.longest_session.as_ref().map(|r| r.duration_seconds), Some(601));
    assert_eq!(report.most_recent_monitoring.as_ref().map(|r| r.duration_seconds), Some(121));

    // 14:00 UTC is 09:00 at the clinic
    assert_eq!(report.time_of_day.morning.count, 3);
    assert_eq!(report.time_of_day.morning.avg_heart_rate, 83);
    assert_eq!(report.time_of_day.evening.count, 0);

    let later = h.clock.now() + ChronoDuration::days(8);
    let report = h.service.get_report("s-1", later).await.unwrap();
    assert_eq!(report.sessions_this_week, 0);
}

#[tokio::test(start_paused = true)]
async fn report_on_unknown_session_is_zeroed() {
    let h = harness();
    let report = h.service.get_report("nobody", h.clock.now()).await.unwrap();

    assert_eq!(report.total_monitoring_sessions, 0);
    assert_eq!(report.avg_heart_rate_overall, 0);
    assert_eq!(report.health_status, HealthStatus::Normal);
    assert_eq!(report.trend, Trend::Stable);
    assert!(report.most_recent_monitoring.is_none());
}

#[tokio::test(start_paused = true)]
async fn same_session_cannot_run_twice_but_others_can() {
    let h = harness();
    h.service.start_session("s-1", "p-1").await.unwrap();

    let err = h.service.start_session("s-1", "p-1").await.unwrap_err();
    assert!(matches!(err, ServiceError::Capture(CaptureError::InvalidState(_))));

    h.service.start_session("s-2", "p-2").await.unwrap();
    assert_eq!(h.service.live_sessions().await, vec!["s-1", "s-2"]);

    let status = h.service.status("s-1").await.unwrap();
    assert!(status.is_running());
    assert!(!h.service.status("s-3").await.unwrap().is_running());
}

#[tokio::test(start_paused = true)]
async fn failed_submission_can_be_retried() {
    let h = harness();
    h.service.start_session("s-1", "p-1").await.unwrap();
    sleep(Duration::from_secs(1)).await;
    h.feed.publish(sample(1, h.clock.now_ms(), 64));
    sleep(Duration::from_secs(7)).await;

    h.store.set_failing(true);
    let err = h.service.stop_session("s-1").await.unwrap_err();
    let record = match err {
        ServiceError::Capture(CaptureError::SubmissionFailed { record, .. }) => record,
        other => panic!("unexpected error: {other}"),
    };
    assert!(h.service.live_sessions().await.is_empty());

    h.store.set_failing(false);
    let stored = h.service.retry_submission(&record).await.unwrap();
    assert!(stored.is_persisted());

    let report = h.service.get_report("s-1", h.clock.now()).await.unwrap();
    assert_eq!(report.total_monitoring_sessions, 1);
    assert_eq!(report.avg_heart_rate_overall, 64);
}

#[tokio::test(start_paused = true)]
async fn deleting_session_records_cascades() {
    let h = harness();
    capture(&h, "s-1", 1, 70, 1).await;
    capture(&h, "s-1", 2, 72, 1).await;
    capture(&h, "s-2", 3, 75, 1).await;

    assert_eq!(h.service.delete_session_records("s-1").await.unwrap(), 2);
    assert_eq!(h.store.len().await, 1);

    let report = h.service.get_report("s-1", h.clock.now()).await.unwrap();
    assert_eq!(report.total_monitoring_sessions, 0);
}

#[tokio::test(start_paused = true)]
async fn live_session_records_are_not_deleted() {
    let h = harness();
    capture(&h, "s-1", 1, 70, 1).await;
    h.service.start_session("s-1", "p-1").await.unwrap();

    let err = h.service.delete_session_records("s-1").await.unwrap_err();
    assert!(matches!(err, ServiceError::SessionBusy(_)));
    assert_eq!(h.store.len().await, 1);
}

#[tokio::test(start_paused = true)]
async fn cancelled_session_saves_nothing_and_stops_polling() {
    let h = harness();
    capture(&h, "s-1", 1, 70, 1).await;

    h.service.start_session("s-1", "p-1").await.unwrap();
    sleep(Duration::from_secs(1)).await;
    h.feed.publish(sample(2, h.clock.now_ms(), 88));
    sleep(Duration::from_secs(13)).await;

    let discarded = h.service.cancel_session("s-1").await.unwrap();
    assert_eq!(discarded, 1);
    assert!(h.service.live_sessions().await.is_empty());
    assert_eq!(h.store.len().await, 1);

    let fetches = h.feed.fetches();
    sleep(Duration::from_secs(30)).await;
    assert_eq!(h.feed.fetches(), fetches);

    assert_eq!(h.service.delete_session_records("s-1").await.unwrap(), 1);
    assert_eq!(h.store.len().await, 0);

    let err = h.service.cancel_session("s-1").await.unwrap_err();
    assert!(matches!(err, ServiceError::Capture(CaptureError::InvalidState(_))));
}
