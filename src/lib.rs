// Heartwatch - Live Heart Rate Capture and Session Analytics

pub mod analytics;
pub mod capture;
pub mod config;
pub mod feed;
pub mod format;
pub mod service;
pub mod storage;
pub mod types;

pub use analytics::{build_report, HealthStatus, SessionAnalytics, SessionAnalyticsReport, Trend};
pub use capture::{CaptureController, CaptureError, CaptureOptions, CaptureState, CaptureStatus};
pub use config::MonitorConfig;
pub use service::{MonitoringService, ServiceError};
pub use types::{ClinicOffset, Clock, MonitoringRecord, Sample, SystemClock};
