//! Data model shared by the capture controller and the analytics aggregator
//!
//! Telemetry samples arrive from an external feed, are retained by a live
//! capture run, and end up inside a finalized `MonitoringRecord`.

pub mod sample;
pub mod record;
pub mod clinic_time;

pub use sample::{ExternalId, Sample, SampleKey, TimestampSource};
pub use record::{MonitoringRecord, RecordId};
pub use clinic_time::{local_hour, ClinicOffset, Clock, SystemClock};
