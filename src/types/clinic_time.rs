//! Clinic-local time handling
//!
//! The clinic runs on a fixed UTC offset with no daylight saving. "Local"
//! timestamps are stored as epoch milliseconds shifted by that offset, so
//! reading their UTC clock fields yields the clinic's wall-clock time.

use chrono::{DateTime, Timelike, Utc};

const MS_PER_HOUR: i64 = 60 * 60 * 1000;

/// Source of "now" for capture runs
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn now_ms(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// Wall clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fixed offset of the clinic from UTC, in whole hours
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClinicOffset {
    hours: i32,
}

impl ClinicOffset {
    /// UTC-5, the clinic's default
    pub const UTC_MINUS_5: ClinicOffset = ClinicOffset { hours: -5 };

    /// Returns None for offsets outside (-24, 24)
    pub fn from_hours(hours: i32) -> Option<Self> {
        if hours.abs() < 24 {
            Some(Self { hours })
        } else {
            None
        }
    }

    pub fn hours(&self) -> i32 {
        self.hours
    }

    /// Shift a UTC epoch-ms value to clinic-local epoch ms
    pub fn normalize(&self, utc_ms: i64) -> i64 {
        utc_ms + self.hours as i64 * MS_PER_HOUR
    }
}

impl Default for ClinicOffset {
    fn default() -> Self {
        Self::UTC_MINUS_5
    }
}

/// Hour of day (0-23) of an already-normalized local timestamp.
///
/// The value's own clock fields are read directly; no offset is applied.
/// Out-of-range timestamps read as midnight.
pub fn local_hour(local_ms: i64) -> u32 {
    DateTime::<Utc>::from_timestamp_millis(local_ms)
        .map(|dt| dt.hour())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn normalizes_to_utc_minus_five() {
        let utc = Utc.with_ymd_and_hms(2026, 3, 10, 14, 30, 0).unwrap();
        let local = ClinicOffset::default().normalize(utc.timestamp_millis());
        assert_eq!(local_hour(local), 9);
    }

    #[test]
    fn early_utc_hours_wrap_to_previous_evening() {
        let utc = Utc.with_ymd_and_hms(2026, 3, 10, 2, 0, 0).unwrap();
        let local = ClinicOffset::default().normalize(utc.timestamp_millis());
        assert_eq!(local_hour(local), 21);
    }

    #[test]
    fn rejects_out_of_range_offsets() {
        assert!(ClinicOffset::from_hours(-24).is_none());
        assert_eq!(ClinicOffset::from_hours(3).map(|o| o.hours()), Some(3));
    }
}
