//! Clinician-facing presentation helpers

use std::fmt;

use serde::Serialize;

/// Display classification of a single heart rate reading
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HeartRateZone {
    Bradycardia,
    Normal,
    Elevated,
    Tachycardia,
}

impl HeartRateZone {
    pub fn classify(bpm: u32) -> Self {
        match bpm {
            0..=59 => HeartRateZone::Bradycardia,
            60..=100 => HeartRateZone::Normal,
            101..=120 => HeartRateZone::Elevated,
            _ => HeartRateZone::Tachycardia,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HeartRateZone::Bradycardia => "bradycardia",
            HeartRateZone::Normal => "normal",
            HeartRateZone::Elevated => "elevated",
            HeartRateZone::Tachycardia => "tachycardia",
        }
    }
}

impl fmt::Display for HeartRateZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Live timer style: `HH:MM:SS`, or `MM:SS` under an hour
pub fn format_clock_duration(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// Report style: `1h 2m 3s`, or `2m 3s` under an hour
pub fn format_report_duration(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else {
        format!("{}m {}s", minutes, seconds)
    }
}
