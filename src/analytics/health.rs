use std::fmt;

use serde::Serialize;

/// Classification of a session's overall average heart rate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Normal,
    Attention,
    Concern,
}

impl HealthStatus {
    pub fn classify(avg_heart_rate: u32) -> Self {
        match avg_heart_rate {
            60..=100 => HealthStatus::Normal,
            50..=59 | 101..=120 => HealthStatus::Attention,
            _ => HealthStatus::Concern,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HealthStatus::Normal => "normal",
            HealthStatus::Attention => "attention",
            HealthStatus::Concern => "concern",
        };
        f.write_str(label)
    }
}
