//! Short-term heart rate trend across the latest records

use std::fmt;

use serde::Serialize;

/// Number of most recent records the trend looks at
pub const TREND_WINDOW: usize = 3;

/// Change in bpm below which the trend is stable
pub const STABLE_BAND: f64 = 5.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

impl Trend {
    /// Classify record averages given most recent first.
    ///
    /// The first `ceil(n / 2)` of the latest `n <= 3` records form the first
    /// half, the rest the second half; the trend is the sign of
    /// `mean(second) - mean(first)`.
    pub fn from_recent(averages: &[u32]) -> Self {
        let window = &averages[..averages.len().min(TREND_WINDOW)];
        if window.len() < 2 {
            return Trend::Stable;
        }

        let split = (window.len() + 1) / 2;
        let (first, second) = window.split_at(split);

        let difference = mean(second) - mean(first);
        if difference.abs() < STABLE_BAND {
            Trend::Stable
        } else if difference > 0.0 {
            Trend::Increasing
        } else {
            Trend::Decreasing
        }
    }
}

/// Unrounded, so a half-bpm difference is not lost at the band edge
fn mean(values: &[u32]) -> f64 {
    values.iter().map(|v| *v as f64).sum::<f64>() / values.len() as f64
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Trend::Increasing => "increasing",
            Trend::Decreasing => "decreasing",
            Trend::Stable => "stable",
        };
        f.write_str(label)
    }
}
