use serde::Serialize;

use crate::capture::rounded_mean;
use crate::types::{local_hour, MonitoringRecord};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    /// Morning is [6, 12), afternoon [12, 18), evening the rest of the day
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => TimeOfDay::Morning,
            12..=17 => TimeOfDay::Afternoon,
            _ => TimeOfDay::Evening,
        }
    }

    /// Bucket of a record, read from its clinic-local start time
    pub fn of_record(record: &MonitoringRecord) -> Self {
        Self::from_hour(local_hour(record.start_time_local))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketSummary {
    pub count: usize,
    /// Rounded mean of record averages, 0 when empty
    pub avg_heart_rate: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TimeOfDayBreakdown {
    pub morning: BucketSummary,
    pub afternoon: BucketSummary,
    pub evening: BucketSummary,
}

impl TimeOfDayBreakdown {
    pub fn from_records(records: &[MonitoringRecord]) -> Self {
        let summarize = |bucket: TimeOfDay| {
            let averages: Vec<u32> = records
                .iter()
                .filter(|r| TimeOfDay::of_record(r) == bucket)
                .map(|r| r.avg_heart_rate)
                .collect();

            BucketSummary {
                count: averages.len(),
                avg_heart_rate: rounded_mean(averages).unwrap_or(0),
            }
        };

        Self {
            morning: summarize(TimeOfDay::Morning),
            afternoon: summarize(TimeOfDay::Afternoon),
            evening: summarize(TimeOfDay::Evening),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hour_boundaries() {
        assert_eq!(TimeOfDay::from_hour(5), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(6), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(11), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(12), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(17), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(18), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(0), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(23), TimeOfDay::Evening);
    }
}
