//! Running vital-sign statistics over retained samples

use serde::Serialize;

use crate::types::Sample;

/// Aggregate heart rate figures for a set of samples
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalStats {
    pub count: usize,
    /// Rounded mean of the per-sample averages
    pub avg_heart_rate: u32,
    /// Lowest per-sample minimum
    pub min_heart_rate: u32,
    /// Highest per-sample maximum
    pub max_heart_rate: u32,
}

impl VitalStats {
    /// Returns None for an empty set; a zero-sample run has no statistics.
    pub fn from_samples<'a, I>(samples: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Sample>,
    {
        let mut count = 0usize;
        let mut sum = 0u64;
        let mut min = u32::MAX;
        let mut max = 0u32;

        for sample in samples {
            count += 1;
            sum += sample.avg_heart_rate as u64;
            min = min.min(sample.min_heart_rate);
            max = max.max(sample.max_heart_rate);
        }

        if count == 0 {
            return None;
        }

        Some(Self {
            count,
            avg_heart_rate: round_div(sum, count),
            min_heart_rate: min,
            max_heart_rate: max,
        })
    }
}

/// Rounded arithmetic mean, or None for no values
pub fn rounded_mean<I>(values: I) -> Option<u32>
where
    I: IntoIterator<Item = u32>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0u64, 0usize), |(sum, count), v| (sum + v as u64, count + 1));

    if count == 0 {
        None
    } else {
        Some(round_div(sum, count))
    }
}

/// Half rounds up
fn round_div(sum: u64, count: usize) -> u32 {
    (sum as f64 / count as f64).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(avg: u32, min: u32, max: u32) -> Sample {
        Sample {
            id: None,
            device_id: "band".into(),
            avg_heart_rate: avg,
            min_heart_rate: min,
            max_heart_rate: max,
            recorded_at: Some(1),
            sync_timestamp: None,
            local_timestamp: None,
        }
    }

    #[test]
    fn averages_per_sample_means() {
        let samples = vec![sample(72, 66, 79), sample(68, 61, 75), sample(81, 70, 95)];
        let stats = VitalStats::from_samples(&samples).unwrap();
        assert_eq!(stats.avg_heart_rate, 74);
        assert_eq!(stats.min_heart_rate, 61);
        assert_eq!(stats.max_heart_rate, 95);
        assert_eq!(stats.count, 3);
    }

    #[test]
    fn empty_set_has_no_stats() {
        assert_eq!(VitalStats::from_samples(&Vec::<Sample>::new()), None);
        assert_eq!(rounded_mean(Vec::new()), None);
    }

    #[test]
    fn half_rounds_up() {
        assert_eq!(rounded_mean([70, 71]), Some(71));
        assert_eq!(rounded_mean([70, 70, 71]), Some(70));
    }
}
