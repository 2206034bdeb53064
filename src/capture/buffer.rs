//! Admission buffer for a live capture run
//!
//! The feed returns its whole history on every read, shared across devices
//! and with ids that carry no ordering. Admission is therefore decided by
//! effective timestamp against a forward-only watermark:
//!
//! - before anything is admitted the gate is `ts >= start_time`
//! - afterwards it is `ts > watermark`
//! - samples stamped after the poll's own clock are deferred to a later poll
//!
//! A sample that shows up behind the watermark is dropped for good. Those are
//! counted so the loss is visible on the finalized record.

use std::collections::HashSet;

use crate::types::{Sample, SampleKey, TimestampSource};

/// Outcome of ingesting one snapshot
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub snapshot_len: usize,
    pub admitted: usize,
    /// Stamped later than the poll time, left for a later poll
    pub deferred: usize,
    /// Behind the watermark and never retained
    pub newly_late: usize,
    pub watermark: i64,
}

/// Samples retained by one run, most recent first
#[derive(Debug)]
pub struct SampleBuffer {
    start_time: i64,
    watermark: Option<i64>,
    samples: Vec<(i64, Sample)>,
    retained: HashSet<SampleKey>,
    late: HashSet<SampleKey>,
}

impl SampleBuffer {
    pub fn new(start_time: i64) -> Self {
        Self {
            start_time,
            watermark: None,
            samples: Vec::new(),
            retained: HashSet::new(),
            late: HashSet::new(),
        }
    }

    /// Highest admitted effective timestamp, or the run start if none yet
    pub fn watermark(&self) -> i64 {
        self.watermark.unwrap_or(self.start_time)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn late_dropped(&self) -> usize {
        self.late.len()
    }

    /// Most recent retained sample
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.first().map(|(_, sample)| sample)
    }

    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter().map(|(_, sample)| sample)
    }

    /// Effective timestamps paired with samples, most recent first
    pub fn into_samples(self) -> Vec<(i64, Sample)> {
        self.samples
    }

    fn admits(&self, timestamp: i64) -> bool {
        match self.watermark {
            None => timestamp >= self.start_time,
            Some(watermark) => timestamp > watermark,
        }
    }

    /// Filter a full feed snapshot and merge the new samples
    pub fn ingest(&mut self, snapshot: Vec<Sample>, poll_time: i64) -> PollSummary {
        let mut summary = PollSummary {
            snapshot_len: snapshot.len(),
            ..PollSummary::default()
        };
        let mut admitted: Vec<(i64, Sample)> = Vec::new();

        for sample in snapshot {
            let (timestamp, source) = sample.resolve_timestamp(poll_time);

            if timestamp > poll_time {
                summary.deferred += 1;
                continue;
            }

            // Clockless samples get a fresh poll time on every read
            if source == TimestampSource::PollTime
                && self.samples().any(|kept| kept.same_identity(&sample))
            {
                continue;
            }

            let key = sample.key(timestamp);
            if self.admits(timestamp) {
                if self.retained.insert(key) {
                    admitted.push((timestamp, sample));
                }
            } else if timestamp >= self.start_time
                && !self.retained.contains(&key)
                && self.late.insert(key)
            {
                summary.newly_late += 1;
            }
        }

        if let Some(newest) = admitted.iter().map(|(ts, _)| *ts).max() {
            self.watermark = Some(self.watermark().max(newest));
        }

        summary.admitted = admitted.len();
        self.samples.extend(admitted);
        self.samples.sort_by(|a, b| b.0.cmp(&a.0));

        summary.watermark = self.watermark();
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExternalId;

    const START: i64 = 1_000_000;

    fn sample(id: u64, recorded_at: i64, avg: u32) -> Sample {
        Sample {
            id: Some(ExternalId::Number(id)),
            device_id: "band-1".into(),
            avg_heart_rate: avg,
            min_heart_rate: avg - 5,
            max_heart_rate: avg + 5,
            recorded_at: Some(recorded_at),
            sync_timestamp: None,
            local_timestamp: None,
        }
    }

    #[test]
    fn admits_sample_exactly_at_start() {
        let mut buffer = SampleBuffer::new(START);
        let summary = buffer.ingest(vec![sample(1, START - 1, 70), sample(2, START, 72)], START);

        assert_eq!(summary.admitted, 1);
        assert_eq!(buffer.latest().map(|s| s.avg_heart_rate), Some(72));
        assert_eq!(buffer.watermark(), START);
    }

    #[test]
    fn repeated_snapshots_do_not_duplicate() {
        let mut buffer = SampleBuffer::new(START);
        let first = vec![sample(1, START + 10, 70), sample(2, START + 20, 72)];
        buffer.ingest(first.clone(), START + 100);

        let mut second = first;
        second.push(sample(3, START + 150, 75));
        let summary = buffer.ingest(second, START + 200);

        assert_eq!(summary.admitted, 1);
        assert_eq!(summary.newly_late, 0);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.watermark(), START + 150);
    }

    #[test]
    fn watermark_never_regresses() {
        let mut buffer = SampleBuffer::new(START);
        buffer.ingest(vec![sample(1, START + 500, 70)], START + 600);
        let before = buffer.watermark();

        buffer.ingest(Vec::new(), START + 700);
        assert_eq!(buffer.watermark(), before);

        buffer.ingest(vec![sample(2, START + 100, 70)], START + 800);
        assert_eq!(buffer.watermark(), before);
    }

    #[test]
    fn late_samples_are_dropped_and_counted_once() {
        let mut buffer = SampleBuffer::new(START);
        buffer.ingest(vec![sample(9, START + 500, 70)], START + 600);

        let late = sample(4, START + 200, 90);
        let summary = buffer.ingest(vec![late.clone()], START + 700);
        assert_eq!(summary.newly_late, 1);

        let summary = buffer.ingest(vec![late], START + 800);
        assert_eq!(summary.newly_late, 0);
        assert_eq!(buffer.late_dropped(), 1);
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn future_samples_wait_for_a_later_poll() {
        let mut buffer = SampleBuffer::new(START);
        let ahead = sample(1, START + 5_000, 70);

        let summary = buffer.ingest(vec![ahead.clone()], START + 1_000);
        assert_eq!(summary.deferred, 1);
        assert!(buffer.is_empty());
        assert_eq!(buffer.watermark(), START);

        let summary = buffer.ingest(vec![ahead], START + 6_000);
        assert_eq!(summary.admitted, 1);
    }

    #[test]
    fn keeps_most_recent_first() {
        let mut buffer = SampleBuffer::new(START);
        buffer.ingest(
            vec![sample(1, START + 30, 70), sample(2, START + 10, 71), sample(3, START + 20, 72)],
            START + 100,
        );
        buffer.ingest(vec![sample(4, START + 150, 73)], START + 200);

        let order: Vec<u32> = buffer.samples().map(|s| s.avg_heart_rate).collect();
        assert_eq!(order, vec![73, 70, 72, 71]);
    }

    #[test]
    fn clockless_samples_are_kept_once() {
        let mut buffer = SampleBuffer::new(START);
        let mut clockless = sample(1, 0, 70);
        clockless.recorded_at = None;

        buffer.ingest(vec![clockless.clone()], START + 100);
        buffer.ingest(vec![clockless], START + 200);
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn clockless_samples_without_id_are_kept_once() {
        let mut buffer = SampleBuffer::new(START);
        let mut clockless = sample(1, 0, 70);
        clockless.recorded_at = None;
        clockless.id = None;
        let mut other = clockless.clone();
        other.avg_heart_rate = 84;

        buffer.ingest(vec![clockless.clone()], START + 100);
        buffer.ingest(vec![clockless.clone()], START + 200);
        buffer.ingest(vec![clockless, other], START + 300);

        let kept: Vec<u32> = buffer.samples().map(|s| s.avg_heart_rate).collect();
        assert_eq!(kept, vec![84, 70]);
    }
}
