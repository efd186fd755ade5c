//! Aggregate statistics derived from the record buffers.

use serde::Serialize;

use super::record::Record;

/// Counts and ratios over both buffers.
///
/// Never stored; recomputed from the buffers every time a snapshot is built.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AggregateStats {
    pub total_count: usize,
    pub warning_count: usize,
    /// `warning_count / max(total_count, 1)`; `0.0` when both buffers are empty.
    pub warning_ratio: f64,
}

impl AggregateStats {
    pub fn compute(realtime: &[Record], historical: &[Record]) -> Self {
        let total_count = realtime.len() + historical.len();
        let warning_count = realtime
            .iter()
            .chain(historical.iter())
            .filter(|r| r.status.is_warning())
            .count();
        let warning_ratio = warning_count as f64 / total_count.max(1) as f64;

        Self {
            total_count,
            warning_count,
            warning_ratio,
        }
    }

    /// Warning ratio as a whole percentage, rounded to nearest.
    pub fn warning_percent(&self) -> u32 {
        (self.warning_ratio * 100.0).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::record::Status;
    use chrono::Utc;

    fn record(status: Status) -> Record {
        Record::new(1.0, Utc::now(), status)
    }

    #[test]
    fn test_empty_buffers() {
        let stats = AggregateStats::compute(&[], &[]);
        assert_eq!(stats.total_count, 0);
        assert_eq!(stats.warning_count, 0);
        assert_eq!(stats.warning_ratio, 0.0);
        assert!(!stats.warning_ratio.is_nan());
        assert_eq!(stats.warning_percent(), 0);
    }

    #[test]
    fn test_counts_across_both_buffers() {
        let realtime = vec![record(Status::Warning), record(Status::Normal)];
        let historical = vec![
            record(Status::Normal),
            record(Status::Warning),
            record(Status::Normal),
        ];

        let stats = AggregateStats::compute(&realtime, &historical);
        assert_eq!(stats.total_count, 5);
        assert_eq!(stats.warning_count, 2);
        assert!((stats.warning_ratio - 0.4).abs() < f64::EPSILON);
        assert_eq!(stats.warning_percent(), 40);
    }

    #[test]
    fn test_percent_rounds() {
        let realtime = vec![
            record(Status::Warning),
            record(Status::Normal),
            record(Status::Normal),
        ];
        let stats = AggregateStats::compute(&realtime, &[]);
        assert_eq!(stats.warning_percent(), 33);
    }
}
