// ── Time series ──

use chrono::{DateTime, Utc};
use coolant_api::Sample;
use serde::Serialize;

/// Samples for one uid, always ascending by timestamp.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TimeSeries {
    samples: Vec<Sample>,
}

impl TimeSeries {
    /// Build a series from samples in any order. Equal timestamps keep
    /// their relative order.
    pub fn from_samples(mut samples: Vec<Sample>) -> Self {
        samples.sort_by_key(|s| s.timestamp);
        Self { samples }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.last()
    }

    pub fn timestamps(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        self.samples.iter().map(|s| s.timestamp)
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn at(secs: i64, value: f64) -> Sample {
        Sample::new(DateTime::from_timestamp(secs, 0).unwrap(), value)
    }

    #[test]
    fn sorts_descending_input() {
        let series = TimeSeries::from_samples(vec![at(30, 3.0), at(20, 2.0), at(10, 1.0)]);
        assert_eq!(series.values().collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);
        assert_eq!(series.latest().unwrap().value, 3.0);
    }

    #[test]
    fn empty_series_has_no_latest() {
        assert!(TimeSeries::default().latest().is_none());
    }
}
