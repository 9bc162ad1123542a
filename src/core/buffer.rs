//! Series storage for the active session.
//!
//! The raw series is append-only for the lifetime of a session. The smoothed
//! and derivative series live alongside it so a single `reset` clears all three.

use crate::collector::types::{Sample, SampleError};
use serde::{Deserialize, Serialize};

/// A raw sample with its value replaced by the filtered estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothedPoint {
    pub timestamp: i64,
    pub value: f64,
}

/// Rate of change between two adjacent smoothed points, in value units per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivativePoint {
    /// Timestamp of the later of the two smoothed points
    pub timestamp: i64,
    pub value: f64,
    /// Set when the two points shared a timestamp; `value` is then zero
    #[serde(default)]
    pub degenerate: bool,
}

/// Owner of the raw, smoothed and derivative series of one session.
#[derive(Debug, Default, Clone)]
pub struct SeriesBuffer {
    raw: Vec<Sample>,
    smoothed: Vec<SmoothedPoint>,
    derivative: Vec<DerivativePoint>,
}

impl SeriesBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw sample. Non-finite values are rejected and nothing is stored.
    ///
    /// Timestamps are accepted as delivered; repeated or out-of-order values
    /// are not an error.
    pub fn append(&mut self, sample: Sample) -> Result<(), SampleError> {
        sample.validate()?;
        self.raw.push(sample);
        Ok(())
    }

    /// Clear all three series.
    pub fn reset(&mut self) {
        self.raw.clear();
        self.smoothed.clear();
        self.derivative.clear();
    }

    /// The raw series, in arrival order.
    pub fn all(&self) -> &[Sample] {
        &self.raw
    }

    /// The smoothed series; always as long as the raw series once smoothing has run.
    pub fn smoothed(&self) -> &[SmoothedPoint] {
        &self.smoothed
    }

    /// Rate-of-change points, one fewer than the smoothed series.
    pub fn derivative(&self) -> &[DerivativePoint] {
        &self.derivative
    }

    /// The newest raw sample, if any.
    pub fn latest(&self) -> Option<&Sample> {
        self.raw.last()
    }

    /// Number of raw samples.
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Split borrow for the filter and estimator: raw read-only, derived series writable.
    pub(crate) fn parts_mut(
        &mut self,
    ) -> (
        &[Sample],
        &mut Vec<SmoothedPoint>,
        &mut Vec<DerivativePoint>,
    ) {
        (&self.raw, &mut self.smoothed, &mut self.derivative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_keeps_arrival_order() {
        let mut buffer = SeriesBuffer::new();
        buffer.append(Sample::new(2000, 1.0)).unwrap();
        buffer.append(Sample::new(1000, 2.0)).unwrap();
        buffer.append(Sample::new(1000, 3.0)).unwrap();

        let values: Vec<f64> = buffer.all().iter().map(|s| s.value).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
        assert_eq!(buffer.latest().map(|s| s.timestamp), Some(1000));
    }

    #[test]
    fn test_append_rejects_non_finite() {
        let mut buffer = SeriesBuffer::new();
        assert!(buffer.append(Sample::new(0, f64::NAN)).is_err());
        assert!(buffer.append(Sample::new(0, f64::INFINITY)).is_err());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_reset_clears_every_series() {
        let mut buffer = SeriesBuffer::new();
        buffer.append(Sample::new(0, 1.0)).unwrap();
        {
            let (_, smoothed, derivative) = buffer.parts_mut();
            smoothed.push(SmoothedPoint {
                timestamp: 0,
                value: 1.0,
            });
            derivative.push(DerivativePoint {
                timestamp: 0,
                value: 0.0,
                degenerate: false,
            });
        }

        buffer.reset();
        assert!(buffer.all().is_empty());
        assert!(buffer.smoothed().is_empty());
        assert!(buffer.derivative().is_empty());

        buffer.reset();
        assert!(buffer.all().is_empty());
    }
}
