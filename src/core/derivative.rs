//! Rate-of-change estimation on top of the smoothed series.
//!
//! One point is appended per arrival from the last two smoothed points. Earlier
//! derivative points are never revisited, even though smoothing keeps
//! rewriting the trailing window after they were emitted.

use crate::core::buffer::{DerivativePoint, SmoothedPoint};

/// Rate of change from `prev` to `curr` in value units per second.
///
/// Returns `None` when both points share a timestamp.
pub fn rate_of_change(prev: &SmoothedPoint, curr: &SmoothedPoint) -> Option<f64> {
    let delta_ms = curr.timestamp - prev.timestamp;
    if delta_ms == 0 {
        return None;
    }
    Some((curr.value - prev.value) / (delta_ms as f64 / 1000.0))
}

/// Appends derivative points as the smoothed series grows.
#[derive(Debug, Default, Clone)]
pub struct DerivativeEstimator {
    degenerate: u64,
}

impl DerivativeEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit one point for the newest smoothed pair, if there is one.
    ///
    /// A zero time delta yields a point flagged `degenerate` with value zero,
    /// so the derivative series stays exactly one shorter than the smoothed one.
    pub fn update(
        &mut self,
        smoothed: &[SmoothedPoint],
        derivative: &mut Vec<DerivativePoint>,
    ) -> Option<DerivativePoint> {
        let [.., prev, curr] = smoothed else {
            return None;
        };

        let point = match rate_of_change(prev, curr) {
            Some(value) => DerivativePoint {
                timestamp: curr.timestamp,
                value,
                degenerate: false,
            },
            None => {
                self.degenerate += 1;
                tracing::debug!(
                    timestamp = curr.timestamp,
                    "zero time delta between smoothed points; derivative zeroed"
                );
                DerivativePoint {
                    timestamp: curr.timestamp,
                    value: 0.0,
                    degenerate: true,
                }
            }
        };
        derivative.push(point);
        Some(point)
    }

    /// Number of degenerate points emitted since the last reset.
    pub fn degenerate_count(&self) -> u64 {
        self.degenerate
    }

    pub fn reset(&mut self) {
        self.degenerate = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(timestamp: i64, value: f64) -> SmoothedPoint {
        SmoothedPoint { timestamp, value }
    }

    fn run(points: &[SmoothedPoint]) -> (DerivativeEstimator, Vec<DerivativePoint>) {
        let mut estimator = DerivativeEstimator::new();
        let mut derivative = Vec::new();
        for n in 1..=points.len() {
            estimator.update(&points[..n], &mut derivative);
        }
        (estimator, derivative)
    }

    #[test]
    fn test_first_point_emits_nothing() {
        let mut estimator = DerivativeEstimator::new();
        let mut derivative = Vec::new();
        assert!(estimator.update(&[], &mut derivative).is_none());
        assert!(estimator.update(&[point(0, 1.0)], &mut derivative).is_none());
        assert!(derivative.is_empty());
    }

    #[test]
    fn test_units_are_per_second() {
        let (_, derivative) = run(&[point(0, 10.0), point(500, 11.0), point(2500, 7.0)]);
        assert_eq!(derivative.len(), 2);
        assert!((derivative[0].value - 2.0).abs() < 1e-12);
        assert!((derivative[1].value + 2.0).abs() < 1e-12);
        assert_eq!(derivative[1].timestamp, 2500);
    }

    #[test]
    fn test_zero_time_delta_is_flagged_not_fatal() {
        let (estimator, derivative) = run(&[point(1000, 1.0), point(1000, 5.0), point(2000, 6.0)]);
        assert_eq!(derivative.len(), 2);
        assert!(derivative[0].degenerate);
        assert_eq!(derivative[0].value, 0.0);
        assert!(!derivative[1].degenerate);
        assert!(derivative[1].value.is_finite());
        assert_eq!(estimator.degenerate_count(), 1);
        assert_eq!(rate_of_change(&point(5, 1.0), &point(5, 2.0)), None);
    }

    #[test]
    fn test_sign_follows_monotonic_direction() {
        let rising: Vec<SmoothedPoint> = (0..20).map(|i| point(i * 100, (i * i) as f64)).collect();
        let (_, up) = run(&rising);
        assert!(up.iter().all(|d| d.value >= 0.0));

        let falling: Vec<SmoothedPoint> = (0..20).map(|i| point(i * 100, -(i as f64))).collect();
        let (_, down) = run(&falling);
        assert!(down.iter().all(|d| d.value <= 0.0));
    }

    #[test]
    fn test_history_is_not_rewritten() {
        let mut estimator = DerivativeEstimator::new();
        let mut derivative = Vec::new();
        let mut smoothed = vec![point(0, 0.0), point(1000, 1.0)];
        estimator.update(&smoothed, &mut derivative);

        // A later correction to an old smoothed value leaves old derivatives alone.
        smoothed[1].value = 100.0;
        smoothed.push(point(2000, 101.0));
        estimator.update(&smoothed, &mut derivative);

        assert_eq!(derivative[0].value, 1.0);
        assert_eq!(derivative[1].value, 1.0);
    }
}
