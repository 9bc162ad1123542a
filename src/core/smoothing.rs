//! Centered moving-average smoothing.
//!
//! For index `i` of an `n`-sample series and window radius `W`, the smoothed
//! value is the mean of `raw[max(0, i-W) ..= min(n-1, i+W)]`. The window
//! shrinks near both ends; there is no padding or reflection.
//!
//! Appending one sample only changes indices `n-1-W ..= n-1`, and every one of
//! those windows ends at `n-1`. The incremental strategy rewrites just that tail
//! by growing a single suffix sum leftwards, so each arrival costs `O(W)`
//! instead of the `O(n·W)` full recompute.

use crate::collector::types::Sample;
use crate::core::buffer::SmoothedPoint;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Samples on each side of the center included in the average.
pub const DEFAULT_WINDOW_RADIUS: usize = 30;

/// How the smoothed series is brought up to date after an arrival.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SmoothingStrategy {
    /// Rewrite only the trailing window
    #[default]
    Incremental,
    /// Recompute every index on every arrival
    BruteForce,
}

impl FromStr for SmoothingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "incremental" => Ok(SmoothingStrategy::Incremental),
            "brute-force" | "bruteforce" | "full" => Ok(SmoothingStrategy::BruteForce),
            other => Err(format!("unknown smoothing strategy '{other}'")),
        }
    }
}

impl std::fmt::Display for SmoothingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SmoothingStrategy::Incremental => write!(f, "incremental"),
            SmoothingStrategy::BruteForce => write!(f, "brute-force"),
        }
    }
}

/// Smooth a whole series by the centered moving-average definition.
pub fn centered_moving_average(raw: &[Sample], radius: usize) -> Vec<SmoothedPoint> {
    let n = raw.len();
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(radius);
            let hi = i.saturating_add(radius).min(n - 1);
            let window = &raw[lo..=hi];
            let sum: f64 = window.iter().map(|s| s.value).sum();
            SmoothedPoint {
                timestamp: raw[i].timestamp,
                value: sum / window.len() as f64,
            }
        })
        .collect()
}

/// Keeps a smoothed series in step with its raw series.
#[derive(Debug, Clone)]
pub struct SmoothingFilter {
    radius: usize,
    strategy: SmoothingStrategy,
}

impl Default for SmoothingFilter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_RADIUS, SmoothingStrategy::default())
    }
}

impl SmoothingFilter {
    pub fn new(radius: usize, strategy: SmoothingStrategy) -> Self {
        Self { radius, strategy }
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn strategy(&self) -> SmoothingStrategy {
        self.strategy
    }

    /// Bring `smoothed` up to date with `raw` after one or more appends.
    ///
    /// On return `smoothed` has the same length and timestamps as `raw`.
    pub fn recompute(&self, raw: &[Sample], smoothed: &mut Vec<SmoothedPoint>) {
        match self.strategy {
            SmoothingStrategy::BruteForce => *smoothed = centered_moving_average(raw, self.radius),
            SmoothingStrategy::Incremental => {
                if raw.is_empty() {
                    smoothed.clear();
                } else if smoothed.len() + 1 == raw.len() {
                    self.extend_tail(raw, smoothed);
                } else if smoothed.len() != raw.len() {
                    // Out of step with raw (more than one append); rebuild once.
                    *smoothed = centered_moving_average(raw, self.radius);
                }
            }
        }
    }

    /// Add the newest point and rewrite every index whose window reaches it.
    fn extend_tail(&self, raw: &[Sample], smoothed: &mut Vec<SmoothedPoint>) {
        let last = raw.len() - 1;
        smoothed.push(SmoothedPoint {
            timestamp: raw[last].timestamp,
            value: raw[last].value,
        });

        let first = last.saturating_sub(self.radius);
        let mut lo = last.saturating_sub(self.radius);
        let mut sum: f64 = raw[lo..=last].iter().map(|s| s.value).sum();

        for i in (first..=last).rev() {
            let want = i.saturating_sub(self.radius);
            while lo > want {
                lo -= 1;
                sum += raw[lo].value;
            }
            smoothed[i].value = sum / (last - lo + 1) as f64;
        }
    }
}
