//! End-of-session summary statistics.

use crate::core::buffer::SeriesBuffer;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Descriptive statistics over one session's series.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeriesSummary {
    /// Number of raw samples
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (zero below two samples)
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    /// Largest absolute rate of change, value units per second
    pub peak_rate: f64,
    /// Derivative points with a zero time delta
    pub degenerate: usize,
    /// Time between first and last sample, in seconds
    pub duration_secs: f64,
}

impl SeriesSummary {
    /// Summarize a buffer; `None` when it holds no samples.
    pub fn from_buffer(buffer: &SeriesBuffer) -> Option<Self> {
        let raw = buffer.all();
        let (first, last) = (raw.first()?, raw.last()?);
        let values: Vec<f64> = raw.iter().map(|s| s.value).collect();

        let std_dev = if values.len() > 1 {
            values.iter().std_dev()
        } else {
            0.0
        };
        let peak_rate = buffer
            .derivative()
            .iter()
            .filter(|d| !d.degenerate)
            .map(|d| d.value.abs())
            .fold(0.0, f64::max);

        Some(Self {
            count: values.len(),
            mean: values.iter().mean(),
            std_dev,
            min: Statistics::min(values.iter()),
            max: Statistics::max(values.iter()),
            peak_rate,
            degenerate: buffer.derivative().iter().filter(|d| d.degenerate).count(),
            duration_secs: (last.timestamp - first.timestamp) as f64 / 1000.0,
        })
    }

    /// Multi-line text for the end of a CLI session.
    pub fn display(&self, unit: Option<&str>) -> String {
        let unit = unit.map(|u| format!(" {u}")).unwrap_or_default();
        format!(
            "Session Summary:\n\
             - Samples: {}\n\
             - Duration: {:.1} seconds\n\
             - Mean: {:.2}{unit} (std dev {:.2})\n\
             - Range: {:.2}{unit} .. {:.2}{unit}\n\
             - Peak rate of change: {:.2}{unit}/s\n\
             - Zero-interval readings: {}",
            self.count,
            self.duration_secs,
            self.mean,
            self.std_dev,
            self.min,
            self.max,
            self.peak_rate,
            self.degenerate,
        )
    }
}
