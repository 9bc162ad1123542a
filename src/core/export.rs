//! Delimited text export of the smoothed and derivative series.
//!
//! One row per sample: `mm:ss.mmm,<smoothed>,<change>`. Row `i` carries
//! derivative entry `i` (the change from sample `i` to `i+1`, stamped at
//! `i+1`), and rows past the end of the derivative series carry `0`. That
//! alignment is part of the format and is kept as is.

use crate::core::buffer::{DerivativePoint, SeriesBuffer, SmoothedPoint};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

const MS_PER_HOUR: i64 = 3_600_000;

/// Header row variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportHeader {
    /// `Time,Value,ValueChange`
    #[default]
    Generic,
    /// `Time,Temperature,Temperature Change`
    Temperature,
}

impl ExportHeader {
    pub fn columns(&self) -> &'static str {
        match self {
            ExportHeader::Generic => "Time,Value,ValueChange",
            ExportHeader::Temperature => "Time,Temperature,Temperature Change",
        }
    }
}

/// Formatting choices for an export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Decimal places for the smoothed value column
    pub precision: usize,
    /// Decimal places for the rate-of-change column
    pub change_precision: usize,
    pub header: ExportHeader,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            precision: 2,
            change_precision: 4,
            header: ExportHeader::default(),
        }
    }
}

/// Format epoch milliseconds as `mm:ss.mmm` within the hour.
pub fn format_clock(timestamp_ms: i64) -> String {
    let within_hour = timestamp_ms.rem_euclid(MS_PER_HOUR);
    let minutes = within_hour / 60_000;
    let seconds = (within_hour / 1000) % 60;
    let millis = within_hour % 1000;
    format!("{minutes:02}:{seconds:02}.{millis:03}")
}

/// Serialize a smoothed and derivative series pair.
///
/// With no samples the result is the header alone.
pub fn export_series(
    smoothed: &[SmoothedPoint],
    derivative: &[DerivativePoint],
    options: &ExportOptions,
) -> String {
    let precision = options.precision;
    let change_precision = options.change_precision;
    let mut out = String::from(options.header.columns());
    for (i, point) in smoothed.iter().enumerate() {
        let change = derivative.get(i).map(|d| d.value).unwrap_or(0.0);
        out.push('\n');
        out.push_str(&format!(
            "{},{:.precision$},{:.change_precision$}",
            format_clock(point.timestamp),
            point.value,
            change,
        ));
    }
    out
}

/// Serializes session buffers with fixed options.
#[derive(Debug, Clone, Default)]
pub struct Exporter {
    options: ExportOptions,
}

impl Exporter {
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    pub fn export(&self, buffer: &SeriesBuffer) -> String {
        export_series(buffer.smoothed(), buffer.derivative(), &self.options)
    }
}

/// Default export file name for a session stopped at `at`.
pub fn default_file_name(at: DateTime<Utc>) -> String {
    format!("session_{}.csv", at.format("%Y%m%d_%H%M%S"))
}

/// Write an export blob, creating parent directories as needed.
pub fn write_export(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, contents)
}
