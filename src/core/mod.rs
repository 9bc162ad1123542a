//! Core telemetry processing.
//!
//! This module contains:
//! - Series storage for the active session
//! - Centered moving-average smoothing
//! - Rate-of-change estimation
//! - Delimited text export
//! - The session lifecycle tying them together

pub mod buffer;
pub mod derivative;
pub mod export;
pub mod session;
pub mod smoothing;
pub mod summary;

// Re-export commonly used types
pub use buffer::{DerivativePoint, SeriesBuffer, SmoothedPoint};
pub use derivative::{rate_of_change, DerivativeEstimator};
pub use export::{
    default_file_name, export_series, format_clock, write_export, ExportHeader, ExportOptions,
    Exporter,
};
pub use session::{Session, SessionError, SessionSnapshot, SessionState, Update};
pub use smoothing::{
    centered_moving_average, SmoothingFilter, SmoothingStrategy, DEFAULT_WINDOW_RADIUS,
};
pub use summary::SeriesSummary;
