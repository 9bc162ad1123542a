//! Sensor Telemetry - streaming processing for a live scalar sensor.
//!
//! Readings arrive one at a time from a wireless link. Each one is appended to
//! the session's raw series, the smoothed series is brought up to date with a
//! centered moving average, and one rate-of-change point is derived from the
//! two newest smoothed points. The result is rendered live and can be exported
//! as delimited text at any time after the session starts.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        Sensor Telemetry                          │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐            │
//! │  │   Source    │──▶│   Series    │──▶│  Smoothing  │            │
//! │  │ (link/sim)  │   │   Buffer    │   │ (centered)  │            │
//! │  └─────────────┘   └─────────────┘   └─────────────┘            │
//! │                                             │                    │
//! │                                             ▼                    │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐            │
//! │  │  Exporter   │◀──│   Session   │◀──│ Derivative  │            │
//! │  │   (CSV)     │   │             │──▶│    Sink     │            │
//! │  └─────────────┘   └─────────────┘   └─────────────┘            │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use sensor_telemetry::{collector, pipeline, stats};
//!
//! let stats = stats::create_shared_stats();
//! let handle = pipeline::Pipeline::spawn(
//!     pipeline::PipelineConfig::default(),
//!     Box::new(pipeline::ConsoleSink::new()),
//!     stats.clone(),
//! )
//! .expect("Failed to spawn pipeline");
//!
//! let source = collector::SimulatedSource::new(collector::SimulatedConfig::default());
//! let mut recorder = pipeline::Recorder::new(source, handle, stats);
//! recorder.start().expect("Failed to start session");
//!
//! // ... later
//! recorder.stop().expect("Failed to stop session");
//! let csv = recorder.export().expect("Pipeline closed");
//! ```

pub mod collector;
pub mod config;
pub mod core;
pub mod pipeline;
pub mod stats;

// Re-export key types at crate root for convenience
pub use collector::{
    decode_reading, FrameInput, FrameSource, LinkError, Sample, SampleError, SampleSource,
    SimulatedConfig, SimulatedSource, SourceEvent,
};
pub use config::{Config, ConfigError};
pub use crate::core::{
    centered_moving_average, DerivativePoint, ExportHeader, ExportOptions, SeriesBuffer,
    SeriesSummary, Session, SessionError, SessionSnapshot, SessionState, SmoothedPoint,
    SmoothingFilter, SmoothingStrategy,
};
pub use pipeline::{
    ConsoleSink, EndReason, Frame, NullSink, Pipeline, PipelineConfig, PipelineHandle,
    PresentationSink, Recorder,
};
pub use stats::{PipelineStats, SharedStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
