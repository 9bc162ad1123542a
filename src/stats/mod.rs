//! Session counters for the telemetry pipeline.
//!
//! Tracks how many readings were accepted, dropped or degenerate, and how
//! many sessions and exports happened, so `sensor-telemetry status` can show
//! cumulative figures across runs.

pub mod counters;

// Re-export commonly used types
pub use counters::{
    create_shared_stats, create_shared_stats_with_persistence, PipelineStats, SharedStats,
    StatsSnapshot,
};
