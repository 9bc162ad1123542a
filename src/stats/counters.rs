//! Atomic pipeline counters with optional JSON persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters updated by the pipeline worker and read by the CLI.
#[derive(Debug)]
pub struct PipelineStats {
    /// Readings appended to a session
    samples_accepted: AtomicU64,
    /// Readings dropped as invalid
    samples_rejected: AtomicU64,
    /// Derivative points with a zero time delta
    degenerate_derivatives: AtomicU64,
    /// Sessions started
    sessions_started: AtomicU64,
    /// Links that failed or dropped
    link_failures: AtomicU64,
    /// Export blobs produced
    exports_written: AtomicU64,
    /// When this process began counting
    started_at: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl PipelineStats {
    /// Create empty counters without persistence.
    pub fn new() -> Self {
        Self {
            samples_accepted: AtomicU64::new(0),
            samples_rejected: AtomicU64::new(0),
            degenerate_derivatives: AtomicU64::new(0),
            sessions_started: AtomicU64::new(0),
            link_failures: AtomicU64::new(0),
            exports_written: AtomicU64::new(0),
            started_at: Utc::now(),
            persist_path: None,
        }
    }

    /// Create counters that resume from, and save back to, `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut stats = Self::new();
        stats.persist_path = Some(path);

        if let Err(e) = stats.load() {
            tracing::warn!("Could not load previous pipeline stats: {e}");
        }

        stats
    }

    /// Record a reading appended to the session.
    pub fn record_sample_accepted(&self) {
        self.samples_accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a reading dropped as non-finite or malformed.
    pub fn record_sample_rejected(&self) {
        self.samples_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a derivative point emitted for a zero time delta.
    pub fn record_degenerate_derivative(&self) {
        self.degenerate_derivatives.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a session start.
    pub fn record_session_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a link failure on the source.
    pub fn record_link_failure(&self) {
        self.link_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an export request.
    pub fn record_export(&self) {
        self.exports_written.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current counter values.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            samples_accepted: self.samples_accepted.load(Ordering::Relaxed),
            samples_rejected: self.samples_rejected.load(Ordering::Relaxed),
            degenerate_derivatives: self.degenerate_derivatives.load(Ordering::Relaxed),
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            link_failures: self.link_failures.load(Ordering::Relaxed),
            exports_written: self.exports_written.load(Ordering::Relaxed),
            last_updated: Utc::now(),
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.snapshot();
        format!(
            "Pipeline Statistics:\n\
             - Samples accepted: {}\n\
             - Samples rejected: {}\n\
             - Zero-interval derivatives: {}\n\
             - Sessions started: {}\n\
             - Link failures: {}\n\
             - Exports written: {}\n\
             - Uptime: {} seconds",
            stats.samples_accepted,
            stats.samples_rejected,
            stats.degenerate_derivatives,
            stats.sessions_started,
            stats.link_failures,
            stats.exports_written,
            (Utc::now() - self.started_at).num_seconds()
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let json =
                serde_json::to_string_pretty(&self.snapshot()).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(persisted) = StatsSnapshot::read(path)? {
                self.samples_accepted
                    .store(persisted.samples_accepted, Ordering::Relaxed);
                self.samples_rejected
                    .store(persisted.samples_rejected, Ordering::Relaxed);
                self.degenerate_derivatives
                    .store(persisted.degenerate_derivatives, Ordering::Relaxed);
                self.sessions_started
                    .store(persisted.sessions_started, Ordering::Relaxed);
                self.link_failures
                    .store(persisted.link_failures, Ordering::Relaxed);
                self.exports_written
                    .store(persisted.exports_written, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.samples_accepted.store(0, Ordering::Relaxed);
        self.samples_rejected.store(0, Ordering::Relaxed);
        self.degenerate_derivatives.store(0, Ordering::Relaxed);
        self.sessions_started.store(0, Ordering::Relaxed);
        self.link_failures.store(0, Ordering::Relaxed);
        self.exports_written.store(0, Ordering::Relaxed);
    }
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters, also the persisted format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub samples_accepted: u64,
    pub samples_rejected: u64,
    pub degenerate_derivatives: u64,
    pub sessions_started: u64,
    pub link_failures: u64,
    pub exports_written: u64,
    pub last_updated: DateTime<Utc>,
}

impl StatsSnapshot {
    /// Read persisted counters; `None` if the file does not exist.
    pub fn read(path: &Path) -> Result<Option<Self>, std::io::Error> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(std::io::Error::other)
    }
}

/// Thread-safe shared counters.
pub type SharedStats = Arc<PipelineStats>;

pub fn create_shared_stats() -> SharedStats {
    Arc::new(PipelineStats::new())
}

pub fn create_shared_stats_with_persistence(path: PathBuf) -> SharedStats {
    Arc::new(PipelineStats::with_persistence(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting() {
        let stats = PipelineStats::new();
        stats.record_sample_accepted();
        stats.record_sample_accepted();
        stats.record_sample_rejected();
        stats.record_degenerate_derivative();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.samples_accepted, 2);
        assert_eq!(snapshot.samples_rejected, 1);
        assert_eq!(snapshot.degenerate_derivatives, 1);
    }

    #[test]
    fn test_reset() {
        let stats = PipelineStats::new();
        stats.record_session_started();
        stats.record_export();
        stats.reset();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.sessions_started, 0);
        assert_eq!(snapshot.exports_written, 0);
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");

        let stats = PipelineStats::with_persistence(path.clone());
        stats.record_sample_accepted();
        stats.record_link_failure();
        stats.save().unwrap();

        let reloaded = PipelineStats::with_persistence(path);
        let snapshot = reloaded.snapshot();
        assert_eq!(snapshot.samples_accepted, 1);
        assert_eq!(snapshot.link_failures, 1);
    }

    #[test]
    fn test_summary_format() {
        let summary = PipelineStats::new().summary();
        assert!(summary.contains("Samples accepted"));
        assert!(summary.contains("Exports written"));
    }
}
