//! Session lifecycle: `Idle → Streaming → Idle`.
//!
//! A session owns its three series. Starting a new session is the only thing
//! that discards the previous one's data; stopping keeps everything available
//! for export.

use crate::collector::source::LinkError;
use crate::collector::types::{Sample, SampleError};
use crate::core::buffer::{DerivativePoint, SeriesBuffer, SmoothedPoint};
use crate::core::derivative::DerivativeEstimator;
use crate::core::export::{export_series, ExportOptions, Exporter};
use crate::core::smoothing::SmoothingFilter;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Streaming,
}

/// Errors surfaced by the session control surface.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// `start` while a session is streaming
    AlreadyStreaming,
    /// A sample arrived while idle
    NotStreaming,
    /// The sample was dropped and the session continues
    InvalidSample(SampleError),
    /// The source failed to connect, notify or disconnect
    LinkFailure(LinkError),
    /// The pipeline worker is no longer running
    PipelineClosed,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::AlreadyStreaming => write!(f, "A session is already streaming"),
            SessionError::NotStreaming => write!(f, "No session is streaming"),
            SessionError::InvalidSample(e) => write!(f, "{e}"),
            SessionError::LinkFailure(e) => write!(f, "Link failure: {e}"),
            SessionError::PipelineClosed => write!(f, "Pipeline worker has shut down"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<SampleError> for SessionError {
    fn from(e: SampleError) -> Self {
        SessionError::InvalidSample(e)
    }
}

impl From<LinkError> for SessionError {
    fn from(e: LinkError) -> Self {
        SessionError::LinkFailure(e)
    }
}

/// What one accepted arrival changed at the tail of the series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Update {
    pub sample: Sample,
    pub smoothed: SmoothedPoint,
    pub derivative: Option<DerivativePoint>,
}

/// Owned copy of a session's series, safe to hand to another thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: Option<Uuid>,
    pub state: SessionState,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub raw: Vec<Sample>,
    pub smoothed: Vec<SmoothedPoint>,
    pub derivative: Vec<DerivativePoint>,
}

/// One streaming session and its derived series.
#[derive(Debug)]
pub struct Session {
    id: Option<Uuid>,
    state: SessionState,
    buffer: SeriesBuffer,
    filter: SmoothingFilter,
    estimator: DerivativeEstimator,
    exporter: Exporter,
    started_at: Option<DateTime<Utc>>,
    stopped_at: Option<DateTime<Utc>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SmoothingFilter::default(), ExportOptions::default())
    }
}

impl Session {
    pub fn new(filter: SmoothingFilter, export: ExportOptions) -> Self {
        Self {
            id: None,
            state: SessionState::Idle,
            buffer: SeriesBuffer::new(),
            filter,
            estimator: DerivativeEstimator::new(),
            exporter: Exporter::new(export),
            started_at: None,
            stopped_at: None,
        }
    }

    /// Begin a new session, discarding the previous one's series.
    pub fn start(&mut self) -> Result<Uuid, SessionError> {
        if self.state == SessionState::Streaming {
            return Err(SessionError::AlreadyStreaming);
        }
        self.buffer.reset();
        self.estimator.reset();

        let id = Uuid::new_v4();
        self.id = Some(id);
        self.state = SessionState::Streaming;
        self.started_at = Some(Utc::now());
        self.stopped_at = None;
        tracing::info!(session = %id, "session started");
        Ok(id)
    }

    /// End the current session. Safe to call at any time; series are retained.
    pub fn stop(&mut self) {
        if self.state == SessionState::Streaming {
            self.state = SessionState::Idle;
            self.stopped_at = Some(Utc::now());
            tracing::info!(
                session = ?self.id,
                samples = self.buffer.len(),
                "session stopped"
            );
        }
    }

    /// Run one arrival through append, smoothing and derivative estimation.
    pub fn ingest(&mut self, sample: Sample) -> Result<Update, SessionError> {
        if self.state != SessionState::Streaming {
            return Err(SessionError::NotStreaming);
        }
        self.buffer.append(sample)?;

        let (raw, smoothed, derivative) = self.buffer.parts_mut();
        self.filter.recompute(raw, smoothed);
        let change = self.estimator.update(&smoothed[..], derivative);

        let tail = smoothed[smoothed.len() - 1];
        Ok(Update {
            sample,
            smoothed: tail,
            derivative: change,
        })
    }

    /// Delimited text export; the header alone when nothing was recorded.
    pub fn export(&self) -> String {
        self.exporter.export(&self.buffer)
    }

    /// Export with one-off formatting instead of the session's own options.
    pub fn export_with(&self, options: &ExportOptions) -> String {
        export_series(self.buffer.smoothed(), self.buffer.derivative(), options)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            state: self.state,
            started_at: self.started_at,
            stopped_at: self.stopped_at,
            raw: self.buffer.all().to_vec(),
            smoothed: self.buffer.smoothed().to_vec(),
            derivative: self.buffer.derivative().to_vec(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_streaming(&self) -> bool {
        self.state == SessionState::Streaming
    }

    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    pub fn buffer(&self) -> &SeriesBuffer {
        &self.buffer
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn stopped_at(&self) -> Option<DateTime<Utc>> {
        self.stopped_at
    }

    pub fn degenerate_count(&self) -> u64 {
        self.estimator.degenerate_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::export::ExportHeader;
    use crate::core::smoothing::SmoothingStrategy;

    fn session(radius: usize) -> Session {
        Session::new(
            SmoothingFilter::new(radius, SmoothingStrategy::Incremental),
            ExportOptions::default(),
        )
    }

    #[test]
    fn test_ingest_requires_streaming() {
        let mut s = session(2);
        assert_eq!(
            s.ingest(Sample::new(0, 1.0)),
            Err(SessionError::NotStreaming)
        );
        s.start().unwrap();
        s.stop();
        assert_eq!(
            s.ingest(Sample::new(0, 1.0)),
            Err(SessionError::NotStreaming)
        );
    }

    #[test]
    fn test_start_twice_fails() {
        let mut s = session(2);
        s.start().unwrap();
        assert_eq!(s.start(), Err(SessionError::AlreadyStreaming));
        assert!(s.is_streaming());
    }

    #[test]
    fn test_stop_is_safe_without_start() {
        let mut s = session(2);
        s.stop();
        s.stop();
        assert_eq!(s.state(), SessionState::Idle);
        assert!(s.stopped_at().is_none());
    }

    #[test]
    fn test_lengths_track_arrivals() {
        let mut s = session(3);
        s.start().unwrap();
        for i in 0..10 {
            let update = s.ingest(Sample::new(i * 250, i as f64)).unwrap();
            assert_eq!(update.derivative.is_some(), i > 0);
            let buffer = s.buffer();
            assert_eq!(buffer.smoothed().len(), buffer.all().len());
            assert_eq!(buffer.derivative().len(), buffer.all().len() - 1);
        }
    }

    #[test]
    fn test_invalid_sample_is_dropped() {
        let mut s = session(2);
        s.start().unwrap();
        s.ingest(Sample::new(0, 1.0)).unwrap();
        let err = s.ingest(Sample::new(1, f64::NAN)).unwrap_err();
        assert!(matches!(err, SessionError::InvalidSample(_)));
        assert_eq!(s.buffer().len(), 1);
        assert!(s.is_streaming());
    }

    #[test]
    fn test_data_survives_stop_and_clears_on_restart() {
        let mut s = session(2);
        let first = s.start().unwrap();
        s.ingest(Sample::new(0, 1.0)).unwrap();
        s.ingest(Sample::new(1000, 2.0)).unwrap();
        s.stop();
        assert_eq!(s.buffer().len(), 2);
        assert_eq!(s.export().lines().count(), 3);

        let second = s.start().unwrap();
        assert_ne!(first, second);
        assert!(s.buffer().all().is_empty());
        assert!(s.buffer().smoothed().is_empty());
        assert!(s.buffer().derivative().is_empty());
        assert_eq!(s.export(), "Time,Value,ValueChange");
    }

    #[test]
    fn test_repeated_timestamp_counts_degenerate() {
        let mut s = session(1);
        s.start().unwrap();
        s.ingest(Sample::new(5000, 1.0)).unwrap();
        let update = s.ingest(Sample::new(5000, 3.0)).unwrap();
        let change = update.derivative.unwrap();
        assert!(change.degenerate);
        assert_eq!(s.degenerate_count(), 1);
    }

    #[test]
    fn test_export_with_overrides_formatting() {
        let mut s = session(0);
        s.start().unwrap();
        s.ingest(Sample::new(0, 1.0)).unwrap();
        s.ingest(Sample::new(1000, 1.5)).unwrap();

        let options = ExportOptions {
            precision: 1,
            change_precision: 2,
            header: ExportHeader::Temperature,
        };
        assert_eq!(
            s.export_with(&options),
            "Time,Temperature,Temperature Change\n00:00.000,1.0,0.50\n00:01.000,1.5,0.00"
        );
        assert!(s.export().starts_with("Time,Value,ValueChange\n"));
    }

    #[test]
    fn test_huge_window_does_not_panic() {
        let mut s = Session::new(
            SmoothingFilter::new(usize::MAX, SmoothingStrategy::BruteForce),
            ExportOptions::default(),
        );
        s.start().unwrap();
        s.ingest(Sample::new(0, 1.0)).unwrap();
        let update = s.ingest(Sample::new(1000, 3.0)).unwrap();
        assert_eq!(update.smoothed.value, 2.0);
        assert!(s.buffer().smoothed().iter().all(|p| p.value == 2.0));
    }

    #[test]
    fn test_snapshot_is_owned_copy() {
        let mut s = session(1);
        s.start().unwrap();
        s.ingest(Sample::new(0, 4.0)).unwrap();
        let snapshot = s.snapshot();
        s.ingest(Sample::new(1000, 6.0)).unwrap();

        assert_eq!(snapshot.raw.len(), 1);
        assert_eq!(snapshot.state, SessionState::Streaming);
        assert_eq!(s.snapshot().raw.len(), 2);
    }
}
