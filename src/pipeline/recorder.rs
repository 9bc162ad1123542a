//! Session control surface: one source feeding one pipeline.

use crate::collector::source::SampleSource;
use crate::core::session::{SessionError, SessionState};
use crate::pipeline::worker::PipelineHandle;
use crate::stats::SharedStats;
use uuid::Uuid;

/// Couples a [`SampleSource`] with a running pipeline.
pub struct Recorder {
    source: Box<dyn SampleSource>,
    pipeline: PipelineHandle,
    stats: SharedStats,
}

impl Recorder {
    pub fn new(
        source: impl SampleSource + 'static,
        pipeline: PipelineHandle,
        stats: SharedStats,
    ) -> Self {
        Self {
            source: Box::new(source),
            pipeline,
            stats,
        }
    }

    /// Connect the source and begin a new session.
    ///
    /// If the source fails to connect the pipeline stays idle and the previous
    /// session's series remain available for export.
    pub fn start(&mut self) -> Result<Uuid, SessionError> {
        self.pipeline.prepare()?;

        if let Err(e) = self.source.start(self.pipeline.source_sender()) {
            self.stats.record_link_failure();
            tracing::warn!(source = self.source.name(), "failed to start source: {e}");
            return Err(SessionError::LinkFailure(e));
        }

        match self.pipeline.start() {
            Ok(id) => {
                tracing::info!(source = self.source.name(), session = %id, "streaming");
                Ok(id)
            }
            Err(e) => {
                let _ = self.source.stop();
                Err(e)
            }
        }
    }

    /// Stop the source and the session. Safe to call at any time.
    ///
    /// The session is stopped even when the source reports a failure, which is
    /// then returned as [`SessionError::LinkFailure`].
    pub fn stop(&mut self) -> Result<(), SessionError> {
        let source_result = self.source.stop();
        self.pipeline.stop()?;
        source_result.map_err(|e| {
            self.stats.record_link_failure();
            SessionError::LinkFailure(e)
        })
    }

    /// Export the current (or last) session.
    pub fn export(&self) -> Result<String, SessionError> {
        self.pipeline.export()
    }

    pub fn is_streaming(&self) -> Result<bool, SessionError> {
        Ok(self.pipeline.state()? == SessionState::Streaming)
    }

    pub fn pipeline(&self) -> &PipelineHandle {
        &self.pipeline
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::source::LinkError;
    use crate::collector::types::{Sample, SourceEvent};
    use crate::pipeline::sink::NullSink;
    use crate::pipeline::worker::{Pipeline, PipelineConfig};
    use crate::stats::create_shared_stats;
    use crossbeam_channel::Sender;

    /// Emits a fixed list of readings on start.
    struct ScriptedSource {
        readings: Vec<Sample>,
        fail_start: bool,
        fail_stop: bool,
        running: bool,
    }

    impl ScriptedSource {
        fn new(values: &[f64]) -> Self {
            Self {
                readings: values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| Sample::new(i as i64 * 1000, *v))
                    .collect(),
                fail_start: false,
                fail_stop: false,
                running: false,
            }
        }
    }

    impl SampleSource for ScriptedSource {
        fn name(&self) -> &str {
            "scripted"
        }

        fn start(&mut self, events: Sender<SourceEvent>) -> Result<(), LinkError> {
            if self.fail_start {
                return Err(LinkError::Io("no device".to_string()));
            }
            for sample in &self.readings {
                events
                    .send(SourceEvent::Reading(*sample))
                    .map_err(|_| LinkError::Disconnected)?;
            }
            self.running = true;
            Ok(())
        }

        fn stop(&mut self) -> Result<(), LinkError> {
            self.running = false;
            if self.fail_stop {
                return Err(LinkError::Disconnected);
            }
            Ok(())
        }

        fn is_running(&self) -> bool {
            self.running
        }
    }

    fn recorder(source: ScriptedSource) -> (Recorder, SharedStats) {
        let stats = create_shared_stats();
        let pipeline =
            Pipeline::spawn(PipelineConfig::default(), Box::new(NullSink), stats.clone()).unwrap();
        (Recorder::new(source, pipeline, stats.clone()), stats)
    }

    #[test]
    fn test_start_stop_export() {
        let (mut recorder, _) = recorder(ScriptedSource::new(&[10.0, 10.0, 10.0]));
        recorder.start().unwrap();
        assert!(recorder.is_streaming().unwrap());
        recorder.stop().unwrap();
        assert!(!recorder.is_streaming().unwrap());

        let text = recorder.export().unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1..].iter().all(|l| l.ends_with(",10.00,0.0000")));
    }

    #[test]
    fn test_link_failure_leaves_session_idle() {
        let mut source = ScriptedSource::new(&[1.0]);
        source.fail_start = true;
        let (mut recorder, stats) = recorder(source);

        assert!(matches!(
            recorder.start(),
            Err(SessionError::LinkFailure(LinkError::Io(_)))
        ));
        assert!(!recorder.is_streaming().unwrap());
        assert_eq!(stats.snapshot().link_failures, 1);
        assert_eq!(stats.snapshot().sessions_started, 0);
    }

    #[test]
    fn test_stop_failure_still_stops_session() {
        let mut source = ScriptedSource::new(&[1.0, 2.0]);
        source.fail_stop = true;
        let (mut recorder, _) = recorder(source);
        recorder.start().unwrap();

        assert!(matches!(
            recorder.stop(),
            Err(SessionError::LinkFailure(LinkError::Disconnected))
        ));
        assert!(!recorder.is_streaming().unwrap());
    }

    #[test]
    fn test_stop_without_start_is_ok() {
        let (mut recorder, _) = recorder(ScriptedSource::new(&[]));
        assert!(recorder.stop().is_ok());
        assert_eq!(recorder.export().unwrap(), "Time,Value,ValueChange");
    }

    #[test]
    fn test_second_start_is_rejected() {
        let (mut recorder, _) = recorder(ScriptedSource::new(&[]));
        recorder.start().unwrap();
        assert_eq!(recorder.start(), Err(SessionError::AlreadyStreaming));
    }
}
