//! The single pipeline worker and its handle.
//!
//! Readings and control commands arrive on two channels consumed by one
//! thread, so no two arrivals are ever processed concurrently. Readings are
//! only taken off their channel while a session is streaming; while idle they
//! wait in the queue, so a source may begin delivering before `start` is
//! handled. While streaming, every queued reading is processed before the
//! next command, which makes `stop`/`export` observe all readings delivered
//! before they were issued.

use crate::collector::types::SourceEvent;
use crate::core::export::ExportOptions;
use crate::core::session::{Session, SessionError, SessionSnapshot, SessionState};
use crate::core::smoothing::SmoothingFilter;
use crate::core::summary::SeriesSummary;
use crate::pipeline::sink::{EndReason, Frame, PresentationSink};
use crate::stats::SharedStats;
use crossbeam_channel::{bounded, select, Receiver, Sender};
use std::thread::{self, JoinHandle};
use uuid::Uuid;

/// Settings for one pipeline worker.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub filter: SmoothingFilter,
    pub export: ExportOptions,
    /// Unit label passed through to the sink readout
    pub unit: Option<String>,
    /// Readings that may queue before sources block
    pub capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            filter: SmoothingFilter::default(),
            export: ExportOptions::default(),
            unit: None,
            capacity: 10_000,
        }
    }
}

/// Control messages for the worker.
enum Command {
    Prepare(Sender<Result<(), SessionError>>),
    Start(Sender<Result<Uuid, SessionError>>),
    Stop(Sender<bool>),
    /// `None` uses the session's configured export options
    Export(Option<ExportOptions>, Sender<String>),
    Snapshot(Sender<SessionSnapshot>),
    Summary(Sender<Option<SeriesSummary>>),
    State(Sender<SessionState>),
    Shutdown,
}

struct Worker {
    session: Session,
    sink: Box<dyn PresentationSink>,
    stats: SharedStats,
    unit: Option<String>,
    source_rx: Receiver<SourceEvent>,
    // Held so the source channel never reports disconnection to `select!`.
    _source_tx: Sender<SourceEvent>,
}

impl Worker {
    fn run(mut self, control_rx: Receiver<Command>) {
        tracing::debug!("pipeline worker running");
        let source_rx = self.source_rx.clone();
        loop {
            let keep_running = if self.session.is_streaming() {
                select! {
                    recv(control_rx) -> msg => match msg {
                        Ok(command) => {
                            self.drain_source();
                            self.handle_command(command)
                        }
                        Err(_) => false,
                    },
                    recv(source_rx) -> msg => {
                        if let Ok(event) = msg {
                            self.handle_source(event);
                        }
                        true
                    }
                }
            } else {
                match control_rx.recv() {
                    Ok(command) => self.handle_command(command),
                    Err(_) => false,
                }
            };
            if !keep_running {
                break;
            }
        }
        self.end_session(EndReason::Stopped);
        tracing::debug!("pipeline worker exited");
    }

    fn drain_source(&mut self) {
        while self.session.is_streaming() {
            match self.source_rx.try_recv() {
                Ok(event) => self.handle_source(event),
                Err(_) => break,
            }
        }
    }

    /// Returns false when the worker should exit.
    fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Prepare(reply) => {
                let result = if self.session.is_streaming() {
                    Err(SessionError::AlreadyStreaming)
                } else {
                    let stale = self.source_rx.try_iter().count();
                    if stale > 0 {
                        tracing::debug!(stale, "discarded events queued while idle");
                    }
                    Ok(())
                };
                let _ = reply.send(result);
            }
            Command::Start(reply) => {
                let result = self.session.start();
                if result.is_ok() {
                    self.stats.record_session_started();
                }
                let _ = reply.send(result);
            }
            Command::Stop(reply) => {
                let was_streaming = self.end_session(EndReason::Stopped);
                let _ = reply.send(was_streaming);
            }
            Command::Export(options, reply) => {
                let text = match options {
                    Some(options) => self.session.export_with(&options),
                    None => self.session.export(),
                };
                self.stats.record_export();
                let _ = reply.send(text);
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.session.snapshot());
            }
            Command::Summary(reply) => {
                let _ = reply.send(SeriesSummary::from_buffer(self.session.buffer()));
            }
            Command::State(reply) => {
                let _ = reply.send(self.session.state());
            }
            Command::Shutdown => return false,
        }
        true
    }

    fn handle_source(&mut self, event: SourceEvent) {
        match event {
            SourceEvent::Reading(sample) => match self.session.ingest(sample) {
                Ok(update) => {
                    self.stats.record_sample_accepted();
                    if update.derivative.is_some_and(|d| d.degenerate) {
                        self.stats.record_degenerate_derivative();
                    }
                    let buffer = self.session.buffer();
                    let frame = Frame {
                        session_id: self.session.id(),
                        latest: update.sample,
                        smoothed: buffer.smoothed(),
                        derivative: buffer.derivative(),
                        unit: self.unit.as_deref(),
                    };
                    self.sink.render(&frame);
                }
                Err(SessionError::InvalidSample(e)) => {
                    self.stats.record_sample_rejected();
                    tracing::warn!("Dropped reading: {e}");
                }
                Err(SessionError::NotStreaming) => {
                    tracing::debug!(value = sample.value, "reading outside a session ignored");
                }
                Err(e) => tracing::warn!("Unexpected ingest error: {e}"),
            },
            SourceEvent::Rejected(e) => {
                self.stats.record_sample_rejected();
                tracing::warn!("Dropped reading: {e}");
            }
            SourceEvent::LinkLost(reason) => {
                if self.session.is_streaming() {
                    self.stats.record_link_failure();
                    tracing::warn!(%reason, "link lost, ending session");
                    self.end_session(EndReason::LinkLost(reason));
                }
            }
        }
    }

    /// Stop the session and tell the sink; returns whether one was streaming.
    fn end_session(&mut self, reason: EndReason) -> bool {
        if !self.session.is_streaming() {
            return false;
        }
        self.session.stop();
        self.sink.session_ended(&reason);
        true
    }
}

/// Spawns pipeline workers.
pub struct Pipeline;

impl Pipeline {
    /// Start a worker thread that owns a fresh, idle session.
    pub fn spawn(
        config: PipelineConfig,
        sink: Box<dyn PresentationSink>,
        stats: SharedStats,
    ) -> std::io::Result<PipelineHandle> {
        let (control_tx, control_rx) = bounded(64);
        let (source_tx, source_rx) = bounded(config.capacity.max(1));

        let worker = Worker {
            session: Session::new(config.filter, config.export),
            sink,
            stats,
            unit: config.unit,
            source_rx,
            _source_tx: source_tx.clone(),
        };

        let thread = thread::Builder::new()
            .name("telemetry-pipeline".into())
            .spawn(move || worker.run(control_rx))?;

        Ok(PipelineHandle {
            control: control_tx,
            source: source_tx,
            thread: Some(thread),
        })
    }
}

/// Synchronous control surface for a running worker.
pub struct PipelineHandle {
    control: Sender<Command>,
    source: Sender<SourceEvent>,
    thread: Option<JoinHandle<()>>,
}

impl PipelineHandle {
    /// Sender for a source to deliver readings into.
    pub fn source_sender(&self) -> Sender<SourceEvent> {
        self.source.clone()
    }

    fn request<T>(&self, make: impl FnOnce(Sender<T>) -> Command) -> Result<T, SessionError> {
        let (reply_tx, reply_rx) = bounded(1);
        self.control
            .send(make(reply_tx))
            .map_err(|_| SessionError::PipelineClosed)?;
        reply_rx.recv().map_err(|_| SessionError::PipelineClosed)
    }

    /// Discard anything queued while idle, ahead of connecting a new source.
    ///
    /// Fails if a session is streaming.
    pub fn prepare(&self) -> Result<(), SessionError> {
        self.request(Command::Prepare)?
    }

    /// Begin a new session; fails if one is already streaming.
    pub fn start(&self) -> Result<Uuid, SessionError> {
        self.request(Command::Start)?
    }

    /// Stop the session if one is streaming; returns whether one was.
    pub fn stop(&self) -> Result<bool, SessionError> {
        self.request(Command::Stop)
    }

    pub fn export(&self) -> Result<String, SessionError> {
        self.request(|reply| Command::Export(None, reply))
    }

    /// Export with formatting other than the pipeline's configured options.
    pub fn export_with(&self, options: ExportOptions) -> Result<String, SessionError> {
        self.request(|reply| Command::Export(Some(options), reply))
    }

    pub fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(Command::Snapshot)
    }

    pub fn summary(&self) -> Result<Option<SeriesSummary>, SessionError> {
        self.request(Command::Summary)
    }

    pub fn state(&self) -> Result<SessionState, SessionError> {
        self.request(Command::State)
    }

    /// Stop the worker and wait for it to exit.
    pub fn shutdown(mut self) {
        self.join();
    }

    fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.control.send(Command::Shutdown);
            if thread.join().is_err() {
                tracing::error!("pipeline worker panicked");
            }
        }
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        self.join();
    }
}
