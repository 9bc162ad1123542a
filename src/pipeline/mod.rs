//! The event-driven side of the crate.
//!
//! A source delivers readings into a queue; one worker thread runs each
//! reading through the session and hands the result to a presentation sink.
//!
//! ```text
//! SampleSource ──▶ queue ──▶ Worker (Session: append → smooth → derive) ──▶ PresentationSink
//!                              ▲
//!         PipelineHandle ──────┘ start / stop / export / snapshot
//! ```

pub mod recorder;
pub mod sink;
pub mod worker;

// Re-export commonly used types
pub use recorder::Recorder;
pub use sink::{ConsoleSink, EndReason, Frame, NullSink, PresentationSink};
pub use worker::{Pipeline, PipelineConfig, PipelineHandle};
