//! The narrow interface between the pipeline and whatever link delivers readings.

use crate::collector::types::SourceEvent;
use crossbeam_channel::Sender;

/// A collaborator that delivers readings, one event per firing.
///
/// Implementations must never deliver two events concurrently; sending
/// through a single channel is enough to guarantee that.
pub trait SampleSource: Send {
    /// Short human-readable name used in logs.
    fn name(&self) -> &str;

    /// Connect and begin delivering events into `events`.
    fn start(&mut self, events: Sender<SourceEvent>) -> Result<(), LinkError>;

    /// Stop delivering events. Calling this when not started is a no-op.
    fn stop(&mut self) -> Result<(), LinkError>;

    /// Whether the source is currently delivering.
    fn is_running(&self) -> bool;
}

/// Errors reported by a source's connect, notify or disconnect step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    AlreadyConnected,
    Io(String),
    Disconnected,
}

impl std::fmt::Display for LinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkError::AlreadyConnected => write!(f, "Source is already connected"),
            LinkError::Io(e) => write!(f, "Link IO error: {e}"),
            LinkError::Disconnected => write!(f, "Link is disconnected"),
        }
    }
}

impl std::error::Error for LinkError {}
