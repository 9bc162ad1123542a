//! Sample sources for the telemetry pipeline.
//!
//! A source owns the link to the sensor and delivers one [`SourceEvent`] per
//! notification. Pairing and discovery are left to the platform; the crate
//! ships a simulated source and a raw frame replayer.

pub mod frames;
pub mod simulated;
pub mod source;
pub mod types;

// Re-export commonly used types
pub use frames::{FrameInput, FrameSource};
pub use simulated::{SimulatedConfig, SimulatedSource};
pub use source::{LinkError, SampleSource};
pub use types::{decode_reading, encode_reading, Sample, SampleError, SourceEvent, FRAME_LEN};
