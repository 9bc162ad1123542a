//! Sample types delivered by a sensor source.
//!
//! A reading arrives on the wire as an 8-byte little-endian IEEE-754 double and
//! is stamped with its wall-clock arrival time. Only finite values may enter the
//! pipeline.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Size in bytes of one encoded reading.
pub const FRAME_LEN: usize = 8;

/// One raw sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Arrival time in milliseconds since the Unix epoch
    pub timestamp: i64,
    /// Decoded reading
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// Stamp a reading with the current wall-clock time.
    pub fn now(value: f64) -> Self {
        Self {
            timestamp: Utc::now().timestamp_millis(),
            value,
        }
    }

    /// Check that the reading may enter the pipeline.
    pub fn validate(&self) -> Result<(), SampleError> {
        if self.value.is_finite() {
            Ok(())
        } else {
            Err(SampleError::NonFinite(self.value))
        }
    }
}

/// Reasons a reading is dropped before it reaches the series buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleError {
    /// Decoded value is NaN or infinite
    NonFinite(f64),
    /// Payload was not exactly one frame long
    BadFrame(usize),
}

impl std::fmt::Display for SampleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleError::NonFinite(v) => write!(f, "Invalid sample: non-finite value {v}"),
            SampleError::BadFrame(len) => {
                write!(f, "Invalid sample: expected {FRAME_LEN} bytes, got {len}")
            }
        }
    }
}

impl std::error::Error for SampleError {}

/// Decode one reading from its little-endian wire frame.
pub fn decode_reading(bytes: &[u8]) -> Result<f64, SampleError> {
    let frame: [u8; FRAME_LEN] = bytes
        .try_into()
        .map_err(|_| SampleError::BadFrame(bytes.len()))?;
    let value = f64::from_le_bytes(frame);
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SampleError::NonFinite(value))
    }
}

/// Encode a reading into its wire frame.
pub fn encode_reading(value: f64) -> [u8; FRAME_LEN] {
    value.to_le_bytes()
}

/// Notification delivered by a source, one per firing.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    /// A decoded, timestamped reading
    Reading(Sample),
    /// A payload that failed to decode
    Rejected(SampleError),
    /// The link dropped; the active session ends
    LinkLost(String),
}
