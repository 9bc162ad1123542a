//! Presentation sinks: whatever renders the live series.

use crate::collector::types::Sample;
use crate::core::buffer::{DerivativePoint, SmoothedPoint};
use crate::core::export::format_clock;
use uuid::Uuid;

/// The full current state handed to a sink after each arrival.
///
/// Series are borrowed from the session, so a sink that needs to keep them
/// past `render` must copy what it uses.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub session_id: Option<Uuid>,
    /// The raw reading that triggered this frame
    pub latest: Sample,
    pub smoothed: &'a [SmoothedPoint],
    pub derivative: &'a [DerivativePoint],
    /// Optional unit label for the readout
    pub unit: Option<&'a str>,
}

impl<'a> Frame<'a> {
    /// Text readout of the latest raw value, two decimal places.
    pub fn readout(&self) -> String {
        match self.unit {
            Some(unit) => format!("Current Value: {:.2} {unit}", self.latest.value),
            None => format!("Current Value: {:.2}", self.latest.value),
        }
    }

    pub fn latest_smoothed(&self) -> Option<&SmoothedPoint> {
        self.smoothed.last()
    }

    pub fn latest_change(&self) -> Option<&DerivativePoint> {
        self.derivative.last()
    }
}

/// Why a session stopped streaming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
    Stopped,
    LinkLost(String),
}

impl std::fmt::Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndReason::Stopped => write!(f, "stopped"),
            EndReason::LinkLost(reason) => write!(f, "link lost ({reason})"),
        }
    }
}

/// Receives frames from the pipeline worker thread.
pub trait PresentationSink: Send {
    fn render(&mut self, frame: &Frame<'_>);

    fn session_ended(&mut self, _reason: &EndReason) {}
}

/// Prints one line per arrival.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }

    /// The line printed for a frame.
    pub fn line(frame: &Frame<'_>) -> String {
        let smoothed = frame
            .latest_smoothed()
            .map(|p| format!("{:.2}", p.value))
            .unwrap_or_else(|| "-".to_string());
        let change = match frame.latest_change() {
            Some(d) if d.degenerate => "n/a".to_string(),
            Some(d) => format!("{:+.2}/s", d.value),
            None => "-".to_string(),
        };
        format!(
            "[{}] {} | smoothed {} | change {}",
            format_clock(frame.latest.timestamp),
            frame.readout(),
            smoothed,
            change
        )
    }
}

impl PresentationSink for ConsoleSink {
    fn render(&mut self, frame: &Frame<'_>) {
        println!("{}", Self::line(frame));
    }

    fn session_ended(&mut self, reason: &EndReason) {
        println!("Session {reason}");
    }
}

/// Discards frames.
#[derive(Debug, Default)]
pub struct NullSink;

impl PresentationSink for NullSink {
    fn render(&mut self, _frame: &Frame<'_>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame<'a>(
        smoothed: &'a [SmoothedPoint],
        derivative: &'a [DerivativePoint],
        unit: Option<&'a str>,
    ) -> Frame<'a> {
        Frame {
            session_id: None,
            latest: Sample::new(61_250, 23.456),
            smoothed,
            derivative,
            unit,
        }
    }

    #[test]
    fn test_readout_two_decimals() {
        assert_eq!(frame(&[], &[], None).readout(), "Current Value: 23.46");
        assert_eq!(
            frame(&[], &[], Some("°C")).readout(),
            "Current Value: 23.46 °C"
        );
    }

    #[test]
    fn test_console_line() {
        let smoothed = [SmoothedPoint {
            timestamp: 61_250,
            value: 23.0,
        }];
        let derivative = [DerivativePoint {
            timestamp: 61_250,
            value: 0.5,
            degenerate: false,
        }];
        let line = ConsoleSink::line(&frame(&smoothed, &derivative, None));
        assert_eq!(
            line,
            "[01:01.250] Current Value: 23.46 | smoothed 23.00 | change +0.50/s"
        );

        let first = ConsoleSink::line(&frame(&smoothed, &[], None));
        assert!(first.ends_with("change -"));
    }
}
