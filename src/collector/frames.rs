//! A source that replays raw 8-byte frames from a file, stdin or any reader.

use crate::collector::source::{LinkError, SampleSource};
use crate::collector::types::{decode_reading, Sample, SampleError, SourceEvent, FRAME_LEN};
use crossbeam_channel::Sender;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Where frames are read from.
pub enum FrameInput {
    Path(PathBuf),
    Stdin,
    Reader(Box<dyn Read + Send>),
}

impl std::fmt::Debug for FrameInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameInput::Path(p) => write!(f, "Path({p:?})"),
            FrameInput::Stdin => write!(f, "Stdin"),
            FrameInput::Reader(_) => write!(f, "Reader"),
        }
    }
}

/// Replays consecutive little-endian frames, optionally paced.
///
/// End of input is reported as a lost link, which ends the session.
pub struct FrameSource {
    input: Option<FrameInput>,
    pace: Option<Duration>,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl FrameSource {
    pub fn new(input: FrameInput) -> Self {
        Self {
            input: Some(input),
            pace: None,
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }
    }

    /// Wait `pace` between frames instead of delivering them back to back.
    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = Some(pace);
        self
    }

    fn open(input: FrameInput) -> Result<Box<dyn Read + Send>, LinkError> {
        match input {
            FrameInput::Path(path) => {
                let file = File::open(&path)
                    .map_err(|e| LinkError::Io(format!("{}: {e}", path.display())))?;
                Ok(Box::new(BufReader::new(file)))
            }
            FrameInput::Stdin => Ok(Box::new(std::io::stdin())),
            FrameInput::Reader(reader) => Ok(reader),
        }
    }
}

/// Read one frame; `Ok(0)` means clean end of input, a short count a truncated tail.
fn read_frame(reader: &mut dyn Read, frame: &mut [u8; FRAME_LEN]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < FRAME_LEN {
        match reader.read(&mut frame[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

impl SampleSource for FrameSource {
    fn name(&self) -> &str {
        "frames"
    }

    fn start(&mut self, events: Sender<SourceEvent>) -> Result<(), LinkError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(LinkError::AlreadyConnected);
        }
        let input = self
            .input
            .take()
            .ok_or_else(|| LinkError::Io("frame input already consumed".to_string()))?;
        let mut reader = Self::open(input)?;

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        let pace = self.pace;

        let handle = thread::Builder::new()
            .name("frame-source".into())
            .spawn(move || {
                let mut frame = [0u8; FRAME_LEN];
                let reason = loop {
                    if !running.load(Ordering::SeqCst) {
                        break None;
                    }
                    let event = match read_frame(reader.as_mut(), &mut frame) {
                        Ok(0) => break Some("end of input".to_string()),
                        Ok(FRAME_LEN) => match decode_reading(&frame) {
                            Ok(value) => SourceEvent::Reading(Sample::now(value)),
                            Err(e) => SourceEvent::Rejected(e),
                        },
                        Ok(n) => {
                            let _ = events.send(SourceEvent::Rejected(SampleError::BadFrame(n)));
                            break Some("truncated frame at end of input".to_string());
                        }
                        Err(e) => break Some(e.to_string()),
                    };
                    if events.send(event).is_err() {
                        break None;
                    }
                    if let Some(pace) = pace {
                        thread::sleep(pace);
                    }
                };
                if let Some(reason) = reason {
                    if running.load(Ordering::SeqCst) {
                        let _ = events.send(SourceEvent::LinkLost(reason));
                    }
                }
                running.store(false, Ordering::SeqCst);
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                LinkError::Io(e.to_string())
            })?;

        self.thread_handle = Some(handle);
        tracing::info!(pace = ?self.pace, "frame source started");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), LinkError> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            // A reader blocked on stdin cannot be interrupted; leave it detached.
            if handle.is_finished() {
                handle
                    .join()
                    .map_err(|_| LinkError::Io("frame source thread panicked".to_string()))?;
            }
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::types::encode_reading;
    use crossbeam_channel::unbounded;
    use std::io::Cursor;

    fn frames(values: &[f64]) -> Vec<u8> {
        values.iter().flat_map(|v| encode_reading(*v)).collect()
    }

    fn collect_until_lost(rx: &crossbeam_channel::Receiver<SourceEvent>) -> Vec<SourceEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.recv_timeout(Duration::from_secs(2)) {
            let lost = matches!(event, SourceEvent::LinkLost(_));
            out.push(event);
            if lost {
                break;
            }
        }
        out
    }

    #[test]
    fn test_replays_frames_then_reports_end() {
        let bytes = frames(&[1.0, 2.5, 4.0]);
        let (tx, rx) = unbounded();
        let mut source = FrameSource::new(FrameInput::Reader(Box::new(Cursor::new(bytes))));
        source.start(tx).unwrap();

        let events = collect_until_lost(&rx);
        let values: Vec<f64> = events
            .iter()
            .filter_map(|e| match e {
                SourceEvent::Reading(s) => Some(s.value),
                _ => None,
            })
            .collect();
        assert_eq!(values, vec![1.0, 2.5, 4.0]);
        assert!(matches!(events.last(), Some(SourceEvent::LinkLost(_))));
        source.stop().unwrap();
    }

    #[test]
    fn test_non_finite_and_truncated_frames_are_rejected() {
        let mut bytes = frames(&[1.0, f64::NAN]);
        bytes.extend_from_slice(&[0u8; 3]);
        let (tx, rx) = unbounded();
        let mut source = FrameSource::new(FrameInput::Reader(Box::new(Cursor::new(bytes))));
        source.start(tx).unwrap();

        let events = collect_until_lost(&rx);
        assert!(matches!(events[0], SourceEvent::Reading(_)));
        assert!(matches!(
            events[1],
            SourceEvent::Rejected(SampleError::NonFinite(_))
        ));
        assert_eq!(events[2], SourceEvent::Rejected(SampleError::BadFrame(3)));
        assert!(matches!(events[3], SourceEvent::LinkLost(_)));
    }

    #[test]
    fn test_drop_stops_reader_thread() {
        let bytes = frames(&[1.0; 1000]);
        let (tx, rx) = unbounded();
        let mut source = FrameSource::new(FrameInput::Reader(Box::new(Cursor::new(bytes))))
            .with_pace(Duration::from_millis(20));
        source.start(tx).unwrap();
        assert!(matches!(
            rx.recv_timeout(Duration::from_secs(2)),
            Ok(SourceEvent::Reading(_))
        ));
        drop(source);

        // The thread exits at its next frame and drops the only sender.
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        let mut seen = 0;
        loop {
            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(event) => {
                    assert!(!matches!(event, SourceEvent::LinkLost(_)));
                    seen += 1;
                }
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                    assert!(std::time::Instant::now() < deadline, "reader still running");
                }
            }
        }
        assert!(seen < 10);
    }

    #[test]
    fn test_missing_file_is_a_link_error() {
        let (tx, _rx) = unbounded();
        let mut source = FrameSource::new(FrameInput::Path(PathBuf::from(
            "/nonexistent/sensor-telemetry/frames.bin",
        )));
        assert!(matches!(source.start(tx), Err(LinkError::Io(_))));
        assert!(!source.is_running());
    }
}
