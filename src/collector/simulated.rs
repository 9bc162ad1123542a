//! A source that synthesizes a heating curve on a background thread.
//!
//! Useful when no hardware is attached: each reading is encoded to its wire
//! frame and decoded again, so the simulated path exercises the same checks as
//! a real link.

use crate::collector::source::{LinkError, SampleSource};
use crate::collector::types::{decode_reading, encode_reading, Sample, SourceEvent};
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Shape of the simulated curve.
#[derive(Debug, Clone)]
pub struct SimulatedConfig {
    /// Time between readings
    pub interval: Duration,
    /// Starting value
    pub ambient: f64,
    /// Value the curve approaches
    pub target: f64,
    /// Time constant of the approach, in seconds
    pub time_constant_secs: f64,
    /// Amplitude of the superimposed ripple
    pub ripple: f64,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            ambient: 22.0,
            target: 220.0,
            time_constant_secs: 240.0,
            ripple: 0.8,
        }
    }
}

impl SimulatedConfig {
    /// Value of the curve `elapsed_secs` after start.
    pub fn value_at(&self, elapsed_secs: f64) -> f64 {
        let approach = 1.0 - (-elapsed_secs / self.time_constant_secs).exp();
        let ripple = self.ripple * (elapsed_secs * 1.7).sin() * (elapsed_secs * 0.31).cos();
        self.ambient + (self.target - self.ambient) * approach + ripple
    }
}

/// Background-thread source producing [`SimulatedConfig`] readings.
pub struct SimulatedSource {
    config: SimulatedConfig,
    running: Arc<AtomicBool>,
    stop_tx: Option<Sender<()>>,
    thread_handle: Option<JoinHandle<()>>,
}

impl SimulatedSource {
    pub fn new(config: SimulatedConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            stop_tx: None,
            thread_handle: None,
        }
    }
}

impl SampleSource for SimulatedSource {
    fn name(&self) -> &str {
        "simulated"
    }

    fn start(&mut self, events: Sender<SourceEvent>) -> Result<(), LinkError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(LinkError::AlreadyConnected);
        }
        self.running.store(true, Ordering::SeqCst);

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let running = self.running.clone();
        let config = self.config.clone();

        let handle = thread::Builder::new()
            .name("simulated-source".into())
            .spawn(move || {
                let mut tick: u64 = 0;
                loop {
                    match stop_rx.recv_timeout(config.interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }

                    let elapsed = tick as f64 * config.interval.as_secs_f64();
                    let frame = encode_reading(config.value_at(elapsed));
                    let event = match decode_reading(&frame) {
                        Ok(value) => SourceEvent::Reading(Sample::now(value)),
                        Err(e) => SourceEvent::Rejected(e),
                    };
                    tick += 1;

                    if events.send(event).is_err() {
                        break;
                    }
                }
                running.store(false, Ordering::SeqCst);
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                LinkError::Io(e.to_string())
            })?;

        self.stop_tx = Some(stop_tx);
        self.thread_handle = Some(handle);
        tracing::info!(
            interval_ms = self.config.interval.as_millis() as u64,
            "simulated source started"
        );
        Ok(())
    }

    fn stop(&mut self) -> Result<(), LinkError> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.try_send(());
        }
        if let Some(handle) = self.thread_handle.take() {
            handle
                .join()
                .map_err(|_| LinkError::Io("simulated source thread panicked".to_string()))?;
            tracing::info!("simulated source stopped");
        }
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for SimulatedSource {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
