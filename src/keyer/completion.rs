//! Completion Detectors
//!
//! Memory playback has no process to wait on; we watch the radio's power
//! meter for RF to come up and then drop away. Synthesized speech finishes
//! when the player process exits. Both check the cancel channel at every
//! wait so a cancel is seen within one interval.

use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use super::events::{DebugLog, EventKind};
use crate::domain::{KeyerTiming, RigError, RigResult};
use crate::ports::{Playback, SharedRadio};

/// How a detector returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Finished,
    Cancelled,
}

/// Sleep up to `timeout`, waking early on cancel.
///
/// A disconnected sender counts as a cancel: nobody is left to stop us.
pub fn cancelled_within(cancel: &Receiver<()>, timeout: Duration) -> bool {
    match cancel.recv_timeout(timeout) {
        Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
        Err(RecvTimeoutError::Timeout) => false,
    }
}

/// What one power-meter reading means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeterStep {
    /// Still waiting for RF to appear
    Waiting,
    OnAir,
    /// RF was seen and has now dropped below the threshold
    Finished,
}

/// Rising-then-falling edge tracker for the power meter
#[derive(Debug, Clone)]
pub struct MeterEdge {
    threshold: f64,
    risen: bool,
    polls: u32,
}

impl MeterEdge {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            risen: false,
            polls: 0,
        }
    }

    pub fn observe(&mut self, reading: f64) -> MeterStep {
        self.polls += 1;
        if reading > self.threshold {
            self.risen = true;
            MeterStep::OnAir
        } else if self.risen {
            MeterStep::Finished
        } else {
            MeterStep::Waiting
        }
    }

    pub fn risen(&self) -> bool {
        self.risen
    }

    pub fn polls(&self) -> u32 {
        self.polls
    }
}

pub struct PowerMeterDetector {
    radio: SharedRadio,
    events: DebugLog,
    start_delay: Duration,
    interval: Duration,
    threshold: f64,
    max_polls: u32,
    rise_polls: u32,
}

impl PowerMeterDetector {
    pub fn new(radio: SharedRadio, events: DebugLog, timing: &KeyerTiming) -> Self {
        Self {
            radio,
            events,
            start_delay: timing.meter_start_delay(),
            interval: timing.meter_interval(),
            threshold: timing.meter_threshold,
            max_polls: timing.meter_max_polls,
            rise_polls: timing.meter_rise_polls,
        }
    }

    /// Block until RF has risen and fallen again, a bound is hit, or cancel.
    pub fn wait(&self, cancel: &Receiver<()>) -> RigResult<Completion> {
        if cancelled_within(cancel, self.start_delay) {
            return Ok(Completion::Cancelled);
        }

        let mut edge = MeterEdge::new(self.threshold);
        loop {
            if !edge.risen() && edge.polls() >= self.rise_polls {
                return Err(RigError::Timeout(format!(
                    "power meter never rose above {} in {} polls",
                    self.threshold, self.rise_polls
                )));
            }
            if edge.polls() >= self.max_polls {
                return Err(RigError::Timeout(format!(
                    "power meter still up after {} polls",
                    self.max_polls
                )));
            }

            let reading = self
                .radio
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .get_power_meter()?;
            log::debug!("Power meter: {reading}");

            if edge.observe(reading) == MeterStep::Finished {
                self.events.push(
                    EventKind::Completion,
                    format!("Power meter dropped to {reading}, playback finished"),
                );
                return Ok(Completion::Finished);
            }

            if cancelled_within(cancel, self.interval) {
                return Ok(Completion::Cancelled);
            }
        }
    }
}

pub struct PlaybackDetector {
    events: DebugLog,
    check: Duration,
    timeout: Duration,
}

impl PlaybackDetector {
    pub fn new(events: DebugLog, timing: &KeyerTiming) -> Self {
        Self {
            events,
            check: timing.playback_check(),
            timeout: timing.playback_timeout(),
        }
    }

    /// Block until the player exits. The player is terminated on cancel or
    /// timeout; a non-zero exit is a `ProcessFailure`.
    pub fn wait(&self, playback: &mut dyn Playback, cancel: &Receiver<()>) -> RigResult<Completion> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(exit) = playback.try_wait()? {
                if exit.success() {
                    self.events
                        .push(EventKind::Completion, "Playback finished");
                    return Ok(Completion::Finished);
                }
                let code = exit
                    .code
                    .map_or_else(|| "signal".to_string(), |c| c.to_string());
                return Err(RigError::ProcessFailure(format!(
                    "player exited with {code}: {}",
                    exit.stderr
                )));
            }

            if Instant::now() >= deadline {
                self.terminate(playback);
                return Err(RigError::Timeout(format!(
                    "playback still running after {:?}",
                    self.timeout
                )));
            }

            if cancelled_within(cancel, self.check) {
                self.terminate(playback);
                return Ok(Completion::Cancelled);
            }
        }
    }

    fn terminate(&self, playback: &mut dyn Playback) {
        match playback.terminate() {
            Ok(()) => self.events.info("Playback terminated"),
            Err(e) => self.events.error(format!("Failed to terminate playback: {e}")),
        }
    }
}
