//! Transmission Sequencer
//!
//! One state machine instance owns the control line and the radio's mode for
//! the duration of a transmission:
//!
//! ```text
//! Idle → Preparing → Keyed → Completing → Idle
//!            │          │
//!            └──────────┴──→ Aborting ──→ Idle
//! ```
//!
//! `submit` is non-blocking: the transmission runs on a "keyer" worker
//! thread and its outcome comes back through a `TransmissionHandle`. A
//! request arriving while the machine is not `Idle` is rejected with `Busy`
//! before anything touches the radio. Cancel is a message on a channel that
//! the worker checks at every wait.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use super::completion::{cancelled_within, Completion, PlaybackDetector, PowerMeterDetector};
use super::events::{DebugLog, EventKind};
use super::mode_guard::{ModeGuard, ModeScope};
use super::ptt::{KeyState, PttGuard, PttLine};
use crate::civ::{self, CivAddress, CivCommand};
use crate::domain::{KeyerTiming, MemorySlot, Payload, RigError, RigResult, TransmissionRequest};
use crate::ports::{AudioPlayer, RadioControl, SharedControlLine, SharedRadio};

/// How often a missing rendered file is looked for
const RENDER_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    Idle,
    Preparing,
    Keyed,
    Completing,
    Aborting,
}

impl fmt::Display for SequencerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SequencerState::Idle => "Idle",
            SequencerState::Preparing => "Preparing",
            SequencerState::Keyed => "Keyed",
            SequencerState::Completing => "Completing",
            SequencerState::Aborting => "Aborting",
        })
    }
}

/// How a transmission ended
#[derive(Debug, Clone, PartialEq)]
pub enum TransmissionOutcome {
    Completed,
    Cancelled,
    Aborted(RigError),
}

impl fmt::Display for TransmissionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransmissionOutcome::Completed => f.write_str("completed"),
            TransmissionOutcome::Cancelled => f.write_str("cancelled"),
            TransmissionOutcome::Aborted(e) => write!(f, "aborted: {e}"),
        }
    }
}

/// Everything the sequencer needs to drive a transmission
pub struct SequencerParts {
    pub radio: SharedRadio,
    pub line: SharedControlLine,
    pub player: Arc<dyn AudioPlayer>,
    pub civ: CivAddress,
    pub timing: KeyerTiming,
    pub allow_unsupported_mode: bool,
    pub events: DebugLog,
}

struct Machine {
    state: SequencerState,
    cancel: Option<Sender<()>>,
}

struct Inner {
    machine: Mutex<Machine>,
    ptt: PttLine,
    modes: ModeGuard,
    meter: PowerMeterDetector,
    playback: PlaybackDetector,
    radio: SharedRadio,
    player: Arc<dyn AudioPlayer>,
    civ: CivAddress,
    timing: KeyerTiming,
    events: DebugLog,
}

/// Cheap to clone; clones drive the same machine.
#[derive(Clone)]
pub struct Sequencer {
    inner: Arc<Inner>,
}

impl Sequencer {
    pub fn new(parts: SequencerParts) -> Self {
        let SequencerParts {
            radio,
            line,
            player,
            civ,
            timing,
            allow_unsupported_mode,
            events,
        } = parts;

        let ptt = PttLine::new(line, events.clone());
        let modes = ModeGuard::new(radio.clone(), events.clone(), &timing, allow_unsupported_mode);
        let meter = PowerMeterDetector::new(radio.clone(), events.clone(), &timing);
        let playback = PlaybackDetector::new(events.clone(), &timing);

        Self {
            inner: Arc::new(Inner {
                machine: Mutex::new(Machine {
                    state: SequencerState::Idle,
                    cancel: None,
                }),
                ptt,
                modes,
                meter,
                playback,
                radio,
                player,
                civ,
                timing,
                events,
            }),
        }
    }

    /// Start a transmission on the keyer worker.
    ///
    /// Fails with `Busy`, without any radio or line activity, unless the
    /// machine is `Idle` and the transmitter is unkeyed.
    pub fn submit(&self, request: TransmissionRequest) -> RigResult<TransmissionHandle> {
        let cancel_rx = {
            let mut machine = self.inner.lock_machine();
            if machine.state != SequencerState::Idle || self.inner.ptt.is_keyed() {
                drop(machine);
                self.inner
                    .events
                    .info(format!("Rejected {request}: transmission in progress"));
                return Err(RigError::Busy);
            }
            let (cancel_tx, cancel_rx) = bounded(1);
            machine.state = SequencerState::Preparing;
            machine.cancel = Some(cancel_tx);
            cancel_rx
        };
        self.inner
            .events
            .push(EventKind::State, format!("Preparing {request}"));

        let (done_tx, done_rx) = bounded(1);
        let inner = Arc::clone(&self.inner);
        let worker = std::thread::Builder::new()
            .name("keyer".into())
            .spawn(move || {
                let outcome = inner.run(&request, &cancel_rx);
                let _ = done_tx.send(outcome);
            })
            .map_err(|e| {
                let mut machine = self.inner.lock_machine();
                machine.state = SequencerState::Idle;
                machine.cancel = None;
                RigError::ProcessFailure(format!("failed to start keyer worker: {e}"))
            })?;

        Ok(TransmissionHandle {
            outcome: done_rx,
            worker: Some(worker),
        })
    }

    /// Ask the running transmission to stop. Returns false when idle.
    pub fn cancel(&self) -> bool {
        let requested = {
            let machine = self.inner.lock_machine();
            machine.cancel.as_ref().map(|tx| tx.try_send(())).is_some()
        };
        if requested {
            self.inner.events.info("Cancel requested");
        }
        requested
    }

    pub fn state(&self) -> SequencerState {
        self.inner.lock_machine().state
    }

    pub fn is_idle(&self) -> bool {
        self.state() == SequencerState::Idle
    }

    /// Run `f` only if the machine is `Idle` and the line unkeyed, holding
    /// the machine lock so no transmission can start until `f` returns.
    ///
    /// `f` must not call back into the sequencer.
    pub fn with_idle<T>(&self, f: impl FnOnce() -> RigResult<T>) -> RigResult<T> {
        let machine = self.inner.lock_machine();
        if machine.state != SequencerState::Idle || self.inner.ptt.is_keyed() {
            return Err(RigError::Busy);
        }
        let result = f();
        drop(machine);
        result
    }

    pub fn key_state(&self) -> KeyState {
        self.inner.ptt.key_state()
    }

    pub fn events(&self) -> &DebugLog {
        &self.inner.events
    }

    /// Cancel anything in flight, wait up to `timeout` for the worker to
    /// reach `Idle`, then force PTT low regardless.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        self.cancel();
        let deadline = Instant::now() + timeout;
        while !self.is_idle() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        let idle = self.is_idle();
        if !idle {
            self.inner
                .events
                .error("Keyer did not stop in time, forcing PTT off");
        }
        self.inner.ptt.key_down();
        idle
    }
}

impl Inner {
    fn lock_machine(&self) -> MutexGuard<'_, Machine> {
        self.machine.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn radio(&self) -> MutexGuard<'_, Box<dyn RadioControl>> {
        self.radio.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: SequencerState) {
        self.lock_machine().state = state;
        self.events.push(EventKind::State, format!("State: {state}"));
    }

    fn run(&self, request: &TransmissionRequest, cancel: &Receiver<()>) -> TransmissionOutcome {
        let _idle = ReturnToIdle(self);
        let mut session = Session {
            inner: self,
            ptt: None,
            mode: None,
        };

        let result = session.drive(request, cancel);
        self.set_state(match result {
            Ok(Completion::Finished) => SequencerState::Completing,
            _ => SequencerState::Aborting,
        });
        session.close();

        match result {
            Ok(Completion::Finished) => {
                self.events
                    .push(EventKind::Completion, format!("Finished {request}"));
                TransmissionOutcome::Completed
            }
            Ok(Completion::Cancelled) => {
                self.events.info(format!("Cancelled {request}"));
                TransmissionOutcome::Cancelled
            }
            Err(e) => {
                self.events.error(format!("Aborted {request}: {e}"));
                TransmissionOutcome::Aborted(e)
            }
        }
    }

    /// Wait for a pre-rendered file that may still be being written.
    /// Returns false on cancel.
    fn wait_for_render(&self, audio: &Path, cancel: &Receiver<()>) -> RigResult<bool> {
        if audio.is_file() {
            return Ok(true);
        }
        self.events.info("TTS file not ready yet, waiting...");
        let deadline = Instant::now() + self.timing.render_wait();
        while Instant::now() < deadline {
            if cancelled_within(cancel, RENDER_POLL) {
                return Ok(false);
            }
            if audio.is_file() {
                return Ok(true);
            }
        }
        Err(RigError::Speech(format!(
            "rendered file {} still not available",
            audio.display()
        )))
    }

    fn write_civ(&self, command: CivCommand) -> RigResult<()> {
        let frame = civ::encode(&command, &self.civ);
        log::debug!("CI-V TX: {}", civ::format_frame(&frame));
        self.ptt.send(&frame)?;
        Ok(())
    }

    fn play_memory(&self, slot: MemorySlot, cancel: &Receiver<()>) -> RigResult<Completion> {
        self.write_civ(CivCommand::PlayVoiceMemory(slot))?;
        self.events.info(format!("{slot} CI-V command sent"));

        let result = self.meter.wait(cancel);
        if result != Ok(Completion::Finished) {
            match self.write_civ(CivCommand::StopVoiceMemory) {
                Ok(()) => self.events.info("Voice memory stop sent"),
                Err(e) => log::warn!("Voice memory stop failed: {e}"),
            }
        }
        result
    }

    fn play_speech(&self, audio: &Path, cancel: &Receiver<()>) -> RigResult<Completion> {
        self.events.info(format!("Playing: {}", audio.display()));
        let mut playback = self.player.play(audio)?;
        self.playback.wait(playback.as_mut(), cancel)
    }
}

/// What one transmission currently holds. Field order matters: on unwind
/// the PTT guard drops before the mode scope.
struct Session<'a> {
    inner: &'a Inner,
    ptt: Option<PttGuard<'a>>,
    mode: Option<ModeScope<'a>>,
}

impl<'a> Session<'a> {
    fn drive(&mut self, request: &TransmissionRequest, cancel: &Receiver<()>) -> RigResult<Completion> {
        let inner = self.inner;

        if let Some(audio) = request.audio_path() {
            if !inner.wait_for_render(audio, cancel)? {
                return Ok(Completion::Cancelled);
            }
        }

        if inner.radio().get_ptt()? {
            return Err(RigError::AlreadyTransmitting);
        }

        if request.requires_mode_switch() {
            self.mode = Some(inner.modes.scope()?);
        }

        if cancelled_within(cancel, Duration::ZERO) {
            return Ok(Completion::Cancelled);
        }

        self.ptt = Some(inner.ptt.acquire()?);
        inner.set_state(SequencerState::Keyed);

        if cancelled_within(cancel, inner.timing.key_settle()) {
            return Ok(Completion::Cancelled);
        }

        match &request.payload {
            Payload::Memory(slot) => inner.play_memory(*slot, cancel),
            Payload::Speech { audio, .. } => inner.play_speech(audio, cancel),
        }
    }

    /// Un-key, then restore the mode. PTT off is attempted even when the
    /// transmission never keyed.
    fn close(&mut self) {
        match self.ptt.take() {
            Some(guard) => guard.release(),
            None => self.inner.ptt.key_down(),
        }
        if let Some(scope) = self.mode.take() {
            // Failure is already recorded as a critical event
            let _ = scope.restore();
        }
    }
}

struct ReturnToIdle<'a>(&'a Inner);

impl Drop for ReturnToIdle<'_> {
    fn drop(&mut self) {
        {
            let mut machine = self.0.lock_machine();
            machine.state = SequencerState::Idle;
            machine.cancel = None;
        }
        self.0
            .events
            .push(EventKind::State, format!("State: {}", SequencerState::Idle));
    }
}

/// Result of a submitted transmission
#[derive(Debug)]
pub struct TransmissionHandle {
    outcome: Receiver<TransmissionOutcome>,
    worker: Option<JoinHandle<()>>,
}

impl TransmissionHandle {
    fn lost() -> TransmissionOutcome {
        TransmissionOutcome::Aborted(RigError::ProcessFailure(
            "keyer worker exited without an outcome".into(),
        ))
    }

    fn join(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }

    /// Block until the transmission ends.
    pub fn wait(mut self) -> TransmissionOutcome {
        let outcome = self.outcome.recv().unwrap_or_else(|_| Self::lost());
        self.join();
        outcome
    }

    /// Block up to `timeout`; `None` if still running.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Option<TransmissionOutcome> {
        match self.outcome.recv_timeout(timeout) {
            Ok(outcome) => {
                self.join();
                Some(outcome)
            }
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Self::lost()),
        }
    }

    /// Non-blocking check for the outcome
    pub fn try_outcome(&mut self) -> Option<TransmissionOutcome> {
        match self.outcome.try_recv() {
            Ok(outcome) => {
                self.join();
                Some(outcome)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Self::lost()),
        }
    }
}
