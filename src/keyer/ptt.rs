//! PTT Line Controller
//!
//! The only code that raises or lowers the PTT line. `KeyState` is the
//! process-wide record of whether we are keyed; it is written here and
//! nowhere else.
//!
//! Keying is normally done through `PttLine::acquire`, which returns a
//! `PttGuard` that lowers PTT when dropped, so every exit path of a
//! transmission (completion, error, cancel, panic unwind) un-keys.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, MutexGuard};
use std::time::Duration;

use super::events::{DebugLog, EventKind};
use crate::domain::{RigError, RigResult};
use crate::ports::{ControlLine, SharedControlLine};

/// Backoff between attempts to lower PTT
const KEY_DOWN_RETRIES_MS: [u64; 3] = [0, 10, 50];

/// Whether the transmitter is currently keyed by us. Cheap to clone and read
/// from any thread.
#[derive(Debug, Clone, Default)]
pub struct KeyState(Arc<AtomicBool>);

impl KeyState {
    pub fn is_keyed(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn set(&self, keyed: bool) -> bool {
        self.0.swap(keyed, Ordering::SeqCst)
    }
}

pub struct PttLine {
    line: SharedControlLine,
    key_state: KeyState,
    events: DebugLog,
}

impl PttLine {
    /// Take over the control line, driving PTT and AUX low.
    pub fn new(line: SharedControlLine, events: DebugLog) -> Self {
        let ptt = Self {
            line,
            key_state: KeyState::default(),
            events,
        };
        {
            let mut line = ptt.lock_line();
            if let Err(e) = line.set_ptt(false).and_then(|()| line.set_aux(false)) {
                log::warn!("Could not drive control line low at startup: {e}");
            }
        }
        ptt
    }

    fn lock_line(&self) -> MutexGuard<'_, Box<dyn ControlLine>> {
        self.line.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn key_state(&self) -> KeyState {
        self.key_state.clone()
    }

    pub fn is_keyed(&self) -> bool {
        self.key_state.is_keyed()
    }

    /// Write a command frame down the same serial line
    pub fn send(&self, frame: &[u8]) -> RigResult<usize> {
        self.lock_line().write(frame)
    }

    /// Assert PTT. A no-op (logged) when already keyed.
    pub fn key_up(&self) -> RigResult<()> {
        if self.is_keyed() {
            self.events.push(EventKind::KeyUp, "PTT already ON");
            return Ok(());
        }

        let result = {
            let mut line = self.lock_line();
            line.set_aux(false).and_then(|()| line.set_ptt(true))
        };

        match result {
            Ok(()) => {
                self.key_state.set(true);
                self.events.push(EventKind::KeyUp, "PTT ON (RTS HIGH)");
                Ok(())
            }
            Err(e) => {
                // The line may have gone high before the error surfaced
                let _ = self.lock_line().set_ptt(false);
                self.events.error(format!("PTT ON failed: {e}"));
                Err(match e {
                    RigError::HardwareUnavailable(_) => e,
                    other => RigError::HardwareUnavailable(other.to_string()),
                })
            }
        }
    }

    /// Deassert PTT. Never fails: retries a few times, then records a
    /// critical event. KeyState is forced to false either way.
    pub fn key_down(&self) {
        let mut last_error = None;
        for delay_ms in KEY_DOWN_RETRIES_MS {
            if delay_ms > 0 {
                std::thread::sleep(Duration::from_millis(delay_ms));
            }
            match self.lock_line().set_ptt(false) {
                Ok(()) => {
                    last_error = None;
                    break;
                }
                Err(e) => last_error = Some(e),
            }
        }

        let was_keyed = self.key_state.set(false);
        match last_error {
            None if was_keyed => self.events.push(EventKind::KeyDown, "PTT OFF (RTS LOW)"),
            None => self.events.push(EventKind::KeyDown, "PTT already OFF"),
            Some(e) => self.events.error(format!(
                "CRITICAL: failed to lower PTT: {e}. Radio may still be transmitting!"
            )),
        }
    }

    /// Key up and return a guard that keys down when released or dropped.
    pub fn acquire(&self) -> RigResult<PttGuard<'_>> {
        self.key_up()?;
        Ok(PttGuard {
            ptt: self,
            released: false,
        })
    }
}

/// Held while the transmitter is keyed.
#[must_use = "dropping the guard un-keys immediately"]
pub struct PttGuard<'a> {
    ptt: &'a PttLine,
    released: bool,
}

impl PttGuard<'_> {
    pub fn release(mut self) {
        self.released = true;
        self.ptt.key_down();
    }
}

impl Drop for PttGuard<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.ptt.key_down();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::shared_line;
    use std::sync::Mutex;

    /// Records every signal write; fails them on demand
    #[derive(Clone, Default)]
    struct RecordingLine {
        calls: Arc<Mutex<Vec<String>>>,
        fail_ptt_up: bool,
        fail_ptt_down: Arc<AtomicBool>,
    }

    impl ControlLine for RecordingLine {
        fn set_ptt(&mut self, asserted: bool) -> RigResult<()> {
            self.calls.lock().unwrap().push(format!("ptt={asserted}"));
            if (asserted && self.fail_ptt_up) || (!asserted && self.fail_ptt_down.load(Ordering::SeqCst)) {
                return Err(RigError::HardwareUnavailable("unplugged".into()));
            }
            Ok(())
        }

        fn set_aux(&mut self, asserted: bool) -> RigResult<()> {
            self.calls.lock().unwrap().push(format!("aux={asserted}"));
            Ok(())
        }

        fn write(&mut self, data: &[u8]) -> RigResult<usize> {
            Ok(data.len())
        }

        fn is_connected(&self) -> bool {
            true
        }
    }

    fn ptt_with(line: RecordingLine) -> (PttLine, Arc<Mutex<Vec<String>>>, DebugLog) {
        let calls = line.calls.clone();
        let events = DebugLog::new();
        let ptt = PttLine::new(shared_line(Box::new(line)), events.clone());
        calls.lock().unwrap().clear();
        (ptt, calls, events)
    }

    #[test]
    fn startup_drives_both_lines_low() {
        let line = RecordingLine::default();
        let calls = line.calls.clone();
        let _ptt = PttLine::new(shared_line(Box::new(line)), DebugLog::new());
        assert_eq!(*calls.lock().unwrap(), vec!["ptt=false", "aux=false"]);
    }

    #[test]
    fn key_up_is_idempotent() {
        let (ptt, calls, _) = ptt_with(RecordingLine::default());
        ptt.key_up().unwrap();
        ptt.key_up().unwrap();
        assert!(ptt.is_keyed());
        let ups = calls.lock().unwrap().iter().filter(|c| *c == "ptt=true").count();
        assert_eq!(ups, 1);
    }

    #[test]
    fn key_up_failure_is_hardware_unavailable_and_not_keyed() {
        let (ptt, calls, events) = ptt_with(RecordingLine {
            fail_ptt_up: true,
            ..RecordingLine::default()
        });
        assert!(matches!(ptt.key_up(), Err(RigError::HardwareUnavailable(_))));
        assert!(!ptt.is_keyed());
        assert_eq!(calls.lock().unwrap().last().unwrap(), "ptt=false");
        assert_eq!(events.kinds(), vec![EventKind::Error]);
    }

    #[test]
    fn key_down_retries_and_forces_state() {
        let line = RecordingLine::default();
        let fail_down = line.fail_ptt_down.clone();
        let (ptt, calls, events) = ptt_with(line);
        ptt.key_up().unwrap();
        fail_down.store(true, Ordering::SeqCst);

        ptt.key_down();

        assert!(!ptt.is_keyed());
        let downs = calls.lock().unwrap().iter().filter(|c| *c == "ptt=false").count();
        assert_eq!(downs, KEY_DOWN_RETRIES_MS.len());
        assert_eq!(events.kinds().last(), Some(&EventKind::Error));
    }

    #[test]
    fn guard_keys_down_on_drop() {
        let (ptt, calls, _) = ptt_with(RecordingLine::default());
        {
            let _guard = ptt.acquire().unwrap();
            assert!(ptt.is_keyed());
        }
        assert!(!ptt.is_keyed());
        assert_eq!(calls.lock().unwrap().last().unwrap(), "ptt=false");
    }

    #[test]
    fn released_guard_keys_down_once() {
        let (ptt, calls, _) = ptt_with(RecordingLine::default());
        ptt.acquire().unwrap().release();
        let downs = calls.lock().unwrap().iter().filter(|c| *c == "ptt=false").count();
        assert_eq!(downs, 1);
    }
}
