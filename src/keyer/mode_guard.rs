//! Mode Guard: temporary switch to the data-mode variant while keyed
//!
//! `enter` captures the operator's mode and switches to its -D variant;
//! `exit` puts the original back. `ModeScope` ties the two together so the
//! restore happens on every path out of a transmission.

use std::sync::MutexGuard;
use std::time::Duration;

use super::events::{DebugLog, EventKind};
use crate::domain::{data_mode_for, KeyerTiming, RadioModeSnapshot, RigError, RigResult};
use crate::ports::{RadioControl, SharedRadio};

pub struct ModeGuard {
    radio: SharedRadio,
    events: DebugLog,
    mode_settle: Duration,
    restore_settle: Duration,
    allow_unsupported: bool,
}

impl ModeGuard {
    pub fn new(
        radio: SharedRadio,
        events: DebugLog,
        timing: &KeyerTiming,
        allow_unsupported: bool,
    ) -> Self {
        Self {
            radio,
            events,
            mode_settle: timing.mode_settle(),
            restore_settle: timing.restore_settle(),
            allow_unsupported,
        }
    }

    fn radio(&self) -> MutexGuard<'_, Box<dyn RadioControl>> {
        self.radio.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Read the current mode from the radio, then `enter` it.
    pub fn capture(&self) -> RigResult<RadioModeSnapshot> {
        let original = self.radio().get_mode()?;
        self.events.info(format!("Current mode: {original}"));
        self.enter(&original)
    }

    /// Switch from `original` to its data-mode variant.
    ///
    /// Fails with `ModeSwitchUnsupported` when there is no variant, unless
    /// unsupported modes are allowed, in which case the snapshot carries no
    /// transmit mode and nothing is changed on the radio.
    pub fn enter(&self, original: &str) -> RigResult<RadioModeSnapshot> {
        let original = original.trim().to_string();
        match data_mode_for(&original) {
            Some(target) if target == original => {
                self.events
                    .info(format!("Already in {original}, no mode switch needed"));
                Ok(RadioModeSnapshot {
                    original_mode: original,
                    transmit_mode: Some(target),
                })
            }
            Some(target) => {
                let switched = self.radio().set_mode(&target);
                if let Err(e) = switched {
                    // The radio may have applied the change before failing
                    let _ = self.radio().set_mode(&original);
                    self.events
                        .error(format!("Mode switch to {target} failed: {e}"));
                    return Err(e);
                }
                self.events.push(
                    EventKind::ModeChange,
                    format!("Switched {original} → {target}"),
                );
                std::thread::sleep(self.mode_settle);
                Ok(RadioModeSnapshot {
                    original_mode: original,
                    transmit_mode: Some(target),
                })
            }
            None if self.allow_unsupported => {
                self.events.info(format!(
                    "Mode {original} has no data variant, keying without a mode switch"
                ));
                Ok(RadioModeSnapshot {
                    original_mode: original,
                    transmit_mode: None,
                })
            }
            None => {
                self.events
                    .error(format!("Mode {original} has no data-mode variant"));
                Err(RigError::ModeSwitchUnsupported(original))
            }
        }
    }

    /// Restore the mode captured in `snapshot`.
    ///
    /// A failed restore is recorded as a critical event and returned; it
    /// never affects the PTT line.
    pub fn exit(&self, snapshot: RadioModeSnapshot) -> RigResult<()> {
        let RadioModeSnapshot {
            original_mode,
            transmit_mode,
        } = snapshot;

        match transmit_mode {
            None => {
                self.events.info(format!(
                    "Mode snapshot discarded: no switch was made from {original_mode}"
                ));
                Ok(())
            }
            Some(tx) if tx == original_mode => {
                self.events
                    .info(format!("Mode left at {original_mode}, nothing to restore"));
                Ok(())
            }
            Some(_) => {
                let restored = self.radio().set_mode(&original_mode);
                match restored {
                    Ok(()) => {
                        self.events.push(
                            EventKind::ModeChange,
                            format!("Restored {original_mode} mode"),
                        );
                        std::thread::sleep(self.restore_settle);
                        Ok(())
                    }
                    Err(e) => {
                        self.events.error(format!(
                            "CRITICAL: failed to restore {original_mode} mode: {e}"
                        ));
                        Err(e)
                    }
                }
            }
        }
    }

    /// Capture and switch, returning a scope that restores on drop.
    pub fn scope(&self) -> RigResult<ModeScope<'_>> {
        let snapshot = self.capture()?;
        Ok(ModeScope {
            guard: self,
            snapshot: Some(snapshot),
        })
    }
}

/// A mode switch in effect. Restored by `restore` or on drop.
#[must_use = "dropping the scope restores the mode immediately"]
pub struct ModeScope<'a> {
    guard: &'a ModeGuard,
    snapshot: Option<RadioModeSnapshot>,
}

impl ModeScope<'_> {
    pub fn snapshot(&self) -> Option<&RadioModeSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn restore(mut self) -> RigResult<()> {
        match self.snapshot.take() {
            Some(snapshot) => self.guard.exit(snapshot),
            None => Ok(()),
        }
    }
}

impl Drop for ModeScope<'_> {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            let _ = self.guard.exit(snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Frequency, Vfo};
    use crate::ports::shared_radio;
    use std::sync::{Arc, Mutex};

    /// Radio fake recording mode writes
    struct ModeRadio {
        mode: String,
        writes: Arc<Mutex<Vec<String>>>,
        fail_set: bool,
    }

    impl RadioControl for ModeRadio {
        fn get_frequency(&mut self) -> RigResult<Frequency> {
            Ok(Frequency::mhz(14.15))
        }
        fn set_frequency(&mut self, _freq: Frequency) -> RigResult<()> {
            Ok(())
        }
        fn get_mode(&mut self) -> RigResult<String> {
            Ok(self.mode.clone())
        }
        fn set_mode(&mut self, mode: &str) -> RigResult<()> {
            self.writes.lock().unwrap().push(mode.to_string());
            if self.fail_set {
                return Err(RigError::RadioUnavailable("connection refused".into()));
            }
            self.mode = mode.to_string();
            Ok(())
        }
        fn get_split(&mut self) -> RigResult<bool> {
            Ok(false)
        }
        fn set_split(&mut self, _on: bool) -> RigResult<()> {
            Ok(())
        }
        fn get_vfo(&mut self) -> RigResult<Vfo> {
            Ok(Vfo::A)
        }
        fn set_vfo(&mut self, _vfo: Vfo) -> RigResult<()> {
            Ok(())
        }
        fn get_power_meter(&mut self) -> RigResult<f64> {
            Ok(0.0)
        }
        fn get_ptt(&mut self) -> RigResult<bool> {
            Ok(false)
        }
        fn get_frequency_b(&mut self) -> RigResult<Frequency> {
            Ok(Frequency::mhz(14.15))
        }
        fn get_mode_b(&mut self) -> RigResult<String> {
            Ok(self.mode.clone())
        }
        fn copy_vfo_a_to_b(&mut self) -> RigResult<()> {
            Ok(())
        }
    }

    fn guard(mode: &str, fail_set: bool, allow: bool) -> (ModeGuard, Arc<Mutex<Vec<String>>>) {
        let writes = Arc::new(Mutex::new(Vec::new()));
        let radio = shared_radio(Box::new(ModeRadio {
            mode: mode.to_string(),
            writes: writes.clone(),
            fail_set,
        }));
        let timing = KeyerTiming {
            mode_settle_ms: 0,
            restore_settle_ms: 0,
            ..KeyerTiming::default()
        };
        (ModeGuard::new(radio, DebugLog::new(), &timing, allow), writes)
    }

    #[test]
    fn usb_round_trip() {
        let (guard, writes) = guard("USB", false, false);
        let snapshot = guard.capture().unwrap();
        assert_eq!(snapshot.transmit_mode.as_deref(), Some("USB-D"));
        guard.exit(snapshot).unwrap();
        assert_eq!(*writes.lock().unwrap(), vec!["USB-D", "USB"]);
    }

    #[test]
    fn cw_is_unsupported_without_writes() {
        let (guard, writes) = guard("CW", false, false);
        assert_eq!(
            guard.capture(),
            Err(RigError::ModeSwitchUnsupported("CW".into()))
        );
        assert!(writes.lock().unwrap().is_empty());
    }

    #[test]
    fn cw_allowed_by_policy_makes_no_switch() {
        let (guard, writes) = guard("CW", false, true);
        let snapshot = guard.capture().unwrap();
        assert_eq!(snapshot.transmit_mode, None);
        guard.exit(snapshot).unwrap();
        assert!(writes.lock().unwrap().is_empty());
    }

    #[test]
    fn data_mode_passes_through() {
        let (guard, writes) = guard("LSB-D", false, false);
        let snapshot = guard.capture().unwrap();
        guard.exit(snapshot).unwrap();
        assert!(writes.lock().unwrap().is_empty());
    }

    #[test]
    fn failed_switch_attempts_restore() {
        let (guard, writes) = guard("LSB", true, false);
        assert!(matches!(guard.capture(), Err(RigError::RadioUnavailable(_))));
        assert_eq!(*writes.lock().unwrap(), vec!["LSB-D", "LSB"]);
    }

    #[test]
    fn scope_restores_on_drop() {
        let (guard, writes) = guard("USB", false, false);
        {
            let scope = guard.scope().unwrap();
            assert_eq!(scope.snapshot().unwrap().original_mode, "USB");
        }
        assert_eq!(*writes.lock().unwrap(), vec!["USB-D", "USB"]);
    }

    #[test]
    fn restored_scope_does_not_restore_twice() {
        let (guard, writes) = guard("USB", false, false);
        guard.scope().unwrap().restore().unwrap();
        assert_eq!(writes.lock().unwrap().len(), 2);
    }
}
