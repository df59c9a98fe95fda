//! Radio control commands: status, frequency, mode, presets, split, VFO
//!
//! Reads go straight to the radio. Writes are refused with `Busy` while a
//! transmission is in flight, since the keyer owns the radio's mode until it
//! returns to idle.

use serde::Serialize;

use crate::adapters::serial_line::SerialPortFactory;
use crate::domain::{
    find_preset, BandPreset, Frequency, PresetKind, RigError, RigResult, SerialPortInfo, Vfo,
};
use crate::ports::{RadioControl, SerialFactory};
use crate::state::AppState;

/// Lock the radio and run `f` on it.
fn with_radio<T>(
    state: &AppState,
    f: impl FnOnce(&mut Box<dyn RadioControl>) -> RigResult<T>,
) -> Result<T, String> {
    let mut radio = state
        .radio
        .lock()
        .map_err(|_| "Radio state corrupted".to_string())?;
    f(&mut radio).map_err(|e| {
        if matches!(e, RigError::RadioUnavailable(_)) {
            log::warn!("flrig not reachable: {e}");
        }
        e.to_string()
    })
}

/// Like `with_radio`, but refused while the keyer is busy. The keyer
/// cannot start until the write has finished.
fn with_idle_radio<T>(
    state: &AppState,
    f: impl FnOnce(&mut Box<dyn RadioControl>) -> RigResult<T>,
) -> Result<T, String> {
    state
        .sequencer
        .with_idle(|| Ok(with_radio(state, f)))
        .map_err(|e| e.to_string())?
}

/// VFO B, reported only while split is on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VfoBStatus {
    pub frequency_hz: f64,
    pub mode: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadioStatus {
    pub frequency_hz: f64,
    pub mode: String,
    pub vfo: Vfo,
    pub split: bool,
    pub vfo_b: Option<VfoBStatus>,
}

impl std::fmt::Display for RadioStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} @ {} | VFO {} | Split {}",
            self.mode,
            Frequency::hz(self.frequency_hz),
            self.vfo,
            if self.split { "ON" } else { "OFF" }
        )?;
        if let Some(b) = &self.vfo_b {
            write!(f, "\n{} @ {} | VFO B", b.mode, Frequency::hz(b.frequency_hz))?;
        }
        Ok(())
    }
}

pub fn get_radio_status(state: &AppState) -> Result<RadioStatus, String> {
    with_radio(state, |r| {
        let frequency_hz = r.get_frequency()?.as_hz();
        let mode = r.get_mode()?;
        let vfo = r.get_vfo()?;
        let split = r.get_split()?;
        let vfo_b = if split {
            Some(VfoBStatus {
                frequency_hz: r.get_frequency_b()?.as_hz(),
                mode: r.get_mode_b()?,
            })
        } else {
            None
        };
        Ok(RadioStatus {
            frequency_hz,
            mode,
            vfo,
            split,
            vfo_b,
        })
    })
}

pub fn set_frequency(state: &AppState, freq_hz: f64) -> Result<(), String> {
    with_idle_radio(state, |r| r.set_frequency(Frequency::hz(freq_hz)))
}

pub fn set_mode(state: &AppState, mode: &str) -> Result<(), String> {
    let mode = mode.trim().to_uppercase();
    if mode.is_empty() {
        return Err("Mode cannot be empty".to_string());
    }
    with_idle_radio(state, |r| r.set_mode(&mode))
}

/// Tune one of the band preset buttons: frequency first, then mode.
pub fn tune_preset(state: &AppState, kind: PresetKind, band: &str) -> Result<BandPreset, String> {
    let preset = *find_preset(kind, band)
        .ok_or_else(|| format!("No {kind:?} preset for band '{band}'"))?;
    with_idle_radio(state, |r| {
        r.set_frequency(preset.frequency())?;
        r.set_mode(preset.mode)
    })?;
    state
        .events
        .info(format!("{} @ {}", preset.mode, preset.frequency()));
    Ok(preset)
}

/// Flip split on/off, returning the new setting
pub fn toggle_split(state: &AppState) -> Result<bool, String> {
    let on = with_idle_radio(state, |r| {
        let on = !r.get_split()?;
        r.set_split(on)?;
        Ok(on)
    })?;
    state
        .events
        .info(format!("Split mode: {}", if on { "ON" } else { "OFF" }));
    Ok(on)
}

/// Swap between VFO A and B, returning the now-active VFO
pub fn toggle_vfo(state: &AppState) -> Result<Vfo, String> {
    let vfo = with_idle_radio(state, |r| {
        let vfo = r.get_vfo()?.toggled();
        r.set_vfo(vfo)?;
        Ok(vfo)
    })?;
    state.events.info(format!("Switched to VFO {vfo}"));
    Ok(vfo)
}

pub fn copy_vfo_a_to_b(state: &AppState) -> Result<(), String> {
    with_idle_radio(state, |r| r.copy_vfo_a_to_b())?;
    state.events.info("VFO A → B copied");
    Ok(())
}

pub fn list_serial_ports() -> Result<Vec<SerialPortInfo>, String> {
    SerialPortFactory::list_ports().map_err(|e| e.to_string())
}
