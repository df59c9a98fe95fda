//! Mock radio adapter for development and testing without hardware.
//!
//! Activate by setting MOCK_RADIO=1 in the environment (or `--mock`):
//!
//!   MOCK_RADIO=1 RUST_LOG=rigkey_lib=info rigkey console
//!
//! Every call is logged at INFO level so you can verify exactly what would
//! be sent to flrig and down the serial line. The radio and the control line
//! share one `MockRig` so a CI-V play frame makes the power meter rise for
//! a couple of seconds, like a real voice memory playing out.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::civ::{CMD_VOICE_TX, PREAMBLE};
use crate::domain::{is_amateur_frequency, Frequency, RigError, RigResult, Vfo};
use crate::ports::{ControlLine, RadioControl};

/// Default frequency: 20m SSB calling frequency
const DEFAULT_FREQ_HZ: f64 = 14_150_000.0;
const DEFAULT_MODE: &str = "USB";
/// How long a simulated voice memory keeps RF on the meter
const MEMORY_PLAYBACK: Duration = Duration::from_millis(2_000);
const METER_ON_AIR: f64 = 42.0;

#[derive(Debug)]
struct RigModel {
    vfo_a: f64,
    vfo_b: f64,
    mode_a: String,
    mode_b: String,
    split: bool,
    active: Vfo,
    rts: bool,
    dtr: bool,
    memory_started: Option<Instant>,
}

/// Simulated radio state shared by `MockRadio` and `MockControlLine`
#[derive(Debug, Clone)]
pub struct MockRig {
    model: Arc<Mutex<RigModel>>,
}

impl MockRig {
    pub fn new() -> Self {
        log::info!(
            "[MOCK RADIO] Initialized at {:.3} MHz, mode={DEFAULT_MODE}",
            DEFAULT_FREQ_HZ / 1e6
        );
        Self {
            model: Arc::new(Mutex::new(RigModel {
                vfo_a: DEFAULT_FREQ_HZ,
                vfo_b: DEFAULT_FREQ_HZ,
                mode_a: DEFAULT_MODE.to_string(),
                mode_b: DEFAULT_MODE.to_string(),
                split: false,
                active: Vfo::A,
                rts: false,
                dtr: false,
                memory_started: None,
            })),
        }
    }

    pub fn radio(&self) -> MockRadio {
        MockRadio { rig: self.clone() }
    }

    pub fn control_line(&self) -> MockControlLine {
        MockControlLine { rig: self.clone() }
    }

    fn lock(&self) -> MutexGuard<'_, RigModel> {
        self.model.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MockRig {
    fn default() -> Self {
        Self::new()
    }
}

pub struct MockRadio {
    rig: MockRig,
}

impl RadioControl for MockRadio {
    fn get_frequency(&mut self) -> RigResult<Frequency> {
        let hz = self.rig.lock().vfo_a;
        log::info!("[MOCK RADIO] rig.get_vfoA → {hz:.0}");
        Ok(Frequency::hz(hz))
    }

    fn set_frequency(&mut self, freq: Frequency) -> RigResult<()> {
        let hz = freq.as_hz().round() as u64;
        if !is_amateur_frequency(hz) {
            return Err(RigError::OutOfBand(hz));
        }
        log::info!("[MOCK RADIO] main.set_frequency({hz})  ({freq})");
        self.rig.lock().vfo_a = freq.as_hz();
        Ok(())
    }

    fn get_mode(&mut self) -> RigResult<String> {
        let mode = self.rig.lock().mode_a.clone();
        log::info!("[MOCK RADIO] rig.get_mode → {mode}");
        Ok(mode)
    }

    fn set_mode(&mut self, mode: &str) -> RigResult<()> {
        log::info!("[MOCK RADIO] rig.set_mode({mode})");
        self.rig.lock().mode_a = mode.to_string();
        Ok(())
    }

    fn get_split(&mut self) -> RigResult<bool> {
        Ok(self.rig.lock().split)
    }

    fn set_split(&mut self, on: bool) -> RigResult<()> {
        log::info!("[MOCK RADIO] rig.set_split({})", i32::from(on));
        self.rig.lock().split = on;
        Ok(())
    }

    fn get_vfo(&mut self) -> RigResult<Vfo> {
        Ok(self.rig.lock().active)
    }

    fn set_vfo(&mut self, vfo: Vfo) -> RigResult<()> {
        log::info!("[MOCK RADIO] rig.set_AB({vfo})");
        self.rig.lock().active = vfo;
        Ok(())
    }

    fn get_power_meter(&mut self) -> RigResult<f64> {
        let model = self.rig.lock();
        let playing = model
            .memory_started
            .is_some_and(|started| started.elapsed() < MEMORY_PLAYBACK);
        Ok(if playing && model.rts { METER_ON_AIR } else { 0.0 })
    }

    fn get_ptt(&mut self) -> RigResult<bool> {
        // We only ever key through RTS, so the radio never reports a foreign PTT
        Ok(false)
    }

    fn get_frequency_b(&mut self) -> RigResult<Frequency> {
        Ok(Frequency::hz(self.rig.lock().vfo_b))
    }

    fn get_mode_b(&mut self) -> RigResult<String> {
        Ok(self.rig.lock().mode_b.clone())
    }

    fn copy_vfo_a_to_b(&mut self) -> RigResult<()> {
        log::info!("[MOCK RADIO] rig.vfoA2B");
        let mut model = self.rig.lock();
        model.vfo_b = model.vfo_a;
        model.mode_b = model.mode_a.clone();
        Ok(())
    }
}

pub struct MockControlLine {
    rig: MockRig,
}

impl ControlLine for MockControlLine {
    fn set_ptt(&mut self, asserted: bool) -> RigResult<()> {
        log::info!("[MOCK RADIO] RTS {}", if asserted { "HIGH (PTT ON)" } else { "LOW (PTT OFF)" });
        self.rig.lock().rts = asserted;
        Ok(())
    }

    fn set_aux(&mut self, asserted: bool) -> RigResult<()> {
        log::info!("[MOCK RADIO] DTR {}", if asserted { "HIGH" } else { "LOW" });
        self.rig.lock().dtr = asserted;
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> RigResult<usize> {
        log::info!("[MOCK RADIO] CI-V → {}", crate::civ::format_frame(data));
        if data.len() >= 7 && data[0] == PREAMBLE && data[4] == CMD_VOICE_TX {
            let mut model = self.rig.lock();
            model.memory_started = (data[6] != 0).then(Instant::now);
        }
        Ok(data.len())
    }

    fn is_connected(&self) -> bool {
        true
    }
}
