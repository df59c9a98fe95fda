//! Radio control port trait

use std::sync::{Arc, Mutex};

use crate::domain::{Frequency, RigResult, Vfo};

/// Trait for the radio control daemon (frequency, mode, split, VFO, meters).
///
/// Every call is a synchronous request/response. Connection failures surface
/// as `RigError::RadioUnavailable`.
pub trait RadioControl: Send {
    /// Get VFO A frequency
    fn get_frequency(&mut self) -> RigResult<Frequency>;

    /// Set the active VFO frequency
    fn set_frequency(&mut self, freq: Frequency) -> RigResult<()>;

    /// Get current operating mode (e.g., "USB", "USB-D", "CW")
    fn get_mode(&mut self) -> RigResult<String>;

    /// Set operating mode
    fn set_mode(&mut self, mode: &str) -> RigResult<()>;

    fn get_split(&mut self) -> RigResult<bool>;

    fn set_split(&mut self, on: bool) -> RigResult<()>;

    /// Which VFO is active
    fn get_vfo(&mut self) -> RigResult<Vfo>;

    fn set_vfo(&mut self, vfo: Vfo) -> RigResult<()>;

    /// Current RF power-meter reading
    fn get_power_meter(&mut self) -> RigResult<f64>;

    /// Whether the radio itself reports PTT engaged
    fn get_ptt(&mut self) -> RigResult<bool>;

    /// VFO B frequency (shown while split is on)
    fn get_frequency_b(&mut self) -> RigResult<Frequency>;

    /// VFO B mode (shown while split is on)
    fn get_mode_b(&mut self) -> RigResult<String>;

    /// Copy VFO A to VFO B
    fn copy_vfo_a_to_b(&mut self) -> RigResult<()>;
}

/// Radio handle shared between the front end and the keyer worker.
/// Locked per call, never across a whole transmission.
pub type SharedRadio = Arc<Mutex<Box<dyn RadioControl>>>;

pub fn shared_radio(radio: Box<dyn RadioControl>) -> SharedRadio {
    Arc::new(Mutex::new(radio))
}
