//! Serial control line traits
//!
//! Split into two traits:
//! - `SerialFactory`: static methods for listing and opening ports
//! - `ControlLine`: instance methods for the PTT/aux signals and CI-V bytes

use std::sync::{Arc, Mutex};

use crate::domain::{RigResult, SerialPortInfo};

/// Factory for creating control-line connections.
pub trait SerialFactory {
    /// List available serial ports on the system
    fn list_ports() -> RigResult<Vec<SerialPortInfo>>;

    /// Open a serial port at the given baud rate with PTT and aux low
    fn open(port: &str, baud_rate: u32) -> RigResult<Box<dyn ControlLine>>;
}

/// An open control line. PTT is wired to RTS, the auxiliary line to DTR,
/// and CI-V frames travel over the same port's data lines.
/// Only requires `Send` (not `Sync`), always accessed behind a Mutex.
pub trait ControlLine: Send {
    /// Drive the PTT line
    fn set_ptt(&mut self, asserted: bool) -> RigResult<()>;

    /// Drive the auxiliary line (held low by policy)
    fn set_aux(&mut self, asserted: bool) -> RigResult<()>;

    /// Write raw bytes (CI-V frames) to the port
    fn write(&mut self, data: &[u8]) -> RigResult<usize>;

    /// Check if the port is still connected
    fn is_connected(&self) -> bool;
}

pub type SharedControlLine = Arc<Mutex<Box<dyn ControlLine>>>;

pub fn shared_line(line: Box<dyn ControlLine>) -> SharedControlLine {
    Arc::new(Mutex::new(line))
}
