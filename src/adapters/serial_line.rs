//! Serial control line adapter using the `serialport` crate
//!
//! Implements `SerialFactory` and `ControlLine`. RTS keys the transmitter,
//! DTR is the auxiliary (CW) line and is held low. `SerialPortFactory` has
//! no instance data, just the listing/opening functions.

use std::time::Duration;

use crate::domain::{RigError, RigResult, SerialPortInfo};
use crate::ports::{ControlLine, SerialFactory};

/// Zero-sized factory for creating serial control lines.
pub struct SerialPortFactory;

impl SerialFactory for SerialPortFactory {
    fn list_ports() -> RigResult<Vec<SerialPortInfo>> {
        let ports = serialport::available_ports()
            .map_err(|e| RigError::HardwareUnavailable(format!("Failed to list ports: {e}")))?;

        Ok(ports
            .into_iter()
            .map(|p| {
                let port_type = match &p.port_type {
                    serialport::SerialPortType::UsbPort(info) => {
                        format!("USB ({:04X}:{:04X})", info.vid, info.pid)
                    }
                    serialport::SerialPortType::PciPort => "PCI".to_string(),
                    serialport::SerialPortType::BluetoothPort => "Bluetooth".to_string(),
                    serialport::SerialPortType::Unknown => "Native".to_string(),
                };
                SerialPortInfo {
                    name: p.port_name,
                    port_type,
                }
            })
            .collect())
    }

    fn open(port: &str, baud_rate: u32) -> RigResult<Box<dyn ControlLine>> {
        let serial = serialport::new(port, baud_rate)
            .timeout(Duration::from_millis(100))
            .open()
            .map_err(|e| RigError::HardwareUnavailable(format!("Failed to open {port}: {e}")))?;

        let mut line = SerialControlLine {
            port: serial,
            name: port.to_string(),
            connected: true,
        };
        // Opening may leave RTS/DTR high on some drivers; start unkeyed.
        line.set_ptt(false)?;
        line.set_aux(false)?;
        log::info!("Serial port {port} opened with RTS=LOW, DTR=LOW");

        Ok(Box::new(line))
    }
}

/// An open serial port used as the PTT control line.
pub struct SerialControlLine {
    port: Box<dyn serialport::SerialPort>,
    name: String,
    connected: bool,
}

impl SerialControlLine {
    fn fail(&mut self, what: &str, e: impl std::fmt::Display) -> RigError {
        self.connected = false;
        RigError::HardwareUnavailable(format!("{what} on {} failed: {e}", self.name))
    }
}

impl ControlLine for SerialControlLine {
    fn set_ptt(&mut self, asserted: bool) -> RigResult<()> {
        self.port
            .write_request_to_send(asserted)
            .map_err(|e| self.fail("RTS write", e))
    }

    fn set_aux(&mut self, asserted: bool) -> RigResult<()> {
        self.port
            .write_data_terminal_ready(asserted)
            .map_err(|e| self.fail("DTR write", e))
    }

    fn write(&mut self, data: &[u8]) -> RigResult<usize> {
        use std::io::Write;
        let written = self.port.write(data).map_err(|e| self.fail("Write", e))?;
        self.port.flush().map_err(|e| self.fail("Flush", e))?;
        Ok(written)
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Safety: drive RTS and DTR low when the port is closed so the radio is
/// never left keyed by a dropped connection. Retries with increasing delays
/// in case the USB adapter is momentarily busy.
impl Drop for SerialControlLine {
    fn drop(&mut self) {
        for delay_ms in [0, 10, 50] {
            if delay_ms > 0 {
                std::thread::sleep(Duration::from_millis(delay_ms));
            }
            let rts = self.port.write_request_to_send(false);
            let dtr = self.port.write_data_terminal_ready(false);
            if rts.is_ok() && dtr.is_ok() {
                log::info!("Serial port {} closed", self.name);
                return;
            }
        }
        log::error!(
            "CRITICAL: Failed to lower RTS on {}. Radio may still be transmitting!",
            self.name
        );
    }
}

/// Stand-in used when the serial port could not be opened at startup.
/// Every signal write fails, so nothing can be keyed.
pub struct UnavailableLine {
    reason: String,
}

impl UnavailableLine {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl ControlLine for UnavailableLine {
    fn set_ptt(&mut self, _asserted: bool) -> RigResult<()> {
        Err(RigError::HardwareUnavailable(self.reason.clone()))
    }

    fn set_aux(&mut self, _asserted: bool) -> RigResult<()> {
        Err(RigError::HardwareUnavailable(self.reason.clone()))
    }

    fn write(&mut self, _data: &[u8]) -> RigResult<usize> {
        Err(RigError::HardwareUnavailable(self.reason.clone()))
    }

    fn is_connected(&self) -> bool {
        false
    }
}
