//! flrig radio adapter using its XML-RPC interface
//!
//! flrig owns the CAT connection to the radio; we only ask it to read or
//! change state. Method names follow flrig's `rig.*` / `main.*` namespace:
//! - `rig.get_vfoA` → frequency as a string of Hz
//! - `rig.get_mode` → mode name, e.g. "USB-D"
//! - `rig.get_pwrmeter` → RF power reading

use std::time::Duration;

use crate::domain::{is_amateur_frequency, Frequency, RigError, RigResult, Vfo};
use crate::ports::RadioControl;
use crate::xmlrpc::{Value, XmlRpcSession};

/// Radio control through a running flrig instance.
pub struct FlrigRadio {
    session: XmlRpcSession,
}

impl FlrigRadio {
    pub fn new(host: &str, port: u16, timeout: Duration) -> Self {
        Self {
            session: XmlRpcSession::new(host, port, timeout),
        }
    }

    fn call(&self, method: &str, params: &[Value]) -> RigResult<Value> {
        self.session.call(method, params)
    }

    fn get_string(&self, method: &str) -> RigResult<String> {
        Ok(self.call(method, &[])?.into_string()?.trim().to_string())
    }
}

impl RadioControl for FlrigRadio {
    fn get_frequency(&mut self) -> RigResult<Frequency> {
        Ok(Frequency::hz(self.call("rig.get_vfoA", &[])?.as_f64()?))
    }

    fn set_frequency(&mut self, freq: Frequency) -> RigResult<()> {
        let hz = freq.as_hz().round() as u64;
        // Nothing reaches the daemon for an out-of-band frequency
        if !is_amateur_frequency(hz) {
            return Err(RigError::OutOfBand(hz));
        }
        self.call("main.set_frequency", &[Value::Double(hz as f64)])?;
        Ok(())
    }

    fn get_mode(&mut self) -> RigResult<String> {
        self.get_string("rig.get_mode")
    }

    fn set_mode(&mut self, mode: &str) -> RigResult<()> {
        self.call("rig.set_mode", &[Value::Str(mode.to_string())])?;
        Ok(())
    }

    fn get_split(&mut self) -> RigResult<bool> {
        self.call("rig.get_split", &[])?.as_bool()
    }

    fn set_split(&mut self, on: bool) -> RigResult<()> {
        self.call("rig.set_split", &[Value::Int(i32::from(on))])?;
        Ok(())
    }

    fn get_vfo(&mut self) -> RigResult<Vfo> {
        Vfo::parse(&self.get_string("rig.get_AB")?)
    }

    fn set_vfo(&mut self, vfo: Vfo) -> RigResult<()> {
        self.call("rig.set_AB", &[Value::Str(vfo.as_str().to_string())])?;
        Ok(())
    }

    fn get_power_meter(&mut self) -> RigResult<f64> {
        self.call("rig.get_pwrmeter", &[])?.as_f64()
    }

    fn get_ptt(&mut self) -> RigResult<bool> {
        self.call("rig.get_ptt", &[])?.as_bool()
    }

    fn get_frequency_b(&mut self) -> RigResult<Frequency> {
        Ok(Frequency::hz(self.call("rig.get_vfoB", &[])?.as_f64()?))
    }

    fn get_mode_b(&mut self) -> RigResult<String> {
        self.get_string("rig.get_modeB")
    }

    fn copy_vfo_a_to_b(&mut self) -> RigResult<()> {
        self.call("rig.vfoA2B", &[])?;
        Ok(())
    }
}
