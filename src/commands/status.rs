//! Status command: current connection and keyer state for display

use serde::Serialize;
use std::path::PathBuf;

use super::record::current_recording;
use crate::state::AppState;

/// Snapshot of runtime state, returned by `get_connection_status`.
#[derive(Debug, Serialize)]
pub struct ConnectionStatus {
    pub serial_connected: bool,
    pub serial_port: Option<String>,
    pub keyer_state: String,
    pub keyed: bool,
    pub recording: Option<PathBuf>,
}

pub fn get_connection_status(state: &AppState) -> ConnectionStatus {
    ConnectionStatus {
        serial_connected: state.line_connected(),
        serial_port: state.serial_port_name.clone(),
        keyer_state: state.sequencer.state().to_string(),
        keyed: state.sequencer.key_state().is_keyed(),
        recording: current_recording(state),
    }
}
