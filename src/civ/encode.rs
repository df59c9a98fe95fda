//! Pure encoding: CivCommand → CI-V wire frame.
//!
//! No I/O, no side effects. A frame is the two-byte preamble, destination
//! and source addresses, command and sub-command, one data byte and the
//! end-of-message marker.

use super::{CivAddress, CivCommand, CMD_VOICE_TX, END_OF_MESSAGE, PREAMBLE, SUB_VOICE_PLAY};

/// Encode a CivCommand into the frame sent to `addr`.
pub fn encode(cmd: &CivCommand, addr: &CivAddress) -> Vec<u8> {
    let data = match cmd {
        CivCommand::PlayVoiceMemory(slot) => slot.number(),
        CivCommand::StopVoiceMemory => 0x00,
    };
    vec![
        PREAMBLE,
        PREAMBLE,
        addr.radio,
        addr.controller,
        CMD_VOICE_TX,
        SUB_VOICE_PLAY,
        data,
        END_OF_MESSAGE,
    ]
}

/// Render a frame as space-separated upper-case hex for logs
pub fn format_frame(frame: &[u8]) -> String {
    frame
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}
