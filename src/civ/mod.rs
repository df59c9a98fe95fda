//! CI-V command layer for Icom voice-keyer memories.
//!
//! - `encode`: translate CivCommand → wire frame (pure, no I/O)
//!
//! Frames go out over the same serial port that carries PTT on RTS; the
//! keyer writes them through the `ControlLine` port.

pub mod encode;

pub use encode::{encode, format_frame};

use crate::domain::{Configuration, MemorySlot, RigError, RigResult};

/// Frame preamble byte (sent twice)
pub const PREAMBLE: u8 = 0xFE;
/// End-of-message byte
pub const END_OF_MESSAGE: u8 = 0xFD;
/// "Send/read voice TX memory" command
pub const CMD_VOICE_TX: u8 = 0x28;
/// Sub-command: play memory contents
pub const SUB_VOICE_PLAY: u8 = 0x00;

/// Default CI-V address per radio model.
/// Each entry is (model, radio address).
pub const ADDRESS_TABLE: &[(&str, u8)] = &[
    ("IC-7300", 0x94),
    ("IC-7610", 0x98),
    ("IC-705", 0xA4),
    ("IC-9700", 0xA2),
    ("IC-7100", 0x88),
    ("IC-905", 0xAC),
];

/// Destination and source addresses of outgoing frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CivAddress {
    pub radio: u8,
    pub controller: u8,
}

impl CivAddress {
    pub fn new(radio: u8, controller: u8) -> Self {
        Self { radio, controller }
    }

    /// Look up the radio address for a model name (case-insensitive)
    pub fn for_model(model: &str, controller: u8) -> RigResult<Self> {
        ADDRESS_TABLE
            .iter()
            .find(|(m, _)| m.eq_ignore_ascii_case(model.trim()))
            .map(|(_, radio)| Self::new(*radio, controller))
            .ok_or_else(|| {
                RigError::Config(format!(
                    "Unknown radio model '{model}'; set civ_address explicitly"
                ))
            })
    }

    /// An explicit `civ_address` wins over the model table
    pub fn from_config(config: &Configuration) -> RigResult<Self> {
        match config.civ_address {
            Some(radio) => Ok(Self::new(radio, config.controller_address)),
            None => Self::for_model(&config.radio_model, config.controller_address),
        }
    }
}

/// High-level CI-V commands understood by the voice keyer.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum CivCommand {
    /// Start transmitting the contents of a voice memory
    PlayVoiceMemory(MemorySlot),
    /// Stop a voice memory that is playing
    StopVoiceMemory,
}
