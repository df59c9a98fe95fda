//! Domain error types

use thiserror::Error;

/// Errors that can occur while controlling the radio or keying a transmission.
///
/// Every variant carries owned strings only, so errors can be cloned into a
/// transmission outcome and sent back across the keyer's result channel.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RigError {
    /// flrig is unreachable or an RPC timed out
    #[error("Radio unavailable: {0}")]
    RadioUnavailable(String),

    /// The serial control line could not be written
    #[error("Control line unavailable: {0}")]
    HardwareUnavailable(String),

    /// The current mode has no data-mode (-D) variant
    #[error("Mode '{0}' has no data-mode variant")]
    ModeSwitchUnsupported(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    /// An external playback/synthesis process exited abnormally
    #[error("Process failed: {0}")]
    ProcessFailure(String),

    /// A transmission is already in flight
    #[error("Transmission already in progress")]
    Busy,

    /// The radio reports PTT engaged by something other than us
    #[error("Radio is already transmitting")]
    AlreadyTransmitting,

    /// The daemon answered with a fault or something we cannot parse
    #[error("Radio protocol error: {0}")]
    Protocol(String),

    #[error("Frequency {0} Hz is outside US amateur bands")]
    OutOfBand(u64),

    #[error("Invalid voice memory slot {0} (expected 1-8)")]
    InvalidSlot(u8),

    #[error("Speech error: {0}")]
    Speech(String),

    #[error("Recording error: {0}")]
    Recording(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for rig operations
pub type RigResult<T> = Result<T, RigError>;
