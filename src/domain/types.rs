//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use super::error::{RigError, RigResult};

/// Frequency in Hz
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frequency(pub f64);

impl Frequency {
    pub fn hz(hz: f64) -> Self {
        Self(hz)
    }

    pub fn khz(khz: f64) -> Self {
        Self(khz * 1_000.0)
    }

    pub fn mhz(mhz: f64) -> Self {
        Self(mhz * 1_000_000.0)
    }

    pub fn as_hz(&self) -> f64 {
        self.0
    }

    pub fn as_mhz(&self) -> f64 {
        self.0 / 1_000_000.0
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3} MHz", self.as_mhz())
    }
}

/// One of the radio's two VFOs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Vfo {
    A,
    B,
}

impl Vfo {
    /// The other VFO
    pub fn toggled(self) -> Self {
        match self {
            Vfo::A => Vfo::B,
            Vfo::B => Vfo::A,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Vfo::A => "A",
            Vfo::B => "B",
        }
    }

    /// Parse the daemon's "A"/"B" reply
    pub fn parse(s: &str) -> RigResult<Self> {
        match s.trim() {
            "A" | "a" => Ok(Vfo::A),
            "B" | "b" => Ok(Vfo::B),
            other => Err(RigError::Protocol(format!("Unknown VFO '{other}'"))),
        }
    }
}

impl fmt::Display for Vfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A voice-keyer memory slot on the radio (T1..T8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySlot(u8);

impl MemorySlot {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 8;

    pub fn new(slot: u8) -> RigResult<Self> {
        if (Self::MIN..=Self::MAX).contains(&slot) {
            Ok(Self(slot))
        } else {
            Err(RigError::InvalidSlot(slot))
        }
    }

    pub fn number(self) -> u8 {
        self.0
    }
}

impl fmt::Display for MemorySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// What kind of keyed transmission a request describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmissionKind {
    MemoryPlayback,
    SynthesizedSpeech,
}

/// The source of audio for a transmission
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Radio-internal voice memory, started with a CI-V command
    Memory(MemorySlot),
    /// A pre-rendered audio file streamed into the radio's data input.
    /// `text` is only used for logging.
    Speech { audio: PathBuf, text: String },
}

/// One unit of keyed work. Created when a button is pressed, consumed by the
/// sequencer, discarded once it returns to idle.
#[derive(Debug, Clone, PartialEq)]
pub struct TransmissionRequest {
    pub payload: Payload,
}

impl TransmissionRequest {
    pub fn memory(slot: MemorySlot) -> Self {
        Self {
            payload: Payload::Memory(slot),
        }
    }

    pub fn speech(audio: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            payload: Payload::Speech {
                audio: audio.into(),
                text: text.into(),
            },
        }
    }

    pub fn kind(&self) -> TransmissionKind {
        match self.payload {
            Payload::Memory(_) => TransmissionKind::MemoryPlayback,
            Payload::Speech { .. } => TransmissionKind::SynthesizedSpeech,
        }
    }

    /// Only synthesized speech needs the radio in a data mode
    pub fn requires_mode_switch(&self) -> bool {
        self.kind() == TransmissionKind::SynthesizedSpeech
    }

    pub fn audio_path(&self) -> Option<&Path> {
        match &self.payload {
            Payload::Speech { audio, .. } => Some(audio),
            Payload::Memory(_) => None,
        }
    }
}

impl fmt::Display for TransmissionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            Payload::Memory(slot) => write!(f, "voice memory {slot}"),
            Payload::Speech { text, .. } => write!(f, "speech \"{text}\""),
        }
    }
}

/// Mode state captured before a temporary switch to a data mode.
///
/// A snapshot must be handed back to `ModeGuard::exit` (or discarded with a
/// logged reason) before the sequencer returns to idle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioModeSnapshot {
    pub original_mode: String,
    /// The data-mode variant in use while keyed, or `None` when no switch
    /// was made
    pub transmit_mode: Option<String>,
}

/// Map a voice mode to its data-mode variant.
///
/// USB→USB-D and LSB→LSB-D. A mode that already is a data variant maps to
/// itself. Everything else (CW, AM, FM, RTTY...) has no variant.
pub fn data_mode_for(mode: &str) -> Option<String> {
    match mode.trim() {
        "USB" => Some("USB-D".to_string()),
        "LSB" => Some("LSB-D".to_string()),
        m @ ("USB-D" | "LSB-D") => Some(m.to_string()),
        _ => None,
    }
}

/// Information about a serial port
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialPortInfo {
    pub name: String,
    pub port_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_slot_accepts_one_through_eight() {
        for n in 1..=8 {
            assert_eq!(MemorySlot::new(n).unwrap().number(), n);
        }
    }

    #[test]
    fn memory_slot_rejects_out_of_range() {
        assert_eq!(MemorySlot::new(0), Err(RigError::InvalidSlot(0)));
        assert_eq!(MemorySlot::new(9), Err(RigError::InvalidSlot(9)));
    }

    #[test]
    fn only_speech_requires_mode_switch() {
        let memory = TransmissionRequest::memory(MemorySlot::new(1).unwrap());
        let speech = TransmissionRequest::speech("/tmp/x.wav", "73");
        assert!(!memory.requires_mode_switch());
        assert!(speech.requires_mode_switch());
        assert_eq!(speech.kind(), TransmissionKind::SynthesizedSpeech);
    }

    #[test]
    fn data_mode_mapping() {
        assert_eq!(data_mode_for("USB").as_deref(), Some("USB-D"));
        assert_eq!(data_mode_for("LSB").as_deref(), Some("LSB-D"));
        assert_eq!(data_mode_for("USB-D").as_deref(), Some("USB-D"));
        assert_eq!(data_mode_for("CW"), None);
        assert_eq!(data_mode_for("AM"), None);
        assert_eq!(data_mode_for("FM"), None);
    }

    #[test]
    fn vfo_parse_and_toggle() {
        assert_eq!(Vfo::parse("A").unwrap(), Vfo::A);
        assert_eq!(Vfo::parse(" B\n").unwrap(), Vfo::B);
        assert!(Vfo::parse("C").is_err());
        assert_eq!(Vfo::A.toggled(), Vfo::B);
    }

    #[test]
    fn frequency_display_in_mhz() {
        assert_eq!(Frequency::hz(14_150_000.0).to_string(), "14.150 MHz");
    }
}
