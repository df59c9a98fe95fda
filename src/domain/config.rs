//! Configuration profiles
//!
//! A Configuration is a saved profile containing all settings for a particular
//! station setup (serial control line, flrig connection, radio model, button
//! labels, speech voice, keyer timing and recording inputs).
//!
//! Every field has a default so older or hand-edited profiles still load.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use super::error::{RigError, RigResult};
use super::types::MemorySlot;

/// A saved configuration profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Profile name (e.g., "IC-7300 Home", "IC-705 Portable")
    pub name: String,
    /// Serial port carrying RTS (PTT) and CI-V, e.g. "/dev/ttyUSB0"
    pub serial_port: Option<String>,
    /// Serial baud rate
    pub baud_rate: u32,
    /// Radio model identifier (e.g., "IC-7300"), selects the CI-V address
    pub radio_model: String,
    /// Explicit CI-V radio address, overriding the model table
    pub civ_address: Option<u8>,
    /// CI-V address we transmit from
    pub controller_address: u8,
    /// flrig XML-RPC host
    pub flrig_host: String,
    /// flrig XML-RPC port
    pub flrig_port: u16,
    /// Per-call RPC timeout in milliseconds
    pub rpc_timeout_ms: u64,
    /// Key a transmission without switching mode when the current mode has
    /// no data variant (otherwise the request is aborted before keying)
    pub allow_unsupported_mode: bool,
    pub memories: Vec<MemoryButton>,
    pub speech: SpeechSettings,
    pub keyer: KeyerTiming,
    pub recording: RecordingSettings,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            serial_port: Some("/dev/ttyUSB0".to_string()),
            baud_rate: 19200,
            radio_model: "IC-7300".to_string(),
            civ_address: None,
            controller_address: 0xE0,
            flrig_host: "127.0.0.1".to_string(),
            flrig_port: 12345,
            rpc_timeout_ms: 1000,
            allow_unsupported_mode: false,
            memories: (MemorySlot::MIN..=MemorySlot::MAX)
                .map(|slot| MemoryButton {
                    slot,
                    label: format!("T{slot}"),
                })
                .collect(),
            speech: SpeechSettings::default(),
            keyer: KeyerTiming::default(),
            recording: RecordingSettings::default(),
        }
    }
}

impl Configuration {
    /// Reject values the keyer cannot run with.
    pub fn validate(&self) -> RigResult<()> {
        if self.baud_rate == 0 {
            return Err(RigError::Config("baud_rate must be non-zero".into()));
        }
        if self.rpc_timeout_ms == 0 || self.rpc_timeout_ms > MAX_RPC_TIMEOUT_MS {
            return Err(RigError::Config(format!(
                "rpc_timeout_ms must be 1..={MAX_RPC_TIMEOUT_MS}"
            )));
        }
        for button in &self.memories {
            MemorySlot::new(button.slot).map_err(|e| RigError::Config(e.to_string()))?;
        }
        let mut stems: HashMap<String, &str> = HashMap::new();
        for button in &self.speech.buttons {
            button.params().map_err(|e| {
                RigError::Config(format!("speech button '{}': {e}", button.label))
            })?;
            if let Some(other) = stems.insert(button.file_stem(), &button.label) {
                return Err(RigError::Config(format!(
                    "speech buttons '{other}' and '{}' would render to the same file",
                    button.label
                )));
            }
        }
        self.keyer.validate()
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    /// Label shown for a memory slot, falling back to "T<n>"
    pub fn memory_label(&self, slot: MemorySlot) -> String {
        self.memories
            .iter()
            .find(|b| b.slot == slot.number())
            .map(|b| b.label.clone())
            .unwrap_or_else(|| slot.to_string())
    }
}

/// A voice-keyer memory button
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryButton {
    pub slot: u8,
    pub label: String,
}

/// Rate and pitch handed to the speech synthesizer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeechParams {
    /// Length scale: lower is faster
    pub rate: f64,
    /// Pitch shift in cents, 0 for none
    pub pitch_cents: i32,
}

impl SpeechParams {
    pub const RATE_MIN: f64 = 0.5;
    pub const RATE_MAX: f64 = 1.0;

    pub fn new(rate: f64, pitch_cents: i32) -> RigResult<Self> {
        if !(Self::RATE_MIN..=Self::RATE_MAX).contains(&rate) {
            return Err(RigError::Speech(format!(
                "speech rate {rate} outside {}-{}",
                Self::RATE_MIN,
                Self::RATE_MAX
            )));
        }
        Ok(Self { rate, pitch_cents })
    }
}

impl Default for SpeechParams {
    fn default() -> Self {
        Self {
            rate: 0.72,
            pitch_cents: 0,
        }
    }
}

/// A synthesized-speech button
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechButton {
    pub label: String,
    pub text: String,
    pub rate: f64,
    #[serde(default)]
    pub pitch_cents: i32,
}

impl SpeechButton {
    pub fn params(&self) -> RigResult<SpeechParams> {
        SpeechParams::new(self.rate, self.pitch_cents)
    }

    /// Lowercased ASCII letters and digits of the label, "button" if none.
    /// Names the rendered file, so it must be unique per profile.
    pub fn file_stem(&self) -> String {
        let slug: String = self
            .label
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        if slug.is_empty() {
            "button".to_string()
        } else {
            slug
        }
    }
}

/// Speech synthesis and playback settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    /// Piper voice model
    pub model: String,
    pub piper_program: String,
    pub sox_program: String,
    pub player_program: String,
    /// Where rendered button audio is written
    pub render_dir: PathBuf,
    /// Resample rendered audio to this rate (mono) when set
    pub sample_rate: Option<u32>,
    pub render_timeout_ms: u64,
    pub buttons: Vec<SpeechButton>,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            model: "en_US-hfc_male-medium".to_string(),
            piper_program: "piper".to_string(),
            sox_program: "sox".to_string(),
            player_program: "paplay".to_string(),
            render_dir: std::env::temp_dir(),
            sample_rate: None,
            render_timeout_ms: 60_000,
            buttons: vec![
                SpeechButton {
                    label: "CQ".to_string(),
                    text: "CQ CQ CQ".to_string(),
                    rate: 0.72,
                    pitch_cents: 0,
                },
                SpeechButton {
                    label: "TU 59".to_string(),
                    text: "Thanks, also FIVE NINE".to_string(),
                    rate: 0.72,
                    pitch_cents: 0,
                },
                SpeechButton {
                    label: "73".to_string(),
                    text: "Seventy-Three".to_string(),
                    rate: 0.55,
                    pitch_cents: 150,
                },
            ],
        }
    }
}

/// Longest single settle or start delay
const MAX_SETTLE_MS: u64 = 5_000;
const MAX_POLL_INTERVAL_MS: u64 = 5_000;
/// Longest wait for a button that is still rendering
const MAX_RENDER_WAIT_MS: u64 = 60_000;
/// Longest a single transmission may stay keyed
const MAX_TRANSMISSION_MS: u64 = 600_000;
/// Longest single flrig call
const MAX_RPC_TIMEOUT_MS: u64 = 30_000;

/// Timing and bounds for the keying sequencer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyerTiming {
    /// Delay between raising PTT and the first byte of audio/command
    pub key_settle_ms: u64,
    /// Delay after switching to the data mode
    pub mode_settle_ms: u64,
    /// Delay after restoring the original mode
    pub restore_settle_ms: u64,
    /// Delay before the first power-meter poll
    pub meter_start_delay_ms: u64,
    pub meter_interval_ms: u64,
    /// Readings above this count as RF out, below as finished
    pub meter_threshold: f64,
    /// Upper bound on power-meter polls for one memory playback
    pub meter_max_polls: u32,
    /// Polls allowed before the meter must have risen at least once
    pub meter_rise_polls: u32,
    /// How often the playback process is checked for exit
    pub playback_check_ms: u64,
    /// Upper bound on one speech playback
    pub playback_timeout_ms: u64,
    /// How long to wait for a pre-rendered file that is still being rendered
    pub render_wait_ms: u64,
}

impl Default for KeyerTiming {
    fn default() -> Self {
        Self {
            key_settle_ms: 50,
            mode_settle_ms: 200,
            restore_settle_ms: 100,
            meter_start_delay_ms: 300,
            meter_interval_ms: 100,
            meter_threshold: 0.5,
            meter_max_polls: 1200,
            meter_rise_polls: 50,
            playback_check_ms: 50,
            playback_timeout_ms: 120_000,
            render_wait_ms: 5_000,
        }
    }
}

impl KeyerTiming {
    pub fn validate(&self) -> RigResult<()> {
        if self.meter_interval_ms == 0 || self.playback_check_ms == 0 {
            return Err(RigError::Config("poll intervals must be non-zero".into()));
        }
        if self.meter_max_polls == 0 || self.meter_rise_polls == 0 {
            return Err(RigError::Config("meter poll bounds must be non-zero".into()));
        }
        if self.meter_rise_polls > self.meter_max_polls {
            return Err(RigError::Config(
                "meter_rise_polls cannot exceed meter_max_polls".into(),
            ));
        }
        if !self.meter_threshold.is_finite() || self.meter_threshold < 0.0 {
            return Err(RigError::Config("meter_threshold must be >= 0".into()));
        }

        let bounded = [
            ("key_settle_ms", self.key_settle_ms, MAX_SETTLE_MS),
            ("mode_settle_ms", self.mode_settle_ms, MAX_SETTLE_MS),
            ("restore_settle_ms", self.restore_settle_ms, MAX_SETTLE_MS),
            ("meter_start_delay_ms", self.meter_start_delay_ms, MAX_SETTLE_MS),
            ("meter_interval_ms", self.meter_interval_ms, MAX_POLL_INTERVAL_MS),
            ("playback_check_ms", self.playback_check_ms, MAX_POLL_INTERVAL_MS),
            ("render_wait_ms", self.render_wait_ms, MAX_RENDER_WAIT_MS),
            ("playback_timeout_ms", self.playback_timeout_ms, MAX_TRANSMISSION_MS),
            (
                "meter_interval_ms * meter_max_polls",
                self.meter_interval_ms
                    .saturating_mul(u64::from(self.meter_max_polls)),
                MAX_TRANSMISSION_MS,
            ),
        ];
        for (name, value, max) in bounded {
            if value > max {
                return Err(RigError::Config(format!(
                    "{name} is {value} ms, at most {max} ms allowed"
                )));
            }
        }
        Ok(())
    }

    pub fn key_settle(&self) -> Duration {
        Duration::from_millis(self.key_settle_ms)
    }

    pub fn mode_settle(&self) -> Duration {
        Duration::from_millis(self.mode_settle_ms)
    }

    pub fn restore_settle(&self) -> Duration {
        Duration::from_millis(self.restore_settle_ms)
    }

    pub fn meter_start_delay(&self) -> Duration {
        Duration::from_millis(self.meter_start_delay_ms)
    }

    pub fn meter_interval(&self) -> Duration {
        Duration::from_millis(self.meter_interval_ms)
    }

    pub fn playback_check(&self) -> Duration {
        Duration::from_millis(self.playback_check_ms)
    }

    pub fn playback_timeout(&self) -> Duration {
        Duration::from_millis(self.playback_timeout_ms)
    }

    pub fn render_wait(&self) -> Duration {
        Duration::from_millis(self.render_wait_ms)
    }
}

/// QSO recording settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingSettings {
    pub ffmpeg_program: String,
    /// PulseAudio sources; two inputs are merged into one stereo file
    pub inputs: Vec<String>,
    pub output_dir: PathBuf,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            ffmpeg_program: "ffmpeg".to_string(),
            inputs: vec!["default".to_string()],
            output_dir: std::env::temp_dir(),
        }
    }
}
