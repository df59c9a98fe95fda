//! Command-line interface
//!
//! With no subcommand the interactive console starts. The one-shot keying
//! subcommands follow the transmission and cancel it when Enter is pressed.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

use crate::adapters::mock_audio::MockSynthesizer;
use crate::adapters::piper::PiperSynthesizer;
use crate::commands::{self, config::DEFAULT_PROFILE, record::RecordingChange};
use crate::console;
use crate::domain::{Configuration, Frequency, PresetKind, SpeechParams};
use crate::keyer::{DebugLog, TransmissionOutcome};
use crate::ports::SpeechSynthesizer;
use crate::state::{Adapters, AppState};

#[derive(Parser, Debug)]
#[command(name = "rigkey")]
#[command(version, about = "Transceiver control panel with a fail-safe voice keyer")]
pub struct Cli {
    /// Directory holding configuration profiles
    #[arg(long, env = "RIGKEY_CONFIG_DIR", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Configuration profile to load
    #[arg(short, long, default_value = DEFAULT_PROFILE)]
    pub profile: String,

    /// Override the profile's serial port
    #[arg(long, value_name = "PORT")]
    pub serial_port: Option<String>,

    /// Write log output to this file instead of stderr
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Use the in-memory radio and audio tools instead of hardware
    #[arg(long, env = "MOCK_RADIO", value_parser = clap::builder::FalseyValueParser::new())]
    pub mock: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show radio, keyer and recording status
    Status,

    /// Set VFO A frequency
    Freq {
        /// Frequency in MHz, e.g. 14.150
        #[arg(value_name = "MHZ")]
        mhz: f64,
    },

    /// Set the operating mode (USB, LSB, CW, USB-D ...)
    Mode { mode: String },

    /// Tune a band preset
    Band {
        #[arg(value_enum)]
        kind: PresetArg,

        /// Band label, e.g. 20m
        band: String,
    },

    /// Toggle split on/off
    Split,

    /// Toggle between VFO A and B
    Vfo,

    /// Copy VFO A to VFO B
    VfoCopy,

    /// Play a radio voice memory (Enter cancels)
    Memory {
        #[arg(value_parser = clap::value_parser!(u8).range(1..=8))]
        slot: u8,
    },

    /// Send a speech button by label or number (Enter cancels)
    Speak { button: String },

    /// Render text and send it (Enter cancels)
    Say {
        #[arg(required = true)]
        text: Vec<String>,

        #[command(flatten)]
        voice: VoiceArgs,
    },

    /// Render text to a file without keying
    Render {
        #[arg(required = true)]
        text: Vec<String>,

        #[arg(short, long, value_name = "OUTPUT.WAV")]
        output: PathBuf,

        #[command(flatten)]
        voice: VoiceArgs,
    },

    /// Record a QSO until Enter is pressed
    Record,

    /// List serial ports
    Ports,

    /// Manage configuration profiles
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Interactive console (the default)
    Console,
}

#[derive(clap::Args, Debug, Clone, Copy)]
pub struct VoiceArgs {
    /// Length scale, 0.5 (fast) to 1.0 (slow)
    #[arg(long, default_value_t = 0.72)]
    pub rate: f64,

    /// Pitch shift in cents
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub pitch: i32,
}

impl VoiceArgs {
    fn params(self) -> Result<SpeechParams, String> {
        SpeechParams::new(self.rate, self.pitch).map_err(|e| e.to_string())
    }
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the active profile as JSON
    Show,
    /// Save the active profile, optionally under a new name
    Save { name: Option<String> },
    /// List saved profiles
    List,
    /// Delete a saved profile
    Delete { name: String },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetArg {
    Cw,
    Ssb,
}

impl From<PresetArg> for PresetKind {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Cw => PresetKind::Cw,
            PresetArg::Ssb => PresetKind::Ssb,
        }
    }
}

/// Run the parsed command line.
pub fn execute(cli: Cli) -> Result<(), String> {
    let config_dir = cli
        .config_dir
        .clone()
        .unwrap_or_else(commands::config::default_config_dir);
    let mut config = commands::config::load_or_default(&config_dir, &cli.profile)?;
    if let Some(port) = &cli.serial_port {
        config.serial_port = Some(port.clone());
    }

    let command = cli.command.unwrap_or(Command::Console);

    // Commands that never touch the radio
    match command {
        Command::Config { action } => return config_command(&config_dir, config, action),
        Command::Ports => {
            for port in commands::radio::list_serial_ports()? {
                println!("{}  {}", port.name, port.port_type);
            }
            return Ok(());
        }
        Command::Render {
            text,
            output,
            voice,
        } => {
            let synthesizer: Box<dyn SpeechSynthesizer> = if cli.mock {
                Box::new(MockSynthesizer)
            } else {
                Box::new(PiperSynthesizer::from_settings(&config.speech))
            };
            let path = synthesizer
                .render(&text.join(" "), &voice.params()?, &output)
                .map_err(|e| e.to_string())?;
            println!("Rendered {}", path.display());
            return Ok(());
        }
        _ => {}
    }

    let events = DebugLog::new();
    let adapters = if cli.mock {
        log::info!("MOCK_RADIO set, using in-memory radio and audio");
        Adapters::mock(&config)
    } else {
        Adapters::hardware(&config, &events)
    };
    let state = Arc::new(
        AppState::new(config, config_dir, adapters, events).map_err(|e| e.to_string())?,
    );

    let result = radio_command(&state, command);
    state.shutdown();
    result
}

fn radio_command(state: &Arc<AppState>, command: Command) -> Result<(), String> {
    let cursor = state.events.len();
    match command {
        Command::Status => {
            let status = commands::status::get_connection_status(state);
            match commands::radio::get_radio_status(state) {
                Ok(radio) => println!("{radio}"),
                Err(e) => println!("Radio: {e}"),
            }
            println!(
                "Serial: {} | Keyer: {} | PTT: {} | Recording: {}",
                status.serial_port.as_deref().unwrap_or("not connected"),
                status.keyer_state,
                if status.keyed { "ON" } else { "OFF" },
                status
                    .recording
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "off".to_string())
            );
            Ok(())
        }
        Command::Freq { mhz } => {
            commands::radio::set_frequency(state, Frequency::mhz(mhz).as_hz())?;
            println!("VFO A @ {}", Frequency::mhz(mhz));
            Ok(())
        }
        Command::Mode { mode } => {
            commands::radio::set_mode(state, &mode)?;
            println!("Mode {}", mode.to_uppercase());
            Ok(())
        }
        Command::Band { kind, band } => {
            let preset = commands::radio::tune_preset(state, kind.into(), &band)?;
            println!("{} @ {}", preset.mode, preset.frequency());
            Ok(())
        }
        Command::Split => {
            let on = commands::radio::toggle_split(state)?;
            println!("Split {}", if on { "ON" } else { "OFF" });
            Ok(())
        }
        Command::Vfo => {
            println!("VFO {}", commands::radio::toggle_vfo(state)?);
            Ok(())
        }
        Command::VfoCopy => {
            commands::radio::copy_vfo_a_to_b(state)?;
            println!("VFO A → B copied");
            Ok(())
        }
        Command::Memory { slot } => {
            let handle = commands::tx::play_memory(state, slot)?;
            report(console::follow_transmission(state, handle, cursor))
        }
        Command::Speak { button } => {
            commands::speech::render_button(state, &button)?;
            let handle = commands::tx::speak_button(state, &button)?;
            report(console::follow_transmission(state, handle, cursor))
        }
        Command::Say { text, voice } => {
            let handle = commands::tx::say_text(state, &text.join(" "), &voice.params()?)?;
            report(console::follow_transmission(state, handle, cursor))
        }
        Command::Record => {
            if let RecordingChange::Started(path) = commands::record::toggle_recording(state)? {
                println!("Recording to {} - press Enter to stop", path.display());
            }
            console::wait_for_enter();
            if let RecordingChange::Stopped(path) = commands::record::toggle_recording(state)? {
                println!("Saved {}", path.display());
            }
            Ok(())
        }
        Command::Console => console::run_console(Arc::clone(state)),
        Command::Config { .. } | Command::Ports | Command::Render { .. } => Ok(()),
    }
}

fn report(outcome: TransmissionOutcome) -> Result<(), String> {
    match outcome {
        TransmissionOutcome::Completed => {
            println!("Transmission complete");
            Ok(())
        }
        TransmissionOutcome::Cancelled => {
            println!("Transmission cancelled");
            Ok(())
        }
        TransmissionOutcome::Aborted(e) => Err(format!("Transmission aborted: {e}")),
    }
}

fn config_command(
    dir: &std::path::Path,
    config: Configuration,
    action: ConfigAction,
) -> Result<(), String> {
    match action {
        ConfigAction::Show => {
            let json = serde_json::to_string_pretty(&config)
                .map_err(|e| format!("Serialization error: {e}"))?;
            println!("{json}");
        }
        ConfigAction::Save { name } => {
            let mut config = config;
            if let Some(name) = name {
                config.name = name;
            }
            let path = commands::config::save_configuration(dir, &config)?;
            println!("Saved {}", path.display());
        }
        ConfigAction::List => {
            for name in commands::config::list_configurations(dir)? {
                println!("{name}");
            }
        }
        ConfigAction::Delete { name } => {
            commands::config::delete_configuration(dir, &name)?;
            println!("Deleted {name}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn negative_pitch_parses() {
        let cli = Cli::try_parse_from(["rigkey", "say", "--pitch", "-200", "seventy", "three"]).unwrap();
        match cli.command {
            Some(Command::Say { text, voice }) => {
                assert_eq!(text, ["seventy", "three"]);
                assert_eq!(voice.pitch, -200);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn memory_slot_is_range_checked() {
        assert!(Cli::try_parse_from(["rigkey", "memory", "9"]).is_err());
        assert!(Cli::try_parse_from(["rigkey", "memory", "2"]).is_ok());
    }

    #[test]
    fn band_preset_kind() {
        let cli = Cli::try_parse_from(["rigkey", "band", "ssb", "40m"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Band { kind: PresetArg::Ssb, .. })
        ));
    }
}
