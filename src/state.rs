//! Application state
//!
//! Owns every adapter for the lifetime of the process. The radio handle is
//! shared with the keyer; the control line is handed to the keyer outright
//! and only its connection flag is read from here.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::adapters::ffmpeg_recorder::FfmpegRecorder;
use crate::adapters::flrig::FlrigRadio;
use crate::adapters::mock_audio::{MockPlayer, MockRecorder, MockSynthesizer};
use crate::adapters::mock_radio::MockRig;
use crate::adapters::paplay::PaplayPlayer;
use crate::adapters::piper::PiperSynthesizer;
use crate::adapters::serial_line::{SerialPortFactory, UnavailableLine};
use crate::civ::CivAddress;
use crate::domain::{Configuration, RigResult};
use crate::keyer::{DebugLog, Sequencer, SequencerParts};
use crate::ports::{
    shared_line, shared_radio, AudioPlayer, AudioRecorder, ControlLine, RadioControl,
    RecordingSession, SerialFactory, SharedControlLine, SharedRadio, SpeechSynthesizer,
};

const SHUTDOWN_WAIT: Duration = Duration::from_secs(5);

/// The concrete collaborators an `AppState` is built from
pub struct Adapters {
    pub radio: Box<dyn RadioControl>,
    pub line: Box<dyn ControlLine>,
    pub port_name: Option<String>,
    pub player: Arc<dyn AudioPlayer>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub recorder: Box<dyn AudioRecorder>,
}

impl Adapters {
    /// flrig, the configured serial port and the external audio tools.
    /// A serial port that cannot be opened leaves an unavailable line so
    /// radio control still works but nothing can key.
    pub fn hardware(config: &Configuration, events: &DebugLog) -> Self {
        let (line, port_name): (Box<dyn ControlLine>, _) = match &config.serial_port {
            Some(port) => match SerialPortFactory::open(port, config.baud_rate) {
                Ok(line) => (line, Some(port.clone())),
                Err(e) => {
                    events.error(format!("Warning: could not open serial port: {e}"));
                    (Box::new(UnavailableLine::new(e.to_string())), None)
                }
            },
            None => (
                Box::new(UnavailableLine::new("No serial port configured")),
                None,
            ),
        };

        Self {
            radio: Box::new(FlrigRadio::new(
                &config.flrig_host,
                config.flrig_port,
                config.rpc_timeout(),
            )),
            line,
            port_name,
            player: Arc::new(PaplayPlayer::new(config.speech.player_program.clone())),
            synthesizer: Arc::new(PiperSynthesizer::from_settings(&config.speech)),
            recorder: Box::new(FfmpegRecorder::new(&config.recording, events.clone())),
        }
    }

    /// In-memory rig and audio tools for running without hardware
    pub fn mock(config: &Configuration) -> Self {
        let rig = MockRig::new();
        Self {
            radio: Box::new(rig.radio()),
            line: Box::new(rig.control_line()),
            port_name: Some("mock".to_string()),
            player: Arc::new(MockPlayer),
            synthesizer: Arc::new(MockSynthesizer),
            recorder: Box::new(MockRecorder::new(config.recording.output_dir.clone())),
        }
    }
}

/// Shared application state, handed to commands as `&AppState`
pub struct AppState {
    pub config: Mutex<Configuration>,
    pub config_dir: PathBuf,
    pub radio: SharedRadio,
    pub line: SharedControlLine,
    pub serial_port_name: Option<String>,
    pub sequencer: Sequencer,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub recorder: Box<dyn AudioRecorder>,
    pub recording: Mutex<Option<Box<dyn RecordingSession>>>,
    pub events: DebugLog,
}

impl AppState {
    pub fn new(
        config: Configuration,
        config_dir: PathBuf,
        adapters: Adapters,
        events: DebugLog,
    ) -> RigResult<Self> {
        config.validate()?;
        let civ = CivAddress::from_config(&config)?;

        let radio = shared_radio(adapters.radio);
        let line = shared_line(adapters.line);
        let sequencer = Sequencer::new(SequencerParts {
            radio: radio.clone(),
            line: line.clone(),
            player: adapters.player,
            civ,
            timing: config.keyer.clone(),
            allow_unsupported_mode: config.allow_unsupported_mode,
            events: events.clone(),
        });

        Ok(Self {
            config: Mutex::new(config),
            config_dir,
            radio,
            line,
            serial_port_name: adapters.port_name,
            sequencer,
            synthesizer: adapters.synthesizer,
            recorder: adapters.recorder,
            recording: Mutex::new(None),
            events,
        })
    }

    /// Snapshot of the active profile
    pub fn config(&self) -> Configuration {
        self.config
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn line_connected(&self) -> bool {
        self.line
            .lock()
            .map(|line| line.is_connected())
            .unwrap_or(false)
    }

    /// Cancel any transmission, force PTT low and stop recording.
    pub fn shutdown(&self) {
        self.events.info("Shutting down");
        self.sequencer.shutdown(SHUTDOWN_WAIT);
        let session = self
            .recording
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(session) = session {
            if let Err(e) = session.stop() {
                self.events.error(format!("Recording stop failed: {e}"));
            }
        }
    }
}
