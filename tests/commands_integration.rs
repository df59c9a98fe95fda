//! Command-layer tests against the mock rig
//!
//! These go through `AppState` exactly like the console and the one-shot
//! CLI do, with `Adapters::mock` standing in for flrig, the serial line
//! and the audio tools.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rigkey_lib::commands::{radio, record, speech, status, tx};
use rigkey_lib::domain::{Configuration, PresetKind, SpeechParams, Vfo};
use rigkey_lib::keyer::{DebugLog, EventKind, SequencerState, TransmissionOutcome};
use rigkey_lib::state::{Adapters, AppState};

struct Fixture {
    state: Arc<AppState>,
    _dir: tempfile::TempDir,
}

fn mock_state() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Configuration::default();
    config.speech.render_dir = dir.path().join("tts");
    config.recording.output_dir = dir.path().join("recordings");
    std::fs::create_dir_all(&config.speech.render_dir).unwrap();
    std::fs::create_dir_all(&config.recording.output_dir).unwrap();
    config.keyer.key_settle_ms = 0;
    config.keyer.mode_settle_ms = 0;
    config.keyer.restore_settle_ms = 0;
    config.keyer.meter_start_delay_ms = 20;
    config.keyer.meter_interval_ms = 20;
    config.keyer.playback_check_ms = 10;

    let adapters = Adapters::mock(&config);
    let state = AppState::new(config, dir.path().to_path_buf(), adapters, DebugLog::new()).unwrap();
    Fixture {
        state: Arc::new(state),
        _dir: dir,
    }
}

fn wait_for_keyed(state: &AppState) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while state.sequencer.state() != SequencerState::Keyed {
        assert!(Instant::now() < deadline, "never keyed");
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn unbounded_render_wait_is_refused_at_startup() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Configuration::default();
    config.speech.render_dir = dir.path().join("tts");
    config.keyer.render_wait_ms = u64::MAX;

    let adapters = Adapters::mock(&config);
    let result = AppState::new(config, dir.path().to_path_buf(), adapters, DebugLog::new());
    let err = result.err().expect("startup should refuse the profile");
    assert!(err.to_string().contains("render_wait_ms"), "{err}");
}

// ---------------------------------------------------------------------------
// Radio control
// ---------------------------------------------------------------------------

#[test]
fn mock_rig_starts_on_twenty_meters_usb() {
    let fx = mock_state();
    let status = radio::get_radio_status(&fx.state).unwrap();
    assert_eq!(status.frequency_hz, 14_150_000.0);
    assert_eq!(status.mode, "USB");
    assert_eq!(status.vfo, Vfo::A);
    assert!(!status.split);
    assert!(status.vfo_b.is_none());
}

#[test]
fn out_of_band_frequency_is_rejected() {
    let fx = mock_state();
    let err = radio::set_frequency(&fx.state, 10_000_000.0).unwrap_err();
    assert!(err.contains("outside"), "{err}");
    let status = radio::get_radio_status(&fx.state).unwrap();
    assert_eq!(status.frequency_hz, 14_150_000.0);
}

#[test]
fn band_preset_sets_frequency_and_mode() {
    let fx = mock_state();
    let preset = radio::tune_preset(&fx.state, PresetKind::Ssb, "40m").unwrap();
    assert_eq!(preset.mode, "LSB");

    let status = radio::get_radio_status(&fx.state).unwrap();
    assert_eq!(status.frequency_hz, 7_125_000.0);
    assert_eq!(status.mode, "LSB");
}

#[test]
fn unknown_preset_is_an_error() {
    let fx = mock_state();
    assert!(radio::tune_preset(&fx.state, PresetKind::Cw, "2m").is_err());
}

#[test]
fn split_reports_vfo_b() {
    let fx = mock_state();
    radio::copy_vfo_a_to_b(&fx.state).unwrap();
    assert!(radio::toggle_split(&fx.state).unwrap());

    let status = radio::get_radio_status(&fx.state).unwrap();
    let b = status.vfo_b.expect("vfo b while split");
    assert_eq!(b.frequency_hz, 14_150_000.0);
    assert_eq!(b.mode, "USB");

    assert!(!radio::toggle_split(&fx.state).unwrap());
}

#[test]
fn vfo_toggles_back_and_forth() {
    let fx = mock_state();
    assert_eq!(radio::toggle_vfo(&fx.state).unwrap(), Vfo::B);
    assert_eq!(radio::toggle_vfo(&fx.state).unwrap(), Vfo::A);
}

#[test]
fn mode_is_uppercased() {
    let fx = mock_state();
    radio::set_mode(&fx.state, "cw").unwrap();
    assert_eq!(radio::get_radio_status(&fx.state).unwrap().mode, "CW");
    assert!(radio::set_mode(&fx.state, "  ").is_err());
}

// ---------------------------------------------------------------------------
// Transmissions
// ---------------------------------------------------------------------------

#[test]
fn voice_memory_completes_on_meter_drop() {
    let fx = mock_state();
    let outcome = tx::play_memory(&fx.state, 1).unwrap().wait();

    assert_eq!(outcome, TransmissionOutcome::Completed);
    assert!(fx.state.sequencer.is_idle());
    assert!(!fx.state.sequencer.key_state().is_keyed());
    // Memories never change the mode
    assert_eq!(radio::get_radio_status(&fx.state).unwrap().mode, "USB");
}

#[test]
fn invalid_memory_slot_is_rejected_without_keying() {
    let fx = mock_state();
    assert!(tx::play_memory(&fx.state, 9).is_err());
    assert!(tx::play_memory(&fx.state, 0).is_err());
    assert!(fx.state.sequencer.is_idle());
}

#[test]
fn radio_writes_are_busy_while_keyed() {
    let fx = mock_state();
    let handle = tx::play_memory(&fx.state, 2).unwrap();
    wait_for_keyed(&fx.state);

    let err = radio::set_frequency(&fx.state, 7_050_000.0).unwrap_err();
    assert!(err.contains("in progress"), "{err}");
    assert!(radio::toggle_split(&fx.state).is_err());
    assert!(tx::play_memory(&fx.state, 3).is_err());
    // Reads still work
    assert!(radio::get_radio_status(&fx.state).is_ok());

    let status = status::get_connection_status(&fx.state);
    assert!(status.keyed);
    assert_eq!(status.keyer_state, "Keyed");

    assert!(tx::cancel_tx(&fx.state));
    assert_eq!(handle.wait(), TransmissionOutcome::Cancelled);
    assert_eq!(radio::get_radio_status(&fx.state).unwrap().frequency_hz, 14_150_000.0);
}

#[test]
fn said_text_is_sent_in_data_mode_then_restored() {
    let fx = mock_state();
    let params = SpeechParams::new(0.8, -100).unwrap();
    let outcome = tx::say_text(&fx.state, "CQ contest", &params).unwrap().wait();

    assert_eq!(outcome, TransmissionOutcome::Completed);
    assert_eq!(radio::get_radio_status(&fx.state).unwrap().mode, "USB");
    let kinds = fx.state.events.kinds();
    assert_eq!(kinds.iter().filter(|k| **k == EventKind::ModeChange).count(), 2);
}

#[test]
fn each_said_text_renders_to_its_own_file() {
    let fx = mock_state();
    let params = SpeechParams::new(1.0, 0).unwrap();
    for text in ["CQ contest", "QRZ"] {
        let outcome = tx::say_text(&fx.state, text, &params).unwrap().wait();
        assert_eq!(outcome, TransmissionOutcome::Completed);
    }

    let render_dir = fx.state.config().speech.render_dir;
    let said: Vec<_> = std::fs::read_dir(&render_dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("tts_say_"))
        .collect();
    assert_eq!(said.len(), 2, "{said:?}");
    assert!(!render_dir.join("tts_say.wav").exists());
}

#[test]
fn empty_text_is_refused() {
    let fx = mock_state();
    let err = tx::say_text(&fx.state, "   ", &SpeechParams::default()).unwrap_err();
    assert_eq!(err, "Nothing to say");
}

#[test]
fn speech_button_renders_then_sends() {
    let fx = mock_state();
    let label = fx.state.config().speech.buttons[0].label.clone();

    let path = speech::render_button(&fx.state, &label).unwrap();
    assert!(path.is_file());

    let outcome = tx::speak_button(&fx.state, &label).unwrap().wait();
    assert_eq!(outcome, TransmissionOutcome::Completed);
}

#[test]
fn speech_button_in_cw_is_refused_and_leaves_cw() {
    let fx = mock_state();
    radio::set_mode(&fx.state, "CW").unwrap();
    let label = fx.state.config().speech.buttons[0].label.clone();
    speech::render_button(&fx.state, &label).unwrap();

    let outcome = tx::speak_button(&fx.state, &label).unwrap().wait();

    assert!(matches!(outcome, TransmissionOutcome::Aborted(_)));
    assert_eq!(radio::get_radio_status(&fx.state).unwrap().mode, "CW");
    assert!(!fx.state.sequencer.key_state().is_keyed());
}

#[test]
fn prerender_writes_every_button() {
    let fx = mock_state();
    speech::prerender_buttons(&fx.state).unwrap().join().unwrap();

    let settings = fx.state.config().speech;
    for button in &settings.buttons {
        assert!(speech::button_audio_path(&settings, button).is_file(), "{}", button.label);
    }
}

// ---------------------------------------------------------------------------
// Recording and status
// ---------------------------------------------------------------------------

#[test]
fn recording_toggles_on_and_off() {
    let fx = mock_state();

    let started = match record::toggle_recording(&fx.state).unwrap() {
        record::RecordingChange::Started(path) => path,
        other => panic!("expected start, got {other:?}"),
    };
    assert_eq!(record::current_recording(&fx.state), Some(started.clone()));
    assert!(started
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("qso-"));

    assert_eq!(
        record::toggle_recording(&fx.state).unwrap(),
        record::RecordingChange::Stopped(started)
    );
    assert!(record::current_recording(&fx.state).is_none());
}

#[test]
fn connection_status_when_idle() {
    let fx = mock_state();
    let status = status::get_connection_status(&fx.state);
    assert!(status.serial_connected);
    assert_eq!(status.serial_port.as_deref(), Some("mock"));
    assert_eq!(status.keyer_state, "Idle");
    assert!(!status.keyed);
    assert!(status.recording.is_none());
}

#[test]
fn shutdown_stops_recording_and_unkeys() {
    let fx = mock_state();
    record::toggle_recording(&fx.state).unwrap();
    let handle = tx::play_memory(&fx.state, 1).unwrap();
    wait_for_keyed(&fx.state);

    fx.state.shutdown();

    assert_eq!(handle.wait(), TransmissionOutcome::Cancelled);
    assert!(record::current_recording(&fx.state).is_none());
    assert!(!fx.state.sequencer.key_state().is_keyed());
}
