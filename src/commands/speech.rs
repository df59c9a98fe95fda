//! Speech rendering commands
//!
//! Button audio lives at `<render_dir>/tts_<label>.wav`. Buttons are
//! rendered in the background at startup so a press can key immediately;
//! a press that arrives first waits for the file in the keyer. Ad-hoc text
//! gets its own `tts_say_<millis>_<n>.wav` per request.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::domain::{SpeechButton, SpeechParams, SpeechSettings};
use crate::state::AppState;

/// File a speech button renders to
pub fn button_audio_path(settings: &SpeechSettings, button: &SpeechButton) -> PathBuf {
    settings
        .render_dir
        .join(format!("tts_{}.wav", button.file_stem()))
}

const SAID_PREFIX: &str = "tts_say_";

static SAID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Fresh file for one ad-hoc render. Button stems never contain `_`, so
/// these cannot collide with button audio.
pub fn said_audio_path(settings: &SpeechSettings) -> PathBuf {
    let n = SAID_COUNTER.fetch_add(1, Ordering::Relaxed);
    let millis = jiff::Timestamp::now().as_millisecond();
    settings
        .render_dir
        .join(format!("{SAID_PREFIX}{millis}_{n}.wav"))
}

/// Remove ad-hoc renders left by earlier runs. Returns how many went.
pub fn clear_said_audio(settings: &SpeechSettings) -> usize {
    let Ok(entries) = std::fs::read_dir(&settings.render_dir) else {
        return 0;
    };
    entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(SAID_PREFIX) && name.ends_with(".wav"))
        })
        .filter(|path| std::fs::remove_file(path).is_ok())
        .count()
}

/// Find a speech button by label (case-insensitive) or 1-based position
pub fn find_button<'a>(settings: &'a SpeechSettings, key: &str) -> Option<&'a SpeechButton> {
    let key = key.trim();
    settings
        .buttons
        .iter()
        .find(|b| b.label.eq_ignore_ascii_case(key))
        .or_else(|| {
            key.parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| settings.buttons.get(i))
        })
}

/// Render `text` to `output` with the configured synthesizer (blocking).
pub fn render_text(
    state: &AppState,
    text: &str,
    params: &SpeechParams,
    output: &Path,
) -> Result<PathBuf, String> {
    if text.trim().is_empty() {
        return Err("Nothing to say".to_string());
    }
    state
        .synthesizer
        .render(text, params, output)
        .map_err(|e| e.to_string())
}

/// Render one speech button now (blocking) and return its file.
pub fn render_button(state: &AppState, key: &str) -> Result<PathBuf, String> {
    let settings = state.config().speech;
    let button = find_button(&settings, key).ok_or_else(|| format!("No speech button '{key}'"))?;
    let params = button.params().map_err(|e| e.to_string())?;
    render_text(state, &button.text, &params, &button_audio_path(&settings, button))
}

/// Render every configured speech button on a background thread.
///
/// Stale files from an earlier run are removed first so a press never
/// plays audio for text that has since changed.
pub fn prerender_buttons(state: &Arc<AppState>) -> std::io::Result<JoinHandle<()>> {
    let settings = state.config().speech;
    let cleared = clear_said_audio(&settings);
    if cleared > 0 {
        log::debug!("Removed {cleared} old ad-hoc renders");
    }
    for button in &settings.buttons {
        let path = button_audio_path(&settings, button);
        if path.exists() {
            let _ = std::fs::remove_file(&path);
        }
    }

    let state = Arc::clone(state);
    std::thread::Builder::new()
        .name("tts-prerender".into())
        .spawn(move || {
            if let Err(e) = state.synthesizer.ensure_voice() {
                state.events.error(e.to_string());
            }
            state.events.info("Pre-generating TTS audio files...");
            for button in &settings.buttons {
                let output = button_audio_path(&settings, button);
                let result = button
                    .params()
                    .and_then(|params| state.synthesizer.render(&button.text, &params, &output));
                match result {
                    Ok(path) => state
                        .events
                        .info(format!("Pre-generated TTS: {}", path.display())),
                    Err(e) => state
                        .events
                        .error(format!("TTS generation failed for {}: {e}", button.label)),
                }
            }
            state.events.info("TTS pre-generation complete");
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_said_render_gets_its_own_file() {
        let settings = SpeechSettings::default();
        let first = said_audio_path(&settings);
        let second = said_audio_path(&settings);
        assert_ne!(first, second);
        for path in [&first, &second] {
            assert!(!settings.buttons.iter().any(|b| button_audio_path(&settings, b) == *path));
        }
    }

    #[test]
    fn clearing_said_audio_keeps_button_files() {
        let dir = tempfile::tempdir().unwrap();
        let settings = SpeechSettings {
            render_dir: dir.path().to_path_buf(),
            ..SpeechSettings::default()
        };
        let button = button_audio_path(&settings, &settings.buttons[0]);
        let said = said_audio_path(&settings);
        std::fs::write(&button, b"RIFF").unwrap();
        std::fs::write(&said, b"RIFF").unwrap();

        assert_eq!(clear_said_audio(&settings), 1);
        assert!(button.exists());
        assert!(!said.exists());
    }

    #[test]
    fn audio_path_is_slugged_label() {
        let settings = SpeechSettings {
            render_dir: PathBuf::from("/tmp/rigkey"),
            ..SpeechSettings::default()
        };
        let tu = &settings.buttons[1];
        assert_eq!(
            button_audio_path(&settings, tu),
            PathBuf::from("/tmp/rigkey/tts_tu59.wav")
        );
    }

    #[test]
    fn distinct_labels_in_valid_profile_get_distinct_files() {
        let mut config = crate::domain::Configuration::default();
        config.speech.buttons.push(SpeechButton {
            label: "TU-59".into(),
            text: "Thank you, five nine".into(),
            rate: 0.72,
            pitch_cents: 0,
        });
        // "TU 59" and "TU-59" would share tts_tu59.wav
        assert!(config.validate().is_err());

        config.speech.buttons.pop();
        config.validate().unwrap();
        let settings = &config.speech;
        let mut paths: Vec<_> = settings
            .buttons
            .iter()
            .map(|b| button_audio_path(settings, b))
            .collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), settings.buttons.len());
    }

    #[test]
    fn find_button_by_label_or_position() {
        let settings = SpeechSettings::default();
        assert_eq!(find_button(&settings, "cq").unwrap().text, "CQ CQ CQ");
        assert_eq!(find_button(&settings, "3").unwrap().label, "73");
        assert_eq!(find_button(&settings, "TU 59").unwrap().label, "TU 59");
        assert!(find_button(&settings, "0").is_none());
        assert!(find_button(&settings, "QRZ").is_none());
    }
}
