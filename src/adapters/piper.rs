//! Speech synthesis with Piper, post-processed by sox
//!
//! Piper reads text on stdin and writes a WAV file. When a pitch shift or a
//! fixed sample rate is requested the file is run through sox. The rendered
//! file is written under a temporary name and renamed into place last.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use super::process;
use crate::domain::{RigError, RigResult, SpeechParams, SpeechSettings};
use crate::ports::SpeechSynthesizer;

const MODEL_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);
const SOX_TIMEOUT: Duration = Duration::from_secs(30);
const KILL_GRACE: Duration = Duration::from_millis(500);

pub struct PiperSynthesizer {
    piper: String,
    sox: String,
    model: String,
    sample_rate: Option<u32>,
    timeout: Duration,
}

impl PiperSynthesizer {
    pub fn from_settings(settings: &SpeechSettings) -> Self {
        Self {
            piper: settings.piper_program.clone(),
            sox: settings.sox_program.clone(),
            model: settings.model.clone(),
            sample_rate: settings.sample_rate,
            timeout: Duration::from_millis(settings.render_timeout_ms),
        }
    }

    fn run_piper(&self, text: &str, rate: f64, output: &Path) -> RigResult<()> {
        let mut child = Command::new(&self.piper)
            .args(piper_args(&self.model, rate, output))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RigError::Speech(format!("failed to start {}: {e}", self.piper)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(format!("{text}\n").as_bytes())
                .map_err(|e| RigError::Speech(format!("writing text to piper: {e}")))?;
        }

        let status = process::wait_timeout(&mut child, self.timeout)
            .map_err(|e| RigError::Speech(format!("waiting for piper: {e}")))?;
        let Some(status) = status else {
            let _ = process::terminate(&mut child, KILL_GRACE);
            return Err(RigError::Speech(format!(
                "piper timed out after {:?}",
                self.timeout
            )));
        };
        if !status.success() || !output.is_file() {
            return Err(RigError::Speech(format!(
                "TTS generation failed for {}: {}",
                output.display(),
                process::take_stderr(&mut child)
            )));
        }
        Ok(())
    }

    fn run_sox(&self, input: &Path, output: &Path, effects: &[String]) -> RigResult<()> {
        let mut child = Command::new(&self.sox)
            .arg(input)
            .arg(output)
            .args(effects)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RigError::Speech(format!("failed to start {}: {e}", self.sox)))?;

        match process::wait_timeout(&mut child, SOX_TIMEOUT) {
            Ok(Some(status)) if status.success() => Ok(()),
            Ok(Some(_)) => Err(RigError::Speech(process::take_stderr(&mut child))),
            Ok(None) => {
                let _ = process::terminate(&mut child, KILL_GRACE);
                Err(RigError::Speech("sox timed out".into()))
            }
            Err(e) => Err(RigError::Speech(format!("waiting for sox: {e}"))),
        }
    }
}

impl SpeechSynthesizer for PiperSynthesizer {
    fn render(&self, text: &str, params: &SpeechParams, output: &Path) -> RigResult<PathBuf> {
        let params = SpeechParams::new(params.rate, params.pitch_cents)?;
        if let Some(dir) = output.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| RigError::Speech(format!("creating {}: {e}", dir.display())))?;
        }
        let raw = sibling(output, "raw");
        self.run_piper(text, params.rate, &raw)?;

        let effects = sox_effects(&params, self.sample_rate);
        let rendered = if effects.is_empty() {
            raw
        } else {
            let processed = sibling(output, "fx");
            match self.run_sox(&raw, &processed, &effects) {
                Ok(()) => {
                    let _ = std::fs::remove_file(&raw);
                    processed
                }
                Err(e) => {
                    log::warn!("sox post-processing failed, using unshifted audio: {e}");
                    let _ = std::fs::remove_file(&processed);
                    raw
                }
            }
        };

        std::fs::rename(&rendered, output).map_err(|e| {
            RigError::Speech(format!("moving {} into place: {e}", rendered.display()))
        })?;
        let size = std::fs::metadata(output).map(|m| m.len()).unwrap_or(0);
        log::info!("Rendered TTS: {} ({size} bytes)", output.display());
        Ok(output.to_path_buf())
    }

    fn ensure_voice(&self) -> RigResult<()> {
        log::info!("Checking for Piper voice model: {}", self.model);
        let mut child = Command::new("python3")
            .args(["-m", "piper.download_voices", &self.model])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RigError::Speech(format!("failed to start voice download: {e}")))?;

        match process::wait_timeout(&mut child, MODEL_DOWNLOAD_TIMEOUT) {
            Ok(Some(status)) if status.success() => {
                log::info!("Piper voice model '{}' ready", self.model);
                Ok(())
            }
            Ok(Some(_)) => Err(RigError::Speech(format!(
                "Failed to download Piper voice model: {}",
                process::take_stderr(&mut child)
            ))),
            Ok(None) => {
                let _ = process::terminate(&mut child, KILL_GRACE);
                Err(RigError::Speech(
                    "Piper model download timed out (5 min timeout exceeded)".into(),
                ))
            }
            Err(e) => Err(RigError::Speech(format!("waiting for voice download: {e}"))),
        }
    }
}

fn piper_args(model: &str, rate: f64, output: &Path) -> Vec<String> {
    vec![
        "--model".to_string(),
        model.to_string(),
        "--output_file".to_string(),
        output.to_string_lossy().into_owned(),
        "--length-scale".to_string(),
        format!("{rate}"),
    ]
}

/// sox effect chain for a render, empty when no post-processing is needed
fn sox_effects(params: &SpeechParams, sample_rate: Option<u32>) -> Vec<String> {
    let mut effects = Vec::new();
    if params.pitch_cents != 0 {
        effects.push("pitch".to_string());
        effects.push(params.pitch_cents.to_string());
    }
    if let Some(rate) = sample_rate {
        effects.extend(["rate".to_string(), rate.to_string()]);
        effects.extend(["channels".to_string(), "1".to_string()]);
    }
    effects
}

/// `tts_cq.wav` → `tts_cq.<tag>.wav`
fn sibling(output: &Path, tag: &str) -> PathBuf {
    output.with_extension(format!("{tag}.wav"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn piper_arguments() {
        let args = piper_args("en_US-hfc_male-medium", 0.55, Path::new("/tmp/tts_73.raw.wav"));
        assert_eq!(
            args,
            [
                "--model",
                "en_US-hfc_male-medium",
                "--output_file",
                "/tmp/tts_73.raw.wav",
                "--length-scale",
                "0.55"
            ]
        );
    }

    #[test]
    fn no_effects_without_pitch_or_rate() {
        assert!(sox_effects(&SpeechParams::default(), None).is_empty());
    }

    #[test]
    fn pitch_and_resample_effects() {
        let params = SpeechParams::new(0.55, 150).unwrap();
        assert_eq!(
            sox_effects(&params, Some(48_000)),
            ["pitch", "150", "rate", "48000", "channels", "1"]
        );
    }

    #[test]
    fn temporary_names_sit_next_to_output() {
        assert_eq!(
            sibling(Path::new("/tmp/tts_cq.wav"), "raw"),
            PathBuf::from("/tmp/tts_cq.raw.wav")
        );
    }

    #[test]
    fn out_of_range_rate_is_rejected_before_spawning() {
        let synth = PiperSynthesizer::from_settings(&SpeechSettings {
            piper_program: "/nonexistent/piper".into(),
            ..SpeechSettings::default()
        });
        let params = SpeechParams {
            rate: 3.0,
            pitch_cents: 0,
        };
        let result = synth.render("CQ", &params, Path::new("/tmp/never.wav"));
        assert!(matches!(result, Err(RigError::Speech(msg)) if msg.contains("rate")));
    }

    #[test]
    fn missing_piper_binary_is_speech_error() {
        let dir = tempfile::tempdir().unwrap();
        let synth = PiperSynthesizer::from_settings(&SpeechSettings {
            piper_program: "/nonexistent/piper".into(),
            ..SpeechSettings::default()
        });
        let output = dir.path().join("tts.wav");
        let result = synth.render("CQ", &SpeechParams::default(), &output);
        assert!(matches!(result, Err(RigError::Speech(_))));
        assert!(!output.exists());
    }
}
