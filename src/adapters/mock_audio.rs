//! Mock audio tools for running without piper, paplay or ffmpeg.
//!
//! Playback "lasts" a fixed time, synthesis writes a placeholder file and
//! recording just touches its output. Everything is logged at INFO.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use jiff::Zoned;

use crate::domain::{RigError, RigResult, SpeechParams};
use crate::ports::{AudioPlayer, AudioRecorder, Playback, PlaybackExit, RecordingSession, SpeechSynthesizer};

const MOCK_PLAYBACK: Duration = Duration::from_millis(1_500);

pub struct MockPlayer;

impl AudioPlayer for MockPlayer {
    fn play(&self, path: &Path) -> RigResult<Box<dyn Playback>> {
        if !path.is_file() {
            return Err(RigError::ProcessFailure(format!(
                "audio file {} does not exist",
                path.display()
            )));
        }
        log::info!("[MOCK AUDIO] paplay {}", path.display());
        Ok(Box::new(MockPlayback {
            started: Instant::now(),
        }))
    }
}

struct MockPlayback {
    started: Instant,
}

impl Playback for MockPlayback {
    fn try_wait(&mut self) -> RigResult<Option<PlaybackExit>> {
        Ok((self.started.elapsed() >= MOCK_PLAYBACK).then(|| PlaybackExit {
            code: Some(0),
            stderr: String::new(),
        }))
    }

    fn terminate(&mut self) -> RigResult<()> {
        log::info!("[MOCK AUDIO] playback terminated");
        Ok(())
    }
}

pub struct MockSynthesizer;

impl SpeechSynthesizer for MockSynthesizer {
    fn render(&self, text: &str, params: &SpeechParams, output: &Path) -> RigResult<PathBuf> {
        let params = SpeechParams::new(params.rate, params.pitch_cents)?;
        if let Some(dir) = output.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| RigError::Speech(format!("creating {}: {e}", dir.display())))?;
        }
        log::info!(
            "[MOCK AUDIO] piper \"{text}\" rate={} pitch={} → {}",
            params.rate,
            params.pitch_cents,
            output.display()
        );
        let tmp = output.with_extension("part.wav");
        std::fs::write(&tmp, b"RIFF\0\0\0\0WAVE")
            .and_then(|()| std::fs::rename(&tmp, output))
            .map_err(|e| RigError::Speech(format!("writing {}: {e}", output.display())))?;
        Ok(output.to_path_buf())
    }
}

pub struct MockRecorder {
    output_dir: PathBuf,
}

impl MockRecorder {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

impl AudioRecorder for MockRecorder {
    fn start(&self) -> RigResult<Box<dyn RecordingSession>> {
        std::fs::create_dir_all(&self.output_dir).map_err(|e| {
            RigError::Recording(format!("creating {}: {e}", self.output_dir.display()))
        })?;
        let stamp = Zoned::now().strftime("%Y%m%d_%H%M%S").to_string();
        let path = self.output_dir.join(format!("qso-{stamp}.mp3"));
        std::fs::write(&path, b"")
            .map_err(|e| RigError::Recording(format!("creating {}: {e}", path.display())))?;
        log::info!("[MOCK AUDIO] recording to {}", path.display());
        Ok(Box::new(MockRecording { path }))
    }
}

struct MockRecording {
    path: PathBuf,
}

impl RecordingSession for MockRecording {
    fn path(&self) -> &Path {
        &self.path
    }

    fn stop(self: Box<Self>) -> RigResult<PathBuf> {
        log::info!("[MOCK AUDIO] recording stopped");
        Ok(self.path)
    }
}
