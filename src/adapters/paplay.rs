//! Audio playback through PulseAudio's `paplay`
//!
//! The radio's USB audio codec is the default sink while keyed, so the
//! player only needs the file path.

use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use super::process;
use crate::domain::{RigError, RigResult};
use crate::ports::{AudioPlayer, Playback, PlaybackExit};

const TERMINATE_GRACE: Duration = Duration::from_millis(500);

pub struct PaplayPlayer {
    program: String,
}

impl PaplayPlayer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl AudioPlayer for PaplayPlayer {
    fn play(&self, path: &Path) -> RigResult<Box<dyn Playback>> {
        if !path.is_file() {
            return Err(RigError::ProcessFailure(format!(
                "audio file {} does not exist",
                path.display()
            )));
        }
        let child = Command::new(&self.program)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                RigError::ProcessFailure(format!("failed to start {}: {e}", self.program))
            })?;
        log::debug!("{} started (pid {}) for {}", self.program, child.id(), path.display());
        Ok(Box::new(ChildPlayback {
            child,
            reaped: false,
        }))
    }
}

struct ChildPlayback {
    child: Child,
    reaped: bool,
}

impl Playback for ChildPlayback {
    fn try_wait(&mut self) -> RigResult<Option<PlaybackExit>> {
        let status = self
            .child
            .try_wait()
            .map_err(|e| RigError::ProcessFailure(format!("waiting for player: {e}")))?;
        Ok(status.map(|status| {
            self.reaped = true;
            PlaybackExit {
                code: status.code(),
                stderr: process::take_stderr(&mut self.child),
            }
        }))
    }

    fn terminate(&mut self) -> RigResult<()> {
        if self.reaped {
            return Ok(());
        }
        process::terminate(&mut self.child, TERMINATE_GRACE)
            .map_err(|e| RigError::ProcessFailure(format!("terminating player: {e}")))?;
        self.reaped = true;
        Ok(())
    }
}

impl Drop for ChildPlayback {
    fn drop(&mut self) {
        if !self.reaped {
            let _ = process::terminate(&mut self.child, TERMINATE_GRACE);
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_process_failure() {
        let player = PaplayPlayer::new("paplay");
        let result = player.play(Path::new("/nonexistent/rigkey.wav"));
        assert!(matches!(result, Err(RigError::ProcessFailure(_))));
    }

    #[test]
    fn exit_code_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("tone.wav");
        std::fs::write(&audio, b"RIFF").unwrap();

        // `false` ignores its argument and exits 1, like a player with no sink
        let player = PaplayPlayer::new("false");
        let mut playback = player.play(&audio).unwrap();
        let exit = loop {
            if let Some(exit) = playback.try_wait().unwrap() {
                break exit;
            }
            std::thread::sleep(Duration::from_millis(10));
        };
        assert_eq!(exit.code, Some(1));
        assert!(!exit.success());
    }

    #[test]
    fn terminate_after_exit_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("tone.wav");
        std::fs::write(&audio, b"RIFF").unwrap();

        let mut playback = PaplayPlayer::new("true").play(&audio).unwrap();
        while playback.try_wait().unwrap().is_none() {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(playback.terminate().is_ok());
    }
}
