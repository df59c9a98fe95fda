//! Audio playback and recording port traits
//!
//! Both are delegated to external processes; the traits only expose what the
//! keyer needs: start, poll for exit, terminate.

use std::path::{Path, PathBuf};

use crate::domain::RigResult;

/// How a playback process ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackExit {
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
    /// Anything the player wrote to stderr
    pub stderr: String,
}

impl PlaybackExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Plays a rendered audio file into the radio's data input
pub trait AudioPlayer: Send + Sync {
    fn play(&self, path: &Path) -> RigResult<Box<dyn Playback>>;
}

/// A running playback
pub trait Playback: Send {
    /// Non-blocking exit check
    fn try_wait(&mut self) -> RigResult<Option<PlaybackExit>>;

    /// Send the terminate signal and reap the process
    fn terminate(&mut self) -> RigResult<()>;
}

/// Starts recordings of received audio
pub trait AudioRecorder: Send + Sync {
    fn start(&self) -> RigResult<Box<dyn RecordingSession>>;
}

/// A recording in progress
pub trait RecordingSession: Send {
    /// File being written
    fn path(&self) -> &Path;

    /// Stop recording and return the finished file
    fn stop(self: Box<Self>) -> RigResult<PathBuf>;
}
