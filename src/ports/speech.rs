//! Speech synthesis port trait

use std::path::{Path, PathBuf};

use crate::domain::{RigResult, SpeechParams};

/// Renders text to a mono audio file suitable for the radio's data input
pub trait SpeechSynthesizer: Send + Sync {
    /// Render `text` to `output` and return the path to play.
    ///
    /// `output` must only appear once rendering is complete, so a caller
    /// waiting for the file never picks up a half-written one.
    fn render(&self, text: &str, params: &SpeechParams, output: &Path) -> RigResult<PathBuf>;

    /// Make sure the voice model is installed. Default: nothing to do.
    fn ensure_voice(&self) -> RigResult<()> {
        Ok(())
    }
}
