//! QSO recording commands

use std::path::PathBuf;

use crate::state::AppState;

#[derive(Debug, Clone, PartialEq)]
pub enum RecordingChange {
    Started(PathBuf),
    Stopped(PathBuf),
}

/// Start recording if idle, otherwise stop the recording in progress.
pub fn toggle_recording(state: &AppState) -> Result<RecordingChange, String> {
    let mut slot = state
        .recording
        .lock()
        .map_err(|_| "Recording state corrupted".to_string())?;
    match slot.take() {
        Some(session) => {
            let path = session.stop().map_err(|e| e.to_string())?;
            Ok(RecordingChange::Stopped(path))
        }
        None => {
            let session = state.recorder.start().map_err(|e| e.to_string())?;
            let path = session.path().to_path_buf();
            *slot = Some(session);
            Ok(RecordingChange::Started(path))
        }
    }
}

/// File being recorded, if any
pub fn current_recording(state: &AppState) -> Option<PathBuf> {
    state
        .recording
        .lock()
        .ok()?
        .as_ref()
        .map(|session| session.path().to_path_buf())
}
