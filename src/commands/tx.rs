//! TX commands: voice memories, speech buttons, ad-hoc text, cancel
//!
//! All keying goes through the sequencer; these only build the request.
//! The returned handle reports the outcome without blocking the caller.

use crate::domain::{MemorySlot, SpeechParams, TransmissionRequest};
use crate::keyer::TransmissionHandle;
use crate::state::AppState;

use super::speech::{button_audio_path, find_button, render_text, said_audio_path};

/// Play radio voice memory `slot` (1-8)
pub fn play_memory(state: &AppState, slot: u8) -> Result<TransmissionHandle, String> {
    let slot = MemorySlot::new(slot).map_err(|e| e.to_string())?;
    let label = state.config().memory_label(slot);
    state.events.info(format!("Voice keyer {label} ({slot})"));
    state
        .sequencer
        .submit(TransmissionRequest::memory(slot))
        .map_err(|e| e.to_string())
}

/// Send a pre-rendered speech button, by label or position
pub fn speak_button(state: &AppState, key: &str) -> Result<TransmissionHandle, String> {
    let settings = state.config().speech;
    let button = find_button(&settings, key).ok_or_else(|| format!("No speech button '{key}'"))?;
    let audio = button_audio_path(&settings, button);
    state
        .sequencer
        .submit(TransmissionRequest::speech(audio, button.text.clone()))
        .map_err(|e| e.to_string())
}

/// Render `text` now, then send it. Blocks for the render.
pub fn say_text(
    state: &AppState,
    text: &str,
    params: &SpeechParams,
) -> Result<TransmissionHandle, String> {
    if !state.sequencer.is_idle() {
        return Err(crate::domain::RigError::Busy.to_string());
    }
    let output = said_audio_path(&state.config().speech);
    let audio = render_text(state, text, params, &output)?;
    state
        .sequencer
        .submit(TransmissionRequest::speech(audio.clone(), text))
        .map_err(|e| {
            let _ = std::fs::remove_file(&audio);
            e.to_string()
        })
}

/// Stop the transmission in progress. Returns false if nothing was keyed.
pub fn cancel_tx(state: &AppState) -> bool {
    state.sequencer.cancel()
}
