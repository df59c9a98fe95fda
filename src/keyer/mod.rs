//! The transmit keyer
//!
//! - `events`: the debug event stream
//! - `ptt`: PTT Line Controller and its scoped guard
//! - `mode_guard`: temporary data-mode switch and its scope
//! - `completion`: power-meter and playback-exit detectors
//! - `sequencer`: the state machine tying them together

pub mod completion;
pub mod events;
pub mod mode_guard;
pub mod ptt;
pub mod sequencer;

pub use completion::{Completion, MeterEdge, MeterStep};
pub use events::{DebugEvent, DebugLog, EventKind};
pub use mode_guard::{ModeGuard, ModeScope};
pub use ptt::{KeyState, PttGuard, PttLine};
pub use sequencer::{
    Sequencer, SequencerParts, SequencerState, TransmissionHandle, TransmissionOutcome,
};
