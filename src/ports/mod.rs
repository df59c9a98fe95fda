//! Port traits (interfaces)
//!
//! These traits define the boundaries between the keyer core and external I/O.
//! Adapters implement these traits to connect to real hardware, the radio
//! control daemon and external audio tools.

pub mod audio;
pub mod control_line;
pub mod radio;
pub mod speech;

pub use audio::*;
pub use control_line::*;
pub use radio::*;
pub use speech::*;
