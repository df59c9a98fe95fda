//! Driving commands
//!
//! Each command takes the shared `AppState`, does one thing the front end
//! asks for, and maps errors to `String` for display.

pub mod config;
pub mod radio;
pub mod record;
pub mod speech;
pub mod status;
pub mod tx;
