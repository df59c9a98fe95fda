//! Adapters: implementations of the port traits
//!
//! - `flrig`: radio control over flrig's XML-RPC interface
//! - `serial_line`: RTS/DTR control line and CI-V writes via `serialport`
//! - `paplay`, `piper`, `ffmpeg_recorder`: external audio tools
//! - `mock_radio`, `mock_audio`: in-memory stand-ins for running without
//!   hardware (`--mock` / `MOCK_RADIO=1`)

pub mod ffmpeg_recorder;
pub mod flrig;
pub mod mock_audio;
pub mod mock_radio;
pub mod paplay;
pub mod piper;
pub mod process;
pub mod serial_line;
