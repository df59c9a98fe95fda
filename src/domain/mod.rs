//! Core domain types
//!
//! Pure types with no I/O dependencies. These represent the core concepts
//! of the control panel: frequencies, transmission requests, mode snapshots,
//! the band plan and saved configuration profiles.

pub mod band;
pub mod config;
pub mod error;
pub mod types;

pub use band::*;
pub use config::*;
pub use error::*;
pub use types::*;
