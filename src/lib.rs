//! rigkey: transceiver control panel and fail-safe voice keyer
//!
//! Drives an Icom transceiver through flrig (frequency, mode, split, VFO)
//! and keys it over a serial RTS line to play radio voice memories or
//! synthesized speech, guaranteeing the transmitter is never left keyed.
//!
//! ## Architecture (Hexagonal / Ports & Adapters)
//!
//! - `domain/` - Pure domain types, no I/O dependencies
//! - `ports/` - Trait definitions (interfaces) for external dependencies
//! - `civ/` - CI-V voice-memory frames (pure encoding)
//! - `xmlrpc/` - XML-RPC client used to talk to flrig
//! - `keyer/` - PTT controller, mode guard, completion detectors, sequencer
//! - `adapters/` - Implementations of ports (flrig, serialport, piper, paplay, ffmpeg, mocks)
//! - `commands/` - Command handlers (driving adapters)
//! - `state` - Application state
//! - `cli`, `console` - Command-line and interactive front end

use std::process::ExitCode;

use clap::Parser;

// Core domain (pure, no I/O)
pub mod civ;
pub mod domain;
pub mod keyer;
pub mod ports;
pub mod xmlrpc;

// Adapters (external I/O)
pub mod adapters;

// Front end
pub mod cli;
pub mod commands;
pub mod console;
pub mod state;

fn init_logging(log_file: Option<&std::path::Path>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("rigkey_lib=info"));
    if let Some(path) = log_file {
        match std::fs::File::create(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!("Could not open log file {}: {e}", path.display()),
        }
    }
    let _ = builder.try_init();
}

pub fn run() -> ExitCode {
    let cli = cli::Cli::parse();
    init_logging(cli.log_file.as_deref());
    log::info!("rigkey {} starting", env!("CARGO_PKG_VERSION"));

    match cli::execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
