//! Interactive console
//!
//! A single-threaded loop on a 100 ms tick. A reader thread turns stdin
//! lines into commands; the loop runs them, prints new debug events, polls
//! the radio status every couple of seconds and reports transmission
//! outcomes. Nothing in the loop waits on a transmission.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::io::{self, BufRead};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::commands::{self, record::RecordingChange};
use crate::domain::{PresetKind, SpeechParams};
use crate::keyer::{DebugLog, TransmissionHandle, TransmissionOutcome};
use crate::state::AppState;

const TICK: Duration = Duration::from_millis(100);
const STATUS_POLL: Duration = Duration::from_secs(2);

const HELP: &str = "\
Commands:
  status               radio and keyer status
  freq <MHz>           set VFO A frequency
  mode <MODE>          set mode (USB, LSB, CW, USB-D ...)
  cw <band>            CW band preset (10m 12m 15m 20m 40m)
  ssb <band>           SSB band preset
  split | vfo | copy   toggle split, toggle VFO A/B, copy VFO A to B
  m<1-8>               play radio voice memory
  tts <button>         send a speech button (label or number)
  say <text>           render and send text
  rec                  start/stop QSO recording
  ports                list serial ports
  clear                clear the debug stream
  <Enter>              cancel the transmission in progress
  quit";

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Status,
    Freq(f64),
    Mode(String),
    Preset(PresetKind, String),
    Split,
    Vfo,
    CopyVfo,
    Memory(u8),
    Speak(String),
    Say(String),
    Cancel,
    Record,
    Ports,
    Clear,
    Help,
    Quit,
}

/// Parse one console line. An empty line means cancel.
pub fn parse_line(line: &str) -> Result<ConsoleCommand, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let need_arg = |what: &str| {
        if rest.is_empty() {
            Err(format!("usage: {word} <{what}>"))
        } else {
            Ok(rest.to_string())
        }
    };

    match word.to_ascii_lowercase().as_str() {
        "" | "cancel" | "stop" => Ok(ConsoleCommand::Cancel),
        "status" | "s" => Ok(ConsoleCommand::Status),
        "freq" | "f" => need_arg("MHz")?
            .parse::<f64>()
            .map(ConsoleCommand::Freq)
            .map_err(|e| format!("bad frequency: {e}")),
        "mode" => need_arg("mode").map(ConsoleCommand::Mode),
        "cw" => need_arg("band").map(|b| ConsoleCommand::Preset(PresetKind::Cw, b)),
        "ssb" => need_arg("band").map(|b| ConsoleCommand::Preset(PresetKind::Ssb, b)),
        "split" => Ok(ConsoleCommand::Split),
        "vfo" => Ok(ConsoleCommand::Vfo),
        "copy" => Ok(ConsoleCommand::CopyVfo),
        "mem" => need_arg("slot")?
            .parse::<u8>()
            .map(ConsoleCommand::Memory)
            .map_err(|e| format!("bad slot: {e}")),
        "tts" => need_arg("button").map(ConsoleCommand::Speak),
        "say" => need_arg("text").map(ConsoleCommand::Say),
        "rec" => Ok(ConsoleCommand::Record),
        "ports" => Ok(ConsoleCommand::Ports),
        "clear" => Ok(ConsoleCommand::Clear),
        "help" | "?" => Ok(ConsoleCommand::Help),
        "quit" | "q" | "exit" => Ok(ConsoleCommand::Quit),
        other => match other.strip_prefix('m').map(str::parse::<u8>) {
            Some(Ok(slot)) => Ok(ConsoleCommand::Memory(slot)),
            _ => Err(format!("unknown command '{word}' (try help)")),
        },
    }
}

fn spawn_stdin_reader(tx: Sender<String>) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new().name("stdin".into()).spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break; // console has exited
            }
        }
        log::debug!("Stdin reader thread exiting");
    })
}

/// Block until the operator presses Enter (or stdin closes).
pub fn wait_for_enter() {
    let mut line = String::new();
    let _ = io::stdin().lock().read_line(&mut line);
}

fn print_events(events: &DebugLog, cursor: &mut usize) {
    for event in events.since(*cursor) {
        println!("{event}");
    }
    *cursor = events.len();
}

/// Print events and wait for `handle`, cancelling on Enter.
pub fn follow_transmission(
    state: &AppState,
    mut handle: TransmissionHandle,
    mut cursor: usize,
) -> TransmissionOutcome {
    println!("Transmitting - press Enter to cancel");
    let (tx, enter) = unbounded();
    // The reader stays blocked on stdin after we return; it dies with the process
    let _ = spawn_stdin_reader(tx);

    loop {
        if let Some(outcome) = handle.wait_timeout(TICK) {
            print_events(&state.events, &mut cursor);
            return outcome;
        }
        if enter.try_recv().is_ok() {
            state.sequencer.cancel();
        }
        print_events(&state.events, &mut cursor);
    }
}

type Rendered = Result<TransmissionHandle, String>;

struct Console {
    state: Arc<AppState>,
    active: Option<TransmissionHandle>,
    /// Handles from `say`, which renders off the loop thread
    rendered: (Sender<Rendered>, Receiver<Rendered>),
    cursor: usize,
    last_status: Option<String>,
}

impl Console {
    /// Returns false on quit
    fn handle(&mut self, command: ConsoleCommand) -> bool {
        let state = Arc::clone(&self.state);
        let state = state.as_ref();
        let result: Result<Option<String>, String> = match command {
            ConsoleCommand::Quit => return false,
            ConsoleCommand::Help => Ok(Some(HELP.to_string())),
            ConsoleCommand::Cancel => {
                if commands::tx::cancel_tx(state) {
                    Ok(None)
                } else {
                    Ok(Some("Nothing to cancel".to_string()))
                }
            }
            ConsoleCommand::Status => commands::radio::get_radio_status(state).map(|s| {
                let c = commands::status::get_connection_status(state);
                Some(format!(
                    "{s}\nSerial: {} | Keyer: {} | PTT: {}",
                    c.serial_port.as_deref().unwrap_or("not connected"),
                    c.keyer_state,
                    if c.keyed { "ON" } else { "OFF" }
                ))
            }),
            ConsoleCommand::Freq(mhz) => commands::radio::set_frequency(state, mhz * 1e6)
                .map(|()| Some(format!("VFO A @ {mhz:.3} MHz"))),
            ConsoleCommand::Mode(mode) => {
                commands::radio::set_mode(state, &mode).map(|()| Some(format!("Mode {mode}")))
            }
            ConsoleCommand::Preset(kind, band) => commands::radio::tune_preset(state, kind, &band)
                .map(|p| Some(format!("{} @ {}", p.mode, p.frequency()))),
            ConsoleCommand::Split => commands::radio::toggle_split(state)
                .map(|on| Some(format!("Split {}", if on { "ON" } else { "OFF" }))),
            ConsoleCommand::Vfo => {
                commands::radio::toggle_vfo(state).map(|v| Some(format!("VFO {v}")))
            }
            ConsoleCommand::CopyVfo => commands::radio::copy_vfo_a_to_b(state).map(|()| None),
            ConsoleCommand::Memory(slot) => {
                commands::tx::play_memory(state, slot).map(|h| self.track(h))
            }
            ConsoleCommand::Speak(button) => {
                commands::tx::speak_button(state, &button).map(|h| self.track(h))
            }
            ConsoleCommand::Say(text) => self.say(text),
            ConsoleCommand::Record => {
                commands::record::toggle_recording(state).map(|change| match change {
                    RecordingChange::Started(p) => Some(format!("Recording to {}", p.display())),
                    RecordingChange::Stopped(p) => Some(format!("Recording saved: {}", p.display())),
                })
            }
            ConsoleCommand::Ports => commands::radio::list_serial_ports().map(|ports| {
                Some(
                    ports
                        .iter()
                        .map(|p| format!("{}  {}", p.name, p.port_type))
                        .collect::<Vec<_>>()
                        .join("\n"),
                )
            }),
            ConsoleCommand::Clear => {
                state.events.clear();
                self.cursor = state.events.len();
                Ok(None)
            }
        };

        match result {
            Ok(Some(text)) => println!("{text}"),
            Ok(None) => {}
            Err(e) => println!("Error: {e}"),
        }
        true
    }

    fn track(&mut self, handle: TransmissionHandle) -> Option<String> {
        self.active = Some(handle);
        None
    }

    /// Render off the loop thread, then hand the handle back through a channel.
    fn say(&mut self, text: String) -> Result<Option<String>, String> {
        if self.active.is_some() || !self.state.sequencer.is_idle() {
            return Err(crate::domain::RigError::Busy.to_string());
        }
        let state = Arc::clone(&self.state);
        let tx = self.rendered.0.clone();
        thread::Builder::new()
            .name("tts-say".into())
            .spawn(move || {
                let result = commands::tx::say_text(&state, &text, &SpeechParams::default());
                let _ = tx.send(result);
            })
            .map_err(|e| format!("failed to start renderer: {e}"))?;
        Ok(Some("Rendering...".to_string()))
    }

    fn tick(&mut self, last_poll: &mut Instant) {
        match self.rendered.1.try_recv() {
            Ok(Ok(handle)) => self.active = Some(handle),
            Ok(Err(e)) => println!("Error: {e}"),
            Err(_) => {}
        }

        if let Some(handle) = &mut self.active {
            if let Some(outcome) = handle.try_outcome() {
                self.active = None;
                print_events(&self.state.events, &mut self.cursor);
                println!("Transmission {outcome}");
            }
        }

        print_events(&self.state.events, &mut self.cursor);

        if last_poll.elapsed() >= STATUS_POLL {
            *last_poll = Instant::now();
            if let Ok(status) = commands::radio::get_radio_status(&self.state) {
                let line = status.to_string();
                if self.last_status.as_deref() != Some(line.as_str()) {
                    println!("{line}");
                    self.last_status = Some(line);
                }
            }
        }
    }
}

/// Run the interactive console until quit or end of input.
pub fn run_console(state: Arc<AppState>) -> Result<(), String> {
    if let Err(e) = commands::speech::prerender_buttons(&state) {
        state.events.error(format!("Could not start TTS pre-render: {e}"));
    }

    let (tx, lines) = unbounded();
    spawn_stdin_reader(tx).map_err(|e| format!("failed to start stdin reader: {e}"))?;

    println!("{HELP}");
    let mut console = Console {
        state,
        active: None,
        rendered: unbounded(),
        cursor: 0,
        last_status: None,
    };
    let mut last_poll = Instant::now()
        .checked_sub(STATUS_POLL)
        .unwrap_or_else(Instant::now);

    loop {
        match lines.recv_timeout(TICK) {
            Ok(line) => match parse_line(&line) {
                Ok(command) => {
                    if !console.handle(command) {
                        break;
                    }
                }
                Err(e) => println!("{e}"),
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        console.tick(&mut last_poll);
    }

    if console.active.is_some() {
        console.state.sequencer.cancel();
    }
    Ok(())
}
