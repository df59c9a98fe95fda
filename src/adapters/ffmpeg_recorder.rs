//! QSO recording through ffmpeg's PulseAudio input
//!
//! One input is recorded as-is; two or more are merged into a single
//! multi-channel file with `amerge`. ffmpeg's stderr goes to the debug
//! stream line by line.

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use jiff::Zoned;

use super::process;
use crate::domain::{RecordingSettings, RigError, RigResult};
use crate::keyer::DebugLog;
use crate::ports::{AudioRecorder, RecordingSession};

const STOP_GRACE: Duration = Duration::from_secs(2);

pub struct FfmpegRecorder {
    program: String,
    inputs: Vec<String>,
    output_dir: PathBuf,
    events: DebugLog,
}

impl FfmpegRecorder {
    pub fn new(settings: &RecordingSettings, events: DebugLog) -> Self {
        Self {
            program: settings.ffmpeg_program.clone(),
            inputs: settings.inputs.clone(),
            output_dir: settings.output_dir.clone(),
            events,
        }
    }
}

impl AudioRecorder for FfmpegRecorder {
    fn start(&self) -> RigResult<Box<dyn RecordingSession>> {
        std::fs::create_dir_all(&self.output_dir).map_err(|e| {
            RigError::Recording(format!("creating {}: {e}", self.output_dir.display()))
        })?;
        let stamp = Zoned::now().strftime("%Y%m%d_%H%M%S").to_string();
        let path = self.output_dir.join(format!("qso-{stamp}.mp3"));
        let args = ffmpeg_args(&self.inputs, &path)?;

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RigError::Recording(format!("failed to start {}: {e}", self.program)))?;

        self.events
            .info(format!("Recording started: {}", path.display()));
        self.events
            .info(format!("FFmpeg command: {} {}", self.program, args.join(" ")));

        if let Some(stderr) = child.stderr.take() {
            let events = self.events.clone();
            std::thread::Builder::new()
                .name("ffmpeg-stderr".into())
                .spawn(move || {
                    for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                        let line = line.trim();
                        if !line.is_empty() {
                            events.info(format!("ffmpeg: {line}"));
                        }
                    }
                })
                .map_err(|e| RigError::Recording(format!("spawning stderr reader: {e}")))?;
        }

        Ok(Box::new(FfmpegSession {
            child,
            path,
            events: self.events.clone(),
            stopped: false,
        }))
    }
}

struct FfmpegSession {
    child: Child,
    path: PathBuf,
    events: DebugLog,
    stopped: bool,
}

impl RecordingSession for FfmpegSession {
    fn path(&self) -> &Path {
        &self.path
    }

    fn stop(mut self: Box<Self>) -> RigResult<PathBuf> {
        self.events.info("Stopping recording...");
        self.stopped = true;
        process::terminate(&mut self.child, STOP_GRACE)
            .map_err(|e| RigError::Recording(format!("stopping ffmpeg: {e}")))?;
        self.events.info(format!("Recording stopped: {}", self.path.display()));
        Ok(self.path.clone())
    }
}

impl Drop for FfmpegSession {
    fn drop(&mut self) {
        if !self.stopped {
            let _ = process::terminate(&mut self.child, STOP_GRACE);
        }
    }
}

/// Command line for recording `inputs` into `output`
fn ffmpeg_args(inputs: &[String], output: &Path) -> RigResult<Vec<String>> {
    if inputs.is_empty() {
        return Err(RigError::Recording("no recording inputs configured".into()));
    }
    let mut args = vec!["-y".to_string()];
    for input in inputs {
        args.extend(["-f".to_string(), "pulse".to_string(), "-i".to_string(), input.clone()]);
    }
    if inputs.len() > 1 {
        let streams: String = (0..inputs.len()).map(|i| format!("[{i}:a]")).collect();
        args.push("-filter_complex".to_string());
        args.push(format!("{streams}amerge=inputs={}[aout]", inputs.len()));
        args.extend(["-map".to_string(), "[aout]".to_string()]);
        args.extend(["-ac".to_string(), "2".to_string()]);
    }
    args.push(output.to_string_lossy().into_owned());
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_input_has_no_filter() {
        let args = ffmpeg_args(&["default".to_string()], Path::new("/tmp/qso.mp3")).unwrap();
        assert_eq!(args, ["-y", "-f", "pulse", "-i", "default", "/tmp/qso.mp3"]);
    }

    #[test]
    fn two_inputs_are_merged_to_stereo() {
        let inputs = vec!["radio".to_string(), "mic".to_string()];
        let args = ffmpeg_args(&inputs, Path::new("/tmp/qso.mp3")).unwrap();
        assert_eq!(
            args,
            [
                "-y",
                "-f",
                "pulse",
                "-i",
                "radio",
                "-f",
                "pulse",
                "-i",
                "mic",
                "-filter_complex",
                "[0:a][1:a]amerge=inputs=2[aout]",
                "-map",
                "[aout]",
                "-ac",
                "2",
                "/tmp/qso.mp3"
            ]
        );
    }

    #[test]
    fn no_inputs_is_an_error() {
        assert!(matches!(
            ffmpeg_args(&[], Path::new("/tmp/qso.mp3")),
            Err(RigError::Recording(_))
        ));
    }

    #[test]
    fn missing_ffmpeg_is_recording_error() {
        let settings = RecordingSettings {
            ffmpeg_program: "/nonexistent/ffmpeg".into(),
            ..RecordingSettings::default()
        };
        let recorder = FfmpegRecorder::new(&settings, DebugLog::new());
        assert!(matches!(recorder.start(), Err(RigError::Recording(_))));
    }
}
