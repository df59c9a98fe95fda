//! Child-process helpers shared by the external-tool adapters

use std::io::Read;
use std::process::{Child, ExitStatus};
use std::time::{Duration, Instant};

const POLL: Duration = Duration::from_millis(20);

/// Wait for `child` to exit, giving up after `timeout`.
/// Returns `Ok(None)` if it is still running.
pub fn wait_timeout(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        std::thread::sleep(POLL);
    }
}

/// Ask `child` to exit with SIGTERM, then kill it if it has not exited
/// within `grace`. Always reaps the process.
pub fn terminate(child: &mut Child, grace: Duration) -> std::io::Result<ExitStatus> {
    if let Some(status) = child.try_wait()? {
        return Ok(status);
    }
    send_sigterm(child)?;
    if let Some(status) = wait_timeout(child, grace)? {
        return Ok(status);
    }
    log::warn!("Process {} ignored SIGTERM, killing", child.id());
    child.kill()?;
    child.wait()
}

#[cfg(unix)]
fn send_sigterm(child: &Child) -> std::io::Result<()> {
    let pid = child.id() as libc::pid_t;
    // SAFETY: kill(2) has no memory-safety preconditions; the pid belongs to
    // a child we have not reaped yet, so it cannot have been recycled.
    let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn send_sigterm(child: &mut Child) -> std::io::Result<()> {
    child.kill()
}

/// Drain a piped stderr after the child has exited.
pub fn take_stderr(child: &mut Child) -> String {
    let mut out = String::new();
    if let Some(mut stderr) = child.stderr.take() {
        let _ = stderr.read_to_string(&mut out);
    }
    out.trim().to_string()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::{Command, Stdio};

    #[test]
    fn terminate_stops_a_sleeping_child() {
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        let started = Instant::now();
        let status = terminate(&mut child, Duration::from_secs(2)).unwrap();
        assert!(!status.success());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn wait_timeout_reports_still_running() {
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        assert!(wait_timeout(&mut child, Duration::from_millis(50)).unwrap().is_none());
        terminate(&mut child, Duration::from_secs(1)).unwrap();
    }

    #[test]
    fn stderr_is_captured() {
        let mut child = Command::new("sh")
            .args(["-c", "echo broken >&2; exit 3"])
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        let status = wait_timeout(&mut child, Duration::from_secs(5)).unwrap().unwrap();
        assert_eq!(status.code(), Some(3));
        assert_eq!(take_stderr(&mut child), "broken");
    }
}
