//! Running child processes with a timeout and bounded output.

use std::io::Read;
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// Captured child process output. Only the last bytes of each stream are kept.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_dropped: usize,
    pub stderr_dropped: usize,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn stdout_tail(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_tail(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// How long reader threads may keep draining after a timed-out command's
/// process tree was killed.
const KILL_GRACE: Duration = Duration::from_secs(2);

type ReaderHandle = thread::JoinHandle<Result<(Vec<u8>, usize)>>;

/// Run a command with a timeout, keeping the trailing `tail_limit_bytes` of
/// stdout and stderr.
///
/// Both pipes are drained concurrently while the child runs so a chatty build
/// cannot deadlock on a full pipe. On timeout the whole process tree is
/// killed, not just the direct child: package managers spawn node and
/// electron-builder processes that inherit the pipes.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs(), tail_limit_bytes = tail_limit_bytes))]
pub fn run_command_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    tail_limit_bytes: usize,
) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    cmd.process_group(0);

    debug!(program = ?cmd.get_program(), "spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).context("spawn command");
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let stdout_handle = thread::spawn(move || read_stream_tail(stdout, tail_limit_bytes));
    let stderr_handle = thread::spawn(move || read_stream_tail(stderr, tail_limit_bytes));

    let mut timed_out = false;
    let status = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => status,
        None => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "command timed out, killing"
            );
            timed_out = true;
            kill_tree(&mut child).context("kill command")?;
            child.wait().context("wait command after kill")?
        }
    };

    let (stdout, stdout_dropped, stderr, stderr_dropped) = if timed_out {
        let deadline = Instant::now() + KILL_GRACE;
        let (stdout, stdout_dropped) = join_output_until(stdout_handle, deadline)?;
        let (stderr, stderr_dropped) = join_output_until(stderr_handle, deadline)?;
        (stdout, stdout_dropped, stderr, stderr_dropped)
    } else {
        let (stdout, stdout_dropped) = join_output(stdout_handle).context("join stdout")?;
        let (stderr, stderr_dropped) = join_output(stderr_handle).context("join stderr")?;
        (stdout, stdout_dropped, stderr, stderr_dropped)
    };

    debug!(exit_code = ?status.code(), timed_out, stdout_dropped, stderr_dropped, "command finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        stdout_dropped,
        stderr_dropped,
        timed_out,
    })
}

fn join_output(handle: ReaderHandle) -> Result<(Vec<u8>, usize)> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

/// Join a reader thread unless a process outside the killed tree still holds
/// the pipe open past `deadline`. In that case the reader is detached and its
/// output is lost.
fn join_output_until(handle: ReaderHandle, deadline: Instant) -> Result<(Vec<u8>, usize)> {
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            warn!("output pipe still open after kill, abandoning reader");
            return Ok((Vec::new(), 0));
        }
        thread::sleep(Duration::from_millis(10));
    }
    join_output(handle)
}

/// Kill the child and every process it started.
#[cfg(unix)]
fn kill_tree(child: &mut Child) -> Result<()> {
    // The child leads its own process group, so its pid is the group id.
    let group = format!("-{}", child.id());
    match Command::new("kill")
        .args(["-KILL", "--", group.as_str()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        Ok(status) if status.success() => Ok(()),
        Ok(status) => {
            warn!(exit_code = ?status.code(), "process group kill failed, killing child only");
            child.kill().context("kill child")
        }
        Err(err) => {
            warn!(err = %err, "could not run kill, killing child only");
            child.kill().context("kill child")
        }
    }
}

/// Kill the child and every process it started.
#[cfg(windows)]
fn kill_tree(child: &mut Child) -> Result<()> {
    let pid = child.id().to_string();
    match Command::new("taskkill")
        .args(["/T", "/F", "/PID", pid.as_str()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        Ok(status) if status.success() => Ok(()),
        Ok(status) => {
            warn!(exit_code = ?status.code(), "taskkill failed, killing child only");
            child.kill().context("kill child")
        }
        Err(err) => {
            warn!(err = %err, "could not run taskkill, killing child only");
            child.kill().context("kill child")
        }
    }
}

#[cfg(not(any(unix, windows)))]
fn kill_tree(child: &mut Child) -> Result<()> {
    child.kill().context("kill child")
}

/// Drain `reader`, keeping only the last `limit` bytes. Returns the kept bytes
/// and the number of leading bytes discarded.
fn read_stream_tail<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut dropped = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.len() > limit {
            let excess = buf.len() - limit;
            buf.drain(..excess);
            dropped += excess;
        }
    }

    Ok((buf, dropped))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_keeps_last_bytes() {
        let input = b"0123456789".repeat(2000);
        let (kept, dropped) = read_stream_tail(&input[..], 15).expect("read");
        assert_eq!(kept, b"567890123456789");
        assert_eq!(dropped, input.len() - 15);
    }

    #[test]
    fn short_stream_is_kept_whole() {
        let (kept, dropped) = read_stream_tail(&b"ok\n"[..], 3000).expect("read");
        assert_eq!(kept, b"ok\n");
        assert_eq!(dropped, 0);
    }

    #[cfg(unix)]
    #[test]
    fn captures_exit_status_and_output() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo out; echo err >&2; exit 3");
        let output = run_command_with_timeout(cmd, Duration::from_secs(10), 3000).expect("run");
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(output.stdout_tail(), "out\n");
        assert_eq!(output.stderr_tail(), "err\n");
        assert!(!output.timed_out);
    }

    #[cfg(unix)]
    #[test]
    fn kills_on_timeout() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("exec sleep 5");
        let output = run_command_with_timeout(cmd, Duration::from_millis(100), 3000).expect("run");
        assert!(output.timed_out);
        assert!(!output.status.success());
    }

    #[cfg(unix)]
    #[test]
    fn timeout_kills_grandchildren_holding_the_pipes() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("sleep 6; echo done");
        let started = Instant::now();
        let output = run_command_with_timeout(cmd, Duration::from_millis(200), 3000).expect("run");
        let elapsed = started.elapsed();
        assert!(output.timed_out);
        assert!(elapsed < Duration::from_secs(4), "returned after {elapsed:?}");
        assert!(!output.stdout_tail().contains("done"));
    }

    #[test]
    fn spawn_failure_is_an_error() {
        let cmd = Command::new("definitely-not-a-real-binary-7f3a");
        assert!(run_command_with_timeout(cmd, Duration::from_secs(1), 10).is_err());
    }
}
