//! Bounded invocation of the `komorebic` executable.
//!
//! Every call spawns one child process, drains its pipes on helper threads
//! and polls for exit until the deadline.  A child that outlives the
//! deadline is killed and reaped.  Collecting the drained output is bounded
//! by the same deadline: a grandchild that inherited a pipe can keep it
//! open long after the child exits, and its drain thread is then left to
//! finish on its own.  The caller is never blocked for longer than the
//! configured timeout (plus one poll interval).

use super::SourceError;
use log::trace;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

/// How often the child is polled for exit.
const POLL_STEP: Duration = Duration::from_millis(10);

/// Hide the console window komorebic would otherwise flash on Windows.
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Run `program args…` and return its trimmed stdout.
///
/// Fails with [`SourceError::ToolNotFound`] when `program` cannot be found,
/// [`SourceError::Timeout`] when it does not exit within `timeout`, and
/// [`SourceError::Failed`] on a non-zero exit status.
pub(crate) fn run(program: &Path, args: &[&str], timeout: Duration) -> Result<String, SourceError> {
    let command = args.join(" ");
    trace!("exec {} {}", program.display(), command);

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }

    let mut child = cmd.spawn().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => SourceError::ToolNotFound(program.display().to_string()),
        _ => SourceError::Io {
            command: command.clone(),
            source: e,
        },
    })?;

    let deadline = Instant::now() + timeout;
    let (tx, rx) = mpsc::channel();
    let mut pipes = 0;
    if let Some(pipe) = child.stdout.take() {
        drain(pipe, Stream::Stdout, tx.clone());
        pipes += 1;
    }
    if let Some(pipe) = child.stderr.take() {
        drain(pipe, Stream::Stderr, tx.clone());
        pipes += 1;
    }
    drop(tx);

    let status = match wait_until(&mut child, deadline) {
        Ok(Some(status)) => status,
        Ok(None) => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(SourceError::Timeout {
                command,
                after: timeout,
            });
        }
        Err(e) => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(SourceError::Io { command, source: e });
        }
    };

    let (mut stdout, mut stderr) = (String::new(), String::new());
    for _ in 0..pipes {
        match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok((Stream::Stdout, text)) => stdout = text,
            Ok((Stream::Stderr, text)) => stderr = text,
            Err(RecvTimeoutError::Timeout) => {
                return Err(SourceError::Timeout {
                    command,
                    after: timeout,
                });
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    if !status.success() {
        return Err(SourceError::Failed {
            command,
            status: status.to_string(),
            stderr: stderr.trim().to_string(),
        });
    }
    Ok(stdout.trim().to_string())
}

/// Poll `child` until it exits or `deadline` passes (`Ok(None)`).
fn wait_until(
    child: &mut Child,
    deadline: Instant,
) -> std::io::Result<Option<std::process::ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        std::thread::sleep(POLL_STEP.min(deadline - now));
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Read `pipe` to EOF on a helper thread and send the text back on `tx`.
fn drain<R: Read + Send + 'static>(mut pipe: R, stream: Stream, tx: Sender<(Stream, String)>) {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send((stream, String::from_utf8_lossy(&buf).into_owned()));
    });
}
