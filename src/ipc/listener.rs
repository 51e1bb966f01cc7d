//! Unix-socket [`CommandSource`] implementation.
//!
//! Binds a Unix stream socket and accepts one connection at a time.
//! Each line received is parsed as a JSON-encoded [`Command`].
//!
//! # Wire format
//!
//! Every message is a single line of JSON followed by `\n`:
//!
//! ```json
//! "RefreshMonitors"
//! {"ResetPosition":null}
//! {"ResetPosition":65537}
//! {"SwitchWorkspace":{"monitor":7,"workspace":2}}
//! {"CycleWorkspace":{"monitor":7,"forward":true}}
//! "Quit"
//! ```
//!
//! Unit commands may also be sent bare (`RefreshMonitors`), which is handy
//! from a shell.

use crate::command::Command;
use crate::traits::CommandSource;
use log::{debug, error, info, warn};
use std::io::{BufRead, BufReader};
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

/// `$XDG_RUNTIME_DIR/<name>.sock`, or the temp dir when the runtime dir is
/// not set.
pub fn default_socket_path(name: &str) -> PathBuf {
    let dir = std::env::var_os("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir);
    dir.join(format!("{}.sock", name))
}

/// A [`CommandSource`] that listens on a Unix stream socket for
/// JSON-encoded commands.
///
/// Each accepted connection can send multiple newline-delimited commands.
/// When the connection closes, the listener waits for the next one.
pub struct UnixSocketListener {
    path: PathBuf,
}

/// Errors produced by the Unix socket listener.
#[derive(Debug, thiserror::Error)]
pub enum UnixSocketError {
    #[error("cannot bind {path}: {source}")]
    Bind {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl UnixSocketListener {
    /// The socket file is created when [`run`](CommandSource::run) is called.
    /// A stale file at `path` is replaced.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Parse one line of input.
fn parse_line(text: &str) -> Result<Command, serde_json::Error> {
    let text = text.trim();
    match serde_json::from_str::<Command>(text) {
        Ok(cmd) => Ok(cmd),
        Err(e) if text.chars().all(|c| c.is_ascii_alphabetic()) => {
            serde_json::from_str::<Command>(&format!("\"{}\"", text)).map_err(|_| e)
        }
        Err(e) => Err(e),
    }
}

impl CommandSource for UnixSocketListener {
    type Error = UnixSocketError;

    /// Bind the socket and start accepting connections.
    ///
    /// This method **blocks** until the receiving end of `sink` is dropped
    /// and the next command arrives.  Run it on a dedicated thread.
    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error> {
        let _ = std::fs::remove_file(&self.path);

        let listener = UnixListener::bind(&self.path).map_err(|source| UnixSocketError::Bind {
            path: self.path.clone(),
            source,
        })?;
        info!("control socket listening on {}", self.path.display());

        for stream in listener.incoming() {
            let stream = match stream {
                Ok(s) => s,
                Err(e) => {
                    error!("accept error: {}", e);
                    continue;
                }
            };
            debug!("control client connected");
            for line in BufReader::new(stream).lines() {
                let text = match line {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("read error: {}", e);
                        break;
                    }
                };
                if text.trim().is_empty() {
                    continue;
                }
                match parse_line(&text) {
                    Ok(cmd) => {
                        info!("control socket: {}", cmd);
                        if sink.send(cmd).is_err() {
                            info!("engine gone, closing control socket");
                            let _ = std::fs::remove_file(&self.path);
                            return Ok(());
                        }
                    }
                    Err(e) => warn!("bad command {:?}: {}", text, e),
                }
            }
            debug!("control client disconnected");
        }
        Ok(())
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::WorkspaceTarget;
    use std::io::Write;
    use std::os::unix::net::UnixStream;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Monotonic counter to generate unique socket paths per test.
    static TEST_ID: AtomicU32 = AtomicU32::new(0);

    fn tmp_socket_path() -> PathBuf {
        let id = TEST_ID.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!(
            "wsindicator-test-{}-{}.sock",
            std::process::id(),
            id
        ))
    }

    fn spawn_listener(path: &Path) -> mpsc::Receiver<Command> {
        let (tx, rx) = mpsc::channel();
        let path = path.to_path_buf();
        std::thread::spawn(move || {
            let mut listener = UnixSocketListener::new(&path);
            let _ = listener.run(tx);
        });
        // Give the listener a moment to bind.
        std::thread::sleep(Duration::from_millis(150));
        rx
    }

    fn collect(rx: &mpsc::Receiver<Command>, n: usize) -> Vec<Command> {
        (0..n)
            .filter_map(|_| rx.recv_timeout(Duration::from_secs(2)).ok())
            .collect()
    }

    #[test]
    fn commands_arrive_in_order() {
        let path = tmp_socket_path();
        let rx = spawn_listener(&path);

        {
            let mut stream = UnixStream::connect(&path).expect("connect");
            writeln!(stream, r#""RefreshMonitors""#).unwrap();
            writeln!(stream, r#"{{"SwitchWorkspace":{{"monitor":7,"workspace":2}}}}"#).unwrap();
            writeln!(stream, r#"{{"ResetPosition":null}}"#).unwrap();
            stream.shutdown(std::net::Shutdown::Write).unwrap();
        }

        let cmds = collect(&rx, 3);
        assert_eq!(
            cmds,
            vec![
                Command::RefreshMonitors,
                Command::SwitchWorkspace(WorkspaceTarget {
                    monitor: 7,
                    workspace: 2
                }),
                Command::ResetPosition(None),
            ]
        );
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let path = tmp_socket_path();
        let rx = spawn_listener(&path);

        {
            let mut stream = UnixStream::connect(&path).expect("connect");
            writeln!(stream, "not json at all").unwrap();
            writeln!(stream).unwrap();
            writeln!(stream, r#"{{"CycleWorkspace":{{"monitor":7,"forward":true}}}}"#).unwrap();
            stream.shutdown(std::net::Shutdown::Write).unwrap();
        }

        let cmds = collect(&rx, 1);
        assert_eq!(
            cmds,
            vec![Command::CycleWorkspace {
                monitor: 7,
                forward: true
            }]
        );
        std::thread::sleep(Duration::from_millis(50));
        assert!(rx.try_recv().is_err());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn serves_successive_clients() {
        let path = tmp_socket_path();
        let rx = spawn_listener(&path);

        for _ in 0..2 {
            let mut stream = UnixStream::connect(&path).expect("connect");
            writeln!(stream, "Quit").unwrap();
        }

        assert_eq!(collect(&rx, 2), vec![Command::Quit, Command::Quit]);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn bare_unit_commands() {
        assert_eq!(parse_line("RefreshMonitors").unwrap(), Command::RefreshMonitors);
        assert_eq!(parse_line("  Quit ").unwrap(), Command::Quit);
        assert!(parse_line("Frobnicate").is_err());
        assert!(parse_line("SwitchWorkspace").is_err());
    }

    #[test]
    fn bind_failure_is_reported() {
        let mut listener = UnixSocketListener::new("/nonexistent/dir/wsindicator.sock");
        let (tx, _rx) = mpsc::channel();
        assert!(matches!(listener.run(tx), Err(UnixSocketError::Bind { .. })));
    }

    #[test]
    fn default_path_ends_with_name() {
        let p = default_socket_path("wsindicator");
        assert_eq!(p.file_name().unwrap(), "wsindicator.sock");
    }
}
