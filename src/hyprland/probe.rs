//! [`FullscreenProbe`] backed by Hyprland IPC.
//!
//! Talks to Hyprland through its Unix socket at
//! `$XDG_RUNTIME_DIR/hypr/$HYPRLAND_INSTANCE_SIGNATURE/.socket.sock`,
//! without spawning `hyprctl`.

use crate::model::{FocusedWindow, Rect};
use crate::traits::FullscreenProbe;
use log::trace;
use serde::Deserialize;
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound on one IPC round trip; the probe runs on every tick.
const IPC_TIMEOUT: Duration = Duration::from_millis(250);

/// Errors that can occur when talking to Hyprland.
#[derive(Debug, thiserror::Error)]
#[error("hyprland IPC error: {0}")]
pub struct HyprlandProbeError(String);

/// Hyprland-backed fullscreen probe.
///
/// Each call opens a short-lived connection; nothing is held between ticks.
pub struct HyprlandProbe {
    socket: PathBuf,
}

impl HyprlandProbe {
    /// Locate the socket of the running Hyprland instance.
    pub fn from_env() -> Result<Self, HyprlandProbeError> {
        Ok(Self {
            socket: socket_path()?,
        })
    }

    /// Use an explicit socket path.
    pub fn with_socket(socket: impl AsRef<Path>) -> Self {
        Self {
            socket: socket.as_ref().to_path_buf(),
        }
    }

    pub fn active_window(&self) -> Result<Option<FocusedWindow>, HyprlandProbeError> {
        let json = ipc_request(&self.socket, "j/activewindow")?;
        parse_active_window(&json)
    }
}

impl FullscreenProbe for HyprlandProbe {
    fn focused_window(&self) -> Option<FocusedWindow> {
        match self.active_window() {
            Ok(w) => w,
            Err(e) => {
                trace!("{}", e);
                None
            }
        }
    }
}

//  Direct Hyprland IPC helpers

/// Resolve the Hyprland command socket path.
///
/// Hyprland ≥ 0.40 stores its sockets at
/// `$XDG_RUNTIME_DIR/hypr/$HYPRLAND_INSTANCE_SIGNATURE/.socket.sock`.
fn socket_path() -> Result<PathBuf, HyprlandProbeError> {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR")
        .map_err(|_| HyprlandProbeError("XDG_RUNTIME_DIR not set".into()))?;
    let his = std::env::var("HYPRLAND_INSTANCE_SIGNATURE")
        .map_err(|_| HyprlandProbeError("HYPRLAND_INSTANCE_SIGNATURE not set".into()))?;
    Ok(PathBuf::from(format!(
        "{}/hypr/{}/.socket.sock",
        runtime_dir, his
    )))
}

/// Send a raw request and return the whole response.
fn ipc_request(path: &Path, command: &str) -> Result<String, HyprlandProbeError> {
    let mut stream = UnixStream::connect(path)
        .map_err(|e| HyprlandProbeError(format!("connect to {}: {}", path.display(), e)))?;
    stream
        .set_read_timeout(Some(IPC_TIMEOUT))
        .and_then(|_| stream.set_write_timeout(Some(IPC_TIMEOUT)))
        .map_err(|e| HyprlandProbeError(format!("timeout: {}", e)))?;

    stream
        .write_all(command.as_bytes())
        .map_err(|e| HyprlandProbeError(format!("write: {}", e)))?;

    let mut response = Vec::new();
    stream
        .read_to_end(&mut response)
        .map_err(|e| HyprlandProbeError(format!("read: {}", e)))?;

    String::from_utf8(response).map_err(|e| HyprlandProbeError(format!("utf-8: {}", e)))
}

/// Subset of the JSON object returned by `j/activewindow`.
#[derive(Deserialize)]
struct ActiveWindowJson {
    #[serde(default)]
    title: String,
    at: (i32, i32),
    size: (i32, i32),
}

/// Hyprland answers `{}` when nothing is focused.
fn parse_active_window(json: &str) -> Result<Option<FocusedWindow>, HyprlandProbeError> {
    if json.trim() == "{}" {
        return Ok(None);
    }
    let w: ActiveWindowJson =
        serde_json::from_str(json).map_err(|e| HyprlandProbeError(format!("parse: {}", e)))?;
    let (x, y) = w.at;
    let (width, height) = w.size;
    Ok(Some(FocusedWindow {
        title: w.title,
        rect: Rect::new(x, y, x + width, y + height),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::net::UnixListener;
    use std::sync::atomic::{AtomicU32, Ordering};

    static TEST_ID: AtomicU32 = AtomicU32::new(0);

    fn temp_socket() -> PathBuf {
        let id = TEST_ID.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!(
            "wsindicator-hypr-{}-{}.sock",
            std::process::id(),
            id
        ))
    }

    /// Serve a single canned response, returning the request it received.
    fn serve_once(path: &Path, response: &'static str) -> std::thread::JoinHandle<String> {
        let listener = UnixListener::bind(path).unwrap();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 64];
            let n = stream.read(&mut buf).unwrap();
            stream.write_all(response.as_bytes()).unwrap();
            String::from_utf8_lossy(&buf[..n]).into_owned()
        })
    }

    #[test]
    fn parse_focused_window() {
        let json = r#"{"address":"0x55d","at":[1920,0],"size":[2560,1440],
                       "title":"mpv","fullscreen":2,"monitor":1}"#;
        let w = parse_active_window(json).unwrap().unwrap();
        assert_eq!(w.title, "mpv");
        assert_eq!(w.rect, Rect::new(1920, 0, 4480, 1440));
    }

    #[test]
    fn parse_nothing_focused() {
        assert!(parse_active_window("{}").unwrap().is_none());
        assert!(parse_active_window(" {}\n").unwrap().is_none());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_active_window("unknown request").is_err());
        assert!(parse_active_window(r#"{"title":"x"}"#).is_err());
    }

    #[test]
    fn probe_queries_activewindow() {
        let path = temp_socket();
        let server = serve_once(
            &path,
            r#"{"at":[0,0],"size":[1920,1080],"title":"game"}"#,
        );
        let probe = HyprlandProbe::with_socket(&path);
        let w = probe.focused_window().unwrap();
        assert_eq!(w.rect, Rect::new(0, 0, 1920, 1080));
        assert_eq!(server.join().unwrap(), "j/activewindow");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_socket_reads_as_unfocused() {
        let probe = HyprlandProbe::with_socket("/nonexistent/hypr/.socket.sock");
        assert!(probe.active_window().is_err());
        assert!(probe.focused_window().is_none());
    }
}
