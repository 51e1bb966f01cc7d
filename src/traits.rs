//! Core traits that decouple the engine from the external tool, the
//! platform and the widget toolkit.
//!
//! The [`SyncEngine`](crate::engine::SyncEngine) only depends on these
//! abstractions.  Concrete backends live in [`komorebi`](crate::komorebi)
//! (state source), [`hyprland`](crate::hyprland) (fullscreen probe),
//! [`indicator`](crate::indicator) (surfaces) and [`ipc`](crate::ipc)
//! (command source).

use crate::command::Command;
use crate::komorebi::SourceError;
use crate::model::{FocusedWindow, MonitorId, MonitorIdentity, RawMonitorDescriptor, WorkspaceState};
use std::sync::mpsc;

/// Read access to the external window manager's state, plus a best-effort
/// workspace switch.
///
/// Every call issues a fresh query.  Implementations keep no cache; the
/// engine owns all caching and comparison.
pub trait StateSource {
    /// Lightweight liveness check.  Never fails; any error reads as `false`.
    fn is_available(&self) -> bool;

    /// Full monitor list, placeholder entries included.
    fn snapshot_topology(&self) -> Result<Vec<RawMonitorDescriptor>, SourceError>;

    /// One [`WorkspaceState`] per valid monitor, from a single query.
    fn snapshot_all_workspace_states(&self) -> Result<Vec<WorkspaceState>, SourceError>;

    /// Focused workspace index of the focused monitor.
    ///
    /// Only used to seed the cache when the full-state query fails.
    fn focused_workspace_index(&self) -> Result<usize, SourceError>;

    /// Indices of workspaces on `monitor` that hold at least one window.
    ///
    /// When nothing is occupied every workspace index is returned so that
    /// cycling still has somewhere to go.
    fn occupied_workspaces(&self, monitor: MonitorId) -> Result<Vec<usize>, SourceError>;

    /// Ask the tool to focus `workspace` on `monitor`.
    ///
    /// Returns `false` on any failure.  A `true` only means the command was
    /// accepted, not that the switch has happened yet.
    fn request_workspace_switch(&self, monitor: MonitorId, workspace: usize) -> bool;
}

/// Reports the currently focused top-level window.
pub trait FullscreenProbe {
    /// `None` when nothing is focused or the platform query failed.
    fn focused_window(&self) -> Option<FocusedWindow>;
}

//  Indicator surfaces

/// One on-screen indicator.
///
/// Surfaces are created, mutated and destroyed on the engine's thread only.
pub trait IndicatorSurface {
    fn set_label(&mut self, text: &str);

    /// Move the surface so its top-left corner sits at `(x, y)` in screen
    /// coordinates.
    fn place(&mut self, x: i32, y: i32);

    /// Current width in pixels, after the last label change.
    fn width(&self) -> i32;

    fn set_visible(&mut self, visible: bool);

    /// Whether the user dragged this surface since it was created or since
    /// the last [`clear_dragged`](IndicatorSurface::clear_dragged).
    fn was_dragged(&self) -> bool;

    fn clear_dragged(&mut self);

    /// Tear the surface down.  Called exactly once.
    fn destroy(self);
}

/// Creates [`IndicatorSurface`]s for monitors.
pub trait SurfaceFactory {
    type Surface: IndicatorSurface;

    /// Create a hidden surface on `monitor` showing `label`.
    fn create(&mut self, monitor: &MonitorIdentity, label: &str) -> Self::Surface;
}

//  Command Source

/// A source of [`Command`]s.
///
/// Implementations listen on some transport and forward parsed commands
/// into the provided [`mpsc::Sender`].
///
/// # Contract
///
/// * [`run`](CommandSource::run) **blocks** until the source is exhausted or
///   an unrecoverable error occurs.
/// * Each received command must be sent through `sink` exactly once.
/// * Implementations must be [`Send`] so they can run on a dedicated thread.
pub trait CommandSource: Send {
    /// The error type produced by this source.
    type Error: std::error::Error + Send + 'static;

    /// Start listening and forward every incoming [`Command`] into `sink`.
    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// A test double that emits a fixed sequence of commands.
    struct MockSource {
        commands: Vec<Command>,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("mock error")]
    struct MockError;

    impl CommandSource for MockSource {
        type Error = MockError;

        fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), MockError> {
            for cmd in self.commands.drain(..) {
                let _ = sink.send(cmd);
            }
            Ok(())
        }
    }

    #[test]
    fn mock_source_emits_commands() {
        let mut src = MockSource {
            commands: vec![Command::RefreshMonitors, Command::ResetPosition(Some(3))],
        };
        let (tx, rx) = mpsc::channel();
        src.run(tx).unwrap();
        let cmds: Vec<Command> = rx.try_iter().collect();
        assert_eq!(cmds, vec![Command::RefreshMonitors, Command::ResetPosition(Some(3))]);
    }

    /// Probe that hands out a scripted sequence of answers.
    struct ScriptedProbe(RefCell<Vec<Option<FocusedWindow>>>);

    impl FullscreenProbe for ScriptedProbe {
        fn focused_window(&self) -> Option<FocusedWindow> {
            self.0.borrow_mut().pop().flatten()
        }
    }

    #[test]
    fn probe_is_object_safe() {
        let probe: Box<dyn FullscreenProbe> = Box::new(ScriptedProbe(RefCell::new(vec![
            None,
            Some(FocusedWindow {
                title: "game".into(),
                rect: crate::model::Rect::new(0, 0, 1920, 1080),
            }),
        ])));
        assert_eq!(probe.focused_window().map(|w| w.title), Some("game".into()));
        assert!(probe.focused_window().is_none());
        assert!(probe.focused_window().is_none());
    }
}
