//! [`StateSource`] implementation backed by the `komorebic` CLI.
//!
//! Each method spawns one `komorebic` process with a fixed timeout and
//! parses its output.  Nothing is cached between calls.

use super::exec;
use super::schema;
use crate::model::{MonitorId, RawMonitorDescriptor, WorkspaceState};
use crate::traits::StateSource;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default executable name, resolved through `PATH`.
pub const DEFAULT_KOMOREBIC: &str = "komorebic";

/// Default per-query timeout.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur when querying the external tool.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("`{command}` timed out after {}ms", .after.as_millis())]
    Timeout { command: String, after: Duration },

    #[error("executable not found: {0}")]
    ToolNotFound(String),

    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("malformed response to `{command}`: {reason}")]
    Malformed { command: String, reason: String },

    #[error("io error running `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown monitor id {0}")]
    UnknownMonitor(MonitorId),

    #[error("switching monitor {monitor} to workspace {workspace} failed: {reason}")]
    SwitchFailed {
        monitor: MonitorId,
        workspace: usize,
        reason: String,
    },
}

/// Scalar queries understood by `komorebic query`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    Version,
    FocusedMonitorIndex,
    FocusedWorkspaceIndex,
    FocusedWorkspaceName,
    FocusedWorkspaceLayout,
}

impl Query {
    pub fn as_arg(self) -> &'static str {
        match self {
            Query::Version => "version",
            Query::FocusedMonitorIndex => "focused-monitor-index",
            Query::FocusedWorkspaceIndex => "focused-workspace-index",
            Query::FocusedWorkspaceName => "focused-workspace-name",
            Query::FocusedWorkspaceLayout => "focused-workspace-layout",
        }
    }
}

/// `komorebic`-backed state source.
pub struct KomorebicSource {
    program: PathBuf,
    timeout: Duration,
}

impl Default for KomorebicSource {
    fn default() -> Self {
        Self::new(DEFAULT_KOMOREBIC, DEFAULT_QUERY_TIMEOUT)
    }
}

impl KomorebicSource {
    /// Create a source that runs `program` with the given per-call timeout.
    ///
    /// No process is spawned until the first query.
    pub fn new(program: impl AsRef<Path>, timeout: Duration) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            timeout,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn exec(&self, args: &[&str]) -> Result<String, SourceError> {
        exec::run(&self.program, args, self.timeout)
    }

    /// Run `komorebic query <kind>` and return the trimmed answer.
    ///
    /// An empty answer reads as `None`.
    pub fn query(&self, kind: Query) -> Result<Option<String>, SourceError> {
        let out = self.exec(&["query", kind.as_arg()])?;
        Ok(Some(out).filter(|s| !s.is_empty()))
    }

    fn query_index(&self, kind: Query) -> Result<usize, SourceError> {
        let command = format!("query {}", kind.as_arg());
        let text = self.query(kind)?.ok_or_else(|| SourceError::Malformed {
            command: command.clone(),
            reason: "empty output".into(),
        })?;
        text.parse().map_err(|_| SourceError::Malformed {
            command,
            reason: format!("expected an index, got {:?}", text),
        })
    }

    fn state_json(&self) -> Result<String, SourceError> {
        self.exec(&["state"])
    }

    /// Position of `monitor` in the tool's unfiltered monitor list, which is
    /// the index `focus-monitor-workspace` expects.
    fn monitor_index_of(&self, monitor: MonitorId) -> Result<usize, SourceError> {
        self.snapshot_topology()?
            .iter()
            .position(|m| m.id == monitor)
            .ok_or(SourceError::UnknownMonitor(monitor))
    }

    fn switch(&self, monitor: MonitorId, workspace: usize) -> Result<(), SourceError> {
        let index = self.monitor_index_of(monitor)?;
        let index = index.to_string();
        let workspace_arg = workspace.to_string();
        self.exec(&["focus-monitor-workspace", &index, &workspace_arg])
            .map(|_| ())
            .map_err(|e| SourceError::SwitchFailed {
                monitor,
                workspace,
                reason: e.to_string(),
            })
    }
}

impl StateSource for KomorebicSource {
    fn is_available(&self) -> bool {
        match self.query(Query::Version) {
            Ok(Some(version)) => {
                debug!("komorebic version {}", version);
                true
            }
            Ok(None) => {
                warn!("komorebic returned an empty version");
                false
            }
            Err(e) => {
                warn!("komorebi is not reachable: {}", e);
                false
            }
        }
    }

    fn snapshot_topology(&self) -> Result<Vec<RawMonitorDescriptor>, SourceError> {
        let json = self.exec(&["monitor-information"])?;
        schema::parse_monitor_information(&json).map_err(|reason| SourceError::Malformed {
            command: "monitor-information".into(),
            reason,
        })
    }

    fn snapshot_all_workspace_states(&self) -> Result<Vec<WorkspaceState>, SourceError> {
        let json = self.state_json()?;
        let states = schema::parse_workspace_states(&json).map_err(|reason| {
            SourceError::Malformed {
                command: "state".into(),
                reason,
            }
        })?;
        for s in &states {
            debug!("monitor {} on workspace {}", s.monitor_id, s.workspace_index);
        }
        Ok(states)
    }

    fn focused_workspace_index(&self) -> Result<usize, SourceError> {
        self.query_index(Query::FocusedWorkspaceIndex)
    }

    fn occupied_workspaces(&self, monitor: MonitorId) -> Result<Vec<usize>, SourceError> {
        let json = self.state_json()?;
        schema::parse_occupied_workspaces(&json, monitor)
            .map_err(|reason| SourceError::Malformed {
                command: "state".into(),
                reason,
            })?
            .ok_or(SourceError::UnknownMonitor(monitor))
    }

    fn request_workspace_switch(&self, monitor: MonitorId, workspace: usize) -> bool {
        match self.switch(monitor, workspace) {
            Ok(()) => {
                info!("requested workspace {} on monitor {}", workspace, monitor);
                true
            }
            Err(e) => {
                warn!("{}", e);
                false
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn missing_tool_is_unavailable() {
        let src = KomorebicSource::new("/nonexistent/komorebic", Duration::from_secs(1));
        assert!(!src.is_available());
        assert!(matches!(
            src.snapshot_all_workspace_states(),
            Err(SourceError::ToolNotFound(_))
        ));
        assert!(!src.request_workspace_switch(7, 1));
    }

    #[test]
    fn failing_tool_is_unavailable() {
        let src = KomorebicSource::new("/bin/false", Duration::from_secs(1));
        assert!(!src.is_available());
        assert!(matches!(src.snapshot_topology(), Err(SourceError::Failed { .. })));
    }

    #[test]
    fn echo_output_is_malformed_state() {
        // `echo state` prints "state", which is not JSON.
        let src = KomorebicSource::new("/bin/echo", Duration::from_secs(1));
        assert!(src.is_available());
        assert!(matches!(
            src.snapshot_all_workspace_states(),
            Err(SourceError::Malformed { .. })
        ));
        assert!(matches!(
            src.focused_workspace_index(),
            Err(SourceError::Malformed { .. })
        ));
    }

    #[test]
    fn query_arguments() {
        assert_eq!(Query::Version.as_arg(), "version");
        assert_eq!(Query::FocusedWorkspaceLayout.as_arg(), "focused-workspace-layout");
    }
}
