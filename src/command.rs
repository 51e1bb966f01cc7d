//! Commands accepted by the [`SyncEngine`](crate::engine::SyncEngine).
//!
//! Commands arrive from the indicator context menus and from the control
//! socket (see [`ipc`](crate::ipc)).  Both use the same vocabulary so the
//! engine never learns where a request came from.
//!
//! The socket forwards raw JSON; targets for [`Command::SwitchWorkspace`]
//! may be written either as `{"monitor": 7, "workspace": 2}` or as the
//! string `"7 2"`.

use crate::model::MonitorId;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Monitor + workspace pair naming a switch target.
///
/// `workspace` is 0-based, like every index inside the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkspaceTarget {
    pub monitor: MonitorId,
    pub workspace: usize,
}

impl<'de> Deserialize<'de> for WorkspaceTarget {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Visitor;
        struct V;
        impl<'de> Visitor<'de> for V {
            type Value = WorkspaceTarget;
            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "object {{monitor, workspace}} or string \"monitor workspace\"")
            }
            fn visit_map<A>(self, mut map: A) -> Result<WorkspaceTarget, A::Error>
            where
                A: serde::de::MapAccess<'de>,
            {
                let mut monitor = None;
                let mut workspace = None;
                while let Some(k) = map.next_key::<String>()? {
                    match k.as_str() {
                        "monitor" => monitor = Some(map.next_value()?),
                        "workspace" => workspace = Some(map.next_value()?),
                        _ => {
                            let _: serde::de::IgnoredAny = map.next_value()?;
                        }
                    }
                }
                Ok(WorkspaceTarget {
                    monitor: monitor.ok_or_else(|| DeError::missing_field("monitor"))?,
                    workspace: workspace.ok_or_else(|| DeError::missing_field("workspace"))?,
                })
            }
            fn visit_str<E>(self, s: &str) -> Result<WorkspaceTarget, E>
            where
                E: DeError,
            {
                let parts: Vec<&str> = s.split_whitespace().collect();
                if parts.len() != 2 {
                    return Err(DeError::custom(format!(
                        "expected \"monitor workspace\", got {:?}",
                        s
                    )));
                }
                let monitor: MonitorId = parts[0]
                    .parse()
                    .map_err(|_| DeError::custom("monitor must be an integer id"))?;
                let workspace: usize = parts[1]
                    .parse()
                    .map_err(|_| DeError::custom("workspace must be a non-negative integer"))?;
                Ok(WorkspaceTarget { monitor, workspace })
            }
        }
        deserializer.deserialize_any(V)
    }
}

/// Every action the daemon can be asked to perform.
///
/// Unit variants are encoded as plain JSON strings (`"RefreshMonitors"`),
/// the others as single-key objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Re-read the monitor topology and rebuild every indicator.
    RefreshMonitors,

    /// Move one indicator (or all, when `None`) back to the top-centre of
    /// its monitor and forget any manual drag.
    ResetPosition(Option<MonitorId>),

    /// Ask the external tool to focus a workspace on a monitor.
    SwitchWorkspace(WorkspaceTarget),

    /// Focus the next (or previous) occupied workspace on a monitor.
    CycleWorkspace { monitor: MonitorId, forward: bool },

    /// Stop polling, hide every indicator and leave the main loop.
    Quit,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::RefreshMonitors => write!(f, "refresh monitors"),
            Command::ResetPosition(Some(id)) => write!(f, "reset position of {}", id),
            Command::ResetPosition(None) => write!(f, "reset all positions"),
            Command::SwitchWorkspace(t) => {
                write!(f, "switch monitor {} to workspace {}", t.monitor, t.workspace)
            }
            Command::CycleWorkspace { monitor, forward } => write!(
                f,
                "cycle {} on monitor {}",
                if *forward { "forward" } else { "backward" },
                monitor
            ),
            Command::Quit => write!(f, "quit"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_commands_from_strings() {
        let c: Command = serde_json::from_str(r#""RefreshMonitors""#).unwrap();
        assert_eq!(c, Command::RefreshMonitors);
        let c: Command = serde_json::from_str(r#""Quit""#).unwrap();
        assert_eq!(c, Command::Quit);
    }

    #[test]
    fn reset_position_accepts_null_and_id() {
        let c: Command = serde_json::from_str(r#"{"ResetPosition":null}"#).unwrap();
        assert_eq!(c, Command::ResetPosition(None));
        let c: Command = serde_json::from_str(r#"{"ResetPosition":65537}"#).unwrap();
        assert_eq!(c, Command::ResetPosition(Some(65537)));
    }

    #[test]
    fn switch_workspace_object_form() {
        let c: Command =
            serde_json::from_str(r#"{"SwitchWorkspace":{"monitor":4102,"workspace":2}}"#).unwrap();
        assert_eq!(
            c,
            Command::SwitchWorkspace(WorkspaceTarget {
                monitor: 4102,
                workspace: 2
            })
        );
    }

    #[test]
    fn switch_workspace_string_form() {
        let c: Command = serde_json::from_str(r#"{"SwitchWorkspace":" 7  0 "}"#).unwrap();
        assert_eq!(
            c,
            Command::SwitchWorkspace(WorkspaceTarget {
                monitor: 7,
                workspace: 0
            })
        );
    }

    #[test]
    fn switch_workspace_rejects_bad_strings() {
        assert!(serde_json::from_str::<Command>(r#"{"SwitchWorkspace":"7"}"#).is_err());
        assert!(serde_json::from_str::<Command>(r#"{"SwitchWorkspace":"7 -1"}"#).is_err());
        assert!(serde_json::from_str::<Command>(r#"{"SwitchWorkspace":{"monitor":7}}"#).is_err());
    }

    #[test]
    fn cycle_workspace_struct_variant() {
        let c: Command =
            serde_json::from_str(r#"{"CycleWorkspace":{"monitor":7,"forward":false}}"#).unwrap();
        assert_eq!(
            c,
            Command::CycleWorkspace {
                monitor: 7,
                forward: false
            }
        );
    }

    #[test]
    fn display_is_human_readable() {
        assert_eq!(Command::RefreshMonitors.to_string(), "refresh monitors");
        assert_eq!(Command::ResetPosition(None).to_string(), "reset all positions");
        assert_eq!(
            Command::CycleWorkspace {
                monitor: 3,
                forward: true
            }
            .to_string(),
            "cycle forward on monitor 3"
        );
    }
}
