//! Typed views of the JSON documents `komorebic` prints.
//!
//! Only the fields the daemon consumes are modelled.  Required fields are
//! required; optional ones carry an explicit default.  Anything whose top
//! level does not have the expected shape is rejected, never guessed at.

use crate::model::{MonitorId, RawMonitorDescriptor, Rect, WorkspaceState};
use serde::Deserialize;
use std::collections::HashMap;

//  monitor-information

/// One element of the `monitor-information` array.
#[derive(Debug, Deserialize)]
struct MonitorInfoJson {
    id: MonitorId,
    #[serde(default)]
    name: String,
    #[serde(default)]
    device: String,
    size: Rect,
}

/// Parse the output of `komorebic monitor-information`.
pub(crate) fn parse_monitor_information(json: &str) -> Result<Vec<RawMonitorDescriptor>, String> {
    let monitors: Vec<MonitorInfoJson> = serde_json::from_str(json).map_err(|e| e.to_string())?;
    Ok(monitors
        .into_iter()
        .map(|m| RawMonitorDescriptor {
            id: m.id,
            name: m.name,
            device: m.device,
            size: m.size,
        })
        .collect())
}

//  state

/// komorebi's focus ring: a list plus the index of the focused element.
#[derive(Debug, Deserialize)]
struct Ring<T> {
    #[serde(default = "Vec::new")]
    elements: Vec<T>,
    focused: usize,
}

/// Floating windows are a ring in recent komorebi releases and a bare list
/// in older ones.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RingOrVec {
    Ring {
        #[serde(default)]
        elements: Vec<serde_json::Value>,
    },
    Vec(Vec<serde_json::Value>),
}

impl RingOrVec {
    fn is_empty(&self) -> bool {
        match self {
            RingOrVec::Ring { elements } => elements.is_empty(),
            RingOrVec::Vec(v) => v.is_empty(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ContainersJson {
    #[serde(default)]
    elements: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct WorkspaceJson {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    layout: Option<serde_json::Value>,
    #[serde(default)]
    containers: ContainersJson,
    #[serde(default)]
    floating_windows: Option<RingOrVec>,
    #[serde(default)]
    maximized_window: Option<serde_json::Value>,
    #[serde(default)]
    monocle_container: Option<serde_json::Value>,
}

impl WorkspaceJson {
    fn has_windows(&self) -> bool {
        !self.containers.elements.is_empty()
            || self.floating_windows.as_ref().is_some_and(|f| !f.is_empty())
            || self.maximized_window.is_some()
            || self.monocle_container.is_some()
    }

    /// `"BSP"`, or the variant name / payload of a tagged layout such as
    /// `{"Default": "BSP"}`.
    fn layout_label(&self) -> Option<String> {
        match self.layout.as_ref()? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(map) if map.len() == 1 => {
                let (kind, payload) = map.iter().next()?;
                Some(payload.as_str().unwrap_or(kind).to_string())
            }
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StateMonitorJson {
    id: MonitorId,
    #[serde(default)]
    device: String,
    workspaces: Ring<WorkspaceJson>,
    /// Optional name table keyed by the stringified workspace index.
    #[serde(default)]
    workspace_names: HashMap<String, Option<String>>,
}

impl StateMonitorJson {
    fn is_placeholder(&self) -> bool {
        self.device == crate::model::UNKNOWN_DEVICE
    }

    fn focused_state(&self) -> WorkspaceState {
        let focused = self.workspaces.focused;
        let workspace = self.workspaces.elements.get(focused);
        let name = self
            .workspace_names
            .get(&focused.to_string())
            .cloned()
            .flatten()
            .or_else(|| workspace.and_then(|w| w.name.clone()))
            .filter(|n| !n.trim().is_empty());
        WorkspaceState {
            monitor_id: self.id,
            workspace_index: focused,
            workspace_name: name,
            workspace_layout: workspace.and_then(WorkspaceJson::layout_label),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StateJson {
    monitors: Ring<StateMonitorJson>,
}

/// Workspace states for every non-placeholder monitor in a `komorebic state`
/// dump, in the tool's monitor order.
pub(crate) fn parse_workspace_states(json: &str) -> Result<Vec<WorkspaceState>, String> {
    let state: StateJson = serde_json::from_str(json).map_err(|e| e.to_string())?;
    Ok(state
        .monitors
        .elements
        .iter()
        .filter(|m| !m.is_placeholder())
        .map(StateMonitorJson::focused_state)
        .collect())
}

/// Occupied workspace indices of `monitor` in a `komorebic state` dump.
///
/// `Ok(None)` when the monitor is not in the dump.
pub(crate) fn parse_occupied_workspaces(
    json: &str,
    monitor: MonitorId,
) -> Result<Option<Vec<usize>>, String> {
    let state: StateJson = serde_json::from_str(json).map_err(|e| e.to_string())?;
    let Some(m) = state.monitors.elements.iter().find(|m| m.id == monitor) else {
        return Ok(None);
    };
    let workspaces = &m.workspaces.elements;
    let occupied: Vec<usize> = workspaces
        .iter()
        .enumerate()
        .filter(|(_, w)| w.has_windows())
        .map(|(i, _)| i)
        .collect();
    if occupied.is_empty() {
        return Ok(Some((0..workspaces.len()).collect()));
    }
    Ok(Some(occupied))
}
