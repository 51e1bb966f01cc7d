//! Data types shared by every component.
//!
//! [`RawMonitorDescriptor`] is what the external tool reports,
//! [`MonitorIdentity`] is what the [`MonitorRegistry`](crate::registry::MonitorRegistry)
//! resolves it into, and [`WorkspaceState`] is one monitor's focused
//! workspace at one instant.

use std::fmt;

/// Opaque monitor id assigned by the external tool.
///
/// Not necessarily small or contiguous.
pub type MonitorId = i64;

/// Device tag the external tool uses for placeholder monitors.
pub const UNKNOWN_DEVICE: &str = "UNKNOWN";

/// Axis-aligned rectangle in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Horizontal centre, rounded towards the left edge.
    pub fn center_x(&self) -> i32 {
        (self.left + self.right).div_euclid(2)
    }

    /// Whether every edge of `self` lies within `tolerance` pixels of the
    /// corresponding edge of `other`.
    pub fn matches(&self, other: &Rect, tolerance: i32) -> bool {
        (self.left - other.left).abs() <= tolerance
            && (self.top - other.top).abs() <= tolerance
            && (self.right - other.right).abs() <= tolerance
            && (self.bottom - other.bottom).abs() <= tolerance
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} at ({}, {})",
            self.width(),
            self.height(),
            self.left,
            self.top
        )
    }
}

/// A monitor record exactly as the external tool reports it, placeholders
/// included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMonitorDescriptor {
    pub id: MonitorId,
    pub name: String,
    /// Device tag; [`UNKNOWN_DEVICE`] marks a placeholder.
    pub device: String,
    pub size: Rect,
}

impl RawMonitorDescriptor {
    pub fn is_placeholder(&self) -> bool {
        self.device == UNKNOWN_DEVICE
    }
}

/// A resolved, valid monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorIdentity {
    pub id: MonitorId,
    pub name: String,
    /// Geometry with degenerate edges already replaced.
    pub rect: Rect,
    /// Set on the first monitor in position order.  A heuristic, not the
    /// OS-reported primary.
    pub is_primary: bool,
}

/// The focused workspace on one monitor.
///
/// Only `(monitor_id, workspace_index)` takes part in change detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceState {
    pub monitor_id: MonitorId,
    /// 0-based.
    pub workspace_index: usize,
    pub workspace_name: Option<String>,
    pub workspace_layout: Option<String>,
}

impl WorkspaceState {
    pub fn new(monitor_id: MonitorId, workspace_index: usize) -> Self {
        Self {
            monitor_id,
            workspace_index,
            workspace_name: None,
            workspace_layout: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.workspace_name = Some(name.into());
        self
    }
}

/// The currently focused top-level window, as seen by a
/// [`FullscreenProbe`](crate::traits::FullscreenProbe).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusedWindow {
    pub title: String,
    pub rect: Rect,
}
