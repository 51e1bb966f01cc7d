//! Monitor topology.
//!
//! The [`MonitorRegistry`] turns the raw list reported by a
//! [`StateSource`] into an ordered set of [`MonitorIdentity`] values:
//!
//! * placeholder devices are dropped entirely,
//! * degenerate rectangles get a usable width/height,
//! * the result is sorted by `(left, top)` and the first entry is flagged
//!   primary.
//!
//! The set is rebuilt wholesale on every [`refresh`](MonitorRegistry::refresh);
//! individual identities are never patched in place.

use crate::komorebi::SourceError;
use crate::model::{MonitorId, MonitorIdentity, RawMonitorDescriptor, Rect};
use crate::traits::StateSource;
use log::{info, warn};

/// Width substituted for a zero-width monitor when no sibling has a valid
/// width.
pub const FALLBACK_WIDTH: i32 = 1920;
/// Height substituted for a zero-height monitor.
pub const FALLBACK_HEIGHT: i32 = 1080;

/// Ordered set of valid monitors.
#[derive(Debug, Default)]
pub struct MonitorRegistry {
    monitors: Vec<MonitorIdentity>,
    excluded: usize,
}

impl MonitorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-query the topology and rebuild the monitor list.
    ///
    /// On error the previous list is left untouched.
    pub fn refresh<S: StateSource + ?Sized>(&mut self, source: &S) -> Result<(), SourceError> {
        info!("refreshing monitor topology");
        let raw = source.snapshot_topology()?;
        self.rebuild(raw);
        Ok(())
    }

    /// Replace the monitor list with one resolved from `raw`.
    pub fn rebuild(&mut self, raw: Vec<RawMonitorDescriptor>) {
        let total = raw.len();
        let valid: Vec<RawMonitorDescriptor> = raw
            .into_iter()
            .filter(|m| {
                if m.is_placeholder() {
                    info!("skipping placeholder monitor {} ({:?})", m.id, m.name);
                }
                !m.is_placeholder()
            })
            .collect();
        self.excluded = total - valid.len();
        if self.excluded > 0 {
            warn!(
                "partial topology: {} of {} monitor(s) are placeholders",
                self.excluded, total
            );
        }

        let fallback_width = valid
            .iter()
            .map(|m| m.size.width())
            .filter(|w| *w > 0)
            .min()
            .unwrap_or(FALLBACK_WIDTH);

        let mut monitors: Vec<MonitorIdentity> = valid
            .into_iter()
            .map(|m| {
                let mut rect = m.size;
                if rect.width() == 0 {
                    info!("monitor {} reports zero width, using {}", m.id, fallback_width);
                    rect.right = rect.left + fallback_width;
                }
                if rect.height() == 0 {
                    info!("monitor {} reports zero height, using {}", m.id, FALLBACK_HEIGHT);
                    rect.bottom = rect.top + FALLBACK_HEIGHT;
                }
                let name = if m.name.is_empty() {
                    format!("Monitor {}", m.id)
                } else {
                    m.name
                };
                MonitorIdentity {
                    id: m.id,
                    name,
                    rect,
                    is_primary: false,
                }
            })
            .collect();

        monitors.sort_by_key(|m| (m.rect.left, m.rect.top));

        let mut seen = std::collections::HashSet::new();
        monitors.retain(|m| {
            let fresh = seen.insert(m.id);
            if !fresh {
                warn!("dropping duplicate monitor id {}", m.id);
            }
            fresh
        });

        if let Some(first) = monitors.first_mut() {
            first.is_primary = true;
        }
        self.monitors = monitors;
    }

    /// Monitors in `(left, top)` order.
    pub fn monitors(&self) -> &[MonitorIdentity] {
        &self.monitors
    }

    pub fn by_id(&self, id: MonitorId) -> Option<&MonitorIdentity> {
        self.monitors.iter().find(|m| m.id == id)
    }

    pub fn rects(&self) -> Vec<Rect> {
        self.monitors.iter().map(|m| m.rect).collect()
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    /// Number of placeholder entries dropped by the last refresh.
    pub fn excluded(&self) -> usize {
        self.excluded
    }

    /// Human-readable topology summary for the startup log.
    pub fn summary(&self) -> String {
        if self.monitors.is_empty() {
            return "no monitors detected".into();
        }
        let mut s = format!("{} monitor(s):", self.monitors.len());
        for m in &self.monitors {
            s.push_str(&format!(
                "\n  {} {:?} {}{}",
                m.id,
                m.name,
                m.rect,
                if m.is_primary { " [primary]" } else { "" }
            ));
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{WorkspaceState, UNKNOWN_DEVICE};
    use std::cell::Cell;

    fn raw(id: MonitorId, device: &str, rect: Rect) -> RawMonitorDescriptor {
        RawMonitorDescriptor {
            id,
            name: format!("DISPLAY{}", id),
            device: device.into(),
            size: rect,
        }
    }

    /// Topology-only source; counts calls so refresh failures can be checked.
    struct TopologySource {
        topology: Option<Vec<RawMonitorDescriptor>>,
        calls: Cell<usize>,
    }

    impl StateSource for TopologySource {
        fn is_available(&self) -> bool {
            true
        }
        fn snapshot_topology(&self) -> Result<Vec<RawMonitorDescriptor>, SourceError> {
            self.calls.set(self.calls.get() + 1);
            self.topology
                .clone()
                .ok_or_else(|| SourceError::ToolNotFound("komorebic".into()))
        }
        fn snapshot_all_workspace_states(&self) -> Result<Vec<WorkspaceState>, SourceError> {
            Ok(Vec::new())
        }
        fn focused_workspace_index(&self) -> Result<usize, SourceError> {
            Ok(0)
        }
        fn occupied_workspaces(&self, _: MonitorId) -> Result<Vec<usize>, SourceError> {
            Ok(Vec::new())
        }
        fn request_workspace_switch(&self, _: MonitorId, _: usize) -> bool {
            false
        }
    }

    #[test]
    fn placeholders_never_registered() {
        let mut reg = MonitorRegistry::new();
        reg.rebuild(vec![
            raw(1, "DEL1", Rect::new(0, 0, 1920, 1080)),
            raw(2, UNKNOWN_DEVICE, Rect::new(1920, 0, 3840, 1080)),
        ]);
        assert_eq!(reg.len(), 1);
        assert!(reg.by_id(2).is_none());
        assert_eq!(reg.excluded(), 1);
    }

    #[test]
    fn sorted_by_left_then_top() {
        let mut reg = MonitorRegistry::new();
        reg.rebuild(vec![
            raw(30, "C", Rect::new(1920, 0, 3840, 1080)),
            raw(10, "A", Rect::new(0, 1080, 1920, 2160)),
            raw(20, "B", Rect::new(0, 0, 1920, 1080)),
        ]);
        let ids: Vec<MonitorId> = reg.monitors().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![20, 10, 30]);
    }

    #[test]
    fn exactly_first_is_primary() {
        let mut reg = MonitorRegistry::new();
        reg.rebuild(vec![
            raw(5, "B", Rect::new(2560, 0, 4480, 1080)),
            raw(6, "A", Rect::new(-1920, 0, 0, 1080)),
            raw(7, "C", Rect::new(0, 0, 2560, 1440)),
        ]);
        let primaries: Vec<MonitorId> = reg
            .monitors()
            .iter()
            .filter(|m| m.is_primary)
            .map(|m| m.id)
            .collect();
        assert_eq!(primaries, vec![6]);
    }

    #[test]
    fn zero_width_uses_narrowest_sibling() {
        let mut reg = MonitorRegistry::new();
        reg.rebuild(vec![
            raw(1, "A", Rect::new(0, 0, 2560, 1440)),
            raw(2, "B", Rect::new(2560, 0, 4480, 1080)),
            raw(3, "C", Rect::new(4480, 0, 4480, 1080)),
        ]);
        let m = reg.by_id(3).unwrap();
        assert_eq!(m.rect.width(), 1920);
        assert_eq!(m.rect.left, 4480);
    }

    #[test]
    fn zero_width_ignores_placeholder_siblings() {
        let mut reg = MonitorRegistry::new();
        reg.rebuild(vec![
            raw(1, UNKNOWN_DEVICE, Rect::new(0, 0, 800, 600)),
            raw(2, "B", Rect::new(0, 0, 2560, 1440)),
            raw(3, "C", Rect::new(2560, 0, 2560, 1440)),
        ]);
        assert_eq!(reg.by_id(3).unwrap().rect.width(), 2560);
    }

    #[test]
    fn zero_width_without_valid_sibling_defaults() {
        let mut reg = MonitorRegistry::new();
        reg.rebuild(vec![raw(1, "A", Rect::new(100, 0, 100, 0))]);
        let m = reg.by_id(1).unwrap();
        assert_eq!(m.rect, Rect::new(100, 0, 100 + FALLBACK_WIDTH, FALLBACK_HEIGHT));
    }

    #[test]
    fn duplicate_ids_collapse() {
        let mut reg = MonitorRegistry::new();
        reg.rebuild(vec![
            raw(1, "A", Rect::new(0, 0, 1920, 1080)),
            raw(1, "A", Rect::new(1920, 0, 3840, 1080)),
        ]);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.by_id(1).unwrap().rect.left, 0);
    }

    #[test]
    fn refresh_failure_keeps_previous_monitors() {
        let mut reg = MonitorRegistry::new();
        let ok = TopologySource {
            topology: Some(vec![raw(1, "A", Rect::new(0, 0, 1920, 1080))]),
            calls: Cell::new(0),
        };
        reg.refresh(&ok).unwrap();
        assert_eq!(reg.len(), 1);

        let broken = TopologySource {
            topology: None,
            calls: Cell::new(0),
        };
        assert!(reg.refresh(&broken).is_err());
        assert_eq!(broken.calls.get(), 1);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn refresh_rebuilds_wholesale() {
        let mut reg = MonitorRegistry::new();
        reg.rebuild(vec![
            raw(1, "A", Rect::new(0, 0, 1920, 1080)),
            raw(2, "B", Rect::new(1920, 0, 3840, 1080)),
        ]);
        reg.rebuild(vec![raw(3, "C", Rect::new(0, 0, 2560, 1440))]);
        let ids: Vec<MonitorId> = reg.monitors().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![3]);
        assert!(reg.monitors()[0].is_primary);
    }

    #[test]
    fn summary_mentions_primary() {
        let mut reg = MonitorRegistry::new();
        assert_eq!(reg.summary(), "no monitors detected");
        reg.rebuild(vec![raw(1, "A", Rect::new(0, 0, 1920, 1080))]);
        assert!(reg.summary().contains("[primary]"));
        assert!(reg.summary().contains("1920x1080 at (0, 0)"));
    }
}
