//! Per-monitor indicator surfaces.
//!
//! [`IndicatorSet`] owns one [`IndicatorSurface`] per monitor, keyed by
//! monitor id, and decides *what* each surface shows and *where* it sits.
//! The surfaces themselves come from a [`SurfaceFactory`]:
//!
//! * [`gtk`]: GTK4 layer-shell windows (feature `indicator-gtk`).
//! * [`headless`]: writes label changes to the log; used when no
//!   toolkit is compiled in.

#[cfg(feature = "indicator-gtk")]
pub mod gtk;
pub mod headless;

use crate::model::{MonitorId, MonitorIdentity};
use crate::template;
use crate::traits::{IndicatorSurface, SurfaceFactory};
use log::{debug, info};
use std::collections::BTreeMap;

/// Window title reserved for indicator surfaces.  A focused window with this
/// title is one of ours and never counts as fullscreen.
pub const INDICATOR_TITLE: &str = "KomorebiWorkspaceIndicator";

/// Monitor ids above this are considered opaque handles and are rendered
/// by position rank instead.
pub const LARGE_ID_THRESHOLD: MonitorId = 100;

/// Default distance between the top edge of a monitor and its indicator.
pub const DEFAULT_MARGIN_TOP: i32 = 10;

struct Slot<S> {
    monitor: MonitorIdentity,
    /// 1-based position in `(left, top)` order.
    rank: usize,
    surface: S,
    label: String,
    workspace: usize,
    name: Option<String>,
}

/// The set of live indicator surfaces.
pub struct IndicatorSet<F: SurfaceFactory> {
    factory: F,
    template: String,
    margin_top: i32,
    slots: BTreeMap<MonitorId, Slot<F::Surface>>,
    visible: bool,
}

impl<F: SurfaceFactory> IndicatorSet<F> {
    pub fn new(factory: F, template: impl Into<String>) -> Self {
        Self {
            factory,
            template: template.into(),
            margin_top: DEFAULT_MARGIN_TOP,
            slots: BTreeMap::new(),
            visible: false,
        }
    }

    pub fn with_margin_top(mut self, margin_top: i32) -> Self {
        self.margin_top = margin_top;
        self
    }

    /// Destroy every surface and create exactly one per identity.
    ///
    /// `identities` come in [`MonitorRegistry::monitors`] order and each
    /// surface's rank is its 1-based position there.  New surfaces start
    /// hidden, showing workspace 0.
    ///
    /// [`MonitorRegistry::monitors`]: crate::registry::MonitorRegistry::monitors
    pub fn recreate_all(&mut self, identities: &[MonitorIdentity]) {
        for (id, slot) in std::mem::take(&mut self.slots) {
            debug!("destroying indicator for monitor {}", id);
            slot.surface.destroy();
        }
        self.visible = false;

        for (i, monitor) in identities.iter().enumerate() {
            if self.slots.contains_key(&monitor.id) {
                continue;
            }
            let rank = i + 1;
            let label = self.render(monitor.id, rank, 0, None);
            let surface = self.factory.create(monitor, &label);
            let mut slot = Slot {
                monitor: monitor.clone(),
                rank,
                surface,
                label,
                workspace: 0,
                name: None,
            };
            place_top_center(&mut slot, self.margin_top);
            info!("created indicator for monitor {} ({})", monitor.id, monitor.name);
            self.slots.insert(monitor.id, slot);
        }
    }

    /// Show `workspace` (0-based) and `name` on `monitor`'s indicator.
    ///
    /// Returns `false` without touching anything when the monitor has no
    /// surface (e.g. it vanished in a refresh) or nothing changed.
    pub fn update(&mut self, monitor: MonitorId, workspace: usize, name: Option<&str>) -> bool {
        let Some(slot) = self.slots.get(&monitor) else {
            debug!("no indicator for monitor {}, dropping update", monitor);
            return false;
        };
        if slot.workspace == workspace && slot.name.as_deref() == name {
            return false;
        }
        let label = self.render(monitor, slot.rank, workspace, name);
        let margin_top = self.margin_top;
        let Some(slot) = self.slots.get_mut(&monitor) else {
            return false;
        };
        slot.workspace = workspace;
        slot.name = name.map(str::to_string);
        slot.surface.set_label(&label);
        if !slot.surface.was_dragged() {
            place_top_center(slot, margin_top);
        }
        debug!("indicator {} now shows {:?}", monitor, label);
        slot.label = label;
        true
    }

    /// Make every surface visible.  Cheap when already shown.
    pub fn show_all(&mut self) {
        self.set_all_visible(true);
    }

    /// Hide every surface without destroying it.  Cheap when already hidden.
    pub fn hide_all(&mut self) {
        self.set_all_visible(false);
    }

    fn set_all_visible(&mut self, visible: bool) {
        if self.visible == visible {
            return;
        }
        for slot in self.slots.values_mut() {
            slot.surface.set_visible(visible);
        }
        self.visible = visible;
        debug!(
            "{} {} indicator(s)",
            if visible { "showing" } else { "hiding" },
            self.slots.len()
        );
    }

    /// Forget manual drags and move one indicator (or all) back to the
    /// top-centre of its monitor.
    pub fn reset_position(&mut self, monitor: Option<MonitorId>) {
        let margin_top = self.margin_top;
        for (id, slot) in self.slots.iter_mut() {
            if monitor.is_some_and(|m| m != *id) {
                continue;
            }
            slot.surface.clear_dragged();
            place_top_center(slot, margin_top);
        }
    }

    /// `{monitor}` shows the raw id while it is human-scale, the position
    /// rank otherwise.
    fn render(&self, monitor: MonitorId, rank: usize, workspace: usize, name: Option<&str>) -> String {
        let display_monitor = if (0..=LARGE_ID_THRESHOLD).contains(&monitor) {
            monitor as u64
        } else {
            rank as u64
        };
        template::render(&self.template, display_monitor, workspace + 1, name)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn contains(&self, monitor: MonitorId) -> bool {
        self.slots.contains_key(&monitor)
    }

    pub fn label(&self, monitor: MonitorId) -> Option<&str> {
        self.slots.get(&monitor).map(|s| s.label.as_str())
    }
}

fn place_top_center<S: IndicatorSurface>(slot: &mut Slot<S>, margin_top: i32) {
    let rect = slot.monitor.rect;
    let x = rect.center_x() - slot.surface.width() / 2;
    let y = rect.top + margin_top;
    slot.surface.place(x, y);
}


#[cfg(test)]
mod tests {
    use super::testing::{Event, RecordingFactory};
    use super::*;
    use crate::model::Rect;

    fn identity(id: MonitorId, left: i32) -> MonitorIdentity {
        MonitorIdentity {
            id,
            name: format!("DISPLAY{}", id),
            rect: Rect::new(left, 0, left + 1920, 1080),
            is_primary: left == 0,
        }
    }

    fn set(template: &str) -> (IndicatorSet<RecordingFactory>, RecordingFactory) {
        let factory = RecordingFactory::default();
        (IndicatorSet::new(factory.clone(), template), factory)
    }

    #[test]
    fn recreate_creates_one_surface_per_identity() {
        let (mut set, f) = set("{workspace}");
        set.recreate_all(&[identity(1, 0), identity(2, 1920)]);
        assert_eq!(set.len(), 2);
        let created = f
            .rec
            .take()
            .into_iter()
            .filter(|e| matches!(e, Event::Created(..)))
            .count();
        assert_eq!(created, 2);
    }

    #[test]
    fn recreate_destroys_previous_surfaces() {
        let (mut set, f) = set("{workspace}");
        set.recreate_all(&[identity(1, 0), identity(2, 1920)]);
        f.rec.take();
        set.recreate_all(&[identity(3, 0)]);
        let events = f.rec.take();
        assert!(events.contains(&Event::Destroyed(1)));
        assert!(events.contains(&Event::Destroyed(2)));
        assert!(set.contains(3));
        assert!(!set.contains(1));
    }

    #[test]
    fn update_on_missing_surface_is_dropped() {
        let (mut set, f) = set("{workspace}");
        set.recreate_all(&[identity(1, 0)]);
        f.rec.take();
        assert!(!set.update(42, 3, None));
        assert!(f.rec.take().is_empty());
    }

    #[test]
    fn unchanged_update_is_noop() {
        let (mut set, f) = set("{workspace}");
        set.recreate_all(&[identity(1, 0)]);
        assert!(set.update(1, 2, Some("web")));
        f.rec.take();
        assert!(!set.update(1, 2, Some("web")));
        assert!(f.rec.take().is_empty());
    }

    #[test]
    fn name_change_alone_rerenders() {
        let (mut set, f) = set("{workspace} {name}");
        set.recreate_all(&[identity(1, 0)]);
        set.update(1, 2, Some("web"));
        assert!(set.update(1, 2, Some("mail")));
        assert_eq!(f.rec.label(1).as_deref(), Some("3 mail"));
    }

    #[test]
    fn labels_are_one_based() {
        let (mut set, f) = set("M{monitor}:W{workspace}");
        set.recreate_all(&[identity(0, 0)]);
        assert_eq!(f.rec.label(0).as_deref(), Some("M0:W1"));
        set.update(0, 4, None);
        assert_eq!(f.rec.label(0).as_deref(), Some("M0:W5"));
        assert_eq!(set.label(0), Some("M0:W5"));
    }

    #[test]
    fn large_ids_render_as_rank() {
        let (mut set, f) = set("M{monitor}:W{workspace} {name}");
        set.recreate_all(&[identity(7, 0), identity(4102, 1920), identity(65537, 3840)]);
        set.update(4102, 2, Some("Gaming"));
        set.update(65537, 1, None);
        set.update(7, 1, None);
        assert_eq!(f.rec.label(4102).as_deref(), Some("M2:W3 Gaming"));
        assert_eq!(f.rec.label(65537).as_deref(), Some("M3:W2"));
        assert_eq!(f.rec.label(7).as_deref(), Some("M7:W2"));
    }

    #[test]
    fn update_repositions_top_center() {
        let (mut set, f) = set("{workspace}");
        set.recreate_all(&[identity(1, 1920)]);
        f.rec.take();
        set.update(1, 9, None);
        // "10" is 20px wide; monitor centre is 2880.
        assert_eq!(
            f.rec.take(),
            vec![Event::Label(1, "10".into()), Event::Placed(1, 2870, 10)]
        );
    }

    #[test]
    fn dragged_surface_keeps_its_position_until_reset() {
        let (mut set, f) = set("{workspace}");
        set.recreate_all(&[identity(1, 0)]);
        f.rec.drag(1);
        f.rec.take();
        set.update(1, 1, None);
        assert_eq!(f.rec.take(), vec![Event::Label(1, "2".into())]);

        set.reset_position(Some(1));
        assert_eq!(f.rec.take(), vec![Event::Placed(1, 955, 10)]);

        set.update(1, 2, None);
        let events = f.rec.take();
        assert!(events.contains(&Event::Placed(1, 955, 10)));
    }

    #[test]
    fn reset_position_targets_one_monitor() {
        let (mut set, f) = set("{workspace}");
        set.recreate_all(&[identity(1, 0), identity(2, 1920)]);
        f.rec.take();
        set.reset_position(Some(2));
        assert_eq!(f.rec.take(), vec![Event::Placed(2, 2875, 10)]);
        set.reset_position(None);
        assert_eq!(f.rec.take().len(), 2);
    }

    #[test]
    fn show_and_hide_are_idempotent() {
        let (mut set, f) = set("{workspace}");
        set.recreate_all(&[identity(1, 0), identity(2, 1920)]);
        f.rec.take();
        set.show_all();
        set.show_all();
        assert_eq!(f.rec.take().len(), 2);
        assert!(set.is_visible());
        set.hide_all();
        set.hide_all();
        assert_eq!(
            f.rec.take(),
            vec![Event::Visible(1, false), Event::Visible(2, false)]
        );
        assert!(!set.is_visible());
    }

    #[test]
    fn recreated_surfaces_start_hidden() {
        let (mut set, f) = set("{workspace}");
        set.recreate_all(&[identity(1, 0)]);
        set.show_all();
        set.recreate_all(&[identity(1, 0)]);
        assert!(!set.is_visible());
        f.rec.take();
        set.show_all();
        assert_eq!(f.rec.take(), vec![Event::Visible(1, true)]);
    }

    #[test]
    fn custom_margin() {
        let factory = RecordingFactory::default();
        let mut set = IndicatorSet::new(factory.clone(), "{workspace}").with_margin_top(0);
        set.recreate_all(&[identity(1, 0)]);
        assert!(factory.rec.take().contains(&Event::Placed(1, 955, 0)));
    }
}
