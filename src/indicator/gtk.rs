//! GTK4 + layer-shell indicators that run on the **main thread**.
//!
//! # Widget tree
//!
//! ```text
//! window                         (layer-shell, transparent, one per monitor)
//! └ .ws-indicator              (rounded box, drag + click target)
//!     ├ .ws-label              (GtkLabel)
//!     └ popover.ws-menu        (right-click menu)
//! ```
//!
//! # CSS selectors
//!
//! | Selector               | Targets                                  |
//! |------------------------|------------------------------------------|
//! | `window`               | The indicator window (keep transparent)  |
//! | `.ws-indicator`        | Box around the label                     |
//! | `.ws-label`            | The workspace text                       |
//! | `.ws-menu`             | Context menu popover                     |
//!
//! A user stylesheet replaces the built-in one entirely.
//!
//! # Interaction
//!
//! * Left-drag moves the indicator; it then stays put until "Reset
//!   position".
//! * Scrolling cycles through occupied workspaces on that monitor.
//! * Right-click opens a menu.  Every menu entry is a [`Command`] sent over
//!   the same channel the control socket uses.

use crate::command::Command;
use crate::config::Config;
use crate::engine::{EngineError, Flow, SyncEngine};
use crate::indicator::{IndicatorSet, INDICATOR_TITLE};
use crate::model::{MonitorId, MonitorIdentity, Rect};
use crate::traits::{FullscreenProbe, IndicatorSurface, StateSource, SurfaceFactory};
use gtk4::prelude::*;
use gtk4::{gdk, glib};
use gtk4_layer_shell::{Edge, LayerShell};
use log::{debug, info, warn};
use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::mpsc;
use std::time::Duration;

/// How often the command channel is drained.
const COMMAND_POLL: Duration = Duration::from_millis(50);

//  Default CSS

const DEFAULT_CSS: &str = r#"
window,
window.background {
    background-color: transparent;
    background: none;
}

.ws-indicator {
    background-color: rgba(0, 0, 0, 0.8);
    border-radius: 4px;
    padding: 8px 12px;
}

.ws-label {
    color: #2196F3;
    font-family: sans-serif;
    font-size: 14pt;
    font-weight: bold;
}

.ws-menu button {
    padding: 4px 12px;
}
"#;

//  Surface

/// One indicator window.
pub struct GtkSurface {
    window: gtk4::Window,
    frame: gtk4::Box,
    label: gtk4::Label,
    popover: gtk4::Popover,
    /// Monitor origin; layer-shell margins are relative to it.
    origin: (i32, i32),
    /// Current `(left, top)` margins.
    margins: Rc<Cell<(i32, i32)>>,
    dragged: Rc<Cell<bool>>,
    layer_shell: bool,
}

impl GtkSurface {
    fn apply_margins(&self, (left, top): (i32, i32)) {
        self.margins.set((left, top));
        if self.layer_shell {
            self.window.set_margin(Edge::Left, left);
            self.window.set_margin(Edge::Top, top);
        }
    }
}

impl IndicatorSurface for GtkSurface {
    fn set_label(&mut self, text: &str) {
        self.label.set_text(text);
    }

    fn place(&mut self, x: i32, y: i32) {
        self.apply_margins((x - self.origin.0, y - self.origin.1));
    }

    fn width(&self) -> i32 {
        let (_, natural, _, _) = self.frame.measure(gtk4::Orientation::Horizontal, -1);
        natural
    }

    fn set_visible(&mut self, visible: bool) {
        if visible {
            self.window.present();
        } else {
            self.popover.popdown();
            self.window.set_visible(false);
        }
    }

    fn was_dragged(&self) -> bool {
        self.dragged.get()
    }

    fn clear_dragged(&mut self) {
        self.dragged.set(false);
    }

    fn destroy(self) {
        self.popover.unparent();
        self.window.destroy();
    }
}

//  Factory

/// Creates [`GtkSurface`]s.  Must only be used after GTK is initialised.
pub struct GtkSurfaceFactory {
    cmd_tx: mpsc::Sender<Command>,
    opacity: f64,
    layer_shell: bool,
}

impl GtkSurfaceFactory {
    pub fn new(cmd_tx: mpsc::Sender<Command>, opacity: f64) -> Self {
        let layer_shell = gtk4_layer_shell::is_supported();
        if !layer_shell {
            warn!("compositor has no layer-shell support; indicators cannot be positioned");
        }
        Self {
            cmd_tx,
            opacity,
            layer_shell,
        }
    }
}

impl SurfaceFactory for GtkSurfaceFactory {
    type Surface = GtkSurface;

    fn create(&mut self, monitor: &MonitorIdentity, label_text: &str) -> GtkSurface {
        let window = gtk4::Window::new();
        window.set_title(Some(INDICATOR_TITLE));
        window.set_decorated(false);
        window.set_resizable(false);
        window.remove_css_class("background");
        window.set_opacity(self.opacity);

        if self.layer_shell {
            window.init_layer_shell();
            window.set_layer(gtk4_layer_shell::Layer::Overlay);
            window.set_namespace("wsindicator");
            window.set_keyboard_mode(gtk4_layer_shell::KeyboardMode::None);
            window.set_exclusive_zone(-1);
            window.set_anchor(Edge::Top, true);
            window.set_anchor(Edge::Left, true);
            match gdk_monitor_at(&monitor.rect) {
                Some(m) => window.set_monitor(Some(&m)),
                None => warn!(
                    "no GDK monitor at ({}, {}) for monitor {}; using the default output",
                    monitor.rect.left, monitor.rect.top, monitor.id
                ),
            }
        }

        let frame = gtk4::Box::new(gtk4::Orientation::Horizontal, 0);
        frame.add_css_class("ws-indicator");
        let label = gtk4::Label::new(Some(label_text));
        label.add_css_class("ws-label");
        frame.append(&label);
        window.set_child(Some(&frame));

        let popover = context_menu(&frame, monitor.id, &self.cmd_tx);

        let surface = GtkSurface {
            window,
            frame,
            label,
            popover,
            origin: (monitor.rect.left, monitor.rect.top),
            margins: Rc::new(Cell::new((0, 0))),
            dragged: Rc::new(Cell::new(false)),
            layer_shell: self.layer_shell,
        };
        attach_drag(&surface);
        attach_scroll(&surface.frame, monitor.id, &self.cmd_tx);
        surface.window.set_visible(false);
        debug!("created GTK indicator for monitor {}", monitor.id);
        surface
    }
}

/// Find the GDK monitor whose origin matches `rect`.
fn gdk_monitor_at(rect: &Rect) -> Option<gdk::Monitor> {
    let display = gdk::Display::default()?;
    let monitors = display.monitors();
    (0..monitors.n_items())
        .filter_map(|i| monitors.item(i).and_downcast::<gdk::Monitor>())
        .find(|m| {
            let g = m.geometry();
            g.x() == rect.left && g.y() == rect.top
        })
}

//  Input handling

fn attach_drag(surface: &GtkSurface) {
    let drag = gtk4::GestureDrag::new();
    drag.set_button(1);
    let start = Rc::new(Cell::new((0, 0)));

    let margins = surface.margins.clone();
    let start_begin = start.clone();
    drag.connect_drag_begin(move |_, _, _| {
        start_begin.set(margins.get());
    });

    let margins = surface.margins.clone();
    let dragged = surface.dragged.clone();
    let window = surface.window.clone();
    let layer_shell = surface.layer_shell;
    drag.connect_drag_update(move |_, dx, dy| {
        if !layer_shell {
            return;
        }
        let (x0, y0) = start.get();
        let next = (x0 + dx.round() as i32, y0 + dy.round() as i32);
        margins.set(next);
        window.set_margin(Edge::Left, next.0);
        window.set_margin(Edge::Top, next.1);
        dragged.set(true);
    });
    surface.frame.add_controller(drag);
}

fn attach_scroll(frame: &gtk4::Box, monitor: MonitorId, cmd_tx: &mpsc::Sender<Command>) {
    let scroll = gtk4::EventControllerScroll::new(gtk4::EventControllerScrollFlags::VERTICAL);
    let tx = cmd_tx.clone();
    scroll.connect_scroll(move |_, _, dy| {
        if dy != 0.0 {
            let _ = tx.send(Command::CycleWorkspace {
                monitor,
                forward: dy > 0.0,
            });
        }
        glib::Propagation::Stop
    });
    frame.add_controller(scroll);
}

fn context_menu(
    frame: &gtk4::Box,
    monitor: MonitorId,
    cmd_tx: &mpsc::Sender<Command>,
) -> gtk4::Popover {
    let popover = gtk4::Popover::new();
    popover.add_css_class("ws-menu");
    popover.set_has_arrow(false);

    let items = gtk4::Box::new(gtk4::Orientation::Vertical, 2);
    let entries = [
        ("Reset Position", Command::ResetPosition(Some(monitor))),
        ("Refresh Monitors", Command::RefreshMonitors),
        ("Quit", Command::Quit),
    ];
    for (text, cmd) in entries {
        let button = gtk4::Button::with_label(text);
        button.set_has_frame(false);
        let tx = cmd_tx.clone();
        let menu = popover.downgrade();
        button.connect_clicked(move |_| {
            if let Some(menu) = menu.upgrade() {
                menu.popdown();
            }
            let _ = tx.send(cmd.clone());
        });
        items.append(&button);
    }
    popover.set_child(Some(&items));
    popover.set_parent(frame);

    let click = gtk4::GestureClick::new();
    click.set_button(3);
    let menu = popover.downgrade();
    click.connect_pressed(move |_, _, x, y| {
        if let Some(menu) = menu.upgrade() {
            menu.set_pointing_to(Some(&gdk::Rectangle::new(x as i32, y as i32, 1, 1)));
            menu.popup();
        }
    });
    frame.add_controller(click);
    popover
}

//  Public API

/// Initialise GTK, start the engine and run the GLib main loop on the
/// **current** (main) thread until [`Command::Quit`].
///
/// `cmd_tx` is handed to the context menus; `cmd_rx` receives their
/// commands along with anything the control socket forwards.
pub fn run_main_loop<S, P>(
    source: S,
    probe: P,
    config: &Config,
    template: String,
    css_path: Option<PathBuf>,
    cmd_tx: mpsc::Sender<Command>,
    cmd_rx: mpsc::Receiver<Command>,
) -> Result<(), EngineError>
where
    S: StateSource + 'static,
    P: FullscreenProbe + 'static,
{
    gtk4::init().expect("failed to initialise GTK4");
    info!("GTK4 initialised on main thread");

    load_css(&css_path);

    let factory = GtkSurfaceFactory::new(cmd_tx, config.indicator.opacity);
    let indicators =
        IndicatorSet::new(factory, template).with_margin_top(config.indicator.margin_top);
    let mut engine = SyncEngine::new(source, probe, indicators).with_config(config);
    engine.start()?;
    let engine = Rc::new(RefCell::new(engine));

    let main_loop = glib::MainLoop::new(None, false);

    //  Poll timer
    let poll_engine = engine.clone();
    glib::timeout_add_local(config.poll_interval(), move || {
        poll_engine.borrow_mut().tick();
        glib::ControlFlow::Continue
    });

    //  Command drain
    let quit_loop = main_loop.clone();
    glib::timeout_add_local(COMMAND_POLL, move || {
        loop {
            match cmd_rx.try_recv() {
                Ok(cmd) => {
                    if engine.borrow_mut().handle(cmd) == Flow::Exit {
                        quit_loop.quit();
                        return glib::ControlFlow::Break;
                    }
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    info!("command channel closed");
                    return glib::ControlFlow::Break;
                }
            }
        }
        glib::ControlFlow::Continue
    });

    info!(
        "entering GLib main loop (poll {}ms, CSS: {})",
        config.poll_interval_ms,
        css_path
            .as_ref()
            .filter(|p| p.exists())
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<built-in>".into()),
    );
    main_loop.run();
    info!("GLib main loop exited");
    Ok(())
}

//  CSS loading

fn load_css(css_path: &Option<PathBuf>) {
    let provider = gtk4::CssProvider::new();

    let css_content = match css_path.as_ref().filter(|p| p.exists()) {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(content) => {
                info!("user CSS: {} ({} bytes)", p.display(), content.len());
                content
            }
            Err(e) => {
                warn!("CSS read failed ({}): {}, using built-in", p.display(), e);
                DEFAULT_CSS.to_string()
            }
        },
        None => {
            debug!("no user CSS, using built-in default");
            DEFAULT_CSS.to_string()
        }
    };

    #[allow(deprecated)]
    provider.load_from_data(&css_content);

    if let Some(display) = gdk::Display::default() {
        gtk4::style_context_add_provider_for_display(
            &display,
            &provider,
            gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION,
        );
    } else {
        warn!("no GDK display, CSS will not be applied");
    }
}
