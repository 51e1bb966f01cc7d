//! Indicator backend without a toolkit.
//!
//! Surfaces only exist in the log, which makes the daemon usable (and
//! debuggable) on machines where GTK is not available.  The loop in
//! [`run_loop`] plays the part of the GLib main loop: it waits for commands
//! with a timeout equal to the poll interval and ticks the engine in
//! between.

use crate::command::Command;
use crate::config::Config;
use crate::engine::{EngineError, Flow, SyncEngine};
use crate::indicator::IndicatorSet;
use crate::model::{MonitorId, MonitorIdentity};
use crate::traits::{FullscreenProbe, IndicatorSurface, StateSource, SurfaceFactory};
use log::{debug, info};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Instant;

/// Rough glyph width used to centre labels that are never drawn.
const CHAR_WIDTH: i32 = 10;

pub struct LogSurface {
    monitor: MonitorId,
    label: String,
    visible: bool,
}

impl IndicatorSurface for LogSurface {
    fn set_label(&mut self, text: &str) {
        info!("[monitor {}] {}", self.monitor, text);
        self.label = text.to_string();
    }

    fn place(&mut self, x: i32, y: i32) {
        debug!("[monitor {}] at ({}, {})", self.monitor, x, y);
    }

    fn width(&self) -> i32 {
        self.label.chars().count() as i32 * CHAR_WIDTH
    }

    fn set_visible(&mut self, visible: bool) {
        if self.visible != visible {
            debug!(
                "[monitor {}] {}",
                self.monitor,
                if visible { "shown" } else { "hidden" }
            );
        }
        self.visible = visible;
    }

    fn was_dragged(&self) -> bool {
        false
    }

    fn clear_dragged(&mut self) {}

    fn destroy(self) {
        debug!("[monitor {}] destroyed", self.monitor);
    }
}

#[derive(Debug, Default)]
pub struct HeadlessFactory;

impl SurfaceFactory for HeadlessFactory {
    type Surface = LogSurface;

    fn create(&mut self, monitor: &MonitorIdentity, label: &str) -> LogSurface {
        info!("[monitor {}] {} on {}", monitor.id, label, monitor.name);
        LogSurface {
            monitor: monitor.id,
            label: label.to_string(),
            visible: false,
        }
    }
}

/// Start the engine and drive it until a [`Command::Quit`] arrives.
pub fn run_loop<S: StateSource, P: FullscreenProbe>(
    source: S,
    probe: P,
    config: &Config,
    template: String,
    cmd_rx: mpsc::Receiver<Command>,
) -> Result<(), EngineError> {
    let indicators =
        IndicatorSet::new(HeadlessFactory, template).with_margin_top(config.indicator.margin_top);
    let mut engine = SyncEngine::new(source, probe, indicators).with_config(config);
    engine.start()?;

    let interval = config.poll_interval();
    let mut next_tick = Instant::now() + interval;
    let mut commands_open = true;
    info!("running headless, polling every {}ms", interval.as_millis());
    loop {
        let wait = next_tick.saturating_duration_since(Instant::now());
        if commands_open {
            match cmd_rx.recv_timeout(wait) {
                Ok(cmd) => {
                    if engine.handle(cmd) == Flow::Exit {
                        break;
                    }
                    continue;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("command channel closed");
                    commands_open = false;
                    continue;
                }
            }
        } else {
            std::thread::sleep(wait);
        }
        engine.tick();
        next_tick = Instant::now() + interval;
    }
    info!("headless loop exited");
    Ok(())
}
