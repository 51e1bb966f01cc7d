//! The control loop that keeps indicators in step with the window manager.
//!
//! [`SyncEngine`] owns the [`MonitorRegistry`], the [`IndicatorSet`] and a
//! per-monitor cache of the last applied workspace index.  On every
//! [`tick`](SyncEngine::tick) it:
//!
//! 1. hides everything while a fullscreen window is focused,
//! 2. fetches all workspace states in one query,
//! 3. applies the ones whose index changed and whose debounce window has
//!    elapsed.
//!
//! The engine is single-threaded.  Ticks and [`Command`]s are both driven
//! from the main loop, so a monitor refresh never interleaves with a tick.

use crate::command::{Command, WorkspaceTarget};
use crate::config::Config;
use crate::indicator::{IndicatorSet, INDICATOR_TITLE};
use crate::komorebi::SourceError;
use crate::model::{FocusedWindow, MonitorId, Rect};
use crate::registry::MonitorRegistry;
use crate::traits::{FullscreenProbe, StateSource, SurfaceFactory};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Minimum time between two applied updates on the same monitor.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Pixel slack when comparing a focused window to a monitor's bounds.
pub const DEFAULT_FULLSCREEN_TOLERANCE: i32 = 2;

/// Errors that prevent the engine from starting.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("komorebi is not available (is it running, and is komorebic on PATH?)")]
    ToolUnavailable,

    #[error("could not read monitor topology: {0}")]
    Topology(#[source] SourceError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Stopped,
    Polling,
}

/// Outcome of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The engine is stopped; nothing was queried.
    Idle,
    /// A fullscreen window is focused; indicators are hidden.
    Suppressed,
    /// The state query failed; nothing changed.
    Failed,
    /// This many monitors received a new workspace.
    Applied(usize),
}

/// What the main loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Polls a [`StateSource`] and mirrors each monitor's focused workspace onto
/// an [`IndicatorSet`].
pub struct SyncEngine<S: StateSource, P: FullscreenProbe, F: SurfaceFactory> {
    source: S,
    probe: P,
    registry: MonitorRegistry,
    indicators: IndicatorSet<F>,
    cache: HashMap<MonitorId, usize>,
    last_update: HashMap<MonitorId, Instant>,
    debounce: Duration,
    tolerance: i32,
    state: EngineState,
}

impl<S: StateSource, P: FullscreenProbe, F: SurfaceFactory> SyncEngine<S, P, F> {
    pub fn new(source: S, probe: P, indicators: IndicatorSet<F>) -> Self {
        Self {
            source,
            probe,
            registry: MonitorRegistry::new(),
            indicators,
            cache: HashMap::new(),
            last_update: HashMap::new(),
            debounce: DEFAULT_DEBOUNCE,
            tolerance: DEFAULT_FULLSCREEN_TOLERANCE,
            state: EngineState::Stopped,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_fullscreen_tolerance(mut self, tolerance: i32) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Apply the timing settings from `config`.
    pub fn with_config(self, config: &Config) -> Self {
        self.with_debounce(config.debounce())
            .with_fullscreen_tolerance(config.fullscreen_tolerance_px)
    }

    /// Check the tool, build indicators for the current topology, seed the
    /// cache and start polling.
    ///
    /// An unreachable tool is the only fatal condition; every later query
    /// failure is logged and retried on the next tick.
    pub fn start(&mut self) -> Result<(), EngineError> {
        if !self.source.is_available() {
            return Err(EngineError::ToolUnavailable);
        }
        self.registry
            .refresh(&self.source)
            .map_err(EngineError::Topology)?;
        info!("{}", self.registry.summary());
        if self.registry.is_empty() {
            warn!("no usable monitors; indicators will appear after a refresh");
        }

        self.indicators.recreate_all(self.registry.monitors());
        self.cache.clear();
        self.last_update.clear();
        self.seed();
        self.indicators.show_all();
        self.state = EngineState::Polling;
        info!("polling started");
        Ok(())
    }

    /// Stop polling and hide every indicator.
    pub fn stop(&mut self) {
        if self.state == EngineState::Stopped {
            return;
        }
        self.state = EngineState::Stopped;
        self.indicators.hide_all();
        info!("polling stopped");
    }

    pub fn tick(&mut self) -> Tick {
        self.tick_at(Instant::now())
    }

    /// Run one poll cycle as if the current time were `now`.
    pub fn tick_at(&mut self, now: Instant) -> Tick {
        if self.state != EngineState::Polling {
            return Tick::Idle;
        }

        if let Some(window) = self.probe.focused_window() {
            if is_fullscreen(&window, &self.registry.rects(), self.tolerance) {
                debug!("fullscreen window {:?} focused, hiding indicators", window.title);
                self.indicators.hide_all();
                return Tick::Suppressed;
            }
        }
        self.indicators.show_all();

        let states = match self.source.snapshot_all_workspace_states() {
            Ok(states) => states,
            Err(e) => {
                warn!("state query failed: {}", e);
                return Tick::Failed;
            }
        };

        let mut applied = 0;
        for state in states {
            let id = state.monitor_id;
            if self.registry.by_id(id).is_none() {
                debug!("ignoring state for unregistered monitor {}", id);
                continue;
            }
            if let Some(at) = self.last_update.get(&id) {
                if now.saturating_duration_since(*at) < self.debounce {
                    continue;
                }
            }
            let previous = self.cache.get(&id).copied();
            if previous == Some(state.workspace_index) {
                continue;
            }
            self.indicators
                .update(id, state.workspace_index, state.workspace_name.as_deref());
            self.cache.insert(id, state.workspace_index);
            self.last_update.insert(id, now);
            applied += 1;
            match previous {
                Some(old) => info!(
                    "monitor {}: workspace {} -> {}",
                    id,
                    old + 1,
                    state.workspace_index + 1
                ),
                None => info!("monitor {}: workspace {}", id, state.workspace_index + 1),
            }
        }
        Tick::Applied(applied)
    }

    /// Act on a user command.
    pub fn handle(&mut self, cmd: Command) -> Flow {
        debug!("command: {}", cmd);
        match cmd {
            Command::RefreshMonitors => self.refresh_monitors(),
            Command::ResetPosition(monitor) => self.indicators.reset_position(monitor),
            Command::SwitchWorkspace(WorkspaceTarget { monitor, workspace }) => {
                self.source.request_workspace_switch(monitor, workspace);
            }
            Command::CycleWorkspace { monitor, forward } => self.cycle(monitor, forward),
            Command::Quit => {
                info!("quit requested");
                self.stop();
                return Flow::Exit;
            }
        }
        Flow::Continue
    }

    fn refresh_monitors(&mut self) {
        self.indicators.hide_all();
        if let Err(e) = self.registry.refresh(&self.source) {
            warn!("monitor refresh failed, keeping previous indicators: {}", e);
        } else {
            info!("{}", self.registry.summary());
            self.indicators.recreate_all(self.registry.monitors());
            self.cache.clear();
            self.last_update.clear();
            self.seed();
        }
        if self.state == EngineState::Polling {
            self.indicators.show_all();
        }
    }

    /// Fill the cache with one entry per registered monitor and push those
    /// values to the indicators.
    ///
    /// Falls back to the focused monitor's index for every monitor when the
    /// full-state query fails, and to workspace 0 when that fails too.
    /// Seeding does not start a debounce window.
    fn seed(&mut self) {
        let ids: Vec<MonitorId> = self.registry.monitors().iter().map(|m| m.id).collect();
        match self.source.snapshot_all_workspace_states() {
            Ok(states) => {
                for id in ids {
                    let state = states.iter().find(|s| s.monitor_id == id);
                    let index = state.map_or(0, |s| s.workspace_index);
                    let name = state.and_then(|s| s.workspace_name.as_deref());
                    self.indicators.update(id, index, name);
                    self.cache.insert(id, index);
                }
            }
            Err(e) => {
                warn!("initial state query failed: {}", e);
                let index = self.source.focused_workspace_index().unwrap_or_else(|e| {
                    warn!("focused workspace query failed: {}", e);
                    0
                });
                for id in ids {
                    self.indicators.update(id, index, None);
                    self.cache.insert(id, index);
                }
            }
        }
    }

    fn cycle(&mut self, monitor: MonitorId, forward: bool) {
        let Some(&current) = self.cache.get(&monitor) else {
            warn!("cannot cycle unknown monitor {}", monitor);
            return;
        };
        let occupied = match self.source.occupied_workspaces(monitor) {
            Ok(o) => o,
            Err(e) => {
                warn!("cannot cycle monitor {}: {}", monitor, e);
                return;
            }
        };
        match next_workspace(&occupied, current, forward) {
            Some(target) if target != current => {
                self.source.request_workspace_switch(monitor, target);
            }
            _ => debug!("nowhere to cycle to on monitor {}", monitor),
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn registry(&self) -> &MonitorRegistry {
        &self.registry
    }

    pub fn indicators(&self) -> &IndicatorSet<F> {
        &self.indicators
    }

    /// Last applied workspace index of `monitor`.
    pub fn cached(&self, monitor: MonitorId) -> Option<usize> {
        self.cache.get(&monitor).copied()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

/// Whether `window` covers one of `monitors` (within `tolerance` pixels).
///
/// Our own indicator windows never count.
pub fn is_fullscreen(window: &FocusedWindow, monitors: &[Rect], tolerance: i32) -> bool {
    if window.title == INDICATOR_TITLE {
        return false;
    }
    monitors.iter().any(|m| window.rect.matches(m, tolerance))
}

/// Next (or previous) entry of `occupied` relative to `current`, wrapping
/// around at either end.
fn next_workspace(occupied: &[usize], current: usize, forward: bool) -> Option<usize> {
    let mut sorted = occupied.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    if forward {
        sorted
            .iter()
            .copied()
            .find(|&w| w > current)
            .or_else(|| sorted.first().copied())
    } else {
        sorted
            .iter()
            .rev()
            .copied()
            .find(|&w| w < current)
            .or_else(|| sorted.last().copied())
    }
}

//  Tests
