//! **wsindicator**: a floating, per-monitor workspace indicator for the
//! komorebi tiling window manager.
//!
//! Every monitor gets a small always-on-top label showing the workspace
//! focused on it.  The daemon keeps no authoritative state: it polls
//! `komorebic` and mirrors what it reports.
//!
//! # Architecture
//!
//! The [`engine::SyncEngine`] is generic over three traits:
//!
//! * [`traits::StateSource`]: monitor topology and per-monitor workspace
//!   state.  Implemented by [`komorebi::KomorebicSource`].
//! * [`traits::FullscreenProbe`]: the focused window, so indicators can
//!   step aside for fullscreen apps.  Implemented by `win32::Win32Probe`
//!   (the foreground window), `hyprland::HyprlandProbe` and
//!   [`probe::NoProbe`].
//! * [`traits::SurfaceFactory`]: the on-screen surfaces.  Implemented in
//!   [`indicator`] for GTK4 layer-shell and for headless operation.
//!
//! User intent arrives as [`command::Command`]s, from the indicator context
//! menus or from the [`ipc`] control socket.

pub mod command;
pub mod config;
pub mod engine;
#[cfg(unix)]
pub mod hyprland;
pub mod indicator;
#[cfg(unix)]
pub mod ipc;
pub mod komorebi;
pub mod model;
pub mod probe;
pub mod registry;
pub mod template;
pub mod traits;
#[cfg(windows)]
pub mod win32;
