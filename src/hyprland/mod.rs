//! Hyprland-specific implementations.
//!
//! Provides a [`FullscreenProbe`](crate::traits::FullscreenProbe) backed by
//! Hyprland's IPC socket.  Nothing outside this module should reference
//! Hyprland directly.

pub mod probe;

pub use probe::{HyprlandProbe, HyprlandProbeError};
