//! Fallback [`FullscreenProbe`] for platforms without one.

use crate::model::FocusedWindow;
use crate::traits::FullscreenProbe;

/// Never reports a focused window, so indicators are never suppressed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProbe;

impl FullscreenProbe for NoProbe {
    fn focused_window(&self) -> Option<FocusedWindow> {
        None
    }
}

impl<P: FullscreenProbe + ?Sized> FullscreenProbe for Box<P> {
    fn focused_window(&self) -> Option<FocusedWindow> {
        (**self).focused_window()
    }
}
