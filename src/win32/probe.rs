//! [`FullscreenProbe`] backed by the Win32 foreground window.
//!
//! Reads the title and outer rectangle of whatever window has the
//! foreground.  The engine compares that rectangle against every monitor,
//! so nothing here knows about fullscreen itself.

use crate::model::{FocusedWindow, Rect};
use crate::traits::FullscreenProbe;
use log::trace;
use windows::Win32::Foundation::RECT;
use windows::Win32::UI::WindowsAndMessaging::{GetForegroundWindow, GetWindowRect, GetWindowTextW};

/// Longer window titles are truncated.
const MAX_TITLE_LEN: usize = 512;

/// Foreground-window probe.  Stateless; every call asks the system afresh.
#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Probe;

impl Win32Probe {
    pub fn new() -> Self {
        Self
    }

    /// The foreground window, or `None` when no window has the foreground
    /// (e.g. while the desktop switches).
    pub fn foreground_window(&self) -> windows::core::Result<Option<FocusedWindow>> {
        let hwnd = unsafe { GetForegroundWindow() };
        if hwnd.is_invalid() {
            return Ok(None);
        }

        let mut title = [0u16; MAX_TITLE_LEN];
        let len = unsafe { GetWindowTextW(hwnd, &mut title) };
        let len = (len.max(0) as usize).min(MAX_TITLE_LEN);

        let mut rect = RECT::default();
        unsafe { GetWindowRect(hwnd, &mut rect) }?;

        Ok(Some(focused_window(&title[..len], rect)))
    }
}

impl FullscreenProbe for Win32Probe {
    fn focused_window(&self) -> Option<FocusedWindow> {
        match self.foreground_window() {
            Ok(w) => w,
            Err(e) => {
                trace!("foreground window query failed: {}", e);
                None
            }
        }
    }
}

/// Build a [`FocusedWindow`] from a UTF-16 title and a window `RECT`.
fn focused_window(title: &[u16], rect: RECT) -> FocusedWindow {
    FocusedWindow {
        title: String::from_utf16_lossy(title),
        rect: Rect::new(rect.left, rect.top, rect.right, rect.bottom),
    }
}
