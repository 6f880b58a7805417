//! Win32 overlay window.

use windows::Win32::Foundation::{HWND, POINT};
use windows::Win32::Graphics::Gdi::ClientToScreen;
use windows::Win32::UI::WindowsAndMessaging::{ShowWindow, SW_HIDE, SW_SHOWNA};

use crate::error::{OverlayError, OverlayResult};

use super::types::Point;
use super::OverlayWindow;

/// An existing top-level window used as the overlay.
///
/// Creation and styling (layered, topmost, click-through) belong to the host.
pub struct Win32Window {
    hwnd: isize,
}

impl Win32Window {
    pub fn new(hwnd: isize) -> Self {
        Self { hwnd }
    }

    fn handle(&self) -> HWND {
        HWND(self.hwnd as *mut _)
    }
}

impl OverlayWindow for Win32Window {
    fn set_visible(&self, visible: bool) {
        let cmd = if visible { SW_SHOWNA } else { SW_HIDE };
        // Return value is the previous visibility
        let _ = unsafe { ShowWindow(self.handle(), cmd) };
    }

    fn client_origin(&self) -> OverlayResult<Point> {
        let mut origin = POINT { x: 0, y: 0 };
        let ok = unsafe { ClientToScreen(self.handle(), &mut origin) };
        if !ok.as_bool() {
            return Err(OverlayError::WindowGeometry(format!(
                "ClientToScreen failed for window {:#x}",
                self.hwnd
            )));
        }
        Ok(Point::new(origin.x, origin.y))
    }
}
