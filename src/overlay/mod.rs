//! Zone overlay: a translucent layer that shows the active zone layout on top
//! of one monitor's work area.
//!
//! `ZoneOverlay` is the application-thread handle. It turns layouts into
//! scenes, toggles the overlay window, and hands the rest to its `RenderLoop`,
//! which owns the `GraphicsSurface` and draws on its own thread.
//!
//! # Modules
//!
//! - `types` - geometry, colors, zones, frames
//! - `scene` - layout + highlight set -> ordered drawable rects
//! - `animation` - fade-in progress
//! - `render_loop` - the render thread
//! - `graphics` - device/surface backends
//! - `window` - Win32 overlay window

pub mod animation;
pub mod graphics;
pub mod render_loop;
pub mod scene;
pub mod types;
#[cfg(windows)]
pub mod window;


pub use graphics::{DeviceNotify, DeviceNotifyList, GraphicsSurface, HeadlessSurface};
pub use render_loop::RenderLoop;
pub use scene::SceneBuilder;
pub use types::{Color, ColorPolicy, Point, Rect, Zone, ZoneLayout};
#[cfg(windows)]
pub use window::Win32Window;

use parking_lot::Mutex;

use crate::config::overlay::{current_color_policy, get_show_animation_ms};
use crate::error::OverlayResult;

/// The window an overlay draws into.
pub trait OverlayWindow: Send + Sync {
    /// Show without activating, or hide.
    fn set_visible(&self, visible: bool);

    /// Top-left of the client area in the coordinates zone rects use.
    fn client_origin(&self) -> OverlayResult<Point>;
}

/// Overlay for one monitor.
///
/// Every method blocks only for a short critical section; drawing happens on
/// the render thread. Dropping the overlay stops that thread.
pub struct ZoneOverlay {
    window: Box<dyn OverlayWindow>,
    render: RenderLoop,
    // Held across the state change and the window call so concurrent
    // show/hide reach the window in the order they changed the state.
    // The render thread never takes it.
    visibility: Mutex<()>,
}

impl ZoneOverlay {
    pub fn new(
        window: Box<dyn OverlayWindow>,
        surface: Box<dyn GraphicsSurface>,
    ) -> OverlayResult<Self> {
        let render = RenderLoop::spawn(surface)?;
        Ok(Self {
            window,
            render,
            visibility: Mutex::new(()),
        })
    }

    /// Make the overlay visible and fade it in over `duration_ms`.
    ///
    /// No effect while already visible. A zero duration shows the overlay at
    /// full opacity on the next frame.
    pub fn show(&self, duration_ms: u32) {
        let _visibility = self.visibility.lock();
        if self.render.update(|s| s.begin_show(duration_ms)) {
            log::debug!("[OVERLAY] Show ({} ms fade)", duration_ms);
            self.window.set_visible(true);
        }
    }

    /// `show` with the fade length from the overlay config.
    pub fn show_configured(&self) {
        self.show(get_show_animation_ms());
    }

    /// Hide the overlay, cancelling any fade in progress.
    pub fn hide(&self) {
        let _visibility = self.visibility.lock();
        if self.render.update(|s| s.end_show()) {
            log::debug!("[OVERLAY] Hide");
            self.window.set_visible(false);
        }
    }

    /// Replace the drawn scene with `layout`, highlighting the zones in
    /// `highlighted`.
    pub fn draw_active_layout(
        &self,
        layout: &ZoneLayout,
        highlighted: &[usize],
        policy: &ColorPolicy,
    ) -> OverlayResult<()> {
        let origin = self.window.client_origin()?;
        let scene = SceneBuilder::new(origin).build(layout, highlighted, policy);
        self.render
            .update(|s| s.submit_scene(scene, policy.show_labels));
        Ok(())
    }

    /// `draw_active_layout` with the colors from the overlay config.
    pub fn draw_configured_layout(
        &self,
        layout: &ZoneLayout,
        highlighted: &[usize],
    ) -> OverlayResult<()> {
        self.draw_active_layout(layout, highlighted, &current_color_policy())
    }

    /// Redraw the current scene on the next wake.
    pub fn force_render(&self) {
        self.render.update(|s| s.mark_dirty());
    }

    pub fn is_visible(&self) -> bool {
        self.render.read(|s| s.is_visible())
    }
}

/// Build an overlay on an existing window.
///
/// Returns `None` (after logging) when the graphics device or the render
/// thread cannot be set up; the caller runs without an overlay on that monitor.
#[cfg(windows)]
pub fn create_for_hwnd(hwnd: isize) -> Option<ZoneOverlay> {
    let surface = match graphics::DxSurface::bind(hwnd) {
        Ok(surface) => surface,
        Err(e) => {
            log::error!("[OVERLAY] Cannot draw on window {:#x}: {}", hwnd, e);
            return None;
        }
    };

    match ZoneOverlay::new(Box::new(Win32Window::new(hwnd)), Box::new(surface)) {
        Ok(overlay) => Some(overlay),
        Err(e) => {
            log::error!("[OVERLAY] Failed to start overlay: {}", e);
            None
        }
    }
}
