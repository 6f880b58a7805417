//! Graphics subsystem for the zone overlay.
//!
//! A `GraphicsSurface` owns everything device-dependent for one overlay window
//! and lives on that window's render thread.
//!
//! # Architecture (Windows backend)
//!
//! ```text
//! DxSurface
//!   +-- Factories (device-independent: D2D factory, DWrite text format)
//!   +-- DeviceResources (rebuilt as one unit on device loss)
//!         +-- D3D11 Device (hardware, WARP fallback)
//!         +-- DXGI Swap Chain (for composition)
//!         |     +-- DirectComposition target + visual
//!         +-- D2D Device Context + brushes
//! ```
//!
//! # Modules
//!
//! - `device` - D3D11 device, swap chain, DirectComposition, D2D context
//! - `d2d` - Direct2D factories, brushes and frame drawing
//! - `surface` - `DxSurface`, the Windows `GraphicsSurface`
//! - `headless` - recording surface for hosts without a GPU window

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::OverlayResult;

use super::types::Frame;

#[cfg(windows)]
pub mod d2d;
#[cfg(windows)]
pub mod device;
pub mod headless;
#[cfg(windows)]
pub mod surface;

pub use headless::{FrameLog, HeadlessSurface};
#[cfg(windows)]
pub use surface::DxSurface;

/// Size of the presentable surface in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputSize {
    pub width: u32,
    pub height: u32,
}

/// What a surface must do to its device resources before the next frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceRefresh {
    Keep,
    /// Same device, resize the swap-chain buffers in place.
    Resize,
    /// No usable resources; build the whole device bundle.
    Rebuild,
}

impl ResourceRefresh {
    pub fn plan(current: Option<OutputSize>, wanted: OutputSize) -> Self {
        match current {
            None => Self::Rebuild,
            Some(size) if size == wanted => Self::Keep,
            Some(_) => Self::Resize,
        }
    }
}

/// A presentable drawing surface bound to one overlay window.
pub trait GraphicsSurface: Send {
    /// Draw `frame` and present it.
    ///
    /// Returns `OverlayError::DeviceLost` when the frame was dropped because
    /// the device went away; the caller should draw again. Observers hear
    /// `on_device_lost` once per loss and `on_device_restored` only after a
    /// rebuild succeeds, however many attempts that takes.
    fn draw(&mut self, frame: &Frame) -> OverlayResult<()>;

    /// Best-effort hint that transient GPU memory can be released.
    fn trim(&mut self);

    fn output_size(&self) -> OutputSize;
}

/// Observer for device loss. Owners of device-dependent caches register one.
pub trait DeviceNotify: Send + Sync {
    fn on_device_lost(&self);
    fn on_device_restored(&self);
}

/// Registered device-loss observers, shared between a surface and its owner.
#[derive(Clone, Default)]
pub struct DeviceNotifyList {
    observers: Arc<Mutex<Vec<Arc<dyn DeviceNotify>>>>,
}

impl DeviceNotifyList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, observer: Arc<dyn DeviceNotify>) {
        self.observers.lock().push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn notify_lost(&self) {
        for observer in self.snapshot() {
            observer.on_device_lost();
        }
    }

    pub fn notify_restored(&self) {
        for observer in self.snapshot() {
            observer.on_device_restored();
        }
    }

    // Observers may register further observers from inside a callback.
    fn snapshot(&self) -> Vec<Arc<dyn DeviceNotify>> {
        self.observers.lock().clone()
    }
}
