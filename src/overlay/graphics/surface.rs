//! `DxSurface`: the Windows graphics surface for an overlay window.

use windows::Win32::Foundation::{D2DERR_RECREATE_TARGET, HWND, RECT};
use windows::Win32::Graphics::Direct2D::ID2D1Image;
use windows::Win32::Graphics::Dxgi::{
    IDXGIDevice3, IDXGISurface, DXGI_ERROR_DEVICE_REMOVED, DXGI_ERROR_DEVICE_RESET, DXGI_PRESENT,
};
use windows::Win32::UI::WindowsAndMessaging::GetClientRect;

use windows::core::{Interface, HRESULT};

use crate::error::{OverlayError, OverlayResult};
use crate::overlay::types::Frame;

use super::d2d::{create_target_bitmap, draw_frame, Factories};
use super::device::DeviceResources;
use super::{DeviceNotifyList, GraphicsSurface, OutputSize, ResourceRefresh};

/// Swap-chain surface bound to one window.
///
/// The window handle is kept as an isize so the surface can move to the
/// render thread.
pub struct DxSurface {
    hwnd: isize,
    factories: Factories,
    resources: Option<DeviceResources>,
    notify: DeviceNotifyList,
    // Loss reported, restore not yet reported
    lost: bool,
}

// SAFETY: DxSurface is Send because:
// - it is owned by exactly one thread at a time (built by the owner, then moved
//   into the render thread and never shared)
// - the D2D factory is created multi-threaded
// - the window handle is stored as an isize, not a raw pointer
unsafe impl Send for DxSurface {}

impl DxSurface {
    /// Create the device, swap chain and drawing context for `hwnd`.
    ///
    /// Fails with `GraphicsInit` when no adapter can be used and with
    /// `WindowGeometry` when the client rect cannot be read.
    pub fn bind(hwnd: isize) -> OverlayResult<Self> {
        let factories = Factories::create()
            .map_err(|e| OverlayError::GraphicsInit(format!("factories: {}", e)))?;
        let size = client_size(hwnd)?;
        let resources = DeviceResources::create(&factories, to_hwnd(hwnd), size)
            .map_err(|e| OverlayError::GraphicsInit(format!("device resources: {}", e)))?;

        log::info!(
            "[GRAPHICS] Bound surface to window {:#x} ({}x{})",
            hwnd,
            size.width,
            size.height
        );

        Ok(Self {
            hwnd,
            factories,
            resources: Some(resources),
            notify: DeviceNotifyList::new(),
            lost: false,
        })
    }

    /// Observers told about device loss and restoration.
    pub fn device_notify(&self) -> DeviceNotifyList {
        self.notify.clone()
    }

    /// Drop everything device-dependent and try to build it again.
    ///
    /// Observers hear about the loss once; `restore` tells them about the
    /// recovery on whichever later attempt succeeds.
    fn handle_device_lost(&mut self) -> OverlayResult<()> {
        self.resources = None;
        if !self.lost {
            log::warn!("[GRAPHICS] Device lost, recreating resources");
            self.lost = true;
            self.notify.notify_lost();
        }
        self.restore()
    }

    fn restore(&mut self) -> OverlayResult<()> {
        let size = client_size(self.hwnd)?;
        let resources = DeviceResources::create(&self.factories, to_hwnd(self.hwnd), size)
            .map_err(|e| OverlayError::DeviceLost(format!("recreate resources: {}", e)))?;
        self.resources = Some(resources);

        if std::mem::take(&mut self.lost) {
            log::info!("[GRAPHICS] Device resources restored");
            self.notify.notify_restored();
        }
        Ok(())
    }

    /// Resources sized to the current client rect.
    ///
    /// A size change resizes the swap chain in place; missing resources (after
    /// a failed rebuild) are created again.
    fn current_resources(&mut self) -> OverlayResult<&DeviceResources> {
        let size = client_size(self.hwnd)?;
        let current = self.resources.as_ref().map(|r| r.size);

        match ResourceRefresh::plan(current, size) {
            ResourceRefresh::Keep => {}
            ResourceRefresh::Resize => {
                if let Some(res) = self.resources.as_mut() {
                    res.resize(size).map_err(|e| {
                        if is_device_lost(e.code()) {
                            OverlayError::DeviceLost(format!("resize: {}", e))
                        } else {
                            OverlayError::Graphics(format!("resize: {}", e))
                        }
                    })?;
                    log::debug!("[GRAPHICS] Resized to {}x{}", size.width, size.height);
                }
            }
            ResourceRefresh::Rebuild => self.restore()?,
        }

        self.resources
            .as_ref()
            .ok_or_else(|| OverlayError::DeviceLost("no device resources".into()))
    }

    fn render(&mut self, frame: &Frame) -> OverlayResult<()> {
        let label_format = self.factories.label_format.clone();
        let res = self.current_resources()?;

        unsafe {
            let surface: IDXGISurface = res.swap_chain.GetBuffer(0)?;
            let target = create_target_bitmap(&res.context, &surface)?;

            res.context.SetTarget(&target);
            res.context.BeginDraw();
            draw_frame(&res.context, &res.brushes, &label_format, frame);

            if let Err(e) = res.context.EndDraw(None, None) {
                res.context.SetTarget(None::<&ID2D1Image>);
                if e.code() == D2DERR_RECREATE_TARGET {
                    return Err(OverlayError::DeviceLost(e.to_string()));
                }
                return Err(e.into());
            }
            res.context.SetTarget(None::<&ID2D1Image>);

            let hr = res.swap_chain.Present(1, DXGI_PRESENT(0));
            if is_device_lost(hr) {
                return Err(OverlayError::DeviceLost(format!("present: {:?}", hr)));
            }
            hr.ok()?;
            res.comp_device.Commit()?;
        }

        Ok(())
    }
}

impl GraphicsSurface for DxSurface {
    fn draw(&mut self, frame: &Frame) -> OverlayResult<()> {
        match self.render(frame) {
            Err(OverlayError::DeviceLost(reason)) => {
                self.handle_device_lost()?;
                Err(OverlayError::DeviceLost(reason))
            }
            other => other,
        }
    }

    fn trim(&mut self) {
        let Some(res) = self.resources.as_ref() else {
            return;
        };
        match res.d3d_device.cast::<IDXGIDevice3>() {
            Ok(device) => unsafe { device.Trim() },
            Err(e) => log::debug!("[GRAPHICS] Trim skipped: {}", e),
        }
    }

    fn output_size(&self) -> OutputSize {
        self.resources
            .as_ref()
            .map(|r| r.size)
            .unwrap_or_default()
    }
}

fn is_device_lost(hr: HRESULT) -> bool {
    hr == DXGI_ERROR_DEVICE_REMOVED || hr == DXGI_ERROR_DEVICE_RESET
}

fn to_hwnd(hwnd: isize) -> HWND {
    HWND(hwnd as *mut _)
}

/// Client rect size of the window, at least 1x1.
fn client_size(hwnd: isize) -> OverlayResult<OutputSize> {
    let mut rect = RECT::default();
    unsafe { GetClientRect(to_hwnd(hwnd), &mut rect) }
        .map_err(|e| OverlayError::WindowGeometry(format!("GetClientRect: {}", e)))?;

    Ok(OutputSize {
        width: (rect.right - rect.left).max(1) as u32,
        height: (rect.bottom - rect.top).max(1) as u32,
    })
}
