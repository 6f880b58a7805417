//! Device-dependent resources for one overlay window.
//!
//! Everything that dies with the GPU device is created here as a single
//! `DeviceResources` bundle: the D3D11 device, the composition swap chain, the
//! DirectComposition tree that puts it on the window, and the Direct2D device
//! context plus brushes that draw into it. On device loss the whole bundle is
//! dropped and created again.

use windows::core::{Interface, Result};
use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Direct2D::{
    ID2D1Device, ID2D1DeviceContext, D2D1_DEVICE_CONTEXT_OPTIONS_NONE,
    D2D1_TEXT_ANTIALIAS_MODE_GRAYSCALE,
};
use windows::Win32::Graphics::Direct3D::{
    D3D_DRIVER_TYPE, D3D_DRIVER_TYPE_HARDWARE, D3D_DRIVER_TYPE_WARP,
};
use windows::Win32::Graphics::Direct3D11::{
    D3D11CreateDevice, ID3D11Device, D3D11_CREATE_DEVICE_BGRA_SUPPORT, D3D11_SDK_VERSION,
};
use windows::Win32::Graphics::DirectComposition::{
    DCompositionCreateDevice, IDCompositionDevice, IDCompositionTarget, IDCompositionVisual,
};
use windows::Win32::Graphics::Dxgi::Common::{
    DXGI_ALPHA_MODE_PREMULTIPLIED, DXGI_FORMAT_B8G8R8A8_UNORM, DXGI_FORMAT_UNKNOWN,
    DXGI_SAMPLE_DESC,
};
use windows::Win32::Graphics::Dxgi::{
    CreateDXGIFactory2, IDXGIDevice, IDXGIDevice1, IDXGIFactory2, IDXGISwapChain1,
    DXGI_CREATE_FACTORY_FLAGS, DXGI_SCALING_STRETCH, DXGI_SWAP_CHAIN_DESC1,
    DXGI_SWAP_CHAIN_FLAG, DXGI_SWAP_EFFECT_FLIP_SEQUENTIAL, DXGI_USAGE_RENDER_TARGET_OUTPUT,
};

use super::d2d::{create_brushes, Brushes, Factories};
use super::OutputSize;

/// All objects tied to the lifetime of one GPU device.
pub struct DeviceResources {
    pub d3d_device: ID3D11Device,
    pub swap_chain: IDXGISwapChain1,
    pub comp_device: IDCompositionDevice,
    // Held so the visual tree stays alive
    _comp_target: IDCompositionTarget,
    _comp_visual: IDCompositionVisual,
    pub context: ID2D1DeviceContext,
    pub brushes: Brushes,
    pub size: OutputSize,
}

impl DeviceResources {
    /// Build the bundle for `hwnd` at `size`.
    pub fn create(factories: &Factories, hwnd: HWND, size: OutputSize) -> Result<Self> {
        let d3d_device = create_device()?;
        let swap_chain = create_swap_chain(&d3d_device, size)?;

        let (comp_device, comp_target, comp_visual) =
            create_composition(&d3d_device, hwnd, &swap_chain)?;

        let context = create_context(factories, &d3d_device)?;
        let brushes = create_brushes(&context)?;

        Ok(Self {
            d3d_device,
            swap_chain,
            comp_device,
            _comp_target: comp_target,
            _comp_visual: comp_visual,
            context,
            brushes,
            size,
        })
    }

    /// Resize the swap-chain buffers, keeping the device, context and brushes.
    ///
    /// No buffer may be referenced when this is called; the target bitmap is
    /// created per frame and released after present.
    pub fn resize(&mut self, size: OutputSize) -> Result<()> {
        unsafe {
            self.swap_chain.ResizeBuffers(
                0,
                size.width,
                size.height,
                DXGI_FORMAT_UNKNOWN,
                DXGI_SWAP_CHAIN_FLAG(0),
            )?;
        }
        self.size = size;
        Ok(())
    }
}

/// Create a D3D11 device with BGRA support (required for Direct2D interop).
///
/// Tries the hardware driver first and falls back to WARP.
pub fn create_device() -> Result<ID3D11Device> {
    match create_device_with(D3D_DRIVER_TYPE_HARDWARE) {
        Ok(device) => Ok(device),
        Err(e) => {
            log::warn!("[GRAPHICS] Hardware device unavailable ({}), using WARP", e);
            create_device_with(D3D_DRIVER_TYPE_WARP)
        }
    }
}

fn create_device_with(driver_type: D3D_DRIVER_TYPE) -> Result<ID3D11Device> {
    let mut device: Option<ID3D11Device> = None;

    unsafe {
        D3D11CreateDevice(
            None,
            driver_type,
            None,
            D3D11_CREATE_DEVICE_BGRA_SUPPORT,
            None,
            D3D11_SDK_VERSION,
            Some(&mut device),
            None,
            None,
        )?;
    }

    device.ok_or_else(windows::core::Error::from_win32)
}

/// Create a premultiplied-alpha flip swap chain for composition.
pub fn create_swap_chain(device: &ID3D11Device, size: OutputSize) -> Result<IDXGISwapChain1> {
    unsafe {
        let dxgi_device: IDXGIDevice = device.cast()?;
        let dxgi_factory: IDXGIFactory2 = CreateDXGIFactory2(DXGI_CREATE_FACTORY_FLAGS(0))?;

        let desc = DXGI_SWAP_CHAIN_DESC1 {
            Width: size.width,
            Height: size.height,
            Format: DXGI_FORMAT_B8G8R8A8_UNORM,
            Stereo: false.into(),
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: 1,
                Quality: 0,
            },
            BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
            BufferCount: 2,
            Scaling: DXGI_SCALING_STRETCH,
            SwapEffect: DXGI_SWAP_EFFECT_FLIP_SEQUENTIAL,
            AlphaMode: DXGI_ALPHA_MODE_PREMULTIPLIED,
            Flags: 0,
        };

        let swap_chain = dxgi_factory.CreateSwapChainForComposition(&dxgi_device, &desc, None)?;

        // One queued frame keeps the fade in step with the render loop
        let dxgi_device1: IDXGIDevice1 = device.cast()?;
        dxgi_device1.SetMaximumFrameLatency(1)?;

        Ok(swap_chain)
    }
}

/// Put the swap chain on the window through a DirectComposition visual.
fn create_composition(
    d3d_device: &ID3D11Device,
    hwnd: HWND,
    swap_chain: &IDXGISwapChain1,
) -> Result<(IDCompositionDevice, IDCompositionTarget, IDCompositionVisual)> {
    unsafe {
        let dxgi_device: IDXGIDevice = d3d_device.cast()?;

        let device: IDCompositionDevice = DCompositionCreateDevice(&dxgi_device)?;
        let target = device.CreateTargetForHwnd(hwnd, true)?;
        let visual = device.CreateVisual()?;

        visual.SetContent(swap_chain)?;
        target.SetRoot(&visual)?;
        device.Commit()?;

        Ok((device, target, visual))
    }
}

/// Create the Direct2D device context on top of the D3D device.
fn create_context(factories: &Factories, d3d_device: &ID3D11Device) -> Result<ID2D1DeviceContext> {
    unsafe {
        let dxgi_device: IDXGIDevice = d3d_device.cast()?;
        let d2d_device: ID2D1Device = factories.d2d.CreateDevice(&dxgi_device)?;
        let context = d2d_device.CreateDeviceContext(D2D1_DEVICE_CONTEXT_OPTIONS_NONE)?;
        context.SetTextAntialiasMode(D2D1_TEXT_ANTIALIAS_MODE_GRAYSCALE);
        Ok(context)
    }
}
