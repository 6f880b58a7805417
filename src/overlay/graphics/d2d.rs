//! Direct2D factories, brushes, and frame drawing.
//!
//! Factories and the label text format do not depend on the GPU device and
//! survive device loss. Brushes belong to a device context and are rebuilt
//! with it; their colors are set per draw call so fading never needs new
//! brushes.

use windows::core::{Interface, Result, PCWSTR};
use windows::Foundation::Numerics::Matrix3x2;
use windows::Win32::Graphics::Direct2D::Common::{
    D2D1_ALPHA_MODE_PREMULTIPLIED, D2D1_PIXEL_FORMAT,
};
use windows::Win32::Graphics::Direct2D::{
    D2D1CreateFactory, ID2D1Bitmap1, ID2D1DeviceContext, ID2D1Factory1, ID2D1RenderTarget,
    ID2D1SolidColorBrush, D2D1_BITMAP_OPTIONS_CANNOT_DRAW, D2D1_BITMAP_OPTIONS_TARGET,
    D2D1_BITMAP_PROPERTIES1, D2D1_BRUSH_PROPERTIES, D2D1_DRAW_TEXT_OPTIONS_NONE,
    D2D1_FACTORY_TYPE_MULTI_THREADED,
};
use windows::Win32::Graphics::DirectWrite::{
    DWriteCreateFactory, IDWriteFactory, IDWriteTextFormat, DWRITE_FACTORY_TYPE_SHARED,
    DWRITE_FONT_STRETCH_NORMAL, DWRITE_FONT_STYLE_NORMAL, DWRITE_FONT_WEIGHT_NORMAL,
    DWRITE_MEASURING_MODE_NATURAL, DWRITE_PARAGRAPH_ALIGNMENT_CENTER,
    DWRITE_TEXT_ALIGNMENT_CENTER,
};
use windows::Win32::Graphics::Dxgi::Common::DXGI_FORMAT_B8G8R8A8_UNORM;
use windows::Win32::Graphics::Dxgi::IDXGISurface;

use crate::overlay::types::{Color, Frame, BORDER_WIDTH, LABEL_FONT_SIZE};

/// Device-independent factories, owned by one surface.
pub struct Factories {
    pub d2d: ID2D1Factory1,
    pub label_format: IDWriteTextFormat,
}

impl Factories {
    pub fn create() -> Result<Self> {
        // Multi-threaded: the surface is built on the owner thread and then
        // used from the render thread.
        let d2d: ID2D1Factory1 =
            unsafe { D2D1CreateFactory(D2D1_FACTORY_TYPE_MULTI_THREADED, None)? };
        let label_format = create_label_format()?;
        Ok(Self { d2d, label_format })
    }
}

/// Reusable brushes; colors are set right before each use.
pub struct Brushes {
    pub fill: ID2D1SolidColorBrush,
    pub border: ID2D1SolidColorBrush,
    pub label: ID2D1SolidColorBrush,
}

/// Create the brushes for a device context.
pub fn create_brushes(context: &ID2D1DeviceContext) -> Result<Brushes> {
    let render_target: ID2D1RenderTarget = context.cast()?;
    let props = D2D1_BRUSH_PROPERTIES {
        opacity: 1.0,
        transform: Matrix3x2::identity(),
    };
    let initial = Color::TRANSPARENT.to_d2d_color();

    unsafe {
        Ok(Brushes {
            fill: render_target.CreateSolidColorBrush(&initial, Some(&props))?,
            border: render_target.CreateSolidColorBrush(&initial, Some(&props))?,
            label: render_target.CreateSolidColorBrush(&initial, Some(&props))?,
        })
    }
}

/// Text format for zone number labels.
fn create_label_format() -> Result<IDWriteTextFormat> {
    unsafe {
        let factory: IDWriteFactory = DWriteCreateFactory(DWRITE_FACTORY_TYPE_SHARED)?;

        let font: Vec<u16> = "Segoe UI\0".encode_utf16().collect();
        let locale: Vec<u16> = "en-US\0".encode_utf16().collect();

        let format = factory.CreateTextFormat(
            PCWSTR(font.as_ptr()),
            None,
            DWRITE_FONT_WEIGHT_NORMAL,
            DWRITE_FONT_STYLE_NORMAL,
            DWRITE_FONT_STRETCH_NORMAL,
            LABEL_FONT_SIZE,
            PCWSTR(locale.as_ptr()),
        )?;

        format.SetTextAlignment(DWRITE_TEXT_ALIGNMENT_CENTER)?;
        format.SetParagraphAlignment(DWRITE_PARAGRAPH_ALIGNMENT_CENTER)?;

        Ok(format)
    }
}

/// Wrap the swap chain back buffer as a D2D target bitmap.
pub fn create_target_bitmap(
    context: &ID2D1DeviceContext,
    surface: &IDXGISurface,
) -> Result<ID2D1Bitmap1> {
    let bitmap_props = D2D1_BITMAP_PROPERTIES1 {
        pixelFormat: D2D1_PIXEL_FORMAT {
            format: DXGI_FORMAT_B8G8R8A8_UNORM,
            alphaMode: D2D1_ALPHA_MODE_PREMULTIPLIED,
        },
        dpiX: 96.0,
        dpiY: 96.0,
        bitmapOptions: D2D1_BITMAP_OPTIONS_TARGET | D2D1_BITMAP_OPTIONS_CANNOT_DRAW,
        colorContext: std::mem::ManuallyDrop::new(None),
    };

    unsafe { context.CreateBitmapFromDxgiSurface(surface, Some(&bitmap_props)) }
}

/// Record the draw calls for one frame. Must run between BeginDraw/EndDraw.
pub fn draw_frame(
    context: &ID2D1DeviceContext,
    brushes: &Brushes,
    label_format: &IDWriteTextFormat,
    frame: &Frame,
) {
    unsafe {
        context.Clear(Some(&Color::TRANSPARENT.to_d2d_color()));
        brushes.label.SetColor(&frame.label_color().to_d2d_color());

        for rect in &frame.rects {
            let area = rect.rect.to_d2d_rect();

            brushes.fill.SetColor(&frame.fill_color(rect).to_d2d_color());
            context.FillRectangle(&area, &brushes.fill);

            brushes
                .border
                .SetColor(&frame.border_color(rect).to_d2d_color());
            context.DrawRectangle(&area, &brushes.border, BORDER_WIDTH, None);

            if frame.show_labels {
                let label: Vec<u16> = rect.label().encode_utf16().collect();
                context.DrawText(
                    &label,
                    label_format,
                    &area,
                    &brushes.label,
                    D2D1_DRAW_TEXT_OPTIONS_NONE,
                    DWRITE_MEASURING_MODE_NATURAL,
                );
            }
        }
    }
}
