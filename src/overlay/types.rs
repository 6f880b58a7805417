//! Type definitions for the zone overlay.
//!
//! Geometry primitives, colors, zone layouts and the drawable projection of a
//! zone that the render thread consumes.

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Inset applied to every zone rect so 1px strokes land on pixel centers
pub const PIXEL_INSET: f32 = 0.5;

/// Border stroke width in pixels
pub const BORDER_WIDTH: f32 = 1.0;

/// Font size for zone number labels
pub const LABEL_FONT_SIZE: f32 = 80.0;

// ============================================================================
// Geometry Types
// ============================================================================

/// A point with integer coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A rectangle with integer coordinates.
///
/// Uses left/top/right/bottom format where right and bottom are exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    /// Create a new rectangle from left, top, right, bottom coordinates
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Create a rectangle from x, y, width, height
    pub fn from_xywh(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            left: x,
            top: y,
            right: x + width as i32,
            bottom: y + height as i32,
        }
    }

    /// Get the width of the rectangle
    pub fn width(&self) -> u32 {
        (self.right - self.left).max(0) as u32
    }

    /// Get the height of the rectangle
    pub fn height(&self) -> u32 {
        (self.bottom - self.top).max(0) as u32
    }

    /// True when the rectangle covers no pixels
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Offset the rectangle by dx, dy
    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self {
            left: self.left + dx,
            top: self.top + dy,
            right: self.right + dx,
            bottom: self.bottom + dy,
        }
    }

    /// Smallest rectangle containing both
    pub fn union(&self, other: &Rect) -> Self {
        Self {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Convert to a float rect inset by half a pixel on every side.
    pub fn to_drawable(&self) -> RectF {
        RectF {
            left: self.left as f32 + PIXEL_INSET,
            top: self.top as f32 + PIXEL_INSET,
            right: self.right as f32 - PIXEL_INSET,
            bottom: self.bottom as f32 - PIXEL_INSET,
        }
    }
}

/// A rectangle in float pixel coordinates, as handed to the GPU backend.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RectF {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

#[cfg(windows)]
impl RectF {
    pub fn to_d2d_rect(&self) -> windows::Win32::Graphics::Direct2D::Common::D2D_RECT_F {
        windows::Win32::Graphics::Direct2D::Common::D2D_RECT_F {
            left: self.left,
            top: self.top,
            right: self.right,
            bottom: self.bottom,
        }
    }
}

// ============================================================================
// Colors
// ============================================================================

/// RGBA color with float channels in 0..=1 (straight alpha).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color from 8-bit channels.
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, 1.0)
    }

    /// Parse `#RRGGBB` (the leading `#` is optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        Some(Self::from_rgb8(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Same color with a different alpha.
    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Same color with alpha multiplied by `factor`.
    pub fn fade(self, factor: f32) -> Self {
        Self {
            a: self.a * factor,
            ..self
        }
    }

    #[cfg(windows)]
    pub fn to_d2d_color(&self) -> windows::Win32::Graphics::Direct2D::Common::D2D1_COLOR_F {
        windows::Win32::Graphics::Direct2D::Common::D2D1_COLOR_F {
            r: self.r,
            g: self.g,
            b: self.b,
            a: self.a,
        }
    }
}

/// How zones are colored when a layout is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorPolicy {
    pub border: Color,
    pub inactive: Color,
    pub highlight: Color,
    /// Fill opacity in percent, shared by inactive and highlighted zones
    pub opacity: u8,
    /// Draw `id + 1` in the middle of every zone
    pub show_labels: bool,
}

impl ColorPolicy {
    /// Fill alpha derived from the opacity percentage.
    pub fn fill_alpha(&self) -> f32 {
        self.opacity.min(100) as f32 / 100.0
    }
}

impl Default for ColorPolicy {
    fn default() -> Self {
        Self {
            border: Color::from_rgb8(0xFF, 0xFF, 0xFF),
            inactive: Color::from_rgb8(0xF5, 0xFC, 0xFF),
            highlight: Color::from_rgb8(0x00, 0x8C, 0xFF),
            opacity: 50,
            show_labels: true,
        }
    }
}

// ============================================================================
// Zones
// ============================================================================

/// A single zone: a stable id and its rectangle in layout coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: usize,
    pub rect: Rect,
}

impl Zone {
    pub fn new(id: usize, rect: Rect) -> Self {
        Self { id, rect }
    }
}

/// An ordered set of zones shown together on one device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneLayout {
    zones: Vec<Zone>,
}

impl ZoneLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a layout from zones, dropping any whose id is already taken.
    pub fn from_zones(zones: impl IntoIterator<Item = Zone>) -> Self {
        let mut layout = Self::new();
        for zone in zones {
            layout.push(zone);
        }
        layout
    }

    /// Append a zone. Returns false if the id is already used in this layout.
    pub fn push(&mut self, zone: Zone) -> bool {
        if self.get(zone.id).is_some() {
            return false;
        }
        self.zones.push(zone);
        true
    }

    pub fn get(&self, id: usize) -> Option<&Zone> {
        self.zones.iter().find(|z| z.id == id)
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

// ============================================================================
// Drawable Scene
// ============================================================================

/// Render-thread projection of a zone. Built fresh on every scene change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawableRect {
    pub rect: RectF,
    pub border_color: Color,
    pub fill_color: Color,
    pub id: usize,
    pub highlighted: bool,
}

impl DrawableRect {
    /// Text drawn in the zone: ids are 0-based, labels are 1-based.
    pub fn label(&self) -> String {
        (self.id + 1).to_string()
    }
}

/// One frame as handed to a graphics surface: the scene plus the alpha that
/// the current animation step applies on top of it.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub rects: Vec<DrawableRect>,
    pub alpha: f32,
    pub show_labels: bool,
}

impl Frame {
    /// Border color of `rect` after the animation alpha is applied.
    pub fn border_color(&self, rect: &DrawableRect) -> Color {
        rect.border_color.fade(self.alpha)
    }

    /// Fill color of `rect` after the animation alpha is applied.
    pub fn fill_color(&self, rect: &DrawableRect) -> Color {
        rect.fill_color.fade(self.alpha)
    }

    /// Label color for this frame.
    pub fn label_color(&self) -> Color {
        Color::BLACK.fade(self.alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_from_xywh() {
        let r = Rect::from_xywh(10, 20, 100, 50);
        assert_eq!(r, Rect::new(10, 20, 110, 70));
        assert_eq!(r.width(), 100);
        assert_eq!(r.height(), 50);
    }

    #[test]
    fn rect_empty() {
        assert!(Rect::new(10, 10, 10, 50).is_empty());
        assert!(Rect::new(10, 10, 50, 5).is_empty());
        assert!(!Rect::new(0, 0, 1, 1).is_empty());
    }

    #[test]
    fn rect_union() {
        let a = Rect::new(0, 0, 100, 100);
        let b = Rect::new(100, 50, 200, 300);
        assert_eq!(a.union(&b), Rect::new(0, 0, 200, 300));
    }

    #[test]
    fn rect_to_drawable_insets_half_pixel() {
        let f = Rect::new(0, 0, 100, 100).to_drawable();
        assert_eq!(f.left, 0.5);
        assert_eq!(f.top, 0.5);
        assert_eq!(f.right, 99.5);
        assert_eq!(f.bottom, 99.5);
    }

    #[test]
    fn color_from_hex() {
        let c = Color::from_hex("#008CFF").unwrap();
        assert_eq!(c, Color::from_rgb8(0x00, 0x8C, 0xFF));
        assert_eq!(Color::from_hex("ffffff"), Some(Color::from_rgb8(255, 255, 255)));
        assert_eq!(Color::from_hex("#12345"), None);
        assert_eq!(Color::from_hex("#GG0000"), None);
        // from_str_radix alone would accept a leading sign in each pair
        assert_eq!(Color::from_hex("#+1+2+3"), None);
        assert_eq!(Color::from_hex("+1+2+3"), None);
    }

    #[test]
    fn color_fade_multiplies_alpha() {
        let c = Color::rgba(1.0, 0.0, 0.0, 0.5).fade(0.5);
        assert_eq!(c.a, 0.25);
        assert_eq!(c.r, 1.0);
    }

    #[test]
    fn layout_rejects_duplicate_ids() {
        let mut layout = ZoneLayout::new();
        assert!(layout.push(Zone::new(0, Rect::new(0, 0, 10, 10))));
        assert!(!layout.push(Zone::new(0, Rect::new(10, 0, 20, 10))));
        assert_eq!(layout.len(), 1);
    }

    #[test]
    fn label_is_one_based() {
        let rect = DrawableRect {
            rect: RectF::default(),
            border_color: Color::BLACK,
            fill_color: Color::BLACK,
            id: 0,
            highlighted: false,
        };
        assert_eq!(rect.label(), "1");
    }

    #[test]
    fn policy_fill_alpha_clamps() {
        let policy = ColorPolicy {
            opacity: 150,
            ..ColorPolicy::default()
        };
        assert_eq!(policy.fill_alpha(), 1.0);
        assert_eq!(ColorPolicy::default().fill_alpha(), 0.5);
    }
}
