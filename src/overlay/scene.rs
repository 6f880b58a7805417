//! Scene construction: zone layout + highlight set + colors -> drawable rects.
//!
//! Inactive zones are emitted first and highlighted zones last so that, when
//! zones overlap, the highlighted ones are painted on top.

use std::collections::HashSet;

use super::types::{ColorPolicy, DrawableRect, Point, Zone, ZoneLayout};

/// Builds drawable scenes for one overlay window.
#[derive(Debug, Clone, Copy, Default)]
pub struct SceneBuilder {
    /// Origin of the window's client area in layout coordinates
    client_origin: Point,
}

impl SceneBuilder {
    pub fn new(client_origin: Point) -> Self {
        Self { client_origin }
    }

    pub fn client_origin(&self) -> Point {
        self.client_origin
    }

    /// Build the ordered scene for `layout`.
    ///
    /// Highlight ids that name no zone in the layout are ignored. Zones with
    /// zero area are skipped.
    pub fn build(
        &self,
        layout: &ZoneLayout,
        highlighted: &[usize],
        policy: &ColorPolicy,
    ) -> Vec<DrawableRect> {
        let highlighted: HashSet<usize> = highlighted.iter().copied().collect();
        let alpha = policy.fill_alpha();
        let inactive_fill = policy.inactive.with_alpha(alpha);
        let highlight_fill = policy.highlight.with_alpha(alpha);

        let drawable = |zone: &Zone, is_highlighted: bool| DrawableRect {
            rect: zone
                .rect
                .offset(-self.client_origin.x, -self.client_origin.y)
                .to_drawable(),
            border_color: policy.border,
            fill_color: if is_highlighted {
                highlight_fill
            } else {
                inactive_fill
            },
            id: zone.id,
            highlighted: is_highlighted,
        };

        let visible = || layout.zones().iter().filter(|z| !z.rect.is_empty());

        let mut scene = Vec::with_capacity(layout.len());
        scene.extend(
            visible()
                .filter(|z| !highlighted.contains(&z.id))
                .map(|z| drawable(z, false)),
        );
        scene.extend(
            visible()
                .filter(|z| highlighted.contains(&z.id))
                .map(|z| drawable(z, true)),
        );
        scene
    }
}
