//! Overlay appearance configuration.
//!
//! Colors, fill opacity, fade duration and zone numbering shared by every
//! overlay window. `color_policy()` turns the stored settings into the
//! `ColorPolicy` the scene builder consumes.

use lazy_static::lazy_static;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::overlay::types::{Color, ColorPolicy};

/// Appearance settings for zone overlays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverlayConfig {
    /// Fill of inactive zones, `#RRGGBB`.
    pub zone_color: String,

    /// Border of every zone, `#RRGGBB`.
    pub zone_border_color: String,

    /// Fill of highlighted zones, `#RRGGBB`.
    pub zone_highlight_color: String,

    /// Fill opacity in percent (0-100).
    pub highlight_opacity: u8,

    /// Fade-in duration when the overlay is shown. 0 = no fade.
    pub show_animation_ms: u32,

    /// Draw the zone number in each zone.
    pub show_zone_numbers: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            zone_color: "#F5FCFF".to_string(),
            zone_border_color: "#FFFFFF".to_string(),
            zone_highlight_color: "#008CFF".to_string(),
            highlight_opacity: 50,
            show_animation_ms: 200,
            show_zone_numbers: true,
        }
    }
}

impl OverlayConfig {
    /// Validate and clamp settings to acceptable ranges.
    ///
    /// Colors that do not parse are reset to their defaults.
    pub fn validate(&mut self) {
        let defaults = Self::default();
        self.highlight_opacity = self.highlight_opacity.min(100);
        self.show_animation_ms = self.show_animation_ms.min(MAX_ANIMATION_MS);

        for (value, fallback) in [
            (&mut self.zone_color, defaults.zone_color),
            (&mut self.zone_border_color, defaults.zone_border_color),
            (&mut self.zone_highlight_color, defaults.zone_highlight_color),
        ] {
            if Color::from_hex(value).is_none() {
                log::warn!("[CONFIG] Invalid color {:?}, using {}", value, fallback);
                *value = fallback;
            }
        }
    }

    /// Build the color policy for drawing.
    pub fn color_policy(&self) -> ColorPolicy {
        let defaults = ColorPolicy::default();
        ColorPolicy {
            border: Color::from_hex(&self.zone_border_color).unwrap_or(defaults.border),
            inactive: Color::from_hex(&self.zone_color).unwrap_or(defaults.inactive),
            highlight: Color::from_hex(&self.zone_highlight_color).unwrap_or(defaults.highlight),
            opacity: self.highlight_opacity.min(100),
            show_labels: self.show_zone_numbers,
        }
    }
}

const MAX_ANIMATION_MS: u32 = 2_000;

lazy_static! {
    /// Global overlay configuration.
    ///
    /// Thread-safe access via `parking_lot::RwLock` (non-poisoning, fast).
    pub static ref OVERLAY_CONFIG: RwLock<OverlayConfig> = RwLock::new(OverlayConfig::default());
}

// ============================================================================
// Convenience Getters
// ============================================================================

/// Color policy built from the current settings.
pub fn current_color_policy() -> ColorPolicy {
    OVERLAY_CONFIG.read().color_policy()
}

/// Current fade-in duration.
pub fn get_show_animation_ms() -> u32 {
    OVERLAY_CONFIG.read().show_animation_ms
}

/// Replace the overlay settings (batch update), validating them first.
pub fn set_overlay_config(mut config: OverlayConfig) {
    config.validate();
    log::debug!("[CONFIG] Overlay config updated: {:?}", config);
    *OVERLAY_CONFIG.write() = config;
}
