//! SnapZones: zone overlays and zone assignment storage for window snapping.
//!
//! - `overlay` draws the active zone layout of a monitor on a translucent,
//!   fading window, from a dedicated render thread per overlay.
//! - `store` remembers the active layout of every monitor/desktop, custom
//!   layouts, and where each application's windows were last zoned.
//! - `config` holds appearance and persistence settings.

pub mod config;
pub mod error;
pub mod overlay;
pub mod store;

pub use error::{OverlayError, OverlayResult};
pub use overlay::{OverlayWindow, ZoneOverlay};
pub use store::ZoneStore;

/// Initialize `env_logger` once. Later calls are ignored.
///
/// The level defaults to `info` and can be overridden with `RUST_LOG`.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
