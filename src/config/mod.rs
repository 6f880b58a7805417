//! Application configuration management.
//!
//! Thread-safe configuration shared by all overlays and the zone store.
//!
//! ## Architecture
//!
//! - `OverlayConfig`: zone colors, opacity, fade duration, numbering
//! - `StoreConfig`: document locations and autosave
//!
//! Both configs use `parking_lot::RwLock` for:
//! - Fast, non-poisoning locks
//! - Atomic batch updates from the settings UI

pub mod overlay;
pub mod store;

pub use overlay::{OverlayConfig, OVERLAY_CONFIG};
pub use store::{StoreConfig, STORE_CONFIG};
