//! Central error types for SnapZones.
//!
//! Errors are grouped the way callers have to react to them:
//! - `GraphicsInit` and `WindowGeometry` disable one overlay instance
//! - `DeviceLost` is recovered inside the render loop and never reaches callers
//! - storage and JSON errors come out of the persistence boundary
//!
//! A store lookup miss is not an error: lookups return `Option` or an empty `Vec`.

use serde::Serialize;
use thiserror::Error;

/// Main error type for SnapZones operations.
#[derive(Error, Debug)]
pub enum OverlayError {
    /// No usable hardware or software adapter, or a device object failed to build
    #[error("Graphics initialization failed: {0}")]
    GraphicsInit(String),

    /// GPU device removed or reset (recoverable - resources are rebuilt)
    #[error("GPU device lost: {0}")]
    DeviceLost(String),

    /// Reading the overlay window's client rectangle failed
    #[error("Window geometry error: {0}")]
    WindowGeometry(String),

    /// Non-fatal drawing or presentation failure
    #[error("Graphics error: {0}")]
    Graphics(String),

    /// File read/write failed
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Device id string could not be parsed
    #[error("Invalid device id: {0}")]
    InvalidDeviceId(String),

    /// Render thread could not be spawned or panicked
    #[error("Render thread error: {0}")]
    RenderThread(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl OverlayError {
    /// True for errors after which the render loop should simply try again.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, OverlayError::DeviceLost(_) | OverlayError::Graphics(_))
    }
}

impl Serialize for OverlayError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(windows)]
impl From<windows::core::Error> for OverlayError {
    fn from(err: windows::core::Error) -> Self {
        OverlayError::Graphics(err.to_string())
    }
}

impl From<String> for OverlayError {
    fn from(msg: String) -> Self {
        OverlayError::Other(msg)
    }
}

impl From<&str> for OverlayError {
    fn from(msg: &str) -> Self {
        OverlayError::Other(msg.to_string())
    }
}

/// Extension trait for adding context to Results.
///
/// # Example
/// ```ignore
/// use crate::error::{OverlayResult, ResultExt};
///
/// fn read_settings(path: &Path) -> OverlayResult<String> {
///     std::fs::read_to_string(path).context("failed to read zone settings")
/// }
/// ```
pub trait ResultExt<T> {
    /// Add context to an error, converting it to OverlayError::Other.
    fn context(self, msg: &str) -> OverlayResult<T>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F: FnOnce() -> String>(self, f: F) -> OverlayResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn context(self, msg: &str) -> OverlayResult<T> {
        self.map_err(|e| OverlayError::Other(format!("{}: {}", msg, e)))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> OverlayResult<T> {
        self.map_err(|e| OverlayError::Other(format!("{}: {}", f(), e)))
    }
}

/// Type alias for Results using OverlayError.
pub type OverlayResult<T> = Result<T, OverlayError>;
