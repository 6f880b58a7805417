//! Zone store persistence configuration.
//!
//! Where the store documents live and whether mutations are written back
//! immediately.

use std::path::PathBuf;

use lazy_static::lazy_static;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::store::StorePaths;

/// Directory name under the local data dir.
const APP_DIR_NAME: &str = "SnapZones";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    /// Directory holding every document.
    pub data_dir: PathBuf,

    /// Devices and custom layouts.
    pub settings_file: String,

    /// Per-application zone history.
    pub history_file: String,

    /// Hand-off file for the layout editor.
    pub editor_parameters_file: String,

    /// Write documents back after every mutation.
    pub autosave: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(APP_DIR_NAME);

        Self {
            data_dir,
            settings_file: "zones-settings.json".to_string(),
            history_file: "app-zone-history.json".to_string(),
            editor_parameters_file: "editor-parameters.json".to_string(),
            autosave: true,
        }
    }
}

impl StoreConfig {
    /// Full paths of every document.
    pub fn paths(&self) -> StorePaths {
        StorePaths {
            settings: self.data_dir.join(&self.settings_file),
            history: self.data_dir.join(&self.history_file),
            editor_parameters: self.data_dir.join(&self.editor_parameters_file),
        }
    }
}

lazy_static! {
    /// Global store configuration.
    pub static ref STORE_CONFIG: RwLock<StoreConfig> = RwLock::new(StoreConfig::default());
}

/// Paths derived from the current configuration.
pub fn get_store_paths() -> StorePaths {
    STORE_CONFIG.read().paths()
}

pub fn get_autosave() -> bool {
    STORE_CONFIG.read().autosave
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert!(config.autosave);
        assert!(config.data_dir.ends_with(APP_DIR_NAME));
    }

    #[test]
    fn test_paths_join_data_dir() {
        let config = StoreConfig {
            data_dir: PathBuf::from("zones"),
            ..Default::default()
        };
        let paths = config.paths();
        assert_eq!(paths.settings, PathBuf::from("zones").join("zones-settings.json"));
        assert_eq!(paths.history, PathBuf::from("zones").join("app-zone-history.json"));
        assert_eq!(
            paths.editor_parameters,
            PathBuf::from("zones").join("editor-parameters.json")
        );
    }
}
