//! Whole-file document I/O.
//!
//! Writes go to a sibling temp file that is then renamed over the target, so a
//! reader never sees a half-written document.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{OverlayResult, ResultExt};

/// Locations of the store documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub settings: PathBuf,
    pub history: PathBuf,
    pub editor_parameters: PathBuf,
}

impl StorePaths {
    /// Every document inside `dir` with its default name.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            settings: dir.join("zones-settings.json"),
            history: dir.join("app-zone-history.json"),
            editor_parameters: dir.join("editor-parameters.json"),
        }
    }
}

/// Read a document. A missing file is `None`; unparsable JSON is an error.
pub fn read_document(path: &Path) -> OverlayResult<Option<Value>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_str(&text)?))
}

/// Replace the document at `path`, creating its directory if needed.
pub fn write_document(path: &Path, doc: &Value) -> OverlayResult<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }

    let text = serde_json::to_string_pretty(doc)?;
    let tmp = temp_path(path);
    fs::write(&tmp, text)?;
    fs::rename(&tmp, path).with_context(|| format!("replace {}", path.display()))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("snapzones-persist-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = scratch_dir();
        assert!(read_document(&dir.join("nope.json")).unwrap().is_none());
    }

    #[test]
    fn written_document_reads_back() {
        let dir = scratch_dir();
        let path = dir.join("nested").join("doc.json");
        let doc = json!({"devices": [], "n": 3});

        write_document(&path, &doc).unwrap();

        assert_eq!(read_document(&path).unwrap(), Some(doc));
        assert!(!temp_path(&path).exists());
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = scratch_dir();
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("doc.json");
        fs::write(&path, "{ truncated").unwrap();

        assert!(read_document(&path).is_err());
        let _ = fs::remove_dir_all(dir);
    }
}
