//! Per-project configuration descriptor (`graphic_config.yaml`).
//!
//! Only two keys have meaning to the workflows; every other key is preserved
//! verbatim and handed to the renderer as template data.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::atomic::write_atomic;
use crate::error::{io_err, CoreError};

/// Descriptor file name inside a project directory.
pub const DESCRIPTOR_FILE: &str = "graphic_config.yaml";

/// Typed view of `graphic_config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphicConfig {
    /// Key of the spreadsheet document holding the project's copy.
    /// `None` or empty means copy fetching is skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_document_key: Option<String>,

    /// Cache-Control max-age override, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_max_age: Option<u32>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl GraphicConfig {
    /// The document key, treating an empty string as absent.
    pub fn document_key(&self) -> Option<&str> {
        self.copy_document_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Project max-age, else `fallback`.
    pub fn max_age_or(&self, fallback: u32) -> u32 {
        self.default_max_age.unwrap_or(fallback)
    }
}

/// `<project>/graphic_config.yaml`: pure, no I/O.
pub fn descriptor_path(project_dir: &Path) -> PathBuf {
    project_dir.join(DESCRIPTOR_FILE)
}

/// Load the descriptor for `project_dir`.
///
/// Returns `Ok(None)` if the project has no descriptor,
/// `CoreError::Parse` (with path) if it is malformed.
pub fn load_at(project_dir: &Path) -> Result<Option<GraphicConfig>, CoreError> {
    let path = descriptor_path(project_dir);
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    if contents.trim().is_empty() {
        return Ok(Some(GraphicConfig::default()));
    }
    serde_yaml::from_str(&contents)
        .map(Some)
        .map_err(|e| CoreError::Parse { path, source: e })
}

/// Atomically save the descriptor for `project_dir`.
///
/// Regenerates the file: comments and key order are not kept.
pub fn save_at(project_dir: &Path, config: &GraphicConfig) -> Result<(), CoreError> {
    let yaml = serde_yaml::to_string(config)?;
    write_atomic(&descriptor_path(project_dir), yaml)
}

/// Swap `old_key` for `new_key` in the descriptor text, leaving comments and
/// layout alone.
///
/// Falls back to [`save_at`] when the key cannot be found verbatim (an
/// escaped YAML scalar, say).
pub fn replace_document_key(
    project_dir: &Path,
    old_key: &str,
    new_key: &str,
) -> Result<(), CoreError> {
    let path = descriptor_path(project_dir);
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    if !old_key.is_empty() && contents.contains(old_key) {
        return write_atomic(&path, contents.replace(old_key, new_key));
    }
    tracing::warn!(
        "{} does not contain '{old_key}' verbatim; regenerating it",
        path.display()
    );
    let mut config: GraphicConfig = serde_yaml::from_str(&contents)
        .map_err(|e| CoreError::Parse {
            path: path.clone(),
            source: e,
        })?;
    config.copy_document_key = Some(new_key.to_string());
    save_at(project_dir, &config)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
