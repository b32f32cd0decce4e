//! Workspace settings loaded from `<root>/graphics.yaml`.
//!
//! # Layout
//!
//! ```text
//! <root>/
//!   graphics.yaml           (optional, defaults apply when absent)
//!   graphic_templates/
//!     _base/                (copied into every project first)
//!     <template>/           (copied on top of _base)
//!   graphics/
//!     <slug>/               (one directory per project)
//! ```
//!
//! # API pattern
//!
//! Relative paths in the file are resolved against the directory the settings
//! were loaded from, so `load_at(root)` is the only entry point tests need.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, CoreError};
use crate::types::{Environment, Slug, TemplateName};

/// File name of the settings document inside the workspace root.
pub const SETTINGS_FILE: &str = "graphics.yaml";

/// Cache max-age (seconds) used when a project does not override it.
pub const DEFAULT_MAX_AGE: u32 = 20;

/// Credentials file name under the home directory when none is configured.
pub const DEFAULT_CREDENTIALS_FILE: &str = ".google_oauth_credentials";

// ---------------------------------------------------------------------------
// Targets
// ---------------------------------------------------------------------------

/// Where a deploy sends a project's files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageTarget {
    /// An S3 bucket, uploaded through the `aws` CLI.
    S3 {
        bucket: String,
        #[serde(default)]
        prefix: String,
    },
    /// A local directory mirror.
    Directory { path: PathBuf },
}

impl StorageTarget {
    /// Human-readable destination for a project uploaded under `key_prefix`.
    pub fn describe(&self, key_prefix: &str) -> String {
        match self {
            StorageTarget::S3 { bucket, prefix } => {
                format!("s3://{}", join_key(&[bucket, prefix, key_prefix]))
            }
            StorageTarget::Directory { path } => {
                path.join(key_prefix).display().to_string()
            }
        }
    }
}

/// Joins non-empty key segments with `/`, trimming stray slashes.
pub fn join_key(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim_matches('/'))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Server/bucket pair selected by an [`Environment`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    pub storage: StorageTarget,
}

/// One target per environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Targets {
    pub production: TargetConfig,
    pub staging: TargetConfig,
}

impl Default for Targets {
    fn default() -> Self {
        Self {
            production: TargetConfig {
                server: None,
                storage: StorageTarget::S3 {
                    bucket: "apps.example.org".to_string(),
                    prefix: "graphics".to_string(),
                },
            },
            staging: TargetConfig {
                server: None,
                storage: StorageTarget::S3 {
                    bucket: "stage-apps.example.org".to_string(),
                    prefix: "graphics".to_string(),
                },
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Workspace configuration. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory the settings were loaded from; relative paths resolve here.
    #[serde(skip)]
    pub root: PathBuf,
    pub graphics_path: PathBuf,
    pub templates_path: PathBuf,
    /// Project subdirectory excluded from deploy uploads.
    pub assets_dir: String,
    pub default_max_age: u32,
    /// Placeholder spreadsheet seeded into projects created with `--debug`.
    pub debug_copy: PathBuf,
    pub credentials_path: Option<PathBuf>,
    /// argv of the helper process that walks the operator through OAuth.
    pub auth_helper: Vec<String>,
    pub auth_url: String,
    pub targets: Targets,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            graphics_path: PathBuf::from("graphics"),
            templates_path: PathBuf::from("graphic_templates"),
            assets_dir: "assets".to_string(),
            default_max_age: DEFAULT_MAX_AGE,
            debug_copy: PathBuf::from("debug.xlsx"),
            credentials_path: None,
            auth_helper: Vec::new(),
            auth_url: "http://127.0.0.1:8888/oauth".to_string(),
            targets: Targets::default(),
        }
    }
}

impl Settings {
    /// Load `<root>/graphics.yaml`, falling back to defaults when it is absent.
    ///
    /// Returns `CoreError::Parse` (with path + line context) if malformed YAML.
    pub fn load_at(root: &Path) -> Result<Self, CoreError> {
        let path = root.join(SETTINGS_FILE);
        let mut settings = if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
            serde_yaml::from_str::<Settings>(&contents)
                .map_err(|e| CoreError::Parse { path, source: e })?
        } else {
            tracing::debug!("no {SETTINGS_FILE} under {}, using defaults", root.display());
            Settings::default()
        };
        settings.root = root.to_path_buf();
        Ok(settings)
    }

    /// Resolve a configured path against [`Settings::root`].
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// `<root>/<graphics_path>`
    pub fn graphics_root(&self) -> PathBuf {
        self.resolve(&self.graphics_path)
    }

    /// `<root>/<templates_path>`
    pub fn templates_root(&self) -> PathBuf {
        self.resolve(&self.templates_path)
    }

    /// `<root>/<templates_path>/<template>`: pure, no I/O.
    pub fn template_dir(&self, template: &TemplateName) -> PathBuf {
        self.templates_root().join(template.as_str())
    }

    /// `<root>/<graphics_path>/<slug>`: pure, no I/O.
    pub fn project_dir(&self, slug: &Slug) -> PathBuf {
        self.graphics_root().join(slug.as_str())
    }

    /// `<project>/<slug>.xlsx`: local copy spreadsheet.
    pub fn copy_path(&self, slug: &Slug) -> PathBuf {
        self.project_dir(slug).join(format!("{slug}.xlsx"))
    }

    pub fn debug_copy_path(&self) -> PathBuf {
        self.resolve(&self.debug_copy)
    }

    /// Configured credentials file, else `~/.google_oauth_credentials`.
    pub fn credentials_file(&self) -> Result<PathBuf, CoreError> {
        match &self.credentials_path {
            Some(path) => Ok(self.resolve(path)),
            None => dirs::home_dir()
                .map(|home| home.join(DEFAULT_CREDENTIALS_FILE))
                .ok_or(CoreError::HomeNotFound),
        }
    }

    pub fn target(&self, environment: Environment) -> &TargetConfig {
        match environment {
            Environment::Production => &self.targets.production,
            Environment::Staging => &self.targets.staging,
        }
    }

    /// Storage of `environment`, with a directory target resolved against
    /// [`Settings::root`].
    pub fn storage(&self, environment: Environment) -> StorageTarget {
        match &self.target(environment).storage {
            StorageTarget::Directory { path } => StorageTarget::Directory {
                path: self.resolve(path),
            },
            other => other.clone(),
        }
    }

    /// Exclude pattern for the assets subtree, relative to a project root.
    pub fn assets_exclude(&self) -> String {
        format!("{}/*", self.assets_dir.trim_matches('/'))
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
