//! Per-project update record (`meta.json`).
//!
//! ```text
//! {
//!   "production": { "date": <unix seconds | ""> },
//!   "staging": {
//!     "content":  { "date": <unix seconds | ""> },
//!     "template": { "date": <unix seconds | "">, "type": <template | ""> }
//!   }
//! }
//! ```
//!
//! A missing or corrupt file reads as the all-empty skeleton. Each leaf is
//! parsed independently, so one wrong-typed field never wipes its siblings.
//! Keys outside this shape are carried through every rewrite untouched.
//! Writes replace the whole file through a `.tmp` + rename.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Utc;
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::atomic::write_atomic;
use crate::error::CoreError;
use crate::types::{Slug, TemplateName};

/// Metadata file name inside a project directory.
pub const META_FILE: &str = "meta.json";

// ---------------------------------------------------------------------------
// Record shape
// ---------------------------------------------------------------------------

/// A Unix timestamp that serializes as `""` when unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stamp(pub Option<i64>);

impl Stamp {
    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }
}

impl Serialize for Stamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Some(ts) => serializer.serialize_i64(ts),
            None => serializer.serialize_str(""),
        }
    }
}

impl<'de> Deserialize<'de> for Stamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let ts = match value {
            serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        Ok(Stamp(ts))
    }
}

/// Deserialize `T`, substituting `T::default()` for anything that does not fit.
fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// Accept only JSON strings; anything else becomes `""`.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        _ => Ok(String::new()),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatedEntry {
    #[serde(default, deserialize_with = "or_default")]
    pub date: Stamp,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateEntry {
    #[serde(default, deserialize_with = "or_default")]
    pub date: Stamp,
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub template_type: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingEntry {
    #[serde(default, deserialize_with = "or_default")]
    pub content: DatedEntry,
    #[serde(default, deserialize_with = "or_default")]
    pub template: TemplateEntry,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Last-updated timestamps for the three update channels of a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    #[serde(default, deserialize_with = "or_default")]
    pub production: DatedEntry,
    #[serde(default, deserialize_with = "or_default")]
    pub staging: StagingEntry,
    /// Keys this tool does not own.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// The single mutation a workflow applies to the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Staging copy was refreshed.
    Content,
    /// Staging templates were re-provisioned from the named template.
    Template(TemplateName),
    /// Project was published to production.
    Deploy,
}

impl Action {
    /// Build an action from its wire name; unknown names yield `None`.
    pub fn from_name(name: &str, template: &str) -> Option<Action> {
        match name {
            "content" => Some(Action::Content),
            "template" => Some(Action::Template(TemplateName::from(template))),
            "deploy" => Some(Action::Deploy),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::Content => "content",
            Action::Template(_) => "template",
            Action::Deploy => "deploy",
        }
    }

    /// Apply this action to `record` at Unix time `now`.
    pub fn apply(&self, record: &mut MetadataRecord, now: i64) {
        match self {
            Action::Content => record.staging.content.date = Stamp(Some(now)),
            Action::Template(name) => {
                record.staging.template.date = Stamp(Some(now));
                record.staging.template.template_type = name.0.clone();
            }
            Action::Deploy => record.production.date = Stamp(Some(now)),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Action {
    type Err = String;

    /// Parses the template-less forms; `template` yields an empty name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::from_name(s, "").ok_or_else(|| format!("unknown metadata action '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// parse_or_default
// ---------------------------------------------------------------------------

/// Why a read fell back to the default skeleton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataFallback {
    /// No `meta.json` (or it could not be read).
    Missing,
    /// The file exists but is not a JSON object.
    Corrupt { reason: String },
}

/// Result of interpreting a `meta.json` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedMetadata {
    pub record: MetadataRecord,
    /// `Some` when `record` is the skeleton rather than file contents.
    pub fallback: Option<MetadataFallback>,
}

/// Interpret raw file contents. `None` means the file could not be read.
///
/// Never fails: anything that is not a JSON object becomes the skeleton,
/// and the reason is reported in [`LoadedMetadata::fallback`].
pub fn parse_or_default(raw: Option<&str>) -> LoadedMetadata {
    let Some(raw) = raw else {
        return LoadedMetadata {
            record: MetadataRecord::default(),
            fallback: Some(MetadataFallback::Missing),
        };
    };
    let parsed = serde_json::from_str::<serde_json::Value>(raw)
        .map_err(|e| e.to_string())
        .and_then(|value| {
            if value.is_object() {
                MetadataRecord::deserialize(value).map_err(|e| e.to_string())
            } else {
                Err("top-level value is not an object".to_string())
            }
        });
    match parsed {
        Ok(record) => LoadedMetadata {
            record,
            fallback: None,
        },
        Err(reason) => LoadedMetadata {
            record: MetadataRecord::default(),
            fallback: Some(MetadataFallback::Corrupt { reason }),
        },
    }
}

// ---------------------------------------------------------------------------
// MetadataStore
// ---------------------------------------------------------------------------

/// Reads and writes `<graphics_root>/<slug>/meta.json`.
///
/// No locking: each invocation is a short-lived single writer.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    graphics_root: PathBuf,
}

impl MetadataStore {
    pub fn new(graphics_root: impl Into<PathBuf>) -> Self {
        Self {
            graphics_root: graphics_root.into(),
        }
    }

    /// `<graphics_root>/<slug>/meta.json`: pure, no I/O.
    pub fn path(&self, slug: &Slug) -> PathBuf {
        meta_path(&self.graphics_root.join(slug.as_str()))
    }

    /// Load the record with its fallback reason, if any.
    pub fn load(&self, slug: &Slug) -> LoadedMetadata {
        let path = self.path(slug);
        let raw = std::fs::read_to_string(&path).ok();
        let loaded = parse_or_default(raw.as_deref());
        if let Some(MetadataFallback::Corrupt { reason }) = &loaded.fallback {
            tracing::warn!(
                "{} is corrupt ({reason}); treating as never updated",
                path.display()
            );
        }
        loaded
    }

    /// Load the record; a missing or corrupt file yields the skeleton.
    pub fn read(&self, slug: &Slug) -> MetadataRecord {
        self.load(slug).record
    }

    /// Apply the action named `action` and persist the full record.
    ///
    /// Unrecognized actions leave the record unchanged but still rewrite it.
    pub fn write(
        &self,
        slug: &Slug,
        action: &str,
        template_name: &str,
    ) -> Result<MetadataRecord, CoreError> {
        match Action::from_name(action, template_name) {
            Some(action) => self.record(slug, &action),
            None => {
                tracing::debug!("ignoring unknown metadata action '{action}' for {slug}");
                let record = self.read(slug);
                self.persist(slug, &record)?;
                Ok(record)
            }
        }
    }

    /// Apply `action` at the current time and persist the full record.
    pub fn record(&self, slug: &Slug, action: &Action) -> Result<MetadataRecord, CoreError> {
        self.record_at(slug, action, Utc::now().timestamp())
    }

    /// Apply `action` at Unix time `now` and persist the full record.
    pub fn record_at(
        &self,
        slug: &Slug,
        action: &Action,
        now: i64,
    ) -> Result<MetadataRecord, CoreError> {
        let mut record = self.read(slug);
        action.apply(&mut record, now);
        self.persist(slug, &record)?;
        tracing::debug!("recorded '{action}' for {slug}");
        Ok(record)
    }

    fn persist(&self, slug: &Slug, record: &MetadataRecord) -> Result<(), CoreError> {
        let json = serde_json::to_string_pretty(record)?;
        write_atomic(&self.path(slug), json)
    }
}

/// `<project>/meta.json`: pure, no I/O.
pub fn meta_path(project_dir: &Path) -> PathBuf {
    project_dir.join(META_FILE)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
