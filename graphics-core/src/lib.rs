//! Graphics core library: domain types, settings, descriptors, metadata.
//!
//! Public API surface:
//! - [`types`]: slugs, template names, environments
//! - [`settings`]: `graphics.yaml` workspace configuration
//! - [`descriptor`]: per-project `graphic_config.yaml`
//! - [`metadata`]: per-project `meta.json` update record
//! - [`error`]: [`CoreError`]

pub mod atomic;
pub mod descriptor;
pub mod error;
pub mod metadata;
pub mod settings;
pub mod types;

pub use descriptor::GraphicConfig;
pub use error::CoreError;
pub use metadata::{Action, LoadedMetadata, MetadataFallback, MetadataRecord, MetadataStore};
pub use settings::{Settings, StorageTarget, TargetConfig};
pub use types::{Environment, Slug, SlugError, TemplateName};
