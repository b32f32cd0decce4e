//! Template context: serializable rendering payload built from a project.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use graphics_core::{GraphicConfig, Slug};

use crate::error::RenderError;

/// Data available to every project template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateContext {
    pub slug: String,
    /// The project descriptor as a JSON object (`{}` when the project has none).
    pub config: serde_json::Value,
    pub copy: CopyCtx,
    pub meta: MetaCtx,
}

/// Local copy spreadsheet status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyCtx {
    /// File name of the spreadsheet, relative to the project root.
    pub file: String,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaCtx {
    pub tool_version: String,
    pub rendered_at: DateTime<Utc>,
}

impl TemplateContext {
    /// Build a [`TemplateContext`] for the project at `project_dir`.
    pub fn from_project(
        project_dir: &Path,
        slug: &Slug,
        config: Option<&GraphicConfig>,
    ) -> Result<Self, RenderError> {
        let config = match config {
            Some(config) => serde_json::to_value(config)?,
            None => serde_json::Value::Object(Default::default()),
        };
        let copy_file = format!("{slug}.xlsx");
        let available = project_dir.join(&copy_file).is_file();

        Ok(TemplateContext {
            slug: slug.to_string(),
            config,
            copy: CopyCtx {
                file: copy_file,
                available,
            },
            meta: MetaCtx {
                tool_version: env!("CARGO_PKG_VERSION").to_string(),
                rendered_at: Utc::now(),
            },
        })
    }

    /// Convert to a [`tera::Context`] for rendering.
    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn slug() -> Slug {
        Slug::new("jobs").unwrap()
    }

    #[test]
    fn missing_descriptor_gives_empty_config_object() {
        let dir = TempDir::new().unwrap();
        let ctx = TemplateContext::from_project(dir.path(), &slug(), None).unwrap();
        assert_eq!(ctx.config, serde_json::json!({}));
        assert!(!ctx.copy.available);
        assert_eq!(ctx.copy.file, "jobs.xlsx");
    }

    #[test]
    fn copy_available_when_spreadsheet_present() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("jobs.xlsx"), b"PK").unwrap();
        let ctx = TemplateContext::from_project(dir.path(), &slug(), None).unwrap();
        assert!(ctx.copy.available);
    }

    #[test]
    fn descriptor_extras_are_flattened_into_config() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            graphics_core::descriptor::descriptor_path(dir.path()),
            "title: Unemployment by state\ndefault_max_age: 60\n",
        )
        .unwrap();
        let config = graphics_core::descriptor::load_at(dir.path()).unwrap();
        let ctx = TemplateContext::from_project(dir.path(), &slug(), config.as_ref()).unwrap();
        assert_eq!(ctx.config["title"], "Unemployment by state");
        assert_eq!(ctx.config["default_max_age"], 60);
        ctx.to_tera_context().expect("context conversion");
    }
}
