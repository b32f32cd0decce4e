//! Tera rendering engine: [`Render`] seam and the default [`Renderer`].
//!
//! # Path mapping
//!
//! | Template                        | Output                 |
//! |---------------------------------|------------------------|
//! | `child_template.html`           | `child.html`           |
//! | `parent_template.html`          | `parent.html`          |
//! | `partials/footer_template.html` | `partials/footer.html` |
//!
//! Outputs are hash-gated: a file whose on-disk content already matches the
//! rendered text is left untouched and reported as [`RenderOutput::Unchanged`].

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tera::Tera;

use graphics_core::{atomic::write_atomic, descriptor, Slug};

use crate::context::TemplateContext;
use crate::error::{io_err, RenderError};

/// File-name suffix that marks a renderable template.
pub const TEMPLATE_SUFFIX: &str = "_template.html";

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Outcome of an individual output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutput {
    /// File was written (content changed or did not previously exist).
    Written { path: PathBuf },
    /// Rendered content matches what is already on disk.
    Unchanged { path: PathBuf },
}

impl RenderOutput {
    pub fn path(&self) -> &Path {
        match self {
            RenderOutput::Written { path } | RenderOutput::Unchanged { path } => path,
        }
    }
}

/// Everything a render pass produced for one project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderReport {
    pub outputs: Vec<RenderOutput>,
}

impl RenderReport {
    pub fn written(&self) -> usize {
        self.outputs
            .iter()
            .filter(|o| matches!(o, RenderOutput::Written { .. }))
            .count()
    }
}

/// Compiles a project's templates and data into static output.
pub trait Render {
    fn render(&self, project_dir: &Path, slug: &Slug) -> Result<RenderReport, RenderError>;
}

// ---------------------------------------------------------------------------
// Template discovery
// ---------------------------------------------------------------------------

/// `foo_template.html` → `foo.html`; `None` for files that are not templates.
pub fn output_path_for(template: &Path) -> Option<PathBuf> {
    let name = template.file_name()?.to_str()?;
    let stem = name.strip_suffix(TEMPLATE_SUFFIX)?;
    if stem.is_empty() {
        return None;
    }
    Some(template.with_file_name(format!("{stem}.html")))
}

fn normalize_template_name(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn collect_template_files(
    dir: &Path,
    skip_dirs: &[String],
    out: &mut Vec<PathBuf>,
) -> Result<(), RenderError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let meta = entry.metadata().map_err(|e| io_err(&path, e))?;
        if meta.is_dir() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if skip_dirs.contains(&name) || name.starts_with('.') {
                continue;
            }
            collect_template_files(&path, skip_dirs, out)?;
        } else if meta.is_file() && output_path_for(&path).is_some() {
            out.push(path);
        }
    }
    Ok(())
}

fn digest(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

/// Write `content` to `path` unless the file already holds exactly that.
fn write_if_changed(path: &Path, content: &str) -> Result<RenderOutput, RenderError> {
    if let Ok(existing) = std::fs::read(path) {
        if digest(&existing) == digest(content.as_bytes()) {
            tracing::debug!("unchanged: {}", path.display());
            return Ok(RenderOutput::Unchanged {
                path: path.to_path_buf(),
            });
        }
    }
    write_atomic(path, content)?;
    tracing::info!("wrote: {}", path.display());
    Ok(RenderOutput::Written {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Tera-based renderer for graphic projects.
///
/// Templates are discovered fresh on every call, so one instance can render
/// any number of projects.
#[derive(Debug, Clone)]
pub struct Renderer {
    skip_dirs: Vec<String>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    /// Renderer that ignores the conventional `assets/` subtree.
    pub fn new() -> Self {
        Self::skipping(["assets"])
    }

    /// Renderer that ignores the named top-level or nested directories.
    pub fn skipping<I, S>(dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            skip_dirs: dirs.into_iter().map(Into::into).collect(),
        }
    }

    /// Render every template of the project with a caller-built context.
    pub fn render_with_context(
        &self,
        project_dir: &Path,
        ctx: &TemplateContext,
    ) -> Result<RenderReport, RenderError> {
        let mut files = Vec::new();
        collect_template_files(project_dir, &self.skip_dirs, &mut files)?;
        files.sort();

        if files.is_empty() {
            tracing::warn!("no *{TEMPLATE_SUFFIX} files under {}", project_dir.display());
            return Ok(RenderReport::default());
        }

        let mut templates = Vec::with_capacity(files.len());
        for path in &files {
            let rel = path.strip_prefix(project_dir).unwrap_or(path.as_path());
            let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
            templates.push((normalize_template_name(rel), contents));
        }

        let mut tera = Tera::default();
        tera.add_raw_templates(templates.iter().map(|(n, c)| (n.as_str(), c.as_str())))?;
        let tera_ctx = ctx.to_tera_context()?;

        let mut report = RenderReport::default();
        for ((name, _), path) in templates.iter().zip(files.iter()) {
            let Some(output) = output_path_for(path) else {
                continue;
            };
            let rendered = tera.render(name, &tera_ctx)?;
            report.outputs.push(write_if_changed(&output, &rendered)?);
        }
        Ok(report)
    }
}

impl Render for Renderer {
    fn render(&self, project_dir: &Path, slug: &Slug) -> Result<RenderReport, RenderError> {
        let config = descriptor::load_at(project_dir)?;
        let ctx = TemplateContext::from_project(project_dir, slug, config.as_ref())?;
        tracing::info!("rendering {slug}");
        self.render_with_context(project_dir, &ctx)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
