//! # graphics-renderer
//!
//! Tera-based renderer that compiles a graphic project's `*_template.html`
//! files into deployable static HTML.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use graphics_core::Slug;
//! use graphics_renderer::{Render, Renderer};
//!
//! fn render_one(project_dir: &Path, slug: &Slug) {
//!     if let Ok(report) = Renderer::new().render(project_dir, slug) {
//!         for output in &report.outputs {
//!             println!("{}", output.path().display());
//!         }
//!     }
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::TemplateContext;
pub use engine::{output_path_for, Render, RenderOutput, RenderReport, Renderer, TEMPLATE_SUFFIX};
pub use error::RenderError;
