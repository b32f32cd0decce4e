//! The named workflows: deploy, content update, template update and friends.
//!
//! Every workflow checks, in order:
//! 1. an [`Environment`] was selected (`NoEnvironment` otherwise),
//! 2. its arguments are present (`Usage` otherwise),
//!
//! before it touches the filesystem or a collaborator. Steps then run in
//! sequence; a failing step aborts the workflow without undoing earlier ones,
//! and `meta.json` is only written once every prior step succeeded.

use std::path::{Path, PathBuf};

use graphics_core::{
    descriptor, Action, CoreError, Environment, MetadataStore, Settings, Slug, TemplateName,
};
use graphics_renderer::{Render, RenderReport};

use crate::copy::CopyFetcher;
use crate::error::{DownloadError, WorkflowError};
use crate::provision::TemplateProvisioner;
use crate::publish::{cache_control, PublishReport, PublishRequest, Publisher};

pub const DEPLOY_USAGE: &str = "You must specify a project slug, like this: graphics deploy <slug>";
pub const CONTENT_USAGE: &str =
    "You must specify a project slug, like this: graphics update-from-content <slug>";
pub const TEMPLATE_USAGE: &str = "You must specify a project slug and template, like this: \
     graphics update-from-template <slug> --template <template>";
pub const DEBUG_DEPLOY_USAGE: &str = "You must specify a project slug and template, like this: \
     graphics debug-deploy <slug> --template <template>";
pub const RENDER_USAGE: &str = "You must specify a project slug, like this: graphics render <slug>";
pub const COPY_USAGE: &str =
    "You must specify a valid project slug, like this: graphics update-copy <slug>";

/// What happened when a project's copy was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    Fetched { path: PathBuf },
    /// The project has no `graphic_config.yaml`.
    NoDescriptor,
    /// The descriptor names no `copy_document_key`.
    NoDocumentKey,
}

/// Download the copy spreadsheet of `slug`, or skip when its descriptor does
/// not name one.
pub fn fetch_project_copy(
    settings: &Settings,
    fetcher: &dyn CopyFetcher,
    slug: &Slug,
) -> Result<CopyOutcome, DownloadError> {
    let project_dir = settings.project_dir(slug);
    let Some(config) = descriptor::load_at(&project_dir)? else {
        tracing::info!("{slug}/{} does not exist, skipping copy", descriptor::DESCRIPTOR_FILE);
        return Ok(CopyOutcome::NoDescriptor);
    };
    let Some(key) = config.document_key() else {
        tracing::info!(
            "copy_document_key is not defined in {slug}/{}, skipping copy",
            descriptor::DESCRIPTOR_FILE
        );
        return Ok(CopyOutcome::NoDocumentKey);
    };
    let path = settings.copy_path(slug);
    fetcher.fetch(key, &path)?;
    Ok(CopyOutcome::Fetched { path })
}

/// Runs workflows against one workspace in one environment.
pub struct Workflow<'a> {
    settings: &'a Settings,
    environment: Option<Environment>,
    fetcher: &'a dyn CopyFetcher,
    renderer: &'a dyn Render,
    publisher: &'a dyn Publisher,
    provisioner: TemplateProvisioner,
    metadata: MetadataStore,
}

impl<'a> Workflow<'a> {
    pub fn new(
        settings: &'a Settings,
        environment: Option<Environment>,
        fetcher: &'a dyn CopyFetcher,
        renderer: &'a dyn Render,
        publisher: &'a dyn Publisher,
    ) -> Self {
        Self {
            settings,
            environment,
            fetcher,
            renderer,
            publisher,
            provisioner: TemplateProvisioner::from_settings(settings),
            metadata: MetadataStore::new(settings.graphics_root()),
        }
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    fn environment(&self) -> Result<Environment, WorkflowError> {
        self.environment.ok_or(WorkflowError::NoEnvironment)
    }

    fn project(&self, slug: &Slug) -> Result<PathBuf, WorkflowError> {
        let dir = self.settings.project_dir(slug);
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(WorkflowError::ProjectNotFound {
                slug: slug.to_string(),
                path: dir,
            })
        }
    }

    fn render_project(&self, dir: &Path, slug: &Slug) -> Result<RenderReport, WorkflowError> {
        let report = self.renderer.render(dir, slug)?;
        tracing::info!(
            "rendered {slug}: {} of {} outputs changed",
            report.written(),
            report.outputs.len()
        );
        Ok(report)
    }

    /// Publish the project to the selected environment's storage and record
    /// a `deploy`.
    pub fn deploy_to_production(&self, slug: &str) -> Result<PublishReport, WorkflowError> {
        let environment = self.environment()?;
        let slug = slug_arg(slug, DEPLOY_USAGE)?;
        let dir = self.project(&slug)?;

        let config = descriptor::load_at(&dir)?.unwrap_or_default();
        let max_age = config.max_age_or(self.settings.default_max_age);
        let request = PublishRequest {
            source: dir,
            destination: self.settings.storage(environment),
            key_prefix: slug.to_string(),
            cache_control: cache_control(max_age),
            exclude: vec![self.settings.assets_exclude()],
        };
        let report = self.publisher.publish(&request)?;
        tracing::info!("deployed {slug} to {} ({environment})", report.destination);

        self.metadata.record(&slug, &Action::Deploy)?;
        Ok(report)
    }

    /// Fetch the latest copy, re-render and record a `content` update.
    pub fn update_from_content(&self, slug: &str) -> Result<RenderReport, WorkflowError> {
        self.environment()?;
        let slug = slug_arg(slug, CONTENT_USAGE)?;
        let dir = self.project(&slug)?;

        fetch_project_copy(self.settings, self.fetcher, &slug)?;
        let report = self.render_project(&dir, &slug)?;
        self.metadata.record(&slug, &Action::Content)?;
        Ok(report)
    }

    /// Re-provision from `_base` and `template`, re-render and record a
    /// `template` update.
    pub fn update_from_template(
        &self,
        slug: &str,
        template: &str,
    ) -> Result<RenderReport, WorkflowError> {
        self.environment()?;
        let (slug, template) = slug_and_template(slug, template, TEMPLATE_USAGE)?;
        self.retemplate(&slug, &template)
    }

    /// Same steps as [`Workflow::update_from_template`], never fetching copy.
    pub fn debug_deploy(&self, slug: &str, template: &str) -> Result<RenderReport, WorkflowError> {
        self.environment()?;
        let (slug, template) = slug_and_template(slug, template, DEBUG_DEPLOY_USAGE)?;
        tracing::debug!("debug deploy of {slug} with '{template}'");
        self.retemplate(&slug, &template)
    }

    fn retemplate(
        &self,
        slug: &Slug,
        template: &TemplateName,
    ) -> Result<RenderReport, WorkflowError> {
        let dir = self.project(slug)?;
        tracing::info!("recopying templates for {slug}");
        self.provisioner.reprovision(&dir, template)?;
        let report = self.render_project(&dir, slug)?;
        self.metadata.record(slug, &Action::Template(template.clone()))?;
        Ok(report)
    }

    /// Fetch copy for one project, or for every project with a descriptor
    /// when `slug` is `None`. Returns the projects whose copy was written.
    pub fn update_copy(&self, slug: Option<&str>) -> Result<Vec<Slug>, WorkflowError> {
        self.environment()?;
        let slugs = match slug.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => {
                let slug = slug_arg(raw, COPY_USAGE)?;
                self.project(&slug)?;
                vec![slug]
            }
            None => self.projects_with_descriptor()?,
        };

        let mut fetched = Vec::new();
        for slug in slugs {
            tracing::info!("updating copy for {slug}");
            let outcome = fetch_project_copy(self.settings, self.fetcher, &slug)?;
            if let CopyOutcome::Fetched { .. } = outcome {
                fetched.push(slug);
            }
        }
        Ok(fetched)
    }

    /// Render only; `meta.json` is left alone.
    pub fn render(&self, slug: &str) -> Result<RenderReport, WorkflowError> {
        self.environment()?;
        let slug = slug_arg(slug, RENDER_USAGE)?;
        let dir = self.project(&slug)?;
        self.render_project(&dir, &slug)
    }

    fn projects_with_descriptor(&self) -> Result<Vec<Slug>, WorkflowError> {
        let mut slugs: Vec<Slug> = list_projects(&self.settings.graphics_root())?
            .into_iter()
            .filter(|slug| descriptor::descriptor_path(&self.settings.project_dir(slug)).is_file())
            .collect();
        slugs.sort();
        Ok(slugs)
    }
}

/// Project directories under `graphics_root`, unsorted. A missing root has no
/// projects.
pub fn list_projects(graphics_root: &Path) -> Result<Vec<Slug>, WorkflowError> {
    let entries = match std::fs::read_dir(graphics_root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(WorkflowError::Core(CoreError::Io {
                path: graphics_root.to_path_buf(),
                source,
            }))
        }
    };
    let mut slugs = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || !entry.path().is_dir() {
            continue;
        }
        if let Ok(slug) = Slug::new(name) {
            slugs.push(slug);
        }
    }
    Ok(slugs)
}

pub(crate) fn slug_arg(raw: &str, usage: &str) -> Result<Slug, WorkflowError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(WorkflowError::Usage(usage.to_string()));
    }
    Slug::new(raw).map_err(|e| WorkflowError::Usage(format!("{e}. {usage}")))
}

pub(crate) fn slug_and_template(
    slug: &str,
    template: &str,
    usage: &str,
) -> Result<(Slug, TemplateName), WorkflowError> {
    let slug = slug_arg(slug, usage)?;
    let template = template.trim();
    if template.is_empty() {
        return Err(WorkflowError::Usage(usage.to_string()));
    }
    Ok((slug, TemplateName::from(template)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_slug_is_usage() {
        let err = slug_arg("   ", CONTENT_USAGE).unwrap_err();
        assert!(err.is_usage());
        assert_eq!(err.to_string(), CONTENT_USAGE);
    }

    #[test]
    fn path_like_slug_is_usage() {
        let err = slug_arg("../etc", CONTENT_USAGE).unwrap_err();
        assert!(err.is_usage());
        assert!(err.to_string().ends_with(CONTENT_USAGE));
    }

    #[test]
    fn missing_template_is_usage() {
        let err = slug_and_template("jobs", "", TEMPLATE_USAGE).unwrap_err();
        assert!(err.is_usage());
        let (slug, template) = slug_and_template(" jobs ", "bar_chart", TEMPLATE_USAGE).unwrap();
        assert_eq!(slug.as_str(), "jobs");
        assert_eq!(template.as_str(), "bar_chart");
    }

    #[test]
    fn list_projects_skips_files_and_hidden_dirs() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("jobs")).unwrap();
        std::fs::create_dir_all(tmp.path().join(".cache")).unwrap();
        std::fs::write(tmp.path().join("README"), "x").unwrap();
        let names: Vec<String> = list_projects(tmp.path())
            .unwrap()
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, vec!["jobs"]);
        assert!(list_projects(&tmp.path().join("missing")).unwrap().is_empty());
    }
}
