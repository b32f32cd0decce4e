//! Creating a new graphic project.
//!
//! Creation runs in two phases. The local scaffold comes first. Then, outside
//! debug mode, the template's spreadsheet is copied remotely and fetched. A
//! failed remote copy removes the whole project directory again. A failed
//! fetch after a successful copy leaves both the project and the remote
//! document in place.

use std::fs;
use std::path::PathBuf;

use graphics_core::{descriptor, Settings, Slug, TemplateName};

use crate::copy::{copy_title, CopyFetcher, DocumentCopier};
use crate::credentials::CredentialGate;
use crate::error::{provision_io, WorkflowError};
use crate::provision::TemplateProvisioner;
use crate::workflow::{fetch_project_copy, slug_and_template, CopyOutcome};

pub const NEW_USAGE: &str = concat!(
    "You must specify a project slug and template, like this: ",
    "graphics new <slug> --template <template>",
);

/// Result of a successful [`Bootstrap::create_project`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedProject {
    pub slug: Slug,
    pub path: PathBuf,
    pub template: TemplateName,
    /// Key of the spreadsheet created for this project, if any.
    pub document_key: Option<String>,
    /// Local copy spreadsheet, when one was written.
    pub copy_path: Option<PathBuf>,
}

pub struct Bootstrap<'a> {
    settings: &'a Settings,
    gate: &'a dyn CredentialGate,
    copier: &'a dyn DocumentCopier,
    fetcher: &'a dyn CopyFetcher,
    provisioner: TemplateProvisioner,
}

impl<'a> Bootstrap<'a> {
    pub fn new(
        settings: &'a Settings,
        gate: &'a dyn CredentialGate,
        copier: &'a dyn DocumentCopier,
        fetcher: &'a dyn CopyFetcher,
    ) -> Self {
        Self {
            settings,
            gate,
            copier,
            fetcher,
            provisioner: TemplateProvisioner::from_settings(settings),
        }
    }

    pub fn create_project(
        &self,
        slug: &str,
        template: &str,
        debug: bool,
    ) -> Result<CreatedProject, WorkflowError> {
        let (slug, template) = slug_and_template(slug, template, NEW_USAGE)?;
        let path = self.settings.project_dir(&slug);
        if path.exists() {
            return Err(WorkflowError::ProjectExists { path });
        }
        self.provisioner.require(&TemplateName::from(TemplateName::BASE))?;
        self.provisioner.require(&template)?;

        let debug_source = self.settings.debug_copy_path();
        if debug && !debug_source.is_file() {
            return Err(WorkflowError::MissingDebugCopy { path: debug_source });
        }
        if !debug {
            self.gate.ensure()?;
        }

        tracing::info!("copying templates for {slug}");
        self.provisioner.scaffold(&path, &template)?;

        let mut created = CreatedProject {
            slug,
            path,
            template,
            document_key: None,
            copy_path: None,
        };

        if debug {
            let target = self.settings.copy_path(&created.slug);
            fs::copy(&debug_source, &target).map_err(|e| provision_io(&debug_source, e))?;
            tracing::info!(
                "debug copy {} -> {}",
                debug_source.display(),
                target.display()
            );
            created.copy_path = Some(target);
            return Ok(created);
        }

        self.create_spreadsheet(&mut created)?;
        Ok(created)
    }

    fn create_spreadsheet(&self, created: &mut CreatedProject) -> Result<(), WorkflowError> {
        let Some(config) = descriptor::load_at(&created.path)? else {
            tracing::info!("no {} found, not creating spreadsheet", descriptor::DESCRIPTOR_FILE);
            return Ok(());
        };
        let Some(source_key) = config.document_key().map(str::to_string) else {
            tracing::info!(
                "{} has no copy_document_key, not creating spreadsheet",
                descriptor::DESCRIPTOR_FILE
            );
            return Ok(());
        };

        tracing::info!("creating spreadsheet");
        let new_key = match self
            .copier
            .copy_document(&source_key, &copy_title(&created.slug))
        {
            Ok(key) => key,
            Err(e) => {
                if let Err(rm) = fs::remove_dir_all(&created.path) {
                    tracing::error!("failed to remove {}: {rm}", created.path.display());
                }
                return Err(e.into());
            }
        };
        tracing::info!("created spreadsheet {new_key}");

        descriptor::replace_document_key(&created.path, &source_key, &new_key)?;
        created.document_key = Some(new_key);

        if let CopyOutcome::Fetched { path } =
            fetch_project_copy(self.settings, self.fetcher, &created.slug)?
        {
            created.copy_path = Some(path);
        }
        Ok(())
    }
}
