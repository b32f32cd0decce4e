pub mod deploy;
pub mod new;
pub mod status;
pub mod templates;
pub mod update;

use std::path::Path;

use anyhow::{Context, Result};

use graphics_core::{Environment, Settings};
use graphics_pipeline::{DriveClient, StoragePublisher, Workflow, WorkflowError};
use graphics_renderer::Renderer;

/// Settings plus the environment chosen on the command line.
#[derive(Debug)]
pub struct Workspace {
    pub settings: Settings,
    pub environment: Option<Environment>,
}

impl Workspace {
    pub fn load(root: &Path, environment: Option<Environment>) -> Result<Self> {
        let settings = Settings::load_at(root)
            .with_context(|| format!("failed to load settings from '{}'", root.display()))?;
        Ok(Self {
            settings,
            environment,
        })
    }

    pub fn renderer(&self) -> Renderer {
        Renderer::skipping([self.settings.assets_dir.clone()])
    }

    /// The credentials file is only located when a request is made.
    pub fn drive_client(&self) -> DriveClient {
        DriveClient::from_settings(&self.settings)
    }

    /// Run `f` against a [`Workflow`] wired to the default collaborators.
    ///
    /// `Ok(None)` means the workflow stopped on a usage error, whose hint has
    /// already been printed.
    pub fn run<T>(
        &self,
        f: impl FnOnce(&Workflow<'_>) -> Result<T, WorkflowError>,
    ) -> Result<Option<T>> {
        let fetcher = self.drive_client();
        let renderer = self.renderer();
        let publisher = StoragePublisher::new();
        let workflow = Workflow::new(
            &self.settings,
            self.environment,
            &fetcher,
            &renderer,
            &publisher,
        );
        usage_or(f(&workflow))
    }
}

/// Print usage hints and carry on; turn every other error into `anyhow`.
pub fn usage_or<T>(result: Result<T, WorkflowError>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(WorkflowError::Usage(hint)) => {
            println!("{hint}");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}
