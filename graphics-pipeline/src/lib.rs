//! # graphics-pipeline
//!
//! Workflows that turn a graphic project into a deployed page, and the
//! collaborators they run through.
//!
//! Use [`Workflow`] for `deploy` / `update-from-*` / `update-copy` / `render`
//! against an existing project, and [`Bootstrap::create_project`] to make a
//! new one. Collaborators are traits ([`CopyFetcher`], [`DocumentCopier`],
//! [`CredentialGate`], [`Publisher`], plus [`graphics_renderer::Render`]) so
//! callers can swap the defaults ([`DriveClient`], [`InteractiveGate`],
//! [`StoragePublisher`], [`graphics_renderer::Renderer`]).

pub mod bootstrap;
pub mod copy;
pub mod credentials;
pub mod error;
pub mod provision;
pub mod publish;
pub mod workflow;

pub use bootstrap::{Bootstrap, CreatedProject};
pub use copy::{CopyFetcher, DocumentCopier, DriveClient};
pub use credentials::{CredentialGate, CredentialStore, InteractiveGate};
pub use error::{
    CredentialsError, DocumentCopyError, DownloadError, ProvisionError, PublishError,
    WorkflowError,
};
pub use provision::TemplateProvisioner;
pub use publish::{PublishReport, PublishRequest, Publisher, StoragePublisher};
pub use workflow::{fetch_project_copy, list_projects, CopyOutcome, Workflow};
