//! Error types for graphics-pipeline.

use std::path::PathBuf;

use thiserror::Error;

use graphics_core::CoreError;
use graphics_renderer::RenderError;

/// Credential lookup or acquisition failure.
#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("credentials at {path} are unreadable: {reason}")]
    Invalid { path: PathBuf, reason: String },

    #[error("credentials are missing scope {scope}")]
    MissingScope { scope: String },

    #[error("authentication helper '{program}' not found on PATH")]
    HelperNotFound { program: String },

    #[error("failed to spawn authentication helper '{program}': {source}")]
    HelperSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure fetching a copy document into a project.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("no document key given")]
    MissingKey,

    #[error("cannot download without credentials: {0}")]
    Credentials(#[from] CredentialsError),

    #[error("download of document {key} returned HTTP {status}")]
    Status { key: String, status: u16 },

    #[error("download of document {key} failed: {message}")]
    Transport { key: String, message: String },

    #[error("I/O error reading document {key}: {source}")]
    Read {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Failure creating a remote copy of a spreadsheet document.
#[derive(Debug, Error)]
pub enum DocumentCopyError {
    #[error("cannot copy document without credentials: {0}")]
    Credentials(#[from] CredentialsError),

    #[error("Error creating spreadsheet (status code {status}) with message {reason}")]
    Status { status: u16, reason: String },

    #[error("document copy request failed: {0}")]
    Transport(String),

    #[error("document copy response had no usable id: {0}")]
    MalformedResponse(String),
}

/// Failure uploading a project tree.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("`{program}` failed (status {status}): {stderr}")]
    Command {
        program: String,
        status: String,
        stderr: String,
    },
}

/// Failure copying template trees into a project.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("template '{name}' not found at {path}")]
    UnknownTemplate { name: String, path: PathBuf },

    #[error("project directory {path} does not exist")]
    MissingProject { path: PathBuf },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Everything a workflow or bootstrap run can fail with.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A required argument was missing; the message is a usage hint.
    #[error("{0}")]
    Usage(String),

    /// Workflows need an environment before they touch anything.
    #[error("no environment selected; pass --env production or --env staging")]
    NoEnvironment,

    #[error("project '{slug}' does not exist at {path}")]
    ProjectNotFound { slug: String, path: PathBuf },

    #[error("Error: Directory already exists: {path}")]
    ProjectExists { path: PathBuf },

    /// `--debug` needs the local stand-in spreadsheet.
    #[error("debug copy spreadsheet not found at {path}")]
    MissingDebugCopy { path: PathBuf },

    #[error("provision error: {0}")]
    Provision(#[from] ProvisionError),

    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    #[error("Failed to copy spreadsheet! Try again! ({0})")]
    DocumentCopy(#[from] DocumentCopyError),

    #[error("publish error: {0}")]
    Publish(#[from] PublishError),

    #[error("credentials error: {0}")]
    Credentials(#[from] CredentialsError),

    #[error("render error: {0}")]
    Render(#[from] RenderError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl WorkflowError {
    pub fn is_usage(&self) -> bool {
        matches!(self, WorkflowError::Usage(_))
    }
}

pub(crate) fn provision_io(path: impl Into<PathBuf>, source: std::io::Error) -> ProvisionError {
    ProvisionError::Io {
        path: path.into(),
        source,
    }
}

pub(crate) fn publish_io(path: impl Into<PathBuf>, source: std::io::Error) -> PublishError {
    PublishError::Io {
        path: path.into(),
        source,
    }
}
