//! Document-API credentials and the interactive wait for them.
//!
//! Credentials live in a JSON file (`access_token` + `scope` list) written by
//! an external OAuth helper. When they are missing or lack the Drive scope,
//! [`InteractiveGate`] starts the helper, points the operator at it, and polls
//! the file until valid credentials appear. The helper is terminated when the
//! gate returns; an operator Ctrl-C reaches it through the shared foreground
//! process group.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::sleep;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use graphics_core::Settings;

use crate::error::CredentialsError;

/// Scope required for copying and exporting spreadsheets.
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Delay between credential checks while waiting on the operator.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// On-disk credentials payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    #[serde(default)]
    pub scope: Vec<String>,
}

impl Credentials {
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scope.iter().any(|s| s == scope)
    }
}

/// Reads the credentials file.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, CredentialsError> {
        Ok(Self::new(settings.credentials_file()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load credentials; `Ok(None)` when the file does not exist.
    pub fn load(&self) -> Result<Option<Credentials>, CredentialsError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path).map_err(|e| CredentialsError::Invalid {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| CredentialsError::Invalid {
                path: self.path.clone(),
                reason: e.to_string(),
            })
    }

    /// Credentials carrying [`DRIVE_SCOPE`], or the reason there are none.
    pub fn valid(&self) -> Result<Credentials, CredentialsError> {
        match self.load()? {
            Some(creds) if creds.has_scope(DRIVE_SCOPE) && !creds.access_token.is_empty() => {
                Ok(creds)
            }
            Some(_) | None => Err(CredentialsError::MissingScope {
                scope: DRIVE_SCOPE.to_string(),
            }),
        }
    }
}

/// Makes sure usable credentials exist before remote work starts.
pub trait CredentialGate {
    fn ensure(&self) -> Result<(), CredentialsError>;
}

/// Kills the helper process when dropped.
struct HelperGuard {
    child: Child,
}

impl Drop for HelperGuard {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Blocks until the operator has authenticated.
#[derive(Debug, Clone)]
pub struct InteractiveGate {
    store: CredentialStore,
    helper: Vec<String>,
    helper_dir: PathBuf,
    auth_url: String,
    poll_interval: Duration,
}

impl InteractiveGate {
    pub fn new(store: CredentialStore, auth_url: impl Into<String>) -> Self {
        Self {
            store,
            helper: Vec::new(),
            helper_dir: PathBuf::from("."),
            auth_url: auth_url.into(),
            poll_interval: POLL_INTERVAL,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, CredentialsError> {
        Ok(Self::new(CredentialStore::from_settings(settings)?, settings.auth_url.clone())
            .with_helper(settings.auth_helper.clone(), settings.root.clone()))
    }

    /// Spawn `argv` in `dir` while waiting for credentials.
    pub fn with_helper(mut self, argv: Vec<String>, dir: PathBuf) -> Self {
        self.helper = argv;
        self.helper_dir = dir;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn spawn_helper(&self) -> Result<Option<HelperGuard>, CredentialsError> {
        let Some((program, args)) = self.helper.split_first() else {
            return Ok(None);
        };
        let resolved = which::which(program).map_err(|_| CredentialsError::HelperNotFound {
            program: program.clone(),
        })?;
        let child = Command::new(resolved)
            .args(args)
            .current_dir(&self.helper_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| CredentialsError::HelperSpawn {
                program: program.clone(),
                source,
            })?;
        tracing::debug!("spawned authentication helper '{program}' (pid {})", child.id());
        Ok(Some(HelperGuard { child }))
    }
}

impl CredentialGate for InteractiveGate {
    fn ensure(&self) -> Result<(), CredentialsError> {
        if self.store.valid().is_ok() {
            return Ok(());
        }

        tracing::warn!(
            "credentials were not found or permissions were not correct ({})",
            self.store.path().display()
        );
        let _helper = self.spawn_helper()?;
        tracing::warn!("visit {} to authenticate; waiting...", self.auth_url);

        loop {
            sleep(self.poll_interval);
            match self.store.valid() {
                Ok(_) => break,
                Err(e) => tracing::trace!("still waiting for credentials: {e}"),
            }
        }
        tracing::info!("successfully authenticated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::TempDir;

    fn write_creds(path: &Path, scope: &[&str]) {
        let creds = Credentials {
            access_token: "ya29.token".to_string(),
            scope: scope.iter().map(|s| s.to_string()).collect(),
        };
        std::fs::write(path, serde_json::to_string(&creds).unwrap()).unwrap();
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::new(dir.path().join("creds.json"));
        assert!(store.load().unwrap().is_none());
        assert!(matches!(
            store.valid(),
            Err(CredentialsError::MissingScope { .. })
        ));
    }

    #[test]
    fn wrong_scope_is_not_valid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("creds.json");
        write_creds(&path, &["https://www.googleapis.com/auth/userinfo.email"]);
        assert!(CredentialStore::new(&path).valid().is_err());
    }

    #[test]
    fn garbage_file_is_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("creds.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            CredentialStore::new(&path).load(),
            Err(CredentialsError::Invalid { .. })
        ));
    }

    #[test]
    fn gate_returns_immediately_with_valid_credentials() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("creds.json");
        write_creds(&path, &[DRIVE_SCOPE]);
        let gate = InteractiveGate::new(CredentialStore::new(&path), "http://localhost/oauth")
            .with_helper(vec!["definitely-not-installed-helper".to_string()], dir.path().into());
        gate.ensure().expect("no helper needed");
    }

    #[test]
    fn gate_polls_until_credentials_appear() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("creds.json");
        let gate = InteractiveGate::new(CredentialStore::new(&path), "http://localhost/oauth")
            .with_poll_interval(Duration::from_millis(10));

        let writer_path = path.clone();
        let writer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            write_creds(&writer_path, &[DRIVE_SCOPE]);
        });

        gate.ensure().expect("credentials eventually valid");
        writer.join().unwrap();
    }

    #[test]
    fn unknown_helper_is_reported() {
        let dir = TempDir::new().unwrap();
        let gate = InteractiveGate::new(
            CredentialStore::new(dir.path().join("creds.json")),
            "http://localhost/oauth",
        )
        .with_helper(
            vec!["definitely-not-installed-helper".to_string()],
            dir.path().into(),
        );
        assert!(matches!(
            gate.ensure(),
            Err(CredentialsError::HelperNotFound { .. })
        ));
    }
}
