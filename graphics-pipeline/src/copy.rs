//! Copy documents: fetching a project's spreadsheet and cloning a new one.
//!
//! Both operations go through the document-hosting HTTP API with a bearer
//! token from [`CredentialStore`]. The API's semantics are not modelled here;
//! only the request shape and the success condition matter.

use std::io::Read;
use std::path::Path;

use serde_json::json;

use graphics_core::{atomic::write_atomic, CoreError, Settings, Slug};

use crate::credentials::CredentialStore;
use crate::error::{CredentialsError, DocumentCopyError, DownloadError};

/// `POST` endpoint that copies the spreadsheet `{key}`.
pub const SPREADSHEET_COPY_URL: &str = "https://www.googleapis.com/drive/v2/files/{key}/copy";

/// `GET` endpoint that exports the spreadsheet `{key}` as xlsx.
pub const SPREADSHEET_EXPORT_URL: &str =
    "https://docs.google.com/spreadsheets/d/{key}/export?format=xlsx";

/// Browser URL for a spreadsheet.
pub const SPREADSHEET_VIEW_URL: &str = "https://docs.google.com/spreadsheet/ccc?key={key}#gid=1";

/// Downloads a named document into a local spreadsheet file.
pub trait CopyFetcher {
    fn fetch(&self, document_key: &str, destination: &Path) -> Result<(), DownloadError>;
}

/// Creates a remote copy of a spreadsheet and returns the new document key.
pub trait DocumentCopier {
    fn copy_document(&self, source_key: &str, title: &str) -> Result<String, DocumentCopyError>;
}

/// Title given to the spreadsheet copied for a new project.
pub fn copy_title(slug: &Slug) -> String {
    format!("{slug} GRAPHIC COPY")
}

pub fn view_url(key: &str) -> String {
    SPREADSHEET_VIEW_URL.replace("{key}", key)
}

// ---------------------------------------------------------------------------
// DriveClient
// ---------------------------------------------------------------------------

/// HTTP client for the spreadsheet export and copy endpoints.
#[derive(Debug, Clone)]
pub struct DriveClient {
    /// `None` when the credentials file could not be located; reported on
    /// the first request rather than at construction.
    credentials: Option<CredentialStore>,
    agent: ureq::Agent,
    copy_url: String,
    export_url: String,
}

impl DriveClient {
    pub fn new(credentials: CredentialStore) -> Self {
        Self::with_store(Some(credentials))
    }

    /// Client for the configured credentials file. Commands that never reach
    /// the network work even when that file cannot be located.
    pub fn from_settings(settings: &Settings) -> Self {
        let store = CredentialStore::from_settings(settings)
            .map_err(|e| tracing::debug!("credentials file unavailable: {e}"))
            .ok();
        Self::with_store(store)
    }

    fn with_store(credentials: Option<CredentialStore>) -> Self {
        Self {
            credentials,
            agent: ureq::AgentBuilder::new().build(),
            copy_url: SPREADSHEET_COPY_URL.to_string(),
            export_url: SPREADSHEET_EXPORT_URL.to_string(),
        }
    }

    /// Override the endpoint templates; each must contain `{key}`.
    pub fn with_endpoints(
        mut self,
        copy_url: impl Into<String>,
        export_url: impl Into<String>,
    ) -> Self {
        self.copy_url = copy_url.into();
        self.export_url = export_url.into();
        self
    }

    fn bearer(&self) -> Result<String, CredentialsError> {
        let store = self
            .credentials
            .as_ref()
            .ok_or(CredentialsError::Core(CoreError::HomeNotFound))?;
        let creds = store.valid()?;
        Ok(format!("Bearer {}", creds.access_token))
    }
}

impl CopyFetcher for DriveClient {
    fn fetch(&self, document_key: &str, destination: &Path) -> Result<(), DownloadError> {
        let key = document_key.trim();
        if key.is_empty() {
            return Err(DownloadError::MissingKey);
        }
        let auth = self.bearer()?;
        let url = self.export_url.replace("{key}", key);
        tracing::debug!("GET {url}");

        let response = match self.agent.get(&url).set("Authorization", &auth).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => {
                return Err(DownloadError::Status {
                    key: key.to_string(),
                    status,
                })
            }
            Err(ureq::Error::Transport(t)) => {
                return Err(DownloadError::Transport {
                    key: key.to_string(),
                    message: t.to_string(),
                })
            }
        };

        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|source| DownloadError::Read {
                key: key.to_string(),
                source,
            })?;
        write_atomic(destination, bytes)?;
        tracing::info!("downloaded document {key} to {}", destination.display());
        Ok(())
    }
}

impl DocumentCopier for DriveClient {
    fn copy_document(&self, source_key: &str, title: &str) -> Result<String, DocumentCopyError> {
        let auth = self.bearer()?;
        let url = self.copy_url.replace("{key}", source_key.trim());
        tracing::debug!("POST {url}");

        let response = match self
            .agent
            .post(&url)
            .set("Authorization", &auth)
            .send_json(json!({ "title": title }))
        {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                return Err(DocumentCopyError::Status {
                    status,
                    reason: response.status_text().to_string(),
                })
            }
            Err(ureq::Error::Transport(t)) => {
                return Err(DocumentCopyError::Transport(t.to_string()))
            }
        };

        if response.status() != 200 {
            return Err(DocumentCopyError::Status {
                status: response.status(),
                reason: response.status_text().to_string(),
            });
        }

        let body: serde_json::Value = response
            .into_json()
            .map_err(|e| DocumentCopyError::MalformedResponse(e.to_string()))?;
        body.get("id")
            .and_then(serde_json::Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or_else(|| DocumentCopyError::MalformedResponse(body.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{Credentials, DRIVE_SCOPE};
    use std::io::Write;
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};
    use tempfile::TempDir;

    /// Serve one canned HTTP response; the handle yields the raw request.
    fn serve_once(
        status_line: &'static str,
        body: &'static [u8],
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream.read(&mut buf).unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let length = text[..head_end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= head_end + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            write!(
                stream,
                "HTTP/1.1 {status_line}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            )
            .unwrap();
            stream.write_all(body).unwrap();
            String::from_utf8_lossy(&request).to_string()
        });
        (base, handle)
    }

    fn client(dir: &TempDir, base: &str) -> DriveClient {
        let path = dir.path().join("creds.json");
        let creds = Credentials {
            access_token: "tok-123".to_string(),
            scope: vec![DRIVE_SCOPE.to_string()],
        };
        std::fs::write(&path, serde_json::to_string(&creds).unwrap()).unwrap();
        DriveClient::new(CredentialStore::new(path))
            .with_endpoints(
                format!("{base}/copy/{{key}}"),
                format!("{base}/export/{{key}}"),
            )
    }

    #[test]
    fn copy_title_format() {
        assert_eq!(
            copy_title(&Slug::new("jobs").unwrap()),
            "jobs GRAPHIC COPY"
        );
    }

    #[test]
    fn copy_posts_title_and_returns_new_id() {
        let dir = TempDir::new().unwrap();
        let (base, server) = serve_once("200 OK", br#"{"id":"new-key-456"}"#);
        let key = client(&dir, &base)
            .copy_document("src-key", "jobs GRAPHIC COPY")
            .expect("copy");
        assert_eq!(key, "new-key-456");

        let request = server.join().unwrap();
        assert!(request.starts_with("POST /copy/src-key"));
        assert!(request.contains("Bearer tok-123"));
        assert!(request.contains(r#""title":"jobs GRAPHIC COPY""#));
    }

    #[test]
    fn copy_non_200_is_status_error() {
        let dir = TempDir::new().unwrap();
        let (base, server) = serve_once("201 Created", br#"{"id":"x"}"#);
        let err = client(&dir, &base)
            .copy_document("src-key", "t")
            .unwrap_err();
        assert!(matches!(err, DocumentCopyError::Status { status: 201, .. }));
        server.join().unwrap();
    }

    #[test]
    fn copy_without_id_is_malformed() {
        let dir = TempDir::new().unwrap();
        let (base, server) = serve_once("200 OK", br#"{"kind":"drive#file"}"#);
        let err = client(&dir, &base).copy_document("k", "t").unwrap_err();
        assert!(matches!(err, DocumentCopyError::MalformedResponse(_)));
        server.join().unwrap();
    }

    #[test]
    fn fetch_writes_body_to_destination() {
        let dir = TempDir::new().unwrap();
        let (base, server) = serve_once("200 OK", b"PK\x03\x04xlsx-bytes");
        let dest = dir.path().join("jobs").join("jobs.xlsx");
        client(&dir, &base).fetch("doc-1", &dest).expect("fetch");
        assert_eq!(std::fs::read(&dest).unwrap(), b"PK\x03\x04xlsx-bytes");
        assert!(server.join().unwrap().starts_with("GET /export/doc-1"));
    }

    #[test]
    fn fetch_404_is_status_error_and_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let (base, server) = serve_once("404 Not Found", b"");
        let dest = dir.path().join("jobs.xlsx");
        let err = client(&dir, &base).fetch("missing", &dest).unwrap_err();
        assert!(matches!(err, DownloadError::Status { status: 404, .. }));
        assert!(!dest.exists());
        server.join().unwrap();
    }

    #[test]
    fn fetch_empty_key_is_rejected_before_network() {
        let dir = TempDir::new().unwrap();
        let err = client(&dir, "http://127.0.0.1:9")
            .fetch("  ", &dir.path().join("x.xlsx"))
            .unwrap_err();
        assert!(matches!(err, DownloadError::MissingKey));
    }

    #[test]
    fn unlocated_credentials_fail_only_on_request() {
        let dir = TempDir::new().unwrap();
        let client = DriveClient::with_store(None);
        let err = client
            .fetch("doc-1", &dir.path().join("x.xlsx"))
            .unwrap_err();
        assert!(matches!(
            err,
            DownloadError::Credentials(CredentialsError::Core(CoreError::HomeNotFound))
        ));
        let err = client.copy_document("k", "t").unwrap_err();
        assert!(matches!(err, DocumentCopyError::Credentials(_)));
    }

    #[test]
    fn from_settings_resolves_configured_credentials() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("graphics.yaml"),
            "credentials_path: creds.json\n",
        )
        .unwrap();
        let settings = Settings::load_at(dir.path()).unwrap();
        let client = DriveClient::from_settings(&settings);
        assert_eq!(
            client.credentials.as_ref().map(CredentialStore::path),
            Some(dir.path().join("creds.json").as_path())
        );
    }
}
