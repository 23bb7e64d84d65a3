//! Authenticated access to the managed repository through the GitHub REST API.
//!
//! Files are read and written through the contents endpoint. Every write
//! carries the `sha` returned by the read it is based on, and GitHub rejects
//! the write if the file changed in between. A rejected write is reported
//! as-is; nothing here re-fetches and retries, so a concurrent edit by someone
//! else is never overwritten.

#[cfg(test)]
pub(crate) mod mock;

use base64::Engine;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::config::PanelConfig;
use crate::core::error::PanelError;
use crate::core::vault::{Credential, CredentialStore};

pub const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

const BODY_LOG_LIMIT: usize = 500;

/// Shared HTTP client. GitHub refuses requests without a `User-Agent`.
pub fn http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("blogpanel/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Request headers for `credential`, or `None` if the token cannot be sent
/// as a header value.
pub fn auth_headers(credential: &Credential) -> Option<HeaderMap> {
    let mut auth = match HeaderValue::from_str(&format!("token {}", credential.expose())) {
        Ok(value) => value,
        Err(_) => {
            warn!("Stored GitHub token contains characters not allowed in a header");
            return None;
        }
    };
    auth.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, auth);
    headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
    Some(headers)
}

/// Percent-encode each segment of a repository path, keeping `/` separators.
pub fn encode_path(path: &str) -> String {
    path.trim_start_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Shorten a response body before it goes into an error/log line.
pub(crate) fn truncate_body(body: &str) -> String {
    if body.chars().count() <= BODY_LOG_LIMIT {
        return body.to_string();
    }
    let mut short: String = body.chars().take(BODY_LOG_LIMIT).collect();
    short.push('…');
    short
}

/// A file as it exists in the repository right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub path: String,
    pub content: Vec<u8>,
    /// Blob `sha`; must accompany the next write of this path.
    pub version: String,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    content: String,
    sha: String,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Serialize)]
struct PutContentRequest<'a> {
    message: &'a str,
    content: String,
    sha: &'a str,
}

/// Decode the contents API payload. GitHub wraps the base64 text at 60
/// columns, so whitespace is dropped first.
fn decode_content(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    base64::engine::general_purpose::STANDARD.decode(compact)
}

pub struct ContentClient {
    http: reqwest::Client,
    credentials: Arc<dyn CredentialStore>,
    api_base: String,
    repo: String,
}

impl ContentClient {
    pub fn new(
        http: reqwest::Client,
        config: &PanelConfig,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            http,
            credentials,
            api_base: config.api_base().to_string(),
            repo: config.repo.clone(),
        }
    }

    /// Headers for the next request. `None` means no token is configured and
    /// the caller must not attempt the call.
    pub async fn build_headers(&self) -> Option<HeaderMap> {
        let credential = self.credentials.get().await?;
        auth_headers(&credential)
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/contents/{}",
            self.api_base,
            self.repo,
            encode_path(path)
        )
    }

    pub async fn fetch_file(&self, path: &str) -> Result<RemoteFile, PanelError> {
        let headers = self.build_headers().await.ok_or(PanelError::NoCredential)?;
        self.fetch_with_headers(path, headers).await
    }

    /// Read a file that may be public. The token is sent when one is stored;
    /// otherwise the request goes out anonymously.
    pub async fn fetch_public_file(&self, path: &str) -> Result<RemoteFile, PanelError> {
        let headers = match self.build_headers().await {
            Some(headers) => headers,
            None => {
                let mut headers = HeaderMap::new();
                headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
                headers
            }
        };
        self.fetch_with_headers(path, headers).await
    }

    async fn fetch_with_headers(
        &self,
        path: &str,
        headers: HeaderMap,
    ) -> Result<RemoteFile, PanelError> {
        let response = self
            .http
            .get(self.contents_url(path))
            .headers(headers)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(PanelError::FetchFailed {
                path: path.to_string(),
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let payload: ContentResponse =
            serde_json::from_str(&body).map_err(|e| PanelError::DecodeFailed {
                path: path.to_string(),
                reason: format!("unexpected response shape: {}", e),
            })?;

        if let Some(encoding) = payload.encoding.as_deref()
            && encoding != "base64"
        {
            return Err(PanelError::DecodeFailed {
                path: path.to_string(),
                reason: format!("unsupported encoding '{}'", encoding),
            });
        }

        let content = decode_content(&payload.content).map_err(|e| PanelError::DecodeFailed {
            path: path.to_string(),
            reason: e.to_string(),
        })?;

        debug!(
            path,
            sha = %payload.sha,
            bytes = content.len(),
            "Fetched remote file"
        );

        Ok(RemoteFile {
            path: path.to_string(),
            content,
            version: payload.sha,
        })
    }

    /// Commit `content` to `path`. Accepted only if `version` is still the
    /// file's current sha; a mismatch comes back as `WriteFailed`.
    pub async fn write_file(
        &self,
        path: &str,
        content: &[u8],
        version: &str,
        message: &str,
    ) -> Result<(), PanelError> {
        let headers = self.build_headers().await.ok_or(PanelError::NoCredential)?;

        let request = PutContentRequest {
            message,
            content: base64::engine::general_purpose::STANDARD.encode(content),
            sha: version,
        };

        let response = self
            .http
            .put(self.contents_url(path))
            .headers(headers)
            .json(&request)
            .send()
            .await?;
        let status = response.status();

        if status.is_success() {
            debug!(path, status = status.as_u16(), "Remote file written");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(PanelError::WriteFailed {
            path: path.to_string(),
            status: status.as_u16(),
            body: truncate_body(&body),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockGithub;
    use super::*;
    use crate::core::vault::MemoryCredentialStore;

    fn client(mock: &MockGithub, store: Arc<dyn CredentialStore>) -> ContentClient {
        ContentClient::new(http_client().unwrap(), &mock.config(), store)
    }

    #[test]
    fn encode_path_keeps_separators() {
        assert_eq!(
            encode_path(".github/workflows/daily-blog-generator.yml"),
            ".github/workflows/daily-blog-generator.yml"
        );
        assert_eq!(encode_path("docs/my post.md"), "docs/my%20post.md");
        assert_eq!(encode_path("/config/sources.json"), "config/sources.json");
    }

    #[test]
    fn decode_content_ignores_line_wrapping() {
        let wrapped = "aGVsbG8g\nd29ybGQ=\n";
        assert_eq!(decode_content(wrapped).unwrap(), b"hello world");
    }

    #[test]
    fn auth_headers_use_token_scheme() {
        let headers = auth_headers(&Credential::new("ghp_abc")).unwrap();
        assert_eq!(headers[AUTHORIZATION], "token ghp_abc");
        assert!(headers[AUTHORIZATION].is_sensitive());
        assert_eq!(headers[ACCEPT], GITHUB_ACCEPT);
    }

    #[test]
    fn auth_headers_reject_control_characters() {
        assert!(auth_headers(&Credential::new("bad\ntoken")).is_none());
    }

    #[test]
    fn truncate_body_limits_length() {
        let long = "x".repeat(BODY_LOG_LIMIT + 20);
        let short = truncate_body(&long);
        assert_eq!(short.chars().count(), BODY_LOG_LIMIT + 1);
        assert_eq!(truncate_body("short"), "short");
    }

    #[tokio::test]
    async fn build_headers_requires_credential() {
        let mock = MockGithub::start().await;
        let store = Arc::new(MemoryCredentialStore::default());
        let client = client(&mock, store.clone());
        assert!(client.build_headers().await.is_none());

        store.set(Credential::new("ghp_late")).await.unwrap();
        let headers = client.build_headers().await.unwrap();
        assert_eq!(headers[AUTHORIZATION], "token ghp_late");
        mock.shutdown().await;
    }

    #[tokio::test]
    async fn fetch_file_decodes_content_and_version() {
        let mock = MockGithub::start().await;
        let sha = mock.put_file("config/sources.json", b"{\"hn\": {\"enabled\": true}}");
        let client = client(&mock, Arc::new(MemoryCredentialStore::with_token("t")));

        let file = client.fetch_file("config/sources.json").await.unwrap();
        assert_eq!(file.content, b"{\"hn\": {\"enabled\": true}}");
        assert_eq!(file.version, sha);
        assert_eq!(file.path, "config/sources.json");

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "GET");
        assert_eq!(
            requests[0].path,
            "/repos/Abivarma/blog-automation/contents/config/sources.json"
        );
        assert_eq!(requests[0].authorization.as_deref(), Some("token t"));
        mock.shutdown().await;
    }

    #[tokio::test]
    async fn fetch_missing_file_is_fetch_failed() {
        let mock = MockGithub::start().await;
        let client = client(&mock, Arc::new(MemoryCredentialStore::with_token("t")));

        let err = client.fetch_file("nope.json").await.unwrap_err();
        assert!(matches!(err, PanelError::FetchFailed { status: 404, .. }));
        mock.shutdown().await;
    }

    #[tokio::test]
    async fn fetch_without_credential_sends_nothing() {
        let mock = MockGithub::start().await;
        mock.put_file("config/sources.json", b"{}");
        let client = client(&mock, Arc::new(MemoryCredentialStore::default()));

        let err = client.fetch_file("config/sources.json").await.unwrap_err();
        assert!(matches!(err, PanelError::NoCredential));
        assert!(mock.requests().is_empty());
        mock.shutdown().await;
    }

    #[tokio::test]
    async fn write_file_commits_with_message_and_sha() {
        let mock = MockGithub::start().await;
        let sha = mock.put_file("notes.txt", b"old");
        let client = client(&mock, Arc::new(MemoryCredentialStore::with_token("t")));

        client
            .write_file("notes.txt", b"new", &sha, "chore: rewrite notes")
            .await
            .unwrap();

        assert_eq!(mock.file("notes.txt").unwrap(), b"new");
        assert_ne!(mock.sha("notes.txt").unwrap(), sha);

        let put = mock.requests().pop().unwrap();
        assert_eq!(put.method, "PUT");
        let body = put.body.unwrap();
        assert_eq!(body["message"], "chore: rewrite notes");
        assert_eq!(body["sha"], sha.as_str());
        assert_eq!(body["content"], "bmV3");
        mock.shutdown().await;
    }

    #[tokio::test]
    async fn stale_version_write_is_rejected() {
        let mock = MockGithub::start().await;
        mock.put_file("notes.txt", b"v0");
        let client = client(&mock, Arc::new(MemoryCredentialStore::with_token("t")));

        let original = client.fetch_file("notes.txt").await.unwrap();
        client
            .write_file("notes.txt", b"write A", &original.version, "A")
            .await
            .unwrap();

        let err = client
            .write_file("notes.txt", b"write B", &original.version, "B")
            .await
            .unwrap_err();
        assert!(matches!(err, PanelError::WriteFailed { status: 409, .. }));
        assert_eq!(mock.file("notes.txt").unwrap(), b"write A");
        mock.shutdown().await;
    }

    #[tokio::test]
    async fn public_fetch_goes_out_anonymously_without_credential() {
        let mock = MockGithub::start().await;
        mock.set_public_reads(true);
        mock.put_file("docs/data/stats.json", b"{}");
        let client = client(&mock, Arc::new(MemoryCredentialStore::default()));

        let file = client.fetch_public_file("docs/data/stats.json").await.unwrap();
        assert_eq!(file.content, b"{}");
        assert!(matches!(
            client.fetch_file("docs/data/stats.json").await,
            Err(PanelError::NoCredential)
        ));

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].authorization.is_none());
        mock.shutdown().await;
    }

    #[tokio::test]
    async fn public_fetch_uses_stored_credential() {
        let mock = MockGithub::start().await;
        mock.put_file("docs/data/posts.json", b"[]");
        let client = client(&mock, Arc::new(MemoryCredentialStore::with_token("t")));

        client.fetch_public_file("docs/data/posts.json").await.unwrap();
        assert_eq!(mock.requests()[0].authorization.as_deref(), Some("token t"));
        mock.shutdown().await;
    }
}
