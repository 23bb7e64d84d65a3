//! In-process stand-in for the GitHub contents and dispatch endpoints.
//!
//! Records every request and enforces the contents API's `sha` check so the
//! optimistic-concurrency path can be exercised end to end.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use base64::Engine;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use crate::core::config::PanelConfig;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

struct MockFile {
    content: Vec<u8>,
    sha: String,
}

struct MockState {
    files: HashMap<String, MockFile>,
    requests: Vec<RecordedRequest>,
    dispatch_status: u16,
    dispatch_body: Option<Value>,
    next_version: u64,
    public_reads: bool,
    forced_write_status: Option<u16>,
    commit_after_read: bool,
}

impl MockState {
    fn next_sha(&mut self) -> String {
        self.next_version += 1;
        format!("sha-{:04}", self.next_version)
    }
}

type SharedState = Arc<Mutex<MockState>>;

fn lock(state: &SharedState) -> std::sync::MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

fn record(state: &SharedState, method: &str, uri: &Uri, headers: &HeaderMap, body: Option<Value>) {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    lock(state).requests.push(RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        authorization,
        body,
    });
}

fn unauthorized(headers: &HeaderMap) -> Option<Response> {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("token "));
    if authorized {
        None
    } else {
        Some(
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "message": "Requires authentication" })),
            )
                .into_response(),
        )
    }
}

/// Base64 with a newline every 60 characters, as the real API returns it.
fn wrapped_base64(content: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(content);
    encoded
        .as_bytes()
        .chunks(60)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("\n")
        + "\n"
}

async fn get_contents(
    State(state): State<SharedState>,
    Path((_owner, _name, path)): Path<(String, String, String)>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    record(&state, "GET", &uri, &headers, None);
    let anonymous = !headers.contains_key("authorization");
    let public = lock(&state).public_reads;
    if !(anonymous && public)
        && let Some(denied) = unauthorized(&headers)
    {
        return denied;
    }

    let mut guard = lock(&state);
    let response = match guard.files.get(&path) {
        Some(file) => Json(json!({
            "path": path,
            "encoding": "base64",
            "content": wrapped_base64(&file.content),
            "sha": file.sha,
        }))
        .into_response(),
        None => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "message": "Not Found" })),
            )
                .into_response();
        }
    };

    // Someone else commits the same bytes right after this read.
    if guard.commit_after_read {
        let sha = guard.next_sha();
        if let Some(file) = guard.files.get_mut(&path) {
            file.sha = sha;
        }
    }
    response
}

async fn put_contents(
    State(state): State<SharedState>,
    Path((_owner, _name, path)): Path<(String, String, String)>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    record(&state, "PUT", &uri, &headers, Some(body.clone()));
    if let Some(denied) = unauthorized(&headers) {
        return denied;
    }
    let forced_status = lock(&state).forced_write_status;
    if let Some(forced) = forced_status {
        let status = StatusCode::from_u16(forced).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, Json(json!({ "message": "write rejected" }))).into_response();
    }

    let supplied_sha = body.get("sha").and_then(Value::as_str).unwrap_or_default();
    let Some(content) = body
        .get("content")
        .and_then(Value::as_str)
        .and_then(|c| base64::engine::general_purpose::STANDARD.decode(c).ok())
    else {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "message": "Invalid request: content is not valid Base64" })),
        )
            .into_response();
    };

    let mut guard = lock(&state);
    let current = match guard.files.get(&path) {
        Some(file) => file.sha.clone(),
        None => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "message": "Not Found" })),
            )
                .into_response();
        }
    };
    if current != supplied_sha {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "message": format!("{} does not match {}", path, supplied_sha) })),
        )
            .into_response();
    }

    let sha = guard.next_sha();
    guard.files.insert(
        path.clone(),
        MockFile {
            content,
            sha: sha.clone(),
        },
    );
    Json(json!({ "content": { "path": path, "sha": sha } })).into_response()
}

async fn dispatch_workflow(
    State(state): State<SharedState>,
    Path((_owner, _name, _workflow)): Path<(String, String, String)>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    record(&state, "POST", &uri, &headers, Some(body));
    if let Some(denied) = unauthorized(&headers) {
        return denied;
    }

    let guard = lock(&state);
    let status = StatusCode::from_u16(guard.dispatch_status).unwrap_or(StatusCode::NO_CONTENT);
    match &guard.dispatch_body {
        Some(body) => (status, Json(body.clone())).into_response(),
        None => status.into_response(),
    }
}

pub struct MockGithub {
    addr: SocketAddr,
    state: SharedState,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl MockGithub {
    pub async fn start() -> Self {
        let state: SharedState = Arc::new(Mutex::new(MockState {
            files: HashMap::new(),
            requests: Vec::new(),
            dispatch_status: 204,
            dispatch_body: None,
            next_version: 0,
            public_reads: false,
            forced_write_status: None,
            commit_after_read: false,
        }));

        let app = Router::new()
            .route(
                "/repos/{owner}/{name}/contents/{*path}",
                get(get_contents).put(put_contents),
            )
            .route(
                "/repos/{owner}/{name}/actions/workflows/{workflow}/dispatches",
                post(dispatch_workflow),
            )
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock github");
        let addr = listener.local_addr().expect("mock github addr");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Default config pointed at this server.
    pub fn config(&self) -> PanelConfig {
        PanelConfig {
            api_url: self.base_url(),
            ..PanelConfig::default()
        }
    }

    /// Seed (or replace) a file; returns its new sha.
    pub fn put_file(&self, path: &str, content: &[u8]) -> String {
        let mut guard = lock(&self.state);
        let sha = guard.next_sha();
        guard.files.insert(
            path.to_string(),
            MockFile {
                content: content.to_vec(),
                sha: sha.clone(),
            },
        );
        sha
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        lock(&self.state).files.get(path).map(|f| f.content.clone())
    }

    pub fn sha(&self, path: &str) -> Option<String> {
        lock(&self.state).files.get(path).map(|f| f.sha.clone())
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state).requests.clone()
    }

    pub fn set_dispatch_response(&self, status: u16, body: Option<Value>) {
        let mut guard = lock(&self.state);
        guard.dispatch_status = status;
        guard.dispatch_body = body;
    }

    /// Serve GETs without an `Authorization` header, like a public repository.
    pub fn set_public_reads(&self, public: bool) {
        lock(&self.state).public_reads = public;
    }

    /// Answer every authorized PUT with `status` and store nothing.
    pub fn set_write_status(&self, status: Option<u16>) {
        lock(&self.state).forced_write_status = status;
    }

    /// Give the file a new sha right after each GET, as if another writer
    /// committed in between.
    pub fn set_commit_after_read(&self, enabled: bool) {
        lock(&self.state).commit_after_read = enabled;
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}
