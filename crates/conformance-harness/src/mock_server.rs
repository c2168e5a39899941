//! Mock ingest server: impersonates the product's event-capture endpoint. An axum
//! server wrapping a shared, mutex-guarded store, started on an ephemeral port with
//! graceful shutdown.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::extract::{OriginalUri, RawQuery, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Router, body::Bytes};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::store::RequestStore;
use crate::types::MockResponse;

/// Every path the SDK may address capture traffic to. Different SDK flavours use
/// different conventions for the same ingest concept; the mock treats them as
/// equivalent aliases.
const CAPTURE_PATHS: &[&str] = &[
    "/batch",
    "/batch/",
    "/i/v0/e",
    "/i/v0/e/",
    "/e",
    "/e/",
    "/capture",
    "/capture/",
    "/track",
    "/track/",
];

#[derive(Clone)]
struct AppState {
    store: Arc<RequestStore>,
}

/// A running mock ingest server. Dropping this keeps the server alive — call
/// [`MockIngestServer::shutdown`] to stop it explicitly.
pub struct MockIngestServer {
    pub base_url: String,
    pub store: Arc<RequestStore>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl MockIngestServer {
    /// Binds to `bind_addr` (use `127.0.0.1:0` for an ephemeral port) and serves
    /// in the background.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(bind_addr: &str) -> anyhow::Result<Self> {
        let store = Arc::new(RequestStore::new());
        let app = router(store.clone());

        let listener = TcpListener::bind(bind_addr).await?;
        let local_addr = listener.local_addr()?;
        let base_url = format!("http://{local_addr}");

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(err) = result {
                tracing::error!(error = %err, "mock ingest server exited with error");
            }
        });

        tracing::info!(%base_url, "mock ingest server listening");

        Ok(Self {
            base_url,
            store,
            shutdown_tx: Some(shutdown_tx),
            handle,
        })
    }

    /// Address the server is bound to, suitable for health checks against `/`.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Signals graceful shutdown and waits for the server task to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = self.handle.await;
    }
}

fn router(store: Arc<RequestStore>) -> Router {
    let state = AppState { store };
    let mut router = Router::new()
        .route("/", get(health))
        .route("/_health", get(health))
        .route("/_control/requests", get(control_list_requests))
        .route("/_control/requests/clear", post(control_clear_requests))
        .route("/_control/reset", post(control_reset))
        .route("/_control/configure", post(control_configure));

    for path in CAPTURE_PATHS {
        router = router.route(path, get(capture).post(capture));
    }

    router.with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn capture(
    State(state): State<AppState>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    RawQuery(raw_query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header_map = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
        })
        .collect::<HashMap<_, _>>();

    let query_params = raw_query
        .as_deref()
        .map(parse_query)
        .unwrap_or_default();

    let response = state
        .store
        .record(method.as_str(), uri.path(), header_map, query_params.clone(), body.to_vec())
        .await;

    let is_beacon = query_params.get("beacon").map(String::as_str) == Some("1");
    build_capture_response(&response, is_beacon)
}

fn parse_query(raw: &str) -> HashMap<String, String> {
    form_urlencoded::parse(raw.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

fn build_capture_response(response: &MockResponse, is_beacon: bool) -> Response {
    if response.status_code != 200 {
        let status = StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = response
            .body
            .clone()
            .unwrap_or_else(|| json!({"error": "mock configured failure"}).to_string());
        return apply_headers(status, body, &response.headers);
    }

    if is_beacon {
        return apply_headers(StatusCode::NO_CONTENT, String::new(), &response.headers);
    }

    let body = response
        .body
        .clone()
        .unwrap_or_else(|| json!({"status": 1}).to_string());
    apply_headers(StatusCode::OK, body, &response.headers)
}

fn apply_headers(status: StatusCode, body: String, extra_headers: &HashMap<String, String>) -> Response {
    let mut builder = Response::builder().status(status);
    for (key, value) in extra_headers {
        builder = builder.header(key, value);
    }
    if !extra_headers.keys().any(|k| k.eq_ignore_ascii_case("content-type")) {
        builder = builder.header("content-type", "application/json");
    }
    builder
        .body(axum::body::Body::from(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

async fn control_list_requests(State(state): State<AppState>) -> impl IntoResponse {
    let requests = state.store.get_all().await;
    Json(requests)
}

async fn control_clear_requests(State(state): State<AppState>) -> impl IntoResponse {
    state.store.clear().await;
    Json(json!({"ok": true}))
}

async fn control_reset(State(state): State<AppState>) -> impl IntoResponse {
    state.store.reset().await;
    Json(json!({"ok": true}))
}

#[derive(serde::Deserialize)]
struct ConfigureBody {
    #[serde(default)]
    responses: Vec<MockResponse>,
}

async fn control_configure(
    State(state): State<AppState>,
    Json(body): Json<ConfigureBody>,
) -> impl IntoResponse {
    state.store.program(body.responses).await;
    Json(json!({"ok": true}))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn spawn() -> MockIngestServer {
        MockIngestServer::start("127.0.0.1:0").await.expect("mock server should start")
    }

    #[tokio::test]
    async fn health_endpoints_respond_ok() {
        let server = spawn().await;
        let client = reqwest::Client::new();

        let root = client.get(format!("{}/", server.base_url())).send().await.unwrap();
        assert_eq!(root.status(), 200);

        let health = client.get(format!("{}/_health", server.base_url())).send().await.unwrap();
        assert_eq!(health.status(), 200);

        server.shutdown().await;
    }

    #[tokio::test]
    async fn capture_default_response_is_200_with_status_1() {
        let server = spawn().await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{}/batch", server.base_url()))
            .json(&serde_json::json!({"batch": [{"event": "login"}]}))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["status"], 1);

        server.shutdown().await;
    }

    #[tokio::test]
    async fn beacon_query_param_yields_204() {
        let server = spawn().await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{}/batch?beacon=1", server.base_url()))
            .body("{}")
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 204);

        let recorded = server.store.get_all().await;
        assert_eq!(recorded.len(), 1);

        server.shutdown().await;
    }

    #[tokio::test]
    async fn control_plane_programs_and_resets() {
        let server = spawn().await;
        let client = reqwest::Client::new();

        client
            .post(format!("{}/_control/configure", server.base_url()))
            .json(&serde_json::json!({"responses": [{"status_code": 500}]}))
            .send()
            .await
            .unwrap();

        let resp = client
            .post(format!("{}/capture", server.base_url()))
            .body("{}")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 500);

        client
            .post(format!("{}/_control/reset", server.base_url()))
            .send()
            .await
            .unwrap();

        let listed = client
            .get(format!("{}/_control/requests", server.base_url()))
            .send()
            .await
            .unwrap()
            .json::<Vec<serde_json::Value>>()
            .await
            .unwrap();
        assert!(listed.is_empty());

        server.shutdown().await;
    }

    #[tokio::test]
    async fn all_alias_paths_are_accepted() {
        let server = spawn().await;
        let client = reqwest::Client::new();

        for path in CAPTURE_PATHS {
            let resp = client
                .post(format!("{}{}", server.base_url(), path))
                .body("{}")
                .send()
                .await
                .unwrap();
            assert_eq!(resp.status(), 200, "path {path} should be accepted");
        }

        server.shutdown().await;
    }
}
