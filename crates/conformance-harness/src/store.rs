//! Thread-safe recorded-request store backing the mock ingest server.
//!
//! All mutating and reading operations go through one [`tokio::sync::Mutex`]; the
//! body-decode-and-shape-detection pipeline runs exactly once per recorded hit, on
//! the write path, and never fails the request.

use std::collections::{HashMap, VecDeque};

use flate2::read::GzDecoder;
use serde_json::Value;
use std::io::Read as _;
use tokio::sync::Mutex;

use crate::types::{MockResponse, RecordedRequest};

/// Caps how many requests the store retains; oldest entries are dropped once exceeded.
/// Chosen generously — conformance tests issue at most a few dozen requests per case.
const MAX_RECORDED: usize = 10_000;

struct Inner {
    recorded: VecDeque<RecordedRequest>,
    response_queue: VecDeque<MockResponse>,
    default_response: MockResponse,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            recorded: VecDeque::new(),
            response_queue: VecDeque::new(),
            default_response: MockResponse::default(),
        }
    }
}

/// The mock ingest server's recorded-request log and response programme.
pub struct RequestStore {
    inner: Mutex<Inner>,
}

impl Default for RequestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Records one inbound hit, decodes its body best-effort, and dequeues (or
    /// defaults) the response that should be sent back for it.
    pub async fn record(
        &self,
        method: &str,
        path: &str,
        headers: HashMap<String, String>,
        query_params: HashMap<String, String>,
        body_raw: Vec<u8>,
    ) -> MockResponse {
        let body_decompressed = decode_body(&headers, &body_raw);
        let parsed_events = body_decompressed.as_deref().and_then(detect_events);

        let mut guard = self.inner.lock().await;
        let response = guard.response_queue.pop_front().unwrap_or_else(|| guard.default_response.clone());

        let recorded = RecordedRequest {
            timestamp_ms: now_millis(),
            method: method.to_string(),
            path: path.to_string(),
            headers,
            query_params,
            body_raw,
            body_decompressed,
            parsed_events,
            response_status: response.status_code,
            response_headers: response.headers.clone(),
            response_body: response.body.clone(),
        };

        guard.recorded.push_back(recorded);
        if guard.recorded.len() > MAX_RECORDED {
            guard.recorded.pop_front();
        }

        response
    }

    /// A snapshot of every request recorded so far, in arrival order.
    pub async fn get_all(&self) -> Vec<RecordedRequest> {
        self.inner.lock().await.recorded.iter().cloned().collect()
    }

    /// Empties the request log only; the response programme is left untouched.
    pub async fn clear(&self) {
        self.inner.lock().await.recorded.clear();
    }

    /// Replaces the response programme wholesale.
    pub async fn program(&self, responses: Vec<MockResponse>) {
        let mut guard = self.inner.lock().await;
        guard.response_queue = responses.into();
    }

    /// Sets the response returned once the programme is exhausted.
    pub async fn set_default(&self, response: MockResponse) {
        self.inner.lock().await.default_response = response;
    }

    /// Clears the request log, empties the response programme, and restores the
    /// default response to a bare 200.
    pub async fn reset(&self) {
        let mut guard = self.inner.lock().await;
        guard.recorded.clear();
        guard.response_queue.clear();
        guard.default_response = MockResponse::default();
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Step 1-2 of the decode pipeline: gzip-if-declared, else plain UTF-8. Never fails;
/// absence of a value means "could not be decoded", not an error.
fn decode_body(headers: &HashMap<String, String>, body_raw: &[u8]) -> Option<String> {
    let is_gzip = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-encoding"))
        .is_some_and(|(_, v)| v.eq_ignore_ascii_case("gzip"));

    if is_gzip {
        let mut decoder = GzDecoder::new(body_raw);
        let mut out = String::new();
        return decoder.read_to_string(&mut out).ok().map(|_| out);
    }

    std::str::from_utf8(body_raw).ok().map(str::to_string)
}

/// Step 3 of the decode pipeline: JSON shape detection. `batch` takes precedence
/// over `data` when both are present on an object.
fn detect_events(body: &str) -> Option<Vec<Value>> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value {
        Value::Array(items) => Some(items),
        Value::Object(ref map) => {
            if let Some(Value::Array(batch)) = map.get("batch") {
                return Some(batch.clone());
            }
            if let Some(Value::Array(data)) = map.get("data") {
                return Some(data.clone());
            }
            Some(vec![value.clone()])
        }
        _ => None,
    }
}
