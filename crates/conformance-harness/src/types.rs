//! Shared value types passed between the executor, the adapter client and the mock store.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameters sent to the adapter's `POST /init`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitConfig {
    pub api_key: String,
    pub host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flush_at: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flush_interval_ms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_compression: Option<bool>,
}

/// Parameters sent to the adapter's `POST /capture`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureRequest {
    pub distinct_id: String,
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Response from the adapter's `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub sdk_name: String,
    pub sdk_version: String,
    pub adapter_version: String,
}

/// Response from the adapter's `GET /state`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateResponse {
    pub pending_events: u64,
    pub total_events_captured: u64,
    pub total_events_sent: u64,
    pub total_retries: u64,
    pub last_error: Option<String>,
    #[serde(default)]
    pub requests_made: Vec<Value>,
}

/// A response entry that can be queued onto the mock server's response programme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockResponse {
    #[serde(default = "default_status_code")]
    pub status_code: u16,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
}

fn default_status_code() -> u16 {
    200
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            status_code: default_status_code(),
            headers: HashMap::new(),
            body: None,
        }
    }
}

/// One HTTP hit captured by the mock ingest server, together with the response it
/// was given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedRequest {
    pub timestamp_ms: i64,
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub query_params: HashMap<String, String>,
    #[serde(with = "serde_bytes_as_base64", default)]
    pub body_raw: Vec<u8>,
    pub body_decompressed: Option<String>,
    pub parsed_events: Option<Vec<Value>>,
    pub response_status: u16,
    pub response_headers: HashMap<String, String>,
    pub response_body: Option<String>,
}

/// Result of running a single contract test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub duration_ms: u64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<Value>,
}

/// Results of every test in one suite.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub name: String,
    #[serde(default)]
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            results: Vec::new(),
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| !r.passed).count()
    }
}

/// Aggregate result of an entire conformance run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestSummary {
    #[serde(default)]
    pub suites: Vec<TestSuiteResult>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl TestSummary {
    #[must_use]
    pub fn total(&self) -> usize {
        self.suites.iter().map(TestSuiteResult::total).sum()
    }

    #[must_use]
    pub fn passed(&self) -> usize {
        self.suites.iter().map(TestSuiteResult::passed).sum()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.suites.iter().map(TestSuiteResult::failed).sum()
    }

    pub fn add_suite(&mut self, suite: TestSuiteResult) {
        self.suites.push(suite);
    }
}

/// Serializes `Vec<u8>` as a base64 string so `RecordedRequest` stays human-readable
/// over the mock server's `/_control/requests` JSON surface.
mod serde_bytes_as_base64 {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        STANDARD.encode(bytes).serialize(ser)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(de)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}
