//! Typed client for the SDK adapter's control protocol: a `reqwest::Client` built
//! once with a connect timeout, each call additionally guarded by
//! `tokio::time::timeout`.

use std::time::Duration;

use serde_json::{Value, json};

use crate::error::{HarnessError, Result};
use crate::types::{CaptureRequest, HealthResponse, InitConfig, StateResponse};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Speaks the fixed control protocol the conformance harness expects every SDK
/// adapter to expose: health, init, capture, flush, state, reset.
pub struct AdapterClient {
    base_url: String,
    http: reqwest::Client,
}

impl AdapterClient {
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: base_url.into(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send_json(&self, builder: reqwest::RequestBuilder) -> Result<Value> {
        let response = tokio::time::timeout(REQUEST_TIMEOUT, builder.send())
            .await
            .map_err(|_| HarnessError::transport("adapter request timed out"))?
            .map_err(|err| HarnessError::transport(err.to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|err| HarnessError::transport(format!("invalid JSON from adapter: {err}")))?;

        if !status.is_success() {
            return Err(HarnessError::transport(format!(
                "adapter returned {status}: {body}"
            )));
        }
        Ok(body)
    }

    /// `GET /health`.
    pub async fn health(&self) -> Result<HealthResponse> {
        let value = self.send_json(self.http.get(self.url("/health"))).await?;
        serde_json::from_value(value)
            .map_err(|err| HarnessError::transport(format!("malformed health response: {err}")))
    }

    /// `POST /init`.
    pub async fn init(&self, config: &InitConfig) -> Result<()> {
        self.send_json(self.http.post(self.url("/init")).json(config)).await?;
        Ok(())
    }

    /// `POST /capture`, returning the SDK-generated event identifier.
    pub async fn capture(&self, request: &CaptureRequest) -> Result<String> {
        let value = self
            .send_json(self.http.post(self.url("/capture")).json(request))
            .await?;
        value
            .get("uuid")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| HarnessError::transport("capture response missing 'uuid'"))
    }

    /// `POST /flush`, returning the number of events the adapter reports flushed.
    pub async fn flush(&self) -> Result<u64> {
        let value = self.send_json(self.http.post(self.url("/flush"))).await?;
        Ok(value.get("events_flushed").and_then(Value::as_u64).unwrap_or(0))
    }

    /// `GET /state`.
    pub async fn get_state(&self) -> Result<StateResponse> {
        let value = self.send_json(self.http.get(self.url("/state"))).await?;
        serde_json::from_value(value)
            .map_err(|err| HarnessError::transport(format!("malformed state response: {err}")))
    }

    /// `POST /reset`.
    pub async fn reset(&self) -> Result<()> {
        self.send_json(self.http.post(self.url("/reset")).json(&json!({}))).await?;
        Ok(())
    }

    /// Polls `health()` every 500ms until it succeeds or `timeout` elapses.
    pub async fn wait_for_health(&self, timeout: Duration) -> Result<HealthResponse> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.health().await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    if tokio::time::Instant::now() >= deadline {
                        return Err(HarnessError::transport(format!(
                            "adapter did not become healthy within {}: {err}",
                            humantime::format_duration(timeout)
                        )));
                    }
                    tokio::time::sleep(HEALTH_POLL_INTERVAL).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;

    #[tokio::test]
    async fn health_parses_response() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/health");
            then.status(200).json_body(json!({
                "sdk_name": "posthog-python",
                "sdk_version": "3.0.0",
                "adapter_version": "1.0.0"
            }));
        });

        let client = AdapterClient::new(server.base_url()).unwrap();
        let health = client.health().await.unwrap();
        assert_eq!(health.sdk_name, "posthog-python");
    }

    #[tokio::test]
    async fn capture_extracts_uuid() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/capture");
            then.status(200).json_body(json!({"success": true, "uuid": "abc-123"}));
        });

        let client = AdapterClient::new(server.base_url()).unwrap();
        let req = CaptureRequest {
            distinct_id: "u1".into(),
            event: "login".into(),
            properties: None,
            timestamp: None,
        };
        let uuid = client.capture(&req).await.unwrap();
        assert_eq!(uuid, "abc-123");
    }

    #[tokio::test]
    async fn non_2xx_becomes_transport_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/init");
            then.status(400).json_body(json!({"error": "bad config"}));
        });

        let client = AdapterClient::new(server.base_url()).unwrap();
        let config = InitConfig {
            api_key: "k".into(),
            host: "http://localhost".into(),
            flush_at: None,
            flush_interval_ms: None,
            max_retries: None,
            enable_compression: None,
        };
        let err = client.init(&config).await.unwrap_err();
        assert!(matches!(err, HarnessError::TransportError(_)));
    }

    #[tokio::test]
    async fn wait_for_health_retries_until_success() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/health");
            then.status(200).json_body(json!({
                "sdk_name": "s", "sdk_version": "1", "adapter_version": "1"
            }));
        });

        let client = AdapterClient::new(server.base_url()).unwrap();
        let health = client.wait_for_health(Duration::from_secs(2)).await.unwrap();
        assert_eq!(health.sdk_version, "1");
        mock.assert();
    }
}
