//! Per-test session: a small struct bundling the pieces a test needs — a handle to
//! the adapter under test plus a handle to the mock it was pointed at — built once
//! and handed to every test.

use std::sync::Arc;

use crate::adapter_client::AdapterClient;
use crate::error::Result;
use crate::store::RequestStore;
use crate::types::InitConfig;

/// Tuning knobs [`TestContext::init_sdk`] uses; kept tight so capture/flush/retry
/// scenarios settle within a handful of milliseconds instead of the SDK's production
/// defaults.
pub struct InitSdkDefaults {
    pub flush_at: u32,
    pub flush_interval_ms: u32,
    pub max_retries: u32,
    pub enable_compression: bool,
}

impl Default for InitSdkDefaults {
    fn default() -> Self {
        Self {
            flush_at: 1,
            flush_interval_ms: 100,
            max_retries: 3,
            enable_compression: false,
        }
    }
}

/// Bundles everything one contract test needs: the adapter under test, the mock's
/// store and base URL, and the API key used across steps.
pub struct TestContext {
    pub adapter: AdapterClient,
    pub store: Arc<RequestStore>,
    pub mock_base_url: String,
    pub api_key: String,
}

impl TestContext {
    #[must_use]
    pub fn new(
        adapter: AdapterClient,
        store: Arc<RequestStore>,
        mock_base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            adapter,
            store,
            mock_base_url: mock_base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Clears the mock's recorded requests and response programme, then resets the
    /// adapter's internal counters. Run before every test to prevent cross-test
    /// leakage.
    pub async fn reset(&self) -> Result<()> {
        self.store.reset().await;
        self.adapter.reset().await
    }

    /// Initializes the SDK under test against the mock, using tight flush/retry
    /// defaults suited to conformance timing.
    pub async fn init_sdk(&self, defaults: InitSdkDefaults) -> Result<()> {
        let config = InitConfig {
            api_key: self.api_key.clone(),
            host: self.mock_base_url.clone(),
            flush_at: Some(defaults.flush_at),
            flush_interval_ms: Some(defaults.flush_interval_ms),
            max_retries: Some(defaults.max_retries),
            enable_compression: Some(defaults.enable_compression),
        };
        self.adapter.init(&config).await
    }
}
