//! The harness's own runtime configuration — distinct from the contract document,
//! which is always an explicit path argument and never layered.
//!
//! A serde struct with per-field `#[serde(default = "fn")]` defaults, layered with
//! `figment` since this type is meant to be built from more than one source
//! (compiled-in defaults, an optional file, environment variables).

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Runtime knobs for the harness process itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    #[serde(default = "default_mock_bind_addr")]
    pub mock_bind_addr: String,
    #[serde(default = "default_api_key")]
    pub default_api_key: String,
    #[serde(default = "default_health_timeout_secs")]
    pub adapter_health_timeout_secs: u64,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            mock_bind_addr: default_mock_bind_addr(),
            default_api_key: default_api_key(),
            adapter_health_timeout_secs: default_health_timeout_secs(),
            log_filter: default_log_filter(),
        }
    }
}

fn default_mock_bind_addr() -> String {
    "127.0.0.1:0".to_string()
}

fn default_api_key() -> String {
    "phc_test_key".to_string()
}

fn default_health_timeout_secs() -> u64 {
    30
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl HarnessConfig {
    /// Layers compiled-in defaults, then an optional `harness.toml` config file,
    /// then `CONFORMANCE_`-prefixed environment variables, in that precedence
    /// order.
    ///
    /// # Errors
    ///
    /// Returns an error if a present config file or environment variable cannot be
    /// parsed into this shape.
    pub fn load(config_file: Option<&std::path::Path>) -> anyhow::Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(HarnessConfig::default()));

        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("CONFORMANCE_"));

        Ok(figment.extract()?)
    }
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_any_source() {
        let config = HarnessConfig::load(None).unwrap();
        assert_eq!(config.default_api_key, "phc_test_key");
        assert_eq!(config.adapter_health_timeout_secs, 30);
    }

    #[test]
    fn env_override_takes_precedence() {
        // SAFETY: single-threaded test process env mutation, scoped to this test.
        unsafe {
            std::env::set_var("CONFORMANCE_DEFAULT_API_KEY", "phc_from_env");
        }
        let config = HarnessConfig::load(None).unwrap();
        unsafe {
            std::env::remove_var("CONFORMANCE_DEFAULT_API_KEY");
        }
        assert_eq!(config.default_api_key, "phc_from_env");
    }
}
