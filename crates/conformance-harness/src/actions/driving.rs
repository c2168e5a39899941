//! Actions that drive the adapter under test directly.

use serde_json::Value;

use crate::context::{InitSdkDefaults, TestContext};
use crate::error::{HarnessError, Result};
use crate::types::CaptureRequest;

use super::support::{opt_bool, opt_str, opt_u32, require_str, require_u64};

pub async fn init(params: &Value, ctx: &TestContext) -> Result<()> {
    let defaults = InitSdkDefaults {
        flush_at: opt_u32(params, "flush_at").unwrap_or(1),
        flush_interval_ms: opt_u32(params, "flush_interval_ms").unwrap_or(100),
        max_retries: opt_u32(params, "max_retries").unwrap_or(3),
        enable_compression: opt_bool(params, "enable_compression").unwrap_or(false),
    };

    if let Some(api_key) = opt_str(params, "api_key") {
        let host = opt_str(params, "host").unwrap_or(&ctx.mock_base_url);
        let config = crate::types::InitConfig {
            api_key: api_key.to_string(),
            host: host.to_string(),
            flush_at: Some(defaults.flush_at),
            flush_interval_ms: Some(defaults.flush_interval_ms),
            max_retries: Some(defaults.max_retries),
            enable_compression: Some(defaults.enable_compression),
        };
        return ctx.adapter.init(&config).await;
    }

    ctx.init_sdk(defaults).await
}

pub async fn capture(params: &Value, ctx: &TestContext) -> Result<()> {
    let distinct_id = require_str(params, "capture", "distinct_id")?.to_string();
    let event = require_str(params, "capture", "event")?.to_string();
    let properties = params
        .get("properties")
        .and_then(Value::as_object)
        .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect());
    let timestamp = opt_str(params, "timestamp").map(str::to_string);

    let request = CaptureRequest {
        distinct_id,
        event,
        properties,
        timestamp,
    };
    ctx.adapter.capture(&request).await.map(|_uuid| ())
}

pub async fn capture_multiple(params: &Value, ctx: &TestContext) -> Result<()> {
    let count = require_u64(params, "capture_multiple", "count")?;

    let template = params
        .get("params")
        .and_then(Value::as_object)
        .ok_or_else(|| HarnessError::missing_param("capture_multiple", "params"))?;

    for index in 0..count {
        let rendered = render_template(template, index);

        let distinct_id = rendered
            .get("distinct_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| HarnessError::missing_param("capture_multiple", "params.distinct_id"))?;
        let event = rendered
            .get("event")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| HarnessError::missing_param("capture_multiple", "params.event"))?;

        let properties = rendered
            .get("properties")
            .and_then(Value::as_object)
            .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect());
        let timestamp = rendered.get("timestamp").and_then(Value::as_str).map(str::to_string);

        let request = CaptureRequest {
            distinct_id,
            event,
            properties,
            timestamp,
        };
        ctx.adapter.capture(&request).await?;
    }
    Ok(())
}

/// Formats every top-level string value in `template` with `{index}`. Nested
/// structures (objects, arrays) are passed through unformatted.
fn render_template(template: &serde_json::Map<String, Value>, index: u64) -> serde_json::Map<String, Value> {
    template
        .iter()
        .map(|(key, value)| {
            let rendered = match value {
                Value::String(s) => Value::String(s.replace("{index}", &index.to_string())),
                other => other.clone(),
            };
            (key.clone(), rendered)
        })
        .collect()
}

pub async fn flush(_params: &Value, ctx: &TestContext) -> Result<()> {
    ctx.adapter.flush().await.map(|_| ())
}

pub async fn reset(_params: &Value, ctx: &TestContext) -> Result<()> {
    ctx.reset().await
}
