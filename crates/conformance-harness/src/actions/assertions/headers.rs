//! Header and batch-shape assertions.

use serde_json::Value;

use crate::context::TestContext;
use crate::error::{HarnessError, Result};

use crate::actions::support::{any_request_has_header, opt_bool, require_str};

pub async fn assert_request_has_header(params: &Value, ctx: &TestContext) -> Result<()> {
    let header = require_str(params, "assert_request_has_header", "header")?;
    let expected = params.get("expected").and_then(Value::as_str);

    let recorded = ctx.store.get_all().await;
    if any_request_has_header(&recorded, header, expected) {
        return Ok(());
    }

    Err(HarnessError::assertion(match expected {
        Some(value) => format!("no recorded request carries header '{header}: {value}'"),
        None => format!("no recorded request carries header '{header}'"),
    }))
}

pub async fn assert_batch_format(params: &Value, ctx: &TestContext) -> Result<()> {
    let recorded = ctx.store.get_all().await;
    let request = recorded
        .first()
        .ok_or_else(|| HarnessError::assertion("no recorded request to inspect"))?;

    let body: Value = request
        .body_decompressed
        .as_deref()
        .and_then(|body| serde_json::from_str(body).ok())
        .ok_or_else(|| HarnessError::assertion("first recorded request has no decodable JSON body"))?;

    let object = body
        .as_object()
        .ok_or_else(|| HarnessError::assertion("first recorded request body is not a JSON object"))?;

    if opt_bool(params, "has_api_key_field").unwrap_or(false) && !object.contains_key("api_key") {
        return Err(HarnessError::assertion("body is missing an 'api_key' field"));
    }

    if opt_bool(params, "has_batch_array").unwrap_or(false) && !matches!(object.get("batch"), Some(Value::Array(_))) {
        return Err(HarnessError::assertion("body is missing a 'batch' array"));
    }

    Ok(())
}
