//! Assertions about the API key/token the SDK attached to its traffic.

use serde_json::Value;

use crate::context::TestContext;
use crate::error::{HarnessError, Result};

use crate::actions::support::require_str;

pub async fn assert_token_present(params: &Value, ctx: &TestContext) -> Result<()> {
    let expected = require_str(params, "assert_token_present", "expected")?;
    let recorded = ctx.store.get_all().await;
    let request = recorded
        .first()
        .ok_or_else(|| HarnessError::assertion("no recorded request to inspect"))?;

    let event = request.parsed_events.as_deref().and_then(|events| events.first());
    let event_token = event.and_then(|e| e.get("token")).and_then(Value::as_str);

    let batch_body = request
        .body_decompressed
        .as_deref()
        .and_then(|body| serde_json::from_str::<Value>(body).ok());
    let batch_token = batch_body
        .as_ref()
        .and_then(|body| body.get("api_key").or_else(|| body.get("token")))
        .and_then(Value::as_str);

    if event_token == Some(expected) || batch_token == Some(expected) {
        return Ok(());
    }

    Err(HarnessError::assertion(format!(
        "expected token '{expected}', found event token '{}' and batch token '{}'",
        event_token.unwrap_or("<none>"),
        batch_token.unwrap_or("<none>"),
    )))
}

pub async fn assert_token_present_client(params: &Value, ctx: &TestContext) -> Result<()> {
    let expected = require_str(params, "assert_token_present_client", "expected")?;
    let recorded = ctx.store.get_all().await;
    let request = recorded
        .first()
        .ok_or_else(|| HarnessError::assertion("no recorded request to inspect"))?;

    let events = request.parsed_events.as_deref().unwrap_or_default();
    let found = events.iter().any(|event| {
        event.get("token").and_then(Value::as_str) == Some(expected)
            || event.get("api_key").and_then(Value::as_str) == Some(expected)
            || event
                .get("properties")
                .and_then(|p| p.get("token"))
                .and_then(Value::as_str)
                == Some(expected)
            || event
                .get("properties")
                .and_then(|p| p.get("api_key"))
                .and_then(Value::as_str)
                == Some(expected)
    });

    if found {
        return Ok(());
    }

    Err(HarnessError::assertion(format!(
        "no event in the first recorded request carries token '{expected}'"
    )))
}
