//! Assertions about retry and backoff behaviour.

use serde_json::Value;

use crate::context::TestContext;
use crate::error::{HarnessError, Result};

use crate::actions::support::{require_str, require_u64};

pub async fn assert_final_success(_params: &Value, ctx: &TestContext) -> Result<()> {
    let recorded = ctx.store.get_all().await;
    if recorded.iter().any(|r| r.response_status == 200) {
        return Ok(());
    }
    Err(HarnessError::assertion("no recorded request received a 200 response"))
}

pub async fn assert_retry_delay(params: &Value, ctx: &TestContext) -> Result<()> {
    let min_delay_ms = require_u64(params, "assert_retry_delay", "min_delay_ms")?;
    let recorded = ctx.store.get_all().await;
    if recorded.len() < 2 {
        return Err(HarnessError::assertion("fewer than two recorded requests to measure delay between"));
    }
    let delay = u64::try_from((recorded[1].timestamp_ms - recorded[0].timestamp_ms).max(0)).unwrap_or(0);
    if delay < min_delay_ms {
        return Err(HarnessError::assertion(format!(
            "retry delay {delay}ms is below the required minimum of {min_delay_ms}ms"
        )));
    }
    Ok(())
}

pub async fn assert_backoff_implemented(params: &Value, ctx: &TestContext) -> Result<()> {
    let min_first_delay_ms = require_u64(params, "assert_backoff_implemented", "min_first_delay_ms")?;
    let recorded = ctx.store.get_all().await;
    if recorded.len() < 2 {
        return Err(HarnessError::assertion("fewer than two recorded requests to measure backoff"));
    }
    let first_delay = u64::try_from((recorded[1].timestamp_ms - recorded[0].timestamp_ms).max(0)).unwrap_or(0);
    if first_delay < min_first_delay_ms {
        return Err(HarnessError::assertion(format!(
            "first retry delay {first_delay}ms is below the required floor of {min_first_delay_ms}ms"
        )));
    }
    Ok(())
}

/// Substring match against the adapter's free-form `last_error`. Deliberately loose:
/// contract authors write an excerpt, not an exact error-code match.
pub async fn assert_response_status(params: &Value, ctx: &TestContext) -> Result<()> {
    let expected = require_str(params, "assert_response_status", "expected")?;
    let state = ctx.adapter.get_state().await?;
    let last_error = state
        .last_error
        .ok_or_else(|| HarnessError::assertion("adapter reported no last_error"))?;

    if last_error.contains(expected) {
        return Ok(());
    }
    Err(HarnessError::assertion(format!(
        "expected last_error to contain '{expected}', got '{last_error}'"
    )))
}
