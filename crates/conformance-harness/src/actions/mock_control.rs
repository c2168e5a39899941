//! Actions that program the mock ingest server's response queue.

use serde_json::Value;

use crate::context::TestContext;
use crate::error::{HarnessError, Result};
use crate::types::MockResponse;

pub async fn configure_mock_responses(params: &Value, ctx: &TestContext) -> Result<()> {
    let entries = params
        .get("responses")
        .and_then(Value::as_array)
        .ok_or_else(|| HarnessError::missing_param("configure_mock_responses", "responses"))?;

    let mut responses = Vec::with_capacity(entries.len());
    for entry in entries {
        let response: MockResponse = serde_json::from_value(entry.clone())
            .map_err(|err| HarnessError::bad_contract(format!("invalid mock response: {err}")))?;
        responses.push(response);
    }

    ctx.store.program(responses).await;
    Ok(())
}
