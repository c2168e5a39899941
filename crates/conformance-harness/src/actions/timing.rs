//! Time-based actions.

use std::time::Duration;

use serde_json::Value;

use crate::context::TestContext;
use crate::error::Result;

use super::support::require_u64;

pub async fn wait(params: &Value, _ctx: &TestContext) -> Result<()> {
    let duration_ms = require_u64(params, "wait", "duration_ms")?;
    tokio::time::sleep(Duration::from_millis(duration_ms)).await;
    Ok(())
}
