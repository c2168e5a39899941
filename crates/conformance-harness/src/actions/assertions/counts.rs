//! Request-count assertions.

use serde_json::Value;

use crate::context::TestContext;
use crate::error::{HarnessError, Result};

use crate::actions::support::require_u64;

pub async fn assert_request_count(params: &Value, ctx: &TestContext) -> Result<()> {
    let expected = require_u64(params, "assert_request_count", "expected")?;
    let actual = u64::try_from(ctx.store.get_all().await.len()).unwrap_or(u64::MAX);
    if actual != expected {
        return Err(HarnessError::assertion(format!(
            "expected {expected} recorded requests, got {actual}"
        )));
    }
    Ok(())
}

pub async fn assert_request_count_gte(params: &Value, ctx: &TestContext) -> Result<()> {
    let expected = require_u64(params, "assert_request_count_gte", "expected")?;
    let actual = u64::try_from(ctx.store.get_all().await.len()).unwrap_or(u64::MAX);
    if actual < expected {
        return Err(HarnessError::assertion(format!(
            "expected at least {expected} recorded requests, got {actual}"
        )));
    }
    Ok(())
}
