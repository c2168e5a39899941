//! The `assert_capture_fails` marker action.
//!
//! This action itself does nothing; its presence as the *next* step after one that
//! raises tells the executor to swallow that raise instead of failing the test. See
//! [`crate::engine`].

use serde_json::Value;

use crate::context::TestContext;
use crate::error::Result;

pub async fn assert_capture_fails(_params: &Value, _ctx: &TestContext) -> Result<()> {
    Ok(())
}
