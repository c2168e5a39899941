//! Parameter-bag helpers shared by every action.

use serde_json::Value;

use crate::error::{HarnessError, Result};
use crate::types::RecordedRequest;

pub fn require_str<'a>(params: &'a Value, action: &str, key: &str) -> Result<&'a str> {
    params
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| HarnessError::missing_param(action, key))
}

pub fn require_u64(params: &Value, action: &str, key: &str) -> Result<u64> {
    params
        .get(key)
        .and_then(Value::as_u64)
        .ok_or_else(|| HarnessError::missing_param(action, key))
}

pub fn opt_str<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(Value::as_str)
}

pub fn opt_u64(params: &Value, key: &str) -> Option<u64> {
    params.get(key).and_then(Value::as_u64)
}

pub fn opt_u32(params: &Value, key: &str) -> Option<u32> {
    params.get(key).and_then(Value::as_u64).and_then(|v| u32::try_from(v).ok())
}

pub fn opt_bool(params: &Value, key: &str) -> Option<bool> {
    params.get(key).and_then(Value::as_bool)
}

/// The first event of the first recorded request, if any.
pub fn first_event<'a>(recorded: &'a [RecordedRequest]) -> Option<&'a Value> {
    recorded.first()?.parsed_events.as_ref()?.first()
}

/// Case-insensitive lookup of a single header across all recorded requests.
pub fn any_request_has_header(
    recorded: &[RecordedRequest],
    header: &str,
    expected: Option<&str>,
) -> bool {
    recorded.iter().any(|req| {
        req.headers.iter().any(|(k, v)| {
            k.eq_ignore_ascii_case(header) && expected.is_none_or(|want| v == want)
        })
    })
}
