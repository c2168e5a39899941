//! Assertions about SDK-generated identifiers (`uuid`) and timestamp stability
//! across retries.

use std::collections::HashSet;

use serde_json::Value;

use crate::context::TestContext;
use crate::error::{HarnessError, Result};
use crate::types::RecordedRequest;

use crate::actions::support::require_str;

fn event_uuids(request: &RecordedRequest) -> Vec<String> {
    request
        .parsed_events
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter_map(|event| event.get("uuid").and_then(Value::as_str).map(str::to_string))
        .collect()
}

fn event_timestamps(request: &RecordedRequest) -> Vec<String> {
    request
        .parsed_events
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter_map(|event| event.get("timestamp").and_then(Value::as_str).map(str::to_string))
        .collect()
}

pub async fn assert_uuid_format(params: &Value, ctx: &TestContext) -> Result<()> {
    let field = require_str(params, "assert_uuid_format", "field")?;
    let recorded = ctx.store.get_all().await;
    let event = recorded
        .first()
        .and_then(|r| r.parsed_events.as_ref())
        .and_then(|events| events.first())
        .ok_or_else(|| HarnessError::assertion("no recorded event to inspect"))?;

    let value = event
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| HarnessError::assertion(format!("event has no string field '{field}'")))?;

    if value.len() != 36 || value.matches('-').count() != 4 {
        return Err(HarnessError::assertion(format!(
            "field '{field}' value '{value}' does not look like a UUID"
        )));
    }
    Ok(())
}

pub async fn assert_all_uuids_unique(_params: &Value, ctx: &TestContext) -> Result<()> {
    let recorded = ctx.store.get_all().await;
    let mut seen = HashSet::new();
    for request in &recorded {
        for uuid in event_uuids(request) {
            if !seen.insert(uuid.clone()) {
                return Err(HarnessError::assertion(format!("duplicate uuid '{uuid}' across recorded requests")));
            }
        }
    }
    Ok(())
}

pub async fn assert_different_uuids(_params: &Value, ctx: &TestContext) -> Result<()> {
    let recorded = ctx.store.get_all().await;
    let all_uuids: Vec<String> = recorded.iter().flat_map(event_uuids).collect();
    if all_uuids.len() < 2 {
        return Err(HarnessError::assertion("fewer than two events recorded"));
    }
    if all_uuids[0] == all_uuids[1] {
        return Err(HarnessError::assertion("first two events share the same uuid"));
    }
    Ok(())
}

pub async fn assert_no_duplicate_events_in_batch(_params: &Value, ctx: &TestContext) -> Result<()> {
    let recorded = ctx.store.get_all().await;
    for request in &recorded {
        let uuids = event_uuids(request);
        let mut seen = HashSet::new();
        for uuid in uuids {
            if !seen.insert(uuid.clone()) {
                return Err(HarnessError::assertion(format!(
                    "duplicate uuid '{uuid}' within a single batch"
                )));
            }
        }
    }
    Ok(())
}

pub async fn assert_uuid_preserved_on_retry(_params: &Value, ctx: &TestContext) -> Result<()> {
    let recorded = ctx.store.get_all().await;
    if recorded.len() < 2 {
        return Err(HarnessError::assertion("fewer than two recorded requests"));
    }
    let first = event_uuids(&recorded[0]);
    let second = event_uuids(&recorded[1]);
    if first != second {
        return Err(HarnessError::assertion(format!(
            "uuids changed on retry: [{}] vs [{}]",
            first.join(", "),
            second.join(", "),
        )));
    }
    Ok(())
}

pub async fn assert_timestamp_preserved_on_retry(_params: &Value, ctx: &TestContext) -> Result<()> {
    let recorded = ctx.store.get_all().await;
    if recorded.len() < 2 {
        return Err(HarnessError::assertion("fewer than two recorded requests"));
    }
    let first = event_timestamps(&recorded[0]);
    let second = event_timestamps(&recorded[1]);
    if first != second {
        return Err(HarnessError::assertion(format!(
            "timestamps changed on retry: [{}] vs [{}]",
            first.join(", "),
            second.join(", "),
        )));
    }
    Ok(())
}
