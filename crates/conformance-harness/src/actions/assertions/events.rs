//! Assertions over the fields of recorded events.

use serde_json::Value;

use crate::context::TestContext;
use crate::error::{HarnessError, Result};

use crate::actions::support::{first_event, opt_bool, require_str};

pub async fn assert_event_field(params: &Value, ctx: &TestContext) -> Result<()> {
    let field = require_str(params, "assert_event_field", "field")?;
    let expected = params
        .get("expected")
        .ok_or_else(|| HarnessError::missing_param("assert_event_field", "expected"))?;

    let recorded = ctx.store.get_all().await;
    let event = first_event(&recorded)
        .ok_or_else(|| HarnessError::assertion("no recorded event to inspect"))?;
    let actual = event
        .get(field)
        .ok_or_else(|| HarnessError::assertion(format!("event has no field '{field}'")))?;

    if actual != expected {
        return Err(HarnessError::assertion(format!(
            "field '{field}' expected {expected}, got {actual}"
        )));
    }
    Ok(())
}

pub async fn assert_event_has_field(params: &Value, ctx: &TestContext) -> Result<()> {
    let field = require_str(params, "assert_event_has_field", "field")?;
    let recorded = ctx.store.get_all().await;
    let event = first_event(&recorded)
        .ok_or_else(|| HarnessError::assertion("no recorded event to inspect"))?;

    if event.get(field).is_none() {
        return Err(HarnessError::assertion(format!("event is missing field '{field}'")));
    }
    Ok(())
}

pub async fn assert_event_property(params: &Value, ctx: &TestContext) -> Result<()> {
    let property = require_str(params, "assert_event_property", "property")?;
    let recorded = ctx.store.get_all().await;
    let event = first_event(&recorded)
        .ok_or_else(|| HarnessError::assertion("no recorded event to inspect"))?;
    let actual = event.get("properties").and_then(|p| p.get(property));

    if let Some(exists) = opt_bool(params, "exists") {
        let present = actual.is_some();
        if present != exists {
            return Err(HarnessError::assertion(format!(
                "expected property '{property}' existence to be {exists}, was {present}"
            )));
        }
        return Ok(());
    }

    let expected = params
        .get("expected")
        .ok_or_else(|| HarnessError::missing_param("assert_event_property", "expected"))?;
    match actual {
        Some(actual) if actual == expected => Ok(()),
        Some(actual) => Err(HarnessError::assertion(format!(
            "property '{property}' expected {expected}, got {actual}"
        ))),
        None => Err(HarnessError::assertion(format!("event has no property '{property}'"))),
    }
}

/// The client-SDK-shaped variant: `distinct_id` is looked up under the PostHog
/// `$distinct_id`/`distinct_id` property keys before falling back to top-level or a
/// `$`-prefixed property for any other field.
pub async fn assert_event_field_client(params: &Value, ctx: &TestContext) -> Result<()> {
    let field = require_str(params, "assert_event_field_client", "field")?;
    let expected = params
        .get("expected")
        .ok_or_else(|| HarnessError::missing_param("assert_event_field_client", "expected"))?;

    let recorded = ctx.store.get_all().await;
    let event = first_event(&recorded)
        .ok_or_else(|| HarnessError::assertion("no recorded event to inspect"))?;

    let actual = resolve_client_field(event, field)
        .ok_or_else(|| HarnessError::assertion(format!("could not resolve field '{field}' on event")))?;

    if actual != expected {
        return Err(HarnessError::assertion(format!(
            "field '{field}' expected {expected}, got {actual}"
        )));
    }
    Ok(())
}

fn resolve_client_field<'a>(event: &'a Value, field: &str) -> Option<&'a Value> {
    if field == "distinct_id" {
        let properties = event.get("properties");
        return properties
            .and_then(|p| p.get("$distinct_id"))
            .or_else(|| properties.and_then(|p| p.get("distinct_id")));
    }

    event
        .get(field)
        .or_else(|| event.get("properties").and_then(|p| p.get(format!("${field}"))))
        .or_else(|| event.get("properties").and_then(|p| p.get(field)))
}
