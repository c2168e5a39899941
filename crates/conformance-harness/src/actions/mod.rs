//! The test DSL's closed set of named actions.
//!
//! Registration is explicit: [`build_registry`] inserts every action into one
//! `HashMap` at a single call site. There is no runtime reflection or plugin
//! discovery — adding an action means adding one `insert` call here.

mod assertions;
mod driving;
mod mock_control;
mod support;
mod timing;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::context::TestContext;
use crate::error::Result;

pub type ActionFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
pub type ActionHandler = Box<dyn for<'a> Fn(&'a Value, &'a TestContext) -> ActionFuture<'a> + Send + Sync>;

/// The closed set of actions the contract executor can dispatch by name.
pub struct ActionRegistry {
    handlers: HashMap<&'static str, ActionHandler>,
}

impl ActionRegistry {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ActionHandler> {
        self.handlers.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }
}

macro_rules! register {
    ($map:expr, $name:expr, $func:path) => {
        $map.insert($name, {
            fn wrapper<'a>(params: &'a Value, ctx: &'a TestContext) -> ActionFuture<'a> {
                Box::pin($func(params, ctx))
            }
            Box::new(wrapper) as ActionHandler
        });
    };
}

/// Builds the full action registry. This is the single initialisation site named in
/// the module doc comment above — every action the harness supports is registered
/// here, once.
#[must_use]
pub fn build_registry() -> ActionRegistry {
    let mut handlers: HashMap<&'static str, ActionHandler> = HashMap::new();

    // Adapter driving.
    register!(handlers, "init", driving::init);
    register!(handlers, "capture", driving::capture);
    register!(handlers, "capture_multiple", driving::capture_multiple);
    register!(handlers, "flush", driving::flush);
    register!(handlers, "reset", driving::reset);

    // Mock programming.
    register!(handlers, "configure_mock_responses", mock_control::configure_mock_responses);

    // Timing.
    register!(handlers, "wait", timing::wait);

    // Request-count assertions.
    register!(handlers, "assert_request_count", assertions::counts::assert_request_count);
    register!(handlers, "assert_request_count_gte", assertions::counts::assert_request_count_gte);

    // Event-field assertions.
    register!(handlers, "assert_event_field", assertions::events::assert_event_field);
    register!(handlers, "assert_event_has_field", assertions::events::assert_event_has_field);
    register!(handlers, "assert_event_property", assertions::events::assert_event_property);
    register!(handlers, "assert_event_field_client", assertions::events::assert_event_field_client);

    // Identifier assertions.
    register!(handlers, "assert_uuid_format", assertions::identifiers::assert_uuid_format);
    register!(handlers, "assert_all_uuids_unique", assertions::identifiers::assert_all_uuids_unique);
    register!(handlers, "assert_different_uuids", assertions::identifiers::assert_different_uuids);
    register!(
        handlers,
        "assert_no_duplicate_events_in_batch",
        assertions::identifiers::assert_no_duplicate_events_in_batch
    );
    register!(
        handlers,
        "assert_uuid_preserved_on_retry",
        assertions::identifiers::assert_uuid_preserved_on_retry
    );
    register!(
        handlers,
        "assert_timestamp_preserved_on_retry",
        assertions::identifiers::assert_timestamp_preserved_on_retry
    );

    // Auth/token assertions.
    register!(handlers, "assert_token_present", assertions::auth::assert_token_present);
    register!(handlers, "assert_token_present_client", assertions::auth::assert_token_present_client);

    // Retry-behaviour assertions.
    register!(handlers, "assert_final_success", assertions::retry::assert_final_success);
    register!(handlers, "assert_retry_delay", assertions::retry::assert_retry_delay);
    register!(handlers, "assert_backoff_implemented", assertions::retry::assert_backoff_implemented);
    register!(handlers, "assert_response_status", assertions::retry::assert_response_status);

    // Header/batch-shape assertions.
    register!(handlers, "assert_request_has_header", assertions::headers::assert_request_has_header);
    register!(handlers, "assert_batch_format", assertions::headers::assert_batch_format);

    // Marker.
    register!(handlers, "assert_capture_fails", assertions::marker::assert_capture_fails);

    ActionRegistry { handlers }
}

/// Whether an action name is the `assert_capture_fails` marker the executor looks
/// for when deciding whether to swallow a preceding step's error.
#[must_use]
pub fn is_expect_failure_marker(action_name: &str) -> bool {
    action_name == "assert_capture_fails"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_contains_all_twenty_eight_actions() {
        let registry = build_registry();
        let expected = [
            "init",
            "capture",
            "capture_multiple",
            "flush",
            "reset",
            "configure_mock_responses",
            "wait",
            "assert_request_count",
            "assert_request_count_gte",
            "assert_event_field",
            "assert_event_has_field",
            "assert_event_property",
            "assert_event_field_client",
            "assert_uuid_format",
            "assert_all_uuids_unique",
            "assert_different_uuids",
            "assert_no_duplicate_events_in_batch",
            "assert_uuid_preserved_on_retry",
            "assert_timestamp_preserved_on_retry",
            "assert_token_present",
            "assert_token_present_client",
            "assert_final_success",
            "assert_retry_delay",
            "assert_backoff_implemented",
            "assert_response_status",
            "assert_request_has_header",
            "assert_batch_format",
            "assert_capture_fails",
        ];
        assert_eq!(expected.len(), 28);
        for name in expected {
            assert!(registry.contains(name), "missing action '{name}'");
        }
        assert!(!registry.contains("not_a_real_action"));
    }
}
