//! Contract executor and runner: drives every suite's tests through a full reset,
//! step-by-step execution with the `assert_capture_fails` swallow rule, and
//! aggregates the results into a summary.

use std::time::Instant;

use serde_json::Value;

use crate::actions::{ActionRegistry, build_registry, is_expect_failure_marker};
use crate::contract::{Contract, Step, Test};
use crate::context::TestContext;
use crate::error::HarnessError;
use crate::mock_server::MockIngestServer;
use crate::types::{TestResult, TestSuiteResult, TestSummary};

/// Binds and serves the mock ingest server in the background. One of the two
/// programmatic entry points the harness exposes to any front-end.
///
/// # Errors
///
/// Returns an error if `bind_addr` cannot be bound.
pub async fn start_mock_server(bind_addr: &str) -> anyhow::Result<MockIngestServer> {
    MockIngestServer::start(bind_addr).await
}

/// Runs a loaded contract's suites against an adapter, returning a [`TestSummary`].
/// The other of the two programmatic entry points the harness exposes.
pub struct Runner {
    contract: Contract,
    registry: ActionRegistry,
    sdk_type: Option<String>,
}

impl Runner {
    #[must_use]
    pub fn new(contract: Contract, sdk_type: Option<String>) -> Self {
        Self {
            contract,
            registry: build_registry(),
            sdk_type,
        }
    }

    /// Runs every suite named in `suite_names`, or all suites if `None`.
    pub async fn run_suites(&self, ctx: &TestContext, suite_names: Option<&[String]>) -> TestSummary {
        let start = Instant::now();
        let mut summary = TestSummary::default();

        let mut names: Vec<&String> = self.contract.test_suites().keys().collect();
        names.sort();

        for suite_name in names {
            if let Some(wanted) = suite_names
                && !wanted.iter().any(|n| n == suite_name)
            {
                continue;
            }

            let Some(suite) = self.contract.test_suites().get(suite_name) else {
                continue;
            };

            let mut result = TestSuiteResult::new(suite_name.clone());
            let mut category_names: Vec<&String> = suite.categories.keys().collect();
            category_names.sort();

            for category_name in category_names {
                let Some(category) = suite.categories.get(category_name) else {
                    continue;
                };
                for test in &category.tests {
                    if !self.sdk_type_matches(test) {
                        continue;
                    }
                    result.results.push(self.run_test(ctx, test).await);
                }
            }

            summary.add_suite(result);
        }

        summary.duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        summary
    }

    fn sdk_type_matches(&self, test: &Test) -> bool {
        match (&test.sdk_types, &self.sdk_type) {
            (None, _) => true,
            (Some(_), None) => true,
            (Some(allowed), Some(active)) => allowed.iter().any(|t| t == active),
        }
    }

    async fn run_test(&self, ctx: &TestContext, test: &Test) -> TestResult {
        let start = Instant::now();

        if let Err(err) = ctx.reset().await {
            return TestResult {
                name: test.name.clone(),
                passed: false,
                duration_ms: elapsed_ms(start),
                message: Some(format!("reset before test failed: {err}")),
                details: None,
            };
        }

        let outcome = self.run_steps(ctx, &test.steps).await;

        TestResult {
            name: test.name.clone(),
            passed: outcome.is_none(),
            duration_ms: elapsed_ms(start),
            message: outcome,
            details: None,
        }
    }

    /// Runs every step in order. Returns `None` on success, or `Some(message)` for
    /// the first unswallowed failure.
    async fn run_steps(&self, ctx: &TestContext, steps: &[Step]) -> Option<String> {
        for (index, step) in steps.iter().enumerate() {
            let (action_name, params) = self.contract.resolve_step(step);
            let result = self.dispatch(&action_name, &params, ctx).await;

            if let Err(err) = result {
                let next_is_marker = steps
                    .get(index + 1)
                    .is_some_and(|next| is_expect_failure_marker(&next.action));

                if next_is_marker && err.is_expected_failure_marker_eligible() {
                    continue;
                }
                return Some(err.to_string());
            }
        }
        None
    }

    async fn dispatch(&self, action_name: &str, params: &Value, ctx: &TestContext) -> crate::error::Result<()> {
        let Some(handler) = self.registry.get(action_name) else {
            return Err(HarnessError::unknown_action(action_name));
        };
        handler(params, ctx).await
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter_client::AdapterClient;
    use crate::contract::Contract;
    use crate::mock_server::MockIngestServer;
    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;

    async fn write_contract(dir: &tempfile::TempDir, contents: &str) -> Contract {
        let path = dir.path().join("contract.yaml");
        std::fs::write(&path, contents).unwrap();
        Contract::load(&path).unwrap()
    }

    #[tokio::test]
    async fn single_test_passes_when_assertions_hold() {
        let mock = MockIngestServer::start("127.0.0.1:0").await.unwrap();
        let adapter_server = MockServer::start();
        adapter_server.mock(|when, then| {
            when.method(GET).path("/health");
            then.status(200).json_body(serde_json::json!({
                "sdk_name": "s", "sdk_version": "1", "adapter_version": "1"
            }));
        });
        adapter_server.mock(|when, then| {
            when.method(POST).path("/reset");
            then.status(200).json_body(serde_json::json!({"success": true}));
        });
        adapter_server.mock(|when, then| {
            when.method(POST).path("/init");
            then.status(200).json_body(serde_json::json!({"success": true}));
        });
        adapter_server.mock(|when, then| {
            when.method(POST).path("/capture");
            then.status(200).json_body(serde_json::json!({"success": true, "uuid": "11111111-1111-1111-1111-111111111111"}));
        });

        let adapter = AdapterClient::new(adapter_server.base_url()).unwrap();
        let ctx = TestContext::new(adapter, mock.store.clone(), mock.base_url().to_string(), "phc_test_key".to_string());

        let dir = tempfile::tempdir().unwrap();
        let contract = write_contract(
            &dir,
            r#"
test_suites:
  basic:
    categories:
      capture:
        tests:
          - name: single_capture
            steps:
              - action: init
              - action: capture
                params:
                  distinct_id: u1
                  event: login
"#,
        ).await;

        let runner = Runner::new(contract, None);
        let summary = runner.run_suites(&ctx, None).await;

        assert_eq!(summary.total(), 1);
        assert_eq!(summary.passed(), 1, "{:?}", summary.suites[0].results[0].message);

        mock.shutdown().await;
    }

    #[tokio::test]
    async fn assert_capture_fails_swallows_the_preceding_error() {
        let mock = MockIngestServer::start("127.0.0.1:0").await.unwrap();
        let adapter_server = MockServer::start();
        adapter_server.mock(|when, then| {
            when.method(POST).path("/reset");
            then.status(200).json_body(serde_json::json!({"success": true}));
        });
        adapter_server.mock(|when, then| {
            when.method(POST).path("/capture");
            then.status(400).json_body(serde_json::json!({"error": "validation failed"}));
        });

        let adapter = AdapterClient::new(adapter_server.base_url()).unwrap();
        let ctx = TestContext::new(adapter, mock.store.clone(), mock.base_url().to_string(), "phc_test_key".to_string());

        let dir = tempfile::tempdir().unwrap();
        let contract = write_contract(
            &dir,
            r#"
test_suites:
  basic:
    categories:
      capture:
        tests:
          - name: expected_failure
            steps:
              - action: capture
                params:
                  distinct_id: u1
                  event: bad
              - action: assert_capture_fails
"#,
        ).await;

        let runner = Runner::new(contract, None);
        let summary = runner.run_suites(&ctx, None).await;

        assert_eq!(summary.passed(), 1);

        mock.shutdown().await;
    }

    #[tokio::test]
    async fn unknown_action_fails_the_test_without_aborting_the_run() {
        let mock = MockIngestServer::start("127.0.0.1:0").await.unwrap();
        let adapter_server = MockServer::start();
        adapter_server.mock(|when, then| {
            when.method(POST).path("/reset");
            then.status(200).json_body(serde_json::json!({"success": true}));
        });

        let adapter = AdapterClient::new(adapter_server.base_url()).unwrap();
        let ctx = TestContext::new(adapter, mock.store.clone(), mock.base_url().to_string(), "phc_test_key".to_string());

        let dir = tempfile::tempdir().unwrap();
        let contract = write_contract(
            &dir,
            r#"
test_suites:
  basic:
    categories:
      capture:
        tests:
          - name: typo_action
            steps:
              - action: not_a_real_action
"#,
        ).await;

        let runner = Runner::new(contract, None);
        let summary = runner.run_suites(&ctx, None).await;

        assert_eq!(summary.total(), 1);
        assert_eq!(summary.failed(), 1);
        assert!(summary.suites[0].results[0].message.as_ref().unwrap().contains("unknown action"));

        mock.shutdown().await;
    }
}
