//! Thin CLI wrapper around the `conformance-harness` library crate.
//! All core contract-execution logic lives in `conformance-harness`.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use conformance_harness::contract::Contract;
use conformance_harness::{AdapterClient, HarnessConfig, Runner, TestContext};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "conformance")]
#[command(author, version, about = "SDK conformance harness CLI", long_about = None)]
struct Cli {
    /// Path to an optional harness config file (harness.toml), layered under env vars.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Starts the mock ingest server and blocks until interrupted.
    ServeMock {
        /// Address to bind, e.g. 127.0.0.1:8765. Defaults to the harness config's
        /// `mock_bind_addr`.
        #[arg(long)]
        bind: Option<String>,
    },
    /// Runs a contract document's suites against a running adapter.
    Run {
        /// Path to the contract document (YAML, may use `!include`).
        contract: PathBuf,
        /// Base URL of the adapter under test, e.g. http://127.0.0.1:9000.
        #[arg(long)]
        adapter_url: String,
        /// Restrict the run to these suite names; omit to run every suite.
        #[arg(long = "suite")]
        suites: Vec<String>,
        /// Active SDK-type tag, used to filter tests carrying `sdk_types`.
        #[arg(long)]
        sdk_type: Option<String>,
    },
    /// Polls an adapter's health endpoint once and reports the result.
    Health {
        /// Base URL of the adapter under test.
        adapter_url: String,
    },
}

fn setup_tracing(filter: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().compact())
        .with(env_filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match HarnessConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load harness config: {err}");
            return ExitCode::FAILURE;
        }
    };
    setup_tracing(&config.log_filter);

    match cli.command {
        Command::ServeMock { bind } => serve_mock(&bind.unwrap_or(config.mock_bind_addr)).await,
        Command::Run {
            contract,
            adapter_url,
            suites,
            sdk_type,
        } => run_contract(&config, &contract, &adapter_url, suites, sdk_type).await,
        Command::Health { adapter_url } => health(&adapter_url).await,
    }
}

async fn serve_mock(bind_addr: &str) -> ExitCode {
    let server = match conformance_harness::start_mock_server(bind_addr).await {
        Ok(server) => server,
        Err(err) => {
            eprintln!("failed to start mock server: {err}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(base_url = %server.base_url(), "mock ingest server ready, press Ctrl+C to stop");
    let _ = tokio::signal::ctrl_c().await;
    server.shutdown().await;
    ExitCode::SUCCESS
}

async fn run_contract(
    config: &HarnessConfig,
    contract_path: &Path,
    adapter_url: &str,
    suites: Vec<String>,
    sdk_type: Option<String>,
) -> ExitCode {
    let contract = match Contract::load(contract_path) {
        Ok(contract) => contract,
        Err(err) => {
            eprintln!("failed to load contract {}: {err}", contract_path.display());
            return ExitCode::FAILURE;
        }
    };

    let mock_server = match conformance_harness::start_mock_server(&config.mock_bind_addr).await {
        Ok(server) => server,
        Err(err) => {
            eprintln!("failed to start mock server: {err}");
            return ExitCode::FAILURE;
        }
    };

    let adapter = match AdapterClient::new(adapter_url.to_string()) {
        Ok(adapter) => adapter,
        Err(err) => {
            eprintln!("failed to build adapter client: {err}");
            mock_server.shutdown().await;
            return ExitCode::FAILURE;
        }
    };

    let timeout = std::time::Duration::from_secs(config.adapter_health_timeout_secs);
    if let Err(err) = adapter.wait_for_health(timeout).await {
        eprintln!("adapter never became healthy: {err}");
        mock_server.shutdown().await;
        return ExitCode::FAILURE;
    }

    let ctx = TestContext::new(
        adapter,
        mock_server.store.clone(),
        mock_server.base_url().to_string(),
        config.default_api_key.clone(),
    );

    let runner = Runner::new(contract, sdk_type);
    let suite_filter = if suites.is_empty() { None } else { Some(suites.as_slice()) };
    let summary = runner.run_suites(&ctx, suite_filter).await;

    mock_server.shutdown().await;

    print_summary(&summary);
    if summary.failed() == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_summary(summary: &conformance_harness::types::TestSummary) {
    for suite in &summary.suites {
        println!("suite {}: {}/{} passed", suite.name, suite.passed(), suite.total());
        for result in &suite.results {
            if result.passed {
                println!("  ok   {} ({}ms)", result.name, result.duration_ms);
            } else {
                println!(
                    "  FAIL {} ({}ms): {}",
                    result.name,
                    result.duration_ms,
                    result.message.as_deref().unwrap_or("no message")
                );
            }
        }
    }
    println!(
        "\n{} total, {} passed, {} failed ({}ms)",
        summary.total(),
        summary.passed(),
        summary.failed(),
        summary.duration_ms
    );
}

async fn health(adapter_url: &str) -> ExitCode {
    let adapter = match AdapterClient::new(adapter_url.to_string()) {
        Ok(adapter) => adapter,
        Err(err) => {
            eprintln!("failed to build adapter client: {err}");
            return ExitCode::FAILURE;
        }
    };

    match adapter.health().await {
        Ok(response) => {
            println!(
                "{} {} (adapter {})",
                response.sdk_name, response.sdk_version, response.adapter_version
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("adapter is not healthy: {err}");
            ExitCode::FAILURE
        }
    }
}
