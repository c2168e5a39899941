//! A language-agnostic conformance harness for an event-capture SDK client.
//!
//! The harness wraps each SDK in a thin HTTP adapter (see [`adapter_client`]) and
//! drives it through a declarative contract document (see [`contract`]) against a
//! [`mock_server`] that records every request the SDK makes. [`engine`] executes the
//! contract step by step and [`actions`] supplies the primitives each step can name.

pub mod actions;
pub mod adapter_client;
pub mod config;
pub mod contract;
pub mod context;
pub mod engine;
pub mod error;
pub mod mock_server;
pub mod store;
pub mod types;

pub use adapter_client::AdapterClient;
pub use config::HarnessConfig;
pub use context::TestContext;
pub use engine::{Runner, start_mock_server};
pub use error::{HarnessError, Result};
pub use mock_server::MockIngestServer;
