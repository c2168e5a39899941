//! Error hierarchy surfaced by the contract executor.
//!
//! Every variant's `Display` message is exactly what ends up in
//! [`crate::types::TestResult::message`] — no separate formatting step re-renders it.

/// Errors raised while executing a contract step.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("assertion failed: {0}")]
    AssertionFailure(String),

    #[error("unknown action '{name}'")]
    UnknownAction { name: String },

    #[error("step '{action}' is missing required parameter '{param}'")]
    MissingParam { action: String, param: String },

    #[error("bad contract: {0}")]
    BadContract(String),

    #[error("transport error: {0}")]
    TransportError(String),
}

impl HarnessError {
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailure(message.into())
    }

    #[must_use]
    pub fn unknown_action(name: impl Into<String>) -> Self {
        Self::UnknownAction { name: name.into() }
    }

    #[must_use]
    pub fn missing_param(action: impl Into<String>, param: impl Into<String>) -> Self {
        Self::MissingParam {
            action: action.into(),
            param: param.into(),
        }
    }

    #[must_use]
    pub fn bad_contract(message: impl Into<String>) -> Self {
        Self::BadContract(message.into())
    }

    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::TransportError(message.into())
    }

    /// Whether this error should be swallowed when the following step is
    /// `assert_capture_fails`.
    #[must_use]
    pub fn is_expected_failure_marker_eligible(&self) -> bool {
        !matches!(self, Self::UnknownAction { .. } | Self::BadContract(_))
    }
}

impl From<reqwest::Error> for HarnessError {
    fn from(err: reqwest::Error) -> Self {
        Self::TransportError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HarnessError>;
