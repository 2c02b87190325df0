//! Error types for E2E runs

use shopcheck_common::{ErrorKind, Failure};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    /// A domain failure from the taxonomy (obstruction, page state, oracle, ...)
    #[error(transparent)]
    Check(#[from] shopcheck_common::Error),

    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Driver error on '{selector}': {reason}")]
    Driver { selector: String, reason: String },

    #[error("Playwright bridge error: {0}")]
    Bridge(String),

    #[error("Scenario parse error: {0}")]
    ScenarioParse(String),

    #[error("{context}: expected {expected}, observed {observed}")]
    Expectation {
        context: String,
        expected: String,
        observed: String,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Site unreachable after {0} attempts")]
    SiteUnreachable(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;

impl E2eError {
    pub fn driver(selector: impl Into<String>, reason: impl Into<String>) -> Self {
        E2eError::Driver {
            selector: selector.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            E2eError::Check(e) => e.kind(),
            _ => ErrorKind::Harness,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, E2eError::Check(e) if e.is_retryable())
    }

    /// The domain error, if this is one
    pub fn as_check(&self) -> Option<&shopcheck_common::Error> {
        match self {
            E2eError::Check(e) => Some(e),
            _ => None,
        }
    }

    pub fn to_failure(&self) -> Failure {
        match self {
            E2eError::Check(e) => e.to_failure(),
            E2eError::Expectation {
                expected, observed, ..
            } => Failure {
                kind: ErrorKind::Harness,
                message: self.to_string(),
                expected: Some(expected.clone()),
                observed: Some(observed.clone()),
            },
            other => Failure::new(ErrorKind::Harness, other.to_string()),
        }
    }
}
