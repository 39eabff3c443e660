//! Error types for browser scenarios

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Playwright not found. Install with: npm install playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Driver command '{op}' failed for '{selector}': {reason}")]
    Command {
        op: String,
        selector: String,
        reason: String,
    },

    #[error("Scenario spec parse error: {0}")]
    SpecParse(String),

    #[error("Step failed: {step} - {reason}")]
    StepFailed { step: String, reason: String },

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Base URL unreachable after {attempts} attempt(s): {url}")]
    Unreachable { url: String, attempts: u32 },

    #[error(transparent)]
    Check(#[from] gridwatch_common::Error),

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

impl From<E2eError> for gridwatch_common::Error {
    fn from(e: E2eError) -> Self {
        match e {
            E2eError::Check(inner) => inner,
            other => gridwatch_common::Error::Source(other.to_string()),
        }
    }
}
