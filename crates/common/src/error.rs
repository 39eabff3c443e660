//! Error types for Gridwatch

use thiserror::Error;

/// Result type alias using Gridwatch Error
pub type Result<T> = std::result::Result<T, Error>;

/// Gridwatch error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Timeout waiting for {what} after {elapsed_ms} ms{}", last_error_suffix(.last_error))]
    Timeout {
        what: String,
        elapsed_ms: u64,
        last_error: Option<String>,
    },

    #[error("{what} '{query}' not found. Candidates: {}", .available.join(", "))]
    NotFound {
        what: String,
        query: String,
        available: Vec<String>,
    },

    #[error("Ordering violation in '{field}' at index {index}: '{previous}' then '{current}'")]
    OrderingViolation {
        field: String,
        index: usize,
        previous: String,
        current: String,
    },

    #[error("Insufficient data in '{field}': {non_empty} of {total} values non-empty (required fraction {required_fraction:.2})")]
    InsufficientData {
        field: String,
        non_empty: usize,
        total: usize,
        required_fraction: f64,
    },

    #[error("Collection exhausted: collected {collected} of {target} records")]
    CollectionExhausted { collected: usize, target: usize },

    #[error("Page source error: {0}")]
    Source(String),
}

fn last_error_suffix(last_error: &Option<String>) -> String {
    match last_error {
        Some(e) => format!(" (last error: {})", e),
        None => String::new(),
    }
}

impl Error {
    /// Build a `NotFound` error from any list of alternatives
    pub fn not_found<I, S>(what: &str, query: &str, available: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Error::NotFound {
            what: what.to_string(),
            query: query.to_string(),
            available: available.into_iter().map(Into::into).collect(),
        }
    }
}
