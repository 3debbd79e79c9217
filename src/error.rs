// src/error.rs
pub type Result<T, E = TrendError> = std::result::Result<T, E>;

/// Errors raised by the aggregation core.
#[derive(Debug, thiserror::Error)]
pub enum TrendError {
    /// An output item broke a post-condition. Indicates a bug in the aggregator; not recoverable.
    #[error("invariant violation for query {query:?}: {detail}")]
    InvariantViolation { query: String, detail: String },
}

impl TrendError {
    pub(crate) fn invariant(query: &str, detail: impl Into<String>) -> Self {
        Self::InvariantViolation {
            query: query.to_string(),
            detail: detail.into(),
        }
    }
}
