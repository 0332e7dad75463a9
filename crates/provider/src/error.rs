//! Provider boundary errors.

use thiserror::Error;

/// Failure modes of a Provider call.
///
/// `Unavailable` covers transport problems (connect failure, bounded timeout,
/// 5xx) and is retryable by the caller; `Rejected` is an explicit Provider
/// decision and is not.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Transport-level failure or timeout; the request may never have reached
    /// the Provider.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The Provider processed the request and said no (e.g. insufficient
    /// reseller balance, invalid target). `note` is the Provider's own text.
    #[error("provider rejected request: {note}")]
    Rejected { note: String },

    /// The Provider reports the requested entity does not exist
    /// (unknown account, unknown transaction).
    #[error("not found at provider")]
    NotFound,

    /// The response did not match the endpoint's documented shape.
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return ProviderError::Unavailable("request timed out".to_string());
        }
        if err.is_decode() {
            return ProviderError::Malformed(err.to_string());
        }
        ProviderError::Unavailable(err.to_string())
    }
}
