//! Transport failure classification.
//!
//! The core never retries; it only classifies. Callers pattern-match on
//! the variants (timeout is retriable, everything else is fatal for the
//! pass) instead of parsing strings.

use thiserror::Error;

/// Failure of one controller exchange.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Controller endpoint could not be resolved. Indicates
    /// misconfiguration; fatal for the pass, never retried silently.
    #[error("controller endpoint resolution failed: {0}")]
    Endpoint(String),

    /// The exchange timed out, either reported by the controller
    /// (HTTP 408/504) or by the local client. Retriable by the caller.
    #[error("controller request timed out: {0}")]
    Timeout(String),

    /// The controller answered with a non-success status.
    #[error("controller returned HTTP {status}: {diagnostics}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response diagnostics captured for operator investigation.
        diagnostics: String,
    },

    /// The exchange failed below the HTTP layer.
    #[error("controller request failed: {0}")]
    Http(String),

    /// A request payload could not be serialized.
    #[error("failed to encode controller request: {0}")]
    Encode(String),

    /// A response body could not be deserialized.
    #[error("failed to decode controller document: {0}")]
    Decode(String),

    /// The exchange was cancelled by the caller.
    #[error("controller exchange cancelled")]
    Cancelled,
}

impl TransportError {
    /// True for the distinguished retriable timeout classification.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }
}
