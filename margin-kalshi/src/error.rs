//! Error types for the Kalshi client

use thiserror::Error;

/// Errors raised by the signer and REST client
#[derive(Debug, Error)]
pub enum KalshiError {
    /// Key load or cryptographic backend failure. Fatal to any signed call;
    /// never retried automatically.
    #[error("signing error: {0}")]
    Signing(String),

    /// Non-2xx response from the API. The caller decides whether to retry.
    #[error("API request failed ({status}): {body}")]
    Api { status: u16, body: String },

    /// Transport-level failure before a response was received
    #[error("network error: {0}")]
    Network(String),

    /// Response body did not match the expected schema
    #[error("parse error: {0}")]
    Parse(String),

    /// Requested ticker unknown to the venue
    #[error("not found: {0}")]
    NotFound(String),
}
