//! Error types for news operations

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NewsError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Rate limited by news API")]
    RateLimited,

    #[error("Parse error: {0}")]
    Parse(String),
}
