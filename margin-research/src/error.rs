//! Error types for the research pipeline

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ResearchError>;

#[derive(Debug, Error)]
pub enum ResearchError {
    #[error("Oracle error: {0}")]
    Oracle(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Market API error: {0}")]
    Kalshi(#[from] margin_kalshi::KalshiError),
}
