//! Process configuration loaded from the environment

use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

/// Configuration error; the only error class allowed to abort startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(String),

    #[error("invalid value for {name}: {value}")]
    InvalidVar { name: String, value: String },
}

/// Process-wide settings, loaded once at startup and never mutated
#[derive(Debug, Clone)]
pub struct Settings {
    /// Kalshi API access key identifier
    pub kalshi_key_id: String,
    /// Path to the RSA private key (PEM) used for request signing
    pub kalshi_private_key_path: PathBuf,
    /// OpenAI API key (oracle + embeddings)
    pub openai_api_key: String,
    /// NewsAPI key
    pub news_api_key: String,
    /// Maximum number of market analysis pipelines in flight at once
    pub max_concurrent_analyses: usize,
    /// Minimum confidence for a recommendation to be considered actionable
    pub confidence_threshold: f64,
    /// News search lookback window in days
    pub news_lookback_days: i64,
    /// Path to the SQLite article store
    pub article_db_path: PathBuf,
}

impl Settings {
    /// Load settings from the environment, reading `.env` if present.
    ///
    /// Missing credentials are a hard startup failure; tunables fall back to
    /// their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is fine; real env vars take precedence anyway.
        dotenvy::dotenv().ok();

        let settings = Self {
            kalshi_key_id: required("KALSHI_API_KEY_ID")?,
            kalshi_private_key_path: PathBuf::from(required("KALSHI_PRIVATE_KEY_PATH")?),
            openai_api_key: required("OPENAI_API_KEY")?,
            news_api_key: required("NEWS_API_KEY")?,
            max_concurrent_analyses: parsed("MAX_CONCURRENT_ANALYSES", 5)?,
            confidence_threshold: parsed("CONFIDENCE_THRESHOLD", 0.7)?,
            news_lookback_days: parsed("NEWS_LOOKBACK_DAYS", 30)?,
            article_db_path: std::env::var("ARTICLE_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("news_articles.db")),
        };

        // Secrets are never logged; the capped key id prefix is the one
        // sanctioned diagnostic.
        debug!(
            key_id_prefix = %key_id_prefix(&settings.kalshi_key_id),
            max_concurrent_analyses = settings.max_concurrent_analyses,
            news_lookback_days = settings.news_lookback_days,
            "loaded settings"
        );

        Ok(settings)
    }
}

/// First 8 characters of a key identifier, for diagnostics only
pub fn key_id_prefix(key_id: &str) -> &str {
    let end = key_id
        .char_indices()
        .nth(8)
        .map(|(i, _)| i)
        .unwrap_or(key_id.len());
    &key_id[..end]
}

fn required(name: &str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingVar(name.to_string()))
}

fn parsed<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => {
            value.parse().map_err(|_| ConfigError::InvalidVar {
                name: name.to_string(),
                value,
            })
        }
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_id_prefix_caps_at_eight_chars() {
        assert_eq!(key_id_prefix("abcdef1234567890"), "abcdef12");
        assert_eq!(key_id_prefix("short"), "short");
        assert_eq!(key_id_prefix(""), "");
    }
}
