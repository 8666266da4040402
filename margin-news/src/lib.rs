//! News retrieval for the Margin Scanner
//!
//! Fetches candidate articles from NewsAPI, scores them against the search
//! query, persists them into the article store, and merges in semantically
//! similar historical coverage.

pub mod error;
pub mod service;

pub use error::NewsError;
pub use service::NewsService;
