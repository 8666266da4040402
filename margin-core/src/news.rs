//! News article data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A news article relevant to a market query
///
/// Identity is the article URL; two articles with the same URL are the same
/// article regardless of which retrieval path produced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsArticle {
    /// Article headline
    pub title: String,
    /// Brief description/excerpt (empty when the source provides none)
    pub description: String,
    /// Article URL (unique key)
    pub url: String,
    /// Name of the publishing source
    pub source_name: String,
    /// Publication timestamp
    pub published_at: DateTime<Utc>,
    /// Confidence that the article pertains to the query (0.0 - 1.0)
    pub relevance_score: f64,
}
