//! Structured analysis output types

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::news::NewsArticle;

/// Closed-set trading signal derived from comparing estimated probability to
/// market price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    #[serde(rename = "BID YES")]
    BidYes,
    #[serde(rename = "BID NO")]
    BidNo,
    #[serde(rename = "DISREGARD")]
    Disregard,
}

/// Error returned when a recommendation string is outside the closed set
#[derive(Debug, Error)]
#[error("invalid recommendation: {0}")]
pub struct InvalidRecommendation(pub String);

impl FromStr for Recommendation {
    type Err = InvalidRecommendation;

    /// Case-insensitive parse, normalized to the canonical uppercase form.
    /// Values outside the closed set are rejected, never coerced.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BID YES" => Ok(Recommendation::BidYes),
            "BID NO" => Ok(Recommendation::BidNo),
            "DISREGARD" => Ok(Recommendation::Disregard),
            _ => Err(InvalidRecommendation(s.to_string())),
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Recommendation::BidYes => "BID YES",
            Recommendation::BidNo => "BID NO",
            Recommendation::Disregard => "DISREGARD",
        };
        f.write_str(s)
    }
}

/// Research gathered for one market analysis
///
/// Built once per market, consumed immediately by the final judgment stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchContext {
    /// Articles ordered by relevance, highest first
    pub articles: Vec<NewsArticle>,
    /// AI summary of the retrieved news
    pub summary: String,
    /// Key points extracted from the research
    pub key_points: Vec<String>,
    /// News sentiment toward the event, -1.0 (very negative) to +1.0
    pub market_sentiment: f64,
}

/// Terminal output of the analysis pipeline for one market
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarginAnalysis {
    /// Ticker of the analyzed market
    pub market_ticker: String,
    /// Current YES ask price in dollars
    pub current_yes_ask: Decimal,
    /// AI-estimated probability of the event (0.0 - 1.0)
    pub estimated_probability: f64,
    /// Confidence in the estimate (0.0 - 1.0)
    pub confidence_score: f64,
    /// Detailed reasoning behind the estimate
    pub reasoning: String,
    /// Sources cited by the analysis
    pub sources: Vec<String>,
    /// Trading recommendation
    pub recommendation: Recommendation,
    /// The research that fed the judgment
    pub research_context: ResearchContext,
}
