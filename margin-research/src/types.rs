//! Oracle output schemas
//!
//! Each oracle call declares an output schema; raw payloads are parsed into
//! these structs and then validated (ranges, enums, required fields) before
//! any domain entity is constructed. Malformed oracle output is a stage
//! failure, never silently accepted.

use serde::{Deserialize, Serialize};

use margin_core::Recommendation;

use crate::error::{ResearchError, Result};

/// Summarized research over the retrieved articles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsDigest {
    pub summary: String,
    pub key_points: Vec<String>,
    /// News sentiment toward the event, -1.0 to +1.0
    pub market_sentiment: f64,
}

impl NewsDigest {
    /// Validate the sentiment range
    pub fn validate(self) -> Result<Self> {
        if !(-1.0..=1.0).contains(&self.market_sentiment) {
            return Err(ResearchError::Validation(format!(
                "market_sentiment {} outside [-1, 1]",
                self.market_sentiment
            )));
        }
        Ok(self)
    }
}

/// Raw query-construction output
#[derive(Debug, Deserialize)]
pub struct RawSearchQuery {
    pub search_query: String,
}

/// Raw final-judgment output, before validation
#[derive(Debug, Deserialize)]
pub struct RawJudgment {
    pub estimated_probability: f64,
    pub confidence_score: f64,
    pub reasoning: String,
    #[serde(default)]
    pub sources: Vec<String>,
    pub recommendation: String,
}

/// Validated judgment fields, ready to become a `MarginAnalysis`
#[derive(Debug, Clone)]
pub struct Judgment {
    pub estimated_probability: f64,
    pub confidence_score: f64,
    pub reasoning: String,
    pub sources: Vec<String>,
    pub recommendation: Recommendation,
}

impl RawJudgment {
    /// Range-check the numeric fields and parse the recommendation against
    /// the closed set
    pub fn validate(self) -> Result<Judgment> {
        if !(0.0..=1.0).contains(&self.estimated_probability) {
            return Err(ResearchError::Validation(format!(
                "estimated_probability {} outside [0, 1]",
                self.estimated_probability
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence_score) {
            return Err(ResearchError::Validation(format!(
                "confidence_score {} outside [0, 1]",
                self.confidence_score
            )));
        }
        let recommendation: Recommendation = self
            .recommendation
            .parse()
            .map_err(|e: margin_core::InvalidRecommendation| {
                ResearchError::Validation(e.to_string())
            })?;

        Ok(Judgment {
            estimated_probability: self.estimated_probability,
            confidence_score: self.confidence_score,
            reasoning: self.reasoning,
            sources: self.sources,
            recommendation,
        })
    }
}
