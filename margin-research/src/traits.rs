//! Seams between the examiner and its collaborators
//!
//! The examiner only sees these traits; production wires in the OpenAI
//! oracle, the news service, and the Kalshi client, tests wire in mocks.

use async_trait::async_trait;

use margin_core::{MarketSnapshot, NewsArticle, ResearchContext};
use margin_kalshi::KalshiClient;
use margin_news::NewsService;

use crate::error::Result;
use crate::types::{Judgment, NewsDigest};

/// The three structured-output AI calls of the analysis pipeline
#[async_trait]
pub trait JudgmentOracle: Send + Sync {
    /// Produce a broad news search phrase from market metadata
    async fn construct_search_query(&self, market: &MarketSnapshot) -> Result<String>;

    /// Summarize retrieved articles into a digest
    async fn summarize_news(
        &self,
        market: &MarketSnapshot,
        articles: &[NewsArticle],
    ) -> Result<NewsDigest>;

    /// Emit the final structured judgment for a market
    async fn judge_market(
        &self,
        market: &MarketSnapshot,
        research: &ResearchContext,
    ) -> Result<Judgment>;
}

/// News retrieval seam
#[async_trait]
pub trait ResearchProvider: Send + Sync {
    /// Ranked, deduplicated articles for a search query
    async fn get_relevant_articles(&self, query: &str, days_back: i64) -> Vec<NewsArticle>;
}

#[async_trait]
impl ResearchProvider for NewsService {
    async fn get_relevant_articles(&self, query: &str, days_back: i64) -> Vec<NewsArticle> {
        NewsService::get_relevant_articles(self, query, days_back).await
    }
}

/// Market data seam
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Markets nested under an event, in venue order. An unknown ticker
    /// yields an empty list, not an error.
    async fn event_markets(&self, event_ticker: &str) -> Result<Vec<MarketSnapshot>>;
}

#[async_trait]
impl EventSource for KalshiClient {
    async fn event_markets(&self, event_ticker: &str) -> Result<Vec<MarketSnapshot>> {
        let detail = self.get_event_detail(event_ticker).await?;
        Ok(detail
            .map(|event| event.market_snapshots())
            .unwrap_or_default())
    }
}
