//! Concurrent market examination
//!
//! Per market the pipeline runs four sequential stages: construct a search
//! query, retrieve news, summarize it, and judge the market. Events fan out
//! one task per ticker and one task per market; all markets across all
//! events share a single counting gate bounding the number of in-flight
//! pipelines.

use std::sync::Arc;

use futures::future::join_all;
use indexmap::IndexMap;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use margin_core::{MarginAnalysis, MarketSnapshot, ResearchContext};

use crate::error::Result;
use crate::traits::{EventSource, JudgmentOracle, ResearchProvider};

pub const DEFAULT_MAX_CONCURRENT_ANALYSES: usize = 5;
pub const DEFAULT_NEWS_LOOKBACK_DAYS: i64 = 30;

/// Orchestrates concurrent market analysis pipelines
pub struct MarginExaminer {
    events: Arc<dyn EventSource>,
    research: Arc<dyn ResearchProvider>,
    oracle: Arc<dyn JudgmentOracle>,
    gate: Arc<Semaphore>,
    news_lookback_days: i64,
}

impl MarginExaminer {
    pub fn new(
        events: Arc<dyn EventSource>,
        research: Arc<dyn ResearchProvider>,
        oracle: Arc<dyn JudgmentOracle>,
        max_concurrent_analyses: usize,
        news_lookback_days: i64,
    ) -> Self {
        Self {
            events,
            research,
            oracle,
            gate: Arc::new(Semaphore::new(max_concurrent_analyses)),
            news_lookback_days,
        }
    }

    /// Examine every market under each event ticker.
    ///
    /// Result keys follow ticker submission order; each event's analyses
    /// follow the order markets appeared in the fetched event detail. A
    /// failed market is logged and excluded, never cancelling its siblings;
    /// an event with no reachable markets maps to an empty list.
    #[instrument(skip(self), fields(events = event_tickers.len()))]
    pub async fn examine_events(
        &self,
        event_tickers: &[String],
    ) -> IndexMap<String, Vec<MarginAnalysis>> {
        let analyses = join_all(
            event_tickers
                .iter()
                .map(|ticker| self.examine_event(ticker)),
        )
        .await;

        let mut results = IndexMap::new();
        for (ticker, event_analyses) in event_tickers.iter().zip(analyses) {
            results.insert(ticker.clone(), event_analyses);
        }
        info!(events = results.len(), "examination complete");
        results
    }

    /// Analyze all markets under one event
    async fn examine_event(&self, event_ticker: &str) -> Vec<MarginAnalysis> {
        let markets = match self.events.event_markets(event_ticker).await {
            Ok(markets) => markets,
            Err(e) => {
                warn!(event = %event_ticker, error = %e, "failed to fetch event markets");
                return Vec::new();
            }
        };
        if markets.is_empty() {
            debug!(event = %event_ticker, "event has no markets");
            return Vec::new();
        }

        let analyses = join_all(markets.iter().map(|market| self.analyze_gated(market))).await;

        analyses
            .into_iter()
            .zip(markets)
            .filter_map(|(result, market)| match result {
                Ok(analysis) => Some(analysis),
                Err(e) => {
                    warn!(market = %market.ticker, error = %e, "market analysis failed, excluding");
                    None
                }
            })
            .collect()
    }

    /// Run one pipeline behind the shared concurrency gate.
    ///
    /// The permit is acquired before the first stage and held for the whole
    /// pipeline; dropping it on any exit path releases the slot.
    async fn analyze_gated(&self, market: &MarketSnapshot) -> Result<MarginAnalysis> {
        let _permit = self
            .gate
            .clone()
            .acquire_owned()
            .await
            .expect("analysis gate closed");
        self.analyze_market(market).await
    }

    /// The four-stage pipeline for a single market
    async fn analyze_market(&self, market: &MarketSnapshot) -> Result<MarginAnalysis> {
        let query = self.oracle.construct_search_query(market).await?;
        debug!(market = %market.ticker, %query, "constructed search query");

        let articles = self
            .research
            .get_relevant_articles(&query, self.news_lookback_days)
            .await;

        // The summarization stage always runs; with zero articles the oracle
        // is told so explicitly rather than being skipped.
        let digest = self.oracle.summarize_news(market, &articles).await?;

        let research_context = ResearchContext {
            articles,
            summary: digest.summary,
            key_points: digest.key_points,
            market_sentiment: digest.market_sentiment,
        };

        let judgment = self.oracle.judge_market(market, &research_context).await?;

        Ok(MarginAnalysis {
            market_ticker: market.ticker.clone(),
            current_yes_ask: market.yes_ask_dollars(),
            estimated_probability: judgment.estimated_probability,
            confidence_score: judgment.confidence_score,
            reasoning: judgment.reasoning,
            sources: judgment.sources,
            recommendation: judgment.recommendation,
            research_context,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use margin_core::{NewsArticle, Recommendation};

    use crate::error::ResearchError;
    use crate::types::{Judgment, NewsDigest};

    fn market(ticker: &str) -> MarketSnapshot {
        MarketSnapshot {
            ticker: ticker.to_string(),
            title: format!("Market {ticker}"),
            category: Some("Economics".to_string()),
            rules: None,
            yes_bid: Decimal::from(45),
            yes_ask: Decimal::from(47),
            no_bid: Decimal::from(53),
            no_ask: Decimal::from(55),
            last_price: Decimal::from(46),
            volume: 100,
            status: Some("open".to_string()),
        }
    }

    struct MockEvents {
        markets_per_event: usize,
    }

    #[async_trait]
    impl EventSource for MockEvents {
        async fn event_markets(&self, event_ticker: &str) -> Result<Vec<MarketSnapshot>> {
            Ok((0..self.markets_per_event)
                .map(|i| market(&format!("{event_ticker}-M{i}")))
                .collect())
        }
    }

    struct MockResearch;

    #[async_trait]
    impl ResearchProvider for MockResearch {
        async fn get_relevant_articles(&self, _query: &str, _days_back: i64) -> Vec<NewsArticle> {
            vec![NewsArticle {
                title: "Some coverage".to_string(),
                description: "Details".to_string(),
                url: "https://example.com/a".to_string(),
                source_name: "Test Wire".to_string(),
                published_at: chrono::Utc::now(),
                relevance_score: 0.8,
            }]
        }
    }

    /// Oracle that tracks how many pipelines are in flight and can fail
    /// judgment for selected tickers
    struct MockOracle {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        fail_judgment_for: Vec<String>,
    }

    impl MockOracle {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                fail_judgment_for: Vec::new(),
            }
        }

        fn failing_for(tickers: &[&str]) -> Self {
            Self {
                fail_judgment_for: tickers.iter().map(|t| t.to_string()).collect(),
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl JudgmentOracle for MockOracle {
        async fn construct_search_query(&self, _market: &MarketSnapshot) -> Result<String> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            // Keep the pipeline in flight long enough for overlap
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok("test query".to_string())
        }

        async fn summarize_news(
            &self,
            _market: &MarketSnapshot,
            _articles: &[NewsArticle],
        ) -> Result<NewsDigest> {
            Ok(NewsDigest {
                summary: "summary".to_string(),
                key_points: vec!["point".to_string()],
                market_sentiment: 0.2,
            })
        }

        async fn judge_market(
            &self,
            market: &MarketSnapshot,
            _research: &ResearchContext,
        ) -> Result<Judgment> {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if self.fail_judgment_for.contains(&market.ticker) {
                return Err(ResearchError::Validation("synthetic failure".to_string()));
            }
            Ok(Judgment {
                estimated_probability: 0.6,
                confidence_score: 0.8,
                reasoning: "reasoning".to_string(),
                sources: vec!["https://example.com/a".to_string()],
                recommendation: Recommendation::BidYes,
            })
        }
    }

    fn examiner(oracle: Arc<MockOracle>, markets_per_event: usize, gate: usize) -> MarginExaminer {
        MarginExaminer::new(
            Arc::new(MockEvents { markets_per_event }),
            Arc::new(MockResearch),
            oracle,
            gate,
            DEFAULT_NEWS_LOOKBACK_DAYS,
        )
    }

    #[tokio::test]
    async fn concurrency_gate_bounds_in_flight_pipelines() {
        let oracle = Arc::new(MockOracle::new());
        let examiner = examiner(oracle.clone(), 20, 5);

        let results = examiner.examine_events(&["EVENT-A".to_string()]).await;

        assert_eq!(results["EVENT-A"].len(), 20);
        assert!(
            oracle.max_in_flight.load(Ordering::SeqCst) <= 5,
            "observed {} concurrent pipelines",
            oracle.max_in_flight.load(Ordering::SeqCst)
        );
    }

    #[tokio::test]
    async fn failed_market_is_excluded_without_cancelling_siblings() {
        let oracle = Arc::new(MockOracle::failing_for(&["EVENT-A-M1"]));
        let examiner = examiner(oracle, 4, 5);

        let results = examiner.examine_events(&["EVENT-A".to_string()]).await;

        // The event is still present with the three surviving analyses
        let analyses = &results["EVENT-A"];
        assert_eq!(analyses.len(), 3);
        assert!(analyses.iter().all(|a| a.market_ticker != "EVENT-A-M1"));
    }

    #[tokio::test]
    async fn results_follow_ticker_submission_order() {
        let oracle = Arc::new(MockOracle::new());
        let examiner = examiner(oracle, 2, 5);

        let tickers = vec![
            "EVENT-C".to_string(),
            "EVENT-A".to_string(),
            "EVENT-B".to_string(),
        ];
        let results = examiner.examine_events(&tickers).await;

        let keys: Vec<&String> = results.keys().collect();
        assert_eq!(keys, vec!["EVENT-C", "EVENT-A", "EVENT-B"]);
    }

    #[tokio::test]
    async fn analyses_within_event_follow_market_order() {
        let oracle = Arc::new(MockOracle::new());
        let examiner = examiner(oracle, 3, 5);

        let results = examiner.examine_events(&["EVENT-A".to_string()]).await;
        let tickers: Vec<&str> = results["EVENT-A"]
            .iter()
            .map(|a| a.market_ticker.as_str())
            .collect();
        assert_eq!(tickers, vec!["EVENT-A-M0", "EVENT-A-M1", "EVENT-A-M2"]);
    }

    #[tokio::test]
    async fn analysis_carries_market_and_research_fields() {
        let oracle = Arc::new(MockOracle::new());
        let examiner = examiner(oracle, 1, 5);

        let results = examiner.examine_events(&["EVENT-A".to_string()]).await;
        let analysis = &results["EVENT-A"][0];

        // 47 cents -> 0.47 dollars
        assert_eq!(analysis.current_yes_ask, Decimal::new(47, 2));
        assert_eq!(analysis.recommendation, Recommendation::BidYes);
        assert_eq!(analysis.research_context.articles.len(), 1);
        assert!((analysis.research_context.market_sentiment - 0.2).abs() < 1e-9);
    }

    struct FailingEvents;

    #[async_trait]
    impl EventSource for FailingEvents {
        async fn event_markets(&self, _event_ticker: &str) -> Result<Vec<MarketSnapshot>> {
            Err(ResearchError::Oracle("unreachable venue".to_string()))
        }
    }

    #[tokio::test]
    async fn unreachable_event_degrades_to_empty_list() {
        let examiner = MarginExaminer::new(
            Arc::new(FailingEvents),
            Arc::new(MockResearch),
            Arc::new(MockOracle::new()),
            5,
            DEFAULT_NEWS_LOOKBACK_DAYS,
        );

        let results = examiner.examine_events(&["EVENT-X".to_string()]).await;
        assert!(results["EVENT-X"].is_empty());
    }
}
