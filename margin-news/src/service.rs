//! NewsAPI client and article ranking
//!
//! `get_relevant_articles` is the single entry point: it pulls fresh
//! coverage from NewsAPI, scores it against the query, persists it into the
//! article store, merges in semantically similar historical articles, and
//! returns the deduplicated union ranked by relevance.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use margin_core::NewsArticle;
use margin_embedding::ArticleStore;

use crate::error::NewsError;

const NEWS_API_BASE: &str = "https://newsapi.org/v2";
const PAGE_SIZE: usize = 25;

/// How many stored articles to recall per query
const STORE_RECALL_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    articles: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
struct RawArticle {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    source: RawSource,
    #[serde(rename = "publishedAt")]
    published_at: Option<chrono::DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    name: Option<String>,
}

/// News retrieval service backed by NewsAPI and the article store
pub struct NewsService {
    client: Client,
    api_key: String,
    base_url: String,
    store: Arc<ArticleStore>,
}

impl NewsService {
    /// Create a new news service
    pub fn new(api_key: String, store: Arc<ArticleStore>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: NEWS_API_BASE.to_string(),
            store,
        }
    }

    /// Fetch, score, persist, and rank articles relevant to a search query
    ///
    /// Degrades rather than fails: a rate-limited fetch contributes nothing,
    /// persistence failures never affect the returned list, and store recall
    /// already returns empty on its own failures.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn get_relevant_articles(&self, query: &str, days_back: i64) -> Vec<NewsArticle> {
        let fetched = match self.fetch_from_api(query, days_back).await {
            Ok(articles) => articles,
            Err(NewsError::RateLimited) => {
                warn!("news API rate limited, continuing without fresh articles");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "news fetch failed, continuing without fresh articles");
                Vec::new()
            }
        };

        if !fetched.is_empty() {
            match self.store.insert_if_absent(&fetched, query).await {
                Ok(inserted) => debug!(inserted, "persisted fresh articles"),
                Err(e) => warn!(error = %e, "failed to persist fetched articles"),
            }
        }

        let recalled = self.store.search_similar(query, STORE_RECALL_LIMIT).await;

        let mut combined = fetched;
        combined.extend(recalled);
        let mut articles = deduplicate_articles(combined);

        articles.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        info!(count = articles.len(), "relevant articles ready");
        articles
    }

    /// Query the NewsAPI `everything` endpoint for the lookback window
    async fn fetch_from_api(
        &self,
        query: &str,
        days_back: i64,
    ) -> Result<Vec<NewsArticle>, NewsError> {
        let now = Utc::now();
        let from = (now - Duration::days(days_back)).format("%Y-%m-%d").to_string();
        let to = now.format("%Y-%m-%d").to_string();
        let page_size = PAGE_SIZE.to_string();

        let response = self
            .client
            .get(format!("{}/everything", self.base_url))
            .query(&[
                ("q", query),
                ("from", from.as_str()),
                ("to", to.as_str()),
                ("sortBy", "relevancy"),
                ("language", "en"),
                ("searchIn", "title,description,content"),
                ("pageSize", page_size.as_str()),
                ("apiKey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| NewsError::RequestFailed(e.to_string()))?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(NewsError::RateLimited);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(NewsError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let payload: NewsApiResponse = response
            .json()
            .await
            .map_err(|e| NewsError::Parse(e.to_string()))?;

        let phrases = decompose_phrases(query);
        let articles: Vec<NewsArticle> = payload
            .articles
            .into_iter()
            .filter_map(|raw| {
                // Title and url are mandatory; the rest degrade gracefully
                let title = raw.title?;
                let url = raw.url?;
                let description = raw.description.unwrap_or_default();
                let relevance_score = phrase_relevance(&phrases, &title, &description);
                Some(NewsArticle {
                    title,
                    description,
                    url,
                    source_name: raw.source.name.unwrap_or_else(|| "Unknown".to_string()),
                    published_at: raw.published_at.unwrap_or_else(Utc::now),
                    relevance_score,
                })
            })
            .collect();

        debug!(count = articles.len(), "fetched articles from news API");
        Ok(articles)
    }
}

/// Split a query into scoring phrases
///
/// Quotes are stripped, then consecutive words are grouped into multi-word
/// phrases with the boolean connectives (and/or/not) acting as separators:
/// `fed rate AND cut` decomposes to `["fed rate", "cut"]`. Phrases are
/// matched as whole substrings, so word order within a phrase matters.
fn decompose_phrases(query: &str) -> Vec<String> {
    let cleaned = query.replace('"', "");

    let mut phrases = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for term in cleaned.split_whitespace() {
        if matches!(term.to_lowercase().as_str(), "and" | "or" | "not") {
            if !current.is_empty() {
                phrases.push(current.join(" ").to_lowercase());
                current.clear();
            }
            continue;
        }
        current.push(term);
    }
    if !current.is_empty() {
        phrases.push(current.join(" ").to_lowercase());
    }
    phrases
}

/// Score an article against the decomposed query phrases
///
/// +2 per phrase found in the title, +1 per phrase found in the description,
/// normalized by `phrases * 3`, clamped to [0, 1], floored at 0.5 so any
/// endpoint-returned article carries at least moderate confidence.
fn phrase_relevance(phrases: &[String], title: &str, description: &str) -> f64 {
    if phrases.is_empty() {
        return 0.5;
    }

    let title_lower = title.to_lowercase();
    let description_lower = description.to_lowercase();

    let mut score = 0.0;
    for phrase in phrases {
        if title_lower.contains(phrase.as_str()) {
            score += 2.0;
        }
        if description_lower.contains(phrase.as_str()) {
            score += 1.0;
        }
    }

    let normalized = (score / (phrases.len() as f64 * 3.0)).min(1.0);
    normalized.max(0.5)
}

/// Drop articles with duplicate urls, keeping the first occurrence
fn deduplicate_articles(articles: Vec<NewsArticle>) -> Vec<NewsArticle> {
    let mut seen: HashSet<String> = HashSet::new();
    articles
        .into_iter()
        .filter(|article| seen.insert(article.url.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(url: &str, score: f64) -> NewsArticle {
        NewsArticle {
            title: format!("article at {url}"),
            description: String::new(),
            url: url.to_string(),
            source_name: "Test Wire".to_string(),
            published_at: Utc::now(),
            relevance_score: score,
        }
    }

    #[test]
    fn decompose_groups_words_between_connectives() {
        let phrases = decompose_phrases("\"fed rate\" AND cut or NOT hike");
        assert_eq!(phrases, vec!["fed rate", "cut", "hike"]);
    }

    #[test]
    fn decompose_keeps_an_unconnected_query_as_one_phrase() {
        let phrases = decompose_phrases("federal reserve rate cut");
        assert_eq!(phrases, vec!["federal reserve rate cut"]);
    }

    #[test]
    fn phrase_match_requires_the_whole_phrase() {
        let phrases = decompose_phrases("federal reserve rate cut");
        // The title carries every word but not the contiguous phrase, so
        // only the floor applies.
        let score = phrase_relevance(&phrases, "Federal Reserve weighs rate cut", "");
        assert!((score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn multi_phrase_scores_accumulate_per_phrase() {
        let phrases = decompose_phrases("fed rate AND cut");
        // "fed rate" and "cut" in the title (+2 each), "cut" in the
        // description (+1): 5 / (2 * 3).
        let score = phrase_relevance(&phrases, "Fed rate cut coming", "a cut is expected");
        assert!((score - 5.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn zero_matches_floor_at_half() {
        let phrases = decompose_phrases("quantum");
        let score = phrase_relevance(&phrases, "Fed cuts rates", "Markets rally");
        assert!((score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn single_title_match_scores_two_thirds() {
        let phrases = decompose_phrases("fed");
        let score = phrase_relevance(&phrases, "Fed cuts rates", "Markets rally");
        assert!((score - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn full_matches_clamp_to_one() {
        let phrases = decompose_phrases("fed");
        // Title (+2) and description (+1): 3 / 3 = 1.0 exactly
        let score = phrase_relevance(&phrases, "Fed decision", "Fed statement due");
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn relevance_never_exceeds_one() {
        let phrases = decompose_phrases("fed");
        // Repeated occurrences do not stack beyond one hit per field
        let score = phrase_relevance(&phrases, "Fed fed FED", "fed fed fed");
        assert!(score <= 1.0);
    }

    #[test]
    fn deduplicate_keeps_first_occurrence() {
        let deduped = deduplicate_articles(vec![
            article("https://example.com/a", 0.9),
            article("https://example.com/b", 0.8),
            article("https://example.com/a", 0.1),
        ]);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].url, "https://example.com/a");
        assert!((deduped[0].relevance_score - 0.9).abs() < 1e-9);
    }

    #[test]
    fn deduplicate_output_has_unique_urls_any_order() {
        let inputs = vec![
            vec![
                article("https://example.com/a", 0.1),
                article("https://example.com/a", 0.9),
                article("https://example.com/b", 0.5),
            ],
            vec![
                article("https://example.com/b", 0.5),
                article("https://example.com/a", 0.9),
                article("https://example.com/a", 0.1),
            ],
        ];
        for input in inputs {
            let deduped = deduplicate_articles(input);
            let urls: HashSet<&str> = deduped.iter().map(|a| a.url.as_str()).collect();
            assert_eq!(urls.len(), deduped.len());
        }
    }
}
