//! OpenAI-backed judgment oracle

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::instrument;

use margin_core::{MarketSnapshot, NewsArticle, ResearchContext};

use crate::error::{ResearchError, Result};
use crate::traits::JudgmentOracle;
use crate::types::{Judgment, NewsDigest, RawJudgment, RawSearchQuery};

/// Placeholder passed to the summarization stage when retrieval came back
/// empty, so the pipeline stays uniform instead of skipping the stage
const NO_ARTICLES_PLACEHOLDER: &str = "No relevant articles found.";

#[derive(Debug, Clone)]
pub struct OpenAiOracle {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiOracle {
    /// Create an oracle using the given API key and gpt-4o
    pub fn new(api_key: String) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Client::with_config(config),
            model: "gpt-4o".to_string(),
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// One chat completion call, returning the raw assistant text
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> Result<String> {
        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model)
            .messages([
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system_prompt)
                    .build()
                    .map_err(|e| ResearchError::Oracle(e.to_string()))?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user_prompt)
                    .build()
                    .map_err(|e| ResearchError::Oracle(e.to_string()))?
                    .into(),
            ])
            .temperature(temperature);
        if let Some(max) = max_tokens {
            builder.max_tokens(max);
        }
        let request = builder
            .build()
            .map_err(|e| ResearchError::Oracle(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| ResearchError::Oracle(format!("OpenAI API error: {e}")))?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| ResearchError::Parse("No response from OpenAI".to_string()))
    }
}

#[async_trait]
impl JudgmentOracle for OpenAiOracle {
    #[instrument(skip(self, market), fields(ticker = %market.ticker))]
    async fn construct_search_query(&self, market: &MarketSnapshot) -> Result<String> {
        let system_prompt = r#"You are a research assistant for prediction market analysis.

Given a market, produce ONE broad news search phrase covering the underlying real-world event. The phrase must be useful for a general news search engine:
- Name the event, not the market mechanics
- No tickers, no betting terminology, no dates unless essential
- 3 to 8 words

Respond with valid JSON in this exact format:
{
  "search_query": "the search phrase"
}"#;

        let user_prompt = format!(
            "## Market\nTitle: {}\nCategory: {}\nRules: {}",
            market.title,
            market.category.as_deref().unwrap_or("Unknown"),
            market.rules.as_deref().unwrap_or("No rules provided"),
        );

        let content = self.complete(system_prompt, &user_prompt, 0.3, None).await?;
        let json_str = extract_json(&content)?;
        let parsed: RawSearchQuery = serde_json::from_str(&json_str)
            .map_err(|e| ResearchError::Parse(format!("Failed to parse search query: {e}")))?;

        if parsed.search_query.trim().is_empty() {
            return Err(ResearchError::Validation(
                "oracle returned an empty search query".to_string(),
            ));
        }
        Ok(parsed.search_query)
    }

    #[instrument(skip(self, market, articles), fields(ticker = %market.ticker, articles = articles.len()))]
    async fn summarize_news(
        &self,
        market: &MarketSnapshot,
        articles: &[NewsArticle],
    ) -> Result<NewsDigest> {
        let system_prompt = r#"You are a news analyst for prediction markets.

Summarize the provided articles as they bear on the market question. If told no articles were found, say so and return neutral sentiment.

Respond with valid JSON in this exact format:
{
  "summary": "2-3 sentence summary of the news",
  "key_points": ["point 1", "point 2"],
  "market_sentiment": 0.0
}

market_sentiment is a number from -1.0 (news strongly suggests NO) to 1.0 (news strongly suggests YES)."#;

        let articles_block = if articles.is_empty() {
            NO_ARTICLES_PLACEHOLDER.to_string()
        } else {
            articles
                .iter()
                .take(10)
                .map(|a| {
                    format!(
                        "### {}\nSource: {} ({})\n{}",
                        a.title,
                        a.source_name,
                        a.published_at.format("%Y-%m-%d"),
                        a.description,
                    )
                })
                .collect::<Vec<_>>()
                .join("\n\n")
        };

        let user_prompt = format!(
            "## Market\nTitle: {}\n\n## Articles\n{}",
            market.title, articles_block
        );

        let content = self.complete(system_prompt, &user_prompt, 0.3, None).await?;
        let json_str = extract_json(&content)?;
        let digest: NewsDigest = serde_json::from_str(&json_str)
            .map_err(|e| ResearchError::Parse(format!("Failed to parse news digest: {e}")))?;

        digest.validate()
    }

    #[instrument(skip(self, market, research), fields(ticker = %market.ticker))]
    async fn judge_market(
        &self,
        market: &MarketSnapshot,
        research: &ResearchContext,
    ) -> Result<Judgment> {
        let system_prompt = r#"You are a quantitative prediction market analyst. Given a market's pricing and a research summary, estimate the true probability of the event and decide whether the market is mispriced.

Recommendation rules:
- "BID YES" if your estimated probability is meaningfully above the YES price
- "BID NO" if it is meaningfully below
- "DISREGARD" if there is no edge or your confidence is low

Respond with valid JSON in this exact format:
{
  "estimated_probability": 0.0,
  "confidence_score": 0.0,
  "reasoning": "Detailed reasoning for the estimate",
  "sources": ["url1", "url2"],
  "recommendation": "BID YES|BID NO|DISREGARD"
}

estimated_probability and confidence_score are numbers in [0, 1]."#;

        let key_points = if research.key_points.is_empty() {
            "None".to_string()
        } else {
            research
                .key_points
                .iter()
                .map(|p| format!("- {p}"))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let sources = research
            .articles
            .iter()
            .take(10)
            .map(|a| format!("- {} ({})", a.title, a.url))
            .collect::<Vec<_>>()
            .join("\n");

        let user_prompt = format!(
            r#"## Market
Title: {title}
Implied probability (last price): {implied}%
YES ask: {yes_ask} cents
Volume: {volume}
Rules: {rules}

## Research Summary
{summary}

## Key Points
{key_points}

## News Sentiment
{sentiment}

## Sources
{sources}"#,
            title = market.title,
            implied = market.implied_probability(),
            yes_ask = market.yes_ask,
            volume = market.volume,
            rules = market.rules.as_deref().unwrap_or("No rules provided"),
            summary = research.summary,
            key_points = key_points,
            sentiment = research.market_sentiment,
            sources = sources,
        );

        let content = self
            .complete(system_prompt, &user_prompt, 0.4, Some(2000))
            .await?;
        let json_str = extract_json(&content)?;
        let raw: RawJudgment = serde_json::from_str(&json_str)
            .map_err(|e| ResearchError::Parse(format!("Failed to parse judgment: {e}")))?;

        raw.validate()
    }
}

/// Extract JSON from a string that might contain markdown code blocks
fn extract_json(content: &str) -> Result<String> {
    if let Some(start) = content.find("```json") {
        let start = start + 7;
        if let Some(end) = content[start..].find("```") {
            return Ok(content[start..start + end].trim().to_string());
        }
    }

    // A '}' can precede the first '{' in prose replies; only slice when the
    // braces actually bracket something.
    if let (Some(start), Some(end)) = (content.find('{'), content.rfind('}')) {
        if start < end {
            return Ok(content[start..=end].to_string());
        }
    }

    Err(ResearchError::Parse("No JSON found in response".to_string()))
}
