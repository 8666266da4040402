//! Core types for the Kalshi Margin Scanner
//!
//! This crate defines the shared data structures used across the scanner,
//! including market snapshots, news articles, research context, and the
//! structured analysis emitted for each examined market.

pub mod analysis;
pub mod config;
pub mod market;
pub mod news;

pub use analysis::{InvalidRecommendation, MarginAnalysis, Recommendation, ResearchContext};
pub use config::{ConfigError, Settings};
pub use market::{event_liquidity, MarketSnapshot};
pub use news::NewsArticle;
