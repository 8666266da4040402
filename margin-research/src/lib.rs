//! Market analysis orchestration for the Margin Scanner
//!
//! Drives the per-market research pipeline: construct a search query from
//! market metadata, retrieve news, summarize it, and produce a structured
//! probability judgment. Events fan out into concurrent per-market pipelines
//! behind a shared concurrency gate.

pub mod error;
pub mod examiner;
pub mod oracle;
pub mod traits;
pub mod types;

pub use error::ResearchError;
pub use examiner::MarginExaminer;
pub use oracle::OpenAiOracle;
pub use traits::{EventSource, JudgmentOracle, ResearchProvider};
pub use types::{Judgment, NewsDigest};
