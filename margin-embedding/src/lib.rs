//! Article embeddings and semantic recall for the Margin Scanner
//!
//! This crate wraps OpenAI's text-embedding-3-small model and keeps a
//! persistent vector index of previously-seen news articles in SQLite, so
//! related queries can recall historical coverage without refetching it.

pub mod client;
pub mod distance;
pub mod error;
pub mod store;

pub use client::{Embedder, EmbeddingClient, EMBEDDING_DIM};
pub use distance::{distance_to_relevance, l2_distance};
pub use error::{EmbeddingError, Result};
pub use store::{ArticleStore, ArticleStoreStats, StoredArticle};
