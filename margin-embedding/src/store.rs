//! SQLite-backed vector index of news articles
//!
//! One named table holds every article ever fetched, keyed by a synthetic
//! uuid with the article url as the logical unique key. Nearest-neighbor
//! search is a brute-force L2 scan over the stored vectors, which is plenty
//! for the tens of thousands of articles a scanner accumulates.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tracing::{debug, info, warn};
use uuid::Uuid;

use margin_core::NewsArticle;

use crate::client::Embedder;
use crate::distance::{distance_to_relevance, l2_distance};
use crate::error::{EmbeddingError, Result};

/// Rows are flushed to SQLite in batches of this size
const INSERT_BATCH_SIZE: usize = 100;

/// A fully-prepared row awaiting batch insertion
struct PendingRow {
    id: String,
    title: String,
    description: String,
    url: String,
    source_name: String,
    published_at: String,
    query_context: String,
    embedding: Vec<u8>,
}

/// Stored article metadata, for offline inspection of the index
#[derive(Debug, Clone)]
pub struct StoredArticle {
    pub id: String,
    pub title: String,
    pub url: String,
    pub source_name: String,
    pub published_at: String,
    pub query_context: String,
}

/// Statistics about the article index
#[derive(Debug, Clone)]
pub struct ArticleStoreStats {
    pub article_count: usize,
    pub database_size_bytes: usize,
}

/// Persistent vector store of news articles
pub struct ArticleStore {
    conn: Arc<Mutex<Connection>>,
    embedder: Arc<dyn Embedder>,
}

impl ArticleStore {
    /// Open (or create) the store at the given path
    pub fn open<P: AsRef<Path>>(database_path: P, embedder: Arc<dyn Embedder>) -> Result<Self> {
        info!(path = ?database_path.as_ref(), "opening article store");
        let conn = Connection::open(database_path.as_ref())
            .map_err(|e| EmbeddingError::Database(format!("Failed to open database: {e}")))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            embedder,
        };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn open_in_memory(embedder: Arc<dyn Embedder>) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| EmbeddingError::Database(format!("Failed to create in-memory DB: {e}")))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            embedder,
        };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Create the backing table and url index if absent. Idempotent.
    pub fn ensure_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS news_articles (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                url TEXT NOT NULL,
                source_name TEXT NOT NULL,
                published_at TEXT NOT NULL,
                query_context TEXT NOT NULL,
                embedding BLOB NOT NULL
            )",
            [],
        )
        .map_err(|e| EmbeddingError::Database(e.to_string()))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_news_articles_url
             ON news_articles(url)",
            [],
        )
        .map_err(|e| EmbeddingError::Database(e.to_string()))?;

        debug!("article store schema ready");
        Ok(())
    }

    /// Insert articles not already present (by url), embedding each from
    /// `title + description + query_context`.
    ///
    /// Articles whose embedding fails are skipped, not fatal. Rows are
    /// written in batches; a failed batch is logged and dropped without
    /// touching batches already committed. Returns the number of rows
    /// actually inserted.
    pub async fn insert_if_absent(
        &self,
        articles: &[NewsArticle],
        query_context: &str,
    ) -> Result<usize> {
        let mut batch: Vec<PendingRow> = Vec::new();
        let mut inserted = 0;

        for article in articles {
            if self.url_exists(&article.url)? {
                continue;
            }

            let text = format!(
                "{} {} {}",
                article.title, article.description, query_context
            );
            let embedding = match self.embedder.embed_text(&text).await {
                Ok(embedding) => embedding,
                Err(e) => {
                    warn!(url = %article.url, error = %e, "skipping article, embedding failed");
                    continue;
                }
            };

            batch.push(PendingRow {
                id: Uuid::new_v4().to_string(),
                title: article.title.clone(),
                description: article.description.clone(),
                url: article.url.clone(),
                source_name: article.source_name.clone(),
                published_at: article.published_at.to_rfc3339(),
                query_context: query_context.to_string(),
                embedding: bincode::serialize(&embedding)?,
            });

            if batch.len() >= INSERT_BATCH_SIZE {
                inserted += self.flush_batch(&mut batch);
            }
        }

        if !batch.is_empty() {
            inserted += self.flush_batch(&mut batch);
        }

        debug!(inserted, total = articles.len(), "article insertion complete");
        Ok(inserted)
    }

    /// Semantic recall: embed the query, scan stored vectors, and return the
    /// closest articles scored by `1 - min(d/2, 1)`, best first.
    ///
    /// Degrades to an empty list on any failure so the research pipeline
    /// proceeds with "no additional context" instead of aborting.
    pub async fn search_similar(&self, query: &str, limit: usize) -> Vec<NewsArticle> {
        match self.search_similar_inner(query, limit).await {
            Ok(articles) => articles,
            Err(e) => {
                warn!(error = %e, "similarity search failed, returning no stored articles");
                Vec::new()
            }
        }
    }

    async fn search_similar_inner(&self, query: &str, limit: usize) -> Result<Vec<NewsArticle>> {
        let query_embedding = self.embedder.embed_text(query).await?;

        let rows = self.load_embedded_rows()?;
        let mut articles: Vec<NewsArticle> = rows
            .into_iter()
            .filter_map(|(article, embedding)| {
                let distance = l2_distance(&query_embedding, &embedding);
                let published_at = match DateTime::parse_from_rfc3339(&article.published_at) {
                    Ok(ts) => ts.with_timezone(&Utc),
                    Err(e) => {
                        debug!(url = %article.url, error = %e, "bad stored timestamp, skipping");
                        return None;
                    }
                };
                Some(NewsArticle {
                    title: article.title,
                    description: article.description,
                    url: article.url,
                    source_name: article.source_name,
                    published_at,
                    relevance_score: distance_to_relevance(distance),
                })
            })
            .collect();

        articles.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        articles.truncate(limit);

        debug!(hits = articles.len(), "similarity search complete");
        Ok(articles)
    }

    /// Most recently inserted article metadata, newest first
    pub fn list_recent(&self, limit: usize) -> Result<Vec<StoredArticle>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(
                "SELECT id, title, url, source_name, published_at, query_context
                 FROM news_articles
                 ORDER BY rowid DESC
                 LIMIT ?",
            )
            .map_err(|e| EmbeddingError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(StoredArticle {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    url: row.get(2)?,
                    source_name: row.get(3)?,
                    published_at: row.get(4)?,
                    query_context: row.get(5)?,
                })
            })
            .map_err(|e| EmbeddingError::Database(e.to_string()))?;

        let mut articles = Vec::new();
        for row in rows {
            articles.push(row.map_err(|e| EmbeddingError::Database(e.to_string()))?);
        }
        Ok(articles)
    }

    /// Row count and on-disk size
    pub fn stats(&self) -> Result<ArticleStoreStats> {
        let conn = self.conn.lock().unwrap();

        let article_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM news_articles", [], |row| row.get(0))
            .unwrap_or(0);

        let page_count: i64 = conn
            .query_row("PRAGMA page_count", [], |row| row.get(0))
            .unwrap_or(0);
        let page_size: i64 = conn
            .query_row("PRAGMA page_size", [], |row| row.get(0))
            .unwrap_or(4096);

        Ok(ArticleStoreStats {
            article_count: article_count as usize,
            database_size_bytes: (page_count * page_size) as usize,
        })
    }

    /// Check-then-insert existence probe. Not atomic with the insert;
    /// concurrent writers can race into a harmless duplicate row.
    fn url_exists(&self, url: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM news_articles WHERE url = ?",
                params![url],
                |row| row.get(0),
            )
            .map_err(|e| EmbeddingError::Database(e.to_string()))?;

        Ok(count > 0)
    }

    /// Write one batch inside a transaction. On failure the batch is dropped
    /// so earlier, already-committed batches survive.
    fn flush_batch(&self, batch: &mut Vec<PendingRow>) -> usize {
        let count = batch.len();
        let mut conn = self.conn.lock().unwrap();

        let result = (|| -> std::result::Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            for row in batch.iter() {
                tx.execute(
                    "INSERT INTO news_articles
                     (id, title, description, url, source_name, published_at, query_context, embedding)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                    params![
                        row.id,
                        row.title,
                        row.description,
                        row.url,
                        row.source_name,
                        row.published_at,
                        row.query_context,
                        row.embedding,
                    ],
                )?;
            }
            tx.commit()
        })();

        batch.clear();

        match result {
            Ok(()) => {
                debug!(count, "inserted article batch");
                count
            }
            Err(e) => {
                warn!(count, error = %e, "failed to insert article batch, dropping it");
                0
            }
        }
    }

    fn load_embedded_rows(&self) -> Result<Vec<(StoredRowFields, Vec<f32>)>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(
                "SELECT title, description, url, source_name, published_at, embedding
                 FROM news_articles",
            )
            .map_err(|e| EmbeddingError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                let fields = StoredRowFields {
                    title: row.get(0)?,
                    description: row.get(1)?,
                    url: row.get(2)?,
                    source_name: row.get(3)?,
                    published_at: row.get(4)?,
                };
                let embedding_bytes: Vec<u8> = row.get(5)?;
                Ok((fields, embedding_bytes))
            })
            .map_err(|e| EmbeddingError::Database(e.to_string()))?;

        let mut results = Vec::new();
        for row in rows {
            let (fields, embedding_bytes) =
                row.map_err(|e| EmbeddingError::Database(e.to_string()))?;
            let embedding: Vec<f32> = bincode::deserialize(&embedding_bytes)?;
            results.push((fields, embedding));
        }
        Ok(results)
    }
}

/// Article fields as stored, before timestamp parsing
struct StoredRowFields {
    title: String,
    description: String,
    url: String,
    source_name: String,
    published_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Deterministic embedder: maps a marker substring to a fixed vector.
    struct FakeEmbedder {
        vectors: HashMap<&'static str, Vec<f32>>,
        default: Vec<f32>,
        fail_marker: Option<&'static str>,
    }

    impl FakeEmbedder {
        fn uniform() -> Self {
            Self {
                vectors: HashMap::new(),
                default: vec![0.0, 0.0, 0.0],
                fail_marker: None,
            }
        }
    }

    #[async_trait]
    impl Embedder for FakeEmbedder {
        async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
            if let Some(marker) = self.fail_marker {
                if text.contains(marker) {
                    return Err(EmbeddingError::Config("synthetic failure".to_string()));
                }
            }
            for (marker, vector) in &self.vectors {
                if text.contains(marker) {
                    return Ok(vector.clone());
                }
            }
            Ok(self.default.clone())
        }

        fn dimension(&self) -> usize {
            3
        }
    }

    fn article(title: &str, url: &str) -> NewsArticle {
        NewsArticle {
            title: title.to_string(),
            description: format!("{title} description"),
            url: url.to_string(),
            source_name: "Test Wire".to_string(),
            published_at: Utc::now(),
            relevance_score: 0.5,
        }
    }

    #[tokio::test]
    async fn insert_skips_existing_urls() {
        let store = ArticleStore::open_in_memory(Arc::new(FakeEmbedder::uniform())).unwrap();

        let articles = vec![article("Fed cuts rates", "https://example.com/a")];
        assert_eq!(store.insert_if_absent(&articles, "fed").await.unwrap(), 1);
        // Same url again: existence pre-check skips it.
        assert_eq!(store.insert_if_absent(&articles, "fed").await.unwrap(), 0);
        assert_eq!(store.stats().unwrap().article_count, 1);
    }

    #[tokio::test]
    async fn embedding_failure_skips_only_that_article() {
        let embedder = FakeEmbedder {
            vectors: HashMap::new(),
            default: vec![0.0, 0.0, 0.0],
            fail_marker: Some("poison"),
        };
        let store = ArticleStore::open_in_memory(Arc::new(embedder)).unwrap();

        let articles = vec![
            article("poison article", "https://example.com/poison"),
            article("healthy article", "https://example.com/ok"),
        ];
        let inserted = store.insert_if_absent(&articles, "ctx").await.unwrap();
        assert_eq!(inserted, 1);
        assert_eq!(store.stats().unwrap().article_count, 1);
    }

    #[tokio::test]
    async fn search_orders_by_distance_and_converts_scores() {
        let mut vectors = HashMap::new();
        vectors.insert("near", vec![1.0, 0.0, 0.0]);
        vectors.insert("far", vec![0.0, 1.0, 0.0]);
        vectors.insert("the query", vec![1.0, 0.0, 0.0]);
        let embedder = FakeEmbedder {
            vectors,
            default: vec![0.5, 0.5, 0.5],
            fail_marker: None,
        };
        let store = ArticleStore::open_in_memory(Arc::new(embedder)).unwrap();

        let articles = vec![
            article("far match", "https://example.com/far"),
            article("near match", "https://example.com/near"),
        ];
        store.insert_if_absent(&articles, "ctx").await.unwrap();

        let hits = store.search_similar("the query", 10).await;
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].url, "https://example.com/near");
        assert!((hits[0].relevance_score - 1.0).abs() < 1e-9);
        // Distance sqrt(2) -> 1 - sqrt(2)/2
        let expected = 1.0 - (2.0_f64).sqrt() / 2.0;
        assert!((hits[1].relevance_score - expected).abs() < 1e-6);
    }

    #[tokio::test]
    async fn search_degrades_to_empty_on_embedding_failure() {
        let embedder = FakeEmbedder {
            vectors: HashMap::new(),
            default: vec![0.0, 0.0, 0.0],
            fail_marker: Some("unlucky"),
        };
        let store = ArticleStore::open_in_memory(Arc::new(embedder)).unwrap();
        let hits = store.search_similar("unlucky query", 10).await;
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn list_recent_returns_newest_first() {
        let store = ArticleStore::open_in_memory(Arc::new(FakeEmbedder::uniform())).unwrap();
        store
            .insert_if_absent(&[article("first", "https://example.com/1")], "ctx")
            .await
            .unwrap();
        store
            .insert_if_absent(&[article("second", "https://example.com/2")], "ctx")
            .await
            .unwrap();

        let recent = store.list_recent(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].title, "second");
        assert_eq!(recent[0].query_context, "ctx");
    }

    #[test]
    fn ensure_schema_is_idempotent() {
        let store = ArticleStore::open_in_memory(Arc::new(FakeEmbedder::uniform())).unwrap();
        store.ensure_schema().unwrap();
        store.ensure_schema().unwrap();
    }
}
