//! OpenAI embedding client

use async_openai::{
    config::OpenAIConfig,
    types::embeddings::{CreateEmbeddingRequest, EmbeddingInput},
    Client,
};
use async_trait::async_trait;
use tracing::debug;

use crate::error::{EmbeddingError, Result};

/// Dimension of the text-embedding-3-small model
pub const EMBEDDING_DIM: usize = 1536;

/// Seam for embedding generation, so stores and tests can swap the remote
/// call for a deterministic one
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for arbitrary text
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>>;

    /// Dimension of the vectors this embedder produces
    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }
}

/// OpenAI embedding client
///
/// Stateless wrapper; safe to call from concurrent analysis tasks.
pub struct EmbeddingClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl EmbeddingClient {
    /// Create a new embedding client using text-embedding-3-small
    pub fn new(api_key: String) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Client::with_config(config),
            model: "text-embedding-3-small".to_string(),
        }
    }

    /// Get the embedding model name
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let request = CreateEmbeddingRequest {
            model: self.model.clone(),
            input: EmbeddingInput::String(text.to_string()),
            encoding_format: None,
            dimensions: None,
            user: None,
        };

        let response = self.client.embeddings().create(request).await?;

        if response.data.is_empty() {
            return Err(EmbeddingError::Config(
                "No embeddings returned from API".to_string(),
            ));
        }

        let embedding = response.data[0].embedding.clone();

        if embedding.len() != EMBEDDING_DIM {
            return Err(EmbeddingError::InvalidDimension {
                expected: EMBEDDING_DIM,
                actual: embedding.len(),
            });
        }

        debug!(
            chars = text.len(),
            dimension = embedding.len(),
            model = %self.model,
            "generated embedding"
        );

        Ok(embedding)
    }
}
