//! Embedder port
//!
//! Produces the vector representation the semantic ranker compares with
//! cosine similarity. Implementations may be local (hashed features) or
//! remote (an embeddings API).

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("embedding failed: {0}")]
    Failed(String),
}

/// Text embedding provider
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts. The result has one vector per input, each
    /// of `dimension()` length.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;

    /// Dimensionality of the produced vectors.
    fn dimension(&self) -> usize;
}
