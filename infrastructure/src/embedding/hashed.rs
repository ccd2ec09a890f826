//! Deterministic hash-based embedder.
//!
//! Projects a bag of words onto a fixed-dimension vector via feature
//! hashing: each word writes into three hashed positions, weighted by
//! position in the text and word length, and the result is normalized to
//! a unit vector. The same text always produces the same vector, with no
//! model download and no network, so the index can be rebuilt offline.

use async_trait::async_trait;
use council_application::{EmbedError, Embedder};

const DEFAULT_DIMENSION: usize = 256;

/// Local feature-hashing embedder.
pub struct HashedEmbedder {
    dimension: usize,
}

impl HashedEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(8),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimension];
        let lower = text.to_lowercase();

        for (i, word) in lower.split_whitespace().enumerate() {
            let hash = fnv1a(word);
            let idx1 = (hash % self.dimension as u64) as usize;
            let idx2 = ((hash / 7) % self.dimension as u64) as usize;
            let idx3 = ((hash / 13) % self.dimension as u64) as usize;

            let position_weight = 1.0 / (1.0 + i as f32 * 0.1);
            let length_factor = (word.len() as f32).sqrt() / 3.0;

            embedding[idx1] += position_weight * length_factor;
            embedding[idx2] += position_weight * 0.5;
            embedding[idx3] -= position_weight * 0.3;
        }

        normalize(&mut embedding);
        embedding
    }
}

impl Default for HashedEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

#[async_trait]
impl Embedder for HashedEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

fn fnv1a(word: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in word.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

fn normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}
