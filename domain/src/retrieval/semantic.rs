//! Semantic ranker: cosine similarity over embedding vectors.

use crate::retrieval::chunk::ChunkId;

/// Cosine similarity between two vectors, 0.0 when either is degenerate
/// or the dimensions differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += (*x as f64) * (*y as f64);
        norm_a += (*x as f64).powi(2);
        norm_b += (*y as f64).powi(2);
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Rank candidate chunks by cosine similarity to the query embedding.
///
/// Candidates below `min_similarity` are dropped. Returns `(id, similarity)`
/// sorted descending, ties broken by chunk id for reproducibility.
pub fn rank_semantic(
    query_embedding: &[f32],
    candidates: &[(ChunkId, Vec<f32>)],
    min_similarity: f64,
) -> Vec<(ChunkId, f64)> {
    let mut scored: Vec<(ChunkId, f64)> = candidates
        .iter()
        .filter_map(|(id, embedding)| {
            let similarity = cosine_similarity(query_embedding, embedding);
            (similarity >= min_similarity).then(|| (id.clone(), similarity))
        })
        .collect();

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::entities::ConversationId;
    use crate::core::model::ModelId;
    use crate::retrieval::chunk::ChunkStage;

    fn chunk_id(n: usize) -> ChunkId {
        ChunkId::derive(
            &ConversationId::new("c"),
            n,
            ChunkStage::Opinion,
            &ModelId::new("m"),
        )
    }

    #[test]
    fn test_identical_vectors_similarity_one() {
        let v = vec![0.5, 0.5, 0.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_orthogonal_vectors_similarity_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-9);
    }

    #[test]
    fn test_mismatched_dimensions_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_rank_semantic_sorts_and_filters() {
        let query = vec![1.0, 0.0];
        let candidates = vec![
            (chunk_id(0), vec![0.0, 1.0]),  // orthogonal, filtered
            (chunk_id(1), vec![1.0, 0.0]),  // identical
            (chunk_id(2), vec![1.0, 1.0]),  // ~0.707
        ];

        let ranked = rank_semantic(&query, &candidates, 0.1);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].0, chunk_id(1));
        assert_eq!(ranked[1].0, chunk_id(2));
    }
}
