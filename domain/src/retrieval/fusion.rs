//! Reciprocal Rank Fusion and budget-constrained selection.
//!
//! Fused score for a chunk = Σ over rankers of `1 / (k + rank)`, with
//! 1-based ranks; a chunk absent from a ranker's list contributes 0 for
//! that ranker. k = 60 per the retrieval literature.

use std::collections::HashMap;

use crate::retrieval::chunk::ChunkId;

/// RRF smoothing constant. Higher k reduces the influence of
/// high-ranking items from any single list.
pub const DEFAULT_RRF_K: f64 = 60.0;

/// Fuse multiple ranked lists into a single ranking.
///
/// Each input list is ordered most-relevant-first; only positions matter,
/// not the underlying scores. The result is sorted by fused score
/// descending, ties broken by chunk id for reproducibility.
pub fn fuse(ranked_lists: &[Vec<ChunkId>], k: f64) -> Vec<(ChunkId, f64)> {
    let mut scores: HashMap<ChunkId, f64> = HashMap::new();

    for list in ranked_lists {
        for (rank, id) in list.iter().enumerate() {
            *scores.entry(id.clone()).or_default() += 1.0 / (k + (rank + 1) as f64);
        }
    }

    let mut fused: Vec<(ChunkId, f64)> = scores.into_iter().collect();
    fused.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    fused
}

/// Select chunks within a token budget, preserving fused order.
///
/// Drops chunks below `min_score`, then accumulates in fused-score order
/// until the next chunk would exceed `budget_tokens`. Quality floor: when
/// any candidate passed the threshold, at least one chunk is selected even
/// if it alone exceeds the budget.
pub fn select_within_budget(
    fused: &[(ChunkId, f64)],
    token_counts: &HashMap<ChunkId, usize>,
    min_score: f64,
    budget_tokens: usize,
) -> Vec<ChunkId> {
    let passing: Vec<&ChunkId> = fused
        .iter()
        .filter(|(_, score)| *score >= min_score)
        .map(|(id, _)| id)
        .collect();

    let mut selected: Vec<ChunkId> = Vec::new();
    let mut used_tokens = 0usize;

    for id in &passing {
        let tokens = token_counts.get(*id).copied().unwrap_or(0);
        if used_tokens + tokens > budget_tokens {
            break;
        }
        used_tokens += tokens;
        selected.push((*id).clone());
    }

    if selected.is_empty()
        && let Some(first) = passing.first()
    {
        selected.push((*first).clone());
    }

    selected
}
