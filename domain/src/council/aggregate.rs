//! Aggregate ranking across all Stage-2 evaluators.
//!
//! Each model's aggregate rank is the mean of its 1-based positions across
//! every parsed ranking that mentions it. Models never mentioned are not
//! given a synthetic rank; they sort after all ranked models and carry the
//! `unranked` flag.
//!
//! Ordering is fully deterministic: ties in average rank (and the relative
//! order of unranked models) break by label assignment order, which is the
//! stage-1 completion order recorded in the [`LabelMap`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::model::ModelId;
use crate::council::labels::LabelMap;
use crate::council::stage::Stage2Ranking;

/// One model's aggregate standing after Stage 2
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateEntry {
    pub model: ModelId,
    /// Mean 1-based position across rankings that mention this model.
    /// `None` when no evaluator ranked it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rank: Option<f64>,
    /// Number of rankings that mention this model
    pub rankings_count: usize,
    /// True when no valid ranking mentioned this model
    #[serde(default)]
    pub unranked: bool,
}

/// Compute the aggregate ranking for every labeled stage-1 participant.
///
/// The reduction is order-independent: positions are accumulated per model
/// and sorting depends only on the accumulated values plus label order.
pub fn aggregate_rankings(rankings: &[Stage2Ranking], labels: &LabelMap) -> Vec<AggregateEntry> {
    let mut positions: HashMap<&ModelId, Vec<usize>> = HashMap::new();

    for ranking in rankings {
        for (idx, label) in ranking.parsed_ranking.iter().enumerate() {
            if let Some(model) = labels.model_for(label) {
                positions.entry(model).or_default().push(idx + 1);
            }
        }
    }

    let mut entries: Vec<AggregateEntry> = labels
        .iter()
        .map(|(_, model)| match positions.get(model) {
            Some(ranks) if !ranks.is_empty() => {
                let avg = ranks.iter().sum::<usize>() as f64 / ranks.len() as f64;
                AggregateEntry {
                    model: model.clone(),
                    average_rank: Some(round2(avg)),
                    rankings_count: ranks.len(),
                    unranked: false,
                }
            }
            _ => AggregateEntry {
                model: model.clone(),
                average_rank: None,
                rankings_count: 0,
                unranked: true,
            },
        })
        .collect();

    // Ranked models first by average rank ascending; unranked models last.
    // The initial order is label order, and the sort is stable, so ties
    // and unranked models stay in stage-1 completion order.
    entries.sort_by(|a, b| match (a.average_rank, b.average_rank) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    entries
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
