//! Consensus scoring and the confidence label.
//!
//! Agreement is measured per model as `1 / (1 + variance)` over the
//! positions evaluators assigned to it: identical positions give 1.0,
//! widely scattered positions approach 0. The turn-level confidence label
//! is derived from the mean of these scores and is monotonic in it by
//! construction: higher agreement never yields a lower label.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::model::ModelId;
use crate::council::labels::LabelMap;
use crate::council::stage::Stage2Ranking;

/// Confidence label shown with the final synthesis
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceScore {
    Low,
    Medium,
    High,
}

impl ConfidenceScore {
    /// Map an agreement score in [0, 1] to a label.
    ///
    /// Thresholds are exclusive: agreement must strictly exceed 0.75 for
    /// HIGH and 0.5 for MEDIUM.
    pub fn from_agreement(agreement: f64) -> Self {
        if agreement > 0.75 {
            ConfidenceScore::High
        } else if agreement > 0.5 {
            ConfidenceScore::Medium
        } else {
            ConfidenceScore::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceScore::High => "HIGH",
            ConfidenceScore::Medium => "MEDIUM",
            ConfidenceScore::Low => "LOW",
        }
    }
}

impl std::fmt::Display for ConfidenceScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-model consensus metrics derived from Stage-2 positions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConsensus {
    /// Mean 1-based position (lower is better)
    pub avg_rank: f64,
    /// `1 / (1 + variance)` of positions, in (0, 1]
    pub consensus_score: f64,
    /// Number of rankings that mentioned this model
    pub num_rankings: usize,
}

/// Compute per-model consensus metrics from all parsed rankings.
///
/// Models no evaluator mentioned are absent from the result; they have
/// no positions to agree on.
pub fn consensus_metrics(
    rankings: &[Stage2Ranking],
    labels: &LabelMap,
) -> BTreeMap<ModelId, ModelConsensus> {
    let mut positions: BTreeMap<ModelId, Vec<f64>> = BTreeMap::new();

    for ranking in rankings {
        for (idx, label) in ranking.parsed_ranking.iter().enumerate() {
            if let Some(model) = labels.model_for(label) {
                positions.entry(model.clone()).or_default().push((idx + 1) as f64);
            }
        }
    }

    positions
        .into_iter()
        .map(|(model, ranks)| {
            let n = ranks.len() as f64;
            let avg = ranks.iter().sum::<f64>() / n;
            let variance = ranks.iter().map(|r| (r - avg).powi(2)).sum::<f64>() / n;
            let consensus = 1.0 / (1.0 + variance);
            (
                model,
                ModelConsensus {
                    avg_rank: avg,
                    consensus_score: consensus,
                    num_rankings: ranks.len(),
                },
            )
        })
        .collect()
}

/// Overall turn confidence: mean consensus across models, mapped to a label.
///
/// An empty metric set (no parseable rankings at all) yields LOW with an
/// agreement of 0.0.
pub fn overall_confidence(metrics: &BTreeMap<ModelId, ModelConsensus>) -> (ConfidenceScore, f64) {
    if metrics.is_empty() {
        return (ConfidenceScore::Low, 0.0);
    }
    let avg =
        metrics.values().map(|m| m.consensus_score).sum::<f64>() / metrics.len() as f64;
    (ConfidenceScore::from_agreement(avg), avg)
}

/// Human-readable consensus summary for the chairman prompt, best first.
pub fn format_consensus_details(metrics: &BTreeMap<ModelId, ModelConsensus>) -> String {
    let mut rows: Vec<(&ModelId, &ModelConsensus)> = metrics.iter().collect();
    rows.sort_by(|a, b| {
        a.1.avg_rank
            .partial_cmp(&b.1.avg_rank)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    rows.iter()
        .map(|(model, m)| {
            format!(
                "- {}: avg rank {:.2}, consensus {:.2}",
                model, m.avg_rank, m.consensus_score
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
