//! Stage payloads - immutable result types for the deliberation pipeline.
//!
//! These types represent the outputs of each council stage:
//! - [`Stage1Response`] - one member's independent answer
//! - [`Stage2Ranking`] - one evaluator's peer ranking of the anonymized set
//! - [`Stage3Result`] - the chairman's final synthesis

use serde::{Deserialize, Serialize};

use crate::core::model::ModelId;
use crate::council::confidence::ConfidenceScore;

/// Token usage reported by a model call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }

    /// Sum two usages (for accumulating turn totals).
    pub fn add(&self, other: &TokenUsage) -> TokenUsage {
        TokenUsage {
            prompt_tokens: self.prompt_tokens + other.prompt_tokens,
            completion_tokens: self.completion_tokens + other.completion_tokens,
        }
    }
}

/// One council member's answer from Stage 1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage1Response {
    /// The model that produced this answer
    pub model: ModelId,
    /// The answer text
    pub response: String,
    /// Token usage for the call
    #[serde(default)]
    pub usage: TokenUsage,
}

impl Stage1Response {
    pub fn new(model: impl Into<ModelId>, response: impl Into<String>, usage: TokenUsage) -> Self {
        Self {
            model: model.into(),
            response: response.into(),
            usage,
        }
    }
}

/// One evaluator's peer ranking from Stage 2
///
/// `parsed_ranking` holds the labels extracted from `ranking` in order,
/// best first. A partial parse is valid; only the extracted labels count
/// toward the aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage2Ranking {
    /// The model that produced this ranking
    pub model: ModelId,
    /// Full free-text evaluation, including the ranking section
    pub ranking: String,
    /// Labels extracted from the ranking text, best first
    pub parsed_ranking: Vec<String>,
    /// Token usage for the call
    #[serde(default)]
    pub usage: TokenUsage,
}

impl Stage2Ranking {
    pub fn new(
        model: impl Into<ModelId>,
        ranking: impl Into<String>,
        parsed_ranking: Vec<String>,
        usage: TokenUsage,
    ) -> Self {
        Self {
            model: model.into(),
            ranking: ranking.into(),
            parsed_ranking,
            usage,
        }
    }
}

/// The chairman's final synthesis from Stage 3
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage3Result {
    /// The chairman model
    pub model: ModelId,
    /// The synthesized final answer
    pub response: String,
    /// Consensus-derived confidence label
    pub confidence: ConfidenceScore,
    /// Average per-model consensus score in [0, 1]
    pub avg_consensus: f64,
    /// Token usage for the call
    #[serde(default)]
    pub usage: TokenUsage,
}

impl Stage3Result {
    pub fn new(
        model: impl Into<ModelId>,
        response: impl Into<String>,
        confidence: ConfidenceScore,
        avg_consensus: f64,
        usage: TokenUsage,
    ) -> Self {
        Self {
            model: model.into(),
            response: response.into(),
            confidence,
            avg_consensus,
            usage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_total_and_add() {
        let a = TokenUsage::new(100, 50);
        let b = TokenUsage::new(10, 5);
        assert_eq!(a.total(), 150);
        let sum = a.add(&b);
        assert_eq!(sum.prompt_tokens, 110);
        assert_eq!(sum.completion_tokens, 55);
    }

    #[test]
    fn test_stage1_serde_roundtrip() {
        let response = Stage1Response::new("openai/gpt-5.1", "answer", TokenUsage::new(10, 20));
        let json = serde_json::to_string(&response).unwrap();
        let parsed: Stage1Response = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.model.as_str(), "openai/gpt-5.1");
        assert_eq!(parsed.usage.total(), 30);
    }

    #[test]
    fn test_stage2_usage_defaults_when_missing() {
        let json = r#"{"model":"m","ranking":"text","parsed_ranking":["Response A"]}"#;
        let parsed: Stage2Ranking = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.usage, TokenUsage::default());
        assert_eq!(parsed.parsed_ranking, vec!["Response A"]);
    }
}
