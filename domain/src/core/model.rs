//! Model records and the immutable model registry.
//!
//! Orchestration code is generic over the [`Model`] record and never
//! branches on specific model ids. The registry is built once (curated
//! defaults, optionally enriched with live listing data) and read-only
//! afterwards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::DomainError;
use crate::council::stage::TokenUsage;

/// Opaque model identifier (e.g. "openai/gpt-5.1")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short display name: the segment after the provider prefix.
    ///
    /// E.g. "anthropic/claude-sonnet-4.5" -> "claude-sonnet-4.5"
    pub fn short_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ModelId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ModelId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Per-million-token pricing in USD
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    /// USD per million input tokens
    pub input: f64,
    /// USD per million output tokens
    pub output: f64,
}

impl Pricing {
    pub fn new(input: f64, output: f64) -> Self {
        Self { input, output }
    }

    /// Zero pricing (free-tier models)
    pub fn free() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Conservative default used when a model has no known pricing.
    pub fn conservative() -> Self {
        Self::new(1.0, 5.0)
    }

    /// Cost in USD for the given token usage.
    pub fn cost_usd(&self, usage: &TokenUsage) -> f64 {
        (usage.prompt_tokens as f64 / 1_000_000.0) * self.input
            + (usage.completion_tokens as f64 / 1_000_000.0) * self.output
    }
}

/// Where a model may be used in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelRole {
    /// Stage 1/2 participant only
    Council,
    /// Stage 3 synthesizer only
    Chairman,
    /// Either role
    Both,
}

impl ModelRole {
    pub fn can_deliberate(&self) -> bool {
        matches!(self, ModelRole::Council | ModelRole::Both)
    }

    pub fn can_synthesize(&self) -> bool {
        matches!(self, ModelRole::Chairman | ModelRole::Both)
    }
}

/// Cost/quality tier hint for budget routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    Budget,
    Mid,
    Premium,
}

/// An LLM model record (Value Object)
///
/// Closed record held in the [`ModelRegistry`]; pricing and name may be
/// refreshed from a live listing, everything else is curated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub id: ModelId,
    pub name: String,
    pub pricing: Pricing,
    #[serde(default)]
    pub capabilities: Vec<String>,
    pub role: ModelRole,
    pub tier: ModelTier,
    #[serde(default)]
    pub context_length: u32,
    /// Whether the model appeared in the most recent live listing.
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

impl Model {
    pub fn new(id: impl Into<ModelId>, name: impl Into<String>, pricing: Pricing) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            pricing,
            capabilities: Vec::new(),
            role: ModelRole::Council,
            tier: ModelTier::Mid,
            context_length: 0,
            available: true,
        }
    }

    pub fn with_role(mut self, role: ModelRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_tier(mut self, tier: ModelTier) -> Self {
        self.tier = tier;
        self
    }

    pub fn with_capabilities(mut self, capabilities: &[&str]) -> Self {
        self.capabilities = capabilities.iter().map(|s| s.to_string()).collect();
        self
    }
}

/// Immutable registry of known models, keyed by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelRegistry {
    models: BTreeMap<ModelId, Model>,
}

impl ModelRegistry {
    pub fn new(models: Vec<Model>) -> Self {
        Self {
            models: models.into_iter().map(|m| (m.id.clone(), m)).collect(),
        }
    }

    pub fn get(&self, id: &ModelId) -> Option<&Model> {
        self.models.get(id)
    }

    /// Look up a model, failing with a domain error when unknown.
    pub fn require(&self, id: &ModelId) -> Result<&Model, DomainError> {
        self.models
            .get(id)
            .ok_or_else(|| DomainError::UnknownModel(id.to_string()))
    }

    /// Pricing for a model, falling back to a conservative default.
    pub fn pricing_or_default(&self, id: &ModelId) -> Pricing {
        self.models
            .get(id)
            .map(|m| m.pricing)
            .unwrap_or_else(Pricing::conservative)
    }

    pub fn contains(&self, id: &ModelId) -> bool {
        self.models.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Model> {
        self.models.values()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Models eligible for the council (Stage 1/2).
    pub fn council_candidates(&self) -> impl Iterator<Item = &Model> {
        self.models.values().filter(|m| m.role.can_deliberate())
    }

    /// Models eligible as chairman (Stage 3 / chat).
    pub fn chairman_candidates(&self) -> impl Iterator<Item = &Model> {
        self.models.values().filter(|m| m.role.can_synthesize())
    }

    /// The curated default registry.
    ///
    /// Pricing values are fallbacks for offline use; a live listing
    /// refresh overwrites name/pricing/context_length.
    pub fn curated() -> Self {
        Self::new(vec![
            Model::new("openai/gpt-5.2", "GPT-5.2", Pricing::new(5.0, 20.0))
                .with_role(ModelRole::Chairman)
                .with_tier(ModelTier::Premium)
                .with_capabilities(&["frontier", "reasoning"]),
            Model::new(
                "anthropic/claude-opus-4.5",
                "Claude Opus 4.5",
                Pricing::new(15.0, 75.0),
            )
            .with_role(ModelRole::Chairman)
            .with_tier(ModelTier::Premium)
            .with_capabilities(&["frontier", "reasoning"]),
            Model::new("openai/gpt-5.1", "GPT-5.1", Pricing::new(3.0, 15.0))
                .with_role(ModelRole::Both)
                .with_tier(ModelTier::Mid)
                .with_capabilities(&["reasoning", "generalist"]),
            Model::new(
                "anthropic/claude-sonnet-4.5",
                "Claude Sonnet 4.5",
                Pricing::new(3.0, 15.0),
            )
            .with_role(ModelRole::Both)
            .with_tier(ModelTier::Mid)
            .with_capabilities(&["reasoning", "thinking"]),
            Model::new(
                "google/gemini-3-pro-preview",
                "Gemini 3 Pro Preview",
                Pricing::new(2.0, 12.0),
            )
            .with_role(ModelRole::Both)
            .with_tier(ModelTier::Mid)
            .with_capabilities(&["thinking", "reasoning"]),
            Model::new(
                "google/gemini-2.5-flash",
                "Gemini 2.5 Flash",
                Pricing::new(0.3, 2.5),
            )
            .with_role(ModelRole::Both)
            .with_tier(ModelTier::Budget)
            .with_capabilities(&["fast"]),
            Model::new("x-ai/grok-4-fast", "Grok 4 Fast", Pricing::new(0.2, 0.5))
                .with_role(ModelRole::Both)
                .with_tier(ModelTier::Budget)
                .with_capabilities(&["reasoning", "fast"]),
            Model::new(
                "moonshotai/kimi-k2-thinking",
                "Kimi K2 Thinking",
                Pricing::new(0.45, 2.35),
            )
            .with_role(ModelRole::Both)
            .with_tier(ModelTier::Mid)
            .with_capabilities(&["thinking", "long-context"]),
            Model::new(
                "deepseek/deepseek-v3.2-exp",
                "DeepSeek V3.2 Exp",
                Pricing::new(0.216, 0.328),
            )
            .with_role(ModelRole::Council)
            .with_tier(ModelTier::Budget)
            .with_capabilities(&["reasoning", "thinking"]),
            Model::new(
                "anthropic/claude-haiku-4.5",
                "Claude Haiku 4.5",
                Pricing::new(0.8, 4.0),
            )
            .with_role(ModelRole::Council)
            .with_tier(ModelTier::Budget)
            .with_capabilities(&["fast", "value"]),
            Model::new(
                "google/gemini-2.5-flash-lite",
                "Gemini 2.5 Flash Lite",
                Pricing::new(0.1, 0.4),
            )
            .with_role(ModelRole::Council)
            .with_tier(ModelTier::Budget)
            .with_capabilities(&["fast"]),
            Model::new("z-ai/glm-4.6", "GLM 4.6", Pricing::new(0.2, 0.8))
                .with_role(ModelRole::Council)
                .with_tier(ModelTier::Budget)
                .with_capabilities(&["generalist"]),
        ])
    }

    /// Default council members: the first five deliberation-capable models.
    pub fn default_council(&self) -> Vec<ModelId> {
        self.council_candidates()
            .take(5)
            .map(|m| m.id.clone())
            .collect()
    }

    /// Default chairman: cheapest synthesis-capable model by input price.
    pub fn default_chairman(&self) -> Option<ModelId> {
        self.chairman_candidates()
            .min_by(|a, b| {
                a.pricing
                    .input
                    .partial_cmp(&b.pricing.input)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|m| m.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_id_short_name() {
        let id = ModelId::new("anthropic/claude-sonnet-4.5");
        assert_eq!(id.short_name(), "claude-sonnet-4.5");

        let bare = ModelId::new("local-model");
        assert_eq!(bare.short_name(), "local-model");
    }

    #[test]
    fn test_pricing_cost() {
        let pricing = Pricing::new(3.0, 15.0);
        let usage = TokenUsage::new(1_000_000, 1_000_000);
        assert!((pricing.cost_usd(&usage) - 18.0).abs() < 1e-9);

        let free = Pricing::free();
        assert_eq!(free.cost_usd(&usage), 0.0);
    }

    #[test]
    fn test_role_checks() {
        assert!(ModelRole::Both.can_deliberate());
        assert!(ModelRole::Both.can_synthesize());
        assert!(ModelRole::Council.can_deliberate());
        assert!(!ModelRole::Council.can_synthesize());
        assert!(!ModelRole::Chairman.can_deliberate());
    }

    #[test]
    fn test_curated_registry_roles() {
        let registry = ModelRegistry::curated();
        assert!(!registry.is_empty());
        assert!(registry.council_candidates().count() >= 5);
        assert!(registry.chairman_candidates().count() >= 2);
    }

    #[test]
    fn test_require_unknown_model() {
        let registry = ModelRegistry::curated();
        let err = registry.require(&ModelId::new("no/such-model")).unwrap_err();
        assert!(err.to_string().contains("no/such-model"));
    }

    #[test]
    fn test_default_chairman_is_cheapest() {
        let registry = ModelRegistry::curated();
        let chairman = registry.default_chairman().unwrap();
        let model = registry.get(&chairman).unwrap();
        for candidate in registry.chairman_candidates() {
            assert!(model.pricing.input <= candidate.pricing.input);
        }
    }

    #[test]
    fn test_model_serde_roundtrip() {
        let model = Model::new("test/model", "Test", Pricing::new(1.0, 2.0))
            .with_role(ModelRole::Both)
            .with_capabilities(&["fast"]);
        let json = serde_json::to_string(&model).unwrap();
        let parsed: Model = serde_json::from_str(&json).unwrap();
        assert_eq!(model, parsed);
    }
}
