//! Configuration file schema (`council.toml`).
//!
//! Example configuration:
//!
//! ```toml
//! [council]
//! members = ["openai/gpt-5.1", "anthropic/claude-sonnet-4.5"]
//! chairman = "google/gemini-2.5-flash"
//! include_self_in_ranking = true
//!
//! [budget]
//! budget_usd = 2.0
//! notify_thresholds = [0.70, 0.85, 1.00]
//!
//! [retrieval]
//! rrf_k = 60.0
//! min_fused_score = 0.001
//! ```

use std::path::PathBuf;
use std::time::Duration;

use council_application::RetrievalParams;
use council_domain::{ModelId, ModelRegistry, SessionBudgetPolicy, TierCeilings};
use serde::{Deserialize, Serialize};

/// Root configuration, merged from defaults, the global config file, the
/// project file, and an explicit `--config` path.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub council: CouncilSection,
    pub gateway: GatewaySection,
    pub budget: BudgetSection,
    pub retrieval: RetrievalSection,
    pub logging: LoggingSection,
}

/// `[council]` section: membership and ranking policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CouncilSection {
    /// Council member model ids; empty means the registry defaults
    pub members: Vec<String>,
    /// Chairman model id; unset means the registry default
    pub chairman: Option<String>,
    /// Fast model for titles and query rewriting
    pub utility_model: String,
    /// Whether evaluators rank an anonymized copy of their own answer
    pub include_self_in_ranking: bool,
}

impl Default for CouncilSection {
    fn default() -> Self {
        Self {
            members: Vec::new(),
            chairman: None,
            utility_model: "google/gemini-2.5-flash".to_string(),
            include_self_in_ranking: true,
        }
    }
}

/// `[gateway]` section: OpenRouter connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySection {
    pub base_url: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            timeout_secs: 120,
            max_retries: 1,
        }
    }
}

impl GatewaySection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// `[budget]` section: session spend policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetSection {
    /// Optional cap in USD; unset means unconstrained
    pub budget_usd: Option<f64>,
    pub notify_thresholds: Vec<f64>,
}

impl Default for BudgetSection {
    fn default() -> Self {
        Self {
            budget_usd: None,
            notify_thresholds: vec![0.70, 0.85, 1.00],
        }
    }
}

/// `[retrieval]` section: fusion tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSection {
    pub rrf_k: f64,
    pub min_fused_score: f64,
    pub min_similarity: f64,
    /// Token ceiling for the low context tier
    pub low_tier_tokens: usize,
    /// Token ceiling for the medium context tier
    pub medium_tier_tokens: usize,
    /// Token ceiling for the high context tier
    pub high_tier_tokens: usize,
}

impl Default for RetrievalSection {
    fn default() -> Self {
        let params = RetrievalParams::default();
        let ceilings = TierCeilings::default();
        Self {
            rrf_k: params.rrf_k,
            min_fused_score: params.min_fused_score,
            min_similarity: params.min_similarity,
            low_tier_tokens: ceilings.low,
            medium_tier_tokens: ceilings.medium,
            high_tier_tokens: ceilings.high,
        }
    }
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Directory for JSONL turn logs; unset disables event logging
    pub turn_log_dir: Option<PathBuf>,
}

impl FileConfig {
    /// Council members: configured ids, or the registry defaults.
    pub fn council_members(&self, registry: &ModelRegistry) -> Vec<ModelId> {
        if self.council.members.is_empty() {
            registry.default_council()
        } else {
            self.council
                .members
                .iter()
                .map(|m| ModelId::from(m.as_str()))
                .collect()
        }
    }

    /// Chairman: configured id, or the registry default.
    pub fn chairman(&self, registry: &ModelRegistry) -> Option<ModelId> {
        self.council
            .chairman
            .as_deref()
            .map(ModelId::from)
            .or_else(|| registry.default_chairman())
    }

    pub fn utility_model(&self) -> ModelId {
        ModelId::from(self.council.utility_model.as_str())
    }

    pub fn retrieval_params(&self) -> RetrievalParams {
        RetrievalParams {
            rrf_k: self.retrieval.rrf_k,
            min_fused_score: self.retrieval.min_fused_score,
            min_similarity: self.retrieval.min_similarity,
        }
    }

    pub fn tier_ceilings(&self) -> TierCeilings {
        TierCeilings {
            low: self.retrieval.low_tier_tokens,
            medium: self.retrieval.medium_tier_tokens,
            high: self.retrieval.high_tier_tokens,
        }
    }

    pub fn budget_policy(&self) -> SessionBudgetPolicy {
        SessionBudgetPolicy::new(self.budget.budget_usd)
            .with_thresholds(self.budget.notify_thresholds.clone())
    }

    /// Validate the configuration against a registry, returning
    /// human-readable issues.
    pub fn validate(&self, registry: &ModelRegistry) -> Vec<String> {
        let mut issues = Vec::new();

        for member in &self.council.members {
            if !registry.contains(&ModelId::from(member.as_str())) {
                issues.push(format!("council: unknown member model '{member}'"));
            }
        }
        if let Some(chairman) = &self.council.chairman
            && !registry.contains(&ModelId::from(chairman.as_str()))
        {
            issues.push(format!("council: unknown chairman model '{chairman}'"));
        }

        if !self
            .budget
            .notify_thresholds
            .windows(2)
            .all(|w| w[0] < w[1])
        {
            issues.push("budget: notify_thresholds must be strictly ascending".to_string());
        }

        if self.gateway.timeout_secs == 0 {
            issues.push("gateway: timeout_secs must be positive".to_string());
        }
        if self.retrieval.rrf_k <= 0.0 {
            issues.push("retrieval: rrf_k must be positive".to_string());
        }
        for (name, tokens) in [
            ("low_tier_tokens", self.retrieval.low_tier_tokens),
            ("medium_tier_tokens", self.retrieval.medium_tier_tokens),
            ("high_tier_tokens", self.retrieval.high_tier_tokens),
        ] {
            if tokens == 0 {
                issues.push(format!("retrieval: {name} must be positive"));
            }
        }

        issues
    }
}
