//! Wire types for the OpenRouter chat-completions and models endpoints.

use council_domain::{Pricing, TokenUsage};
use council_application::{ChatRole, CompletionRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ==================== Chat completions ====================

#[derive(Debug, Serialize)]
pub struct ChatBody {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct WireMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatBody {
    pub fn from_request(request: &CompletionRequest) -> Self {
        Self {
            model: request.model.to_string(),
            messages: request
                .messages
                .iter()
                .map(|m| WireMessage {
                    role: match m.role {
                        ChatRole::System => "system",
                        ChatRole::User => "user",
                        ChatRole::Assistant => "assistant",
                    },
                    content: m.content.clone(),
                })
                .collect(),
            max_tokens: request.max_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    /// Reasoning text from thinking models
    #[serde(default)]
    pub reasoning: Option<String>,
    /// Structured reasoning steps (older wire format)
    #[serde(default)]
    pub reasoning_details: Option<Vec<Value>>,
}

impl ResponseMessage {
    /// Collapse the two reasoning wire formats into one string.
    ///
    /// Prefers the flat `reasoning` field; falls back to the first
    /// `reasoning.text` entry of `reasoning_details`.
    pub fn extract_reasoning(&self) -> Option<String> {
        if let Some(reasoning) = &self.reasoning
            && !reasoning.is_empty()
        {
            return Some(reasoning.clone());
        }

        self.reasoning_details.as_ref()?.iter().find_map(|step| {
            (step.get("type")?.as_str()? == "reasoning.text")
                .then(|| step.get("text")?.as_str().map(|s| s.to_string()))
                .flatten()
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct WireUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
}

impl WireUsage {
    pub fn into_usage(self) -> TokenUsage {
        TokenUsage::new(self.prompt_tokens, self.completion_tokens)
    }
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
}

// ==================== Model listing ====================

#[derive(Debug, Deserialize)]
pub struct ModelsResponse {
    pub data: Vec<LiveModel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiveModel {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub context_length: Option<u32>,
    #[serde(default)]
    pub pricing: Option<LivePricing>,
}

/// OpenRouter returns per-token prices as decimal strings.
#[derive(Debug, Clone, Deserialize)]
pub struct LivePricing {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub completion: Option<String>,
}

impl LiveModel {
    /// Convert per-token string prices to per-million USD.
    pub fn pricing_per_million(&self) -> Option<Pricing> {
        let pricing = self.pricing.as_ref()?;
        let prompt: f64 = pricing.prompt.as_deref()?.parse().ok()?;
        let completion: f64 = pricing.completion.as_deref()?.parse().ok()?;
        Some(Pricing::new(prompt * 1_000_000.0, completion * 1_000_000.0))
    }
}
