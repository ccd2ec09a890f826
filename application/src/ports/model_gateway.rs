//! Model gateway port
//!
//! Uniform async call to any named model. Adapters apply the per-call
//! timeout and the bounded retry; callers see either a completion or a
//! terminal error for that call.

use async_trait::async_trait;
use council_domain::{Model, ModelId, TokenUsage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during a gateway call
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    #[error("request timed out")]
    Timeout,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("api error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("missing api key (set {0})")]
    MissingApiKey(String),
}

impl GatewayError {
    /// Transient errors are worth one retry; the rest are terminal.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Timeout | GatewayError::Connection(_) => true,
            GatewayError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Role of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One chat message in a completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A completion request against a named model
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: ModelId,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(model: ModelId, messages: Vec<ChatMessage>) -> Self {
        Self {
            model,
            messages,
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A completed model call
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    /// Reasoning trace for thinking models, when the provider returns one
    pub reasoning: Option<String>,
    pub usage: TokenUsage,
}

impl Completion {
    pub fn new(content: impl Into<String>, usage: TokenUsage) -> Self {
        Self {
            content: content.into(),
            reasoning: None,
            usage,
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }
}

/// Gateway for model communication
///
/// This port defines how the application layer calls LLM providers.
/// Adapters live in the infrastructure layer.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Complete a chat request against the named model.
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, GatewayError>;

    /// List known models, enriched with live pricing where available.
    async fn list_models(&self) -> Result<Vec<Model>, GatewayError>;
}
