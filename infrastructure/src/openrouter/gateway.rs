//! OpenRouter HTTP gateway.
//!
//! Implements the [`ModelGateway`] port over the chat-completions API.
//! Every call gets a per-call timeout and a small bounded retry on
//! transient failure; non-transient errors surface immediately.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use council_application::{Completion, CompletionRequest, GatewayError, ModelGateway};
use council_domain::{Model, ModelRegistry, TokenUsage};
use tracing::{debug, warn};

use super::catalog::ModelCatalog;
use super::protocol::{ChatBody, ChatResponse, ErrorBody};

/// Connection settings for the gateway
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
    /// Retries after the first attempt, for transient failures only
    pub max_retries: u32,
}

impl GatewaySettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(120),
            max_retries: 1,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// OpenRouter adapter for the [`ModelGateway`] port.
pub struct OpenRouterGateway {
    client: reqwest::Client,
    settings: GatewaySettings,
    catalog: ModelCatalog,
}

impl OpenRouterGateway {
    /// Create a gateway. Fails when the API key is blank.
    pub fn new(
        settings: GatewaySettings,
        curated: Arc<ModelRegistry>,
    ) -> Result<Self, GatewayError> {
        if settings.api_key.trim().is_empty() {
            return Err(GatewayError::MissingApiKey("OPENROUTER_API_KEY".to_string()));
        }

        let client = reqwest::Client::new();
        let catalog = ModelCatalog::new(curated);

        Ok(Self {
            client,
            settings,
            catalog,
        })
    }

    async fn try_complete(&self, body: &ChatBody) -> Result<Completion, GatewayError> {
        let send = self
            .client
            .post(format!("{}/chat/completions", self.settings.base_url))
            .bearer_auth(&self.settings.api_key)
            .header("HTTP-Referer", "https://github.com/llm-council/llm-council")
            .header("X-Title", "llm-council")
            .json(body)
            .send();

        let response = tokio::time::timeout(self.settings.timeout, send)
            .await
            .map_err(|_| GatewayError::Timeout)?
            .map_err(|e| GatewayError::Connection(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::Connection(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| text.chars().take(200).collect());
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&text).map_err(|e| {
            GatewayError::InvalidResponse(format!(
                "{e}: {}",
                text.chars().take(200).collect::<String>()
            ))
        })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::InvalidResponse("no choices in response".to_string()))?;

        let reasoning = choice.message.extract_reasoning();
        let content = choice.message.content.unwrap_or_default();
        let usage = parsed
            .usage
            .map(|u| u.into_usage())
            .unwrap_or_else(TokenUsage::default);

        let mut completion = Completion::new(content, usage);
        if let Some(reasoning) = reasoning {
            completion = completion.with_reasoning(reasoning);
        }
        Ok(completion)
    }

    async fn fetch_live_models(&self) -> Result<Vec<super::protocol::LiveModel>, GatewayError> {
        let send = self
            .client
            .get(format!("{}/models", self.settings.base_url))
            .bearer_auth(&self.settings.api_key)
            .send();

        let response = tokio::time::timeout(self.settings.timeout, send)
            .await
            .map_err(|_| GatewayError::Timeout)?
            .map_err(|e| GatewayError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GatewayError::Api {
                status: response.status().as_u16(),
                message: "model listing failed".to_string(),
            });
        }

        let listing: super::protocol::ModelsResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        Ok(listing.data)
    }
}

#[async_trait]
impl ModelGateway for OpenRouterGateway {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, GatewayError> {
        let body = ChatBody::from_request(&request);
        let mut attempt = 0u32;

        loop {
            match self.try_complete(&body).await {
                Ok(completion) => {
                    debug!(model = %request.model, attempt, "completion received");
                    return Ok(completion);
                }
                Err(e) if e.is_transient() && attempt < self.settings.max_retries => {
                    warn!(model = %request.model, attempt, "transient gateway error, retrying: {e}");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn list_models(&self) -> Result<Vec<Model>, GatewayError> {
        let live = match self.catalog.cached_live().await {
            Some(live) => Some(live),
            None => match self.fetch_live_models().await {
                Ok(models) => {
                    self.catalog.store_live(models.clone()).await;
                    Some(models)
                }
                Err(e) => {
                    warn!("live model listing unavailable: {e}");
                    self.catalog.stale_live().await
                }
            },
        };

        Ok(self.catalog.merge(live.as_deref()))
    }
}
