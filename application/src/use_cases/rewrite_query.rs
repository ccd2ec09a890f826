//! Query rewrite use case
//!
//! Resolves follow-up coreference ("it", "that") into a self-contained
//! query before retrieval. Strictly best-effort: any failure falls back
//! to the original query, and queries that already look self-contained
//! are returned unchanged.

use std::sync::Arc;

use council_domain::{ModelId, ModelRegistry, PromptTemplate};
use tracing::{debug, info, warn};

use crate::ports::model_gateway::{ChatMessage, CompletionRequest, ModelGateway};

/// Queries longer than this are assumed self-contained.
const SELF_CONTAINED_WORDS: usize = 10;

/// Result of a rewrite attempt
#[derive(Debug, Clone)]
pub struct RewriteOutcome {
    pub query: String,
    /// Cost of the rewrite call in USD (0 when skipped or failed)
    pub cost_usd: f64,
}

/// Use case for rewriting follow-up queries
#[derive(Clone)]
pub struct RewriteQueryUseCase {
    gateway: Arc<dyn ModelGateway>,
    registry: Arc<ModelRegistry>,
    utility_model: ModelId,
}

impl RewriteQueryUseCase {
    pub fn new(
        gateway: Arc<dyn ModelGateway>,
        registry: Arc<ModelRegistry>,
        utility_model: ModelId,
    ) -> Self {
        Self {
            gateway,
            registry,
            utility_model,
        }
    }

    /// Rewrite `query` against the prior turn's final answer.
    ///
    /// Skips the model call (returning the input unchanged) when there is
    /// no prior answer or the query already looks self-contained.
    pub async fn execute(&self, query: &str, prior_answer: Option<&str>) -> RewriteOutcome {
        let unchanged = RewriteOutcome {
            query: query.to_string(),
            cost_usd: 0.0,
        };

        let Some(prior_answer) = prior_answer else {
            debug!("no prior turn, skipping rewrite");
            return unchanged;
        };

        if query.split_whitespace().count() > SELF_CONTAINED_WORDS {
            debug!("query looks self-contained, skipping rewrite");
            return unchanged;
        }

        let request = CompletionRequest::new(
            self.utility_model.clone(),
            vec![ChatMessage::user(PromptTemplate::rewrite_prompt(
                query,
                prior_answer,
            ))],
        );

        match self.gateway.complete(request).await {
            Ok(completion) => {
                let cost_usd = self
                    .registry
                    .pricing_or_default(&self.utility_model)
                    .cost_usd(&completion.usage);
                match clean_rewrite(&completion.content) {
                    Some(rewritten) => {
                        info!(original = query, rewritten, "query rewritten");
                        RewriteOutcome {
                            query: rewritten,
                            cost_usd,
                        }
                    }
                    None => RewriteOutcome {
                        query: query.to_string(),
                        cost_usd,
                    },
                }
            }
            Err(e) => {
                warn!("query rewrite failed, using original: {e}");
                unchanged
            }
        }
    }
}

/// Extract the first plausible rewritten question from model output.
///
/// Models sometimes return meta-commentary or several options; take the
/// first line that looks like an actual question and strip list/quote
/// prefixes.
fn clean_rewrite(content: &str) -> Option<String> {
    const META_MARKERS: &[&str] = &["option", "rewriting", "here are", "could be"];
    const PREFIXES: &[&str] = &["> ", "* ", "- ", "**"];

    for line in content.lines() {
        let mut line = line.trim();
        if line.is_empty() {
            continue;
        }
        let lower = line.to_lowercase();
        if META_MARKERS.iter().any(|m| lower.contains(m)) {
            continue;
        }
        for prefix in PREFIXES {
            if let Some(stripped) = line.strip_prefix(prefix) {
                line = stripped.trim_start();
            }
        }
        if line.len() > 10 {
            return Some(line.to_string());
        }
    }
    None
}
