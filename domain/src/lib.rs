//! Domain layer for llm-council
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Council
//!
//! A fixed set of models answers a question independently (Stage 1), then
//! peer-ranks the anonymized answers (Stage 2), and a chairman model
//! synthesizes the final answer (Stage 3).
//!
//! ## Chat
//!
//! Follow-up turns skip the full deliberation: the chairman alone answers,
//! grounded in context retrieved from indexed prior turns.

pub mod budget;
pub mod core;
pub mod council;
pub mod conversation;
pub mod orchestration;
pub mod prompt;
pub mod retrieval;

// Re-export commonly used types
pub use budget::{
    estimate::{estimate_chat_cost, estimate_council_cost},
    policy::SessionBudgetPolicy,
    router::{
        ContextTier, ExecutionMode, RouteReason, TaskIntent, TierCeilings, classify_intent, route,
    },
};
pub use self::core::{
    error::DomainError,
    model::{Model, ModelId, ModelRegistry, ModelRole, ModelTier, Pricing},
    question::Question,
};
pub use council::{
    aggregate::{AggregateEntry, aggregate_rankings},
    confidence::{ConfidenceScore, ModelConsensus, consensus_metrics, overall_confidence},
    labels::LabelMap,
    parsing::parse_ranking_labels,
    stage::{Stage1Response, Stage2Ranking, Stage3Result, TokenUsage},
};
pub use conversation::entities::{Conversation, ConversationId, Role, Turn};
pub use orchestration::{
    event::{ChatPayload, CompleteData, Stage2Metadata, TitleData, TurnEvent},
    state::{PipelineKind, TurnMode, TurnState, TurnStateMachine},
};
pub use prompt::PromptTemplate;
pub use retrieval::{
    chunk::{ChunkId, ChunkStage, RetrievalChunk},
    fusion::{DEFAULT_RRF_K, fuse, select_within_budget},
    lexical::{rank_lexical, tokenize},
    render::render_context,
    semantic::{cosine_similarity, rank_semantic},
    tokens::estimate_tokens,
};
