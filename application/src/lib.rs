//! Application layer for llm-council
//!
//! Use cases orchestrating the deliberation and chat pipelines, the
//! retrieval engine, and the ports that infrastructure adapters implement.

pub mod ports;
pub mod retrieval;
pub mod stream;
pub mod use_cases;

pub use ports::{
    conversation_store::{ConversationStore, ConversationSummary, StoreError},
    embedder::{EmbedError, Embedder},
    model_gateway::{
        ChatMessage, ChatRole, Completion, CompletionRequest, GatewayError, ModelGateway,
    },
    turn_logger::{NoTurnLogger, TurnLogger},
};
pub use retrieval::{RetrievalEngine, RetrievalParams, TurnDocuments};
pub use stream::EventSender;
pub use use_cases::{
    rewrite_query::{RewriteOutcome, RewriteQueryUseCase},
    run_chat::{ChatOutcome, RunChatUseCase},
    run_council::{CouncilError, CouncilOutcome, RunCouncilUseCase},
    send_message::{SendMessageError, SendMessageUseCase},
};
