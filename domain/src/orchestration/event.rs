//! Lifecycle events streamed to the turn subscriber.
//!
//! One JSON object per event; the `type` field discriminates. Consumers
//! must ignore unknown event types rather than fail, so deserialization
//! keeps unknown-variant tolerance out of scope for the core (the enum is
//! what this producer emits, not a closed-world contract for readers).
//!
//! Ordering guarantees (enforced by the single emitting task): a stage's
//! `*_start` precedes its `*_complete`, and no event for stage N+1 is
//! emitted before stage N's `*_complete`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::model::ModelId;
use crate::council::aggregate::AggregateEntry;
use crate::council::stage::{Stage1Response, Stage2Ranking, Stage3Result};

/// Metadata attached to `stage2_complete`: the de-anonymization map and
/// the aggregate ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage2Metadata {
    pub label_to_model: BTreeMap<String, ModelId>,
    pub aggregate_rankings: Vec<AggregateEntry>,
}

/// Payload of `chat_response`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatPayload {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// Payload of `title_complete`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleData {
    pub title: String,
}

/// Payload of `complete`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteData {
    pub total_cost: f64,
}

/// A lifecycle event for one streaming turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    Stage1Start,
    Stage1Complete {
        data: Vec<Stage1Response>,
    },
    Stage2Start,
    Stage2Complete {
        data: Vec<Stage2Ranking>,
        metadata: Stage2Metadata,
    },
    Stage3Start,
    Stage3Complete {
        data: Stage3Result,
    },
    ChatStart,
    ChatResponse {
        data: ChatPayload,
    },
    TitleComplete {
        data: TitleData,
    },
    Complete {
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<CompleteData>,
    },
    Error {
        message: String,
    },
}

impl TurnEvent {
    /// The wire value of the `type` discriminator.
    pub fn event_type(&self) -> &'static str {
        match self {
            TurnEvent::Stage1Start => "stage1_start",
            TurnEvent::Stage1Complete { .. } => "stage1_complete",
            TurnEvent::Stage2Start => "stage2_start",
            TurnEvent::Stage2Complete { .. } => "stage2_complete",
            TurnEvent::Stage3Start => "stage3_start",
            TurnEvent::Stage3Complete { .. } => "stage3_complete",
            TurnEvent::ChatStart => "chat_start",
            TurnEvent::ChatResponse { .. } => "chat_response",
            TurnEvent::TitleComplete { .. } => "title_complete",
            TurnEvent::Complete { .. } => "complete",
            TurnEvent::Error { .. } => "error",
        }
    }

    /// True for the events that end a stream (`complete` / `error`).
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnEvent::Complete { .. } | TurnEvent::Error { .. })
    }
}
