//! Conversation and Turn entities.
//!
//! A conversation is created on the first user message and mutated only by
//! completed turns; a turn is immutable once all its stages are recorded.
//! Partial turns exist only in memory during streaming; on a stage-fatal
//! failure the turn is discarded, never persisted half-written.

use serde::{Deserialize, Serialize};

use crate::budget::policy::SessionBudgetPolicy;
use crate::core::model::ModelId;
use crate::council::stage::{Stage1Response, Stage2Ranking, Stage3Result};

/// Opaque conversation identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single turn in a conversation.
///
/// Assistant turns produced by the council pipeline carry all three stage
/// payloads; chat-pipeline turns carry only `content` (and optionally the
/// chairman's reasoning trace).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    /// Attachment ids referenced by this turn (extraction is external)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage1: Option<Vec<Stage1Response>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage2: Option<Vec<Stage2Ranking>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage3: Option<Stage3Result>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Cost of producing this turn in USD
    #[serde(default)]
    pub cost_usd: f64,
}

impl Turn {
    pub fn user(content: impl Into<String>, attachments: Vec<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            attachments,
            stage1: None,
            stage2: None,
            stage3: None,
            reasoning: None,
            cost_usd: 0.0,
        }
    }

    /// Assistant turn from a full council deliberation.
    pub fn council(
        stage1: Vec<Stage1Response>,
        stage2: Vec<Stage2Ranking>,
        stage3: Stage3Result,
        cost_usd: f64,
    ) -> Self {
        Self {
            role: Role::Assistant,
            content: stage3.response.clone(),
            attachments: Vec::new(),
            stage1: Some(stage1),
            stage2: Some(stage2),
            stage3: Some(stage3),
            reasoning: None,
            cost_usd,
        }
    }

    /// Assistant turn from the chat pipeline.
    pub fn chat(content: impl Into<String>, reasoning: Option<String>, cost_usd: f64) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            attachments: Vec::new(),
            stage1: None,
            stage2: None,
            stage3: None,
            reasoning,
            cost_usd,
        }
    }

    /// Final answer text shown to the user: the stage-3 synthesis when
    /// present, otherwise the plain content.
    pub fn final_text(&self) -> &str {
        self.stage3
            .as_ref()
            .map(|s| s.response.as_str())
            .unwrap_or(&self.content)
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}

/// A conversation: ordered turns plus council configuration and spend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    pub turns: Vec<Turn>,
    /// Council member model ids (Stage 1/2 participants)
    pub council: Vec<ModelId>,
    /// Chairman model id (Stage 3 / chat pipeline)
    pub chairman: ModelId,
    /// Cumulative cost across all completed turns in USD
    #[serde(default)]
    pub cost_usd: f64,
    pub budget: SessionBudgetPolicy,
}

impl Conversation {
    pub fn new(
        id: ConversationId,
        council: Vec<ModelId>,
        chairman: ModelId,
        budget: SessionBudgetPolicy,
    ) -> Self {
        Self {
            id,
            title: "New Conversation".to_string(),
            turns: Vec::new(),
            council,
            chairman,
            cost_usd: 0.0,
            budget,
        }
    }

    /// Structural mode decision: the first user message always runs the
    /// council pipeline, every later message runs the chat pipeline.
    pub fn is_first_message(&self) -> bool {
        self.turns.is_empty()
    }

    /// Number of completed assistant turns (used as the turn index for
    /// retrieval indexing).
    pub fn assistant_turn_count(&self) -> usize {
        self.turns.iter().filter(|t| t.is_assistant()).count()
    }

    /// Most recent assistant turn, if any.
    pub fn last_assistant_turn(&self) -> Option<&Turn> {
        self.turns.iter().rev().find(|t| t.is_assistant())
    }

    /// Append a completed turn and fold its cost into the totals.
    ///
    /// Returns any budget notification thresholds newly crossed.
    pub fn push_turn(&mut self, turn: Turn) -> Vec<f64> {
        self.cost_usd += turn.cost_usd;
        let crossed = self.budget.record_spend(turn.cost_usd);
        self.turns.push(turn);
        crossed
    }
}
