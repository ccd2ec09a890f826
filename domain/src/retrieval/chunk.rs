//! Retrieval chunks and their deterministic identity.
//!
//! A chunk is one indexed piece of a completed turn: a council member's
//! stage-1 answer, the stage-3 synthesis, or the user question itself.
//! Chunk identity is derived from `conversation:turn:stage:model`, so
//! re-indexing the same turn overwrites rather than duplicates.

use serde::{Deserialize, Serialize};

use crate::conversation::entities::ConversationId;
use crate::core::model::ModelId;

/// Which part of a turn a chunk came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStage {
    /// The original user question
    Question,
    /// A single council member's stage-1 answer
    Opinion,
    /// The chairman's final synthesis
    Synthesis,
}

impl ChunkStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkStage::Question => "question",
            ChunkStage::Opinion => "opinion",
            ChunkStage::Synthesis => "synthesis",
        }
    }
}

impl std::fmt::Display for ChunkStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Deterministic chunk identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(String);

impl ChunkId {
    pub fn derive(
        conversation: &ConversationId,
        turn_index: usize,
        stage: ChunkStage,
        model: &ModelId,
    ) -> Self {
        Self(format!("{conversation}:{turn_index}:{stage}:{model}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChunkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One indexed context chunk, read-only after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalChunk {
    pub conversation: ConversationId,
    pub turn_index: usize,
    pub stage: ChunkStage,
    pub model: ModelId,
    /// Chunk text, prefixed with the originating question so it stands
    /// alone when injected into a later prompt.
    pub text: String,
    /// Milliseconds since the Unix epoch at indexing time
    pub created_at_ms: u64,
}

impl RetrievalChunk {
    pub fn new(
        conversation: ConversationId,
        turn_index: usize,
        stage: ChunkStage,
        model: ModelId,
        text: impl Into<String>,
        created_at_ms: u64,
    ) -> Self {
        Self {
            conversation,
            turn_index,
            stage,
            model,
            text: text.into(),
            created_at_ms,
        }
    }

    pub fn id(&self) -> ChunkId {
        ChunkId::derive(&self.conversation, self.turn_index, self.stage, &self.model)
    }

    /// Standard chunk text: the originating question followed by the answer.
    pub fn format_text(question: &str, answer: &str) -> String {
        format!("Q: {question}\n\nA: {answer}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_is_deterministic() {
        let conversation = ConversationId::new("c1");
        let model = ModelId::new("openai/gpt-5.1");
        let a = ChunkId::derive(&conversation, 2, ChunkStage::Opinion, &model);
        let b = ChunkId::derive(&conversation, 2, ChunkStage::Opinion, &model);
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "c1:2:opinion:openai/gpt-5.1");
    }

    #[test]
    fn test_chunk_id_distinguishes_components() {
        let conversation = ConversationId::new("c1");
        let model = ModelId::new("m");
        let base = ChunkId::derive(&conversation, 0, ChunkStage::Opinion, &model);
        assert_ne!(base, ChunkId::derive(&conversation, 1, ChunkStage::Opinion, &model));
        assert_ne!(base, ChunkId::derive(&conversation, 0, ChunkStage::Synthesis, &model));
        assert_ne!(
            base,
            ChunkId::derive(&ConversationId::new("c2"), 0, ChunkStage::Opinion, &model)
        );
    }

    #[test]
    fn test_format_text_prefixes_question() {
        let text = RetrievalChunk::format_text("What is RRF?", "A fusion method.");
        assert!(text.starts_with("Q: What is RRF?"));
        assert!(text.contains("A: A fusion method."));
    }
}
