//! Hybrid retrieval engine.
//!
//! Holds the per-conversation chunk index and runs the two rankers plus
//! RRF fusion on retrieval. The index is appended to by at most one
//! indexing operation per turn and read concurrently by retrieval
//! queries: single-writer/many-reader behind an `RwLock`, with chunk
//! upserts keyed by deterministic [`ChunkId`] so re-indexing a turn
//! overwrites rather than duplicates.
//!
//! Cross-conversation leakage is forbidden: every query is restricted to
//! its own conversation's chunks.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use council_domain::{
    ChunkId, ChunkStage, ConversationId, ModelId, RetrievalChunk, Stage1Response, estimate_tokens,
    fuse, rank_lexical, rank_semantic, select_within_budget,
};
use tracing::{debug, warn};

use crate::ports::embedder::{EmbedError, Embedder};

/// Tuning knobs for fusion and thresholds.
#[derive(Debug, Clone, Copy)]
pub struct RetrievalParams {
    /// RRF smoothing constant
    pub rrf_k: f64,
    /// Minimum fused score for a chunk to be considered at all
    pub min_fused_score: f64,
    /// Minimum cosine similarity for the semantic ranker
    pub min_similarity: f64,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            rrf_k: council_domain::DEFAULT_RRF_K,
            min_fused_score: 0.001,
            min_similarity: 0.2,
        }
    }
}

/// The documents of one completed turn, ready for indexing.
pub struct TurnDocuments<'a> {
    pub conversation: &'a ConversationId,
    pub turn_index: usize,
    pub question: &'a str,
    /// Stage-1 answers (empty for chat turns)
    pub opinions: &'a [Stage1Response],
    /// Final synthesis: (author, text)
    pub synthesis: Option<(&'a ModelId, &'a str)>,
    pub created_at_ms: u64,
}

struct IndexedChunk {
    chunk: RetrievalChunk,
    embedding: Vec<f32>,
    tokens: usize,
}

/// Hybrid lexical + semantic retrieval over indexed turns.
pub struct RetrievalEngine {
    embedder: Arc<dyn Embedder>,
    params: RetrievalParams,
    index: RwLock<HashMap<ConversationId, BTreeMap<ChunkId, IndexedChunk>>>,
}

impl RetrievalEngine {
    pub fn new(embedder: Arc<dyn Embedder>, params: RetrievalParams) -> Self {
        Self {
            embedder,
            params,
            index: RwLock::new(HashMap::new()),
        }
    }

    /// Index a completed turn: the user question, every stage-1 answer,
    /// and the synthesis, each prefixed with the originating question.
    ///
    /// Idempotent under retry: deterministic chunk ids make re-indexing
    /// an overwrite. Returns the number of chunks indexed.
    pub async fn index_turn(&self, docs: TurnDocuments<'_>) -> Result<usize, EmbedError> {
        let mut chunks: Vec<RetrievalChunk> = Vec::new();

        chunks.push(RetrievalChunk::new(
            docs.conversation.clone(),
            docs.turn_index,
            ChunkStage::Question,
            ModelId::new("user"),
            docs.question,
            docs.created_at_ms,
        ));

        for opinion in docs.opinions {
            chunks.push(RetrievalChunk::new(
                docs.conversation.clone(),
                docs.turn_index,
                ChunkStage::Opinion,
                opinion.model.clone(),
                RetrievalChunk::format_text(docs.question, &opinion.response),
                docs.created_at_ms,
            ));
        }

        if let Some((model, text)) = docs.synthesis {
            chunks.push(RetrievalChunk::new(
                docs.conversation.clone(),
                docs.turn_index,
                ChunkStage::Synthesis,
                model.clone(),
                RetrievalChunk::format_text(docs.question, text),
                docs.created_at_ms,
            ));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;

        let count = chunks.len();
        let mut index = self.index.write().unwrap_or_else(|p| p.into_inner());
        let conversation_index = index.entry(docs.conversation.clone()).or_default();
        for (chunk, embedding) in chunks.into_iter().zip(embeddings) {
            let tokens = estimate_tokens(&chunk.text);
            conversation_index.insert(
                chunk.id(),
                IndexedChunk {
                    chunk,
                    embedding,
                    tokens,
                },
            );
        }

        debug!(
            conversation = %docs.conversation,
            turn = docs.turn_index,
            chunks = count,
            "indexed turn"
        );
        Ok(count)
    }

    /// Retrieve context chunks for a query, within a token budget.
    ///
    /// Never fails: an unavailable embedder degrades to lexical-only
    /// ranking, and an empty index yields an empty result.
    pub async fn retrieve(
        &self,
        conversation: &ConversationId,
        query: &str,
        budget_tokens: usize,
    ) -> Vec<RetrievalChunk> {
        // Embed outside the lock; failure only disables the semantic ranker.
        let query_embedding = match self.embedder.embed(&[query.to_string()]).await {
            Ok(mut vectors) if !vectors.is_empty() => Some(vectors.remove(0)),
            Ok(_) => None,
            Err(e) => {
                warn!("query embedding failed, falling back to lexical only: {e}");
                None
            }
        };

        let index = self.index.read().unwrap_or_else(|p| p.into_inner());
        let Some(conversation_index) = index.get(conversation) else {
            return Vec::new();
        };

        let texts: Vec<(ChunkId, &str)> = conversation_index
            .iter()
            .map(|(id, entry)| (id.clone(), entry.chunk.text.as_str()))
            .collect();
        let lexical: Vec<ChunkId> = rank_lexical(query, &texts)
            .into_iter()
            .map(|(id, _)| id)
            .collect();

        let semantic: Vec<ChunkId> = match &query_embedding {
            Some(embedding) => {
                let candidates: Vec<(ChunkId, Vec<f32>)> = conversation_index
                    .iter()
                    .map(|(id, entry)| (id.clone(), entry.embedding.clone()))
                    .collect();
                rank_semantic(embedding, &candidates, self.params.min_similarity)
                    .into_iter()
                    .map(|(id, _)| id)
                    .collect()
            }
            None => Vec::new(),
        };

        let fused = fuse(&[lexical, semantic], self.params.rrf_k);
        let token_counts: HashMap<ChunkId, usize> = conversation_index
            .iter()
            .map(|(id, entry)| (id.clone(), entry.tokens))
            .collect();

        let selected = select_within_budget(
            &fused,
            &token_counts,
            self.params.min_fused_score,
            budget_tokens,
        );

        selected
            .into_iter()
            .filter_map(|id| conversation_index.get(&id).map(|entry| entry.chunk.clone()))
            .collect()
    }

    /// Number of chunks indexed for a conversation.
    pub fn chunk_count(&self, conversation: &ConversationId) -> usize {
        self.index
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(conversation)
            .map(|m| m.len())
            .unwrap_or(0)
    }
}
