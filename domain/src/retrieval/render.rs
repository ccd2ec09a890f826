//! Rendering retrieved chunks into prompt context.

use crate::retrieval::chunk::RetrievalChunk;

/// Render chunks as a context block for the chat prompt.
///
/// Each chunk is headed with its origin so the chairman can weigh a past
/// synthesis differently from a single member's opinion.
pub fn render_context(chunks: &[RetrievalChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| {
            format!(
                "[Turn {} | Stage {} | Model: {}]\n{}",
                chunk.turn_index, chunk.stage, chunk.model, chunk.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::entities::ConversationId;
    use crate::core::model::ModelId;
    use crate::retrieval::chunk::ChunkStage;

    #[test]
    fn test_render_labels_each_chunk() {
        let chunks = vec![
            RetrievalChunk::new(
                ConversationId::new("c"),
                0,
                ChunkStage::Synthesis,
                ModelId::new("chairman"),
                "Q: q\n\nA: final answer",
                0,
            ),
            RetrievalChunk::new(
                ConversationId::new("c"),
                0,
                ChunkStage::Opinion,
                ModelId::new("m1"),
                "Q: q\n\nA: one view",
                0,
            ),
        ];

        let rendered = render_context(&chunks);
        assert!(rendered.contains("[Turn 0 | Stage synthesis | Model: chairman]"));
        assert!(rendered.contains("[Turn 0 | Stage opinion | Model: m1]"));
        assert!(rendered.contains("final answer"));
    }

    #[test]
    fn test_render_empty_is_empty() {
        assert_eq!(render_context(&[]), "");
    }
}
