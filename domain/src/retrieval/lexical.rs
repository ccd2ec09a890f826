//! Lexical ranker: IDF-weighted term overlap.
//!
//! A chunk's lexical score is the sum of the inverse-document-frequency
//! weights of the query terms it contains. Document frequency is computed
//! over the candidate set itself, so terms that appear in every chunk
//! contribute little and rare discriminative terms dominate.

use std::collections::{HashMap, HashSet};

use crate::retrieval::chunk::ChunkId;

/// Whitespace + lowercase tokenizer with stop word removal.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|w| w.len() > 2 && !is_stop_word(w))
        .collect()
}

fn is_stop_word(word: &str) -> bool {
    matches!(
        word,
        "the" | "and"
            | "for"
            | "are"
            | "but"
            | "not"
            | "you"
            | "all"
            | "can"
            | "had"
            | "was"
            | "one"
            | "our"
            | "out"
            | "has"
            | "have"
            | "been"
            | "from"
            | "this"
            | "that"
            | "with"
            | "they"
            | "will"
            | "each"
            | "which"
            | "their"
            | "what"
            | "its"
            | "into"
            | "more"
            | "about"
            | "other"
    )
}

/// Rank candidate chunks against a query by IDF-weighted term overlap.
///
/// Returns `(id, score)` pairs with score > 0, sorted by score descending;
/// ties break by chunk id so the ordering is reproducible. Chunks sharing
/// no query term are absent from the result.
pub fn rank_lexical(query: &str, candidates: &[(ChunkId, &str)]) -> Vec<(ChunkId, f64)> {
    let query_terms: HashSet<String> = tokenize(query).into_iter().collect();
    if query_terms.is_empty() || candidates.is_empty() {
        return Vec::new();
    }

    let n_docs = candidates.len() as f64;
    let tokenized: Vec<HashSet<String>> = candidates
        .iter()
        .map(|(_, text)| tokenize(text).into_iter().collect())
        .collect();

    // Document frequency over the candidate set
    let mut df: HashMap<&String, usize> = HashMap::new();
    for terms in &tokenized {
        for term in terms {
            *df.entry(term).or_insert(0) += 1;
        }
    }

    let mut scored: Vec<(ChunkId, f64)> = candidates
        .iter()
        .zip(&tokenized)
        .filter_map(|((id, _), terms)| {
            let score: f64 = query_terms
                .iter()
                .filter(|t| terms.contains(*t))
                .map(|t| {
                    let doc_freq = df.get(t).copied().unwrap_or(1) as f64;
                    (n_docs / doc_freq).ln() + 1.0
                })
                .sum();
            (score > 0.0).then(|| (id.clone(), score))
        })
        .collect();

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::entities::ConversationId;
    use crate::core::model::ModelId;
    use crate::retrieval::chunk::ChunkStage;

    fn chunk_id(n: usize) -> ChunkId {
        ChunkId::derive(
            &ConversationId::new("c"),
            n,
            ChunkStage::Opinion,
            &ModelId::new("m"),
        )
    }

    #[test]
    fn test_tokenize_filters_short_and_stop_words() {
        let tokens = tokenize("The RAG system is fast and reliable!");
        assert!(tokens.contains(&"rag".to_string()));
        assert!(tokens.contains(&"system".to_string()));
        assert!(!tokens.contains(&"the".to_string()));
        assert!(!tokens.contains(&"is".to_string())); // too short
    }

    #[test]
    fn test_matching_chunk_ranks_first() {
        let candidates = vec![
            (chunk_id(0), "retrieval augmented generation pipelines"),
            (chunk_id(1), "cooking pasta with fresh tomatoes"),
        ];
        let ranked = rank_lexical("retrieval pipelines", &candidates);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].0, chunk_id(0));
    }

    #[test]
    fn test_rare_terms_outweigh_common_terms() {
        // "system" appears everywhere, "quantization" in one chunk only
        let candidates = vec![
            (chunk_id(0), "system overview of the general design"),
            (chunk_id(1), "system details about quantization tradeoffs"),
            (chunk_id(2), "system notes covering deployment"),
        ];
        let ranked = rank_lexical("system quantization", &candidates);
        assert_eq!(ranked[0].0, chunk_id(1));
        assert!(ranked[0].1 > ranked[1].1);
    }

    #[test]
    fn test_no_overlap_yields_empty() {
        let candidates = vec![(chunk_id(0), "completely unrelated content")];
        assert!(rank_lexical("quantum chromodynamics", &candidates).is_empty());
        assert!(rank_lexical("", &candidates).is_empty());
    }

    #[test]
    fn test_tie_break_is_deterministic() {
        let candidates = vec![
            (chunk_id(1), "shared topic words"),
            (chunk_id(0), "shared topic words"),
        ];
        let ranked = rank_lexical("shared topic", &candidates);
        assert_eq!(ranked.len(), 2);
        assert!(ranked[0].0 < ranked[1].0);
    }
}
