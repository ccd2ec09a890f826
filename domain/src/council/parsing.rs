//! Ranking extraction from free-text evaluator responses.
//!
//! Evaluators are asked to end their evaluation with a "FINAL RANKING:"
//! section listing labels best-to-worst, but models do not always comply.
//! The parser is tolerant: it extracts whatever known labels it can find,
//! in order. A malformed or partial ranking contributes fewer labels and
//! is never a fatal error.

use crate::council::labels::LabelMap;

const RANKING_MARKER: &str = "FINAL RANKING:";
const LABEL_PREFIX: &str = "Response ";

/// Extract an ordered list of labels from an evaluator's response.
///
/// Looks for the section after the last `FINAL RANKING:` marker first;
/// if the marker is missing (or its section mentions no labels), scans
/// the whole text. Only labels assigned in `labels` count, each label at
/// most once (first mention wins).
pub fn parse_ranking_labels(text: &str, labels: &LabelMap) -> Vec<String> {
    if let Some(idx) = text.rfind(RANKING_MARKER) {
        let section = &text[idx + RANKING_MARKER.len()..];
        let found = scan_labels(section, labels);
        if !found.is_empty() {
            return found;
        }
    }
    scan_labels(text, labels)
}

/// Scan for `Response X` patterns, keeping known labels in textual order.
fn scan_labels(text: &str, labels: &LabelMap) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();

    for (idx, _) in text.match_indices(LABEL_PREFIX) {
        let rest = &text[idx + LABEL_PREFIX.len()..];
        let Some(letter) = rest.chars().next() else {
            continue;
        };
        if !letter.is_ascii_uppercase() {
            continue;
        }
        // A label letter must stand alone ("Response AB" is not a label)
        if rest[letter.len_utf8()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric())
        {
            continue;
        }

        let label = format!("{}{}", LABEL_PREFIX, letter);
        if labels.model_for(&label).is_some() && !found.contains(&label) {
            found.push(label);
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::ModelId;

    fn label_map(n: usize) -> LabelMap {
        let models: Vec<ModelId> = (0..n).map(|i| ModelId::new(format!("model-{i}"))).collect();
        LabelMap::assign(&models)
    }

    #[test]
    fn test_parse_well_formed_ranking() {
        let labels = label_map(3);
        let text = "Response A is detailed. Response C is shallow.\n\n\
                    FINAL RANKING:\n1. Response C\n2. Response A\n3. Response B\n";
        assert_eq!(
            parse_ranking_labels(text, &labels),
            vec!["Response C", "Response A", "Response B"]
        );
    }

    #[test]
    fn test_parse_without_marker_falls_back_to_full_text() {
        let labels = label_map(2);
        let text = "I prefer Response B, then Response A.";
        assert_eq!(
            parse_ranking_labels(text, &labels),
            vec!["Response B", "Response A"]
        );
    }

    #[test]
    fn test_partial_ranking_counts_only_parsed_labels() {
        let labels = label_map(5);
        let text = "FINAL RANKING:\n1. Response D\n2. Response A\n3. Response E\n";
        assert_eq!(
            parse_ranking_labels(text, &labels),
            vec!["Response D", "Response A", "Response E"]
        );
    }

    #[test]
    fn test_unknown_labels_are_ignored() {
        let labels = label_map(2);
        let text = "FINAL RANKING:\n1. Response Z\n2. Response A\n3. Response B\n";
        assert_eq!(
            parse_ranking_labels(text, &labels),
            vec!["Response A", "Response B"]
        );
    }

    #[test]
    fn test_duplicate_mentions_keep_first() {
        let labels = label_map(2);
        let text = "FINAL RANKING:\n1. Response B\n2. Response B\n3. Response A\n";
        assert_eq!(
            parse_ranking_labels(text, &labels),
            vec!["Response B", "Response A"]
        );
    }

    #[test]
    fn test_garbage_text_yields_empty() {
        let labels = label_map(3);
        assert!(parse_ranking_labels("no labels here at all", &labels).is_empty());
        assert!(parse_ranking_labels("", &labels).is_empty());
    }

    #[test]
    fn test_multi_letter_token_is_not_a_label() {
        let labels = label_map(2);
        let text = "Response AB is not a label, but Response A is.";
        assert_eq!(parse_ranking_labels(text, &labels), vec!["Response A"]);
    }

    #[test]
    fn test_uses_last_marker_section() {
        let labels = label_map(2);
        let text = "The format is FINAL RANKING: followed by labels.\n\
                    FINAL RANKING:\n1. Response B\n2. Response A\n";
        assert_eq!(
            parse_ranking_labels(text, &labels),
            vec!["Response B", "Response A"]
        );
    }
}
