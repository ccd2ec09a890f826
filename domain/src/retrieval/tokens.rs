//! Approximate token counting for budget accounting.

/// Estimate the token count of a text: word count × 1.3, rounded up.
///
/// Coarse on purpose; the budget it feeds is itself a soft ceiling.
pub fn estimate_tokens(text: &str) -> usize {
    let words = text.split_whitespace().count();
    (words as f64 * 1.3).ceil() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_is_zero() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("   "), 0);
    }

    #[test]
    fn test_scales_with_words() {
        assert_eq!(estimate_tokens("one two three four five six seven eight nine ten"), 13);
        assert!(estimate_tokens("a b c") < estimate_tokens("a b c d e f g h"));
    }
}
