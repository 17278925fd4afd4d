//! Tail-preserving output truncation.

/// Truncate `text` to at most `max_bytes`, keeping the tail. The end of
/// output is where failure diagnostics usually appear, so the most recent
/// bytes win. The cut is snapped forward to the next UTF-8 boundary, so the
/// result may be slightly under the ceiling but is always valid.
#[must_use]
pub fn truncate_tail(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut start = text.len().saturating_sub(max_bytes);
    while !text.is_char_boundary(start) {
        start = start.saturating_add(1);
    }
    text[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_untouched() {
        assert_eq!(truncate_tail("hello", 100), "hello");
    }

    #[test]
    fn test_exact_fit_untouched() {
        assert_eq!(truncate_tail("hello", 5), "hello");
    }

    #[test]
    fn test_keeps_tail() {
        let text = format!("{}{}", "x".repeat(9_900), "y".repeat(100));
        let kept = truncate_tail(&text, 100);
        assert_eq!(kept, "y".repeat(100));
    }

    #[test]
    fn test_tail_equals_last_n_bytes() {
        let text: String = "abcdefghij".chars().cycle().take(10_000).collect();
        let kept = truncate_tail(&text, 100);
        assert_eq!(kept.as_bytes(), &text.as_bytes()[9_900..]);
    }

    #[test]
    fn test_snaps_to_char_boundary() {
        // Each snowman is 3 bytes; a 4-byte ceiling lands mid-character and
        // snaps forward to one whole character.
        let text = "☃☃☃☃";
        let kept = truncate_tail(text, 4);
        assert_eq!(kept, "☃");
    }

    #[test]
    fn test_zero_ceiling_empties() {
        assert_eq!(truncate_tail("hello", 0), "");
    }
}
