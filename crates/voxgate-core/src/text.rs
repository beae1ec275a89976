//! Input text validation for synthesis requests.
//!
//! Pure functions, no I/O.

use regex::Regex;
use std::sync::LazyLock;

static RE_WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Default upper bound on request text, in characters.
pub const DEFAULT_MAX_TEXT_LEN: usize = 500;

/// Normalize and validate request text.
///
/// Trims the input, checks its length, then collapses runs of whitespace
/// (including newlines) into single spaces. The limit applies to the trimmed
/// text as received, before collapsing. Length is counted in characters, not
/// bytes, so multi-byte scripts get the same budget as ASCII.
pub fn validate_text(text: &str, max_len: usize) -> Result<String, String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err("No text provided".to_string());
    }

    let len = trimmed.chars().count();
    if len > max_len {
        return Err(format!(
            "Text too long: {len} characters (maximum {max_len})"
        ));
    }

    Ok(RE_WHITESPACE_RUN.replace_all(trimmed, " ").into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_text() {
        assert_eq!(validate_text("hello", 500).unwrap(), "hello");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(validate_text("  hello world \n", 500).unwrap(), "hello world");
    }

    #[test]
    fn collapses_inner_whitespace() {
        assert_eq!(validate_text("one\n\ntwo   three", 500).unwrap(), "one two three");
    }

    #[test]
    fn rejects_empty() {
        assert!(validate_text("", 500).is_err());
    }

    #[test]
    fn rejects_whitespace_only() {
        assert!(validate_text(" \t\n ", 500).is_err());
    }

    #[test]
    fn accepts_exact_limit() {
        let text = "a".repeat(500);
        assert_eq!(validate_text(&text, 500).unwrap().len(), 500);
    }

    #[test]
    fn rejects_over_limit() {
        let text = "a".repeat(501);
        let err = validate_text(&text, 500).unwrap_err();
        assert!(err.contains("501"), "err={err}");
    }

    #[test]
    fn limit_applies_after_trim() {
        let text = format!("   {}   ", "a".repeat(500));
        assert!(validate_text(&text, 500).is_ok());
    }

    #[test]
    fn inner_whitespace_counts_toward_limit() {
        // 602 characters that would collapse to "a b"
        let text = format!("a{}b", " ".repeat(600));
        let err = validate_text(&text, 500).unwrap_err();
        assert!(err.contains("602"), "err={err}");

        let text = format!("a{}b", " ".repeat(498));
        assert_eq!(validate_text(&text, 500).unwrap(), "a b");
    }

    #[test]
    fn counts_characters_not_bytes() {
        // 500 two-byte characters: 1000 bytes, still within the limit
        let text = "é".repeat(500);
        assert!(validate_text(&text, 500).is_ok());
        let text = "é".repeat(501);
        assert!(validate_text(&text, 500).is_err());
    }
}
