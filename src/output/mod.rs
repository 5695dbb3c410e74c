// Output formatting: terminal display for reports and status.

pub mod terminal;

/// Truncate a string to at most `max_chars` characters, appending "..." if truncated.
///
/// Unlike byte slicing (`&text[..120]`), this respects UTF-8 character boundaries
/// and will never panic on multi-byte characters like accented letters or
/// polytonic Greek.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let char_count = text.chars().count();
    if char_count <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_string_unchanged() {
        assert_eq!(truncate_chars("lupus", 10), "lupus");
    }

    #[test]
    fn test_truncate_long_string_appends_ellipsis() {
        assert_eq!(truncate_chars("Metamorphoses", 6), "Metamo...");
    }

    #[test]
    fn test_truncate_respects_multibyte_boundaries() {
        // Polytonic Greek, 2+ bytes per char.
        assert_eq!(truncate_chars("μῆνιν ἄειδε θεὰ", 5), "μῆνιν...");
    }
}
