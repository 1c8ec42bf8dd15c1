//! Shared string helpers.

/// Keep at most `max_chars` characters from the start of `s`.
///
/// Counts characters, not bytes, so multi-byte text is never split inside
/// a code point.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_truncate_chars_short_input() {
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 3), "abc");
        assert_eq!(truncate_chars("", 0), "");
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("éèàü", 2), "éè");
        assert_eq!(truncate_chars("☁️ nuage", 1), "☁");
    }

    proptest! {
        #[test]
        fn prop_truncate_is_bounded_prefix(s in "\\PC{0,64}", max in 0usize..80) {
            let out = truncate_chars(&s, max);
            prop_assert!(s.starts_with(out));
            prop_assert_eq!(out.chars().count(), s.chars().count().min(max));
        }
    }
}
