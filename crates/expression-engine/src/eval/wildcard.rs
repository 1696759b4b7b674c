//! In-process LIKE matching.

/// Matches `text` against a LIKE pattern where `%` is any run of characters
/// and `_` is exactly one character. Case-sensitive.
pub fn like_matches(text: &str, pattern: &str) -> bool {
    let text = text.chars().collect::<Vec<_>>();
    let pattern = pattern.chars().collect::<Vec<_>>();

    let (mut t, mut p) = (0, 0);
    // Position of the last `%` and the text index it was tried at
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('%') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some('_') => {
                t += 1;
                p += 1;
            }
            Some(c) if *c == text[t] => {
                t += 1;
                p += 1;
            }
            _ => match backtrack {
                Some((star, start)) => {
                    p = star + 1;
                    t = start + 1;
                    backtrack = Some((star, start + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|c| *c == '%')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_matches() {
        assert!(like_matches("hello", "h%"));
        assert!(like_matches("hello", "%llo"));
        assert!(like_matches("hello", "h_llo"));
        assert!(like_matches("hello", "%"));
        assert!(like_matches("", "%"));
        assert!(like_matches("abcabc", "%b%c"));
        assert!(!like_matches("hello", "H%"));
        assert!(!like_matches("hello", "h_lo"));
        assert!(!like_matches("", "_"));
    }
}
