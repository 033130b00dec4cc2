//! Glob matching for cache key listings.
//!
//! Supports `*` (any run of characters, including none) and `?` (exactly one
//! character). Everything else matches literally.

/// Returns `true` when `key` matches `pattern`.
#[must_use]
pub fn matches(pattern: &str, key: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let key: Vec<char> = key.chars().collect();

    let (mut p, mut k) = (0, 0);
    // Position of the last `*` seen and the key index it was tried against.
    let mut backtrack: Option<(usize, usize)> = None;

    while k < key.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, k));
                p += 1;
            }
            Some('?') => {
                p += 1;
                k += 1;
            }
            Some(c) if *c == key[k] => {
                p += 1;
                k += 1;
            }
            _ => match backtrack {
                Some((star, from)) => {
                    p = star + 1;
                    k = from + 1;
                    backtrack = Some((star, from + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}

#[cfg(test)]
mod tests {
    use super::matches;

    #[test]
    fn literal() {
        assert!(matches("messages:sent", "messages:sent"));
        assert!(!matches("messages:sent", "messages:sen"));
        assert!(!matches("messages:sen", "messages:sent"));
    }

    #[test]
    fn star() {
        assert!(matches("message:*", "message:1"));
        assert!(matches("message:*", "message:"));
        assert!(matches("*", ""));
        assert!(matches("*:sent", "messages:sent"));
        assert!(matches("m*e:*", "message:12"));
        assert!(!matches("message:*", "messages:sent"));
        assert!(!matches("message:*", "scheduler:state"));
    }

    #[test]
    fn question_mark() {
        assert!(matches("message:?", "message:7"));
        assert!(!matches("message:?", "message:17"));
        assert!(!matches("?", ""));
    }
}
