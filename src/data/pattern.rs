//! Shell-style wildcard matching used for channel codes and info labels.
//!
//! Supported syntax: `?` (one character), `*` (any run, possibly empty),
//! `[abc]` / `[a-z]` (character class) and `[!abc]` (negated class).
//! Matching is case-sensitive.

/// Does `text` match the glob `pattern`?
pub fn glob_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    match_from(&text, &pattern)
}

/// Whether a string contains any glob meta characters.
pub fn has_wildcards(pattern: &str) -> bool {
    pattern.contains(['?', '*', '['])
}

fn match_from(text: &[char], pattern: &[char]) -> bool {
    let (mut t, mut p) = (0usize, 0usize);
    // Backtracking point for the last `*`: (pattern index after star, text index)
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() {
            match pattern[p] {
                '*' => {
                    star = Some((p + 1, t));
                    p += 1;
                    continue;
                }
                '?' => {
                    t += 1;
                    p += 1;
                    continue;
                }
                '[' => {
                    if let Some((matched, next_p)) = match_class(text[t], pattern, p) {
                        if matched {
                            t += 1;
                            p = next_p;
                            continue;
                        }
                    } else if text[t] == '[' {
                        // Unterminated class: treat `[` literally
                        t += 1;
                        p += 1;
                        continue;
                    }
                }
                c => {
                    if c == text[t] {
                        t += 1;
                        p += 1;
                        continue;
                    }
                }
            }
        }
        match star {
            Some((star_p, star_t)) => {
                p = star_p;
                t = star_t + 1;
                star = Some((star_p, star_t + 1));
            }
            None => return false,
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// Evaluate a `[...]` class starting at `pattern[start]`.
/// Returns `(matched, index after the closing bracket)` or `None` if unterminated.
fn match_class(c: char, pattern: &[char], start: usize) -> Option<(bool, usize)> {
    let mut i = start + 1;
    let negate = matches!(pattern.get(i), Some('!') | Some('^'));
    if negate {
        i += 1;
    }
    let mut matched = false;
    let mut first = true;
    while i < pattern.len() {
        let current = pattern[i];
        if current == ']' && !first {
            return Some((matched != negate, i + 1));
        }
        first = false;
        if i + 2 < pattern.len() && pattern[i + 1] == '-' && pattern[i + 2] != ']' {
            if current <= c && c <= pattern[i + 2] {
                matched = true;
            }
            i += 3;
        } else {
            if current == c {
                matched = true;
            }
            i += 1;
        }
    }
    None
}
