//! Quote-aware substring search.

const QUOTES: [char; 2] = ['"', '\''];
const ESCAPE: char = '\\';

/// Byte offset of the first `needle` outside `"..."` / `'...'` quotes.
///
/// A backslash inside quotes escapes the next character.
pub fn find_unquoted(text: &str, needle: &str) -> Option<usize> {
    scan(text, needle, false)
}

/// Like [`find_unquoted`], also skipping text nested in `{}` or `()`.
pub fn find_unquoted_top_level(text: &str, needle: &str) -> Option<usize> {
    scan(text, needle, true)
}

fn scan(text: &str, needle: &str, skip_nested: bool) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut depth: usize = 0;

    for (idx, c) in text.char_indices() {
        if let Some(open) = quote {
            if escaped {
                escaped = false;
            } else if c == ESCAPE {
                escaped = true;
            } else if c == open {
                quote = None;
            }
            continue;
        }
        if QUOTES.contains(&c) {
            quote = Some(c);
            continue;
        }
        if skip_nested {
            match c {
                '{' | '(' => {
                    depth += 1;
                    continue;
                }
                '}' | ')' => {
                    depth = depth.saturating_sub(1);
                    continue;
                }
                _ => {}
            }
        }
        if depth == 0 && text[idx..].starts_with(needle) {
            return Some(idx);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_quoted_needles() {
        assert_eq!(find_unquoted("a = '=>' => b", "=>"), Some(9));
        assert_eq!(find_unquoted(r#"a = "x\"=>" => b"#, "=>"), Some(12));
        assert_eq!(find_unquoted("'=>'", "=>"), None);
    }

    #[test]
    fn top_level_skips_nesting() {
        assert_eq!(find_unquoted_top_level("x = { a = 1; }; high", ";"), Some(14));
        assert_eq!(find_unquoted("x = { a = 1; }; high", ";"), Some(11));
    }

    #[test]
    fn unterminated_quote_hides_rest() {
        assert_eq!(find_unquoted("a = 'abc ; high", ";"), None);
    }
}
