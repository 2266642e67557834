//! Language-neutral token preprocessing.
//!
//! Every parser works on the same token shape: raw file text is split on
//! whitespace after a fixed punctuation set has been padded with spaces, and
//! newlines survive as explicit `"\n"` tokens so line-oriented grammars
//! (Python, the comment filter, the SLOC counter) can see line boundaries.

/// Punctuation characters that are padded with spaces before splitting.
pub const CORE_PUNCTUATION: [&str; 14] = [
    ":", ";", "{", "}", "(", ")", "[", "]", "?", "!", ",", "<", ">", "\"",
];

/// Tokenize with the core punctuation set only.
pub fn tokenize(content: &str) -> Vec<String> {
    tokenize_with(content, &[])
}

/// Tokenize with the core punctuation set plus language-specific additions
/// (e.g. `'` for JavaScript/Ruby/Python, `&` and `...` for Go).
pub fn tokenize_with(content: &str, extra: &[&str]) -> Vec<String> {
    let mut padded = content.to_string();
    for mark in CORE_PUNCTUATION.iter().chain(extra.iter()) {
        padded = padded.replace(mark, &format!(" {mark} "));
    }
    split_preserving_newlines(&padded)
}

/// Split into non-whitespace runs, keeping `\n` as its own token.
fn split_preserving_newlines(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        if ch == '\n' {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            tokens.push("\n".to_string());
        } else if ch.is_whitespace() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Re-join a token stream and drop every line that is commented out.
///
/// A line is dropped when it opens a block comment, closes one, lies between
/// the two, or starts with the line-comment marker; a line carrying both the
/// opener and the closer is a pure comment line. When opener and closer are
/// the same marker (Python's `"""`), marker lines are dropped and an odd
/// occurrence count toggles the in-comment state.
pub fn filter_without_comments(
    tokens: &[String],
    line_marker: &str,
    block_open: &str,
    block_close: &str,
) -> String {
    let source = tokens.join(" ");
    let mut survivors: Vec<&str> = Vec::new();
    let mut active_block_comment = false;

    for line in source.split('\n') {
        if block_open == block_close {
            if line.contains(block_open) {
                if line.matches(block_open).count() % 2 == 1 {
                    active_block_comment = !active_block_comment;
                }
                continue;
            }
        } else {
            let opens = line.contains(block_open);
            let closes = line.contains(block_close);
            if opens && closes {
                continue;
            }
            if opens {
                active_block_comment = true;
                continue;
            }
            if closes {
                active_block_comment = false;
                continue;
            }
        }

        if line.trim_start().starts_with(line_marker) {
            continue;
        }
        if !active_block_comment {
            survivors.push(line);
        }
    }

    survivors.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_pads_punctuation() {
        let tokens = tokenize("foo(bar,baz);");
        assert_eq!(tokens, vec!["foo", "(", "bar", ",", "baz", ")", ";"]);
    }

    #[test]
    fn test_tokenize_preserves_newlines() {
        let tokens = tokenize("a\nb\n");
        assert_eq!(tokens, vec!["a", "\n", "b", "\n"]);
    }

    #[test]
    fn test_tokenize_with_extra_marks() {
        let tokens = tokenize_with("require 'foo'", &["'"]);
        assert_eq!(tokens, vec!["require", "'", "foo", "'"]);
    }

    #[test]
    fn test_tokenize_go_variadic() {
        let tokens = tokenize_with("f(xs...)", &["&", "..."]);
        assert_eq!(tokens, vec!["f", "(", "xs", "...", ")"]);
    }

    #[test]
    fn test_filter_drops_line_comments() {
        let tokens = tokenize("code();\n// comment\nmore();");
        let filtered = filter_without_comments(&tokens, "//", "/*", "*/");
        assert!(filtered.contains("code"));
        assert!(filtered.contains("more"));
        assert!(!filtered.contains("comment"));
    }

    #[test]
    fn test_filter_drops_block_comments() {
        let tokens = tokenize("before();\n/*\ninside\n*/\nafter();");
        let filtered = filter_without_comments(&tokens, "//", "/*", "*/");
        assert!(filtered.contains("before"));
        assert!(filtered.contains("after"));
        assert!(!filtered.contains("inside"));
    }

    #[test]
    fn test_filter_one_line_block_comment() {
        let tokens = tokenize("a();\n/* gone */\nb();");
        let filtered = filter_without_comments(&tokens, "//", "/*", "*/");
        assert!(filtered.contains("a"));
        assert!(filtered.contains("b"));
        assert!(!filtered.contains("gone"));
    }

    #[test]
    fn test_filter_identical_markers_toggle() {
        let tokens: Vec<String> = ["x", "\n", "\"\"\"", "\n", "doc", "line", "\n", "\"\"\"", "\n", "y"]
            .iter()
            .map(|t| t.to_string())
            .collect();
        let filtered = filter_without_comments(&tokens, "#", "\"\"\"", "\"\"\"");
        assert!(filtered.contains('x'));
        assert!(filtered.contains('y'));
        assert!(!filtered.contains("doc"));
    }
}
