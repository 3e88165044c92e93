//! The token parser (spec.md §4.1): finds `open...close` delimited
//! expressions inside a string and lets a handler rewrite them, honoring a
//! backslash escape directly in front of either delimiter. O(n) single pass.

/// Invoked with the raw text between an open and close token; returns its
/// replacement.
pub trait TokenHandler {
    fn handle_token(&mut self, expression: &str) -> String;
}

impl<F: FnMut(&str) -> String> TokenHandler for F {
    fn handle_token(&mut self, expression: &str) -> String {
        self(expression)
    }
}

/// Scans `text` for `open`/`close` delimited spans, replacing each with
/// `handler`'s output. A backslash immediately before `open` or `close`
/// escapes it: the backslash is dropped and the delimiter kept literally.
/// An unmatched `open` (no following `close`) is emitted unchanged,
/// verbatim, from that point on.
pub fn parse(text: &str, open: &str, close: &str, handler: &mut dyn TokenHandler) -> String {
    if text.is_empty() {
        return String::new();
    }

    let src: Vec<char> = text.chars().collect();
    let open_chars: Vec<char> = open.chars().collect();
    let close_chars: Vec<char> = close.chars().collect();

    let mut result = String::new();
    let mut i = 0usize;
    let mut expr: Option<String> = None;

    while i < src.len() {
        if matches_at(&src, i, &open_chars) {
            if i > 0 && src[i - 1] == '\\' {
                // Escaped open token: drop the backslash, keep the token literal.
                result.pop();
                result.push_str(open);
                i += open_chars.len();
                continue;
            }
            // Start collecting the expression.
            let mut buf = String::new();
            let mut j = i + open_chars.len();
            let mut closed = false;
            while j < src.len() {
                if src[j] == '\\' && matches_at(&src, j + 1, &close_chars) {
                    buf.push_str(close);
                    j += 1 + close_chars.len();
                    continue;
                }
                if matches_at(&src, j, &close_chars) {
                    closed = true;
                    break;
                }
                buf.push(src[j]);
                j += 1;
            }
            if closed {
                expr = Some(buf);
                result.push_str(&handler.handle_token(expr.take().unwrap().as_str()));
                i = j + close_chars.len();
            } else {
                // Unmatched open token: emit the remainder unchanged.
                result.extend(&src[i..]);
                return result;
            }
        } else {
            result.push(src[i]);
            i += 1;
        }
    }
    result
}

fn matches_at(src: &[char], at: usize, needle: &[char]) -> bool {
    if at + needle.len() > src.len() {
        return false;
    }
    src[at..at + needle.len()] == *needle
}
