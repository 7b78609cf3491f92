//! Message normalization.
//!
//! Log messages often interpolate volatile values (ids, counters, durations)
//! which would make every message a distinct key. [`dynamic`] masks such
//! tokens so that messages of one family share a key.

use std::borrow::Cow;

/// Replacement for a masked token.
pub const MASK: char = 'X';

/// Maximum normalized key length used by observers.
pub const DEFAULT_MAX_LEN: usize = 200;

fn is_separator(c: char) -> bool {
    c.is_whitespace()
        || matches!(
            c,
            ',' | ';' | ':' | '=' | '(' | ')' | '[' | ']' | '{' | '}' | '<' | '>' | '"' | '\'' | '/'
        )
}

/// Masks every token that contains an ASCII digit and truncates the
/// result to at most `max_len` bytes on a char boundary.
///
/// Tokens are runs of characters between separators (whitespace and
/// common punctuation), separators are preserved.
///
/// ```
/// assert_eq!(logz::filter::dynamic("test foo123", 200), "test X");
/// assert_eq!(logz::filter::dynamic("user=42 logged in", 200), "user=X logged in");
/// ```
pub fn dynamic(msg: &str, max_len: usize) -> Cow<'_, str> {
    if !msg.bytes().any(|b| b.is_ascii_digit()) {
        return truncate(Cow::Borrowed(msg), max_len);
    }

    let mut out = String::with_capacity(msg.len().min(max_len));
    let mut token_start = None;

    for (i, c) in msg.char_indices() {
        if is_separator(c) {
            if let Some(start) = token_start.take() {
                push_token(&mut out, &msg[start..i]);
            }
            out.push(c);
        } else if token_start.is_none() {
            token_start = Some(i);
        }

        if out.len() >= max_len {
            break;
        }
    }

    if let Some(start) = token_start {
        if out.len() < max_len {
            push_token(&mut out, &msg[start..]);
        }
    }

    truncate(Cow::Owned(out), max_len)
}

fn push_token(out: &mut String, token: &str) {
    if token.bytes().any(|b| b.is_ascii_digit()) {
        out.push(MASK);
    } else {
        out.push_str(token);
    }
}

fn truncate(s: Cow<'_, str>, max_len: usize) -> Cow<'_, str> {
    if s.len() <= max_len {
        return s;
    }

    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }

    match s {
        Cow::Borrowed(b) => Cow::Borrowed(&b[..end]),
        Cow::Owned(mut o) => {
            o.truncate(end);
            Cow::Owned(o)
        },
    }
}
