//! Self-reference stripping.
//!
//! A page embeds its own path and query all over: canonical links, share
//! widgets, inline JSON, form actions. Two otherwise identical pages served
//! under different paths would diff on every one of those, so every literal
//! encoding a generator plausibly emits is removed before the noise rules
//! run.

use std::sync::OnceLock;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use regex::{Captures, Regex};

static HEX_ESCAPE: OnceLock<Regex> = OnceLock::new();

/// Form-style encoding: unreserved `A-Za-z0-9_.-~` kept, everything else
/// `%XX`, space as `+` after the fact.
const FORM_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~');

/// Path-style encoding: like [`FORM_SET`] but slashes stay literal and
/// spaces become `%20`.
const PATH_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b'/');

/// Whether `needle` occurs anywhere in `haystack`.
pub(crate) fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

/// Remove every occurrence of `needle` from `body`, when present.
pub(crate) fn drop_literal(body: Vec<u8>, needle: &[u8]) -> Vec<u8> {
    if !contains(&body, needle) {
        return body;
    }
    let mut out = Vec::with_capacity(body.len());
    let mut i = 0;
    while i < body.len() {
        if body.len() - i >= needle.len() && body[i..i + needle.len()] == *needle {
            i += needle.len();
        } else {
            out.push(body[i]);
            i += 1;
        }
    }
    out
}

/// Form-style quoting with space as `+`.
pub(crate) fn quote_plus(s: &str) -> String {
    utf8_percent_encode(s, FORM_SET).to_string().replace("%20", "+")
}

/// Path-style quoting: slashes literal, space as `%20`.
pub(crate) fn quote_path(s: &str) -> String {
    utf8_percent_encode(s, PATH_SET).to_string()
}

/// Lowercase every `%XX` escape, leaving the rest of the string alone.
///
/// Some generators emit `%2f` where the canonical form is `%2F`; both
/// spellings of the page's own path have to disappear.
pub(crate) fn lower_escapes(s: &str) -> String {
    let re = HEX_ESCAPE.get_or_init(|| Regex::new(r"%[0-9A-Fa-f]{2}").unwrap());
    re.replace_all(s, |caps: &Captures| caps[0].to_ascii_lowercase())
        .into_owned()
}

/// Remove every plausible literal encoding of `path` from `body`.
///
/// Variants, in order: the path itself, backslash-escaped slashes as in
/// inline JS, form-quoted, form-quoted with lowercase escapes, slashes
/// removed (only when five or more characters remain), slashes as
/// underscores as in wiki titles, and the JSON string form with the
/// six-character `/` slash escape. When the path arrived
/// percent-encoded, the form-quoted variants are re-derived from the
/// decoded path as well, since producers disagree about escaping.
pub(crate) fn strip_path_refs(body: Vec<u8>, path: &str) -> Vec<u8> {
    let mut body = drop_literal(body, path.as_bytes());

    let escaped = path.replace('/', "\\/");
    body = drop_literal(body, escaped.as_bytes());

    let quoted = quote_plus(path);
    body = drop_literal(body, quoted.as_bytes());
    body = drop_literal(body, lower_escapes(&quoted).as_bytes());

    let squashed = path.replace('/', "");
    if squashed.chars().count() >= 5 {
        body = drop_literal(body, squashed.as_bytes());
    }

    let underscored = path.replace('/', "_");
    body = drop_literal(body, underscored.as_bytes());

    let jsoned = format!("\"{}\"", path.replace('/', "\\u002F"));
    body = drop_literal(body, jsoned.as_bytes());

    if path.contains('%') {
        let decoded = percent_decode_str(path).decode_utf8_lossy();
        if decoded.chars().count() >= 4 {
            let quoted = quote_plus(&decoded);
            body = drop_literal(body, quoted.as_bytes());
            body = drop_literal(body, lower_escapes(&quoted).as_bytes());
        }
    }

    body
}

/// Remove the literal `?query` string and its path-style-quoted form.
pub(crate) fn strip_query_refs(body: Vec<u8>, query: &str) -> Vec<u8> {
    let literal = format!("?{query}");
    let body = drop_literal(body, literal.as_bytes());
    drop_literal(body, quote_path(&literal).as_bytes())
}
