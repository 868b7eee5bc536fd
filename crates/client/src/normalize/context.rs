//! Per-page normalization context.

use url::Url;

use super::strip::contains;

/// Literal marker whose presence in the raw body switches on the
/// CMS-specific rule subset.
pub(crate) const CMS_MARKER: &[u8] = b"Drupal";

/// Inputs derived from one (url, body) pair that parameterize
/// normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    /// URL path exactly as typed, with trailing slashes and one leading
    /// slash removed.
    pub path: String,
    /// Query string exactly as typed, without the leading `?`; empty when
    /// absent.
    pub query: String,
    /// Whether the raw body carries the CMS marker.
    pub cms: bool,
}

impl PageContext {
    /// Derive the context for one page.
    ///
    /// An unparseable URL yields an empty path and query: normalization
    /// stays total and simply has no self-references to strip.
    pub fn derive(url: &str, body: &[u8]) -> Self {
        let cms = contains(body, CMS_MARKER);
        if Url::parse(url).is_err() {
            return Self { path: String::new(), query: String::new(), cms };
        }
        let (typed_path, typed_query) = split_typed(url);
        let path = typed_path.trim_end_matches('/');
        let path = path.strip_prefix('/').unwrap_or(path);
        Self { path: path.to_string(), query: typed_query.to_string(), cms }
    }
}

/// Path and query sliced out of the URL string itself.
///
/// `Url::parse` re-encodes non-ASCII path and query bytes, but a page
/// embeds the spelling it was addressed by, so the stripper has to see
/// the typed text. The URL has already been validated with `Url::parse`
/// by the time this runs; here the string is only sliced.
fn split_typed(url: &str) -> (&str, &str) {
    let head = match url.split_once('#') {
        Some((head, _)) => head,
        None => url,
    };
    let rest = match head.split_once("://") {
        Some((_, rest)) => rest,
        None => return ("", ""),
    };
    let path_start = match rest.find(['/', '?']) {
        Some(i) => i,
        None => return ("", ""),
    };
    match rest[path_start..].split_once('?') {
        Some((path, query)) => (path, query),
        None => (&rest[path_start..], ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_trims_slashes() {
        let ctx = PageContext::derive("https://example.com/wiki/Main_Page/", b"");
        assert_eq!(ctx.path, "wiki/Main_Page");
        assert_eq!(ctx.query, "");
    }

    #[test]
    fn test_derive_root_path_is_empty() {
        let ctx = PageContext::derive("https://example.com/", b"");
        assert_eq!(ctx.path, "");
    }

    #[test]
    fn test_derive_keeps_percent_encoding() {
        let ctx = PageContext::derive("https://example.com/a%2Fb/c", b"");
        assert_eq!(ctx.path, "a%2Fb/c");
    }

    #[test]
    fn test_derive_keeps_typed_non_ascii_path() {
        let ctx = PageContext::derive("https://example.com/tags/caf\u{e9}-grand", b"");
        assert_eq!(ctx.path, "tags/caf\u{e9}-grand");
    }

    #[test]
    fn test_derive_ignores_fragment() {
        let ctx = PageContext::derive("https://example.com/a/page#section-2", b"");
        assert_eq!(ctx.path, "a/page");
        assert_eq!(ctx.query, "");
    }

    #[test]
    fn test_derive_extracts_query() {
        let ctx = PageContext::derive("https://example.com/index.php?title=Foo&oldid=12", b"");
        assert_eq!(ctx.path, "index.php");
        assert_eq!(ctx.query, "title=Foo&oldid=12");
    }

    #[test]
    fn test_derive_flags_cms_marker() {
        let ctx = PageContext::derive("https://example.com/", b"<script>Drupal.settings</script>");
        assert!(ctx.cms);

        let ctx = PageContext::derive("https://example.com/", b"<html>plain</html>");
        assert!(!ctx.cms);
    }

    #[test]
    fn test_derive_unparseable_url_is_empty() {
        let ctx = PageContext::derive("not a url", b"body");
        assert_eq!(ctx.path, "");
        assert_eq!(ctx.query, "");
    }
}
