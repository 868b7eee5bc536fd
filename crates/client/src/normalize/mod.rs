//! Body normalization pipeline.
//!
//! Turns a raw fetched body into a comparison-ready form in three ordered
//! phases: derive the page context, strip the page's references to its own
//! path and query, then run the noise rule table. The pass is pure: no
//! network, no clock, no filesystem, and the same (url, body) pair always
//! produces the same bytes. It only ever removes, so unrecognized markup
//! passes through untouched and two unrelated pages stay different.

mod context;
mod rules;
mod strip;

pub use context::PageContext;

/// Normalize `body` as fetched from `url`.
///
/// Path references are stripped only when the trimmed path has five or
/// more characters, query references only when the query has three or
/// more; shorter ones are too likely to collide with unrelated content.
pub fn normalize_body(url: &str, body: &[u8]) -> Vec<u8> {
    let ctx = PageContext::derive(url, body);
    let mut out = body.to_vec();
    if ctx.path.chars().count() >= 5 {
        out = strip::strip_path_refs(out, &ctx.path);
    }
    if ctx.query.chars().count() >= 3 {
        out = strip::strip_query_refs(out, &ctx.query);
    }
    rules::apply_all(out, ctx.cms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story_page(path: &str, token: &str, timing: &str) -> Vec<u8> {
        format!(
            concat!(
                "<html><head>\n",
                "<link rel=\"canonical\" href=\"https://example.com/{path}\" />\n",
                "<!-- rendered {timing} -->\n",
                "</head>\n",
                "<body class=\"section-news\">\n",
                "<form action=\"/{path}\">",
                "<input type=\"hidden\" name=\"csrf\" value=\"{token}\"></form>\n",
                "<p>Same story text.</p>\n",
                "</body></html>\n",
            ),
            path = path,
            token = token,
            timing = timing,
        )
        .into_bytes()
    }

    fn cms_page() -> Vec<u8> {
        concat!(
            "<html><body class=\"front\">\n",
            "<script>jQuery.extend(Drupal.settings, {\"basePath\":\"\\/\"});</script>\n",
            "<div class=\"view view-dom-id-4f3ab2\">content</div>\n",
            "<div class=\"breadcrumb\">Home    </div>\n",
            "<div class=\"views-field views-field-title\">rotating</div>\n",
            "</body></html>\n",
        )
        .as_bytes()
        .to_vec()
    }

    #[test]
    fn test_same_story_under_two_paths_normalizes_identically() {
        let a = normalize_body(
            "https://example.com/news/2014/story-one",
            &story_page("news/2014/story-one", "zz91kq", "in 0.031s"),
        );
        let b = normalize_body(
            "https://example.com/news/2014/story-two",
            &story_page("news/2014/story-two", "qq17mv", "in 0.044s"),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_strips_path_query_and_noise_exactly() {
        let out = normalize_body(
            "https://example.com/about/team?ref=nav",
            b"<a href=\"/about/team?ref=nav\">Team</a><!-- t -->",
        );
        assert_eq!(out, b"<a href=\"/\">Team</a>");
    }

    #[test]
    fn test_non_ascii_path_strips_raw_and_encoded_forms() {
        // The page spells its own path three ways: as typed, form-quoted,
        // and form-quoted with lowercase hex.
        let out = normalize_body(
            "https://example.com/tags/caf\u{e9}-grand",
            "raw=tags/caf\u{e9}-grand\
             |enc=tags%2Fcaf%C3%A9-grand\
             |encl=tags%2fcaf%c3%a9-grand\
             |keep"
                .as_bytes(),
        );
        assert_eq!(out, b"raw=|enc=|encl=|keep");
    }

    #[test]
    fn test_token_and_canonical_variants_diff_empty() {
        let make = |path: &str, token: &str| {
            format!(
                concat!(
                    "<link rel=\"canonical\" href=\"https://example.com/{path}\" />\n",
                    "<script>var s = {{\"csrf_token\":\"{token}\",\"page\":1}};</script>\n",
                    "<p>Body text.</p>\n",
                ),
                path = path,
                token = token,
            )
            .into_bytes()
        };

        let a = normalize_body(
            "https://example.com/posts/first",
            &make("posts/first", "a1b2c3d4e5"),
        );
        let b = normalize_body(
            "https://example.com/posts/second",
            &make("posts/second", "f6e5d4c3b2"),
        );
        assert_eq!(a, b);

        let left = crate::diff::NormalizedPage {
            url: "https://example.com/posts/first".to_string(),
            digest: pagetwin_core::url_digest("https://example.com/posts/first"),
            body: a,
        };
        let right = crate::diff::NormalizedPage {
            url: "https://example.com/posts/second".to_string(),
            digest: pagetwin_core::url_digest("https://example.com/posts/second"),
            body: b,
        };
        let mut buf = Vec::new();
        crate::diff::write_diff(&mut buf, &left, &right).unwrap();
        assert!(buf.is_empty());
    }

    #[test]
    fn test_idempotent_on_representative_bodies() {
        let corpus: Vec<(&str, Vec<u8>)> = vec![
            (
                "https://example.com/news/2014/story-one",
                story_page("news/2014/story-one", "zz91kq", "in 0.031s"),
            ),
            ("https://example.com/", cms_page()),
            (
                "https://forum.example.com/forumdisplay.php?f=17",
                b"General Chat (5 Viewing) <a>x</a>".to_vec(),
            ),
            ("https://example.com/plain", b"<p>nothing to scrub</p>".to_vec()),
        ];

        for (url, body) in corpus {
            let once = normalize_body(url, &body);
            let again = normalize_body(url, &body);
            assert_eq!(once, again, "not deterministic for {url}");
            let twice = normalize_body(url, &once);
            assert_eq!(once, twice, "not idempotent for {url}");
        }
    }

    #[test]
    fn test_cms_page_loses_settings_and_sidebar() {
        let out = normalize_body("https://example.com/", &cms_page());
        let text = String::from_utf8(out).unwrap();
        assert!(!text.contains("Drupal.settings"));
        assert!(!text.contains("view-dom-id"));
        assert!(!text.contains("breadcrumb"));
        assert!(!text.contains("rotating"));
        assert!(text.contains("content"));
    }

    #[test]
    fn test_short_path_is_not_stripped() {
        let out = normalize_body("https://example.com/ab", b"<p>see /ab</p>");
        assert_eq!(out, b"<p>see /ab</p>");
    }

    #[test]
    fn test_path_floor_counts_characters() {
        // Four characters in five bytes stays under the floor.
        let out = normalize_body("https://example.com/caf\u{e9}", "x caf\u{e9} y".as_bytes());
        assert_eq!(out, "x caf\u{e9} y".as_bytes());
    }

    #[test]
    fn test_query_floor_is_three() {
        let out = normalize_body("https://example.com/p?ab", b"x?ab y");
        assert_eq!(out, b"x?ab y");

        let out = normalize_body("https://example.com/p?abc", b"x?abc y");
        assert_eq!(out, b"x y");
    }

    #[test]
    fn test_unparseable_url_still_runs_rules() {
        let out = normalize_body("not a url", b"a<!-- c -->b");
        assert_eq!(out, b"ab");
    }
}
