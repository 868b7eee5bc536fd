//! Ordered noise-removal rules.
//!
//! Each rule scrubs one class of per-request or per-mirror variation:
//! generator comments, session tokens, social widgets, CMS settings blobs.
//! The table order is part of the contract; later rules see the output of
//! earlier ones. Patterns run in byte mode with Unicode disabled, since
//! bodies are raw bytes in whatever encoding the server sent and a stray
//! invalid sequence must not stop a match.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::bytes::{NoExpand, Regex};

/// When a rule runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Every body.
    Always,
    /// Only bodies carrying the CMS marker.
    CmsOnly,
}

impl Gate {
    fn active(self, cms: bool) -> bool {
        match self {
            Gate::Always => true,
            Gate::CmsOnly => cms,
        }
    }
}

/// One noise-removal rule.
///
/// The pattern compiles lazily on first use and is reused for the life of
/// the process.
pub struct NoiseRule {
    /// Stable name, used in logs and tests.
    pub name: &'static str,
    /// Byte-mode pattern; `(?s)` only where a fragment legitimately spans
    /// lines.
    pub pattern: &'static str,
    /// Replacement bytes; empty for removal rules.
    pub replacement: &'static [u8],
    /// Upper bound on applications per body; 0 means unbounded.
    pub max_applications: usize,
    /// When the rule runs.
    pub gate: Gate,
    regex: OnceLock<Regex>,
}

impl NoiseRule {
    fn regex(&self) -> &Regex {
        self.regex.get_or_init(|| Regex::new(self.pattern).unwrap())
    }

    /// Apply this rule to `body`, honoring the application bound.
    pub fn apply(&self, body: Vec<u8>) -> Vec<u8> {
        let re = self.regex();
        let replaced = match re.replacen(&body, self.max_applications, NoExpand(self.replacement)) {
            Cow::Borrowed(_) => None,
            Cow::Owned(out) => Some(out),
        };
        match replaced {
            Some(out) => {
                tracing::debug!(
                    "rule {} rewrote body: {} -> {} bytes",
                    self.name,
                    body.len(),
                    out.len()
                );
                out
            }
            None => body,
        }
    }
}

const fn rule(
    name: &'static str,
    pattern: &'static str,
    max_applications: usize,
    gate: Gate,
) -> NoiseRule {
    NoiseRule {
        name,
        pattern,
        replacement: b"",
        max_applications,
        gate,
        regex: OnceLock::new(),
    }
}

/// The rule table, in application order.
pub(crate) static RULES: [NoiseRule; 18] = [
    // Comments carry generation timestamps and debug output; capped so a
    // comment-bombed page cannot dominate the pass.
    rule("html-comments", r"(?s-u)<!--.{1,4000}?-->", 1000, Gate::Always),
    rule(
        "session-tokens",
        r#"(?-u)(petok|_token|applicationTime)"?:("[-_A-Za-z0-9\.]+"|[0-9\.]+)"#,
        0,
        Gate::Always,
    ),
    // Timestamps, checksums, fingerprints: any run of ten or more hex,
    // decimal, or dot characters starting at a word boundary.
    rule("numeric-runs", r"(?-u)\b[A-Fa-f0-9\.]{10,256}", 0, Gate::Always),
    rule(
        "encoded-mailto",
        r#"(?-u)<a href="mailto:[^"@]{1,100}@[^"]{2,100}">(&#[0-9a-fA-Fx]{2,4};){3,100}</a>"#,
        0,
        Gate::Always,
    ),
    rule(
        "like-widget",
        r#"(?-u)<div class="fb-like" data-href=".*?</div>"#,
        0,
        Gate::Always,
    ),
    rule(
        "share-widget",
        r#"(?-u)<a href="https?://twitter.com/share" class="twitter-share-button" data-text=".*?</a>"#,
        0,
        Gate::Always,
    ),
    // Canonical, shortlink, alternate, and og:url tags restate the page's
    // own address in forms the path stripper cannot anticipate.
    rule(
        "self-link-tags",
        r#"(?-u)<(link rel="(canonical|shortlink|alternate)".{1,1000}?href=|meta property="og:url" content=)"[^"]+" />"#,
        0,
        Gate::Always,
    ),
    rule(
        "upload-token",
        r#"(?-u)<input type="hidden" name="file_uploadToken" value="\d+""#,
        0,
        Gate::Always,
    ),
    rule(
        "hidden-inputs",
        r#"(?-u)<input type="hidden"[^>]{1,1000}?>"#,
        0,
        Gate::Always,
    ),
    // Flash clock widgets restate the server time down to the second.
    rule(
        "flashvars-clock",
        r#"(?-u)<param name="flashvars" value="servannee=\d{4}&amp;servmois=\d{1,2}&amp;servjour=\d{1,2}&amp;servheure=\d{1,2}&amp;servminute=\d{1,2}&amp;servseconde=\d{1,2}" />"#,
        0,
        Gate::Always,
    ),
    rule("body-class", r#"(?-u)<body class="[^"]+""#, 0, Gate::Always),
    rule("viewing-count", r"(?-u)\(\d+ Viewing\)", 0, Gate::Always),
    rule(
        "active-users",
        r"(?-u)Currently Active Users</a>: \d+ \(\d+ members and \d+ guests\)",
        0,
        Gate::Always,
    ),
    rule("cache-buster", r"(?-u)[&?]v=\d+", 0, Gate::Always),
    rule(
        "cms-settings",
        r"(?-u)jQuery\.extend\(Drupal.settings, ?\{.{1,20000}?\}\);",
        0,
        Gate::CmsOnly,
    ),
    rule("cms-dom-ids", r"(?-u)\bview-dom-id-[0-9a-f]+\b", 0, Gate::CmsOnly),
    // Sidebar view blocks rotate content per request; everything from the
    // first one to the end of the body goes.
    rule(
        "cms-sidebar",
        r#"(?s-u)<div class="views-field views-field-[-a-z]+">.*"#,
        0,
        Gate::CmsOnly,
    ),
    rule(
        "cms-breadcrumb",
        r#"(?-u)<div class="breadcrumb">.{1,4000}?    </div>"#,
        0,
        Gate::CmsOnly,
    ),
];

/// Apply every active rule, in table order.
pub(crate) fn apply_all(body: Vec<u8>, cms: bool) -> Vec<u8> {
    let mut body = body;
    for rule in &RULES {
        if rule.gate.active(cms) {
            body = rule.apply(body);
        }
    }
    body
}

#[cfg(test)]
pub(crate) fn by_name(name: &str) -> &'static NoiseRule {
    RULES
        .iter()
        .find(|r| r.name == name)
        .unwrap_or_else(|| panic!("no rule named {name}"))
}
