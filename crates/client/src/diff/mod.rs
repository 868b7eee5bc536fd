//! Line-level comparison report.
//!
//! Output layout, in order: the digest and URL of each page, the
//! post-normalization byte lengths, then a unified diff of the normalized
//! bodies. Two pages the pipeline considers duplicates produce zero diff
//! lines, so the report tail doubles as the verdict. Every emitted line is
//! newline-terminated to keep the output safe to pipe.

use std::io::{self, Write};

use similar::TextDiff;

/// A page after fetch and normalization, ready to compare.
#[derive(Debug, Clone)]
pub struct NormalizedPage {
    /// URL exactly as requested.
    pub url: String,
    /// Cache digest of the URL.
    pub digest: String,
    /// Normalized body bytes.
    pub body: Vec<u8>,
}

/// Write the full comparison report for two normalized pages.
pub fn write_report(
    out: &mut impl Write,
    left: &NormalizedPage,
    right: &NormalizedPage,
) -> io::Result<()> {
    writeln!(out, "{} = digest of {}", left.digest, left.url)?;
    writeln!(out, "{} = digest of {}", right.digest, right.url)?;
    writeln!(out, "after normalization:")?;
    writeln!(out, "{} bytes from {}", left.body.len(), left.url)?;
    writeln!(out, "{} bytes from {}", right.body.len(), right.url)?;
    write_diff(out, left, right)
}

/// Write the unified diff of the two normalized bodies.
///
/// Bodies are decoded lossily: comparison operates on lines, and an
/// occasional replacement character beats refusing to diff a page in a
/// legacy encoding. The `---`/`+++` labels appear only when there is at
/// least one hunk, so identical bodies contribute nothing at all.
pub fn write_diff(
    out: &mut impl Write,
    left: &NormalizedPage,
    right: &NormalizedPage,
) -> io::Result<()> {
    let old = String::from_utf8_lossy(&left.body);
    let new = String::from_utf8_lossy(&right.body);
    let diff = TextDiff::from_lines(old.as_ref(), new.as_ref());

    let mut unified = diff.unified_diff();
    unified.missing_newline_hint(false);

    let mut labeled = false;
    for hunk in unified.iter_hunks() {
        if !labeled {
            writeln!(out, "--- {}", left.url)?;
            writeln!(out, "+++ {}", right.url)?;
            labeled = true;
        }
        write!(out, "{}", hunk)?;
    }
    Ok(())
}
