//! Cache key generation.

use sha2::{Digest, Sha256};

/// Compute the cache digest for a URL.
///
/// SHA-256 over the UTF-8 bytes of the URL exactly as the operator gave it,
/// rendered as 64 lowercase hex characters. The digest doubles as the cache
/// filename and is echoed in the comparison report, so it must be stable
/// across runs and platforms.
pub fn url_digest(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
