//! Unified error types for pagetwin.
//!
//! The variant messages carry stable SCREAMING_CASE prefixes so operators can
//! grep a run's stderr for a failure class.

/// Unified error type for the fetch/cache/compare pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// URL could not be parsed or uses a non-http(s) scheme.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// No HTTP response was obtained at all (DNS/connect/timeout).
    ///
    /// This is the only fetch outcome that is never cached: there is no body
    /// to compare. HTTP-level error responses (4xx/5xx) are content, not
    /// errors.
    #[error("FETCH_FAILED: {0}")]
    Fetch(String),

    /// Response body exceeded the configured size cap.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Cache file I/O failed.
    #[error("CACHE_IO: {0}")]
    CacheIo(#[from] std::io::Error),

    /// Sidecar metadata could not be encoded or decoded.
    #[error("CACHE_META: {0}")]
    CacheMeta(#[from] serde_json::Error),
}
