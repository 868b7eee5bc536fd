//! HTTP fetch layer.
//!
//! Deliberately thin: the comparison must see a page exactly as a crawler
//! would, so the URL is requested verbatim (no canonicalization) and an
//! HTTP error status is a page to compare, not a failure. Soft-404 pages
//! and real error pages are content. Only a transport-level failure, where
//! no response arrives at all, maps to an error.

pub mod cached;

use bytes::Bytes;
use reqwest::{Client, StatusCode, Url};
use std::time::{Duration, Instant};

pub use cached::{BodyCache, Fetch};

use pagetwin_core::Error;

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "pagetwin/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "pagetwin/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

/// Outcome of fetching one URL.
///
/// Exists whenever the server answered at all; `status` may well be 404 or
/// 500, in which case `bytes` holds the error page.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// The URL as requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Response body bytes
    pub bytes: Bytes,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

/// HTTP fetch client.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Fetch(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Fetch a URL, returning raw bytes and metadata.
    ///
    /// The body is returned for every HTTP status; transport failures and
    /// oversized responses are the only errors.
    pub async fn fetch(&self, url_str: &str) -> Result<FetchOutcome, Error> {
        let start = Instant::now();
        let url = parse_fetch_url(url_str)?;

        let request = self.http.get(url.clone()).header(
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        );

        let response = request
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("no response from {}: {}", url_str, e)))?;

        let status = response.status();

        let content_length = response.content_length();
        if let Some(len) = content_length
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                len, self.config.max_bytes
            )));
        }

        let final_url = response.url().clone();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Fetch(format!("failed to read response: {}", e)))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                bytes.len(),
                self.config.max_bytes
            )));
        }

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} -> {} in {}ms ({} bytes)",
            url,
            status,
            fetch_ms,
            bytes.len()
        );
        if final_url != url {
            tracing::debug!("{} redirected to {}", url, final_url);
        }

        Ok(FetchOutcome { url, final_url, status, bytes, fetch_ms })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

/// Validate a fetch URL without rewriting it.
///
/// The cache digest is computed over the string the operator typed, so
/// nothing here may canonicalize; only what could never be fetched is
/// rejected, before any network activity.
pub fn parse_fetch_url(input: &str) -> Result<Url, Error> {
    let url =
        Url::parse(input).map_err(|e| Error::InvalidUrl(format!("{}: {}", input, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(Error::InvalidUrl(format!(
            "unsupported scheme {}: {}",
            scheme, input
        ))),
    }
}
