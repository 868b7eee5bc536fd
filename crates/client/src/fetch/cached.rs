//! Cache-backed body retrieval.
//!
//! Re-running the tool against the same pair of URLs while tuning the
//! normalization rules must not hammer the origin, so every body is kept
//! on disk keyed by its URL digest and fetched at most once.

use async_trait::async_trait;

use pagetwin_core::{BodyStore, Error, url_digest};

use super::{FetchClient, FetchOutcome};

/// Seam between the cache and the network.
#[async_trait]
pub trait Fetch {
    async fn fetch(&self, url: &str) -> Result<FetchOutcome, Error>;
}

#[async_trait]
impl Fetch for FetchClient {
    async fn fetch(&self, url: &str) -> Result<FetchOutcome, Error> {
        FetchClient::fetch(self, url).await
    }
}

/// Content cache in front of a [`Fetch`] implementation.
pub struct BodyCache<F> {
    store: BodyStore,
    fetcher: F,
}

impl<F: Fetch> BodyCache<F> {
    pub fn new(store: BodyStore, fetcher: F) -> Self {
        Self { store, fetcher }
    }

    /// Raw body bytes for `url`.
    ///
    /// A stored entry is returned without touching the network. On a miss
    /// the body is fetched and stored whatever the HTTP status; only
    /// transport failures propagate, and those leave no cache entry, so
    /// the next run retries the fetch.
    pub async fn get_body(&self, url: &str) -> Result<Vec<u8>, Error> {
        let digest = url_digest(url);

        if let Some(body) = self.store.lookup(&digest).await? {
            tracing::debug!("cache hit for {} ({} bytes)", url, body.len());
            return Ok(body);
        }

        let outcome = self.fetcher.fetch(url).await?;
        if !outcome.status.is_success() {
            tracing::warn!("{} answered {}; keeping the error page", url, outcome.status);
        }
        self.store.insert(&digest, url, &outcome.bytes).await?;
        Ok(outcome.bytes.to_vec())
    }

    /// Get reference to the underlying store.
    pub fn store(&self) -> &BodyStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use reqwest::{StatusCode, Url};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct StubFetcher {
        status: StatusCode,
        body: &'static [u8],
        calls: AtomicUsize,
    }

    impl StubFetcher {
        fn new(status: StatusCode, body: &'static [u8]) -> Self {
            Self { status, body, calls: AtomicUsize::new(0) }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetch for &StubFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchOutcome, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let parsed = Url::parse(url).unwrap();
            Ok(FetchOutcome {
                url: parsed.clone(),
                final_url: parsed,
                status: self.status,
                bytes: Bytes::from_static(self.body),
                fetch_ms: 1,
            })
        }
    }

    struct DownFetcher;

    #[async_trait]
    impl Fetch for DownFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchOutcome, Error> {
            Err(Error::Fetch(format!("no response from {}: connection refused", url)))
        }
    }

    async fn open_store() -> (TempDir, BodyStore) {
        let dir = TempDir::new().unwrap();
        let store = BodyStore::open(dir.path()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_miss_fetches_and_stores() {
        let (_dir, store) = open_store().await;
        let fetcher = StubFetcher::new(StatusCode::OK, b"<html>hello</html>");
        let cache = BodyCache::new(store, &fetcher);

        let body = cache.get_body("https://example.com/a").await.unwrap();
        assert_eq!(body, b"<html>hello</html>");
        assert_eq!(fetcher.calls(), 1);

        let digest = url_digest("https://example.com/a");
        let meta = cache.store().sidecar(&digest).await.unwrap().unwrap();
        assert_eq!(meta.url, "https://example.com/a");
    }

    #[tokio::test]
    async fn test_second_get_uses_cache() {
        let (_dir, store) = open_store().await;
        let fetcher = StubFetcher::new(StatusCode::OK, b"body");
        let cache = BodyCache::new(store, &fetcher);

        let first = cache.get_body("https://example.com/a").await.unwrap();
        let second = cache.get_body("https://example.com/a").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_preseeded_entry_skips_network() {
        let (_dir, store) = open_store().await;
        let digest = url_digest("https://example.com/a");
        store.insert(&digest, "https://example.com/a", b"seeded").await.unwrap();

        let fetcher = StubFetcher::new(StatusCode::OK, b"fresh");
        let cache = BodyCache::new(store, &fetcher);

        let body = cache.get_body("https://example.com/a").await.unwrap();
        assert_eq!(body, b"seeded");
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_error_status_body_is_cached() {
        let (_dir, store) = open_store().await;
        let fetcher = StubFetcher::new(StatusCode::NOT_FOUND, b"<html>not found</html>");
        let cache = BodyCache::new(store, &fetcher);

        let body = cache.get_body("https://example.com/gone").await.unwrap();
        assert_eq!(body, b"<html>not found</html>");

        let digest = url_digest("https://example.com/gone");
        let stored = cache.store().lookup(&digest).await.unwrap();
        assert_eq!(stored.as_deref(), Some(b"<html>not found</html>".as_slice()));
    }

    #[tokio::test]
    async fn test_transport_failure_leaves_no_entry() {
        let (_dir, store) = open_store().await;
        let cache = BodyCache::new(store, DownFetcher);

        let err = cache.get_body("https://example.com/a").await;
        assert!(matches!(err, Err(Error::Fetch(_))));

        let digest = url_digest("https://example.com/a");
        assert!(cache.store().lookup(&digest).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_distinct_urls_get_distinct_entries() {
        let (_dir, store) = open_store().await;
        let fetcher = StubFetcher::new(StatusCode::OK, b"same body");
        let cache = BodyCache::new(store, &fetcher);

        cache.get_body("https://example.com/a").await.unwrap();
        cache.get_body("https://example.com/b").await.unwrap();
        assert_eq!(fetcher.calls(), 2);
    }
}
