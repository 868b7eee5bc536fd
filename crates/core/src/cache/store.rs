//! Directory-backed storage for raw body bytes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Error;

/// Sidecar record written next to each cached body.
///
/// Holds the original URL for reverse lookup; nothing else is persisted, so
/// the body file stays byte-for-byte what the server sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SidecarMeta {
    pub url: String,
}

/// Handle to a cache directory.
///
/// The directory is created on open if absent. Lookups and inserts address
/// entries by digest only; computing the digest is the caller's concern
/// (see [`crate::cache::url_digest`]).
#[derive(Debug, Clone)]
pub struct BodyStore {
    root: PathBuf,
}

impl BodyStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    ///
    /// Idempotent across process restarts; an existing directory (and its
    /// entries) is reused as-is.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, Error> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Path of the body file for a digest.
    pub fn body_path(&self, digest: &str) -> PathBuf {
        self.root.join(digest)
    }

    /// Path of the sidecar file for a digest.
    pub fn sidecar_path(&self, digest: &str) -> PathBuf {
        self.root.join(format!("{digest}.info.json"))
    }

    /// Return the stored body for a digest, or `None` on a cache miss.
    pub async fn lookup(&self, digest: &str) -> Result<Option<Vec<u8>>, Error> {
        match tokio::fs::read(self.body_path(digest)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist a body and its `{url}` sidecar under a digest.
    ///
    /// Last writer wins if two runs race on the same URL; both would be
    /// writing identical-enough content.
    pub async fn insert(&self, digest: &str, url: &str, body: &[u8]) -> Result<(), Error> {
        tokio::fs::write(self.body_path(digest), body).await?;
        let meta = serde_json::to_vec(&SidecarMeta { url: url.to_string() })?;
        tokio::fs::write(self.sidecar_path(digest), meta).await?;
        tracing::debug!("cached {} bytes for {} as {}", body.len(), url, digest);
        Ok(())
    }

    /// Read back the sidecar record for a digest, if the entry exists.
    pub async fn sidecar(&self, digest: &str) -> Result<Option<SidecarMeta>, Error> {
        match tokio::fs::read(self.sidecar_path(digest)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::url_digest;

    #[tokio::test]
    async fn test_open_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("cache");
        assert!(!root.exists());

        let store = BodyStore::open(&root).await.unwrap();
        assert!(root.is_dir());
        assert_eq!(store.root(), root);
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        BodyStore::open(dir.path()).await.unwrap();
        BodyStore::open(dir.path()).await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_and_lookup_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = BodyStore::open(dir.path()).await.unwrap();

        let url = "https://example.com/page";
        let digest = url_digest(url);
        let body = b"<html>hello</html>";

        store.insert(&digest, url, body).await.unwrap();

        let back = store.lookup(&digest).await.unwrap().unwrap();
        assert_eq!(back, body);
    }

    #[tokio::test]
    async fn test_lookup_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = BodyStore::open(dir.path()).await.unwrap();
        let missing = store.lookup(&url_digest("https://nowhere.invalid/")).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_sidecar_holds_original_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = BodyStore::open(dir.path()).await.unwrap();

        let url = "https://example.com/a?b=c";
        let digest = url_digest(url);
        store.insert(&digest, url, b"body").await.unwrap();

        let meta = store.sidecar(&digest).await.unwrap().unwrap();
        assert_eq!(meta.url, url);

        let raw = std::fs::read_to_string(store.sidecar_path(&digest)).unwrap();
        assert!(raw.contains("\"url\""));
        assert!(store.sidecar_path(&digest).to_string_lossy().ends_with(".info.json"));
    }

    #[tokio::test]
    async fn test_non_utf8_body_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = BodyStore::open(dir.path()).await.unwrap();

        let url = "https://example.com/bin";
        let digest = url_digest(url);
        let body = vec![0xff, 0xfe, 0x00, 0x80, b'a'];
        store.insert(&digest, url, &body).await.unwrap();

        assert_eq!(store.lookup(&digest).await.unwrap().unwrap(), body);
    }
}
