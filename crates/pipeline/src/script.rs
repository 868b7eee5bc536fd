//! Server-side script execution with digest caching.
//!
//! A pipeline worker uploads its coordination script once, remembers the
//! digest, and afterwards invokes by digest alone. A backend restart wipes
//! the server-side script cache, so an unknown-digest answer triggers one
//! reload-and-retry; any other failure propagates untouched.

use thiserror::Error;

/// `SCRIPT_*` error messages keep the failing backend detail.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The backend does not recognize the digest, typically because it
    /// restarted and dropped its script cache.
    #[error("SCRIPT_UNKNOWN: {0}")]
    UnknownScript(String),

    /// Any other backend failure.
    #[error("SCRIPT_BACKEND: {0}")]
    Backend(String),
}

/// Backend that can load scripts and execute them by digest or by source.
pub trait ScriptStore {
    /// Value type produced by script execution.
    type Value;

    /// Upload `source`, returning the digest it is stored under.
    fn load(&mut self, source: &str) -> Result<String, ScriptError>;

    /// Execute a previously loaded script by digest.
    fn eval_digest(
        &mut self,
        digest: &str,
        keys: &[String],
        args: &[String],
    ) -> Result<Self::Value, ScriptError>;

    /// Execute directly from source, bypassing the digest cache.
    fn eval_source(
        &mut self,
        source: &str,
        keys: &[String],
        args: &[String],
    ) -> Result<Self::Value, ScriptError>;
}

/// Runs one script against a [`ScriptStore`], loading it lazily.
pub struct ScriptRunner<S> {
    store: S,
    source: String,
    digest: Option<String>,
}

impl<S: ScriptStore> ScriptRunner<S> {
    pub fn new(store: S, source: impl Into<String>) -> Self {
        Self { store, source: source.into(), digest: None }
    }

    /// Digest remembered from the last successful load, if any.
    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    fn ensure_loaded(&mut self) -> Result<String, ScriptError> {
        if let Some(digest) = &self.digest {
            return Ok(digest.clone());
        }
        let digest = self.store.load(&self.source)?;
        tracing::debug!("script loaded as {}", digest);
        self.digest = Some(digest.clone());
        Ok(digest)
    }

    /// Execute the script with the given keys and arguments.
    ///
    /// On an unknown-digest answer the digest is cleared and the
    /// load-and-execute sequence repeats exactly once. A second
    /// unknown-digest answer, and every other error, propagates unchanged.
    pub fn invoke(&mut self, keys: &[String], args: &[String]) -> Result<S::Value, ScriptError> {
        let digest = self.ensure_loaded()?;
        match self.store.eval_digest(&digest, keys, args) {
            Err(ScriptError::UnknownScript(detail)) => {
                tracing::debug!("backend forgot script {}: {}", digest, detail);
                self.digest = None;
                let digest = self.ensure_loaded()?;
                self.store.eval_digest(&digest, keys, args)
            }
            other => other,
        }
    }

    /// Execute the script from source, leaving the digest cache alone.
    pub fn invoke_inline(
        &mut self,
        keys: &[String],
        args: &[String],
    ) -> Result<S::Value, ScriptError> {
        self.store.eval_source(&self.source, keys, args)
    }
}

impl ScriptStore for redis::Connection {
    type Value = redis::Value;

    fn load(&mut self, source: &str) -> Result<String, ScriptError> {
        redis::cmd("SCRIPT")
            .arg("LOAD")
            .arg(source)
            .query(self)
            .map_err(classify)
    }

    fn eval_digest(
        &mut self,
        digest: &str,
        keys: &[String],
        args: &[String],
    ) -> Result<redis::Value, ScriptError> {
        redis::cmd("EVALSHA")
            .arg(digest)
            .arg(keys.len())
            .arg(keys)
            .arg(args)
            .query(self)
            .map_err(classify)
    }

    fn eval_source(
        &mut self,
        source: &str,
        keys: &[String],
        args: &[String],
    ) -> Result<redis::Value, ScriptError> {
        redis::cmd("EVAL")
            .arg(source)
            .arg(keys.len())
            .arg(keys)
            .arg(args)
            .query(self)
            .map_err(classify)
    }
}

fn classify(err: redis::RedisError) -> ScriptError {
    if err.code() == Some("NOSCRIPT") {
        ScriptError::UnknownScript(err.to_string())
    } else {
        ScriptError::Backend(err.to_string())
    }
}
