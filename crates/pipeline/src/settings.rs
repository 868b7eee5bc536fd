//! Crawl settings with versioned refresh.
//!
//! Workers poll a shared settings hash between work items. A version
//! counter gates the reload: when it is unchanged nothing else is read.
//! A new snapshot is built completely before it replaces the current one,
//! so a mid-reload failure leaves the previous settings in force.

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    /// Failure talking to the settings backend.
    #[error("SETTINGS_BACKEND: {0}")]
    Backend(String),
}

/// Backend holding the shared settings hash and pattern sets.
pub trait SettingsStore {
    /// Current value of the version counter for `ident`, if set.
    fn version(&mut self, ident: &str) -> Result<Option<String>, SettingsError>;

    /// Scalar fields of the settings hash, one `Option` per requested
    /// field, in request order.
    fn scalars(&mut self, ident: &str, fields: &[&str])
    -> Result<Vec<Option<String>>, SettingsError>;

    /// Members of the named pattern set.
    fn pattern_set(&mut self, key: &str) -> Result<Vec<String>, SettingsError>;
}

/// Inclusive delay bounds in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    /// Absent or malformed fields fall back to zero, the no-delay default.
    fn from_fields(min: Option<String>, max: Option<String>) -> Self {
        Self { min_ms: parse_ms(min), max_ms: parse_ms(max) }
    }
}

fn parse_ms(value: Option<String>) -> u64 {
    value.and_then(|s| s.parse().ok()).unwrap_or(0)
}

/// One refreshed snapshot of crawl settings.
#[derive(Debug, Clone, Default)]
pub struct CrawlSettings {
    /// Delay between queue items.
    pub delay: DelayRange,
    /// Delay between page-requisite fetches.
    pub pagereq_delay: DelayRange,
    patterns: Vec<(String, Regex)>,
}

impl CrawlSettings {
    /// First exclusion pattern matching `url`, or `None` when the URL is
    /// allowed.
    pub fn exclusion_match(&self, url: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|(_, re)| re.is_match(url))
            .map(|(raw, _)| raw.as_str())
    }

    /// Number of compiled exclusion patterns.
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// One-line description for operator logs.
    pub fn summary(&self) -> String {
        format!(
            "{} ignore patterns, delay [{}, {}] ms, pagereq delay [{}, {}] ms",
            self.patterns.len(),
            self.delay.min_ms,
            self.delay.max_ms,
            self.pagereq_delay.min_ms,
            self.pagereq_delay.max_ms,
        )
    }
}

/// Field names in the settings hash, read in one round trip.
const SCALAR_FIELDS: [&str; 5] = [
    "delay_min",
    "delay_max",
    "pagereq_delay_min",
    "pagereq_delay_max",
    "ignore_patterns_set_key",
];

/// Polls a [`SettingsStore`] and keeps the latest [`CrawlSettings`].
pub struct SettingsPoller<S> {
    store: S,
    ident: String,
    version: Option<String>,
    current: CrawlSettings,
}

impl<S: SettingsStore> SettingsPoller<S> {
    pub fn new(store: S, ident: impl Into<String>) -> Self {
        Self {
            store,
            ident: ident.into(),
            version: None,
            current: CrawlSettings::default(),
        }
    }

    /// Latest settings snapshot.
    pub fn settings(&self) -> &CrawlSettings {
        &self.current
    }

    /// Compare the version counter and reload on change.
    ///
    /// Returns whether an update happened. An unchanged counter costs one
    /// backend read and nothing else.
    pub fn refresh(&mut self) -> Result<bool, SettingsError> {
        let version = self.store.version(&self.ident)?;
        if version == self.version {
            return Ok(false);
        }

        let mut scalars = self.store.scalars(&self.ident, &SCALAR_FIELDS)?.into_iter();
        let delay_min = scalars.next().flatten();
        let delay_max = scalars.next().flatten();
        let pagereq_min = scalars.next().flatten();
        let pagereq_max = scalars.next().flatten();
        let set_key = scalars.next().flatten();

        let members = match set_key {
            Some(key) => self.store.pattern_set(&key)?,
            None => Vec::new(),
        };

        self.current = CrawlSettings {
            delay: DelayRange::from_fields(delay_min, delay_max),
            pagereq_delay: DelayRange::from_fields(pagereq_min, pagereq_max),
            patterns: compile_patterns(members),
        };
        self.version = version;
        tracing::info!("crawl settings updated: {}", self.current.summary());
        Ok(true)
    }
}

/// Compile exclusion patterns, skipping ones that do not parse.
///
/// A typo in one shared pattern must not take down every worker.
fn compile_patterns(members: Vec<String>) -> Vec<(String, Regex)> {
    members
        .into_iter()
        .filter_map(|raw| match Regex::new(&raw) {
            Ok(re) => Some((raw, re)),
            Err(e) => {
                tracing::warn!("skipping unparseable ignore pattern {:?}: {}", raw, e);
                None
            }
        })
        .collect()
}

impl SettingsStore for redis::Connection {
    fn version(&mut self, ident: &str) -> Result<Option<String>, SettingsError> {
        redis::cmd("HGET")
            .arg(ident)
            .arg("settings_age")
            .query(self)
            .map_err(backend)
    }

    fn scalars(
        &mut self,
        ident: &str,
        fields: &[&str],
    ) -> Result<Vec<Option<String>>, SettingsError> {
        redis::cmd("HMGET").arg(ident).arg(fields).query(self).map_err(backend)
    }

    fn pattern_set(&mut self, key: &str) -> Result<Vec<String>, SettingsError> {
        redis::cmd("SMEMBERS").arg(key).query(self).map_err(backend)
    }
}

fn backend(err: redis::RedisError) -> SettingsError {
    SettingsError::Backend(err.to_string())
}
