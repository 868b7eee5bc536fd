//! Pipeline collaborator plumbing for pagetwin.
//!
//! The duplicate checker runs inside a crawl pipeline whose workers share
//! a Redis backend. This crate carries the two pieces of that plumbing the
//! checker's callers rely on: cached server-side script execution and the
//! versioned crawl-settings poller. Both are written against small store
//! traits, with Redis implementations on [`redis::Connection`].

pub mod script;
pub mod settings;

pub use script::{ScriptError, ScriptRunner, ScriptStore};

pub use settings::{CrawlSettings, DelayRange, SettingsError, SettingsPoller, SettingsStore};
