//! Client code for pagetwin.
//!
//! This crate provides the HTTP fetch layer with its on-disk body cache,
//! the noise-normalization pipeline, and the diff reporter shared by the
//! CLI.

pub mod diff;
pub mod fetch;
pub mod normalize;

pub use diff::{NormalizedPage, write_diff, write_report};

pub use fetch::{BodyCache, Fetch, FetchClient, FetchConfig, FetchOutcome, parse_fetch_url};

pub use normalize::{PageContext, normalize_body};
