//! On-disk cache for raw fetched bodies.
//!
//! One entry per unique URL, keyed by the URL's digest:
//!
//! - `<cache_dir>/<digest>`: the raw response bytes, exactly as received
//! - `<cache_dir>/<digest>.info.json`: `{"url": "<original url>"}` so an
//!   operator can map a cache file back to the URL that produced it
//!
//! Entries are written once and never mutated or expired. There is no
//! inter-process lock; concurrent runs against the same URL may race on the
//! same files, which is accepted for a single-operator tool.

pub mod digest;
pub mod store;

pub use digest::url_digest;
pub use store::{BodyStore, SidecarMeta};
