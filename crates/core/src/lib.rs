//! Core types and shared functionality for pagetwin.
//!
//! This crate provides:
//! - URL digest computation (cache keys, reported to the operator)
//! - The on-disk raw-body store with sidecar metadata
//! - Unified error types
//! - Configuration loading and validation

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{BodyStore, SidecarMeta, url_digest};
pub use config::AppConfig;
pub use error::Error;
