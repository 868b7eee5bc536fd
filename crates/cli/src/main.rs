//! pagetwin entry point.
//!
//! One URL: fetch through the cache and dump the raw body to stdout. Two
//! URLs: fetch both, normalize both, and print the comparison report.
//! Logging goes to stderr so stdout carries only body bytes or the report.
//! Usage errors exit with 2 (clap), runtime failures with 1.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pagetwin_client::{
    BodyCache, FetchClient, FetchConfig, NormalizedPage, normalize_body, write_report,
};
use pagetwin_core::{AppConfig, BodyStore, url_digest};

/// Spot duplicate pages served under different URLs.
#[derive(Debug, Parser)]
#[command(name = "pagetwin", version)]
#[command(about = "Fetch pages and compare their normalized bodies", long_about = None)]
struct Args {
    /// One URL to fetch and dump, or two URLs to compare.
    #[arg(value_name = "URL", num_args = 1..=2, required = true)]
    urls: Vec<String>,

    /// Cache directory override.
    #[arg(long, value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    /// Fetch timeout override in milliseconds.
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = AppConfig::load()?;
    if let Some(dir) = args.cache_dir {
        config.cache_dir = dir;
    }
    if let Some(ms) = args.timeout_ms {
        config.timeout_ms = ms;
    }
    tracing::debug!(
        "Using cache dir {} (timeout {}ms, body cap {} bytes)",
        config.cache_dir.display(),
        config.timeout_ms,
        config.max_bytes
    );

    let store = BodyStore::open(&config.cache_dir).await?;
    let client = FetchClient::new(FetchConfig {
        user_agent: config.user_agent.clone(),
        max_bytes: config.max_bytes,
        timeout: config.timeout(),
        ..Default::default()
    })?;
    let cache = BodyCache::new(store, client);

    let mut stdout = std::io::stdout().lock();
    match args.urls.as_slice() {
        [url] => {
            let body = cache.get_body(url).await?;
            stdout.write_all(&body)?;
        }
        [left_url, right_url] => {
            // One fetch at a time; the second only starts once the first
            // body is on disk.
            let left_raw = cache.get_body(left_url).await?;
            let right_raw = cache.get_body(right_url).await?;

            let left = NormalizedPage {
                url: left_url.clone(),
                digest: url_digest(left_url),
                body: normalize_body(left_url, &left_raw),
            };
            let right = NormalizedPage {
                url: right_url.clone(),
                digest: url_digest(right_url),
                body: normalize_body(right_url, &right_raw),
            };

            write_report(&mut stdout, &left, &right)?;
        }
        _ => unreachable!("argument count is bounded to 1..=2"),
    }

    Ok(())
}
