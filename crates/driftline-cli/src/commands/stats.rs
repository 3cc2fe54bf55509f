//! Coordinate cache statistics.

use anyhow::{Context, Result};

use driftline_core::LayeredConfig;
use driftline_store::SqliteCache;

pub async fn execute(config: &LayeredConfig) -> Result<()> {
    let cache = SqliteCache::open(&config.cache_db.value)
        .await
        .context("coordinate cache unavailable")?;
    let stats = cache.stats().await?;

    println!("Total entries: {}", stats.total);
    let mut by_type: Vec<_> = stats.by_type.into_iter().collect();
    by_type.sort();
    for (kind, count) in by_type {
        println!("  {kind}: {count}");
    }
    Ok(())
}
