//! Cache database bootstrap and optional seed import.

use anyhow::{Context, Result};
use tracing::info;

use driftline_core::LayeredConfig;
use driftline_store::SqliteCache;

use crate::cli::InitDbArgs;

pub async fn execute(args: InitDbArgs, config: &LayeredConfig) -> Result<()> {
    let db_path = &config.cache_db.value;
    info!(path = %db_path.display(), "initializing coordinate cache database");

    // Opening creates the file and schema if missing.
    let cache = SqliteCache::open(db_path)
        .await
        .context("could not create the cache database")?;

    if let Some(seed) = &args.seed {
        let inserted = cache
            .seed_from_json(seed)
            .await
            .with_context(|| format!("could not import seed file {}", seed.display()))?;
        println!("Imported {inserted} entries from {}", seed.display());
    }

    let stats = cache.stats().await?;
    println!("Cache ready at {}: {} entries", db_path.display(), stats.total);
    Ok(())
}
