//! The acquisition-to-publish workflow: rotate, download, enrich, push.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use driftline_core::{
    assemble, rotate, Downloader, HttpGeocoder, HttpSource, LayeredConfig, PlaceResolver,
    RawSnapshot,
};
use driftline_store::SqliteCache;

use crate::cli::RunArgs;
use crate::publish;

pub async fn execute(args: RunArgs, config: &LayeredConfig) -> Result<()> {
    info!("starting hourly data collection workflow");

    let current_dir = config.current_dir();
    let archive_dir = config.archive_dir();
    tokio::fs::create_dir_all(&current_dir).await?;
    tokio::fs::create_dir_all(&archive_dir).await?;

    // Speculative rotation: a no-op unless the previous batch completed.
    // Archival is best effort; a failed copy never blocks acquisition.
    match rotate(&current_dir, &archive_dir, chrono::Local::now().naive_local()).await {
        Ok(Some(outcome)) if !outcome.failed.is_empty() => warn!(
            bucket = %outcome.bucket,
            failed = outcome.failed.len(),
            "rotation finished with copy failures"
        ),
        Ok(_) => {}
        Err(e) => warn!(error = %e, "rotation failed, continuing with acquisition"),
    }

    let source = HttpSource::new(config.base_url.value.clone(), &config.user_agent.value)?;
    Downloader::new(source, &current_dir)
        .run()
        .await
        .context("acquisition stage failed")?;

    let cache = SqliteCache::open(&config.cache_db.value)
        .await
        .context("coordinate cache unavailable")?;
    let geocoder = HttpGeocoder::from_config(config)?;
    let resolver = PlaceResolver::new(cache, geocoder);

    let start = RawSnapshot::load(&current_dir.join("00.json")).await?;
    let end = RawSnapshot::load(&current_dir.join("23.json")).await?;
    info!(start = start.len(), end = end.len(), "loaded boundary snapshots");

    let coordinates: Vec<(f64, f64)> = start.coordinates().chain(end.coordinates()).collect();
    let labels = resolver
        .resolve_batch(
            &coordinates,
            Duration::from_millis(config.min_interval_ms.value),
        )
        .await
        .context("enrichment stage failed")?;

    let records = assemble(&start, &end, &labels);
    let processed_path = config.processed_path();
    let body = serde_json::to_vec_pretty(&records)?;
    tokio::fs::write(&processed_path, body).await?;
    info!(
        records = records.len(),
        path = %processed_path.display(),
        "wrote enriched trajectories"
    );

    if args.no_publish {
        info!("publish stage skipped (--no-publish)");
    } else {
        publish::push_artifacts("Automated update: new data files and processed trajectories")
            .await
            .context("publish stage failed")?;
    }

    info!("hourly workflow complete");
    Ok(())
}
