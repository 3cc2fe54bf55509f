//! Rotation of a completed batch into a timestamped archive bucket.

use std::path::Path;

use chrono::NaiveDateTime;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::error::{DriftlineError, Result};
use crate::fetch::HOURS_PER_BATCH;

/// What a rotation did: the bucket it wrote and any per-file copy failures.
///
/// Archival is best effort across files. A failed copy is reported here and
/// logged, never rolled back; losing one archived file must not block
/// acquisition of the next live batch.
#[derive(Debug)]
pub struct RotationOutcome {
    pub bucket: String,
    pub archived: usize,
    pub failed: Vec<String>,
}

/// Archive the working set if, and only if, it holds a complete batch.
///
/// Invoked speculatively every cycle: any file count other than exactly 24
/// is a no-op (`Ok(None)`), not an error. The bucket is named for the hour
/// the batch logically completed, one hour before `now`, formatted as the
/// sortable `YYYY-MM-DD-HH`. Files are copied, not moved; the working set
/// stays in place for processing.
pub async fn rotate(
    current_dir: &Path,
    archive_root: &Path,
    now: NaiveDateTime,
) -> Result<Option<RotationOutcome>> {
    let mut filenames = Vec::new();
    let mut entries = tokio::fs::read_dir(current_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            filenames.push(entry.file_name());
        }
    }

    if filenames.len() != HOURS_PER_BATCH {
        debug!(
            found = filenames.len(),
            expected = HOURS_PER_BATCH,
            "working set incomplete, not rotating"
        );
        return Ok(None);
    }

    let bucket = (now - chrono::Duration::hours(1))
        .format("%Y-%m-%d-%H")
        .to_string();
    let bucket_dir = archive_root.join(&bucket);
    tokio::fs::create_dir_all(&bucket_dir).await?;

    // Each copy targets a distinct destination path, so the fan-out is safe
    // to run concurrently.
    let copies = filenames.iter().map(|name| {
        let src = current_dir.join(name);
        let dst = bucket_dir.join(name);
        async move {
            tokio::fs::copy(&src, &dst)
                .await
                .map_err(|e| DriftlineError::ArchiveCopy {
                    filename: name.to_string_lossy().into_owned(),
                    source: e,
                })
        }
    });

    let mut failed = Vec::new();
    for result in join_all(copies).await {
        if let Err(e) = result {
            warn!(error = %e, "archive copy failed");
            if let DriftlineError::ArchiveCopy { filename, .. } = e {
                failed.push(filename);
            }
        }
    }

    let archived = filenames.len() - failed.len();
    info!(bucket = %bucket, archived, failed = failed.len(), "rotated batch");
    Ok(Some(RotationOutcome {
        bucket,
        archived,
        failed,
    }))
}
