//! Bounded-retry acquisition of the hourly snapshot roster.
//!
//! Each of the 24 hour files is fetched, validated and persisted
//! independently. Failures go through a convergent retry loop: every pass
//! over the pending set either empties it or abandons entries that hit the
//! retry ceiling, so the loop always terminates. The run as a whole fails if
//! anything was abandoned; downstream stages never see a partial batch.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::error::{DriftlineError, Result};

/// Number of hour files in one complete batch.
pub const HOURS_PER_BATCH: usize = 24;

/// A payload serializing below this is treated as corrupt or incomplete.
pub const MIN_SNAPSHOT_BYTES: usize = 1000;

/// Retry ceiling per file, on top of the initial attempt.
pub const MAX_RETRIES: u32 = 5;

/// Fixed pacing delay after each retry attempt, success or not.
pub const RETRY_DELAY: Duration = Duration::from_millis(1000);

/// The expected hourly filenames, `00.json` through `23.json`.
pub fn hour_filenames() -> Vec<String> {
    (0..HOURS_PER_BATCH).map(|h| format!("{h:02}.json")).collect()
}

/// A transport-level failure for one file.
#[derive(Debug, Error)]
pub enum FetchFailure {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("HTTP {0}")]
    Status(u16),
}

/// Port for the remote data source; returns the raw response body.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self, filename: &str) -> std::result::Result<Vec<u8>, FetchFailure>;
}

/// `SnapshotSource` over HTTP: `GET {base}/{HH}.json`.
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSource {
    /// Builder failures (e.g. an unusable User-Agent value) propagate; a
    /// client silently missing its configured agent or timeout is worse
    /// than failing the run up front.
    pub fn new(base_url: impl Into<String>, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DriftlineError::ConfigInvalid {
                key: "user_agent".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl SnapshotSource for HttpSource {
    async fn fetch(&self, filename: &str) -> std::result::Result<Vec<u8>, FetchFailure> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), filename);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchFailure::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchFailure::Status(response.status().as_u16()));
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| FetchFailure::Transport(e.to_string()))
    }
}

/// One file moving through `Pending(attempts) -> {Succeeded | Abandoned}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub filename: String,
    pub attempts: u32,
}

impl DownloadTask {
    fn new(filename: String) -> Self {
        Self {
            filename,
            attempts: 0,
        }
    }
}

/// Drives the acquisition of one full batch into the working directory.
pub struct Downloader<S> {
    source: S,
    dest_dir: PathBuf,
    max_retries: u32,
    retry_delay: Duration,
}

impl<S: SnapshotSource> Downloader<S> {
    pub fn new(source: S, dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            dest_dir: dest_dir.into(),
            max_retries: MAX_RETRIES,
            retry_delay: RETRY_DELAY,
        }
    }

    /// Override retry ceiling and pacing, used by tests.
    pub fn with_retry_policy(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    /// Acquire the full roster of hour files.
    ///
    /// Returns `Ok(())` only when every file was fetched, validated and
    /// written. Files still failing after the retry ceiling are reported via
    /// `DownloadIncomplete`; the caller must then skip downstream processing.
    pub async fn run(&self) -> Result<()> {
        let mut pending: Vec<DownloadTask> = Vec::new();

        info!(files = HOURS_PER_BATCH, "starting batch download");
        for filename in hour_filenames() {
            match self.fetch_one(&filename).await {
                Ok(()) => info!(%filename, "downloaded"),
                Err(e) => {
                    warn!(%filename, error = %e, "download failed, queued for retry");
                    pending.push(DownloadTask::new(filename));
                }
            }
        }

        let mut abandoned: Vec<String> = Vec::new();
        while !pending.is_empty() {
            // Iterate a snapshot of the pending set; entries either succeed,
            // re-enter with a bumped attempt count, or get abandoned.
            let mut still_pending = Vec::new();
            for mut task in pending {
                debug!(
                    filename = %task.filename,
                    attempt = task.attempts + 1,
                    ceiling = self.max_retries,
                    "retrying download"
                );
                match self.fetch_one(&task.filename).await {
                    Ok(()) => info!(filename = %task.filename, "succeeded on retry"),
                    Err(e) => {
                        task.attempts += 1;
                        if task.attempts >= self.max_retries {
                            error!(
                                filename = %task.filename,
                                attempts = task.attempts,
                                error = %e,
                                "retry ceiling reached, abandoning"
                            );
                            abandoned.push(task.filename);
                        } else {
                            still_pending.push(task);
                        }
                    }
                }
                // Pacing, applied after every attempt regardless of outcome.
                tokio::time::sleep(self.retry_delay).await;
            }
            pending = still_pending;
        }

        if abandoned.is_empty() {
            info!("batch download complete");
            Ok(())
        } else {
            Err(DriftlineError::DownloadIncomplete { abandoned })
        }
    }

    /// One fetch-validate-persist cycle for a single file.
    async fn fetch_one(&self, filename: &str) -> Result<()> {
        let fetch_err = |reason: String| DriftlineError::Fetch {
            filename: filename.to_string(),
            reason,
        };

        let bytes = self
            .source
            .fetch(filename)
            .await
            .map_err(|e| fetch_err(e.to_string()))?;

        let payload: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|e| fetch_err(format!("unparseable payload: {e}")))?;
        if !payload.is_array() {
            return Err(fetch_err("payload is not a JSON array".to_string()));
        }

        let body = serde_json::to_vec(&payload).map_err(|e| fetch_err(e.to_string()))?;
        if body.len() < MIN_SNAPSHOT_BYTES {
            return Err(fetch_err(format!(
                "payload too small: {} bytes (minimum {MIN_SNAPSHOT_BYTES})",
                body.len()
            )));
        }

        tokio::fs::write(self.dest_dir.join(filename), body)
            .await
            .map_err(|e| fetch_err(format!("write failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted source: each file fails a configured number of times before
    /// serving a valid payload.
    struct ScriptedSource {
        failures_per_file: HashMap<String, usize>,
        calls: Mutex<HashMap<String, usize>>,
        total_calls: AtomicUsize,
        payload: Vec<u8>,
    }

    impl ScriptedSource {
        fn new(failures_per_file: HashMap<String, usize>) -> Self {
            Self {
                failures_per_file,
                calls: Mutex::new(HashMap::new()),
                total_calls: AtomicUsize::new(0),
                payload: valid_payload(),
            }
        }

        fn calls_for(&self, filename: &str) -> usize {
            self.calls.lock().unwrap().get(filename).copied().unwrap_or(0)
        }
    }

    /// A JSON array comfortably above the 1000-byte validity floor.
    fn valid_payload() -> Vec<u8> {
        let triples: Vec<[f64; 3]> = (0..60)
            .map(|i| [f64::from(i) * 0.7, f64::from(i) * -0.3, 12.5])
            .collect();
        serde_json::to_vec(&triples).unwrap()
    }

    #[async_trait]
    impl SnapshotSource for ScriptedSource {
        async fn fetch(&self, filename: &str) -> std::result::Result<Vec<u8>, FetchFailure> {
            self.total_calls.fetch_add(1, Ordering::SeqCst);
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(filename.to_string()).or_insert(0);
            *count += 1;
            let budget = self.failures_per_file.get(filename).copied().unwrap_or(0);
            if *count <= budget {
                Err(FetchFailure::Status(502))
            } else {
                Ok(self.payload.clone())
            }
        }
    }

    fn downloader(source: ScriptedSource, dir: &std::path::Path) -> Downloader<ScriptedSource> {
        Downloader::new(source, dir).with_retry_policy(MAX_RETRIES, Duration::ZERO)
    }

    #[test]
    fn http_source_surfaces_client_builder_failures() {
        assert!(HttpSource::new("http://localhost:9001", "driftline/0.1").is_ok());
        let result = HttpSource::new("http://localhost:9001", "bad\nagent");
        assert!(matches!(
            result,
            Err(DriftlineError::ConfigInvalid { ref key, .. }) if key == "user_agent"
        ));
    }

    #[test]
    fn roster_covers_every_hour_slot() {
        let names = hour_filenames();
        assert_eq!(names.len(), 24);
        assert_eq!(names[0], "00.json");
        assert_eq!(names[9], "09.json");
        assert_eq!(names[23], "23.json");
    }

    #[tokio::test]
    async fn clean_run_writes_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let dl = downloader(ScriptedSource::new(HashMap::new()), dir.path());

        dl.run().await.unwrap();

        for filename in hour_filenames() {
            let written = std::fs::read(dir.path().join(&filename)).unwrap();
            assert!(written.len() >= MIN_SNAPSHOT_BYTES);
        }
        assert_eq!(dl.source.total_calls.load(Ordering::SeqCst), 24);
    }

    #[tokio::test]
    async fn transient_failures_recover_on_retry() {
        let dir = tempfile::tempdir().unwrap();
        let failures = HashMap::from([("07.json".to_string(), 3)]);
        let dl = downloader(ScriptedSource::new(failures), dir.path());

        dl.run().await.unwrap();

        // Initial attempt plus three failed retries plus the success.
        assert_eq!(dl.source.calls_for("07.json"), 4);
        assert!(dir.path().join("07.json").exists());
    }

    #[tokio::test]
    async fn persistent_failure_abandons_after_the_retry_ceiling() {
        let dir = tempfile::tempdir().unwrap();
        let failures = HashMap::from([("13.json".to_string(), usize::MAX)]);
        let dl = downloader(ScriptedSource::new(failures), dir.path());

        let err = dl.run().await.unwrap_err();
        match err {
            DriftlineError::DownloadIncomplete { abandoned } => {
                assert_eq!(abandoned, vec!["13.json".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        // Exactly 6 total attempts: the initial pass plus 5 retries.
        assert_eq!(dl.source.calls_for("13.json"), 6);
        assert!(!dir.path().join("13.json").exists());
    }

    #[tokio::test]
    async fn undersized_payload_is_treated_as_a_failure() {
        struct TinySource;

        #[async_trait]
        impl SnapshotSource for TinySource {
            async fn fetch(&self, _: &str) -> std::result::Result<Vec<u8>, FetchFailure> {
                Ok(b"[[1.0,2.0,3.0]]".to_vec())
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let dl = Downloader::new(TinySource, dir.path()).with_retry_policy(1, Duration::ZERO);

        let err = dl.run().await.unwrap_err();
        assert!(matches!(err, DriftlineError::DownloadIncomplete { ref abandoned } if abandoned.len() == 24));
    }

    #[tokio::test]
    async fn non_array_payload_is_treated_as_a_failure() {
        struct ObjectSource;

        #[async_trait]
        impl SnapshotSource for ObjectSource {
            async fn fetch(&self, _: &str) -> std::result::Result<Vec<u8>, FetchFailure> {
                let padding = "x".repeat(2000);
                Ok(format!(r#"{{"error":"maintenance","padding":"{padding}"}}"#).into_bytes())
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let dl = Downloader::new(ObjectSource, dir.path()).with_retry_policy(1, Duration::ZERO);

        assert!(dl.run().await.is_err());
    }
}
