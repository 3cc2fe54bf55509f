//! Error types for the driftline pipeline.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriftlineError {
    // Acquisition errors
    #[error("download failed for {filename}: {reason}")]
    Fetch { filename: String, reason: String },

    #[error("{} file(s) abandoned after retries: {}", abandoned.len(), abandoned.join(", "))]
    DownloadIncomplete { abandoned: Vec<String> },

    // Cache errors
    #[error("coordinate cache unavailable: {reason}")]
    CacheUnavailable { reason: String },

    // Enrichment errors
    #[error("snapshot {} unreadable: {reason}", path.display())]
    Snapshot { path: PathBuf, reason: String },

    // Archival errors
    #[error("failed to archive {filename}")]
    ArchiveCopy {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    // Configuration errors
    #[error("missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, DriftlineError>;
