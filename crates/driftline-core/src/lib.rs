//! driftline-core: domain logic for the hourly balloon-trajectory pipeline.
//!
//! Covers the acquisition loop (bounded-retry download of the 24-file hourly
//! roster), batch rotation into timestamped archive buckets, and cache-aside
//! geographic resolution of coordinates into enriched start/end trajectory
//! records. Persistence adapters live in `driftline-store`; the CLI driver
//! in `driftline-cli`.

pub mod archive;
pub mod assemble;
pub mod config;
pub mod error;
pub mod fetch;
pub mod geocode;
pub mod models;
pub mod ports;
pub mod resolver;

pub use archive::{rotate, RotationOutcome};
pub use assemble::assemble;
pub use config::{CliConfigOverrides, ConfigSource, LayeredConfig};
pub use error::{DriftlineError, Result};
pub use fetch::{Downloader, DownloadTask, HttpSource, SnapshotSource, HOURS_PER_BATCH};
pub use geocode::HttpGeocoder;
pub use models::{CoordKey, LabelMapping, PlaceLabel, RawSnapshot, TrajectoryRecord};
pub use ports::{CoordinateCache, GeocodeFailure, Geocoder};
pub use resolver::{PlaceResolver, Resolution};
