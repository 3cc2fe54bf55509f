//! Ports implemented by storage and lookup adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::error::Result;
use crate::models::{CoordKey, PlaceLabel};

/// Port for the persistent coordinate cache.
///
/// The cache is append-only: entries are created on first resolution of a
/// key and never updated or deleted. Resolution is sequential, so the store
/// never sees concurrent writers for one key, but `insert_if_absent` must
/// stay idempotent regardless.
#[async_trait]
pub trait CoordinateCache: Send + Sync {
    /// Exact-match lookup by rounded coordinate key.
    async fn lookup(&self, key: CoordKey) -> Result<Option<PlaceLabel>>;

    /// Insert a resolved label unless the key already has one.
    ///
    /// Returns `true` if a new entry was created, `false` if the key was
    /// already present (silent no-op, not an overwrite).
    async fn insert_if_absent(&self, key: CoordKey, label: &PlaceLabel) -> Result<bool>;
}

#[async_trait]
impl<C: CoordinateCache + ?Sized> CoordinateCache for std::sync::Arc<C> {
    async fn lookup(&self, key: CoordKey) -> Result<Option<PlaceLabel>> {
        (**self).lookup(key).await
    }

    async fn insert_if_absent(&self, key: CoordKey, label: &PlaceLabel) -> Result<bool> {
        (**self).insert_if_absent(key, label).await
    }
}

/// A failure in one external lookup tier.
///
/// Never propagated past the resolver: a failed lookup downgrades the
/// coordinate to `Unknown` rather than aborting the batch.
#[derive(Debug, Error)]
pub enum GeocodeFailure {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("service returned HTTP {0}")]
    Status(u16),

    #[error("unparseable response: {0}")]
    Payload(String),
}

/// Port for the two-tier external lookup chain.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Primary tier: reverse-geocode against an administrative-boundary
    /// service. `Ok(None)` means the lookup succeeded but the point is not
    /// inside any country (e.g. open ocean).
    async fn country_at(
        &self,
        lat: f64,
        lon: f64,
    ) -> std::result::Result<Option<String>, GeocodeFailure>;

    /// Secondary tier: nearest named water body from the nearby-feature
    /// service. `Ok(None)` means no named feature was reported.
    async fn water_body_at(
        &self,
        lat: f64,
        lon: f64,
    ) -> std::result::Result<Option<String>, GeocodeFailure>;
}

#[async_trait]
impl<G: Geocoder + ?Sized> Geocoder for std::sync::Arc<G> {
    async fn country_at(
        &self,
        lat: f64,
        lon: f64,
    ) -> std::result::Result<Option<String>, GeocodeFailure> {
        (**self).country_at(lat, lon).await
    }

    async fn water_body_at(
        &self,
        lat: f64,
        lon: f64,
    ) -> std::result::Result<Option<String>, GeocodeFailure> {
        (**self).water_body_at(lat, lon).await
    }
}
