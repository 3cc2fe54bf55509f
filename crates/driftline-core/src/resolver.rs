//! Cache-aside place resolution.
//!
//! Resolution is deliberately sequential: the external services are rate
//! limited, and serial cache writes keep insert-if-absent race free without
//! any locking in the store.

use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::models::{CoordKey, LabelMapping, PlaceLabel};
use crate::ports::{CoordinateCache, Geocoder};

/// Outcome of one resolution, with the signal the batch driver needs to
/// decide pacing: whether this call actually consulted an external service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub label: PlaceLabel,
    pub consulted_backend: bool,
}

/// Resolves one coordinate to a place label, cache first.
pub struct PlaceResolver<C, G> {
    cache: C,
    geocoder: G,
}

impl<C: CoordinateCache, G: Geocoder> PlaceResolver<C, G> {
    pub fn new(cache: C, geocoder: G) -> Self {
        Self { cache, geocoder }
    }

    /// Resolve a raw coordinate.
    ///
    /// Cache hits return immediately with no external call. On a miss the
    /// two-tier lookup chain runs, and the result (including `Unknown`) is
    /// persisted via insert-if-absent before returning. Lookup failures
    /// downgrade to `Unknown`; only a cache failure is fatal.
    pub async fn resolve(&self, lat: f64, lon: f64) -> Result<Resolution> {
        let key = CoordKey::from_degrees(lat, lon);

        if let Some(label) = self.cache.lookup(key).await? {
            debug!(%key, kind = label.kind(), name = label.name(), "cache hit");
            return Ok(Resolution {
                label,
                consulted_backend: false,
            });
        }

        debug!(%key, "cache miss, consulting lookup chain");
        let label = self.identify(key).await;
        self.cache.insert_if_absent(key, &label).await?;
        debug!(%key, kind = label.kind(), name = label.name(), "resolved and persisted");

        Ok(Resolution {
            label,
            consulted_backend: true,
        })
    }

    /// Run the two-tier lookup chain for a key that missed the cache.
    async fn identify(&self, key: CoordKey) -> PlaceLabel {
        match self.geocoder.country_at(key.lat(), key.lon()).await {
            Ok(Some(country)) => return PlaceLabel::Country(country),
            Ok(None) => {}
            Err(e) => {
                warn!(%key, error = %e, "primary lookup failed");
                return PlaceLabel::Unknown;
            }
        }

        // Not inside any country; ask the nearby-feature service for a
        // water-body name.
        match self.geocoder.water_body_at(key.lat(), key.lon()).await {
            Ok(Some(name)) => PlaceLabel::WaterBody(name),
            Ok(None) => PlaceLabel::Unknown,
            Err(e) => {
                warn!(%key, error = %e, "secondary lookup failed");
                PlaceLabel::Unknown
            }
        }
    }

    /// Resolve a whole batch of raw coordinates.
    ///
    /// Input coordinates are deduplicated by rounded key in first-seen order
    /// and each unique key is resolved at most once. After any resolution
    /// that consulted an external service, the next resolution waits at
    /// least `min_interval`; cache hits incur no delay. The returned mapping
    /// covers every unique key, mapping unresolvable coordinates to
    /// `Unknown` rather than omitting them.
    pub async fn resolve_batch(
        &self,
        coordinates: &[(f64, f64)],
        min_interval: Duration,
    ) -> Result<LabelMapping> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        for &(lat, lon) in coordinates {
            let key = CoordKey::from_degrees(lat, lon);
            if seen.insert(key) {
                order.push(key);
            }
        }

        info!(
            submitted = coordinates.len(),
            unique = order.len(),
            "starting batch resolution"
        );

        let mut mapping = LabelMapping::with_capacity(order.len());
        let mut backend_calls = 0usize;
        let mut pace_next = false;
        for key in order {
            if pace_next {
                tokio::time::sleep(min_interval).await;
            }
            let resolution = self.resolve(key.lat(), key.lon()).await?;
            pace_next = resolution.consulted_backend;
            if resolution.consulted_backend {
                backend_calls += 1;
            }
            mapping.insert(key, resolution.label);
        }

        info!(
            resolved = mapping.len(),
            backend_calls,
            cached = mapping.len() - backend_calls,
            "batch resolution complete"
        );
        Ok(mapping)
    }
}
