//! In-memory coordinate cache for development and testing.
//!
//! Uses `RwLock::unwrap()` intentionally. Lock poisoning only occurs when
//! another thread panicked while holding the lock, which is an unrecoverable
//! state. For production workloads, use the SQLite backend.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use driftline_core::error::Result;
use driftline_core::models::{CoordKey, PlaceLabel};
use driftline_core::ports::CoordinateCache;

/// In-memory implementation of `CoordinateCache`.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<CoordKey, PlaceLabel>>>,
}

impl MemoryCache {
    /// Create a new in-memory coordinate cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }
}

#[async_trait]
impl CoordinateCache for MemoryCache {
    async fn lookup(&self, key: CoordKey) -> Result<Option<PlaceLabel>> {
        Ok(self.entries.read().unwrap().get(&key).cloned())
    }

    async fn insert_if_absent(&self, key: CoordKey, label: &PlaceLabel) -> Result<bool> {
        let mut entries = self.entries.write().unwrap();
        if entries.contains_key(&key) {
            return Ok(false);
        }
        entries.insert(key, label.clone());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lookup_misses_on_an_empty_cache() {
        let cache = MemoryCache::new();
        let key = CoordKey::from_degrees(10.0, 20.0);
        assert_eq!(cache.lookup(key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_insert_is_a_silent_no_op() {
        let cache = MemoryCache::new();
        let key = CoordKey::from_degrees(10.0, 20.0);

        let first = cache
            .insert_if_absent(key, &PlaceLabel::Country("Chad".into()))
            .await
            .unwrap();
        let second = cache
            .insert_if_absent(key, &PlaceLabel::WaterBody("Lake Chad".into()))
            .await
            .unwrap();

        assert!(first);
        assert!(!second);
        assert_eq!(cache.len(), 1);
        // The original entry wins; no overwrite.
        assert_eq!(
            cache.lookup(key).await.unwrap(),
            Some(PlaceLabel::Country("Chad".into()))
        );
    }
}
