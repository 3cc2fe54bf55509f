//! SQLite coordinate cache adapter.
//!
//! One `geocache` row per rounded coordinate key, append-only. Coordinates
//! are stored as their rounded REAL values; both lookup and insert bind the
//! same quantized values, so exact-match comparison is stable.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info};

use driftline_core::error::{DriftlineError, Result};
use driftline_core::models::{CoordKey, PlaceLabel};
use driftline_core::ports::CoordinateCache;

/// Aggregate cache statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub total: i64,
    pub by_type: HashMap<String, i64>,
}

/// SQLite-backed implementation of `CoordinateCache`.
pub struct SqliteCache {
    pool: SqlitePool,
}

impl SqliteCache {
    /// Open (creating if necessary) the cache database at `path` and ensure
    /// the schema exists.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        Self::connect(options).await
    }

    /// Open a private in-memory database, used by tests.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new().in_memory(true);
        Self::connect(options).await
    }

    async fn connect(options: SqliteConnectOptions) -> Result<Self> {
        // Resolution is sequential; a single connection is all the write
        // pattern needs, and it keeps the in-memory database coherent.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(cache_err)?;

        let cache = Self { pool };
        cache.init().await?;
        Ok(cache)
    }

    /// Create the `geocache` table and its lookup index if missing.
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS geocache (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                lat REAL NOT NULL,
                lon REAL NOT NULL,
                location_type TEXT NOT NULL,
                location_name TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(lat, lon)
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(cache_err)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_lat_lon ON geocache(lat, lon)")
            .execute(&self.pool)
            .await
            .map_err(cache_err)?;

        debug!("geocache schema verified");
        Ok(())
    }

    /// Import previously resolved coordinates from a JSON seed file shaped
    /// as `{"lat,lon": {"country": "Brazil"}, ...}`.
    ///
    /// Existing keys are skipped; returns the number of rows inserted.
    pub async fn seed_from_json(&self, path: &Path) -> Result<usize> {
        let raw = tokio::fs::read_to_string(path).await?;
        let seed: HashMap<String, PlaceLabel> = serde_json::from_str(&raw)
            .map_err(|e| DriftlineError::Serialization(format!("invalid seed file: {e}")))?;

        let mut inserted = 0usize;
        for (coords, label) in &seed {
            let Some(key) = parse_seed_key(coords) else {
                return Err(DriftlineError::Serialization(format!(
                    "invalid seed coordinate key: {coords:?}"
                )));
            };
            if self.insert_if_absent(key, label).await? {
                inserted += 1;
            }
        }

        info!(
            inserted,
            skipped = seed.len() - inserted,
            "seeded coordinate cache"
        );
        Ok(inserted)
    }

    /// Total entry count and per-type breakdown.
    pub async fn stats(&self) -> Result<CacheStats> {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM geocache")
            .fetch_one(&self.pool)
            .await
            .map_err(cache_err)?;

        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT location_type, COUNT(*) FROM geocache GROUP BY location_type",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(cache_err)?;

        Ok(CacheStats {
            total,
            by_type: rows.into_iter().collect(),
        })
    }
}

#[async_trait]
impl CoordinateCache for SqliteCache {
    async fn lookup(&self, key: CoordKey) -> Result<Option<PlaceLabel>> {
        let row: Option<(String, String)> = sqlx::query_as(
            "SELECT location_type, location_name FROM geocache WHERE lat = ? AND lon = ?",
        )
        .bind(key.lat())
        .bind(key.lon())
        .fetch_optional(&self.pool)
        .await
        .map_err(cache_err)?;

        Ok(row.map(|(kind, name)| PlaceLabel::from_parts(&kind, &name)))
    }

    async fn insert_if_absent(&self, key: CoordKey, label: &PlaceLabel) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO geocache (lat, lon, location_type, location_name) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(key.lat())
        .bind(key.lon())
        .bind(label.kind())
        .bind(label.name())
        .execute(&self.pool)
        .await
        .map_err(cache_err)?;

        Ok(result.rows_affected() > 0)
    }
}

/// Any storage failure is fatal: the pipeline does not run without a durable
/// cache, since the cache is what bounds the volume of external calls.
fn cache_err(e: sqlx::Error) -> DriftlineError {
    DriftlineError::CacheUnavailable {
        reason: e.to_string(),
    }
}

fn parse_seed_key(coords: &str) -> Option<CoordKey> {
    let (lat, lon) = coords.split_once(',')?;
    Some(CoordKey::from_degrees(
        lat.trim().parse().ok()?,
        lon.trim().parse().ok()?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_then_lookup_round_trips_every_category() {
        let cache = SqliteCache::in_memory().await.unwrap();
        let cases = [
            (CoordKey::from_degrees(-10.0, -50.0), PlaceLabel::Country("Brazil".into())),
            (
                CoordKey::from_degrees(-62.93, 75.72),
                PlaceLabel::WaterBody("Indian Ocean".into()),
            ),
            (CoordKey::from_degrees(0.0, 0.0), PlaceLabel::Unknown),
        ];

        for (key, label) in &cases {
            assert!(cache.insert_if_absent(*key, label).await.unwrap());
        }
        for (key, label) in &cases {
            assert_eq!(cache.lookup(*key).await.unwrap().as_ref(), Some(label));
        }
    }

    #[tokio::test]
    async fn duplicate_insert_leaves_exactly_one_row() {
        let cache = SqliteCache::in_memory().await.unwrap();
        let key = CoordKey::from_degrees(12.34, 56.78);

        let first = cache
            .insert_if_absent(key, &PlaceLabel::Country("India".into()))
            .await
            .unwrap();
        let second = cache
            .insert_if_absent(key, &PlaceLabel::Unknown)
            .await
            .unwrap();

        assert!(first);
        assert!(!second);
        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.total, 1);
        assert_eq!(
            cache.lookup(key).await.unwrap(),
            Some(PlaceLabel::Country("India".into()))
        );
    }

    #[tokio::test]
    async fn lookup_misses_for_an_unseen_key() {
        let cache = SqliteCache::in_memory().await.unwrap();
        let key = CoordKey::from_degrees(1.0, 2.0);
        assert_eq!(cache.lookup(key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn stats_break_down_by_category() {
        let cache = SqliteCache::in_memory().await.unwrap();
        cache
            .insert_if_absent(
                CoordKey::from_degrees(1.0, 1.0),
                &PlaceLabel::Country("Kenya".into()),
            )
            .await
            .unwrap();
        cache
            .insert_if_absent(
                CoordKey::from_degrees(2.0, 2.0),
                &PlaceLabel::Country("Peru".into()),
            )
            .await
            .unwrap();
        cache
            .insert_if_absent(
                CoordKey::from_degrees(3.0, 3.0),
                &PlaceLabel::WaterBody("Tasman Sea".into()),
            )
            .await
            .unwrap();

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_type.get("country"), Some(&2));
        assert_eq!(stats.by_type.get("ocean"), Some(&1));
    }

    #[tokio::test]
    async fn seed_import_skips_existing_keys() {
        let cache = SqliteCache::in_memory().await.unwrap();
        cache
            .insert_if_absent(
                CoordKey::from_degrees(-62.93, 75.72),
                &PlaceLabel::WaterBody("Indian Ocean".into()),
            )
            .await
            .unwrap();

        let seed = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            seed.path(),
            r#"{
                "-62.93,75.72": {"ocean": "Indian Ocean"},
                "10,20": {"country": "Chad"},
                "0,0": {"unknown": "unknown"}
            }"#,
        )
        .unwrap();

        let inserted = cache.seed_from_json(seed.path()).await.unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(cache.stats().await.unwrap().total, 3);
        assert_eq!(
            cache
                .lookup(CoordKey::from_degrees(10.0, 20.0))
                .await
                .unwrap(),
            Some(PlaceLabel::Country("Chad".into()))
        );
    }

    #[tokio::test]
    async fn malformed_seed_key_is_rejected() {
        let cache = SqliteCache::in_memory().await.unwrap();
        let seed = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(seed.path(), r#"{"not-a-coordinate": {"country": "X"}}"#).unwrap();

        assert!(cache.seed_from_json(seed.path()).await.is_err());
    }

    #[tokio::test]
    async fn on_disk_database_persists_across_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested/geocache.db");
        let key = CoordKey::from_degrees(48.85, 2.35);

        {
            let cache = SqliteCache::open(&db_path).await.unwrap();
            cache
                .insert_if_absent(key, &PlaceLabel::Country("France".into()))
                .await
                .unwrap();
        }

        let cache = SqliteCache::open(&db_path).await.unwrap();
        assert_eq!(
            cache.lookup(key).await.unwrap(),
            Some(PlaceLabel::Country("France".into()))
        );
    }
}
