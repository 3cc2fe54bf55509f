//! driftline-store: persistent coordinate cache adapters.
//!
//! Implements the core's `CoordinateCache` port twice: an in-memory map for
//! development and tests, and the SQLite table that backs production runs.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryCache;
pub use sqlite::{CacheStats, SqliteCache};
