//! Cached network statistics
//!
//! Aggregates three upstream calls into a [`NetworkStats`] snapshot kept in a
//! single-slot cache. Refresh happens lazily on the first read past the TTL;
//! when a refresh fails the last snapshot is served marked `stale`.

mod aggregator;
mod cache;
mod types;

pub use aggregator::{StatsAggregator, StatsError, STATS_CACHE_TTL};
pub use cache::{StatsCache, StatsCacheEntry};
pub use types::NetworkStats;
