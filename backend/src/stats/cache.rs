use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::Instant;

use super::types::NetworkStats;

/// Cached stats together with the moment they were stored
#[derive(Debug)]
pub struct StatsCacheEntry {
    pub data: Arc<NetworkStats>,
    pub timestamp: Instant,
}

impl StatsCacheEntry {
    pub fn new(data: Arc<NetworkStats>, timestamp: Instant) -> Self {
        Self { data, timestamp }
    }

    pub fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.timestamp) < ttl
    }
}

/// Single-slot cache. Entries are immutable and replaced as a whole.
#[derive(Debug, Default)]
pub struct StatsCache {
    slot: RwLock<Option<Arc<StatsCacheEntry>>>,
}

impl StatsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current entry, whatever its age
    pub fn load(&self) -> Option<Arc<StatsCacheEntry>> {
        self.slot.read().clone()
    }

    /// Cached stats if they are younger than `ttl`
    pub fn fresh(&self, now: Instant, ttl: Duration) -> Option<Arc<NetworkStats>> {
        self.load()
            .filter(|entry| entry.is_fresh(now, ttl))
            .map(|entry| Arc::clone(&entry.data))
    }

    pub fn replace(&self, entry: StatsCacheEntry) {
        *self.slot.write() = Some(Arc::new(entry));
    }

    pub fn is_empty(&self) -> bool {
        self.slot.read().is_none()
    }
}
