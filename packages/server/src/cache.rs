//! Process-wide key/value cache with per-entry expiry.

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Cache key under which the dashboard statistics are stored.
pub const DASHBOARD_STATS_KEY: &str = "dashboard_stats";

struct Entry<V> {
    value: V,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// Best-effort cache: readers may observe a value up to its TTL after the source
/// changed, and eviction is not coordinated with writers.
pub struct TtlCache<V> {
    entries: DashMap<String, Entry<V>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Returns a clone of the live value. Expired entries are dropped on read.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key)
            && entry.is_live(now)
        {
            return Some(entry.value.clone());
        }
        self.entries.remove_if(key, |_, e| !e.is_live(now));
        None
    }

    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.entries.insert(
            key.into(),
            Entry {
                value,
                expires_at: Instant::now().checked_add(ttl),
            },
        );
    }

    pub fn delete(&self, key: &str) {
        self.entries.remove(key);
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
