//! In-memory response cache.
//!
//! Sits in front of the retrieval flows to absorb repeated identical
//! requests within a short window. Entries are opaque JSON keyed by
//! request parameters with a TTL fixed at insert time. This layer is
//! purely request deduplication and is independent of the persistent
//! store's freshness windows.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

/// TTL for single-record lookups (latest performance).
pub const SINGLE_RECORD_TTL: Duration = Duration::minutes(30);

/// TTL for list responses (states, districts, history).
pub const LIST_TTL: Duration = Duration::hours(1);

struct Entry {
    value: serde_json::Value,
    inserted_at: DateTime<Utc>,
    ttl: Duration,
}

impl Entry {
    fn expired_at(&self, now: DateTime<Utc>) -> bool {
        now - self.inserted_at >= self.ttl
    }
}

/// Keyed TTL cache of serialized responses.
#[derive(Default)]
pub struct ResponseCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached response for `key` if it has not expired.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entries = self.entries.lock().ok()?;
        let entry = entries.get(key)?;
        if entry.expired_at(Utc::now()) {
            return None;
        }
        serde_json::from_value(entry.value.clone()).ok()
    }

    pub fn put<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        self.put_at(key, value, ttl, Utc::now());
    }

    fn put_at<T: Serialize>(&self, key: &str, value: &T, ttl: Duration, now: DateTime<Utc>) {
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                // Response caching is best-effort
                warn!(key, error = %e, "failed to serialize response for caching");
                return;
            }
        };
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        // Sweep expired entries so the map does not grow unbounded
        entries.retain(|_, entry| !entry.expired_at(now));
        entries.insert(
            key.to_string(),
            Entry {
                value,
                inserted_at: now,
                ttl,
            },
        );
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_within_ttl() {
        let cache = ResponseCache::new();
        cache.put("states:all", &vec!["Bihar", "Kerala"], LIST_TTL);

        let hit: Option<Vec<String>> = cache.get("states:all");
        assert_eq!(hit.unwrap(), vec!["Bihar", "Kerala"]);
    }

    #[test]
    fn test_miss_after_ttl() {
        let cache = ResponseCache::new();
        let inserted = Utc::now() - SINGLE_RECORD_TTL - Duration::seconds(1);
        cache.put_at("perf:agra", &77u32, SINGLE_RECORD_TTL, inserted);

        assert_eq!(cache.get::<u32>("perf:agra"), None);
    }

    #[test]
    fn test_hit_just_inside_ttl() {
        let cache = ResponseCache::new();
        let inserted = Utc::now() - SINGLE_RECORD_TTL + Duration::seconds(5);
        cache.put_at("perf:agra", &77u32, SINGLE_RECORD_TTL, inserted);

        assert_eq!(cache.get::<u32>("perf:agra"), Some(77));
    }

    #[test]
    fn test_unknown_key_misses() {
        let cache = ResponseCache::new();
        assert_eq!(cache.get::<u32>("nope"), None);
    }

    #[test]
    fn test_insert_sweeps_expired_entries() {
        let cache = ResponseCache::new();
        let old = Utc::now() - Duration::hours(2);
        cache.put_at("a", &1u32, SINGLE_RECORD_TTL, old);
        cache.put_at("b", &2u32, SINGLE_RECORD_TTL, old);
        assert_eq!(cache.len(), 2);

        cache.put("c", &3u32, SINGLE_RECORD_TTL);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get::<u32>("c"), Some(3));
    }

    #[test]
    fn test_overwrite_refreshes_entry() {
        let cache = ResponseCache::new();
        let old = Utc::now() - LIST_TTL - Duration::minutes(1);
        cache.put_at("states:all", &vec!["stale"], LIST_TTL, old);
        assert_eq!(cache.get::<Vec<String>>("states:all"), None);

        cache.put("states:all", &vec!["fresh"], LIST_TTL);
        assert_eq!(
            cache.get::<Vec<String>>("states:all").unwrap(),
            vec!["fresh"]
        );
    }
}
