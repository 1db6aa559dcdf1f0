//! # cache
//!
//! **Session Cache**: TTL-checked envelope over a [`KeyValueStore`].
//!
//! Each logical key holds one JSON envelope `{ written_at, value }`.  The
//! write-timestamp lives inside the same string as the value, so a write is a
//! single `set` and no reader can pair a new value with an old timestamp.
//!
//! ```text
//! read(key) at t1 ──▶ envelope written at t0
//!                        │
//!                        ├─ t1 - t0 <  TTL  → Some(value)
//!                        └─ t1 - t0 >= TTL  → None   (same as never written)
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::storage::KeyValueStore;

/// Staleness policy: five minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

// ─── Keys ─────────────────────────────────────────────────────────────────────

/// Fixed session-scoped keys.  All of them are cleared together on refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKey {
    MarketData,
    Insight,
    Opportunities,
}

impl CacheKey {
    pub const ALL: [CacheKey; 3] = [CacheKey::MarketData, CacheKey::Insight, CacheKey::Opportunities];

    pub fn as_str(self) -> &'static str {
        match self {
            CacheKey::MarketData => "wolfee.marketData",
            CacheKey::Insight => "wolfee.aiInsight",
            CacheKey::Opportunities => "wolfee.opportunities",
        }
    }
}

// ─── Envelope ─────────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct CacheEntry<T> {
    written_at: DateTime<Utc>,
    value:      T,
}

// ─── SessionCache ─────────────────────────────────────────────────────────────

pub struct SessionCache {
    store: Arc<dyn KeyValueStore>,
    ttl:   chrono::Duration,
}

impl SessionCache {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
        }
    }

    /// Cached value if present and fresh; `None` for both absent and expired.
    pub fn read<T: DeserializeOwned>(&self, key: CacheKey) -> Option<T> {
        self.read_at(key, Utc::now())
    }

    pub fn read_at<T: DeserializeOwned>(&self, key: CacheKey, now: DateTime<Utc>) -> Option<T> {
        let raw = self.store.get(key.as_str())?;

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = key.as_str(), error = %e, "Unreadable cache entry — treating as absent");
                return None;
            }
        };

        let age = now - entry.written_at;
        if age < self.ttl {
            debug!(key = key.as_str(), age_secs = age.num_seconds(), "Cache hit");
            Some(entry.value)
        } else {
            debug!(key = key.as_str(), age_secs = age.num_seconds(), "Cache entry stale");
            None
        }
    }

    /// Store `value` stamped with the current time, replacing any prior entry.
    pub fn write<T: Serialize>(&self, key: CacheKey, value: &T) -> Result<(), StorageError> {
        self.write_at(key, value, Utc::now())
    }

    pub fn write_at<T: Serialize>(
        &self,
        key: CacheKey,
        value: &T,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let raw = serde_json::to_string(&CacheEntry { written_at: now, value })?;
        self.store.set(key.as_str(), raw)
    }

    /// Drop the entry regardless of TTL.
    pub fn invalidate(&self, key: CacheKey) -> Result<(), StorageError> {
        self.store.remove(key.as_str())
    }

    /// Drop every session-scoped key (explicit refresh).
    pub fn clear(&self) -> Result<(), StorageError> {
        for key in CacheKey::ALL {
            self.invalidate(key)?;
        }
        Ok(())
    }

    /// Raw stored text, for byte-level comparisons.
    #[cfg(test)]
    pub fn raw(&self, key: CacheKey) -> Option<String> {
        self.store.get(key.as_str())
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SessionStore;

    fn make_cache() -> SessionCache {
        SessionCache::new(Arc::new(SessionStore::new()), DEFAULT_TTL)
    }

    #[test]
    fn test_absent_key_reads_none() {
        let cache = make_cache();
        assert_eq!(cache.read::<String>(CacheKey::Insight), None);
    }

    #[test]
    fn test_ttl_boundary() {
        let cache = make_cache();
        let t0 = Utc::now();
        cache.write_at(CacheKey::Insight, &"bullish".to_string(), t0).unwrap();

        let ttl = chrono::Duration::minutes(5);
        let just_before = t0 + ttl - chrono::Duration::milliseconds(1);

        assert_eq!(cache.read_at::<String>(CacheKey::Insight, t0).as_deref(), Some("bullish"));
        assert_eq!(cache.read_at::<String>(CacheKey::Insight, just_before).as_deref(), Some("bullish"));
        assert_eq!(cache.read_at::<String>(CacheKey::Insight, t0 + ttl), None);
        assert_eq!(cache.read_at::<String>(CacheKey::Insight, t0 + ttl * 2), None);
    }

    #[test]
    fn test_write_replaces_and_restamps() {
        let cache = make_cache();
        let t0 = Utc::now();
        cache.write_at(CacheKey::Insight, &"old".to_string(), t0).unwrap();

        let t1 = t0 + chrono::Duration::minutes(4);
        cache.write_at(CacheKey::Insight, &"new".to_string(), t1).unwrap();

        // Fresh relative to t1 even though t0 + TTL has passed.
        let read = cache.read_at::<String>(CacheKey::Insight, t0 + chrono::Duration::minutes(6));
        assert_eq!(read.as_deref(), Some("new"));
    }

    #[test]
    fn test_invalidate_ignores_ttl() {
        let cache = make_cache();
        cache.write(CacheKey::MarketData, &vec![1, 2, 3]).unwrap();
        cache.invalidate(CacheKey::MarketData).unwrap();
        assert_eq!(cache.read::<Vec<i32>>(CacheKey::MarketData), None);
    }

    #[test]
    fn test_clear_drops_all_session_keys() {
        let cache = make_cache();
        for key in CacheKey::ALL {
            cache.write(key, &"x".to_string()).unwrap();
        }
        cache.clear().unwrap();
        for key in CacheKey::ALL {
            assert_eq!(cache.raw(key), None);
        }
    }

    #[test]
    fn test_wrong_shape_reads_none() {
        let cache = make_cache();
        cache.write(CacheKey::Opportunities, &"not a list".to_string()).unwrap();
        assert_eq!(cache.read::<Vec<String>>(CacheKey::Opportunities), None);
    }
}
