use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyNormalization {
    /// Trimmed and lower-cased. Used for free-text queries.
    CaseFolded,
    /// Trimmed only. Media identifiers are case sensitive.
    Trimmed,
}

#[derive(Clone, Debug)]
pub struct CachePolicy {
    /// `None` keeps positive entries for the lifetime of the cache.
    pub positive_ttl: Option<Duration>,
    pub negative_ttl: Duration,
    pub normalization: KeyNormalization,
}

impl CachePolicy {
    pub fn track_ids(negative_ttl: Duration) -> Self {
        Self {
            positive_ttl: None,
            negative_ttl,
            normalization: KeyNormalization::CaseFolded,
        }
    }

    pub fn stream_urls(positive_ttl: Duration, negative_ttl: Duration) -> Self {
        Self {
            positive_ttl: Some(positive_ttl),
            negative_ttl,
            normalization: KeyNormalization::Trimmed,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum CacheLookup<V> {
    Hit(V),
    /// A recent lookup failed and its negative entry has not expired yet.
    Failed,
    Miss,
}

#[derive(Debug)]
enum CacheEntry<V> {
    Resolved {
        value: V,
        expires_at: Option<Instant>,
    },
    Failed {
        expires_at: Instant,
    },
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        match self {
            CacheEntry::Resolved { expires_at, .. } => expires_at.map_or(false, |at| now >= at),
            CacheEntry::Failed { expires_at } => now >= *expires_at,
        }
    }
}

/// Process-scoped lookup cache with permanent (or long-lived) positive
/// entries and short-lived negative entries.
pub struct ResolutionCache<V> {
    policy: CachePolicy,
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> ResolutionCache<V> {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn normalize_key(&self, key: &str) -> String {
        match self.policy.normalization {
            KeyNormalization::CaseFolded => key.trim().to_lowercase(),
            KeyNormalization::Trimmed => key.trim().to_string(),
        }
    }

    pub fn lookup(&self, key: &str) -> CacheLookup<V> {
        let key = self.normalize_key(key);
        let now = Instant::now();
        let mut entries = self.entries();

        let expired = match entries.get(&key) {
            None => return CacheLookup::Miss,
            Some(entry) => entry.is_expired(now),
        };

        if expired {
            debug!(%key, "Evicting expired cache entry");
            entries.remove(&key);
            return CacheLookup::Miss;
        }

        match entries.get(&key) {
            Some(CacheEntry::Resolved { value, .. }) => CacheLookup::Hit(value.clone()),
            Some(CacheEntry::Failed { .. }) => CacheLookup::Failed,
            None => CacheLookup::Miss,
        }
    }

    pub fn insert(&self, key: &str, value: V) {
        let expires_at = self.policy.positive_ttl.map(|ttl| Instant::now() + ttl);

        self.entries()
            .insert(self.normalize_key(key), CacheEntry::Resolved { value, expires_at });
    }

    pub fn insert_failure(&self, key: &str) {
        let expires_at = Instant::now() + self.policy.negative_ttl;

        self.entries()
            .insert(self.normalize_key(key), CacheEntry::Failed { expires_at });
    }

    /// Returns `true` when an entry (positive or negative) was removed.
    pub fn evict(&self, key: &str) -> bool {
        self.entries().remove(&self.normalize_key(key)).is_some()
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
