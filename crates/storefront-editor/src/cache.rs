//! Process-wide template cache with a fixed time-to-live
//!
//! One [`TemplateCache`] is created per process and shared (behind an `Arc`)
//! by every sync service. Entries older than the TTL are never returned; they
//! are treated as absent on read and left in place until overwritten, deleted
//! or purged.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::template::{StoreId, Template, TemplateId};

/// Default lifetime of a cache entry
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Cache key: one entry per template per store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub store_id: StoreId,
    pub template_id: TemplateId,
}

impl CacheKey {
    pub fn new(store_id: impl Into<StoreId>, template_id: impl Into<TemplateId>) -> Self {
        Self {
            store_id: store_id.into(),
            template_id: template_id.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    data: Template,
    inserted_at: Instant,
}

/// TTL-bounded `(store, template) -> Template` cache
#[derive(Debug)]
pub struct TemplateCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    ttl: Duration,
}

impl TemplateCache {
    /// Create a cache with the default five minute TTL
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_CACHE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached template for `key`, unless missing or expired
    pub fn get(&self, key: &CacheKey) -> Option<Template> {
        let entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                debug!(store = %key.store_id, template = %key.template_id, "Template cache hit");
                Some(entry.data.clone())
            }
            Some(_) => {
                debug!(store = %key.store_id, template = %key.template_id, "Template cache entry expired");
                None
            }
            None => {
                debug!(store = %key.store_id, template = %key.template_id, "Template cache miss");
                None
            }
        }
    }

    /// Insert or overwrite, stamping the entry with the current time
    pub fn set(&self, key: CacheKey, template: Template) {
        self.lock().insert(
            key,
            CacheEntry {
                data: template,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Invalidate an entry
    pub fn delete(&self, key: &CacheKey) -> bool {
        self.lock().remove(key).is_some()
    }

    /// Remove every expired entry, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.inserted_at.elapsed() < self.ttl);
        before - entries.len()
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    // Entries are plain values, so a panic while holding the lock cannot leave
    // them half-written.
    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for TemplateCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> CacheKey {
        CacheKey::new("s1", "t1")
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let cache = TemplateCache::new();
        assert!(cache.get(&key()).is_none());

        cache.set(key(), Template::new("t1", "Shop"));
        assert_eq!(cache.get(&key()).map(|t| t.name), Some("Shop".to_string()));
        assert_eq!(cache.len(), 1);

        assert!(cache.delete(&key()));
        assert!(cache.get(&key()).is_none());
        assert!(!cache.delete(&key()));
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let cache = TemplateCache::new();
        cache.set(CacheKey::new("s1", "t1"), Template::new("t1", "One"));
        cache.set(CacheKey::new("s2", "t1"), Template::new("t1", "Two"));

        cache.delete(&CacheKey::new("s1", "t1"));
        assert!(cache.get(&CacheKey::new("s1", "t1")).is_none());
        assert_eq!(
            cache.get(&CacheKey::new("s2", "t1")).map(|t| t.name),
            Some("Two".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_absent() {
        let cache = TemplateCache::with_ttl(Duration::from_secs(60));
        cache.set(key(), Template::new("t1", "Shop"));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(cache.get(&key()).is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get(&key()).is_none());
        // lazily invalidated: still stored until purged
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_refreshes_timestamp() {
        let cache = TemplateCache::with_ttl(Duration::from_secs(60));
        cache.set(key(), Template::new("t1", "Old"));
        tokio::time::advance(Duration::from_secs(45)).await;
        cache.set(key(), Template::new("t1", "New"));
        tokio::time::advance(Duration::from_secs(45)).await;

        assert_eq!(cache.get(&key()).map(|t| t.name), Some("New".to_string()));
    }
}
