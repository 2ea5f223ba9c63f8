//! Cache store adapter backed by an in-process `moka` cache.
//!
//! `moka` gives uniform or `Expiry`-trait TTL natively; variable per-call
//! TTL (as `CacheStore::set`/`expire` require) is layered on top by storing
//! `(Vec<u8>, Option<Instant>)` entries and treating moka purely as bounded
//! LRU capacity, checking the stashed deadline on every read. Hash/list/set
//! structures are modeled the same way the teacher's request-dedup map
//! layers a richer shape over a flat keyed cache.

use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::{CacheStore, HealthStatus, StoreResult};

#[derive(Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self) -> bool {
        self.expires_at.map(|at| Instant::now() < at).unwrap_or(true)
    }
}

/// A hash/list/set value stored under one cache key, guarded by its own
/// mutex since moka gives us entry-level atomicity for `Vec<u8>` but these
/// composite shapes need read-modify-write.
#[derive(Clone, Default)]
struct Composite {
    hash: std::collections::HashMap<String, Vec<u8>>,
    list: std::collections::VecDeque<Vec<u8>>,
    set: std::collections::HashSet<String>,
}

pub struct MokaCacheStore {
    scalars: Cache<String, Entry>,
    composites: Arc<Mutex<std::collections::HashMap<String, Composite>>>,
}

impl MokaCacheStore {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            scalars: Cache::builder().max_capacity(max_capacity).build(),
            composites: Arc::new(Mutex::new(std::collections::HashMap::new())),
        }
    }
}

#[async_trait]
impl CacheStore for MokaCacheStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        match self.scalars.get(key).await {
            Some(entry) if entry.is_live() => Ok(Some(entry.value)),
            Some(_) => {
                self.scalars.invalidate(key).await;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> StoreResult<()> {
        self.scalars
            .insert(
                key.to_string(),
                Entry {
                    value,
                    expires_at: ttl.map(|d| Instant::now() + d),
                },
            )
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let existed = self.scalars.get(key).await.is_some();
        self.scalars.invalidate(key).await;
        self.composites.lock().await.remove(key);
        Ok(existed)
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.scalars.get(key).await.is_some_and(|e| e.is_live()))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        if let Some(mut entry) = self.scalars.get(key).await {
            if !entry.is_live() {
                self.scalars.invalidate(key).await;
                return Ok(false);
            }
            entry.expires_at = Some(Instant::now() + ttl);
            self.scalars.insert(key.to_string(), entry).await;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>> {
        Ok(self.scalars.get(key).await.and_then(|e| e.expires_at).map(|at| at.saturating_duration_since(Instant::now())))
    }

    async fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<Vec<u8>>>> {
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            out.push(self.get(key).await?);
        }
        Ok(out)
    }

    async fn mset(&self, entries: Vec<(String, Vec<u8>)>, ttl: Option<Duration>) -> StoreResult<()> {
        for (key, value) in entries {
            self.set(&key, value, ttl).await?;
        }
        Ok(())
    }

    async fn hset(&self, key: &str, field: &str, value: Vec<u8>) -> StoreResult<()> {
        let mut composites = self.composites.lock().await;
        composites.entry(key.to_string()).or_default().hash.insert(field.to_string(), value);
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<Vec<u8>>> {
        let composites = self.composites.lock().await;
        Ok(composites.get(key).and_then(|c| c.hash.get(field).cloned()))
    }

    async fn hdel(&self, key: &str, field: &str) -> StoreResult<bool> {
        let mut composites = self.composites.lock().await;
        Ok(composites.get_mut(key).map(|c| c.hash.remove(field).is_some()).unwrap_or(false))
    }

    async fn lpush(&self, key: &str, value: Vec<u8>, max_len: Option<usize>) -> StoreResult<()> {
        let mut composites = self.composites.lock().await;
        let composite = composites.entry(key.to_string()).or_default();
        composite.list.push_front(value);
        if let Some(max_len) = max_len {
            composite.list.truncate(max_len);
        }
        Ok(())
    }

    async fn lrange(&self, key: &str, limit: usize) -> StoreResult<Vec<Vec<u8>>> {
        let composites = self.composites.lock().await;
        Ok(composites.get(key).map(|c| c.list.iter().take(limit).cloned().collect()).unwrap_or_default())
    }

    async fn sadd(&self, key: &str, member: String) -> StoreResult<()> {
        let mut composites = self.composites.lock().await;
        composites.entry(key.to_string()).or_default().set.insert(member);
        Ok(())
    }

    async fn smembers(&self, key: &str) -> StoreResult<Vec<String>> {
        let composites = self.composites.lock().await;
        Ok(composites.get(key).map(|c| c.set.iter().cloned().collect()).unwrap_or_default())
    }

    async fn delete_pattern(&self, glob: &str) -> StoreResult<u64> {
        let pattern = glob::Pattern::new(glob).unwrap_or(glob::Pattern::new("*").unwrap());
        let mut removed = 0u64;
        for key in self.scalars.iter().map(|(k, _)| (*k).clone()).collect::<Vec<_>>() {
            if pattern.matches(&key) {
                self.scalars.invalidate(&key).await;
                removed += 1;
            }
        }
        let mut composites = self.composites.lock().await;
        let matched: Vec<String> = composites.keys().filter(|k| pattern.matches(k)).cloned().collect();
        for key in matched {
            composites.remove(&key);
            removed += 1;
        }
        Ok(removed)
    }

    async fn clear_namespace(&self, prefix: &str) -> StoreResult<u64> {
        self.delete_pattern(&format!("{prefix}*")).await
    }

    async fn health_check(&self) -> HealthStatus {
        HealthStatus::healthy(Duration::from_millis(0)).with_extra("entry_count", self.scalars.entry_count() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_and_get_round_trips() {
        let cache = MokaCacheStore::new(100);
        cache.set("k", b"v".to_vec(), None).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn expired_entry_reads_as_absent() {
        let cache = MokaCacheStore::new(100);
        cache.set("k", b"v".to_vec(), Some(Duration::from_millis(1))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_pattern_matches_glob() {
        let cache = MokaCacheStore::new(100);
        cache.set("search:a", b"1".to_vec(), None).await.unwrap();
        cache.set("search:b", b"2".to_vec(), None).await.unwrap();
        cache.set("material:a", b"3".to_vec(), None).await.unwrap();
        let removed = cache.delete_pattern("search:*").await.unwrap();
        assert_eq!(removed, 2);
        assert!(cache.get("material:a").await.unwrap().is_some());
    }
}
