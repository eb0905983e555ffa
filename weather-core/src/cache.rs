//! Key/value cache with per-entry expiry.

use async_trait::async_trait;
use moka::{Expiry, future::Cache};
use std::time::{Duration, Instant};

/// Upper bound on entries held by [`MemoryCache`].
const MAX_ENTRIES: u64 = 10_000;

#[async_trait]
pub trait CacheStore<V>: Send + Sync {
    /// Returns `None` for unknown or expired keys.
    async fn get(&self, key: &str) -> Option<V>;

    async fn set(&self, key: String, value: V, ttl: Duration);
}

/// Cached value together with the TTL it was written with.
#[derive(Debug, Clone)]
struct Timed<V> {
    value: V,
    ttl: Duration,
}

/// Expires each entry `ttl` after its latest write; reads do not extend it.
struct WriteTtl;

impl<V> Expiry<String, Timed<V>> for WriteTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Timed<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Timed<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Process-local cache backed by moka.
#[derive(Clone)]
pub struct MemoryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    entries: Cache<String, Timed<V>>,
}

impl<V> MemoryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        let entries = Cache::builder()
            .max_capacity(MAX_ENTRIES)
            .expire_after(WriteTtl)
            .build();

        Self { entries }
    }
}

impl<V> Default for MemoryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V> CacheStore<V> for MemoryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Option<V> {
        self.entries.get(key).await.map(|entry| entry.value)
    }

    async fn set(&self, key: String, value: V, ttl: Duration) {
        self.entries.insert(key, Timed { value, ttl }).await;
    }
}
