/*
 * MIT License
 *
 * Copyright (c) 2022 Joseph Sacchini
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use parking_lot::Mutex;
use thiserror::Error;
use super::{clock::*, data::*, store::*};

#[derive(Error, Debug)]
pub enum CacheErr {
    #[error("stored shard {key} is corrupt")]
    Corrupt {
        key: ShardKey,
        #[source]
        source: serde_json::Error,
    },
    #[error("stored shard {key} is stale (loaded at {loaded_at_ms})")]
    Stale { key: ShardKey, loaded_at_ms: i64 },
}

///
/// The two-tier shard cache.
///
/// The memory tier is a plain map guarded by a (non async) mutex, so a memory hit never suspends.
/// The durable tier is shared with other sessions and survives restarts.
///
/// Reads go memory -> durable. A durable hit is promoted into memory. Any entry older than the TTL
/// is treated exactly like a missing entry, in either tier, and so is a durable record that won't
/// decode. Failures in the durable tier are logged and otherwise ignored: the worst outcome of
/// a broken durable tier is a refetch.
///
/// Cloning a ShardCache produces another handle to the same cache.
///
#[derive(Clone)]
pub struct ShardCache {
    inner: Arc<Inner>,
}

struct Inner {
    memory: Mutex<HashMap<ShardKey, Arc<ShardMap>>>,
    durable: Arc<dyn DurableStore>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ShardCache {
    pub fn new(durable: Arc<dyn DurableStore>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                memory: Mutex::new(HashMap::new()),
                durable,
                ttl,
                clock,
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    pub fn durable(&self) -> &Arc<dyn DurableStore> {
        &self.inner.durable
    }

    /// Whether a load stamped at loaded_at_ms may still be served
    pub fn is_fresh(&self, loaded_at_ms: i64) -> bool {
        let age_ms = self.inner.clock.now_ms().saturating_sub(loaded_at_ms);
        (age_ms as i128) < self.inner.ttl.as_millis() as i128
    }

    ///
    /// Looks only at the memory tier. Stale entries are evicted on the way.
    ///
    pub fn get_memory(&self, key: &ShardKey) -> Option<Arc<ShardMap>> {
        let mut memory = self.inner.memory.lock();
        let shard = memory.get(key)?.clone();
        if self.is_fresh(shard.loaded_at_ms()) {
            return Some(shard);
        }

        log::debug!("evicting stale shard {} from memory (loaded at {})", key, shard.loaded_at_ms());
        memory.remove(key);
        None
    }

    /// True only when the shard is present (and fresh) in the memory tier
    pub fn is_warm(&self, key: &ShardKey) -> bool {
        self.get_memory(key).is_some()
    }

    ///
    /// Memory first, then the durable tier. Returns None on a miss, including when the durable
    /// record is stale, corrupt, or can't be read at all.
    ///
    pub async fn get(&self, key: &ShardKey) -> Option<Arc<ShardMap>> {
        if let Some(shard) = self.get_memory(key) {
            return Some(shard);
        }

        match self.read_durable(key).await {
            Ok(Some(shard)) => {
                let shard = Arc::new(shard);
                log::debug!("promoting shard {} from durable store", key);
                self.inner.memory.lock().insert(*key, shard.clone());
                Some(shard)
            }
            Ok(None) => None,
            Err(err @ CacheErr::Stale { .. }) => {
                log::debug!("{}", err);
                None
            }
            Err(err) => {
                log::warn!("{}, it will be refetched", err);
                None
            }
        }
    }

    async fn read_durable(&self, key: &ShardKey) -> Result<Option<ShardMap>, CacheErr> {
        let bytes = match self.inner.durable.read(Table::Shards, &key.storage_key()).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Ok(None),
            Err(err) => {
                log::warn!("durable read of shard {} failed: {}", key, err);
                return Ok(None);
            }
        };

        let record: ShardRecord = serde_json::from_slice(&bytes)
            .map_err(|source| CacheErr::Corrupt { key: *key, source })?;

        if !self.is_fresh(record.loaded_at_ms) {
            return Err(CacheErr::Stale {
                key: *key,
                loaded_at_ms: record.loaded_at_ms,
            });
        }

        Ok(Some(record.into()))
    }

    ///
    /// Stores a freshly loaded shard in both tiers, stamped with the current time. Replaces
    /// whatever was there before. Returns the shared handle now held by the memory tier.
    ///
    pub async fn put(&self, key: ShardKey, shard: ShardMap) -> Arc<ShardMap> {
        let shard = Arc::new(shard.restamped(self.inner.clock.now_ms()));
        self.inner.memory.lock().insert(key, shard.clone());

        let write = match serde_json::to_vec(&ShardRecord::from(shard.as_ref())) {
            Ok(bytes) => self.inner.durable.write(Table::Shards, &key.storage_key(), bytes).await,
            Err(err) => Err(err.into()),
        };
        if let Err(err) = write {
            log::warn!("unable to persist shard {}: {}", key, err);
        }

        shard
    }

    /// Drops one shard from both tiers
    pub async fn invalidate(&self, key: &ShardKey) {
        self.inner.memory.lock().remove(key);
        if let Err(err) = self.inner.durable.remove(Table::Shards, &key.storage_key()).await {
            log::warn!("unable to remove shard {} from durable store: {}", key, err);
        }
    }

    /// Empties the memory tier only, as happens on a session restart
    pub fn clear_memory(&self) {
        self.inner.memory.lock().clear();
    }

    /// Empties both tiers
    pub async fn clear(&self) {
        self.clear_memory();
        if let Err(err) = self.inner.durable.clear(Table::Shards).await {
            log::warn!("unable to clear durable shard store: {}", err);
        }
    }

    /// Number of shards in the memory tier (fresh or not)
    pub fn memory_len(&self) -> usize {
        self.inner.memory.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantle::rank::Rank;

    const HOUR_MS: i64 = 60 * 60 * 1000;

    fn shard(words: &[&str]) -> ShardMap {
        ShardMap::new(
            words.iter().enumerate().map(|(idx, w)| LookupRow {
                word: w.to_string(),
                similarity: 0.5,
                rank: Rank::Ranked(idx as u32 + 1),
            }),
            0,
        )
    }

    fn cache_with(store: Arc<MemoryStore>, clock: Arc<ManualClock>) -> ShardCache {
        ShardCache::new(store, Duration::from_millis(24 * HOUR_MS as u64), clock)
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let clock = Arc::new(ManualClock::new(10 * HOUR_MS));
        let cache = cache_with(Arc::new(MemoryStore::default()), clock.clone());
        let key = ShardKey::new(1, 'a');

        assert!(cache.get(&key).await.is_none());
        assert!(!cache.is_warm(&key));

        cache.put(key, shard(&["ant", "arm"])).await;
        let got = cache.get(&key).await.expect("should hit");
        assert_eq!(*got, shard(&["ant", "arm"]).restamped(10 * HOUR_MS), "put should stamp the current time");
        assert_eq!(
            got.get("arm"),
            Some(&LookupRow { word: "arm".to_string(), similarity: 0.5, rank: Rank::Ranked(2) })
        );
        assert!(cache.is_warm(&key));
    }

    #[tokio::test]
    async fn test_durable_hit_is_promoted() {
        let store = Arc::new(MemoryStore::default());
        let clock = Arc::new(ManualClock::new(HOUR_MS));
        let key = ShardKey::new(1, 'b');

        cache_with(store.clone(), clock.clone()).put(key, shard(&["bee"])).await;

        // a "new session" sharing the durable store
        let cache = cache_with(store, clock);
        assert!(!cache.is_warm(&key));
        let got = cache.get(&key).await.expect("durable tier should hit");
        assert_eq!(*got, shard(&["bee"]).restamped(HOUR_MS));
        assert_eq!(
            got.get("bee"),
            Some(&LookupRow { word: "bee".to_string(), similarity: 0.5, rank: Rank::Ranked(1) })
        );
        assert!(cache.is_warm(&key));
    }

    #[tokio::test]
    async fn test_stale_entries_are_misses() {
        let store = Arc::new(MemoryStore::default());
        let clock = Arc::new(ManualClock::new(0));
        let cache = cache_with(store.clone(), clock.clone());
        let key = ShardKey::new(1, 'c');
        cache.put(key, shard(&["cat"])).await;

        clock.advance_ms(24 * HOUR_MS - 1);
        assert!(cache.is_warm(&key));

        clock.advance_ms(1);
        assert!(!cache.is_warm(&key), "memory entry at the TTL boundary is stale");
        assert_eq!(cache.memory_len(), 0, "stale memory entry should be evicted");
        assert!(cache.get(&key).await.is_none(), "durable entry at the TTL boundary is stale");
    }

    #[tokio::test]
    async fn test_corrupt_durable_record_is_a_miss() {
        let store = Arc::new(MemoryStore::default());
        let key = ShardKey::new(1, 'd');
        store.write(Table::Shards, &key.storage_key(), b"{not json".to_vec()).await.unwrap();

        let cache = cache_with(store, Arc::new(ManualClock::new(0)));
        assert!(cache.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_wholesale() {
        let cache = cache_with(Arc::new(MemoryStore::default()), Arc::new(ManualClock::new(0)));
        let key = ShardKey::new(1, 'e');
        let first = cache.put(key, shard(&["eel", "elk"])).await;
        cache.put(key, shard(&["emu"])).await;

        let got = cache.get(&key).await.unwrap();
        assert!(got.get("eel").is_none());
        assert!(got.get("emu").is_some());
        // the handle given out earlier still sees the map it was given
        assert!(first.get("eel").is_some());
    }

    #[tokio::test]
    async fn test_clear_memory_keeps_durable() {
        let store = Arc::new(MemoryStore::default());
        let cache = cache_with(store.clone(), Arc::new(ManualClock::new(0)));
        let key = ShardKey::new(1, 'f');
        cache.put(key, shard(&["fox"])).await;

        cache.clear_memory();
        assert!(!cache.is_warm(&key));
        assert!(cache.get(&key).await.is_some());

        cache.clear().await;
        assert!(store.is_empty(Table::Shards));
        assert!(cache.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache = cache_with(Arc::new(MemoryStore::default()), Arc::new(ManualClock::new(0)));
        let key = ShardKey::new(1, 'g');
        cache.put(key, shard(&["gnu"])).await;
        cache.invalidate(&key).await;
        assert!(cache.get(&key).await.is_none());
    }
}
