//! Bounded in-memory cache for loaded source tiles.

use crate::buffer::PixelBuffer;
use crate::engine::TileLoader;
use crate::error::LoadError;
use crate::index::TileDescriptor;
use coverage_common::GeoReference;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Cache key: hash of the source handle.
pub type TileKey = u64;

/// Statistics about the tile cache.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub memory_bytes: u64,
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 - 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// LRU cache of loaded tiles with memory-bounded eviction.
///
/// Not internally synchronized: the cache belongs to one worker at a
/// time, and sharing it across workers goes through the lock in
/// [`CachedLoader`].
pub struct TileCache {
    cache: LruCache<TileKey, Arc<(PixelBuffer, GeoReference)>>,
    memory_limit: usize,
    current_memory: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl TileCache {
    /// Create a new tile cache with the given memory limit in bytes.
    pub fn new(memory_limit: usize) -> Self {
        // Estimate max entries assuming ~1MB per tile (512x512x4 bytes)
        let tile_size_estimate = 512 * 512 * 4;
        let max_entries = (memory_limit / tile_size_estimate).max(16);

        Self {
            cache: LruCache::new(NonZeroUsize::new(max_entries).unwrap()),
            memory_limit,
            current_memory: 0,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Try to get a tile from the cache.
    pub fn get(&mut self, key: &TileKey) -> Option<Arc<(PixelBuffer, GeoReference)>> {
        if let Some(entry) = self.cache.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            Some(Arc::clone(entry))
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    /// Insert a tile, evicting least recently used entries until it
    /// fits the memory limit.
    pub fn insert(&mut self, key: TileKey, entry: Arc<(PixelBuffer, GeoReference)>) {
        let entry_size = entry.0.byte_len();

        while self.current_memory + entry_size > self.memory_limit && !self.cache.is_empty() {
            if let Some((_, evicted)) = self.cache.pop_lru() {
                self.current_memory = self.current_memory.saturating_sub(evicted.0.byte_len());
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }

        if entry_size <= self.memory_limit {
            self.cache.put(key, entry);
            self.current_memory += entry_size;
        }
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.cache.len(),
            memory_bytes: self.current_memory as u64,
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Clear all entries from the cache.
    pub fn clear(&mut self) {
        self.cache.clear();
        self.current_memory = 0;
    }

    /// Evict entries until memory usage is at or below the target.
    ///
    /// Returns the number of entries evicted.
    pub fn evict_to_target(&mut self, target_bytes: usize) -> usize {
        let mut evicted = 0;
        while self.current_memory > target_bytes && !self.cache.is_empty() {
            if let Some((_, entry)) = self.cache.pop_lru() {
                self.current_memory = self.current_memory.saturating_sub(entry.0.byte_len());
                self.evictions.fetch_add(1, Ordering::Relaxed);
                evicted += 1;
            }
        }
        evicted
    }

    /// Current memory usage in bytes.
    pub fn memory_usage(&self) -> usize {
        self.current_memory
    }

    /// Number of cached tiles.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// Hash a source handle into a cache key.
pub fn hash_source(source: &str) -> TileKey {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    source.hash(&mut hasher);
    hasher.finish()
}

/// A loader wrapper that serves repeated tile loads from an injected
/// cache.
///
/// The cache is owned here and guarded by a mutex, so pyramid workers
/// can share one instance without sharing mutable state.
pub struct CachedLoader<L> {
    inner: L,
    cache: Mutex<TileCache>,
}

impl<L: TileLoader> CachedLoader<L> {
    /// Wrap a loader with a cache of the given byte size.
    pub fn new(inner: L, memory_limit: usize) -> Self {
        Self {
            inner,
            cache: Mutex::new(TileCache::new(memory_limit)),
        }
    }

    /// Get statistics from the underlying cache.
    pub fn stats(&self) -> CacheStats {
        self.cache.lock().expect("tile cache poisoned").stats()
    }
}

impl<L: TileLoader> TileLoader for CachedLoader<L> {
    fn load(
        &self,
        tile: &TileDescriptor,
    ) -> std::result::Result<(PixelBuffer, GeoReference), LoadError> {
        let key = hash_source(&tile.source);

        if let Some(entry) = self.cache.lock().expect("tile cache poisoned").get(&key) {
            return Ok((entry.0.clone(), entry.1));
        }

        let (buffer, geo) = self.inner.load(tile)?;
        let entry = Arc::new((buffer, geo));
        self.cache
            .lock()
            .expect("tile cache poisoned")
            .insert(key, Arc::clone(&entry));
        Ok((entry.0.clone(), entry.1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{SampleDepth, Samples};
    use coverage_common::{Envelope, PixelOrigin};

    fn tile_entry(fill: u8) -> Arc<(PixelBuffer, GeoReference)> {
        let buffer = PixelBuffer::from_samples(4, 4, 1, Samples::U8(vec![fill; 16])).unwrap();
        let geo = GeoReference::new(
            Envelope::new(0.0, 0.0, 4.0, 4.0),
            4,
            4,
            PixelOrigin::Outer,
        )
        .unwrap();
        Arc::new((buffer, geo))
    }

    #[test]
    fn test_cache_insert_and_get() {
        let mut cache = TileCache::new(1024 * 1024);

        let key = hash_source("tiles/a.tif");
        assert!(cache.get(&key).is_none());

        cache.insert(key, tile_entry(7));
        let entry = cache.get(&key).unwrap();
        assert_eq!(entry.0.value_at(0, 0, 0), 7.0);
    }

    #[test]
    fn test_cache_eviction_bounded_by_memory() {
        // Each 4x4 u8 tile is 16 bytes; cap at 64 bytes = 4 tiles.
        let mut cache = TileCache::new(64);

        for i in 0..10u8 {
            cache.insert(hash_source(&format!("t{}.tif", i)), tile_entry(i));
        }

        assert!(cache.memory_usage() <= 64);
        let stats = cache.stats();
        assert!(stats.evictions >= 6);
        // Most recently inserted survives
        assert!(cache.get(&hash_source("t9.tif")).is_some());
    }

    #[test]
    fn test_cache_stats_and_hit_rate() {
        let mut cache = TileCache::new(1024);
        let key = hash_source("a.tif");

        cache.insert(key, tile_entry(1));
        cache.get(&key); // hit
        cache.get(&hash_source("b.tif")); // miss

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_evict_to_target() {
        let mut cache = TileCache::new(1024);
        for i in 0..8u8 {
            cache.insert(hash_source(&format!("t{}.tif", i)), tile_entry(i));
        }

        let before = cache.memory_usage();
        let evicted = cache.evict_to_target(before / 2);
        assert!(evicted > 0);
        assert!(cache.memory_usage() <= before / 2);
    }

    #[test]
    fn test_clear() {
        let mut cache = TileCache::new(1024);
        cache.insert(hash_source("a.tif"), tile_entry(1));
        assert!(!cache.is_empty());

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.memory_usage(), 0);
    }

    #[test]
    fn test_cached_loader_loads_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = AtomicUsize::new(0);
        let loader = |tile: &TileDescriptor| {
            calls.fetch_add(1, Ordering::SeqCst);
            let buffer = PixelBuffer::new(4, 4, 1, SampleDepth::U8)
                .map_err(|e| LoadError::Decode(e.to_string()))?;
            let geo = GeoReference::new(tile.envelope, 4, 4, PixelOrigin::Outer)
                .map_err(|e| LoadError::Decode(e.to_string()))?;
            Ok((buffer, geo))
        };

        let cached = CachedLoader::new(loader, 1024 * 1024);
        let tile = TileDescriptor::new("a.tif", Envelope::new(0.0, 0.0, 4.0, 4.0));

        cached.load(&tile).unwrap();
        cached.load(&tile).unwrap();
        cached.load(&tile).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cached.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
    }
}
