//! Bounded LRU cache of decoded frames, keyed by quantized time.
//!
//! The cache owns its entries: whenever one leaves (eviction, sweep,
//! replacement, clear, or cache teardown) its frame is released exactly
//! once. Callers get cloned handles from `get`, so a caller releasing its
//! handle never touches the cache's copy.

use montage_core::{FrameHandle, Ticks};
use std::collections::HashMap;
use tracing::trace;

struct Entry {
    frame: FrameHandle,
    last_used: u64,
}

/// Fixed-capacity least-recently-used frame store.
pub struct FrameCache {
    capacity: usize,
    entries: HashMap<Ticks, Entry>,
    clock: u64,
}

impl FrameCache {
    /// Create a cache holding at most `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            clock: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Look up a frame, promoting it to most-recently-used. Returns a
    /// cloned handle backed by the same pixels.
    pub fn get(&mut self, key: Ticks) -> Option<FrameHandle> {
        self.clock += 1;
        let clock = self.clock;
        let entry = self.entries.get_mut(&key)?;
        entry.last_used = clock;
        entry.frame.clone_handle()
    }

    /// Whether a key is present, without promoting it.
    pub fn contains(&self, key: Ticks) -> bool {
        self.entries.contains_key(&key)
    }

    /// Insert a frame, releasing any frame previously stored at the key,
    /// then evicting least-recently-used entries until within capacity.
    pub fn put(&mut self, key: Ticks, frame: FrameHandle) {
        self.clock += 1;
        if let Some(mut old) = self.entries.insert(
            key,
            Entry {
                frame,
                last_used: self.clock,
            },
        ) {
            old.frame.release();
        }
        while self.entries.len() > self.capacity {
            self.evict_lru();
        }
    }

    /// The cached key nearest to `key` within `tolerance` ticks, if any.
    /// Does not promote; scrubbing probes should not pin stale frames.
    pub fn nearest_within(&self, key: Ticks, tolerance: Ticks) -> Option<FrameHandle> {
        self.entries
            .iter()
            .map(|(&k, entry)| ((k - key).abs(), entry))
            .filter(|&(dist, _)| dist <= tolerance)
            .min_by_key(|&(dist, _)| dist)
            .and_then(|(_, entry)| entry.frame.clone_handle())
    }

    /// Release and remove every entry whose key matches the predicate.
    /// Returns how many entries were removed.
    pub fn sweep(&mut self, mut predicate: impl FnMut(Ticks) -> bool) -> usize {
        let doomed: Vec<Ticks> = self
            .entries
            .keys()
            .copied()
            .filter(|&k| predicate(k))
            .collect();
        for key in &doomed {
            if let Some(mut entry) = self.entries.remove(key) {
                entry.frame.release();
            }
        }
        if !doomed.is_empty() {
            trace!(removed = doomed.len(), "cache sweep");
        }
        doomed.len()
    }

    /// Release and remove everything.
    pub fn clear(&mut self) {
        for (_, entry) in self.entries.iter_mut() {
            entry.frame.release();
        }
        self.entries.clear();
    }

    fn evict_lru(&mut self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(&k, _)| k);
        if let Some(key) = victim {
            if let Some(mut entry) = self.entries.remove(&key) {
                entry.frame.release();
                trace!(key, "evicted least-recently-used frame");
            }
        }
    }
}

impl Drop for FrameCache {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use montage_core::{time::to_ticks, FrameBuffer};

    fn frame(pts: f64) -> FrameHandle {
        FrameHandle::new(pts, FrameBuffer::black(2, 2))
    }

    #[test]
    fn test_get_returns_clone() {
        let mut cache = FrameCache::new(4);
        cache.put(to_ticks(1.0), frame(1.0));
        let mut out = cache.get(to_ticks(1.0)).unwrap();
        // Cache entry plus our clone
        assert_eq!(out.ref_count(), 2);
        out.release();
        // The cache's copy is unaffected by the caller releasing theirs.
        assert!(cache.get(to_ticks(1.0)).is_some());
    }

    #[test]
    fn test_put_beyond_capacity_evicts_lru() {
        let mut cache = FrameCache::new(3);
        for i in 0..3 {
            cache.put(i, frame(i as f64));
        }
        // Touch 0 and 2 so 1 is the least recently used.
        let _ = cache.get(0);
        let _ = cache.get(2);
        cache.put(3, frame(3.0));
        assert_eq!(cache.len(), 3);
        assert!(!cache.contains(1));
        assert!(cache.contains(0) && cache.contains(2) && cache.contains(3));
    }

    #[test]
    fn test_eviction_releases_exactly_once() {
        let mut cache = FrameCache::new(1);
        let first = frame(0.0);
        let external = first.clone_handle().unwrap();
        cache.put(0, first);
        // ref_count: cache + external = 2
        assert_eq!(external.ref_count(), 2);
        cache.put(1, frame(1.0)); // evicts key 0, releasing the cache's ref
        assert_eq!(external.ref_count(), 1);
    }

    #[test]
    fn test_replacement_releases_old_entry() {
        let mut cache = FrameCache::new(4);
        let old = frame(0.0);
        let watcher = old.clone_handle().unwrap();
        cache.put(0, old);
        cache.put(0, frame(0.5));
        assert_eq!(watcher.ref_count(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_sweep_removes_matching() {
        let mut cache = FrameCache::new(16);
        for i in 0..10 {
            cache.put(i * 100, frame(i as f64 * 0.1));
        }
        // Keep only [300, 700]
        let removed = cache.sweep(|k| !(300..=700).contains(&k));
        assert_eq!(removed, 5);
        assert_eq!(cache.len(), 5);
        assert!(cache.contains(300));
        assert!(!cache.contains(0));
    }

    #[test]
    fn test_nearest_within_tolerance() {
        let mut cache = FrameCache::new(8);
        cache.put(1000, frame(1.0));
        cache.put(1500, frame(1.5));
        let hit = cache.nearest_within(1080, 100).unwrap();
        assert!((hit.pts_sec - 1.0).abs() < 1e-9);
        assert!(cache.nearest_within(1250, 100).is_none());
    }

    #[test]
    fn test_clear_releases_all() {
        let mut cache = FrameCache::new(8);
        let a = frame(0.0);
        let wa = a.clone_handle().unwrap();
        cache.put(0, a);
        cache.clear();
        assert_eq!(wa.ref_count(), 1);
        assert!(cache.is_empty());
    }
}
