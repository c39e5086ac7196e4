//! Path-match memoisation.
//!
//! Every navigation re-parses the whole location, and most of them re-parse a
//! path that was seen moments ago (query edits, popstate between two views,
//! permission re-parses). [`MatchCache`] keeps the matcher's skeleton output
//! in an LRU keyed by the segment list and a *permission epoch*; the epoch is
//! bumped whenever the permission set changes, which also clears the cache.
//!
//! Cached skeletons are cloned on the way out, so each parse still produces
//! fresh view records. Gated behind the `cache` feature.
//!
//! ```
//! use stacked_navigator::cache::MatchCache;
//!
//! let mut cache = MatchCache::new(16);
//! assert!(cache.get(&["membroj".to_string()], 0).is_none());
//! assert_eq!(cache.stats().misses, 1);
//! ```

use crate::stack::ViewRecord;
use crate::{debug_log, trace_log};
use lru::LruCache;
use std::num::NonZeroUsize;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MatchKey {
    segments: Vec<String>,
    epoch: u64,
}

/// Hit/miss counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: usize,
    /// Lookups that had to run the matcher.
    pub misses: usize,
    /// Number of [`MatchCache::clear`] calls.
    pub invalidations: usize,
}

impl CacheStats {
    /// Hit rate in `0.0..=1.0`; `0.0` before any lookup.
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// LRU of matcher skeletons. A capacity of zero disables caching.
#[derive(Debug)]
pub struct MatchCache {
    entries: Option<LruCache<MatchKey, Vec<ViewRecord>>>,
    stats: CacheStats,
}

impl MatchCache {
    /// Create a cache holding up to `capacity` skeletons.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(LruCache::new),
            stats: CacheStats::default(),
        }
    }

    /// Cached skeleton for `segments` under permission `epoch`.
    pub fn get(&mut self, segments: &[String], epoch: u64) -> Option<Vec<ViewRecord>> {
        let key = MatchKey {
            segments: segments.to_vec(),
            epoch,
        };
        let hit = self.entries.as_mut().and_then(|e| e.get(&key).cloned());
        if hit.is_some() {
            self.stats.hits += 1;
            trace_log!("Match cache hit for {:?}", segments);
        } else {
            self.stats.misses += 1;
            trace_log!("Match cache miss for {:?}", segments);
        }
        hit
    }

    /// Store a skeleton.
    pub fn insert(&mut self, segments: &[String], epoch: u64, skeleton: Vec<ViewRecord>) {
        if let Some(entries) = self.entries.as_mut() {
            let key = MatchKey {
                segments: segments.to_vec(),
                epoch,
            };
            entries.put(key, skeleton);
        }
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        let removed = self.len();
        if let Some(entries) = self.entries.as_mut() {
            entries.clear();
        }
        self.stats.invalidations += 1;
        debug_log!(
            "Match cache cleared: {} entries removed (hit rate {:.1}%)",
            removed,
            self.stats.hit_rate() * 100.0
        );
    }

    /// Number of cached skeletons.
    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, LruCache::len)
    }

    /// `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Counters.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}
