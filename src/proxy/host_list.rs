// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! NO_PROXY list splitting with a small process-wide LRU cache

use std::collections::VecDeque;
use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::Mutex;

/// Number of distinct NO_PROXY strings remembered
pub const HOST_LIST_CACHE_CAPACITY: usize = 16;

lazy_static! {
    static ref HOST_LIST_CACHE: Mutex<HostListCache> = Mutex::new(HostListCache::new());
}

/// Split a NO_PROXY string into tokens, memoized process-wide.
///
/// The returned list is shared and immutable, so callers can keep it across
/// `.await` points without holding the cache lock.
pub fn split_host_list(raw: &str) -> Arc<[String]> {
    HOST_LIST_CACHE.lock().get_or_parse(raw)
}

/// Split a NO_PROXY string on commas and whitespace runs, dropping empties.
pub fn parse_host_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that had to parse
    pub misses: u64,
    /// Entries dropped to make room
    pub evictions: u64,
    /// Entries currently held
    pub len: usize,
}

/// Recency-ordered cache of parsed host lists.
///
/// Least recently used entry sits at the front, most recently used at the back.
#[derive(Debug)]
pub struct HostListCache {
    entries: VecDeque<(String, Arc<[String]>)>,
    capacity: usize,
    stats: CacheStats,
}

impl Default for HostListCache {
    fn default() -> Self {
        Self::new()
    }
}

impl HostListCache {
    /// Create an empty cache with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(HOST_LIST_CACHE_CAPACITY)
    }

    /// Create an empty cache holding at most `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            stats: CacheStats::default(),
        }
    }

    /// Return the parsed list for `raw`, parsing on a miss
    pub fn get_or_parse(&mut self, raw: &str) -> Arc<[String]> {
        if let Some(pos) = self.entries.iter().position(|(key, _)| key == raw) {
            if let Some(entry) = self.entries.remove(pos) {
                let hosts = entry.1.clone();
                self.entries.push_back(entry);
                self.stats.hits += 1;
                return hosts;
            }
        }

        self.stats.misses += 1;
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
            self.stats.evictions += 1;
        }

        let hosts: Arc<[String]> = parse_host_list(raw).into();
        self.entries.push_back((raw.to_string(), hosts.clone()));
        hosts
    }

    /// Check whether `raw` is currently cached (does not touch recency)
    pub fn contains(&self, raw: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == raw)
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            len: self.entries.len(),
            ..self.stats
        }
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
