// Interning of short, frequently repeated field values
//
// The canonical instance for each content lives as the key of a DashMap, so
// lookups by &str need no allocation and concurrent readers share one map.

use dashmap::DashMap;
use log::debug;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Tokens interned up front so they are shared from their first occurrence.
const PRELOADED: [&str; 14] = [
    "true", "false", "yes", "no", "0", "1", "2", "3", "4", "5", "6", "7", "8", "9",
];

/// Snapshot of pool counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StringPoolStats {
    pub hits: u64,
    pub misses: u64,
    /// Values that were too long, or arrived while the pool was full.
    pub bypassed: u64,
    pub entries: usize,
}

/// Concurrent content-keyed string interner.
pub struct StringPool {
    map: DashMap<Arc<str>, ()>,
    empty: Arc<str>,
    max_len: usize,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    bypassed: AtomicU64,
}

impl StringPool {
    pub const DEFAULT_MAX_LEN: usize = 100;
    pub const DEFAULT_MAX_ENTRIES: usize = 65_536;

    pub fn new() -> Self {
        Self::with_limits(Self::DEFAULT_MAX_LEN, Self::DEFAULT_MAX_ENTRIES)
    }

    /// `max_len` is measured in characters; longer values are never pooled.
    pub fn with_limits(max_len: usize, max_entries: usize) -> Self {
        let pool = StringPool {
            map: DashMap::new(),
            empty: Arc::from(""),
            max_len,
            max_entries,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            bypassed: AtomicU64::new(0),
        };
        pool.preload();
        pool
    }

    /// Canonical shared instance for `value`, or a fresh one when `value`
    /// is too long to pool.
    pub fn get_or_add(&self, value: &str) -> Arc<str> {
        if value.is_empty() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Arc::clone(&self.empty);
        }
        if self.exceeds_max_len(value) {
            self.bypassed.fetch_add(1, Ordering::Relaxed);
            return Arc::from(value);
        }
        if let Some(entry) = self.map.get(value) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Arc::clone(entry.key());
        }
        if self.map.len() >= self.max_entries {
            self.bypassed.fetch_add(1, Ordering::Relaxed);
            return Arc::from(value);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        // A racing insert of the same content wins; its key is returned
        let entry = self.map.entry(Arc::from(value)).or_insert(());
        Arc::clone(entry.key())
    }

    pub fn contains(&self, value: &str) -> bool {
        self.map.contains_key(value)
    }

    /// Number of pooled entries, preloaded tokens included.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn stats(&self) -> StringPoolStats {
        StringPoolStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            bypassed: self.bypassed.load(Ordering::Relaxed),
            entries: self.map.len(),
        }
    }

    /// Drop every learned entry; preloaded tokens are restored.
    pub fn clear(&self) {
        let released = self.map.len();
        self.map.clear();
        self.preload();
        debug!("string pool cleared: {released} entries released");
    }

    fn preload(&self) {
        self.map.insert(Arc::clone(&self.empty), ());
        for token in PRELOADED {
            self.map.insert(Arc::from(token), ());
        }
    }

    #[inline]
    fn exceeds_max_len(&self, value: &str) -> bool {
        // Byte length bounds char count from above
        value.len() > self.max_len && value.chars().count() > self.max_len
    }
}

impl Default for StringPool {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StringPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringPool")
            .field("max_len", &self.max_len)
            .field("max_entries", &self.max_entries)
            .field("stats", &self.stats())
            .finish()
    }
}
