//! In-memory result cache
//!
//! Bounded key→value store over rendered clips with least-recently-accessed
//! eviction. The cache is a pure performance optimization: entries are
//! immutable once inserted and a hit is byte-identical to a fresh render of
//! the same key, so dropping the whole cache at any point is always safe.
//!
//! One coarse mutex guards the map. Lock hold time is map manipulation only,
//! never rendering, so contention is bounded by memory-copy cost.

use crate::clip::RenderedClip;
use crate::settings::RenderSettings;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, warn};

/// Default capacity, matching the serving front's default configuration
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// Cache key: (file, window, settings fingerprint).
///
/// Times are stored as raw bit patterns so f64 windows can be hashed and
/// compared exactly; two requests share a key only when their windows are
/// bit-identical.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    file_path: String,
    start_bits: u64,
    end_bits: u64,
    fingerprint: String,
}

impl CacheKey {
    pub fn new(file_path: &str, start_time: f64, end_time: f64, settings: &RenderSettings) -> Self {
        Self {
            file_path: file_path.to_string(),
            start_bits: start_time.to_bits(),
            end_bits: end_time.to_bits(),
            fingerprint: settings.fingerprint(),
        }
    }
}

struct CacheEntry {
    value: Arc<RenderedClip>,
    last_access: Instant,
}

/// Bounded clip cache with least-recently-accessed eviction
pub struct ClipCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    max_entries: usize,
}

impl ClipCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    /// Look up a rendered clip, refreshing its access time on hit
    pub fn get(&self, key: &CacheKey) -> Option<Arc<RenderedClip>> {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                // Entries are immutable once inserted; a panic while holding
                // the lock cannot leave them half-written
                warn!("Clip cache lock poisoned, recovering");
                poisoned.into_inner()
            }
        };
        entries.get_mut(key).map(|entry| {
            entry.last_access = Instant::now();
            Arc::clone(&entry.value)
        })
    }

    /// Insert a rendered clip, evicting the least-recently-accessed entry
    /// when at capacity
    pub fn put(&self, key: CacheKey, value: Arc<RenderedClip>) {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            // Scan-for-minimum is fine at this scale; renders dominate
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                debug!("Evicting least-recently-accessed cache entry");
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            CacheEntry {
                value,
                last_access: Instant::now(),
            },
        );
    }

    /// Drop every entry
    pub fn clear(&self) {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.clear();
    }

    pub fn len(&self) -> usize {
        match self.entries.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }
}

impl Default for ClipCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}
