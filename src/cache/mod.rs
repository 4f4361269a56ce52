//! Translation cache keyed by exact source text.
//!
//! [`TranslationCache`] is the in-memory, mutex-guarded store the worker and
//! the hotkey path share. Durable persistence is pluggable through
//! [`CacheStore`]; [`SqliteCacheStore`] is the on-disk implementation.

mod manager;
mod sqlite;

use anyhow::Result;
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub use manager::{CacheOptions, Lookup, TranslationCache};
pub use sqlite::SqliteCacheStore;

/// A cached translation and the last time it was touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub touched_at: SystemTime,
    pub value: String,
}

impl CacheEntry {
    pub const fn new(touched_at: SystemTime, value: String) -> Self {
        Self { touched_at, value }
    }

    /// Milliseconds since the Unix epoch, clamped to zero for earlier stamps.
    pub fn touched_at_millis(&self) -> i64 {
        self.touched_at
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as i64)
    }

    pub fn from_millis(millis: i64, value: String) -> Self {
        let touched_at = UNIX_EPOCH + Duration::from_millis(millis.max(0) as u64);
        Self { touched_at, value }
    }
}

/// Durable backing storage for the cache.
///
/// Failures are reported to the caller, which logs them and carries on
/// in memory.
pub trait CacheStore: Send + Sync {
    fn load(&self) -> Result<HashMap<String, CacheEntry>>;
    fn save(&self, entries: &HashMap<String, CacheEntry>) -> Result<()>;
}
