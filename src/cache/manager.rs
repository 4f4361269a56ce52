use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};

use super::{CacheEntry, CacheStore};
use crate::clock::Clock;

/// Capacity and persistence policy for [`TranslationCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOptions {
    /// Maximum number of entries held after any `set` returns.
    pub max_size: usize,
    /// Persist the whole map after this many writes.
    pub save_frequency: usize,
    /// Default debounce gap for [`TranslationCache::get`].
    pub min_gap: Duration,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            max_size: 1000,
            save_frequency: 20,
            min_gap: Duration::from_secs(3),
        }
    }
}

/// Outcome of a cache read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// No entry for the key.
    Miss,
    /// The entry exists but was touched less than `min_gap` ago.
    Debounced,
    /// The stored translation.
    Hit(String),
}

impl Lookup {
    pub fn hit(self) -> Option<String> {
        match self {
            Self::Hit(value) => Some(value),
            Self::Miss | Self::Debounced => None,
        }
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    writes_since_save: usize,
    // Set by any change not yet captured in a snapshot.
    dirty: bool,
    snapshot_seq: u64,
}

/// Debounced, capacity-bounded translation cache.
///
/// Every read and write goes through one mutex, so the debounce check on the
/// hotkey thread and the final write from the worker are linearizable.
pub struct TranslationCache {
    state: Mutex<CacheState>,
    // Sequence number of the last snapshot written to the store.
    persisted_seq: Mutex<u64>,
    options: CacheOptions,
    store: Option<Box<dyn CacheStore>>,
    clock: Arc<dyn Clock>,
}

impl TranslationCache {
    /// Creates a cache and loads whatever the store holds.
    ///
    /// A store that fails to load leaves the cache empty.
    pub fn new(
        options: CacheOptions,
        store: Option<Box<dyn CacheStore>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let options = CacheOptions {
            max_size: options.max_size.max(1),
            save_frequency: options.save_frequency.max(1),
            ..options
        };

        let mut entries = match store.as_deref().map(|store| store.load()) {
            Some(Ok(entries)) => {
                info!(entries = entries.len(), "Loaded translation cache");
                entries
            }
            Some(Err(e)) => {
                warn!("Failed to load translation cache, starting empty: {e:#}");
                HashMap::new()
            }
            None => HashMap::new(),
        };

        let trimmed = entries.len() > options.max_size;
        if trimmed {
            let evicted = evict_oldest(&mut entries, options.max_size);
            info!(evicted = evicted.len(), "Trimmed oversized cache on load");
        }

        Self {
            state: Mutex::new(CacheState {
                entries,
                dirty: trimmed,
                ..CacheState::default()
            }),
            persisted_seq: Mutex::new(0),
            options,
            store,
            clock,
        }
    }

    /// An in-memory cache with no durable store.
    pub fn in_memory(options: CacheOptions, clock: Arc<dyn Clock>) -> Self {
        Self::new(options, None, clock)
    }

    pub const fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// Reads `key`, refreshing its timestamp whether or not it is returned.
    ///
    /// An entry touched less than `min_gap` ago is reported as
    /// [`Lookup::Debounced`] so a rapid re-trigger on the same text does not
    /// replay a duplicate result.
    pub fn get(&self, key: &str, min_gap: Duration) -> Lookup {
        let now = self.clock.now();
        let mut state = self.lock();
        let state = &mut *state;

        let Some(entry) = state.entries.get_mut(key) else {
            return Lookup::Miss;
        };

        // A clock that stepped backwards counts as "just touched".
        let age = now
            .duration_since(entry.touched_at)
            .unwrap_or(Duration::ZERO);
        entry.touched_at = now;
        state.dirty = true;

        if age < min_gap {
            debug!(age_ms = age.as_millis() as u64, "Cache read debounced");
            Lookup::Debounced
        } else {
            Lookup::Hit(entry.value.clone())
        }
    }

    /// Inserts or overwrites `key`.
    ///
    /// Inserting a new key into a full cache first evicts the oldest entries
    /// down to 80% of `max_size`.
    pub fn set(&self, key: &str, value: &str) {
        let now = self.clock.now();

        let snapshot = {
            let mut state = self.lock();

            if !state.entries.contains_key(key) && state.entries.len() >= self.options.max_size {
                let target = self.options.max_size * 4 / 5;
                let evicted = evict_oldest(&mut state.entries, target);
                info!(evicted = evicted.len(), "Evicted old cache entries");
            }

            state
                .entries
                .insert(key.to_string(), CacheEntry::new(now, value.to_string()));
            state.writes_since_save += 1;
            state.dirty = true;

            if state.writes_since_save >= self.options.save_frequency {
                state.writes_since_save = 0;
                Some(Self::take_snapshot(&mut state))
            } else {
                None
            }
        };

        if let Some((seq, entries)) = snapshot {
            self.persist(seq, &entries);
        }
    }

    /// Empties the cache and persists the empty map immediately.
    pub fn clear(&self) {
        let (seq, entries) = {
            let mut state = self.lock();
            state.entries.clear();
            state.writes_since_save = 0;
            Self::take_snapshot(&mut state)
        };
        self.persist(seq, &entries);
        info!("Translation cache cleared");
    }

    /// Persists the current contents if anything changed since the last
    /// save, regardless of the write counter.
    pub fn flush(&self) {
        let (seq, entries) = {
            let mut state = self.lock();
            if !state.dirty {
                return;
            }
            state.writes_since_save = 0;
            Self::take_snapshot(&mut state)
        };
        self.persist(seq, &entries);
    }


    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns whether `key` is present without touching its timestamp.
    pub fn contains(&self, key: &str) -> bool {
        self.lock().entries.contains_key(key)
    }

    fn take_snapshot(state: &mut CacheState) -> (u64, HashMap<String, CacheEntry>) {
        state.dirty = false;
        state.snapshot_seq += 1;
        (state.snapshot_seq, state.entries.clone())
    }

    fn persist(&self, seq: u64, entries: &HashMap<String, CacheEntry>) {
        let Some(store) = self.store.as_deref() else {
            return;
        };

        let mut persisted = self
            .persisted_seq
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *persisted >= seq {
            // A newer snapshot already reached the store.
            return;
        }

        let started = std::time::Instant::now();
        match store.save(entries) {
            Ok(()) => {
                *persisted = seq;
                debug!(
                    entries = entries.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Translation cache saved"
                );
            }
            Err(e) => warn!("Failed to save translation cache: {e:#}"),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for TranslationCache {
    fn drop(&mut self) {
        if self.store.is_some() {
            self.flush();
        }
    }
}

/// Removes the oldest entries until `target` remain.
///
/// Returns the evicted keys oldest first. Equal timestamps are broken by key
/// so eviction is deterministic.
fn evict_oldest(entries: &mut HashMap<String, CacheEntry>, target: usize) -> Vec<String> {
    if entries.len() <= target {
        return Vec::new();
    }

    let mut by_age: Vec<(SystemTime, &String)> = entries
        .iter()
        .map(|(key, entry)| (entry.touched_at, key))
        .collect();
    by_age.sort();

    let excess = entries.len() - target;
    let evicted: Vec<String> = by_age
        .into_iter()
        .take(excess)
        .map(|(_, key)| key.clone())
        .collect();

    for key in &evicted {
        entries.remove(key);
    }
    evicted
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use anyhow::{Result, bail};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const GAP: Duration = Duration::from_secs(3);

    fn create_test_cache(max_size: usize) -> (TranslationCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let options = CacheOptions {
            max_size,
            ..CacheOptions::default()
        };
        (TranslationCache::in_memory(options, clock.clone()), clock)
    }

    #[derive(Default)]
    struct CountingStore {
        saves: AtomicUsize,
        last_len: AtomicUsize,
        fail: bool,
    }

    impl CacheStore for CountingStore {
        fn load(&self) -> Result<HashMap<String, CacheEntry>> {
            if self.fail {
                bail!("disk on fire");
            }
            Ok(HashMap::new())
        }

        fn save(&self, entries: &HashMap<String, CacheEntry>) -> Result<()> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            self.last_len.store(entries.len(), Ordering::SeqCst);
            if self.fail {
                bail!("disk on fire");
            }
            Ok(())
        }
    }

    impl CacheStore for Arc<CountingStore> {
        fn load(&self) -> Result<HashMap<String, CacheEntry>> {
            self.as_ref().load()
        }

        fn save(&self, entries: &HashMap<String, CacheEntry>) -> Result<()> {
            self.as_ref().save(entries)
        }
    }

    #[test]
    fn test_get_missing_key_is_miss() {
        let (cache, _) = create_test_cache(10);
        assert_eq!(cache.get("hello", GAP), Lookup::Miss);
    }

    #[test]
    fn test_get_within_gap_is_debounced_then_hit_after_gap() {
        let (cache, clock) = create_test_cache(10);
        cache.set("hello", "你好");

        assert_eq!(cache.get("hello", GAP), Lookup::Debounced);

        clock.advance(GAP);
        assert_eq!(cache.get("hello", GAP), Lookup::Hit("你好".to_string()));
    }

    #[test]
    fn test_debounced_read_refreshes_timestamp() {
        let (cache, clock) = create_test_cache(10);
        cache.set("hello", "你好");

        clock.advance(Duration::from_secs(2));
        assert_eq!(cache.get("hello", GAP), Lookup::Debounced);

        // Only 2s since the debounced read, although 4s since the write.
        clock.advance(Duration::from_secs(2));
        assert_eq!(cache.get("hello", GAP), Lookup::Debounced);
    }

    #[test]
    fn test_keys_are_case_and_whitespace_sensitive() {
        let (cache, clock) = create_test_cache(10);
        cache.set("Hello", "A");
        clock.advance(GAP);

        assert_eq!(cache.get("hello", GAP), Lookup::Miss);
        assert_eq!(cache.get("Hello ", GAP), Lookup::Miss);
        assert_eq!(cache.get("Hello", GAP), Lookup::Hit("A".to_string()));
    }

    #[test]
    fn test_size_never_exceeds_max_after_set() {
        let (cache, clock) = create_test_cache(10);
        for i in 0..35 {
            cache.set(&format!("key-{i}"), "v");
            clock.advance(Duration::from_millis(1));
            assert!(cache.len() <= 10);
        }
    }

    #[test]
    fn test_overflow_evicts_down_to_eighty_percent_keeping_newest() {
        let (cache, clock) = create_test_cache(10);
        for i in 0..11 {
            cache.set(&format!("key-{i}"), "v");
            clock.advance(Duration::from_millis(1));
        }

        // 8 survivors plus the key that triggered eviction.
        assert_eq!(cache.len(), 9);
        assert!(!cache.contains("key-0"));
        assert!(!cache.contains("key-1"));
        assert!(cache.contains("key-2"));
        assert!(cache.contains("key-10"));
    }

    #[test]
    fn test_overflow_at_default_size_keeps_eighty_percent_plus_new_entry() {
        let clock = Arc::new(ManualClock::default());
        let cache = TranslationCache::in_memory(CacheOptions::default(), clock.clone());
        let max_size = cache.options().max_size;
        assert_eq!(max_size, 1000);

        for i in 0..max_size {
            cache.set(&format!("key-{i}"), "v");
            clock.advance(Duration::from_millis(1));
        }
        assert_eq!(cache.len(), max_size);

        cache.set("newest", "v");

        // floor(0.8 * 1000) survivors plus the entry being inserted.
        assert_eq!(cache.len(), 801);
        assert!(cache.contains("newest"));
        assert!(!cache.contains("key-0"));
        assert!(!cache.contains("key-199"));
        assert!(cache.contains("key-200"));
        assert!(cache.contains("key-999"));
    }

    #[test]
    fn test_touching_an_entry_protects_it_from_eviction() {
        let (cache, clock) = create_test_cache(5);
        for i in 0..5 {
            cache.set(&format!("key-{i}"), "v");
            clock.advance(Duration::from_millis(1));
        }
        let _ = cache.get("key-0", GAP);
        clock.advance(Duration::from_millis(1));

        cache.set("key-5", "v");

        assert!(cache.contains("key-0"));
        assert!(!cache.contains("key-1"));
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let (cache, _) = create_test_cache(3);
        cache.set("a", "1");
        cache.set("b", "2");
        cache.set("c", "3");
        cache.set("a", "4");
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_evict_oldest_returns_keys_oldest_first() {
        let base = SystemTime::UNIX_EPOCH;
        let mut entries = HashMap::new();
        for (key, secs) in [("c", 30), ("a", 10), ("d", 10), ("b", 20)] {
            entries.insert(
                key.to_string(),
                CacheEntry::new(base + Duration::from_secs(secs), String::new()),
            );
        }

        let evicted = evict_oldest(&mut entries, 1);
        assert_eq!(evicted, vec!["a", "d", "b"]);
        assert!(entries.contains_key("c"));
    }

    #[test]
    fn test_saves_every_save_frequency_writes() {
        let store = Arc::new(CountingStore::default());
        let options = CacheOptions {
            save_frequency: 3,
            ..CacheOptions::default()
        };
        let cache = TranslationCache::new(
            options,
            Some(Box::new(store.clone())),
            Arc::new(ManualClock::default()),
        );

        for i in 0..7 {
            cache.set(&format!("k{i}"), "v");
        }
        assert_eq!(store.saves.load(Ordering::SeqCst), 2);
        assert_eq!(store.last_len.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_clear_persists_empty_map() {
        let store = Arc::new(CountingStore::default());
        let cache = TranslationCache::new(
            CacheOptions::default(),
            Some(Box::new(store.clone())),
            Arc::new(ManualClock::default()),
        );
        cache.set("k", "v");

        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
        assert_eq!(store.last_len.load(Ordering::SeqCst), 0);
    }

    fn counting_cache(store: &Arc<CountingStore>) -> TranslationCache {
        TranslationCache::new(
            CacheOptions::default(),
            Some(Box::new(store.clone())),
            Arc::new(ManualClock::default()),
        )
    }

    #[test]
    fn test_drop_without_changes_does_not_save() {
        let store = Arc::new(CountingStore::default());
        let cache = counting_cache(&store);
        assert_eq!(cache.len(), 0);
        assert!(!cache.contains("k"));

        drop(cache);

        assert_eq!(store.saves.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_drop_after_write_saves_once() {
        let store = Arc::new(CountingStore::default());
        let cache = counting_cache(&store);
        cache.set("k", "v");
        assert_eq!(store.saves.load(Ordering::SeqCst), 0);

        drop(cache);

        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
        assert_eq!(store.last_len.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_flush_then_drop_saves_once() {
        let store = Arc::new(CountingStore::default());
        let cache = counting_cache(&store);
        cache.set("k", "v");

        cache.flush();
        cache.flush();
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
        drop(cache);

        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_store_failures_are_swallowed() {
        let store = Arc::new(CountingStore {
            fail: true,
            ..CountingStore::default()
        });
        let options = CacheOptions {
            save_frequency: 1,
            ..CacheOptions::default()
        };
        let clock = Arc::new(ManualClock::default());
        let cache = TranslationCache::new(options, Some(Box::new(store.clone())), clock.clone());

        cache.set("k", "v");
        clock.advance(GAP);

        assert_eq!(cache.get("k", GAP), Lookup::Hit("v".to_string()));
        assert!(store.saves.load(Ordering::SeqCst) >= 1);
    }
}
