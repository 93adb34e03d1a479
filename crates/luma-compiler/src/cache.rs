//! Content-keyed program cache.
//!
//! Keys are transformed sources; equal strings share one compiled artifact.
//! The lock is held across the compile call so concurrent lookups of the
//! same source never compile twice. Failed compiles are not stored.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use serde::Serialize;

use crate::CompiledProgram;

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    /// `None` for an unbounded cache.
    pub capacity: Option<usize>,
    pub hits: u64,
    pub misses: u64,
}

struct Entries<T> {
    map: HashMap<String, Arc<T>>,
    /// Least recently used first. Only maintained when bounded.
    order: VecDeque<String>,
}

pub struct ProgramCache<T = CompiledProgram> {
    entries: Mutex<Entries<T>>,
    capacity: Option<usize>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<T> Default for ProgramCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ProgramCache<T> {
    /// An unbounded cache that never evicts.
    pub fn new() -> Self {
        Self::with_capacity(None)
    }

    /// A cache holding at most `capacity` entries (minimum 1), evicting the
    /// least recently used.
    pub fn bounded(capacity: usize) -> Self {
        Self::with_capacity(Some(capacity.max(1)))
    }

    fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            entries: Mutex::new(Entries {
                map: HashMap::new(),
                order: VecDeque::new(),
            }),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries<T>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the artifact for `source`, compiling it on a miss.
    pub fn get_or_compile<E>(
        &self,
        source: &str,
        compile_fn: impl FnOnce(&str) -> Result<T, E>,
    ) -> Result<Arc<T>, E> {
        let mut entries = self.lock();

        if let Some(found) = entries.map.get(source).cloned() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            if self.capacity.is_some() {
                touch(&mut entries.order, source);
            }
            tracing::debug!(bytes = source.len(), "program cache hit");
            return Ok(found);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(bytes = source.len(), "program cache miss");
        let compiled = Arc::new(compile_fn(source)?);

        if let Some(capacity) = self.capacity {
            while entries.map.len() >= capacity {
                let Some(oldest) = entries.order.pop_front() else {
                    break;
                };
                entries.map.remove(&oldest);
                tracing::debug!(capacity, "program cache evicted entry");
            }
            entries.order.push_back(source.to_string());
        }
        entries.map.insert(source.to_string(), Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Look up without compiling or touching the counters.
    pub fn get(&self, source: &str) -> Option<Arc<T>> {
        self.lock().map.get(source).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut entries = self.lock();
        entries.map.clear();
        entries.order.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl ProgramCache<CompiledProgram> {
    /// The process-wide unbounded cache.
    pub fn global() -> &'static ProgramCache {
        static GLOBAL: OnceLock<ProgramCache> = OnceLock::new();
        GLOBAL.get_or_init(ProgramCache::new)
    }
}

fn touch(order: &mut VecDeque<String>, key: &str) {
    if let Some(pos) = order.iter().position(|k| k == key) {
        if let Some(k) = order.remove(pos) {
            order.push_back(k);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn compile_len(source: &str) -> Result<usize, String> {
        Ok(source.len())
    }

    #[test]
    fn test_hit_returns_same_instance() {
        let cache: ProgramCache<usize> = ProgramCache::new();
        let a = cache.get_or_compile("abc", compile_len).unwrap();
        let b = cache.get_or_compile("abc", compile_len).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_compile_called_once_per_source() {
        let cache: ProgramCache<usize> = ProgramCache::new();
        let calls = Cell::new(0);
        for _ in 0..5 {
            cache
                .get_or_compile("x", |s| {
                    calls.set(calls.get() + 1);
                    compile_len(s)
                })
                .unwrap();
        }
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let cache: ProgramCache<usize> = ProgramCache::new();
        let err = cache.get_or_compile("bad", |_| Err::<usize, _>("nope".to_string()));
        assert_eq!(err.unwrap_err(), "nope");
        assert!(cache.is_empty());
        let ok = cache.get_or_compile("bad", compile_len).unwrap();
        assert_eq!(*ok, 3);
    }

    #[test]
    fn test_bounded_evicts_least_recently_used() {
        let cache: ProgramCache<usize> = ProgramCache::bounded(2);
        cache.get_or_compile("a", compile_len).unwrap();
        cache.get_or_compile("bb", compile_len).unwrap();
        // Touch "a" so "bb" becomes the oldest.
        cache.get_or_compile("a", compile_len).unwrap();
        cache.get_or_compile("ccc", compile_len).unwrap();
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_some());
        assert!(cache.get("bb").is_none());
        assert!(cache.get("ccc").is_some());
    }

    #[test]
    fn test_bounded_zero_is_clamped() {
        let cache: ProgramCache<usize> = ProgramCache::bounded(0);
        cache.get_or_compile("a", compile_len).unwrap();
        cache.get_or_compile("b", compile_len).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().capacity, Some(1));
    }

    #[test]
    fn test_clear_keeps_counters() {
        let cache: ProgramCache<usize> = ProgramCache::new();
        cache.get_or_compile("a", compile_len).unwrap();
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().misses, 1);
    }
}
