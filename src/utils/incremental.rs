// Incremental module cache for repeated builds against one engine
// Analyzed modules are reused while their content hash is unchanged

use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// blake3 digest of a file's contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn new(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }
}

struct CacheEntry<T> {
    hash: ContentHash,
    value: Arc<T>,
}

/// Cache of per-file results keyed by path and content hash
pub struct IncrementalCache<T> {
    entries: DashMap<PathBuf, CacheEntry<T>>,
}

impl<T> IncrementalCache<T> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Cached result for `path` if it was computed from the same contents,
    /// otherwise compute and store it. Failures are not cached.
    pub fn get_or_compute<E, F>(&self, path: &Path, contents: &[u8], compute: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let hash = ContentHash::new(contents);

        if let Some(entry) = self.entries.get(path) {
            if entry.hash == hash {
                super::Logger::cache_hit(path);
                return Ok(Arc::clone(&entry.value));
            }
        }

        let value = Arc::new(compute()?);
        self.entries.insert(
            path.to_path_buf(),
            CacheEntry {
                hash,
                value: Arc::clone(&value),
            },
        );
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl<T> Default for IncrementalCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_unchanged_contents_hit_the_cache() {
        let cache: IncrementalCache<String> = IncrementalCache::new();
        let calls = Cell::new(0);
        let path = Path::new("/proj/a.js");

        let compute = || -> Result<String, ()> {
            calls.set(calls.get() + 1);
            Ok("analyzed".to_string())
        };

        let first = cache.get_or_compute(path, b"let a = 1;", compute).unwrap();
        let second = cache.get_or_compute(path, b"let a = 1;", compute).unwrap();

        assert_eq!(calls.get(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_changed_contents_recompute() {
        let cache: IncrementalCache<usize> = IncrementalCache::new();
        let path = Path::new("/proj/a.js");

        let first = cache.get_or_compute(path, b"one", || Ok::<_, ()>(1)).unwrap();
        let second = cache.get_or_compute(path, b"two", || Ok::<_, ()>(2)).unwrap();

        assert_eq!(*first, 1);
        assert_eq!(*second, 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let cache: IncrementalCache<usize> = IncrementalCache::new();
        let path = Path::new("/proj/a.js");

        assert!(cache.get_or_compute(path, b"x", || Err::<usize, _>("bad")).is_err());
        assert!(cache.is_empty());
        assert_eq!(*cache.get_or_compute(path, b"x", || Ok::<_, &str>(3)).unwrap(), 3);

        cache.clear();
        assert!(cache.is_empty());
    }
}
