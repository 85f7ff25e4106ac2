//! Cache layer for built documents.
//!
//! [`CacheStore`] decouples the cache from its storage; [`DocumentCache`] adds
//! get-or-build with single-flight on top, so concurrent requests for the same key run
//! the builder once and share its result.
//!
//! # Implementations
//!
//! - [`NullCacheStore`]: always misses, used when caching is disabled
//! - [`MemoryCacheStore`]: in-process, ordered by key
//! - [`FileCacheStore`]: one JSON file per entry under a directory
//!
//! A store that fails is never fatal: lookups degrade to a build and the failure is
//! reported as a warning on the [`CacheLookup`].

use crate::document::Document;
use crate::error::{Error, Result};
use crate::openapi_builder::BuildOptions;
use chrono::Utc;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use walkdir::WalkDir;

/// Storage behind a [`DocumentCache`].
///
/// Every method may fail with [`Error::CacheUnavailable`].
pub trait CacheStore: Send + Sync {
    /// Fetch a live (non-expired) entry.
    fn get(&self, key: &str) -> Result<Option<Arc<Document>>>;

    /// Store an entry that expires after `ttl`.
    fn put(&self, key: &str, document: &Arc<Document>, ttl: Duration) -> Result<()>;

    /// Remove every entry, returning how many were removed.
    fn invalidate_all(&self) -> Result<usize>;

    /// Remove every entry whose key starts with `prefix`.
    fn invalidate_prefix(&self, prefix: &str) -> Result<usize>;
}

/// No-op [`CacheStore`]: every lookup misses and every write is discarded.
pub struct NullCacheStore;

impl CacheStore for NullCacheStore {
    fn get(&self, _key: &str) -> Result<Option<Arc<Document>>> {
        Ok(None)
    }

    fn put(&self, _key: &str, _document: &Arc<Document>, _ttl: Duration) -> Result<()> {
        Ok(())
    }

    fn invalidate_all(&self) -> Result<usize> {
        Ok(0)
    }

    fn invalidate_prefix(&self, _prefix: &str) -> Result<usize> {
        Ok(0)
    }
}

/// In-process store. Entries are kept in key order so prefix invalidation is a range scan.
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: Mutex<BTreeMap<String, (Option<Instant>, Arc<Document>)>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<MutexGuard<'_, BTreeMap<String, (Option<Instant>, Arc<Document>)>>> {
        self.entries
            .lock()
            .map_err(|_| Error::CacheUnavailable("memory cache lock poisoned".to_string()))
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &str) -> Result<Option<Arc<Document>>> {
        let mut entries = self.entries()?;
        match entries.get(key) {
            Some((expires, document)) if expires.map_or(true, |at| Instant::now() < at) => {
                return Ok(Some(document.clone()))
            }
            Some(_) => {}
            None => return Ok(None),
        }
        entries.remove(key);
        Ok(None)
    }

    fn put(&self, key: &str, document: &Arc<Document>, ttl: Duration) -> Result<()> {
        // None never expires
        let expires = Instant::now().checked_add(ttl);
        self.entries()?
            .insert(key.to_string(), (expires, document.clone()));
        Ok(())
    }

    fn invalidate_all(&self) -> Result<usize> {
        let mut entries = self.entries()?;
        let count = entries.len();
        entries.clear();
        Ok(count)
    }

    fn invalidate_prefix(&self, prefix: &str) -> Result<usize> {
        let mut entries = self.entries()?;
        let matching: Vec<String> = entries
            .range(prefix.to_string()..)
            .map(|(key, _)| key)
            .take_while(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        for key in &matching {
            entries.remove(key);
        }
        Ok(matching.len())
    }
}

/// File-based store rooted at a directory.
///
/// Each entry is `{root}/{sha256(key)}.json` holding the key, its expiry as a unix
/// timestamp, and the document.
pub struct FileCacheStore {
    root: PathBuf,
}

#[derive(Serialize)]
struct StoredEntryRef<'a> {
    key: &'a str,
    expires_at: i64,
    document: &'a Document,
}

#[derive(Deserialize)]
struct StoredEntry {
    key: String,
    expires_at: i64,
    document: Document,
}

#[derive(Deserialize)]
struct StoredKey {
    key: String,
}

impl FileCacheStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.root.join(format!("{}.json", hex::encode(digest)))
    }

    /// Entry files currently on disk
    fn entry_files(&self) -> Vec<PathBuf> {
        if !self.root.is_dir() {
            return Vec::new();
        }
        WalkDir::new(&self.root)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect()
    }

    fn remove(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(unavailable(path, e)),
        }
    }
}

fn unavailable(path: &Path, err: std::io::Error) -> Error {
    Error::CacheUnavailable(format!("{}: {}", path.display(), err))
}

impl CacheStore for FileCacheStore {
    fn get(&self, key: &str) -> Result<Option<Arc<Document>>> {
        let path = self.entry_path(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(unavailable(&path, e)),
        };

        let entry: StoredEntry = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Discarding unreadable cache entry {}: {}", path.display(), e);
                self.remove(&path)?;
                return Ok(None);
            }
        };

        if entry.key != key || entry.expires_at <= Utc::now().timestamp() {
            self.remove(&path)?;
            return Ok(None);
        }
        Ok(Some(Arc::new(entry.document)))
    }

    fn put(&self, key: &str, document: &Arc<Document>, ttl: Duration) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|e| unavailable(&self.root, e))?;

        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let entry = StoredEntryRef {
            key,
            expires_at: Utc::now().timestamp().saturating_add(ttl_secs),
            document,
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| Error::CacheUnavailable(format!("encoding entry: {}", e)))?;

        let path = self.entry_path(key);
        let staging = path.with_extension(format!("{}.tmp", std::process::id()));
        fs::write(&staging, json).map_err(|e| unavailable(&staging, e))?;
        fs::rename(&staging, &path).map_err(|e| unavailable(&path, e))?;
        Ok(())
    }

    fn invalidate_all(&self) -> Result<usize> {
        let files = self.entry_files();
        for path in &files {
            self.remove(path)?;
        }
        Ok(files.len())
    }

    fn invalidate_prefix(&self, prefix: &str) -> Result<usize> {
        let mut removed = 0;
        for path in self.entry_files() {
            let matches = fs::read_to_string(&path)
                .ok()
                .and_then(|content| serde_json::from_str::<StoredKey>(&content).ok())
                .is_some_and(|stored| stored.key.starts_with(prefix));
            if matches {
                self.remove(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Derive the cache key for a build.
///
/// The key is `{prefix}spec:{sha256}` over the canonical JSON of the options, with the
/// pattern lists sorted and deduplicated so equivalent option sets share an entry.
pub fn cache_key(prefix: &str, options: &BuildOptions) -> Result<String> {
    let mut canonical = options.clone();
    for patterns in [
        &mut canonical.include_patterns,
        &mut canonical.exclude_patterns,
    ] {
        patterns.sort();
        patterns.dedup();
    }

    let bytes = serde_json::to_vec(&canonical)?;
    Ok(format!("{}spec:{}", prefix, hex::encode(Sha256::digest(&bytes))))
}

/// Where a [`CacheLookup`] result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
    /// Served from the store
    Hit,
    /// Built by this caller
    Built,
    /// Built by a concurrent caller for the same key
    Shared,
}

#[derive(Debug)]
pub struct CacheLookup {
    pub document: Arc<Document>,
    pub source: CacheSource,
    /// Store failures encountered along the way
    pub warnings: Vec<Error>,
}

enum FlightState {
    Running,
    Finished(Option<Arc<Document>>),
}

/// One in-progress build that other callers can wait on
struct Flight {
    state: Mutex<FlightState>,
    done: Condvar,
}

impl Flight {
    fn new() -> Self {
        Self {
            state: Mutex::new(FlightState::Running),
            done: Condvar::new(),
        }
    }

    fn finish(&self, outcome: Option<Arc<Document>>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = FlightState::Finished(outcome);
        self.done.notify_all();
    }

    /// Block until the leader finishes; `None` when its build failed
    fn wait(&self) -> Option<Arc<Document>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let FlightState::Finished(outcome) = &*state {
                return outcome.clone();
            }
            state = self
                .done
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Clears the flight when the leader returns, including on error or panic
struct FlightGuard<'a> {
    flights: &'a Mutex<HashMap<String, Arc<Flight>>>,
    key: &'a str,
    flight: Arc<Flight>,
    outcome: Option<Arc<Document>>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        let mut flights = self.flights.lock().unwrap_or_else(PoisonError::into_inner);
        if flights
            .get(self.key)
            .is_some_and(|f| Arc::ptr_eq(f, &self.flight))
        {
            flights.remove(self.key);
        }
        drop(flights);
        self.flight.finish(self.outcome.take());
    }
}

enum Role {
    Leader(Arc<Flight>),
    Follower(Arc<Flight>),
}

/// Get-or-build cache with single-flight
pub struct DocumentCache {
    store: Box<dyn CacheStore>,
    flights: Mutex<HashMap<String, Arc<Flight>>>,
}

impl DocumentCache {
    pub fn new(store: Box<dyn CacheStore>) -> Self {
        Self {
            store,
            flights: Mutex::new(HashMap::new()),
        }
    }

    /// A cache that never stores anything but still coalesces concurrent builds
    pub fn disabled() -> Self {
        Self::new(Box::new(NullCacheStore))
    }

    pub fn store(&self) -> &dyn CacheStore {
        self.store.as_ref()
    }

    /// Return the document for `key`, building it at most once across concurrent callers.
    ///
    /// With `force` set the store is not consulted, but the result is still written and
    /// still shared with concurrent callers. If the leading build fails, waiting callers
    /// retry and one of them leads the next attempt.
    ///
    /// # Errors
    ///
    /// Only the builder's own error is returned; store failures become warnings.
    pub fn get_or_build<F>(
        &self,
        key: &str,
        ttl: Duration,
        force: bool,
        build: F,
    ) -> Result<CacheLookup>
    where
        F: FnOnce() -> Result<Document>,
    {
        let mut warnings = Vec::new();

        loop {
            if !force {
                match self.store.get(key) {
                    Ok(Some(document)) => {
                        debug!("Cache hit for {}", key);
                        return Ok(CacheLookup {
                            document,
                            source: CacheSource::Hit,
                            warnings,
                        });
                    }
                    Ok(None) => debug!("Cache miss for {}", key),
                    Err(e) => {
                        warn!("Cache lookup failed, building instead: {}", e);
                        warnings.push(e);
                    }
                }
            }

            match self.join_or_lead(key) {
                Role::Leader(flight) => return self.lead(key, flight, ttl, build, warnings),
                Role::Follower(flight) => {
                    if let Some(document) = flight.wait() {
                        return Ok(CacheLookup {
                            document,
                            source: CacheSource::Shared,
                            warnings,
                        });
                    }
                    debug!("Concurrent build for {} failed, retrying", key);
                }
            }
        }
    }

    fn join_or_lead(&self, key: &str) -> Role {
        let mut flights = self.flights.lock().unwrap_or_else(PoisonError::into_inner);
        match flights.get(key) {
            Some(flight) => Role::Follower(flight.clone()),
            None => {
                let flight = Arc::new(Flight::new());
                flights.insert(key.to_string(), flight.clone());
                Role::Leader(flight)
            }
        }
    }

    fn lead<F>(
        &self,
        key: &str,
        flight: Arc<Flight>,
        ttl: Duration,
        build: F,
        mut warnings: Vec<Error>,
    ) -> Result<CacheLookup>
    where
        F: FnOnce() -> Result<Document>,
    {
        let mut guard = FlightGuard {
            flights: &self.flights,
            key,
            flight,
            outcome: None,
        };

        let document = Arc::new(build()?);
        if let Err(e) = self.store.put(key, &document, ttl) {
            warn!("Failed to store {} in cache: {}", key, e);
            warnings.push(e);
        }

        guard.outcome = Some(document.clone());
        drop(guard);

        Ok(CacheLookup {
            document,
            source: CacheSource::Built,
            warnings,
        })
    }

    pub fn invalidate_all(&self) -> Result<usize> {
        self.store.invalidate_all()
    }

    pub fn invalidate_prefix(&self, prefix: &str) -> Result<usize> {
        self.store.invalidate_prefix(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::document::Info;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use tempfile::TempDir;

    const TTL: Duration = Duration::from_secs(60);

    fn document(title: &str) -> Document {
        Document {
            openapi: Some("3.0.3".to_string()),
            info: Info {
                title: Some(title.to_string()),
                version: Some("1.0.0".to_string()),
                ..Info::default()
            },
            ..Document::default()
        }
    }

    struct FailingStore;

    impl CacheStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<Arc<Document>>> {
            Err(Error::CacheUnavailable("connection refused".to_string()))
        }

        fn put(&self, _key: &str, _document: &Arc<Document>, _ttl: Duration) -> Result<()> {
            Err(Error::CacheUnavailable("connection refused".to_string()))
        }

        fn invalidate_all(&self) -> Result<usize> {
            Err(Error::CacheUnavailable("connection refused".to_string()))
        }

        fn invalidate_prefix(&self, _prefix: &str) -> Result<usize> {
            Err(Error::CacheUnavailable("connection refused".to_string()))
        }
    }

    #[test]
    fn test_memory_store_expiry() {
        let store = MemoryCacheStore::new();
        let doc = Arc::new(document("A"));

        store.put("k", &doc, TTL).unwrap();
        assert!(store.get("k").unwrap().is_some());

        store.put("k", &doc, Duration::ZERO).unwrap();
        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn test_memory_store_huge_ttl_never_expires() {
        let store = MemoryCacheStore::new();
        let doc = Arc::new(document("A"));

        store.put("k", &doc, Duration::MAX).unwrap();

        assert_eq!(store.get("k").unwrap().unwrap().info.title.as_deref(), Some("A"));
    }

    #[test]
    fn test_memory_store_prefix_invalidation() {
        let store = MemoryCacheStore::new();
        let doc = Arc::new(document("A"));
        for key in ["api-docs:spec:1", "api-docs:spec:2", "api-docs:theme:1", "other:spec:1"] {
            store.put(key, &doc, TTL).unwrap();
        }

        assert_eq!(store.invalidate_prefix("api-docs:spec:").unwrap(), 2);
        assert!(store.get("api-docs:theme:1").unwrap().is_some());
        assert_eq!(store.invalidate_all().unwrap(), 2);
    }

    #[test]
    fn test_file_store_round_trip_and_invalidation() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileCacheStore::new(temp_dir.path().join("cache"));
        let doc = Arc::new(document("Stored"));

        assert!(store.get("api-docs:spec:abc").unwrap().is_none());
        store.put("api-docs:spec:abc", &doc, TTL).unwrap();
        store.put("other:spec:abc", &doc, TTL).unwrap();

        let cached = store.get("api-docs:spec:abc").unwrap().unwrap();
        assert_eq!(*cached, *doc);

        assert_eq!(store.invalidate_prefix("api-docs:").unwrap(), 1);
        assert!(store.get("api-docs:spec:abc").unwrap().is_none());
        assert!(store.get("other:spec:abc").unwrap().is_some());
        assert_eq!(store.invalidate_all().unwrap(), 1);
    }

    #[test]
    fn test_file_store_expired_entry_is_removed() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileCacheStore::new(temp_dir.path().to_path_buf());

        store
            .put("k", &Arc::new(document("A")), Duration::ZERO)
            .unwrap();

        assert!(store.get("k").unwrap().is_none());
        assert_eq!(store.invalidate_all().unwrap(), 0);
    }

    #[test]
    fn test_file_store_corrupt_entry_is_a_miss() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileCacheStore::new(temp_dir.path().to_path_buf());
        fs::write(store.entry_path("k"), "{ truncated").unwrap();

        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn test_get_or_build_hits_after_first_build() {
        let cache = DocumentCache::new(Box::new(MemoryCacheStore::new()));

        let first = cache
            .get_or_build("k", TTL, false, || Ok(document("A")))
            .unwrap();
        let second = cache
            .get_or_build("k", TTL, false, || Ok(document("B")))
            .unwrap();

        assert_eq!(first.source, CacheSource::Built);
        assert_eq!(second.source, CacheSource::Hit);
        assert_eq!(second.document.info.title.as_deref(), Some("A"));
    }

    #[test]
    fn test_force_bypasses_store() {
        let cache = DocumentCache::new(Box::new(MemoryCacheStore::new()));
        cache
            .get_or_build("k", TTL, false, || Ok(document("A")))
            .unwrap();

        let forced = cache
            .get_or_build("k", TTL, true, || Ok(document("B")))
            .unwrap();
        let after = cache
            .get_or_build("k", TTL, false, || Ok(document("C")))
            .unwrap();

        assert_eq!(forced.source, CacheSource::Built);
        assert_eq!(after.document.info.title.as_deref(), Some("B"));
    }

    #[test]
    fn test_single_flight_runs_builder_once() {
        let cache = DocumentCache::new(Box::new(MemoryCacheStore::new()));
        let builds = AtomicUsize::new(0);
        let barrier = Barrier::new(8);

        let titles: Vec<String> = thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        cache
                            .get_or_build("k", TTL, false, || {
                                builds.fetch_add(1, Ordering::SeqCst);
                                thread::sleep(Duration::from_millis(200));
                                Ok(document("Shared"))
                            })
                            .unwrap()
                            .document
                            .info
                            .title
                            .clone()
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(titles.iter().all(|t| t == "Shared"));
    }

    #[test]
    fn test_failed_build_clears_flight() {
        let cache = DocumentCache::disabled();

        let err = cache
            .get_or_build("k", TTL, false, || {
                Err(Error::InvalidRoute {
                    pattern: "x".to_string(),
                    message: "bad".to_string(),
                })
            })
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRoute { .. }));

        let retry = cache
            .get_or_build("k", TTL, false, || Ok(document("A")))
            .unwrap();
        assert_eq!(retry.source, CacheSource::Built);
    }

    #[test]
    fn test_unavailable_store_degrades_to_build() {
        let cache = DocumentCache::new(Box::new(FailingStore));

        let lookup = cache
            .get_or_build("k", TTL, false, || Ok(document("A")))
            .unwrap();

        assert_eq!(lookup.source, CacheSource::Built);
        assert_eq!(lookup.warnings.len(), 2);
        assert!(lookup.warnings.iter().all(Error::is_warning));
    }

    #[test]
    fn test_cache_key_ignores_pattern_order() {
        let mut a = Config::default().build_options();
        a.exclude_patterns = vec!["b*".to_string(), "a*".to_string(), "a*".to_string()];
        let mut b = a.clone();
        b.exclude_patterns = vec!["a*".to_string(), "b*".to_string()];

        let key = cache_key("api-docs:", &a).unwrap();
        assert_eq!(key, cache_key("api-docs:", &b).unwrap());
        assert!(key.starts_with("api-docs:spec:"));

        b.path_prefix = "v2".to_string();
        assert_ne!(key, cache_key("api-docs:", &b).unwrap());
    }
}
