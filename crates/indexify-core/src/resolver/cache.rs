//! Memoizing probe caches.
//!
//! Two independent caches back every resolver call: directory existence and
//! parsed package.json. Each distinct key is probed at most once per cache
//! lifetime and negative results are stored too. There is no invalidation;
//! a cache set lives for one rewrite pass over a static filesystem.

use super::manifest::PackageManifest;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::trace;

/// Shared handle to a parsed manifest owned by the cache.
pub type ManifestRef = Arc<PackageManifest>;

/// Path-keyed memoizer around a single probe function.
///
/// Thread-safe: passes over different files may share one instance.
#[derive(Debug)]
pub struct ProbeCache<V> {
    entries: RwLock<HashMap<PathBuf, V>>,
    probes: AtomicUsize,
}

impl<V> Default for ProbeCache<V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            probes: AtomicUsize::new(0),
        }
    }
}

impl<V: Clone> ProbeCache<V> {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, probing and storing it on first use.
    pub fn get_or_probe(&self, key: &Path, probe: impl FnOnce(&Path) -> V) -> V {
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(value) = entries.get(key) {
                return value.clone();
            }
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        // Another pass may have filled the slot between the two locks.
        if let Some(value) = entries.get(key) {
            return value.clone();
        }
        self.probes.fetch_add(1, Ordering::Relaxed);
        let value = probe(key);
        entries.insert(key.to_path_buf(), value.clone());
        value
    }

    /// Number of cached keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of times the underlying probe actually ran.
    #[must_use]
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::Relaxed)
    }
}

/// The directory, file and manifest caches for one rewrite pass.
#[derive(Debug, Default)]
pub struct ProbeCaches {
    dirs: ProbeCache<bool>,
    files: ProbeCache<bool>,
    manifests: ProbeCache<Option<ManifestRef>>,
}

impl ProbeCaches {
    /// Create an empty cache set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached directory-existence probe.
    #[must_use]
    pub fn is_directory(&self, path: &Path) -> bool {
        self.dirs.get_or_probe(path, |p| {
            let found = indexify_util::fs::is_directory(p);
            trace!(path = %p.display(), found, "probed directory");
            found
        })
    }

    /// Cached file-existence probe.
    #[must_use]
    pub fn is_file(&self, path: &Path) -> bool {
        self.files.get_or_probe(path, |p| {
            let found = indexify_util::fs::is_file(p);
            trace!(path = %p.display(), found, "probed file");
            found
        })
    }

    /// Cached package.json read. `None` for missing, unreadable, or malformed files.
    #[must_use]
    pub fn manifest(&self, path: &Path) -> Option<ManifestRef> {
        self.manifests.get_or_probe(path, |p| {
            let manifest = PackageManifest::read(p).map(Arc::new);
            trace!(path = %p.display(), found = manifest.is_some(), "probed manifest");
            manifest
        })
    }

    /// Directory cache, for inspection.
    #[must_use]
    pub fn dirs(&self) -> &ProbeCache<bool> {
        &self.dirs
    }

    /// File cache, for inspection.
    #[must_use]
    pub fn files(&self) -> &ProbeCache<bool> {
        &self.files
    }

    /// Manifest cache, for inspection.
    #[must_use]
    pub fn manifests(&self) -> &ProbeCache<Option<ManifestRef>> {
        &self.manifests
    }
}
