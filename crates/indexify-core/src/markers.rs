//! Rewrite markers.
//!
//! A marker records that an import has already been rewritten, so a second
//! pass over the same file is a no-op. Two addressing modes:
//! - file: `<dir>/.indexify-marker-<basename>-<source>` beside the target file
//! - directory: `<dir>/.indexify-marker` inside the directory the import resolved to
//!
//! `force` disables every check and every write. `no_marks` disables writes
//! but still honors markers already on disk.

use crate::config::RewriteOptions;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, warn};

/// Reserved file name prefix shared by every marker.
pub const MARKER_PREFIX: &str = ".indexify-marker";

/// What a marker is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKey<'a> {
    /// One import source in one target file.
    File { target: &'a Path, source: &'a str },
    /// Any import resolving into this directory.
    Directory(&'a Path),
}

impl MarkerKey<'_> {
    /// On-disk location of the marker. `None` when the target has no file name.
    #[must_use]
    pub fn marker_path(&self) -> Option<PathBuf> {
        match self {
            Self::File { target, source } => {
                let basename = target.file_name()?.to_string_lossy();
                let dir = target.parent().unwrap_or(Path::new("."));
                let name = sanitize_marker_name(&format!("{basename}-{source}"));
                Some(dir.join(format!("{MARKER_PREFIX}-{name}")))
            }
            Self::Directory(dir) => Some(dir.join(MARKER_PREFIX)),
        }
    }
}

/// Replace every character outside `[@A-Za-z0-9_.-]` with `_`.
#[must_use]
pub fn sanitize_marker_name(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '@' | '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Whether `path` is a marker file.
#[must_use]
pub fn is_marker_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(MARKER_PREFIX))
}

/// Idempotency ledger consulted by the rewrite applier.
pub trait MarkerLedger: Send + Sync {
    /// Whether the rewrite for `key` has already been applied.
    fn is_marked(&self, key: &MarkerKey<'_>) -> bool;

    /// Record that the rewrite for `key` was applied. Never fails.
    fn mark(&self, key: &MarkerKey<'_>);
}

/// Markers stored as empty files on disk.
#[derive(Debug, Default)]
pub struct FsMarkerStore {
    force: bool,
    no_marks: bool,
    /// Dry-run writes land here instead of on disk.
    pending: Option<RwLock<HashSet<PathBuf>>>,
}

impl FsMarkerStore {
    #[must_use]
    pub fn new(force: bool, no_marks: bool) -> Self {
        Self {
            force,
            no_marks,
            pending: None,
        }
    }

    #[must_use]
    pub fn from_options(options: &RewriteOptions) -> Self {
        Self::new(options.force, options.no_marks)
    }

    /// Keep new markers in memory only. Existing markers on disk are still honored.
    #[must_use]
    pub fn dry_run(mut self) -> Self {
        self.pending = Some(RwLock::new(HashSet::new()));
        self
    }

    /// Markers recorded in dry-run mode.
    #[must_use]
    pub fn pending(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self
            .pending
            .as_ref()
            .map(|p| {
                p.read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .iter()
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        paths.sort();
        paths
    }
}

impl MarkerLedger for FsMarkerStore {
    fn is_marked(&self, key: &MarkerKey<'_>) -> bool {
        if self.force {
            return false;
        }
        let Some(path) = key.marker_path() else {
            return false;
        };
        let pending = self.pending.as_ref().is_some_and(|p| {
            p.read()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(&path)
        });
        pending || indexify_util::fs::is_file(&path)
    }

    fn mark(&self, key: &MarkerKey<'_>) {
        if self.force || self.no_marks {
            return;
        }
        let Some(path) = key.marker_path() else {
            warn!(?key, "cannot derive marker path");
            return;
        };
        self.record(path);
    }
}

impl FsMarkerStore {
    fn record(&self, path: PathBuf) {
        if let Some(pending) = &self.pending {
            pending
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(path);
            return;
        }
        match fs::write(&path, b"") {
            Ok(()) => debug!(marker = %path.display(), "wrote marker"),
            Err(e) => warn!(marker = %path.display(), error = %e, "failed to write marker"),
        }
    }
}

/// Markers held back until the rewrite they record has been persisted.
///
/// Checks see both the staged set and `store`. Nothing reaches `store` until
/// [`StagedMarkers::commit`]; dropping the stage discards it.
#[derive(Debug)]
pub struct StagedMarkers<'a> {
    store: &'a FsMarkerStore,
    staged: RwLock<HashSet<PathBuf>>,
}

impl<'a> StagedMarkers<'a> {
    #[must_use]
    pub fn new(store: &'a FsMarkerStore) -> Self {
        Self {
            store,
            staged: RwLock::new(HashSet::new()),
        }
    }

    /// Markers waiting for [`StagedMarkers::commit`].
    #[must_use]
    pub fn staged(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self
            .staged
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();
        paths.sort();
        paths
    }

    /// Hand every staged marker to the underlying store.
    pub fn commit(self) {
        let staged = self
            .staged
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        for path in staged {
            self.store.record(path);
        }
    }
}

impl MarkerLedger for StagedMarkers<'_> {
    fn is_marked(&self, key: &MarkerKey<'_>) -> bool {
        if self.store.force {
            return false;
        }
        let staged = key.marker_path().is_some_and(|path| {
            self.staged
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(&path)
        });
        staged || self.store.is_marked(key)
    }

    fn mark(&self, key: &MarkerKey<'_>) {
        if self.store.force || self.store.no_marks {
            return;
        }
        if let Some(path) = key.marker_path() {
            self.staged
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(path);
        }
    }
}

/// In-memory ledger for tests and single-shot analysis.
#[derive(Debug, Default)]
pub struct MemoryMarkers {
    force: bool,
    no_marks: bool,
    marked: RwLock<HashSet<PathBuf>>,
}

impl MemoryMarkers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_options(options: &RewriteOptions) -> Self {
        Self {
            force: options.force,
            no_marks: options.no_marks,
            marked: RwLock::new(HashSet::new()),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.marked
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MarkerLedger for MemoryMarkers {
    fn is_marked(&self, key: &MarkerKey<'_>) -> bool {
        if self.force {
            return false;
        }
        key.marker_path().is_some_and(|path| {
            self.marked
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(&path)
        })
    }

    fn mark(&self, key: &MarkerKey<'_>) {
        if self.force || self.no_marks {
            return;
        }
        if let Some(path) = key.marker_path() {
            self.marked
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sanitize_marker_name() {
        assert_eq!(sanitize_marker_name("index.js-@mui/material/Button"), "index.js-@mui_material_Button");
        assert_eq!(sanitize_marker_name("a.js-./x y"), "a.js-._x_y");
    }

    #[test]
    fn test_file_marker_path() {
        let key = MarkerKey::File {
            target: Path::new("/app/src/index.js"),
            source: "./components",
        };
        assert_eq!(
            key.marker_path(),
            Some(PathBuf::from("/app/src/.indexify-marker-index.js-._components"))
        );
        assert!(is_marker_file(&key.marker_path().unwrap()));
        assert!(!is_marker_file(Path::new("/app/src/index.js")));

        let key = MarkerKey::Directory(Path::new("/app/src/components"));
        assert_eq!(
            key.marker_path(),
            Some(PathBuf::from("/app/src/components/.indexify-marker"))
        );
    }

    #[test]
    fn test_fs_store_write_then_check() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("index.js");
        let key = MarkerKey::File { target: &target, source: "lodash/utils" };
        let store = FsMarkerStore::new(false, false);

        assert!(!store.is_marked(&key));
        store.mark(&key);
        assert!(store.is_marked(&key));
        // Writing again is harmless
        store.mark(&key);
        assert!(key.marker_path().unwrap().is_file());
    }

    #[test]
    fn test_fs_store_no_marks_honors_existing() {
        let dir = tempdir().unwrap();
        let key = MarkerKey::Directory(dir.path());

        let quiet = FsMarkerStore::new(false, true);
        quiet.mark(&key);
        assert!(!quiet.is_marked(&key));

        FsMarkerStore::new(false, false).mark(&key);
        assert!(quiet.is_marked(&key));
    }

    #[test]
    fn test_fs_store_force_ignores_markers() {
        let dir = tempdir().unwrap();
        let key = MarkerKey::Directory(dir.path());
        FsMarkerStore::new(false, false).mark(&key);

        let forced = FsMarkerStore::new(true, false);
        assert!(!forced.is_marked(&key));
        fs::remove_file(key.marker_path().unwrap()).unwrap();
        forced.mark(&key);
        assert!(!key.marker_path().unwrap().exists());
    }

    #[test]
    fn test_dry_run_keeps_markers_in_memory() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("index.js");
        let key = MarkerKey::File { target: &target, source: "./lib" };
        let store = FsMarkerStore::new(false, false).dry_run();

        store.mark(&key);
        assert!(store.is_marked(&key));
        assert!(!key.marker_path().unwrap().exists());
        assert_eq!(store.pending(), vec![key.marker_path().unwrap()]);
    }

    #[test]
    fn test_write_failure_is_swallowed() {
        let key = MarkerKey::Directory(Path::new("/definitely/not/here"));
        FsMarkerStore::new(false, false).mark(&key);
        assert!(!FsMarkerStore::new(false, false).is_marked(&key));
    }

    #[test]
    fn test_staged_markers_wait_for_commit() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("index.js");
        let key = MarkerKey::File { target: &target, source: "./lib" };
        let store = FsMarkerStore::new(false, false);

        let staged = StagedMarkers::new(&store);
        staged.mark(&key);
        assert!(staged.is_marked(&key));
        assert!(!store.is_marked(&key));
        assert_eq!(staged.staged(), vec![key.marker_path().unwrap()]);
        staged.commit();
        assert!(key.marker_path().unwrap().is_file());

        // A discarded stage leaves nothing behind
        let other = MarkerKey::File { target: &target, source: "./other" };
        let staged = StagedMarkers::new(&store);
        staged.mark(&other);
        drop(staged);
        assert!(!store.is_marked(&other));
        assert!(!other.marker_path().unwrap().exists());
    }

    #[test]
    fn test_staged_markers_honor_store_flags() {
        let dir = tempdir().unwrap();
        let key = MarkerKey::Directory(dir.path());
        FsMarkerStore::new(false, false).mark(&key);

        let store = FsMarkerStore::new(false, false).dry_run();
        assert!(StagedMarkers::new(&store).is_marked(&key));

        let forced = FsMarkerStore::new(true, false);
        assert!(!StagedMarkers::new(&forced).is_marked(&key));

        let quiet = FsMarkerStore::new(false, true);
        let staged = StagedMarkers::new(&quiet);
        let target = dir.path().join("a.js");
        let fresh = MarkerKey::File { target: &target, source: "./b" };
        staged.mark(&fresh);
        assert!(staged.staged().is_empty());

        // Committing into a dry-run store only fills its pending set
        let staged = StagedMarkers::new(&store);
        staged.mark(&fresh);
        staged.commit();
        assert_eq!(store.pending(), vec![fresh.marker_path().unwrap()]);
        assert!(!fresh.marker_path().unwrap().exists());
    }

    #[test]
    fn test_memory_markers() {
        let markers = MemoryMarkers::new();
        let key = MarkerKey::File { target: Path::new("/a/b.js"), source: "./c" };
        assert!(!markers.is_marked(&key));
        markers.mark(&key);
        assert!(markers.is_marked(&key));
        assert_eq!(markers.len(), 1);

        let quiet = MemoryMarkers::from_options(&RewriteOptions::new().with_no_marks(true));
        quiet.mark(&key);
        assert!(quiet.is_empty());
    }
}
