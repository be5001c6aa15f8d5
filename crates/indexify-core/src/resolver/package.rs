//! Import source classification and package.json lookup.

use super::cache::{ManifestRef, ProbeCaches};
use std::path::{Path, PathBuf};

/// Manifest file name.
pub const MANIFEST_FILE: &str = "package.json";

/// Import source classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    /// Package name, optionally scoped, optionally with a subpath.
    Bare,
    /// Starts with `.` or `/`.
    Relative,
    /// Empty source.
    Invalid,
}

/// Classify an import source string.
#[must_use]
pub fn classify_import_source(src: &str) -> ImportKind {
    if src.is_empty() {
        ImportKind::Invalid
    } else if src.starts_with('.') || src.starts_with('/') {
        ImportKind::Relative
    } else {
        ImportKind::Bare
    }
}

/// Whether a bare-looking source carries a URL scheme (`node:fs`, `https://...`).
#[must_use]
pub fn has_url_scheme(src: &str) -> bool {
    let Some((scheme, _)) = src.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// A bare specifier split into package name and subpath.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BareSpecifier<'a> {
    /// `lodash` or `@scope/name`.
    pub name: &'a str,
    /// Path below the package root without leading or trailing slashes; empty for the root.
    pub subpath: &'a str,
}

impl<'a> BareSpecifier<'a> {
    /// Whether the specifier names the package root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.subpath.is_empty()
    }

    /// Subpath segments, in order. Empty segments are kept so joins can reject them.
    pub fn segments(&self) -> impl Iterator<Item = &'a str> {
        let subpath = self.subpath;
        subpath.split('/').filter(move |_| !subpath.is_empty())
    }

    /// Key used in an `exports` map: `"."` or `"./sub/path"`.
    #[must_use]
    pub fn export_key(&self) -> String {
        if self.is_root() {
            ".".to_string()
        } else {
            format!("./{}", self.subpath)
        }
    }
}

/// Parse a bare specifier. Scoped names consume two segments.
///
/// Returns `None` for relative or empty sources.
#[must_use]
pub fn parse_bare_specifier(src: &str) -> Option<BareSpecifier<'_>> {
    if classify_import_source(src) != ImportKind::Bare {
        return None;
    }

    let name_end = if src.starts_with('@') {
        match src.find('/') {
            Some(scope_end) => src[scope_end + 1..]
                .find('/')
                .map_or(src.len(), |i| scope_end + 1 + i),
            None => src.len(),
        }
    } else {
        src.find('/').unwrap_or(src.len())
    };

    let name = &src[..name_end];
    let subpath = src[name_end..].trim_start_matches('/').trim_end_matches('/');
    Some(BareSpecifier { name, subpath })
}

/// Find the nearest ancestor (including `dir` itself) holding a package.json.
///
/// Stops after checking `stop`. The filesystem root is never considered.
#[must_use]
pub fn find_nearest_manifest(
    dir: &Path,
    stop: Option<&Path>,
    caches: &ProbeCaches,
) -> Option<PathBuf> {
    bounded_ancestors(dir, stop)
        .take_while(|d| d.parent().is_some())
        .map(|d| d.join(MANIFEST_FILE))
        .find(|candidate| caches.is_file(candidate))
}

/// The consuming package's own manifest.
#[derive(Debug, Clone)]
pub struct ConsumerManifest {
    pub manifest: ManifestRef,
    pub manifest_path: PathBuf,
    pub manifest_dir: PathBuf,
}

/// Walk up from `start_file`'s directory to the first manifest that declares
/// `dependencies` or `peerDependencies`.
///
/// Stops after checking `stop`, or at the filesystem root.
#[must_use]
pub fn find_dependency_manifest(
    start_file: &Path,
    stop: Option<&Path>,
    caches: &ProbeCaches,
) -> Option<ConsumerManifest> {
    let start = start_file.parent()?;
    for dir in bounded_ancestors(start, stop) {
        let manifest_path = dir.join(MANIFEST_FILE);
        if let Some(manifest) = caches.manifest(&manifest_path) {
            if manifest.declares_dependencies() {
                return Some(ConsumerManifest {
                    manifest,
                    manifest_path,
                    manifest_dir: dir.to_path_buf(),
                });
            }
        }
    }
    None
}

/// Walk up from `from` to the first directory named `modules_dir_name`.
///
/// Stops after checking `stop`, or at the filesystem root.
#[must_use]
pub fn find_node_modules_directory(
    from: &Path,
    stop: Option<&Path>,
    modules_dir_name: &str,
) -> Option<PathBuf> {
    bounded_ancestors(from, stop)
        .find(|dir| dir.file_name().is_some_and(|n| n == modules_dir_name))
        .map(Path::to_path_buf)
}

/// Decide whether an entry file is a CommonJS module.
///
/// `.cjs` always is. A `.js` file is unless its nearest package.json says
/// `"type": "module"`; no manifest at all means CommonJS. Anything else is not.
#[must_use]
pub fn is_commonjs_module(entry: &Path, stop: Option<&Path>, caches: &ProbeCaches) -> bool {
    match entry.extension().and_then(|e| e.to_str()) {
        Some("cjs") => true,
        Some("js") => {
            let nearest = entry
                .parent()
                .and_then(|dir| find_nearest_manifest(dir, stop, caches));
            let Some(manifest_path) = nearest else {
                return true;
            };
            caches
                .manifest(&manifest_path)
                .map_or(true, |manifest| !manifest.is_esm())
        }
        _ => false,
    }
}

fn bounded_ancestors<'a>(
    from: &'a Path,
    stop: Option<&'a Path>,
) -> impl Iterator<Item = &'a Path> {
    let mut done = false;
    from.ancestors().take_while(move |dir| {
        if done {
            return false;
        }
        if stop.is_some_and(|s| *dir == s) {
            done = true;
        }
        true
    })
}
