//! Scenario resolution engine.
//!
//! Classifies one import source, relative to the file that contains it, into
//! exactly one [`Scenario`]. Only four scenarios permit a rewrite; everything
//! uncertain lands in a non-rewriting one.
//!
//! ## Bare imports
//!
//! 1. Find the consuming package (nearest manifest declaring dependencies).
//! 2. Locate the target package: local modules dir first, then the nearest
//!    ancestor modules dir (peer resolution). Peer promotion happens at most once.
//! 3. Read the target manifest and decide from its `exports` map, or from
//!    the on-disk subpath directory when there is no map.

use crate::config::RewriteOptions;
use crate::resolver::{
    classify_import_source, find_dependency_manifest, find_node_modules_directory,
    has_url_scheme, parse_bare_specifier, steps, BareSpecifier, ExportTarget, ImportKind,
    ManifestRef, ProbeCaches, ScenarioTrace, ScenarioTraceStep, INDEX_SUFFIX, MANIFEST_FILE,
};
use indexify_util::fs::{is_file, join_path, normalize_path};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::trace;

/// Import classification. Closed set; match it exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    Invalid,
    AlreadyExplicit,
    AlreadyExplicitEsm,
    Unknown,
    BareImportMain,
    BareImportNotADir,
    BareImportExportsNoRewrite,
    BareImportExports,
    BareImportSubpath,
    BareImportSubpathNoPkg,
    BareImportNoexports,
    RelativeImport,
    RelativeImportNotADir,
}

impl Scenario {
    /// Every scenario, in table order.
    pub const ALL: [Scenario; 13] = [
        Self::Invalid,
        Self::AlreadyExplicit,
        Self::AlreadyExplicitEsm,
        Self::Unknown,
        Self::BareImportMain,
        Self::BareImportNotADir,
        Self::BareImportExportsNoRewrite,
        Self::BareImportExports,
        Self::BareImportSubpath,
        Self::BareImportSubpathNoPkg,
        Self::BareImportNoexports,
        Self::RelativeImport,
        Self::RelativeImportNotADir,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::AlreadyExplicit => "already-explicit",
            Self::AlreadyExplicitEsm => "already-explicit-esm",
            Self::Unknown => "unknown",
            Self::BareImportMain => "bare-import-main",
            Self::BareImportNotADir => "bare-import-not-a-dir",
            Self::BareImportExportsNoRewrite => "bare-import-exports-no-rewrite",
            Self::BareImportExports => "bare-import-exports",
            Self::BareImportSubpath => "bare-import-subpath",
            Self::BareImportSubpathNoPkg => "bare-import-subpath-no-pkg",
            Self::BareImportNoexports => "bare-import-noexports",
            Self::RelativeImport => "relative-import",
            Self::RelativeImportNotADir => "relative-import-not-a-dir",
        }
    }

    /// Whether this scenario rewrites the source to an explicit `/index.js` path.
    #[must_use]
    pub fn is_rewrite(&self) -> bool {
        match self {
            Self::BareImportExports
            | Self::BareImportSubpath
            | Self::BareImportSubpathNoPkg
            | Self::RelativeImport => true,
            Self::Invalid
            | Self::AlreadyExplicit
            | Self::AlreadyExplicitEsm
            | Self::Unknown
            | Self::BareImportMain
            | Self::BareImportNotADir
            | Self::BareImportExportsNoRewrite
            | Self::BareImportNoexports
            | Self::RelativeImportNotADir => false,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The package a bare import points at.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPackage {
    /// `lodash` or `@scope/name`.
    pub name: String,
    /// Package directory. `None` when peer resolution found no modules dir.
    pub directory: Option<PathBuf>,
    #[serde(skip)]
    pub manifest: Option<ManifestRef>,
    /// Located through an ancestor modules dir instead of the local one.
    pub is_peer: bool,
}

/// Scenario-specific details.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<ResolvedPackage>,
    /// Exports key for the subpath (`./Button`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subpath_for_exports: Option<String>,
    /// Directory the import would resolve to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_dir: Option<PathBuf>,
    /// File an exports entry points at, when it is a file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_target_path: Option<PathBuf>,
    /// Candidate rewritten source. Only ever set on rewrite scenarios.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewritten: Option<String>,
}

/// Outcome of classifying one import.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    scenario: Scenario,
    meta: ScenarioMeta,
}

impl ScenarioResult {
    fn no_rewrite(scenario: Scenario, mut meta: ScenarioMeta) -> Self {
        debug_assert!(!scenario.is_rewrite());
        meta.rewritten = None;
        Self { scenario, meta }
    }

    fn rewrite(scenario: Scenario, mut meta: ScenarioMeta, candidate: String) -> Self {
        debug_assert!(scenario.is_rewrite());
        meta.rewritten = Some(candidate);
        Self { scenario, meta }
    }

    #[must_use]
    pub fn scenario(&self) -> Scenario {
        self.scenario
    }

    #[must_use]
    pub fn meta(&self) -> &ScenarioMeta {
        &self.meta
    }

    #[must_use]
    pub fn into_meta(self) -> ScenarioMeta {
        self.meta
    }

    /// Candidate rewritten source, present only for rewrite scenarios.
    #[must_use]
    pub fn rewritten(&self) -> Option<&str> {
        self.meta.rewritten.as_deref()
    }

    #[must_use]
    pub fn package(&self) -> Option<&ResolvedPackage> {
        self.meta.package.as_ref()
    }
}

/// Classify `src` as imported from `filename`.
///
/// `boundary` stops every upward directory walk.
#[must_use]
pub fn detect_scenario(
    src: &str,
    filename: &Path,
    caches: &ProbeCaches,
    options: &RewriteOptions,
    boundary: Option<&Path>,
) -> ScenarioResult {
    ScenarioDetector::new(caches, options)
        .with_boundary(boundary)
        .detect(src, filename)
}

/// Scenario engine bound to one cache set and option set.
#[derive(Debug)]
pub struct ScenarioDetector<'a> {
    caches: &'a ProbeCaches,
    options: &'a RewriteOptions,
    boundary: Option<&'a Path>,
    trace: Option<ScenarioTrace>,
}

impl<'a> ScenarioDetector<'a> {
    #[must_use]
    pub fn new(caches: &'a ProbeCaches, options: &'a RewriteOptions) -> Self {
        Self {
            caches,
            options,
            boundary: None,
            trace: None,
        }
    }

    #[must_use]
    pub fn with_boundary(mut self, boundary: Option<&'a Path>) -> Self {
        self.boundary = boundary;
        self
    }

    /// Record a step-by-step trace of every decision.
    #[must_use]
    pub fn with_trace(mut self) -> Self {
        self.trace = Some(ScenarioTrace::new());
        self
    }

    /// Take the recorded trace, leaving an empty one in its place.
    pub fn take_trace(&mut self) -> Option<ScenarioTrace> {
        self.trace.as_mut().map(std::mem::take)
    }

    /// Classify `src` as imported from `filename`.
    pub fn detect(&mut self, src: &str, filename: &Path) -> ScenarioResult {
        if src.is_empty() {
            self.fail(steps::CHECK_SOURCE, "empty import source");
            return self.finish_no_rewrite(Scenario::Invalid, ScenarioMeta::default());
        }
        if src.ends_with(INDEX_SUFFIX) || src.ends_with("/index") {
            self.pass(steps::CHECK_SOURCE, "source already names an index file");
            return self.finish_no_rewrite(Scenario::AlreadyExplicit, ScenarioMeta::default());
        }
        if esm_segment().is_some_and(|re| re.is_match(src)) {
            self.pass(steps::CHECK_SOURCE, "source already uses an esm build");
            return self.finish_no_rewrite(Scenario::AlreadyExplicitEsm, ScenarioMeta::default());
        }

        match classify_import_source(src) {
            ImportKind::Bare if has_url_scheme(src) => {
                self.fail(steps::CLASSIFY_SOURCE, "source carries a URL scheme");
                self.finish_no_rewrite(Scenario::Unknown, ScenarioMeta::default())
            }
            ImportKind::Bare => match parse_bare_specifier(src) {
                Some(spec) => {
                    self.pass(steps::CLASSIFY_SOURCE, format!("bare import of '{}'", spec.name));
                    self.detect_bare(src, &spec, filename)
                }
                None => self.finish_no_rewrite(Scenario::Unknown, ScenarioMeta::default()),
            },
            ImportKind::Relative => {
                self.pass(steps::CLASSIFY_SOURCE, "relative import");
                self.detect_relative(src, filename)
            }
            ImportKind::Invalid => {
                self.fail(steps::CLASSIFY_SOURCE, "not a bare or relative import");
                self.finish_no_rewrite(Scenario::Invalid, ScenarioMeta::default())
            }
        }
    }

    /// Locate the package a bare source points at, without classifying it.
    ///
    /// Returns `None` for relative, empty, or URL-scheme sources.
    pub fn locate_package(&mut self, src: &str, filename: &Path) -> Option<ResolvedPackage> {
        if has_url_scheme(src) {
            return None;
        }
        let spec = parse_bare_specifier(src)?;
        let mut package = self.locate(&spec, filename);
        package.manifest = self.read_manifest(package.directory.as_deref());
        Some(package)
    }

    fn detect_bare(&mut self, src: &str, spec: &BareSpecifier<'_>, filename: &Path) -> ScenarioResult {
        let mut package = self.locate(spec, filename);
        let Some(pkg_dir) = package.directory.clone() else {
            let meta = ScenarioMeta {
                package: Some(package),
                ..ScenarioMeta::default()
            };
            return self.finish_no_rewrite(Scenario::BareImportNoexports, meta);
        };

        let manifest = self.read_manifest(Some(&pkg_dir));
        package.manifest.clone_from(&manifest);

        if spec.is_root() {
            let meta = ScenarioMeta {
                package: Some(package),
                subpath_for_exports: Some(spec.export_key()),
                ..ScenarioMeta::default()
            };
            return self.finish_no_rewrite(Scenario::BareImportMain, meta);
        }

        let import_dir = join_path(
            std::iter::once(pkg_dir.as_path()).chain(spec.segments().map(Path::new)),
        );
        let dir_exists = self.import_dir_exists(import_dir.as_deref());
        let subpath_for_exports = spec.export_key();
        let candidate = format!("{}{INDEX_SUFFIX}", src.trim_end_matches('/'));
        let mut meta = ScenarioMeta {
            package: Some(package),
            subpath_for_exports: Some(subpath_for_exports.clone()),
            import_dir,
            ..ScenarioMeta::default()
        };

        let Some(manifest) = manifest else {
            return if dir_exists {
                self.finish_rewrite(Scenario::BareImportSubpathNoPkg, meta, candidate)
            } else {
                self.finish_no_rewrite(Scenario::BareImportNoexports, meta)
            };
        };

        let Some(exports) = manifest.exports() else {
            return if dir_exists {
                self.finish_rewrite(Scenario::BareImportSubpath, meta, candidate)
            } else {
                self.finish_no_rewrite(Scenario::BareImportNoexports, meta)
            };
        };

        let index_key = format!("{subpath_for_exports}{INDEX_SUFFIX}");
        let has_index_key = exports
            .as_object()
            .is_some_and(|map| map.contains_key(&index_key));

        match exports.get(&subpath_for_exports) {
            Some(value) => {
                self.record(
                    ScenarioTraceStep::new(steps::MATCH_EXPORTS_KEY, true, "subpath is an exports key")
                        .with_key(subpath_for_exports.as_str()),
                );

                let target = ExportTarget::from_value(value).and_then(|t| t.unwrap_default());
                if let Some(target_path) = target.and_then(|t| join_path([pkg_dir.as_path(), Path::new(t)])) {
                    if is_file(&target_path) {
                        self.record(
                            ScenarioTraceStep::new(steps::EXPORT_TARGET_FILE, true, "export target is a file")
                                .with_path(target_path.clone())
                                .with_target(target.unwrap_or_default()),
                        );
                        meta.export_target_path = Some(target_path);
                        return self.finish_no_rewrite(Scenario::BareImportExportsNoRewrite, meta);
                    }
                }

                if !has_index_key {
                    self.record(
                        ScenarioTraceStep::new(steps::MATCH_INDEX_KEY, false, "rewritten subpath is not exported")
                            .with_key(index_key),
                    );
                    return self.finish_no_rewrite(Scenario::BareImportExportsNoRewrite, meta);
                }
                if !dir_exists {
                    return self.finish_no_rewrite(Scenario::BareImportExportsNoRewrite, meta);
                }
                self.finish_rewrite(Scenario::BareImportExports, meta, candidate)
            }
            None if has_index_key => {
                self.record(
                    ScenarioTraceStep::new(steps::MATCH_INDEX_KEY, true, "only the index subpath is exported")
                        .with_key(index_key),
                );
                if dir_exists {
                    self.finish_rewrite(Scenario::BareImportExports, meta, candidate)
                } else {
                    self.finish_no_rewrite(Scenario::BareImportExportsNoRewrite, meta)
                }
            }
            None => {
                self.record(
                    ScenarioTraceStep::new(steps::MATCH_EXPORTS_KEY, false, "subpath is not exported")
                        .with_key(subpath_for_exports.as_str()),
                );
                if dir_exists {
                    self.finish_no_rewrite(Scenario::BareImportExportsNoRewrite, meta)
                } else {
                    self.finish_no_rewrite(Scenario::BareImportNotADir, meta)
                }
            }
        }
    }

    fn detect_relative(&mut self, src: &str, filename: &Path) -> ScenarioResult {
        let file_dir = parent_dir(filename);
        let import_dir = normalize_path(&file_dir.join(src));
        let exists = self.caches.is_directory(&import_dir);
        self.record(
            ScenarioTraceStep::new(
                steps::RESOLVE_RELATIVE,
                exists,
                if exists { "resolves to a directory" } else { "does not resolve to a directory" },
            )
            .with_path(import_dir.clone()),
        );

        let meta = ScenarioMeta {
            import_dir: Some(import_dir),
            ..ScenarioMeta::default()
        };
        if exists {
            let candidate = format!("{}{INDEX_SUFFIX}", src.trim_end_matches('/'));
            self.finish_rewrite(Scenario::RelativeImport, meta, candidate)
        } else {
            self.finish_no_rewrite(Scenario::RelativeImportNotADir, meta)
        }
    }

    /// Find the package directory, promoting to peer resolution at most once.
    fn locate(&mut self, spec: &BareSpecifier<'_>, filename: &Path) -> ResolvedPackage {
        let consumer = find_dependency_manifest(filename, self.boundary, self.caches);
        let consumer_dir = consumer
            .as_ref()
            .map_or_else(|| parent_dir(filename), |c| c.manifest_dir.clone());
        match &consumer {
            Some(c) => self.record(
                ScenarioTraceStep::new(steps::FIND_CONSUMER, true, "found consuming manifest")
                    .with_path(c.manifest_path.clone()),
            ),
            None => self.fail(steps::FIND_CONSUMER, "no consuming manifest, using the file's directory"),
        }

        let declared_peer = consumer
            .as_ref()
            .is_some_and(|c| c.manifest.has_peer_dependency(spec.name));
        let mut is_peer = declared_peer || self.options.peer_only;
        self.record(ScenarioTraceStep::new(
            steps::CHECK_PEER,
            is_peer,
            if declared_peer {
                "declared as a peer dependency"
            } else if is_peer {
                "peer-only mode"
            } else {
                "not a peer dependency"
            },
        ));

        let directory = if is_peer {
            self.peer_directory(spec.name, &consumer_dir)
        } else {
            let local = join_path([
                self.options.local_modules_root(&consumer_dir).as_path(),
                Path::new(spec.name),
            ]);
            match local {
                Some(dir) if self.caches.is_directory(&dir) => {
                    trace!(rule = "local-package", package = spec.name, dir = %dir.display(), "found package directory");
                    self.record(
                        ScenarioTraceStep::new(steps::FIND_PACKAGE_DIR, true, "found local package directory")
                            .with_path(dir.clone()),
                    );
                    Some(dir)
                }
                _ => {
                    trace!(rule = "promote-to-peer", package = spec.name, "no local package directory");
                    is_peer = true;
                    self.peer_directory(spec.name, &consumer_dir)
                }
            }
        };

        ResolvedPackage {
            name: spec.name.to_string(),
            directory,
            manifest: None,
            is_peer,
        }
    }

    fn peer_directory(&mut self, name: &str, consumer_dir: &Path) -> Option<PathBuf> {
        let modules_dir =
            find_node_modules_directory(consumer_dir, self.boundary, self.options.modules_dir_name());
        let directory = modules_dir
            .as_deref()
            .and_then(|nm| join_path([nm, Path::new(name)]));
        match &directory {
            Some(dir) => self.record(
                ScenarioTraceStep::new(steps::PROMOTE_TO_PEER, true, "resolved through ancestor modules directory")
                    .with_path(dir.clone()),
            ),
            None => self.fail(steps::PROMOTE_TO_PEER, "no ancestor modules directory"),
        }
        directory
    }

    fn read_manifest(&mut self, pkg_dir: Option<&Path>) -> Option<ManifestRef> {
        let path = join_path([pkg_dir?, Path::new(MANIFEST_FILE)])?;
        let manifest = self.caches.manifest(&path);
        self.record(
            ScenarioTraceStep::new(
                steps::READ_MANIFEST,
                manifest.is_some(),
                if manifest.is_some() { "read package manifest" } else { "no usable package manifest" },
            )
            .with_path(path),
        );
        manifest
    }

    fn import_dir_exists(&mut self, import_dir: Option<&Path>) -> bool {
        let exists = import_dir.is_some_and(|dir| self.caches.is_directory(dir));
        let mut step = ScenarioTraceStep::new(
            steps::IMPORT_DIR_EXISTS,
            exists,
            if exists { "subpath directory exists" } else { "subpath directory is missing" },
        );
        if let Some(dir) = import_dir {
            step = step.with_path(dir);
        }
        self.record(step);
        exists
    }

    fn record(&mut self, step: ScenarioTraceStep) {
        if let Some(trace) = self.trace.as_mut() {
            trace.add_step(step);
        }
    }

    fn pass(&mut self, step: &'static str, detail: impl Into<String>) {
        if let Some(trace) = self.trace.as_mut() {
            trace.success(step, detail);
        }
    }

    fn fail(&mut self, step: &'static str, detail: impl Into<String>) {
        if let Some(trace) = self.trace.as_mut() {
            trace.failure(step, detail);
        }
    }

    fn finish_no_rewrite(&mut self, scenario: Scenario, meta: ScenarioMeta) -> ScenarioResult {
        trace!(rule = scenario.as_str(), "classified import");
        self.record(ScenarioTraceStep::new(steps::SCENARIO, true, scenario.as_str()));
        ScenarioResult::no_rewrite(scenario, meta)
    }

    fn finish_rewrite(&mut self, scenario: Scenario, meta: ScenarioMeta, candidate: String) -> ScenarioResult {
        trace!(rule = scenario.as_str(), rewritten = %candidate, "classified import");
        self.record(
            ScenarioTraceStep::new(steps::SCENARIO, true, scenario.as_str()).with_target(candidate.as_str()),
        );
        ScenarioResult::rewrite(scenario, meta, candidate)
    }
}

fn parent_dir(filename: &Path) -> PathBuf {
    match filename.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn esm_segment() -> Option<&'static Regex> {
    static ESM_SEGMENT: OnceLock<Option<Regex>> = OnceLock::new();
    ESM_SEGMENT
        .get_or_init(|| Regex::new(r"/esm(/|$)").ok())
        .as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn write_json(path: &Path, value: &serde_json::Value) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, value.to_string()).unwrap();
    }

    fn detect(root: &Path, src: &str) -> ScenarioResult {
        let caches = ProbeCaches::new();
        let options = RewriteOptions::default();
        detect_scenario(src, &root.join("app/src/index.js"), &caches, &options, Some(root))
    }

    fn app(root: &Path) {
        write_json(
            &root.join("app/package.json"),
            &json!({ "name": "app", "dependencies": { "lodash": "4" } }),
        );
        fs::create_dir_all(root.join("app/src")).unwrap();
    }

    #[test]
    fn test_scenario_tags_are_kebab_case() {
        for scenario in Scenario::ALL {
            let json = serde_json::to_value(scenario).unwrap();
            assert_eq!(json, scenario.as_str());
        }
        assert_eq!(Scenario::BareImportNotADir.to_string(), "bare-import-not-a-dir");
    }

    #[test]
    fn test_rewrite_set() {
        let rewrites: Vec<_> = Scenario::ALL.iter().filter(|s| s.is_rewrite()).collect();
        assert_eq!(
            rewrites,
            vec![
                &Scenario::BareImportExports,
                &Scenario::BareImportSubpath,
                &Scenario::BareImportSubpathNoPkg,
                &Scenario::RelativeImport,
            ]
        );
    }

    #[test]
    fn test_early_exits() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        assert_eq!(detect(root, "").scenario(), Scenario::Invalid);
        assert_eq!(detect(root, "./lib/index").scenario(), Scenario::AlreadyExplicit);
        assert_eq!(detect(root, "pkg/dir/index.js").scenario(), Scenario::AlreadyExplicit);
        assert_eq!(detect(root, "@mui/x/esm/Adapter").scenario(), Scenario::AlreadyExplicitEsm);
        assert_eq!(detect(root, "pkg/esm").scenario(), Scenario::AlreadyExplicitEsm);
        assert_eq!(detect(root, "node:fs").scenario(), Scenario::Unknown);
        // "esmodule" is not an esm segment
        assert_ne!(detect(root, "pkg/esmodule").scenario(), Scenario::AlreadyExplicitEsm);
    }

    #[test]
    fn test_non_rewrite_never_carries_candidate() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        app(root);
        for src in ["", "./missing", "lodash", "lodash/missing", "node:path"] {
            let result = detect(root, src);
            assert!(!result.scenario().is_rewrite(), "{src}");
            assert!(result.rewritten().is_none(), "{src}");
        }
    }

    #[test]
    fn test_bare_subpath_without_exports() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        app(root);
        write_json(&root.join("app/node_modules/lodash/package.json"), &json!({ "main": "lodash.js" }));
        fs::create_dir_all(root.join("app/node_modules/lodash/utils")).unwrap();

        let result = detect(root, "lodash/utils");
        assert_eq!(result.scenario(), Scenario::BareImportSubpath);
        assert_eq!(result.rewritten(), Some("lodash/utils/index.js"));
        let package = result.package().unwrap();
        assert_eq!(package.name, "lodash");
        assert!(!package.is_peer);
        assert!(package.manifest.is_some());
    }

    #[test]
    fn test_bare_root_is_main() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        app(root);
        fs::create_dir_all(root.join("app/node_modules/lodash")).unwrap();

        let result = detect(root, "lodash");
        assert_eq!(result.scenario(), Scenario::BareImportMain);
        assert_eq!(result.meta().subpath_for_exports.as_deref(), Some("."));
    }

    #[test]
    fn test_exports_file_target_is_not_rewritten() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        app(root);
        let pkg = root.join("app/node_modules/@emotion/react");
        write_json(
            &pkg.join("package.json"),
            &json!({ "exports": { "./jsx-runtime": { "import": { "default": "./dist/jsx-runtime.js" } }, "./jsx-runtime/index.js": "./x.js" } }),
        );
        fs::create_dir_all(pkg.join("dist")).unwrap();
        fs::create_dir_all(pkg.join("jsx-runtime")).unwrap();
        fs::write(pkg.join("dist/jsx-runtime.js"), "").unwrap();

        let result = detect(root, "@emotion/react/jsx-runtime");
        assert_eq!(result.scenario(), Scenario::BareImportExportsNoRewrite);
        assert_eq!(
            result.meta().export_target_path.as_deref(),
            Some(pkg.join("dist/jsx-runtime.js").as_path())
        );
    }

    #[test]
    fn test_trace_records_decisions() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        app(root);
        fs::create_dir_all(root.join("app/src/components")).unwrap();
        let caches = ProbeCaches::new();
        let options = RewriteOptions::default();

        let mut detector = ScenarioDetector::new(&caches, &options)
            .with_boundary(Some(root))
            .with_trace();
        let result = detector.detect("./components/", &root.join("app/src/index.js"));
        assert_eq!(result.scenario(), Scenario::RelativeImport);
        assert_eq!(result.rewritten(), Some("./components/index.js"));

        let trace = detector.take_trace().unwrap();
        assert_eq!(
            trace.step_names(),
            vec![steps::CLASSIFY_SOURCE, steps::RESOLVE_RELATIVE, steps::SCENARIO]
        );
        assert_eq!(trace.steps[2].target.as_deref(), Some("./components/index.js"));
    }

    #[test]
    fn test_locate_package_for_explicit_source() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        app(root);
        write_json(&root.join("app/node_modules/lodash/package.json"), &json!({ "name": "lodash" }));
        let caches = ProbeCaches::new();
        let options = RewriteOptions::default();

        let mut detector = ScenarioDetector::new(&caches, &options).with_boundary(Some(root));
        let package = detector
            .locate_package("lodash/fp/index.js", &root.join("app/src/index.js"))
            .unwrap();
        assert_eq!(package.directory, Some(root.join("app/node_modules/lodash")));
        assert!(package.manifest.is_some());
        assert!(detector.locate_package("./local", &root.join("app/src/index.js")).is_none());
    }
}
