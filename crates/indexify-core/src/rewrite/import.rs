//! Rewrite applier: directory import → explicit `/index.js` entry.

use super::node::ImportNode;
use crate::config::{MarkerMode, RewriteOptions};
use crate::markers::{MarkerKey, MarkerLedger};
use crate::resolver::{
    classify_import_source, find_nearest_manifest, parse_bare_specifier, ImportKind, ProbeCaches,
};
use crate::scenario::{ResolvedPackage, Scenario, ScenarioDetector, ScenarioResult};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

/// Everything a rewrite needs besides the node itself.
#[derive(Clone, Copy)]
pub struct RewriteContext<'a> {
    /// File containing the import.
    pub filename: &'a Path,
    pub options: &'a RewriteOptions,
    pub caches: &'a ProbeCaches,
    pub markers: &'a dyn MarkerLedger,
    /// Upward directory walks stop here.
    pub boundary: Option<&'a Path>,
}

impl<'a> RewriteContext<'a> {
    #[must_use]
    pub fn new(
        filename: &'a Path,
        options: &'a RewriteOptions,
        caches: &'a ProbeCaches,
        markers: &'a dyn MarkerLedger,
    ) -> Self {
        Self {
            filename,
            options,
            caches,
            markers,
            boundary: None,
        }
    }

    #[must_use]
    pub fn with_boundary(mut self, boundary: Option<&'a Path>) -> Self {
        self.boundary = boundary;
        self
    }

    /// Same context for a different file.
    #[must_use]
    pub fn for_file(mut self, filename: &'a Path) -> Self {
        self.filename = filename;
        self
    }

    pub(crate) fn detector(&self) -> ScenarioDetector<'a> {
        ScenarioDetector::new(self.caches, self.options).with_boundary(self.boundary)
    }

    pub(crate) fn file_dir(&self) -> &'a Path {
        match self.filename.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }
}

impl std::fmt::Debug for RewriteContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RewriteContext")
            .field("filename", &self.filename)
            .field("options", &self.options)
            .field("boundary", &self.boundary)
            .finish_non_exhaustive()
    }
}

/// What the applier did with one import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RewriteDecision {
    /// Source replaced.
    Rewritten { from: String, to: String },
    /// Scenario does not permit a rewrite.
    Unchanged,
    /// Rewrite permitted, but a marker says it was already applied.
    AlreadyMarked,
    /// Peer-only mode and the package is not a declared peer dependency.
    NotPeerDependency,
    /// The node carries no source.
    NoSource,
}

/// Result of [`rewrite_import`].
#[derive(Debug, Clone)]
pub struct RewriteOutcome {
    /// `None` when classification was skipped.
    pub scenario: Option<Scenario>,
    pub decision: RewriteDecision,
    /// Target package of a bare import, for the named-import rewriter.
    pub package: Option<ResolvedPackage>,
}

impl RewriteOutcome {
    fn skipped(decision: RewriteDecision) -> Self {
        Self {
            scenario: None,
            decision,
            package: None,
        }
    }

    #[must_use]
    pub fn is_rewritten(&self) -> bool {
        matches!(self.decision, RewriteDecision::Rewritten { .. })
    }
}

/// Rewrite a directory import to its explicit `/index.js` form when safe.
///
/// Never fails: anything uncertain leaves the node untouched.
pub fn rewrite_import<N: ImportNode + ?Sized>(node: &mut N, ctx: &RewriteContext<'_>) -> RewriteOutcome {
    let Some(src) = node.source().map(str::to_owned) else {
        debug!(file = %ctx.filename.display(), "import has no source");
        return RewriteOutcome {
            scenario: Some(Scenario::Invalid),
            ..RewriteOutcome::skipped(RewriteDecision::NoSource)
        };
    };
    let verbose = ctx.options.effective_verbose();

    if ctx.options.peer_only && classify_import_source(&src) == ImportKind::Bare {
        if let Some(spec) = parse_bare_specifier(&src) {
            if !declared_peer(ctx, spec.name) {
                if verbose {
                    info!(file = %ctx.filename.display(), source = %src, "peer-only: skipping, not a peer dependency");
                }
                return RewriteOutcome {
                    package: Some(ResolvedPackage {
                        name: spec.name.to_string(),
                        directory: None,
                        manifest: None,
                        is_peer: false,
                    }),
                    ..RewriteOutcome::skipped(RewriteDecision::NotPeerDependency)
                };
            }
        }
    }

    let mut detector = ctx.detector();
    let result = detector.detect(&src, ctx.filename);
    let scenario = result.scenario();

    if ctx.options.effective_debug() {
        info!(
            file = %ctx.filename.display(),
            source = %src,
            scenario = %scenario,
            meta = ?result.meta(),
            "detected scenario"
        );
    }

    let package = match scenario {
        Scenario::AlreadyExplicit => detector.locate_package(&src, ctx.filename),
        _ => result.package().cloned(),
    };

    let Some(candidate) = result.rewritten().map(str::to_owned) else {
        if verbose {
            info!(file = %ctx.filename.display(), source = %src, scenario = %scenario, "leaving import unchanged");
        }
        return RewriteOutcome {
            scenario: Some(scenario),
            decision: RewriteDecision::Unchanged,
            package,
        };
    };

    let marker_dir = result.meta().import_dir.as_deref();
    let key = marker_key(ctx, &src, &result, marker_dir);
    if ctx.markers.is_marked(&key) {
        if verbose {
            info!(file = %ctx.filename.display(), source = %src, "marker found, skipping rewrite");
        }
        return RewriteOutcome {
            scenario: Some(scenario),
            decision: RewriteDecision::AlreadyMarked,
            package,
        };
    }

    node.set_source(candidate.clone());
    ctx.markers.mark(&key);
    if verbose {
        info!(
            file = %ctx.filename.display(),
            scenario = %scenario,
            from = %src,
            to = %candidate,
            "rewrote import"
        );
    } else {
        debug!(from = %src, to = %candidate, "rewrote import");
    }

    RewriteOutcome {
        scenario: Some(scenario),
        decision: RewriteDecision::Rewritten {
            from: src,
            to: candidate,
        },
        package,
    }
}

fn marker_key<'k>(
    ctx: &RewriteContext<'k>,
    src: &'k str,
    result: &ScenarioResult,
    import_dir: Option<&'k Path>,
) -> MarkerKey<'k> {
    debug_assert!(result.scenario().is_rewrite());
    match (ctx.options.marker_mode, import_dir) {
        (MarkerMode::Directory, Some(dir)) => MarkerKey::Directory(dir),
        _ => MarkerKey::File {
            target: ctx.filename,
            source: src,
        },
    }
}

/// Peer-only gate: is `name` in the nearest manifest's `peerDependencies`?
fn declared_peer(ctx: &RewriteContext<'_>, name: &str) -> bool {
    find_nearest_manifest(ctx.file_dir(), ctx.boundary, ctx.caches)
        .and_then(|path| ctx.caches.manifest(&path))
        .is_some_and(|manifest| manifest.has_peer_dependency(name))
}
