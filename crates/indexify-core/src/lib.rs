#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

pub mod config;
pub mod error;
pub mod markers;
pub mod resolver;
pub mod rewrite;
pub mod scenario;

pub use config::{load_options, MarkerMode, RewriteOptions};
pub use error::Error;
pub use markers::{
    is_marker_file, FsMarkerStore, MarkerKey, MarkerLedger, MemoryMarkers, StagedMarkers,
    MARKER_PREFIX,
};
pub use resolver::{
    classify_import_source, compute_entrypoint, is_allowed_by_exports, is_commonjs_module,
    ImportKind, PackageManifest, ProbeCaches, ScenarioTrace, ScenarioTraceStep,
    EXPLAIN_SCHEMA_VERSION,
};
pub use rewrite::{
    rewrite_cjs_named_imports, rewrite_import, transform_module, CjsRewrite, ImportDeclaration,
    ImportNode, ImportReport, ImportSpecifier, ModuleTransform, RewriteContext, RewriteDecision,
    RewriteOutcome, UidScope,
};
pub use scenario::{
    detect_scenario, ResolvedPackage, Scenario, ScenarioDetector, ScenarioMeta, ScenarioResult,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
