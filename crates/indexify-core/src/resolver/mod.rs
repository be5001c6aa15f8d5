//! Package metadata resolution.
//!
//! Everything the scenario engine needs to know about the packages on disk:
//! - `cache`: memoized directory and manifest probes
//! - `manifest`: read-only package.json view
//! - `exports`: entrypoint and exports visibility rules
//! - `package`: source classification and upward manifest/modules-dir walks
//! - `trace`: step-by-step decision traces

pub mod cache;
pub mod exports;
pub mod manifest;
pub mod package;
pub mod trace;

pub use cache::{ManifestRef, ProbeCache, ProbeCaches};
pub use exports::{
    compute_entrypoint, is_allowed_by_exports, Conditions, ExportTarget, DEFAULT_ENTRY,
    INDEX_SUFFIX,
};
pub use manifest::PackageManifest;
pub use package::{
    classify_import_source, find_dependency_manifest, find_nearest_manifest,
    find_node_modules_directory, has_url_scheme, is_commonjs_module, parse_bare_specifier,
    BareSpecifier, ConsumerManifest, ImportKind, MANIFEST_FILE,
};
pub use trace::{steps, ScenarioTrace, ScenarioTraceStep, EXPLAIN_SCHEMA_VERSION};
