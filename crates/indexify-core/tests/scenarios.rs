//! End-to-end scenario classification and rewriting against on-disk package trees.

use indexify_core::{
    detect_scenario, is_marker_file, transform_module, FsMarkerStore, ImportDeclaration, ImportNode,
    ImportSpecifier, MarkerMode, MemoryMarkers, ProbeCaches, RewriteContext, RewriteDecision,
    RewriteOptions, Scenario, ScenarioResult,
};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

fn write_json(path: &Path, value: &Value) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

fn mkdir(path: &Path) {
    fs::create_dir_all(path).unwrap();
}

/// An app with `lodash` (no exports), `@mui/material` (exports map) and `kit`
/// (exports exposing only `/index.js` keys) installed locally.
fn fixture() -> TempDir {
    let dir = tempdir().unwrap();
    let root = dir.path();

    write_json(
        &root.join("package.json"),
        &json!({
            "name": "app",
            "dependencies": { "lodash": "4", "@mui/material": "5", "kit": "1" }
        }),
    );
    mkdir(&root.join("src/components"));

    let nm = root.join("node_modules");
    write_json(&nm.join("lodash/package.json"), &json!({ "name": "lodash", "main": "lodash.js" }));
    mkdir(&nm.join("lodash/utils"));

    write_json(
        &nm.join("@mui/material/package.json"),
        &json!({
            "name": "@mui/material",
            "exports": {
                ".": "./index.js",
                "./Button": { "import": "./esm/Button/index.js", "require": "./Button/index.js" }
            }
        }),
    );
    mkdir(&nm.join("@mui/material/Button"));

    write_json(
        &nm.join("kit/package.json"),
        &json!({
            "name": "kit",
            "exports": {
                "./forms/index.js": "./forms/index.js",
                "./tables": "./tables/",
                "./tables/index.js": "./tables/index.js"
            }
        }),
    );
    mkdir(&nm.join("kit/forms"));
    mkdir(&nm.join("kit/tables"));
    mkdir(&nm.join("kit/hidden"));

    mkdir(&nm.join("bare-dir/sub"));

    dir
}

fn detect(root: &Path, src: &str) -> ScenarioResult {
    detect_with(root, src, &RewriteOptions::default())
}

fn detect_with(root: &Path, src: &str, options: &RewriteOptions) -> ScenarioResult {
    let caches = ProbeCaches::new();
    detect_scenario(src, &root.join("src/index.js"), &caches, options, Some(root))
}

#[test]
fn test_bare_subpath_without_exports_is_rewritten() {
    let dir = fixture();
    let result = detect(dir.path(), "lodash/utils");
    assert_eq!(result.scenario(), Scenario::BareImportSubpath);
    assert_eq!(result.rewritten(), Some("lodash/utils/index.js"));

    let package = result.package().unwrap();
    assert_eq!(package.name, "lodash");
    assert!(!package.is_peer);
    assert_eq!(
        result.meta().import_dir.as_deref(),
        Some(dir.path().join("node_modules/lodash/utils").as_path())
    );
}

#[test]
fn test_trailing_slash_is_trimmed_from_candidate() {
    let dir = fixture();
    let result = detect(dir.path(), "lodash/utils/");
    assert_eq!(result.rewritten(), Some("lodash/utils/index.js"));
}

#[test]
fn test_exported_subpath_with_object_target_is_not_rewritten() {
    let dir = fixture();
    let result = detect(dir.path(), "@mui/material/Button");
    assert_eq!(result.scenario(), Scenario::BareImportExportsNoRewrite);
    assert_eq!(result.meta().subpath_for_exports.as_deref(), Some("./Button"));
    assert_eq!(result.rewritten(), None);
}

#[test]
fn test_index_only_export_is_rewritten() {
    let dir = fixture();
    let result = detect(dir.path(), "kit/forms");
    assert_eq!(result.scenario(), Scenario::BareImportExports);
    assert_eq!(result.rewritten(), Some("kit/forms/index.js"));
}

#[test]
fn test_directory_export_with_index_key_is_rewritten() {
    let dir = fixture();
    let result = detect(dir.path(), "kit/tables");
    assert_eq!(result.scenario(), Scenario::BareImportExports);
    assert_eq!(result.rewritten(), Some("kit/tables/index.js"));
}

#[test]
fn test_unexported_subpath_depends_on_directory() {
    let dir = fixture();
    assert_eq!(detect(dir.path(), "kit/hidden").scenario(), Scenario::BareImportExportsNoRewrite);
    assert_eq!(detect(dir.path(), "kit/missing").scenario(), Scenario::BareImportNotADir);
}

#[test]
fn test_package_without_manifest() {
    let dir = fixture();
    let result = detect(dir.path(), "bare-dir/sub");
    assert_eq!(result.scenario(), Scenario::BareImportSubpathNoPkg);
    assert_eq!(result.rewritten(), Some("bare-dir/sub/index.js"));

    assert_eq!(detect(dir.path(), "bare-dir/nope").scenario(), Scenario::BareImportNoexports);
}

#[test]
fn test_missing_subpath_without_exports_is_noexports() {
    let dir = fixture();
    assert_eq!(detect(dir.path(), "lodash/fp").scenario(), Scenario::BareImportNoexports);
}

#[test]
fn test_package_root_is_main() {
    let dir = fixture();
    for src in ["lodash", "@mui/material", "kit"] {
        let result = detect(dir.path(), src);
        assert_eq!(result.scenario(), Scenario::BareImportMain, "{src}");
        assert_eq!(result.rewritten(), None);
    }
}

#[test]
fn test_relative_imports() {
    let dir = fixture();
    let result = detect(dir.path(), "./components");
    assert_eq!(result.scenario(), Scenario::RelativeImport);
    assert_eq!(result.rewritten(), Some("./components/index.js"));

    let result = detect(dir.path(), "./missing");
    assert_eq!(result.scenario(), Scenario::RelativeImportNotADir);
    assert_eq!(result.rewritten(), None);

    // `..` walks out of src/ and back in
    assert_eq!(detect(dir.path(), "../src/components").scenario(), Scenario::RelativeImport);
}

#[test]
fn test_sources_that_never_rewrite() {
    let dir = fixture();
    let cases = [
        ("", Scenario::Invalid),
        ("/abs/path", Scenario::RelativeImportNotADir),
        ("./components/index.js", Scenario::AlreadyExplicit),
        ("lodash/utils/index", Scenario::AlreadyExplicit),
        ("@mui/material/esm/Button", Scenario::AlreadyExplicitEsm),
        ("lib/esm", Scenario::AlreadyExplicitEsm),
        ("node:fs", Scenario::Unknown),
        ("https://cdn.example.com/mod", Scenario::Unknown),
    ];
    for (src, expected) in cases {
        let result = detect(dir.path(), src);
        assert_eq!(result.scenario(), expected, "{src:?}");
        assert!(result.rewritten().is_none(), "{src:?}");
    }
}

#[test]
fn test_every_rewrite_scenario_carries_a_candidate() {
    let dir = fixture();
    let sources = [
        "lodash/utils",
        "lodash/fp",
        "@mui/material/Button",
        "kit/forms",
        "kit/hidden",
        "kit/missing",
        "bare-dir/sub",
        "./components",
        "./missing",
        "lodash",
    ];
    for src in sources {
        let result = detect(dir.path(), src);
        assert_eq!(
            result.scenario().is_rewrite(),
            result.rewritten().is_some(),
            "{src} classified as {}",
            result.scenario()
        );
    }
}

#[test]
fn test_peer_promotion_into_ancestor_modules_dir() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    // A library installed in the app, importing a sibling it does not bundle
    let lib = root.join("node_modules/ui-lib");
    write_json(
        &lib.join("package.json"),
        &json!({ "name": "ui-lib", "dependencies": { "react-dom": "18" } }),
    );
    mkdir(&lib.join("src"));
    write_json(&root.join("node_modules/react-dom/package.json"), &json!({ "name": "react-dom" }));
    mkdir(&root.join("node_modules/react-dom/client"));

    let caches = ProbeCaches::new();
    let result = detect_scenario(
        "react-dom/client",
        &lib.join("src/index.js"),
        &caches,
        &RewriteOptions::default(),
        Some(root),
    );
    assert_eq!(result.scenario(), Scenario::BareImportSubpath);
    let package = result.package().unwrap();
    assert!(package.is_peer);
    assert_eq!(
        package.directory.as_deref(),
        Some(root.join("node_modules/react-dom").as_path())
    );
}

#[test]
fn test_declared_peer_skips_local_lookup() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let lib = root.join("node_modules/ui-lib");
    write_json(
        &lib.join("package.json"),
        &json!({ "name": "ui-lib", "peerDependencies": { "react": "18" } }),
    );
    // A nested copy that peer resolution must not pick
    mkdir(&lib.join("node_modules/react/jsx"));
    mkdir(&root.join("node_modules/react"));

    let caches = ProbeCaches::new();
    let result = detect_scenario(
        "react/jsx",
        &lib.join("index.js"),
        &caches,
        &RewriteOptions::default(),
        Some(root),
    );
    let package = result.package().unwrap();
    assert!(package.is_peer);
    assert_eq!(package.directory.as_deref(), Some(root.join("node_modules/react").as_path()));
    assert_eq!(result.scenario(), Scenario::BareImportNoexports);
}

#[test]
fn test_failed_peer_promotion_is_noexports() {
    let dir = fixture();
    let result = detect(dir.path(), "not-installed/sub");
    assert_eq!(result.scenario(), Scenario::BareImportNoexports);
    let package = result.package().unwrap();
    assert!(package.is_peer);
    assert!(package.directory.is_none());
}

#[test]
fn test_custom_modules_dir() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write_json(&root.join("package.json"), &json!({ "dependencies": { "dep": "1" } }));
    mkdir(&root.join("vendor_modules/dep/sub"));

    let options = RewriteOptions::new().with_modules_dir("vendor_modules");
    let result = detect_with(root, "dep/sub", &options);
    assert_eq!(result.scenario(), Scenario::BareImportSubpathNoPkg);
    assert_eq!(detect(root, "dep/sub").scenario(), Scenario::BareImportNoexports);
}

#[test]
fn test_peer_only_leaves_regular_dependencies() {
    let dir = fixture();
    let root = dir.path();
    let file = root.join("src/index.js");
    let caches = ProbeCaches::new();
    let options = RewriteOptions::new().with_peer_only(true);
    let markers = MemoryMarkers::new();
    let ctx = RewriteContext::new(&file, &options, &caches, &markers).with_boundary(Some(root));

    let mut decl = ImportDeclaration::new("lodash/utils", vec![]);
    let outcome = indexify_core::rewrite_import(&mut decl, &ctx);
    assert_eq!(outcome.decision, RewriteDecision::NotPeerDependency);
    assert_eq!(decl.source(), Some("lodash/utils"));

    // Relative imports are unaffected by peer-only mode
    let mut decl = ImportDeclaration::new("./components", vec![]);
    let outcome = indexify_core::rewrite_import(&mut decl, &ctx);
    assert!(outcome.is_rewritten());
}

#[test]
fn test_module_transform_is_idempotent_with_disk_markers() {
    let dir = fixture();
    let root = dir.path();
    let file = root.join("src/index.js");
    let code = "import { map } from 'lodash/utils';\nimport Button from \"@mui/material/Button\";\nimport './components';\n";
    fs::write(&file, code).unwrap();

    let caches = ProbeCaches::new();
    let options = RewriteOptions::default();
    let markers = FsMarkerStore::from_options(&options);
    let ctx = RewriteContext::new(&file, &options, &caches, &markers).with_boundary(Some(root));

    let first = transform_module(code, &file, &ctx);
    assert!(first.changed);
    assert!(first.code.contains("from 'lodash/utils/index.js'"));
    assert!(first.code.contains("\"@mui/material/Button\""));
    assert!(first.code.contains("import './components/index.js';"));

    let marker_count = fs::read_dir(root.join("src"))
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| is_marker_file(&e.path()))
        .count();
    assert_eq!(marker_count, 2);

    // The original text again: markers stop a second rewrite
    let second = transform_module(code, &file, &ctx);
    assert!(!second.changed);
    assert!(second
        .imports
        .iter()
        .any(|i| i.decision == RewriteDecision::AlreadyMarked));

    // Rewritten text is already explicit
    let third = transform_module(&first.code, &file, &ctx);
    assert!(!third.changed);
}

#[test]
fn test_force_ignores_markers_and_writes_none() {
    let dir = fixture();
    let root = dir.path();
    let file = root.join("src/index.js");
    let caches = ProbeCaches::new();
    let options = RewriteOptions::new().with_force(true);
    let markers = FsMarkerStore::from_options(&options);
    let ctx = RewriteContext::new(&file, &options, &caches, &markers).with_boundary(Some(root));

    for _ in 0..2 {
        let out = transform_module("import './components';", &file, &ctx);
        assert_eq!(out.code, "import './components/index.js';");
    }
    assert!(!fs::read_dir(root.join("src"))
        .unwrap()
        .filter_map(Result::ok)
        .any(|e| is_marker_file(&e.path())));
}

#[test]
fn test_directory_markers_are_shared_between_files() {
    let dir = fixture();
    let root = dir.path();
    let caches = ProbeCaches::new();
    let options = RewriteOptions::new().with_marker_mode(MarkerMode::Directory);
    let markers = MemoryMarkers::from_options(&options);
    let a = root.join("src/a.js");
    let b = root.join("src/b.js");
    let ctx = RewriteContext::new(&a, &options, &caches, &markers).with_boundary(Some(root));

    let first = transform_module("import './components';", &a, &ctx);
    assert!(first.changed);
    let second = transform_module("import './components';", &b, &ctx);
    assert!(!second.changed);
    assert_eq!(second.imports[0].decision, RewriteDecision::AlreadyMarked);
}

#[test]
fn test_commonjs_named_imports_in_module() {
    let dir = fixture();
    let root = dir.path();
    let file = root.join("src/index.js");
    let caches = ProbeCaches::new();
    let options = RewriteOptions::default();
    let markers = MemoryMarkers::new();
    let ctx = RewriteContext::new(&file, &options, &caches, &markers).with_boundary(Some(root));

    let code = "const _cjsDefault = 1;\nimport { debounce, 'kebab-name' as kebab } from 'lodash/utils';\n";
    let out = transform_module(code, &file, &ctx);
    assert_eq!(
        out.code,
        "const _cjsDefault = 1;\nimport _cjsDefault2 from 'lodash/utils/index.js';\nconst debounce = _cjsDefault2.debounce;\nconst kebab = _cjsDefault2['kebab-name'];\n"
    );
    let cjs = out.imports[0].cjs.as_ref().unwrap();
    assert!(cjs.removed_statement);
}

#[test]
fn test_esm_package_keeps_named_imports() {
    let dir = fixture();
    let root = dir.path();
    write_json(
        &root.join("node_modules/lodash/package.json"),
        &json!({ "name": "lodash", "type": "module" }),
    );
    let file = root.join("src/index.js");
    let caches = ProbeCaches::new();
    let options = RewriteOptions::default();
    let markers = MemoryMarkers::new();
    let ctx = RewriteContext::new(&file, &options, &caches, &markers).with_boundary(Some(root));

    let out = transform_module("import { debounce } from 'lodash/utils';", &file, &ctx);
    assert_eq!(out.code, "import { debounce } from 'lodash/utils/index.js';");
    assert!(out.imports[0].cjs.is_none());
}

#[test]
fn test_invalid_sources_are_never_mutated() {
    let dir = fixture();
    let root = dir.path();
    let file = root.join("src/index.js");
    let caches = ProbeCaches::new();
    let options = RewriteOptions::default();
    let markers = MemoryMarkers::new();
    let ctx = RewriteContext::new(&file, &options, &caches, &markers).with_boundary(Some(root));

    for src in ["", "/etc/config", "node:path", "pkg/esm/thing"] {
        let mut decl = ImportDeclaration::new(src, vec![ImportSpecifier::named("x", "x")]);
        let outcome = indexify_core::rewrite_import(&mut decl, &ctx);
        assert_eq!(outcome.decision, RewriteDecision::Unchanged, "{src:?}");
        assert_eq!(decl.source(), Some(src));
        assert!(!decl.structure_changed());
    }
    assert!(markers.is_empty());

    let mut decl = ImportDeclaration::without_source(vec![]);
    let outcome = indexify_core::rewrite_import(&mut decl, &ctx);
    assert_eq!(outcome.decision, RewriteDecision::NoSource);
}
