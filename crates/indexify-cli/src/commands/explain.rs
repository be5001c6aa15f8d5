//! `indexify explain`: show how one import specifier is classified and why.

use super::{display_path, setup};
use indexify_core::{
    compute_entrypoint, is_allowed_by_exports, ProbeCaches, RewriteOptions, Scenario,
    ScenarioDetector, ScenarioMeta, ScenarioTrace, EXPLAIN_SCHEMA_VERSION,
};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
struct ExplainReport {
    schema_version: u32,
    specifier: String,
    from: PathBuf,
    scenario: Scenario,
    rewrite: bool,
    meta: ScenarioMeta,
    /// Entry file the package would load for this subpath.
    #[serde(skip_serializing_if = "Option::is_none")]
    entrypoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    allowed_by_exports: Option<bool>,
    trace: ScenarioTrace,
}

/// Run the explain command.
pub fn run(
    cwd: &Path,
    specifier: &str,
    from: Option<&Path>,
    config: Option<&Path>,
    overrides: &RewriteOptions,
    verbosity: u8,
    json: bool,
) -> Result<()> {
    let options = setup(cwd, config, overrides, verbosity, json)?;
    let from = from.map_or_else(|| cwd.join("index.js"), |f| cwd.join(f));

    let caches = ProbeCaches::new();
    let mut detector = ScenarioDetector::new(&caches, &options).with_trace();
    let result = detector.detect(specifier, &from);
    let trace = detector.take_trace().unwrap_or_default();

    let (entrypoint, allowed_by_exports) = match (result.package(), &result.meta().subpath_for_exports) {
        (Some(package), Some(subpath)) if package.directory.is_some() => {
            let manifest = package.manifest.as_deref();
            (
                Some(compute_entrypoint(manifest, subpath)),
                Some(is_allowed_by_exports(manifest, subpath)),
            )
        }
        _ => (None, None),
    };

    let report = ExplainReport {
        schema_version: EXPLAIN_SCHEMA_VERSION,
        specifier: specifier.to_string(),
        from,
        scenario: result.scenario(),
        rewrite: result.scenario().is_rewrite(),
        meta: result.into_meta(),
        entrypoint,
        allowed_by_exports,
        trace,
    };

    if json {
        let out = serde_json::to_string_pretty(&report).into_diagnostic()?;
        println!("{out}");
    } else {
        print_human(cwd, &report);
    }
    Ok(())
}

fn print_human(cwd: &Path, report: &ExplainReport) {
    println!("{} (from {})", report.specifier, display_path(cwd, &report.from));
    println!("  scenario:   {}", report.scenario);
    match &report.meta.rewritten {
        Some(rewritten) => println!("  rewrite:    '{}' -> '{rewritten}'", report.specifier),
        None => println!("  rewrite:    no"),
    }
    if let Some(package) = &report.meta.package {
        let location = package
            .directory
            .as_deref()
            .map_or_else(|| "not found".into(), |d| display_path(cwd, d));
        let peer = if package.is_peer { ", peer" } else { "" };
        println!("  package:    {} ({location}{peer})", package.name);
    }
    if let Some(entrypoint) = &report.entrypoint {
        println!("  entrypoint: {entrypoint}");
    }
    if let Some(allowed) = report.allowed_by_exports {
        println!("  exported:   {allowed}");
    }

    println!();
    println!("Trace:");
    for step in &report.trace.steps {
        let mark = if step.ok { "ok" } else { "--" };
        print!("  [{mark}] {:<18} {}", step.step, step.detail);
        if let Some(key) = &step.key {
            print!(" [{key}]");
        }
        if let Some(path) = &step.path {
            print!(" {}", display_path(cwd, path));
        }
        println!();
    }
}
