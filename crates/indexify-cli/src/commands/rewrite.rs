//! `indexify rewrite`: transform every source file under the given paths.

use super::{display_path, setup};
use indexify_core::{
    is_marker_file, transform_module, FsMarkerStore, ImportReport, ProbeCaches, RewriteContext,
    RewriteDecision, RewriteOptions, StagedMarkers,
};
use indexify_util::fs::{atomic_write, read_to_string_lossy};
use miette::{miette, IntoDiagnostic, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Schema version for the rewrite JSON report.
pub const REWRITE_SCHEMA_VERSION: u32 = 1;

/// Extensions of files that may contain static imports.
const SOURCE_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "jsx", "ts", "tsx"];

#[derive(Debug, Clone)]
pub struct RewriteArgs {
    pub paths: Vec<PathBuf>,
    pub write: bool,
    pub include_node_modules: bool,
    pub config: Option<PathBuf>,
    pub overrides: RewriteOptions,
}

#[derive(Debug, Serialize)]
struct FileReport {
    path: PathBuf,
    changed: bool,
    written: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    imports: Vec<ImportReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl FileReport {
    fn failed(path: &Path, error: impl ToString) -> Self {
        Self {
            path: path.to_path_buf(),
            changed: false,
            written: false,
            imports: Vec::new(),
            error: Some(error.to_string()),
        }
    }

    /// The file was transformed but could not be written back.
    fn unwritten(path: &Path, imports: Vec<ImportReport>, error: impl ToString) -> Self {
        Self {
            changed: true,
            imports,
            ..Self::failed(path, error)
        }
    }

    fn rewritten_count(&self) -> usize {
        self.imports
            .iter()
            .filter(|i| matches!(i.decision, RewriteDecision::Rewritten { .. }))
            .count()
    }

    fn cjs_count(&self) -> usize {
        self.imports.iter().filter(|i| i.cjs.is_some()).count()
    }
}

#[derive(Debug, Serialize)]
struct RewriteReport {
    schema_version: u32,
    dry_run: bool,
    files_scanned: usize,
    files_changed: usize,
    imports_rewritten: usize,
    cjs_rewrites: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pending_markers: Vec<PathBuf>,
    files: Vec<FileReport>,
}

/// Run the rewrite command.
pub fn run(cwd: &Path, args: &RewriteArgs, verbosity: u8, json: bool) -> Result<()> {
    let options = setup(cwd, args.config.as_deref(), &args.overrides, verbosity, json)?;
    let roots: Vec<PathBuf> = if args.paths.is_empty() {
        vec![cwd.to_path_buf()]
    } else {
        args.paths.iter().map(|p| cwd.join(p)).collect()
    };

    let skip_dir = (!args.include_node_modules).then(|| options.modules_dir_name());
    let files = collect_files(&roots, skip_dir)?;
    debug!(count = files.len(), write = args.write, "collected source files");

    let caches = ProbeCaches::new();
    let markers = if args.write {
        FsMarkerStore::from_options(&options)
    } else {
        FsMarkerStore::from_options(&options).dry_run()
    };

    let reports: Vec<FileReport> = files
        .par_iter()
        .map(|file| process_file(file, &options, &caches, &markers, args.write))
        .collect();

    let report = RewriteReport {
        schema_version: REWRITE_SCHEMA_VERSION,
        dry_run: !args.write,
        files_scanned: reports.len(),
        files_changed: reports.iter().filter(|r| r.changed).count(),
        imports_rewritten: reports.iter().map(FileReport::rewritten_count).sum(),
        cjs_rewrites: reports.iter().map(FileReport::cjs_count).sum(),
        pending_markers: markers.pending(),
        files: reports
            .into_iter()
            .filter(|r| r.changed || r.error.is_some())
            .collect(),
    };
    info!(
        scanned = report.files_scanned,
        changed = report.files_changed,
        probes = caches.dirs().probe_count()
            + caches.files().probe_count()
            + caches.manifests().probe_count(),
        "rewrite finished"
    );

    if json {
        let out = serde_json::to_string_pretty(&report).into_diagnostic()?;
        println!("{out}");
    } else {
        print_human(cwd, &report);
    }

    let failed = report.files.iter().filter(|r| r.error.is_some()).count();
    if failed > 0 {
        return Err(miette!("{failed} file(s) could not be processed"));
    }
    Ok(())
}

/// Walk `roots` for source files, skipping marker files and `skip_dir` directories.
fn collect_files(roots: &[PathBuf], skip_dir: Option<&str>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for root in roots {
        if !root.exists() {
            return Err(miette!("path does not exist: {}", root.display()));
        }
        let walker = WalkDir::new(root).follow_links(false).into_iter().filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !skip_dir.is_some_and(|name| entry.file_name() == name)
        });
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            let path = entry.path();
            if entry.file_type().is_file() && is_source_file(path) {
                files.push(path.to_path_buf());
            }
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn is_source_file(path: &Path) -> bool {
    !is_marker_file(path)
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

/// Transform one file. Its markers are committed only once the new contents
/// are on disk (or, in a dry run, once the transform is done).
fn process_file(
    file: &Path,
    options: &RewriteOptions,
    caches: &ProbeCaches,
    markers: &FsMarkerStore,
    write: bool,
) -> FileReport {
    let code = match read_to_string_lossy(file) {
        Ok(code) => code,
        Err(e) => {
            warn!(file = %file.display(), error = %e, "failed to read file");
            return FileReport::failed(file, e);
        }
    };

    let staged = StagedMarkers::new(markers);
    let ctx = RewriteContext::new(file, options, caches, &staged);
    let transform = transform_module(&code, file, &ctx);
    let mut written = false;
    if transform.changed && write {
        if let Err(e) = atomic_write(file, transform.code.as_bytes()) {
            warn!(
                file = %file.display(),
                error = %e,
                discarded = staged.staged().len(),
                "failed to write file, markers discarded"
            );
            return FileReport::unwritten(file, transform.imports, e);
        }
        written = true;
        debug!(file = %file.display(), "wrote file");
    }
    staged.commit();

    FileReport {
        path: file.to_path_buf(),
        changed: transform.changed,
        written,
        imports: transform.imports,
        error: None,
    }
}

fn print_human(cwd: &Path, report: &RewriteReport) {
    for file in &report.files {
        let path = display_path(cwd, &file.path);
        if let Some(error) = &file.error {
            println!("{path}: error: {error}");
            continue;
        }
        println!("{path}");
        for import in &file.imports {
            if let RewriteDecision::Rewritten { from, to } = &import.decision {
                let scenario = import.scenario.map(|s| s.as_str()).unwrap_or_default();
                println!("  {}: '{from}' -> '{to}' ({scenario})", import.line);
            }
            if let Some(cjs) = &import.cjs {
                println!(
                    "  {}: {} named import(s) -> {}",
                    import.line,
                    cjs.names.len(),
                    cjs.binding
                );
            }
        }
    }

    let mode = if report.dry_run { " (dry run, pass --write to apply)" } else { "" };
    println!(
        "{} import(s) rewritten in {} of {} file(s){mode}",
        report.imports_rewritten, report.files_changed, report.files_scanned
    );
}
