pub mod explain;
pub mod rewrite;

use crate::logging;
use indexify_core::{load_options, RewriteOptions};
use miette::{IntoDiagnostic, Result};
use std::path::Path;
use tracing::debug;

/// Load the config file (explicit or discovered), apply flag overrides, and
/// start logging at the level the merged options ask for.
pub fn setup(
    cwd: &Path,
    config: Option<&Path>,
    overrides: &RewriteOptions,
    verbosity: u8,
    json: bool,
) -> Result<RewriteOptions> {
    let loaded = load_options(cwd, config).into_diagnostic()?;
    let (path, base) = match loaded {
        Some((path, options)) => (Some(path), options),
        None => (None, RewriteOptions::default()),
    };
    let options = base.merged_with(overrides);

    logging::init(
        verbosity,
        options.effective_verbose() || options.effective_debug(),
        json,
    );
    if let Some(path) = path {
        debug!(config = %path.display(), "loaded config");
    }
    Ok(options)
}

/// `path` relative to `cwd` when it lies below it.
pub fn display_path<'a>(cwd: &Path, path: &'a Path) -> std::borrow::Cow<'a, str> {
    path.strip_prefix(cwd).unwrap_or(path).to_string_lossy()
}
