//! Rewrite options and config file discovery.
//!
//! ## Supported config format
//!
//! ```json
//! {
//!   "modulesDir": "node_modules",
//!   "force": false,
//!   "noMarks": false,
//!   "peerOnly": false,
//!   "verbose": false,
//!   "debug": false,
//!   "markerMode": "file"
//! }
//! ```

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default name of the per-package dependency directory.
pub const DEFAULT_MODULES_DIR: &str = "node_modules";

/// Environment variable that turns on decision logging.
pub const VERBOSE_ENV: &str = "INDEXIFY_VERBOSE";

/// Environment variable that turns on scenario dumps.
pub const DEBUG_ENV: &str = "INDEXIFY_DEBUG";

/// Config file names in priority order.
const CONFIG_FILES: &[&str] = &["indexify.config.json", ".indexifyrc.json"];

/// How rewrite markers are addressed on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MarkerMode {
    /// One marker per (target file, import source), placed beside the file.
    #[default]
    File,
    /// One marker inside the directory the import resolved to.
    Directory,
}

impl MarkerMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
        }
    }
}

impl std::str::FromStr for MarkerMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(Self::File),
            "directory" | "dir" => Ok(Self::Directory),
            other => Err(Error::InvalidMarkerMode {
                value: other.to_string(),
            }),
        }
    }
}

/// Options recognized by the rewriter, passed in per invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RewriteOptions {
    /// Dependency directory name, or an absolute path used as the local package root.
    pub modules_dir: String,
    /// Bypass every marker check and never write markers.
    pub force: bool,
    /// Never write markers, but still honor existing ones.
    pub no_marks: bool,
    /// Only rewrite bare imports of declared peer dependencies.
    pub peer_only: bool,
    /// Log every rewrite decision.
    pub verbose: bool,
    /// Dump scenario metadata for every import.
    pub debug: bool,
    /// Marker addressing mode.
    pub marker_mode: MarkerMode,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            modules_dir: DEFAULT_MODULES_DIR.to_string(),
            force: false,
            no_marks: false,
            peer_only: false,
            verbose: false,
            debug: false,
            marker_mode: MarkerMode::default(),
        }
    }
}

impl RewriteOptions {
    /// Create options with all defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_modules_dir(mut self, dir: impl Into<String>) -> Self {
        self.modules_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    #[must_use]
    pub fn with_no_marks(mut self, no_marks: bool) -> Self {
        self.no_marks = no_marks;
        self
    }

    #[must_use]
    pub fn with_peer_only(mut self, peer_only: bool) -> Self {
        self.peer_only = peer_only;
        self
    }

    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub fn with_marker_mode(mut self, mode: MarkerMode) -> Self {
        self.marker_mode = mode;
        self
    }

    /// Verbose flag, or the `INDEXIFY_VERBOSE` environment override.
    #[must_use]
    pub fn effective_verbose(&self) -> bool {
        self.verbose || env_flag(VERBOSE_ENV)
    }

    /// Debug flag, or the `INDEXIFY_DEBUG` environment override.
    #[must_use]
    pub fn effective_debug(&self) -> bool {
        self.debug || env_flag(DEBUG_ENV)
    }

    /// Final path component of `modules_dir` (`node_modules` by default).
    ///
    /// Peer lookup walks ancestors looking for a directory with this name.
    #[must_use]
    pub fn modules_dir_name(&self) -> &str {
        Path::new(&self.modules_dir)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(DEFAULT_MODULES_DIR)
    }

    /// Local package root for a consuming package directory.
    ///
    /// An absolute `modules_dir` is used as-is; a bare name is joined to the consumer.
    #[must_use]
    pub fn local_modules_root(&self, consumer_dir: &Path) -> PathBuf {
        let configured = Path::new(&self.modules_dir);
        if configured.is_absolute() {
            configured.to_path_buf()
        } else {
            consumer_dir.join(configured)
        }
    }

    /// Merge CLI flags over file options. Flags only ever turn switches on.
    #[must_use]
    pub fn merged_with(mut self, overrides: &RewriteOptions) -> Self {
        if overrides.modules_dir != DEFAULT_MODULES_DIR {
            self.modules_dir.clone_from(&overrides.modules_dir);
        }
        self.force |= overrides.force;
        self.no_marks |= overrides.no_marks;
        self.peer_only |= overrides.peer_only;
        self.verbose |= overrides.verbose;
        self.debug |= overrides.debug;
        if overrides.marker_mode != MarkerMode::default() {
            self.marker_mode = overrides.marker_mode;
        }
        self
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| !v.is_empty() && v != "0" && !v.eq_ignore_ascii_case("false"))
        .unwrap_or(false)
}

/// Find a config file in the given root directory.
#[must_use]
pub fn find_config_file(root: &Path) -> Option<PathBuf> {
    CONFIG_FILES
        .iter()
        .map(|name| root.join(name))
        .find(|path| path.is_file())
}

/// Load rewrite options from a config file in the given root directory.
///
/// If `config_path` is `Some`, use that specific file. Otherwise, auto-discover.
/// Returns `Ok(None)` when discovery finds nothing.
pub fn load_options(
    root: &Path,
    config_path: Option<&Path>,
) -> Result<Option<(PathBuf, RewriteOptions)>, Error> {
    let path = match config_path {
        Some(p) => {
            let abs = if p.is_absolute() {
                p.to_path_buf()
            } else {
                root.join(p)
            };
            if !abs.is_file() {
                return Err(Error::ConfigNotFound { path: abs });
            }
            abs
        }
        None => match find_config_file(root) {
            Some(p) => p,
            None => return Ok(None),
        },
    };

    let source = std::fs::read_to_string(&path).map_err(|source| Error::ConfigRead {
        path: path.clone(),
        source,
    })?;
    let options = serde_json::from_str(&source).map_err(|source| Error::ConfigParse {
        path: path.clone(),
        source,
    })?;

    Ok(Some((path, options)))
}
