//! Decision traces for the `explain` command.
//!
//! Records each probe and rule the scenario engine passes through, so a user
//! can see why an import was or was not rewritten.

use serde::Serialize;
use std::path::PathBuf;

/// Schema version for the explain output format.
pub const EXPLAIN_SCHEMA_VERSION: u32 = 1;

/// A single step in a scenario trace.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioTraceStep {
    /// Step name (see [`steps`])
    pub step: &'static str,
    pub ok: bool,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Exports key consulted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Export target or rewritten source
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl ScenarioTraceStep {
    pub fn new(step: &'static str, ok: bool, detail: impl Into<String>) -> Self {
        Self {
            step,
            ok,
            detail: detail.into(),
            path: None,
            key: None,
            target: None,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

/// Ordered list of steps for one classification.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScenarioTrace {
    pub steps: Vec<ScenarioTraceStep>,
}

impl ScenarioTrace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_step(&mut self, step: ScenarioTraceStep) {
        self.steps.push(step);
    }

    pub fn success(&mut self, step: &'static str, detail: impl Into<String>) {
        self.steps.push(ScenarioTraceStep::new(step, true, detail));
    }

    pub fn failure(&mut self, step: &'static str, detail: impl Into<String>) {
        self.steps.push(ScenarioTraceStep::new(step, false, detail));
    }

    /// Names of the recorded steps, in order.
    #[must_use]
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.step).collect()
    }
}

/// Step names used in scenario traces.
pub mod steps {
    pub const CHECK_SOURCE: &str = "check_source";
    pub const CLASSIFY_SOURCE: &str = "classify_source";
    pub const FIND_CONSUMER: &str = "find_consumer";
    pub const CHECK_PEER: &str = "check_peer";
    pub const FIND_PACKAGE_DIR: &str = "find_package_dir";
    pub const PROMOTE_TO_PEER: &str = "promote_to_peer";
    pub const READ_MANIFEST: &str = "read_manifest";
    pub const MATCH_EXPORTS_KEY: &str = "match_exports_key";
    pub const EXPORT_TARGET_FILE: &str = "export_target_file";
    pub const MATCH_INDEX_KEY: &str = "match_index_key";
    pub const IMPORT_DIR_EXISTS: &str = "import_dir_exists";
    pub const RESOLVE_RELATIVE: &str = "resolve_relative";
    pub const SCENARIO: &str = "scenario";
}
