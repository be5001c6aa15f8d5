//! Read-only view over a parsed package.json.

use serde_json::{Map, Value};
use std::path::Path;

/// A parsed package manifest.
///
/// Only JSON objects are accepted; anything else is treated as a missing manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageManifest {
    value: Value,
}

impl PackageManifest {
    /// Wrap a parsed value. Returns `None` unless it is a JSON object.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        value.is_object().then_some(Self { value })
    }

    /// Read and parse a manifest file.
    #[must_use]
    pub fn read(path: &Path) -> Option<Self> {
        indexify_util::fs::read_json(path).and_then(Self::from_value)
    }

    /// The raw JSON value.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.value.get("name").and_then(Value::as_str)
    }

    /// The `exports` field, if present and non-empty.
    ///
    /// `null`, `false`, and `""` count as absent.
    #[must_use]
    pub fn exports(&self) -> Option<&Value> {
        self.value.get("exports").filter(|v| is_truthy(v))
    }

    /// The `exports` field when it is a subpath map.
    #[must_use]
    pub fn exports_map(&self) -> Option<&Map<String, Value>> {
        self.exports().and_then(Value::as_object)
    }

    /// The `module` field, if a non-empty string.
    #[must_use]
    pub fn module(&self) -> Option<&str> {
        self.string_field("module")
    }

    /// The `main` field, if a non-empty string.
    #[must_use]
    pub fn main(&self) -> Option<&str> {
        self.string_field("main")
    }

    /// Whether `type` is `"module"`.
    #[must_use]
    pub fn is_esm(&self) -> bool {
        self.value.get("type").and_then(Value::as_str) == Some("module")
    }

    /// Whether the manifest declares `dependencies` or `peerDependencies`.
    #[must_use]
    pub fn declares_dependencies(&self) -> bool {
        ["dependencies", "peerDependencies"]
            .iter()
            .any(|key| self.value.get(*key).is_some_and(is_truthy))
    }

    /// The `peerDependencies` map.
    #[must_use]
    pub fn peer_dependencies(&self) -> Option<&Map<String, Value>> {
        self.value.get("peerDependencies").and_then(Value::as_object)
    }

    /// Whether `name` is a declared peer dependency.
    #[must_use]
    pub fn has_peer_dependency(&self, name: &str) -> bool {
        self.peer_dependencies()
            .is_some_and(|peers| peers.contains_key(name))
    }

    fn string_field(&self, key: &str) -> Option<&str> {
        self.value
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}
