//! Package.json exports field evaluation.
//!
//! Two readers of the same map with different precedence:
//! - [`compute_entrypoint`] follows `exports` → `module` → `main` → `index.js`,
//!   preferring the `import` condition.
//! - [`ExportTarget::unwrap_default`] is what the scenario engine uses to decide
//!   whether a subpath points at a file; it prefers `default`.

use super::manifest::PackageManifest;
use serde_json::Value;
use tracing::trace;

/// Entry file used when a manifest names nothing better.
pub const DEFAULT_ENTRY: &str = "index.js";

/// Suffix appended by directory rewrites.
pub const INDEX_SUFFIX: &str = "/index.js";

/// The `import` / `require` / `default` slots of a conditional export.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Conditions<'a> {
    pub import: Option<&'a Value>,
    pub require: Option<&'a Value>,
    pub default: Option<&'a Value>,
}

impl<'a> Conditions<'a> {
    /// Read the condition slots of an object. `null` slots count as missing.
    #[must_use]
    pub fn of(value: &'a Value) -> Self {
        let slot = |key: &str| value.get(key).filter(|v| !v.is_null());
        Self {
            import: slot("import"),
            require: slot("require"),
            default: slot("default"),
        }
    }

    fn unwrap_branches(&self) -> Option<&'a str> {
        if let Some(target) = self.default.and_then(Value::as_str) {
            return Some(target);
        }
        let branch = self.import.or(self.require)?;
        branch
            .as_str()
            .or_else(|| branch.get("default").and_then(Value::as_str))
    }
}

/// A single `exports` map value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExportTarget<'a> {
    /// `"./feature": "./dist/feature.js"`
    Direct(&'a str),
    /// `"./feature": { "import": ..., "require": ..., "default": ... }`
    Conditional(Conditions<'a>),
}

impl<'a> ExportTarget<'a> {
    /// Classify an exports value. Arrays, numbers, and `null` are not targets.
    #[must_use]
    pub fn from_value(value: &'a Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::Direct(s)),
            Value::Object(_) => Some(Self::Conditional(Conditions::of(value))),
            _ => None,
        }
    }

    /// Entry file for an ESM consumer: `import` first, then `default`.
    #[must_use]
    pub fn entry_for_import(&self) -> Option<&'a str> {
        match self {
            Self::Direct(s) => Some(*s),
            Self::Conditional(c) => c
                .import
                .and_then(Value::as_str)
                .or_else(|| c.default.and_then(Value::as_str)),
        }
    }

    /// Unwrap one level of conditional nesting, preferring `default`.
    ///
    /// A string `default` wins outright. An object `default` replaces the
    /// target and is unwrapped in its place. Otherwise the first present of
    /// `import` / `require` decides: its string value, or its own `default`.
    #[must_use]
    pub fn unwrap_default(&self) -> Option<&'a str> {
        match self {
            Self::Direct(s) => Some(*s),
            Self::Conditional(c) => {
                let scope = match c.default {
                    Some(Value::String(s)) => return Some(s.as_str()),
                    Some(nested @ Value::Object(_)) => Conditions::of(nested),
                    _ => *c,
                };
                scope.unwrap_branches()
            }
        }
    }
}

/// Compute the entry file for `subpath` (an exports key such as `"."` or `"./utils"`).
///
/// Order: exact exports key, then `module`, then `main`, then `index.js`.
#[must_use]
pub fn compute_entrypoint(manifest: Option<&PackageManifest>, subpath: &str) -> String {
    let Some(manifest) = manifest else {
        return DEFAULT_ENTRY.to_string();
    };

    let from_exports = manifest
        .exports_map()
        .and_then(|map| map.get(subpath))
        .and_then(ExportTarget::from_value)
        .and_then(|target| target.entry_for_import());

    from_exports
        .or_else(|| manifest.module())
        .or_else(|| manifest.main())
        .unwrap_or(DEFAULT_ENTRY)
        .to_string()
}

/// Check whether the exports field permits importing `subpath`.
///
/// Allowed when there is no `exports` field, or when the map has `subpath`,
/// its `/index.js`-stripped form, or its `/index.js`-suffixed form as a key.
/// A non-object `exports` blocks everything.
#[must_use]
pub fn is_allowed_by_exports(manifest: Option<&PackageManifest>, subpath: &str) -> bool {
    let Some(exports) = manifest.and_then(PackageManifest::exports) else {
        trace!(rule = "no-exports", subpath, "exports allows subpath");
        return true;
    };

    let Some(map) = exports.as_object() else {
        trace!(rule = "non-object-exports", subpath, "exports blocks subpath");
        return false;
    };

    if map.contains_key(subpath) {
        trace!(rule = "exact-key", subpath, "exports allows subpath");
        return true;
    }

    if let Some(stripped) = subpath.strip_suffix(INDEX_SUFFIX) {
        if map.contains_key(stripped) {
            trace!(rule = "stripped-index-key", subpath, key = stripped, "exports allows subpath");
            return true;
        }
    } else {
        let suffixed = format!("{subpath}{INDEX_SUFFIX}");
        if map.contains_key(&suffixed) {
            trace!(rule = "suffixed-index-key", subpath, key = %suffixed, "exports allows subpath");
            return true;
        }
    }

    trace!(rule = "not-exported", subpath, exports = %exports, "exports blocks subpath");
    false
}
