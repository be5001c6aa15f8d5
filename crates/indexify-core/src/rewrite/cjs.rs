//! CommonJS named-import rewriter.
//!
//! ```js
//! import { a, b as c } from './lib/index.js';
//! ```
//! becomes, when `./lib/index.js` is CommonJS,
//! ```js
//! import _cjsDefault from './lib/index.js';
//! const a = _cjsDefault.a;
//! const c = _cjsDefault.b;
//! ```

use super::import::{RewriteContext, RewriteOutcome};
use super::node::{ImportNode, ImportSpecifier};
use crate::resolver::{
    classify_import_source, is_commonjs_module, parse_bare_specifier, ImportKind, DEFAULT_ENTRY,
    INDEX_SUFFIX,
};
use indexify_util::fs::join_path;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Hint for the generated default binding.
const DEFAULT_BINDING_HINT: &str = "cjsDefault";

/// A named-import rewrite that was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CjsRewrite {
    /// Generated default binding.
    pub binding: String,
    /// `(imported, local)` pairs turned into constants.
    pub names: Vec<(String, String)>,
    /// The original statement had only named specifiers and was removed.
    pub removed_statement: bool,
}

/// Rewrite named imports from a CommonJS entry into default import plus constants.
///
/// Runs only when `outcome` rewrote the source or the source already ends in
/// `/index.js`, and only when there are named specifiers.
pub fn rewrite_cjs_named_imports<N: ImportNode + ?Sized>(
    node: &mut N,
    ctx: &RewriteContext<'_>,
    outcome: &RewriteOutcome,
) -> Option<CjsRewrite> {
    let src = node.source()?.to_owned();
    if !outcome.is_rewritten() && !src.ends_with(INDEX_SUFFIX) {
        return None;
    }

    let names: Vec<(String, String)> = node
        .specifiers()
        .iter()
        .filter_map(|spec| match spec {
            ImportSpecifier::Named { imported, local } => Some((imported.clone(), local.clone())),
            _ => None,
        })
        .collect();
    if names.is_empty() {
        return None;
    }

    let entry = entry_path(&src, ctx, outcome)?;
    if !is_commonjs_module(&entry, ctx.boundary, ctx.caches) {
        debug!(entry = %entry.display(), source = %src, "entry is not CommonJS, keeping named imports");
        return None;
    }

    let binding = node.generate_uid(DEFAULT_BINDING_HINT);
    node.insert_default_import_before(&binding, &src);
    for (imported, local) in &names {
        node.insert_const_member_before(local, &binding, imported);
    }
    node.retain_specifiers(&mut |spec: &ImportSpecifier| !spec.is_named());

    let removed_statement = node.specifiers().is_empty();
    if removed_statement {
        node.remove();
    }

    if ctx.options.effective_verbose() {
        info!(
            file = %ctx.filename.display(),
            source = %src,
            binding = %binding,
            count = names.len(),
            "rewrote CommonJS named imports"
        );
    }

    Some(CjsRewrite {
        binding,
        names,
        removed_statement,
    })
}

/// Resolve the file a (possibly rewritten) source points at.
///
/// Directory-looking results get `index.js` appended.
fn entry_path(src: &str, ctx: &RewriteContext<'_>, outcome: &RewriteOutcome) -> Option<PathBuf> {
    let base = match classify_import_source(src) {
        ImportKind::Relative => join_path([ctx.file_dir(), Path::new(src)])?,
        ImportKind::Bare => {
            let spec = parse_bare_specifier(src)?;
            let pkg_dir = outcome.package.as_ref()?.directory.as_deref()?;
            join_path(std::iter::once(pkg_dir).chain(spec.segments().map(Path::new)))?
        }
        ImportKind::Invalid => return None,
    };

    let is_file_like = base
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ext == "js" || ext == "cjs");
    Some(if is_file_like { base } else { base.join(DEFAULT_ENTRY) })
}
