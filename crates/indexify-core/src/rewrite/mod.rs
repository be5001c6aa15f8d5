//! Import rewriting.
//!
//! - `node`: the [`ImportNode`] mutation surface and the concrete statement model
//! - `import`: the rewrite applier
//! - `cjs`: the CommonJS named-import rewriter
//! - `module`: whole-module transform over source text

pub mod cjs;
pub mod import;
pub mod module;
pub mod node;

pub use cjs::{rewrite_cjs_named_imports, CjsRewrite};
pub use import::{rewrite_import, RewriteContext, RewriteDecision, RewriteOutcome};
pub use module::{transform_module, ImportReport, ModuleTransform};
pub use node::{is_identifier, ImportDeclaration, ImportNode, ImportSpecifier, InsertedStatement, UidScope};
