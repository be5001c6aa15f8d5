//! Import statement model.
//!
//! [`ImportNode`] is the mutation surface the rewriters speak. Any syntax-tree
//! host can implement it; [`ImportDeclaration`] is the implementation used by
//! the module transformer, rendering back to source text.

use serde::Serialize;
use std::collections::HashSet;

/// One binding in an import clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ImportSpecifier {
    /// `import local from '...'`
    Default { local: String },
    /// `import * as local from '...'`
    Namespace { local: String },
    /// `import { imported as local } from '...'`
    Named { imported: String, local: String },
}

impl ImportSpecifier {
    #[must_use]
    pub fn named(imported: impl Into<String>, local: impl Into<String>) -> Self {
        Self::Named {
            imported: imported.into(),
            local: local.into(),
        }
    }

    #[must_use]
    pub fn is_named(&self) -> bool {
        matches!(self, Self::Named { .. })
    }

    /// The local binding name.
    #[must_use]
    pub fn local(&self) -> &str {
        match self {
            Self::Default { local } | Self::Namespace { local } | Self::Named { local, .. } => local,
        }
    }
}

/// Mutable view of one import statement.
pub trait ImportNode {
    /// The import source string. `None` when the node has no source.
    fn source(&self) -> Option<&str>;

    /// Replace the import source string.
    fn set_source(&mut self, source: String);

    fn specifiers(&self) -> &[ImportSpecifier];

    /// Keep only the specifiers for which `keep` returns true.
    fn retain_specifiers(&mut self, keep: &mut dyn FnMut(&ImportSpecifier) -> bool);

    /// Insert `import <local> from '<source>'` before this statement.
    fn insert_default_import_before(&mut self, local: &str, source: &str);

    /// Insert `const <local> = <object>.<property>` before this statement.
    fn insert_const_member_before(&mut self, local: &str, object: &str, property: &str);

    /// Remove this statement. Inserted statements stay.
    fn remove(&mut self);

    /// A fresh identifier based on `hint`, unique within the module.
    fn generate_uid(&mut self, hint: &str) -> String;
}

/// Identifiers already taken in a module.
///
/// Generated names follow `_hint`, `_hint2`, `_hint3`, ...
#[derive(Debug, Clone, Default)]
pub struct UidScope {
    taken: HashSet<String>,
}

impl UidScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every identifier-like word in `code`.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        let taken = code
            .split(|c: char| !is_ident_char(c))
            .filter(|word| word.chars().next().is_some_and(is_ident_start))
            .map(str::to_string)
            .collect();
        Self { taken }
    }

    pub fn reserve(&mut self, name: impl Into<String>) {
        self.taken.insert(name.into());
    }

    #[must_use]
    pub fn is_taken(&self, name: &str) -> bool {
        self.taken.contains(name)
    }

    /// Generate and reserve a unique name.
    pub fn generate(&mut self, hint: &str) -> String {
        let cleaned: String = hint.chars().filter(|c| is_ident_char(*c)).collect();
        let base = format!("_{}", cleaned.trim_start_matches('_'));
        let mut name = base.clone();
        let mut counter = 1;
        while self.taken.contains(&name) {
            counter += 1;
            name = format!("{base}{counter}");
        }
        self.taken.insert(name.clone());
        name
    }
}

pub(crate) fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

pub(crate) fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Whether `name` can be written as a bare identifier.
#[must_use]
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_ident_start) && chars.all(is_ident_char)
}

/// A statement inserted before an import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertedStatement {
    DefaultImport { local: String, source: String },
    ConstMember { local: String, object: String, property: String },
}

/// A static import statement.
#[derive(Debug, Clone)]
pub struct ImportDeclaration {
    source: Option<String>,
    specifiers: Vec<ImportSpecifier>,
    quote: char,
    semicolon: bool,
    indent: String,
    inserted_before: Vec<InsertedStatement>,
    removed: bool,
    source_changed: bool,
    specifiers_changed: bool,
    uids: UidScope,
}

impl ImportDeclaration {
    #[must_use]
    pub fn new(source: impl Into<String>, specifiers: Vec<ImportSpecifier>) -> Self {
        Self {
            source: Some(source.into()),
            specifiers,
            quote: '\'',
            semicolon: true,
            indent: String::new(),
            inserted_before: Vec::new(),
            removed: false,
            source_changed: false,
            specifiers_changed: false,
            uids: UidScope::new(),
        }
    }

    /// A declaration with no source, as a malformed host node would present.
    #[must_use]
    pub fn without_source(specifiers: Vec<ImportSpecifier>) -> Self {
        let mut decl = Self::new(String::new(), specifiers);
        decl.source = None;
        decl
    }

    #[must_use]
    pub fn with_quote(mut self, quote: char) -> Self {
        self.quote = quote;
        self
    }

    #[must_use]
    pub fn with_semicolon(mut self, semicolon: bool) -> Self {
        self.semicolon = semicolon;
        self
    }

    #[must_use]
    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }

    /// Use `uids` for generated identifiers.
    #[must_use]
    pub fn with_uid_scope(mut self, uids: UidScope) -> Self {
        self.uids = uids;
        self
    }

    /// Hand back the identifier scope, including names generated here.
    pub fn take_uid_scope(&mut self) -> UidScope {
        std::mem::take(&mut self.uids)
    }

    #[must_use]
    pub fn inserted_before(&self) -> &[InsertedStatement] {
        &self.inserted_before
    }

    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.removed
    }

    #[must_use]
    pub fn source_changed(&self) -> bool {
        self.source_changed
    }

    /// Whether anything beyond the source string changed.
    #[must_use]
    pub fn structure_changed(&self) -> bool {
        self.removed || self.specifiers_changed || !self.inserted_before.is_empty()
    }

    /// Render the statement and everything inserted before it.
    ///
    /// The first line carries no indentation; following lines get the
    /// statement's indentation.
    #[must_use]
    pub fn render(&self) -> String {
        let mut lines: Vec<String> = self
            .inserted_before
            .iter()
            .map(|stmt| self.render_inserted(stmt))
            .collect();
        if !self.removed {
            lines.push(self.render_import());
        }
        lines.join(&format!("\n{}", self.indent))
    }

    fn render_import(&self) -> String {
        let source = self.quoted(self.source.as_deref().unwrap_or_default());
        let end = if self.semicolon { ";" } else { "" };

        let mut parts = Vec::new();
        let mut named = Vec::new();
        for spec in &self.specifiers {
            match spec {
                ImportSpecifier::Default { local } => parts.push(local.clone()),
                ImportSpecifier::Namespace { local } => parts.push(format!("* as {local}")),
                ImportSpecifier::Named { imported, local } => {
                    let imported = if is_identifier(imported) {
                        imported.clone()
                    } else {
                        self.quoted(imported)
                    };
                    if imported == *local {
                        named.push(imported);
                    } else {
                        named.push(format!("{imported} as {local}"));
                    }
                }
            }
        }
        if !named.is_empty() {
            parts.push(format!("{{ {} }}", named.join(", ")));
        }

        if parts.is_empty() {
            format!("import {source}{end}")
        } else {
            format!("import {} from {source}{end}", parts.join(", "))
        }
    }

    fn render_inserted(&self, stmt: &InsertedStatement) -> String {
        let end = if self.semicolon { ";" } else { "" };
        match stmt {
            InsertedStatement::DefaultImport { local, source } => {
                format!("import {local} from {}{end}", self.quoted(source))
            }
            InsertedStatement::ConstMember { local, object, property } => {
                if is_identifier(property) {
                    format!("const {local} = {object}.{property}{end}")
                } else {
                    format!("const {local} = {object}[{}]{end}", self.quoted(property))
                }
            }
        }
    }

    fn quoted(&self, value: &str) -> String {
        let q = self.quote;
        let escaped = value.replace('\\', "\\\\").replace(q, &format!("\\{q}"));
        format!("{q}{escaped}{q}")
    }
}

impl ImportNode for ImportDeclaration {
    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn set_source(&mut self, source: String) {
        if self.source.as_deref() != Some(source.as_str()) {
            self.source = Some(source);
            self.source_changed = true;
        }
    }

    fn specifiers(&self) -> &[ImportSpecifier] {
        &self.specifiers
    }

    fn retain_specifiers(&mut self, keep: &mut dyn FnMut(&ImportSpecifier) -> bool) {
        let before = self.specifiers.len();
        self.specifiers.retain(|s| keep(s));
        if self.specifiers.len() != before {
            self.specifiers_changed = true;
        }
    }

    fn insert_default_import_before(&mut self, local: &str, source: &str) {
        self.inserted_before.push(InsertedStatement::DefaultImport {
            local: local.to_string(),
            source: source.to_string(),
        });
    }

    fn insert_const_member_before(&mut self, local: &str, object: &str, property: &str) {
        self.inserted_before.push(InsertedStatement::ConstMember {
            local: local.to_string(),
            object: object.to_string(),
            property: property.to_string(),
        });
    }

    fn remove(&mut self) {
        self.removed = true;
    }

    fn generate_uid(&mut self, hint: &str) -> String {
        self.uids.generate(hint)
    }
}
