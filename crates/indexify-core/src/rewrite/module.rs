//! Module-source transformer.
//!
//! Scans JavaScript/TypeScript source for static `import` declarations, runs
//! each through [`rewrite_import`] and [`rewrite_cjs_named_imports`] in
//! declaration order, and splices the results back:
//! - untouched statements keep their exact text
//! - a source-only rewrite replaces just the string literal
//! - a structural rewrite re-renders the statement with its quote style and indentation
//!
//! `import type`, inline `type` specifiers, import attributes, dynamic
//! `import()`, and `import.meta` are left verbatim.

use super::cjs::{rewrite_cjs_named_imports, CjsRewrite};
use super::import::{rewrite_import, RewriteContext, RewriteDecision};
use super::node::{is_ident_char, is_ident_start, ImportDeclaration, ImportNode, ImportSpecifier, UidScope};
use crate::scenario::Scenario;
use serde::Serialize;
use std::path::Path;

/// What happened to one import statement.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    /// 1-based line of the `import` keyword.
    pub line: usize,
    /// Source as written before the transform.
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<Scenario>,
    pub decision: RewriteDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cjs: Option<CjsRewrite>,
}

/// Result of transforming one module.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleTransform {
    pub code: String,
    pub changed: bool,
    pub imports: Vec<ImportReport>,
}

/// Transform every static import in `code`, which was read from `filename`.
#[must_use]
pub fn transform_module(code: &str, filename: &Path, ctx: &RewriteContext<'_>) -> ModuleTransform {
    let ctx = ctx.for_file(filename);
    let mut out = String::with_capacity(code.len() + 64);
    let mut imports = Vec::new();
    let mut uids = UidScope::from_code(code);
    let mut last = 0;

    for parsed in find_imports(code) {
        let mut decl = ImportDeclaration::new(parsed.source.clone(), parsed.specifiers)
            .with_quote(parsed.quote)
            .with_semicolon(parsed.semicolon)
            .with_indent(line_indent(code, parsed.start))
            .with_uid_scope(std::mem::take(&mut uids));

        let outcome = rewrite_import(&mut decl, &ctx);
        let cjs = rewrite_cjs_named_imports(&mut decl, &ctx, &outcome);
        uids = decl.take_uid_scope();

        out.push_str(&code[last..parsed.start]);
        if decl.structure_changed() {
            out.push_str(&decl.render());
        } else if decl.source_changed() {
            out.push_str(&code[parsed.start..parsed.source_start]);
            out.push_str(decl.source().unwrap_or_default());
            out.push_str(&code[parsed.source_end..parsed.end]);
        } else {
            out.push_str(&code[parsed.start..parsed.end]);
        }
        last = parsed.end;

        imports.push(ImportReport {
            line: line_number(code, parsed.start),
            source: parsed.source,
            scenario: outcome.scenario,
            decision: outcome.decision,
            cjs,
        });
    }
    out.push_str(&code[last..]);

    let changed = out != code;
    ModuleTransform {
        code: out,
        changed,
        imports,
    }
}

/// A parsed static import statement.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ParsedImport {
    /// Offset of the `import` keyword.
    start: usize,
    /// Offset just past the statement, including any semicolon.
    end: usize,
    /// Offsets of the source text between the quotes.
    source_start: usize,
    source_end: usize,
    source: String,
    quote: char,
    specifiers: Vec<ImportSpecifier>,
    semicolon: bool,
}

/// Find top-level static import declarations, skipping strings, comments, and templates.
fn find_imports(code: &str) -> Vec<ParsedImport> {
    let bytes = code.as_bytes();
    let mut found = Vec::new();
    let mut depth = 0usize;
    let mut templates: Vec<usize> = Vec::new();
    let mut at_statement_start = true;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                i = code[i..].find('\n').map_or(bytes.len(), |n| i + n);
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = code[i + 2..].find("*/").map_or(bytes.len(), |n| i + 2 + n + 2);
            }
            quote @ (b'\'' | b'"') => {
                i = skip_string(bytes, i + 1, quote);
                at_statement_start = false;
            }
            b'`' => {
                let (next, opened_expr) = skip_template_chunk(bytes, i + 1);
                if opened_expr {
                    templates.push(depth);
                    depth += 1;
                }
                i = next;
                at_statement_start = false;
            }
            b'{' => {
                depth += 1;
                i += 1;
                at_statement_start = true;
            }
            b'}' => {
                depth = depth.saturating_sub(1);
                i += 1;
                if templates.last() == Some(&depth) {
                    templates.pop();
                    let (next, opened_expr) = skip_template_chunk(bytes, i);
                    if opened_expr {
                        templates.push(depth);
                        depth += 1;
                    }
                    i = next;
                    at_statement_start = false;
                } else {
                    at_statement_start = true;
                }
            }
            b'\n' | b';' => {
                i += 1;
                at_statement_start = true;
            }
            b' ' | b'\t' | b'\r' => i += 1,
            b'i' if depth == 0 && at_statement_start && code[i..].starts_with("import") => {
                if let Some(parsed) = parse_import_at(code, i) {
                    i = parsed.end;
                    found.push(parsed);
                } else {
                    i += "import".len();
                }
                at_statement_start = false;
            }
            _ => {
                // Skip whole words so `reimport` never matches
                let start = i;
                let rest = &code[i..];
                let word_len: usize = rest
                    .chars()
                    .take_while(|c| is_ident_char(*c))
                    .map(char::len_utf8)
                    .sum();
                i += if word_len > 0 {
                    word_len
                } else {
                    rest.chars().next().map_or(1, char::len_utf8)
                };
                debug_assert!(i > start);
                at_statement_start = false;
            }
        }
    }
    found
}

/// Offset just past the closing quote.
fn skip_string(bytes: &[u8], mut i: usize, quote: u8) -> usize {
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return i,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Scan template text. Returns the offset after the closing backtick, or
/// after `${` with `true` when an expression opens.
fn skip_template_chunk(bytes: &[u8], mut i: usize) -> (usize, bool) {
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'`' => return (i + 1, false),
            b'$' if bytes.get(i + 1) == Some(&b'{') => return (i + 2, true),
            _ => i += 1,
        }
    }
    (bytes.len(), false)
}

fn parse_import_at(code: &str, start: usize) -> Option<ParsedImport> {
    let mut c = Cursor { code, pos: start };
    if !c.eat_keyword("import") {
        return None;
    }
    c.skip_trivia();

    let mut specifiers = Vec::new();
    let (source, source_start, source_end, quote) = match c.peek()? {
        '\'' | '"' => c.string()?,
        '(' | '.' => return None,
        _ => {
            if c.at_keyword("type") && !is_type_binding(&c) {
                return None;
            }
            parse_clause(&mut c, &mut specifiers)?;
            c.skip_trivia();
            if !c.eat_keyword("from") {
                return None;
            }
            c.skip_trivia();
            c.string()?
        }
    };

    let after_source = c.pos;
    c.skip_inline_space();
    if c.at_keyword("with") || c.at_keyword("assert") {
        return None;
    }
    let semicolon = c.eat(';');
    let end = if semicolon { c.pos } else { after_source };

    Some(ParsedImport {
        start,
        end,
        source_start,
        source_end,
        source,
        quote,
        specifiers,
        semicolon,
    })
}

/// `import type from 'x'` and `import type, { a } from 'x'` bind a default named `type`.
fn is_type_binding(c: &Cursor<'_>) -> bool {
    let mut probe = Cursor { code: c.code, pos: c.pos };
    probe.eat_keyword("type");
    probe.skip_trivia();
    probe.peek() == Some(',') || probe.at_keyword("from") && {
        probe.eat_keyword("from");
        probe.skip_trivia();
        matches!(probe.peek(), Some('\'' | '"'))
    }
}

fn parse_clause(c: &mut Cursor<'_>, specifiers: &mut Vec<ImportSpecifier>) -> Option<()> {
    if c.peek().is_some_and(is_ident_start) {
        let local = c.ident()?;
        specifiers.push(ImportSpecifier::Default { local });
        c.skip_trivia();
        if !c.eat(',') {
            return Some(());
        }
        c.skip_trivia();
    }

    match c.peek()? {
        '*' => {
            c.eat('*');
            c.skip_trivia();
            if !c.eat_keyword("as") {
                return None;
            }
            c.skip_trivia();
            let local = c.ident()?;
            specifiers.push(ImportSpecifier::Namespace { local });
            Some(())
        }
        '{' => parse_named(c, specifiers),
        _ => None,
    }
}

fn parse_named(c: &mut Cursor<'_>, specifiers: &mut Vec<ImportSpecifier>) -> Option<()> {
    c.eat('{');
    loop {
        c.skip_trivia();
        if c.eat('}') {
            return Some(());
        }

        if c.at_keyword("type") {
            let mut probe = Cursor { code: c.code, pos: c.pos };
            probe.eat_keyword("type");
            probe.skip_trivia();
            if probe.peek().is_some_and(is_ident_start) && !probe.at_keyword("as") {
                return None;
            }
        }

        let (imported, is_string) = match c.peek()? {
            '\'' | '"' => (c.string()?.0, true),
            _ => (c.ident()?, false),
        };
        c.skip_trivia();
        let local = if c.eat_keyword("as") {
            c.skip_trivia();
            c.ident()?
        } else if is_string {
            return None;
        } else {
            imported.clone()
        };
        specifiers.push(ImportSpecifier::Named { imported, local });

        c.skip_trivia();
        if c.eat(',') {
            continue;
        }
        return c.eat('}').then_some(());
    }
}

struct Cursor<'a> {
    code: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn rest(&self) -> &'a str {
        &self.code[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn eat(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.pos += ch.len_utf8();
            true
        } else {
            false
        }
    }

    fn at_keyword(&self, word: &str) -> bool {
        let rest = self.rest();
        rest.starts_with(word) && !rest[word.len()..].chars().next().is_some_and(is_ident_char)
    }

    fn eat_keyword(&mut self, word: &str) -> bool {
        if self.at_keyword(word) {
            self.pos += word.len();
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Option<String> {
        let rest = self.rest();
        if !rest.chars().next().is_some_and(is_ident_start) {
            return None;
        }
        let len: usize = rest
            .chars()
            .take_while(|c| is_ident_char(*c))
            .map(char::len_utf8)
            .sum();
        let word = rest[..len].to_string();
        self.pos += len;
        Some(word)
    }

    /// A single-line string literal without escapes: `(value, start, end, quote)`.
    fn string(&mut self) -> Option<(String, usize, usize, char)> {
        let quote = self.peek().filter(|q| matches!(q, '\'' | '"'))?;
        let start = self.pos + 1;
        let len = self.code[start..].find(|ch: char| ch == quote || ch == '\\' || ch == '\n')?;
        let end = start + len;
        if !self.code[end..].starts_with(quote) {
            return None;
        }
        self.pos = end + 1;
        Some((self.code[start..end].to_string(), start, end, quote))
    }

    fn skip_inline_space(&mut self) {
        let len = self.rest().len() - self.rest().trim_start_matches(|c| c == ' ' || c == '\t').len();
        self.pos += len;
    }

    /// Skip whitespace and comments.
    fn skip_trivia(&mut self) {
        loop {
            let rest = self.rest();
            let trimmed = rest.trim_start();
            self.pos += rest.len() - trimmed.len();
            if trimmed.starts_with("//") {
                self.pos += trimmed.find('\n').unwrap_or(trimmed.len());
            } else if trimmed.starts_with("/*") {
                match trimmed[2..].find("*/") {
                    Some(n) => self.pos += n + 4,
                    None => self.pos = self.code.len(),
                }
            } else {
                return;
            }
        }
    }
}

fn line_indent(code: &str, pos: usize) -> String {
    let line_start = code[..pos].rfind('\n').map_or(0, |n| n + 1);
    let prefix = &code[line_start..pos];
    if prefix.chars().all(|c| c == ' ' || c == '\t') {
        prefix.to_string()
    } else {
        String::new()
    }
}

fn line_number(code: &str, pos: usize) -> usize {
    code[..pos].bytes().filter(|b| *b == b'\n').count() + 1
}
