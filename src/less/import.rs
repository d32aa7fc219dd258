//! `@import` resolution
//!
//! LESS imports are inlined where they appear, so the imported file shares
//! the importing block's scope. Paths resolve relative to the importing
//! file's directory; `.less` is tried when the path has no such extension.
//!
//! Each file is imported once unless the `(multiple)` option is given. A file
//! that imports one of the files currently importing it is an error. Plain
//! CSS imports (`.css` paths, `url(...)`, remote URLs, or the `(css)` option)
//! stay as `@import` statements in the output.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::{CompileError, CompileErrorKind};
use super::parser::{parse, Node, Span};

/// Options accepted in `@import (option, ...) "path";`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Treat the file as CSS regardless of extension
    pub css: bool,
    /// Treat the file as LESS regardless of extension
    pub less: bool,
    /// Allow importing the same file more than once
    pub multiple: bool,
    /// Skip silently when the file does not exist
    pub optional: bool,
}

/// What an `@import` statement refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportTarget {
    /// A LESS file to inline
    Less { path: String, options: ImportOptions },
    /// A CSS import kept in the output, stored without the `@import`
    Css(String),
}

/// Parse the text after `@import`.
pub fn parse_import(prelude: &str) -> Result<ImportTarget, String> {
    let mut options = ImportOptions::default();
    let mut rest = prelude.trim();

    if let Some(after) = rest.strip_prefix('(') {
        let close = after.find(')').ok_or("unclosed import options")?;
        for option in after[..close].split(',').map(str::trim).filter(|o| !o.is_empty()) {
            match option {
                "css" => options.css = true,
                "less" => options.less = true,
                "once" => options.multiple = false,
                "multiple" => options.multiple = true,
                "optional" => options.optional = true,
                other => return Err(format!("unsupported import option '{}'", other)),
            }
        }
        rest = after[close + 1..].trim_start();
    }

    if rest.starts_with("url(") {
        return Ok(ImportTarget::Css(rest.to_string()));
    }

    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'').ok_or("expected a quoted import path")?;
    let close = rest[1..].find(quote).ok_or("unterminated import path")? + 1;
    let path = &rest[1..close];
    let media = rest[close + 1..].trim();

    if path.contains("@{") {
        return Err("variable interpolation in import paths is not supported".to_string());
    }

    let remote = path.starts_with("http://") || path.starts_with("https://") || path.starts_with("//");
    let is_css = options.css || (!options.less && (path.ends_with(".css") || remote));

    if is_css {
        return Ok(ImportTarget::Css(rest.to_string()));
    }
    if !media.is_empty() {
        return Err("media queries on LESS imports are not supported".to_string());
    }

    Ok(ImportTarget::Less { path: path.to_string(), options })
}

/// Loads an entry file and inlines its imports.
///
/// Keeps the table of every file read, indexed by [`Span::file`].
#[derive(Debug, Default)]
pub struct ImportResolver {
    files: Vec<PathBuf>,
    stack: Vec<PathBuf>,
    imported: HashSet<PathBuf>,
}

impl ImportResolver {
    /// Create a resolver with an empty file table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Files read so far, in the order they were first loaded.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Consume the resolver, returning its file table.
    pub fn into_files(self) -> Vec<PathBuf> {
        self.files
    }

    /// Read, parse, and expand the entry stylesheet.
    pub fn load_entry(&mut self, path: &Path) -> Result<Vec<Node>, CompileError> {
        let source = fs::read_to_string(path)
            .map_err(|e| CompileError::new(path, CompileErrorKind::Io(e)))?;
        self.load_source(&source, path)
    }

    /// Parse and expand source text as if read from `path`.
    pub fn load_source(&mut self, source: &str, path: &Path) -> Result<Vec<Node>, CompileError> {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        self.imported.insert(canonical.clone());
        self.load(source, path, canonical)
    }

    fn load(&mut self, source: &str, path: &Path, canonical: PathBuf) -> Result<Vec<Node>, CompileError> {
        let file = self.files.len();
        self.files.push(path.to_path_buf());

        let nodes = parse(source, file, path)?;
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        self.stack.push(canonical);
        let expanded = self.expand(nodes, &dir);
        self.stack.pop();
        expanded
    }

    fn expand(&mut self, nodes: Vec<Node>, dir: &Path) -> Result<Vec<Node>, CompileError> {
        let mut out = Vec::with_capacity(nodes.len());

        for node in nodes {
            match node {
                Node::Import { prelude, span } => {
                    let target = parse_import(&prelude).map_err(|message| self.error(span, CompileErrorKind::Syntax(message)))?;
                    match target {
                        ImportTarget::Css(prelude) => {
                            out.push(Node::AtRule { name: "import".to_string(), prelude, body: None, span });
                        }
                        ImportTarget::Less { path, options } => {
                            out.extend(self.import(&path, options, dir, span)?);
                        }
                    }
                }
                Node::Rule { selector, body, span } => {
                    let body = self.expand(body, dir)?;
                    out.push(Node::Rule { selector, body, span });
                }
                Node::AtRule { name, prelude, body: Some(body), span } => {
                    let body = self.expand(body, dir)?;
                    out.push(Node::AtRule { name, prelude, body: Some(body), span });
                }
                other => out.push(other),
            }
        }

        Ok(out)
    }

    fn import(
        &mut self,
        target: &str,
        options: ImportOptions,
        dir: &Path,
        span: Span,
    ) -> Result<Vec<Node>, CompileError> {
        let requested = dir.join(target);
        let Some(found) = resolve_path_with_extension(&requested) else {
            if options.optional {
                return Ok(Vec::new());
            }
            return Err(self.error(span, CompileErrorKind::ImportNotFound(requested)));
        };

        let canonical = found.canonicalize().unwrap_or_else(|_| found.clone());

        if self.stack.contains(&canonical) {
            return Err(self.error(span, CompileErrorKind::CircularImport(found)));
        }
        if !self.imported.insert(canonical.clone()) && !options.multiple {
            return Ok(Vec::new());
        }

        let source = fs::read_to_string(&found)
            .map_err(|e| CompileError::new(&found, CompileErrorKind::Io(e)))?;
        self.load(&source, &found, canonical)
    }

    fn error(&self, span: Span, kind: CompileErrorKind) -> CompileError {
        CompileError::at(&self.files[span.file], span.line, span.column, kind)
    }
}

/// Resolve an import path, trying `.less` if the exact path doesn't exist.
fn resolve_path_with_extension(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }

    if path.extension().is_some_and(|ext| ext == "less") {
        return None;
    }

    let mut alternate = path.as_os_str().to_owned();
    alternate.push(".less");
    let alternate = PathBuf::from(alternate);
    alternate.is_file().then_some(alternate)
}
