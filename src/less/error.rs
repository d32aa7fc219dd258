//! Compile errors with source locations.

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// What went wrong while compiling a stylesheet.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileErrorKind {
    /// Source file could not be read
    #[error("cannot read file: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed LESS syntax
    #[error("{0}")]
    Syntax(String),
    /// Variable referenced but never defined in any enclosing scope
    #[error("variable @{0} is undefined")]
    UndefinedVariable(String),
    /// Variable whose value eventually refers back to itself
    #[error("recursive variable definition: {}", .0.iter().map(|n| format!("@{}", n)).collect::<Vec<_>>().join(" -> "))]
    CircularVariable(Vec<String>),
    /// Imported file not found on disk
    #[error("import not found: {}", .0.display())]
    ImportNotFound(PathBuf),
    /// File imports one of the files currently importing it
    #[error("circular import: {}", .0.display())]
    CircularImport(PathBuf),
    /// Mixin call with no matching definition
    #[error("mixin {0} is undefined")]
    UndefinedMixin(String),
    /// Mixin that calls itself, directly or through others
    #[error("recursive mixin call: {0}")]
    RecursiveMixin(String),
}

/// Error produced by the compile step.
///
/// Always names the offending file; carries a 1-based line and column when
/// the problem can be pinned to a position.
#[derive(Debug)]
pub struct CompileError {
    /// File containing the error
    pub path: PathBuf,
    /// Line number (1-indexed, None if unknown)
    pub line: Option<usize>,
    /// Column number (1-indexed, None if unknown)
    pub column: Option<usize>,
    /// Error detail
    pub kind: CompileErrorKind,
}

impl CompileError {
    /// Create an error without position information.
    pub fn new(path: impl Into<PathBuf>, kind: CompileErrorKind) -> Self {
        Self { path: path.into(), line: None, column: None, kind }
    }

    /// Create an error at a line/column in `path`.
    pub fn at(path: impl Into<PathBuf>, line: usize, column: usize, kind: CompileErrorKind) -> Self {
        Self { path: path.into(), line: Some(line), column: Some(column), kind }
    }

    /// Shorthand for a syntax error at a position.
    pub fn syntax(path: &Path, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::at(path, line, column, CompileErrorKind::Syntax(message.into()))
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())?;
        if let Some(line) = self.line {
            write!(f, ":{}", line)?;
            if let Some(col) = self.column {
                write!(f, ":{}", col)?;
            }
        }
        write!(f, ": {}", self.kind)
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            CompileErrorKind::Io(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_location() {
        let err = CompileError::syntax(Path::new("a/styles.less"), 3, 7, "missing closing '}'");
        assert_eq!(err.to_string(), "a/styles.less:3:7: missing closing '}'");
    }

    #[test]
    fn test_display_without_location() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = CompileError::new("missing.less", CompileErrorKind::Io(io));
        assert_eq!(err.to_string(), "missing.less: cannot read file: no such file");
    }

    #[test]
    fn test_circular_variable_chain() {
        let kind = CompileErrorKind::CircularVariable(vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(kind.to_string(), "recursive variable definition: @a -> @b -> @a");
    }
}
