//! LESS to CSS compilation
//!
//! Compiles the subset of LESS that documentation stylesheets rely on:
//! variables, nesting with `&`, `@import`, non-parametric mixins, bubbling
//! `@media`/`@supports`, `~"..."` escapes, and simple arithmetic.
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use stylebuild::less::compile_str;
//!
//! let css = compile_str("@gap: 4px;\n.nav { margin: @gap * 2; a { color: red; } }", Path::new("nav.less")).unwrap();
//! assert_eq!(css, ".nav {\n  margin: 8px;\n}\n.nav a {\n  color: red;\n}\n");
//! ```

pub mod error;
pub mod eval;
pub mod import;
pub mod output;
pub mod parser;
pub mod scope;
pub mod selector;
pub mod value;

pub use error::{CompileError, CompileErrorKind};
pub use eval::{Evaluated, Evaluator};
pub use import::ImportResolver;
pub use output::{write_css, CssNode};
pub use parser::{parse, Node, Span};
pub use scope::{Scope, VariableError};
pub use value::evaluate;

use std::path::{Path, PathBuf};

/// Compiled CSS together with the files it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compiled {
    /// Flat CSS text
    pub css: String,
    /// Entry file first, then each imported file in load order
    pub sources: Vec<PathBuf>,
}

/// Compile the LESS file at `path` into CSS text.
pub fn compile_file(path: &Path) -> Result<String, CompileError> {
    compile_file_with_sources(path).map(|compiled| compiled.css)
}

/// Compile the LESS file at `path`, also reporting every file it imported.
pub fn compile_file_with_sources(path: &Path) -> Result<Compiled, CompileError> {
    let mut resolver = ImportResolver::new();
    let nodes = resolver.load_entry(path)?;
    let sources = resolver.files().to_vec();
    let css = finish(resolver, &nodes)?;
    Ok(Compiled { css, sources })
}

/// Compile LESS source text; `path` anchors relative imports and errors.
pub fn compile_str(source: &str, path: &Path) -> Result<String, CompileError> {
    let mut resolver = ImportResolver::new();
    let nodes = resolver.load_source(source, path)?;
    finish(resolver, &nodes)
}

fn finish(resolver: ImportResolver, nodes: &[Node]) -> Result<String, CompileError> {
    let files = resolver.into_files();
    let evaluated = Evaluator::new(&files).evaluate(nodes)?;
    Ok(write_css(&evaluated.hoisted, &evaluated.nodes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn compile(source: &str) -> String {
        compile_str(source, Path::new("test.less")).unwrap()
    }

    fn compile_err(source: &str) -> CompileError {
        compile_str(source, Path::new("test.less")).unwrap_err()
    }

    #[test]
    fn test_plain_css_passes_through() {
        assert_eq!(compile(".box { color: red; }"), ".box {\n  color: red;\n}\n");
    }

    #[test]
    fn test_variables() {
        let css = compile("@brand: #428bca;\n.link { color: @brand; border: 1px solid @brand; }");
        assert_eq!(css, ".link {\n  color: #428bca;\n  border: 1px solid #428bca;\n}\n");
    }

    #[test]
    fn test_block_scoped_variables() {
        let css = compile("@c: red;\n.a { @c: blue; color: @c; }\n.b { color: @c; }");
        assert_eq!(css, ".a {\n  color: blue;\n}\n.b {\n  color: red;\n}\n");
    }

    #[test]
    fn test_nesting_and_parent_selector() {
        let css = compile(".btn { padding: 0; &:hover { color: red; } &-lg { padding: 1px; } .icon { x: y; } }");
        assert_eq!(
            css,
            ".btn {\n  padding: 0;\n}\n.btn:hover {\n  color: red;\n}\n.btn-lg {\n  padding: 1px;\n}\n.btn .icon {\n  x: y;\n}\n"
        );
    }

    #[test]
    fn test_parent_declarations_after_nested_rule() {
        let css = compile(".a { .b { x: 1; } y: 2; }");
        assert_eq!(css, ".a {\n  y: 2;\n}\n.a .b {\n  x: 1;\n}\n");
    }

    #[test]
    fn test_media_bubbles() {
        let css = compile(".col { width: 100%; @media (min-width: 768px) { width: 50%; } }");
        assert_eq!(
            css,
            ".col {\n  width: 100%;\n}\n@media (min-width: 768px) {\n  .col {\n    width: 50%;\n  }\n}\n"
        );
    }

    #[test]
    fn test_nested_media_combines() {
        let css = compile("@media screen { .a { @media (min-width: 1px) { b: c; } } }");
        assert!(css.contains("@media screen and (min-width: 1px) {\n  .a {\n    b: c;\n  }\n}"));
    }

    #[test]
    fn test_media_prelude_variables() {
        let css = compile("@tablet: 768px;\n@media (min-width: @tablet) { .a { b: c; } }");
        assert!(css.starts_with("@media (min-width: 768px) {"));
    }

    #[test]
    fn test_font_face_and_keyframes() {
        let css = compile("@font-face { font-family: Lato; }\n@keyframes spin { from { transform: rotate(0deg); } to { transform: rotate(360deg); } }");
        assert_eq!(
            css,
            "@font-face {\n  font-family: Lato;\n}\n@keyframes spin {\n  from {\n    transform: rotate(0deg);\n  }\n  to {\n    transform: rotate(360deg);\n  }\n}\n"
        );
    }

    #[test]
    fn test_mixins() {
        let css = compile(".rounded() { border-radius: 4px; }\n.bordered { border: 1px solid; }\n.card { .rounded(); .bordered; }");
        assert_eq!(
            css,
            ".bordered {\n  border: 1px solid;\n}\n.card {\n  border-radius: 4px;\n  border: 1px solid;\n}\n"
        );
    }

    #[test]
    fn test_mixin_with_nested_rule() {
        let css = compile(".hoverable() { &:hover { color: red; } }\n.a { .hoverable; }");
        assert_eq!(css, ".a:hover {\n  color: red;\n}\n");
    }

    #[test]
    fn test_operations_and_escapes() {
        let css = compile("@base: 10px;\n.a { padding: @base * 2 (@base / 2); filter: ~\"alpha(opacity=50)\"; }");
        assert_eq!(css, ".a {\n  padding: 20px 5px;\n  filter: alpha(opacity=50);\n}\n");
    }

    #[test]
    fn test_interpolation() {
        let css = compile("@name: banner; @prop: color;\n.@{name} { background-@{prop}: red; }");
        assert_eq!(css, ".banner {\n  background-color: red;\n}\n");
    }

    #[test]
    fn test_important_and_charset_hoisted() {
        let css = compile(".a { color: red!important; }\n@charset \"UTF-8\";\n@import url(reset.css);");
        assert_eq!(css, "@charset \"UTF-8\";\n@import url(reset.css);\n.a {\n  color: red !important;\n}\n");
    }

    #[test]
    fn test_undefined_variable_location() {
        let err = compile_err(".a {\n  color: @missing;\n}");
        assert!(matches!(err.kind, CompileErrorKind::UndefinedVariable(ref name) if name == "missing"));
        assert_eq!((err.line, err.column), (Some(2), Some(3)));
    }

    #[test]
    fn test_circular_variable() {
        let err = compile_err("@a: @b;\n@b: @a;\n.x { y: @a; }");
        assert!(matches!(err.kind, CompileErrorKind::CircularVariable(_)));
    }

    #[test]
    fn test_undefined_and_recursive_mixins() {
        assert!(matches!(compile_err(".a { .nope; }").kind, CompileErrorKind::UndefinedMixin(_)));
        assert!(matches!(compile_err(".a { .a; }").kind, CompileErrorKind::RecursiveMixin(_)));
    }

    #[test]
    fn test_parametric_mixin_rejected() {
        let err = compile_err(".size(@w) { width: @w; }");
        assert!(err.to_string().contains("parametric mixins are not supported"));
    }

    #[test]
    fn test_top_level_declaration_rejected() {
        let err = compile_err("color: red;");
        assert!(err.to_string().contains("properties must be inside selector blocks"));
    }

    #[test]
    fn test_unbalanced_braces() {
        let err = compile_err(".box { color: red;");
        assert!(matches!(err.kind, CompileErrorKind::Syntax(_)));
        assert_eq!(err.path, Path::new("test.less"));
    }

    #[test]
    fn test_compile_file_with_imports() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("less")).unwrap();
        fs::write(temp.path().join("less/variables.less"), "@text: #333;").unwrap();
        fs::write(temp.path().join("less/styles.less"), "@import \"variables\";\nbody { color: @text; }").unwrap();

        let css = compile_file(&temp.path().join("less/styles.less")).unwrap();
        assert_eq!(css, "body {\n  color: #333;\n}\n");
    }

    #[test]
    fn test_sources_include_imports_outside_entry_dir() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("less")).unwrap();
        fs::create_dir_all(temp.path().join("shared")).unwrap();
        fs::write(temp.path().join("shared/vars.less"), "@text: #333;").unwrap();
        fs::write(temp.path().join("less/styles.less"), "@import \"../shared/vars\";\nbody { color: @text; }").unwrap();

        let compiled = compile_file_with_sources(&temp.path().join("less/styles.less")).unwrap();
        assert_eq!(compiled.css, "body {\n  color: #333;\n}\n");
        assert_eq!(compiled.sources.len(), 2);
        assert!(compiled.sources[1].ends_with("vars.less"));
    }

    #[test]
    fn test_error_in_imported_file_names_that_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("broken.less"), ".a {\n  color: @nope;\n}").unwrap();
        fs::write(temp.path().join("styles.less"), "@import \"broken\";").unwrap();

        let err = compile_file(&temp.path().join("styles.less")).unwrap_err();
        assert_eq!(err.path, temp.path().join("broken.less"));
        assert_eq!(err.line, Some(2));
    }

    #[test]
    fn test_deterministic() {
        let source = "@a: 1px;\n.x { .y { m: @a; } @media print { n: 2; } }";
        assert_eq!(compile(source), compile(source));
    }
}
