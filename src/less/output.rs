//! Flat CSS tree produced by evaluation, and its text form.

use std::fmt::Write;

/// A node of compiled CSS.
#[derive(Debug, Clone, PartialEq)]
pub enum CssNode {
    /// `selectors { declarations }`; no selectors means bare declarations
    /// inside an at-rule such as `@font-face`
    Rule { selectors: Vec<String>, declarations: Vec<String> },
    /// `@name prelude { ... }`
    Block { at: String, declarations: Vec<String>, children: Vec<CssNode> },
    /// `@name prelude;`
    Statement(String),
}

impl CssNode {
    /// Whether writing this node would produce no output.
    pub fn is_empty(&self) -> bool {
        match self {
            CssNode::Rule { declarations, .. } => declarations.is_empty(),
            CssNode::Block { declarations, children, .. } => {
                declarations.is_empty() && children.iter().all(CssNode::is_empty)
            }
            CssNode::Statement(_) => false,
        }
    }
}

const INDENT: &str = "  ";

/// Write hoisted statements followed by the compiled nodes.
pub fn write_css(hoisted: &[String], nodes: &[CssNode]) -> String {
    let mut out = String::new();
    for statement in hoisted {
        out.push_str(statement);
        out.push('\n');
    }
    for node in nodes {
        write_node(&mut out, node, 0);
    }
    out
}

fn write_node(out: &mut String, node: &CssNode, depth: usize) {
    if node.is_empty() {
        return;
    }

    let indent = INDENT.repeat(depth);
    match node {
        CssNode::Rule { selectors, declarations } => {
            if selectors.is_empty() {
                write_declarations(out, declarations, depth);
                return;
            }
            let separator = format!(",\n{}", indent);
            let _ = writeln!(out, "{}{} {{", indent, selectors.join(&separator));
            write_declarations(out, declarations, depth + 1);
            let _ = writeln!(out, "{}}}", indent);
        }
        CssNode::Block { at, declarations, children } => {
            let _ = writeln!(out, "{}{} {{", indent, at);
            write_declarations(out, declarations, depth + 1);
            for child in children {
                write_node(out, child, depth + 1);
            }
            let _ = writeln!(out, "{}}}", indent);
        }
        CssNode::Statement(statement) => {
            let _ = writeln!(out, "{}{}", indent, statement);
        }
    }
}

fn write_declarations(out: &mut String, declarations: &[String], depth: usize) {
    let indent = INDENT.repeat(depth);
    for declaration in declarations {
        let _ = writeln!(out, "{}{};", indent, declaration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(selectors: &[&str], declarations: &[&str]) -> CssNode {
        CssNode::Rule {
            selectors: selectors.iter().map(|s| s.to_string()).collect(),
            declarations: declarations.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_write_rule() {
        let css = write_css(&[], &[rule(&[".a", ".b"], &["color: red", "margin: 0"])]);
        assert_eq!(css, ".a,\n.b {\n  color: red;\n  margin: 0;\n}\n");
    }

    #[test]
    fn test_empty_rules_skipped() {
        let css = write_css(&[], &[rule(&[".empty"], &[]), rule(&[".a"], &["b: c"])]);
        assert_eq!(css, ".a {\n  b: c;\n}\n");
    }

    #[test]
    fn test_write_nested_block() {
        let media = CssNode::Block {
            at: "@media print".to_string(),
            declarations: vec![],
            children: vec![rule(&[".a"], &["color: black"])],
        };
        let css = write_css(&["@charset \"UTF-8\";".to_string()], &[media]);
        assert_eq!(css, "@charset \"UTF-8\";\n@media print {\n  .a {\n    color: black;\n  }\n}\n");
    }

    #[test]
    fn test_block_with_bare_declarations() {
        let font = CssNode::Block {
            at: "@font-face".to_string(),
            declarations: vec!["font-family: Lato".to_string()],
            children: vec![],
        };
        assert_eq!(write_css(&[], &[font]), "@font-face {\n  font-family: Lato;\n}\n");
    }

    #[test]
    fn test_empty_block_skipped() {
        let media = CssNode::Block {
            at: "@media print".to_string(),
            declarations: vec![],
            children: vec![rule(&[".a"], &[])],
        };
        assert!(media.is_empty());
        assert_eq!(write_css(&[], &[media]), "");
    }
}
