//! Lexical scopes for LESS variables and mixins
//!
//! Every block opens a [`Frame`] holding the variables and mixin-able rules
//! declared directly inside it. Variables are lazy: the last definition in a
//! frame wins, a variable may be used before it is defined, and its value is
//! only resolved when referenced. Lookups walk from the innermost frame
//! outward.
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use stylebuild::less::{parse, Scope};
//!
//! let nodes = parse("@primary: red; @accent: @primary;", 0, Path::new("a.less")).unwrap();
//! let mut scope = Scope::new();
//! scope.push(&nodes);
//!
//! assert_eq!(scope.resolve_var("accent").unwrap(), "red");
//! assert_eq!(scope.substitute("1px solid @accent").unwrap(), "1px solid red");
//! ```

use std::collections::HashMap;
use std::fmt;

use super::parser::{Node, Span};
use super::selector::{callable_name, split_selector_list};
use super::value::evaluate;

/// Error type for variable resolution failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableError {
    /// Variable is not defined in any enclosing scope
    Undefined(String),
    /// Circular dependency detected in variable resolution
    Circular(Vec<String>),
    /// Maximum recursion depth exceeded
    MaxDepthExceeded,
}

impl fmt::Display for VariableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableError::Undefined(name) => write!(f, "variable @{} is undefined", name),
            VariableError::Circular(chain) => {
                write!(f, "recursive variable definition: @{}", chain.join(" -> @"))
            }
            VariableError::MaxDepthExceeded => {
                write!(f, "maximum variable resolution depth exceeded")
            }
        }
    }
}

impl std::error::Error for VariableError {}

/// Maximum depth for variable resolution to prevent stack overflow
const MAX_RESOLUTION_DEPTH: usize = 100;

/// A variable definition borrowed from the parsed tree.
#[derive(Debug, Clone, Copy)]
pub struct VarDef<'n> {
    /// Raw value, may reference other variables
    pub value: &'n str,
    /// Where the definition appears
    pub span: Span,
}

/// Definitions declared directly inside one block.
#[derive(Debug, Default)]
pub struct Frame<'n> {
    vars: HashMap<&'n str, VarDef<'n>>,
    mixins: HashMap<String, Vec<&'n Node>>,
}

impl<'n> Frame<'n> {
    fn collect(body: &'n [Node]) -> Self {
        let mut frame = Frame::default();
        for node in body {
            match node {
                Node::Variable { name, value, span } => {
                    frame.vars.insert(name.as_str(), VarDef { value: value.as_str(), span: *span });
                }
                Node::Rule { selector, .. } => {
                    for part in split_selector_list(selector) {
                        if let Some(name) = callable_name(&part) {
                            frame.mixins.entry(name.to_string()).or_default().push(node);
                        }
                    }
                }
                _ => {}
            }
        }
        frame
    }
}

/// Stack of frames from the stylesheet root to the block being evaluated.
#[derive(Debug, Default)]
pub struct Scope<'n> {
    frames: Vec<Frame<'n>>,
}

impl<'n> Scope<'n> {
    /// Create an empty scope stack.
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Open a frame for the definitions in `body`.
    pub fn push(&mut self, body: &'n [Node]) {
        self.frames.push(Frame::collect(body));
    }

    /// Close the innermost frame.
    pub fn pop(&mut self) {
        self.frames.pop();
    }

    /// Find the innermost definition of a variable.
    pub fn lookup(&self, name: &str) -> Option<VarDef<'n>> {
        self.lookup_within(name, self.frames.len()).map(|(_, def)| def)
    }

    /// Rules callable as `selector;` from the current block.
    ///
    /// Returns every definition from the nearest frame that has one.
    pub fn mixins(&self, selector: &str) -> Option<&[&'n Node]> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.mixins.get(selector))
            .map(Vec::as_slice)
    }

    /// Resolve a variable by name (without the `@`).
    pub fn resolve_var(&self, name: &str) -> Result<String, VariableError> {
        let mut chain = Vec::new();
        self.resolve_within(name, self.frames.len(), &mut chain)
    }

    /// Replace every variable reference in a value.
    ///
    /// Handles `@name`, `@@name` (variable named by another variable's value),
    /// and `@{name}` (also inside quoted strings, with quotes stripped from the
    /// substituted value).
    pub fn substitute(&self, text: &str) -> Result<String, VariableError> {
        let mut chain = Vec::new();
        self.substitute_within(text, self.frames.len(), &mut chain)
    }

    /// Replace only `@{name}` interpolations, as used in selectors and
    /// property names.
    pub fn interpolate(&self, text: &str) -> Result<String, VariableError> {
        if !text.contains("@{") {
            return Ok(text.to_string());
        }

        let mut result = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find("@{") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                result.push_str(&rest[start..]);
                return Ok(result);
            };
            let value = self.resolve_var(&after[..end])?;
            result.push_str(unquote(&value));
            rest = &after[end + 1..];
        }
        result.push_str(rest);
        Ok(result)
    }

    fn lookup_within(&self, name: &str, limit: usize) -> Option<(usize, VarDef<'n>)> {
        self.frames[..limit]
            .iter()
            .enumerate()
            .rev()
            .find_map(|(index, frame)| frame.vars.get(name).map(|def| (index, *def)))
    }

    fn resolve_within(
        &self,
        name: &str,
        limit: usize,
        chain: &mut Vec<String>,
    ) -> Result<String, VariableError> {
        if chain.len() > MAX_RESOLUTION_DEPTH {
            return Err(VariableError::MaxDepthExceeded);
        }

        let (frame, def) = self
            .lookup_within(name, limit)
            .ok_or_else(|| VariableError::Undefined(name.to_string()))?;

        if chain.iter().any(|n| n == name) {
            let mut cycle = chain.clone();
            cycle.push(name.to_string());
            return Err(VariableError::Circular(cycle));
        }

        chain.push(name.to_string());
        // The value sees its own frame and everything outside it
        let substituted = self.substitute_within(def.value, frame + 1, chain)?;
        chain.pop();

        Ok(evaluate(&substituted))
    }

    fn substitute_within(
        &self,
        text: &str,
        limit: usize,
        chain: &mut Vec<String>,
    ) -> Result<String, VariableError> {
        if !text.contains('@') {
            return Ok(text.to_string());
        }

        let chars: Vec<char> = text.chars().collect();
        let mut result = String::with_capacity(text.len());
        let mut quote: Option<char> = None;
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];

            if c == '@' && chars.get(i + 1) == Some(&'{') {
                if let Some(len) = chars[i + 2..].iter().position(|&ch| ch == '}') {
                    let name: String = chars[i + 2..i + 2 + len].iter().collect();
                    let value = self.resolve_within(&name, limit, chain)?;
                    result.push_str(unquote(&value));
                    i += len + 3;
                    continue;
                }
            }

            if let Some(q) = quote {
                if c == '\\' {
                    result.push(c);
                    if let Some(&next) = chars.get(i + 1) {
                        result.push(next);
                    }
                    i += 2;
                    continue;
                }
                if c == q {
                    quote = None;
                }
                result.push(c);
                i += 1;
                continue;
            }

            match c {
                '"' | '\'' => {
                    quote = Some(c);
                    result.push(c);
                    i += 1;
                }
                '@' => {
                    let indirect = chars.get(i + 1) == Some(&'@');
                    let name_start = if indirect { i + 2 } else { i + 1 };
                    let name_len =
                        chars[name_start..].iter().take_while(|ch| is_name_char(**ch)).count();

                    if name_len == 0 || !is_name_start(chars[name_start]) {
                        result.push(c);
                        i += 1;
                        continue;
                    }

                    let name: String = chars[name_start..name_start + name_len].iter().collect();
                    let mut value = self.resolve_within(&name, limit, chain)?;
                    if indirect {
                        let target = unquote(&value).to_string();
                        value = self.resolve_within(&target, limit, chain)?;
                    }
                    result.push_str(&value);
                    i = name_start + name_len;
                }
                _ => {
                    result.push(c);
                    i += 1;
                }
            }
        }

        Ok(result)
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '-'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

/// Strip one pair of matching quotes.
pub fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}
