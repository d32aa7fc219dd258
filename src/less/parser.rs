//! Parser for the supported LESS subset.
//!
//! Produces a tree of [`Node`]s. Comments are dropped here; values and
//! selectors are kept as raw text and interpreted during evaluation.

use std::path::Path;

use super::error::CompileError;

/// Position of a node in one of the compiled files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Index into the compiler's file table
    pub file: usize,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
}

/// A parsed stylesheet item.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// `@name: value;`
    Variable { name: String, value: String, span: Span },
    /// `property: value;`
    Declaration { property: String, value: String, span: Span },
    /// `selector { ... }`
    Rule { selector: String, body: Vec<Node>, span: Span },
    /// `@name prelude;` or `@name prelude { ... }`
    AtRule { name: String, prelude: String, body: Option<Vec<Node>>, span: Span },
    /// `@import ...;`, resolved before evaluation
    Import { prelude: String, span: Span },
    /// `.mixin;` or `.mixin();`
    MixinCall { selector: String, span: Span },
}

impl Node {
    /// Source position of this node.
    pub fn span(&self) -> Span {
        match self {
            Node::Variable { span, .. }
            | Node::Declaration { span, .. }
            | Node::Rule { span, .. }
            | Node::AtRule { span, .. }
            | Node::Import { span, .. }
            | Node::MixinCall { span, .. } => *span,
        }
    }
}

/// What ended a raw text segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminator {
    OpenBrace,
    Semicolon,
    CloseBrace,
    Eof,
}

/// Parse LESS source text.
///
/// `file` is the index recorded in every [`Span`]; `path` is only used for
/// error messages.
pub fn parse(source: &str, file: usize, path: &Path) -> Result<Vec<Node>, CompileError> {
    let mut parser = Parser::new(source, file, path);
    parser.parse_block(None)
}

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    file: usize,
    path: &'a Path,
}

impl<'a> Parser<'a> {
    fn new(source: &str, file: usize, path: &'a Path) -> Self {
        // A leading byte-order mark is not part of the stylesheet
        let source = source.strip_prefix('\u{feff}').unwrap_or(source);
        Self { chars: source.chars().collect(), pos: 0, line: 1, column: 1, file, path }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn span(&self) -> Span {
        Span { file: self.file, line: self.line, column: self.column }
    }

    fn error(&self, span: Span, message: impl Into<String>) -> CompileError {
        CompileError::syntax(self.path, span.line, span.column, message)
    }

    /// Parse items until the closing brace of `open`, or EOF at top level.
    fn parse_block(&mut self, open: Option<Span>) -> Result<Vec<Node>, CompileError> {
        let mut nodes = Vec::new();

        loop {
            self.skip_trivia()?;
            let start = self.span();

            match self.peek() {
                None => {
                    return match open {
                        Some(brace) => Err(self.error(brace, "missing closing '}'")),
                        None => Ok(nodes),
                    };
                }
                Some('}') => {
                    if open.is_none() {
                        return Err(self.error(start, "unexpected '}'"));
                    }
                    self.bump();
                    return Ok(nodes);
                }
                Some(';') => {
                    self.bump();
                }
                Some('@') if self.peek_at(1) != Some('{') => {
                    nodes.push(self.parse_at_rule(start)?);
                }
                Some(_) => {
                    nodes.push(self.parse_rule_or_declaration(start)?);
                }
            }
        }
    }

    fn parse_at_rule(&mut self, start: Span) -> Result<Node, CompileError> {
        self.bump(); // '@'
        let name = self.read_ident();
        if name.is_empty() {
            return Err(self.error(start, "expected a name after '@'"));
        }

        while matches!(self.peek(), Some(' ' | '\t')) {
            self.bump();
        }

        if self.peek() == Some(':') {
            self.bump();
            let (value, term, term_span) = self.read_segment()?;
            if term == Terminator::OpenBrace {
                return Err(self.error(term_span, "detached rulesets are not supported"));
            }
            let value = value.trim().to_string();
            if value.is_empty() {
                return Err(self.error(start, format!("missing value for variable @{}", name)));
            }
            return Ok(Node::Variable { name, value, span: start });
        }

        let (prelude, term, term_span) = self.read_segment()?;
        let prelude = prelude.trim().to_string();

        if name == "import" {
            if term == Terminator::OpenBrace {
                return Err(self.error(term_span, "unexpected '{' after @import"));
            }
            if prelude.is_empty() {
                return Err(self.error(start, "@import requires a path"));
            }
            return Ok(Node::Import { prelude, span: start });
        }

        let body = match term {
            Terminator::OpenBrace => Some(self.parse_block(Some(term_span))?),
            _ => None,
        };
        Ok(Node::AtRule { name, prelude, body, span: start })
    }

    fn parse_rule_or_declaration(&mut self, start: Span) -> Result<Node, CompileError> {
        let (text, term, term_span) = self.read_segment()?;
        let text = text.trim();

        if term == Terminator::OpenBrace {
            if text.is_empty() {
                return Err(self.error(start, "missing selector before '{'"));
            }
            let body = self.parse_block(Some(term_span))?;
            return Ok(Node::Rule { selector: text.to_string(), body, span: start });
        }

        if text.starts_with('.') || text.starts_with('#') {
            if let Some(selector) = mixin_call_selector(text) {
                return Ok(Node::MixinCall { selector, span: start });
            }
        }

        match split_declaration(text) {
            Some((property, value)) => {
                if property.is_empty() || property.chars().any(char::is_whitespace) {
                    return Err(self.error(start, format!("invalid property name '{}'", property)));
                }
                if value.is_empty() {
                    return Err(self.error(start, format!("missing value for property '{}'", property)));
                }
                Ok(Node::Declaration { property, value, span: start })
            }
            None if term == Terminator::Eof => {
                Err(self.error(start, format!("unexpected end of input after '{}'", text)))
            }
            None => Err(self.error(start, format!("unrecognised input '{}'", text))),
        }
    }

    /// Read raw text up to the first top-level `{`, `;`, or `}`.
    ///
    /// `{` and `;` are consumed, `}` is left for the enclosing block. Strings,
    /// parentheses, brackets and `@{...}` interpolations are copied whole.
    fn read_segment(&mut self) -> Result<(String, Terminator, Span), CompileError> {
        let mut out = String::new();
        let mut open_groups: Vec<(char, Span)> = Vec::new();

        loop {
            let span = self.span();
            let Some(c) = self.peek() else {
                if let Some((open, at)) = open_groups.last() {
                    return Err(self.error(*at, format!("unclosed '{}'", open)));
                }
                return Ok((out, Terminator::Eof, span));
            };

            match c {
                '"' | '\'' => self.read_string(c, &mut out)?,
                '/' if self.peek_at(1) == Some('*') => {
                    self.skip_block_comment()?;
                    out.push(' ');
                }
                '/' if self.peek_at(1) == Some('/') && open_groups.is_empty() => {
                    self.skip_line_comment();
                    out.push(' ');
                }
                '@' if self.peek_at(1) == Some('{') => self.read_interpolation(&mut out)?,
                '\\' => {
                    self.bump();
                    out.push('\\');
                    if let Some(escaped) = self.bump() {
                        out.push(escaped);
                    }
                }
                '(' | '[' => {
                    open_groups.push((c, span));
                    self.bump();
                    out.push(c);
                }
                ')' | ']' => {
                    let expected = if c == ')' { '(' } else { '[' };
                    match open_groups.pop() {
                        Some((open, _)) if open == expected => {}
                        _ => return Err(self.error(span, format!("unexpected '{}'", c))),
                    }
                    self.bump();
                    out.push(c);
                }
                '{' if open_groups.is_empty() => {
                    self.bump();
                    return Ok((out, Terminator::OpenBrace, span));
                }
                ';' if open_groups.is_empty() => {
                    self.bump();
                    return Ok((out, Terminator::Semicolon, span));
                }
                '}' if open_groups.is_empty() => {
                    return Ok((out, Terminator::CloseBrace, span));
                }
                _ => {
                    self.bump();
                    out.push(c);
                }
            }
        }
    }

    fn read_string(&mut self, quote: char, out: &mut String) -> Result<(), CompileError> {
        let start = self.span();
        self.bump();
        out.push(quote);

        loop {
            match self.bump() {
                Some('\\') => {
                    out.push('\\');
                    if let Some(escaped) = self.bump() {
                        out.push(escaped);
                    }
                }
                Some(c) if c == quote => {
                    out.push(c);
                    return Ok(());
                }
                Some('\n') | None => return Err(self.error(start, "unterminated string")),
                Some(c) => out.push(c),
            }
        }
    }

    fn read_interpolation(&mut self, out: &mut String) -> Result<(), CompileError> {
        let start = self.span();
        self.bump();
        self.bump();
        out.push_str("@{");

        loop {
            match self.bump() {
                Some('}') => {
                    out.push('}');
                    return Ok(());
                }
                Some(c) if c.is_alphanumeric() || c == '-' || c == '_' => out.push(c),
                _ => return Err(self.error(start, "unclosed variable interpolation")),
            }
        }
    }

    fn read_ident(&mut self) -> String {
        let mut ident = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                ident.push(c);
                self.bump();
            } else {
                break;
            }
        }
        ident
    }

    fn skip_trivia(&mut self) -> Result<(), CompileError> {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }
                (Some('/'), Some('*')) => self.skip_block_comment()?,
                (Some('/'), Some('/')) => self.skip_line_comment(),
                _ => return Ok(()),
            }
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), CompileError> {
        let start = self.span();
        self.bump();
        self.bump();
        loop {
            match self.bump() {
                Some('*') if self.peek() == Some('/') => {
                    self.bump();
                    return Ok(());
                }
                Some(_) => {}
                None => return Err(self.error(start, "unterminated comment")),
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }
}

/// Recognise `.name`, `#name`, `.name()` as a mixin call.
fn mixin_call_selector(text: &str) -> Option<String> {
    let name = text.strip_suffix("()").map(str::trim_end).unwrap_or(text);
    let mut chars = name.chars();
    let sigil = chars.next()?;
    let rest = chars.as_str();
    let valid = matches!(sigil, '.' | '#')
        && !rest.is_empty()
        && rest.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_');
    valid.then(|| name.to_string())
}

/// Split `property: value` at the first top-level colon.
fn split_declaration(text: &str) -> Option<(String, String)> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut interpolation = false;

    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '{' => interpolation = true,
            '}' => interpolation = false,
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ':' if depth == 0 && !interpolation => {
                let property = text[..i].trim().to_string();
                let value = text[i + 1..].trim().to_string();
                return Some((property, value));
            }
            _ => {}
        }
    }
    None
}
