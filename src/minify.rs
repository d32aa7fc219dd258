//! CSS minification
//!
//! Works on tokens rather than on a parsed stylesheet: comments and
//! whitespace are dropped, and every other token is copied from the input
//! byte for byte. Values are never re-serialized, so vendor-prefixed values
//! such as `-webkit-linear-gradient(top, ...)` keep their legacy meaning.

use cssparser::{ParseError, Parser, ParserInput, Token};
use thiserror::Error;

/// Error raised by the minification step
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MinifyError {
    /// Input contains a token that cannot belong to valid CSS
    #[error("malformed CSS at line {line}, column {column}: {reason}")]
    Malformed {
        /// 1-based line in the prefixed CSS
        line: u32,
        /// 1-based column in the prefixed CSS
        column: u32,
        /// What was found
        reason: &'static str,
    },
}

/// Minify prefixed CSS.
///
/// The result is never longer than the input.
pub fn minify(css: &str) -> Result<String, MinifyError> {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut writer = Writer::default();
    minify_tokens(&mut parser, &mut writer)?;
    Ok(writer.css)
}

/// What separated the last emitted token from the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gap {
    None,
    Comment,
    Space,
}

/// Output buffer that only emits a separator where one is needed.
struct Writer {
    css: String,
    gap: Gap,
}

impl Default for Writer {
    fn default() -> Self {
        Self { css: String::new(), gap: Gap::None }
    }
}

impl Writer {
    fn separate(&mut self, gap: Gap) {
        if gap == Gap::Space || self.gap == Gap::None {
            self.gap = gap;
        }
    }

    fn push(&mut self, text: &str) {
        let prev = self.css.chars().last();
        let next = text.chars().next();
        match std::mem::replace(&mut self.gap, Gap::None) {
            Gap::Space if needs_space(prev, next) => self.css.push(' '),
            // Dropping the comment would glue the two tokens into one
            Gap::Comment if is_word_char(prev) && is_word_char(next) => self.css.push_str("/**/"),
            _ => {}
        }
        self.css.push_str(text);
    }

    fn close(&mut self, closing: &str) {
        self.gap = Gap::None;
        if closing == "}" && self.css.ends_with(';') {
            self.css.pop();
        }
        self.css.push_str(closing);
    }
}

/// Whether whitespace between two tokens is significant.
fn needs_space(prev: Option<char>, next: Option<char>) -> bool {
    match (prev, next) {
        (None, _) | (_, None) => false,
        (Some('{' | '}' | ';' | ',' | ':' | '(' | '['), _) => false,
        (_, Some('{' | '}' | ';' | ',' | ')' | ']' | '!')) => false,
        _ => true,
    }
}

fn is_word_char(c: Option<char>) -> bool {
    c.is_some_and(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '#' | '@' | '%' | '\\') || !c.is_ascii())
}

fn malformed(parser: &Parser<'_, '_>, reason: &'static str) -> MinifyError {
    let location = parser.current_source_location();
    MinifyError::Malformed { line: location.line + 1, column: location.column, reason }
}

fn minify_tokens<'i>(parser: &mut Parser<'i, '_>, writer: &mut Writer) -> Result<(), MinifyError> {
    loop {
        let start = parser.position();
        let token = match parser.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => return Ok(()),
        };

        match token {
            Token::WhiteSpace(_) => writer.separate(Gap::Space),
            Token::Comment(_) => writer.separate(Gap::Comment),
            Token::BadString(_) => return Err(malformed(parser, "unterminated string")),
            Token::BadUrl(_) => return Err(malformed(parser, "invalid url()")),
            Token::CloseParenthesis | Token::CloseSquareBracket | Token::CloseCurlyBracket => {
                return Err(malformed(parser, "unbalanced closing bracket"));
            }
            Token::Function(_) | Token::ParenthesisBlock | Token::SquareBracketBlock | Token::CurlyBracketBlock => {
                writer.push(parser.slice_from(start));
                let mut inner_end = parser.position();
                let nested = parser.parse_nested_block(|nested| {
                    let result = minify_tokens(nested, writer);
                    inner_end = nested.position();
                    Ok::<_, ParseError<'i, ()>>(result)
                });
                match nested {
                    Ok(result) => result?,
                    Err(_) => return Err(malformed(parser, "unreadable block")),
                }
                let closing = parser.slice_from(inner_end);
                if closing.is_empty() {
                    return Err(malformed(parser, "unterminated block"));
                }
                writer.close(closing);
            }
            _ => writer.push(parser.slice_from(start)),
        }
    }
}
