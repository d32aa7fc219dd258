//! Evaluation of the parsed tree into flat CSS.
//!
//! Nested rules are flattened by joining selectors, `@media`-like rules
//! nested in a selector bubble up around that selector, and other block
//! at-rules are compiled in isolation and emitted where they appear.

use std::path::PathBuf;

use super::error::{CompileError, CompileErrorKind};
use super::output::CssNode;
use super::parser::{Node, Span};
use super::scope::{Scope, VariableError};
use super::selector::{
    join_selectors, mixin_definition, normalize_whitespace, split_selector_list, MixinDefinition,
};
use super::value::evaluate;

/// At-rules that wrap the enclosing selector instead of resetting it.
const CONDITIONAL_AT_RULES: &[&str] = &["media", "supports", "container", "document"];

/// A bubbled at-rule: name and prelude.
type Condition = (String, String);

/// Output node tagged with the conditional at-rules wrapping it.
#[derive(Debug)]
struct Entry {
    conditions: Vec<Condition>,
    node: CssNode,
}

/// Selector and conditions in effect for the block being evaluated.
#[derive(Debug)]
struct Context {
    selectors: Vec<String>,
    conditions: Vec<Condition>,
}

impl Context {
    fn root() -> Self {
        Self { selectors: Vec::new(), conditions: Vec::new() }
    }
}

/// Compiled stylesheet: hoisted statements and the node tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluated {
    /// `@charset`, `@import` and `@namespace` statements, in output order
    pub hoisted: Vec<String>,
    /// Everything else
    pub nodes: Vec<CssNode>,
}

/// Evaluates a tree whose imports have already been expanded.
pub struct Evaluator<'n> {
    files: &'n [PathBuf],
    scope: Scope<'n>,
    mixin_stack: Vec<String>,
    charset: Option<String>,
    hoisted: Vec<String>,
}

impl<'n> Evaluator<'n> {
    /// `files` is the file table that [`Span::file`] indexes into.
    pub fn new(files: &'n [PathBuf]) -> Self {
        Self { files, scope: Scope::new(), mixin_stack: Vec::new(), charset: None, hoisted: Vec::new() }
    }

    /// Evaluate the whole stylesheet.
    pub fn evaluate(mut self, nodes: &'n [Node]) -> Result<Evaluated, CompileError> {
        let mut entries = Vec::new();
        self.eval_block(nodes, &Context::root(), &mut entries, None)?;

        let mut hoisted: Vec<String> = self.charset.into_iter().collect();
        hoisted.extend(self.hoisted);
        Ok(Evaluated { hoisted, nodes: assemble(entries) })
    }

    /// Evaluate a block body in a new scope frame.
    ///
    /// `target` is the index in `out` of the rule receiving declarations;
    /// `None` means declarations are not allowed here.
    fn eval_block(
        &mut self,
        body: &'n [Node],
        ctx: &Context,
        out: &mut Vec<Entry>,
        target: Option<usize>,
    ) -> Result<(), CompileError> {
        self.scope.push(body);
        let result = body.iter().try_for_each(|node| self.eval_node(node, ctx, out, target));
        self.scope.pop();
        result
    }

    fn eval_node(
        &mut self,
        node: &'n Node,
        ctx: &Context,
        out: &mut Vec<Entry>,
        target: Option<usize>,
    ) -> Result<(), CompileError> {
        match node {
            // Collected when the enclosing frame was pushed
            Node::Variable { .. } => Ok(()),
            Node::Declaration { property, value, span } => {
                let Some(index) = target else {
                    return Err(self.syntax(*span, "properties must be inside selector blocks"));
                };
                let property = self.scope.interpolate(property).map_err(|e| self.variable_error(*span, e))?;
                let value = self.eval_value(value, *span)?;
                if let CssNode::Rule { declarations, .. } = &mut out[index].node {
                    declarations.push(format!("{}: {}", property, value));
                }
                Ok(())
            }
            Node::Rule { selector, body, span } => self.eval_rule(selector, body, *span, ctx, out),
            Node::AtRule { name, prelude, body, span } => {
                self.eval_at_rule(name, prelude, body.as_deref(), *span, ctx, out, target)
            }
            Node::Import { span, .. } => Err(self.syntax(*span, "unresolved @import")),
            Node::MixinCall { selector, span } => self.eval_mixin_call(selector, *span, ctx, out, target),
        }
    }

    fn eval_rule(
        &mut self,
        selector: &str,
        body: &'n [Node],
        span: Span,
        ctx: &Context,
        out: &mut Vec<Entry>,
    ) -> Result<(), CompileError> {
        match mixin_definition(selector) {
            Some(MixinDefinition::Plain) => return Ok(()),
            Some(MixinDefinition::Parametric) => {
                return Err(self.syntax(span, "parametric mixins are not supported"));
            }
            None => {}
        }

        let selector = self.scope.interpolate(selector).map_err(|e| self.variable_error(span, e))?;
        let selectors = join_selectors(&ctx.selectors, &split_selector_list(&selector));

        // Placeholder keeps the rule ahead of its nested rules in the output
        let index = out.len();
        out.push(Entry {
            conditions: ctx.conditions.clone(),
            node: CssNode::Rule { selectors: selectors.clone(), declarations: Vec::new() },
        });

        let inner = Context { selectors, conditions: ctx.conditions.clone() };
        self.eval_block(body, &inner, out, Some(index))
    }

    fn eval_at_rule(
        &mut self,
        name: &str,
        prelude: &str,
        body: Option<&'n [Node]>,
        span: Span,
        ctx: &Context,
        out: &mut Vec<Entry>,
        target: Option<usize>,
    ) -> Result<(), CompileError> {
        let prelude = self.scope.substitute(prelude).map_err(|e| self.variable_error(span, e))?;
        let prelude = normalize_whitespace(&prelude);
        let at = if prelude.is_empty() { format!("@{}", name) } else { format!("@{} {}", name, prelude) };

        let Some(body) = body else {
            let statement = format!("{};", at);
            match name {
                "charset" => {
                    self.charset.get_or_insert(statement);
                }
                "import" | "namespace" => self.hoisted.push(statement),
                _ => out.push(Entry { conditions: ctx.conditions.clone(), node: CssNode::Statement(statement) }),
            }
            return Ok(());
        };

        if CONDITIONAL_AT_RULES.contains(&name) {
            let conditions = push_condition(&ctx.conditions, name, &prelude);
            let target = if ctx.selectors.is_empty() {
                target
            } else {
                out.push(Entry {
                    conditions: conditions.clone(),
                    node: CssNode::Rule { selectors: ctx.selectors.clone(), declarations: Vec::new() },
                });
                Some(out.len() - 1)
            };
            let inner = Context { selectors: ctx.selectors.clone(), conditions };
            return self.eval_block(body, &inner, out, target);
        }

        // Directives such as @font-face or @keyframes start a fresh context;
        // entry 0 collects declarations written directly in the body
        let mut inner = vec![Entry {
            conditions: Vec::new(),
            node: CssNode::Rule { selectors: Vec::new(), declarations: Vec::new() },
        }];
        self.eval_block(body, &Context::root(), &mut inner, Some(0))?;

        let declarations = match inner.remove(0).node {
            CssNode::Rule { declarations, .. } => declarations,
            _ => Vec::new(),
        };
        out.push(Entry {
            conditions: ctx.conditions.clone(),
            node: CssNode::Block { at, declarations, children: assemble(inner) },
        });
        Ok(())
    }

    fn eval_mixin_call(
        &mut self,
        selector: &str,
        span: Span,
        ctx: &Context,
        out: &mut Vec<Entry>,
        target: Option<usize>,
    ) -> Result<(), CompileError> {
        if self.mixin_stack.iter().any(|s| s == selector) {
            return Err(self.error(span, CompileErrorKind::RecursiveMixin(selector.to_string())));
        }

        let Some(definitions) = self.scope.mixins(selector).map(|defs| defs.to_vec()) else {
            return Err(self.error(span, CompileErrorKind::UndefinedMixin(selector.to_string())));
        };

        self.mixin_stack.push(selector.to_string());
        let mut result = Ok(());
        for definition in definitions {
            if let Node::Rule { body, .. } = definition {
                result = self.eval_block(body, ctx, out, target);
                if result.is_err() {
                    break;
                }
            }
        }
        self.mixin_stack.pop();
        result
    }

    fn eval_value(&self, value: &str, span: Span) -> Result<String, CompileError> {
        let substituted = self.scope.substitute(value).map_err(|e| self.variable_error(span, e))?;
        Ok(normalize_important(&evaluate(&substituted)))
    }

    fn error(&self, span: Span, kind: CompileErrorKind) -> CompileError {
        CompileError::at(&self.files[span.file], span.line, span.column, kind)
    }

    fn syntax(&self, span: Span, message: &str) -> CompileError {
        self.error(span, CompileErrorKind::Syntax(message.to_string()))
    }

    fn variable_error(&self, span: Span, error: VariableError) -> CompileError {
        let kind = match error {
            VariableError::Undefined(name) => CompileErrorKind::UndefinedVariable(name),
            VariableError::Circular(chain) => CompileErrorKind::CircularVariable(chain),
            VariableError::MaxDepthExceeded => CompileErrorKind::Syntax(error.to_string()),
        };
        self.error(span, kind)
    }
}

/// Add a bubbled at-rule; a `@media` directly inside another combines with it.
fn push_condition(conditions: &[Condition], name: &str, prelude: &str) -> Vec<Condition> {
    let mut merged = conditions.to_vec();
    if let Some((last_name, last_prelude)) = merged.last_mut() {
        if last_name == "media" && name == "media" {
            *last_prelude = combine_media(last_prelude, prelude);
            return merged;
        }
    }
    merged.push((name.to_string(), prelude.to_string()));
    merged
}

fn combine_media(outer: &str, inner: &str) -> String {
    let outer = split_selector_list(outer);
    let inner = split_selector_list(inner);
    outer
        .iter()
        .flat_map(|o| inner.iter().map(move |i| format!("{} and {}", o, i)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Group consecutive entries sharing the same conditions into one block each.
fn assemble(entries: Vec<Entry>) -> Vec<CssNode> {
    let mut nodes = Vec::new();
    let mut group: Option<(Vec<Condition>, Vec<CssNode>)> = None;

    for entry in entries {
        let same_group = matches!(&group, Some((conditions, _)) if *conditions == entry.conditions);
        if same_group {
            if let Some((_, children)) = group.as_mut() {
                children.push(entry.node);
            }
            continue;
        }

        if let Some((conditions, children)) = group.take() {
            nodes.extend(wrap(conditions, children));
        }
        if entry.conditions.is_empty() {
            nodes.push(entry.node);
        } else {
            group = Some((entry.conditions, vec![entry.node]));
        }
    }

    if let Some((conditions, children)) = group {
        nodes.extend(wrap(conditions, children));
    }
    nodes
}

fn wrap(conditions: Vec<Condition>, children: Vec<CssNode>) -> Vec<CssNode> {
    let mut wrapped = children;
    for (name, prelude) in conditions.into_iter().rev() {
        wrapped = vec![CssNode::Block { at: format!("@{} {}", name, prelude), declarations: Vec::new(), children: wrapped }];
    }
    wrapped
}

/// Normalise `value!important` and `value ! important` to `value !important`.
fn normalize_important(value: &str) -> String {
    let trimmed = value.trim();
    if let Some(rest) = trimmed.strip_suffix("important") {
        if let Some(base) = rest.trim_end().strip_suffix('!') {
            return format!("{} !important", base.trim_end());
        }
    }
    trimmed.to_string()
}
