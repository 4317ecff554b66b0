//! Typed extraction.
//!
//! Turns the generic [`Tree<Token>`] built by [`crate::ast`] into [`Value`]
//! and [`Definition`] records. The same bracket-list grammar yields two
//! shapes: left of a top-level `=` it names formal parameters, anywhere else
//! it is a call whose elements become (positional or named) arguments.

use std::collections::BTreeMap;

use tracing::debug;

use crate::ast::Tree;
use crate::context::{Context, PassStep};
use crate::diagnostic::Severity;
use crate::lexer::{Token, TokenKind};
use crate::span::Location;

/// A call argument or a formal parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    /// Explicit name, or `#i` for the i-th unnamed argument.
    pub name: String,
    /// Always `None` for formal parameters.
    pub value: Option<Value>,
}

impl Argument {
    pub fn positional(index: usize, value: Value) -> Self {
        Argument {
            name: format!("#{index}"),
            value: Some(value),
        }
    }

    pub fn named(name: impl Into<String>, value: Value) -> Self {
        Argument {
            name: name.into(),
            value: Some(value),
        }
    }

    pub fn parameter(name: impl Into<String>) -> Self {
        Argument {
            name: name.into(),
            value: None,
        }
    }
}

/// A literal, an identifier, or an application of a named head to arguments.
///
/// Operators and tuples are applications too: `a + b` has name `+` and
/// `(a, b)` has name `(`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    pub name: String,
    pub args: Vec<Argument>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub name: String,
    pub args: Vec<Argument>,
    /// Right hand side of the `=`; `None` for a pure declaration.
    pub value: Option<Value>,
    pub location: Location,
}

pub type Path = Vec<String>;

/// Definitions of a module keyed by their path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Symbols {
    entries: BTreeMap<Path, Definition>,
}

impl Symbols {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `definition` at `path`, returning the definition it replaced.
    pub fn insert(&mut self, path: Path, definition: Definition) -> Option<Definition> {
        self.entries.insert(path, definition)
    }

    pub fn get(&self, path: &[String]) -> Option<&Definition> {
        self.entries.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Definition)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A fully extracted compilation unit, ready for the checker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub name: String,
    pub definitions: Vec<Definition>,
    pub location: Location,
}

/// Context of the extraction stage.
///
/// Takes ownership of the lexing/tree-building [`Context`] and adds the
/// symbol table the extracted definitions are registered in.
#[derive(Debug)]
pub struct ParserContext {
    ctx: Context,
    pub symbols: Symbols,
    /// Let a later definition replace an earlier one of the same name
    /// instead of reporting a redefinition.
    pub allow_overrides: bool,
}

impl ParserContext {
    pub fn new(ctx: Context) -> Self {
        ParserContext {
            ctx,
            symbols: Symbols::new(),
            allow_overrides: false,
        }
    }

    pub fn ctx(&self) -> &Context {
        &self.ctx
    }

    pub fn ctx_mut(&mut self) -> &mut Context {
        &mut self.ctx
    }

    pub fn done(&self) -> bool {
        self.ctx.done()
    }
}

/// Extract a value from any expression tree.
pub fn parse_value(tree: &Tree<Token>, ctx: &mut Context) -> Option<Value> {
    let head = &tree.value;
    let name = ctx.text(&head.location).to_string();
    let location = head.location.clone();

    match head.kind {
        TokenKind::NumberLiteral | TokenKind::StringLiteral if tree.is_leaf() => Some(Value {
            name,
            args: Vec::new(),
            location,
        }),
        TokenKind::Symbol
        | TokenKind::OpenParen
        | TokenKind::OpenBracket
        | TokenKind::OpenBrace => {
            let args = parse_arguments(&tree.children, ctx)?;
            Some(Value {
                name,
                args,
                location,
            })
        }
        TokenKind::Operator | TokenKind::PreCond | TokenKind::PostCond => {
            let args = tree
                .children
                .iter()
                .enumerate()
                .map(|(index, child)| Some(Argument::positional(index, parse_value(child, ctx)?)))
                .collect::<Option<Vec<_>>>()?;
            Some(Value {
                name,
                args,
                location,
            })
        }
        TokenKind::NumberLiteral
        | TokenKind::StringLiteral
        | TokenKind::CloseParen
        | TokenKind::CloseBrace
        | TokenKind::CloseBracket
        | TokenKind::SemiColon
        | TokenKind::Comma
        | TokenKind::WhiteSpace
        | TokenKind::Error => {
            ctx.msg(
                location,
                Severity::Error,
                format!("Expected a value (a literal, a name, a call or an operator), found '{name}'"),
            );
            None
        }
    }
}

/// Extract call or tuple elements.
///
/// `name = value` elements are named arguments; the rest are numbered in
/// order among themselves.
fn parse_arguments(children: &[Tree<Token>], ctx: &mut Context) -> Option<Vec<Argument>> {
    let mut args: Vec<Argument> = Vec::with_capacity(children.len());
    let mut positional = 0;

    for child in children {
        let arg = match named_argument(child, ctx) {
            Some((name_token, value_tree)) => {
                let name = ctx.text(&name_token.location).to_string();
                if args.iter().any(|arg| arg.name == name) {
                    ctx.msg(
                        name_token.location.clone(),
                        Severity::Error,
                        format!("Duplicate argument '{name}'"),
                    );
                    return None;
                }
                Argument::named(name, parse_value(value_tree, ctx)?)
            }
            None => {
                let value = parse_value(child, ctx)?;
                let arg = Argument::positional(positional, value);
                positional += 1;
                arg
            }
        };
        args.push(arg);
    }

    Some(args)
}

/// Split `ident = value` into its name token and value tree.
fn named_argument<'t>(tree: &'t Tree<Token>, ctx: &Context) -> Option<(&'t Token, &'t Tree<Token>)> {
    if tree.value.kind != TokenKind::Operator || ctx.text(&tree.value.location) != "=" {
        return None;
    }
    match tree.children.as_slice() {
        [name, value] if name.value.kind == TokenKind::Symbol && name.is_leaf() => {
            Some((&name.value, value))
        }
        _ => None,
    }
}

/// Extract a definition (`name = value`, `name(params) = value`) or a pure
/// declaration (`name`, `name(params)`).
pub fn parse_definition(tree: &Tree<Token>, ctx: &mut Context) -> Option<Definition> {
    let (head, value) = match tree.value.kind {
        TokenKind::Operator if ctx.text(&tree.value.location) == "=" => {
            match tree.children.as_slice() {
                [head, value] => (head, Some(value)),
                _ => {
                    ctx.msg(
                        tree.value.location.clone(),
                        Severity::Error,
                        "Expected a definition of the form 'name(params) = value'",
                    );
                    return None;
                }
            }
        }
        _ => (tree, None),
    };

    if head.value.kind != TokenKind::Symbol {
        let found = ctx.text(&head.value.location).to_string();
        ctx.msg(
            head.value.location.clone(),
            Severity::Error,
            format!("Expected a definition name, found '{found}'"),
        );
        return None;
    }

    let mut args: Vec<Argument> = Vec::with_capacity(head.children.len());
    for param in &head.children {
        let name = ctx.text(&param.value.location).to_string();
        if param.value.kind != TokenKind::Symbol || !param.is_leaf() {
            ctx.msg(
                param.value.location.clone(),
                Severity::Error,
                format!("Expected a parameter name, found '{name}'"),
            );
            return None;
        }
        if args.iter().any(|arg| arg.name == name) {
            ctx.msg(
                param.value.location.clone(),
                Severity::Error,
                format!("Duplicate parameter '{name}'"),
            );
            return None;
        }
        args.push(Argument::parameter(name));
    }

    let value = match value {
        Some(tree) => Some(parse_value(tree, ctx)?),
        None => None,
    };

    Some(Definition {
        name: ctx.text(&head.value.location).to_string(),
        args,
        value,
        location: head.value.location.clone(),
    })
}

/// Extract every top-level tree of a module as a definition and register
/// it in the context's symbol table.
///
/// Returns `None` when the parse step is skipped. Definitions that fail to
/// extract are reported and left out of the module.
pub fn parse_module(forest: &[Tree<Token>], p_ctx: &mut ParserContext) -> Option<Module> {
    if !p_ctx.ctx.start_step(PassStep::Parse) {
        return None;
    }

    let mut definitions = Vec::with_capacity(forest.len());
    for tree in forest {
        let Some(definition) = parse_definition(tree, &mut p_ctx.ctx) else {
            continue;
        };

        let path: Path = vec![definition.name.clone()];
        if let Some(previous) = p_ctx.symbols.get(&path) {
            if !p_ctx.allow_overrides {
                let previous = previous.location.clone();
                p_ctx.ctx.msg(
                    definition.location.clone(),
                    Severity::Error,
                    format!("Redefinition of '{}'", definition.name),
                );
                p_ctx.ctx.msg(previous, Severity::Info, "Previously defined here");
                continue;
            }
            definitions.retain(|existing: &Definition| existing.name != definition.name);
        }
        p_ctx.symbols.insert(path, definition.clone());
        definitions.push(definition);
    }

    let ctx = &p_ctx.ctx;
    debug!(definitions = definitions.len(), symbols = p_ctx.symbols.len(), "extracted module");
    Some(Module {
        name: ctx.filename().to_string(),
        definitions,
        location: ctx.location(0, ctx.content().len()),
    })
}
