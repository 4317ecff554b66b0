//! Generic tree builder.
//!
//! Imposes bracket, call and operator structure onto the flat token stream
//! produced by the lexer. The result is a [`Tree<Token>`] whose node values
//! are the tokens heading each construct:
//!
//! - atoms are leaves;
//! - `f(a, b)` is headed by the symbol `f`;
//! - `(a, b)`, `[a]` and `{a; b}` are headed by their opening bracket;
//! - `a + b` is headed by the operator, with children `[a, b]`;
//! - `(a)` is just `a`.
//!
//! Whitespace tokens are dropped before any structure is built.

use tracing::debug;

use crate::context::{Context, PassStep};
use crate::diagnostic::Severity;
use crate::lexer::{Token, TokenKind};
use crate::span::Location;

/// An ordered rose tree owning its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree<T> {
    pub value: T,
    pub children: Vec<Tree<T>>,
}

impl<T> Tree<T> {
    pub fn new(value: T, children: Vec<Tree<T>>) -> Self {
        Tree { value, children }
    }

    pub fn leaf(value: T) -> Self {
        Tree {
            value,
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of nodes in the tree.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(Tree::size).sum::<usize>()
    }

    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(Tree::depth).max().unwrap_or(0)
    }
}

/// What a single call to [`ast`] expects to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Exactly one expression.
    Value,
    /// One expression shaped like `name = value`, `name(params) = value`
    /// or a bare declaration head.
    Definition,
}

/// Build the tree for a single top-level unit.
///
/// Returns `None` for an empty (or whitespace only) token stream, when the
/// parse step is beyond the context's last step, or after reporting an error.
pub fn ast(tokens: &[Token], ctx: &mut Context, mode: ParseMode) -> Option<Tree<Token>> {
    if !ctx.start_step(PassStep::Parse) {
        return None;
    }
    let mut builder = TreeBuilder::new(tokens, ctx)?;
    if builder.at_end() {
        return None;
    }

    let tree = builder.expression(0)?.tree;
    if let Some(extra) = builder.peek() {
        let location = extra.location.clone();
        builder.error(location, "Unexpected token after the end of the expression");
        return None;
    }
    if mode == ParseMode::Definition && !is_definition(&tree, builder.ctx) {
        builder.error(tree.value.location.clone(), "Expected a definition");
        return None;
    }

    debug!(nodes = tree.size(), depth = tree.depth(), "built tree");
    Some(tree)
}

/// Build one tree per top-level expression of a module.
///
/// Expressions may be separated by `;`; an expression also ends where the
/// next token cannot continue it. Returns an empty forest after an error.
pub fn ast_module(tokens: &[Token], ctx: &mut Context) -> Vec<Tree<Token>> {
    if !ctx.start_step(PassStep::Parse) {
        return Vec::new();
    }
    let Some(mut builder) = TreeBuilder::new(tokens, ctx) else {
        return Vec::new();
    };

    let mut forest = Vec::new();
    loop {
        builder.skip(TokenKind::SemiColon);
        if builder.at_end() {
            break;
        }
        match builder.expression(0) {
            Some(built) => forest.push(built.tree),
            None => return Vec::new(),
        }
    }

    debug!(trees = forest.len(), "built module forest");
    forest
}

/// Whether `tree` has the shape of a definition or declaration head.
pub fn is_definition(tree: &Tree<Token>, ctx: &Context) -> bool {
    match tree.value.kind {
        TokenKind::Operator => {
            ctx.text(&tree.value.location) == "="
                && tree.children.len() == 2
                && is_head(&tree.children[0])
        }
        _ => is_head(tree),
    }
}

/// `name` or `name(param, ...)` where every parameter is a bare symbol.
fn is_head(tree: &Tree<Token>) -> bool {
    tree.value.kind == TokenKind::Symbol
        && tree
            .children
            .iter()
            .all(|param| param.value.kind == TokenKind::Symbol && param.is_leaf())
}

/// Left and right binding power of an infix operator.
///
/// `=` binds loosest and associates to the right; the contract markers
/// bind tighter than `=`; everything else folds left to right.
fn binding_power(kind: TokenKind, text: &str) -> Option<(u8, u8)> {
    match kind {
        TokenKind::Operator if text == "=" => Some((2, 1)),
        TokenKind::PreCond | TokenKind::PostCond => Some((3, 4)),
        TokenKind::Operator => Some((5, 6)),
        _ => None,
    }
}

/// Binding power of a prefix operator's operand.
const PREFIX_POWER: u8 = 7;

/// Deepest tree, and deepest bracket/operator nesting, the builder accepts.
pub const MAX_DEPTH: usize = 256;

const TOO_DEEP: &str = "Expression nested too deeply";

/// A subtree and its depth.
struct Built {
    tree: Tree<Token>,
    depth: usize,
}

impl Built {
    fn leaf(token: Token) -> Self {
        Built {
            tree: Tree::leaf(token),
            depth: 1,
        }
    }
}

struct TreeBuilder<'a> {
    tokens: Vec<&'a Token>,
    position: usize,
    /// Open brackets and pending operands above the current term.
    nesting: usize,
    ctx: &'a mut Context,
}

impl<'a> TreeBuilder<'a> {
    /// Filter whitespace and check bracket balance.
    ///
    /// Returns `None` (after reporting) when the brackets do not balance, so
    /// the descent below never meets an unmatched bracket.
    fn new(tokens: &'a [Token], ctx: &'a mut Context) -> Option<Self> {
        let tokens: Vec<&Token> = tokens
            .iter()
            .filter(|token| token.kind != TokenKind::WhiteSpace)
            .collect();

        let mut builder = TreeBuilder {
            tokens,
            position: 0,
            nesting: 0,
            ctx,
        };
        if builder.check_brackets() {
            Some(builder)
        } else {
            None
        }
    }

    fn check_brackets(&mut self) -> bool {
        let mut open: Vec<&Token> = Vec::new();
        let mut errors = Vec::new();

        for &token in &self.tokens {
            if token.kind.is_open_bracket() {
                open.push(token);
            } else if token.kind.is_close_bracket() {
                match open.pop() {
                    Some(opener) if opener.kind.closing() == Some(token.kind) => {}
                    Some(opener) => {
                        let expected = self.ctx.text(&opener.location).to_string();
                        errors.push((
                            token.location.clone(),
                            format!("Mismatched closing bracket for '{expected}'"),
                        ));
                    }
                    None => errors.push((
                        token.location.clone(),
                        "Unexpected closing bracket".to_string(),
                    )),
                }
            }
        }
        for opener in open {
            errors.push((opener.location.clone(), "Unclosed bracket".to_string()));
        }

        let balanced = errors.is_empty();
        for (location, text) in errors {
            self.ctx.msg(location, Severity::Error, text);
        }
        balanced
    }

    fn expression(&mut self, min_power: u8) -> Option<Built> {
        let mut lhs = self.term()?;

        while let Some(token) = self.peek() {
            let Some((left, right)) = binding_power(token.kind, self.ctx.text(&token.location))
            else {
                break;
            };
            if left < min_power {
                break;
            }
            let operator = self.advance()?;
            self.enter(&operator)?;
            let rhs = self.expression(right);
            self.leave();
            lhs = self.node(operator, vec![lhs, rhs?])?;
        }

        Some(lhs)
    }

    fn term(&mut self) -> Option<Built> {
        let Some(token) = self.peek() else {
            let end = self.ctx.content().len();
            let location = self.ctx.location(end, 0);
            self.error(location, "Expected an expression, found end of file");
            return None;
        };

        match token.kind {
            TokenKind::Symbol => {
                let symbol = self.advance()?;
                if self.peek_kind() == Some(TokenKind::OpenParen) {
                    self.advance()?;
                    let args = self.nested(&symbol, TokenKind::CloseParen)?;
                    self.node(symbol, args)
                } else {
                    Some(Built::leaf(symbol))
                }
            }
            TokenKind::NumberLiteral | TokenKind::StringLiteral => {
                Some(Built::leaf(self.advance()?))
            }
            TokenKind::OpenParen => {
                let open = self.advance()?;
                let mut elements = self.nested(&open, TokenKind::CloseParen)?;
                if elements.len() == 1 {
                    elements.pop()
                } else {
                    self.node(open, elements)
                }
            }
            TokenKind::OpenBracket => {
                let open = self.advance()?;
                let elements = self.nested(&open, TokenKind::CloseBracket)?;
                self.node(open, elements)
            }
            TokenKind::OpenBrace => {
                let open = self.advance()?;
                let elements = self.nested(&open, TokenKind::CloseBrace)?;
                self.node(open, elements)
            }
            TokenKind::Operator | TokenKind::PreCond | TokenKind::PostCond => {
                let operator = self.advance()?;
                self.enter(&operator)?;
                let operand = self.expression(PREFIX_POWER);
                self.leave();
                self.node(operator, vec![operand?])
            }
            TokenKind::CloseParen
            | TokenKind::CloseBrace
            | TokenKind::CloseBracket
            | TokenKind::SemiColon
            | TokenKind::Comma
            | TokenKind::WhiteSpace
            | TokenKind::Error => {
                let location = token.location.clone();
                let found = self.ctx.text(&location).to_string();
                self.error(location, format!("Expected an expression, found '{found}'"));
                None
            }
        }
    }

    /// Bracketed elements opened by `opener`, one nesting level down.
    fn nested(&mut self, opener: &Token, close: TokenKind) -> Option<Vec<Built>> {
        self.enter(opener)?;
        let elements = self.elements(close);
        self.leave();
        elements
    }

    /// Parse separated elements up to and including the `close` token.
    ///
    /// Elements are separated by commas; braces also accept `;` and allow
    /// empty elements (`{a; b;}`).
    fn elements(&mut self, close: TokenKind) -> Option<Vec<Built>> {
        let in_block = close == TokenKind::CloseBrace;
        let mut elements = Vec::new();

        loop {
            if in_block {
                while matches!(self.peek_kind(), Some(TokenKind::SemiColon | TokenKind::Comma)) {
                    self.advance();
                }
            }
            if self.peek_kind() == Some(close) && (in_block || elements.is_empty()) {
                self.advance();
                return Some(elements);
            }

            elements.push(self.expression(0)?);

            match self.peek_kind() {
                Some(kind) if kind == close => {
                    self.advance();
                    return Some(elements);
                }
                Some(TokenKind::Comma) => {
                    self.advance();
                }
                Some(TokenKind::SemiColon) if in_block => {
                    self.advance();
                }
                Some(_) => {
                    let token = self.peek()?;
                    let location = token.location.clone();
                    let found = self.ctx.text(&location).to_string();
                    self.error(location, format!("Expected ',' or a closing bracket, found '{found}'"));
                    return None;
                }
                None => {
                    // Unreachable after the balance check, but stay total.
                    let end = self.ctx.content().len();
                    let location = self.ctx.location(end, 0);
                    self.error(location, "Unclosed bracket");
                    return None;
                }
            }
        }
    }

    /// Go one nesting level down below `token`, or report and stop once the
    /// limit is reached.
    fn enter(&mut self, token: &Token) -> Option<()> {
        if self.nesting >= MAX_DEPTH {
            self.error(token.location.clone(), TOO_DEEP);
            return None;
        }
        self.nesting += 1;
        Some(())
    }

    fn leave(&mut self) {
        self.nesting -= 1;
    }

    /// A node headed by `head`, unless it would exceed the depth limit.
    ///
    /// Left folds (`a + b + c ...`) deepen the tree without nesting, so the
    /// depth is checked on the result as well.
    fn node(&mut self, head: Token, children: Vec<Built>) -> Option<Built> {
        let depth = 1 + children.iter().map(|child| child.depth).max().unwrap_or(0);
        if depth > MAX_DEPTH {
            self.error(head.location, TOO_DEEP);
            return None;
        }
        let children = children.into_iter().map(|child| child.tree).collect();
        Some(Built {
            tree: Tree::new(head, children),
            depth,
        })
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.position).copied()
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|token| token.kind)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek()?.clone();
        self.position += 1;
        Some(token)
    }

    fn skip(&mut self, kind: TokenKind) {
        while self.peek_kind() == Some(kind) {
            self.position += 1;
        }
    }

    fn at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    fn error(&mut self, location: Location, text: impl Into<String>) {
        self.ctx.msg(location, Severity::Error, text);
    }
}
