//! Lexer for the tako front end.
//!
//! The lexer never drops input: every byte of the source ends up in exactly
//! one token, whitespace and comments included. Higher layers filter out the
//! [`TokenKind::WhiteSpace`] tokens they do not care about.

use std::sync::Arc;

use tracing::debug;

use crate::context::{Context, PassStep};
use crate::diagnostic::{Message, Severity};
use crate::span::{Location, Offset};

/// Kind of a token produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Brackets
    OpenParen,    // (
    CloseParen,   // )
    OpenBrace,    // {
    CloseBrace,   // }
    OpenBracket,  // [
    CloseBracket, // ]

    // Punctuation
    SemiColon, // ;
    PreCond,   // -|
    PostCond,  // |-
    Comma,     // ,

    /// Spaces, newlines and comments.
    WhiteSpace,

    NumberLiteral,
    StringLiteral,
    Operator,
    Symbol,

    /// A single character no rule accepts.
    Error,
}

impl TokenKind {
    /// The closing bracket matching an opening one.
    pub fn closing(self) -> Option<TokenKind> {
        match self {
            TokenKind::OpenParen => Some(TokenKind::CloseParen),
            TokenKind::OpenBrace => Some(TokenKind::CloseBrace),
            TokenKind::OpenBracket => Some(TokenKind::CloseBracket),
            _ => None,
        }
    }

    pub fn is_open_bracket(self) -> bool {
        self.closing().is_some()
    }

    pub fn is_close_bracket(self) -> bool {
        matches!(
            self,
            TokenKind::CloseParen | TokenKind::CloseBrace | TokenKind::CloseBracket
        )
    }
}

/// A classified, located slice of the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: Location,
}

pub type Tokens = Vec<Token>;

/// Literal punctuation, tried in order before any other rule.
///
/// Longer entries must come before entries that are a prefix of them.
const PUNCTUATION: [(&str, TokenKind); 10] = [
    ("(", TokenKind::OpenParen),
    (")", TokenKind::CloseParen),
    ("{", TokenKind::OpenBrace),
    ("}", TokenKind::CloseBrace),
    ("[", TokenKind::OpenBracket),
    ("]", TokenKind::CloseBracket),
    (";", TokenKind::SemiColon),
    ("-|", TokenKind::PreCond),
    ("|-", TokenKind::PostCond),
    (",", TokenKind::Comma),
];

const OPERATOR_CHARS: &str = "-+&#@<>^~∆%•|=÷×°$\\/*:?!.";
const QUOTES: [char; 3] = ['\'', '"', '`'];
/// The only delimiter whose literals may span lines.
const MULTILINE_QUOTE: char = '"';

pub const UNTERMINATED_AT_NEWLINE: &str =
    "Unterminated string literal (or maybe you wanted a \"multiline string\"?)";
pub const UNTERMINATED_AT_EOF: &str = "Unterminated string literal, found end of file.";

/// Lex the context's source into tokens covering the whole text.
///
/// Returns no tokens when the lex step lies beyond the context's last step.
pub fn lex(ctx: &mut Context) -> Tokens {
    if !ctx.start_step(PassStep::Lex) {
        return Tokens::new();
    }

    let mut lexer = Lexer {
        file: ctx.filename().clone(),
        source: ctx.content(),
        index: 0,
        messages: Vec::new(),
    };
    let tokens = lexer.run();
    let messages = std::mem::take(&mut lexer.messages);

    for message in messages {
        ctx.msg(message.location, message.severity, message.text);
    }
    debug!(tokens = tokens.len(), "lexed");
    tokens
}

struct Lexer<'src> {
    file: Arc<str>,
    source: &'src str,
    index: Offset,
    messages: Vec<Message>,
}

impl<'src> Lexer<'src> {
    fn run(&mut self) -> Tokens {
        let mut tokens = Tokens::new();

        while self.index < self.source.len() {
            let start = self.index;
            let (kind, length) = self.choose_token();
            let length = if length == 0 {
                // Recover by consuming a single character so the scan
                // always makes progress.
                self.message(start, 0, Severity::InternalError, "Illegal empty token");
                self.rest().chars().next().map_or(1, char::len_utf8)
            } else {
                length
            };

            if kind == TokenKind::Error {
                self.message(start, length, Severity::Error, "Unexpected character");
            }
            tokens.push(Token {
                kind,
                location: self.location(start, length),
            });
            self.index += length;
        }

        tokens
    }

    /// Pick the highest priority rule matching at the current position.
    fn choose_token(&mut self) -> (TokenKind, Offset) {
        let rest = self.rest();

        for (text, kind) in PUNCTUATION {
            if rest.starts_with(text) {
                return (kind, text.len());
            }
        }

        if let Some(length) = self.string_literal() {
            return (TokenKind::StringLiteral, length);
        }

        let length = whitespace(rest);
        if length > 0 {
            return (TokenKind::WhiteSpace, length);
        }

        let length = run_of(rest, |ch| OPERATOR_CHARS.contains(ch));
        if length > 0 {
            return (TokenKind::Operator, length);
        }

        let length = run_of(rest, |ch| ch.is_ascii_digit() || ch == '.');
        if length > 0 {
            return (TokenKind::NumberLiteral, length);
        }

        let length = run_of(rest, |ch| ch.is_ascii_alphanumeric() || ch == '_');
        if length > 0 {
            return (TokenKind::Symbol, length);
        }

        let length = rest.chars().next().map_or(0, char::len_utf8);
        (TokenKind::Error, length)
    }

    /// Scan a quoted literal starting at the current position.
    ///
    /// The returned length includes both delimiters when the literal is
    /// closed. Single-line literals stop after the newline that ends them.
    fn string_literal(&mut self) -> Option<Offset> {
        let rest = self.rest();
        let delimiter = rest.chars().next().filter(|ch| QUOTES.contains(ch))?;

        for (offset, ch) in rest.char_indices().skip(1) {
            if ch == delimiter {
                return Some(offset + 1);
            }
            if ch == '\n' && delimiter != MULTILINE_QUOTE {
                let length = offset + 1;
                self.message(self.index, length, Severity::Warning, UNTERMINATED_AT_NEWLINE);
                return Some(length);
            }
        }

        self.message(self.index, rest.len(), Severity::Warning, UNTERMINATED_AT_EOF);
        Some(rest.len())
    }

    fn rest(&self) -> &'src str {
        &self.source[self.index..]
    }

    fn location(&self, start: Offset, length: Offset) -> Location {
        Location::new(start, length, self.file.clone())
    }

    fn message(&mut self, start: Offset, length: Offset, severity: Severity, text: &str) {
        let location = self.location(start, length);
        self.messages.push(Message::new(location, severity, text));
    }
}

/// Length of the whitespace and comments at the start of `text`.
fn whitespace(text: &str) -> Offset {
    let bytes = text.as_bytes();
    let mut index = 0;

    while index < bytes.len() {
        match bytes[index] {
            b' ' | b'\t' | b'\n' | b'\r' => index += 1,
            b'#' => index = line_end(bytes, index),
            b'/' if bytes.get(index + 1) == Some(&b'/') => index = line_end(bytes, index),
            b'/' if bytes.get(index + 1) == Some(&b'*') => {
                index = text[index + 2..]
                    .find("*/")
                    .map_or(bytes.len(), |end| index + 2 + end + 2);
            }
            _ => break,
        }
    }

    index
}

/// Index of the newline ending the line that contains `from`, or the end of input.
fn line_end(bytes: &[u8], from: usize) -> usize {
    bytes[from..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |offset| from + offset)
}

/// Byte length of the longest prefix of `text` whose characters all satisfy `accept`.
fn run_of(text: &str, accept: impl Fn(char) -> bool) -> Offset {
    text.char_indices()
        .find(|&(_, ch)| !accept(ch))
        .map_or(text.len(), |(offset, _)| offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_str(source: &str) -> (Tokens, Context) {
        let mut ctx = Context::new(source, "<test>");
        let tokens = lex(&mut ctx);
        (tokens, ctx)
    }

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_simple_expression() {
        let (tokens, ctx) = lex_str("var * 32");
        assert!(ctx.messages().is_empty());
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Symbol,
                TokenKind::WhiteSpace,
                TokenKind::Operator,
                TokenKind::WhiteSpace,
                TokenKind::NumberLiteral,
            ]
        );
    }

    #[test]
    fn lexes_call_with_arguments() {
        let (tokens, ctx) = lex_str("32 * var(a, 3)");
        assert!(ctx.messages().is_empty());
        assert_eq!(tokens.len(), 11);
        assert_eq!(tokens[5].kind, TokenKind::OpenParen);
        assert_eq!(tokens[7].kind, TokenKind::Comma);
        assert_eq!(tokens[10].kind, TokenKind::CloseParen);
    }

    #[test]
    fn conditions_win_over_operator_runs() {
        let (tokens, _) = lex_str("-|x|-");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::PreCond, TokenKind::Symbol, TokenKind::PostCond]
        );
    }

    #[test]
    fn merges_comments_into_whitespace() {
        let (tokens, ctx) = lex_str("a // note\n  # more\n/* block\n */ b");
        assert!(ctx.messages().is_empty());
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Symbol, TokenKind::WhiteSpace, TokenKind::Symbol]
        );
    }

    #[test]
    fn unterminated_block_comment_runs_to_end() {
        let (tokens, ctx) = lex_str("a /* never closed");
        assert!(ctx.messages().is_empty());
        assert_eq!(kinds(&tokens), vec![TokenKind::Symbol, TokenKind::WhiteSpace]);
        assert_eq!(tokens[1].location.end(), 17);
    }

    #[test]
    fn backquote_literal_stops_at_newline() {
        let (tokens, ctx) = lex_str("`ab\ncd");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::StringLiteral, TokenKind::Symbol]
        );
        assert_eq!(tokens[0].location.length, 4);
        assert_eq!(ctx.messages().len(), 1);
        assert_eq!(ctx.messages()[0].text, UNTERMINATED_AT_NEWLINE);
        assert!(!ctx.done());
    }

    #[test]
    fn number_runs_include_dots() {
        let (tokens, _) = lex_str("1.5.2");
        assert_eq!(kinds(&tokens), vec![TokenKind::NumberLiteral]);
    }

    #[test]
    fn unknown_characters_become_error_tokens() {
        let (tokens, ctx) = lex_str("a \u{1F600} b");
        assert_eq!(tokens[2].kind, TokenKind::Error);
        assert_eq!(tokens[2].location.length, 4);
        assert_eq!(ctx.messages().len(), 1);
        assert_eq!(ctx.messages()[0].severity, Severity::Error);
        assert_eq!(ctx.messages()[0].text, "Unexpected character");
        assert!(ctx.done());
    }

    #[test]
    fn non_ascii_operators_are_single_runs() {
        let (tokens, ctx) = lex_str("a÷b");
        assert!(ctx.messages().is_empty());
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Symbol, TokenKind::Operator, TokenKind::Symbol]
        );
        assert_eq!(tokens[1].location.length, '÷'.len_utf8());
    }

    #[test]
    fn skipped_step_yields_no_tokens() {
        let mut ctx = Context::new("a b", "<test>").with_last_step(PassStep::Init);
        assert!(lex(&mut ctx).is_empty());
        assert!(ctx.messages().is_empty());
    }
}
