//! timidc-par - Parser for the Timid programming language.
//!
//! A hand-written recursive-descent parser over the token stream from
//! `timidc-lex`. Grammar rules accept a `nullable` flag: when set, a rule
//! that sees no valid start token reports "no node" (`Ok(None)`) instead of
//! raising, which is how optional positions (empty `for` headers, bare
//! `print`, promptless `in`) are expressed.
//!
//! Syntax errors use panic-mode recovery: the offending rule reports a
//! diagnostic through the shared [`Handler`] and returns a [`ParseError`]
//! marker, which unwinds (via `?`) to the nearest statement boundary where
//! [`Parser::synchronize`] skips ahead to a plausible statement start.
//! Parsing then resumes, so one bad statement does not hide errors in the
//! statements after it.

pub mod ast;
mod expr;
mod stmt;

pub use ast::*;

use timidc_lex::{Token, TokenKind};
use timidc_util::{Handler, Span};

/// Maximum number of call arguments.
pub const MAX_ARG_COUNT: usize = 255;

/// Maximum nesting depth for blocks, parentheses, and control flow.
pub const MAX_NEST_DEPTH: u32 = 40;

/// Marker for a syntax error whose diagnostic has already been reported.
///
/// Carrying no payload keeps the error path cheap; the message lives in
/// the handler, and the marker only steers recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseError;

pub(crate) type PResult<T> = Result<T, ParseError>;

/// Recursive-descent parser over a token buffer.
pub struct Parser<'a> {
    tokens: Vec<Token>,
    index: usize,
    nest_depth: u32,
    handler: &'a Handler,
}

impl<'a> Parser<'a> {
    /// Creates a parser over a token sequence ending in `Eof`.
    pub fn new(tokens: Vec<Token>, handler: &'a Handler) -> Self {
        debug_assert!(tokens.last().map_or(false, |t| t.is(TokenKind::Eof)));
        Self {
            tokens,
            index: 0,
            nest_depth: 0,
            handler,
        }
    }

    /// Parses the whole buffer into a statement list.
    ///
    /// Errors are reported through the handler and recovery continues at
    /// the next statement, so the returned list holds every statement that
    /// parsed cleanly.
    pub fn parse(&mut self) -> Vec<Stmt> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            match self.declaration(false) {
                Ok(Some(stmt)) => statements.push(stmt),
                Ok(None) => break,
                Err(ParseError) => self.synchronize(),
            }
        }

        if !self.handler.has_errors() && !self.is_at_end() {
            let token = self.current().clone();
            self.error(
                token.span,
                &format!("Failed to parse token '{}'", token.lexeme),
            );
        }

        statements
    }

    // =========================================================================
    // Token cursor
    // =========================================================================

    pub(crate) fn current(&self) -> &Token {
        &self.tokens[self.index]
    }

    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.index.saturating_sub(1)]
    }

    /// The token after the current one; saturates at `Eof`.
    pub(crate) fn next(&self) -> &Token {
        self.tokens
            .get(self.index + 1)
            .unwrap_or_else(|| &self.tokens[self.tokens.len() - 1])
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.current().is(TokenKind::Eof)
    }

    pub(crate) fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.index += 1;
        }
        self.previous().clone()
    }

    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.current().is(kind)
    }

    /// Consumes the current token if it has the given kind.
    pub(crate) fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consumes the current token if it has any of the given kinds.
    pub(crate) fn match_any(&mut self, kinds: &[TokenKind]) -> bool {
        for &kind in kinds {
            if self.check(kind) {
                self.advance();
                return true;
            }
        }
        false
    }

    /// Consumes a token of the given kind or reports `message`.
    pub(crate) fn consume(&mut self, kind: TokenKind, message: &str) -> PResult<Token> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        let span = self.current().span;
        Err(self.error(span, message))
    }

    // =========================================================================
    // Errors and recovery
    // =========================================================================

    /// Reports a syntax diagnostic and returns the recovery marker.
    pub(crate) fn error(&self, span: Span, message: &str) -> ParseError {
        self.handler.syntax_error(span, message);
        ParseError
    }

    /// Unwraps an optional sub-node, reporting `message` when it is absent.
    ///
    /// The report points at the current token and names the token before it,
    /// e.g. `Expected a variable initializer (after '=')`.
    pub(crate) fn require<T>(&self, node: Option<T>, message: &str) -> PResult<T> {
        match node {
            Some(node) => Ok(node),
            None => {
                let span = self.current().span;
                let after = self.previous().lexeme.clone();
                Err(self.error(span, &format!("{} (after '{}')", message, after)))
            },
        }
    }

    /// Panic-mode resynchronisation.
    ///
    /// Skips tokens until just past a statement terminator, or until a
    /// token that plausibly starts a fresh statement.
    pub(crate) fn synchronize(&mut self) {
        self.nest_depth = 0;
        self.advance();

        while !self.is_at_end() {
            if self.previous().is(TokenKind::Semicolon) {
                return;
            }

            match self.current().kind {
                TokenKind::Lambda
                | TokenKind::Const
                | TokenKind::Print
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Dollar
                | TokenKind::LBrace
                | TokenKind::Assert
                | TokenKind::For
                | TokenKind::Forever
                | TokenKind::Goto => return,
                _ => {
                    self.advance();
                },
            }
        }
    }

    /// Enters a nested construct, enforcing the depth cap.
    pub(crate) fn enter_nested(&mut self, span: Span, what: &str) -> PResult<()> {
        self.nest_depth += 1;
        if self.nest_depth >= MAX_NEST_DEPTH {
            return Err(self.error(span, &format!("Maximum {} nesting depth reached", what)));
        }
        Ok(())
    }

    /// Leaves a nested construct.
    pub(crate) fn exit_nested(&mut self) {
        self.nest_depth = self.nest_depth.saturating_sub(1);
    }
}
