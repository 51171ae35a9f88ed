//! Core lexer implementation.

use timidc_util::{Handler, Span};

use crate::cursor::Cursor;
use crate::token::{keyword, Literal, Token, TokenKind};

/// Lexer for the Timid programming language.
///
/// Consumes a source buffer and produces a finite token sequence ending in
/// a single [`TokenKind::Eof`]. Lexical errors are reported through the
/// handler; the lexer never aborts.
pub struct Lexer<'a> {
    /// Character cursor for source traversal.
    pub(super) cursor: Cursor<'a>,

    /// Error handler shared with the rest of the pipeline.
    pub(super) handler: &'a Handler,

    /// Tokens produced so far.
    tokens: Vec<Token>,

    /// Starting byte offset of the current token.
    pub(super) token_start: usize,

    /// Line number where the current token starts (1-based).
    pub(super) token_start_line: u32,

    /// Column number where the current token starts (1-based).
    pub(super) token_start_column: u32,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given source code.
    pub fn new(source: &'a str, handler: &'a Handler) -> Self {
        Self {
            cursor: Cursor::new(source),
            handler,
            tokens: Vec::new(),
            token_start: 0,
            token_start_line: 1,
            token_start_column: 1,
        }
    }

    /// Lexes the whole buffer and returns the token sequence.
    ///
    /// The result always ends with exactly one `Eof` token, even when
    /// errors were reported along the way.
    pub fn lex(mut self) -> Vec<Token> {
        while !self.cursor.is_at_end() {
            self.scan_token();
        }

        let span = Span::point(self.cursor.position(), self.cursor.line(), self.cursor.column());
        self.tokens.push(Token::new(TokenKind::Eof, "[EOF]", None, span));
        self.tokens
    }

    /// Scans a single token (or skips trivia) at the cursor.
    fn scan_token(&mut self) {
        self.skip_whitespace();
        if self.cursor.is_at_end() {
            return;
        }

        self.begin_token();

        match self.cursor.current_char() {
            '+' => self.one_or_two(TokenKind::Plus, TokenKind::PlusEq, '='),
            '-' => self.one_or_two(TokenKind::Minus, TokenKind::MinusEq, '='),
            '*' => self.one_or_two(TokenKind::Star, TokenKind::StarEq, '='),
            '/' => self.one_or_two(TokenKind::Slash, TokenKind::SlashEq, '='),
            '%' => self.one_or_two(TokenKind::Percent, TokenKind::PercentEq, '='),
            '^' => self.one_or_two(TokenKind::Caret, TokenKind::CaretEq, '='),

            '=' => self.one_or_two(TokenKind::Eq, TokenKind::EqEq, '='),
            '!' => self.one_or_two(TokenKind::Not, TokenKind::NotEq, '='),
            '<' => self.one_or_two(TokenKind::Lt, TokenKind::LtEq, '='),
            '>' => self.one_or_two(TokenKind::Gt, TokenKind::GtEq, '='),
            '|' => self.one_or_two(TokenKind::Pipe, TokenKind::Assert, '-'),

            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            '{' => self.single(TokenKind::LBrace),
            '}' => self.single(TokenKind::RBrace),
            '[' => self.single(TokenKind::LBracket),
            ']' => self.single(TokenKind::RBracket),

            '@' => self.single(TokenKind::At),
            '?' => self.single(TokenKind::Question),
            '.' => self.single(TokenKind::Dot),
            ',' => self.single(TokenKind::Comma),
            ':' => self.single(TokenKind::Colon),
            ';' | '\n' => self.single(TokenKind::Semicolon),
            '$' => self.single(TokenKind::Dollar),

            '"' | '\'' => {
                let opener = self.cursor.current_char();
                self.lex_string(opener, false);
            },
            '~' => self.skip_comment(),

            c if (c == 'r' || c == 'R') && matches!(self.cursor.peek_char(1), '"' | '\'') => {
                self.cursor.advance(); // the r prefix
                let opener = self.cursor.current_char();
                self.lex_string(opener, true);
            },
            c if c.is_ascii_digit() => self.lex_number(),
            c if c.is_ascii_alphabetic() || c == '_' => self.lex_identifier(),
            c => {
                self.cursor.advance();
                self.handler.invalid_character(
                    self.token_span(),
                    format!("Invalid character '{}'", c),
                );
            },
        }
    }

    /// Records the start position of the token about to be scanned.
    pub(super) fn begin_token(&mut self) {
        self.token_start = self.cursor.position();
        self.token_start_line = self.cursor.line();
        self.token_start_column = self.cursor.column();
    }

    /// The span from the recorded token start to the cursor.
    pub(super) fn token_span(&self) -> Span {
        Span::new(
            self.token_start,
            self.cursor.position(),
            self.token_start_line,
            self.token_start_column,
        )
    }

    /// Pushes a token whose lexeme is the scanned source slice.
    pub(super) fn add_token(&mut self, kind: TokenKind) {
        let lexeme = self.cursor.slice_from(self.token_start).to_string();
        let span = self.token_span();
        self.tokens.push(Token::new(kind, lexeme, None, span));
    }

    /// Pushes a token with an explicit lexeme and literal payload.
    pub(super) fn add_token_with(
        &mut self,
        kind: TokenKind,
        lexeme: impl Into<String>,
        literal: Option<Literal>,
    ) {
        let span = self.token_span();
        self.tokens.push(Token::new(kind, lexeme, literal, span));
    }

    /// Consumes one character and pushes a single-character token.
    fn single(&mut self, kind: TokenKind) {
        self.cursor.advance();
        self.add_token(kind);
    }

    /// Looks up an identifier in the keyword table.
    pub(super) fn identifier_kind(&self, lexeme: &str) -> TokenKind {
        keyword(lexeme).unwrap_or(TokenKind::Identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> (Vec<Token>, Handler) {
        let handler = Handler::new();
        let tokens = Lexer::new(source, &handler).lex();
        (tokens, handler)
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, handler) = lex(source);
        assert!(!handler.has_errors(), "unexpected lex errors for {:?}", source);
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_empty_source_is_just_eof() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_statement_terminators() {
        use TokenKind::*;
        assert_eq!(kinds("1;2\n3"), vec![Int, Semicolon, Int, Semicolon, Int, Eof]);
    }

    #[test]
    fn test_representative_program() {
        use TokenKind::*;
        let source = "$x = 1\nwhile x < 10 { x += 1; print x }";
        assert_eq!(
            kinds(source),
            vec![
                Dollar, Identifier, Eq, Int, Semicolon, While, Identifier, Lt, Int, LBrace,
                Identifier, PlusEq, Int, Semicolon, Print, Identifier, RBrace, Eof,
            ]
        );
    }

    #[test]
    fn test_two_char_operators() {
        use TokenKind::*;
        assert_eq!(
            kinds("== != <= >= |- += -= *= /= %= ^="),
            vec![EqEq, NotEq, LtEq, GtEq, Assert, PlusEq, MinusEq, StarEq, SlashEq, PercentEq, CaretEq, Eof]
        );
    }

    #[test]
    fn test_lone_pipe_is_not_assert() {
        assert_eq!(kinds("|"), vec![TokenKind::Pipe, TokenKind::Eof]);
    }

    #[test]
    fn test_keywords_and_identifiers() {
        use TokenKind::*;
        assert_eq!(
            kinds("forever breaker break _tmp x1"),
            vec![Forever, Identifier, Break, Identifier, Identifier, Eof]
        );
    }

    #[test]
    fn test_invalid_character_reports_and_continues() {
        let (tokens, handler) = lex("1 # 2");
        assert!(handler.has_errors());
        assert_eq!(handler.error_count(), 1);

        let diagnostic = &handler.diagnostics()[0];
        assert_eq!(diagnostic.message, "Invalid character '#'");
        assert_eq!(diagnostic.span.start, 2);
        assert_eq!(diagnostic.span.end, 3);

        // The rest of the buffer is still lexed
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::Int, TokenKind::Int, TokenKind::Eof]);
    }

    #[test]
    fn test_token_spans_across_lines() {
        let (tokens, _) = lex("print\nvalue");
        assert_eq!(tokens[0].span.line, 1);
        assert_eq!(tokens[0].span.column, 1);
        // The newline token
        assert_eq!(tokens[1].kind, TokenKind::Semicolon);
        // `value` starts line 2, column 1
        assert_eq!(tokens[2].span.line, 2);
        assert_eq!(tokens[2].span.column, 1);
        assert_eq!(tokens[2].span.start, 6);
        assert_eq!(tokens[2].span.end, 11);
    }

    #[test]
    fn test_exactly_one_eof() {
        let (tokens, _) = lex("1 2 3");
        let eofs = tokens.iter().filter(|t| t.kind == TokenKind::Eof).count();
        assert_eq!(eofs, 1);
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
    }
}
