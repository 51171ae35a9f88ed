//! String literal lexing.

use timidc_util::Span;

use crate::token::{Literal, TokenKind};
use crate::Lexer;

impl<'a> Lexer<'a> {
    /// Lexes a string delimited by `"` or `'`.
    ///
    /// In the escaped form `\n`, `\t`, `\"`, `\'`, and `\\` are resolved;
    /// an unknown escape keeps the escaped character as-is. Raw strings
    /// (prefixed `r` or `R`) take every character literally up to the
    /// closing delimiter.
    ///
    /// A missing closing delimiter raises a *Missing Quote* diagnostic and
    /// the scan resumes at end of input.
    pub(super) fn lex_string(&mut self, opener: char, raw: bool) {
        self.cursor.advance(); // the opening quote

        let mut content = String::new();

        loop {
            if self.cursor.is_at_end() {
                let span = Span::point(
                    self.cursor.position(),
                    self.cursor.line(),
                    self.cursor.column(),
                );
                self.handler
                    .missing_quote(span, format!("Missing '{}' string delimiter", opener));
                break;
            }

            let c = self.cursor.current_char();
            if c == opener {
                self.cursor.advance(); // the closing quote
                break;
            }

            if c == '\\' && !raw {
                self.cursor.advance();
                let escaped = self.cursor.current_char();
                if !self.cursor.is_at_end() {
                    content.push(resolve_escape(escaped));
                    self.cursor.advance();
                }
                continue;
            }

            content.push(c);
            self.cursor.advance();
        }

        self.add_token_with(TokenKind::Str, content.clone(), Some(Literal::Str(content)));
    }
}

/// Resolves a character following a backslash.
fn resolve_escape(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        _ => c, // '"', '\'', '\\', and anything unknown pass through
    }
}
