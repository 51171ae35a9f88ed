//! Number literal lexing.

use crate::token::{Literal, TokenKind};
use crate::Lexer;

impl<'a> Lexer<'a> {
    /// Lexes a decimal number.
    ///
    /// A `.` followed by another digit turns the literal into a float;
    /// otherwise the dot is left for the dispatcher (`1.` lexes as the
    /// integer `1` and a `Dot` token).
    pub(super) fn lex_number(&mut self) {
        while self.cursor.current_char().is_ascii_digit() {
            self.cursor.advance();
        }

        let mut is_float = false;
        if self.cursor.current_char() == '.' && self.cursor.peek_char(1).is_ascii_digit() {
            is_float = true;
            self.cursor.advance(); // the dot
            while self.cursor.current_char().is_ascii_digit() {
                self.cursor.advance();
            }
        }

        let lexeme = self.cursor.slice_from(self.token_start).to_string();
        if is_float {
            let value: f64 = lexeme.parse().unwrap_or(f64::NAN);
            self.add_token_with(TokenKind::Float, lexeme, Some(Literal::Float(value)));
        } else {
            match lexeme.parse::<i64>() {
                Ok(value) => {
                    self.add_token_with(TokenKind::Int, lexeme, Some(Literal::Int(value)));
                },
                // Integers wider than i64 degrade to floats instead of
                // failing the scan.
                Err(_) => {
                    let value: f64 = lexeme.parse().unwrap_or(f64::NAN);
                    self.add_token_with(TokenKind::Float, lexeme, Some(Literal::Float(value)));
                },
            }
        }
    }
}
