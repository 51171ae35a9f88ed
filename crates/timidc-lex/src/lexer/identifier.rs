//! Identifier and keyword lexing.

use crate::Lexer;

impl<'a> Lexer<'a> {
    /// Lexes an identifier or keyword: `[A-Za-z_][A-Za-z0-9_]*`.
    pub(super) fn lex_identifier(&mut self) {
        while {
            let c = self.cursor.current_char();
            c.is_ascii_alphanumeric() || c == '_'
        } {
            self.cursor.advance();
        }

        let lexeme = self.cursor.slice_from(self.token_start);
        let kind = self.identifier_kind(lexeme);
        self.add_token(kind);
    }
}
