//! Whitespace and comment skipping.

use crate::Lexer;

impl<'a> Lexer<'a> {
    /// Skips whitespace other than newlines.
    ///
    /// Newlines are significant (they terminate statements) and are lexed
    /// as `Semicolon` tokens by the dispatcher.
    pub(super) fn skip_whitespace(&mut self) {
        loop {
            let c = self.cursor.current_char();
            if c != '\n' && c.is_whitespace() {
                self.cursor.advance();
            } else {
                break;
            }
        }
    }

    /// Skips a comment starting at a `~`.
    ///
    /// `~` introduces a line comment running to the end of the line;
    /// `~~` opens a block comment closed by the next `~~`. An unterminated
    /// block comment silently consumes the rest of the input.
    pub(super) fn skip_comment(&mut self) {
        self.cursor.advance(); // the first '~'

        if self.cursor.current_char() == '~' {
            self.cursor.advance(); // the second '~'
            while !self.cursor.is_at_end() {
                if self.cursor.current_char() == '~' && self.cursor.peek_char(1) == '~' {
                    self.cursor.advance();
                    self.cursor.advance();
                    return;
                }
                self.cursor.advance();
            }
        } else {
            while !self.cursor.is_at_end() && self.cursor.current_char() != '\n' {
                self.cursor.advance();
            }
        }
    }
}
