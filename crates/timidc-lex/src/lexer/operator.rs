//! Operator lexing.

use crate::token::TokenKind;
use crate::Lexer;

impl<'a> Lexer<'a> {
    /// Lexes an operator that may be one or two characters long.
    ///
    /// Consumes the current character; if the next character equals
    /// `follow`, consumes it too and produces `two` instead of `one`.
    pub(super) fn one_or_two(&mut self, one: TokenKind, two: TokenKind, follow: char) {
        self.cursor.advance();

        if self.cursor.current_char() == follow {
            self.cursor.advance();
            self.add_token(two);
        } else {
            self.add_token(one);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Lexer, TokenKind};
    use timidc_util::Handler;

    #[test]
    fn test_eq_vs_eqeq() {
        let handler = Handler::new();
        let tokens = Lexer::new("= == =", &handler).lex();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::Eq, TokenKind::EqEq, TokenKind::Eq, TokenKind::Eof]
        );
    }

    #[test]
    fn test_operator_lexemes() {
        let handler = Handler::new();
        let tokens = Lexer::new("<= |-", &handler).lex();
        assert_eq!(tokens[0].lexeme, "<=");
        assert_eq!(tokens[1].lexeme, "|-");
    }

    #[test]
    fn test_three_equals_is_eqeq_then_eq() {
        let handler = Handler::new();
        let tokens = Lexer::new("===", &handler).lex();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::EqEq, TokenKind::Eq, TokenKind::Eof]);
    }
}
