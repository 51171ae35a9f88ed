//! timidc-lex - Lexer for the Timid programming language.
//!
//! Turns a source buffer into a finite token sequence ending in
//! [`TokenKind::Eof`]. Newlines and `;` both terminate statements, `~`
//! starts comments, and strings come in escaped and raw flavours.
//!
//! Lexical errors (invalid characters, unterminated strings) are reported
//! through the shared [`timidc_util::Handler`]; lexing always continues to
//! the end of the buffer.

pub mod cursor;
mod lexer;
pub mod token;

pub use cursor::Cursor;
pub use lexer::Lexer;
pub use token::{Literal, Token, TokenKind};
