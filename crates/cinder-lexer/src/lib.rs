//! Cinder lexer: converts source text into a token stream.
//!
//! Tokens can be pulled one at a time with [`Lexer::next_token`] (the
//! classifier only ever looks at the first two) or collected with
//! [`Lexer::lex`].

pub mod lexer;
pub mod token;

pub use lexer::{LexResult, Lexer};
pub use token::{Token, TokenKind, ALL_KEYWORDS};
