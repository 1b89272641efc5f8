//! Chunk classification with bounded lookahead.
//!
//! Pulls at most two tokens from the incremental lexer and never invokes
//! the parser.

use cinder_lexer::{Lexer, TokenKind};
use cinder_types::SourceFile;
use tracing::debug;

/// What kind of syntactic unit a chunk is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Nothing but whitespace and comments; more input is needed.
    EndOfInput,
    StatementOrExpression,
    DeclarationUnit,
    /// A token that can never start a chunk.
    Invalid,
}

/// Classify `source` from its first one or two tokens.
pub fn classify(source: &SourceFile) -> Classification {
    let mut lexer = Lexer::new(source);
    let first = lexer.next_token().kind;
    let classification = match first {
        TokenKind::Eof => Classification::EndOfInput,

        TokenKind::Abstract
        | TokenKind::Class
        | TokenKind::Enum
        | TokenKind::Interface
        | TokenKind::Internal
        | TokenKind::Namespace
        | TokenKind::Private
        | TokenKind::Protected
        | TokenKind::Public
        | TokenKind::Sealed
        | TokenKind::Static
        | TokenKind::Struct
        | TokenKind::LBracket => Classification::DeclarationUnit,

        TokenKind::Bool
        | TokenKind::Double
        | TokenKind::Float
        | TokenKind::Int
        | TokenKind::Long
        | TokenKind::Object
        | TokenKind::KwString
        | TokenKind::Void
        | TokenKind::Var
        | TokenKind::New => Classification::StatementOrExpression,

        TokenKind::Using => match lexer.next_token().kind {
            TokenKind::Identifier(_) => Classification::DeclarationUnit,
            TokenKind::Eof => Classification::EndOfInput,
            _ => Classification::StatementOrExpression,
        },
        TokenKind::Delegate => match lexer.next_token().kind {
            TokenKind::LParen | TokenKind::LBrace => Classification::StatementOrExpression,
            TokenKind::Eof => Classification::EndOfInput,
            _ => Classification::DeclarationUnit,
        },
        TokenKind::Unsafe => match lexer.next_token().kind {
            TokenKind::LBrace => Classification::StatementOrExpression,
            TokenKind::Eof => Classification::EndOfInput,
            _ => Classification::DeclarationUnit,
        },

        TokenKind::Readonly | TokenKind::Override | TokenKind::Unknown(_) => {
            Classification::Invalid
        }

        _ => Classification::StatementOrExpression,
    };
    debug!(?classification, "classified chunk");
    classification
}
