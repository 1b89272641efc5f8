//! Token types for the Cinder lexer.
//!
//! Defines [`TokenKind`] covering every lexeme of the language and
//! [`Token`], which pairs a kind with a source [`Span`].

use cinder_types::Span;
use std::fmt;

/// Every reserved word recognised by the lexer.
///
/// These cannot be used as identifiers. `true`, `false` and `null` are
/// listed here as well since they lex to dedicated literal tokens.
pub const ALL_KEYWORDS: &[&str] = &[
    // Declarations & modifiers
    "abstract", "class", "const", "delegate", "enum", "interface", "internal",
    "namespace", "override", "private", "protected", "public", "readonly",
    "sealed", "static", "struct", "unsafe", "using", "virtual",
    // Statements
    "break", "continue", "do", "else", "for", "if", "return", "throw", "while",
    // Expressions
    "new", "this", "true", "false", "null",
    // Type names
    "bool", "double", "float", "int", "long", "object", "string", "var", "void",
];

// ─────────────────────────────────────────────────────────────────────
// Token
// ─────────────────────────────────────────────────────────────────────

/// A single token produced by the Cinder lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// What kind of token this is.
    pub kind: TokenKind,
    /// Source location.
    pub span: Span,
}

impl Token {
    /// Create a new token.
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Returns `true` if this token is a reserved keyword.
    pub fn is_keyword(&self) -> bool {
        self.kind.is_keyword()
    }
}

// ─────────────────────────────────────────────────────────────────────
// TokenKind
// ─────────────────────────────────────────────────────────────────────

/// Every token kind in the Cinder language.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ── Literals ──────────────────────────────────────────────
    /// Integer literal: `42`, `0xFF`, `7L`
    IntLit(i64),
    /// Floating literal: `3.14`, `1e3`, `2f`
    DoubleLit(f64),
    /// `"hello\n"` with escapes already decoded
    StringLit(String),
    True,
    False,
    Null,

    // ── Identifiers ──────────────────────────────────────────
    Identifier(String),

    // ── Declaration keywords ─────────────────────────────────
    Abstract,
    Class,
    Const,
    Delegate,
    Enum,
    Interface,
    Internal,
    Namespace,
    Override,
    Private,
    Protected,
    Public,
    Readonly,
    Sealed,
    Static,
    Struct,
    Unsafe,
    Using,
    Virtual,

    // ── Statement keywords ───────────────────────────────────
    Break,
    Continue,
    Do,
    Else,
    For,
    If,
    Return,
    Throw,
    While,

    // ── Expression keywords ──────────────────────────────────
    New,
    This,

    // ── Type keywords ────────────────────────────────────────
    Bool,
    Double,
    Float,
    Int,
    Long,
    Object,
    KwString,
    Var,
    Void,

    // ── Operators ────────────────────────────────────────────
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    Eq,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    EqEq,
    Bang,
    BangEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    AmpAmp,
    PipePipe,
    Question,
    QuestionQuestion,

    // ── Punctuation ──────────────────────────────────────────
    Dot,
    Comma,
    Semicolon,
    Colon,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    // ── Special ──────────────────────────────────────────────
    /// A character the language does not recognise. The lexer records
    /// an E102 diagnostic alongside it.
    Unknown(char),
    /// End of input.
    Eof,
}

impl TokenKind {
    /// Look up a keyword by its source text.
    pub fn from_keyword(text: &str) -> Option<TokenKind> {
        let kind = match text {
            "abstract" => Self::Abstract,
            "class" => Self::Class,
            "const" => Self::Const,
            "delegate" => Self::Delegate,
            "enum" => Self::Enum,
            "interface" => Self::Interface,
            "internal" => Self::Internal,
            "namespace" => Self::Namespace,
            "override" => Self::Override,
            "private" => Self::Private,
            "protected" => Self::Protected,
            "public" => Self::Public,
            "readonly" => Self::Readonly,
            "sealed" => Self::Sealed,
            "static" => Self::Static,
            "struct" => Self::Struct,
            "unsafe" => Self::Unsafe,
            "using" => Self::Using,
            "virtual" => Self::Virtual,

            "break" => Self::Break,
            "continue" => Self::Continue,
            "do" => Self::Do,
            "else" => Self::Else,
            "for" => Self::For,
            "if" => Self::If,
            "return" => Self::Return,
            "throw" => Self::Throw,
            "while" => Self::While,

            "new" => Self::New,
            "this" => Self::This,
            "true" => Self::True,
            "false" => Self::False,
            "null" => Self::Null,

            "bool" => Self::Bool,
            "double" => Self::Double,
            "float" => Self::Float,
            "int" => Self::Int,
            "long" => Self::Long,
            "object" => Self::Object,
            "string" => Self::KwString,
            "var" => Self::Var,
            "void" => Self::Void,
            _ => return None,
        };
        Some(kind)
    }

    /// Returns `true` if this kind is a reserved keyword.
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            Self::Abstract
                | Self::Class
                | Self::Const
                | Self::Delegate
                | Self::Enum
                | Self::Interface
                | Self::Internal
                | Self::Namespace
                | Self::Override
                | Self::Private
                | Self::Protected
                | Self::Public
                | Self::Readonly
                | Self::Sealed
                | Self::Static
                | Self::Struct
                | Self::Unsafe
                | Self::Using
                | Self::Virtual
                | Self::Break
                | Self::Continue
                | Self::Do
                | Self::Else
                | Self::For
                | Self::If
                | Self::Return
                | Self::Throw
                | Self::While
                | Self::New
                | Self::This
                | Self::True
                | Self::False
                | Self::Null
                | Self::Bool
                | Self::Double
                | Self::Float
                | Self::Int
                | Self::Long
                | Self::Object
                | Self::KwString
                | Self::Var
                | Self::Void
        )
    }

    /// Returns `true` for the built-in type keywords (`int`, `string`, ...).
    pub fn is_type_keyword(&self) -> bool {
        matches!(
            self,
            Self::Bool
                | Self::Double
                | Self::Float
                | Self::Int
                | Self::Long
                | Self::Object
                | Self::KwString
                | Self::Var
                | Self::Void
        )
    }

    /// Returns `true` for declaration modifiers.
    pub fn is_modifier(&self) -> bool {
        matches!(
            self,
            Self::Public
                | Self::Private
                | Self::Protected
                | Self::Internal
                | Self::Static
                | Self::Abstract
                | Self::Sealed
                | Self::Readonly
                | Self::Const
                | Self::Virtual
                | Self::Override
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::IntLit(n) => return write!(f, "{n}"),
            Self::DoubleLit(n) => return write!(f, "{n}"),
            Self::StringLit(s) => return write!(f, "\"{s}\""),
            Self::Identifier(name) => return write!(f, "{name}"),
            Self::Unknown(ch) => return write!(f, "{ch}"),

            Self::True => "true",
            Self::False => "false",
            Self::Null => "null",

            Self::Abstract => "abstract",
            Self::Class => "class",
            Self::Const => "const",
            Self::Delegate => "delegate",
            Self::Enum => "enum",
            Self::Interface => "interface",
            Self::Internal => "internal",
            Self::Namespace => "namespace",
            Self::Override => "override",
            Self::Private => "private",
            Self::Protected => "protected",
            Self::Public => "public",
            Self::Readonly => "readonly",
            Self::Sealed => "sealed",
            Self::Static => "static",
            Self::Struct => "struct",
            Self::Unsafe => "unsafe",
            Self::Using => "using",
            Self::Virtual => "virtual",

            Self::Break => "break",
            Self::Continue => "continue",
            Self::Do => "do",
            Self::Else => "else",
            Self::For => "for",
            Self::If => "if",
            Self::Return => "return",
            Self::Throw => "throw",
            Self::While => "while",

            Self::New => "new",
            Self::This => "this",

            Self::Bool => "bool",
            Self::Double => "double",
            Self::Float => "float",
            Self::Int => "int",
            Self::Long => "long",
            Self::Object => "object",
            Self::KwString => "string",
            Self::Var => "var",
            Self::Void => "void",

            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::PlusPlus => "++",
            Self::MinusMinus => "--",
            Self::Eq => "=",
            Self::PlusEq => "+=",
            Self::MinusEq => "-=",
            Self::StarEq => "*=",
            Self::SlashEq => "/=",
            Self::PercentEq => "%=",
            Self::EqEq => "==",
            Self::Bang => "!",
            Self::BangEq => "!=",
            Self::Less => "<",
            Self::LessEq => "<=",
            Self::Greater => ">",
            Self::GreaterEq => ">=",
            Self::AmpAmp => "&&",
            Self::PipePipe => "||",
            Self::Question => "?",
            Self::QuestionQuestion => "??",

            Self::Dot => ".",
            Self::Comma => ",",
            Self::Semicolon => ";",
            Self::Colon => ":",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::LBracket => "[",
            Self::RBracket => "]",

            Self::Eof => "end of input",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_keyword_round_trips_through_display() {
        for &kw in ALL_KEYWORDS {
            let kind = TokenKind::from_keyword(kw);
            assert!(kind.is_some(), "'{kw}' should be a keyword");
            let kind = kind.unwrap();
            assert_eq!(kind.to_string(), kw);
        }
    }

    #[test]
    fn test_is_keyword_matches_keyword_table() {
        for &kw in ALL_KEYWORDS {
            let kind = TokenKind::from_keyword(kw).unwrap();
            assert!(kind.is_keyword(), "is_keyword should be true for '{kw}'");
        }
        assert!(!TokenKind::Identifier("foo".into()).is_keyword());
        assert!(!TokenKind::Semicolon.is_keyword());
        assert!(!TokenKind::Eof.is_keyword());
    }

    #[test]
    fn test_keyword_case_sensitivity() {
        assert!(TokenKind::from_keyword("class").is_some());
        assert!(TokenKind::from_keyword("Class").is_none());
        assert!(TokenKind::from_keyword("String").is_none());
    }

    #[test]
    fn test_type_keywords() {
        assert!(TokenKind::Int.is_type_keyword());
        assert!(TokenKind::Var.is_type_keyword());
        assert!(!TokenKind::New.is_type_keyword());
        assert!(TokenKind::Readonly.is_modifier());
        assert!(!TokenKind::Class.is_modifier());
    }

    #[test]
    fn test_display_operators_and_special() {
        assert_eq!(TokenKind::QuestionQuestion.to_string(), "??");
        assert_eq!(TokenKind::PercentEq.to_string(), "%=");
        assert_eq!(TokenKind::StringLit("hi".into()).to_string(), "\"hi\"");
        assert_eq!(TokenKind::Unknown('#').to_string(), "#");
        assert_eq!(TokenKind::Eof.to_string(), "end of input");
    }

    #[test]
    fn test_token_construction() {
        let token = Token::new(TokenKind::Class, Span::new(1, 1, 1, 5));
        assert!(token.is_keyword());
        let token = Token::new(TokenKind::Identifier("Foo".into()), Span::new(1, 7, 1, 9));
        assert!(!token.is_keyword());
    }
}
