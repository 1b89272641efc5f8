//! Lexer tests.
//!
//! Covers: keywords, operators, numeric and string literals, comments,
//! end-of-input detection inside strings and block comments, invalid
//! characters, and the pull-based `next_token` interface.

use cinder_lexer::{Lexer, TokenKind};
use cinder_types::{ErrorCode, SourceFile};
use pretty_assertions::assert_eq;

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

/// Lex source text and return just the token kinds (excluding final Eof).
fn kinds(source: &str) -> Vec<TokenKind> {
    let sf = SourceFile::new("{interactive}", source);
    Lexer::new(&sf)
        .lex()
        .tokens
        .into_iter()
        .filter(|t| t.kind != TokenKind::Eof)
        .map(|t| t.kind)
        .collect()
}

/// Lex and return the codes of every error.
fn error_codes(source: &str) -> Vec<ErrorCode> {
    let sf = SourceFile::new("{interactive}", source);
    Lexer::new(&sf)
        .lex()
        .errors
        .errors
        .iter()
        .map(|e| e.code)
        .collect()
}

fn ident(name: &str) -> TokenKind {
    TokenKind::Identifier(name.to_string())
}

// ─────────────────────────────────────────────────────────────────────
// Keywords & identifiers
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_declaration_keywords() {
    assert_eq!(
        kinds("public static class Foo"),
        vec![TokenKind::Public, TokenKind::Static, TokenKind::Class, ident("Foo")]
    );
    assert_eq!(
        kinds("namespace using enum interface struct"),
        vec![
            TokenKind::Namespace,
            TokenKind::Using,
            TokenKind::Enum,
            TokenKind::Interface,
            TokenKind::Struct
        ]
    );
}

#[test]
fn test_type_keywords() {
    assert_eq!(
        kinds("int long double float bool string object var void"),
        vec![
            TokenKind::Int,
            TokenKind::Long,
            TokenKind::Double,
            TokenKind::Float,
            TokenKind::Bool,
            TokenKind::KwString,
            TokenKind::Object,
            TokenKind::Var,
            TokenKind::Void
        ]
    );
}

#[test]
fn test_identifiers_with_underscores_and_digits() {
    assert_eq!(
        kinds("_x x1 Console"),
        vec![ident("_x"), ident("x1"), ident("Console")]
    );
}

#[test]
fn test_keyword_prefix_is_identifier() {
    assert_eq!(kinds("classy intx"), vec![ident("classy"), ident("intx")]);
}

// ─────────────────────────────────────────────────────────────────────
// Operators
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_all_operator_tokens() {
    assert_eq!(
        kinds("+ - * / % ++ -- = += -= *= /= %= == ! != < <= > >= && || ? ??"),
        vec![
            TokenKind::Plus,
            TokenKind::Minus,
            TokenKind::Star,
            TokenKind::Slash,
            TokenKind::Percent,
            TokenKind::PlusPlus,
            TokenKind::MinusMinus,
            TokenKind::Eq,
            TokenKind::PlusEq,
            TokenKind::MinusEq,
            TokenKind::StarEq,
            TokenKind::SlashEq,
            TokenKind::PercentEq,
            TokenKind::EqEq,
            TokenKind::Bang,
            TokenKind::BangEq,
            TokenKind::Less,
            TokenKind::LessEq,
            TokenKind::Greater,
            TokenKind::GreaterEq,
            TokenKind::AmpAmp,
            TokenKind::PipePipe,
            TokenKind::Question,
            TokenKind::QuestionQuestion,
        ]
    );
}

#[test]
fn test_punctuation() {
    assert_eq!(
        kinds(". , ; : ( ) { } [ ]"),
        vec![
            TokenKind::Dot,
            TokenKind::Comma,
            TokenKind::Semicolon,
            TokenKind::Colon,
            TokenKind::LParen,
            TokenKind::RParen,
            TokenKind::LBrace,
            TokenKind::RBrace,
            TokenKind::LBracket,
            TokenKind::RBracket,
        ]
    );
}

#[test]
fn test_no_space_expression() {
    assert_eq!(
        kinds("x+=a++*-1;"),
        vec![
            ident("x"),
            TokenKind::PlusEq,
            ident("a"),
            TokenKind::PlusPlus,
            TokenKind::Star,
            TokenKind::Minus,
            TokenKind::IntLit(1),
            TokenKind::Semicolon,
        ]
    );
}

// ─────────────────────────────────────────────────────────────────────
// Numeric literals
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_integer_literals() {
    assert_eq!(
        kinds("0 42 7L 0xFF"),
        vec![
            TokenKind::IntLit(0),
            TokenKind::IntLit(42),
            TokenKind::IntLit(7),
            TokenKind::IntLit(255),
        ]
    );
}

#[test]
fn test_floating_literals() {
    assert_eq!(
        kinds("3.5 .25 1e3 2f 4d 1.5e-1"),
        vec![
            TokenKind::DoubleLit(3.5),
            TokenKind::DoubleLit(0.25),
            TokenKind::DoubleLit(1000.0),
            TokenKind::DoubleLit(2.0),
            TokenKind::DoubleLit(4.0),
            TokenKind::DoubleLit(0.15),
        ]
    );
}

#[test]
fn test_member_access_on_integer_is_not_a_fraction() {
    assert_eq!(
        kinds("5.ToString()"),
        vec![
            TokenKind::IntLit(5),
            TokenKind::Dot,
            ident("ToString"),
            TokenKind::LParen,
            TokenKind::RParen,
        ]
    );
}

#[test]
fn test_integer_overflow_is_invalid_literal() {
    assert_eq!(
        error_codes("99999999999999999999"),
        vec![ErrorCode::INVALID_LITERAL]
    );
}

#[test]
fn test_malformed_number_suffix() {
    assert_eq!(error_codes("12abc"), vec![ErrorCode::INVALID_LITERAL]);
    assert_eq!(error_codes("1.5L"), vec![ErrorCode::INVALID_LITERAL]);
}

// ─────────────────────────────────────────────────────────────────────
// String literals
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_string_literal_with_escapes() {
    assert_eq!(
        kinds(r#""a\tb\n\"c\"\\""#),
        vec![TokenKind::StringLit("a\tb\n\"c\"\\".into())]
    );
}

#[test]
fn test_unterminated_string_is_unexpected_eof() {
    assert_eq!(error_codes("\"hello"), vec![ErrorCode::UNEXPECTED_EOF]);
}

#[test]
fn test_newline_in_string_is_invalid_literal() {
    assert_eq!(
        error_codes("\"hello\nworld\""),
        vec![ErrorCode::INVALID_LITERAL, ErrorCode::UNEXPECTED_EOF]
    );
}

#[test]
fn test_unknown_escape() {
    assert_eq!(error_codes(r#""\q""#), vec![ErrorCode::INVALID_LITERAL]);
}

// ─────────────────────────────────────────────────────────────────────
// Comments
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_line_comment_skipped() {
    assert_eq!(
        kinds("1 // one\n2"),
        vec![TokenKind::IntLit(1), TokenKind::IntLit(2)]
    );
}

#[test]
fn test_block_comment_skipped() {
    assert_eq!(
        kinds("1 /* a\n b */ 2"),
        vec![TokenKind::IntLit(1), TokenKind::IntLit(2)]
    );
}

#[test]
fn test_unterminated_block_comment_is_unexpected_eof() {
    assert_eq!(kinds("x /* never closed"), vec![ident("x")]);
    assert_eq!(error_codes("x /* never closed"), vec![ErrorCode::UNEXPECTED_EOF]);
}

#[test]
fn test_comment_only_input_is_empty() {
    assert!(kinds("// nothing here").is_empty());
    assert!(error_codes("// nothing here").is_empty());
}

// ─────────────────────────────────────────────────────────────────────
// Invalid characters & pull interface
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_invalid_character_becomes_unknown_token() {
    assert_eq!(kinds("# x"), vec![TokenKind::Unknown('#'), ident("x")]);
    assert_eq!(error_codes("# x"), vec![ErrorCode::INVALID_CHARACTER]);
}

#[test]
fn test_non_ascii_character_is_one_unknown_token() {
    assert_eq!(kinds("λ"), vec![TokenKind::Unknown('λ')]);
}

#[test]
fn test_single_ampersand_is_invalid() {
    assert_eq!(kinds("&"), vec![TokenKind::Unknown('&')]);
}

#[test]
fn test_next_token_stops_early() {
    let sf = SourceFile::new("{interactive}", "using System; \"unterminated");
    let mut lexer = Lexer::new(&sf);
    assert_eq!(lexer.next_token().kind, TokenKind::Using);
    assert_eq!(lexer.next_token().kind, ident("System"));
    // Nothing past the second token has been scanned yet.
    assert!(!lexer.errors().has_errors());
}

#[test]
fn test_empty_and_whitespace_input() {
    for src in ["", "   ", "\n\t\r\n"] {
        let sf = SourceFile::new("{interactive}", src);
        let mut lexer = Lexer::new(&sf);
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
    }
}

#[test]
fn test_lexing_is_deterministic() {
    let source = "namespace N { class A { static int F(int x) { return x * 2; } } }";
    let first = kinds(source);
    for _ in 0..20 {
        assert_eq!(kinds(source), first);
    }
}
