//! Cinder parser: converts a token stream into an AST.
//!
//! A chunk is parsed either as the body of an implicit host method
//! ([`Parser::parse_statement_unit`]) or as a declaration unit
//! ([`Parser::parse_compilation_unit`]). Input that stops early reports
//! `E101` as its first diagnostic so the caller can ask for more text.

mod parse_decl;
mod parse_expr;
mod parse_stmt;
mod parse_type;
mod parser;

pub use parser::{ParseResult, Parser};

use cinder_lexer::Lexer;
use cinder_types::ast::{CompilationUnit, StatementUnit};
use cinder_types::{CompileErrors, SourceFile};

/// Lex and parse `source` as a statement unit.
pub fn parse_statements(source: &SourceFile) -> ParseResult<StatementUnit> {
    let lexed = Lexer::new(source).lex();
    let result = Parser::new(lexed.tokens, source).parse_statement_unit();
    result.with_lex_errors(lexed.errors)
}

/// Lex and parse `source` as a declaration unit.
pub fn parse_declarations(source: &SourceFile) -> ParseResult<CompilationUnit> {
    let lexed = Lexer::new(source).lex();
    let result = Parser::new(lexed.tokens, source).parse_compilation_unit();
    result.with_lex_errors(lexed.errors)
}

/// Merge lexer and parser diagnostics into source order.
pub(crate) fn merge_in_source_order(lex: CompileErrors, parse: CompileErrors) -> CompileErrors {
    let mut all: Vec<_> = lex.errors.into_iter().chain(parse.errors).collect();
    // Stable: a lexer error and a parser error at the same spot keep
    // lexer-first order.
    all.sort_by_key(|e| (e.span.start_line, e.span.start_col));
    let dropped = (lex.total_errors + parse.total_errors).saturating_sub(all.len());

    let mut merged = CompileErrors::empty();
    for error in all {
        merged.push_error(error);
    }
    merged.total_errors += dropped;
    for warning in lex.warnings.into_iter().chain(parse.warnings) {
        merged.push_warning(warning);
    }
    merged
}
