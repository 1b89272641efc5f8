//! Core parser infrastructure: token cursor, error reporting, helpers.

use cinder_lexer::token::{Token, TokenKind};
use cinder_types::ast::{CompilationUnit, Ident, StatementUnit};
use cinder_types::{CinderError, CompileErrors, ErrorCode, SourceFile, Span, MAX_ERRORS};

/// Maximum nesting depth for expressions and for statements.
pub(crate) const MAX_NESTING: u32 = 64;

/// The Cinder parser.
///
/// Consumes a token stream produced by the lexer and builds an AST.
/// Collects errors and attempts recovery when possible.
pub struct Parser<'src> {
    /// The token stream.
    tokens: Vec<Token>,
    /// Current index into `tokens`.
    pos: usize,
    /// Source file for error context.
    source_file: &'src SourceFile,
    /// Collected errors.
    errors: CompileErrors,
    /// Current expression nesting depth.
    pub(crate) expr_depth: u32,
    /// Current statement nesting depth.
    pub(crate) stmt_depth: u32,
}

/// Result of parsing.
pub struct ParseResult<T> {
    /// The parsed unit; `None` only when parsing could not start at all.
    pub unit: Option<T>,
    pub errors: CompileErrors,
}

impl<T> ParseResult<T> {
    /// Returns `true` if the first diagnostic says the input ended early.
    pub fn is_partial(&self) -> bool {
        self.errors.is_partial_input()
    }

    /// Fold lexer diagnostics in, keeping source order.
    pub(crate) fn with_lex_errors(self, lex_errors: CompileErrors) -> Self {
        Self {
            unit: self.unit,
            errors: crate::merge_in_source_order(lex_errors, self.errors),
        }
    }
}

impl<'src> Parser<'src> {
    /// Create a new parser from a token stream and source file.
    pub fn new(mut tokens: Vec<Token>, source_file: &'src SourceFile) -> Self {
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            let span = tokens.last().map_or(Span::point(1, 1), |t| t.span);
            tokens.push(Token::new(TokenKind::Eof, span));
        }
        Self {
            tokens,
            pos: 0,
            source_file,
            errors: CompileErrors::empty(),
            expr_depth: 0,
            stmt_depth: 0,
        }
    }

    // ── Token Cursor ──────────────────────────────────────────────────────────

    /// Returns the current token without advancing.
    pub(crate) fn peek(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    /// Returns the kind of the current token.
    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    /// Advance the cursor by one and return the consumed token.
    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    /// Returns the previously consumed token's span.
    pub(crate) fn previous_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            self.peek().span
        }
    }

    /// Returns the span of the current token.
    pub(crate) fn current_span(&self) -> Span {
        self.peek().span
    }

    /// Returns `true` if the current token is `Eof`.
    pub(crate) fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    /// Check if the current token matches the given kind exactly.
    pub(crate) fn check_exact(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    /// If the current token matches, advance and return `true`.
    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check_exact(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Look ahead by `n` tokens from current position.
    pub(crate) fn look_ahead(&self, n: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    // ── Expect Helpers ────────────────────────────────────────────────────────

    /// Expect a specific token kind. Returns the token if matched, or emits an error.
    pub(crate) fn expect(&mut self, expected: &TokenKind) -> Option<Token> {
        if self.check_exact(expected) {
            Some(self.advance())
        } else {
            self.error_unexpected(&format!("'{expected}'"));
            None
        }
    }

    /// Expect an identifier token.
    pub(crate) fn expect_identifier(&mut self) -> Option<Ident> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                let span = self.advance().span;
                Some(Ident::new(name, span))
            }
            _ => {
                self.error_unexpected("identifier");
                None
            }
        }
    }

    // ── Error Reporting ───────────────────────────────────────────────────────

    /// Report that the current token is not what was expected.
    ///
    /// At end of input this is `E101`, which marks the chunk as incomplete
    /// rather than wrong. An unknown character was already reported by the
    /// lexer and is not reported twice.
    pub(crate) fn error_unexpected(&mut self, expected: &str) {
        match self.peek_kind() {
            TokenKind::Eof => self.error_at_current(
                ErrorCode::UNEXPECTED_EOF,
                format!("Unexpected end of input, expected {expected}"),
            ),
            TokenKind::Unknown(_) => {}
            other => {
                let message = format!("Unexpected symbol '{other}', expected {expected}");
                self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, message);
            }
        }
    }

    /// Report an error at the current token position.
    pub(crate) fn error_at_current(&mut self, code: ErrorCode, message: impl Into<String>) {
        let span = self.current_span();
        self.error_at(code, message, span);
    }

    /// Report an error at a specific span.
    pub(crate) fn error_at(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self.source_file.snippet(span);
        let error = CinderError::new(&self.source_file.name, code, message, span, source_line);
        self.errors.push_error(error);
    }

    /// Returns `true` if we've hit the error limit and should stop.
    pub(crate) fn too_many_errors(&self) -> bool {
        self.errors.total_errors >= MAX_ERRORS
    }

    // ── Synchronization ───────────────────────────────────────────────────────

    /// Skip tokens until we reach a synchronization point.
    /// Used after an error to resume at a known-good position.
    pub(crate) fn synchronize(&mut self) {
        let start = self.pos;
        let mut depth = 0u32;
        while !self.at_end() {
            match self.peek_kind() {
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace if depth == 0 => return,
                TokenKind::RBrace => {
                    depth -= 1;
                    self.advance();
                    if depth == 0 && self.check_exact(&TokenKind::Semicolon) {
                        self.advance();
                        return;
                    }
                    continue;
                }
                TokenKind::Semicolon if depth == 0 => {
                    self.advance();
                    return;
                }
                TokenKind::If
                | TokenKind::While
                | TokenKind::Do
                | TokenKind::For
                | TokenKind::Return
                | TokenKind::Throw
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Class
                | TokenKind::Struct
                | TokenKind::Interface
                | TokenKind::Enum
                | TokenKind::Namespace
                    if depth == 0 && self.pos > start =>
                {
                    return
                }
                _ => {}
            }
            self.advance();
        }
    }

    // ── Public API ────────────────────────────────────────────────────────────

    /// Parse the token stream as the body of the implicit host method.
    ///
    /// The final expression statement may omit its `;`.
    pub fn parse_statement_unit(mut self) -> ParseResult<StatementUnit> {
        let start = self.current_span();
        let mut stmts = Vec::new();
        while !self.at_end() && !self.too_many_errors() {
            let before = self.pos;
            match self.parse_statement(true) {
                Some(stmt) => stmts.push(stmt),
                None => self.synchronize(),
            }
            if self.pos == before {
                self.advance();
            }
        }
        let span = start.merge(self.previous_span());
        ParseResult {
            unit: Some(StatementUnit { stmts, span }),
            errors: self.errors,
        }
    }

    /// Parse the token stream as a declaration unit.
    pub fn parse_compilation_unit(mut self) -> ParseResult<CompilationUnit> {
        let unit = self.parse_compilation_unit_body();
        ParseResult {
            unit: Some(unit),
            errors: self.errors,
        }
    }
}
