//! Core Cinder lexer: converts source text to a token stream.
//!
//! Features:
//! - Pull-based: [`Lexer::next_token`] scans exactly one token per call,
//!   so callers can classify a chunk from its first tokens without
//!   scanning the rest
//! - `//` line comments and `/* */` block comments
//! - Integer (decimal, hex, `L` suffix) and floating literals
//!   (fraction, exponent, `d`/`f` suffix)
//! - String literals with C-style escapes
//! - Input that stops inside a string or block comment reports E101 so
//!   the interactive driver can ask for more text
//! - Error recovery: unrecognised characters become [`TokenKind::Unknown`]
//!   tokens with an E102 diagnostic

use cinder_types::{CinderError, CompileErrors, ErrorCode, SourceFile, Span, MAX_ERRORS};

use crate::token::{Token, TokenKind};

/// The Cinder lexer.
pub struct Lexer<'src> {
    /// The full source text as bytes.
    source: &'src [u8],
    /// Source file for error reporting.
    source_file: &'src SourceFile,
    /// Current byte offset into `source`.
    pos: usize,
    /// Current line number (1-based).
    line: u32,
    /// Current column number (1-based, in characters).
    col: u32,
    /// Collected errors.
    errors: CompileErrors,
}

/// Result of lexing: tokens + any errors collected.
pub struct LexResult {
    /// The token stream (always ends with [`TokenKind::Eof`]).
    pub tokens: Vec<Token>,
    /// Errors encountered during lexing.
    pub errors: CompileErrors,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given source file.
    pub fn new(source_file: &'src SourceFile) -> Self {
        Self {
            source: source_file.source.as_bytes(),
            source_file,
            pos: 0,
            line: 1,
            col: 1,
            errors: CompileErrors::empty(),
        }
    }

    /// Lex the entire source file into a token stream.
    pub fn lex(mut self) -> LexResult {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        LexResult {
            tokens,
            errors: self.errors,
        }
    }

    /// Errors collected so far.
    pub fn errors(&self) -> &CompileErrors {
        &self.errors
    }

    /// Consume the lexer, returning the errors collected so far.
    pub fn into_errors(self) -> CompileErrors {
        self.errors
    }

    /// Scan the next token. Returns [`TokenKind::Eof`] forever once the
    /// input is exhausted.
    pub fn next_token(&mut self) -> Token {
        if !self.skip_trivia() || self.errors.total_errors >= MAX_ERRORS {
            return Token::new(TokenKind::Eof, self.current_span());
        }

        let start = self.pos;
        let start_line = self.line;
        let start_col = self.col;
        let Some(ch) = self.advance() else {
            return Token::new(TokenKind::Eof, self.current_span());
        };

        let kind = match ch {
            b'"' => return self.scan_string(start_line, start_col),
            b'0'..=b'9' => return self.scan_number(start, start_line, start_col),
            b'.' if matches!(self.peek(), Some(b'0'..=b'9')) => {
                return self.scan_number(start, start_line, start_col)
            }
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                return self.scan_identifier(start, start_line, start_col)
            }

            b'+' => self.pick2(&[(b'+', TokenKind::PlusPlus), (b'=', TokenKind::PlusEq)], TokenKind::Plus),
            b'-' => self.pick2(
                &[(b'-', TokenKind::MinusMinus), (b'=', TokenKind::MinusEq)],
                TokenKind::Minus,
            ),
            b'*' => self.pick2(&[(b'=', TokenKind::StarEq)], TokenKind::Star),
            b'/' => self.pick2(&[(b'=', TokenKind::SlashEq)], TokenKind::Slash),
            b'%' => self.pick2(&[(b'=', TokenKind::PercentEq)], TokenKind::Percent),
            b'=' => self.pick2(&[(b'=', TokenKind::EqEq)], TokenKind::Eq),
            b'!' => self.pick2(&[(b'=', TokenKind::BangEq)], TokenKind::Bang),
            b'<' => self.pick2(&[(b'=', TokenKind::LessEq)], TokenKind::Less),
            b'>' => self.pick2(&[(b'=', TokenKind::GreaterEq)], TokenKind::Greater),
            b'?' => self.pick2(&[(b'?', TokenKind::QuestionQuestion)], TokenKind::Question),
            b'&' if self.peek() == Some(b'&') => {
                self.advance();
                TokenKind::AmpAmp
            }
            b'|' if self.peek() == Some(b'|') => {
                self.advance();
                TokenKind::PipePipe
            }

            b'.' => TokenKind::Dot,
            b',' => TokenKind::Comma,
            b';' => TokenKind::Semicolon,
            b':' => TokenKind::Colon,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,

            _ => {
                let unknown = self.decode_char_at(start);
                let span = self.span_from(start_line, start_col);
                self.emit_error(
                    ErrorCode::INVALID_CHARACTER,
                    format!("Unexpected character '{unknown}'"),
                    span,
                );
                TokenKind::Unknown(unknown)
            }
        };

        Token::new(kind, self.span_from(start_line, start_col))
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.source.get(self.pos).copied()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else if ch & 0xC0 != 0x80 {
            // UTF-8 continuation bytes do not start a new column.
            self.col += 1;
        }
        Some(ch)
    }

    /// Consume the second character of a two-character operator if it
    /// matches one of `options`; otherwise produce `single`.
    fn pick2(&mut self, options: &[(u8, TokenKind)], single: TokenKind) -> TokenKind {
        if let Some(next) = self.peek() {
            for (byte, kind) in options {
                if *byte == next {
                    self.advance();
                    return kind.clone();
                }
            }
        }
        single
    }

    /// Decode the full character starting at byte `start` and consume any
    /// continuation bytes that follow it.
    fn decode_char_at(&mut self, start: usize) -> char {
        let ch = self
            .source_file
            .source
            .get(start..)
            .and_then(|rest| rest.chars().next())
            .unwrap_or('\u{FFFD}');
        while self.pos < start + ch.len_utf8() {
            self.advance();
        }
        ch
    }

    fn current_span(&self) -> Span {
        Span::point(self.line, self.col)
    }

    fn span_from(&self, start_line: u32, start_col: u32) -> Span {
        Span::new(
            start_line,
            start_col,
            self.line,
            self.col.saturating_sub(1).max(1),
        )
    }

    fn emit_error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self.source_file.snippet(span);
        let err = CinderError::new(&self.source_file.name, code, message, span, source_line);
        self.errors.push_error(err);
    }

    // ─────────────────────────────────────────────────────────────
    // Whitespace & comments
    // ─────────────────────────────────────────────────────────────

    /// Skip whitespace and comments. Returns `false` if input ended inside
    /// a block comment (E101 already recorded).
    fn skip_trivia(&mut self) -> bool {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(b' ' | b'\t' | b'\r' | b'\n'), _) => {
                    self.advance();
                }
                (Some(b'/'), Some(b'/')) => {
                    while let Some(ch) = self.peek() {
                        if ch == b'\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                (Some(b'/'), Some(b'*')) => {
                    let start_line = self.line;
                    let start_col = self.col;
                    self.advance();
                    self.advance();
                    loop {
                        match self.peek() {
                            None => {
                                let span = self.span_from(start_line, start_col);
                                self.emit_error(
                                    ErrorCode::UNEXPECTED_EOF,
                                    "End of input inside block comment",
                                    span,
                                );
                                return false;
                            }
                            Some(b'*') if self.peek_at(1) == Some(b'/') => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            _ => {
                                self.advance();
                            }
                        }
                    }
                }
                _ => return true,
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Number literals
    // ─────────────────────────────────────────────────────────────

    fn scan_number(&mut self, start: usize, start_line: u32, start_col: u32) -> Token {
        // Hex: 0x1F
        if self.source[start] == b'0' && matches!(self.peek(), Some(b'x' | b'X')) {
            self.advance();
            let digits_start = self.pos;
            while matches!(self.peek(), Some(ch) if ch.is_ascii_hexdigit()) {
                self.advance();
            }
            let digits = self.text(digits_start, self.pos).to_string();
            if matches!(self.peek(), Some(b'L' | b'l')) {
                self.advance();
            }
            let span = self.span_from(start_line, start_col);
            let value = match i64::from_str_radix(&digits, 16) {
                Ok(v) => v,
                Err(_) => {
                    self.emit_error(ErrorCode::INVALID_LITERAL, "Invalid hexadecimal literal", span);
                    0
                }
            };
            return Token::new(TokenKind::IntLit(value), span);
        }

        let mut is_float = self.source[start] == b'.';
        while let Some(b'0'..=b'9') = self.peek() {
            self.advance();
        }
        if !is_float && self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b'0'..=b'9')) {
            is_float = true;
            self.advance();
            while let Some(b'0'..=b'9') = self.peek() {
                self.advance();
            }
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let sign = usize::from(matches!(self.peek_at(1), Some(b'+' | b'-')));
            if matches!(self.peek_at(1 + sign), Some(b'0'..=b'9')) {
                is_float = true;
                for _ in 0..=sign {
                    self.advance();
                }
                while let Some(b'0'..=b'9') = self.peek() {
                    self.advance();
                }
            }
        }
        let digits_end = self.pos;

        let mut force_float = false;
        let mut force_long = false;
        match self.peek() {
            Some(b'd' | b'D' | b'f' | b'F' | b'm' | b'M') => {
                self.advance();
                force_float = true;
            }
            Some(b'L' | b'l') => {
                self.advance();
                force_long = true;
            }
            _ => {}
        }

        // `12abc` is one malformed literal, not a number and an identifier.
        let mut trailing = false;
        while matches!(self.peek(), Some(ch) if ch.is_ascii_alphanumeric() || ch == b'_') {
            self.advance();
            trailing = true;
        }

        let span = self.span_from(start_line, start_col);
        let text = self.text(start, digits_end).to_string();
        if trailing || (force_long && is_float) {
            self.emit_error(
                ErrorCode::INVALID_LITERAL,
                format!("Invalid numeric literal '{}'", self.text(start, self.pos)),
                span,
            );
            return Token::new(TokenKind::IntLit(0), span);
        }

        if is_float || force_float {
            let value = text.parse::<f64>().unwrap_or(0.0);
            return Token::new(TokenKind::DoubleLit(value), span);
        }

        match text.parse::<i64>() {
            Ok(value) => Token::new(TokenKind::IntLit(value), span),
            Err(_) => {
                self.emit_error(
                    ErrorCode::INVALID_LITERAL,
                    format!("Integral constant '{text}' is too large"),
                    span,
                );
                Token::new(TokenKind::IntLit(0), span)
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Identifiers & keywords
    // ─────────────────────────────────────────────────────────────

    fn scan_identifier(&mut self, start: usize, start_line: u32, start_col: u32) -> Token {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == b'_' {
                self.advance();
            } else {
                break;
            }
        }

        let span = self.span_from(start_line, start_col);
        let text = self.text(start, self.pos);
        let kind =
            TokenKind::from_keyword(text).unwrap_or_else(|| TokenKind::Identifier(text.to_string()));
        Token::new(kind, span)
    }

    // ─────────────────────────────────────────────────────────────
    // String literals
    // ─────────────────────────────────────────────────────────────

    /// Scan a string literal starting after the opening `"`.
    fn scan_string(&mut self, start_line: u32, start_col: u32) -> Token {
        let mut buf: Vec<u8> = Vec::new();

        loop {
            match self.peek() {
                None => {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error(ErrorCode::UNEXPECTED_EOF, "Unterminated string literal", span);
                    break;
                }
                Some(b'\n') => {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error(ErrorCode::INVALID_LITERAL, "Newline in string literal", span);
                    break;
                }
                Some(b'"') => {
                    self.advance();
                    break;
                }
                Some(b'\\') => {
                    if let Some(escaped) = self.scan_escape_sequence() {
                        buf.push(escaped);
                    }
                }
                Some(ch) => {
                    self.advance();
                    buf.push(ch);
                }
            }
        }

        let text = String::from_utf8_lossy(&buf).into_owned();
        Token::new(TokenKind::StringLit(text), self.span_from(start_line, start_col))
    }

    /// Scan an escape sequence starting at the `\`.
    /// Returns the unescaped byte, or `None` if input ended.
    fn scan_escape_sequence(&mut self) -> Option<u8> {
        let start_line = self.line;
        let start_col = self.col;
        self.advance();

        match self.peek() {
            // Leave end of input and newlines to the string scanner.
            None | Some(b'\n') => None,
            Some(ch) => {
                self.advance();
                match ch {
                    b'"' => Some(b'"'),
                    b'\'' => Some(b'\''),
                    b'\\' => Some(b'\\'),
                    b'n' => Some(b'\n'),
                    b't' => Some(b'\t'),
                    b'r' => Some(b'\r'),
                    b'0' => Some(0),
                    other => {
                        let span = self.span_from(start_line, start_col);
                        self.emit_error(
                            ErrorCode::INVALID_LITERAL,
                            format!("Unrecognized escape sequence '\\{}'", other as char),
                            span,
                        );
                        Some(other)
                    }
                }
            }
        }
    }

    fn text(&self, start: usize, end: usize) -> &'src str {
        self.source_file
            .source
            .get(start..end)
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_token_is_incremental() {
        let sf = SourceFile::new("{interactive}", "class Foo {");
        let mut lexer = Lexer::new(&sf);
        assert_eq!(lexer.next_token().kind, TokenKind::Class);
        assert_eq!(lexer.next_token().kind, TokenKind::Identifier("Foo".into()));
        assert_eq!(lexer.next_token().kind, TokenKind::LBrace);
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
    }

    #[test]
    fn test_spans_are_one_based() {
        let sf = SourceFile::new("{interactive}", "int x\n  = 5;");
        let tokens = Lexer::new(&sf).lex().tokens;
        assert_eq!(tokens[0].span, Span::new(1, 1, 1, 3));
        assert_eq!(tokens[1].span, Span::new(1, 5, 1, 5));
        assert_eq!(tokens[2].span, Span::new(2, 3, 2, 3));
    }

    #[test]
    fn test_unicode_column_counting() {
        let sf = SourceFile::new("{interactive}", "\"é\" x");
        let tokens = Lexer::new(&sf).lex().tokens;
        assert_eq!(tokens[0].kind, TokenKind::StringLit("é".into()));
        assert_eq!(tokens[1].span.start_col, 5);
    }
}
