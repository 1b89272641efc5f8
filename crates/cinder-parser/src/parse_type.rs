//! Type reference parsing.

use cinder_lexer::token::TokenKind;
use cinder_types::ast::*;

use crate::parser::Parser;

impl<'src> Parser<'src> {
    /// Parse a type reference.
    ///
    /// ```ebnf
    /// Type = "bool" | "int" | "long" | "double" | "float" | "string"
    ///      | "object" | "void" | "var"
    ///      | QualifiedName ;
    /// ```
    pub(crate) fn parse_type(&mut self) -> Option<TypeRef> {
        let start = self.current_span();
        let kind = match self.peek_kind().clone() {
            TokenKind::Bool => TypeRefKind::Bool,
            TokenKind::Int => TypeRefKind::Int,
            TokenKind::Long => TypeRefKind::Long,
            TokenKind::Double | TokenKind::Float => TypeRefKind::Double,
            TokenKind::KwString => TypeRefKind::String,
            TokenKind::Object => TypeRefKind::Object,
            TokenKind::Void => TypeRefKind::Void,
            TokenKind::Var => TypeRefKind::Var,
            TokenKind::Identifier(_) => {
                let name = self.parse_qualified_name()?;
                let span = name.span;
                return Some(TypeRef::new(TypeRefKind::Named(name), span));
            }
            _ => {
                self.error_unexpected("type");
                return None;
            }
        };
        self.advance();
        Some(TypeRef::new(kind, start))
    }

    /// `Ident { "." Ident }`
    pub(crate) fn parse_qualified_name(&mut self) -> Option<QualifiedName> {
        let first = self.expect_identifier()?;
        let mut span = first.span;
        let mut parts = vec![first];
        while self.check_exact(&TokenKind::Dot) {
            self.advance();
            let next = self.expect_identifier()?;
            span = span.merge(next.span);
            parts.push(next);
        }
        Some(QualifiedName::new(parts, span))
    }

    /// Returns `true` if the tokens at the cursor look like the start of a
    /// local declaration: a type followed by a variable name.
    ///
    /// `int x`, `var y`, `Foo f`, `System.Text.Builder b`. A type keyword
    /// followed by anything else (`string.Empty`) is an expression.
    pub(crate) fn looks_like_local_decl(&self) -> bool {
        let first = self.peek_kind();
        if first.is_type_keyword() {
            return matches!(self.look_ahead(1), TokenKind::Identifier(_));
        }
        if !matches!(first, TokenKind::Identifier(_)) {
            return false;
        }
        let mut n = 1;
        loop {
            match (self.look_ahead(n), self.look_ahead(n + 1)) {
                (TokenKind::Dot, TokenKind::Identifier(_)) => n += 2,
                (TokenKind::Identifier(_), _) => return true,
                _ => return false,
            }
        }
    }
}
