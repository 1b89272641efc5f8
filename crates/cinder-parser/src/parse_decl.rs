//! Declaration parsing: using directives, namespaces, types and members.

use cinder_lexer::token::TokenKind;
use cinder_types::ast::*;
use cinder_types::Span;

use crate::parser::Parser;

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Compilation Unit
    // ══════════════════════════════════════════════════════════════════════════

    /// ```ebnf
    /// CompilationUnit = { UsingDirective } { NamespaceMember } ;
    /// ```
    pub(crate) fn parse_compilation_unit_body(&mut self) -> CompilationUnit {
        let start = self.current_span();
        let mut usings = Vec::new();
        while self.check_exact(&TokenKind::Using) && !self.too_many_errors() {
            match self.parse_using() {
                Some(using) => usings.push(using),
                None => self.synchronize(),
            }
        }

        let members = self.parse_namespace_members(true);
        let span = start.merge(self.previous_span());
        CompilationUnit {
            usings,
            members,
            span,
        }
    }

    /// `"using" [ Ident "=" ] QualifiedName ";"`
    fn parse_using(&mut self) -> Option<UsingDirective> {
        let start = self.current_span();
        self.expect(&TokenKind::Using)?;
        let alias = if matches!(self.peek_kind(), TokenKind::Identifier(_))
            && self.look_ahead(1) == &TokenKind::Eq
        {
            let alias = self.expect_identifier()?;
            self.advance(); // eat `=`
            Some(alias)
        } else {
            None
        };
        let target = self.parse_qualified_name()?;
        self.expect(&TokenKind::Semicolon)?;
        let span = start.merge(self.previous_span());
        Some(UsingDirective {
            alias,
            target,
            span,
        })
    }

    /// Namespace members until `}` (or end of input at the top level).
    fn parse_namespace_members(&mut self, top_level: bool) -> Vec<NamespaceMember> {
        let mut members = Vec::new();
        loop {
            if self.at_end() || self.too_many_errors() {
                break;
            }
            if !top_level && self.check_exact(&TokenKind::RBrace) {
                break;
            }
            let before = self.peek().span;
            let member = if self.check_exact(&TokenKind::Namespace) {
                self.parse_namespace().map(NamespaceMember::Namespace)
            } else {
                self.parse_type_decl().map(NamespaceMember::Type)
            };
            match member {
                Some(member) => members.push(member),
                None => {
                    self.synchronize();
                    if self.peek().span == before && !self.at_end() {
                        self.advance();
                    }
                }
            }
        }
        members
    }

    /// `"namespace" QualifiedName "{" { NamespaceMember } "}"`
    fn parse_namespace(&mut self) -> Option<NamespaceDecl> {
        let start = self.current_span();
        self.expect(&TokenKind::Namespace)?;
        let name = self.parse_qualified_name()?;
        self.expect(&TokenKind::LBrace)?;
        let members = self.parse_namespace_members(false);
        self.expect(&TokenKind::RBrace)?;
        let span = start.merge(self.previous_span());
        Some(NamespaceDecl {
            name,
            members,
            span,
        })
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Type Declarations
    // ══════════════════════════════════════════════════════════════════════════

    /// `{ Attribute } { Modifier } ("class" | "struct" | "interface" | "enum")
    /// Ident [ ":" QualifiedName { "," QualifiedName } ] "{" members "}" [ ";" ]`
    fn parse_type_decl(&mut self) -> Option<TypeDecl> {
        let start = self.current_span();
        let attributes = self.parse_attributes()?;
        let modifiers = self.parse_modifiers();
        self.parse_type_decl_after_modifiers(start, attributes, modifiers)
    }

    fn parse_type_decl_after_modifiers(
        &mut self,
        start: Span,
        attributes: Vec<QualifiedName>,
        modifiers: Vec<Modifier>,
    ) -> Option<TypeDecl> {
        let kind = match self.peek_kind() {
            TokenKind::Class => TypeKind::Class,
            TokenKind::Struct => TypeKind::Struct,
            TokenKind::Interface => TypeKind::Interface,
            TokenKind::Enum => TypeKind::Enum,
            _ => {
                self.error_unexpected("'class', 'struct', 'interface' or 'enum'");
                return None;
            }
        };
        self.advance();
        let name = self.expect_identifier()?;

        let mut bases = Vec::new();
        if self.eat(&TokenKind::Colon) {
            bases.push(self.parse_base_name(kind)?);
            while self.eat(&TokenKind::Comma) {
                bases.push(self.parse_base_name(kind)?);
            }
        }

        self.expect(&TokenKind::LBrace)?;
        let members = if kind == TypeKind::Enum {
            self.parse_enum_members()?
        } else {
            self.parse_members(&name)?
        };
        self.expect(&TokenKind::RBrace)?;
        self.eat(&TokenKind::Semicolon);

        let span = start.merge(self.previous_span());
        Some(TypeDecl {
            attributes,
            modifiers,
            kind,
            name,
            bases,
            members,
            span,
        })
    }

    /// A base-list entry. Enums may name an underlying integral type.
    fn parse_base_name(&mut self, kind: TypeKind) -> Option<QualifiedName> {
        if kind == TypeKind::Enum && matches!(self.peek_kind(), TokenKind::Int | TokenKind::Long) {
            let token = self.advance();
            let ident = Ident::new(token.kind.to_string(), token.span);
            return Some(QualifiedName::new(vec![ident], token.span));
        }
        self.parse_qualified_name()
    }

    /// `{ "[" QualifiedName [ Args ] { "," QualifiedName [ Args ] } "]" }`
    fn parse_attributes(&mut self) -> Option<Vec<QualifiedName>> {
        let mut attributes = Vec::new();
        while self.eat(&TokenKind::LBracket) {
            loop {
                attributes.push(self.parse_qualified_name()?);
                if self.check_exact(&TokenKind::LParen) {
                    // Arguments are parsed for well-formedness and dropped.
                    self.parse_arguments()?;
                }
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::RBracket)?;
        }
        Some(attributes)
    }

    fn parse_modifiers(&mut self) -> Vec<Modifier> {
        let mut modifiers = Vec::new();
        loop {
            let modifier = match self.peek_kind() {
                TokenKind::Public => Modifier::Public,
                TokenKind::Private => Modifier::Private,
                TokenKind::Protected => Modifier::Protected,
                TokenKind::Internal => Modifier::Internal,
                TokenKind::Static => Modifier::Static,
                TokenKind::Abstract => Modifier::Abstract,
                TokenKind::Sealed => Modifier::Sealed,
                TokenKind::Readonly => Modifier::Readonly,
                TokenKind::Const => Modifier::Const,
                TokenKind::Virtual => Modifier::Virtual,
                TokenKind::Override => Modifier::Override,
                _ => return modifiers,
            };
            self.advance();
            modifiers.push(modifier);
        }
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Members
    // ══════════════════════════════════════════════════════════════════════════

    fn parse_members(&mut self, type_name: &Ident) -> Option<Vec<MemberDecl>> {
        let mut members = Vec::new();
        while !self.check_exact(&TokenKind::RBrace) && !self.at_end() {
            if self.too_many_errors() {
                break;
            }
            let before = self.peek().span;
            match self.parse_member(type_name) {
                Some(member) => members.push(member),
                None => {
                    // End of input inside a member means the whole type is
                    // incomplete; stop instead of resynchronizing.
                    if self.at_end() {
                        return None;
                    }
                    self.synchronize();
                    if self.peek().span == before && !self.at_end() {
                        self.advance();
                    }
                }
            }
        }
        Some(members)
    }

    fn parse_member(&mut self, type_name: &Ident) -> Option<MemberDecl> {
        let start = self.current_span();
        let attributes = self.parse_attributes()?;
        let modifiers = self.parse_modifiers();

        if matches!(
            self.peek_kind(),
            TokenKind::Class | TokenKind::Struct | TokenKind::Interface | TokenKind::Enum
        ) {
            let nested = self.parse_type_decl_after_modifiers(start, attributes, modifiers)?;
            return Some(MemberDecl::NestedType(nested));
        }

        // Constructor: `Name(`
        if let TokenKind::Identifier(name) = self.peek_kind() {
            if name == &type_name.name && self.look_ahead(1) == &TokenKind::LParen {
                let name = self.expect_identifier()?;
                let params = self.parse_params()?;
                let body = self.parse_block()?;
                let span = start.merge(self.previous_span());
                return Some(MemberDecl::Constructor(ConstructorDecl {
                    modifiers,
                    name,
                    params,
                    body,
                    span,
                }));
            }
        }

        let ty = self.parse_type()?;
        if matches!(self.peek_kind(), TokenKind::Identifier(_))
            && self.look_ahead(1) == &TokenKind::LParen
        {
            let name = self.expect_identifier()?;
            let params = self.parse_params()?;
            let body = if self.eat(&TokenKind::Semicolon) {
                None
            } else {
                Some(self.parse_block()?)
            };
            let span = start.merge(self.previous_span());
            return Some(MemberDecl::Method(MethodDecl {
                modifiers,
                return_type: ty,
                name,
                params,
                body,
                span,
            }));
        }

        let declarators = self.parse_declarators()?;
        self.expect(&TokenKind::Semicolon)?;
        let span = start.merge(self.previous_span());
        Some(MemberDecl::Field(FieldDecl {
            modifiers,
            ty,
            declarators,
            span,
        }))
    }

    /// `"(" [ Param { "," Param } ] ")"`
    fn parse_params(&mut self) -> Option<Vec<Param>> {
        self.expect(&TokenKind::LParen)?;
        let mut params = Vec::new();
        if self.eat(&TokenKind::RParen) {
            return Some(params);
        }
        loop {
            let ty = self.parse_type()?;
            let name = self.expect_identifier()?;
            let span = ty.span.merge(name.span);
            params.push(Param { ty, name, span });
            if self.eat(&TokenKind::Comma) {
                continue;
            }
            self.expect(&TokenKind::RParen)?;
            return Some(params);
        }
    }

    /// `[ EnumMember { "," EnumMember } [ "," ] ]`
    fn parse_enum_members(&mut self) -> Option<Vec<MemberDecl>> {
        let mut members = Vec::new();
        while !self.check_exact(&TokenKind::RBrace) {
            let name = self.expect_identifier()?;
            let value = if self.eat(&TokenKind::Eq) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            let span = name.span.merge(self.previous_span());
            members.push(MemberDecl::EnumMember(EnumMemberDecl { name, value, span }));
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Some(members)
    }
}
