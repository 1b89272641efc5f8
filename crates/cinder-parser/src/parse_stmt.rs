//! Statement parsing.

use crate::parser::{Parser, MAX_NESTING};
use cinder_lexer::token::TokenKind;
use cinder_types::ast::*;
use cinder_types::ErrorCode;

impl<'src> Parser<'src> {
    /// Parse a block of statements: `{ stmts... }`
    pub(crate) fn parse_block(&mut self) -> Option<Block> {
        let start = self.current_span();
        self.expect(&TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while !self.check_exact(&TokenKind::RBrace) && !self.at_end() {
            if self.too_many_errors() {
                break;
            }
            let before = self.peek().span;
            match self.parse_statement(false) {
                Some(stmt) => stmts.push(stmt),
                None => {
                    self.synchronize();
                    if self.peek().span == before && !self.at_end() {
                        self.advance();
                    }
                }
            }
        }
        self.expect(&TokenKind::RBrace)?;
        let span = start.merge(self.previous_span());
        Some(Block { stmts, span })
    }

    /// Parse a single statement.
    ///
    /// `top_level` is set for statements directly in the host unit, where
    /// the final expression statement may omit its `;`.
    pub(crate) fn parse_statement(&mut self, top_level: bool) -> Option<Stmt> {
        self.stmt_depth += 1;
        if self.stmt_depth > MAX_NESTING {
            self.error_at_current(
                ErrorCode::NESTING_LIMIT,
                format!("maximum statement nesting depth is {MAX_NESTING}"),
            );
            self.stmt_depth -= 1;
            return None;
        }
        let stmt = self.parse_statement_inner(top_level);
        self.stmt_depth -= 1;
        stmt
    }

    fn parse_statement_inner(&mut self, top_level: bool) -> Option<Stmt> {
        let start = self.current_span();
        match self.peek_kind() {
            TokenKind::LBrace => {
                let block = self.parse_block()?;
                let span = block.span;
                Some(Stmt::new(StmtKind::Block(block), span))
            }
            TokenKind::Semicolon => {
                self.advance();
                Some(Stmt::new(StmtKind::Empty, start))
            }
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::While => self.parse_while_stmt(),
            TokenKind::Do => self.parse_do_while_stmt(),
            TokenKind::For => self.parse_for_stmt(),
            TokenKind::Break => {
                self.advance();
                self.expect(&TokenKind::Semicolon)?;
                Some(Stmt::new(StmtKind::Break, start.merge(self.previous_span())))
            }
            TokenKind::Continue => {
                self.advance();
                self.expect(&TokenKind::Semicolon)?;
                Some(Stmt::new(StmtKind::Continue, start.merge(self.previous_span())))
            }
            TokenKind::Return => {
                self.advance();
                let value = self.parse_optional_expression()?;
                self.expect(&TokenKind::Semicolon)?;
                Some(Stmt::new(StmtKind::Return(value), start.merge(self.previous_span())))
            }
            TokenKind::Throw => {
                self.advance();
                let value = self.parse_optional_expression()?;
                self.expect(&TokenKind::Semicolon)?;
                Some(Stmt::new(StmtKind::Throw(value), start.merge(self.previous_span())))
            }
            TokenKind::Const => {
                let decl = self.parse_local_decl()?;
                self.expect(&TokenKind::Semicolon)?;
                let span = decl.span.merge(self.previous_span());
                Some(Stmt::new(StmtKind::LocalDecl(decl), span))
            }
            _ if self.looks_like_local_decl() => {
                let decl = self.parse_local_decl()?;
                self.expect(&TokenKind::Semicolon)?;
                let span = decl.span.merge(self.previous_span());
                Some(Stmt::new(StmtKind::LocalDecl(decl), span))
            }
            _ => {
                let expr = self.parse_expression()?;
                if !self.eat(&TokenKind::Semicolon) && !(top_level && self.at_end()) {
                    self.expect(&TokenKind::Semicolon)?;
                }
                let span = expr.span.merge(self.previous_span());
                Some(Stmt::new(StmtKind::Expr(expr), span))
            }
        }
    }

    /// An expression, or nothing when the next token is `;`.
    fn parse_optional_expression(&mut self) -> Option<Option<Expr>> {
        if self.check_exact(&TokenKind::Semicolon) {
            return Some(None);
        }
        self.parse_expression().map(Some)
    }

    /// `[ "const" ] Type Declarator { "," Declarator }` (no trailing `;`)
    pub(crate) fn parse_local_decl(&mut self) -> Option<LocalDecl> {
        let start = self.current_span();
        let is_const = self.eat(&TokenKind::Const);
        let ty = self.parse_type()?;
        let declarators = self.parse_declarators()?;
        let span = start.merge(self.previous_span());
        Some(LocalDecl {
            is_const,
            ty,
            declarators,
            span,
        })
    }

    /// `Ident [ "=" Expression ] { "," Ident [ "=" Expression ] }`
    pub(crate) fn parse_declarators(&mut self) -> Option<Vec<VarDeclarator>> {
        let mut declarators = Vec::new();
        loop {
            let name = self.expect_identifier()?;
            let init = if self.eat(&TokenKind::Eq) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            let span = name.span.merge(self.previous_span());
            declarators.push(VarDeclarator { name, init, span });
            if !self.eat(&TokenKind::Comma) {
                return Some(declarators);
            }
        }
    }

    /// `if (cond) stmt [else stmt]`
    fn parse_if_stmt(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        self.advance();
        let cond = self.parse_paren_condition()?;
        let then_branch = Box::new(self.parse_statement(false)?);
        let else_branch = if self.eat(&TokenKind::Else) {
            Some(Box::new(self.parse_statement(false)?))
        } else {
            None
        };
        let span = start.merge(self.previous_span());
        Some(Stmt::new(
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            },
            span,
        ))
    }

    /// `while (cond) stmt`
    fn parse_while_stmt(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        self.advance();
        let cond = self.parse_paren_condition()?;
        let body = Box::new(self.parse_statement(false)?);
        let span = start.merge(self.previous_span());
        Some(Stmt::new(StmtKind::While { cond, body }, span))
    }

    /// `do stmt while (cond);`
    fn parse_do_while_stmt(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        self.advance();
        let body = Box::new(self.parse_statement(false)?);
        self.expect(&TokenKind::While)?;
        let cond = self.parse_paren_condition()?;
        self.expect(&TokenKind::Semicolon)?;
        let span = start.merge(self.previous_span());
        Some(Stmt::new(StmtKind::DoWhile { body, cond }, span))
    }

    /// `for (init; cond; update) stmt`
    fn parse_for_stmt(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        self.advance();
        self.expect(&TokenKind::LParen)?;

        let init = if self.check_exact(&TokenKind::Semicolon) {
            None
        } else if self.check_exact(&TokenKind::Const) || self.looks_like_local_decl() {
            Some(ForInit::Decl(self.parse_local_decl()?))
        } else {
            Some(ForInit::Exprs(self.parse_expression_list()?))
        };
        self.expect(&TokenKind::Semicolon)?;

        let cond = if self.check_exact(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::Semicolon)?;

        let update = if self.check_exact(&TokenKind::RParen) {
            Vec::new()
        } else {
            self.parse_expression_list()?
        };
        self.expect(&TokenKind::RParen)?;

        let body = Box::new(self.parse_statement(false)?);
        let span = start.merge(self.previous_span());
        Some(Stmt::new(
            StmtKind::For {
                init,
                cond,
                update,
                body,
            },
            span,
        ))
    }

    fn parse_expression_list(&mut self) -> Option<Vec<Expr>> {
        let mut exprs = vec![self.parse_expression()?];
        while self.eat(&TokenKind::Comma) {
            exprs.push(self.parse_expression()?);
        }
        Some(exprs)
    }

    /// `"(" Expression ")"`
    fn parse_paren_condition(&mut self) -> Option<Expr> {
        self.expect(&TokenKind::LParen)?;
        let cond = self.parse_expression()?;
        self.expect(&TokenKind::RParen)?;
        Some(cond)
    }
}
