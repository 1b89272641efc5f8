//! Expression parsing with full operator precedence.
//!
//! Precedence (lowest → highest):
//! 1. `=`, `+=`, `-=`, `*=`, `/=`, `%=` (right-associative)
//! 2. `?:` (conditional)
//! 3. `??` (right-associative)
//! 4. `||`
//! 5. `&&`
//! 6. `==`, `!=`
//! 7. `<`, `>`, `<=`, `>=`
//! 8. `+`, `-`
//! 9. `*`, `/`, `%`
//! 10. unary `-`, `+`, `!`, prefix `++`/`--`
//! 11. `.` (member access), `()` (call), postfix `++`/`--`

use cinder_lexer::token::TokenKind;
use cinder_types::ast::*;
use cinder_types::ErrorCode;

use crate::parser::{Parser, MAX_NESTING};

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Entry Point
    // ══════════════════════════════════════════════════════════════════════════

    /// Parse an expression.
    pub(crate) fn parse_expression(&mut self) -> Option<Expr> {
        self.expr_depth += 1;
        if self.expr_depth > MAX_NESTING {
            self.error_at_current(
                ErrorCode::NESTING_LIMIT,
                format!("maximum expression nesting depth is {MAX_NESTING}"),
            );
            self.expr_depth -= 1;
            return None;
        }
        let result = self.parse_assignment();
        self.expr_depth -= 1;
        result
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Precedence Chain
    // ══════════════════════════════════════════════════════════════════════════

    /// `Assignment = Conditional [ AssignOp Assignment ]`
    fn parse_assignment(&mut self) -> Option<Expr> {
        let target = self.parse_conditional()?;
        let op = match self.peek_kind() {
            TokenKind::Eq => AssignOp::Assign,
            TokenKind::PlusEq => AssignOp::Add,
            TokenKind::MinusEq => AssignOp::Sub,
            TokenKind::StarEq => AssignOp::Mul,
            TokenKind::SlashEq => AssignOp::Div,
            TokenKind::PercentEq => AssignOp::Rem,
            _ => return Some(target),
        };
        self.advance();
        let value = self.parse_expression()?;
        let span = target.span.merge(value.span);
        Some(Expr::new(
            ExprKind::Assign {
                target: Box::new(target),
                op,
                value: Box::new(value),
            },
            span,
        ))
    }

    /// `Conditional = Coalesce [ "?" Expression ":" Expression ]`
    fn parse_conditional(&mut self) -> Option<Expr> {
        let cond = self.parse_coalesce()?;
        if !self.eat(&TokenKind::Question) {
            return Some(cond);
        }
        let then_expr = self.parse_expression()?;
        self.expect(&TokenKind::Colon)?;
        let else_expr = self.parse_expression()?;
        let span = cond.span.merge(else_expr.span);
        Some(Expr::new(
            ExprKind::Conditional {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            span,
        ))
    }

    /// `Coalesce = Or [ "??" Coalesce ]`
    fn parse_coalesce(&mut self) -> Option<Expr> {
        let left = self.parse_or()?;
        if !self.eat(&TokenKind::QuestionQuestion) {
            return Some(left);
        }
        let right = self.parse_coalesce()?;
        Some(binary(left, BinOp::Coalesce, right))
    }

    /// `Or = And { "||" And }`
    fn parse_or(&mut self) -> Option<Expr> {
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::PipePipe) {
            let right = self.parse_and()?;
            left = binary(left, BinOp::Or, right);
        }
        Some(left)
    }

    /// `And = Equality { "&&" Equality }`
    fn parse_and(&mut self) -> Option<Expr> {
        let mut left = self.parse_equality()?;
        while self.eat(&TokenKind::AmpAmp) {
            let right = self.parse_equality()?;
            left = binary(left, BinOp::And, right);
        }
        Some(left)
    }

    /// `Equality = Relational { ("==" | "!=") Relational }`
    fn parse_equality(&mut self) -> Option<Expr> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq => BinOp::Eq,
                TokenKind::BangEq => BinOp::NotEq,
                _ => return Some(left),
            };
            self.advance();
            let right = self.parse_relational()?;
            left = binary(left, op, right);
        }
    }

    /// `Relational = Additive { ("<" | ">" | "<=" | ">=") Additive }`
    fn parse_relational(&mut self) -> Option<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Less => BinOp::Less,
                TokenKind::LessEq => BinOp::LessEq,
                TokenKind::Greater => BinOp::Greater,
                TokenKind::GreaterEq => BinOp::GreaterEq,
                _ => return Some(left),
            };
            self.advance();
            let right = self.parse_additive()?;
            left = binary(left, op, right);
        }
    }

    /// `Additive = Multiplicative { ("+" | "-") Multiplicative }`
    fn parse_additive(&mut self) -> Option<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => return Some(left),
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(left, op, right);
        }
    }

    /// `Multiplicative = Unary { ("*" | "/" | "%") Unary }`
    fn parse_multiplicative(&mut self) -> Option<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Rem,
                _ => return Some(left),
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(left, op, right);
        }
    }

    /// `Unary = ("-" | "+" | "!" | "++" | "--") Unary | Postfix`
    fn parse_unary(&mut self) -> Option<Expr> {
        let start = self.current_span();
        let op = match self.peek_kind() {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::PlusPlus | TokenKind::MinusMinus => None,
            _ => return self.parse_postfix(),
        };
        let increment = self.check_exact(&TokenKind::PlusPlus);
        self.advance();

        self.expr_depth += 1;
        if self.expr_depth > MAX_NESTING {
            self.error_at_current(
                ErrorCode::NESTING_LIMIT,
                format!("maximum expression nesting depth is {MAX_NESTING}"),
            );
            self.expr_depth -= 1;
            return None;
        }
        let operand = self.parse_unary();
        self.expr_depth -= 1;
        let operand = operand?;

        let span = start.merge(operand.span);
        let kind = match op {
            Some(op) => ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            None => ExprKind::IncDec {
                target: Box::new(operand),
                increment,
                prefix: true,
            },
        };
        Some(Expr::new(kind, span))
    }

    /// `Postfix = Primary { "." Ident | "(" Args ")" | "++" | "--" }`
    fn parse_postfix(&mut self) -> Option<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek_kind() {
                TokenKind::Dot => {
                    self.advance();
                    let name = self.expect_identifier()?;
                    let span = expr.span.merge(name.span);
                    expr = Expr::new(
                        ExprKind::Member {
                            target: Box::new(expr),
                            name,
                        },
                        span,
                    );
                }
                TokenKind::LParen => {
                    let args = self.parse_arguments()?;
                    let span = expr.span.merge(self.previous_span());
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    );
                }
                TokenKind::PlusPlus | TokenKind::MinusMinus => {
                    let increment = self.check_exact(&TokenKind::PlusPlus);
                    let span = expr.span.merge(self.advance().span);
                    expr = Expr::new(
                        ExprKind::IncDec {
                            target: Box::new(expr),
                            increment,
                            prefix: false,
                        },
                        span,
                    );
                }
                _ => return Some(expr),
            }
        }
    }

    /// `"(" [ Expression { "," Expression } ] ")"`
    pub(crate) fn parse_arguments(&mut self) -> Option<Vec<Expr>> {
        self.expect(&TokenKind::LParen)?;
        let mut args = Vec::new();
        if self.eat(&TokenKind::RParen) {
            return Some(args);
        }
        loop {
            args.push(self.parse_expression()?);
            if self.eat(&TokenKind::Comma) {
                continue;
            }
            self.expect(&TokenKind::RParen)?;
            return Some(args);
        }
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Primary Expressions
    // ══════════════════════════════════════════════════════════════════════════

    fn parse_primary(&mut self) -> Option<Expr> {
        let span = self.current_span();
        let kind = match self.peek_kind().clone() {
            TokenKind::IntLit(n) => ExprKind::IntLit(n),
            TokenKind::DoubleLit(n) => ExprKind::DoubleLit(n),
            TokenKind::StringLit(s) => ExprKind::StringLit(s),
            TokenKind::True => ExprKind::BoolLit(true),
            TokenKind::False => ExprKind::BoolLit(false),
            TokenKind::Null => ExprKind::Null,
            TokenKind::This => ExprKind::This,
            TokenKind::Identifier(name) => ExprKind::Name(Ident::new(name, span)),
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(&TokenKind::RParen)?;
                let span = span.merge(self.previous_span());
                return Some(Expr::new(ExprKind::Paren(Box::new(inner)), span));
            }
            TokenKind::New => {
                self.advance();
                let ty = self.parse_type()?;
                let args = self.parse_arguments()?;
                let span = span.merge(self.previous_span());
                return Some(Expr::new(ExprKind::New { ty, args }, span));
            }
            TokenKind::Delegate | TokenKind::Unsafe => {
                let keyword = self.peek_kind().to_string();
                self.error_at_current(
                    ErrorCode::UNSUPPORTED_FEATURE,
                    format!("'{keyword}' is not supported in interactive input"),
                );
                return None;
            }
            _ => {
                self.error_unexpected("expression");
                return None;
            }
        };
        self.advance();
        Some(Expr::new(kind, span))
    }
}

fn binary(left: Expr, op: BinOp, right: Expr) -> Expr {
    let span = left.span.merge(right.span);
    Expr::new(
        ExprKind::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
        span,
    )
}
