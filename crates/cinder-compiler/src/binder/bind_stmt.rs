//! Stage 3, code generation for bodies: method and constructor bodies,
//! field initializers and host statements.

use std::sync::Arc;

use cinder_eval::{BoundExpr, BoundStmt, Code, FieldSlot, MethodBody, MethodInfo, Place, Type, TypeInfo, Value};
use cinder_types::ast::{
    has_modifier, AssignOp, Block, Expr, ExprKind, ForInit, LocalDecl, MemberDecl, Modifier,
    Stmt, StmtKind, TypeKind, TypeRefKind, VarDeclarator,
};
use cinder_types::{ErrorCode, Span};

use super::{BodyContext, Binder, DeclaredType, PendingField, TypeContext};
use crate::scope::ScopeKind;

impl<'a> Binder<'a> {
    // ══════════════════════════════════════════════════════════════════════
    // Declarations
    // ══════════════════════════════════════════════════════════════════════

    /// Bind every body of the declared types. Returns the static field
    /// initializers, in declaration order, as the unit's code.
    pub(super) fn generate_types(&mut self, declared: &[DeclaredType<'_>]) -> Vec<BoundStmt> {
        let mut statics = Vec::new();
        for dt in declared {
            if matches!(dt.info.kind, TypeKind::Enum | TypeKind::Interface) {
                continue;
            }
            let ctx = dt.ctx.nested(&dt.info);
            self.generate_field_inits(dt, &ctx, &mut statics);

            for (decl, method) in &dt.methods {
                if let Some(body) = &decl.body {
                    let this_type = (!method.is_static).then(|| Arc::clone(&dt.info));
                    self.generate_body(&ctx, this_type, method, body, false, decl.name.span);
                }
            }
            for (decl, ctor) in &dt.constructors {
                let this_type = Some(Arc::clone(&dt.info));
                self.generate_body(&ctx, this_type, ctor, &decl.body, true, decl.name.span);
            }
        }
        statics
    }

    fn generate_field_inits(
        &mut self,
        dt: &DeclaredType<'_>,
        ctx: &TypeContext,
        statics: &mut Vec<BoundStmt>,
    ) {
        let mut instance = Vec::new();
        for member in &dt.decl.members {
            let MemberDecl::Field(field) = member else {
                continue;
            };
            let is_static = has_modifier(&field.modifiers, Modifier::Static)
                || has_modifier(&field.modifiers, Modifier::Const);
            for declarator in &field.declarators {
                let Some(init) = &declarator.init else {
                    continue;
                };
                let name = &declarator.name.name;
                if is_static {
                    let Some((handle, _)) = dt.info.static_field(name) else {
                        continue;
                    };
                    self.body = BodyContext::method(ctx.clone(), None, Type::Void);
                    if let Some(value) = self.bind_converted(init, handle.ty()) {
                        statics.push(BoundStmt::Expr(BoundExpr::Assign {
                            place: Place::Static(handle),
                            value: Box::new(value),
                        }));
                    }
                } else {
                    let Some((index, ty, _)) = dt.info.instance_field(name) else {
                        continue;
                    };
                    let this_type = Some(Arc::clone(&dt.info));
                    self.body = BodyContext::method(ctx.clone(), this_type, Type::Void);
                    if let Some(value) = self.bind_converted(init, &ty) {
                        instance.push((index, value));
                    }
                }
            }
        }
        dt.info.set_field_initializers(instance);
    }

    fn generate_body(
        &mut self,
        ctx: &TypeContext,
        this_type: Option<Arc<TypeInfo>>,
        method: &Arc<MethodInfo>,
        body: &Block,
        in_constructor: bool,
        name_span: Span,
    ) {
        self.body = BodyContext::method(ctx.clone(), this_type, method.return_type.clone());
        self.body.in_constructor = in_constructor;
        for (name, ty) in &method.params {
            self.body.locals.define_local(name, ty.clone(), false);
        }

        let stmts = self.bind_stmts(&body.stmts);
        if method.return_type != Type::Void && can_complete(&stmts) {
            self.error(
                ErrorCode::MISSING_RETURN,
                format!("'{}.{}': not all code paths return a value", method.declaring_type, method.name),
                name_span,
            );
            return;
        }
        let code = Code::new(stmts, self.body.locals.slot_count());
        method.set_body(MethodBody::Code(Arc::new(code)));
    }

    // ══════════════════════════════════════════════════════════════════════
    // Host unit
    // ══════════════════════════════════════════════════════════════════════

    /// Bind the statements of a host unit. Top-level declarations become
    /// persistent fields; a final value-producing expression is captured.
    pub(super) fn bind_host(&mut self, stmts: &[Stmt]) -> Vec<BoundStmt> {
        let mut out = Vec::new();
        let last = stmts.len().checked_sub(1);
        for (i, stmt) in stmts.iter().enumerate() {
            match &stmt.kind {
                StmtKind::LocalDecl(decl) => self.declare_host_fields(decl, &mut out),
                StmtKind::Expr(expr) => {
                    if let ExprKind::Assign {
                        target,
                        op: AssignOp::Assign,
                        value,
                    } = &expr.kind
                    {
                        if let ExprKind::Name(ident) = &target.kind {
                            if self.is_unbound(&ident.name) {
                                self.declare_implicit_field(&ident.name, value, &mut out);
                                continue;
                            }
                        }
                    }
                    let capture = Some(i) == last
                        && !matches!(expr.kind, ExprKind::Assign { .. } | ExprKind::IncDec { .. });
                    let Some((bound, ty)) = self.bind_expr(expr) else {
                        continue;
                    };
                    if capture && ty != Type::Void {
                        out.push(BoundStmt::Capture(bound));
                    } else {
                        out.push(BoundStmt::Expr(bound));
                    }
                }
                _ => {
                    if let Some(bound) = self.bind_stmt(stmt) {
                        out.push(bound);
                    }
                }
            }
        }
        out
    }

    fn is_unbound(&mut self, name: &str) -> bool {
        if self.body.locals.lookup(name).is_some() || self.registry.lookup(name).is_some() {
            return false;
        }
        if self.host_helpers.iter().any(|m| m.name == name) {
            return false;
        }
        let ctx = self.body.ctx.clone();
        self.lookup_entity(&ctx, name).is_none()
    }

    /// `x = expr;` with an unknown `x`: a new persistent field typed from
    /// `expr`.
    fn declare_implicit_field(
        &mut self,
        name: &str,
        value: &Expr,
        out: &mut Vec<BoundStmt>,
    ) {
        let Some((bound, ty)) = self.bind_value(value) else {
            return;
        };
        if ty == Type::Null {
            self.error(
                ErrorCode::CANNOT_INFER,
                format!("Cannot infer the type of '{name}' from a null value"),
                value.span,
            );
            return;
        }
        let handle = FieldSlot::new(name, ty);
        self.body.locals.define_field(name, Arc::clone(&handle), false);
        self.fields.push(PendingField {
            name: name.to_string(),
            handle: Arc::clone(&handle),
            readonly: false,
        });
        out.push(BoundStmt::Expr(BoundExpr::Assign {
            place: Place::Static(handle),
            value: Box::new(bound),
        }));
    }

    fn declare_host_fields(&mut self, decl: &LocalDecl, out: &mut Vec<BoundStmt>) {
        for declarator in &decl.declarators {
            let name = &declarator.name.name;
            if self.body.locals.defined_in_current_scope(name) {
                self.error(
                    ErrorCode::DUPLICATE_DECLARATION,
                    format!("A variable named '{name}' is already defined in this unit"),
                    declarator.name.span,
                );
                continue;
            }
            let Some((ty, init)) = self.bind_declarator(decl, declarator) else {
                continue;
            };
            let handle = FieldSlot::new(name.clone(), ty);
            self.body
                .locals
                .define_field(name, Arc::clone(&handle), decl.is_const);
            self.fields.push(PendingField {
                name: name.clone(),
                handle: Arc::clone(&handle),
                readonly: decl.is_const,
            });
            if let Some(value) = init {
                out.push(BoundStmt::Expr(BoundExpr::Assign {
                    place: Place::Static(handle),
                    value: Box::new(value),
                }));
            }
        }
    }

    /// Resolve a declarator's type and bind its initializer. The name is not
    /// yet in scope while the initializer is bound.
    fn bind_declarator(
        &mut self,
        decl: &LocalDecl,
        declarator: &VarDeclarator,
    ) -> Option<(Type, Option<BoundExpr>)> {
        let name = &declarator.name.name;
        if decl.is_const && declarator.init.is_none() {
            self.error(
                ErrorCode::TYPE_MISMATCH,
                format!("The constant '{name}' must be given a value"),
                declarator.span,
            );
            return None;
        }
        if decl.ty.kind == TypeRefKind::Var {
            let Some(init) = &declarator.init else {
                self.error(
                    ErrorCode::CANNOT_INFER,
                    "Implicitly-typed variables must be initialized",
                    declarator.span,
                );
                return None;
            };
            let (bound, ty) = self.bind_value(init)?;
            if ty == Type::Null {
                self.error(
                    ErrorCode::CANNOT_INFER,
                    "Cannot assign <null> to an implicitly-typed variable",
                    init.span,
                );
                return None;
            }
            return Some((ty, Some(bound)));
        }

        let ctx = self.body.ctx.clone();
        let ty = self.resolve_value_type(&ctx, &decl.ty)?;
        let init = match &declarator.init {
            Some(init) => Some(self.bind_converted(init, &ty)?),
            None => None,
        };
        Some((ty, init))
    }

    // ══════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════

    fn bind_stmts(&mut self, stmts: &[Stmt]) -> Vec<BoundStmt> {
        stmts.iter().filter_map(|s| self.bind_stmt(s)).collect()
    }

    /// Bind a statement in its own block scope.
    fn bind_embedded(&mut self, stmt: &Stmt, kind: ScopeKind) -> Option<BoundStmt> {
        self.body.locals.push_scope(kind);
        let bound = self.bind_stmt(stmt);
        self.body.locals.pop_scope();
        bound
    }

    fn bind_stmt(&mut self, stmt: &Stmt) -> Option<BoundStmt> {
        match &stmt.kind {
            StmtKind::Empty => None,
            StmtKind::Block(block) => {
                self.body.locals.push_scope(ScopeKind::Block);
                let stmts = self.bind_stmts(&block.stmts);
                self.body.locals.pop_scope();
                Some(BoundStmt::Block(stmts))
            }
            StmtKind::LocalDecl(decl) => Some(BoundStmt::Block(self.bind_local_decl(decl))),
            StmtKind::Expr(expr) => self.bind_expr(expr).map(|(e, _)| BoundStmt::Expr(e)),
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond = self.bind_condition(cond);
                let then_branch = self.bind_embedded(then_branch, ScopeKind::Block);
                let else_branch = match else_branch {
                    Some(e) => self.bind_embedded(e, ScopeKind::Block).map(Box::new),
                    None => None,
                };
                Some(BoundStmt::If {
                    cond: cond?,
                    then_branch: Box::new(then_branch.unwrap_or(BoundStmt::Block(Vec::new()))),
                    else_branch,
                })
            }
            StmtKind::While { cond, body } => {
                let cond = self.bind_condition(cond);
                let body = self.bind_embedded(body, ScopeKind::Loop);
                Some(BoundStmt::While {
                    cond: cond?,
                    body: Box::new(body.unwrap_or(BoundStmt::Block(Vec::new()))),
                })
            }
            StmtKind::DoWhile { body, cond } => {
                let body = self.bind_embedded(body, ScopeKind::Loop);
                let cond = self.bind_condition(cond);
                Some(BoundStmt::DoWhile {
                    body: Box::new(body.unwrap_or(BoundStmt::Block(Vec::new()))),
                    cond: cond?,
                })
            }
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                self.body.locals.push_scope(ScopeKind::Loop);
                let init = match init {
                    Some(ForInit::Decl(decl)) => self.bind_local_decl(decl),
                    Some(ForInit::Exprs(exprs)) => exprs
                        .iter()
                        .filter_map(|e| self.bind_expr(e).map(|(b, _)| BoundStmt::Expr(b)))
                        .collect(),
                    None => Vec::new(),
                };
                let cond = cond.as_ref().and_then(|c| self.bind_condition(c));
                let update = update
                    .iter()
                    .filter_map(|e| self.bind_expr(e).map(|(b, _)| b))
                    .collect();
                let body = self.bind_embedded(body, ScopeKind::Block);
                self.body.locals.pop_scope();
                Some(BoundStmt::For {
                    init,
                    cond,
                    update,
                    body: Box::new(body.unwrap_or(BoundStmt::Block(Vec::new()))),
                })
            }
            StmtKind::Break | StmtKind::Continue => {
                if !self.body.locals.in_loop() {
                    self.error(
                        ErrorCode::MISPLACED_JUMP,
                        "No enclosing loop out of which to break or continue",
                        stmt.span,
                    );
                    return None;
                }
                Some(if matches!(stmt.kind, StmtKind::Break) {
                    BoundStmt::Break
                } else {
                    BoundStmt::Continue
                })
            }
            StmtKind::Return(value) => self.bind_return(value.as_ref(), stmt.span),
            StmtKind::Throw(value) => {
                let Some(value) = value else {
                    self.error(
                        ErrorCode::UNSUPPORTED_FEATURE,
                        "A throw statement with no argument is only valid inside a catch clause",
                        stmt.span,
                    );
                    return None;
                };
                self.bind_value(value).map(|(e, _)| BoundStmt::Throw(e))
            }
        }
    }

    fn bind_return(&mut self, value: Option<&Expr>, span: Span) -> Option<BoundStmt> {
        let Some(return_type) = self.body.return_type.clone() else {
            self.error(
                ErrorCode::MISPLACED_RETURN,
                "'return' is not allowed in top-level statements",
                span,
            );
            return None;
        };
        match (value, return_type == Type::Void) {
            (None, true) => Some(BoundStmt::Return(None)),
            (Some(_), true) => {
                self.error(
                    ErrorCode::TYPE_MISMATCH,
                    "The method returns void, so 'return' must not be followed by an expression",
                    span,
                );
                None
            }
            (None, false) => {
                self.error(
                    ErrorCode::TYPE_MISMATCH,
                    format!("An object of a type convertible to '{return_type}' is required"),
                    span,
                );
                None
            }
            (Some(expr), false) => self
                .bind_converted(expr, &return_type)
                .map(|e| BoundStmt::Return(Some(e))),
        }
    }

    /// Local declarations inside a body or nested block. Every declarator
    /// is (re)initialized when the statement runs.
    fn bind_local_decl(&mut self, decl: &LocalDecl) -> Vec<BoundStmt> {
        let mut out = Vec::new();
        for declarator in &decl.declarators {
            let name = &declarator.name.name;
            let Some((ty, init)) = self.bind_declarator(decl, declarator) else {
                continue;
            };
            let default = ty.default_value();
            let Some(slot) = self.body.locals.define_local(name, ty, decl.is_const) else {
                self.error(
                    ErrorCode::DUPLICATE_DECLARATION,
                    format!("A local variable named '{name}' is already defined in this scope"),
                    declarator.name.span,
                );
                continue;
            };
            let value = init.unwrap_or(BoundExpr::Const(default));
            out.push(BoundStmt::Expr(BoundExpr::Assign {
                place: Place::Local(slot),
                value: Box::new(value),
            }));
        }
        out
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Reachability
// ══════════════════════════════════════════════════════════════════════════════

/// `true` if control can fall off the end of `stmts`.
fn can_complete(stmts: &[BoundStmt]) -> bool {
    stmts.iter().all(completes)
}

fn completes(stmt: &BoundStmt) -> bool {
    match stmt {
        BoundStmt::Return(_) | BoundStmt::Throw(_) | BoundStmt::Break | BoundStmt::Continue => {
            false
        }
        BoundStmt::Block(stmts) => can_complete(stmts),
        BoundStmt::If {
            then_branch,
            else_branch: Some(else_branch),
            ..
        } => completes(then_branch) || completes(else_branch),
        BoundStmt::While { cond, body } => !is_true(cond) || breaks(body),
        BoundStmt::For { cond, body, .. } => cond.as_ref().is_some_and(|c| !is_true(c)) || breaks(body),
        BoundStmt::DoWhile { body, cond } => {
            breaks(body) || (!is_true(cond) && (completes(body) || continues(body)))
        }
        _ => true,
    }
}

fn is_true(expr: &BoundExpr) -> bool {
    matches!(expr, BoundExpr::Const(Value::Bool(true)))
}

/// `true` if `stmt` contains a `break` for the loop it is the body of.
fn breaks(stmt: &BoundStmt) -> bool {
    find_jump(stmt, &|s| matches!(s, BoundStmt::Break))
}

fn continues(stmt: &BoundStmt) -> bool {
    find_jump(stmt, &|s| matches!(s, BoundStmt::Continue))
}

fn find_jump(stmt: &BoundStmt, is_jump: &dyn Fn(&BoundStmt) -> bool) -> bool {
    if is_jump(stmt) {
        return true;
    }
    match stmt {
        BoundStmt::Block(stmts) => stmts.iter().any(|s| find_jump(s, is_jump)),
        BoundStmt::If {
            then_branch,
            else_branch,
            ..
        } => {
            find_jump(then_branch, is_jump)
                || else_branch.as_ref().is_some_and(|e| find_jump(e, is_jump))
        }
        // Jumps inside a nested loop target that loop.
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ret() -> BoundStmt {
        BoundStmt::Return(Some(BoundExpr::Const(Value::Int(1))))
    }

    fn forever(body: BoundStmt) -> BoundStmt {
        BoundStmt::While {
            cond: BoundExpr::Const(Value::Bool(true)),
            body: Box::new(body),
        }
    }

    #[test]
    fn return_ends_completion() {
        assert!(can_complete(&[]));
        assert!(!can_complete(&[ret()]));
    }

    #[test]
    fn if_needs_both_branches_to_return() {
        let cond = BoundExpr::Const(Value::Bool(false));
        let one_sided = BoundStmt::If {
            cond: cond.clone(),
            then_branch: Box::new(ret()),
            else_branch: None,
        };
        assert!(completes(&one_sided));
        let both = BoundStmt::If {
            cond,
            then_branch: Box::new(ret()),
            else_branch: Some(Box::new(ret())),
        };
        assert!(!completes(&both));
    }

    #[test]
    fn infinite_loop_completes_only_with_break() {
        assert!(!completes(&forever(BoundStmt::Block(vec![]))));
        assert!(completes(&forever(BoundStmt::Block(vec![BoundStmt::Break]))));
        // A break inside an inner loop does not leave the outer one.
        let inner = forever(BoundStmt::Break);
        assert!(!completes(&forever(inner)));
    }
}
