//! Expression binding: name resolution, member access, operators, calls
//! and object creation.

use std::sync::Arc;

use cinder_eval::{
    ArithOp, BinaryOp, BoundExpr, CmpOp, Intrinsic, MethodInfo, NumKind, Place, Type, TypeInfo,
    Value,
};
use cinder_types::ast::{AssignOp, BinOp, Expr, ExprKind, Ident, TypeKind, TypeRef, UnaryOp};
use cinder_types::{ErrorCode, Span};

use super::Binder;
use crate::image::{ContainerPath, Entity};
use crate::scope::Binding;

/// What an expression denotes before it is used as a value.
pub(crate) enum Resolved {
    Value(BoundExpr, Type),
    Place {
        place: Place,
        ty: Type,
        readonly: bool,
    },
    Type(Arc<TypeInfo>),
    Namespace(ContainerPath),
    Methods(MethodGroup),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dispatch {
    Direct,
    /// Call through an interface type.
    Interface,
    /// `x.ToString()` on any value.
    ToString,
}

pub(crate) struct MethodGroup {
    name: String,
    /// The instance the methods were reached through, if any.
    receiver: Option<BoundExpr>,
    candidates: Vec<Arc<MethodInfo>>,
    dispatch: Dispatch,
}

/// Result of looking a simple name up in one enclosing type.
enum Lookup {
    Found(Resolved),
    Failed,
    Missing,
}

impl<'a> Binder<'a> {
    // ══════════════════════════════════════════════════════════════════════
    // Entry points
    // ══════════════════════════════════════════════════════════════════════

    /// Bind an expression; void calls are allowed.
    pub(crate) fn bind_expr(&mut self, expr: &Expr) -> Option<(BoundExpr, Type)> {
        match self.resolve(expr)? {
            Resolved::Value(bound, ty) => Some((bound, ty)),
            Resolved::Place { place, ty, .. } => Some((BoundExpr::Load(place), ty)),
            Resolved::Type(info) => {
                self.error(
                    ErrorCode::TYPE_MISMATCH,
                    format!("'{}' is a type, which is not valid in the given context", info.full_name),
                    expr.span,
                );
                None
            }
            Resolved::Namespace(path) => {
                self.error(
                    ErrorCode::TYPE_MISMATCH,
                    format!("'{}' is a namespace but is used like a variable", path.join(".")),
                    expr.span,
                );
                None
            }
            Resolved::Methods(group) => {
                self.error(
                    ErrorCode::TYPE_MISMATCH,
                    format!("Method '{}' cannot be used as a value", group.name),
                    expr.span,
                );
                None
            }
        }
    }

    /// Bind an expression that must produce a value.
    pub(crate) fn bind_value(&mut self, expr: &Expr) -> Option<(BoundExpr, Type)> {
        let (bound, ty) = self.bind_expr(expr)?;
        if ty == Type::Void {
            self.error(
                ErrorCode::TYPE_MISMATCH,
                "Cannot use an expression of type 'void' as a value",
                expr.span,
            );
            return None;
        }
        Some((bound, ty))
    }

    /// Bind and implicitly convert to `target`.
    pub(crate) fn bind_converted(&mut self, expr: &Expr, target: &Type) -> Option<BoundExpr> {
        let (bound, ty) = self.bind_value(expr)?;
        self.coerce(bound, &ty, target, expr.span)
    }

    pub(crate) fn bind_condition(&mut self, expr: &Expr) -> Option<BoundExpr> {
        self.bind_converted(expr, &Type::Bool)
    }

    /// Apply an implicit conversion, inserting a widening where needed.
    fn coerce(&mut self, bound: BoundExpr, from: &Type, to: &Type, span: Span) -> Option<BoundExpr> {
        if from == to {
            return Some(bound);
        }
        if from.is_integral() && *to == Type::Double {
            return Some(BoundExpr::IntToDouble(Box::new(bound)));
        }
        if from.is_assignable_to(to) {
            return Some(bound);
        }
        self.error(
            ErrorCode::TYPE_MISMATCH,
            format!("Cannot implicitly convert type '{from}' to '{to}'"),
            span,
        );
        None
    }

    // ══════════════════════════════════════════════════════════════════════
    // Resolution
    // ══════════════════════════════════════════════════════════════════════

    fn resolve(&mut self, expr: &Expr) -> Option<Resolved> {
        let (bound, ty) = match &expr.kind {
            ExprKind::Name(ident) => return self.resolve_name(ident),
            ExprKind::Member { target, name } => return self.resolve_member(target, name),
            ExprKind::Paren(inner) => return self.resolve(inner),

            ExprKind::IntLit(n) => int_literal(*n),
            ExprKind::DoubleLit(d) => (BoundExpr::Const(Value::Double(*d)), Type::Double),
            ExprKind::StringLit(s) => (BoundExpr::Const(Value::string(s)), Type::String),
            ExprKind::BoolLit(b) => (BoundExpr::Const(Value::Bool(*b)), Type::Bool),
            ExprKind::Null => (BoundExpr::Const(Value::Null), Type::Null),
            ExprKind::This => match self.body.this_type.clone() {
                Some(info) => (BoundExpr::This, Type::Named(info)),
                None => {
                    self.error(
                        ErrorCode::STATIC_CONTEXT,
                        "Keyword 'this' is not valid in a static context",
                        expr.span,
                    );
                    return None;
                }
            },

            ExprKind::Call { callee, args } => self.bind_call(callee, args, expr.span)?,
            ExprKind::New { ty, args } => self.bind_new(ty, args, expr.span)?,
            ExprKind::Unary { op, operand } => self.bind_unary(*op, operand, expr.span)?,
            ExprKind::Binary { left, op, right } => self.bind_binary(left, *op, right, expr.span)?,
            ExprKind::Assign { target, op, value } => self.bind_assign(target, *op, value, expr.span)?,
            ExprKind::IncDec {
                target,
                increment,
                prefix,
            } => {
                let (place, ty) = self.bind_place(target)?;
                let kind = match ty {
                    Type::Int | Type::Long => NumKind::Int,
                    Type::Double => NumKind::Double,
                    _ => {
                        let op = if *increment { "++" } else { "--" };
                        self.error(
                            ErrorCode::INVALID_OPERATOR,
                            format!("Operator '{op}' cannot be applied to operand of type '{ty}'"),
                            expr.span,
                        );
                        return None;
                    }
                };
                let bound = BoundExpr::IncDec {
                    place,
                    increment: *increment,
                    prefix: *prefix,
                    kind,
                };
                (bound, ty)
            }
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => self.bind_conditional(cond, then_expr, else_expr, expr.span)?,
        };
        Some(Resolved::Value(bound, ty))
    }

    fn resolve_name(&mut self, ident: &Ident) -> Option<Resolved> {
        let name = ident.name.as_str();
        if let Some(binding) = self.body.locals.lookup(name).cloned() {
            return Some(match binding {
                Binding::Local { slot, ty, readonly } => Resolved::Place {
                    place: Place::Local(slot),
                    ty,
                    readonly,
                },
                Binding::Field { handle, readonly } => Resolved::Place {
                    ty: handle.ty().clone(),
                    place: Place::Static(handle),
                    readonly,
                },
            });
        }
        if self.body.is_host() {
            if let Some(field) = self.registry.lookup(name) {
                return Some(Resolved::Place {
                    place: Place::Static(Arc::clone(&field.handle)),
                    ty: field.ty().clone(),
                    readonly: field.readonly,
                });
            }
        }

        let enclosing: Vec<Arc<TypeInfo>> = self.body.ctx.enclosing.iter().rev().cloned().collect();
        for outer in &enclosing {
            match self.enclosing_member(outer, ident) {
                Lookup::Found(resolved) => return Some(resolved),
                Lookup::Failed => return None,
                Lookup::Missing => {}
            }
        }

        if self.body.is_host() {
            let helpers: Vec<Arc<MethodInfo>> = self
                .host_helpers
                .iter()
                .filter(|m| m.name == name)
                .cloned()
                .collect();
            if !helpers.is_empty() {
                return Some(Resolved::Methods(MethodGroup {
                    name: name.to_string(),
                    receiver: None,
                    candidates: helpers,
                    dispatch: Dispatch::Direct,
                }));
            }
        }

        let ctx = self.body.ctx.clone();
        match self.lookup_entity(&ctx, name) {
            Some(Entity::Type(info)) => Some(Resolved::Type(info)),
            Some(Entity::Namespace(path)) => Some(Resolved::Namespace(path)),
            None => {
                self.error(
                    ErrorCode::UNKNOWN_NAME,
                    format!("The name '{name}' does not exist in the current context"),
                    ident.span,
                );
                None
            }
        }
    }

    /// A simple name inside a type body: fields, methods and nested types
    /// of the enclosing type.
    fn enclosing_member(&mut self, outer: &Arc<TypeInfo>, ident: &Ident) -> Lookup {
        let name = ident.name.as_str();
        if let Some((index, ty, readonly)) = outer.instance_field(name) {
            if !self.body.is_this_type(outer) {
                self.error(
                    ErrorCode::STATIC_CONTEXT,
                    format!("An object reference is required for the non-static field '{}.{name}'", outer.name),
                    ident.span,
                );
                return Lookup::Failed;
            }
            return Lookup::Found(Resolved::Place {
                place: Place::Instance {
                    target: Box::new(BoundExpr::This),
                    index,
                },
                ty,
                readonly: readonly && !self.body.in_constructor,
            });
        }
        if let Some((handle, readonly)) = outer.static_field(name) {
            return Lookup::Found(Resolved::Place {
                ty: handle.ty().clone(),
                place: Place::Static(handle),
                readonly,
            });
        }
        if let Some(value) = outer.enum_value(name) {
            return Lookup::Found(enum_constant(outer, value));
        }
        let methods = outer.methods_named(name);
        if !methods.is_empty() {
            let receiver = self.body.is_this_type(outer).then_some(BoundExpr::This);
            return Lookup::Found(Resolved::Methods(MethodGroup {
                name: name.to_string(),
                receiver,
                candidates: methods,
                dispatch: Dispatch::Direct,
            }));
        }
        if let Some(nested) = outer.nested_type(name) {
            return Lookup::Found(Resolved::Type(nested));
        }
        Lookup::Missing
    }

    fn resolve_member(&mut self, target: &Expr, ident: &Ident) -> Option<Resolved> {
        match self.resolve(target)? {
            Resolved::Namespace(path) => {
                let parent = Entity::Namespace(path.clone());
                match self.image.child(&parent, &ident.name) {
                    Some(Entity::Type(info)) => Some(Resolved::Type(info)),
                    Some(Entity::Namespace(path)) => Some(Resolved::Namespace(path)),
                    None => {
                        self.error(
                            ErrorCode::UNKNOWN_NAMESPACE,
                            format!(
                                "The type or namespace name '{}' does not exist in the namespace '{}'",
                                ident.name,
                                path.join(".")
                            ),
                            ident.span,
                        );
                        None
                    }
                }
            }
            Resolved::Type(info) => self.static_member(&info, ident),
            Resolved::Methods(group) => {
                self.error(
                    ErrorCode::UNKNOWN_MEMBER,
                    format!("Method '{}' has no member '{}'", group.name, ident.name),
                    ident.span,
                );
                None
            }
            Resolved::Value(bound, ty) => self.instance_member(bound, &ty, ident),
            Resolved::Place { place, ty, .. } => {
                self.instance_member(BoundExpr::Load(place), &ty, ident)
            }
        }
    }

    /// `Type.name`
    fn static_member(&mut self, info: &Arc<TypeInfo>, ident: &Ident) -> Option<Resolved> {
        let name = ident.name.as_str();
        if info.kind == TypeKind::Enum {
            if let Some(value) = info.enum_value(name) {
                return Some(enum_constant(info, value));
            }
        }
        if let Some((handle, readonly)) = info.static_field(name) {
            return Some(Resolved::Place {
                ty: handle.ty().clone(),
                place: Place::Static(handle),
                readonly,
            });
        }
        if let Some(nested) = info.nested_type(name) {
            return Some(Resolved::Type(nested));
        }
        let methods = info.methods_named(name);
        if !methods.is_empty() {
            return Some(Resolved::Methods(MethodGroup {
                name: name.to_string(),
                receiver: None,
                candidates: methods,
                dispatch: Dispatch::Direct,
            }));
        }
        if info.instance_field(name).is_some() {
            self.error(
                ErrorCode::STATIC_CONTEXT,
                format!("An object reference is required for the non-static field '{}.{name}'", info.name),
                ident.span,
            );
            return None;
        }
        self.error(
            ErrorCode::UNKNOWN_MEMBER,
            format!("'{}' does not contain a definition for '{name}'", info.full_name),
            ident.span,
        );
        None
    }

    /// `value.name`
    fn instance_member(&mut self, target: BoundExpr, ty: &Type, ident: &Ident) -> Option<Resolved> {
        let name = ident.name.as_str();
        if name == "ToString" && *ty != Type::Void {
            return Some(Resolved::Methods(MethodGroup {
                name: name.to_string(),
                receiver: Some(target),
                candidates: Vec::new(),
                dispatch: Dispatch::ToString,
            }));
        }
        if *ty == Type::String && name == "Length" {
            let bound = BoundExpr::Intrinsic(Intrinsic::StringLength, Box::new(target));
            return Some(Resolved::Value(bound, Type::Int));
        }

        if let Type::Named(info) = ty {
            match info.kind {
                TypeKind::Class | TypeKind::Struct => {
                    if let Some((index, field_ty, readonly)) = info.instance_field(name) {
                        let writable_here = self.body.in_constructor
                            && self.body.is_this_type(info)
                            && matches!(target, BoundExpr::This);
                        return Some(Resolved::Place {
                            place: Place::Instance {
                                target: Box::new(target),
                                index,
                            },
                            ty: field_ty,
                            readonly: readonly && !writable_here,
                        });
                    }
                    let methods = info.methods_named(name);
                    let instance: Vec<Arc<MethodInfo>> =
                        methods.iter().filter(|m| !m.is_static).cloned().collect();
                    if !instance.is_empty() {
                        return Some(Resolved::Methods(MethodGroup {
                            name: name.to_string(),
                            receiver: Some(target),
                            candidates: instance,
                            dispatch: Dispatch::Direct,
                        }));
                    }
                    if !methods.is_empty() || info.static_field(name).is_some() {
                        self.error(
                            ErrorCode::STATIC_CONTEXT,
                            format!(
                                "Member '{}.{name}' cannot be accessed with an instance reference; qualify it with a type name instead",
                                info.full_name
                            ),
                            ident.span,
                        );
                        return None;
                    }
                }
                TypeKind::Interface => {
                    let methods = info.methods_named(name);
                    if !methods.is_empty() {
                        return Some(Resolved::Methods(MethodGroup {
                            name: name.to_string(),
                            receiver: Some(target),
                            candidates: methods,
                            dispatch: Dispatch::Interface,
                        }));
                    }
                }
                TypeKind::Enum => {}
            }
        }

        self.error(
            ErrorCode::UNKNOWN_MEMBER,
            format!("'{ty}' does not contain a definition for '{name}'"),
            ident.span,
        );
        None
    }

    /// Resolve an assignment target.
    fn bind_place(&mut self, expr: &Expr) -> Option<(Place, Type)> {
        match self.resolve(expr)? {
            Resolved::Place { readonly: true, .. } => {
                self.error(
                    ErrorCode::NOT_ASSIGNABLE,
                    "Cannot assign to a read-only variable or field",
                    expr.span,
                );
                None
            }
            Resolved::Place { place, ty, .. } => Some((place, ty)),
            _ => {
                self.error(
                    ErrorCode::NOT_ASSIGNABLE,
                    "The left-hand side of an assignment must be a variable or field",
                    expr.span,
                );
                None
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Operators
    // ══════════════════════════════════════════════════════════════════════

    fn bind_unary(&mut self, op: UnaryOp, operand: &Expr, span: Span) -> Option<(BoundExpr, Type)> {
        if op == UnaryOp::Neg {
            if let ExprKind::IntLit(n) = operand.kind {
                return Some(int_literal(n.wrapping_neg()));
            }
        }
        let (bound, ty) = self.bind_value(operand)?;
        match (op, &ty) {
            (UnaryOp::Neg, Type::Int | Type::Long) => {
                Some((BoundExpr::Neg(NumKind::Int, Box::new(bound)), ty))
            }
            (UnaryOp::Neg, Type::Double) => {
                Some((BoundExpr::Neg(NumKind::Double, Box::new(bound)), ty))
            }
            (UnaryOp::Plus, t) if t.is_numeric() => Some((bound, ty)),
            (UnaryOp::Not, Type::Bool) => Some((BoundExpr::Not(Box::new(bound)), ty)),
            _ => {
                self.error(
                    ErrorCode::INVALID_OPERATOR,
                    format!("Operator '{op}' cannot be applied to operand of type '{ty}'"),
                    span,
                );
                None
            }
        }
    }

    fn bind_binary(&mut self, left: &Expr, op: BinOp, right: &Expr, span: Span) -> Option<(BoundExpr, Type)> {
        if matches!(op, BinOp::And | BinOp::Or) {
            let l = self.bind_condition(left);
            let r = self.bind_condition(right);
            let (l, r) = (Box::new(l?), Box::new(r?));
            let bound = if op == BinOp::And {
                BoundExpr::And(l, r)
            } else {
                BoundExpr::Or(l, r)
            };
            return Some((bound, Type::Bool));
        }

        let l = self.bind_value(left);
        let r = self.bind_value(right);
        let ((lb, lt), (rb, rt)) = (l?, r?);
        let mismatch = |this: &mut Self| {
            this.error(
                ErrorCode::INVALID_OPERATOR,
                format!("Operator '{op}' cannot be applied to operands of type '{lt}' and '{rt}'"),
                span,
            );
            None
        };

        match op {
            BinOp::Coalesce => {
                if !lt.is_nullable() {
                    return mismatch(self);
                }
                let result = if rt.is_assignable_to(&lt) {
                    lt.clone()
                } else if lt.is_assignable_to(&rt) {
                    rt.clone()
                } else {
                    return mismatch(self);
                };
                let lb = self.coerce(lb, &lt, &result, left.span)?;
                let rb = self.coerce(rb, &rt, &result, right.span)?;
                Some((BoundExpr::Coalesce(Box::new(lb), Box::new(rb)), result))
            }
            BinOp::Eq | BinOp::NotEq => {
                let (lb, rb) = if lt.is_numeric() && rt.is_numeric() {
                    let common = widen(&lt, &rt);
                    (
                        self.coerce(lb, &lt, &common, left.span)?,
                        self.coerce(rb, &rt, &common, right.span)?,
                    )
                } else if comparable(&lt, &rt) {
                    (lb, rb)
                } else {
                    return mismatch(self);
                };
                let op = if op == BinOp::Eq {
                    BinaryOp::Equals
                } else {
                    BinaryOp::NotEquals
                };
                Some((binary(op, lb, rb), Type::Bool))
            }
            BinOp::Add if lt == Type::String || rt == Type::String => {
                Some((binary(BinaryOp::Concat, lb, rb), Type::String))
            }
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem => {
                if !(lt.is_numeric() && rt.is_numeric()) {
                    return mismatch(self);
                }
                let common = widen(&lt, &rt);
                let lb = self.coerce(lb, &lt, &common, left.span)?;
                let rb = self.coerce(rb, &rt, &common, right.span)?;
                let arith = arith_op(op)?;
                Some((binary(BinaryOp::Arith(arith, num_kind(&common)), lb, rb), common))
            }
            BinOp::Less | BinOp::LessEq | BinOp::Greater | BinOp::GreaterEq => {
                if !(lt.is_numeric() && rt.is_numeric()) {
                    return mismatch(self);
                }
                let common = widen(&lt, &rt);
                let lb = self.coerce(lb, &lt, &common, left.span)?;
                let rb = self.coerce(rb, &rt, &common, right.span)?;
                let cmp = match op {
                    BinOp::Less => CmpOp::Less,
                    BinOp::LessEq => CmpOp::LessEq,
                    BinOp::Greater => CmpOp::Greater,
                    _ => CmpOp::GreaterEq,
                };
                Some((binary(BinaryOp::Compare(cmp, num_kind(&common)), lb, rb), Type::Bool))
            }
            BinOp::And | BinOp::Or => None,
        }
    }

    fn bind_assign(&mut self, target: &Expr, op: AssignOp, value: &Expr, span: Span) -> Option<(BoundExpr, Type)> {
        let (place, ty) = self.bind_place(target)?;
        let Some(bin) = op.binary_op() else {
            let value = self.bind_converted(value, &ty)?;
            let bound = BoundExpr::Assign {
                place,
                value: Box::new(value),
            };
            return Some((bound, ty));
        };

        let (rb, rt) = self.bind_value(value)?;
        let op = if bin == BinOp::Add && ty == Type::String {
            BinaryOp::Concat
        } else if ty.is_numeric() && rt.is_numeric() {
            BinaryOp::Arith(arith_op(bin)?, num_kind(&ty))
        } else {
            self.error(
                ErrorCode::INVALID_OPERATOR,
                format!("Operator '{bin}=' cannot be applied to operands of type '{ty}' and '{rt}'"),
                span,
            );
            return None;
        };
        let rb = if op == BinaryOp::Concat {
            rb
        } else {
            self.coerce(rb, &rt, &ty, value.span)?
        };
        let bound = BoundExpr::Compound {
            place,
            op,
            value: Box::new(rb),
        };
        Some((bound, ty))
    }

    fn bind_conditional(
        &mut self,
        cond: &Expr,
        then_expr: &Expr,
        else_expr: &Expr,
        span: Span,
    ) -> Option<(BoundExpr, Type)> {
        let cond = self.bind_condition(cond);
        let then_part = self.bind_value(then_expr);
        let else_part = self.bind_value(else_expr);
        let (cond, (tb, tt), (eb, et)) = (cond?, then_part?, else_part?);

        let result = if et.is_assignable_to(&tt) {
            tt.clone()
        } else if tt.is_assignable_to(&et) {
            et.clone()
        } else {
            self.error(
                ErrorCode::TYPE_MISMATCH,
                format!(
                    "Type of conditional expression cannot be determined because there is no implicit conversion between '{tt}' and '{et}'"
                ),
                span,
            );
            return None;
        };
        let tb = self.coerce(tb, &tt, &result, then_expr.span)?;
        let eb = self.coerce(eb, &et, &result, else_expr.span)?;
        let bound = BoundExpr::Conditional {
            cond: Box::new(cond),
            then_expr: Box::new(tb),
            else_expr: Box::new(eb),
        };
        Some((bound, result))
    }

    // ══════════════════════════════════════════════════════════════════════
    // Calls & object creation
    // ══════════════════════════════════════════════════════════════════════

    fn bind_args(&mut self, args: &[Expr]) -> Option<Vec<(BoundExpr, Type, Span)>> {
        let bound: Vec<Option<(BoundExpr, Type, Span)>> = args
            .iter()
            .map(|a| self.bind_value(a).map(|(b, t)| (b, t, a.span)))
            .collect();
        bound.into_iter().collect()
    }

    fn bind_call(&mut self, callee: &Expr, args: &[Expr], span: Span) -> Option<(BoundExpr, Type)> {
        let group = match self.resolve(callee)? {
            Resolved::Methods(group) => group,
            _ => {
                self.error(
                    ErrorCode::NOT_CALLABLE,
                    "Only methods can be invoked",
                    callee.span,
                );
                return None;
            }
        };
        let args = self.bind_args(args)?;

        if group.dispatch == Dispatch::ToString {
            if !args.is_empty() {
                self.error(
                    ErrorCode::WRONG_ARG_COUNT,
                    format!("No overload for method 'ToString' takes {} arguments", args.len()),
                    span,
                );
                return None;
            }
            let receiver = group.receiver?;
            let bound = BoundExpr::Intrinsic(Intrinsic::ToString, Box::new(receiver));
            return Some((bound, Type::String));
        }

        let method = self.select_overload(&group.name, &group.candidates, &args, span)?;
        let args = self.convert_args(&method, args)?;
        let return_type = method.return_type.clone();

        if group.dispatch == Dispatch::Interface {
            let receiver = group.receiver?;
            let bound = BoundExpr::CallVirtual {
                receiver: Box::new(receiver),
                method,
                args,
            };
            return Some((bound, return_type));
        }

        let receiver = if method.is_static {
            None
        } else {
            match group.receiver {
                Some(receiver) => Some(Box::new(receiver)),
                None => {
                    self.error(
                        ErrorCode::STATIC_CONTEXT,
                        format!(
                            "An object reference is required for the non-static method '{}.{}'",
                            method.declaring_type, method.name
                        ),
                        span,
                    );
                    return None;
                }
            }
        };
        let bound = BoundExpr::Call {
            method,
            receiver,
            args,
        };
        Some((bound, return_type))
    }

    fn bind_new(&mut self, ty: &TypeRef, args: &[Expr], span: Span) -> Option<(BoundExpr, Type)> {
        let ctx = self.body.ctx.clone();
        let resolved = self.resolve_value_type(&ctx, ty)?;
        let info = match &resolved {
            Type::Named(info) if matches!(info.kind, TypeKind::Class | TypeKind::Struct) => {
                Arc::clone(info)
            }
            _ => {
                self.error(
                    ErrorCode::CANNOT_INSTANTIATE,
                    format!("Cannot create an instance of '{resolved}'"),
                    span,
                );
                return None;
            }
        };
        if info.is_abstract || info.is_static {
            let what = if info.is_static { "static" } else { "abstract" };
            self.error(
                ErrorCode::CANNOT_INSTANTIATE,
                format!("Cannot create an instance of the {what} type '{}'", info.full_name),
                span,
            );
            return None;
        }

        let args = self.bind_args(args)?;
        let ctors = info.members().constructors.clone();
        if ctors.is_empty() {
            if !args.is_empty() {
                self.error(
                    ErrorCode::WRONG_ARG_COUNT,
                    format!("'{}' does not contain a constructor that takes {} arguments", info.full_name, args.len()),
                    span,
                );
                return None;
            }
            let bound = BoundExpr::New {
                ty: Arc::clone(&info),
                ctor: None,
                args: Vec::new(),
            };
            return Some((bound, resolved));
        }

        let ctor = self.select_overload(&info.name, &ctors, &args, span)?;
        let args = self.convert_args(&ctor, args)?;
        let bound = BoundExpr::New {
            ty: Arc::clone(&info),
            ctor: Some(ctor),
            args,
        };
        Some((bound, resolved))
    }

    /// Choose the applicable candidate with the cheapest implicit
    /// conversions; the first declared wins a tie.
    fn select_overload(
        &mut self,
        name: &str,
        candidates: &[Arc<MethodInfo>],
        args: &[(BoundExpr, Type, Span)],
        span: Span,
    ) -> Option<Arc<MethodInfo>> {
        let by_arity: Vec<&Arc<MethodInfo>> = candidates
            .iter()
            .filter(|m| m.params.len() == args.len())
            .collect();
        if by_arity.is_empty() {
            self.error(
                ErrorCode::WRONG_ARG_COUNT,
                format!("No overload for method '{name}' takes {} arguments", args.len()),
                span,
            );
            return None;
        }

        let mut best: Option<(u32, &Arc<MethodInfo>)> = None;
        for candidate in by_arity {
            let cost: Option<u32> = candidate
                .params
                .iter()
                .zip(args)
                .map(|((_, param), (_, arg, _))| conversion_cost(arg, param))
                .sum();
            if let Some(cost) = cost {
                if best.is_none_or(|(c, _)| cost < c) {
                    best = Some((cost, candidate));
                }
            }
        }
        match best {
            Some((_, method)) => Some(Arc::clone(method)),
            None => {
                let types: Vec<String> = args.iter().map(|(_, t, _)| t.to_string()).collect();
                self.error(
                    ErrorCode::TYPE_MISMATCH,
                    format!("No overload of '{name}' accepts arguments of type ({})", types.join(", ")),
                    span,
                );
                None
            }
        }
    }

    fn convert_args(
        &mut self,
        method: &MethodInfo,
        args: Vec<(BoundExpr, Type, Span)>,
    ) -> Option<Vec<BoundExpr>> {
        let converted: Vec<Option<BoundExpr>> = method
            .params
            .iter()
            .zip(args)
            .map(|((_, param), (bound, ty, span))| self.coerce(bound, &ty, param, span))
            .collect();
        converted.into_iter().collect()
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

/// Integer literals are `int` when they fit in 32 bits, `long` otherwise.
fn int_literal(n: i64) -> (BoundExpr, Type) {
    let ty = if i32::try_from(n).is_ok() {
        Type::Int
    } else {
        Type::Long
    };
    (BoundExpr::Const(Value::Int(n)), ty)
}

fn enum_constant(info: &Arc<TypeInfo>, value: i64) -> Resolved {
    let bound = BoundExpr::Const(Value::Enum {
        ty: Arc::clone(info),
        value,
    });
    Resolved::Value(bound, Type::Named(Arc::clone(info)))
}

fn binary(op: BinaryOp, left: BoundExpr, right: BoundExpr) -> BoundExpr {
    BoundExpr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

/// The common type of two numeric operands.
fn widen(a: &Type, b: &Type) -> Type {
    if *a == Type::Double || *b == Type::Double {
        Type::Double
    } else if *a == Type::Long || *b == Type::Long {
        Type::Long
    } else {
        Type::Int
    }
}

fn num_kind(ty: &Type) -> NumKind {
    if *ty == Type::Double {
        NumKind::Double
    } else {
        NumKind::Int
    }
}

fn arith_op(op: BinOp) -> Option<ArithOp> {
    match op {
        BinOp::Add => Some(ArithOp::Add),
        BinOp::Sub => Some(ArithOp::Sub),
        BinOp::Mul => Some(ArithOp::Mul),
        BinOp::Div => Some(ArithOp::Div),
        BinOp::Rem => Some(ArithOp::Rem),
        _ => None,
    }
}

/// Whether `==` is defined between two non-numeric operand types.
fn comparable(a: &Type, b: &Type) -> bool {
    a == b
        || (*a == Type::Null && b.is_nullable())
        || (*b == Type::Null && a.is_nullable())
        || *a == Type::Object
        || *b == Type::Object
        || (matches!((a, b), (Type::Named(_), Type::Named(_)))
            && (a.is_assignable_to(b) || b.is_assignable_to(a)))
}

/// Cost of passing `arg` where `param` is expected; `None` if not
/// implicitly convertible.
fn conversion_cost(arg: &Type, param: &Type) -> Option<u32> {
    if arg == param {
        return Some(0);
    }
    if !arg.is_assignable_to(param) {
        return None;
    }
    Some(match (arg, param) {
        (Type::Int, Type::Long) => 1,
        (Type::Int | Type::Long, Type::Double) => 2,
        _ => 3,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_width_follows_value() {
        assert_eq!(int_literal(7).1, Type::Int);
        assert_eq!(int_literal(i64::from(i32::MIN)).1, Type::Int);
        assert_eq!(int_literal(1 << 40).1, Type::Long);
    }

    #[test]
    fn numeric_operands_widen() {
        assert_eq!(widen(&Type::Int, &Type::Int), Type::Int);
        assert_eq!(widen(&Type::Int, &Type::Long), Type::Long);
        assert_eq!(widen(&Type::Long, &Type::Double), Type::Double);
    }

    #[test]
    fn exact_match_is_cheapest() {
        assert_eq!(conversion_cost(&Type::Int, &Type::Int), Some(0));
        assert!(conversion_cost(&Type::Int, &Type::Long) < conversion_cost(&Type::Int, &Type::Double));
        assert_eq!(conversion_cost(&Type::Double, &Type::Int), None);
        assert_eq!(conversion_cost(&Type::String, &Type::Object), Some(3));
    }

    #[test]
    fn null_compares_with_references_only() {
        assert!(comparable(&Type::Null, &Type::String));
        assert!(!comparable(&Type::Null, &Type::Bool));
        assert!(!comparable(&Type::String, &Type::Bool));
    }
}
