//! Stage 2, type population: using targets, member signatures, enum
//! values and interface conformance.

use std::sync::Arc;

use cinder_eval::{FieldSlot, InstanceField, MethodBody, MethodInfo, StaticField, Type, TypeInfo};
use cinder_types::ast::{
    has_modifier, ConstructorDecl, EnumMemberDecl, Expr, ExprKind, FieldDecl, MemberDecl,
    MethodDecl, Modifier, Param, TypeKind, UnaryOp, UsingDirective,
};
use cinder_types::ErrorCode;

use super::{Binder, DeclaredType, TypeContext};
use crate::image::{Entity, UsingEntry, UsingTarget};

impl<'a> Binder<'a> {
    // ══════════════════════════════════════════════════════════════════════
    // Usings
    // ══════════════════════════════════════════════════════════════════════

    /// Resolve using-directives against the image. Targets are always
    /// absolute.
    pub(crate) fn bind_usings(&mut self, usings: &[UsingDirective]) {
        for using in usings {
            let target_name = using.target.to_string();
            let target = match (&using.alias, self.image.lookup(&using.target.segments())) {
                (_, Some(Entity::Namespace(path))) => UsingTarget::Namespace(path),
                (Some(_), Some(Entity::Type(info))) => UsingTarget::Type(info),
                (None, Some(Entity::Type(_))) => {
                    self.error(
                        ErrorCode::UNKNOWN_NAMESPACE,
                        format!(
                            "A using namespace directive can only be applied to namespaces; '{target_name}' is a type not a namespace"
                        ),
                        using.target.span,
                    );
                    continue;
                }
                (_, None) => {
                    self.error(
                        ErrorCode::UNKNOWN_NAMESPACE,
                        format!("The type or namespace name '{target_name}' could not be found"),
                        using.target.span,
                    );
                    continue;
                }
            };

            let alias = using.alias.as_ref().map(|a| a.name.clone());
            if let Some(alias_name) = &alias {
                let clash = self
                    .image
                    .usings()
                    .iter()
                    .chain(&self.usings)
                    .any(|u| u.alias.as_ref() == Some(alias_name) && u.target_name != target_name);
                if clash {
                    self.error(
                        ErrorCode::DUPLICATE_DECLARATION,
                        format!("The using alias '{alias_name}' appeared previously with a different target"),
                        using.span,
                    );
                    continue;
                }
            }
            self.usings.push(UsingEntry {
                alias,
                target,
                target_name,
            });
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Types
    // ══════════════════════════════════════════════════════════════════════

    pub(super) fn populate_types(&mut self, declared: &mut [DeclaredType<'_>]) {
        for dt in declared.iter_mut() {
            self.populate_bases(dt);
            let ctx = dt.ctx.nested(&dt.info);
            if dt.decl.kind == TypeKind::Enum {
                self.populate_enum(&dt.info, &dt.decl.members);
                continue;
            }
            for member in &dt.decl.members {
                match member {
                    MemberDecl::Field(field) => self.populate_field(&dt.info, &ctx, field),
                    MemberDecl::Method(method) => {
                        if let Some(info) = self.populate_method(&dt.info, &ctx, method) {
                            dt.methods.push((method, info));
                        }
                    }
                    MemberDecl::Constructor(ctor) => {
                        if let Some(info) = self.populate_constructor(&dt.info, &ctx, ctor) {
                            dt.constructors.push((ctor, info));
                        }
                    }
                    MemberDecl::EnumMember(_) | MemberDecl::NestedType(_) => {}
                }
            }
        }

        for dt in declared.iter() {
            if matches!(dt.info.kind, TypeKind::Class | TypeKind::Struct) {
                self.check_conformance(dt);
            }
        }
    }

    fn populate_bases(&mut self, dt: &DeclaredType<'_>) {
        let mut interfaces = Vec::new();
        for base in &dt.decl.bases {
            if dt.decl.kind == TypeKind::Enum {
                let name = base.to_string();
                if name == "int" || name == "long" {
                    continue;
                }
            }
            match self.lookup_qualified(&dt.ctx, base) {
                Some(Entity::Type(info)) if info.kind == TypeKind::Interface => {
                    if dt.decl.kind == TypeKind::Enum {
                        self.error(
                            ErrorCode::TYPE_MISMATCH,
                            format!("Enum '{}' cannot implement interfaces", dt.info.name),
                            base.span,
                        );
                    } else {
                        interfaces.push(info);
                    }
                }
                Some(Entity::Type(info)) => self.error(
                    ErrorCode::TYPE_MISMATCH,
                    format!(
                        "'{}' is not an interface; class inheritance is not supported",
                        info.full_name
                    ),
                    base.span,
                ),
                _ => self.error(
                    ErrorCode::UNKNOWN_TYPE,
                    format!("The type or namespace name '{base}' could not be found"),
                    base.span,
                ),
            }
        }
        dt.info.members_mut().interfaces = interfaces;
    }

    // ── Fields ────────────────────────────────────────────────────────────────

    fn populate_field(&mut self, info: &Arc<TypeInfo>, ctx: &TypeContext, field: &FieldDecl) {
        if info.kind == TypeKind::Interface {
            self.error(
                ErrorCode::TYPE_MISMATCH,
                "Interfaces cannot contain fields",
                field.span,
            );
            return;
        }
        let is_const = has_modifier(&field.modifiers, Modifier::Const);
        let is_static = is_const || has_modifier(&field.modifiers, Modifier::Static);
        let readonly = is_const || has_modifier(&field.modifiers, Modifier::Readonly);
        if !is_static && info.is_static {
            self.error(
                ErrorCode::STATIC_CONTEXT,
                format!("'{}': cannot declare instance members in a static class", info.name),
                field.span,
            );
            return;
        }
        let Some(ty) = self.resolve_value_type(ctx, &field.ty) else {
            return;
        };

        for declarator in &field.declarators {
            let name = &declarator.name.name;
            if self.member_name_taken(info, name) {
                self.error(
                    ErrorCode::DUPLICATE_DECLARATION,
                    format!("The type '{}' already contains a definition for '{name}'", info.name),
                    declarator.name.span,
                );
                continue;
            }
            if is_const && declarator.init.is_none() {
                self.error(
                    ErrorCode::TYPE_MISMATCH,
                    "A const field requires a value to be provided",
                    declarator.span,
                );
                continue;
            }
            let mut members = info.members_mut();
            if is_static {
                members.static_fields.push(StaticField {
                    handle: FieldSlot::new(name.clone(), ty.clone()),
                    readonly,
                });
            } else {
                members.instance_fields.push(InstanceField {
                    name: name.clone(),
                    ty: ty.clone(),
                    readonly,
                });
            }
        }
    }

    fn member_name_taken(&self, info: &TypeInfo, name: &str) -> bool {
        info.instance_field(name).is_some()
            || info.static_field(name).is_some()
            || info.nested_type(name).is_some()
            || !info.methods_named(name).is_empty()
    }

    // ── Methods & constructors ────────────────────────────────────────────────

    fn populate_method(
        &mut self,
        info: &Arc<TypeInfo>,
        ctx: &TypeContext,
        method: &MethodDecl,
    ) -> Option<Arc<MethodInfo>> {
        let name = &method.name.name;
        let is_static = has_modifier(&method.modifiers, Modifier::Static);
        let marked_abstract = has_modifier(&method.modifiers, Modifier::Abstract);
        let is_interface = info.kind == TypeKind::Interface;

        if is_interface {
            if method.body.is_some() || is_static {
                self.error(
                    ErrorCode::UNSUPPORTED_FEATURE,
                    format!("Interface member '{name}' cannot have a body or be static"),
                    method.name.span,
                );
                return None;
            }
        } else if method.body.is_none() && !marked_abstract {
            self.error(
                ErrorCode::MISSING_RETURN,
                format!("'{}.{name}' must declare a body because it is not marked abstract", info.name),
                method.name.span,
            );
            return None;
        } else if marked_abstract {
            if method.body.is_some() || is_static {
                self.error(
                    ErrorCode::UNSUPPORTED_FEATURE,
                    format!("'{}.{name}' cannot declare a body or be static because it is marked abstract", info.name),
                    method.name.span,
                );
                return None;
            }
            if !info.is_abstract {
                self.error(
                    ErrorCode::CANNOT_INSTANTIATE,
                    format!("'{}.{name}' is abstract but it is contained in non-abstract type '{}'", info.name, info.name),
                    method.name.span,
                );
                return None;
            }
        }
        if !is_static && info.is_static {
            self.error(
                ErrorCode::STATIC_CONTEXT,
                format!("'{}': cannot declare instance members in a static class", info.name),
                method.name.span,
            );
            return None;
        }

        let return_type = self.resolve_type_ref(ctx, &method.return_type)?;
        let params = self.resolve_params(ctx, &method.params)?;
        let clash = info.instance_field(name).is_some()
            || info.static_field(name).is_some()
            || info
                .methods_named(name)
                .iter()
                .any(|m| same_params(&m.params, &params));
        if clash {
            self.error(
                ErrorCode::DUPLICATE_DECLARATION,
                format!("Type '{}' already defines a member called '{name}' with the same parameter types", info.name),
                method.name.span,
            );
            return None;
        }

        let method_info = Arc::new(MethodInfo::new(
            name.clone(),
            info.full_name.clone(),
            params,
            return_type,
            is_static,
        ));
        if is_interface || marked_abstract {
            method_info.set_body(MethodBody::Abstract);
        }
        info.members_mut().methods.push(Arc::clone(&method_info));
        Some(method_info)
    }

    fn populate_constructor(
        &mut self,
        info: &Arc<TypeInfo>,
        ctx: &TypeContext,
        ctor: &ConstructorDecl,
    ) -> Option<Arc<MethodInfo>> {
        if info.kind == TypeKind::Interface {
            self.error(
                ErrorCode::UNSUPPORTED_FEATURE,
                "Interfaces cannot contain constructors",
                ctor.name.span,
            );
            return None;
        }
        if has_modifier(&ctor.modifiers, Modifier::Static) {
            self.error(
                ErrorCode::UNSUPPORTED_FEATURE,
                "Static constructors are not supported",
                ctor.name.span,
            );
            return None;
        }
        if info.is_static {
            self.error(
                ErrorCode::STATIC_CONTEXT,
                format!("Static class '{}' cannot have instance constructors", info.name),
                ctor.name.span,
            );
            return None;
        }

        let params = self.resolve_params(ctx, &ctor.params)?;
        let duplicate = info
            .members()
            .constructors
            .iter()
            .any(|c| same_params(&c.params, &params));
        if duplicate {
            self.error(
                ErrorCode::DUPLICATE_DECLARATION,
                format!("Type '{}' already defines a constructor with the same parameter types", info.name),
                ctor.name.span,
            );
            return None;
        }
        let ctor_info = Arc::new(MethodInfo::new(
            ".ctor",
            info.full_name.clone(),
            params,
            Type::Void,
            false,
        ));
        info.members_mut().constructors.push(Arc::clone(&ctor_info));
        Some(ctor_info)
    }

    fn resolve_params(&mut self, ctx: &TypeContext, params: &[Param]) -> Option<Vec<(String, Type)>> {
        let mut resolved: Vec<(String, Type)> = Vec::with_capacity(params.len());
        let mut ok = true;
        for param in params {
            if resolved.iter().any(|(n, _)| n == &param.name.name) {
                self.error(
                    ErrorCode::DUPLICATE_DECLARATION,
                    format!("The parameter name '{}' is a duplicate", param.name.name),
                    param.name.span,
                );
                ok = false;
                continue;
            }
            match self.resolve_value_type(ctx, &param.ty) {
                Some(ty) => resolved.push((param.name.name.clone(), ty)),
                None => ok = false,
            }
        }
        ok.then_some(resolved)
    }

    // ── Enums ─────────────────────────────────────────────────────────────────

    fn populate_enum(&mut self, info: &Arc<TypeInfo>, members: &[MemberDecl]) {
        let mut values: Vec<(String, i64)> = Vec::new();
        let mut next = 0i64;
        for member in members {
            let MemberDecl::EnumMember(EnumMemberDecl { name, value, .. }) = member else {
                continue;
            };
            if values.iter().any(|(n, _)| n == &name.name) {
                self.error(
                    ErrorCode::DUPLICATE_DECLARATION,
                    format!("The type '{}' already contains a definition for '{}'", info.name, name.name),
                    name.span,
                );
                continue;
            }
            let assigned = match value {
                Some(expr) => match enum_constant(expr, &values) {
                    Some(v) => v,
                    None => {
                        self.error(
                            ErrorCode::TYPE_MISMATCH,
                            format!("The value assigned to '{}' must be a constant integer", name.name),
                            expr.span,
                        );
                        continue;
                    }
                },
                None => next,
            };
            values.push((name.name.clone(), assigned));
            next = assigned.wrapping_add(1);
        }
        info.members_mut().enum_members = values;
    }

    // ── Conformance ───────────────────────────────────────────────────────────

    fn check_conformance(&mut self, dt: &DeclaredType<'_>) {
        let interfaces = dt.info.members().interfaces.clone();
        for iface in interfaces {
            let required = iface.members().methods.clone();
            for wanted in required {
                let implemented = dt.info.methods_named(&wanted.name).iter().any(|m| {
                    !m.is_static
                        && m.return_type == wanted.return_type
                        && same_params(&m.params, &wanted.params)
                });
                if !implemented {
                    let params: Vec<String> =
                        wanted.params.iter().map(|(_, t)| t.to_string()).collect();
                    self.error(
                        ErrorCode::INTERFACE_NOT_IMPLEMENTED,
                        format!(
                            "'{}' does not implement interface member '{}.{}({})'",
                            dt.info.full_name,
                            iface.full_name,
                            wanted.name,
                            params.join(", ")
                        ),
                        dt.decl.name.span,
                    );
                }
            }
        }
    }
}

fn same_params(a: &[(String, Type)], b: &[(String, Type)]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|((_, x), (_, y))| x == y)
}

/// Evaluate an enum member initializer: integer literals, earlier members
/// and sign or parentheses around them.
fn enum_constant(expr: &Expr, previous: &[(String, i64)]) -> Option<i64> {
    match &expr.kind {
        ExprKind::IntLit(n) => Some(*n),
        ExprKind::Paren(inner) => enum_constant(inner, previous),
        ExprKind::Unary {
            op: UnaryOp::Neg,
            operand,
        } => enum_constant(operand, previous).map(i64::wrapping_neg),
        ExprKind::Unary {
            op: UnaryOp::Plus,
            operand,
        } => enum_constant(operand, previous),
        ExprKind::Name(ident) => previous
            .iter()
            .find(|(n, _)| n == &ident.name)
            .map(|(_, v)| *v),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use cinder_types::ast::Ident;
    use cinder_types::Span;

    use super::*;

    fn lit(n: i64) -> Expr {
        Expr::new(ExprKind::IntLit(n), Span::point(1, 1))
    }

    #[test]
    fn enum_constants_fold_sign_and_references() {
        let previous = vec![("A".to_string(), 4)];
        let neg = Expr::new(
            ExprKind::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(lit(2)),
            },
            Span::point(1, 1),
        );
        assert_eq!(enum_constant(&neg, &previous), Some(-2));
        let name = Expr::new(ExprKind::Name(Ident::new("A", Span::point(1, 1))), Span::point(1, 1));
        assert_eq!(enum_constant(&name, &previous), Some(4));
        let missing = Expr::new(ExprKind::Name(Ident::new("B", Span::point(1, 1))), Span::point(1, 1));
        assert_eq!(enum_constant(&missing, &previous), None);
        let text = Expr::new(ExprKind::StringLit("x".into()), Span::point(1, 1));
        assert_eq!(enum_constant(&text, &previous), None);
    }

    #[test]
    fn parameter_lists_compare_by_type_only() {
        let a = vec![("x".to_string(), Type::Int)];
        let b = vec![("y".to_string(), Type::Int)];
        let c = vec![("x".to_string(), Type::Double)];
        assert!(same_params(&a, &b));
        assert!(!same_params(&a, &c));
        assert!(!same_params(&a, &[]));
    }
}
