//! Stage 1, tree resolution: declare namespaces and types into the image.

use std::sync::Arc;

use cinder_eval::TypeInfo;
use cinder_types::ast::{has_modifier, CompilationUnit, MemberDecl, Modifier, NamespaceMember, TypeDecl};
use cinder_types::ErrorCode;

use super::{Binder, DeclaredType, TypeContext};
use crate::image::DeclareError;

impl<'a> Binder<'a> {
    /// Declare every namespace and type of `unit`, outermost first.
    pub(super) fn declare_unit<'u>(&mut self, unit: &'u CompilationUnit) -> Vec<DeclaredType<'u>> {
        let mut out = Vec::new();
        self.declare_members(&[], &unit.members, &mut out);
        out
    }

    fn declare_members<'u>(
        &mut self,
        namespace: &[String],
        members: &'u [NamespaceMember],
        out: &mut Vec<DeclaredType<'u>>,
    ) {
        for member in members {
            match member {
                NamespaceMember::Namespace(ns) => {
                    let mut path = namespace.to_vec();
                    path.extend(ns.name.segments());
                    match self.image.declare_namespace(&path, self.undo) {
                        Ok(()) => self.declare_members(&path, &ns.members, out),
                        Err(DeclareError::NotANamespace(name)) => self.error(
                            ErrorCode::DUPLICATE_DECLARATION,
                            format!("'{name}' is a type and cannot contain a namespace"),
                            ns.name.span,
                        ),
                        Err(_) => self.error(
                            ErrorCode::UNKNOWN_NAMESPACE,
                            format!("Cannot declare namespace '{}'", ns.name),
                            ns.name.span,
                        ),
                    }
                }
                NamespaceMember::Type(decl) => {
                    let ctx = TypeContext {
                        namespace: namespace.to_vec(),
                        enclosing: Vec::new(),
                    };
                    self.declare_type(ctx, decl, out);
                }
            }
        }
    }

    fn declare_type<'u>(
        &mut self,
        ctx: TypeContext,
        decl: &'u TypeDecl,
        out: &mut Vec<DeclaredType<'u>>,
    ) {
        let parent = ctx.container_path();
        let full_name = if parent.is_empty() {
            decl.name.name.clone()
        } else {
            format!("{}.{}", parent.join("."), decl.name.name)
        };
        let info = TypeInfo::new(
            decl.name.name.clone(),
            full_name,
            decl.kind,
            has_modifier(&decl.modifiers, Modifier::Static),
            has_modifier(&decl.modifiers, Modifier::Abstract),
        );

        match self.image.declare_type(&parent, Arc::clone(&info), self.undo) {
            Ok(()) => {}
            Err(DeclareError::Duplicate(name)) => {
                let container = if parent.is_empty() {
                    "<global namespace>".to_string()
                } else {
                    parent.join(".")
                };
                self.error(
                    ErrorCode::DUPLICATE_DECLARATION,
                    format!("'{container}' already contains a definition for '{name}'"),
                    decl.name.span,
                );
                return;
            }
            Err(_) => {
                self.error(
                    ErrorCode::UNKNOWN_NAMESPACE,
                    format!("Cannot declare type '{}'", info.full_name),
                    decl.name.span,
                );
                return;
            }
        }

        self.declared.push(Arc::clone(&info));
        let inner = ctx.nested(&info);
        out.push(DeclaredType {
            decl,
            info,
            ctx,
            methods: Vec::new(),
            constructors: Vec::new(),
        });

        for member in &decl.members {
            if let MemberDecl::NestedType(nested) = member {
                self.declare_type(inner.clone(), nested, out);
            }
        }
    }
}
