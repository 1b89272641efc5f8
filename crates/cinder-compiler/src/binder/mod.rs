//! Binder: resolves parsed units against the live program image and
//! generates bound code.
//!
//! Binding runs in three stages, each able to fail:
//! 1. tree resolution ([`declare`]): namespaces and types are declared
//!    into the image, every addition recorded in the undo log;
//! 2. type population ([`populate`]): using targets, member signatures,
//!    enum values and interface conformance;
//! 3. code generation ([`bind_stmt`], [`bind_expr`]): method bodies, field
//!    initializers and top-level statements.
//!
//! The binder never rolls anything back itself. A `None` result tells the
//! caller to replay the undo log.

mod bind_expr;
mod bind_stmt;
mod declare;
mod populate;

use std::collections::HashMap;
use std::sync::Arc;

use cinder_eval::{Code, FieldHandle, MethodInfo, Type, TypeInfo};
use cinder_types::ast::{CompilationUnit, ConstructorDecl, MethodDecl, QualifiedName, StatementUnit, TypeDecl, TypeRef, TypeRefKind};
use cinder_types::{CinderError, CompileErrors, ErrorCode, SourceFile, Span};
use tracing::debug;

use crate::image::{CommitSet, ContainerPath, Entity, ProgramImage, UsingEntry, UsingTarget};
use crate::registry::FieldRegistry;
use crate::scope::{LocalEnv, ScopeKind};
use crate::stdlib;
use crate::undo::UndoLog;

/// A top-level variable created by a host unit, registered on commit.
#[derive(Debug, Clone)]
pub struct PendingField {
    pub name: String,
    pub handle: FieldHandle,
    pub readonly: bool,
}

/// Everything a successful bind produces.
#[derive(Debug)]
pub struct BindOutput {
    pub code: Code,
    pub commit: CommitSet,
    pub fields: Vec<PendingField>,
}

// ══════════════════════════════════════════════════════════════════════════════
// Contexts
// ══════════════════════════════════════════════════════════════════════════════

/// Where a declaration or body sits: its namespace and enclosing types.
#[derive(Debug, Clone, Default)]
pub(crate) struct TypeContext {
    pub namespace: ContainerPath,
    /// Enclosing types, outermost first.
    pub enclosing: Vec<Arc<TypeInfo>>,
}

impl TypeContext {
    /// The context inside `info`'s body.
    pub fn nested(&self, info: &Arc<TypeInfo>) -> TypeContext {
        let mut enclosing = self.enclosing.clone();
        enclosing.push(Arc::clone(info));
        TypeContext {
            namespace: self.namespace.clone(),
            enclosing,
        }
    }

    /// Image path of the innermost container.
    pub fn container_path(&self) -> ContainerPath {
        let mut path = self.namespace.clone();
        path.extend(self.enclosing.iter().map(|t| t.name.clone()));
        path
    }

    fn cache_key(&self) -> String {
        self.container_path().join(".")
    }
}

/// State for the body currently being bound.
pub(crate) struct BodyContext {
    pub ctx: TypeContext,
    /// The type of `this`; `None` in static code and host units.
    pub this_type: Option<Arc<TypeInfo>>,
    /// Declared return type; `None` for a host unit.
    pub return_type: Option<Type>,
    pub in_constructor: bool,
    pub locals: LocalEnv,
}

impl BodyContext {
    pub fn host() -> Self {
        Self {
            ctx: TypeContext::default(),
            this_type: None,
            return_type: None,
            in_constructor: false,
            locals: LocalEnv::new(ScopeKind::Host),
        }
    }

    pub fn method(ctx: TypeContext, this_type: Option<Arc<TypeInfo>>, return_type: Type) -> Self {
        Self {
            ctx,
            this_type,
            return_type: Some(return_type),
            in_constructor: false,
            locals: LocalEnv::new(ScopeKind::Method),
        }
    }

    pub fn is_host(&self) -> bool {
        self.return_type.is_none()
    }

    /// `true` if `info` is the type `this` refers to.
    pub fn is_this_type(&self, info: &Arc<TypeInfo>) -> bool {
        self.this_type.as_ref().is_some_and(|t| Arc::ptr_eq(t, info))
    }
}

/// A type declared by the current unit, with the metadata created for its
/// members during population.
pub(crate) struct DeclaredType<'u> {
    pub decl: &'u TypeDecl,
    pub info: Arc<TypeInfo>,
    /// Context the declaration appears in.
    pub ctx: TypeContext,
    pub methods: Vec<(&'u MethodDecl, Arc<MethodInfo>)>,
    pub constructors: Vec<(&'u ConstructorDecl, Arc<MethodInfo>)>,
}

// ══════════════════════════════════════════════════════════════════════════════
// Binder
// ══════════════════════════════════════════════════════════════════════════════

pub struct Binder<'a> {
    image: &'a mut ProgramImage,
    registry: &'a FieldRegistry,
    undo: &'a mut UndoLog,
    errors: &'a mut CompileErrors,
    source: &'a SourceFile,
    host_helpers: Vec<Arc<MethodInfo>>,
    /// Per-attempt cache of resolved simple names, keyed by context.
    type_cache: HashMap<(String, String), Entity>,
    /// Usings declared by this unit; visible to its own code.
    usings: Vec<UsingEntry>,
    fields: Vec<PendingField>,
    declared: Vec<Arc<TypeInfo>>,
    body: BodyContext,
}

impl<'a> Binder<'a> {
    pub fn new(
        image: &'a mut ProgramImage,
        registry: &'a FieldRegistry,
        undo: &'a mut UndoLog,
        errors: &'a mut CompileErrors,
        source: &'a SourceFile,
    ) -> Self {
        Self {
            image,
            registry,
            undo,
            errors,
            source,
            host_helpers: stdlib::host_helpers(),
            type_cache: HashMap::new(),
            usings: Vec::new(),
            fields: Vec::new(),
            declared: Vec::new(),
            body: BodyContext::host(),
        }
    }

    /// Bind a statement unit as the body of an implicit host method.
    pub fn bind_statements(mut self, unit: &StatementUnit) -> Option<BindOutput> {
        self.body = BodyContext::host();
        let stmts = self.bind_host(&unit.stmts);
        if self.errors.has_errors() {
            return None;
        }
        let locals = self.body.locals.slot_count();
        debug!(statements = stmts.len(), locals, "bound host unit");
        Some(self.finish(Code::new(stmts, locals)))
    }

    /// Bind a declaration unit. The produced code runs static field
    /// initializers in declaration order.
    pub fn bind_declarations(mut self, unit: &CompilationUnit) -> Option<BindOutput> {
        let mut declared = self.declare_unit(unit);
        if self.errors.has_errors() {
            return None;
        }
        debug!(types = declared.len(), "tree resolution done");

        self.bind_usings(&unit.usings);
        self.populate_types(&mut declared);
        if self.errors.has_errors() {
            return None;
        }
        debug!("type population done");

        let init = self.generate_types(&declared);
        if self.errors.has_errors() {
            return None;
        }
        debug!(initializers = init.len(), "code generation done");
        Some(self.finish(Code::new(init, 0)))
    }

    fn finish(self, code: Code) -> BindOutput {
        BindOutput {
            code,
            commit: CommitSet {
                usings: self.usings,
                types: self.declared,
            },
            fields: self.fields,
        }
    }

    // ── Diagnostics ───────────────────────────────────────────────────────────

    pub(crate) fn error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let line = self.source.snippet(span);
        let error = CinderError::new(&self.source.name, code, message, span, line);
        self.errors.push_error(error);
    }

    // ══════════════════════════════════════════════════════════════════════
    // Name lookup
    // ══════════════════════════════════════════════════════════════════════

    /// Resolve a simple name to a type or namespace visible from `ctx`.
    pub(crate) fn lookup_entity(&mut self, ctx: &TypeContext, name: &str) -> Option<Entity> {
        let key = (ctx.cache_key(), name.to_string());
        if let Some(hit) = self.type_cache.get(&key) {
            return Some(hit.clone());
        }
        let found = self.lookup_entity_uncached(ctx, name)?;
        self.type_cache.insert(key, found.clone());
        Some(found)
    }

    fn lookup_entity_uncached(&self, ctx: &TypeContext, name: &str) -> Option<Entity> {
        for outer in ctx.enclosing.iter().rev() {
            if let Some(nested) = outer.nested_type(name) {
                return Some(Entity::Type(nested));
            }
        }
        for depth in (0..=ctx.namespace.len()).rev() {
            let ns = Entity::Namespace(ctx.namespace[..depth].to_vec());
            if let Some(found) = self.image.child(&ns, name) {
                return Some(found);
            }
        }

        let usings: Vec<&UsingEntry> = self.image.usings().iter().chain(&self.usings).collect();
        for using in &usings {
            if using.alias.as_deref() == Some(name) {
                return Some(match &using.target {
                    UsingTarget::Namespace(path) => Entity::Namespace(path.clone()),
                    UsingTarget::Type(info) => Entity::Type(Arc::clone(info)),
                });
            }
        }
        for using in &usings {
            if let (None, UsingTarget::Namespace(path)) = (&using.alias, &using.target) {
                let ns = Entity::Namespace(path.clone());
                if let Some(Entity::Type(info)) = self.image.child(&ns, name) {
                    return Some(Entity::Type(info));
                }
            }
        }
        None
    }

    /// Resolve a dotted name: the first segment through [`lookup_entity`],
    /// the rest as children.
    ///
    /// [`lookup_entity`]: Binder::lookup_entity
    pub(crate) fn lookup_qualified(
        &mut self,
        ctx: &TypeContext,
        name: &QualifiedName,
    ) -> Option<Entity> {
        let (first, rest) = name.parts.split_first()?;
        let mut entity = self.lookup_entity(ctx, &first.name)?;
        for part in rest {
            entity = self.image.child(&entity, &part.name)?;
        }
        Some(entity)
    }

    /// Resolve a type reference. `var` is rejected; callers that accept it
    /// handle it first.
    pub(crate) fn resolve_type_ref(&mut self, ctx: &TypeContext, ty: &TypeRef) -> Option<Type> {
        match &ty.kind {
            TypeRefKind::Bool => Some(Type::Bool),
            TypeRefKind::Int => Some(Type::Int),
            TypeRefKind::Long => Some(Type::Long),
            TypeRefKind::Double => Some(Type::Double),
            TypeRefKind::String => Some(Type::String),
            TypeRefKind::Object => Some(Type::Object),
            TypeRefKind::Void => Some(Type::Void),
            TypeRefKind::Var => {
                self.error(
                    ErrorCode::CANNOT_INFER,
                    "The contextual keyword 'var' may only appear within a local variable declaration",
                    ty.span,
                );
                None
            }
            TypeRefKind::Named(name) => match self.lookup_qualified(ctx, name) {
                Some(Entity::Type(info)) => Some(Type::Named(info)),
                Some(Entity::Namespace(_)) => {
                    self.error(
                        ErrorCode::UNKNOWN_TYPE,
                        format!("'{name}' is a namespace but is used like a type"),
                        ty.span,
                    );
                    None
                }
                None => {
                    self.error(
                        ErrorCode::UNKNOWN_TYPE,
                        format!("The type or namespace name '{name}' could not be found"),
                        ty.span,
                    );
                    None
                }
            },
        }
    }

    /// Resolve a type usable for a value (anything but `void`).
    pub(crate) fn resolve_value_type(&mut self, ctx: &TypeContext, ty: &TypeRef) -> Option<Type> {
        let resolved = self.resolve_type_ref(ctx, ty)?;
        if resolved == Type::Void {
            self.error(
                ErrorCode::TYPE_MISMATCH,
                "'void' cannot be used in this context",
                ty.span,
            );
            return None;
        }
        Some(resolved)
    }
}
