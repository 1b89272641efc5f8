//! Type, method and field metadata shared between the binder and the
//! interpreter.
//!
//! Metadata lives behind `Arc` so compiled code can reference it without
//! owning it. Members are filled in after the owning [`TypeInfo`] has been
//! created, which is why they sit behind a lock.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use cinder_types::ast::TypeKind;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::code::{BoundExpr, Code};
use crate::error::Fault;
use crate::print::PrintHandlerImpl;
use crate::value::Value;

// ══════════════════════════════════════════════════════════════════════════════
// Static types
// ══════════════════════════════════════════════════════════════════════════════

/// A static type as seen by the binder.
#[derive(Clone)]
pub enum Type {
    Void,
    Bool,
    Int,
    Long,
    Double,
    String,
    Object,
    /// The type of the `null` literal.
    Null,
    Named(Arc<TypeInfo>),
}

impl Type {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Long | Type::Double)
    }

    pub fn is_integral(&self) -> bool {
        matches!(self, Type::Int | Type::Long)
    }

    /// Whether `null` is a valid value of this type.
    pub fn is_nullable(&self) -> bool {
        match self {
            Type::String | Type::Object | Type::Null => true,
            Type::Named(info) => info.kind != TypeKind::Enum,
            _ => false,
        }
    }

    /// Implicit conversion check.
    pub fn is_assignable_to(&self, target: &Type) -> bool {
        if self == target {
            return true;
        }
        match (self, target) {
            (Type::Void, _) | (_, Type::Void) => false,
            (Type::Null, t) => t.is_nullable(),
            (Type::Int, Type::Long | Type::Double) => true,
            (Type::Long, Type::Double) => true,
            (_, Type::Object) => true,
            (Type::Named(from), Type::Named(to)) => from.implements(to),
            _ => false,
        }
    }

    /// The value a fresh field of this type holds.
    pub fn default_value(&self) -> Value {
        match self {
            Type::Bool => Value::Bool(false),
            Type::Int | Type::Long => Value::Int(0),
            Type::Double => Value::Double(0.0),
            Type::Named(info) if info.kind == TypeKind::Enum => Value::Enum {
                ty: Arc::clone(info),
                value: 0,
            },
            _ => Value::Null,
        }
    }

    pub fn type_info(&self) -> Option<&Arc<TypeInfo>> {
        match self {
            Type::Named(info) => Some(info),
            _ => None,
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Type::Named(a), Type::Named(b)) => Arc::ptr_eq(a, b),
            (a, b) => std::mem::discriminant(a) == std::mem::discriminant(b),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => f.write_str("void"),
            Type::Bool => f.write_str("bool"),
            Type::Int => f.write_str("int"),
            Type::Long => f.write_str("long"),
            Type::Double => f.write_str("double"),
            Type::String => f.write_str("string"),
            Type::Object => f.write_str("object"),
            Type::Null => f.write_str("null"),
            Type::Named(info) => f.write_str(&info.full_name),
        }
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Types
// ══════════════════════════════════════════════════════════════════════════════

/// A user-declared (or built-in) container type.
pub struct TypeInfo {
    pub name: String,
    pub full_name: String,
    pub kind: TypeKind,
    pub is_static: bool,
    pub is_abstract: bool,
    members: RwLock<TypeMembers>,
    /// Bound instance-field initializers, `(field index, expr)`, set once
    /// code generation for the declaring unit is done.
    field_inits: OnceLock<Vec<(usize, BoundExpr)>>,
}

#[derive(Default)]
pub struct TypeMembers {
    pub interfaces: Vec<Arc<TypeInfo>>,
    pub static_fields: Vec<StaticField>,
    pub instance_fields: Vec<InstanceField>,
    pub methods: Vec<Arc<MethodInfo>>,
    pub constructors: Vec<Arc<MethodInfo>>,
    pub enum_members: Vec<(String, i64)>,
    pub nested: Vec<Arc<TypeInfo>>,
}

pub struct StaticField {
    pub handle: FieldHandle,
    /// `readonly` or `const`: assignable only by the declaring initializer.
    pub readonly: bool,
}

pub struct InstanceField {
    pub name: String,
    pub ty: Type,
    pub readonly: bool,
}

impl TypeInfo {
    pub fn new(
        name: impl Into<String>,
        full_name: impl Into<String>,
        kind: TypeKind,
        is_static: bool,
        is_abstract: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            full_name: full_name.into(),
            kind,
            is_static,
            is_abstract: is_abstract || kind == TypeKind::Interface,
            members: RwLock::new(TypeMembers::default()),
            field_inits: OnceLock::new(),
        })
    }

    pub fn members(&self) -> RwLockReadGuard<'_, TypeMembers> {
        self.members.read()
    }

    pub fn members_mut(&self) -> RwLockWriteGuard<'_, TypeMembers> {
        self.members.write()
    }

    /// Drop every member, breaking reference cycles through method bodies.
    pub fn clear_members(&self) {
        *self.members.write() = TypeMembers::default();
    }

    pub fn set_field_initializers(&self, inits: Vec<(usize, BoundExpr)>) {
        let _ = self.field_inits.set(inits);
    }

    pub fn field_initializers(&self) -> &[(usize, BoundExpr)] {
        self.field_inits.get().map_or(&[], Vec::as_slice)
    }

    /// `true` if `self` is `other` or lists it among its interfaces.
    pub fn implements(&self, other: &Arc<TypeInfo>) -> bool {
        if std::ptr::eq(self, Arc::as_ptr(other)) {
            return true;
        }
        self.members()
            .interfaces
            .iter()
            .any(|iface| Arc::ptr_eq(iface, other))
    }

    pub fn methods_named(&self, name: &str) -> Vec<Arc<MethodInfo>> {
        self.members()
            .methods
            .iter()
            .filter(|m| m.name == name)
            .cloned()
            .collect()
    }

    /// The concrete instance method implementing the interface member
    /// `wanted`: same name and the same parameter types.
    pub fn find_implementation(&self, wanted: &MethodInfo) -> Option<Arc<MethodInfo>> {
        self.members()
            .methods
            .iter()
            .find(|m| !m.is_static && !m.is_abstract() && m.same_signature(wanted))
            .cloned()
    }

    pub fn instance_field(&self, name: &str) -> Option<(usize, Type, bool)> {
        let members = self.members();
        members
            .instance_fields
            .iter()
            .position(|f| f.name == name)
            .map(|i| {
                let field = &members.instance_fields[i];
                (i, field.ty.clone(), field.readonly)
            })
    }

    pub fn static_field(&self, name: &str) -> Option<(FieldHandle, bool)> {
        self.members()
            .static_fields
            .iter()
            .find(|f| f.handle.name() == name)
            .map(|f| (f.handle.clone(), f.readonly))
    }

    pub fn nested_type(&self, name: &str) -> Option<Arc<TypeInfo>> {
        self.members()
            .nested
            .iter()
            .find(|t| t.name == name)
            .cloned()
    }

    pub fn enum_value(&self, name: &str) -> Option<i64> {
        self.members()
            .enum_members
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn enum_name(&self, value: i64) -> Option<String> {
        self.members()
            .enum_members
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(n, _)| n.clone())
    }

    /// Fresh instance storage holding each field's default value.
    pub fn default_fields(&self) -> Vec<Value> {
        self.members()
            .instance_fields
            .iter()
            .map(|f| f.ty.default_value())
            .collect()
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeInfo({} {})", self.kind, self.full_name)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Methods
// ══════════════════════════════════════════════════════════════════════════════

/// Context handed to native (built-in) methods.
pub struct NativeContext<'a> {
    pub print: &'a PrintHandlerImpl,
}

/// A built-in method implementation.
pub type NativeFn = fn(&NativeContext<'_>, &[Value]) -> Result<Value, Fault>;

pub enum MethodBody {
    Code(Arc<Code>),
    Native(NativeFn),
    Abstract,
}

pub struct MethodInfo {
    pub name: String,
    /// Full name of the declaring type, for display only.
    pub declaring_type: String,
    pub params: Vec<(String, Type)>,
    pub return_type: Type,
    pub is_static: bool,
    body: OnceLock<MethodBody>,
}

impl MethodInfo {
    pub fn new(
        name: impl Into<String>,
        declaring_type: impl Into<String>,
        params: Vec<(String, Type)>,
        return_type: Type,
        is_static: bool,
    ) -> Self {
        Self {
            name: name.into(),
            declaring_type: declaring_type.into(),
            params,
            return_type,
            is_static,
            body: OnceLock::new(),
        }
    }

    /// A built-in static method with its body already attached.
    pub fn native(
        name: &str,
        declaring_type: &str,
        params: Vec<(String, Type)>,
        return_type: Type,
        f: NativeFn,
    ) -> Arc<Self> {
        let method = Self::new(name, declaring_type, params, return_type, true);
        let _ = method.body.set(MethodBody::Native(f));
        Arc::new(method)
    }

    /// Attach the body. Returns `false` if one was already attached.
    pub fn set_body(&self, body: MethodBody) -> bool {
        self.body.set(body).is_ok()
    }

    pub fn body(&self) -> Option<&MethodBody> {
        self.body.get()
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self.body.get(), Some(MethodBody::Abstract))
    }

    pub fn same_signature(&self, other: &MethodInfo) -> bool {
        self.name == other.name
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|((_, a), (_, b))| a == b)
    }

    pub fn signature(&self) -> String {
        let params: Vec<String> = self.params.iter().map(|(_, t)| t.to_string()).collect();
        format!(
            "{} {}.{}({})",
            self.return_type,
            self.declaring_type,
            self.name,
            params.join(", ")
        )
    }
}

impl fmt::Debug for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodInfo({})", self.signature())
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Field storage
// ══════════════════════════════════════════════════════════════════════════════

/// Shared storage for a static field or a persistent top-level variable.
pub type FieldHandle = Arc<FieldSlot>;

pub struct FieldSlot {
    name: String,
    ty: Type,
    value: RwLock<Value>,
    released: AtomicBool,
}

impl FieldSlot {
    pub fn new(name: impl Into<String>, ty: Type) -> FieldHandle {
        let value = ty.default_value();
        Arc::new(Self {
            name: name.into(),
            ty,
            value: RwLock::new(value),
            released: AtomicBool::new(false),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn get(&self) -> Value {
        self.value.read().clone()
    }

    pub fn set(&self, value: Value) {
        *self.value.write() = value;
    }

    /// Read with a bounded wait; `None` if a writer holds the slot longer.
    pub fn try_get(&self, timeout: Duration) -> Option<Value> {
        self.value.try_read_for(timeout).map(|v| v.clone())
    }

    /// Drop the held value and mark the slot dead. Code compiled against
    /// this handle keeps a valid (but detached) slot.
    pub fn release(&self) {
        self.released.store(true, Ordering::Release);
        *self.value.write() = Value::Null;
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}

impl fmt::Debug for FieldSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldSlot({}: {})", self.name, self.ty)
    }
}
