//! Runtime values.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::meta::TypeInfo;

/// A shared, mutable object instance.
pub type ObjectRef = Arc<Object>;

/// An instance of a user-declared class or struct.
///
/// Field slots are indexed by declaration order of the type's instance
/// fields.
pub struct Object {
    pub ty: Arc<TypeInfo>,
    fields: Mutex<Vec<Value>>,
}

impl Object {
    pub fn new(ty: Arc<TypeInfo>, fields: Vec<Value>) -> ObjectRef {
        Arc::new(Self {
            ty,
            fields: Mutex::new(fields),
        })
    }

    /// Read field `index`; out-of-range reads yield `null`.
    pub fn get(&self, index: usize) -> Value {
        self.fields.lock().get(index).cloned().unwrap_or(Value::Null)
    }

    pub fn set(&self, index: usize, value: Value) {
        if let Some(slot) = self.fields.lock().get_mut(index) {
            *slot = value;
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({})", self.ty.full_name)
    }
}

/// A Cinder runtime value.
///
/// `int` and `long` share the 64-bit representation; `float` and `double`
/// share `f64`.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(Arc<str>),
    Object(ObjectRef),
    Enum { ty: Arc<TypeInfo>, value: i64 },
}

impl Value {
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::Str(Arc::from(s.as_ref()))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Truthiness of a bound `bool` expression. Non-bools never reach here
    /// once binding succeeded; they read as `false`.
    pub fn as_bool(&self) -> bool {
        matches!(self, Value::Bool(true))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Enum { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// The runtime type name, as shown in variable listings.
    pub fn type_name(&self) -> String {
        match self {
            Value::Null => "null".into(),
            Value::Bool(_) => "bool".into(),
            Value::Int(_) => "long".into(),
            Value::Double(_) => "double".into(),
            Value::Str(_) => "string".into(),
            Value::Object(obj) => obj.ty.full_name.clone(),
            Value::Enum { ty, .. } => ty.full_name.clone(),
        }
    }

    /// The interactive display form: strings quoted and escaped, `null`
    /// spelled out, booleans lower-case.
    pub fn display(&self) -> String {
        match self {
            Value::Null => "null".into(),
            Value::Bool(b) => b.to_string(),
            Value::Str(s) => quote(s),
            other => other.to_string(),
        }
    }
}

/// Conversion used by string concatenation and `ToString()`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Double(d) => fmt_double(*d, f),
            Value::Str(s) => f.write_str(s),
            Value::Object(obj) => f.write_str(&obj.ty.full_name),
            Value::Enum { ty, value } => match ty.enum_name(*value) {
                Some(name) => f.write_str(&name),
                None => write!(f, "{value}"),
            },
        }
    }
}

fn fmt_double(d: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if d.is_nan() {
        f.write_str("NaN")
    } else if d.is_infinite() {
        f.write_str(if d > 0.0 { "Infinity" } else { "-Infinity" })
    } else {
        write!(f, "{d}")
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Int(a), Value::Double(b)) | (Value::Double(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Enum { ty: ta, value: a }, Value::Enum { ty: tb, value: b }) => {
                Arc::ptr_eq(ta, tb) && a == b
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_follows_tostring_conventions() {
        assert_eq!(Value::Int(10).to_string(), "10");
        assert_eq!(Value::Double(10.0).to_string(), "10");
        assert_eq!(Value::Double(2.5).to_string(), "2.5");
        assert_eq!(Value::Double(f64::INFINITY).to_string(), "Infinity");
        assert_eq!(Value::Bool(true).to_string(), "True");
        assert_eq!(Value::Null.to_string(), "");
    }

    #[test]
    fn interactive_display_quotes_strings() {
        assert_eq!(Value::string("a\"b\n").display(), "\"a\\\"b\\n\"");
        assert_eq!(Value::Null.display(), "null");
        assert_eq!(Value::Bool(false).display(), "false");
        assert_eq!(Value::Int(-3).display(), "-3");
    }

    #[test]
    fn equality_is_numeric_across_int_and_double() {
        assert_eq!(Value::Int(2), Value::Double(2.0));
        assert_ne!(Value::Double(f64::NAN), Value::Double(f64::NAN));
        assert_eq!(Value::string("x"), Value::string("x"));
        assert_ne!(Value::Null, Value::Int(0));
    }
}
