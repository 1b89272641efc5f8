//! Built-in `System` namespace and interactive helpers.
//!
//! Installs `System.Console` and `System.Math` as static classes with
//! native method bodies, and provides the unqualified `print` helper that
//! top-level statements can call.

use std::sync::Arc;

use cinder_eval::{
    FieldSlot, Fault, MethodInfo, NativeContext, NativeFn, StaticField, Type, TypeInfo, Value,
};
use cinder_types::ast::TypeKind;

use crate::image::Namespace;

const SYSTEM: &str = "System";

/// Add the `System` namespace to the global namespace.
pub(crate) fn install(root: &mut Namespace) {
    let system = root.namespace_entry(SYSTEM);
    system.insert_type(console());
    system.insert_type(math());
}

/// Methods visible unqualified in top-level statements.
pub(crate) fn host_helpers() -> Vec<Arc<MethodInfo>> {
    vec![MethodInfo::native(
        "print",
        "<host>",
        sig(vec![("value", Type::Object)]),
        Type::Void,
        print,
    )]
}

// ──────────────────────────────────────────────────────────────────────────────
// Registration helpers
// ──────────────────────────────────────────────────────────────────────────────

fn sig(params: Vec<(&str, Type)>) -> Vec<(String, Type)> {
    params
        .into_iter()
        .map(|(n, t)| (n.to_string(), t))
        .collect()
}

fn static_class(name: &str) -> Arc<TypeInfo> {
    TypeInfo::new(name, format!("{SYSTEM}.{name}"), TypeKind::Class, true, false)
}

fn add(ty: &TypeInfo, name: &str, params: Vec<(&str, Type)>, ret: Type, f: NativeFn) {
    let method = MethodInfo::native(name, &ty.full_name, sig(params), ret, f);
    ty.members_mut().methods.push(method);
}

fn add_const(ty: &TypeInfo, name: &str, ty_value: Type, value: Value) {
    let handle = FieldSlot::new(name, ty_value);
    handle.set(value);
    ty.members_mut().static_fields.push(StaticField {
        handle,
        readonly: true,
    });
}

// ══════════════════════════════════════════════════════════════════════════════
// System.Console
// ══════════════════════════════════════════════════════════════════════════════

fn console() -> Arc<TypeInfo> {
    use Type::*;
    let ty = static_class("Console");
    add(&ty, "WriteLine", vec![], Void, write_line_empty);
    add(&ty, "WriteLine", vec![("value", Object)], Void, write_line);
    add(&ty, "Write", vec![("value", Object)], Void, write);
    ty
}

fn write_line_empty(ctx: &NativeContext<'_>, _args: &[Value]) -> Result<Value, Fault> {
    ctx.print.println("");
    Ok(Value::Null)
}

fn write_line(ctx: &NativeContext<'_>, args: &[Value]) -> Result<Value, Fault> {
    ctx.print.println(&arg_text(args));
    Ok(Value::Null)
}

fn write(ctx: &NativeContext<'_>, args: &[Value]) -> Result<Value, Fault> {
    ctx.print.print(&arg_text(args));
    Ok(Value::Null)
}

fn print(ctx: &NativeContext<'_>, args: &[Value]) -> Result<Value, Fault> {
    ctx.print.println(&arg_text(args));
    Ok(Value::Null)
}

fn arg_text(args: &[Value]) -> String {
    args.first().map(ToString::to_string).unwrap_or_default()
}

// ══════════════════════════════════════════════════════════════════════════════
// System.Math
// ══════════════════════════════════════════════════════════════════════════════

fn math() -> Arc<TypeInfo> {
    use Type::*;
    let ty = static_class("Math");
    add_const(&ty, "PI", Double, Value::Double(std::f64::consts::PI));
    add_const(&ty, "E", Double, Value::Double(std::f64::consts::E));
    add(&ty, "Abs", vec![("value", Int)], Int, abs_int);
    add(&ty, "Abs", vec![("value", Long)], Long, abs_int);
    add(&ty, "Abs", vec![("value", Double)], Double, abs_double);
    add(&ty, "Max", vec![("a", Int), ("b", Int)], Int, max_int);
    add(&ty, "Max", vec![("a", Long), ("b", Long)], Long, max_int);
    add(&ty, "Max", vec![("a", Double), ("b", Double)], Double, max_double);
    add(&ty, "Min", vec![("a", Int), ("b", Int)], Int, min_int);
    add(&ty, "Min", vec![("a", Long), ("b", Long)], Long, min_int);
    add(&ty, "Min", vec![("a", Double), ("b", Double)], Double, min_double);
    add(&ty, "Sqrt", vec![("d", Double)], Double, sqrt);
    add(&ty, "Pow", vec![("x", Double), ("y", Double)], Double, pow);
    ty
}

fn int_arg(args: &[Value], i: usize) -> i64 {
    args.get(i).and_then(Value::as_int).unwrap_or_default()
}

fn double_arg(args: &[Value], i: usize) -> f64 {
    args.get(i).and_then(Value::as_double).unwrap_or_default()
}

fn abs_int(_: &NativeContext<'_>, args: &[Value]) -> Result<Value, Fault> {
    Ok(Value::Int(int_arg(args, 0).wrapping_abs()))
}

fn abs_double(_: &NativeContext<'_>, args: &[Value]) -> Result<Value, Fault> {
    Ok(Value::Double(double_arg(args, 0).abs()))
}

fn max_int(_: &NativeContext<'_>, args: &[Value]) -> Result<Value, Fault> {
    Ok(Value::Int(int_arg(args, 0).max(int_arg(args, 1))))
}

fn max_double(_: &NativeContext<'_>, args: &[Value]) -> Result<Value, Fault> {
    Ok(Value::Double(double_arg(args, 0).max(double_arg(args, 1))))
}

fn min_int(_: &NativeContext<'_>, args: &[Value]) -> Result<Value, Fault> {
    Ok(Value::Int(int_arg(args, 0).min(int_arg(args, 1))))
}

fn min_double(_: &NativeContext<'_>, args: &[Value]) -> Result<Value, Fault> {
    Ok(Value::Double(double_arg(args, 0).min(double_arg(args, 1))))
}

fn sqrt(_: &NativeContext<'_>, args: &[Value]) -> Result<Value, Fault> {
    Ok(Value::Double(double_arg(args, 0).sqrt()))
}

fn pow(_: &NativeContext<'_>, args: &[Value]) -> Result<Value, Fault> {
    Ok(Value::Double(double_arg(args, 0).powf(double_arg(args, 1))))
}
