//! Bound code: the resolved, typed tree the interpreter walks.
//!
//! Every name has been resolved to a slot, a field handle or a method by
//! the time code reaches this form; the interpreter never looks anything
//! up by name except for interface dispatch.

use std::sync::Arc;

use crate::meta::{FieldHandle, MethodInfo, TypeInfo};
use crate::value::Value;

/// Runtime representation of a numeric operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumKind {
    /// `int` and `long`, wrapping 64-bit arithmetic.
    Int,
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Less,
    LessEq,
    Greater,
    GreaterEq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Arith(ArithOp, NumKind),
    Compare(CmpOp, NumKind),
    /// String concatenation; either side may be any value.
    Concat,
    Equals,
    NotEquals,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intrinsic {
    /// `x.ToString()`
    ToString,
    /// `s.Length`
    StringLength,
}

/// An assignable location.
#[derive(Debug, Clone)]
pub enum Place {
    Local(usize),
    Static(FieldHandle),
    Instance { target: Box<BoundExpr>, index: usize },
}

#[derive(Debug, Clone)]
pub enum BoundExpr {
    Const(Value),
    Load(Place),
    This,
    Assign {
        place: Place,
        value: Box<BoundExpr>,
    },
    /// `place op= value`; `value` is already converted to the place's type.
    Compound {
        place: Place,
        op: BinaryOp,
        value: Box<BoundExpr>,
    },
    IncDec {
        place: Place,
        increment: bool,
        prefix: bool,
        kind: NumKind,
    },
    Neg(NumKind, Box<BoundExpr>),
    Not(Box<BoundExpr>),
    Binary {
        op: BinaryOp,
        left: Box<BoundExpr>,
        right: Box<BoundExpr>,
    },
    And(Box<BoundExpr>, Box<BoundExpr>),
    Or(Box<BoundExpr>, Box<BoundExpr>),
    Coalesce(Box<BoundExpr>, Box<BoundExpr>),
    Conditional {
        cond: Box<BoundExpr>,
        then_expr: Box<BoundExpr>,
        else_expr: Box<BoundExpr>,
    },
    /// Direct call. `receiver` is `None` for static methods.
    Call {
        method: Arc<MethodInfo>,
        receiver: Option<Box<BoundExpr>>,
        args: Vec<BoundExpr>,
    },
    /// Call through an interface: `method` is the interface member, resolved
    /// against the receiver's runtime type by signature.
    CallVirtual {
        receiver: Box<BoundExpr>,
        method: Arc<MethodInfo>,
        args: Vec<BoundExpr>,
    },
    New {
        ty: Arc<TypeInfo>,
        ctor: Option<Arc<MethodInfo>>,
        args: Vec<BoundExpr>,
    },
    Intrinsic(Intrinsic, Box<BoundExpr>),
    IntToDouble(Box<BoundExpr>),
}

#[derive(Debug, Clone)]
pub enum BoundStmt {
    Expr(BoundExpr),
    /// Evaluate and record as the unit's produced value.
    Capture(BoundExpr),
    Block(Vec<BoundStmt>),
    If {
        cond: BoundExpr,
        then_branch: Box<BoundStmt>,
        else_branch: Option<Box<BoundStmt>>,
    },
    While {
        cond: BoundExpr,
        body: Box<BoundStmt>,
    },
    DoWhile {
        body: Box<BoundStmt>,
        cond: BoundExpr,
    },
    For {
        init: Vec<BoundStmt>,
        cond: Option<BoundExpr>,
        update: Vec<BoundExpr>,
        body: Box<BoundStmt>,
    },
    Break,
    Continue,
    Return(Option<BoundExpr>),
    Throw(BoundExpr),
}

/// A bound method body or host unit.
///
/// Parameters occupy the first local slots.
#[derive(Debug, Clone, Default)]
pub struct Code {
    pub body: Vec<BoundStmt>,
    pub locals: usize,
}

impl Code {
    pub fn new(body: Vec<BoundStmt>, locals: usize) -> Self {
        Self { body, locals }
    }
}
