//! Tree-walking interpreter over bound code.

use std::sync::Arc;

use crate::code::{ArithOp, BinaryOp, BoundExpr, BoundStmt, CmpOp, Code, Intrinsic, NumKind, Place};
use crate::error::{ExecError, ExecResult, Fault};
use crate::executor::CancelToken;
use crate::meta::{FieldHandle, MethodBody, MethodInfo, NativeContext, TypeInfo};
use crate::print::PrintHandlerImpl;
use crate::value::{Object, ObjectRef, Value};

/// Walks bound code for one execution.
///
/// The cancel token is polled before every statement, on every loop
/// iteration and on every call.
pub struct Interpreter<'a> {
    print: &'a PrintHandlerImpl,
    cancel: &'a CancelToken,
    depth: usize,
    max_depth: usize,
}

struct Frame {
    locals: Vec<Value>,
    this: Option<ObjectRef>,
    /// Value recorded by a `Capture` statement.
    result: Option<Value>,
}

impl Frame {
    fn new(locals: usize, this: Option<ObjectRef>) -> Self {
        Self {
            locals: vec![Value::Null; locals],
            this,
            result: None,
        }
    }
}

enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

/// A resolved [`Place`], with any target object already evaluated.
enum Slot {
    Local(usize),
    Static(FieldHandle),
    Instance(ObjectRef, usize),
}

fn internal(msg: impl Into<String>) -> ExecError {
    ExecError::Internal(msg.into())
}

impl<'a> Interpreter<'a> {
    pub fn new(print: &'a PrintHandlerImpl, cancel: &'a CancelToken, max_depth: usize) -> Self {
        Self {
            print,
            cancel,
            depth: 0,
            max_depth,
        }
    }

    /// Run a host unit. Returns the captured value, if any.
    pub fn run(&mut self, code: &Code) -> ExecResult<Option<Value>> {
        let mut frame = Frame::new(code.locals, None);
        self.exec_block(&code.body, &mut frame)?;
        Ok(frame.result)
    }

    fn check_cancel(&self) -> ExecResult<()> {
        if self.cancel.is_cancelled() {
            Err(ExecError::Interrupted)
        } else {
            Ok(())
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════

    fn exec_block(&mut self, stmts: &[BoundStmt], frame: &mut Frame) -> ExecResult<Flow> {
        for stmt in stmts {
            match self.exec_stmt(stmt, frame)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &BoundStmt, frame: &mut Frame) -> ExecResult<Flow> {
        self.check_cancel()?;
        match stmt {
            BoundStmt::Expr(expr) => {
                self.eval(expr, frame)?;
                Ok(Flow::Normal)
            }
            BoundStmt::Capture(expr) => {
                let value = self.eval(expr, frame)?;
                frame.result = Some(value);
                Ok(Flow::Normal)
            }
            BoundStmt::Block(stmts) => self.exec_block(stmts, frame),
            BoundStmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.eval(cond, frame)?.as_bool() {
                    self.exec_stmt(then_branch, frame)
                } else if let Some(else_branch) = else_branch {
                    self.exec_stmt(else_branch, frame)
                } else {
                    Ok(Flow::Normal)
                }
            }
            BoundStmt::While { cond, body } => {
                loop {
                    self.check_cancel()?;
                    if !self.eval(cond, frame)?.as_bool() {
                        break;
                    }
                    match self.exec_stmt(body, frame)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                Ok(Flow::Normal)
            }
            BoundStmt::DoWhile { body, cond } => {
                loop {
                    self.check_cancel()?;
                    match self.exec_stmt(body, frame)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => {}
                    }
                    if !self.eval(cond, frame)?.as_bool() {
                        break;
                    }
                }
                Ok(Flow::Normal)
            }
            BoundStmt::For {
                init,
                cond,
                update,
                body,
            } => {
                for stmt in init {
                    self.exec_stmt(stmt, frame)?;
                }
                loop {
                    self.check_cancel()?;
                    if let Some(cond) = cond {
                        if !self.eval(cond, frame)?.as_bool() {
                            break;
                        }
                    }
                    match self.exec_stmt(body, frame)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => {}
                    }
                    for expr in update {
                        self.eval(expr, frame)?;
                    }
                }
                Ok(Flow::Normal)
            }
            BoundStmt::Break => Ok(Flow::Break),
            BoundStmt::Continue => Ok(Flow::Continue),
            BoundStmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr, frame)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }
            BoundStmt::Throw(expr) => {
                let value = self.eval(expr, frame)?;
                Err(Fault::Thrown(value).into())
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════

    fn eval(&mut self, expr: &BoundExpr, frame: &mut Frame) -> ExecResult<Value> {
        match expr {
            BoundExpr::Const(value) => Ok(value.clone()),
            BoundExpr::Load(place) => {
                let slot = self.resolve(place, frame)?;
                Ok(load(&slot, frame))
            }
            BoundExpr::This => Ok(frame.this.clone().map_or(Value::Null, Value::Object)),
            BoundExpr::Assign { place, value } => {
                let slot = self.resolve(place, frame)?;
                let value = self.eval(value, frame)?;
                store(&slot, frame, value.clone());
                Ok(value)
            }
            BoundExpr::Compound { place, op, value } => {
                let slot = self.resolve(place, frame)?;
                let current = load(&slot, frame);
                let rhs = self.eval(value, frame)?;
                let result = apply_binary(*op, current, rhs)?;
                store(&slot, frame, result.clone());
                Ok(result)
            }
            BoundExpr::IncDec {
                place,
                increment,
                prefix,
                kind,
            } => {
                let slot = self.resolve(place, frame)?;
                let old = load(&slot, frame);
                let new = step(&old, *increment, *kind)?;
                store(&slot, frame, new.clone());
                Ok(if *prefix { new } else { old })
            }
            BoundExpr::Neg(kind, operand) => {
                let value = self.eval(operand, frame)?;
                match (kind, &value) {
                    (NumKind::Int, Value::Int(n)) => Ok(Value::Int(n.wrapping_neg())),
                    (NumKind::Double, Value::Double(d)) => Ok(Value::Double(-d)),
                    _ => Err(internal(format!("cannot negate {}", value.type_name()))),
                }
            }
            BoundExpr::Not(operand) => Ok(Value::Bool(!self.eval(operand, frame)?.as_bool())),
            BoundExpr::Binary { op, left, right } => {
                let left = self.eval(left, frame)?;
                let right = self.eval(right, frame)?;
                apply_binary(*op, left, right)
            }
            BoundExpr::And(left, right) => {
                if !self.eval(left, frame)?.as_bool() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.eval(right, frame)?.as_bool()))
            }
            BoundExpr::Or(left, right) => {
                if self.eval(left, frame)?.as_bool() {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.eval(right, frame)?.as_bool()))
            }
            BoundExpr::Coalesce(left, right) => {
                let left = self.eval(left, frame)?;
                if left.is_null() {
                    self.eval(right, frame)
                } else {
                    Ok(left)
                }
            }
            BoundExpr::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                if self.eval(cond, frame)?.as_bool() {
                    self.eval(then_expr, frame)
                } else {
                    self.eval(else_expr, frame)
                }
            }
            BoundExpr::Call {
                method,
                receiver,
                args,
            } => {
                let this = match receiver {
                    Some(receiver) => Some(self.eval_receiver(receiver, frame)?),
                    None => None,
                };
                let args = self.eval_args(args, frame)?;
                self.invoke(method, this, args)
            }
            BoundExpr::CallVirtual {
                receiver,
                method,
                args,
            } => {
                let this = self.eval_receiver(receiver, frame)?;
                let args = self.eval_args(args, frame)?;
                let target = this.ty.find_implementation(method).ok_or_else(|| {
                    internal(format!(
                        "{} does not implement {}",
                        this.ty.full_name,
                        method.signature()
                    ))
                })?;
                self.invoke(&target, Some(this), args)
            }
            BoundExpr::New { ty, ctor, args } => {
                let args = self.eval_args(args, frame)?;
                self.enter()?;
                let result = self.construct(ty, ctor.as_deref(), args);
                self.depth -= 1;
                result.map(Value::Object)
            }
            BoundExpr::Intrinsic(intrinsic, operand) => {
                let value = self.eval(operand, frame)?;
                match (intrinsic, &value) {
                    (_, Value::Null) => Err(Fault::NullReference.into()),
                    (Intrinsic::ToString, v) => Ok(Value::string(v.to_string())),
                    (Intrinsic::StringLength, Value::Str(s)) => {
                        Ok(Value::Int(s.encode_utf16().count() as i64))
                    }
                    (Intrinsic::StringLength, v) => {
                        Err(internal(format!("no Length on {}", v.type_name())))
                    }
                }
            }
            BoundExpr::IntToDouble(operand) => match self.eval(operand, frame)? {
                Value::Int(n) => Ok(Value::Double(n as f64)),
                other => Ok(other),
            },
        }
    }

    fn eval_args(&mut self, args: &[BoundExpr], frame: &mut Frame) -> ExecResult<Vec<Value>> {
        args.iter().map(|arg| self.eval(arg, frame)).collect()
    }

    fn eval_receiver(&mut self, receiver: &BoundExpr, frame: &mut Frame) -> ExecResult<ObjectRef> {
        match self.eval(receiver, frame)? {
            Value::Object(object) => Ok(object),
            Value::Null => Err(Fault::NullReference.into()),
            other => Err(internal(format!("{} is not an object", other.type_name()))),
        }
    }

    fn resolve(&mut self, place: &Place, frame: &mut Frame) -> ExecResult<Slot> {
        match place {
            Place::Local(index) => Ok(Slot::Local(*index)),
            Place::Static(handle) => Ok(Slot::Static(handle.clone())),
            Place::Instance { target, index } => {
                let object = self.eval_receiver(target, frame)?;
                Ok(Slot::Instance(object, *index))
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Calls
    // ══════════════════════════════════════════════════════════════════════

    /// Count one nested frame. Callers decrement `depth` when done.
    fn enter(&mut self) -> ExecResult<()> {
        self.check_cancel()?;
        if self.depth >= self.max_depth {
            return Err(Fault::StackOverflow(self.max_depth).into());
        }
        self.depth += 1;
        Ok(())
    }

    fn invoke(
        &mut self,
        method: &MethodInfo,
        this: Option<ObjectRef>,
        args: Vec<Value>,
    ) -> ExecResult<Value> {
        self.enter()?;
        let result = self.invoke_body(method, this, args);
        self.depth -= 1;
        result
    }

    /// Field initializers run in their own frame before the constructor.
    fn construct(
        &mut self,
        ty: &Arc<TypeInfo>,
        ctor: Option<&MethodInfo>,
        args: Vec<Value>,
    ) -> ExecResult<ObjectRef> {
        let object = Object::new(ty.clone(), ty.default_fields());
        let mut init_frame = Frame::new(0, Some(object.clone()));
        for (index, init) in ty.field_initializers() {
            let value = self.eval(init, &mut init_frame)?;
            object.set(*index, value);
        }
        if let Some(ctor) = ctor {
            self.invoke(ctor, Some(object.clone()), args)?;
        }
        Ok(object)
    }

    fn invoke_body(
        &mut self,
        method: &MethodInfo,
        this: Option<ObjectRef>,
        args: Vec<Value>,
    ) -> ExecResult<Value> {
        match method.body() {
            Some(MethodBody::Code(code)) => {
                let mut frame = Frame::new(code.locals.max(args.len()), this);
                for (slot, arg) in frame.locals.iter_mut().zip(args) {
                    *slot = arg;
                }
                match self.exec_block(&code.body, &mut frame)? {
                    Flow::Return(value) => Ok(value),
                    _ => Ok(Value::Null),
                }
            }
            Some(MethodBody::Native(f)) => {
                let ctx = NativeContext { print: self.print };
                Ok(f(&ctx, &args)?)
            }
            Some(MethodBody::Abstract) | None => {
                Err(internal(format!("{} has no body", method.signature())))
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════

fn load(slot: &Slot, frame: &Frame) -> Value {
    match slot {
        Slot::Local(index) => frame.locals.get(*index).cloned().unwrap_or(Value::Null),
        Slot::Static(handle) => handle.get(),
        Slot::Instance(object, index) => object.get(*index),
    }
}

fn store(slot: &Slot, frame: &mut Frame, value: Value) {
    match slot {
        Slot::Local(index) => {
            if let Some(local) = frame.locals.get_mut(*index) {
                *local = value;
            }
        }
        Slot::Static(handle) => handle.set(value),
        Slot::Instance(object, index) => object.set(*index, value),
    }
}

fn step(value: &Value, increment: bool, kind: NumKind) -> ExecResult<Value> {
    match (kind, value) {
        (NumKind::Int, Value::Int(n)) => Ok(Value::Int(if increment {
            n.wrapping_add(1)
        } else {
            n.wrapping_sub(1)
        })),
        (NumKind::Double, Value::Double(d)) => {
            Ok(Value::Double(if increment { d + 1.0 } else { d - 1.0 }))
        }
        _ => Err(internal(format!("cannot step {}", value.type_name()))),
    }
}

fn apply_binary(op: BinaryOp, left: Value, right: Value) -> ExecResult<Value> {
    match op {
        BinaryOp::Arith(op, NumKind::Int) => {
            let (Some(a), Some(b)) = (left.as_int(), right.as_int()) else {
                return Err(internal("integer operands expected"));
            };
            let result = match op {
                ArithOp::Add => a.wrapping_add(b),
                ArithOp::Sub => a.wrapping_sub(b),
                ArithOp::Mul => a.wrapping_mul(b),
                ArithOp::Div if b == 0 => return Err(Fault::DivideByZero.into()),
                ArithOp::Div => a.wrapping_div(b),
                ArithOp::Rem if b == 0 => return Err(Fault::DivideByZero.into()),
                ArithOp::Rem => a.wrapping_rem(b),
            };
            Ok(Value::Int(result))
        }
        BinaryOp::Arith(op, NumKind::Double) => {
            let (Some(a), Some(b)) = (left.as_double(), right.as_double()) else {
                return Err(internal("numeric operands expected"));
            };
            let result = match op {
                ArithOp::Add => a + b,
                ArithOp::Sub => a - b,
                ArithOp::Mul => a * b,
                ArithOp::Div => a / b,
                ArithOp::Rem => a % b,
            };
            Ok(Value::Double(result))
        }
        BinaryOp::Compare(op, kind) => {
            let ordering = match kind {
                NumKind::Int => left
                    .as_int()
                    .zip(right.as_int())
                    .map(|(a, b)| a.partial_cmp(&b)),
                NumKind::Double => left
                    .as_double()
                    .zip(right.as_double())
                    .map(|(a, b)| a.partial_cmp(&b)),
            };
            let Some(ordering) = ordering else {
                return Err(internal("numeric operands expected"));
            };
            // NaN compares false for every operator.
            let result = ordering.is_some_and(|ord| match op {
                CmpOp::Less => ord.is_lt(),
                CmpOp::LessEq => ord.is_le(),
                CmpOp::Greater => ord.is_gt(),
                CmpOp::GreaterEq => ord.is_ge(),
            });
            Ok(Value::Bool(result))
        }
        BinaryOp::Concat => Ok(Value::string(format!("{left}{right}"))),
        BinaryOp::Equals => Ok(Value::Bool(left == right)),
        BinaryOp::NotEquals => Ok(Value::Bool(left != right)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::Type;
    use crate::print::buffer_handler;

    fn int(n: i64) -> Box<BoundExpr> {
        Box::new(BoundExpr::Const(Value::Int(n)))
    }

    fn run_code(code: &Code) -> ExecResult<Option<Value>> {
        let print = buffer_handler();
        let cancel = CancelToken::new();
        Interpreter::new(&print, &cancel, 100).run(code)
    }

    #[test]
    fn captures_last_value() {
        let sum = BoundExpr::Binary {
            op: BinaryOp::Arith(ArithOp::Add, NumKind::Int),
            left: int(5),
            right: int(5),
        };
        let code = Code::new(vec![BoundStmt::Capture(sum)], 0);
        assert_eq!(run_code(&code).unwrap(), Some(Value::Int(10)));
    }

    #[test]
    fn statement_without_capture_yields_none() {
        let assign = BoundExpr::Assign {
            place: Place::Local(0),
            value: int(1),
        };
        let code = Code::new(vec![BoundStmt::Expr(assign)], 1);
        assert_eq!(run_code(&code).unwrap(), None);
    }

    #[test]
    fn integer_division_by_zero_faults() {
        let div = BoundExpr::Binary {
            op: BinaryOp::Arith(ArithOp::Div, NumKind::Int),
            left: int(1),
            right: int(0),
        };
        let code = Code::new(vec![BoundStmt::Capture(div)], 0);
        assert!(matches!(
            run_code(&code),
            Err(ExecError::Fault(Fault::DivideByZero))
        ));
    }

    #[test]
    fn while_loop_with_break() {
        // i = 0; while (true) { i++; if (i >= 3) break; } i
        let i = || Place::Local(0);
        let body = BoundStmt::Block(vec![
            BoundStmt::Expr(BoundExpr::IncDec {
                place: i(),
                increment: true,
                prefix: false,
                kind: NumKind::Int,
            }),
            BoundStmt::If {
                cond: BoundExpr::Binary {
                    op: BinaryOp::Compare(CmpOp::GreaterEq, NumKind::Int),
                    left: Box::new(BoundExpr::Load(i())),
                    right: int(3),
                },
                then_branch: Box::new(BoundStmt::Break),
                else_branch: None,
            },
        ]);
        let code = Code::new(
            vec![
                BoundStmt::Expr(BoundExpr::Assign {
                    place: i(),
                    value: int(0),
                }),
                BoundStmt::While {
                    cond: BoundExpr::Const(Value::Bool(true)),
                    body: Box::new(body),
                },
                BoundStmt::Capture(BoundExpr::Load(i())),
            ],
            1,
        );
        assert_eq!(run_code(&code).unwrap(), Some(Value::Int(3)));
    }

    #[test]
    fn cancelled_token_interrupts_before_first_statement() {
        let print = buffer_handler();
        let cancel = CancelToken::new();
        cancel.cancel();
        let code = Code::new(vec![BoundStmt::Capture(*int(1))], 0);
        let result = Interpreter::new(&print, &cancel, 100).run(&code);
        assert!(matches!(result, Err(ExecError::Interrupted)));
    }

    #[test]
    fn unbounded_recursion_hits_depth_limit() {
        let method = Arc::new(MethodInfo::new("F", "Host", vec![], Type::Int, true));
        let call = BoundExpr::Call {
            method: method.clone(),
            receiver: None,
            args: vec![],
        };
        method.set_body(MethodBody::Code(Arc::new(Code::new(
            vec![BoundStmt::Return(Some(call.clone()))],
            0,
        ))));
        let code = Code::new(vec![BoundStmt::Capture(call)], 0);
        assert!(matches!(
            run_code(&code),
            Err(ExecError::Fault(Fault::StackOverflow(100)))
        ));
    }

    #[test]
    fn thrown_value_surfaces_as_fault() {
        let code = Code::new(
            vec![BoundStmt::Throw(BoundExpr::Const(Value::string("boom")))],
            0,
        );
        match run_code(&code) {
            Err(ExecError::Fault(Fault::Thrown(v))) => assert_eq!(v, Value::string("boom")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn concat_uses_tostring_conversions() {
        let concat = BoundExpr::Binary {
            op: BinaryOp::Concat,
            left: Box::new(BoundExpr::Const(Value::string("x="))),
            right: Box::new(BoundExpr::Const(Value::Double(2.0))),
        };
        let code = Code::new(vec![BoundStmt::Capture(concat)], 0);
        assert_eq!(run_code(&code).unwrap(), Some(Value::string("x=2")));
    }
}
