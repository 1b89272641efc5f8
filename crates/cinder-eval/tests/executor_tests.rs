//! Executor tests: running units on the executor thread, interruption,
//! fault propagation and print routing.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cinder_eval::{
    buffer_handler, ArithOp, BinaryOp, BoundExpr, BoundStmt, Code, ExecError, Executor,
    ExecutorConfig, Fault, MethodInfo, NativeContext, NumKind, Type, Value,
};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn executor() -> Executor {
    Executor::new(ExecutorConfig {
        stack_size: 16 * 1024 * 1024,
        thread_name: "cinder-test".into(),
        max_call_depth: 200,
    })
}

fn unit(body: Vec<BoundStmt>) -> Arc<Code> {
    Arc::new(Code::new(body, 0))
}

fn int(n: i64) -> Box<BoundExpr> {
    Box::new(BoundExpr::Const(Value::Int(n)))
}

fn say(ctx: &NativeContext<'_>, args: &[Value]) -> Result<Value, Fault> {
    let text = args.first().map(ToString::to_string).unwrap_or_default();
    ctx.print.println(&text);
    Ok(Value::Null)
}

// ══════════════════════════════════════════════════════════════════════════════
// Tests
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn runs_unit_and_returns_captured_value() {
    let product = BoundExpr::Binary {
        op: BinaryOp::Arith(ArithOp::Mul, NumKind::Int),
        left: int(6),
        right: int(7),
    };
    let result = executor().execute(unit(vec![BoundStmt::Capture(product)]), buffer_handler());
    assert_eq!(result.unwrap(), Some(Value::Int(42)));
}

#[test]
fn native_output_reaches_print_handler() {
    let method = MethodInfo::native("Say", "Test", vec![("v".into(), Type::Object)], Type::Void, say);
    let call = BoundExpr::Call {
        method,
        receiver: None,
        args: vec![BoundExpr::Const(Value::string("hi"))],
    };
    let print = buffer_handler();
    let result = executor().execute(unit(vec![BoundStmt::Expr(call)]), print.clone());
    assert_eq!(result.unwrap(), None);
    assert_eq!(print.get_output(), "hi\n");
}

#[test]
fn faults_propagate_verbatim() {
    let throw = BoundStmt::Throw(BoundExpr::Const(Value::string("bad")));
    match executor().execute(unit(vec![throw]), buffer_handler()) {
        Err(ExecError::Fault(Fault::Thrown(v))) => assert_eq!(v, Value::string("bad")),
        other => panic!("expected thrown fault, got {other:?}"),
    }
}

#[test]
fn interrupt_without_run_is_a_no_op() {
    let exec = executor();
    assert!(!exec.is_executing());
    assert!(!exec.interrupt());
}

#[test]
fn interrupt_unwinds_infinite_loop() {
    let exec = executor();
    let spin = BoundStmt::While {
        cond: BoundExpr::Const(Value::Bool(true)),
        body: Box::new(BoundStmt::Block(Vec::new())),
    };
    let code = unit(vec![spin]);

    let result = thread::scope(|scope| {
        let running = scope.spawn(|| exec.execute(code, buffer_handler()));
        let deadline = Instant::now() + Duration::from_secs(10);
        while !exec.is_executing() {
            assert!(Instant::now() < deadline, "run never started");
            thread::sleep(Duration::from_millis(1));
        }
        assert!(exec.interrupt());
        running.join().expect("runner panicked")
    });

    assert!(matches!(result, Err(ExecError::Interrupted)));
    assert!(!exec.is_executing());

    // The executor accepts new work afterwards.
    let again = exec.execute(unit(vec![BoundStmt::Capture(*int(1))]), buffer_handler());
    assert_eq!(again.unwrap(), Some(Value::Int(1)));
}
