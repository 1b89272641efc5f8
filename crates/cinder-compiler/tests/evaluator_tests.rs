//! End-to-end tests for the interactive evaluator.
//!
//! Tests cover:
//! - Value capture vs. statement-only chunks
//! - Partial input convergence (open blocks, strings, comments)
//! - Rollback of failed chunks (namespaces, usings, variables)
//! - Redefinition of persistent variables
//! - Declarations carried across evaluations
//! - Runtime faults and interruption from another thread
//! - Re-running compiled units and variable snapshots

use std::thread;
use std::time::{Duration, Instant};

use cinder_compiler::{
    classify, Classification, Compilation, CompileOutcome, EvalError, Evaluation, Evaluator,
    EvaluatorSettings, ParseMode, Session, SpeculativeCompiler,
};
use cinder_eval::{buffer_handler, Fault, SharedPrintHandler, Value};
use cinder_types::{ErrorCode, SourceFile};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

struct Harness {
    evaluator: Evaluator,
    output: SharedPrintHandler,
    messages: SharedPrintHandler,
}

fn harness() -> Harness {
    let output = buffer_handler();
    let messages = buffer_handler();
    let evaluator = Evaluator::with_handlers(
        EvaluatorSettings::default(),
        output.clone(),
        messages.clone(),
    );
    Harness {
        evaluator,
        output,
        messages,
    }
}

/// Evaluate a chunk that must complete, returning its captured value.
fn eval_ok(evaluator: &Evaluator, text: &str) -> Option<Value> {
    match evaluator.evaluate(text) {
        Ok(Evaluation::Completed(value)) => value,
        Ok(Evaluation::Partial) => panic!("`{text}` was reported as partial"),
        Err(e) => panic!("`{text}` failed: {e}"),
    }
}

fn eval_err(evaluator: &Evaluator, text: &str) -> EvalError {
    match evaluator.evaluate(text) {
        Ok(outcome) => panic!("`{text}` should fail, got {outcome:?}"),
        Err(e) => e,
    }
}

fn assert_partial(evaluator: &Evaluator, text: &str) {
    match evaluator.evaluate(text) {
        Ok(Evaluation::Partial) => {}
        other => panic!("`{text}` should be partial, got {other:?}"),
    }
}

fn compile_in(session: &mut Session, text: &str) -> CompileOutcome {
    let sink = buffer_handler();
    let source = SourceFile::new("test", text);
    SpeculativeCompiler::new(session, &sink).compile(&source, classify(&source), ParseMode::Silent)
}

// ══════════════════════════════════════════════════════════════════════════════
// Values and Statements
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn expression_produces_value() {
    let h = harness();
    assert_eq!(eval_ok(&h.evaluator, "5+5;"), Some(Value::Int(10)));
    assert_eq!(eval_ok(&h.evaluator, "7 * 6"), Some(Value::Int(42)));
}

#[test]
fn declaration_produces_no_value_and_persists() {
    let h = harness();
    assert_eq!(eval_ok(&h.evaluator, "int z = 5;"), None);
    assert_eq!(eval_ok(&h.evaluator, "z * 2"), Some(Value::Int(10)));

    let vars = h.evaluator.declared_variables();
    assert_eq!(vars.len(), 1);
    assert_eq!(vars[0].name, "z");
    assert_eq!(vars[0].display, Ok("5".to_string()));
}

#[test]
fn assignments_and_void_calls_produce_no_value() {
    let h = harness();
    assert_eq!(eval_ok(&h.evaluator, "int a = 1;"), None);
    assert_eq!(eval_ok(&h.evaluator, "a = 4;"), None);
    assert_eq!(eval_ok(&h.evaluator, "Console.WriteLine(a);"), None);
    assert_eq!(h.output.get_output(), "4\n");
}

#[test]
fn program_output_goes_to_print_handler() {
    let h = harness();
    eval_ok(&h.evaluator, "print(\"hello\");");
    eval_ok(&h.evaluator, "Console.Write(\"a\"); Console.Write(\"b\");");
    assert_eq!(h.output.get_output(), "hello\nab");
    assert_eq!(h.messages.get_output(), "");
}

#[test]
fn string_values_display_quoted() {
    let h = harness();
    let value = eval_ok(&h.evaluator, "\"a\\tb\"").expect("string value");
    assert_eq!(value.display(), "\"a\\tb\"");
}

// ══════════════════════════════════════════════════════════════════════════════
// Partial Input
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn open_block_converges_once_closed() {
    let h = harness();
    assert_partial(&h.evaluator, "if (true) {");
    assert_eq!(eval_ok(&h.evaluator, "if (true) {\n}"), None);
}

#[test]
fn empty_and_comment_only_chunks_are_partial() {
    let h = harness();
    assert_partial(&h.evaluator, "");
    assert_partial(&h.evaluator, "   \n\t");
    assert_partial(&h.evaluator, "// nothing yet");
}

#[test]
fn unterminated_string_and_comment_are_partial() {
    let h = harness();
    assert_partial(&h.evaluator, "\"abc");
    assert_partial(&h.evaluator, "/* still open");
    assert_partial(&h.evaluator, "class C {");
}

#[test]
fn partial_input_leaves_no_trace() {
    let h = harness();
    assert_partial(&h.evaluator, "int q = 1; if (q > 0) {");
    assert!(h.evaluator.declared_variables().is_empty());
    assert_eq!(h.messages.get_output(), "");
}

#[test]
fn real_syntax_error_is_reported() {
    let h = harness();
    match eval_err(&h.evaluator, "1 + ;") {
        EvalError::Syntax(errors) => assert!(errors.contains(ErrorCode::UNEXPECTED_TOKEN)),
        other => panic!("expected syntax error, got {other:?}"),
    }
    assert!(h.messages.get_output().contains("E100"));
}

// ══════════════════════════════════════════════════════════════════════════════
// Disambiguation
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn chunks_are_classified_by_leading_tokens() {
    let classify_text = |text: &str| classify(&SourceFile::new("test", text));
    assert_eq!(classify_text("class Foo {}"), Classification::DeclarationUnit);
    assert_eq!(classify_text("using System;"), Classification::DeclarationUnit);
    assert_eq!(classify_text("1 + 2"), Classification::StatementOrExpression);
    assert_eq!(classify_text("int x = 1;"), Classification::StatementOrExpression);
    assert_eq!(classify_text(""), Classification::EndOfInput);
    assert_eq!(classify_text("readonly int x;"), Classification::Invalid);
}

// ══════════════════════════════════════════════════════════════════════════════
// Rollback and Commit
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn failed_namespace_is_rolled_back() {
    let h = harness();
    let err = eval_err(
        &h.evaluator,
        "namespace N { class A { int F() { return nope; } } }",
    );
    assert!(matches!(err, EvalError::Resolution(_)));
    assert!(h.evaluator.declared_types().is_empty());

    // Redeclaring succeeds because nothing of the first attempt survived.
    assert_eq!(eval_ok(&h.evaluator, "namespace N { class A { } }"), None);
    assert_eq!(h.evaluator.declared_types(), vec!["N.A".to_string()]);
}

#[test]
fn missing_using_target_leaves_usings_unchanged() {
    let h = harness();
    let before = h.evaluator.active_usings();
    match eval_err(&h.evaluator, "using Missing;") {
        EvalError::Resolution(errors) => {
            assert!(errors.contains(ErrorCode::UNKNOWN_NAMESPACE));
        }
        other => panic!("expected resolution error, got {other:?}"),
    }
    assert_eq!(h.evaluator.active_usings(), before);
    assert!(h.messages.get_output().contains("E204"));
}

#[test]
fn failed_statement_declares_nothing() {
    let h = harness();
    let err = eval_err(&h.evaluator, "int a = 1; int b = undefinedThing;");
    assert!(matches!(err, EvalError::Resolution(_)));
    assert!(h.evaluator.declared_variables().is_empty());
    assert!(matches!(
        eval_err(&h.evaluator, "a"),
        EvalError::Resolution(_)
    ));
}

#[test]
fn commits_only_grow() {
    let h = harness();
    eval_ok(&h.evaluator, "namespace Shapes { class Square { } }");
    eval_ok(&h.evaluator, "using Shapes;");
    let _ = eval_err(&h.evaluator, "class Broken { void M() { missing(); } }");
    eval_ok(&h.evaluator, "class Circle { }");

    assert_eq!(
        h.evaluator.declared_types(),
        vec!["Shapes.Square".to_string(), "Circle".to_string()]
    );
    assert_eq!(
        h.evaluator.active_usings(),
        vec!["using System;".to_string(), "using Shapes;".to_string()]
    );
}

#[test]
fn default_usings_can_be_disabled() {
    let settings = EvaluatorSettings {
        default_usings: Vec::new(),
        ..EvaluatorSettings::default()
    };
    let evaluator = Evaluator::with_handlers(settings, buffer_handler(), buffer_handler());
    assert!(evaluator.active_usings().is_empty());
    assert!(matches!(
        evaluator.evaluate("Console.WriteLine(1);"),
        Err(EvalError::Resolution(_))
    ));
    assert_eq!(eval_ok(&evaluator, "System.Math.Max(2, 3)"), Some(Value::Int(3)));
}

// ══════════════════════════════════════════════════════════════════════════════
// Redefinition
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn implicit_variable_reassignment_keeps_one_handle() {
    let mut session = Session::new();
    assert!(matches!(compile_in(&mut session, "x = 1;"), CompileOutcome::Unit(_)));
    assert!(matches!(compile_in(&mut session, "x = 2;"), CompileOutcome::Unit(_)));
    assert_eq!(session.registry.live_handles("x"), 1);
    assert_eq!(session.registry.len(), 1);
}

#[test]
fn redeclaration_releases_previous_handle() {
    let mut session = Session::new();
    assert!(matches!(compile_in(&mut session, "int x = 1;"), CompileOutcome::Unit(_)));
    let old = session
        .registry
        .lookup("x")
        .map(|field| field.handle.clone())
        .expect("x registered");

    assert!(matches!(
        compile_in(&mut session, "string x = \"s\";"),
        CompileOutcome::Unit(_)
    ));
    assert!(old.is_released());
    assert_eq!(session.registry.live_handles("x"), 1);
    assert_eq!(session.registry.lookup("x").map(|f| f.ty().to_string()), Some("string".into()));
}

#[test]
fn reassigned_variable_reads_latest_value() {
    let h = harness();
    eval_ok(&h.evaluator, "x = 1;");
    eval_ok(&h.evaluator, "x = 2;");
    assert_eq!(eval_ok(&h.evaluator, "x"), Some(Value::Int(2)));
    assert_eq!(h.evaluator.declared_variables().len(), 1);
}

#[test]
fn variables_listed_in_first_declaration_order() {
    let h = harness();
    eval_ok(&h.evaluator, "int b = 1;");
    eval_ok(&h.evaluator, "string a = \"x\";");
    eval_ok(&h.evaluator, "b = 3;");

    let vars = h.evaluator.declared_variables();
    let names: Vec<&str> = vars.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["b", "a"]);
    assert_eq!(vars[0].display, Ok("3".to_string()));
    assert_eq!(vars[1].display, Ok("\"x\"".to_string()));
}

// ══════════════════════════════════════════════════════════════════════════════
// Declarations Across Evaluations
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn class_declared_earlier_is_usable_later() {
    let h = harness();
    let decl = "public class Counter {
        public int N;
        public Counter(int start) { N = start; }
        public void Inc() { N++; }
    }";
    assert_eq!(eval_ok(&h.evaluator, decl), None);
    eval_ok(&h.evaluator, "var c = new Counter(40);");
    eval_ok(&h.evaluator, "c.Inc(); c.Inc();");
    assert_eq!(eval_ok(&h.evaluator, "c.N"), Some(Value::Int(42)));
}

#[test]
fn static_methods_and_enums() {
    let h = harness();
    eval_ok(
        &h.evaluator,
        "static class Util { public static int Twice(int n) { return n * 2; } }",
    );
    eval_ok(&h.evaluator, "enum Color { Red, Green = 5, Blue }");
    assert_eq!(eval_ok(&h.evaluator, "Util.Twice(21)"), Some(Value::Int(42)));
    let blue = eval_ok(&h.evaluator, "Color.Blue").expect("enum value");
    assert_eq!(blue.as_int(), Some(6));
    assert_eq!(blue.display(), "Blue");
}

#[test]
fn interface_call_dispatches_on_full_signature() {
    let h = harness();
    eval_ok(
        &h.evaluator,
        "interface IPick { int Pick(int a); }
         class Picker : IPick {
             public int Pick(string s) { return 1; }
             public int Pick(int a) { return a; }
         }",
    );
    eval_ok(&h.evaluator, "IPick p = new Picker();");
    assert_eq!(eval_ok(&h.evaluator, "p.Pick(7)"), Some(Value::Int(7)));
    eval_ok(&h.evaluator, "var direct = new Picker();");
    assert_eq!(eval_ok(&h.evaluator, "direct.Pick(\"x\")"), Some(Value::Int(1)));
}

#[test]
fn duplicate_type_is_rejected() {
    let h = harness();
    eval_ok(&h.evaluator, "class Dup { }");
    match eval_err(&h.evaluator, "class Dup { }") {
        EvalError::Resolution(errors) => {
            assert!(errors.contains(ErrorCode::DUPLICATE_DECLARATION));
        }
        other => panic!("expected resolution error, got {other:?}"),
    }
    assert_eq!(h.evaluator.declared_types(), vec!["Dup".to_string()]);
}

// ══════════════════════════════════════════════════════════════════════════════
// Execution
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn runtime_fault_surfaces_as_user_fault() {
    let h = harness();
    eval_ok(&h.evaluator, "int zero = 0;");
    assert!(matches!(
        eval_err(&h.evaluator, "10 / zero"),
        EvalError::UserFault(Fault::DivideByZero)
    ));
    // The session survives a fault.
    assert_eq!(eval_ok(&h.evaluator, "zero + 1"), Some(Value::Int(1)));
}

#[test]
fn deep_recursion_faults_without_killing_the_session() {
    let h = harness();
    eval_ok(
        &h.evaluator,
        "class R { public static int Down(int n) { return Down(n + 1); } }",
    );
    assert!(matches!(
        eval_err(&h.evaluator, "R.Down(0)"),
        EvalError::UserFault(Fault::StackOverflow(_))
    ));
    assert_eq!(eval_ok(&h.evaluator, "1 + 1"), Some(Value::Int(2)));
}

#[test]
fn self_constructing_field_initializer_overflows_cleanly() {
    let h = harness();
    eval_ok(&h.evaluator, "class Node { Node next = new Node(); }");
    assert!(matches!(
        eval_err(&h.evaluator, "new Node()"),
        EvalError::UserFault(Fault::StackOverflow(_))
    ));
    assert_eq!(eval_ok(&h.evaluator, "2 * 3"), Some(Value::Int(6)));
}

#[test]
fn interrupt_stops_infinite_loop() {
    let h = harness();
    assert!(!h.evaluator.interrupt());
    eval_ok(&h.evaluator, "class Kept { }");
    eval_ok(&h.evaluator, "int kept = 7;");
    let types = h.evaluator.declared_types();
    let usings = h.evaluator.active_usings();
    let variables = h.evaluator.declared_variables();

    let result = thread::scope(|scope| {
        let running = scope.spawn(|| h.evaluator.evaluate("while (true) { }"));

        let deadline = Instant::now() + Duration::from_secs(10);
        while !h.evaluator.is_executing() {
            assert!(Instant::now() < deadline, "loop never started");
            thread::sleep(Duration::from_millis(1));
        }
        assert!(h.evaluator.interrupt());
        running.join().expect("evaluation thread panicked")
    });

    assert!(matches!(result, Err(EvalError::Interrupted)));
    assert!(!h.evaluator.is_executing());
    assert_eq!(h.evaluator.declared_types(), types);
    assert_eq!(h.evaluator.active_usings(), usings);
    assert_eq!(h.evaluator.declared_variables(), variables);
    assert_eq!(eval_ok(&h.evaluator, "3 - 1"), Some(Value::Int(2)));
}

#[test]
fn compiled_unit_can_run_repeatedly() {
    let h = harness();
    eval_ok(&h.evaluator, "int n = 0;");
    let unit = match h.evaluator.compile("n = n + 1;") {
        Ok(Compilation::Unit(unit)) => unit,
        other => panic!("expected a unit, got {other:?}"),
    };
    for _ in 0..3 {
        assert_eq!(h.evaluator.run(&unit).expect("run"), None);
    }
    assert_eq!(eval_ok(&h.evaluator, "n"), Some(Value::Int(3)));
}

#[test]
fn units_are_fingerprinted_by_text() {
    let h = harness();
    let unit = |text: &str| match h.evaluator.compile(text) {
        Ok(Compilation::Unit(unit)) => unit,
        other => panic!("expected a unit, got {other:?}"),
    };
    let first = unit("1 + 2");
    let again = unit("1 + 2");
    let other = unit("1 + 3");
    assert_ne!(first.name(), again.name());
    assert_eq!(first.fingerprint(), again.fingerprint());
    assert_ne!(first.fingerprint(), other.fingerprint());
}

#[test]
fn compile_does_not_run() {
    let h = harness();
    match h.evaluator.compile("print(\"side effect\");") {
        Ok(Compilation::Unit(_)) => {}
        other => panic!("expected a unit, got {other:?}"),
    }
    assert_eq!(h.output.get_output(), "");
}
