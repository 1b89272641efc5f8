//! Parser tests.
//!
//! Covers: statement units (locals, control flow, optional final `;`),
//! declaration units (usings, namespaces, types, members), operator
//! precedence, and the unexpected-end-of-input signal that drives
//! partial-input detection.

use cinder_parser::{parse_declarations, parse_statements};
use cinder_types::ast::*;
use cinder_types::{ErrorCode, SourceFile};
use pretty_assertions::assert_eq;

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

fn stmts(source: &str) -> Vec<Stmt> {
    let sf = SourceFile::new("{interactive}", source);
    let result = parse_statements(&sf);
    assert!(
        !result.errors.has_errors(),
        "unexpected errors for {source:?}: {}",
        result.errors
    );
    result.unit.expect("statement unit").stmts
}

fn unit(source: &str) -> CompilationUnit {
    let sf = SourceFile::new("{interactive}", source);
    let result = parse_declarations(&sf);
    assert!(
        !result.errors.has_errors(),
        "unexpected errors for {source:?}: {}",
        result.errors
    );
    result.unit.expect("compilation unit")
}

fn stmt_error_codes(source: &str) -> Vec<ErrorCode> {
    let sf = SourceFile::new("{interactive}", source);
    parse_statements(&sf).errors.errors.iter().map(|e| e.code).collect()
}

fn decl_error_codes(source: &str) -> Vec<ErrorCode> {
    let sf = SourceFile::new("{interactive}", source);
    parse_declarations(&sf).errors.errors.iter().map(|e| e.code).collect()
}

fn stmt_is_partial(source: &str) -> bool {
    let sf = SourceFile::new("{interactive}", source);
    parse_statements(&sf).is_partial()
}

fn decl_is_partial(source: &str) -> bool {
    let sf = SourceFile::new("{interactive}", source);
    parse_declarations(&sf).is_partial()
}

/// Render an expression back to a fully parenthesized string.
fn show(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::IntLit(n) => n.to_string(),
        ExprKind::DoubleLit(n) => n.to_string(),
        ExprKind::StringLit(s) => format!("{s:?}"),
        ExprKind::BoolLit(b) => b.to_string(),
        ExprKind::Null => "null".into(),
        ExprKind::This => "this".into(),
        ExprKind::Name(id) => id.name.clone(),
        ExprKind::Member { target, name } => format!("{}.{}", show(target), name.name),
        ExprKind::Call { callee, args } => {
            let args: Vec<_> = args.iter().map(show).collect();
            format!("{}({})", show(callee), args.join(", "))
        }
        ExprKind::New { ty, args } => {
            let args: Vec<_> = args.iter().map(show).collect();
            format!("new {}({})", ty.kind, args.join(", "))
        }
        ExprKind::Unary { op, operand } => format!("({op}{})", show(operand)),
        ExprKind::Binary { left, op, right } => {
            format!("({} {op} {})", show(left), show(right))
        }
        ExprKind::Assign { target, op, value } => {
            let op = match op.binary_op() {
                Some(bin) => format!("{bin}="),
                None => "=".into(),
            };
            format!("({} {op} {})", show(target), show(value))
        }
        ExprKind::IncDec {
            target,
            increment,
            prefix,
        } => {
            let op = if *increment { "++" } else { "--" };
            if *prefix {
                format!("({op}{})", show(target))
            } else {
                format!("({}{op})", show(target))
            }
        }
        ExprKind::Conditional {
            cond,
            then_expr,
            else_expr,
        } => format!("({} ? {} : {})", show(cond), show(then_expr), show(else_expr)),
        ExprKind::Paren(inner) => show(inner),
    }
}

fn expr_of(source: &str) -> String {
    let stmts = stmts(source);
    assert_eq!(stmts.len(), 1);
    match &stmts[0].kind {
        StmtKind::Expr(expr) => show(expr),
        other => panic!("expected expression statement, got {other:?}"),
    }
}

// ─────────────────────────────────────────────────────────────────────
// Expressions & precedence
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_arithmetic_precedence() {
    assert_eq!(expr_of("1 + 2 * 3"), "(1 + (2 * 3))");
    assert_eq!(expr_of("(1 + 2) * 3"), "((1 + 2) * 3)");
    assert_eq!(expr_of("10 - 4 - 3"), "((10 - 4) - 3)");
}

#[test]
fn test_logical_and_comparison_precedence() {
    assert_eq!(expr_of("a < b && c == d || e"), "(((a < b) && (c == d)) || e)");
    assert_eq!(expr_of("!a && b"), "((!a) && b)");
}

#[test]
fn test_coalesce_and_conditional() {
    assert_eq!(expr_of("a ?? b ?? c"), "(a ?? (b ?? c))");
    assert_eq!(expr_of("x > 0 ? 1 : -1"), "((x > 0) ? 1 : (-1))");
}

#[test]
fn test_assignment_is_right_associative() {
    assert_eq!(expr_of("a = b = 3"), "(a = (b = 3))");
    assert_eq!(expr_of("a += 2 * b"), "(a += (2 * b))");
}

#[test]
fn test_postfix_chain() {
    assert_eq!(
        expr_of("System.Console.WriteLine(x.ToString())"),
        "System.Console.WriteLine(x.ToString())"
    );
    assert_eq!(expr_of("s.Length"), "s.Length");
    assert_eq!(expr_of("i++"), "(i++)");
    assert_eq!(expr_of("--i"), "(--i)");
}

#[test]
fn test_new_expression() {
    assert_eq!(expr_of("new Point(1, 2)"), "new Point(1, 2)");
    assert_eq!(expr_of("new N.Point()"), "new N.Point()");
}

// ─────────────────────────────────────────────────────────────────────
// Statements
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_final_expression_may_omit_semicolon() {
    assert_eq!(expr_of("1 + 2"), "(1 + 2)");
    assert_eq!(expr_of("5+5;"), "(5 + 5)");
}

#[test]
fn test_inner_expression_requires_semicolon() {
    assert_eq!(stmt_error_codes("{ x }"), vec![ErrorCode::UNEXPECTED_TOKEN]);
    assert_eq!(stmt_error_codes("x 1"), vec![ErrorCode::UNEXPECTED_TOKEN]);
}

#[test]
fn test_local_declarations() {
    let stmts = stmts("int x = 1, y; var s = \"a\"; Foo f = new Foo(); const int K = 3;");
    assert_eq!(stmts.len(), 4);

    let StmtKind::LocalDecl(decl) = &stmts[0].kind else {
        panic!("expected local declaration");
    };
    assert_eq!(decl.ty.kind, TypeRefKind::Int);
    assert_eq!(decl.declarators.len(), 2);
    assert!(decl.declarators[1].init.is_none());

    let StmtKind::LocalDecl(decl) = &stmts[1].kind else {
        panic!("expected local declaration");
    };
    assert_eq!(decl.ty.kind, TypeRefKind::Var);

    let StmtKind::LocalDecl(decl) = &stmts[2].kind else {
        panic!("expected local declaration");
    };
    assert!(matches!(&decl.ty.kind, TypeRefKind::Named(n) if n.to_string() == "Foo"));

    let StmtKind::LocalDecl(decl) = &stmts[3].kind else {
        panic!("expected local declaration");
    };
    assert!(decl.is_const);
}

#[test]
fn test_qualified_type_local_declaration() {
    let stmts = stmts("A.B.C value = null;");
    let StmtKind::LocalDecl(decl) = &stmts[0].kind else {
        panic!("expected local declaration");
    };
    assert!(matches!(&decl.ty.kind, TypeRefKind::Named(n) if n.to_string() == "A.B.C"));
    assert_eq!(decl.declarators[0].name.name, "value");
}

#[test]
fn test_control_flow_statements() {
    let stmts = stmts(
        "if (x > 1) { y = 2; } else y = 3;
         while (i < 10) i++;
         do { i--; } while (i > 0);
         for (int j = 0; j < 3; j++) { continue; }
         for (;;) break;",
    );
    assert_eq!(stmts.len(), 5);
    assert!(matches!(&stmts[0].kind, StmtKind::If { else_branch: Some(_), .. }));
    assert!(matches!(&stmts[1].kind, StmtKind::While { .. }));
    assert!(matches!(&stmts[2].kind, StmtKind::DoWhile { .. }));
    assert!(matches!(
        &stmts[3].kind,
        StmtKind::For {
            init: Some(ForInit::Decl(_)),
            cond: Some(_),
            ..
        }
    ));
    assert!(matches!(
        &stmts[4].kind,
        StmtKind::For {
            init: None,
            cond: None,
            ..
        }
    ));
}

#[test]
fn test_return_and_throw() {
    let stmts = stmts("return; throw \"boom\";");
    assert!(matches!(&stmts[0].kind, StmtKind::Return(None)));
    assert!(matches!(&stmts[1].kind, StmtKind::Throw(Some(_))));
}

#[test]
fn test_empty_statement_and_empty_input() {
    assert_eq!(stmts(";").len(), 1);
    assert!(stmts("").is_empty());
    assert!(stmts("   // just a comment").is_empty());
}

#[test]
fn test_delegate_is_unsupported() {
    assert_eq!(
        stmt_error_codes("delegate (int x) { };"),
        vec![ErrorCode::UNSUPPORTED_FEATURE]
    );
}

// ─────────────────────────────────────────────────────────────────────
// Partial input
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_open_block_is_partial() {
    assert!(stmt_is_partial("if (true) {"));
    assert!(!stmt_is_partial("if (true) {}"));
}

#[test]
fn test_incomplete_expressions_are_partial() {
    assert!(stmt_is_partial("1 +"));
    assert!(stmt_is_partial("Foo("));
    assert!(stmt_is_partial("int x ="));
    assert!(stmt_is_partial("int x = 5"));
    assert!(stmt_is_partial("while (x"));
}

#[test]
fn test_unterminated_string_is_partial() {
    assert!(stmt_is_partial("var s = \"abc"));
}

#[test]
fn test_error_before_eof_is_not_partial() {
    assert!(!stmt_is_partial("1 + ) {"));
    assert_eq!(stmt_error_codes("1 + ) {")[0], ErrorCode::UNEXPECTED_TOKEN);
}

#[test]
fn test_incomplete_declarations_are_partial() {
    assert!(decl_is_partial("class Foo {"));
    assert!(decl_is_partial("namespace N { class A { int F() { return"));
    assert!(decl_is_partial("using System"));
    assert!(decl_is_partial("public"));
    assert!(!decl_is_partial("class Foo { }"));
}

// ─────────────────────────────────────────────────────────────────────
// Declarations
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_using_directives() {
    let unit = unit("using System; using M = System.Math;");
    assert_eq!(unit.usings.len(), 2);
    assert!(unit.usings[0].alias.is_none());
    assert_eq!(unit.usings[0].target.to_string(), "System");
    assert_eq!(unit.usings[1].alias.as_ref().map(|a| a.name.as_str()), Some("M"));
    assert_eq!(unit.usings[1].target.to_string(), "System.Math");
    assert!(unit.members.is_empty());
}

#[test]
fn test_class_with_members() {
    let unit = unit(
        "public class Point : IShape {
            int x, y;
            static readonly int Origin = 0;
            public Point(int x, int y) { this.x = x; this.y = y; }
            public int Sum() { return x + y; }
            abstract void Draw();
            class Inner { }
        }",
    );
    let NamespaceMember::Type(ty) = &unit.members[0] else {
        panic!("expected type");
    };
    assert_eq!(ty.kind, TypeKind::Class);
    assert_eq!(ty.name.name, "Point");
    assert_eq!(ty.bases.len(), 1);
    assert!(has_modifier(&ty.modifiers, Modifier::Public));
    assert_eq!(ty.members.len(), 6);
    assert!(matches!(&ty.members[0], MemberDecl::Field(f) if f.declarators.len() == 2));
    assert!(matches!(&ty.members[1], MemberDecl::Field(f)
        if has_modifier(&f.modifiers, Modifier::Readonly)));
    assert!(matches!(&ty.members[2], MemberDecl::Constructor(c) if c.params.len() == 2));
    assert!(matches!(&ty.members[3], MemberDecl::Method(m) if m.body.is_some()));
    assert!(matches!(&ty.members[4], MemberDecl::Method(m) if m.body.is_none()));
    assert!(matches!(&ty.members[5], MemberDecl::NestedType(_)));
}

#[test]
fn test_namespace_nesting() {
    let unit = unit("namespace A.B { namespace C { struct S { } } interface I { void M(); } }");
    let NamespaceMember::Namespace(ns) = &unit.members[0] else {
        panic!("expected namespace");
    };
    assert_eq!(ns.name.to_string(), "A.B");
    assert_eq!(ns.members.len(), 2);
    assert!(matches!(&ns.members[0], NamespaceMember::Namespace(inner) if inner.name.to_string() == "C"));
    assert!(matches!(&ns.members[1], NamespaceMember::Type(t) if t.kind == TypeKind::Interface));
}

#[test]
fn test_enum_members() {
    let unit = unit("enum Color { Red, Green = 5, Blue, }");
    let NamespaceMember::Type(ty) = &unit.members[0] else {
        panic!("expected type");
    };
    assert_eq!(ty.kind, TypeKind::Enum);
    assert_eq!(ty.members.len(), 3);
    assert!(matches!(&ty.members[1], MemberDecl::EnumMember(m) if m.value.is_some()));
}

#[test]
fn test_attributes_are_parsed() {
    let unit = unit("[Serializable] [Obsolete(\"old\"), Other] class A { }");
    let NamespaceMember::Type(ty) = &unit.members[0] else {
        panic!("expected type");
    };
    let names: Vec<String> = ty.attributes.iter().map(|a| a.to_string()).collect();
    assert_eq!(names, vec!["Serializable", "Obsolete", "Other"]);
}

#[test]
fn test_member_without_type_keyword_is_error() {
    assert_eq!(
        decl_error_codes("public int x;"),
        vec![ErrorCode::UNEXPECTED_TOKEN]
    );
}

#[test]
fn test_unknown_character_reported_once() {
    assert_eq!(stmt_error_codes("1 + #"), vec![ErrorCode::INVALID_CHARACTER]);
}
