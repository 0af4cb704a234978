mod common;

use common::parse;
use librac::parser::ast::*;
use librac::span::{Span, Spanned};

const SURFACE_SAMPLE: &str = r#"const pi: f32 = 3.14
let name = "ada"
mut n: i32 = 0

fn add(a, b: i32): i32 { a + b }
fn (mut Counter) inc() { self.n += 1 }

struct Point { x, y: f32 }
struct Pair(i32, string)
struct Marker

interface Stringer { toString(): string }

type Handle = *mut i32
type Result = i32 | string!

enum Shape { Circle(f32), Rect{ w, h: f32 }, Point }

import { foo, bar } from "lib"
import * from "lib"
import "lib" as l
pub fn exported() {}
"#;

#[test]
fn surface_sample_parses_cleanly() {
    let (program, diagnostics) = parse(SURFACE_SAMPLE);
    assert_eq!(
        diagnostics.error_count(),
        0,
        "unexpected diagnostics: {:?}",
        diagnostics.diagnostics
    );
    assert_eq!(program.statements.len(), 16);
}

#[test]
fn statement_variety_in_sample() {
    let (program, _) = parse(SURFACE_SAMPLE);
    let count = |f: fn(&Stmt) -> bool| program.statements.iter().filter(|s| f(&s.node)).count();

    assert_eq!(count(|s| matches!(s, Stmt::VariableDeclaration { .. })), 3);
    assert_eq!(count(|s| matches!(s, Stmt::FunctionDeclaration(_))), 3);
    assert_eq!(count(|s| matches!(s, Stmt::StructDeclaration { .. })), 1);
    assert_eq!(count(|s| matches!(s, Stmt::TupleStructDeclaration { .. })), 1);
    assert_eq!(count(|s| matches!(s, Stmt::UnitStructDeclaration { .. })), 1);
    assert_eq!(count(|s| matches!(s, Stmt::InterfaceDeclaration { .. })), 1);
    assert_eq!(count(|s| matches!(s, Stmt::TypeDeclaration { .. })), 2);
    assert_eq!(count(|s| matches!(s, Stmt::EnumDeclaration { .. })), 1);
    assert_eq!(count(|s| matches!(s, Stmt::Import(_))), 3);
}

// Span containment: every child node's span lies inside its parent's.

fn assert_contains(parent: Span, child: Span, what: &str) {
    assert!(
        parent.contains(child),
        "{what}: child span {child:?} escapes parent {parent:?}"
    );
}

fn walk_stmt(stmt: &Spanned<Stmt>) {
    let span = stmt.span;
    match &stmt.node {
        Stmt::VariableDeclaration { name, ty, value, .. } => {
            assert_contains(span, name.span, "variable name");
            if let Some(ty) = ty {
                assert_contains(span, ty.span, "variable type");
            }
            if let Some(value) = value {
                assert_contains(span, value.span, "variable value");
                walk_expr(value);
            }
        }
        Stmt::FunctionDeclaration(decl) => {
            assert_contains(span, decl.name.span, "function name");
            for param in &decl.params {
                assert_contains(span, param.name.span, "parameter");
            }
            for inner in &decl.body {
                assert_contains(span, inner.span, "function body statement");
                walk_stmt(inner);
            }
        }
        Stmt::If(if_stmt) => walk_if(span, if_stmt),
        Stmt::While { condition, body } => {
            assert_contains(span, condition.span, "while condition");
            walk_expr(condition);
            for inner in body {
                assert_contains(span, inner.span, "while body statement");
                walk_stmt(inner);
            }
        }
        Stmt::For { variable, iterable, body } => {
            assert_contains(span, variable.span, "loop variable");
            assert_contains(span, iterable.span, "loop iterable");
            walk_expr(iterable);
            for inner in body {
                assert_contains(span, inner.span, "for body statement");
                walk_stmt(inner);
            }
        }
        Stmt::Return(Some(value)) => {
            assert_contains(span, value.span, "return value");
            walk_expr(value);
        }
        Stmt::Expression(expr) => {
            assert_contains(span, expr.span, "expression statement");
            walk_expr(expr);
        }
        _ => {}
    }
}

fn walk_if(span: Span, if_stmt: &IfStmt) {
    assert_contains(span, if_stmt.condition.span, "if condition");
    walk_expr(&if_stmt.condition);
    for inner in &if_stmt.body {
        assert_contains(span, inner.span, "if body statement");
        walk_stmt(inner);
    }
    if let Some(else_branch) = &if_stmt.else_branch {
        match else_branch.as_ref() {
            ElseBranch::Block(body) => {
                for inner in body {
                    assert_contains(span, inner.span, "else body statement");
                    walk_stmt(inner);
                }
            }
            ElseBranch::If(nested) => {
                assert_contains(span, nested.span, "else-if");
                walk_if(nested.span, &nested.node);
            }
        }
    }
}

fn walk_expr(expr: &Spanned<Expr>) {
    let span = expr.span;
    let check = |child: &Spanned<Expr>, what: &str| {
        assert_contains(span, child.span, what);
        walk_expr(child);
    };
    match &expr.node {
        Expr::Binary { left, right, .. } => {
            check(left, "binary left");
            check(right, "binary right");
        }
        Expr::Unary { operand, .. } => check(operand, "unary operand"),
        Expr::Assign { assignee, value, .. } => {
            check(assignee, "assignee");
            check(value, "assigned value");
        }
        Expr::Call { callee, args } => {
            check(callee, "callee");
            for arg in args {
                check(arg, "argument");
            }
        }
        Expr::Index { left, index } => {
            check(left, "indexed value");
            check(index, "index");
        }
        Expr::Member { left, .. } => check(left, "member receiver"),
        Expr::List(elements) => {
            for element in elements {
                check(element, "list element");
            }
        }
        Expr::Map(entries) => {
            for (key, value) in entries {
                check(key, "map key");
                check(value, "map value");
            }
        }
        Expr::Tuple(members) => {
            for member in members {
                check(member, "tuple member");
            }
        }
        Expr::StructLit { name, fields } => {
            check(name, "struct name");
            for (field_name, value) in fields {
                assert_contains(span, field_name.span, "struct field name");
                check(value, "struct field value");
            }
        }
        Expr::Cast { left, ty } | Expr::TypeCheck { left, ty } => {
            check(left, "cast value");
            assert_contains(span, ty.span, "cast type");
        }
        _ => {}
    }
}

#[test]
fn spans_nest_throughout_sample() {
    let (program, _) = parse(SURFACE_SAMPLE);
    for stmt in &program.statements {
        walk_stmt(stmt);
    }
}

#[test]
fn spans_nest_in_dense_expressions() {
    let sources = [
        "f(1 + 2)[a.b].c = !x || y && z ** 2",
        "let m = {1 + 1: [P { x: (1, 2).0 }]}",
        "if (P { ok: true }).ok { handle(a as f32) }",
    ];
    for src in sources {
        let (program, _) = parse(src);
        for stmt in &program.statements {
            walk_stmt(stmt);
        }
    }
}

#[test]
fn recovery_reports_and_continues_across_statements() {
    let src = "fn broken( { }\nlet ok = 1\nstruct Good { x: f32 }";
    let (program, diagnostics) = parse(src);
    assert!(diagnostics.has_errors());
    assert!(program
        .statements
        .iter()
        .any(|s| matches!(&s.node, Stmt::VariableDeclaration { name, .. } if name.node == "ok")));
    assert!(program
        .statements
        .iter()
        .any(|s| matches!(&s.node, Stmt::StructDeclaration { name, .. } if name.node == "Good")));
}
