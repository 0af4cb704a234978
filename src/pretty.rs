//! Render the AST back to surface syntax. Used by the `parse` CLI command,
//! diagnostics that quote expressions, and the parse round-trip tests.

use crate::parser::ast::*;
use crate::span::Spanned;

pub fn pretty_print(program: &Program) -> String {
    let mut out = String::new();
    for stmt in &program.statements {
        write_stmt(&mut out, &stmt.node, 0);
        out.push('\n');
    }
    out
}

pub fn expr_to_string(expr: &Spanned<Expr>) -> String {
    let mut out = String::new();
    write_expr(&mut out, &expr.node);
    out
}

pub fn type_to_string(ty: &Spanned<TypeExpr>) -> String {
    let mut out = String::new();
    write_type(&mut out, &ty.node);
    out
}

fn indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str("    ");
    }
}

fn write_block(out: &mut String, body: &[Spanned<Stmt>], level: usize) {
    out.push_str("{\n");
    for stmt in body {
        indent(out, level + 1);
        write_stmt(out, &stmt.node, level + 1);
        out.push('\n');
    }
    indent(out, level);
    out.push('}');
}

fn write_stmt(out: &mut String, stmt: &Stmt, level: usize) {
    if stmt.exported() {
        out.push_str("pub ");
    }
    match stmt {
        Stmt::VariableDeclaration { keyword, name, ty, value, .. } => {
            out.push_str(keyword.as_str());
            out.push(' ');
            out.push_str(&name.node);
            if let Some(ty) = ty {
                out.push_str(": ");
                write_type(out, &ty.node);
            }
            if let Some(value) = value {
                out.push_str(" = ");
                write_expr(out, &value.node);
            }
        }
        Stmt::FunctionDeclaration(decl) => {
            out.push_str("fn ");
            if let Some(receiver) = &decl.method_of {
                out.push('(');
                if receiver.mutable {
                    out.push_str("mut ");
                }
                write_type(out, &receiver.ty.node);
                out.push_str(") ");
            }
            if let Some(owner) = &decl.member_of {
                out.push_str(&owner.node);
                out.push('.');
            }
            out.push_str(&decl.name.node);
            out.push('(');
            for (i, param) in decl.params.iter().enumerate() {
                if i != 0 {
                    out.push_str(", ");
                }
                out.push_str(&param.name.node);
                out.push_str(": ");
                write_type(out, &param.ty.node);
            }
            out.push(')');
            if let Some(return_type) = &decl.return_type {
                out.push_str(": ");
                write_type(out, &return_type.node);
            }
            out.push(' ');
            write_block(out, &decl.body, level);
        }
        Stmt::If(if_stmt) => write_if(out, if_stmt, level),
        Stmt::While { condition, body } => {
            out.push_str("while ");
            write_expr(out, &condition.node);
            out.push(' ');
            write_block(out, body, level);
        }
        Stmt::For { variable, iterable, body } => {
            out.push_str("for ");
            out.push_str(&variable.node);
            out.push_str(" in ");
            write_expr(out, &iterable.node);
            out.push(' ');
            write_block(out, body, level);
        }
        Stmt::Return(value) => {
            out.push_str("return");
            if let Some(value) = value {
                out.push(' ');
                write_expr(out, &value.node);
            }
        }
        Stmt::TypeDeclaration { name, ty, .. } => {
            out.push_str("type ");
            out.push_str(&name.node);
            out.push_str(" = ");
            write_type(out, &ty.node);
        }
        Stmt::StructDeclaration { name, members, .. } => {
            out.push_str("struct ");
            out.push_str(&name.node);
            out.push_str(" { ");
            write_fields(out, members);
            out.push_str(" }");
        }
        Stmt::TupleStructDeclaration { name, members, .. } => {
            out.push_str("struct ");
            out.push_str(&name.node);
            out.push('(');
            for (i, member) in members.iter().enumerate() {
                if i != 0 {
                    out.push_str(", ");
                }
                write_type(out, &member.node);
            }
            out.push(')');
        }
        Stmt::UnitStructDeclaration { name, .. } => {
            out.push_str("struct ");
            out.push_str(&name.node);
        }
        Stmt::InterfaceDeclaration { name, members, .. } => {
            out.push_str("interface ");
            out.push_str(&name.node);
            out.push_str(" { ");
            for (i, member) in members.iter().enumerate() {
                if i != 0 {
                    out.push_str(", ");
                }
                out.push_str(&member.name.node);
                if let Some(params) = &member.params {
                    out.push('(');
                    for (j, param) in params.iter().enumerate() {
                        if j != 0 {
                            out.push_str(", ");
                        }
                        write_type(out, &param.node);
                    }
                    out.push(')');
                }
                out.push_str(": ");
                write_type(out, &member.result.node);
            }
            out.push_str(" }");
        }
        Stmt::EnumDeclaration { name, is_union, members, .. } => {
            out.push_str(if *is_union { "union " } else { "enum " });
            out.push_str(&name.node);
            out.push_str(" { ");
            for (i, member) in members.iter().enumerate() {
                if i != 0 {
                    out.push_str(", ");
                }
                if member.exported {
                    out.push_str("pub ");
                }
                out.push_str(&member.name.node);
                match &member.payload {
                    EnumPayload::Unit => {}
                    EnumPayload::Tuple(types) => {
                        out.push('(');
                        for (j, ty) in types.iter().enumerate() {
                            if j != 0 {
                                out.push_str(", ");
                            }
                            write_type(out, &ty.node);
                        }
                        out.push(')');
                    }
                    EnumPayload::Struct(fields) => {
                        out.push_str(" { ");
                        write_fields(out, fields);
                        out.push_str(" }");
                    }
                }
            }
            out.push_str(" }");
        }
        Stmt::Import(import) => {
            out.push_str("import ");
            if import.import_all {
                out.push_str("* from ");
            } else if let Some(symbols) = &import.symbols {
                out.push_str("{ ");
                for (i, symbol) in symbols.iter().enumerate() {
                    if i != 0 {
                        out.push_str(", ");
                    }
                    out.push_str(&symbol.node);
                }
                out.push_str(" } from ");
            }
            out.push('"');
            out.push_str(&import.module.node);
            out.push('"');
            if let Some(alias) = &import.alias {
                out.push_str(" as ");
                out.push_str(&alias.node);
            }
        }
        Stmt::Expression(expr) => write_expr(out, &expr.node),
        Stmt::Error => out.push_str("<error>"),
    }
}

fn write_if(out: &mut String, if_stmt: &IfStmt, level: usize) {
    out.push_str("if ");
    write_expr(out, &if_stmt.condition.node);
    out.push(' ');
    write_block(out, &if_stmt.body, level);
    if let Some(else_branch) = &if_stmt.else_branch {
        out.push_str(" else ");
        match else_branch.as_ref() {
            ElseBranch::Block(body) => write_block(out, body, level),
            ElseBranch::If(nested) => write_if(out, &nested.node, level),
        }
    }
}

fn write_fields(out: &mut String, fields: &[StructFieldDecl]) {
    for (i, field) in fields.iter().enumerate() {
        if i != 0 {
            out.push_str(", ");
        }
        if field.exported {
            out.push_str("pub ");
        }
        out.push_str(&field.name.node);
        out.push_str(": ");
        write_type(out, &field.ty.node);
    }
}

fn write_expr(out: &mut String, expr: &Expr) {
    match expr {
        Expr::IntLit(value) => out.push_str(&value.to_string()),
        Expr::FloatLit(value) => {
            let rendered = value.to_string();
            out.push_str(&rendered);
            if !rendered.contains('.') {
                out.push_str(".0");
            }
        }
        Expr::StringLit(value) => {
            out.push('"');
            for c in value.chars() {
                match c {
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\t' => out.push_str("\\t"),
                    '\\' => out.push_str("\\\\"),
                    '"' => out.push_str("\\\""),
                    '\0' => out.push_str("\\0"),
                    _ => out.push(c),
                }
            }
            out.push('"');
        }
        Expr::BoolLit(value) => out.push_str(if *value { "true" } else { "false" }),
        Expr::NullLit => out.push_str("null"),
        Expr::Ident(name) => out.push_str(name),
        Expr::Binary { left, op, right } => {
            out.push('(');
            write_expr(out, &left.node);
            out.push(' ');
            out.push_str(op);
            out.push(' ');
            write_expr(out, &right.node);
            out.push(')');
        }
        Expr::Unary { op, operand, postfix } => {
            if *postfix {
                write_expr(out, &operand.node);
                out.push_str(op);
            } else {
                out.push_str(op);
                write_expr(out, &operand.node);
            }
        }
        Expr::Assign { assignee, op, value } => {
            write_expr(out, &assignee.node);
            out.push(' ');
            out.push_str(op);
            out.push(' ');
            write_expr(out, &value.node);
        }
        Expr::Call { callee, args } => {
            write_expr(out, &callee.node);
            out.push('(');
            for (i, arg) in args.iter().enumerate() {
                if i != 0 {
                    out.push_str(", ");
                }
                write_expr(out, &arg.node);
            }
            out.push(')');
        }
        Expr::Index { left, index } => {
            write_expr(out, &left.node);
            out.push('[');
            write_expr(out, &index.node);
            out.push(']');
        }
        Expr::Member { left, member, .. } => {
            write_expr(out, &left.node);
            out.push('.');
            out.push_str(member);
        }
        Expr::List(elements) => {
            out.push('[');
            for (i, element) in elements.iter().enumerate() {
                if i != 0 {
                    out.push_str(", ");
                }
                write_expr(out, &element.node);
            }
            out.push(']');
        }
        Expr::Map(entries) => {
            out.push('{');
            for (i, (key, value)) in entries.iter().enumerate() {
                if i != 0 {
                    out.push_str(", ");
                }
                write_expr(out, &key.node);
                out.push_str(": ");
                write_expr(out, &value.node);
            }
            out.push('}');
        }
        Expr::Tuple(members) => {
            out.push('(');
            for (i, member) in members.iter().enumerate() {
                if i != 0 {
                    out.push_str(", ");
                }
                write_expr(out, &member.node);
            }
            out.push(')');
        }
        Expr::StructLit { name, fields } => {
            write_expr(out, &name.node);
            out.push_str(" { ");
            for (i, (field_name, value)) in fields.iter().enumerate() {
                if i != 0 {
                    out.push_str(", ");
                }
                out.push_str(&field_name.node);
                out.push_str(": ");
                write_expr(out, &value.node);
            }
            out.push_str(" }");
        }
        Expr::Cast { left, ty } => {
            write_expr(out, &left.node);
            out.push_str(" as ");
            write_type(out, &ty.node);
        }
        Expr::TypeCheck { left, ty } => {
            write_expr(out, &left.node);
            out.push_str(" is ");
            write_type(out, &ty.node);
        }
        Expr::Error => out.push_str("<error>"),
    }
}

fn write_type(out: &mut String, ty: &TypeExpr) {
    match ty {
        TypeExpr::Name(name) => out.push_str(name),
        TypeExpr::Member { left, member } => {
            write_type(out, &left.node);
            out.push('.');
            out.push_str(member);
        }
        TypeExpr::Union(members) => {
            for (i, member) in members.iter().enumerate() {
                if i != 0 {
                    out.push_str(" | ");
                }
                write_type(out, &member.node);
            }
        }
        TypeExpr::Option(inner) => {
            write_type(out, &inner.node);
            out.push('?');
        }
        TypeExpr::ErrorResult(inner) => {
            write_type(out, &inner.node);
            out.push('!');
        }
        TypeExpr::Array { element, length } => {
            write_type(out, &element.node);
            out.push('[');
            if let Some(length) = length {
                write_expr(out, &length.node);
            }
            out.push(']');
        }
        TypeExpr::Pointer { mutable, inner } => {
            out.push('*');
            if *mutable {
                out.push_str("mut ");
            }
            write_type(out, &inner.node);
        }
        TypeExpr::Void => out.push_str("void"),
        TypeExpr::Error => out.push_str("<error>"),
    }
}
