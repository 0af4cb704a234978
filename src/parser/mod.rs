pub mod ast;
mod expressions;
mod types;

use std::collections::HashMap;

use crate::diagnostics::DiagnosticManager;
use crate::lexer::token::{Token, TokenKind};
use crate::span::{Span, Spanned};
use ast::*;

/// Parse a token stream into an untyped AST.
///
/// Never fails: syntax problems are reported on the diagnostic manager and
/// the parser recovers with error nodes so later phases can still run.
pub fn parse(tokens: &[Token], diagnostics: &mut DiagnosticManager) -> Program {
    Parser::new(tokens, diagnostics).parse_program()
}

pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    diagnostics: &'a mut DiagnosticManager,
    /// Inside a control-flow header: a `{` ends the expression instead of
    /// starting a struct or map literal.
    no_braces: bool,
    /// Nesting depth inside `()` / `[]` / `{}` literals. Nonzero suspends
    /// newline-as-terminator.
    bracket_level: u32,
    /// Set after each statement; the next statement must be preceded by a
    /// newline or semicolon.
    require_newline: bool,
    /// Declared identifier names per scope, with their declaration spans.
    /// Used for the "keyword overwritten by variable" diagnostic.
    scopes: Vec<HashMap<String, Span>>,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token], diagnostics: &'a mut DiagnosticManager) -> Self {
        Self {
            tokens,
            pos: 0,
            diagnostics,
            no_braces: false,
            bracket_level: 0,
            require_newline: false,
            scopes: vec![HashMap::new()],
        }
    }

    // Cursor primitives

    pub(super) fn next(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub(super) fn consume(&mut self) -> Token {
        let token = self.next().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    pub(super) fn eof(&self) -> bool {
        self.next().kind == TokenKind::Eof
    }

    fn prev_span(&self) -> Span {
        if self.pos == 0 {
            self.next().span
        } else {
            self.tokens[self.pos - 1].span
        }
    }

    pub(super) fn is_kind(&self, kind: TokenKind) -> bool {
        self.next().kind == kind
    }

    /// Whether the next token may continue the current construct: inside
    /// brackets always, outside only when no newline intervenes.
    pub(super) fn can_continue(&self) -> bool {
        !self.eof() && (self.bracket_level > 0 || !self.next().leading_newline)
    }

    /// Contextual keyword test. A name declared as a variable in scope stops
    /// being a keyword.
    pub(super) fn is_keyword(&self, keyword: &str) -> bool {
        self.next().kind == TokenKind::Identifier
            && self.next().lexeme == keyword
            && self.keyword_decl_span(keyword).is_none()
    }

    fn keyword_decl_span(&self, name: &str) -> Option<Span> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name).copied())
    }

    pub(super) fn expect(&mut self, kind: TokenKind) -> Token {
        if self.next().kind == kind {
            return self.consume();
        }
        let found = self.next().clone();
        self.diagnostics.report_expected_token(kind, &found);
        Token::missing(kind, found.span)
    }

    pub(super) fn expect_keyword(&mut self, keyword: &str) -> Token {
        if self.is_keyword(keyword) {
            return self.consume();
        }
        let found = self.next().clone();
        if found.kind == TokenKind::Identifier && found.lexeme == keyword {
            let declared = self.keyword_decl_span(keyword).unwrap_or(found.span);
            self.diagnostics.report_keyword_overwritten(keyword, found.span, declared);
            // The token still reads as the keyword; consume it to make progress.
            return self.consume();
        }
        self.diagnostics.report_expected_keyword(keyword, &found);
        Token::missing(TokenKind::Identifier, found.span)
    }

    // Scope tracking

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &str, span: Span) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.entry(name.to_string()).or_insert(span);
        }
    }

    // Mode flags. Saved and restored around every sub-parse, on all paths.

    pub(super) fn with_no_braces<T>(&mut self, no_braces: bool, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = std::mem::replace(&mut self.no_braces, no_braces);
        let result = f(self);
        self.no_braces = saved;
        result
    }

    pub(super) fn with_bracket<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.bracket_level += 1;
        let result = f(self);
        self.bracket_level -= 1;
        result
    }

    pub(super) fn no_braces(&self) -> bool {
        self.no_braces
    }

    /// Parse a control-flow header expression: `{` terminates it, and
    /// newlines inside it do not end the statement.
    fn parse_condition(&mut self) -> Spanned<Expr> {
        self.with_no_braces(true, |p| p.with_bracket(|p| p.parse_expression()))
    }

    // Program and statements

    pub fn parse_program(&mut self) -> Program {
        let mut statements = Vec::new();

        while !self.eof() {
            let before = self.pos;
            statements.push(self.parse_statement());
            if self.pos == before {
                // The statement consumed nothing; skip a token so parsing
                // always terminates.
                self.consume();
            }
        }

        Program { statements }
    }

    fn parse_statement(&mut self) -> Spanned<Stmt> {
        if self.require_newline && !self.eof() {
            if self.is_kind(TokenKind::Semicolon) {
                while self.is_kind(TokenKind::Semicolon) {
                    self.consume();
                }
            } else if self.bracket_level == 0 && !self.next().leading_newline {
                let found = self.next().clone();
                self.diagnostics.report_expected_newline(&found);
            }
        }
        self.require_newline = false;

        let statement = self.dispatch_statement();
        self.require_newline = true;
        statement
    }

    fn dispatch_statement(&mut self) -> Spanned<Stmt> {
        let start = self.next().span;

        if self.is_keyword("let") || self.is_keyword("mut") || self.is_keyword("const") {
            self.parse_variable_declaration(start)
        } else if self.is_keyword("fn") {
            self.parse_function_declaration(start)
        } else if self.is_keyword("return") {
            self.parse_return_statement(start)
        } else if self.is_keyword("if") {
            let if_stmt = self.parse_if_statement();
            Spanned::new(Stmt::If(if_stmt), start.to(self.prev_span()))
        } else if self.is_keyword("else") {
            self.diagnostics.report_else_without_if(start);
            self.consume();
            // Consume the branch anyway so parsing can resume cleanly after it.
            if self.is_keyword("if") {
                self.parse_if_statement();
            } else if self.is_kind(TokenKind::LeftBrace) {
                self.parse_code_block();
            }
            Spanned::new(Stmt::Error, start.to(self.prev_span()))
        } else if self.is_keyword("while") {
            self.parse_while_loop(start)
        } else if self.is_keyword("for") {
            self.parse_for_loop(start)
        } else if self.is_keyword("struct") {
            self.parse_struct_declaration(start)
        } else if self.is_keyword("interface") {
            self.parse_interface_declaration(start)
        } else if self.is_keyword("type") {
            self.parse_type_declaration(start)
        } else if self.is_keyword("enum") || self.is_keyword("union") {
            self.parse_enum_declaration(start)
        } else if self.is_keyword("import") {
            self.parse_import_statement(start)
        } else if self.is_keyword("pub") {
            self.parse_export_statement(start)
        } else {
            let expression = self.parse_expression();
            let span = expression.span;
            Spanned::new(Stmt::Expression(expression), span)
        }
    }

    fn parse_variable_declaration(&mut self, start: Span) -> Spanned<Stmt> {
        let keyword_token = self.consume();
        let keyword = match keyword_token.lexeme.as_str() {
            "const" => DeclKeyword::Const,
            "mut" => DeclKeyword::Mut,
            _ => DeclKeyword::Let,
        };

        let name_token = self.expect(TokenKind::Identifier);
        let name = Spanned::new(name_token.lexeme.clone(), name_token.span);

        let ty = if self.can_continue() && self.is_kind(TokenKind::Colon) {
            self.consume();
            Some(self.parse_type())
        } else {
            None
        };

        let value = if self.can_continue() && self.is_kind(TokenKind::Equals) {
            self.consume();
            Some(self.parse_expression())
        } else {
            None
        };

        if value.is_none() {
            if keyword == DeclKeyword::Const {
                self.diagnostics.report_syntax(
                    format!("Cannot leave constant {:?} uninitialised", name.node),
                    name.span,
                );
            } else if ty.is_none() {
                self.diagnostics.report_syntax(
                    format!(
                        "Cannot declare uninitialised variable {:?} without type annotation",
                        name.node
                    ),
                    name.span,
                );
            }
        }

        // Registered after the initialiser so `let x = x` sees the outer x.
        if !name.node.is_empty() {
            self.declare(&name.node, name.span);
        }

        Spanned::new(
            Stmt::VariableDeclaration { keyword, name, ty, value, exported: false },
            start.to(self.prev_span()),
        )
    }

    fn parse_function_declaration(&mut self, start: Span) -> Spanned<Stmt> {
        self.consume();

        let method_of = if self.is_kind(TokenKind::LeftParen) {
            self.consume();
            let mutable = if self.is_keyword("mut") {
                self.consume();
                true
            } else {
                false
            };
            let ty = self.parse_type();
            self.expect(TokenKind::RightParen);
            Some(MethodReceiver { ty, mutable })
        } else {
            None
        };

        let mut name_token = self.expect(TokenKind::Identifier);
        let mut member_of = None;
        if self.is_kind(TokenKind::Dot) {
            self.consume();
            let real_name = self.expect(TokenKind::Identifier);
            member_of = Some(Spanned::new(name_token.lexeme.clone(), name_token.span));
            if method_of.is_some() {
                self.diagnostics.report_syntax(
                    "Cannot declare an associated member with a receiver",
                    name_token.span,
                );
            }
            name_token = real_name;
        }
        let name = Spanned::new(name_token.lexeme.clone(), name_token.span);
        if !name.node.is_empty() {
            self.declare(&name.node, name.span);
        }

        let params = self.parse_parameter_list();

        let return_type = if self.is_kind(TokenKind::Colon) {
            self.consume();
            Some(self.parse_type())
        } else {
            None
        };

        if !self.is_kind(TokenKind::LeftBrace) {
            let span = self.next().span;
            self.diagnostics.report_syntax("Expected type annotation or function body", span);
            return Spanned::new(
                Stmt::FunctionDeclaration(FunctionDecl {
                    name,
                    method_of,
                    member_of,
                    params,
                    return_type,
                    body: Vec::new(),
                    exported: false,
                }),
                start.to(self.prev_span()),
            );
        }

        self.push_scope();
        for param in &params {
            self.declare(&param.name.node, param.name.span);
        }
        if method_of.is_some() {
            self.declare("self", name.span);
        }
        let body = self.parse_block_inner();
        self.pop_scope();

        Spanned::new(
            Stmt::FunctionDeclaration(FunctionDecl {
                name,
                method_of,
                member_of,
                params,
                return_type,
                body,
                exported: false,
            }),
            start.to(self.prev_span()),
        )
    }

    /// Parse `(a, b: i32, c: string)`. A parameter without an annotation
    /// takes the type of the next annotated parameter to its right; the
    /// final parameter must carry one.
    fn parse_parameter_list(&mut self) -> Vec<Param> {
        self.expect(TokenKind::LeftParen);

        let mut raw: Vec<(Spanned<String>, Option<Spanned<TypeExpr>>)> = Vec::new();
        self.with_bracket(|p| {
            while !p.eof() && !p.is_kind(TokenKind::RightParen) {
                let name_token = p.expect(TokenKind::Identifier);
                if name_token.lexeme.is_empty() {
                    break;
                }
                let name = Spanned::new(name_token.lexeme.clone(), name_token.span);
                let ty = if p.is_kind(TokenKind::Colon) {
                    p.consume();
                    Some(p.parse_type())
                } else {
                    None
                };
                raw.push((name, ty));

                if !p.is_kind(TokenKind::RightParen) {
                    p.expect(TokenKind::Comma);
                }
            }
        });
        self.expect(TokenKind::RightParen);

        let mut params = Vec::with_capacity(raw.len());
        let mut pending: Option<Spanned<TypeExpr>> = None;
        for (name, ty) in raw.into_iter().rev() {
            let ty = match ty {
                Some(ty) => {
                    pending = Some(ty.clone());
                    ty
                }
                None => match pending.clone() {
                    Some(ty) => ty,
                    None => {
                        self.diagnostics.report_syntax(
                            format!("Expected type annotation for parameter {:?}", name.node),
                            name.span,
                        );
                        Spanned::new(TypeExpr::Error, name.span)
                    }
                },
            };
            params.push(Param { name, ty });
        }
        params.reverse();
        params
    }

    fn parse_if_statement(&mut self) -> IfStmt {
        self.consume();
        let condition = self.parse_condition();
        let body = self.parse_code_block();

        let else_branch = if self.is_keyword("else") {
            self.consume();
            if self.is_keyword("if") {
                let start = self.next().span;
                let nested = self.parse_if_statement();
                Some(Box::new(ElseBranch::If(Spanned::new(nested, start.to(self.prev_span())))))
            } else if self.is_kind(TokenKind::LeftBrace) {
                Some(Box::new(ElseBranch::Block(self.parse_code_block())))
            } else {
                let span = self.next().span;
                self.diagnostics.report_syntax("Expected block or if after else", span);
                None
            }
        } else {
            None
        };

        IfStmt { condition, body, else_branch }
    }

    fn parse_while_loop(&mut self, start: Span) -> Spanned<Stmt> {
        self.consume();
        let condition = self.parse_condition();
        let body = self.parse_code_block();
        Spanned::new(Stmt::While { condition, body }, start.to(self.prev_span()))
    }

    fn parse_for_loop(&mut self, start: Span) -> Spanned<Stmt> {
        self.consume();
        self.push_scope();

        let variable_token = self.expect(TokenKind::Identifier);
        let variable = Spanned::new(variable_token.lexeme.clone(), variable_token.span);
        if !variable.node.is_empty() {
            self.declare(&variable.node, variable.span);
        }

        self.expect_keyword("in");
        let iterable = self.parse_condition();
        let body = self.parse_code_block();

        self.pop_scope();
        Spanned::new(Stmt::For { variable, iterable, body }, start.to(self.prev_span()))
    }

    fn parse_return_statement(&mut self, start: Span) -> Spanned<Stmt> {
        self.consume();
        let value = if self.can_continue()
            && !self.is_kind(TokenKind::RightBrace)
            && !self.is_kind(TokenKind::Semicolon)
        {
            Some(self.parse_expression())
        } else {
            None
        };
        Spanned::new(Stmt::Return(value), start.to(self.prev_span()))
    }

    fn parse_struct_declaration(&mut self, start: Span) -> Spanned<Stmt> {
        self.consume();
        let name_token = self.expect(TokenKind::Identifier);
        let name = Spanned::new(name_token.lexeme.clone(), name_token.span);

        if !self.can_continue() {
            return Spanned::new(
                Stmt::UnitStructDeclaration { name, exported: false },
                start.to(self.prev_span()),
            );
        }

        if self.is_kind(TokenKind::LeftParen) {
            self.consume();
            let mut members = Vec::new();
            self.with_bracket(|p| {
                while !p.eof() && !p.is_kind(TokenKind::RightParen) {
                    let before = p.pos;
                    members.push(p.parse_type());
                    if !p.is_kind(TokenKind::RightParen) {
                        p.expect(TokenKind::Comma);
                    }
                    if p.pos == before {
                        p.consume();
                    }
                }
            });
            self.expect(TokenKind::RightParen);
            return Spanned::new(
                Stmt::TupleStructDeclaration { name, members, exported: false },
                start.to(self.prev_span()),
            );
        }

        if self.is_kind(TokenKind::LeftBrace) {
            let members = self.parse_struct_body();
            return Spanned::new(
                Stmt::StructDeclaration { name, members, exported: false },
                start.to(self.prev_span()),
            );
        }

        Spanned::new(
            Stmt::UnitStructDeclaration { name, exported: false },
            start.to(self.prev_span()),
        )
    }

    /// Parse `{ x, y: f32, pub z: i32 }`. Names grouped before one annotation
    /// all take that type.
    fn parse_struct_body(&mut self) -> Vec<StructFieldDecl> {
        self.expect(TokenKind::LeftBrace);
        let mut fields = Vec::new();

        self.with_bracket(|p| {
            while !p.eof() && !p.is_kind(TokenKind::RightBrace) {
                let exported = if p.is_keyword("pub") {
                    p.consume();
                    true
                } else {
                    false
                };

                let first = p.expect(TokenKind::Identifier);
                if first.lexeme.is_empty() {
                    break;
                }
                let mut names = vec![Spanned::new(first.lexeme.clone(), first.span)];
                while p.is_kind(TokenKind::Comma) {
                    p.consume();
                    let next = p.expect(TokenKind::Identifier);
                    if next.lexeme.is_empty() {
                        break;
                    }
                    names.push(Spanned::new(next.lexeme.clone(), next.span));
                }

                p.expect(TokenKind::Colon);
                let ty = p.parse_type();

                for name in names {
                    fields.push(StructFieldDecl { name, ty: ty.clone(), exported });
                }

                if !p.is_kind(TokenKind::RightBrace) {
                    p.expect(TokenKind::Comma);
                }
            }
        });

        self.expect(TokenKind::RightBrace);
        fields
    }

    fn parse_interface_declaration(&mut self, start: Span) -> Spanned<Stmt> {
        self.consume();
        let name_token = self.expect(TokenKind::Identifier);
        let name = Spanned::new(name_token.lexeme.clone(), name_token.span);

        self.expect(TokenKind::LeftBrace);
        let mut members = Vec::new();

        self.with_bracket(|p| {
            while !p.eof() && !p.is_kind(TokenKind::RightBrace) {
                let member_token = p.expect(TokenKind::Identifier);
                if member_token.lexeme.is_empty() {
                    break;
                }
                let member_name = Spanned::new(member_token.lexeme.clone(), member_token.span);

                let params = if p.is_kind(TokenKind::LeftParen) {
                    p.consume();
                    let mut list = Vec::new();
                    while !p.eof() && !p.is_kind(TokenKind::RightParen) {
                        let before = p.pos;
                        list.push(p.parse_type());
                        if !p.is_kind(TokenKind::RightParen) {
                            p.expect(TokenKind::Comma);
                        }
                        if p.pos == before {
                            p.consume();
                        }
                    }
                    p.expect(TokenKind::RightParen);
                    Some(list)
                } else {
                    None
                };

                p.expect(TokenKind::Colon);
                let result = p.parse_type();

                members.push(InterfaceMemberDecl { name: member_name, params, result });

                if !p.is_kind(TokenKind::RightBrace) {
                    p.expect(TokenKind::Comma);
                }
            }
        });

        self.expect(TokenKind::RightBrace);
        Spanned::new(
            Stmt::InterfaceDeclaration { name, members, exported: false },
            start.to(self.prev_span()),
        )
    }

    fn parse_type_declaration(&mut self, start: Span) -> Spanned<Stmt> {
        self.consume();
        let name_token = self.expect(TokenKind::Identifier);
        let name = Spanned::new(name_token.lexeme.clone(), name_token.span);
        self.expect(TokenKind::Equals);
        let ty = self.parse_type();
        Spanned::new(
            Stmt::TypeDeclaration { name, ty, exported: false },
            start.to(self.prev_span()),
        )
    }

    fn parse_enum_declaration(&mut self, start: Span) -> Spanned<Stmt> {
        let keyword = self.consume();
        let is_union = keyword.lexeme == "union";

        let name_token = self.expect(TokenKind::Identifier);
        let name = Spanned::new(name_token.lexeme.clone(), name_token.span);

        self.expect(TokenKind::LeftBrace);
        let mut members = Vec::new();

        self.with_bracket(|p| {
            while !p.eof() && !p.is_kind(TokenKind::RightBrace) {
                let exported = if p.is_keyword("pub") {
                    p.consume();
                    true
                } else {
                    false
                };

                let member_token = p.expect(TokenKind::Identifier);
                if member_token.lexeme.is_empty() {
                    break;
                }
                let member_name = Spanned::new(member_token.lexeme.clone(), member_token.span);

                let payload = if p.is_kind(TokenKind::LeftParen) {
                    p.consume();
                    let mut types = Vec::new();
                    while !p.eof() && !p.is_kind(TokenKind::RightParen) {
                        let before = p.pos;
                        types.push(p.parse_type());
                        if !p.is_kind(TokenKind::RightParen) {
                            p.expect(TokenKind::Comma);
                        }
                        if p.pos == before {
                            p.consume();
                        }
                    }
                    p.expect(TokenKind::RightParen);
                    EnumPayload::Tuple(types)
                } else if p.is_kind(TokenKind::LeftBrace) {
                    EnumPayload::Struct(p.parse_struct_body())
                } else {
                    EnumPayload::Unit
                };

                members.push(EnumMemberDecl { name: member_name, exported, payload });

                if !p.is_kind(TokenKind::RightBrace) {
                    p.expect(TokenKind::Comma);
                }
            }
        });

        self.expect(TokenKind::RightBrace);
        Spanned::new(
            Stmt::EnumDeclaration { name, is_union, members, exported: false },
            start.to(self.prev_span()),
        )
    }

    fn parse_import_statement(&mut self, start: Span) -> Spanned<Stmt> {
        self.consume();

        let mut import_all = false;
        let mut symbols = None;

        if self.is_kind(TokenKind::Star) {
            self.consume();
            import_all = true;
            self.expect_keyword("from");
        } else if self.is_kind(TokenKind::LeftBrace) {
            self.consume();
            let mut list = Vec::new();
            while !self.eof() && !self.is_kind(TokenKind::RightBrace) {
                let symbol = self.expect(TokenKind::Identifier);
                if symbol.lexeme.is_empty() {
                    break;
                }
                list.push(Spanned::new(symbol.lexeme.clone(), symbol.span));
                if !self.is_kind(TokenKind::RightBrace) {
                    self.expect(TokenKind::Comma);
                }
            }
            self.expect(TokenKind::RightBrace);
            symbols = Some(list);
            self.expect_keyword("from");
        }

        let module_token = self.expect(TokenKind::String);
        let module = Spanned::new(module_token.lexeme.clone(), module_token.span);

        let alias = if self.is_keyword("as") {
            let as_span = self.next().span;
            if import_all {
                self.diagnostics.report_syntax(
                    "Cannot use alias import in conjunction with importing all symbols",
                    as_span,
                );
            } else if symbols.is_some() {
                self.diagnostics.report_syntax(
                    "Cannot use alias import in conjunction with listing imported symbols",
                    as_span,
                );
            }
            self.consume();
            let alias_token = self.expect(TokenKind::Identifier);
            Some(Spanned::new(alias_token.lexeme.clone(), alias_token.span))
        } else {
            None
        };

        Spanned::new(
            Stmt::Import(ImportStmt { module, import_all, symbols, alias }),
            start.to(self.prev_span()),
        )
    }

    fn parse_export_statement(&mut self, start: Span) -> Spanned<Stmt> {
        self.consume();

        let mut statement = self.dispatch_statement();

        if statement.node.exported() {
            self.diagnostics.report_double_export(statement.span);
        } else if !statement.node.is_exportable() {
            if !matches!(statement.node, Stmt::Error) {
                self.diagnostics.report_cannot_export(statement.span);
            }
        } else {
            statement.node.mark_exported();
        }

        statement.span = start.to(statement.span);
        statement
    }

    // Blocks

    /// Parse `{ ... }` in a fresh scope.
    pub(super) fn parse_code_block(&mut self) -> Vec<Spanned<Stmt>> {
        self.push_scope();
        let statements = self.parse_block_inner();
        self.pop_scope();
        statements
    }

    /// Parse `{ ... }` without pushing a scope (the caller already did, e.g.
    /// to make function parameters visible).
    fn parse_block_inner(&mut self) -> Vec<Spanned<Stmt>> {
        self.expect(TokenKind::LeftBrace);
        let saved_require = std::mem::replace(&mut self.require_newline, false);

        let mut statements = Vec::new();
        while !self.eof() && !self.is_kind(TokenKind::RightBrace) {
            let before = self.pos;
            statements.push(self.parse_statement());
            if self.pos == before {
                self.consume();
            }
        }

        self.expect(TokenKind::RightBrace);
        self.require_newline = saved_require;
        statements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer;

    fn parse_src(src: &str) -> (Program, DiagnosticManager) {
        let mut diagnostics = DiagnosticManager::new();
        diagnostics.add_file("test.lb", src);
        let tokens = lexer::lex(src, 0, &mut diagnostics);
        let program = parse(&tokens, &mut diagnostics);
        (program, diagnostics)
    }

    fn parse_clean(src: &str) -> Program {
        let (program, diagnostics) = parse_src(src);
        assert_eq!(
            diagnostics.error_count(),
            0,
            "unexpected diagnostics: {:?}",
            diagnostics.diagnostics
        );
        program
    }

    fn single(program: &Program) -> &Stmt {
        assert_eq!(program.statements.len(), 1, "expected one statement: {program:?}");
        &program.statements[0].node
    }

    #[test]
    fn variable_declarations() {
        let cases = [
            ("let x = 1", DeclKeyword::Let, "x", false, true),
            ("mut y: f32 = 7", DeclKeyword::Mut, "y", true, true),
            ("const message: string = \"Hi\"", DeclKeyword::Const, "message", true, true),
            ("mut isCool = true", DeclKeyword::Mut, "isCool", false, true),
            ("let empty: i32", DeclKeyword::Let, "empty", true, false),
        ];

        for (src, expect_kw, expect_name, has_ty, has_value) in cases {
            let program = parse_clean(src);
            match single(&program) {
                Stmt::VariableDeclaration { keyword, name, ty, value, .. } => {
                    assert_eq!(*keyword, expect_kw);
                    assert_eq!(name.node, expect_name);
                    assert_eq!(ty.is_some(), has_ty, "{src}");
                    assert_eq!(value.is_some(), has_value, "{src}");
                }
                other => panic!("expected variable declaration, got {other:?}"),
            }
        }
    }

    #[test]
    fn uninitialised_const_reported() {
        let (_, diagnostics) = parse_src("const x: i32");
        assert_eq!(diagnostics.error_count(), 1);
        assert!(diagnostics.diagnostics[0].message.contains("uninitialised"));
    }

    #[test]
    fn uninitialised_untyped_let_reported() {
        let (_, diagnostics) = parse_src("let x");
        assert_eq!(diagnostics.error_count(), 1);
        assert!(diagnostics.diagnostics[0].message.contains("without type annotation"));
    }

    #[test]
    fn function_declaration_with_grouped_params() {
        let program = parse_clean("fn add(a, b: i32): i32 { return a + b }");
        match single(&program) {
            Stmt::FunctionDeclaration(decl) => {
                assert_eq!(decl.name.node, "add");
                assert_eq!(decl.params.len(), 2);
                assert_eq!(decl.params[0].name.node, "a");
                assert_eq!(decl.params[0].ty.node, TypeExpr::Name("i32".into()));
                assert_eq!(decl.params[1].ty.node, TypeExpr::Name("i32".into()));
                assert!(decl.return_type.is_some());
                assert!(decl.method_of.is_none());
                assert_eq!(decl.body.len(), 1);
            }
            other => panic!("expected function declaration, got {other:?}"),
        }
    }

    #[test]
    fn method_declaration_with_mut_receiver() {
        let program = parse_clean("fn (mut Counter) inc() { self.n += 1 }");
        match single(&program) {
            Stmt::FunctionDeclaration(decl) => {
                let receiver = decl.method_of.as_ref().expect("expected receiver");
                assert!(receiver.mutable);
                assert_eq!(receiver.ty.node, TypeExpr::Name("Counter".into()));
                assert_eq!(decl.name.node, "inc");
            }
            other => panic!("expected function declaration, got {other:?}"),
        }
    }

    #[test]
    fn associated_member_declaration() {
        let program = parse_clean("fn Point.origin(): Point { return Point { x: 0.0, y: 0.0 } }");
        match single(&program) {
            Stmt::FunctionDeclaration(decl) => {
                assert_eq!(decl.member_of.as_ref().unwrap().node, "Point");
                assert_eq!(decl.name.node, "origin");
            }
            other => panic!("expected function declaration, got {other:?}"),
        }
    }

    #[test]
    fn missing_final_param_type_reported() {
        let (_, diagnostics) = parse_src("fn f(a) {}");
        assert_eq!(diagnostics.error_count(), 1);
        assert!(diagnostics.diagnostics[0].message.contains("type annotation"));
    }

    #[test]
    fn missing_function_body_reported_once() {
        let (program, diagnostics) = parse_src("fn f(): i32");
        assert_eq!(diagnostics.error_count(), 1, "{:?}", diagnostics.diagnostics);
        assert!(diagnostics.diagnostics[0].message.contains("function body"));
        match single(&program) {
            Stmt::FunctionDeclaration(decl) => assert!(decl.body.is_empty()),
            other => panic!("expected function declaration, got {other:?}"),
        }
    }

    #[test]
    fn missing_function_body_recovers_to_next_statement() {
        let (program, diagnostics) = parse_src("fn f(): i32\nlet x = 1");
        assert_eq!(diagnostics.error_count(), 1, "{:?}", diagnostics.diagnostics);
        assert_eq!(program.statements.len(), 2);
        assert!(matches!(
            program.statements[1].node,
            Stmt::VariableDeclaration { .. }
        ));
    }

    #[test]
    fn struct_declaration_forms() {
        let program = parse_clean("struct Point { x, y: f32 }");
        match single(&program) {
            Stmt::StructDeclaration { name, members, .. } => {
                assert_eq!(name.node, "Point");
                assert_eq!(members.len(), 2);
                assert_eq!(members[0].name.node, "x");
                assert_eq!(members[1].name.node, "y");
                assert_eq!(members[0].ty.node, TypeExpr::Name("f32".into()));
            }
            other => panic!("expected struct declaration, got {other:?}"),
        }

        let program = parse_clean("struct Pair(i32, string)");
        match single(&program) {
            Stmt::TupleStructDeclaration { name, members, .. } => {
                assert_eq!(name.node, "Pair");
                assert_eq!(members.len(), 2);
            }
            other => panic!("expected tuple struct declaration, got {other:?}"),
        }

        let program = parse_clean("struct Marker");
        assert!(matches!(single(&program), Stmt::UnitStructDeclaration { .. }));
    }

    #[test]
    fn unit_struct_followed_by_statement() {
        let program = parse_clean("struct Marker\nlet x = 1");
        assert_eq!(program.statements.len(), 2);
        assert!(matches!(program.statements[0].node, Stmt::UnitStructDeclaration { .. }));
    }

    #[test]
    fn interface_declaration() {
        let program = parse_clean("interface Stringer { toString(): string }");
        match single(&program) {
            Stmt::InterfaceDeclaration { name, members, .. } => {
                assert_eq!(name.node, "Stringer");
                assert_eq!(members.len(), 1);
                assert_eq!(members[0].name.node, "toString");
                assert_eq!(members[0].params.as_ref().unwrap().len(), 0);
            }
            other => panic!("expected interface declaration, got {other:?}"),
        }
    }

    #[test]
    fn enum_declaration_all_payloads() {
        let program = parse_clean("enum Shape { Circle(f32), Rect { w, h: f32 }, Point }");
        match single(&program) {
            Stmt::EnumDeclaration { name, is_union, members, .. } => {
                assert_eq!(name.node, "Shape");
                assert!(!is_union);
                assert_eq!(members.len(), 3);
                assert!(matches!(members[0].payload, EnumPayload::Tuple(ref t) if t.len() == 1));
                assert!(matches!(members[1].payload, EnumPayload::Struct(ref f) if f.len() == 2));
                assert!(matches!(members[2].payload, EnumPayload::Unit));
            }
            other => panic!("expected enum declaration, got {other:?}"),
        }
    }

    #[test]
    fn union_declaration() {
        let program = parse_clean("union Value { A, B(i32) }");
        assert!(matches!(single(&program), Stmt::EnumDeclaration { is_union: true, .. }));
    }

    #[test]
    fn import_forms() {
        let program = parse_clean("import \"lib\"");
        match single(&program) {
            Stmt::Import(import) => {
                assert_eq!(import.module.node, "lib");
                assert!(!import.import_all);
                assert!(import.symbols.is_none());
                assert!(import.alias.is_none());
            }
            other => panic!("expected import, got {other:?}"),
        }

        let program = parse_clean("import * from \"lib\"");
        assert!(matches!(single(&program), Stmt::Import(ImportStmt { import_all: true, .. })));

        let program = parse_clean("import { foo, bar } from \"lib\"");
        match single(&program) {
            Stmt::Import(import) => {
                let symbols = import.symbols.as_ref().unwrap();
                assert_eq!(symbols.len(), 2);
                assert_eq!(symbols[0].node, "foo");
            }
            other => panic!("expected import, got {other:?}"),
        }

        let program = parse_clean("import \"lib\" as l");
        match single(&program) {
            Stmt::Import(import) => assert_eq!(import.alias.as_ref().unwrap().node, "l"),
            other => panic!("expected import, got {other:?}"),
        }
    }

    #[test]
    fn alias_with_import_all_reported() {
        let (_, diagnostics) = parse_src("import * from \"lib\" as l");
        assert_eq!(diagnostics.error_count(), 1);
        assert!(diagnostics.diagnostics[0].message.contains("alias"));
    }

    #[test]
    fn export_marks_statement() {
        let program = parse_clean("pub fn exported() {}");
        match single(&program) {
            Stmt::FunctionDeclaration(decl) => assert!(decl.exported),
            other => panic!("expected function declaration, got {other:?}"),
        }
    }

    #[test]
    fn double_export_reported() {
        let (_, diagnostics) = parse_src("pub pub fn f() {}");
        assert_eq!(diagnostics.error_count(), 1);
        assert!(diagnostics.diagnostics[0].message.contains("double-export"));
    }

    #[test]
    fn export_non_exportable_reported() {
        let (_, diagnostics) = parse_src("pub return 1");
        assert_eq!(diagnostics.error_count(), 1);
        assert!(diagnostics.diagnostics[0].message.contains("Cannot export"));
    }

    #[test]
    fn else_without_if_recovers() {
        let (program, diagnostics) = parse_src("else { 1 }\nlet x = 2");
        assert!(diagnostics
            .diagnostics
            .iter()
            .any(|d| d.message.contains("without preceding if")));
        // The branch is consumed and parsing resumes at the next statement.
        assert!(matches!(
            program.statements.last().unwrap().node,
            Stmt::VariableDeclaration { .. }
        ));
    }

    #[test]
    fn if_else_if_chain() {
        let program = parse_clean("if a { 1 } else if b { 2 } else { 3 }");
        match single(&program) {
            Stmt::If(if_stmt) => {
                let else_branch = if_stmt.else_branch.as_ref().unwrap();
                match else_branch.as_ref() {
                    ElseBranch::If(nested) => {
                        assert!(nested.node.else_branch.is_some());
                    }
                    other => panic!("expected else-if, got {other:?}"),
                }
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn for_loop_iterator_form() {
        let program = parse_clean("for item in items { item }");
        match single(&program) {
            Stmt::For { variable, .. } => assert_eq!(variable.node, "item"),
            other => panic!("expected for loop, got {other:?}"),
        }
    }

    #[test]
    fn missing_newline_between_statements_reported() {
        let (program, diagnostics) = parse_src("let a = 1 let b = 2");
        assert_eq!(diagnostics.error_count(), 1);
        assert!(diagnostics.diagnostics[0].message.contains("Expected newline"));
        assert_eq!(program.statements.len(), 2);
    }

    #[test]
    fn semicolon_terminates_statement() {
        let program = parse_clean("let a = 1; let b = 2");
        assert_eq!(program.statements.len(), 2);
    }

    #[test]
    fn keyword_overwritten_by_variable() {
        let (_, diagnostics) = parse_src("let in = 1\nfor x in xs { x }");
        assert!(diagnostics
            .diagnostics
            .iter()
            .any(|d| d.message.contains("overwritten by a variable")));
        assert!(diagnostics
            .diagnostics
            .iter()
            .any(|d| d.message.contains("removing or renaming")));
    }

    #[test]
    fn scope_restored_after_block() {
        // `in` declared inside the function body does not leak out.
        let program = parse_clean("fn f() { let in = 1 }\nfor x in xs { x }");
        assert_eq!(program.statements.len(), 2);
        assert!(matches!(program.statements[1].node, Stmt::For { .. }));
    }

    #[test]
    fn statement_spans_nest() {
        let program = parse_clean("let x = 1 + 2");
        let stmt = &program.statements[0];
        match &stmt.node {
            Stmt::VariableDeclaration { value: Some(value), .. } => {
                assert!(stmt.span.contains(value.span));
                match &value.node {
                    Expr::Binary { left, right, .. } => {
                        assert!(value.span.contains(left.span));
                        assert!(value.span.contains(right.span));
                    }
                    other => panic!("expected binary, got {other:?}"),
                }
            }
            other => panic!("expected variable declaration, got {other:?}"),
        }
    }
}
