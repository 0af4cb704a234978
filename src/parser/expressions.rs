use super::ast::*;
use super::Parser;
use crate::lexer::token::TokenKind;
use crate::span::Spanned;

impl Parser<'_> {
    pub(super) fn parse_expression(&mut self) -> Spanned<Expr> {
        self.parse_assignment_expression()
    }

    /// `a = b = c` associates rightward. The assignee is validated as an
    /// l-value by the type checker, not here.
    fn parse_assignment_expression(&mut self) -> Spanned<Expr> {
        let assignee = self.parse_logical_expression();

        if !self.can_continue()
            || !(self.is_kind(TokenKind::Equals) || self.is_kind(TokenKind::Assignment))
        {
            return assignee;
        }

        let op = self.consume().lexeme;
        let value = self.parse_assignment_expression();
        let span = assignee.span.to(value.span);

        Spanned::new(
            Expr::Assign { assignee: Box::new(assignee), op, value: Box::new(value) },
            span,
        )
    }

    fn parse_logical_expression(&mut self) -> Spanned<Expr> {
        let mut left = self.parse_comparison_expression();

        while self.can_continue() && self.is_kind(TokenKind::Logical) {
            let op = self.consume().lexeme;
            let right = self.parse_comparison_expression();
            let span = left.span.to(right.span);
            left = Spanned::new(
                Expr::Binary { left: Box::new(left), op, right: Box::new(right) },
                span,
            );
        }

        left
    }

    fn parse_comparison_expression(&mut self) -> Spanned<Expr> {
        let mut left = self.parse_additive_expression();

        while self.can_continue() && self.is_kind(TokenKind::Comparison) {
            let op = self.consume().lexeme;
            let right = self.parse_additive_expression();
            let span = left.span.to(right.span);
            left = Spanned::new(
                Expr::Binary { left: Box::new(left), op, right: Box::new(right) },
                span,
            );
        }

        left
    }

    fn parse_additive_expression(&mut self) -> Spanned<Expr> {
        let mut left = self.parse_multiplicative_expression();

        while self.can_continue() && self.is_kind(TokenKind::Additive) {
            let op = self.consume().lexeme;
            let right = self.parse_multiplicative_expression();
            let span = left.span.to(right.span);
            left = Spanned::new(
                Expr::Binary { left: Box::new(left), op, right: Box::new(right) },
                span,
            );
        }

        left
    }

    fn parse_multiplicative_expression(&mut self) -> Spanned<Expr> {
        let mut left = self.parse_exponential_expression();

        while self.can_continue()
            && (self.is_kind(TokenKind::Multiplicative) || self.is_kind(TokenKind::Star))
        {
            let op = self.consume().lexeme;
            let right = self.parse_exponential_expression();
            let span = left.span.to(right.span);
            left = Spanned::new(
                Expr::Binary { left: Box::new(left), op, right: Box::new(right) },
                span,
            );
        }

        left
    }

    /// `a ** b ** c` associates rightward.
    fn parse_exponential_expression(&mut self) -> Spanned<Expr> {
        let left = self.parse_prefix_expression();

        if self.can_continue() && self.is_kind(TokenKind::Exponential) {
            let op = self.consume().lexeme;
            let right = self.parse_exponential_expression();
            let span = left.span.to(right.span);
            return Spanned::new(
                Expr::Binary { left: Box::new(left), op, right: Box::new(right) },
                span,
            );
        }

        left
    }

    fn parse_prefix_expression(&mut self) -> Spanned<Expr> {
        let is_prefix_op = self.is_kind(TokenKind::Bang)
            || self.is_kind(TokenKind::Additive)
            || self.is_kind(TokenKind::Postfix);

        if is_prefix_op {
            let op_token = self.consume();
            let operand = self.parse_prefix_expression();
            let span = op_token.span.to(operand.span);
            return Spanned::new(
                Expr::Unary { op: op_token.lexeme, operand: Box::new(operand), postfix: false },
                span,
            );
        }

        self.parse_postfix_expression()
    }

    fn parse_postfix_expression(&mut self) -> Spanned<Expr> {
        let mut left = self.parse_primary_expression();

        loop {
            if !self.can_continue() {
                break;
            }

            match self.next().kind {
                TokenKind::LeftParen => {
                    self.consume();
                    let mut args = Vec::new();
                    self.with_no_braces(false, |p| {
                        p.with_bracket(|p| {
                            while !p.eof() && !p.is_kind(TokenKind::RightParen) {
                                let before = p.pos;
                                args.push(p.parse_expression());
                                if !p.is_kind(TokenKind::RightParen) {
                                    p.expect(TokenKind::Comma);
                                }
                                if p.pos == before {
                                    p.consume();
                                }
                            }
                        })
                    });
                    let close = self.expect(TokenKind::RightParen);
                    let span = left.span.to(close.span);
                    left = Spanned::new(Expr::Call { callee: Box::new(left), args }, span);
                }
                TokenKind::LeftSquare => {
                    self.consume();
                    let index = self.with_no_braces(false, |p| {
                        p.with_bracket(|p| p.parse_expression())
                    });
                    let close = self.expect(TokenKind::RightSquare);
                    let span = left.span.to(close.span);
                    left = Spanned::new(
                        Expr::Index { left: Box::new(left), index: Box::new(index) },
                        span,
                    );
                }
                TokenKind::Dot => {
                    self.consume();
                    if self.is_kind(TokenKind::Integer) {
                        let member = self.consume();
                        let span = left.span.to(member.span);
                        left = Spanned::new(
                            Expr::Member {
                                left: Box::new(left),
                                member: member.lexeme,
                                number_member: true,
                            },
                            span,
                        );
                    } else {
                        let member = self.expect(TokenKind::Identifier);
                        let span = left.span.to(member.span);
                        left = Spanned::new(
                            Expr::Member {
                                left: Box::new(left),
                                member: member.lexeme,
                                number_member: false,
                            },
                            span,
                        );
                    }
                }
                TokenKind::Postfix => {
                    let op_token = self.consume();
                    let span = left.span.to(op_token.span);
                    left = Spanned::new(
                        Expr::Unary { op: op_token.lexeme, operand: Box::new(left), postfix: true },
                        span,
                    );
                }
                TokenKind::LeftBrace if !self.no_braces() && is_struct_name(&left) => {
                    left = self.parse_struct_literal(left);
                }
                TokenKind::Identifier if self.is_keyword("as") => {
                    self.consume();
                    let ty = self.parse_type();
                    let span = left.span.to(ty.span);
                    left = Spanned::new(Expr::Cast { left: Box::new(left), ty }, span);
                }
                TokenKind::Identifier if self.is_keyword("is") => {
                    self.consume();
                    let ty = self.parse_type();
                    let span = left.span.to(ty.span);
                    left = Spanned::new(Expr::TypeCheck { left: Box::new(left), ty }, span);
                }
                _ => break,
            }
        }

        left
    }

    fn parse_struct_literal(&mut self, name: Spanned<Expr>) -> Spanned<Expr> {
        self.consume();
        let mut fields = Vec::new();

        self.with_no_braces(false, |p| {
            p.with_bracket(|p| {
                while !p.eof() && !p.is_kind(TokenKind::RightBrace) {
                    let field_token = p.expect(TokenKind::Identifier);
                    if field_token.lexeme.is_empty() {
                        break;
                    }
                    let field_name = Spanned::new(field_token.lexeme.clone(), field_token.span);
                    p.expect(TokenKind::Colon);
                    let value = p.parse_expression();
                    fields.push((field_name, value));

                    if !p.is_kind(TokenKind::RightBrace) {
                        p.expect(TokenKind::Comma);
                    }
                }
            })
        });

        let close = self.expect(TokenKind::RightBrace);
        let span = name.span.to(close.span);
        Spanned::new(Expr::StructLit { name: Box::new(name), fields }, span)
    }

    fn parse_primary_expression(&mut self) -> Spanned<Expr> {
        match self.next().kind {
            TokenKind::Integer => {
                let token = self.consume();
                let value = match token.lexeme.replace('_', "").parse::<i64>() {
                    Ok(value) => value,
                    Err(_) => {
                        self.diagnostics.report_integer_out_of_range(token.span);
                        0
                    }
                };
                Spanned::new(Expr::IntLit(value), token.span)
            }
            TokenKind::Float => {
                let token = self.consume();
                let value = token.lexeme.replace('_', "").parse::<f64>().unwrap_or(0.0);
                Spanned::new(Expr::FloatLit(value), token.span)
            }
            TokenKind::String => {
                let token = self.consume();
                Spanned::new(Expr::StringLit(token.lexeme), token.span)
            }
            TokenKind::Identifier => {
                if self.is_keyword("true") {
                    let token = self.consume();
                    Spanned::new(Expr::BoolLit(true), token.span)
                } else if self.is_keyword("false") {
                    let token = self.consume();
                    Spanned::new(Expr::BoolLit(false), token.span)
                } else if self.is_keyword("null") {
                    let token = self.consume();
                    Spanned::new(Expr::NullLit, token.span)
                } else {
                    let token = self.consume();
                    Spanned::new(Expr::Ident(token.lexeme), token.span)
                }
            }
            TokenKind::LeftParen => {
                let open = self.consume();
                self.with_no_braces(false, |p| {
                    p.with_bracket(|p| {
                        if p.is_kind(TokenKind::RightParen) {
                            let close = p.consume();
                            return Spanned::new(Expr::Tuple(Vec::new()), open.span.to(close.span));
                        }

                        let first = p.parse_expression();

                        if p.is_kind(TokenKind::Comma) {
                            let mut members = vec![first];
                            while p.is_kind(TokenKind::Comma) {
                                p.consume();
                                if p.is_kind(TokenKind::RightParen) {
                                    break;
                                }
                                members.push(p.parse_expression());
                            }
                            let close = p.expect(TokenKind::RightParen);
                            return Spanned::new(Expr::Tuple(members), open.span.to(close.span));
                        }

                        let close = p.expect(TokenKind::RightParen);
                        Spanned::new(first.node, open.span.to(close.span))
                    })
                })
            }
            TokenKind::LeftSquare => {
                let open = self.consume();
                let mut elements = Vec::new();
                self.with_no_braces(false, |p| {
                    p.with_bracket(|p| {
                        while !p.eof() && !p.is_kind(TokenKind::RightSquare) {
                            let before = p.pos;
                            elements.push(p.parse_expression());
                            if !p.is_kind(TokenKind::RightSquare) {
                                p.expect(TokenKind::Comma);
                            }
                            if p.pos == before {
                                p.consume();
                            }
                        }
                    })
                });
                let close = self.expect(TokenKind::RightSquare);
                Spanned::new(Expr::List(elements), open.span.to(close.span))
            }
            TokenKind::LeftBrace if !self.no_braces() => {
                let open = self.consume();
                let mut entries = Vec::new();
                self.with_bracket(|p| {
                    while !p.eof() && !p.is_kind(TokenKind::RightBrace) {
                        let before = p.pos;
                        let key = p.parse_expression();
                        p.expect(TokenKind::Colon);
                        let value = p.parse_expression();
                        entries.push((key, value));
                        if !p.is_kind(TokenKind::RightBrace) {
                            p.expect(TokenKind::Comma);
                        }
                        if p.pos == before {
                            p.consume();
                        }
                    }
                });
                let close = self.expect(TokenKind::RightBrace);
                Spanned::new(Expr::Map(entries), open.span.to(close.span))
            }
            _ => {
                let found = self.next().clone();
                self.diagnostics.report_expected_expression(&found);
                // Structural tokens stay put so the enclosing construct can
                // resynchronise on them.
                if !matches!(
                    found.kind,
                    TokenKind::Eof
                        | TokenKind::RightBrace
                        | TokenKind::RightParen
                        | TokenKind::RightSquare
                        | TokenKind::LeftBrace
                        | TokenKind::Comma
                        | TokenKind::Semicolon
                        | TokenKind::Colon
                ) {
                    self.consume();
                }
                Spanned::new(Expr::Error, found.span)
            }
        }
    }
}

fn is_struct_name(expr: &Spanned<Expr>) -> bool {
    match &expr.node {
        Expr::Ident(_) => true,
        Expr::Member { number_member, .. } => !number_member,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticManager;
    use crate::lexer;
    use crate::parser::parse;
    use crate::parser::ast::{Program, Stmt};

    fn parse_src(src: &str) -> (Program, DiagnosticManager) {
        let mut diagnostics = DiagnosticManager::new();
        diagnostics.add_file("test.lb", src);
        let tokens = lexer::lex(src, 0, &mut diagnostics);
        let program = parse(&tokens, &mut diagnostics);
        (program, diagnostics)
    }

    fn parse_expr(src: &str) -> Spanned<Expr> {
        let (program, diagnostics) = parse_src(src);
        assert_eq!(
            diagnostics.error_count(),
            0,
            "unexpected diagnostics: {:?}",
            diagnostics.diagnostics
        );
        assert_eq!(program.statements.len(), 1, "expected one statement: {program:?}");
        match program.statements.into_iter().next().unwrap().node {
            Stmt::Expression(expr) => expr,
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    fn binary_parts(expr: &Expr) -> (&Expr, &str, &Expr) {
        match expr {
            Expr::Binary { left, op, right } => (&left.node, op.as_str(), &right.node),
            other => panic!("expected binary, got {other:?}"),
        }
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let expr = parse_expr("1 + 2 * 3");
        let (left, op, right) = binary_parts(&expr.node);
        assert_eq!(op, "+");
        assert_eq!(left, &Expr::IntLit(1));
        let (rl, rop, rr) = binary_parts(right);
        assert_eq!(rop, "*");
        assert_eq!(rl, &Expr::IntLit(2));
        assert_eq!(rr, &Expr::IntLit(3));
    }

    #[test]
    fn assignment_is_right_associative() {
        let expr = parse_expr("a = b = c");
        match &expr.node {
            Expr::Assign { assignee, value, .. } => {
                assert_eq!(assignee.node, Expr::Ident("a".into()));
                assert!(matches!(value.node, Expr::Assign { .. }));
            }
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn logical_or_binds_looser_than_and() {
        let expr = parse_expr("a || b && c");
        let (_, op, right) = binary_parts(&expr.node);
        assert_eq!(op, "||");
        let (_, rop, _) = binary_parts(right);
        assert_eq!(rop, "&&");
    }

    #[test]
    fn unary_binds_tighter_than_member() {
        let expr = parse_expr("!x.y");
        match &expr.node {
            Expr::Unary { op, operand, postfix } => {
                assert_eq!(op, "!");
                assert!(!postfix);
                assert!(matches!(operand.node, Expr::Member { .. }));
            }
            other => panic!("expected unary, got {other:?}"),
        }
    }

    #[test]
    fn exponent_is_right_associative() {
        let expr = parse_expr("2 ** 3 ** 4");
        let (left, op, right) = binary_parts(&expr.node);
        assert_eq!(op, "**");
        assert_eq!(left, &Expr::IntLit(2));
        let (_, rop, _) = binary_parts(right);
        assert_eq!(rop, "**");
    }

    #[test]
    fn compound_assignment_operator_lexeme_is_kept() {
        let expr = parse_expr("a += 1");
        match &expr.node {
            Expr::Assign { op, .. } => assert_eq!(op, "+="),
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn call_index_member_chain() {
        let expr = parse_expr("f(1)[0].x");
        match &expr.node {
            Expr::Member { left, member, number_member } => {
                assert_eq!(member, "x");
                assert!(!number_member);
                match &left.node {
                    Expr::Index { left, .. } => {
                        assert!(matches!(left.node, Expr::Call { .. }));
                    }
                    other => panic!("expected index, got {other:?}"),
                }
            }
            other => panic!("expected member, got {other:?}"),
        }
    }

    #[test]
    fn number_member_access() {
        let expr = parse_expr("pair.0");
        match &expr.node {
            Expr::Member { member, number_member, .. } => {
                assert_eq!(member, "0");
                assert!(number_member);
            }
            other => panic!("expected member, got {other:?}"),
        }
    }

    #[test]
    fn postfix_increment() {
        let expr = parse_expr("n++");
        assert!(matches!(&expr.node, Expr::Unary { postfix: true, op, .. } if op == "++"));
    }

    #[test]
    fn prefix_increment() {
        let expr = parse_expr("++n");
        assert!(matches!(&expr.node, Expr::Unary { postfix: false, op, .. } if op == "++"));
    }

    #[test]
    fn cast_and_typecheck() {
        let expr = parse_expr("x as f32");
        assert!(matches!(expr.node, Expr::Cast { .. }));

        let expr = parse_expr("x is i32");
        assert!(matches!(expr.node, Expr::TypeCheck { .. }));
    }

    #[test]
    fn list_map_tuple_literals() {
        let expr = parse_expr("[1, 2, 3]");
        assert!(matches!(&expr.node, Expr::List(items) if items.len() == 3));

        let expr = parse_expr("{\"a\": 1, \"b\": 2}");
        assert!(matches!(&expr.node, Expr::Map(entries) if entries.len() == 2));

        let expr = parse_expr("(1, \"two\")");
        assert!(matches!(&expr.node, Expr::Tuple(members) if members.len() == 2));
    }

    #[test]
    fn parenthesised_expression_is_grouping_not_tuple() {
        let expr = parse_expr("(1 + 2)");
        assert!(matches!(expr.node, Expr::Binary { .. }));
    }

    #[test]
    fn struct_literal_with_fields() {
        let expr = parse_expr("Point { x: 1.0, y: 2.0 }");
        match &expr.node {
            Expr::StructLit { name, fields } => {
                assert_eq!(name.node, Expr::Ident("Point".into()));
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[0].0.node, "x");
            }
            other => panic!("expected struct literal, got {other:?}"),
        }
    }

    #[test]
    fn qualified_struct_literal() {
        let expr = parse_expr("geometry.Point { x: 1.0, y: 2.0 }");
        match &expr.node {
            Expr::StructLit { name, .. } => {
                assert!(matches!(name.node, Expr::Member { .. }));
            }
            other => panic!("expected struct literal, got {other:?}"),
        }
    }

    #[test]
    fn no_brace_mode_keeps_condition_and_block_apart() {
        let (program, diagnostics) = parse_src("if x { 1 }");
        assert_eq!(diagnostics.error_count(), 0, "{:?}", diagnostics.diagnostics);
        match &program.statements[0].node {
            Stmt::If(if_stmt) => {
                assert_eq!(if_stmt.condition.node, Expr::Ident("x".into()));
                assert_eq!(if_stmt.body.len(), 1);
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn struct_literal_allowed_inside_condition_parens() {
        let (program, diagnostics) = parse_src("if (P { ok: true }).ok { 1 }");
        assert_eq!(diagnostics.error_count(), 0, "{:?}", diagnostics.diagnostics);
        match &program.statements[0].node {
            Stmt::If(if_stmt) => {
                assert!(matches!(if_stmt.condition.node, Expr::Member { .. }));
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn two_statements_split_on_newline() {
        let (program, diagnostics) = parse_src("a\nb");
        assert_eq!(diagnostics.error_count(), 0);
        assert_eq!(program.statements.len(), 2);
    }

    #[test]
    fn pending_operator_continues_across_newline() {
        let (program, diagnostics) = parse_src("a +\n b");
        assert_eq!(diagnostics.error_count(), 0, "{:?}", diagnostics.diagnostics);
        assert_eq!(program.statements.len(), 1);
        match &program.statements[0].node {
            Stmt::Expression(expr) => assert!(matches!(expr.node, Expr::Binary { .. })),
            other => panic!("expected expression, got {other:?}"),
        }
    }

    #[test]
    fn brackets_suspend_newline_termination() {
        let (program, diagnostics) = parse_src("(a\n+ b)");
        assert_eq!(diagnostics.error_count(), 0, "{:?}", diagnostics.diagnostics);
        assert_eq!(program.statements.len(), 1);
        match &program.statements[0].node {
            Stmt::Expression(expr) => assert!(matches!(expr.node, Expr::Binary { .. })),
            other => panic!("expected expression, got {other:?}"),
        }
    }

    #[test]
    fn error_recovery_produces_multiple_diagnostics() {
        let (_, diagnostics) = parse_src("let = 1\nlet y = ]\nlet z = 3");
        assert!(diagnostics.error_count() >= 2, "{:?}", diagnostics.diagnostics);
    }

    #[test]
    fn recovery_still_parses_later_statements() {
        let (program, diagnostics) = parse_src("let x = )\nlet y = 2");
        assert!(diagnostics.error_count() >= 1);
        assert!(program
            .statements
            .iter()
            .any(|s| matches!(&s.node, Stmt::VariableDeclaration { name, .. } if name.node == "y")));
    }

    #[test]
    fn numeric_separator_literal_value() {
        let expr = parse_expr("1_23_456");
        assert_eq!(expr.node, Expr::IntLit(123456));
    }
}
