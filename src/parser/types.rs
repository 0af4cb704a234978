use super::ast::*;
use super::Parser;
use crate::lexer::token::TokenKind;
use crate::span::Spanned;

impl Parser<'_> {
    pub(super) fn parse_type(&mut self) -> Spanned<TypeExpr> {
        self.parse_union_type()
    }

    fn parse_union_type(&mut self) -> Spanned<TypeExpr> {
        let first = self.parse_postfix_type();

        if !self.is_kind(TokenKind::Pipe) {
            return first;
        }

        let start = first.span;
        let mut members = vec![first];
        while self.can_continue() && self.is_kind(TokenKind::Pipe) {
            self.consume();
            members.push(self.parse_postfix_type());
        }

        let span = start.to(self.tokens[self.pos.saturating_sub(1)].span);
        Spanned::new(TypeExpr::Union(members), span)
    }

    fn parse_postfix_type(&mut self) -> Spanned<TypeExpr> {
        let mut left = self.parse_prefix_type();

        loop {
            match self.next().kind {
                TokenKind::LeftSquare => {
                    self.consume();
                    let length = if self.is_kind(TokenKind::RightSquare) {
                        None
                    } else {
                        Some(Box::new(self.with_bracket(|p| p.parse_expression())))
                    };
                    let close = self.expect(TokenKind::RightSquare);
                    let span = left.span.to(close.span);
                    left = Spanned::new(
                        TypeExpr::Array { element: Box::new(left), length },
                        span,
                    );
                }
                TokenKind::Question => {
                    let token = self.consume();
                    let span = left.span.to(token.span);
                    left = Spanned::new(TypeExpr::Option(Box::new(left)), span);
                }
                TokenKind::Bang => {
                    let token = self.consume();
                    let span = left.span.to(token.span);
                    left = Spanned::new(TypeExpr::ErrorResult(Box::new(left)), span);
                }
                _ => break,
            }
        }

        left
    }

    fn parse_prefix_type(&mut self) -> Spanned<TypeExpr> {
        if self.is_kind(TokenKind::Star) {
            let star = self.consume();
            let mutable = if self.is_keyword("mut") {
                self.consume();
                true
            } else {
                false
            };
            let inner = self.parse_prefix_type();
            let span = star.span.to(inner.span);
            return Spanned::new(TypeExpr::Pointer { mutable, inner: Box::new(inner) }, span);
        }

        self.parse_primary_type()
    }

    fn parse_primary_type(&mut self) -> Spanned<TypeExpr> {
        match self.next().kind {
            TokenKind::Identifier => {
                let name = self.consume();
                let mut left = if name.lexeme == "void" {
                    Spanned::new(TypeExpr::Void, name.span)
                } else {
                    Spanned::new(TypeExpr::Name(name.lexeme), name.span)
                };

                while self.is_kind(TokenKind::Dot) {
                    self.consume();
                    let member = self.expect(TokenKind::Identifier);
                    let span = left.span.to(member.span);
                    left = Spanned::new(
                        TypeExpr::Member { left: Box::new(left), member: member.lexeme },
                        span,
                    );
                }

                left
            }
            // A bare `!` is the error type with a void payload.
            TokenKind::Bang => {
                let token = self.consume();
                let void = Spanned::new(TypeExpr::Void, token.span);
                Spanned::new(TypeExpr::ErrorResult(Box::new(void)), token.span)
            }
            _ => {
                let found = self.next().clone();
                self.diagnostics.report_expected_type(&found);
                if !matches!(
                    found.kind,
                    TokenKind::Eof
                        | TokenKind::RightBrace
                        | TokenKind::RightParen
                        | TokenKind::RightSquare
                        | TokenKind::LeftBrace
                        | TokenKind::Comma
                        | TokenKind::Semicolon
                        | TokenKind::Equals
                ) {
                    self.consume();
                }
                Spanned::new(TypeExpr::Error, found.span)
            }
        }
    }
}
