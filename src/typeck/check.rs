//! Stage 5: type-check statement bodies, producing typed IR.

use super::ir::{self, ElseBranch, Expression, ExprKind};
use super::types::{self, can_cast, make_union, Ty, TyKind, TypeError};
use super::Checker;
use crate::parser::ast::{self, Expr, FunctionDecl, IfStmt, Stmt};
use crate::pretty;
use crate::span::{Span, Spanned};

impl Checker<'_> {
    pub(super) fn check_statement(
        &mut self,
        stmt: &Spanned<Stmt>,
    ) -> Result<Option<ir::Statement>, TypeError> {
        match &stmt.node {
            Stmt::VariableDeclaration { keyword, name, ty, value, .. } => {
                self.check_variable_declaration(*keyword, name, ty.as_ref(), value.as_ref(), stmt.span)
                    .map(Some)
            }
            Stmt::FunctionDeclaration(decl) => {
                self.check_function_declaration(decl, stmt.span).map(Some)
            }
            Stmt::If(if_stmt) => Ok(Some(ir::Statement::If(self.check_if(if_stmt, stmt.span)?))),
            Stmt::While { condition, body } => {
                let condition = self.check_condition(condition)?;
                let body = self.check_scoped_block(body)?;
                Ok(Some(ir::Statement::While { condition, body, span: stmt.span }))
            }
            Stmt::For { variable, iterable, body } => {
                let iterable = self.check_expression(iterable)?;
                let Some(element_ty) = iterable_element(&iterable.ty) else {
                    return Err(TypeError::new(
                        format!("Type \"{}\" is not iterable", iterable.ty),
                        iterable.span,
                    ));
                };
                self.symbols_mut().push_scope();
                let result = (|| {
                    if self
                        .symbols_mut()
                        .register(&variable.node, element_ty.clone(), false)
                        .is_err()
                    {
                        return Err(TypeError::new(
                            format!(
                                "Cannot redeclare variable {:?}, it is already defined",
                                variable.node
                            ),
                            variable.span,
                        ));
                    }
                    self.check_scoped_block(body)
                })();
                self.symbols_mut().pop_scope();
                Ok(Some(ir::Statement::For {
                    variable: variable.node.clone(),
                    element_ty,
                    iterable,
                    body: result?,
                    span: stmt.span,
                }))
            }
            Stmt::Return(value) => {
                let Some(expected) = self.current_return.clone() else {
                    return Err(TypeError::new("Cannot return outside of a function", stmt.span));
                };
                let value_ir = match value {
                    Some(value) => Some(self.check_expression(value)?),
                    None => None,
                };
                let value_ty = value_ir.as_ref().map(|v| v.ty.clone()).unwrap_or_else(Ty::void);
                let ok = {
                    let ctx = self.ctx();
                    expected.valid(&value_ty, &ctx)
                };
                if !ok {
                    return Err(TypeError::new(
                        format!(
                            "Type \"{value_ty}\" is not assignable to return type \"{expected}\""
                        ),
                        stmt.span,
                    ));
                }
                Ok(Some(ir::Statement::Return { value: value_ir, span: stmt.span }))
            }
            Stmt::Expression(expr) => {
                Ok(Some(ir::Statement::Expression(self.check_expression(expr)?)))
            }
            // Declarations were handled in stages 1-4; imports in stage 2.
            Stmt::TypeDeclaration { .. }
            | Stmt::StructDeclaration { .. }
            | Stmt::TupleStructDeclaration { .. }
            | Stmt::UnitStructDeclaration { .. }
            | Stmt::InterfaceDeclaration { .. }
            | Stmt::EnumDeclaration { .. }
            | Stmt::Import(_)
            | Stmt::Error => Ok(None),
        }
    }

    fn check_variable_declaration(
        &mut self,
        keyword: ast::DeclKeyword,
        name: &Spanned<String>,
        annotation: Option<&Spanned<ast::TypeExpr>>,
        value: Option<&Spanned<Expr>>,
        span: Span,
    ) -> Result<ir::Statement, TypeError> {
        // The initialiser is checked before the name is bound, so
        // `let x = x` resolves to the outer x.
        let value_ir = match value {
            Some(value) => Some(self.check_expression(value)?),
            None => None,
        };

        let var_ty = match (annotation, &value_ir) {
            (Some(annotation), Some(value_ir)) => {
                let declared = self.type_from_ast(annotation)?;
                let (resolved, ok) = {
                    let ctx = self.ctx();
                    declared.infer(&value_ir.ty, &ctx)
                };
                if !ok {
                    return Err(TypeError::new(
                        format!(
                            "Type \"{}\" is not assignable to type \"{declared}\"",
                            value_ir.ty
                        ),
                        value_ir.span,
                    ));
                }
                resolved
            }
            (Some(annotation), None) => self.type_from_ast(annotation)?,
            (None, Some(value_ir)) => value_ir.ty.clone().to_real(),
            (None, None) => Ty::infer(),
        };

        let constant = keyword.is_constant();
        let var_ty = var_ty.with_constant(constant);
        if !name.node.is_empty()
            && self
                .symbols_mut()
                .register(&name.node, var_ty.clone(), constant)
                .is_err()
        {
            return Err(TypeError::new(
                format!("Cannot redeclare variable {:?}, it is already defined", name.node),
                name.span,
            ));
        }

        Ok(ir::Statement::VariableDeclaration {
            name: name.node.clone(),
            ty: var_ty,
            constant,
            value: value_ir,
            span,
        })
    }

    fn check_function_declaration(
        &mut self,
        decl: &FunctionDecl,
        span: Span,
    ) -> Result<ir::Statement, TypeError> {
        let function = self.build_function_ty(decl)?;

        // Top-level functions were registered in stage 4; nested ones are
        // local bindings.
        if self.function_depth > 0 && decl.method_of.is_none() && decl.member_of.is_none() {
            let ty = Ty::function(function.clone()).with_constant(true);
            if !decl.name.node.is_empty()
                && self.symbols_mut().register(&decl.name.node, ty, true).is_err()
            {
                return Err(TypeError::new(
                    format!("Cannot redeclare {:?}, it is already defined", decl.name.node),
                    decl.name.span,
                ));
            }
        }

        self.symbols_mut().push_scope();
        let saved_return = self.current_return.replace(function.return_type.clone());
        self.function_depth += 1;

        let result = (|| {
            for (param, ty) in decl.params.iter().zip(&function.params) {
                if self
                    .symbols_mut()
                    .register(&param.name.node, ty.clone(), false)
                    .is_err()
                {
                    return Err(TypeError::new(
                        format!(
                            "Cannot redeclare variable {:?}, it is already defined",
                            param.name.node
                        ),
                        param.name.span,
                    ));
                }
            }
            if let (Some(receiver), Some(receiver_ty)) = (&decl.method_of, &function.method_of) {
                let self_ty = receiver_ty.clone().with_constant(!receiver.mutable);
                self.symbols_mut().insert("self", self_ty, !receiver.mutable);
            }
            self.check_block(&decl.body)
        })();

        self.function_depth -= 1;
        self.current_return = saved_return;
        self.symbols_mut().pop_scope();
        let body = result?;

        Ok(ir::Statement::FunctionDeclaration {
            name: decl.name.node.clone(),
            param_names: decl.params.iter().map(|p| p.name.node.clone()).collect(),
            function,
            body,
            span,
        })
    }

    fn check_if(&mut self, if_stmt: &IfStmt, span: Span) -> Result<ir::IfStatement, TypeError> {
        let condition = self.check_condition(&if_stmt.condition)?;
        let body = self.check_scoped_block(&if_stmt.body)?;

        let mut tails = vec![block_tail(&body)];
        let else_branch = match &if_stmt.else_branch {
            Some(branch) => match branch.as_ref() {
                ast::ElseBranch::Block(stmts) => {
                    let block = self.check_scoped_block(stmts)?;
                    tails.push(block_tail(&block));
                    Some(Box::new(ElseBranch::Block(block)))
                }
                ast::ElseBranch::If(nested) => {
                    let nested = self.check_if(&nested.node, nested.span)?;
                    tails.push(nested.ty.clone());
                    Some(Box::new(ElseBranch::If(nested)))
                }
            },
            None => {
                tails.push(Ty::void());
                None
            }
        };

        let ty = self.union_of(tails);
        Ok(ir::IfStatement { condition, body, else_branch, ty, span })
    }

    fn check_condition(&mut self, condition: &Spanned<Expr>) -> Result<Expression, TypeError> {
        let condition = self.check_expression(condition)?;
        let ok = {
            let ctx = self.ctx();
            Ty::bool().valid(&condition.ty, &ctx)
        };
        if !ok {
            return Err(TypeError::new(
                format!("Condition must be of type \"bool\", got \"{}\"", condition.ty),
                condition.span,
            ));
        }
        Ok(condition)
    }

    fn check_block(&mut self, stmts: &[Spanned<Stmt>]) -> Result<Vec<ir::Statement>, TypeError> {
        let mut out = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            if let Some(statement) = self.check_statement(stmt)? {
                out.push(statement);
            }
        }
        Ok(out)
    }

    fn check_scoped_block(
        &mut self,
        stmts: &[Spanned<Stmt>],
    ) -> Result<Vec<ir::Statement>, TypeError> {
        self.symbols_mut().push_scope();
        let result = self.check_block(stmts);
        self.symbols_mut().pop_scope();
        result
    }

    /// Fold a list of types into their deduplicated union.
    fn union_of(&self, types: Vec<Ty>) -> Ty {
        let ctx = self.ctx();
        let mut distinct: Vec<Ty> = Vec::new();
        for ty in types {
            let ty = ty.to_real();
            if !distinct.iter().any(|existing| existing.valid(&ty, &ctx)) {
                distinct.push(ty);
            }
        }
        make_union(distinct)
    }

    // Expressions

    /// Check an expression in value position: a bare type is an error here.
    pub(super) fn check_expression(
        &mut self,
        expr: &Spanned<Expr>,
    ) -> Result<Expression, TypeError> {
        let result = self.do_check_expression(expr)?;
        if matches!(result.ty.kind, TyKind::Type(_)) {
            return Err(TypeError::new(
                format!("Cannot use {:?} as a value, it is a type", pretty::expr_to_string(expr)),
                expr.span,
            ));
        }
        Ok(result)
    }

    fn do_check_expression(&mut self, expr: &Spanned<Expr>) -> Result<Expression, TypeError> {
        let span = expr.span;
        match &expr.node {
            Expr::IntLit(value) => {
                Ok(Expression::new(ExprKind::IntLit(*value), Ty::untyped_int(), span))
            }
            Expr::FloatLit(value) => {
                Ok(Expression::new(ExprKind::FloatLit(*value), Ty::untyped_float(), span))
            }
            Expr::StringLit(value) => {
                Ok(Expression::new(ExprKind::StringLit(value.clone()), Ty::string(), span))
            }
            Expr::BoolLit(value) => {
                Ok(Expression::new(ExprKind::BoolLit(*value), Ty::bool(), span))
            }
            Expr::NullLit => Ok(Expression::new(ExprKind::NullLit, Ty::null(), span)),
            Expr::Ident(name) => {
                let Some(mut ty) = self.resolve_symbol(name) else {
                    return Err(TypeError::new(format!("Variable {name:?} is undefined"), span));
                };
                ty.was_variable = true;
                if self.is_constant_symbol(name) {
                    ty.constant = true;
                }
                let kind = if matches!(ty.kind, TyKind::Type(_) | TyKind::Module { .. }) {
                    ExprKind::TypeRef
                } else {
                    ExprKind::Variable(name.clone())
                };
                Ok(Expression::new(kind, ty, span))
            }
            Expr::Binary { left, op, right } => {
                let left = self.check_expression(left)?;
                let right = self.check_expression(right)?;
                let ty = self.check_binary_op(op, &left.ty, &right.ty, span)?;
                Ok(Expression::new(
                    ExprKind::Binary { left: Box::new(left), op: op.clone(), right: Box::new(right) },
                    ty,
                    span,
                ))
            }
            Expr::Unary { op, operand, postfix } => {
                let operand = self.check_expression(operand)?;
                let ty = self.check_unary_op(op, &operand.ty, span)?;
                Ok(Expression::new(
                    ExprKind::Unary { op: op.clone(), operand: Box::new(operand), postfix: *postfix },
                    ty,
                    span,
                ))
            }
            Expr::Assign { assignee, op, value } => self.check_assignment(assignee, op, value, span),
            Expr::Call { callee, args } => self.check_call(callee, args, span),
            Expr::Index { left, index } => {
                let left = self.check_expression(left)?;
                let index = self.check_expression(index)?;
                let result = {
                    let ctx = self.ctx();
                    left.ty.index_by(&index.ty, &ctx)
                };
                let Some(ty) = result else {
                    return Err(TypeError::new(
                        format!(
                            "Type \"{}\" is not indexable with type \"{}\"",
                            left.ty, index.ty
                        ),
                        span,
                    ));
                };
                Ok(Expression::new(
                    ExprKind::Index { left: Box::new(left), index: Box::new(index) },
                    ty,
                    span,
                ))
            }
            Expr::Member { left, member, number_member } => {
                let left = self.do_check_expression(left)?;
                let result = {
                    let ctx = self.ctx();
                    types::member(&left.ty, member, *number_member, self.current_module, &ctx)
                };
                let Some(ty) = result else {
                    return Err(TypeError::new(
                        format!("Type \"{}\" does not have member {member:?}", left.ty),
                        span,
                    ));
                };
                Ok(Expression::new(
                    ExprKind::Member {
                        left: Box::new(left),
                        member: member.clone(),
                        number_member: *number_member,
                    },
                    ty,
                    span,
                ))
            }
            Expr::List(elements) => {
                let mut element_types: Vec<Ty> = Vec::new();
                let mut checked = Vec::with_capacity(elements.len());
                for element in elements {
                    let element = self.check_expression(element)?;
                    let is_new = {
                        let ctx = self.ctx();
                        !element_types.iter().any(|t| t.valid(&element.ty, &ctx))
                    };
                    if is_new {
                        element_types.push(element.ty.clone());
                    }
                    checked.push(element);
                }
                let element = if element_types.is_empty() {
                    Ty::infer()
                } else {
                    make_union(element_types)
                };
                let ty = Ty::new(TyKind::Array {
                    element: Box::new(element),
                    length: checked.len() as i64,
                    can_infer: true,
                });
                Ok(Expression::new(ExprKind::List(checked), ty, span))
            }
            Expr::Map(entries) => {
                let mut key_types: Vec<Ty> = Vec::new();
                let mut value_types: Vec<Ty> = Vec::new();
                let mut checked = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = self.check_expression(key)?;
                    let value = self.check_expression(value)?;
                    {
                        let ctx = self.ctx();
                        if !key_types.iter().any(|t| t.valid(&key.ty, &ctx)) {
                            key_types.push(key.ty.clone());
                        }
                        if !value_types.iter().any(|t| t.valid(&value.ty, &ctx)) {
                            value_types.push(value.ty.clone());
                        }
                    }
                    checked.push((key, value));
                }
                let key = if key_types.is_empty() { Ty::infer() } else { make_union(key_types) };
                let value =
                    if value_types.is_empty() { Ty::infer() } else { make_union(value_types) };
                let ty = Ty::new(TyKind::Map { key: Box::new(key), value: Box::new(value) });
                Ok(Expression::new(ExprKind::Map(checked), ty, span))
            }
            Expr::Tuple(members) => {
                let mut checked = Vec::with_capacity(members.len());
                for member in members {
                    checked.push(self.check_expression(member)?);
                }
                let ty = Ty::new(TyKind::Tuple(checked.iter().map(|m| m.ty.clone()).collect()));
                Ok(Expression::new(ExprKind::Tuple(checked), ty, span))
            }
            Expr::StructLit { name, fields } => self.check_struct_literal(name, fields, span),
            Expr::Cast { left, ty } => {
                let value = self.check_expression(left)?;
                let target = self.type_from_ast(ty)?;
                let ok = {
                    let ctx = self.ctx();
                    can_cast(&value.ty, &target, &ctx)
                };
                if !ok {
                    return Err(TypeError::new(
                        format!("Cannot cast type \"{}\" to type \"{target}\"", value.ty),
                        span,
                    ));
                }
                Ok(Expression::new(
                    ExprKind::Cast { value: Box::new(value), to: target.clone() },
                    target,
                    span,
                ))
            }
            Expr::TypeCheck { left, ty } => {
                let value = self.check_expression(left)?;
                let target = self.type_from_ast(ty)?;
                let ok = {
                    let ctx = self.ctx();
                    value.ty.valid(&target, &ctx)
                };
                if !ok {
                    return Err(TypeError::new(
                        format!("Type \"{}\" can never be type \"{target}\"", value.ty),
                        span,
                    ));
                }
                Ok(Expression::new(
                    ExprKind::TypeCheck { value: Box::new(value), of: target },
                    Ty::bool(),
                    span,
                ))
            }
            Expr::Error => Ok(Expression::new(ExprKind::Error, Ty::infer(), span)),
        }
    }

    fn check_binary_op(
        &self,
        op: &str,
        left: &Ty,
        right: &Ty,
        span: Span,
    ) -> Result<Ty, TypeError> {
        let comparison = matches!(op, "==" | "!=" | "<" | "<=" | ">" | ">=");

        if left.is_untyped() && right.is_untyped() {
            if comparison {
                return Ok(Ty::bool());
            }
            if matches!(op, "+" | "-" | "*" | "/" | "%" | "**") {
                let int = matches!(left.kind, TyKind::UntypedNumber { int_assignable: true })
                    && matches!(right.kind, TyKind::UntypedNumber { int_assignable: true });
                return Ok(if int { Ty::untyped_int() } else { Ty::untyped_float() });
            }
        }

        let l = concretize(left, right);
        let r = concretize(right, left);
        self.registry.binary_result(op, &l, &r).ok_or_else(|| {
            TypeError::new(
                format!("Operator {op:?} is not defined for types \"{left}\" and \"{right}\""),
                span,
            )
        })
    }

    fn check_unary_op(&self, op: &str, operand: &Ty, span: Span) -> Result<Ty, TypeError> {
        if operand.is_untyped() && matches!(op, "-" | "+" | "++" | "--") {
            return Ok(operand.clone());
        }
        let concrete = operand.clone().to_real();
        self.registry.unary_result(op, &concrete).ok_or_else(|| {
            TypeError::new(format!("Operator {op:?} is not defined for type \"{operand}\""), span)
        })
    }

    fn check_assignment(
        &mut self,
        assignee: &Spanned<Expr>,
        op: &str,
        value: &Spanned<Expr>,
        span: Span,
    ) -> Result<Expression, TypeError> {
        let (target_ir, target_ty) = match &assignee.node {
            Expr::Ident(name) => {
                let Some(ty) = self.resolve_symbol(name) else {
                    return Err(TypeError::new(
                        format!("Variable {name:?} is undefined"),
                        assignee.span,
                    ));
                };
                if matches!(ty.kind, TyKind::Type(_)) {
                    return Err(TypeError::new(
                        format!("Cannot use {name:?} as a value, it is a type"),
                        assignee.span,
                    ));
                }
                if self.is_constant_symbol(name) || ty.constant {
                    return Err(TypeError::new("Cannot assign to constant value", assignee.span));
                }
                let target = Expression::new(
                    ExprKind::Variable(name.clone()),
                    ty.clone(),
                    assignee.span,
                );
                (target, ty)
            }
            Expr::Index { left, index } => {
                let left = self.check_expression(left)?;
                let index = self.check_expression(index)?;
                let result = {
                    let ctx = self.ctx();
                    left.ty.index_by(&index.ty, &ctx)
                };
                let Some(ty) = result else {
                    return Err(TypeError::new(
                        format!(
                            "Type \"{}\" is not indexable with type \"{}\"",
                            left.ty, index.ty
                        ),
                        assignee.span,
                    ));
                };
                if ty.constant {
                    return Err(TypeError::new("Cannot assign to constant value", assignee.span));
                }
                let target = Expression::new(
                    ExprKind::Index { left: Box::new(left), index: Box::new(index) },
                    ty.clone(),
                    assignee.span,
                );
                (target, ty)
            }
            Expr::Member { left, member, number_member } => {
                let left = self.do_check_expression(left)?;
                let result = {
                    let ctx = self.ctx();
                    types::member(&left.ty, member, *number_member, self.current_module, &ctx)
                };
                let Some(ty) = result else {
                    return Err(TypeError::new(
                        format!("Type \"{}\" does not have member {member:?}", left.ty),
                        assignee.span,
                    ));
                };
                if ty.constant {
                    return Err(TypeError::new("Cannot assign to constant value", assignee.span));
                }
                let target = Expression::new(
                    ExprKind::Member {
                        left: Box::new(left),
                        member: member.clone(),
                        number_member: *number_member,
                    },
                    ty.clone(),
                    assignee.span,
                );
                (target, ty)
            }
            _ => {
                return Err(TypeError::new(
                    "Can only assign values to variables",
                    assignee.span,
                ))
            }
        };

        let value_ir = self.check_expression(value)?;

        // `a += b` type-checks as `a = a + b`.
        let effective_ty = if op == "=" {
            value_ir.ty.clone()
        } else {
            let base = &op[..op.len() - 1];
            self.check_binary_op(base, &target_ty, &value_ir.ty, span)?
        };

        let ok = {
            let ctx = self.ctx();
            target_ty.valid(&effective_ty, &ctx)
        };
        if !ok {
            return Err(TypeError::new(
                format!(
                    "Type \"{}\" is not assignable to type \"{target_ty}\"",
                    value_ir.ty
                ),
                span,
            ));
        }

        Ok(Expression::new(
            ExprKind::Assign {
                assignee: Box::new(target_ir),
                op: op.to_string(),
                value: Box::new(value_ir),
            },
            target_ty,
            span,
        ))
    }

    fn check_call(
        &mut self,
        callee: &Spanned<Expr>,
        args: &[Spanned<Expr>],
        span: Span,
    ) -> Result<Expression, TypeError> {
        if let Expr::Ident(name) = &callee.node {
            // Tuple-struct names in call position are constructions.
            if let Some(symbol) = self.resolve_symbol(name) {
                if let TyKind::Type(inner) = &symbol.kind {
                    if let TyKind::TupleStruct { .. } = &inner.kind {
                        return self.check_tuple_struct_init(inner.as_ref().clone(), args, span);
                    }
                }
            }
            if let Some(builtin) = self.registry.builtins.get(name.as_str()).cloned() {
                let callee_ir = Expression::new(
                    ExprKind::Variable(name.clone()),
                    Ty::function(builtin.clone()),
                    callee.span,
                );
                return self.check_invoke(&builtin, callee_ir, args, span);
            }
        }

        let callee_ir = self.do_check_expression(callee)?;
        match &callee_ir.ty.kind {
            TyKind::TupleStruct { .. } => {
                let ty = callee_ir.ty.clone();
                self.check_tuple_struct_init(ty, args, span)
            }
            TyKind::Type(inner) if matches!(inner.kind, TyKind::TupleStruct { .. }) => {
                let ty = inner.as_ref().clone();
                self.check_tuple_struct_init(ty, args, span)
            }
            TyKind::Function(function) => {
                let function = function.as_ref().clone();
                self.check_invoke(&function, callee_ir, args, span)
            }
            _ => Err(TypeError::new(
                format!("{:?} is not a function", pretty::expr_to_string(callee)),
                span,
            )),
        }
    }

    fn check_invoke(
        &mut self,
        function: &types::FunctionTy,
        callee_ir: Expression,
        args: &[Spanned<Expr>],
        span: Span,
    ) -> Result<Expression, TypeError> {
        if args.len() < function.params.len() {
            return Err(TypeError::new(
                format!("Missing argument for function {:?}", function.name),
                span,
            ));
        }
        if args.len() > function.params.len() {
            return Err(TypeError::new(
                format!("Extra argument passed to function {:?}", function.name),
                span,
            ));
        }

        let mut checked = Vec::with_capacity(args.len());
        for (arg, param) in args.iter().zip(&function.params) {
            let arg = self.check_expression(arg)?;
            let ok = {
                let ctx = self.ctx();
                param.valid(&arg.ty, &ctx)
            };
            if !ok {
                return Err(TypeError::new(
                    format!(
                        "Invalid arguments passed to function {:?}: Type \"{}\" is not a valid argument for parameter of type \"{param}\"",
                        function.name, arg.ty
                    ),
                    arg.span,
                ));
            }
            checked.push(arg);
        }

        Ok(Expression::new(
            ExprKind::Call { callee: Box::new(callee_ir), args: checked },
            function.return_type.clone(),
            span,
        ))
    }

    fn check_tuple_struct_init(
        &mut self,
        ty: Ty,
        args: &[Spanned<Expr>],
        span: Span,
    ) -> Result<Expression, TypeError> {
        let TyKind::TupleStruct { id, .. } = &ty.kind else {
            unreachable!("tuple struct init on non tuple struct");
        };
        let id = *id;
        let members = self.defs.tuple_structs[id].members.clone();
        if members.len() != args.len() {
            return Err(TypeError::new("Tuple struct expression incompatible with type", span));
        }

        let mut checked = Vec::with_capacity(args.len());
        for (arg, member) in args.iter().zip(&members) {
            let arg = self.check_expression(arg)?;
            let ok = {
                let ctx = self.ctx();
                member.valid(&arg.ty, &ctx)
            };
            if !ok {
                return Err(TypeError::new(
                    "Tuple struct expression incompatible with type",
                    arg.span,
                ));
            }
            checked.push(arg);
        }

        Ok(Expression::new(ExprKind::TupleStructInit { def: id, args: checked }, ty, span))
    }

    fn check_struct_literal(
        &mut self,
        name: &Spanned<Expr>,
        fields: &[(Spanned<String>, Spanned<Expr>)],
        span: Span,
    ) -> Result<Expression, TypeError> {
        let target = self.resolve_struct_target(name)?;

        match &target.kind {
            TyKind::Struct { id, .. } => {
                let id = *id;
                let def_members = self.defs.structs[id].members.clone();
                let mut checked = Vec::with_capacity(fields.len());

                // Only the provided fields are validated; a literal may
                // name a subset of the declared members.
                for (field_name, field_value) in fields {
                    let value = self.check_expression(field_value)?;
                    let Some(member) = def_members.iter().find(|m| m.name == field_name.node)
                    else {
                        return Err(TypeError::new(
                            "Struct expression incompatible with type",
                            field_name.span,
                        ));
                    };
                    let ok = {
                        let ctx = self.ctx();
                        member.ty.valid(&value.ty, &ctx)
                    };
                    if !ok {
                        return Err(TypeError::new(
                            "Struct expression incompatible with type",
                            field_value.span,
                        ));
                    }
                    checked.push((field_name.node.clone(), value));
                }

                Ok(Expression::new(
                    ExprKind::StructInit { def: id, fields: checked },
                    target,
                    span,
                ))
            }
            TyKind::UnitStruct { id, .. } if fields.is_empty() => {
                let def = *id;
                Ok(Expression::new(ExprKind::UnitStructInit { def }, target.clone(), span))
            }
            _ => Err(TypeError::new(
                format!("Cannot instantiate \"{target}\", it is not a struct"),
                span,
            )),
        }
    }

    /// Resolve a struct literal's name expression (`Point`, `lib.Point`,
    /// `Shape.Rect`) to the type being instantiated.
    fn resolve_struct_target(&mut self, name: &Spanned<Expr>) -> Result<Ty, TypeError> {
        match &name.node {
            Expr::Ident(symbol) => match self.resolve_symbol(symbol) {
                Some(ty) => match ty.kind {
                    TyKind::Type(inner) => Ok(*inner),
                    _ => Err(TypeError::new(
                        format!("Cannot use {symbol:?} as type, it is a value"),
                        name.span,
                    )),
                },
                None => Err(TypeError::new(
                    format!("Struct {symbol:?} is undefined"),
                    name.span,
                )),
            },
            Expr::Member { .. } => {
                let resolved = self.do_check_expression(name)?;
                match &resolved.ty.kind {
                    TyKind::Type(inner) => Ok(inner.as_ref().clone()),
                    // Enum struct-variants come back as plain struct values.
                    TyKind::Struct { .. } | TyKind::UnitStruct { .. } => Ok(resolved.ty.clone()),
                    _ => Err(TypeError::new(
                        format!(
                            "Cannot instantiate \"{}\", it is not a struct",
                            resolved.ty
                        ),
                        name.span,
                    )),
                }
            }
            _ => Err(TypeError::new(
                format!(
                    "Cannot instantiate {:?}, it is not a struct",
                    pretty::expr_to_string(name)
                ),
                name.span,
            )),
        }
    }
}

fn block_tail(body: &[ir::Statement]) -> Ty {
    match body.last() {
        Some(ir::Statement::Expression(expr)) => expr.ty.clone().to_real(),
        _ => Ty::void(),
    }
}

fn iterable_element(ty: &Ty) -> Option<Ty> {
    match &ty.kind {
        TyKind::List(element) | TyKind::Array { element, .. } => Some(element.as_ref().clone()),
        TyKind::Map { key, .. } => Some(key.as_ref().clone()),
        TyKind::Str => Some(Ty::string()),
        _ => None,
    }
}

fn concretize(ty: &Ty, other: &Ty) -> Ty {
    if let TyKind::UntypedNumber { int_assignable } = ty.kind {
        return match other.kind {
            TyKind::Int if int_assignable => Ty::int(),
            TyKind::Float => Ty::float(),
            _ => ty.clone().to_real(),
        };
    }
    ty.clone()
}
