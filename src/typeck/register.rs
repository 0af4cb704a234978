//! Stages 1-4: name registration, import binding, shape materialisation,
//! and function signatures. Statement bodies are stage 5, in `check`.

use super::defs::{DefId, EnumVariantDef, StructMember};
use super::types::{self, make_union, FunctionTy, Ty, TyKind, TypeError};
use super::Checker;
use crate::parser::ast::{
    EnumPayload, FunctionDecl, Stmt, StructFieldDecl, TypeExpr,
};
use crate::span::Spanned;

impl Checker<'_> {
    /// Stage 1: collect top-level type names with placeholder shapes so
    /// forward references resolve.
    pub(super) fn register_statement(&mut self, stmt: &Spanned<Stmt>) -> Result<(), TypeError> {
        match &stmt.node {
            Stmt::StructDeclaration { name, exported, .. } => {
                let id = self.defs.alloc_struct(&name.node, self.current_module);
                let ty = Ty::type_of(Ty::new(TyKind::Struct { id, name: name.node.clone() }));
                self.register_type_symbol(name, ty, *exported)
            }
            Stmt::TupleStructDeclaration { name, exported, .. } => {
                let id = self.defs.alloc_tuple_struct(&name.node, self.current_module);
                let ty = Ty::type_of(Ty::new(TyKind::TupleStruct { id, name: name.node.clone() }));
                self.register_type_symbol(name, ty, *exported)
            }
            Stmt::UnitStructDeclaration { name, exported } => {
                let id = self.defs.alloc_unit_struct(&name.node, self.current_module);
                let ty = Ty::type_of(Ty::new(TyKind::UnitStruct { id, name: name.node.clone() }));
                self.register_type_symbol(name, ty, *exported)
            }
            Stmt::InterfaceDeclaration { name, exported, .. } => {
                let id = self.defs.alloc_interface(&name.node, self.current_module);
                let ty = Ty::type_of(Ty::new(TyKind::Interface { id, name: name.node.clone() }));
                self.register_type_symbol(name, ty, *exported)
            }
            Stmt::EnumDeclaration { name, is_union, exported, .. } => {
                let id = self.defs.alloc_enum(&name.node, *is_union, self.current_module);
                let ty = Ty::type_of(Ty::new(TyKind::Enum { id, name: name.node.clone() }));
                self.register_type_symbol(name, ty, *exported)
            }
            Stmt::TypeDeclaration { name, exported, .. } => {
                let id = self.defs.alloc_explicit(&name.node, Ty::infer(), self.current_module);
                let ty = Ty::type_of(Ty::new(TyKind::Explicit { id, name: name.node.clone() }));
                self.register_type_symbol(name, ty, *exported)
            }
            _ => Ok(()),
        }
    }

    fn register_type_symbol(
        &mut self,
        name: &Spanned<String>,
        ty: Ty,
        exported: bool,
    ) -> Result<(), TypeError> {
        if name.node.is_empty() {
            // Parser recovery synthesized the name; it already reported.
            return Ok(());
        }
        if self.symbols_mut().register(&name.node, ty.clone(), true).is_err() {
            return Err(TypeError::new(
                format!("Cannot redeclare {:?}, it is already defined", name.node),
                name.span,
            ));
        }
        if exported {
            self.add_export(&name.node, ty);
        }
        Ok(())
    }

    /// Stage 2: bind imported modules into the local symbol table. Wildcard
    /// and named imports are deferred until the exporter's signatures exist.
    pub(super) fn import_statement(&mut self, stmt: &Spanned<Stmt>) -> Result<(), TypeError> {
        let Stmt::Import(import) = &stmt.node else { return Ok(()) };

        let Some(target) = self.resolved_import(&import.module.node) else {
            return Err(TypeError::new(
                format!("Cannot find module {:?}", import.module.node),
                import.module.span,
            ));
        };

        if import.import_all {
            // Exported types exist already; function signatures arrive at
            // the exporter's function stage, so the rest binds later.
            let mut bound = Vec::new();
            for (name, ty) in self.exports_of(target) {
                if self.symbols_mut().register(&name, ty, true).is_err() {
                    return Err(TypeError::new(
                        format!("Cannot redeclare {name:?}, it is already defined"),
                        stmt.span,
                    ));
                }
                bound.push(name);
            }
            self.defer_import(target, true, Vec::new(), bound, stmt.span);
            return Ok(());
        }

        if let Some(symbols) = &import.symbols {
            let mut remaining = Vec::new();
            for name in symbols {
                match self.export_of(target, &name.node) {
                    Some(ty) => {
                        if self.symbols_mut().register(&name.node, ty, true).is_err() {
                            return Err(TypeError::new(
                                format!(
                                    "Cannot redeclare {:?}, it is already defined",
                                    name.node
                                ),
                                name.span,
                            ));
                        }
                    }
                    None => remaining.push(name.clone()),
                }
            }
            if !remaining.is_empty() {
                self.defer_import(target, false, remaining, Vec::new(), stmt.span);
            }
            return Ok(());
        }

        let binding = match &import.alias {
            Some(alias) => alias.clone(),
            None => {
                let last = import
                    .module
                    .node
                    .rsplit('/')
                    .next()
                    .unwrap_or(&import.module.node)
                    .to_string();
                Spanned::new(last, import.module.span)
            }
        };

        let ty = Ty::new(TyKind::Module { id: target, name: binding.node.clone() });
        if self.symbols_mut().register(&binding.node, ty, true).is_err() {
            return Err(TypeError::new(
                format!("Cannot redeclare {:?}, it is already defined", binding.node),
                binding.span,
            ));
        }
        Ok(())
    }

    /// Stage 3: fill in the shapes registered in stage 1, now that every
    /// type name in the graph resolves.
    pub(super) fn global_statement(&mut self, stmt: &Spanned<Stmt>) -> Result<(), TypeError> {
        match &stmt.node {
            Stmt::StructDeclaration { name, members, .. } => {
                let members = self.resolve_struct_fields(members)?;
                if let Some(id) = self.registered_id(&name.node, DefKind::Struct) {
                    self.defs.structs[id].members = members;
                }
                Ok(())
            }
            Stmt::TupleStructDeclaration { name, members, .. } => {
                let mut resolved = Vec::with_capacity(members.len());
                for member in members {
                    resolved.push(self.type_from_ast(member)?);
                }
                if let Some(id) = self.registered_id(&name.node, DefKind::TupleStruct) {
                    self.defs.tuple_structs[id].members = resolved;
                }
                Ok(())
            }
            Stmt::InterfaceDeclaration { name, members, .. } => {
                let mut resolved = Vec::with_capacity(members.len());
                for member in members {
                    let ty = match &member.params {
                        Some(params) => {
                            let mut param_types = Vec::with_capacity(params.len());
                            for param in params {
                                param_types.push(self.type_from_ast(param)?);
                            }
                            Ty::function(FunctionTy {
                                name: member.name.node.clone(),
                                params: param_types,
                                return_type: self.type_from_ast(&member.result)?,
                                method_of: None,
                                exported: true,
                                module: self.current_module,
                            })
                        }
                        None => self.type_from_ast(&member.result)?,
                    };
                    resolved.push((member.name.node.clone(), ty));
                }
                if let Some(id) = self.registered_id(&name.node, DefKind::Interface) {
                    self.defs.interfaces[id].members = resolved;
                }
                Ok(())
            }
            Stmt::EnumDeclaration { name, members, .. } => {
                let mut variants = Vec::with_capacity(members.len());
                for member in members {
                    let full_name = format!("{}.{}", name.node, member.name.node);
                    let ty = match &member.payload {
                        EnumPayload::Unit => {
                            let id = self.defs.alloc_unit_struct(&full_name, self.current_module);
                            Ty::new(TyKind::UnitStruct { id, name: full_name })
                        }
                        EnumPayload::Tuple(types) => {
                            let mut resolved = Vec::with_capacity(types.len());
                            for ty in types {
                                resolved.push(self.type_from_ast(ty)?);
                            }
                            let id = self.defs.alloc_tuple_struct(&full_name, self.current_module);
                            self.defs.tuple_structs[id].members = resolved;
                            Ty::new(TyKind::TupleStruct { id, name: full_name })
                        }
                        EnumPayload::Struct(fields) => {
                            let resolved = self.resolve_struct_fields(fields)?;
                            let id = self.defs.alloc_struct(&full_name, self.current_module);
                            self.defs.structs[id].members = resolved;
                            Ty::new(TyKind::Struct { id, name: full_name })
                        }
                    };
                    variants.push(EnumVariantDef {
                        name: member.name.node.clone(),
                        ty,
                        exported: member.exported,
                    });
                }
                if let Some(id) = self.registered_id(&name.node, DefKind::Enum) {
                    self.defs.enums[id].variants = variants;
                }
                Ok(())
            }
            Stmt::TypeDeclaration { name, ty, .. } => {
                let underlying = self.type_from_ast(ty)?;
                if let Some(id) = self.registered_id(&name.node, DefKind::Explicit) {
                    self.defs.explicits[id].underlying = underlying;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn resolve_struct_fields(
        &mut self,
        fields: &[StructFieldDecl],
    ) -> Result<Vec<StructMember>, TypeError> {
        let mut resolved = Vec::with_capacity(fields.len());
        for field in fields {
            resolved.push(StructMember {
                name: field.name.node.clone(),
                ty: self.type_from_ast(&field.ty)?,
                exported: field.exported,
            });
        }
        Ok(resolved)
    }

    /// Stage 4: build and register function signatures; bodies wait for
    /// stage 5.
    pub(super) fn function_statement(&mut self, stmt: &Spanned<Stmt>) -> Result<(), TypeError> {
        let Stmt::FunctionDeclaration(decl) = &stmt.node else { return Ok(()) };
        let function = self.build_function_ty(decl)?;

        if decl.method_of.is_some() {
            self.registry.register_method(function);
            return Ok(());
        }

        if let Some(owner) = &decl.member_of {
            let owner_ty = self.resolve_symbol(&owner.node).ok_or_else(|| {
                TypeError::new(format!("Type {:?} is undefined", owner.node), owner.span)
            })?;
            let TyKind::Type(inner) = &owner_ty.kind else {
                return Err(TypeError::new(
                    format!("Cannot declare a member of {:?}, it is not a type", owner.node),
                    owner.span,
                ));
            };
            self.registry.register_static(inner.to_string(), function);
            return Ok(());
        }

        if decl.name.node.is_empty() {
            return Ok(());
        }
        let ty = Ty::function(function).with_constant(true);
        if self.symbols_mut().register(&decl.name.node, ty.clone(), true).is_err() {
            return Err(TypeError::new(
                format!("Cannot redeclare {:?}, it is already defined", decl.name.node),
                decl.name.span,
            ));
        }
        if decl.exported {
            self.add_export(&decl.name.node, ty);
        }
        Ok(())
    }

    pub(crate) fn build_function_ty(&mut self, decl: &FunctionDecl) -> Result<FunctionTy, TypeError> {
        let mut params = Vec::with_capacity(decl.params.len());
        for param in &decl.params {
            params.push(self.type_from_ast(&param.ty)?);
        }
        let return_type = match &decl.return_type {
            Some(ty) => self.type_from_ast(ty)?,
            None => Ty::void(),
        };
        let method_of = match &decl.method_of {
            Some(receiver) => Some(self.type_from_ast(&receiver.ty)?),
            None => None,
        };
        Ok(FunctionTy {
            name: decl.name.node.clone(),
            params,
            return_type,
            method_of,
            exported: decl.exported,
            module: self.current_module,
        })
    }

    /// Resolve a parsed type expression against the symbol table.
    pub(crate) fn type_from_ast(&self, ty: &Spanned<TypeExpr>) -> Result<Ty, TypeError> {
        match &ty.node {
            TypeExpr::Name(name) => match self.resolve_symbol(name) {
                Some(symbol) => match symbol.kind {
                    TyKind::Type(inner) => Ok(*inner),
                    _ => Err(TypeError::new(
                        format!("Cannot use {name:?} as type, it is a value"),
                        ty.span,
                    )),
                },
                None => Err(TypeError::new(format!("Type {name:?} is undefined"), ty.span)),
            },
            TypeExpr::Member { .. } => {
                let value = self.member_type_value(ty)?;
                match value.kind {
                    TyKind::Type(inner) => Ok(*inner),
                    _ => Err(TypeError::new(
                        "Cannot use this expression as type, it is a value",
                        ty.span,
                    )),
                }
            }
            TypeExpr::Union(members) => {
                let mut types = Vec::with_capacity(members.len());
                for member in members {
                    types.push(self.type_from_ast(member)?);
                }
                Ok(make_union(types))
            }
            TypeExpr::Option(inner) => {
                Ok(Ty::new(TyKind::Option(Box::new(self.type_from_ast(inner)?))))
            }
            TypeExpr::ErrorResult(inner) => {
                Ok(Ty::new(TyKind::ErrorResult(Box::new(self.type_from_ast(inner)?))))
            }
            TypeExpr::Array { element, length } => {
                let element = self.type_from_ast(element)?;
                match length {
                    None => Ok(Ty::list(element)),
                    Some(expr) => match &expr.node {
                        crate::parser::ast::Expr::IntLit(n) => Ok(Ty::new(TyKind::Array {
                            element: Box::new(element),
                            length: *n,
                            can_infer: false,
                        })),
                        _ => Err(TypeError::new(
                            "Array length must be an integer literal",
                            expr.span,
                        )),
                    },
                }
            }
            TypeExpr::Pointer { mutable, inner } => Ok(Ty::new(TyKind::Pointer {
                mutable: *mutable,
                inner: Box::new(self.type_from_ast(inner)?),
            })),
            TypeExpr::Void => Ok(Ty::void()),
            TypeExpr::Error => Ok(Ty::infer()),
        }
    }

    /// Resolve the symbol-level value a member type path names: modules and
    /// `Type`-wrapped nominals.
    fn member_type_value(&self, ty: &Spanned<TypeExpr>) -> Result<Ty, TypeError> {
        match &ty.node {
            TypeExpr::Name(name) => self
                .resolve_symbol(name)
                .ok_or_else(|| TypeError::new(format!("Type {name:?} is undefined"), ty.span)),
            TypeExpr::Member { left, member } => {
                let left_value = self.member_type_value(left)?;
                let ctx = self.ctx();
                types::member(&left_value, member, false, self.current_module, &ctx).ok_or_else(
                    || TypeError::new(format!("Type {member:?} is undefined"), ty.span),
                )
            }
            _ => Err(TypeError::new("Expected a type name", ty.span)),
        }
    }

    fn registered_id(&self, name: &str, kind: DefKind) -> Option<DefId> {
        let symbol = self.resolve_symbol(name)?;
        let TyKind::Type(inner) = symbol.kind else { return None };
        match (kind, inner.kind) {
            (DefKind::Struct, TyKind::Struct { id, .. })
            | (DefKind::TupleStruct, TyKind::TupleStruct { id, .. })
            | (DefKind::Interface, TyKind::Interface { id, .. })
            | (DefKind::Enum, TyKind::Enum { id, .. })
            | (DefKind::Explicit, TyKind::Explicit { id, .. }) => Some(id),
            _ => None,
        }
    }
}

#[derive(Clone, Copy)]
enum DefKind {
    Struct,
    TupleStruct,
    Interface,
    Enum,
    Explicit,
}
