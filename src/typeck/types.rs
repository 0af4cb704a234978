use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use super::defs::{DefId, TypeDefs};
use super::registry::Registry;
use crate::span::Span;

/// Short-circuit signal returned by every type check function. The stage
/// drivers convert the first one they see into a diagnostic.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("TypeError at line {}, column {}: {message}", span.line, span.column)]
pub struct TypeError {
    pub message: String,
    pub span: Span,
}

impl TypeError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self { message: message.into(), span }
    }
}

/// Everything the type algebra needs to look through nominal references:
/// the shape arena, the injected registries, and per-module export tables.
pub struct TypeCtx<'a> {
    pub defs: &'a TypeDefs,
    pub registry: &'a Registry,
    pub exports: &'a HashMap<u32, HashMap<String, Ty>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionTy {
    pub name: String,
    pub params: Vec<Ty>,
    pub return_type: Ty,
    pub method_of: Option<Ty>,
    pub exported: bool,
    pub module: u32,
}

#[derive(Debug, Clone)]
pub struct Ty {
    pub kind: TyKind,
    /// Read-only: assignment through this value is rejected. Propagates
    /// through member and index access.
    pub constant: bool,
    /// Whether this type was obtained by reading a named variable rather
    /// than from a literal. Untyped-number promotion only applies to
    /// literal-sourced types.
    pub was_variable: bool,
    /// Module that produced the value, for visibility checks. 0 bypasses.
    pub module: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TyKind {
    Int,
    Float,
    Bool,
    Str,
    Null,
    Void,
    /// Top type used by built-in signatures; accepts everything but void.
    /// Not denotable in source.
    Any,
    /// Numeric literal that has not yet unified with a concrete type.
    UntypedNumber { int_assignable: bool },
    /// Unresolved placeholder inside partial types (empty list literals,
    /// wildcard array lengths). Accepts anything.
    Infer,
    List(Box<Ty>),
    Array {
        element: Box<Ty>,
        /// -1 is the wildcard length.
        length: i64,
        /// Set on array literals so they may specialise to lists and sized
        /// arrays via `infer`.
        can_infer: bool,
    },
    Map {
        key: Box<Ty>,
        value: Box<Ty>,
    },
    Tuple(Vec<Ty>),
    Pointer {
        mutable: bool,
        inner: Box<Ty>,
    },
    Option(Box<Ty>),
    /// `T!`: the value or anything satisfying the `error` interface.
    ErrorResult(Box<Ty>),
    Function(Box<FunctionTy>),
    Union(Vec<Ty>),
    Struct { id: DefId, name: String },
    TupleStruct { id: DefId, name: String },
    UnitStruct { id: DefId, name: String },
    Interface { id: DefId, name: String },
    Enum { id: DefId, name: String },
    /// Nominal newtype from a `type` declaration.
    Explicit { id: DefId, name: String },
    Module { id: u32, name: String },
    /// Marks "this is a type, not a value".
    Type(Box<Ty>),
}

impl PartialEq for Ty {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Ty {
    pub fn new(kind: TyKind) -> Self {
        Self { kind, constant: false, was_variable: false, module: 0 }
    }

    pub fn int() -> Self {
        Self::new(TyKind::Int)
    }

    pub fn float() -> Self {
        Self::new(TyKind::Float)
    }

    pub fn bool() -> Self {
        Self::new(TyKind::Bool)
    }

    pub fn string() -> Self {
        Self::new(TyKind::Str)
    }

    pub fn null() -> Self {
        Self::new(TyKind::Null)
    }

    pub fn void() -> Self {
        Self::new(TyKind::Void)
    }

    pub fn any() -> Self {
        Self::new(TyKind::Any)
    }

    pub fn infer() -> Self {
        Self::new(TyKind::Infer)
    }

    pub fn untyped_int() -> Self {
        Self::new(TyKind::UntypedNumber { int_assignable: true })
    }

    pub fn untyped_float() -> Self {
        Self::new(TyKind::UntypedNumber { int_assignable: false })
    }

    pub fn list(element: Ty) -> Self {
        Self::new(TyKind::List(Box::new(element)))
    }

    pub fn function(f: FunctionTy) -> Self {
        Self::new(TyKind::Function(Box::new(f)))
    }

    pub fn type_of(inner: Ty) -> Self {
        Self::new(TyKind::Type(Box::new(inner)))
    }

    pub fn with_constant(mut self, constant: bool) -> Self {
        self.constant = constant;
        self
    }

    pub fn is_untyped(&self) -> bool {
        matches!(self.kind, TyKind::UntypedNumber { .. })
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.kind, TyKind::Int | TyKind::Float | TyKind::UntypedNumber { .. })
    }

    /// "A value of type `other` may appear where `self` is required."
    /// Deliberately not symmetric.
    pub fn valid(&self, other: &Ty, ctx: &TypeCtx) -> bool {
        match (&self.kind, &other.kind) {
            (TyKind::Infer, _) => true,
            (TyKind::Any, kind) => !matches!(kind, TyKind::Void),
            (TyKind::Type(inner), _) => inner.valid(other, ctx),
            (_, TyKind::Type(inner)) => self.valid(inner, ctx),

            (TyKind::Int, TyKind::Int) => true,
            (TyKind::Int, TyKind::UntypedNumber { int_assignable }) => *int_assignable,
            (TyKind::Float, TyKind::Float) => true,
            (TyKind::Float, TyKind::UntypedNumber { .. }) => true,
            (TyKind::UntypedNumber { .. }, TyKind::UntypedNumber { .. }) => true,
            (TyKind::Bool, TyKind::Bool) => true,
            (TyKind::Str, TyKind::Str) => true,
            (TyKind::Null, TyKind::Null) => true,
            (TyKind::Void, TyKind::Void) => true,

            (TyKind::List(elem), TyKind::List(other_elem)) => {
                matches!(other_elem.kind, TyKind::Infer)
                    || (elem.valid(other_elem, ctx) && other_elem.valid(elem, ctx))
            }
            (TyKind::List(elem), TyKind::Array { element, can_infer, .. }) => {
                *can_infer && (matches!(element.kind, TyKind::Infer) || elem.valid(element, ctx))
            }
            (
                TyKind::Array { element, length, .. },
                TyKind::Array { element: other_element, length: other_length, can_infer },
            ) => {
                let lengths_match = *length == -1 || length == other_length;
                let elements_match = if matches!(other_element.kind, TyKind::Infer) {
                    true
                } else if *can_infer {
                    // Literals only need one-way element compatibility; they
                    // specialise to the required element type.
                    element.valid(other_element, ctx)
                } else {
                    element.valid(other_element, ctx) && other_element.valid(element, ctx)
                };
                lengths_match && elements_match
            }
            (TyKind::Map { key, value }, TyKind::Map { key: ok, value: ov }) => {
                key.valid(ok, ctx) && value.valid(ov, ctx)
            }
            (TyKind::Tuple(members), TyKind::Tuple(other_members)) => {
                members.len() == other_members.len()
                    && members
                        .iter()
                        .zip(other_members.iter())
                        .all(|(m, o)| m.valid(o, ctx))
            }
            (
                TyKind::Pointer { mutable, inner },
                TyKind::Pointer { mutable: other_mutable, inner: other_inner },
            ) => (!*mutable || *other_mutable) && inner.valid(other_inner, ctx),

            (TyKind::Option(inner), TyKind::Option(other_inner)) => inner.valid(other_inner, ctx),
            (TyKind::Option(_), TyKind::Null) => true,
            (TyKind::Option(inner), _) => inner.valid(other, ctx),

            (TyKind::ErrorResult(result), TyKind::ErrorResult(other_result)) => {
                result.valid(other_result, ctx)
            }
            (TyKind::ErrorResult(result), _) => {
                result.valid(other, ctx) || ctx.registry.error_interface.valid(other, ctx)
            }

            (TyKind::Function(f), TyKind::Function(other_f)) => {
                f.name == other_f.name
                    && f.params.len() == other_f.params.len()
                    && f.params
                        .iter()
                        .zip(other_f.params.iter())
                        .all(|(p, o)| p.valid(o, ctx))
                    && f.return_type.valid(&other_f.return_type, ctx)
            }

            (TyKind::Struct { id, .. }, TyKind::Struct { id: other_id, .. }) => id == other_id,
            (TyKind::TupleStruct { id, .. }, TyKind::TupleStruct { id: other_id, .. }) => {
                id == other_id
            }
            (TyKind::UnitStruct { id, .. }, TyKind::UnitStruct { id: other_id, .. }) => {
                id == other_id
            }
            (TyKind::Explicit { id, .. }, TyKind::Explicit { id: other_id, .. }) => id == other_id,

            (TyKind::Interface { id, .. }, _) => {
                let def = &ctx.defs.interfaces[*id];
                def.members.iter().all(|(name, member_ty)| {
                    match member(other, name, false, 0, ctx) {
                        Some(found) => member_ty.valid(&found, ctx),
                        None => false,
                    }
                })
            }

            (TyKind::Enum { id, .. }, TyKind::Enum { id: other_id, .. }) if id == other_id => true,
            (TyKind::Enum { id, .. }, _) => {
                let def = &ctx.defs.enums[*id];
                def.variants.iter().any(|variant| variant.ty.valid(other, ctx))
            }

            (TyKind::Union(_), TyKind::Union(other_members)) => {
                // Every possible value of the source union must be accepted.
                other_members.iter().all(|m| self.valid(m, ctx))
            }
            (TyKind::Union(members), _) => members.iter().any(|m| m.valid(other, ctx)),

            _ => false,
        }
    }

    /// Specialise a declared (possibly partial) type against the type of an
    /// assigned value. Returns the concrete type to use and whether the
    /// assignment is acceptable.
    pub fn infer(&self, value: &Ty, ctx: &TypeCtx) -> (Ty, bool) {
        match (&self.kind, &value.kind) {
            (TyKind::Int, TyKind::UntypedNumber { int_assignable }) => {
                (Ty::int(), *int_assignable)
            }
            (TyKind::Float, TyKind::UntypedNumber { .. }) => (Ty::float(), true),

            (TyKind::List(elem), _) => {
                if !self.valid(value, ctx) {
                    return (self.clone(), false);
                }
                if !matches!(elem.kind, TyKind::Infer) {
                    return (self.clone(), true);
                }
                match &value.kind {
                    TyKind::Array { element, .. } | TyKind::List(element) => {
                        let element = if matches!(element.kind, TyKind::Infer) {
                            Ty::void()
                        } else {
                            element.as_ref().clone().to_real()
                        };
                        (Ty::list(element), true)
                    }
                    _ => (value.clone(), true),
                }
            }

            (
                TyKind::Array { element, length, .. },
                TyKind::Array { element: value_element, length: value_length, .. },
            ) => {
                if !self.valid(value, ctx) {
                    return (self.clone(), false);
                }
                let length = if *length == -1 { *value_length } else { *length };
                let element = if matches!(element.kind, TyKind::Infer) {
                    value_element.as_ref().clone().to_real()
                } else {
                    element.as_ref().clone()
                };
                (
                    Ty::new(TyKind::Array { element: Box::new(element), length, can_infer: false }),
                    true,
                )
            }

            _ => (self.clone(), self.valid(value, ctx)),
        }
    }

    /// Collapse partial information into a storable type: untyped numbers
    /// take their defaults and array literals become lists.
    pub fn to_real(self) -> Ty {
        let Ty { kind, constant, was_variable, module } = self;
        let kind = match kind {
            TyKind::UntypedNumber { int_assignable } => {
                if int_assignable {
                    TyKind::Int
                } else {
                    TyKind::Float
                }
            }
            TyKind::Array { element, can_infer: true, .. } => {
                let element = if matches!(element.kind, TyKind::Infer) {
                    Ty::infer()
                } else {
                    element.as_ref().clone().to_real()
                };
                TyKind::List(Box::new(element))
            }
            TyKind::List(element) => TyKind::List(Box::new(element.as_ref().clone().to_real())),
            TyKind::Map { key, value } => TyKind::Map {
                key: Box::new(key.as_ref().clone().to_real()),
                value: Box::new(value.as_ref().clone().to_real()),
            },
            TyKind::Tuple(members) => {
                TyKind::Tuple(members.into_iter().map(Ty::to_real).collect())
            }
            TyKind::Union(members) => {
                TyKind::Union(members.into_iter().map(Ty::to_real).collect())
            }
            other => other,
        };
        Ty { kind, constant, was_variable, module }
    }

    /// Result of indexing `self` with a value of `index` type, or None when
    /// not indexable that way.
    pub fn index_by(&self, index: &Ty, ctx: &TypeCtx) -> Option<Ty> {
        let int = Ty::int();
        let result = match &self.kind {
            TyKind::List(element) | TyKind::Array { element, .. } => {
                if int.valid(index, ctx) {
                    Some(element.as_ref().clone())
                } else {
                    None
                }
            }
            TyKind::Map { key, value } => {
                if key.valid(index, ctx) {
                    Some(value.as_ref().clone())
                } else {
                    None
                }
            }
            _ => None,
        };
        result.map(|ty| {
            let constant = ty.constant || self.constant;
            ty.with_constant(constant)
        })
    }
}

/// Build the smallest union over `types`: empty becomes void, a single type
/// stays itself.
pub fn make_union(types: Vec<Ty>) -> Ty {
    match types.len() {
        0 => Ty::void(),
        1 => types.into_iter().next().unwrap(),
        _ => Ty::new(TyKind::Union(types)),
    }
}

fn is_foreign(def_module: u32, accessor: u32) -> bool {
    def_module != 0 && accessor != 0 && def_module != accessor
}

/// Member lookup: registered methods first, then the type's own members,
/// gated by module visibility. Constness propagates from the receiver.
pub fn member(ty: &Ty, name: &str, number_member: bool, accessor: u32, ctx: &TypeCtx) -> Option<Ty> {
    let result = lookup_member(ty, name, number_member, accessor, ctx)?;
    let constant = result.constant || ty.constant;
    Some(result.with_constant(constant))
}

fn lookup_member(
    ty: &Ty,
    name: &str,
    number_member: bool,
    accessor: u32,
    ctx: &TypeCtx,
) -> Option<Ty> {
    if number_member {
        let position: usize = name.parse().ok()?;
        return match &ty.kind {
            TyKind::Tuple(members) => members.get(position).cloned(),
            TyKind::TupleStruct { id, .. } => {
                ctx.defs.tuple_structs[*id].members.get(position).cloned()
            }
            _ => None,
        };
    }

    // Methods shadow structural members.
    if let Some(overloads) = ctx.registry.methods.get(name) {
        for function in overloads {
            let Some(receiver) = &function.method_of else { continue };
            if !receiver.valid(ty, ctx) {
                continue;
            }
            if is_foreign(function.module, accessor) && !function.exported {
                continue;
            }
            return Some(Ty::function(function.clone()));
        }
    }

    match &ty.kind {
        TyKind::Struct { id, .. } => {
            let def = &ctx.defs.structs[*id];
            let member = def.members.iter().find(|m| m.name == name)?;
            if is_foreign(def.module, accessor) && !member.exported {
                return None;
            }
            Some(member.ty.clone())
        }
        TyKind::Interface { id, .. } => {
            let def = &ctx.defs.interfaces[*id];
            def.members.iter().find(|(n, _)| n == name).map(|(_, t)| t.clone())
        }
        TyKind::Enum { id, .. } => {
            let def = &ctx.defs.enums[*id];
            let variant = def.variants.iter().find(|v| v.name == name)?;
            if is_foreign(def.module, accessor) && !variant.exported {
                return None;
            }
            Some(variant.ty.clone())
        }
        TyKind::Module { id, .. } => ctx.exports.get(id)?.get(name).cloned(),
        TyKind::Type(inner) => {
            let type_name = inner.to_string();
            if let Some(function) = ctx.registry.statics.get(&(type_name, name.to_string())) {
                if !is_foreign(function.module, accessor) || function.exported {
                    return Some(Ty::function(function.clone()));
                }
                return None;
            }
            lookup_member(inner, name, number_member, accessor, ctx)
        }
        _ => None,
    }
}

/// Whether an explicit `value as T` conversion is permitted.
pub fn can_cast(from: &Ty, to: &Ty, ctx: &TypeCtx) -> bool {
    if to.valid(from, ctx) || from.valid(to, ctx) {
        return true;
    }
    if from.is_numeric() && to.is_numeric() {
        return true;
    }
    if let TyKind::Explicit { id, .. } = &from.kind {
        let underlying = ctx.defs.explicits[*id].underlying.clone();
        return can_cast(&underlying, to, ctx);
    }
    if let TyKind::Explicit { id, .. } = &to.kind {
        let underlying = ctx.defs.explicits[*id].underlying.clone();
        return can_cast(from, &underlying, ctx);
    }
    false
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TyKind::Int => write!(f, "i32"),
            TyKind::Float => write!(f, "f32"),
            TyKind::Bool => write!(f, "bool"),
            TyKind::Str => write!(f, "string"),
            TyKind::Null => write!(f, "null"),
            TyKind::Void => write!(f, "void"),
            TyKind::Any => write!(f, "any"),
            TyKind::UntypedNumber { int_assignable } => {
                if *int_assignable {
                    write!(f, "untyped int")
                } else {
                    write!(f, "untyped float")
                }
            }
            TyKind::Infer => write!(f, "Infer"),
            TyKind::List(element) => {
                if matches!(element.kind, TyKind::Union(_)) {
                    write!(f, "({element})[]")
                } else {
                    write!(f, "{element}[]")
                }
            }
            TyKind::Array { element, length, .. } => {
                let length = if *length == -1 { "_".to_string() } else { length.to_string() };
                if matches!(element.kind, TyKind::Union(_)) {
                    write!(f, "({element})[{length}]")
                } else {
                    write!(f, "{element}[{length}]")
                }
            }
            TyKind::Map { key, value } => write!(f, "{{{key}: {value}}}"),
            TyKind::Tuple(members) => {
                write!(f, "(")?;
                for (i, member) in members.iter().enumerate() {
                    if i != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{member}")?;
                }
                write!(f, ")")
            }
            TyKind::Pointer { mutable, inner } => {
                if *mutable {
                    write!(f, "*mut {inner}")
                } else {
                    write!(f, "*{inner}")
                }
            }
            TyKind::Option(inner) => {
                if matches!(inner.kind, TyKind::Union(_)) {
                    write!(f, "({inner})?")
                } else {
                    write!(f, "{inner}?")
                }
            }
            TyKind::ErrorResult(result) => {
                if matches!(result.kind, TyKind::Union(_)) {
                    write!(f, "({result})!")
                } else {
                    write!(f, "{result}!")
                }
            }
            TyKind::Function(function) => {
                write!(f, "fn(")?;
                for (i, param) in function.params.iter().enumerate() {
                    if i != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, "): {}", function.return_type)
            }
            TyKind::Union(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i != 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{member}")?;
                }
                Ok(())
            }
            TyKind::Struct { name, .. }
            | TyKind::TupleStruct { name, .. }
            | TyKind::UnitStruct { name, .. }
            | TyKind::Interface { name, .. }
            | TyKind::Enum { name, .. }
            | TyKind::Explicit { name, .. }
            | TyKind::Module { name, .. } => write!(f, "{name}"),
            TyKind::Type(inner) => write!(f, "{inner}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typeck::registry::Registry;

    fn with_ctx<T>(f: impl FnOnce(&TypeCtx) -> T) -> T {
        let mut defs = TypeDefs::new();
        let registry = Registry::new(&mut defs);
        let exports = HashMap::new();
        let ctx = TypeCtx { defs: &defs, registry: &registry, exports: &exports };
        f(&ctx)
    }

    #[test]
    fn primitives_accept_only_themselves() {
        with_ctx(|ctx| {
            assert!(Ty::int().valid(&Ty::int(), ctx));
            assert!(!Ty::int().valid(&Ty::float(), ctx));
            assert!(!Ty::float().valid(&Ty::int(), ctx));
            assert!(Ty::bool().valid(&Ty::bool(), ctx));
            assert!(!Ty::string().valid(&Ty::bool(), ctx));
        });
    }

    #[test]
    fn untyped_numbers_flow_into_concrete_numerics() {
        with_ctx(|ctx| {
            assert!(Ty::int().valid(&Ty::untyped_int(), ctx));
            assert!(!Ty::int().valid(&Ty::untyped_float(), ctx));
            assert!(Ty::float().valid(&Ty::untyped_int(), ctx));
            assert!(Ty::float().valid(&Ty::untyped_float(), ctx));
            // Not the reverse.
            assert!(!Ty::untyped_int().valid(&Ty::int(), ctx));
        });
    }

    #[test]
    fn union_is_pointwise_containment() {
        with_ctx(|ctx| {
            let union = make_union(vec![Ty::int(), Ty::string()]);
            assert!(union.valid(&Ty::int(), ctx));
            assert!(union.valid(&Ty::string(), ctx));
            assert!(!union.valid(&Ty::bool(), ctx));

            let smaller = make_union(vec![Ty::int()]);
            assert!(union.valid(&smaller, ctx));

            let bigger = make_union(vec![Ty::int(), Ty::string(), Ty::bool()]);
            assert!(!union.valid(&bigger, ctx));
        });
    }

    #[test]
    fn option_accepts_inner_and_null() {
        with_ctx(|ctx| {
            let option = Ty::new(TyKind::Option(Box::new(Ty::int())));
            assert!(option.valid(&Ty::int(), ctx));
            assert!(option.valid(&Ty::null(), ctx));
            assert!(option.valid(&option, ctx));
            assert!(!option.valid(&Ty::string(), ctx));
        });
    }

    #[test]
    fn array_wildcard_length() {
        with_ctx(|ctx| {
            let wildcard = Ty::new(TyKind::Array {
                element: Box::new(Ty::int()),
                length: -1,
                can_infer: false,
            });
            let sized = Ty::new(TyKind::Array {
                element: Box::new(Ty::int()),
                length: 3,
                can_infer: false,
            });
            let other_size = Ty::new(TyKind::Array {
                element: Box::new(Ty::int()),
                length: 4,
                can_infer: false,
            });
            assert!(wildcard.valid(&sized, ctx));
            assert!(!sized.valid(&other_size, ctx));
        });
    }

    #[test]
    fn list_accepts_inferable_array_literal() {
        with_ctx(|ctx| {
            let list = Ty::list(Ty::int());
            let literal = Ty::new(TyKind::Array {
                element: Box::new(Ty::untyped_int()),
                length: 2,
                can_infer: true,
            });
            assert!(list.valid(&literal, ctx));

            let plain_array = Ty::new(TyKind::Array {
                element: Box::new(Ty::int()),
                length: 2,
                can_infer: false,
            });
            assert!(!list.valid(&plain_array, ctx));
        });
    }

    #[test]
    fn empty_list_literal_specialises() {
        with_ctx(|ctx| {
            let declared = Ty::list(Ty::int());
            let literal = Ty::new(TyKind::Array {
                element: Box::new(Ty::infer()),
                length: 0,
                can_infer: true,
            });
            let (ty, ok) = declared.infer(&literal, ctx);
            assert!(ok);
            assert_eq!(ty, Ty::list(Ty::int()));
        });
    }

    #[test]
    fn untyped_literal_narrows_to_declared() {
        with_ctx(|ctx| {
            let (ty, ok) = Ty::int().infer(&Ty::untyped_int(), ctx);
            assert!(ok);
            assert_eq!(ty, Ty::int());

            let (_, ok) = Ty::int().infer(&Ty::untyped_float(), ctx);
            assert!(!ok);

            let (ty, ok) = Ty::float().infer(&Ty::untyped_int(), ctx);
            assert!(ok);
            assert_eq!(ty, Ty::float());
        });
    }

    #[test]
    fn to_real_concretises_partials() {
        assert_eq!(Ty::untyped_int().to_real(), Ty::int());
        assert_eq!(Ty::untyped_float().to_real(), Ty::float());

        let literal = Ty::new(TyKind::Array {
            element: Box::new(Ty::untyped_int()),
            length: 2,
            can_infer: true,
        });
        assert_eq!(literal.to_real(), Ty::list(Ty::int()));
    }

    #[test]
    fn indexing_rules() {
        with_ctx(|ctx| {
            let list = Ty::list(Ty::string());
            assert_eq!(list.index_by(&Ty::int(), ctx), Some(Ty::string()));
            assert_eq!(list.index_by(&Ty::untyped_int(), ctx), Some(Ty::string()));
            assert_eq!(list.index_by(&Ty::string(), ctx), None);

            let map = Ty::new(TyKind::Map {
                key: Box::new(Ty::string()),
                value: Box::new(Ty::float()),
            });
            assert_eq!(map.index_by(&Ty::string(), ctx), Some(Ty::float()));
            assert_eq!(map.index_by(&Ty::int(), ctx), None);
        });
    }

    #[test]
    fn constness_propagates_through_indexing() {
        with_ctx(|ctx| {
            let list = Ty::list(Ty::string()).with_constant(true);
            let element = list.index_by(&Ty::int(), ctx).unwrap();
            assert!(element.constant);
        });
    }

    #[test]
    fn numeric_cross_casts() {
        with_ctx(|ctx| {
            assert!(can_cast(&Ty::int(), &Ty::float(), ctx));
            assert!(can_cast(&Ty::float(), &Ty::int(), ctx));
            assert!(!can_cast(&Ty::int(), &Ty::bool(), ctx));
        });
    }

    #[test]
    fn error_result_accepts_value_and_error() {
        with_ctx(|ctx| {
            let result = Ty::new(TyKind::ErrorResult(Box::new(Ty::int())));
            assert!(result.valid(&Ty::int(), ctx));
            assert!(result.valid(&result, ctx));
            assert!(!result.valid(&Ty::string(), ctx));
        });
    }

    #[test]
    fn display_forms() {
        assert_eq!(Ty::int().to_string(), "i32");
        assert_eq!(Ty::list(Ty::int()).to_string(), "i32[]");
        assert_eq!(
            make_union(vec![Ty::int(), Ty::string()]).to_string(),
            "i32 | string"
        );
        assert_eq!(
            Ty::new(TyKind::Option(Box::new(Ty::string()))).to_string(),
            "string?"
        );
        assert_eq!(
            Ty::new(TyKind::Pointer { mutable: true, inner: Box::new(Ty::int()) }).to_string(),
            "*mut i32"
        );
        assert_eq!(
            Ty::new(TyKind::Array { element: Box::new(Ty::int()), length: -1, can_infer: false })
                .to_string(),
            "i32[_]"
        );
    }
}
