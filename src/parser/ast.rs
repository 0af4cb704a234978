use crate::span::Spanned;

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Spanned<Stmt>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKeyword {
    Let,
    Mut,
    Const,
}

impl DeclKeyword {
    pub fn as_str(self) -> &'static str {
        match self {
            DeclKeyword::Let => "let",
            DeclKeyword::Mut => "mut",
            DeclKeyword::Const => "const",
        }
    }

    pub fn is_constant(self) -> bool {
        matches!(self, DeclKeyword::Const)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodReceiver {
    pub ty: Spanned<TypeExpr>,
    pub mutable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Spanned<String>,
    pub ty: Spanned<TypeExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Spanned<String>,
    /// `fn (T) name()` receiver clause; marks a method.
    pub method_of: Option<MethodReceiver>,
    /// `fn Owner.name()` static member owner; mutually exclusive with a receiver.
    pub member_of: Option<Spanned<String>>,
    pub params: Vec<Param>,
    pub return_type: Option<Spanned<TypeExpr>>,
    pub body: Vec<Spanned<Stmt>>,
    pub exported: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub condition: Spanned<Expr>,
    pub body: Vec<Spanned<Stmt>>,
    pub else_branch: Option<Box<ElseBranch>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElseBranch {
    Block(Vec<Spanned<Stmt>>),
    If(Spanned<IfStmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructFieldDecl {
    pub name: Spanned<String>,
    pub ty: Spanned<TypeExpr>,
    pub exported: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceMemberDecl {
    pub name: Spanned<String>,
    /// Present iff the member is a function; holds its parameter types.
    pub params: Option<Vec<Spanned<TypeExpr>>>,
    pub result: Spanned<TypeExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnumPayload {
    Unit,
    Tuple(Vec<Spanned<TypeExpr>>),
    Struct(Vec<StructFieldDecl>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumMemberDecl {
    pub name: Spanned<String>,
    pub exported: bool,
    pub payload: EnumPayload,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportStmt {
    pub module: Spanned<String>,
    pub import_all: bool,
    pub symbols: Option<Vec<Spanned<String>>>,
    pub alias: Option<Spanned<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    VariableDeclaration {
        keyword: DeclKeyword,
        name: Spanned<String>,
        ty: Option<Spanned<TypeExpr>>,
        value: Option<Spanned<Expr>>,
        exported: bool,
    },
    FunctionDeclaration(FunctionDecl),
    If(IfStmt),
    While {
        condition: Spanned<Expr>,
        body: Vec<Spanned<Stmt>>,
    },
    For {
        variable: Spanned<String>,
        iterable: Spanned<Expr>,
        body: Vec<Spanned<Stmt>>,
    },
    Return(Option<Spanned<Expr>>),
    TypeDeclaration {
        name: Spanned<String>,
        ty: Spanned<TypeExpr>,
        exported: bool,
    },
    StructDeclaration {
        name: Spanned<String>,
        members: Vec<StructFieldDecl>,
        exported: bool,
    },
    TupleStructDeclaration {
        name: Spanned<String>,
        members: Vec<Spanned<TypeExpr>>,
        exported: bool,
    },
    UnitStructDeclaration {
        name: Spanned<String>,
        exported: bool,
    },
    InterfaceDeclaration {
        name: Spanned<String>,
        members: Vec<InterfaceMemberDecl>,
        exported: bool,
    },
    EnumDeclaration {
        name: Spanned<String>,
        is_union: bool,
        members: Vec<EnumMemberDecl>,
        exported: bool,
    },
    Import(ImportStmt),
    Expression(Spanned<Expr>),
    /// Placeholder produced during error recovery.
    Error,
}

impl Stmt {
    /// Whether a `pub` prefix may legally apply to this statement.
    pub fn is_exportable(&self) -> bool {
        matches!(
            self,
            Stmt::VariableDeclaration { .. }
                | Stmt::FunctionDeclaration(_)
                | Stmt::TypeDeclaration { .. }
                | Stmt::StructDeclaration { .. }
                | Stmt::TupleStructDeclaration { .. }
                | Stmt::UnitStructDeclaration { .. }
                | Stmt::InterfaceDeclaration { .. }
                | Stmt::EnumDeclaration { .. }
        )
    }

    pub fn exported(&self) -> bool {
        match self {
            Stmt::VariableDeclaration { exported, .. }
            | Stmt::TypeDeclaration { exported, .. }
            | Stmt::StructDeclaration { exported, .. }
            | Stmt::TupleStructDeclaration { exported, .. }
            | Stmt::UnitStructDeclaration { exported, .. }
            | Stmt::InterfaceDeclaration { exported, .. }
            | Stmt::EnumDeclaration { exported, .. } => *exported,
            Stmt::FunctionDeclaration(decl) => decl.exported,
            _ => false,
        }
    }

    pub fn mark_exported(&mut self) {
        match self {
            Stmt::VariableDeclaration { exported, .. }
            | Stmt::TypeDeclaration { exported, .. }
            | Stmt::StructDeclaration { exported, .. }
            | Stmt::TupleStructDeclaration { exported, .. }
            | Stmt::UnitStructDeclaration { exported, .. }
            | Stmt::InterfaceDeclaration { exported, .. }
            | Stmt::EnumDeclaration { exported, .. } => *exported = true,
            Stmt::FunctionDeclaration(decl) => decl.exported = true,
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    IntLit(i64),
    FloatLit(f64),
    StringLit(String),
    BoolLit(bool),
    NullLit,
    Ident(String),
    Binary {
        left: Box<Spanned<Expr>>,
        op: String,
        right: Box<Spanned<Expr>>,
    },
    Unary {
        op: String,
        operand: Box<Spanned<Expr>>,
        postfix: bool,
    },
    Assign {
        assignee: Box<Spanned<Expr>>,
        op: String,
        value: Box<Spanned<Expr>>,
    },
    Call {
        callee: Box<Spanned<Expr>>,
        args: Vec<Spanned<Expr>>,
    },
    Index {
        left: Box<Spanned<Expr>>,
        index: Box<Spanned<Expr>>,
    },
    Member {
        left: Box<Spanned<Expr>>,
        member: String,
        /// `tuple.0` style access.
        number_member: bool,
    },
    List(Vec<Spanned<Expr>>),
    Map(Vec<(Spanned<Expr>, Spanned<Expr>)>),
    Tuple(Vec<Spanned<Expr>>),
    StructLit {
        /// `Name` or `module.Name`.
        name: Box<Spanned<Expr>>,
        fields: Vec<(Spanned<String>, Spanned<Expr>)>,
    },
    Cast {
        left: Box<Spanned<Expr>>,
        ty: Spanned<TypeExpr>,
    },
    TypeCheck {
        left: Box<Spanned<Expr>>,
        ty: Spanned<TypeExpr>,
    },
    /// Placeholder produced during error recovery.
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Name(String),
    Member {
        left: Box<Spanned<TypeExpr>>,
        member: String,
    },
    Union(Vec<Spanned<TypeExpr>>),
    /// `T?`
    Option(Box<Spanned<TypeExpr>>),
    /// `T!`
    ErrorResult(Box<Spanned<TypeExpr>>),
    /// `T[]` (length `None`) or `T[n]`.
    Array {
        element: Box<Spanned<TypeExpr>>,
        length: Option<Box<Spanned<Expr>>>,
    },
    /// `*T` / `*mut T`
    Pointer {
        mutable: bool,
        inner: Box<Spanned<TypeExpr>>,
    },
    Void,
    /// Placeholder produced during error recovery.
    Error,
}
