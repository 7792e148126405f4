//! AST for the zig language subset.
//!
//! The tree is read-only after parsing with one exception: the analyzer
//! attaches the resolved type entity to each [`TypeRef`] through a
//! write-once cell.

use std::cell::Cell;

use crate::compiler::types::TypeId;

/// Source coordinates of a node, 1-based as emitted by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

/// The root of a parsed source file.
#[derive(Debug)]
pub struct Root {
    pub decls: Vec<TopLevelDecl>,
}

#[derive(Debug)]
pub enum TopLevelDecl {
    Extern(ExternBlock),
    FnDef(FnDef),
}

/// `extern { fn puts(s: *const u8) -> i32; ... }`
#[derive(Debug)]
pub struct ExternBlock {
    pub span: Span,
    pub fn_decls: Vec<FnDecl>,
}

/// A single declaration inside an extern block.
#[derive(Debug)]
pub struct FnDecl {
    pub span: Span,
    pub proto: FnProto,
}

/// `fn main() -> i32 { ... }`
#[derive(Debug)]
pub struct FnDef {
    pub span: Span,
    pub proto: FnProto,
    pub body: Block,
}

/// Name, parameters, and return type shared by declarations and definitions.
#[derive(Debug)]
pub struct FnProto {
    pub span: Span,
    pub name: String,
    pub params: Vec<ParamDecl>,
    pub return_type: TypeRef,
}

#[derive(Debug)]
pub struct ParamDecl {
    pub span: Span,
    pub name: String,
    pub ty: TypeRef,
}

/// A type as written in the source: a primitive name or a pointer over
/// another type reference.
#[derive(Debug)]
pub struct TypeRef {
    pub span: Span,
    pub kind: TypeRefKind,
    resolved: Cell<Option<TypeId>>,
}

#[derive(Debug)]
pub enum TypeRefKind {
    Primitive(String),
    Pointer { is_const: bool, child: Box<TypeRef> },
}

impl TypeRef {
    pub fn new(span: Span, kind: TypeRefKind) -> Self {
        Self { span, kind, resolved: Cell::new(None) }
    }

    /// Attach the resolved type entity.
    pub fn set_resolved(&self, id: TypeId) {
        self.resolved.set(Some(id));
    }

    /// The resolved type entity. Valid only after semantic analysis.
    pub fn resolved_ty(&self) -> TypeId {
        self.resolved.get().expect("type reference not resolved")
    }
}

#[derive(Debug)]
pub struct Block {
    pub span: Span,
    pub statements: Vec<Statement>,
}

#[derive(Debug)]
pub enum Statement {
    Return(Expr),
    Expr(Expr),
}

#[derive(Debug)]
pub struct Expr {
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Debug)]
pub enum ExprKind {
    /// A decimal integer literal, kept as source text until lowering.
    Number(String),
    /// A byte string literal with escapes already processed.
    Str(Vec<u8>),
    FnCall { name: String, args: Vec<Expr> },
    Unreachable,
}
