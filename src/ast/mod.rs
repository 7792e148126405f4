/// AST node types produced by the parser.
pub mod ast;

pub use ast::*;
