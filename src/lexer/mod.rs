/// Token definitions for the zig language subset.
pub mod lexer;
