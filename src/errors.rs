//! Error reporting: the accumulated diagnostics sink plus pretty,
//! coloured fatal/status output.

use std::fmt;

use crate::ast::Span;

/// The phase of compilation where an error occurred.
#[derive(Debug, Clone, Copy)]
pub enum Phase {
    Lexer,
    Parser,
    Codegen,
    Linker,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Lexer => write!(f, "lex"),
            Phase::Parser => write!(f, "parse"),
            Phase::Codegen => write!(f, "codegen"),
            Phase::Linker => write!(f, "link"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// Source diagnostics
// ═══════════════════════════════════════════════════════════════════

/// A user-level source error accumulated during analysis or lowering.
///
/// End coordinates are never produced by the current passes; `None`
/// means unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMsg {
    pub line_start: u32,
    pub column_start: u32,
    #[allow(dead_code)]
    pub line_end: Option<u32>,
    #[allow(dead_code)]
    pub column_end: Option<u32>,
    pub msg: String,
}

impl ErrorMsg {
    /// Build an entry pinned to the start coordinates of a node.
    pub fn at(span: Span, msg: impl Into<String>) -> Self {
        Self {
            line_start: span.line,
            column_start: span.column,
            line_end: None,
            column_end: None,
            msg: msg.into(),
        }
    }
}

impl fmt::Display for ErrorMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line_start, self.column_start, self.msg)
    }
}

/// Print a source diagnostic to stderr with red colouring (ANSI).
pub fn report_source(file: &str, err: &ErrorMsg) {
    eprintln!("\x1b[1;31merror:\x1b[0m \x1b[1m{file}:{err}\x1b[0m");
}

// ═══════════════════════════════════════════════════════════════════
// Fatal errors
// ═══════════════════════════════════════════════════════════════════

/// Shorthand: print a phase-tagged error red and exit.
pub fn fatal(phase: Phase, message: impl Into<String>) -> ! {
    fatal_with_hint(phase, message, None)
}

/// Shorthand: print a phase-tagged error with a hint and exit.
pub fn fatal_with_hint(phase: Phase, message: impl Into<String>, hint: Option<String>) -> ! {
    eprintln!(
        "\x1b[1;31merror\x1b[0m\x1b[1m[{}]:\x1b[0m {}",
        phase,
        message.into(),
    );
    if let Some(hint) = hint {
        eprintln!("  \x1b[1;36mhint:\x1b[0m {hint}");
    }
    std::process::exit(1);
}

// ═══════════════════════════════════════════════════════════════════
// Status messages (blue [zigc] tag)
// ═══════════════════════════════════════════════════════════════════

/// Print a status/info message with a coloured `[zigc]` prefix.
pub fn info(message: impl fmt::Display) {
    eprintln!("\x1b[1;34m[zigc]\x1b[0m {message}");
}

/// Print a success message in green.
pub fn success(message: impl fmt::Display) {
    eprintln!("\x1b[1;32m[zigc]\x1b[0m {message}");
}
