//! zigc compiler driver.
//!
//! Usage:
//!   zigc <file.zig>              # compiles and links to <file>
//!   zigc <file.zig> -o out       # explicit output name
//!   zigc <file.zig> --static     # static relocation model
//!   zigc <file.zig> --emit-ir    # print LLVM IR and exit
//!
//! Pipeline:  source → Lexer → Parser → AST → analysis → LLVM IR → .o → ld

mod ast;
mod compiler;
mod errors;
mod lexer;
mod parser;

use std::env;
use std::fs;
use std::path::PathBuf;

use compiler::CodeGen;
use errors::{ErrorMsg, Phase};
use parser::Parser;

fn main() {
    // ── CLI argument handling ────────────────────────────────────
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        errors::fatal_with_hint(
            Phase::Codegen,
            "No input file specified",
            Some("Usage: zigc <source.zig> [-o output] [--static] [--emit-ir]".into()),
        );
    }

    let source_path = PathBuf::from(&args[1]);
    let is_static = args.iter().any(|a| a == "--static");
    let emit_ir_only = args.iter().any(|a| a == "--emit-ir");

    let output_path = if let Some(pos) = args.iter().position(|a| a == "-o") {
        PathBuf::from(args.get(pos + 1).unwrap_or_else(|| {
            errors::fatal(Phase::Codegen, "expected output path after -o")
        }))
    } else {
        let stem = source_path
            .file_stem()
            .unwrap_or_else(|| errors::fatal(Phase::Codegen, "input path has no file name"));
        PathBuf::from(stem)
    };

    // ── Read source ─────────────────────────────────────────────
    let source = fs::read_to_string(&source_path).unwrap_or_else(|e| {
        errors::fatal(
            Phase::Codegen,
            format!("Could not read {}: {e}", source_path.display()),
        );
    });

    errors::info(format!("compiling {}", source_path.display()));

    // ── Parse ───────────────────────────────────────────────────
    let root = Parser::new(&source).parse_root();

    // ── Analyze ─────────────────────────────────────────────────
    let context = inkwell::context::Context::create();
    let mut g = CodeGen::new(&context, &root, is_static, &source_path);

    g.semantic_analyze();
    if !g.errors().is_empty() {
        report_and_exit(&source_path, g.errors());
    }

    // ── Lower ───────────────────────────────────────────────────
    g.code_gen();
    if !g.errors().is_empty() {
        report_and_exit(&source_path, g.errors());
    }

    if emit_ir_only {
        print!("{}", g.ir_string());
        return;
    }

    // ── Emit object file & link ─────────────────────────────────
    compiler::linker::link(&g, &output_path);
    errors::success(format!("done → {}", output_path.display()));
}

/// Render every accumulated diagnostic and exit non-zero.
fn report_and_exit(source_path: &std::path::Path, diagnostics: &[ErrorMsg]) -> ! {
    let file = source_path.display().to_string();
    for err in diagnostics {
        errors::report_source(&file, err);
    }
    std::process::exit(1);
}
