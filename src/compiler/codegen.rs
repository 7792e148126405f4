//! Code generation: pass 2, lowers function bodies to LLVM IR.
//!
//! Runs only after semantic analysis, so every type reference reachable
//! from a registered definition is resolved and every extern signature is
//! known. Call-site errors (unknown callee, arity mismatch) are recorded
//! in the diagnostics sink and lowering continues with an `i32` zero
//! placeholder so one run can report every error.

use inkwell::debug_info::{
    AsDIScope, DIFile, DIFlags, DIFlagsConstants, DIScope, DISubroutineType, DIType,
};
use inkwell::module::Linkage;
use inkwell::types::StringRadix;
use inkwell::values::{BasicMetadataValueEnum, BasicValueEnum, GlobalValue, UnnamedAddress};

use crate::ast::{Block, Expr, ExprKind, FnDef, FnProto, Statement};
use crate::errors::{self, Phase};

use super::compiler::CodeGen;

/// Lower every registered function definition, then finalize debug info,
/// dump the module for inspection, and verify it. A verifier rejection is
/// an internal bug, not a user error.
pub(crate) fn gen_module<'ctx, 'ast>(g: &mut CodeGen<'ctx, 'ast>) {
    let defs: Vec<&'ast FnDef> = g.fn_defs.values().copied().collect();
    for def in defs {
        gen_fn_def(g, def);
    }

    g.dibuilder.finalize();

    g.module.print_to_stderr();

    if let Err(err) = g.module.verify() {
        errors::fatal(Phase::Codegen, format!("invalid module: {err}"));
    }
}

fn gen_fn_def<'ctx, 'ast>(g: &mut CodeGen<'ctx, 'ast>, def: &'ast FnDef) {
    let proto = &def.proto;
    let param_ids: Vec<_> = proto.params.iter().map(|p| p.ty.resolved_ty()).collect();
    let return_id = proto.return_type.resolved_ty();

    // The extern path builds its own IR types; definitions recompute
    // theirs from the resolved prototype.
    let fn_type = g.types.fn_type(g.context, return_id, &param_ids);
    let fn_value = g
        .module
        .add_function(&proto.name, fn_type, Some(Linkage::External));
    if g.types.is_unreachable(return_id) {
        g.add_fn_attribute(fn_value, "noreturn");
    }
    // This language has no exceptions.
    g.add_fn_attribute(fn_value, "nounwind");

    let file = g.compile_unit.get_file();
    let line = def.span.line;
    let subprogram = g.dibuilder.create_function(
        file.as_debug_info_scope(),
        &proto.name,
        None,
        file,
        line,
        create_di_fn_type(g, proto, file),
        false,
        true,
        line,
        DIFlags::ZERO,
        false,
    );
    fn_value.set_subprogram(subprogram);

    let entry = g.context.append_basic_block(fn_value, "entry");
    g.builder.position_at_end(entry);

    gen_block(g, &def.body, subprogram.as_debug_info_scope());
}

/// The DWARF subroutine type: return type first, then the parameters in
/// order.
fn create_di_fn_type<'ctx>(
    g: &CodeGen<'ctx, '_>,
    proto: &FnProto,
    file: DIFile<'ctx>,
) -> DISubroutineType<'ctx> {
    let return_di = g.types.entry(proto.return_type.resolved_ty()).di_type;
    let param_di: Vec<DIType<'ctx>> = proto
        .params
        .iter()
        .map(|p| g.types.entry(p.ty.resolved_ty()).di_type)
        .collect();
    g.dibuilder
        .create_subroutine_type(file, Some(return_di), &param_di, DIFlags::ZERO)
}

fn gen_block<'ctx, 'ast>(g: &mut CodeGen<'ctx, 'ast>, block: &'ast Block, scope: DIScope<'ctx>) {
    for statement in &block.statements {
        // Every instruction inside a function with a subprogram needs a
        // source location; pin the builder to the statement being lowered.
        let expr = match statement {
            Statement::Return(expr) | Statement::Expr(expr) => expr,
        };
        let location = g.dibuilder.create_debug_location(
            g.context,
            expr.span.line,
            expr.span.column,
            scope,
            None,
        );
        g.builder.set_current_debug_location(location);

        match statement {
            Statement::Return(expr) => {
                match gen_expr(g, expr) {
                    Some(value) => g.builder.build_return(Some(&value)),
                    None => g.builder.build_return(None),
                }
                .expect("build return");
            }
            Statement::Expr(expr) => {
                gen_expr(g, expr);
            }
        }
    }
}

/// Lower a single expression.
///
/// Returns `None` for expressions with no value: calls to `void` externs
/// and the `unreachable` terminator.
fn gen_expr<'ctx, 'ast>(
    g: &mut CodeGen<'ctx, 'ast>,
    expr: &'ast Expr,
) -> Option<BasicValueEnum<'ctx>> {
    match &expr.kind {
        ExprKind::Number(text) => {
            // Base-10 into an i32 constant; overflow wraps silently.
            let value = g
                .context
                .i32_type()
                .const_int_from_string(text, StringRadix::Decimal)
                .expect("decimal literal");
            Some(value.into())
        }

        ExprKind::Str(bytes) => {
            let global = find_or_create_string(g, bytes);
            let zero = g.context.i32_type().const_zero();
            // Both indices zero: step through the global, then to the
            // first byte of the array.
            let ptr = unsafe {
                g.builder
                    .build_in_bounds_gep(global.as_pointer_value(), &[zero, zero], "")
            }
            .expect("build string gep");
            Some(ptr.into())
        }

        ExprKind::FnCall { name, args } => gen_fn_call(g, expr, name, args),

        ExprKind::Unreachable => {
            g.builder.build_unreachable().expect("build unreachable");
            None
        }
    }
}

fn gen_fn_call<'ctx, 'ast>(
    g: &mut CodeGen<'ctx, 'ast>,
    call_node: &'ast Expr,
    name: &str,
    args: &'ast [Expr],
) -> Option<BasicValueEnum<'ctx>> {
    let entry = match g.fn_table.get(name) {
        Some(entry) => *entry,
        None => {
            g.add_error(call_node.span, format!("undefined function: '{name}'"));
            return Some(g.context.i32_type().const_zero().into());
        }
    };

    let expected = entry.proto.params.len();
    let actual = args.len();
    if expected != actual {
        g.add_error(
            call_node.span,
            format!("wrong number of arguments. Expected {expected}, got {actual}."),
        );
        return Some(g.context.i32_type().const_zero().into());
    }

    let mut param_values: Vec<BasicMetadataValueEnum<'ctx>> = Vec::with_capacity(actual);
    for arg in args {
        // A value-less argument (a call to a void extern) lowers to an
        // i32 zero so the call itself stays well-formed.
        let value = gen_expr(g, arg)
            .unwrap_or_else(|| g.context.i32_type().const_zero().into());
        param_values.push(value.into());
    }

    let call = g
        .builder
        .build_call(entry.fn_value, &param_values, "")
        .expect("build call");

    if g.types.is_unreachable(entry.proto.return_type.resolved_ty()) {
        // Control does not continue past a no-return callee.
        g.builder.build_unreachable().expect("build unreachable");
        None
    } else {
        call.try_as_basic_value().left()
    }
}

/// Intern a string literal as a private constant global.
///
/// The bytes are stored exactly as written, with no terminator appended.
fn find_or_create_string<'ctx>(g: &mut CodeGen<'ctx, '_>, bytes: &[u8]) -> GlobalValue<'ctx> {
    if let Some(&global) = g.str_table.get(bytes) {
        return global;
    }

    let text = g.context.const_string(bytes, false);
    let global = g.module.add_global(text.get_type(), None, "");
    global.set_linkage(Linkage::Private);
    global.set_initializer(&text);
    global.set_constant(true);
    global.set_unnamed_address(UnnamedAddress::Global);

    g.str_table.insert(bytes.to_vec(), global);
    global
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use inkwell::attributes::{Attribute, AttributeLoc};
    use inkwell::context::Context;
    use inkwell::module::Linkage;

    use crate::compiler::CodeGen;
    use crate::parser::Parser;

    fn compiled<'ctx, 'ast>(
        context: &'ctx Context,
        root: &'ast crate::ast::Root,
    ) -> CodeGen<'ctx, 'ast> {
        let mut g = CodeGen::new(context, root, false, Path::new("test.zig"));
        g.semantic_analyze();
        assert!(g.errors().is_empty(), "analysis errors: {:?}", g.errors());
        g.code_gen();
        g
    }

    fn has_fn_attribute(g: &CodeGen<'_, '_>, fn_name: &str, attr_name: &str) -> bool {
        let kind_id = Attribute::get_named_enum_kind_id(attr_name);
        g.module
            .get_function(fn_name)
            .expect("function in module")
            .attributes(AttributeLoc::Function)
            .iter()
            .any(|attr| attr.is_enum() && attr.get_enum_kind_id() == kind_id)
    }

    #[test]
    fn hello_world_lowers_cleanly() {
        let source = "extern {\n    fn puts(s: *const u8) -> i32;\n}\nfn main() -> i32 {\n    puts(\"hi\");\n    return 0;\n}\n";
        let root = Parser::new(source).parse_root();
        let context = Context::create();
        let g = compiled(&context, &root);

        assert!(g.errors().is_empty());

        let puts = g.module.get_function("puts").expect("puts declared");
        assert_eq!(puts.get_linkage(), Linkage::External);
        assert!(g.module.get_function("main").is_some());

        // One interned global holding exactly the two literal bytes.
        let globals: Vec<_> = g.module.get_globals().collect();
        assert_eq!(globals.len(), 1);
        let init = globals[0]
            .get_initializer()
            .expect("string global initialized")
            .into_array_value();
        assert_eq!(init.get_type().len(), 2);
        assert!(globals[0].is_constant());

        let ir = g.ir_string();
        assert!(ir.contains("call"));
        assert!(ir.contains("ret i32 0"));
    }

    #[test]
    fn undefined_callee_is_diagnosed_and_lowering_continues() {
        let source = "fn main() -> i32 {\n    nope();\n    return 0;\n}\n";
        let root = Parser::new(source).parse_root();
        let context = Context::create();
        let g = compiled(&context, &root);

        assert_eq!(g.errors().len(), 1);
        assert_eq!(g.errors()[0].msg, "undefined function: 'nope'");
        assert_eq!(g.errors()[0].line_start, 2);
        assert!(g.ir_string().contains("ret i32 0"));
    }

    #[test]
    fn arity_mismatch_is_diagnosed() {
        let source = "extern {\n    fn f(a: i32, b: i32) -> i32;\n}\nfn main() -> i32 {\n    f(1);\n    return 0;\n}\n";
        let root = Parser::new(source).parse_root();
        let context = Context::create();
        let g = compiled(&context, &root);

        assert_eq!(g.errors().len(), 1);
        assert_eq!(g.errors()[0].msg, "wrong number of arguments. Expected 2, got 1.");
    }

    #[test]
    fn noreturn_call_emits_an_unreachable_terminator() {
        let source = "extern {\n    fn exit(code: i32) -> unreachable;\n}\nfn main() -> unreachable {\n    exit(1);\n}\n";
        let root = Parser::new(source).parse_root();
        let context = Context::create();
        let g = compiled(&context, &root);

        assert!(g.errors().is_empty());
        assert!(has_fn_attribute(&g, "exit", "noreturn"));
        assert!(has_fn_attribute(&g, "main", "noreturn"));
        assert!(has_fn_attribute(&g, "main", "nounwind"));

        let ir = g.ir_string();
        let call_at = ir.find("call void @exit").expect("call to exit in IR");
        let unreachable_at = ir.find("unreachable").expect("unreachable terminator in IR");
        assert!(call_at < unreachable_at);
    }

    #[test]
    fn equal_string_literals_share_one_global() {
        let source = "extern {\n    fn puts(s: *const u8) -> i32;\n}\nfn main() -> i32 {\n    puts(\"hi\");\n    puts(\"hi\");\n    puts(\"ho\");\n    return 0;\n}\n";
        let root = Parser::new(source).parse_root();
        let context = Context::create();
        let g = compiled(&context, &root);

        assert!(g.errors().is_empty());
        assert_eq!(g.module.get_globals().count(), 2);
    }

    #[test]
    fn empty_string_literal_gets_a_zero_length_global() {
        let source = "extern {\n    fn puts(s: *const u8) -> i32;\n}\nfn main() -> i32 {\n    puts(\"\");\n    return 0;\n}\n";
        let root = Parser::new(source).parse_root();
        let context = Context::create();
        let g = compiled(&context, &root);

        assert!(g.errors().is_empty());
        let globals: Vec<_> = g.module.get_globals().collect();
        assert_eq!(globals.len(), 1);
        let init = globals[0]
            .get_initializer()
            .expect("global initialized")
            .into_array_value();
        assert_eq!(init.get_type().len(), 0);
    }

    #[test]
    fn zero_parameter_proto_lowers_to_zero_parameter_fn_type() {
        let source = "extern {\n    fn pause() -> void;\n}\nfn main() -> i32 {\n    pause();\n    return 0;\n}\n";
        let root = Parser::new(source).parse_root();
        let context = Context::create();
        let g = compiled(&context, &root);

        assert!(g.errors().is_empty());
        let pause = g.module.get_function("pause").expect("pause declared");
        assert_eq!(pause.get_type().count_param_types(), 0);
        assert!(pause.get_type().get_return_type().is_none());
    }

    #[test]
    fn number_return_round_trips_through_the_ir() {
        let source = "fn main() -> i32 {\n    return 42;\n}\n";
        let root = Parser::new(source).parse_root();
        let context = Context::create();
        let g = compiled(&context, &root);

        assert!(g.errors().is_empty());
        assert!(g.ir_string().contains("ret i32 42"));
    }
}
