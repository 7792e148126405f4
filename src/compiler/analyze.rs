//! Semantic analysis: pass 1 over the AST.
//!
//! One top-down traversal that resolves every type reference to its
//! canonical entity, registers function definitions, and lowers extern
//! declarations to LLVM function declarations. Errors are recorded in
//! the diagnostics sink and never abort the pass; failed resolutions
//! leave the invalid-type sentinel behind so later stages can proceed
//! without null checks.
//!
//! Function bodies are deliberately not traversed here. They contain no
//! type references, and call-site errors are diagnosed during lowering,
//! once every extern signature is known.

use inkwell::module::Linkage;

use crate::ast::{ExternBlock, FnDef, FnProto, TopLevelDecl, TypeRef, TypeRefKind};

use super::compiler::{CodeGen, FnEntry};
use super::types::TypeId;

// LLVM's numbering for the C calling convention.
const C_CALL_CONV: u32 = 0;

/// Run the analysis pass over the whole root node.
pub(crate) fn analyze<'ctx, 'ast>(g: &mut CodeGen<'ctx, 'ast>) {
    let root = g.root;
    for decl in &root.decls {
        match decl {
            TopLevelDecl::Extern(block) => analyze_extern_block(g, block),
            TopLevelDecl::FnDef(def) => analyze_fn_def(g, def),
        }
    }
}

fn analyze_extern_block<'ctx, 'ast>(g: &mut CodeGen<'ctx, 'ast>, block: &'ast ExternBlock) {
    for fn_decl in &block.fn_decls {
        let proto = &fn_decl.proto;
        analyze_fn_proto(g, proto);

        if g.fn_table.contains_key(&proto.name) {
            g.add_error(fn_decl.span, format!("redefinition of '{}'", proto.name));
            continue;
        }

        let param_ids: Vec<TypeId> = proto.params.iter().map(|p| p.ty.resolved_ty()).collect();
        let return_id = proto.return_type.resolved_ty();
        let fn_type = g.types.fn_type(g.context, return_id, &param_ids);

        let fn_value = g
            .module
            .add_function(&proto.name, fn_type, Some(Linkage::External));
        fn_value.set_call_conventions(C_CALL_CONV);
        if g.types.is_unreachable(return_id) {
            g.add_fn_attribute(fn_value, "noreturn");
        }

        g.fn_table.insert(proto.name.clone(), FnEntry { fn_value, proto });
    }
}

fn analyze_fn_def<'ctx, 'ast>(g: &mut CodeGen<'ctx, 'ast>, def: &'ast FnDef) {
    let name = &def.proto.name;
    if g.fn_defs.contains_key(name) {
        // First definition wins; the duplicate's prototype stays
        // unresolved because nothing will lower it.
        g.add_error(def.span, format!("redefinition of '{name}'"));
    } else {
        g.fn_defs.insert(name.clone(), def);
        analyze_fn_proto(g, &def.proto);
    }
}

fn analyze_fn_proto<'ctx, 'ast>(g: &mut CodeGen<'ctx, 'ast>, proto: &'ast FnProto) {
    for param in &proto.params {
        resolve_type_ref(g, &param.ty);
    }
    resolve_type_ref(g, &proto.return_type);
}

/// Resolve a type reference to its canonical entity and attach the result
/// to the node.
fn resolve_type_ref<'ctx, 'ast>(g: &mut CodeGen<'ctx, 'ast>, node: &'ast TypeRef) -> TypeId {
    let id = match &node.kind {
        TypeRefKind::Primitive(name) => match g.types.lookup(name) {
            Some(id) => id,
            None => {
                g.add_error(node.span, format!("invalid type name: '{name}'"));
                TypeId::INVALID
            }
        },
        TypeRefKind::Pointer { is_const, child } => {
            let child_id = resolve_type_ref(g, child);
            if g.types.is_unreachable(child_id) {
                // Resolution still proceeds so the traversal stays
                // well-defined downstream.
                g.add_error(node.span, "pointer to unreachable not allowed".to_string());
            }
            g.intern_pointer(child_id, *is_const)
        }
    };
    node.set_resolved(id);
    id
}
