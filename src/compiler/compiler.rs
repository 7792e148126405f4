//! The compilation context.
//!
//! [`CodeGen`] owns the LLVM module, builders, symbol tables, type table,
//! and diagnostics sink for one compilation. The two passes are split
//! across:
//!
//! - [`analyze`](super::analyze)  — pass 1: type resolution and symbol binding
//! - [`codegen`](super::codegen)  — pass 2: function body lowering
//! - [`linker`](super::linker)    — object emission and native linking

use std::collections::HashMap;
use std::path::Path;

use inkwell::attributes::{Attribute, AttributeLoc};
use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::debug_info::{
    DICompileUnit, DWARFEmissionKind, DWARFSourceLanguage, DebugInfoBuilder,
};
use inkwell::module::Module;
use inkwell::targets::{
    CodeModel, FileType, InitializationConfig, RelocMode, Target, TargetMachine,
};
use inkwell::values::{FunctionValue, GlobalValue};
use inkwell::OptimizationLevel;

use crate::ast::{FnDef, FnProto, Root, Span};
use crate::errors::{self, ErrorMsg, Phase};

use super::types::TypeTable;
use super::{analyze, codegen};

/// A callable function known to the compilation: its LLVM handle plus the
/// prototype it was declared with, for call-site arity checks.
#[derive(Clone, Copy)]
pub struct FnEntry<'ctx, 'ast> {
    pub fn_value: FunctionValue<'ctx>,
    pub proto: &'ast FnProto,
}

/// Holds all state for a single compilation, pinned to one input file.
pub struct CodeGen<'ctx, 'ast> {
    pub(crate) context: &'ctx Context,
    pub(crate) module: Module<'ctx>,
    pub(crate) builder: Builder<'ctx>,
    pub(crate) dibuilder: DebugInfoBuilder<'ctx>,
    pub(crate) compile_unit: DICompileUnit<'ctx>,
    pub(crate) root: &'ast Root,
    pub(crate) types: TypeTable<'ctx>,
    pub(crate) fn_defs: HashMap<String, &'ast FnDef>,
    pub(crate) fn_table: HashMap<String, FnEntry<'ctx, 'ast>>,
    pub(crate) str_table: HashMap<Vec<u8>, GlobalValue<'ctx>>,
    pub(crate) errors: Vec<ErrorMsg>,
    pub(crate) pointer_size_bytes: u32,
    target_machine: TargetMachine,
}

impl<'ctx, 'ast> CodeGen<'ctx, 'ast> {
    /// Create a context for one compilation.
    ///
    /// Resolves the host target, creates the target machine (relocation
    /// model `Static` when `is_static`, `PIC` otherwise, no optimization),
    /// and sets up the module, IR builder, and debug-info builder. The
    /// compile unit is created here because inkwell produces it together
    /// with the debug builder.
    pub fn new(
        context: &'ctx Context,
        root: &'ast Root,
        is_static: bool,
        input_path: &Path,
    ) -> Self {
        Target::initialize_all(&InitializationConfig::default());

        let triple = TargetMachine::get_default_triple();
        let target = Target::from_triple(&triple).unwrap_or_else(|err| {
            errors::fatal(Phase::Codegen, format!("unable to get target from triple: {err}"))
        });
        let cpu = TargetMachine::get_host_cpu_name().to_string();
        let features = TargetMachine::get_host_cpu_features().to_string();
        let reloc_mode = if is_static { RelocMode::Static } else { RelocMode::PIC };
        let target_machine = target
            .create_target_machine(
                &triple,
                &cpu,
                &features,
                OptimizationLevel::None,
                reloc_mode,
                CodeModel::Default,
            )
            .unwrap_or_else(|| {
                errors::fatal(Phase::Codegen, "unable to create target machine")
            });
        let pointer_size_bytes = target_machine.get_target_data().get_pointer_byte_size(None);

        let module = context.create_module("ZigModule");
        let builder = context.create_builder();

        let in_file = input_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let in_dir = match input_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_string_lossy().into_owned(),
            _ => ".".to_string(),
        };
        let producer = format!("zig {}", env!("CARGO_PKG_VERSION"));
        let (dibuilder, compile_unit) = module.create_debug_info_builder(
            true,
            DWARFSourceLanguage::C99,
            &in_file,
            &in_dir,
            &producer,
            false,
            "",
            0,
            "",
            DWARFEmissionKind::Full,
            0,
            false,
            false,
            "",
            "",
        );

        Self {
            context,
            module,
            builder,
            dibuilder,
            compile_unit,
            root,
            types: TypeTable::new(),
            fn_defs: HashMap::new(),
            fn_table: HashMap::new(),
            str_table: HashMap::new(),
            errors: Vec::new(),
            pointer_size_bytes,
            target_machine,
        }
    }

    // ── passes ──────────────────────────────────────────────────

    /// Pass 1: seed the primitive types, then resolve every type
    /// reference and bind every declaration.
    pub fn semantic_analyze(&mut self) {
        self.types.install_primitives(self.context, &self.dibuilder);
        analyze::analyze(self);
    }

    /// Pass 2: lower every registered function definition to LLVM IR.
    pub fn code_gen(&mut self) {
        codegen::gen_module(self);
    }

    /// The diagnostics accumulated so far, in emission order.
    pub fn errors(&self) -> &[ErrorMsg] {
        &self.errors
    }

    pub(crate) fn add_error(&mut self, span: Span, msg: String) {
        self.errors.push(ErrorMsg::at(span, msg));
    }

    // ── shared helpers ──────────────────────────────────────────

    /// Intern the pointer type over `child` in the type table.
    pub(crate) fn intern_pointer(
        &mut self,
        child: super::types::TypeId,
        is_const: bool,
    ) -> super::types::TypeId {
        self.types.intern_pointer(
            self.context,
            &self.dibuilder,
            self.pointer_size_bytes,
            child,
            is_const,
        )
    }

    /// Attach a named enum attribute (e.g. `noreturn`, `nounwind`) to a
    /// function.
    pub(crate) fn add_fn_attribute(&self, fn_value: FunctionValue<'ctx>, name: &str) {
        let kind_id = Attribute::get_named_enum_kind_id(name);
        let attr = self.context.create_enum_attribute(kind_id, 0);
        fn_value.add_attribute(AttributeLoc::Function, attr);
    }

    // ── output helpers ──────────────────────────────────────────

    /// Return the LLVM IR as a string.
    pub fn ir_string(&self) -> String {
        self.module.print_to_string().to_string()
    }

    /// Write a native object file.
    pub fn write_object_file(&self, path: &Path) {
        if let Err(err) = self
            .target_machine
            .write_to_file(&self.module, FileType::Object, path)
        {
            errors::fatal(Phase::Codegen, format!("unable to write object file: {err}"));
        }
    }
}
