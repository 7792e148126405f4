//! Canonical type entities and their interning table.
//!
//! Every type mentioned in a source file maps to exactly one entry in the
//! [`TypeTable`]. Entries are addressed by stable [`TypeId`]s; pointer and
//! child links are ids as well, so the parent/child graph carries no
//! ownership cycles.

use std::collections::HashMap;

use inkwell::context::Context;
use inkwell::debug_info::{DIFlags, DIFlagsConstants, DIType, DebugInfoBuilder};
use inkwell::types::{AnyTypeEnum, BasicMetadataTypeEnum, FunctionType};
use inkwell::AddressSpace;

// DWARF base type encodings.
const DW_ATE_SIGNED: u32 = 0x05;
const DW_ATE_UNSIGNED: u32 = 0x07;

/// Index of a type entity in the [`TypeTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(u32);

impl TypeId {
    pub const U8: TypeId = TypeId(0);
    pub const I32: TypeId = TypeId(1);
    pub const VOID: TypeId = TypeId(2);
    pub const UNREACHABLE: TypeId = TypeId(3);

    /// Failed resolutions resolve to `void` so later passes need no
    /// null checks.
    pub const INVALID: TypeId = TypeId::VOID;

    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    U8,
    I32,
    Void,
    Unreachable,
    Pointer,
}

/// The canonical representation of a source type.
pub struct TypeEntry<'ctx> {
    pub kind: TypeKind,
    /// Display name, e.g. `"u8"` or `"*const u8"`.
    pub name: String,
    pub llvm_type: AnyTypeEnum<'ctx>,
    pub di_type: DIType<'ctx>,
    #[allow(dead_code)]
    pub pointer_child: Option<TypeId>,
    #[allow(dead_code)]
    pub pointer_is_const: bool,
    /// Interning slot for this entity's unique `*const` parent.
    const_parent: Option<TypeId>,
    /// Interning slot for this entity's unique `*mut` parent.
    mut_parent: Option<TypeId>,
}

/// Owning table of every type entity in one compilation.
#[derive(Default)]
pub struct TypeTable<'ctx> {
    entries: Vec<TypeEntry<'ctx>>,
    by_name: HashMap<String, TypeId>,
}

impl<'ctx> TypeTable<'ctx> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the four primitive entities.
    ///
    /// Seed order is fixed so that the `TypeId` constants stay valid.
    /// `void` doubles as the invalid-type sentinel and `unreachable`
    /// reuses its debug type.
    pub fn install_primitives(&mut self, context: &'ctx Context, dibuilder: &DebugInfoBuilder<'ctx>) {
        let u8_di = dibuilder
            .create_basic_type("u8", 8, DW_ATE_UNSIGNED, DIFlags::ZERO)
            .expect("create u8 debug type")
            .as_type();
        let id = self.install(TypeEntry {
            kind: TypeKind::U8,
            name: "u8".to_string(),
            llvm_type: context.i8_type().into(),
            di_type: u8_di,
            pointer_child: None,
            pointer_is_const: false,
            const_parent: None,
            mut_parent: None,
        });
        assert_eq!(id, TypeId::U8);

        let i32_di = dibuilder
            .create_basic_type("i32", 32, DW_ATE_SIGNED, DIFlags::ZERO)
            .expect("create i32 debug type")
            .as_type();
        let id = self.install(TypeEntry {
            kind: TypeKind::I32,
            name: "i32".to_string(),
            llvm_type: context.i32_type().into(),
            di_type: i32_di,
            pointer_child: None,
            pointer_is_const: false,
            const_parent: None,
            mut_parent: None,
        });
        assert_eq!(id, TypeId::I32);

        let void_di = dibuilder
            .create_basic_type("void", 0, DW_ATE_UNSIGNED, DIFlags::ZERO)
            .expect("create void debug type")
            .as_type();
        let id = self.install(TypeEntry {
            kind: TypeKind::Void,
            name: "void".to_string(),
            llvm_type: context.void_type().into(),
            di_type: void_di,
            pointer_child: None,
            pointer_is_const: false,
            const_parent: None,
            mut_parent: None,
        });
        assert_eq!(id, TypeId::VOID);

        let id = self.install(TypeEntry {
            kind: TypeKind::Unreachable,
            name: "unreachable".to_string(),
            llvm_type: context.void_type().into(),
            di_type: void_di,
            pointer_child: None,
            pointer_is_const: false,
            const_parent: None,
            mut_parent: None,
        });
        assert_eq!(id, TypeId::UNREACHABLE);
    }

    fn install(&mut self, entry: TypeEntry<'ctx>) -> TypeId {
        let id = TypeId(self.entries.len() as u32);
        self.by_name.insert(entry.name.clone(), id);
        self.entries.push(entry);
        id
    }

    /// Look up a type entity by display name.
    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    pub fn entry(&self, id: TypeId) -> &TypeEntry<'ctx> {
        &self.entries[id.index()]
    }

    pub fn is_unreachable(&self, id: TypeId) -> bool {
        self.entry(id).kind == TypeKind::Unreachable
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return the unique pointer entity over `child`, creating it on the
    /// first request and reusing it on every later one.
    pub fn intern_pointer(
        &mut self,
        context: &'ctx Context,
        dibuilder: &DebugInfoBuilder<'ctx>,
        pointer_size_bytes: u32,
        child: TypeId,
        is_const: bool,
    ) -> TypeId {
        let slot = if is_const {
            self.entries[child.index()].const_parent
        } else {
            self.entries[child.index()].mut_parent
        };
        if let Some(existing) = slot {
            return existing;
        }

        let child_entry = &self.entries[child.index()];
        let name = format!(
            "*{} {}",
            if is_const { "const" } else { "mut" },
            child_entry.name
        );
        let size_in_bits = pointer_size_bytes as u64 * 8;
        let di_type = dibuilder
            .create_pointer_type(
                &name,
                child_entry.di_type,
                size_in_bits,
                size_in_bits as u32,
                AddressSpace::default(),
            )
            .as_type();

        let id = self.install(TypeEntry {
            kind: TypeKind::Pointer,
            name,
            llvm_type: context.i8_type().ptr_type(AddressSpace::default()).into(),
            di_type,
            pointer_child: Some(child),
            pointer_is_const: is_const,
            const_parent: None,
            mut_parent: None,
        });

        if is_const {
            self.entries[child.index()].const_parent = Some(id);
        } else {
            self.entries[child.index()].mut_parent = Some(id);
        }
        id
    }

    /// Build the LLVM function type for a resolved prototype.
    pub fn fn_type(
        &self,
        context: &'ctx Context,
        return_type: TypeId,
        params: &[TypeId],
    ) -> FunctionType<'ctx> {
        let param_types: Vec<BasicMetadataTypeEnum<'ctx>> = params
            .iter()
            .map(|&id| match self.entry(id).llvm_type {
                AnyTypeEnum::IntType(ty) => ty.into(),
                AnyTypeEnum::PointerType(ty) => ty.into(),
                // void has no argument representation; use i32 so the
                // signature stays well-formed (a diagnostic already
                // exists for any input that reaches this).
                _ => context.i32_type().into(),
            })
            .collect();

        match self.entry(return_type).llvm_type {
            AnyTypeEnum::IntType(ty) => ty.fn_type(&param_types, false),
            AnyTypeEnum::PointerType(ty) => ty.fn_type(&param_types, false),
            _ => context.void_type().fn_type(&param_types, false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkwell::debug_info::{DWARFEmissionKind, DWARFSourceLanguage};
    use inkwell::module::Module;

    fn seeded_table<'ctx>(
        context: &'ctx Context,
    ) -> (Module<'ctx>, DebugInfoBuilder<'ctx>, TypeTable<'ctx>) {
        let module = context.create_module("test");
        let (dibuilder, _unit) = module.create_debug_info_builder(
            true,
            DWARFSourceLanguage::C99,
            "test.zig",
            ".",
            "zig test",
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
        let mut table = TypeTable::new();
        table.install_primitives(context, &dibuilder);
        (module, dibuilder, table)
    }

    #[test]
    fn primitives_are_unique_and_named() {
        let context = Context::create();
        let (_module, _dibuilder, table) = seeded_table(&context);

        assert_eq!(table.len(), 4);
        assert_eq!(table.lookup("u8"), Some(TypeId::U8));
        assert_eq!(table.lookup("i32"), Some(TypeId::I32));
        assert_eq!(table.lookup("void"), Some(TypeId::VOID));
        assert_eq!(table.lookup("unreachable"), Some(TypeId::UNREACHABLE));
        assert_eq!(table.lookup("f64"), None);
        assert_eq!(TypeId::INVALID, TypeId::VOID);
        assert_eq!(table.entry(TypeId::I32).kind, TypeKind::I32);
    }

    #[test]
    fn pointer_interning_reuses_entities() {
        let context = Context::create();
        let (_module, dibuilder, mut table) = seeded_table(&context);

        let a = table.intern_pointer(&context, &dibuilder, 8, TypeId::U8, true);
        let b = table.intern_pointer(&context, &dibuilder, 8, TypeId::U8, true);
        let c = table.intern_pointer(&context, &dibuilder, 8, TypeId::U8, false);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(table.len(), 6);
        assert_eq!(table.entry(a).name, "*const u8");
        assert_eq!(table.entry(c).name, "*mut u8");
        assert_eq!(table.entry(a).pointer_child, Some(TypeId::U8));
        assert!(table.entry(a).pointer_is_const);
        assert_eq!(table.lookup("*const u8"), Some(a));
    }

    #[test]
    fn nested_pointer_names_embed_the_child() {
        let context = Context::create();
        let (_module, dibuilder, mut table) = seeded_table(&context);

        let inner = table.intern_pointer(&context, &dibuilder, 8, TypeId::I32, false);
        let outer = table.intern_pointer(&context, &dibuilder, 8, inner, true);
        assert_eq!(table.entry(outer).name, "*const *mut i32");
        assert_eq!(table.entry(outer).pointer_child, Some(inner));
    }

    #[test]
    fn fn_type_lowers_void_and_unreachable_returns_to_void() {
        let context = Context::create();
        let (_module, dibuilder, mut table) = seeded_table(&context);

        let str_ptr = table.intern_pointer(&context, &dibuilder, 8, TypeId::U8, true);

        let ty = table.fn_type(&context, TypeId::I32, &[str_ptr, TypeId::I32]);
        assert_eq!(ty.count_param_types(), 2);
        assert!(ty.get_return_type().is_some());

        let void_ty = table.fn_type(&context, TypeId::VOID, &[]);
        assert!(void_ty.get_return_type().is_none());
        assert_eq!(void_ty.count_param_types(), 0);

        let noreturn_ty = table.fn_type(&context, TypeId::UNREACHABLE, &[]);
        assert!(noreturn_ty.get_return_type().is_none());
    }
}
