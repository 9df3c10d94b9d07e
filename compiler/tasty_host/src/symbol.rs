//! The host symbol table.
//!
//! Symbols are arena records referenced by 32-bit ids. The unpickler owns
//! all mutation; the table itself never runs completers.

use crate::flags::Flags;
use crate::scope::ScopeId;
use crate::strings::Ident;
use crate::tree::TreeId;
use crate::types::TypeId;
use crate::Host;
use std::fmt;

/// A 32-bit index into the symbol table.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct SymbolId(u32);

impl SymbolId {
    /// Sentinel for "no symbol".
    pub const NONE: SymbolId = SymbolId(u32::MAX);

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }
}

impl fmt::Debug for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "SymbolId(NONE)")
        } else {
            write!(f, "SymbolId({})", self.0)
        }
    }
}

/// What kind of definition a symbol stands for.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum SymKind {
    Class,
    ModuleVal,
    ModuleClass,
    Method,
    Value,
    Type,
    TypeParam,
    ValueParam,
    Package,
    PackageClass,
    LocalDummy,
    RefinementClass,
}

impl SymKind {
    /// Whether symbols of this kind live in the type namespace.
    #[inline]
    pub fn is_type_space(self) -> bool {
        matches!(
            self,
            SymKind::Class
                | SymKind::ModuleClass
                | SymKind::Type
                | SymKind::TypeParam
                | SymKind::PackageClass
                | SymKind::RefinementClass
        )
    }

    /// Whether symbols of this kind own a declaration scope.
    #[inline]
    pub fn is_class_like(self) -> bool {
        matches!(
            self,
            SymKind::Class
                | SymKind::ModuleClass
                | SymKind::PackageClass
                | SymKind::RefinementClass
        )
    }
}

/// An annotation attached to a symbol: its type plus the materialized
/// annotation expression tree.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Annotation {
    pub tpe: TypeId,
    pub tree: TreeId,
}

/// One symbol record.
pub struct Symbol {
    pub name: Ident,
    pub kind: SymKind,
    pub owner: SymbolId,
    pub flags: Flags,
    /// `TypeId::NONE` until the completer has run.
    pub info: TypeId,
    pub private_within: SymbolId,
    /// For a module value: its module class.
    pub module_class: SymbolId,
    /// For a module class: its source module value.
    pub source_module: SymbolId,
    /// Declaration scope of class-like symbols.
    pub decls: ScopeId,
    /// Type parameters of classes and methods, in declaration order.
    pub type_params: Vec<SymbolId>,
    pub annotations: Vec<Annotation>,
}

/// Arena of symbols.
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable {
            symbols: Vec::with_capacity(64),
        }
    }

    #[inline]
    pub fn get(&self, id: SymbolId) -> &Symbol {
        debug_assert!(!id.is_none(), "dereferencing SymbolId::NONE");
        &self.symbols[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        debug_assert!(!id.is_none(), "dereferencing SymbolId::NONE");
        &mut self.symbols[id.index()]
    }

    pub fn alloc(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(symbol);
        id
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Host {
    fn fresh_symbol(
        &mut self,
        kind: SymKind,
        owner: SymbolId,
        name: Ident,
        flags: Flags,
    ) -> SymbolId {
        self.syms.alloc(Symbol {
            name,
            kind,
            owner,
            flags,
            info: TypeId::NONE,
            private_within: SymbolId::NONE,
            module_class: SymbolId::NONE,
            source_module: SymbolId::NONE,
            decls: ScopeId::NONE,
            type_params: Vec::new(),
            annotations: Vec::new(),
        })
    }

    /// New class symbol with a fresh declaration scope.
    pub fn new_class(&mut self, owner: SymbolId, name: Ident, flags: Flags) -> SymbolId {
        let decls = self.scopes.new_scope();
        let cls = self.fresh_symbol(SymKind::Class, owner, name, flags);
        self.syms.get_mut(cls).decls = decls;
        cls
    }

    /// New module value/class pair with mutual links.
    pub fn new_module(
        &mut self,
        owner: SymbolId,
        name: Ident,
        val_flags: Flags,
        cls_flags: Flags,
    ) -> (SymbolId, SymbolId) {
        let val = self.fresh_symbol(SymKind::ModuleVal, owner, name, val_flags);
        let decls = self.scopes.new_scope();
        let cls = self.fresh_symbol(SymKind::ModuleClass, owner, name, cls_flags);
        self.syms.get_mut(cls).decls = decls;
        self.syms.get_mut(cls).source_module = val;
        self.syms.get_mut(val).module_class = cls;
        (val, cls)
    }

    /// New package pair, entered into the owning package's scope.
    pub fn new_package(&mut self, owner_class: SymbolId, name: Ident) -> SymbolId {
        let flags = Flags::PACKAGE | Flags::MODULE | Flags::FINAL | Flags::STABLE;
        let owner_scope = self.syms.get(owner_class).decls;
        let val = self.fresh_symbol(SymKind::Package, owner_class, name, flags);
        let decls = self.scopes.new_scope();
        let cls = self.fresh_symbol(
            SymKind::PackageClass,
            owner_class,
            name,
            Flags::PACKAGE | Flags::MODULE | Flags::FINAL,
        );
        self.syms.get_mut(cls).decls = decls;
        self.syms.get_mut(cls).source_module = val;
        self.syms.get_mut(val).module_class = cls;
        if !owner_scope.is_none() {
            self.enter(owner_scope, val);
            self.enter(owner_scope, cls);
        }
        val
    }

    pub fn new_method(&mut self, owner: SymbolId, name: Ident, flags: Flags) -> SymbolId {
        self.fresh_symbol(SymKind::Method, owner, name, flags | Flags::METHOD)
    }

    pub fn new_constructor(&mut self, owner: SymbolId, flags: Flags) -> SymbolId {
        let name = self.strings.intern("<init>");
        self.fresh_symbol(SymKind::Method, owner, name, flags | Flags::METHOD)
    }

    pub fn new_value(&mut self, owner: SymbolId, name: Ident, flags: Flags) -> SymbolId {
        self.fresh_symbol(SymKind::Value, owner, name, flags)
    }

    pub fn new_type_member(&mut self, owner: SymbolId, name: Ident, flags: Flags) -> SymbolId {
        self.fresh_symbol(SymKind::Type, owner, name, flags)
    }

    pub fn new_type_param(&mut self, owner: SymbolId, name: Ident, flags: Flags) -> SymbolId {
        self.fresh_symbol(SymKind::TypeParam, owner, name, flags)
    }

    pub fn new_value_param(&mut self, owner: SymbolId, name: Ident, flags: Flags) -> SymbolId {
        self.fresh_symbol(SymKind::ValueParam, owner, name, flags)
    }

    /// Local dummy owning statements that belong to no member.
    pub fn new_local_dummy(&mut self, owner: SymbolId) -> SymbolId {
        let name = self.strings.intern("<local child>");
        self.fresh_symbol(SymKind::LocalDummy, owner, name, Flags::SYNTHETIC)
    }

    /// Synthetic class owning the declarations of a structural refinement.
    pub fn new_refinement_class(&mut self, owner: SymbolId) -> SymbolId {
        let name = self.strings.intern("<refinement>");
        let decls = self.scopes.new_scope();
        let cls = self.fresh_symbol(SymKind::RefinementClass, owner, name, Flags::SYNTHETIC);
        self.syms.get_mut(cls).decls = decls;
        cls
    }

    /// Companion-owned extension method for a value-class member.
    pub fn new_extension_method(
        &mut self,
        owner: SymbolId,
        name: Ident,
        flags: Flags,
    ) -> SymbolId {
        self.fresh_symbol(SymKind::Method, owner, name, flags | Flags::METHOD | Flags::FINAL)
    }

    /// The symbol's name text.
    pub fn name_of(&self, sym: SymbolId) -> &str {
        if sym.is_none() {
            "<none>"
        } else {
            self.strings.lookup(self.syms.get(sym).name)
        }
    }

    pub fn set_info(&mut self, sym: SymbolId, info: TypeId) {
        self.syms.get_mut(sym).info = info;
    }

    pub fn info_of(&self, sym: SymbolId) -> TypeId {
        self.syms.get(sym).info
    }

    pub fn add_flags(&mut self, sym: SymbolId, flags: Flags) {
        self.syms.get_mut(sym).flags |= flags;
    }

    pub fn clear_flags(&mut self, sym: SymbolId, flags: Flags) {
        self.syms.get_mut(sym).flags &= !flags;
    }

    pub fn flags_of(&self, sym: SymbolId) -> Flags {
        self.syms.get(sym).flags
    }

    pub fn annotate(&mut self, sym: SymbolId, annotation: Annotation) {
        self.syms.get_mut(sym).annotations.push(annotation);
    }

    /// Mark a failed completion: error info plus the erroneous bit.
    pub fn mark_erroneous(&mut self, sym: SymbolId) {
        let record = self.syms.get_mut(sym);
        record.info = TypeId::ERROR;
        record.flags |= Flags::ERRONEOUS;
    }

    /// Render the owner chain for diagnostics, innermost first.
    pub fn location_string(&self, sym: SymbolId) -> String {
        let mut parts = Vec::new();
        let mut current = sym;
        while !current.is_none() {
            let record = self.syms.get(current);
            let name = self.strings.lookup(record.name);
            if !name.is_empty() && record.kind != SymKind::LocalDummy {
                parts.push(format!("{} {}", kind_noun(record.kind, record.flags), name));
            }
            current = record.owner;
        }
        if parts.is_empty() {
            "<toplevel>".to_string()
        } else {
            parts.join(" in ")
        }
    }
}

fn kind_noun(kind: SymKind, flags: Flags) -> &'static str {
    match kind {
        SymKind::Class if flags.contains(Flags::TRAIT) => "trait",
        SymKind::Class | SymKind::RefinementClass => "class",
        SymKind::ModuleVal | SymKind::ModuleClass => "object",
        SymKind::Method => "method",
        SymKind::Value => "value",
        SymKind::Type | SymKind::TypeParam => "type",
        SymKind::ValueParam => "parameter",
        SymKind::Package | SymKind::PackageClass => "package",
        SymKind::LocalDummy => "block",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Host;

    #[test]
    fn module_pair_is_linked() {
        let mut host = Host::new();
        let name = host.strings.intern("Foo");
        let owner = host.defs.empty_package_class;
        let (val, cls) = host.new_module(owner, name, Flags::MODULE_VAL, Flags::MODULE_CLASS);
        assert_eq!(host.syms.get(val).module_class, cls);
        assert_eq!(host.syms.get(cls).source_module, val);
        assert!(host.syms.get(cls).kind.is_type_space());
        assert!(!host.syms.get(val).kind.is_type_space());
    }

    #[test]
    fn location_renders_owner_chain() {
        let mut host = Host::new();
        let pkg = host.get_or_create_package("a.b");
        let pkg_class = host.syms.get(pkg).module_class;
        let cls_name = host.strings.intern("C");
        let cls = host.new_class(pkg_class, cls_name, Flags::empty());
        let meth_name = host.strings.intern("m");
        let meth = host.new_method(cls, meth_name, Flags::empty());
        let location = host.location_string(meth);
        assert!(location.starts_with("method m in class C"), "{location}");
    }

    #[test]
    fn erroneous_marking() {
        let mut host = Host::new();
        let name = host.strings.intern("x");
        let owner = host.defs.empty_package_class;
        let value = host.new_value(owner, name, Flags::empty());
        host.mark_erroneous(value);
        assert!(host.info_of(value).is_error());
        assert!(host.flags_of(value).contains(Flags::ERRONEOUS));
    }
}
