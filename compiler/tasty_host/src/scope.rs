//! Declaration scopes.
//!
//! A scope is an ordered list of symbols. Insertion order is source order;
//! overloads keep their first-insertion position. Lookup respects the host
//! escape: a raw name that misses is retried in encoded form.

use crate::strings::Ident;
use crate::symbol::SymbolId;
use crate::transform;
use crate::Host;
use std::fmt;

/// A 32-bit index into the scope arena.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct ScopeId(u32);

impl ScopeId {
    pub const NONE: ScopeId = ScopeId(u32::MAX);

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }
}

impl fmt::Debug for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "ScopeId(NONE)")
        } else {
            write!(f, "ScopeId({})", self.0)
        }
    }
}

/// Term or type namespace.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Space {
    Term,
    Type,
}

/// Arena of scopes.
pub struct Scopes {
    scopes: Vec<Vec<SymbolId>>,
}

impl Scopes {
    pub fn new() -> Scopes {
        Scopes { scopes: Vec::new() }
    }

    pub fn new_scope(&mut self) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Vec::new());
        id
    }

    /// Members in insertion (source) order.
    #[inline]
    pub fn members(&self, scope: ScopeId) -> &[SymbolId] {
        &self.scopes[scope.index()]
    }

    pub fn push(&mut self, scope: ScopeId, sym: SymbolId) {
        self.scopes[scope.index()].push(sym);
    }

    /// A fresh scope with the same members.
    pub fn clone_scope(&mut self, scope: ScopeId) -> ScopeId {
        let members = self.scopes[scope.index()].clone();
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(members);
        id
    }
}

impl Default for Scopes {
    fn default() -> Self {
        Self::new()
    }
}

impl Host {
    /// Enter a symbol. Overloads are allowed; order is preserved.
    pub fn enter(&mut self, scope: ScopeId, sym: SymbolId) {
        self.scopes.push(scope, sym);
    }

    /// Enter unless a symbol with the same name and namespace is already
    /// present; returns the surviving symbol.
    pub fn enter_if_new(&mut self, scope: ScopeId, sym: SymbolId) -> SymbolId {
        let name = self.syms.get(sym).name;
        let space = self.space_of(sym);
        if let Some(existing) = self.lookup_ident(scope, name, space) {
            existing
        } else {
            self.scopes.push(scope, sym);
            sym
        }
    }

    /// Enter unless this very symbol is already present. Distinct from
    /// `enter_if_new`: overloads (same name, different symbol) still enter.
    pub fn enter_unique(&mut self, scope: ScopeId, sym: SymbolId) {
        if !self.scopes.members(scope).contains(&sym) {
            self.scopes.push(scope, sym);
        }
    }

    /// First member with the given interned name in the given namespace.
    pub fn lookup_ident(&self, scope: ScopeId, name: Ident, space: Space) -> Option<SymbolId> {
        if scope.is_none() {
            return None;
        }
        self.scopes
            .members(scope)
            .iter()
            .copied()
            .find(|&sym| self.syms.get(sym).name == name && self.space_of(sym) == space)
    }

    /// All members with the given interned name in the given namespace,
    /// in source order. Used for overload resolution.
    pub fn lookup_all(&self, scope: ScopeId, name: Ident, space: Space) -> Vec<SymbolId> {
        if scope.is_none() {
            return Vec::new();
        }
        self.scopes
            .members(scope)
            .iter()
            .copied()
            .filter(|&sym| self.syms.get(sym).name == name && self.space_of(sym) == space)
            .collect()
    }

    /// Lookup by raw text; a miss is retried with the host-escaped form.
    pub fn lookup_str(&self, scope: ScopeId, name: &str, space: Space) -> Option<SymbolId> {
        if let Some(ident) = self.strings.find(name) {
            if let Some(sym) = self.lookup_ident(scope, ident, space) {
                return Some(sym);
            }
        }
        let encoded = transform::encode(name);
        if encoded != name {
            if let Some(ident) = self.strings.find(&encoded) {
                return self.lookup_ident(scope, ident, space);
            }
        }
        None
    }

    /// The namespace a symbol inhabits.
    #[inline]
    pub fn space_of(&self, sym: SymbolId) -> Space {
        if self.syms.get(sym).kind.is_type_space() {
            Space::Type
        } else {
            Space::Term
        }
    }

    /// The declaration scope reachable through a symbol: a class-like
    /// symbol's own scope, or the module class scope of a module value.
    pub fn class_scope_of(&self, sym: SymbolId) -> ScopeId {
        if sym.is_none() {
            return ScopeId::NONE;
        }
        let record = self.syms.get(sym);
        if !record.decls.is_none() {
            record.decls
        } else if !record.module_class.is_none() {
            self.syms.get(record.module_class).decls
        } else {
            ScopeId::NONE
        }
    }

    /// Named member of a prefix type: searches the projected class's own
    /// declarations, then its parents, breadth first. Honors the escape
    /// retry of `lookup_str`.
    pub fn member_of_type(&self, tpe: crate::types::TypeId, name: &str, space: Space) -> Option<SymbolId> {
        self.members_of_type(tpe, name, space).into_iter().next()
    }

    /// All named members of a prefix type, nearest declarations first.
    pub fn members_of_type(
        &self,
        tpe: crate::types::TypeId,
        name: &str,
        space: Space,
    ) -> Vec<SymbolId> {
        use crate::types::TypeKind;
        let mut found = Vec::new();
        let mut visited = rustc_hash::FxHashSet::default();
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(self.type_symbol_of(tpe));
        while let Some(sym) = queue.pop_front() {
            if sym.is_none() || !visited.insert(sym) {
                continue;
            }
            let scope = self.class_scope_of(sym);
            if !scope.is_none() {
                for &member in self.scopes.members(scope) {
                    let record = self.syms.get(member);
                    let text = self.strings.lookup(record.name);
                    let matches = text == name
                        || crate::transform::encode(name) == text;
                    if matches && self.space_of(member) == space {
                        found.push(member);
                    }
                }
            }
            // walk parents of the class info, if completed
            let class_like = if !self.syms.get(sym).module_class.is_none() {
                self.syms.get(sym).module_class
            } else {
                sym
            };
            let info = self.syms.get(class_like).info;
            if !info.is_none() {
                match self.types.get(self.types.final_result(info)) {
                    TypeKind::ClassInfo { parents, .. } | TypeKind::Refined { parents, .. } => {
                        for &parent in parents {
                            queue.push_back(self.type_symbol_of(parent));
                        }
                    }
                    _ => {}
                }
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::Flags;
    use crate::Host;

    #[test]
    fn insertion_order_is_preserved() {
        let mut host = Host::new();
        let owner = host.defs.empty_package_class;
        let scope = host.scopes.new_scope();
        let a = host.strings.intern("a");
        let b = host.strings.intern("b");
        let first = host.new_method(owner, a, Flags::empty());
        let second = host.new_method(owner, b, Flags::empty());
        let third = host.new_method(owner, a, Flags::empty());
        host.enter(scope, first);
        host.enter(scope, second);
        host.enter(scope, third);
        assert_eq!(host.scopes.members(scope), &[first, second, third]);
        // first-insertion wins for plain lookup
        assert_eq!(host.lookup_ident(scope, a, Space::Term), Some(first));
        assert_eq!(host.lookup_all(scope, a, Space::Term), vec![first, third]);
    }

    #[test]
    fn enter_if_new_deduplicates() {
        let mut host = Host::new();
        let owner = host.defs.empty_package_class;
        let scope = host.scopes.new_scope();
        let name = host.strings.intern("x");
        let first = host.new_value(owner, name, Flags::empty());
        let second = host.new_value(owner, name, Flags::empty());
        assert_eq!(host.enter_if_new(scope, first), first);
        assert_eq!(host.enter_if_new(scope, second), first);
        assert_eq!(host.scopes.members(scope).len(), 1);
    }

    #[test]
    fn term_and_type_spaces_are_disjoint() {
        let mut host = Host::new();
        let owner = host.defs.empty_package_class;
        let scope = host.scopes.new_scope();
        let name = host.strings.intern("Foo");
        let value = host.new_value(owner, name, Flags::empty());
        let class = host.new_class(owner, name, Flags::empty());
        host.enter(scope, value);
        host.enter(scope, class);
        assert_eq!(host.lookup_ident(scope, name, Space::Term), Some(value));
        assert_eq!(host.lookup_ident(scope, name, Space::Type), Some(class));
    }

    #[test]
    fn lookup_str_retries_encoded() {
        let mut host = Host::new();
        let owner = host.defs.empty_package_class;
        let scope = host.scopes.new_scope();
        let plus = host.strings.intern("$plus");
        let method = host.new_method(owner, plus, Flags::empty());
        host.enter(scope, method);
        assert_eq!(host.lookup_str(scope, "+", Space::Term), Some(method));
        assert_eq!(host.lookup_str(scope, "$plus", Space::Term), Some(method));
        assert_eq!(host.lookup_str(scope, "-", Space::Term), None);
    }
}
