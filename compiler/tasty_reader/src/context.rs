//! Reader context frames.
//!
//! A context is a small immutable frame: the current owner, the traversal
//! mode bits and the source handle. Operations return fresh frames; the
//! only mutable state lives in the host symbol table and the unpickler's
//! caches.

use bitflags::bitflags;
use std::rc::Rc;
use tasty_host::{Host, SymbolId};

bitflags! {
    /// Traversal mode bits.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct Mode: u32 {
        /// Reading the parent list of a template.
        const READ_PARENTS = 1 << 0;
        /// Reading an annotation subtree.
        const READ_ANNOTATION = 1 << 1;
        /// Inside the indexing pass.
        const INDEXING = 1 << 2;
        /// Inside a fresh local scope (local dummy owner).
        const INNER_SCOPE = 1 << 3;
    }
}

/// One context frame.
#[derive(Clone)]
pub struct Context {
    pub owner: SymbolId,
    pub mode: Mode,
    pub source: Rc<str>,
}

impl Context {
    /// The initial frame: the owner under which the roots live.
    pub fn initial(owner: SymbolId, source: Rc<str>) -> Context {
        Context {
            owner,
            mode: Mode::empty(),
            source,
        }
    }

    pub fn with_owner(&self, owner: SymbolId) -> Context {
        Context {
            owner,
            ..self.clone()
        }
    }

    pub fn with_mode(&self, mode: Mode) -> Context {
        Context {
            mode,
            ..self.clone()
        }
    }

    pub fn add_mode(&self, mode: Mode) -> Context {
        self.with_mode(self.mode | mode)
    }

    pub fn retract_mode(&self, mode: Mode) -> Context {
        self.with_mode(self.mode - mode)
    }

    pub fn with_source(&self, source: Rc<str>) -> Context {
        Context {
            source,
            ..self.clone()
        }
    }

    /// A frame whose owner is a fresh local dummy under the current owner.
    pub fn with_new_scope(&self, host: &mut Host) -> Context {
        let dummy = host.new_local_dummy(self.owner);
        self.with_owner(dummy).add_mode(Mode::INNER_SCOPE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_operations_are_functional() {
        let ctx = Context::initial(SymbolId::NONE, Rc::from("test.tasty"));
        let parents = ctx.add_mode(Mode::READ_PARENTS);
        assert!(parents.mode.contains(Mode::READ_PARENTS));
        assert!(!ctx.mode.contains(Mode::READ_PARENTS));
        let retracted = parents.retract_mode(Mode::READ_PARENTS);
        assert!(retracted.mode.is_empty());
    }

    #[test]
    fn new_scope_owner_is_a_local_dummy() {
        let mut host = Host::new();
        let ctx = Context::initial(host.defs.empty_package_class, Rc::from("t"));
        let inner = ctx.with_new_scope(&mut host);
        assert_ne!(inner.owner, ctx.owner);
        assert!(inner.mode.contains(Mode::INNER_SCOPE));
        assert_eq!(host.syms.get(inner.owner).owner, ctx.owner);
    }
}
