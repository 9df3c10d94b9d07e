//! The tree unpickler.
//!
//! Orchestrates the two passes of the reader: the indexing pass that
//! creates symbol shells at exact byte offsets, and per-symbol lazy
//! completion that re-reads a subtree to compute the symbol's info.
//!
//! One file per concern, like the rest of the pipeline:
//! - `members`: symbol creation, completion, template reading
//! - `modifiers`: the modifier tail
//! - `types`: the type grammar
//! - `terms`: terms, type trees and parent extraction

mod members;
mod modifiers;
mod terms;
mod types;

use crate::context::{Context, Mode};
use crate::error::{ReaderError, ReaderResult};
use crate::flags::TastyOnly;
use crate::owners::{OwnerIndex, NodeId};
use crate::ReaderSettings;
use rustc_hash::FxHashMap;
use std::rc::Rc;
use tasty_format::{Addr, NameRef, TastyCursor, TastyTag};
use tasty_host::{Host, SymbolId, TypeId};
use tasty_names::{NameTable, TastyName};

/// Completion state of an address, for cycle detection.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) enum CycleState {
    InProgress,
    Done,
}

/// Everything needed to complete a symbol later: the subtree to re-read
/// and the context it was created in.
#[derive(Clone)]
pub(crate) struct Completer {
    pub addr: Addr,
    pub owner: SymbolId,
    pub mode: Mode,
    pub tasty: TastyOnly,
    /// Start addresses of annotation subtrees, materialized at attachment.
    pub annots: Vec<Addr>,
}

/// The tree/symbol unpickler for one `ASTs` section.
pub struct Unpickler<'a> {
    pub(crate) bytes: &'a [u8],
    pub(crate) names: &'a NameTable,
    pub(crate) settings: ReaderSettings,
    pub(crate) source: Rc<str>,
    pub(crate) class_root: SymbolId,
    pub(crate) module_root: SymbolId,
    pub(crate) root_owner: SymbolId,
    pub(crate) sym_at_addr: FxHashMap<Addr, SymbolId>,
    pub(crate) completers: FxHashMap<SymbolId, Completer>,
    pub(crate) cycle_at_addr: FxHashMap<Addr, CycleState>,
    pub(crate) type_at_addr: FxHashMap<Addr, TypeId>,
    pub(crate) owners: OwnerIndex,
}

impl<'a> Unpickler<'a> {
    /// A reader over one section, rooted at the pair of symbols the
    /// driver assigned to this compilation unit.
    pub fn new(
        bytes: &'a [u8],
        names: &'a NameTable,
        settings: ReaderSettings,
        class_root: SymbolId,
        module_root: SymbolId,
        root_owner: SymbolId,
        source: &str,
    ) -> Unpickler<'a> {
        Unpickler {
            bytes,
            names,
            settings,
            source: Rc::from(source),
            class_root,
            module_root,
            root_owner,
            sym_at_addr: FxHashMap::default(),
            completers: FxHashMap::default(),
            cycle_at_addr: FxHashMap::default(),
            type_at_addr: FxHashMap::default(),
            owners: OwnerIndex::new(bytes.len() as u32),
        }
    }

    #[inline]
    pub(crate) fn cursor_at(&self, addr: Addr) -> TastyCursor<'a> {
        TastyCursor::new(self.bytes).fork_at(addr)
    }

    pub(crate) fn location(&self, host: &Host, ctx: &Context) -> String {
        host.location_string(ctx.owner)
    }

    pub(crate) fn log(&self, host: &mut Host, message: impl FnOnce(&Host) -> String) {
        if self.settings.debug_tasty {
            let rendered = message(host);
            host.reporter.echo(rendered);
        }
    }

    /// Resolve a wire name reference.
    pub(crate) fn resolve_name(
        &self,
        name_ref: NameRef,
        host: &Host,
        ctx: &Context,
    ) -> ReaderResult<TastyName> {
        self.names.get(name_ref).cloned().ok_or_else(|| {
            ReaderError::format(
                format!("name reference {} outside the name table", name_ref.raw()),
                self.location(host, ctx),
            )
        })
    }

    /// Intern the host-identifier rendering of a name.
    pub(crate) fn ident_of(&self, name: &TastyName, host: &mut Host) -> tasty_host::Ident {
        let encoded = name.encoded_string(&tasty_host::transform::encode);
        host.intern(&encoded)
    }

    // ── Entry and the indexing pass ─────────────────────────────────────

    /// Build the top-level index: walk leading `PACKAGE`/`IMPORT`
    /// statements and create shells for every member definition found.
    pub fn enter_top_level(&mut self, host: &mut Host) -> ReaderResult<()> {
        let mut cursor = self.cursor_at(Addr::new(0));
        let ctx =
            Context::initial(self.root_owner, self.source.clone()).add_mode(Mode::INDEXING);
        while !cursor.is_at_end() {
            match cursor.peek_tag()? {
                TastyTag::Package | TastyTag::Import => {
                    self.index_stat(&mut cursor, host, &ctx)?;
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn index_stats(
        &mut self,
        cursor: &mut TastyCursor<'a>,
        end: Addr,
        host: &mut Host,
        ctx: &Context,
    ) -> ReaderResult<()> {
        while cursor.current_addr() < end {
            self.index_stat(cursor, host, ctx)?;
        }
        Ok(())
    }

    fn index_stat(
        &mut self,
        cursor: &mut TastyCursor<'a>,
        host: &mut Host,
        ctx: &Context,
    ) -> ReaderResult<()> {
        let tag = cursor.peek_tag()?;
        match tag {
            tag if tag.is_member_def() => {
                self.create_member_symbol(cursor, host, ctx)?;
            }
            TastyTag::Package => {
                cursor.read_tag()?;
                let end = cursor.read_end()?;
                let pkg_type = self.read_type(cursor, host, ctx)?;
                let pkg = host.type_symbol_of(pkg_type);
                if pkg.is_none() {
                    return Err(ReaderError::format(
                        "package statement without a package reference",
                        self.location(host, ctx),
                    ));
                }
                let pkg_class = host.syms.get(pkg).module_class;
                let owner = if pkg_class.is_none() { pkg } else { pkg_class };
                self.index_stats(cursor, end, host, &ctx.with_owner(owner))?;
            }
            _ => {
                cursor.skip_tree()?;
            }
        }
        Ok(())
    }

    // ── Symbols at addresses ────────────────────────────────────────────

    /// The symbol defined at an address, creating it under its owner-tree
    /// owner when it has not been created yet.
    pub fn symbol_at(&mut self, addr: Addr, host: &mut Host) -> ReaderResult<SymbolId> {
        if let Some(&sym) = self.sym_at_addr.get(&addr) {
            return Ok(sym);
        }
        let owner = self.find_owner(addr, host)?;
        self.ensure_symbol_at(addr, owner, host)
    }

    /// Like `symbol_at`, but with a known owner (used while descending
    /// the owner tree, where the enclosing owner is already at hand).
    fn ensure_symbol_at(
        &mut self,
        addr: Addr,
        owner: SymbolId,
        host: &mut Host,
    ) -> ReaderResult<SymbolId> {
        if let Some(&sym) = self.sym_at_addr.get(&addr) {
            return Ok(sym);
        }
        let owner = if owner.is_none() { self.root_owner } else { owner };
        let ctx = Context::initial(owner, self.source.clone());
        let mut cursor = self.cursor_at(addr);
        match cursor.peek_tag()? {
            tag if tag.is_member_def() => self.create_member_symbol(&mut cursor, host, &ctx),
            TastyTag::Template => {
                let dummy = host.new_local_dummy(owner);
                self.sym_at_addr.insert(addr, dummy);
                Ok(dummy)
            }
            other => Err(ReaderError::format(
                format!("no symbol can be defined at {addr} (tag {other})"),
                self.location(host, &ctx),
            )),
        }
    }

    /// The symbol whose definition starts at the cursor, creating it in
    /// the given context when absent.
    pub(crate) fn symbol_at_current(
        &mut self,
        cursor: &TastyCursor<'a>,
        host: &mut Host,
        ctx: &Context,
    ) -> ReaderResult<SymbolId> {
        let addr = cursor.current_addr();
        if let Some(&sym) = self.sym_at_addr.get(&addr) {
            return Ok(sym);
        }
        let mut fork = cursor.fork();
        self.create_member_symbol(&mut fork, host, ctx)
    }

    /// Resolve the enclosing owner of an address through the lazy owner
    /// tree. Unique enclosure is an invariant of well-formed input.
    fn find_owner(&mut self, addr: Addr, host: &mut Host) -> ReaderResult<SymbolId> {
        let mut node: NodeId = OwnerIndex::ROOT;
        let mut owner = SymbolId::NONE;
        loop {
            let children = self.owners.children(node, self.bytes)?;
            let containing = children
                .into_iter()
                .find(|&child| self.owners.node(child).contains(addr));
            match containing {
                None => {
                    return if owner.is_none() {
                        Err(ReaderError::format(
                            format!("no enclosing definition owns address {addr}"),
                            "<toplevel>",
                        ))
                    } else {
                        Ok(owner)
                    };
                }
                Some(child) => {
                    let (start, tag) = {
                        let node = self.owners.node(child);
                        (node.start, node.tag)
                    };
                    if start == addr {
                        return Ok(if owner.is_none() { self.root_owner } else { owner });
                    }
                    if tag != Some(TastyTag::Template) {
                        owner = self.ensure_symbol_at(start, owner, host)?;
                    }
                    node = child;
                }
            }
        }
    }

    // ── Completion ──────────────────────────────────────────────────────

    /// Run the symbol's completer, if it still has one. Guarded by the
    /// cycle map: re-entering an in-progress completion is fatal for the
    /// artifact.
    pub fn complete(&mut self, sym: SymbolId, host: &mut Host) -> ReaderResult<()> {
        let completer = match self.completers.get(&sym) {
            Some(completer) => completer.clone(),
            None => return Ok(()),
        };
        match self.cycle_at_addr.get(&completer.addr) {
            Some(CycleState::InProgress) => {
                host.mark_erroneous(sym);
                return Err(ReaderError::cyclic(
                    completer.addr,
                    host.location_string(sym),
                ));
            }
            Some(CycleState::Done) => return Ok(()),
            None => {}
        }
        self.cycle_at_addr.insert(completer.addr, CycleState::InProgress);
        self.log(host, |host| {
            format!("completing {} at {}", host.location_string(sym), completer.addr)
        });
        let ctx = Context {
            owner: completer.owner,
            mode: completer.mode,
            source: self.source.clone(),
        };
        match self.read_new_member(sym, &completer, host, &ctx) {
            Ok(()) => {
                self.cycle_at_addr.insert(completer.addr, CycleState::Done);
                self.completers.remove(&sym);
                self.log(host, |host| format!("completed {}", host.location_string(sym)));
                Ok(())
            }
            Err(err) => {
                self.cycle_at_addr.remove(&completer.addr);
                self.completers.remove(&sym);
                host.mark_erroneous(sym);
                Err(err)
            }
        }
    }

    /// A symbol's info, forcing completion first. This is the reader's
    /// suspension point.
    pub fn forced_info(&mut self, sym: SymbolId, host: &mut Host) -> ReaderResult<TypeId> {
        self.complete(sym, host)?;
        Ok(host.info_of(sym))
    }

    /// Force the root symbols. A refused construct poisons only the root
    /// it occurred under: the error is reported to the host and the
    /// remaining roots still complete. Wire and cycle errors abort.
    pub fn complete_roots(&mut self, host: &mut Host) -> ReaderResult<()> {
        let mut roots = vec![self.class_root, self.module_root];
        let module_class = host.syms.get(self.module_root).module_class;
        if !module_class.is_none() {
            roots.push(module_class);
        }
        for root in roots {
            match self.complete(root, host) {
                Ok(()) => {}
                Err(err) if err.is_unsupported() => {
                    host.reporter.error(err.to_string());
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Whether the cycle guard is free of in-progress entries.
    pub fn cycle_guard_is_clean(&self) -> bool {
        self.cycle_at_addr
            .values()
            .all(|&state| state != CycleState::InProgress)
    }
}
