//! Member symbol creation and completion.
//!
//! Creation reads only the shape of a definition: tag, name, whether the
//! right-hand side is empty, the modifier tail. The body subtree is
//! re-read on first demand by the completer.

use crate::context::{Context, Mode};
use crate::error::{ReaderError, ReaderResult};
use crate::flags::{check_dialect_flags, TastyOnly};
use crate::reader::{Completer, Unpickler};
use tasty_format::{Addr, TastyCursor, TastyTag};
use tasty_host::{
    Annotation, Constant, Flags, Host, Phase, Space, SymKind, SymbolId, TypeId, TypeKind,
};
use tasty_names::TastyName;

impl<'a> Unpickler<'a> {
    /// Create the symbol shell for the member definition at the cursor.
    ///
    /// On return the cursor sits at the end of the definition and the
    /// symbol is registered under its start address, entered in its
    /// owner's scope (module classes and type parameters excepted) and
    /// equipped with a completer.
    pub(crate) fn create_member_symbol(
        &mut self,
        cursor: &mut TastyCursor<'a>,
        host: &mut Host,
        ctx: &Context,
    ) -> ReaderResult<SymbolId> {
        let start = cursor.current_addr();
        if let Some(&sym) = self.sym_at_addr.get(&start) {
            cursor.skip_tree()?;
            return Ok(sym);
        }
        let tag = cursor.read_tag()?;
        let end = cursor.read_end()?;
        let raw_name = self.resolve_name(cursor.read_name_ref()?, host, ctx)?;
        let name = if matches!(tag, TastyTag::TypeDef | TastyTag::TypeParam) {
            raw_name.to_type_name()
        } else {
            raw_name
        };

        self.skip_params(cursor, end)?;
        let ttag = cursor.peek_unshared_tag()?;
        let is_class = ttag == TastyTag::Template;
        let template_start = cursor.current_addr();
        let is_abs_type = self.probe_abstract_type(cursor)?;
        cursor.skip_tree()?;
        let rhs_is_empty = cursor.is_at(end) || cursor.peek_tag()?.is_modifier();
        if !rhs_is_empty {
            cursor.skip_tree()?;
        }
        let parsed = self.read_modifiers(cursor, end, host, ctx)?;
        self.expect_end(cursor, end, tag, host, ctx)?;

        let flags = normalize_flags(
            tag,
            parsed.flags,
            parsed.tasty,
            &name,
            is_abs_type,
            rhs_is_empty,
            host,
            ctx,
        );

        // constructor type parameters alias the class's
        if tag == TastyTag::TypeParam && self.owner_is_constructor(ctx.owner, host) {
            let cls = host.syms.get(ctx.owner).owner;
            let ident = self.ident_of(&name, host);
            let existing = host
                .syms
                .get(cls)
                .type_params
                .iter()
                .copied()
                .find(|&tp| host.syms.get(tp).name == ident);
            if let Some(tp) = existing {
                self.sym_at_addr.insert(start, tp);
                return Ok(tp);
            }
        }

        let sym = match self.match_root(&name, tag, parsed.tasty, host, ctx) {
            Some(root) => {
                host.add_flags(root, flags);
                root
            }
            None => self.allocate_member(tag, &name, flags, parsed.tasty, is_class, host, ctx)?,
        };
        if !parsed.private_within.is_none() {
            host.syms.get_mut(sym).private_within = parsed.private_within;
        }
        self.sym_at_addr.insert(start, sym);

        let kind = host.syms.get(sym).kind;
        let owner_scope = host.class_scope_of(ctx.owner);
        if !owner_scope.is_none() && kind != SymKind::ModuleClass && tag != TastyTag::TypeParam {
            host.enter_unique(owner_scope, sym);
            if kind == SymKind::ModuleVal {
                // the module class becomes visible through its value
                let module_class = host.syms.get(sym).module_class;
                if !module_class.is_none() {
                    host.enter_unique(owner_scope, module_class);
                }
            }
        }

        self.completers.insert(
            sym,
            Completer {
                addr: start,
                owner: ctx.owner,
                mode: ctx.mode - Mode::INDEXING,
                tasty: parsed.tasty,
                annots: parsed.annots,
            },
        );

        if is_class {
            self.index_template_params(template_start, sym, host, ctx)?;
        }
        self.log(host, |host| {
            format!("created {} at {}", host.location_string(sym), start)
        });
        Ok(sym)
    }

    /// Skip the parameter subtrees between a definition's name and its
    /// result/rhs slot.
    fn skip_params(&self, cursor: &mut TastyCursor<'a>, end: Addr) -> ReaderResult<()> {
        while cursor.current_addr() < end {
            match cursor.peek_tag()? {
                TastyTag::TypeParam | TastyTag::Param => cursor.skip_tree()?,
                TastyTag::ParamEnd => {
                    cursor.read_tag()?;
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Whether the next unshared subtree makes the definition an abstract
    /// type: bounds, or a type lambda whose body is bounds.
    fn probe_abstract_type(&self, cursor: &TastyCursor<'a>) -> ReaderResult<bool> {
        match cursor.peek_unshared_tag()? {
            TastyTag::TypeBounds | TastyTag::TypeBoundsTpt => Ok(true),
            TastyTag::LambdaTpt => {
                if cursor.peek_tag()? != TastyTag::LambdaTpt {
                    // reached through a SHARED indirection; leave it concrete
                    return Ok(false);
                }
                let mut fork = cursor.fork();
                fork.read_tag()?;
                let lambda_end = fork.read_end()?;
                while fork.current_addr() < lambda_end
                    && fork.peek_tag()? == TastyTag::TypeParam
                {
                    fork.skip_tree()?;
                }
                Ok(fork.current_addr() < lambda_end
                    && matches!(
                        fork.peek_tag()?,
                        TastyTag::TypeBounds | TastyTag::TypeBoundsTpt
                    ))
            }
            _ => Ok(false),
        }
    }

    fn owner_is_constructor(&self, owner: SymbolId, host: &Host) -> bool {
        !owner.is_none()
            && host.syms.get(owner).kind == SymKind::Method
            && host.name_of(owner) == "<init>"
    }

    /// Match the definition against the compilation unit's root symbols.
    fn match_root(
        &self,
        name: &TastyName,
        tag: TastyTag,
        tasty: TastyOnly,
        host: &Host,
        ctx: &Context,
    ) -> Option<SymbolId> {
        if ctx.owner != self.root_owner {
            return None;
        }
        let text = name.stripped().encoded_string(&tasty_host::transform::encode);
        let class_name = host.name_of(self.class_root);
        let module_name = host.name_of(self.module_root);
        if text != class_name && text != module_name {
            return None;
        }
        match tag {
            TastyTag::ValDef if tasty.contains(TastyOnly::OBJECT) => Some(self.module_root),
            TastyTag::TypeDef if name.is_module_name() || tasty.contains(TastyOnly::OBJECT) => {
                let cls = host.syms.get(self.module_root).module_class;
                if cls.is_none() {
                    None
                } else {
                    Some(cls)
                }
            }
            TastyTag::TypeDef => Some(self.class_root),
            _ => None,
        }
    }

    fn allocate_member(
        &mut self,
        tag: TastyTag,
        name: &TastyName,
        flags: Flags,
        tasty: TastyOnly,
        is_class: bool,
        host: &mut Host,
        ctx: &Context,
    ) -> ReaderResult<SymbolId> {
        let owner = ctx.owner;
        let ident = self.ident_of(name, host);
        let sym = match tag {
            TastyTag::TypeDef if name.is_module_name() || (tasty.contains(TastyOnly::OBJECT) && is_class) => {
                // module class: reached through the module's source-module
                // linkage when the value came first, created as a fresh
                // pair otherwise
                let scope = host.class_scope_of(owner);
                let buddy = host
                    .lookup_ident(scope, ident, Space::Term)
                    .filter(|&val| !host.syms.get(val).module_class.is_none());
                match buddy {
                    Some(val) => {
                        let cls = host.syms.get(val).module_class;
                        host.add_flags(cls, flags);
                        cls
                    }
                    None => {
                        let (val, cls) =
                            host.new_module(owner, ident, Flags::MODULE_VAL, flags);
                        if !scope.is_none() {
                            host.enter_unique(scope, val);
                        }
                        cls
                    }
                }
            }
            TastyTag::TypeDef if is_class => host.new_class(owner, ident, flags),
            TastyTag::TypeDef => host.new_type_member(owner, ident, flags),
            TastyTag::TypeParam => host.new_type_param(owner, ident, flags),
            TastyTag::Param => host.new_value_param(owner, ident, flags),
            TastyTag::DefDef if name.is_constructor() => host.new_constructor(owner, flags),
            TastyTag::DefDef => host.new_method(owner, ident, flags),
            TastyTag::ValDef if tasty.contains(TastyOnly::OBJECT) => {
                let scope = host.class_scope_of(owner);
                let existing = host
                    .lookup_ident(scope, ident, Space::Term)
                    .filter(|&val| host.syms.get(val).kind == SymKind::ModuleVal);
                match existing {
                    Some(val) => {
                        host.add_flags(val, flags);
                        val
                    }
                    None => {
                        let (val, cls) = host.new_module(owner, ident, flags, Flags::MODULE_CLASS);
                        if !scope.is_none() {
                            host.enter_unique(scope, cls);
                        }
                        val
                    }
                }
            }
            TastyTag::ValDef => host.new_value(owner, ident, flags),
            other => {
                return Err(ReaderError::format(
                    format!("tag {other} does not define a member"),
                    self.location(host, ctx),
                ));
            }
        };
        Ok(sym)
    }

    /// Walk a freshly created class's template header and index its type
    /// and value parameters, so that forward references resolve before
    /// the class completes.
    fn index_template_params(
        &mut self,
        template_start: Addr,
        cls: SymbolId,
        host: &mut Host,
        ctx: &Context,
    ) -> ReaderResult<()> {
        let mut cursor = self.cursor_at(template_start);
        if cursor.peek_tag()? != TastyTag::Template {
            return Ok(());
        }
        cursor.read_tag()?;
        let end = cursor.read_end()?;
        let inner = ctx.with_owner(cls);
        let mut tparams = Vec::new();
        while cursor.current_addr() < end {
            match cursor.peek_tag()? {
                TastyTag::TypeParam => {
                    let param = self.symbol_at_current(&cursor, host, &inner)?;
                    cursor.skip_tree()?;
                    tparams.push(param);
                }
                TastyTag::Param => {
                    self.symbol_at_current(&cursor, host, &inner)?;
                    cursor.skip_tree()?;
                }
                _ => break,
            }
        }
        host.syms.get_mut(cls).type_params = tparams;
        Ok(())
    }

    // ── Completion ──────────────────────────────────────────────────────

    /// Re-read the definition subtree and assign the symbol's info.
    pub(crate) fn read_new_member(
        &mut self,
        sym: SymbolId,
        completer: &Completer,
        host: &mut Host,
        ctx: &Context,
    ) -> ReaderResult<()> {
        let mut cursor = self.cursor_at(completer.addr);
        let tag = cursor.read_tag()?;
        let end = cursor.read_end()?;
        cursor.read_name_ref()?;
        check_dialect_flags(tag, completer.tasty, &host.location_string(sym))?;
        match tag {
            TastyTag::DefDef => self.complete_def(sym, &mut cursor, end, host, ctx)?,
            TastyTag::ValDef => {
                self.complete_val(sym, completer, &mut cursor, end, host, ctx)?;
            }
            TastyTag::TypeDef | TastyTag::TypeParam => {
                self.complete_type_def(sym, &mut cursor, end, host, ctx)?;
            }
            TastyTag::Param => self.complete_param(sym, &mut cursor, end, host, ctx)?,
            other => {
                return Err(ReaderError::format(
                    format!("tag {other} has no completer"),
                    self.location(host, ctx),
                ));
            }
        }
        self.attach_annotations(sym, &completer.annots, host, ctx)?;
        Ok(())
    }

    fn complete_def(
        &mut self,
        sym: SymbolId,
        cursor: &mut TastyCursor<'a>,
        end: Addr,
        host: &mut Host,
        ctx: &Context,
    ) -> ReaderResult<()> {
        let inner = ctx.with_owner(sym);
        let is_ctor = host.name_of(sym) == "<init>";
        let read_tparams = self.read_indexed_params(cursor, TastyTag::TypeParam, end, host, &inner)?;
        let tparams = if is_ctor {
            host.syms.get(host.syms.get(sym).owner).type_params.clone()
        } else {
            read_tparams
        };

        let mut vparamss: Vec<Vec<SymbolId>> = Vec::new();
        let mut current: Vec<SymbolId> = Vec::new();
        while cursor.current_addr() < end {
            match cursor.peek_tag()? {
                TastyTag::Param => {
                    let param = self.symbol_at_current(cursor, host, &inner)?;
                    cursor.skip_tree()?;
                    current.push(param);
                }
                TastyTag::ParamEnd => {
                    cursor.read_tag()?;
                    vparamss.push(std::mem::take(&mut current));
                }
                _ => break,
            }
        }
        if !current.is_empty() {
            vparamss.push(current);
        }

        for &tp in &tparams {
            self.complete(tp, host)?;
        }
        for list in &vparamss {
            for &param in list {
                self.complete(param, host)?;
            }
        }

        let result_tpt = self.read_tpt(cursor, host, &inner)?;
        let mut result = host.trees.type_of(result_tpt);
        if is_ctor {
            // the constructor returns the enclosing class over its own
            // type parameters
            let cls = host.syms.get(sym).owner;
            let tycon = host.types.type_ref(TypeId::NONE, cls);
            let args: Vec<TypeId> = tparams
                .iter()
                .map(|&tp| host.types.type_ref(TypeId::NONE, tp))
                .collect();
            result = host.types.applied(tycon, args);
        }

        // an implicit leading clause on a constructor gets an explicit
        // empty clause prepended
        let first_is_implicit = vparamss
            .first()
            .map(|list| {
                !list.is_empty()
                    && list
                        .iter()
                        .all(|&p| host.flags_of(p).contains(Flags::IMPLICIT))
            })
            .unwrap_or(false);
        if is_ctor && first_is_implicit {
            vparamss.insert(0, Vec::new());
        }

        let mut info = result;
        if vparamss.is_empty() {
            info = host.types.nullary_method(info);
        } else {
            for list in vparamss.into_iter().rev() {
                let implicit_params = list
                    .first()
                    .map(|&p| host.flags_of(p).contains(Flags::IMPLICIT))
                    .unwrap_or(false);
                info = host.types.method(list, info, implicit_params);
            }
        }
        if !is_ctor {
            info = host.types.poly(tparams, info);
        }
        host.set_info(sym, info);
        Ok(())
    }

    fn complete_val(
        &mut self,
        sym: SymbolId,
        completer: &Completer,
        cursor: &mut TastyCursor<'a>,
        end: Addr,
        host: &mut Host,
        ctx: &Context,
    ) -> ReaderResult<()> {
        let inner = ctx.with_owner(sym);
        let tpt = self.read_tpt(cursor, host, &inner)?;
        let tpe = host.trees.type_of(tpt);
        let rhs_is_empty = cursor.is_at(end) || cursor.peek_tag()?.is_modifier();

        if completer.tasty.contains(TastyOnly::INLINE) {
            // inline values survive only with a literal right-hand side
            let noun = "inline values with non-literal right-hand sides";
            if rhs_is_empty {
                return Err(ReaderError::unsupported(noun, self.location(host, ctx)));
            }
            let literal = match cursor.peek_tag()? {
                TastyTag::UnitConst
                | TastyTag::TrueConst
                | TastyTag::FalseConst
                | TastyTag::NullConst
                | TastyTag::ByteConst
                | TastyTag::ShortConst
                | TastyTag::CharConst
                | TastyTag::IntConst
                | TastyTag::LongConst
                | TastyTag::FloatConst
                | TastyTag::DoubleConst
                | TastyTag::StringConst => self.read_literal(cursor, host, &inner)?,
                _ => {
                    return Err(ReaderError::unsupported(noun, self.location(host, ctx)));
                }
            };
            let info = host.trees.type_of(literal);
            host.set_info(sym, info);
            return Ok(());
        }

        let info = if completer.tasty.contains(TastyOnly::ENUM) {
            host.types.constant(Constant::Enum(sym))
        } else if host.flags_of(sym).contains(Flags::METHOD) {
            host.types.nullary_method(tpe)
        } else {
            tpe
        };
        host.set_info(sym, info);
        Ok(())
    }

    fn complete_type_def(
        &mut self,
        sym: SymbolId,
        cursor: &mut TastyCursor<'a>,
        end: Addr,
        host: &mut Host,
        ctx: &Context,
    ) -> ReaderResult<()> {
        let _ = end;
        if cursor.peek_unshared_tag()? == TastyTag::Template {
            return self.read_template(sym, cursor, host, ctx);
        }
        let inner = ctx.with_owner(sym);
        let info = if cursor.peek_unshared_tag()? == TastyTag::TypeBounds {
            self.read_type(cursor, host, &inner)?
        } else {
            let tpt = self.read_tpt(cursor, host, &inner)?;
            host.trees.type_of(tpt)
        };
        if let TypeKind::Bounds { lo, hi } = host.types.get(info) {
            for bound in [*lo, *hi] {
                if diverges(host, bound) {
                    return Err(ReaderError::unsupported(
                        "diverging higher-kinded bounds",
                        self.location(host, ctx),
                    ));
                }
            }
        }
        host.set_info(sym, info);
        Ok(())
    }

    fn complete_param(
        &mut self,
        sym: SymbolId,
        cursor: &mut TastyCursor<'a>,
        end: Addr,
        host: &mut Host,
        ctx: &Context,
    ) -> ReaderResult<()> {
        let inner = ctx.with_owner(host.syms.get(sym).owner);
        let tpt = self.read_tpt(cursor, host, &inner)?;
        let tpe = host.trees.type_of(tpt);
        let rhs_is_empty = cursor.is_at(end) || cursor.peek_tag()?.is_modifier();
        let info = if rhs_is_empty && !host.flags_of(sym).contains(Flags::PARAM_ACCESSOR) {
            tpe
        } else {
            host.types.nullary_method(tpe)
        };
        host.set_info(sym, info);
        Ok(())
    }

    /// Read consecutive indexed parameter definitions of one tag,
    /// returning their (already created or newly created) symbols.
    fn read_indexed_params(
        &mut self,
        cursor: &mut TastyCursor<'a>,
        tag: TastyTag,
        end: Addr,
        host: &mut Host,
        ctx: &Context,
    ) -> ReaderResult<Vec<SymbolId>> {
        let mut params = Vec::new();
        while cursor.current_addr() < end && cursor.peek_tag()? == tag {
            let param = self.symbol_at_current(cursor, host, ctx)?;
            cursor.skip_tree()?;
            params.push(param);
        }
        Ok(params)
    }

    // ── Template reading ────────────────────────────────────────────────

    /// Read a class template and finalize the class info.
    pub(crate) fn read_template(
        &mut self,
        cls: SymbolId,
        cursor: &mut TastyCursor<'a>,
        host: &mut Host,
        ctx: &Context,
    ) -> ReaderResult<()> {
        let template_start = cursor.current_addr();
        if !self.sym_at_addr.contains_key(&template_start) {
            let dummy = host.new_local_dummy(cls);
            self.sym_at_addr.insert(template_start, dummy);
        }
        cursor.read_tag()?;
        let end = cursor.read_end()?;
        let inner = ctx.with_owner(cls);

        let tparams = self.read_indexed_params(cursor, TastyTag::TypeParam, end, host, &inner)?;
        if !tparams.is_empty() {
            host.syms.get_mut(cls).type_params = tparams.clone();
        }
        // value parameters live on the primary constructor; drop them here
        self.read_indexed_params(cursor, TastyTag::Param, end, host, &inner)?;
        for &tp in &tparams {
            self.complete(tp, host)?;
        }

        // index every member definition up front, so forward references
        // inside the parent list resolve
        {
            let mut indexer = cursor.fork();
            while indexer.current_addr() < end && indexer.peek_tag()? != TastyTag::DefDef {
                indexer.skip_tree()?;
            }
            let mut stats = indexer.fork();
            self.index_members(&mut stats, end, host, &inner)?;
        }

        // interim info: a module class is its own module's singleton
        let decls = host.syms.get(cls).decls;
        let self_seed = if host.flags_of(cls).contains(Flags::MODULE) {
            let module = host.syms.get(cls).source_module;
            if module.is_none() {
                TypeId::NONE
            } else {
                host.types.single_type(TypeId::NONE, module)
            }
        } else {
            TypeId::NONE
        };
        let interim = host.types.class_info(Vec::new(), decls, cls, self_seed);
        host.set_info(cls, interim);
        self.log(host, |host| {
            format!("seeded template of {}", host.location_string(cls))
        });

        let parents_ctx = inner.add_mode(Mode::READ_PARENTS);
        let mut parents = Vec::new();
        while cursor.current_addr() < end
            && !matches!(cursor.peek_tag()?, TastyTag::SelfDef | TastyTag::DefDef)
        {
            let parent = match cursor.peek_unshared_tag()? {
                TastyTag::Apply | TastyTag::TypeApply | TastyTag::Block => {
                    self.read_parent_from_term(cursor, host, &parents_ctx)?
                }
                _ => {
                    let tpt = self.read_tpt(cursor, host, &parents_ctx)?;
                    host.trees.type_of(tpt)
                }
            };
            parents.push(parent);
        }
        for parent in &mut parents {
            if host.type_symbol_of(*parent) == host.defs.object_class {
                let any_ref = host.defs.any_ref_class;
                *parent = host.types.type_ref(TypeId::NONE, any_ref);
                self.log(host, |host| {
                    format!("rewrote Object parent of {} to AnyRef", host.location_string(cls))
                });
            }
        }
        let is_value_class = parents
            .first()
            .map(|&parent| host.type_symbol_of(parent) == host.defs.any_val_class)
            .unwrap_or(false);

        let mut self_type = self_seed;
        if cursor.current_addr() < end && cursor.peek_tag()? == TastyTag::SelfDef {
            cursor.read_tag()?;
            cursor.read_name_ref()?;
            let tpt = self.read_tpt(cursor, host, &inner)?;
            self_type = host.trees.type_of(tpt);
        }

        let info = host.types.class_info(parents, decls, cls, self_type);
        let info = host.types.poly(tparams, info);
        host.set_info(cls, info);

        if is_value_class {
            self.synthesize_extension_methods(cls, host, &inner)?;
        }
        Ok(())
    }

    /// Index the member definitions of a template body; non-member
    /// statements are skipped.
    fn index_members(
        &mut self,
        cursor: &mut TastyCursor<'a>,
        end: Addr,
        host: &mut Host,
        ctx: &Context,
    ) -> ReaderResult<()> {
        while cursor.current_addr() < end {
            if cursor.peek_tag()?.is_member_def() {
                self.create_member_symbol(cursor, host, ctx)?;
            } else {
                cursor.skip_tree()?;
            }
        }
        Ok(())
    }

    /// Value-class lowering: every non-constructor, non-accessor method
    /// gains a companion-owned extension method, and the primary
    /// constructor and parameter accessors become non-private.
    fn synthesize_extension_methods(
        &mut self,
        cls: SymbolId,
        host: &mut Host,
        ctx: &Context,
    ) -> ReaderResult<()> {
        let owner = host.syms.get(cls).owner;
        let owner_scope = host.class_scope_of(owner);
        let cls_name = host.syms.get(cls).name;
        let companion_class = host
            .lookup_ident(owner_scope, cls_name, Space::Term)
            .map(|val| host.syms.get(val).module_class)
            .filter(|&companion| !companion.is_none());
        let Some(companion_class) = companion_class else {
            self.log(host, |host| {
                format!("value class {} has no companion", host.location_string(cls))
            });
            return Ok(());
        };

        let members = host.scopes.members(host.syms.get(cls).decls).to_vec();
        for &member in &members {
            let flags = host.flags_of(member);
            if flags.contains(Flags::PARAM_ACCESSOR) || host.name_of(member) == "<init>" {
                host.clear_flags(member, Flags::PRIVATE | Flags::LOCAL);
            }
        }

        let mut planned = Vec::new();
        for &member in &members {
            let flags = host.flags_of(member);
            if !flags.contains(Flags::METHOD)
                || flags.intersects(Flags::PARAM_ACCESSOR | Flags::ACCESSOR)
                || host.name_of(member) == "<init>"
            {
                continue;
            }
            let info = self.forced_info(member, host)?;
            let ext_name = format!("{}$extension", host.name_of(member));
            planned.push((info, ext_name));
        }

        host.enter_phase_not_later_than(Phase::ExtensionMethods, |host| {
            let companion_scope = host.syms.get(companion_class).decls;
            for (info, ext_name) in planned {
                let ident = host.intern(&ext_name);
                let ext = host.new_extension_method(companion_class, ident, Flags::empty());
                let ext_info = host.extension_method_info(cls, ext, info);
                host.set_info(ext, ext_info);
                host.enter_unique(companion_scope, ext);
            }
        });
        self.log(host, |host| {
            format!(
                "installed extension methods for value class {}",
                host.location_string(cls)
            )
        });
        Ok(())
    }

    /// Materialize the annotation thunks recorded at creation time.
    fn attach_annotations(
        &mut self,
        sym: SymbolId,
        annots: &[Addr],
        host: &mut Host,
        ctx: &Context,
    ) -> ReaderResult<()> {
        for &addr in annots {
            let mut cursor = self.cursor_at(addr);
            cursor.read_tag()?;
            let end = cursor.read_end()?;
            let annot_ctx = ctx.add_mode(Mode::READ_ANNOTATION);
            let tpe = self
                .read_type(&mut cursor, host, &annot_ctx)
                .map_err(ReaderError::in_annotation)?;
            let tree = self
                .read_term(&mut cursor, host, &annot_ctx)
                .map_err(ReaderError::in_annotation)?;
            self.expect_end(&cursor, end, TastyTag::Annotation, host, ctx)
                .map_err(ReaderError::in_annotation)?;
            host.annotate(sym, Annotation { tpe, tree });
        }
        Ok(())
    }
}

/// The flag normalization of the translator, applied in order after the
/// modifier tail has been read.
#[allow(clippy::too_many_arguments)]
fn normalize_flags(
    tag: TastyTag,
    mut flags: Flags,
    tasty: TastyOnly,
    name: &TastyName,
    is_abs_type: bool,
    rhs_is_empty: bool,
    host: &Host,
    ctx: &Context,
) -> Flags {
    let is_term = matches!(tag, TastyTag::ValDef | TastyTag::DefDef);
    let is_ctor = tag == TastyTag::DefDef && name.is_constructor();
    let (owner_flags, owner_is_class) = if ctx.owner.is_none() {
        (Flags::empty(), false)
    } else {
        let record = host.syms.get(ctx.owner);
        (record.flags, record.kind.is_class_like())
    };

    // 1. a term declaration without a body is deferred
    if rhs_is_empty && is_term && !is_ctor {
        flags |= Flags::DEFERRED;
    }
    // 2. abstract types are deferred
    if is_abs_type {
        flags |= Flags::DEFERRED;
    }
    // 3. kind-implied bits
    if tag == TastyTag::DefDef {
        flags |= Flags::METHOD;
    }
    if tag == TastyTag::ValDef {
        if !flags.contains(Flags::MUTABLE) {
            flags |= Flags::STABLE;
        }
        if owner_flags.contains(Flags::TRAIT) {
            flags |= Flags::ACCESSOR;
        }
    }
    // 4. module bundles
    if tasty.contains(TastyOnly::OBJECT) {
        if tag == TastyTag::ValDef {
            flags |= Flags::MODULE_VAL;
        } else {
            flags |= Flags::MODULE_CLASS;
        }
    }
    // 5. parameters of a class template are accessors
    if tag == TastyTag::TypeParam {
        flags |= Flags::PARAM;
    }
    if tag == TastyTag::Param {
        if owner_is_class {
            flags |= Flags::PARAM_ACCESSOR | Flags::ACCESSOR | Flags::STABLE;
            if !rhs_is_empty || tasty.contains(TastyOnly::PARAM_ALIAS) {
                flags |= Flags::METHOD;
            }
        } else {
            flags |= Flags::PARAM;
        }
    }
    // 6. default-parameter bookkeeping
    if name.is_default_getter() || owner_flags.contains(Flags::DEFAULT_PARAMETERIZED) {
        flags |= Flags::DEFAULT_PARAMETERIZED;
    }
    // 7. traits are abstract
    if flags.contains(Flags::TRAIT) {
        flags |= Flags::ABSTRACT;
    }
    flags
}

/// A higher-kinded bound diverges when the lambda's body is a reference
/// back to the lambda itself.
fn diverges(host: &Host, bound: TypeId) -> bool {
    match host.types.get(bound) {
        TypeKind::Lambda { result, .. } => match host.types.get(*result) {
            TypeKind::ParamRef { binder, .. } => *binder == bound,
            TypeKind::Applied { tycon, .. } => matches!(
                host.types.get(*tycon),
                TypeKind::ParamRef { binder, .. } if *binder == bound
            ),
            _ => false,
        },
        _ => false,
    }
}
