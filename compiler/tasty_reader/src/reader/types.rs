//! The type grammar.
//!
//! Tag-driven. Recursive constructors seed `type_at_addr` before their
//! body is read, so self-references resolve to the node under
//! construction. After a length-tagged type the cursor must sit exactly
//! at the recorded end; anything else is corrupt input.

use crate::context::{Context, Mode};
use crate::error::{ReaderError, ReaderResult};
use crate::reader::{CycleState, Unpickler};
use tasty_format::{Addr, TagCategory, TastyCursor, TastyTag};
use tasty_host::{
    Flags, Host, LambdaKind, Space, SymKind, SymbolId, TypeId, TypeKind,
};
use tasty_names::{ParamSig, TastyName};

impl<'a> Unpickler<'a> {
    /// Read one type subtree.
    pub(crate) fn read_type(
        &mut self,
        cursor: &mut TastyCursor<'a>,
        host: &mut Host,
        ctx: &Context,
    ) -> ReaderResult<TypeId> {
        let start = cursor.current_addr();
        let tag = cursor.read_tag()?;
        if tag.category() == TagCategory::Length {
            self.read_length_type(cursor, start, tag, host, ctx)
        } else {
            self.read_simple_type(cursor, start, tag, host, ctx)
        }
    }

    fn read_simple_type(
        &mut self,
        cursor: &mut TastyCursor<'a>,
        start: Addr,
        tag: TastyTag,
        host: &mut Host,
        ctx: &Context,
    ) -> ReaderResult<TypeId> {
        match tag {
            TastyTag::SharedType => {
                let addr = cursor.read_addr()?;
                if let Some(&cached) = self.type_at_addr.get(&addr) {
                    return Ok(cached);
                }
                let mut fork = self.cursor_at(addr);
                let tpe = self.read_type(&mut fork, host, ctx)?;
                self.type_at_addr.insert(addr, tpe);
                Ok(tpe)
            }
            TastyTag::TypeRefDirect => {
                let addr = cursor.read_addr()?;
                let sym = self.symbol_at(addr, host)?;
                Ok(host.types.type_ref(TypeId::NONE, sym))
            }
            TastyTag::TermRefDirect => {
                let addr = cursor.read_addr()?;
                let sym = self.symbol_at(addr, host)?;
                Ok(host.types.single_type(TypeId::NONE, sym))
            }
            TastyTag::TypeRefPkg => {
                let name = self.resolve_name(cursor.read_name_ref()?, host, ctx)?;
                let pkg = host.get_or_create_package(&name.source_string());
                let pkg_class = host.syms.get(pkg).module_class;
                Ok(host.types.type_ref(TypeId::NONE, pkg_class))
            }
            TastyTag::TermRefPkg => {
                let name = self.resolve_name(cursor.read_name_ref()?, host, ctx)?;
                let pkg = host.get_or_create_package(&name.source_string());
                Ok(host.types.single_type(TypeId::NONE, pkg))
            }
            TastyTag::RecThis => {
                let addr = cursor.read_addr()?;
                self.type_at_addr.get(&addr).copied().ok_or_else(|| {
                    ReaderError::format(
                        format!("RECthis at {addr} before its recursive type"),
                        self.location(host, ctx),
                    )
                })
            }
            TastyTag::RecType => {
                let rec = host.types.new_rec();
                self.type_at_addr.insert(start, rec);
                let refinement = host.new_refinement_class(ctx.owner);
                let body = self.read_type(cursor, host, &ctx.with_owner(refinement))?;
                host.types.complete_rec(rec, body);
                Ok(rec)
            }
            TastyTag::This => {
                let underlying = self.read_type(cursor, host, ctx)?;
                let sym = host.type_symbol_of(underlying);
                Ok(host.types.this_type(sym))
            }
            TastyTag::ByNameTpt => {
                let underlying = self.read_type(cursor, host, ctx)?;
                Ok(host.types.by_name(underlying))
            }
            TastyTag::TypeRefSymbol | TastyTag::TermRefSymbol => {
                let addr = cursor.read_addr()?;
                let prefix = self.read_type(cursor, host, ctx)?;
                let sym = self.symbol_at(addr, host)?;
                if tag == TastyTag::TypeRefSymbol {
                    Ok(host.types.type_ref(prefix, sym))
                } else {
                    Ok(host.types.single_type(prefix, sym))
                }
            }
            TastyTag::TypeRef => {
                let name = self.resolve_name(cursor.read_name_ref()?, host, ctx)?;
                let prefix = self.read_type(cursor, host, ctx)?;
                let sym = self.named_member(prefix, &name, Space::Type, host, ctx)?;
                Ok(host.types.type_ref(prefix, sym))
            }
            TastyTag::TermRef => {
                let name = self.resolve_name(cursor.read_name_ref()?, host, ctx)?;
                let prefix = self.read_type(cursor, host, ctx)?;
                let sym = self.named_member(prefix, &name, Space::Term, host, ctx)?;
                Ok(host.types.single_type(prefix, sym))
            }
            other => Err(ReaderError::format(
                format!("tag {other} in type position"),
                self.location(host, ctx),
            )),
        }
    }

    fn read_length_type(
        &mut self,
        cursor: &mut TastyCursor<'a>,
        start: Addr,
        tag: TastyTag,
        host: &mut Host,
        ctx: &Context,
    ) -> ReaderResult<TypeId> {
        let end = cursor.read_end()?;
        let result = match tag {
            TastyTag::TermRefIn | TastyTag::TypeRefIn => {
                let name = self.resolve_name(cursor.read_name_ref()?, host, ctx)?;
                let prefix = self.read_type(cursor, host, ctx)?;
                let space_type = self.read_type(cursor, host, ctx)?;
                let space = if tag == TastyTag::TypeRefIn {
                    Space::Type
                } else {
                    Space::Term
                };
                // the "space" type names the declaring class; it resolves
                // the ambiguity a bare prefix lookup would have
                let sym = match self.named_member(space_type, &name, space, host, ctx) {
                    Ok(sym) => sym,
                    Err(_) => self.named_member(prefix, &name, space, host, ctx)?,
                };
                if tag == TastyTag::TypeRefIn {
                    host.types.type_ref(prefix, sym)
                } else {
                    host.types.single_type(prefix, sym)
                }
            }
            TastyTag::RefinedType => {
                let name = self.resolve_name(cursor.read_name_ref()?, host, ctx)?;
                let parent = self.read_type(cursor, host, ctx)?;
                let info = self.read_type(cursor, host, ctx)?;
                self.refined_type(name, parent, info, host, ctx)?
            }
            TastyTag::AppliedType => {
                let tycon = self.read_type(cursor, host, ctx)?;
                let mut args = Vec::new();
                while cursor.current_addr() < end {
                    args.push(self.read_type(cursor, host, ctx)?);
                }
                host.types.applied(tycon, args)
            }
            TastyTag::TypeBounds => {
                let lo = self.read_type(cursor, host, ctx)?;
                if cursor.is_at(end) {
                    host.types.alias(lo)
                } else {
                    let hi = self.read_type(cursor, host, ctx)?;
                    // trailing variance stream of lambda-bound parameters
                    while cursor.current_addr() < end {
                        cursor.read_nat()?;
                    }
                    host.types.bounds(lo, hi)
                }
            }
            TastyTag::AnnotatedType => {
                let underlying = self.read_type(cursor, host, ctx)?;
                let annot_ctx = ctx.add_mode(Mode::READ_ANNOTATION);
                let tree = self
                    .read_term(cursor, host, &annot_ctx)
                    .map_err(ReaderError::in_annotation)?;
                let annot_tpe = host.trees.type_of(tree);
                host.types.annotated(underlying, annot_tpe)
            }
            TastyTag::AndType => {
                let first = self.read_type(cursor, host, ctx)?;
                let second = self.read_type(cursor, host, ctx)?;
                host.types.intersection(vec![first, second])
            }
            TastyTag::OrType => {
                return Err(ReaderError::unsupported(
                    "union types",
                    self.location(host, ctx),
                ));
            }
            TastyTag::MatchType | TastyTag::MatchCaseType => {
                return Err(ReaderError::unsupported(
                    "match types",
                    self.location(host, ctx),
                ));
            }
            TastyTag::SuperType => {
                let this = self.read_type(cursor, host, ctx)?;
                let parent = self.read_type(cursor, host, ctx)?;
                host.types.super_type(this, parent)
            }
            TastyTag::PolyType => {
                self.read_methodic(cursor, start, end, LambdaKind::Poly, host, ctx)?
            }
            TastyTag::MethodType => {
                self.read_methodic(cursor, start, end, LambdaKind::Method, host, ctx)?
            }
            TastyTag::ImplicitMethodType | TastyTag::GivenMethodType => {
                self.read_methodic(cursor, start, end, LambdaKind::ImplicitMethod, host, ctx)?
            }
            TastyTag::TypeLambdaType => {
                self.read_methodic(cursor, start, end, LambdaKind::TypeLambda, host, ctx)?
            }
            TastyTag::ParamType => {
                let binder_addr = cursor.read_addr()?;
                let index = cursor.read_nat()?;
                let binder = self.type_at_addr.get(&binder_addr).copied().ok_or_else(|| {
                    ReaderError::format(
                        format!("parameter reference to absent binder at {binder_addr}"),
                        self.location(host, ctx),
                    )
                })?;
                host.types.param_ref(binder, index)
            }
            other => {
                return Err(ReaderError::format(
                    format!("tag {other} in type position"),
                    self.location(host, ctx),
                ));
            }
        };
        if !cursor.is_at(end) {
            return Err(ReaderError::format(
                format!(
                    "cursor at {} instead of {end} after reading a {tag}",
                    cursor.current_addr()
                ),
                self.location(host, ctx),
            ));
        }
        Ok(result)
    }

    /// Common reader of the lambda binders (`POLYtype`, `METHODtype` and
    /// friends): the result subtree comes first, then interleaved
    /// `(name, info)` pairs. The binder is forward-declared before the
    /// parameter infos are read so that `PARAMtype` back-references land
    /// on the node under construction.
    fn read_methodic(
        &mut self,
        cursor: &mut TastyCursor<'a>,
        start: Addr,
        end: Addr,
        kind: LambdaKind,
        host: &mut Host,
        ctx: &Context,
    ) -> ReaderResult<TypeId> {
        if let Some(&cached) = self.type_at_addr.get(&start) {
            cursor.goto(end);
            return Ok(cached);
        }
        let result_start = cursor.current_addr();
        let mut names_fork = cursor.fork();
        names_fork.skip_tree()?;
        let params_start = names_fork.current_addr();
        let mut names = Vec::new();
        while names_fork.current_addr() < end {
            let name = self.resolve_name(names_fork.read_name_ref()?, host, ctx)?;
            names.push(self.ident_of(&name, host));
            names_fork.skip_tree()?;
        }
        let lambda = host.types.new_lambda(kind, names);
        self.type_at_addr.insert(start, lambda);

        let mut infos = Vec::new();
        let mut infos_fork = self.cursor_at(params_start);
        while infos_fork.current_addr() < end {
            infos_fork.read_name_ref()?;
            infos.push(self.read_type(&mut infos_fork, host, ctx)?);
        }
        let mut result_fork = self.cursor_at(result_start);
        let result = self.read_type(&mut result_fork, host, ctx)?;
        host.types.complete_lambda(lambda, infos, result);
        cursor.goto(end);
        Ok(lambda)
    }

    /// A structural refinement: reuse the enclosing refinement class, the
    /// nested refinement's class, or allocate a fresh one; synthesize the
    /// declared member; flatten nested refinements into a single scope.
    fn refined_type(
        &mut self,
        name: TastyName,
        parent: TypeId,
        info: TypeId,
        host: &mut Host,
        ctx: &Context,
    ) -> ReaderResult<TypeId> {
        let nested = match host.types.get(parent) {
            TypeKind::Refined { cls, parents, .. } => Some((*cls, parents.clone())),
            _ => None,
        };
        let (cls, parents) = match nested {
            Some(flattened) => flattened,
            None => {
                let enclosing_is_refinement = !ctx.owner.is_none()
                    && host.syms.get(ctx.owner).kind == SymKind::RefinementClass;
                if enclosing_is_refinement {
                    (ctx.owner, vec![parent])
                } else {
                    (host.new_refinement_class(ctx.owner), vec![parent])
                }
            }
        };
        let decls = host.syms.get(cls).decls;
        let ident = self.ident_of(&name, host);
        let member = if name.is_type_name() {
            let sym = host.new_type_member(cls, ident, Flags::DEFERRED);
            host.set_info(sym, info);
            sym
        } else {
            let method_shaped = matches!(
                host.types.get(info),
                TypeKind::Method { .. } | TypeKind::Poly { .. } | TypeKind::NullaryMethod { .. }
            );
            if method_shaped {
                let sym = host.new_method(cls, ident, Flags::DEFERRED);
                host.set_info(sym, info);
                sym
            } else {
                let sym = host.new_method(cls, ident, Flags::DEFERRED | Flags::STABLE);
                let wrapped = host.types.nullary_method(info);
                host.set_info(sym, wrapped);
                sym
            }
        };
        host.enter_unique(decls, member);
        Ok(host.types.refined(cls, parents, decls))
    }

    /// Complete a symbol only when it is not already mid-completion.
    /// Member lookup during a class's own completion must not trip the
    /// cycle guard on the class itself.
    pub(crate) fn complete_if_idle(
        &mut self,
        sym: SymbolId,
        host: &mut Host,
    ) -> ReaderResult<()> {
        let addr = match self.completers.get(&sym) {
            Some(completer) => completer.addr,
            None => return Ok(()),
        };
        if matches!(self.cycle_at_addr.get(&addr), Some(CycleState::InProgress)) {
            return Ok(());
        }
        self.complete(sym, host)
    }

    /// "Named member of prefix": search the prefix's projected class and
    /// its parents; a miss on the raw name retries the host-escaped form;
    /// a `Signed` name disambiguates overloads by erased parameter count.
    pub(crate) fn named_member(
        &mut self,
        prefix: TypeId,
        name: &TastyName,
        space: Space,
        host: &mut Host,
        ctx: &Context,
    ) -> ReaderResult<SymbolId> {
        let owner = host.type_symbol_of(prefix);
        let search = if !owner.is_none()
            && matches!(
                host.syms.get(owner).kind,
                SymKind::Value | SymKind::ValueParam | SymKind::Method
            ) {
            // a plain term prefix widens to its declared type; forcing the
            // info here is what trips the cycle guard on self-reference
            self.forced_info(owner, host)?
        } else {
            if !owner.is_none() {
                self.complete_if_idle(owner, host)?;
            }
            prefix
        };
        let plain = name.without_signature();
        let text = plain.source_string();
        let candidates = host.members_of_type(search, &text, space);
        if candidates.is_empty() {
            return Err(ReaderError::format(
                format!(
                    "no {} member `{}` in {}",
                    match space {
                        Space::Term => "term",
                        Space::Type => "type",
                    },
                    text,
                    host.type_display(prefix)
                ),
                self.location(host, ctx),
            ));
        }
        let Some(sig) = name.signature() else {
            return Ok(candidates[0]);
        };
        if candidates.len() == 1 {
            return Ok(candidates[0]);
        }
        let wanted = sig
            .params
            .iter()
            .filter(|param| matches!(param, ParamSig::Value(_)))
            .count();
        for &candidate in &candidates {
            let info = self.forced_info(candidate, host)?;
            if count_value_params(host, info) == wanted {
                return Ok(candidate);
            }
        }
        Ok(candidates[0])
    }
}

/// Total erased value-parameter count of a method info.
fn count_value_params(host: &Host, info: TypeId) -> usize {
    let mut count = 0;
    let mut current = info;
    loop {
        match host.types.get(current) {
            TypeKind::Poly { result, .. } | TypeKind::NullaryMethod { result } => {
                current = *result;
            }
            TypeKind::Method { params, result, .. } => {
                count += params.len();
                current = *result;
            }
            _ => return count,
        }
    }
}
