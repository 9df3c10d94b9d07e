//! Terms and type trees.
//!
//! Produces minimal typed host trees: enough for annotation
//! representation, parent type extraction and default-argument getters.
//! Constructs with no host counterpart are refused with their own noun so
//! that the diagnostic names what the source actually used.

use crate::context::{Context, Mode};
use crate::error::{ReaderError, ReaderResult};
use crate::reader::Unpickler;
use tasty_format::{TastyCursor, TastyTag};
use tasty_host::{
    Constant, Host, Ident, LambdaKind, Space, TreeId, TreeKind, TypeId, TypeKind,
};

impl<'a> Unpickler<'a> {
    /// Read one type tree.
    pub(crate) fn read_tpt(
        &mut self,
        cursor: &mut TastyCursor<'a>,
        host: &mut Host,
        ctx: &Context,
    ) -> ReaderResult<TreeId> {
        let tag = cursor.peek_tag()?;
        match tag {
            TastyTag::IdentTpt => {
                cursor.read_tag()?;
                let name = self.resolve_name(cursor.read_name_ref()?, host, ctx)?;
                let tpe = self.read_type(cursor, host, ctx)?;
                let ident = self.ident_of(&name, host);
                Ok(host.trees.alloc(TreeKind::Ident { name: ident }, tpe))
            }
            TastyTag::SelectTpt => {
                cursor.read_tag()?;
                let name = self.resolve_name(cursor.read_name_ref()?, host, ctx)?;
                let qual = self.read_term(cursor, host, ctx)?;
                let qual_tpe = host.trees.type_of(qual);
                let sym = self.named_member(qual_tpe, &name, Space::Type, host, ctx)?;
                let tpe = host.types.type_ref(qual_tpe, sym);
                let ident = self.ident_of(&name, host);
                Ok(host
                    .trees
                    .alloc(TreeKind::Select { qual, name: ident, sym }, tpe))
            }
            TastyTag::SingletonTpt => {
                cursor.read_tag()?;
                let term = self.read_term(cursor, host, ctx)?;
                let tpe = host.trees.type_of(term);
                Ok(host.trees.alloc(TreeKind::TypeTree, tpe))
            }
            TastyTag::ByNameTpt => {
                cursor.read_tag()?;
                let inner = self.read_tpt(cursor, host, ctx)?;
                let tpe = host.trees.type_of(inner);
                let by_name = host.types.by_name(tpe);
                Ok(host.trees.alloc(TreeKind::TypeTree, by_name))
            }
            TastyTag::RefinedTpt => self.read_refined_tpt(cursor, host, ctx),
            TastyTag::AppliedTpt => {
                cursor.read_tag()?;
                let end = cursor.read_end()?;
                let tycon = self.read_tpt(cursor, host, ctx)?;
                let tycon_tpe = host.trees.type_of(tycon);
                let mut args = Vec::new();
                while cursor.current_addr() < end {
                    let arg = self.read_tpt(cursor, host, ctx)?;
                    args.push(host.trees.type_of(arg));
                }
                self.expect_end(cursor, end, tag, host, ctx)?;
                let tpe = host.types.applied(tycon_tpe, args);
                Ok(host.trees.alloc(TreeKind::TypeTree, tpe))
            }
            TastyTag::TypeBoundsTpt => {
                cursor.read_tag()?;
                let end = cursor.read_end()?;
                let lo = self.read_tpt(cursor, host, ctx)?;
                let lo_tpe = host.trees.type_of(lo);
                let tpe = if cursor.is_at(end) {
                    host.types.alias(lo_tpe)
                } else {
                    let hi = self.read_tpt(cursor, host, ctx)?;
                    let hi_tpe = host.trees.type_of(hi);
                    host.types.bounds(lo_tpe, hi_tpe)
                };
                self.expect_end(cursor, end, tag, host, ctx)?;
                Ok(host.trees.alloc(TreeKind::TypeTree, tpe))
            }
            TastyTag::AndTpt => {
                cursor.read_tag()?;
                let end = cursor.read_end()?;
                let first = self.read_tpt(cursor, host, ctx)?;
                let second = self.read_tpt(cursor, host, ctx)?;
                self.expect_end(cursor, end, tag, host, ctx)?;
                let parts = vec![host.trees.type_of(first), host.trees.type_of(second)];
                let tpe = host.types.intersection(parts);
                Ok(host.trees.alloc(TreeKind::TypeTree, tpe))
            }
            TastyTag::AnnotatedTpt => {
                cursor.read_tag()?;
                let end = cursor.read_end()?;
                let tpt = self.read_tpt(cursor, host, ctx)?;
                let annot_ctx = ctx.add_mode(Mode::READ_ANNOTATION);
                let annot = self
                    .read_term(cursor, host, &annot_ctx)
                    .map_err(ReaderError::in_annotation)?;
                self.expect_end(cursor, end, tag, host, ctx)?;
                let underlying = host.trees.type_of(tpt);
                let annot_tpe = host.trees.type_of(annot);
                let tpe = host.types.annotated(underlying, annot_tpe);
                Ok(host.trees.alloc(TreeKind::TypeTree, tpe))
            }
            TastyTag::LambdaTpt => self.read_lambda_tpt(cursor, host, ctx),
            TastyTag::MatchTpt => Err(ReaderError::unsupported(
                "match types",
                self.location(host, ctx),
            )),
            TastyTag::OrTpt => Err(ReaderError::unsupported(
                "union types",
                self.location(host, ctx),
            )),
            _ => {
                let tpe = self.read_type(cursor, host, ctx)?;
                Ok(host.trees.alloc(TreeKind::TypeTree, tpe))
            }
        }
    }

    /// `REFINEDtpt`: a refinement class registered at the tree's address,
    /// one parent, then structural member definitions owned by it.
    fn read_refined_tpt(
        &mut self,
        cursor: &mut TastyCursor<'a>,
        host: &mut Host,
        ctx: &Context,
    ) -> ReaderResult<TreeId> {
        let start = cursor.current_addr();
        cursor.read_tag()?;
        let end = cursor.read_end()?;
        let cls = host.new_refinement_class(ctx.owner);
        self.sym_at_addr.insert(start, cls);
        let parent = self.read_tpt(cursor, host, ctx)?;
        let inner = ctx.with_owner(cls);
        while cursor.current_addr() < end {
            let mut member_cursor = cursor.fork();
            let sym = self.create_member_symbol(&mut member_cursor, host, &inner)?;
            self.complete(sym, host)?;
            cursor.skip_tree()?;
        }
        self.expect_end(cursor, end, TastyTag::RefinedTpt, host, ctx)?;
        let parent_tpe = host.trees.type_of(parent);
        let decls = host.syms.get(cls).decls;
        let tpe = host.types.refined(cls, vec![parent_tpe], decls);
        Ok(host.trees.alloc(TreeKind::TypeTree, tpe))
    }

    /// `LAMBDAtpt`: explicit type-parameter symbols and a body.
    fn read_lambda_tpt(
        &mut self,
        cursor: &mut TastyCursor<'a>,
        host: &mut Host,
        ctx: &Context,
    ) -> ReaderResult<TreeId> {
        cursor.read_tag()?;
        let end = cursor.read_end()?;
        let mut tparams = Vec::new();
        while cursor.current_addr() < end && cursor.peek_tag()? == TastyTag::TypeParam {
            let sym = self.symbol_at_current(cursor, host, ctx)?;
            self.complete(sym, host)?;
            tparams.push(sym);
            cursor.skip_tree()?;
        }
        let body = self.read_tpt(cursor, host, ctx)?;
        self.expect_end(cursor, end, TastyTag::LambdaTpt, host, ctx)?;
        let body_tpe = host.trees.type_of(body);
        let tpe = host.types.poly(tparams, body_tpe);
        Ok(host.trees.alloc(TreeKind::TypeTree, tpe))
    }

    /// Read one term.
    pub(crate) fn read_term(
        &mut self,
        cursor: &mut TastyCursor<'a>,
        host: &mut Host,
        ctx: &Context,
    ) -> ReaderResult<TreeId> {
        let tag = cursor.peek_tag()?;
        match tag {
            TastyTag::SharedTerm => {
                cursor.read_tag()?;
                let addr = cursor.read_addr()?;
                let mut fork = self.cursor_at(addr);
                self.read_term(&mut fork, host, ctx)
            }
            TastyTag::Ident => {
                cursor.read_tag()?;
                let name = self.resolve_name(cursor.read_name_ref()?, host, ctx)?;
                // the ident is a label; its type is read explicitly
                let tpe = self.read_type(cursor, host, ctx)?;
                let ident = self.ident_of(&name, host);
                Ok(host.trees.alloc(TreeKind::Ident { name: ident }, tpe))
            }
            TastyTag::Select => {
                cursor.read_tag()?;
                let name = self.resolve_name(cursor.read_name_ref()?, host, ctx)?;
                let qual = self.read_term(cursor, host, ctx)?;
                self.select_term(&name, qual, host, ctx)
            }
            TastyTag::SelectIn => {
                cursor.read_tag()?;
                let end = cursor.read_end()?;
                let name = self.resolve_name(cursor.read_name_ref()?, host, ctx)?;
                let qual = self.read_term(cursor, host, ctx)?;
                let owner_tpe = self.read_type(cursor, host, ctx)?;
                self.expect_end(cursor, end, tag, host, ctx)?;
                let qual_tpe = host.trees.type_of(qual);
                let sym = match self.named_member(owner_tpe, &name, Space::Term, host, ctx) {
                    Ok(sym) => sym,
                    Err(_) => self.named_member(qual_tpe, &name, Space::Term, host, ctx)?,
                };
                let tpe = host.types.single_type(qual_tpe, sym);
                let ident = self.ident_of(&name.without_signature(), host);
                Ok(host
                    .trees
                    .alloc(TreeKind::Select { qual, name: ident, sym }, tpe))
            }
            TastyTag::QualThis => {
                cursor.read_tag()?;
                let tpt = self.read_tpt(cursor, host, ctx)?;
                let cls = host.type_symbol_of(host.trees.type_of(tpt));
                let tpe = host.types.this_type(cls);
                Ok(host.trees.alloc(TreeKind::This { cls }, tpe))
            }
            TastyTag::New => {
                cursor.read_tag()?;
                let tpt = self.read_tpt(cursor, host, ctx)?;
                let tpe = host.trees.type_of(tpt);
                Ok(host.trees.alloc(TreeKind::New { tpt: tpe }, tpe))
            }
            TastyTag::Throw => {
                cursor.read_tag()?;
                let expr = self.read_term(cursor, host, ctx)?;
                let nothing = host.defs.nothing_class;
                let tpe = host.types.type_ref(TypeId::NONE, nothing);
                Ok(host.trees.alloc(TreeKind::Throw { expr }, tpe))
            }
            TastyTag::ImplicitArg => {
                cursor.read_tag()?;
                self.read_term(cursor, host, ctx)
            }
            TastyTag::NamedArg => {
                cursor.read_tag()?;
                let name = self.resolve_name(cursor.read_name_ref()?, host, ctx)?;
                let arg = self.read_term(cursor, host, ctx)?;
                let tpe = host.trees.type_of(arg);
                let ident = self.ident_of(&name, host);
                Ok(host.trees.alloc(TreeKind::NamedArg { name: ident, arg }, tpe))
            }
            TastyTag::Apply => {
                cursor.read_tag()?;
                let end = cursor.read_end()?;
                let fun = self.read_term(cursor, host, ctx)?;
                let mut args = Vec::new();
                while cursor.current_addr() < end {
                    args.push(self.read_term(cursor, host, ctx)?);
                }
                self.expect_end(cursor, end, tag, host, ctx)?;
                let tpe = apply_result(host, host.trees.type_of(fun));
                Ok(host.trees.alloc(TreeKind::Apply { fun, args }, tpe))
            }
            TastyTag::TypeApply => {
                cursor.read_tag()?;
                let end = cursor.read_end()?;
                let fun = self.read_term(cursor, host, ctx)?;
                let mut args = Vec::new();
                while cursor.current_addr() < end {
                    let arg = self.read_tpt(cursor, host, ctx)?;
                    args.push(host.trees.type_of(arg));
                }
                self.expect_end(cursor, end, tag, host, ctx)?;
                let tpe = type_apply_result(host, host.trees.type_of(fun));
                Ok(host.trees.alloc(TreeKind::TypeApply { fun, args }, tpe))
            }
            TastyTag::Typed => {
                cursor.read_tag()?;
                let end = cursor.read_end()?;
                let expr = self.read_term(cursor, host, ctx)?;
                let tpt = self.read_tpt(cursor, host, ctx)?;
                self.expect_end(cursor, end, tag, host, ctx)?;
                let tpe = host.trees.type_of(tpt);
                Ok(host.trees.alloc(TreeKind::Typed { expr, tpt: tpe }, tpe))
            }
            TastyTag::Block => {
                if !ctx.mode.contains(Mode::READ_PARENTS) {
                    return Err(ReaderError::unsupported(
                        "statements in expression position",
                        self.location(host, ctx),
                    ));
                }
                cursor.read_tag()?;
                let end = cursor.read_end()?;
                // as a parent, only the tail expression matters
                let expr = self.read_term(cursor, host, ctx)?;
                cursor.goto(end);
                Ok(expr)
            }
            TastyTag::If => {
                cursor.read_tag()?;
                let end = cursor.read_end()?;
                if cursor.peek_tag()? == TastyTag::Inline {
                    return Err(ReaderError::unsupported(
                        "inline conditionals",
                        self.location(host, ctx),
                    ));
                }
                let cond = self.read_term(cursor, host, ctx)?;
                let then_branch = self.read_term(cursor, host, ctx)?;
                let else_branch = self.read_term(cursor, host, ctx)?;
                self.expect_end(cursor, end, tag, host, ctx)?;
                let tpe = host.trees.type_of(then_branch);
                Ok(host.trees.alloc(
                    TreeKind::If {
                        cond,
                        then_branch,
                        else_branch,
                    },
                    tpe,
                ))
            }
            TastyTag::Match => {
                cursor.read_tag()?;
                cursor.read_end()?;
                let construct = if cursor.peek_tag()? == TastyTag::Inline {
                    "inline matches"
                } else {
                    "match expressions"
                };
                Err(ReaderError::unsupported(construct, self.location(host, ctx)))
            }
            TastyTag::Super => {
                cursor.read_tag()?;
                let end = cursor.read_end()?;
                let qual = self.read_term(cursor, host, ctx)?;
                let mix = if cursor.current_addr() < end {
                    let mix_tpt = self.read_tpt(cursor, host, ctx)?;
                    let sym = host.type_symbol_of(host.trees.type_of(mix_tpt));
                    if sym.is_none() {
                        Ident::EMPTY
                    } else {
                        self.syms_name(host, sym)
                    }
                } else {
                    Ident::EMPTY
                };
                self.expect_end(cursor, end, tag, host, ctx)?;
                let tpe = host.trees.type_of(qual);
                Ok(host.trees.alloc(TreeKind::Super { qual, mix }, tpe))
            }
            TastyTag::Repeated => {
                cursor.read_tag()?;
                let end = cursor.read_end()?;
                let elem_tpt = self.read_tpt(cursor, host, ctx)?;
                let elem_tpe = host.trees.type_of(elem_tpt);
                let mut elems = Vec::new();
                while cursor.current_addr() < end {
                    elems.push(self.read_term(cursor, host, ctx)?);
                }
                self.expect_end(cursor, end, tag, host, ctx)?;
                let tpe = host.types.repeated(elem_tpe);
                Ok(host.trees.alloc(
                    TreeKind::SeqLiteral {
                        elems,
                        elem_tpt: elem_tpe,
                    },
                    tpe,
                ))
            }
            // literal constants
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
            | TastyTag::StringConst
            | TastyTag::ClassConst => self.read_literal(cursor, host, ctx),
            // refused constructs, each with its own noun
            TastyTag::Lambda => Err(self.refused("closures", host, ctx)),
            TastyTag::Return => Err(self.refused("explicit returns", host, ctx)),
            TastyTag::Inlined => Err(self.refused("inlined invocations", host, ctx)),
            TastyTag::SelectOuter => Err(self.refused("outer selections", host, ctx)),
            TastyTag::Hole => Err(self.refused("TASTy holes", host, ctx)),
            TastyTag::While => Err(self.refused("while loops", host, ctx)),
            TastyTag::Try => Err(self.refused("try expressions", host, ctx)),
            TastyTag::Assign => Err(self.refused("assignments", host, ctx)),
            TastyTag::Bind | TastyTag::Alternative | TastyTag::Unapply | TastyTag::CaseDef => {
                Err(self.refused("pattern trees", host, ctx))
            }
            TastyTag::Import | TastyTag::Package | TastyTag::Export => {
                Err(self.refused("statements in expression position", host, ctx))
            }
            _ => self.read_tpt(cursor, host, ctx),
        }
    }

    pub(crate) fn read_literal(
        &mut self,
        cursor: &mut TastyCursor<'a>,
        host: &mut Host,
        ctx: &Context,
    ) -> ReaderResult<TreeId> {
        let tag = cursor.read_tag()?;
        let value = match tag {
            TastyTag::UnitConst => Constant::Unit,
            TastyTag::TrueConst => Constant::Bool(true),
            TastyTag::FalseConst => Constant::Bool(false),
            TastyTag::NullConst => Constant::Null,
            TastyTag::ByteConst => Constant::Byte(cursor.read_int()? as i8),
            TastyTag::ShortConst => Constant::Short(cursor.read_int()? as i16),
            TastyTag::CharConst => Constant::Char(cursor.read_nat()? as u16),
            TastyTag::IntConst => Constant::Int(cursor.read_int()?),
            TastyTag::LongConst => Constant::Long(cursor.read_long_int()?),
            TastyTag::FloatConst => Constant::Float(cursor.read_nat()?),
            TastyTag::DoubleConst => Constant::Double(cursor.read_long_nat()?),
            TastyTag::StringConst => {
                let name = self.resolve_name(cursor.read_name_ref()?, host, ctx)?;
                Constant::Str(host.intern(&name.source_string()))
            }
            TastyTag::ClassConst => {
                let tpt = self.read_tpt(cursor, host, ctx)?;
                Constant::Class(host.trees.type_of(tpt))
            }
            other => {
                return Err(ReaderError::format(
                    format!("tag {other} is not a literal"),
                    self.location(host, ctx),
                ));
            }
        };
        let tpe = host.types.constant(value.clone());
        Ok(host.trees.alloc(TreeKind::Literal { value }, tpe))
    }

    /// A parent given as a constructor application, collapsed to its
    /// result type. `BLOCK` parents keep only their tail expression.
    pub(crate) fn read_parent_from_term(
        &mut self,
        cursor: &mut TastyCursor<'a>,
        host: &mut Host,
        ctx: &Context,
    ) -> ReaderResult<TypeId> {
        let tag = cursor.read_tag()?;
        match tag {
            TastyTag::Apply => {
                let end = cursor.read_end()?;
                let parent = self.read_parent_from_term(cursor, host, ctx)?;
                cursor.goto(end);
                Ok(parent)
            }
            TastyTag::TypeApply => {
                let end = cursor.read_end()?;
                let parent = self.read_parent_from_term(cursor, host, ctx)?;
                let mut args = Vec::new();
                while cursor.current_addr() < end {
                    let arg = self.read_tpt(cursor, host, ctx)?;
                    args.push(host.trees.type_of(arg));
                }
                cursor.goto(end);
                if matches!(host.types.get(parent), TypeKind::Applied { .. }) {
                    Ok(parent)
                } else {
                    Ok(host.types.applied(parent, args))
                }
            }
            TastyTag::Block => {
                let end = cursor.read_end()?;
                let parent = self.read_parent_from_term(cursor, host, ctx)?;
                cursor.goto(end);
                Ok(parent)
            }
            TastyTag::Select => {
                let _ctor_name = cursor.read_name_ref()?;
                self.read_parent_from_term(cursor, host, ctx)
            }
            TastyTag::New => {
                let tpt = self.read_tpt(cursor, host, ctx)?;
                Ok(host.trees.type_of(tpt))
            }
            TastyTag::SharedTerm => {
                let addr = cursor.read_addr()?;
                let mut fork = self.cursor_at(addr);
                self.read_parent_from_term(&mut fork, host, ctx)
            }
            other => Err(ReaderError::format(
                format!("parent of a class is not a constructor application (found {other})"),
                self.location(host, ctx),
            )),
        }
    }

    fn select_term(
        &mut self,
        name: &tasty_names::TastyName,
        qual: TreeId,
        host: &mut Host,
        ctx: &Context,
    ) -> ReaderResult<TreeId> {
        let qual_tpe = host.trees.type_of(qual);
        let sym = self.named_member(qual_tpe, name, Space::Term, host, ctx)?;
        let tpe = host.types.single_type(qual_tpe, sym);
        let ident = self.ident_of(&name.without_signature(), host);
        Ok(host
            .trees
            .alloc(TreeKind::Select { qual, name: ident, sym }, tpe))
    }

    #[cold]
    fn refused(&self, construct: &str, host: &Host, ctx: &Context) -> ReaderError {
        ReaderError::unsupported(construct, self.location(host, ctx))
    }

    pub(crate) fn expect_end(
        &self,
        cursor: &TastyCursor<'a>,
        end: tasty_format::Addr,
        tag: TastyTag,
        host: &Host,
        ctx: &Context,
    ) -> ReaderResult<()> {
        if cursor.is_at(end) {
            Ok(())
        } else {
            Err(ReaderError::format(
                format!(
                    "cursor at {} instead of {end} after reading a {tag}",
                    cursor.current_addr()
                ),
                self.location(host, ctx),
            ))
        }
    }

    fn syms_name(&self, host: &Host, sym: tasty_host::SymbolId) -> Ident {
        host.syms.get(sym).name
    }
}

/// Result type of applying one value-argument section.
fn apply_result(host: &Host, fun_tpe: TypeId) -> TypeId {
    match host.types.get(fun_tpe) {
        TypeKind::Method { result, .. } => *result,
        TypeKind::Lambda {
            kind: LambdaKind::Method | LambdaKind::ImplicitMethod,
            result,
            ..
        } => *result,
        _ => fun_tpe,
    }
}

/// Result type of applying one type-argument section.
fn type_apply_result(host: &Host, fun_tpe: TypeId) -> TypeId {
    match host.types.get(fun_tpe) {
        TypeKind::Poly { result, .. } => *result,
        TypeKind::Lambda {
            kind: LambdaKind::Poly | LambdaKind::TypeLambda,
            result,
            ..
        } => *result,
        _ => fun_tpe,
    }
}
