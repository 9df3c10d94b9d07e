//! The host type pool.
//!
//! Types are arena nodes referenced by 32-bit `TypeId`s; children are ids,
//! never boxes. `NoType` and the error type are pre-interned at fixed
//! indices. Recursive constructors (lambda binders, recursive types) are
//! forward-declared and completed exactly once, so self-references made
//! while reading the body resolve to the node under construction.

use crate::scope::ScopeId;
use crate::strings::Ident;
use crate::symbol::SymbolId;
use crate::Host;
use std::fmt::Write;

/// A 32-bit index into the type pool.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub struct TypeId(u32);

impl TypeId {
    /// The absent type.
    pub const NONE: TypeId = TypeId(0);
    /// The error type installed when completion fails.
    pub const ERROR: TypeId = TypeId(1);

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_error(self) -> bool {
        self.0 == 1
    }
}

/// Literal constants.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Constant {
    Unit,
    Bool(bool),
    Byte(i8),
    Short(i16),
    Char(u16),
    Int(i32),
    Long(i64),
    /// IEEE bits, kept raw for exact equality.
    Float(u32),
    Double(u64),
    Str(Ident),
    Null,
    Class(TypeId),
    /// Tags an enum value with its own symbol.
    Enum(SymbolId),
}

/// Shape of a forward-declared lambda binder.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum LambdaKind {
    Method,
    ImplicitMethod,
    Poly,
    TypeLambda,
}

/// A type node.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum TypeKind {
    None,
    Error,
    /// Reference to a type symbol through a prefix.
    TypeRef { prefix: TypeId, sym: SymbolId },
    /// Singleton type of a stable term symbol.
    SingleType { prefix: TypeId, sym: SymbolId },
    ThisType { sym: SymbolId },
    SuperType { this: TypeId, parent: TypeId },
    ConstantType { value: Constant },
    Annotated { underlying: TypeId, annot: TypeId },
    Intersection { parts: Vec<TypeId> },
    /// Structural refinement owned by a refinement class.
    Refined {
        cls: SymbolId,
        parents: Vec<TypeId>,
        decls: ScopeId,
    },
    ClassInfo {
        parents: Vec<TypeId>,
        decls: ScopeId,
        cls: SymbolId,
        self_type: TypeId,
    },
    /// Definition-site method type over parameter symbols.
    Method {
        params: Vec<SymbolId>,
        result: TypeId,
        implicit_params: bool,
    },
    NullaryMethod { result: TypeId },
    /// Definition-site polymorphic type over type-parameter symbols.
    Poly {
        params: Vec<SymbolId>,
        result: TypeId,
    },
    Bounds { lo: TypeId, hi: TypeId },
    ByName { underlying: TypeId },
    Repeated { elem: TypeId },
    Existential {
        quantified: Vec<SymbolId>,
        underlying: TypeId,
    },
    Applied { tycon: TypeId, args: Vec<TypeId> },
    /// Wire-level lambda binder: interleaved parameter names and infos.
    /// `result == NONE` until completed.
    Lambda {
        kind: LambdaKind,
        param_names: Vec<Ident>,
        param_infos: Vec<TypeId>,
        result: TypeId,
    },
    /// Reference to the `index`-th parameter of a lambda binder.
    ParamRef { binder: TypeId, index: u32 },
    /// Recursive type; `body == NONE` until completed.
    Rec { body: TypeId },
}

/// Arena of type nodes.
pub struct TypePool {
    nodes: Vec<TypeKind>,
}

impl TypePool {
    pub fn new() -> TypePool {
        TypePool {
            nodes: vec![TypeKind::None, TypeKind::Error],
        }
    }

    #[inline]
    pub fn get(&self, id: TypeId) -> &TypeKind {
        &self.nodes[id.index()]
    }

    fn alloc(&mut self, kind: TypeKind) -> TypeId {
        let id = TypeId(self.nodes.len() as u32);
        self.nodes.push(kind);
        id
    }

    pub fn type_ref(&mut self, prefix: TypeId, sym: SymbolId) -> TypeId {
        self.alloc(TypeKind::TypeRef { prefix, sym })
    }

    pub fn single_type(&mut self, prefix: TypeId, sym: SymbolId) -> TypeId {
        self.alloc(TypeKind::SingleType { prefix, sym })
    }

    pub fn this_type(&mut self, sym: SymbolId) -> TypeId {
        self.alloc(TypeKind::ThisType { sym })
    }

    pub fn super_type(&mut self, this: TypeId, parent: TypeId) -> TypeId {
        self.alloc(TypeKind::SuperType { this, parent })
    }

    pub fn constant(&mut self, value: Constant) -> TypeId {
        self.alloc(TypeKind::ConstantType { value })
    }

    pub fn annotated(&mut self, underlying: TypeId, annot: TypeId) -> TypeId {
        self.alloc(TypeKind::Annotated { underlying, annot })
    }

    pub fn intersection(&mut self, parts: Vec<TypeId>) -> TypeId {
        self.alloc(TypeKind::Intersection { parts })
    }

    pub fn refined(&mut self, cls: SymbolId, parents: Vec<TypeId>, decls: ScopeId) -> TypeId {
        self.alloc(TypeKind::Refined { cls, parents, decls })
    }

    pub fn class_info(
        &mut self,
        parents: Vec<TypeId>,
        decls: ScopeId,
        cls: SymbolId,
        self_type: TypeId,
    ) -> TypeId {
        self.alloc(TypeKind::ClassInfo {
            parents,
            decls,
            cls,
            self_type,
        })
    }

    pub fn method(&mut self, params: Vec<SymbolId>, result: TypeId, implicit_params: bool) -> TypeId {
        self.alloc(TypeKind::Method {
            params,
            result,
            implicit_params,
        })
    }

    pub fn nullary_method(&mut self, result: TypeId) -> TypeId {
        self.alloc(TypeKind::NullaryMethod { result })
    }

    /// Polymorphic type; collapses to the result when there are no
    /// type parameters.
    pub fn poly(&mut self, params: Vec<SymbolId>, result: TypeId) -> TypeId {
        if params.is_empty() {
            result
        } else {
            self.alloc(TypeKind::Poly { params, result })
        }
    }

    pub fn bounds(&mut self, lo: TypeId, hi: TypeId) -> TypeId {
        self.alloc(TypeKind::Bounds { lo, hi })
    }

    /// An alias is a bounds node with identical ends.
    pub fn alias(&mut self, target: TypeId) -> TypeId {
        self.bounds(target, target)
    }

    pub fn by_name(&mut self, underlying: TypeId) -> TypeId {
        self.alloc(TypeKind::ByName { underlying })
    }

    pub fn repeated(&mut self, elem: TypeId) -> TypeId {
        self.alloc(TypeKind::Repeated { elem })
    }

    pub fn existential(&mut self, quantified: Vec<SymbolId>, underlying: TypeId) -> TypeId {
        self.alloc(TypeKind::Existential {
            quantified,
            underlying,
        })
    }

    /// Applied type constructor. The empty application is the tycon
    /// itself; variance bookkeeping lives on the tycon's parameters.
    pub fn applied(&mut self, tycon: TypeId, args: Vec<TypeId>) -> TypeId {
        if args.is_empty() {
            tycon
        } else {
            self.alloc(TypeKind::Applied { tycon, args })
        }
    }

    /// Forward-declare a lambda binder with known parameter names.
    pub fn new_lambda(&mut self, kind: LambdaKind, param_names: Vec<Ident>) -> TypeId {
        self.alloc(TypeKind::Lambda {
            kind,
            param_names,
            param_infos: Vec::new(),
            result: TypeId::NONE,
        })
    }

    /// Populate a forward-declared lambda. One-shot.
    pub fn complete_lambda(&mut self, id: TypeId, param_infos: Vec<TypeId>, result: TypeId) {
        match &mut self.nodes[id.index()] {
            TypeKind::Lambda {
                param_infos: infos,
                result: res,
                ..
            } => {
                debug_assert!(res.is_none(), "lambda completed twice");
                *infos = param_infos;
                *res = result;
            }
            other => panic!("complete_lambda on {other:?}"),
        }
    }

    pub fn param_ref(&mut self, binder: TypeId, index: u32) -> TypeId {
        self.alloc(TypeKind::ParamRef { binder, index })
    }

    /// Forward-declare a recursive type.
    pub fn new_rec(&mut self) -> TypeId {
        self.alloc(TypeKind::Rec { body: TypeId::NONE })
    }

    /// Populate a forward-declared recursive type. One-shot.
    pub fn complete_rec(&mut self, id: TypeId, body: TypeId) {
        match &mut self.nodes[id.index()] {
            TypeKind::Rec { body: slot } => {
                debug_assert!(slot.is_none(), "recursive type completed twice");
                *slot = body;
            }
            other => panic!("complete_rec on {other:?}"),
        }
    }

    /// Result type after peeling every parameter section.
    pub fn final_result(&self, mut id: TypeId) -> TypeId {
        loop {
            match self.get(id) {
                TypeKind::Method { result, .. }
                | TypeKind::NullaryMethod { result }
                | TypeKind::Poly { result, .. } => id = *result,
                _ => return id,
            }
        }
    }

    /// Whether the node is a bounds alias (`lo == hi`).
    pub fn is_alias(&self, id: TypeId) -> bool {
        matches!(self.get(id), TypeKind::Bounds { lo, hi } if lo == hi)
    }

    /// Node count, sentinels included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether only the pre-interned sentinels exist.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 2
    }
}

impl Default for TypePool {
    fn default() -> Self {
        Self::new()
    }
}

impl Host {
    /// The symbol a type projects onto, for member lookup and parent
    /// rewriting. `SymbolId::NONE` when the type has none.
    pub fn type_symbol_of(&self, id: TypeId) -> SymbolId {
        match self.types.get(id) {
            TypeKind::TypeRef { sym, .. }
            | TypeKind::SingleType { sym, .. }
            | TypeKind::ThisType { sym } => *sym,
            TypeKind::ClassInfo { cls, .. } | TypeKind::Refined { cls, .. } => *cls,
            TypeKind::Applied { tycon, .. } => self.type_symbol_of(*tycon),
            TypeKind::Annotated { underlying, .. }
            | TypeKind::ByName { underlying }
            | TypeKind::NullaryMethod { result: underlying } => self.type_symbol_of(*underlying),
            TypeKind::Bounds { lo, hi } if lo == hi => self.type_symbol_of(*lo),
            TypeKind::SuperType { parent, .. } => self.type_symbol_of(*parent),
            _ => SymbolId::NONE,
        }
    }

    /// Structural rendering, used by diagnostics and by tests comparing
    /// types across separate hosts.
    pub fn type_display(&self, id: TypeId) -> String {
        let mut out = String::new();
        self.write_type(&mut out, id);
        out
    }

    fn write_type(&self, out: &mut String, id: TypeId) {
        match self.types.get(id) {
            TypeKind::None => out.push_str("<notype>"),
            TypeKind::Error => out.push_str("<error>"),
            TypeKind::TypeRef { prefix, sym } => {
                self.write_prefix(out, *prefix);
                out.push_str(self.name_of(*sym));
            }
            TypeKind::SingleType { prefix, sym } => {
                self.write_prefix(out, *prefix);
                out.push_str(self.name_of(*sym));
                out.push_str(".type");
            }
            TypeKind::ThisType { sym } => {
                out.push_str(self.name_of(*sym));
                out.push_str(".this");
            }
            TypeKind::SuperType { this, .. } => {
                self.write_type(out, *this);
                out.push_str(".super");
            }
            TypeKind::ConstantType { value } => {
                let _ = write!(out, "{value:?}");
            }
            TypeKind::Annotated { underlying, .. } => {
                self.write_type(out, *underlying);
                out.push_str(" @annot");
            }
            TypeKind::Intersection { parts } => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" with ");
                    }
                    self.write_type(out, *part);
                }
            }
            TypeKind::Refined { parents, decls, .. } => {
                for (i, parent) in parents.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" with ");
                    }
                    self.write_type(out, *parent);
                }
                out.push_str(" { ");
                for (i, member) in self.scopes.members(*decls).iter().enumerate() {
                    if i > 0 {
                        out.push_str("; ");
                    }
                    out.push_str(self.name_of(*member));
                }
                out.push_str(" }");
            }
            TypeKind::ClassInfo { parents, cls, .. } => {
                out.push_str(self.name_of(*cls));
                out.push_str(" extends ");
                for (i, parent) in parents.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" with ");
                    }
                    self.write_type(out, *parent);
                }
            }
            TypeKind::Method {
                params,
                result,
                implicit_params,
            } => {
                out.push('(');
                if *implicit_params {
                    out.push_str("implicit ");
                }
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(self.name_of(*param));
                    out.push_str(": ");
                    self.write_type(out, self.syms.get(*param).info);
                }
                out.push(')');
                self.write_type(out, *result);
            }
            TypeKind::NullaryMethod { result } => {
                out.push_str("=> ");
                self.write_type(out, *result);
            }
            TypeKind::Poly { params, result } => {
                out.push('[');
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(self.name_of(*param));
                }
                out.push(']');
                self.write_type(out, *result);
            }
            TypeKind::Bounds { lo, hi } => {
                if lo == hi {
                    out.push_str("= ");
                    self.write_type(out, *lo);
                } else {
                    out.push_str(">: ");
                    self.write_type(out, *lo);
                    out.push_str(" <: ");
                    self.write_type(out, *hi);
                }
            }
            TypeKind::ByName { underlying } => {
                out.push_str("=> ");
                self.write_type(out, *underlying);
            }
            TypeKind::Repeated { elem } => {
                self.write_type(out, *elem);
                out.push('*');
            }
            TypeKind::Existential { underlying, .. } => {
                self.write_type(out, *underlying);
                out.push_str(" forSome { .. }");
            }
            TypeKind::Applied { tycon, args } => {
                self.write_type(out, *tycon);
                out.push('[');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write_type(out, *arg);
                }
                out.push(']');
            }
            TypeKind::Lambda {
                kind,
                param_names,
                param_infos,
                result,
            } => {
                out.push(match kind {
                    LambdaKind::Method | LambdaKind::ImplicitMethod => '(',
                    LambdaKind::Poly | LambdaKind::TypeLambda => '[',
                });
                for (i, name) in param_names.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(self.strings.lookup(*name));
                    if let Some(info) = param_infos.get(i) {
                        out.push_str(": ");
                        self.write_type(out, *info);
                    }
                }
                out.push(match kind {
                    LambdaKind::Method | LambdaKind::ImplicitMethod => ')',
                    LambdaKind::Poly | LambdaKind::TypeLambda => ']',
                });
                out.push_str(" =>> ");
                self.write_type(out, *result);
            }
            TypeKind::ParamRef { index, .. } => {
                let _ = write!(out, "<param {index}>");
            }
            TypeKind::Rec { .. } => out.push_str("<rec>"),
        }
    }

    fn write_prefix(&self, out: &mut String, prefix: TypeId) {
        if !prefix.is_none() {
            self.write_type(out, prefix);
            out.push('.');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_are_pre_interned() {
        let pool = TypePool::new();
        assert!(matches!(pool.get(TypeId::NONE), TypeKind::None));
        assert!(matches!(pool.get(TypeId::ERROR), TypeKind::Error));
    }

    #[test]
    fn poly_collapses_without_params() {
        let mut pool = TypePool::new();
        let result = pool.constant(Constant::Int(1));
        assert_eq!(pool.poly(Vec::new(), result), result);
    }

    #[test]
    fn applied_collapses_without_args() {
        let mut pool = TypePool::new();
        let tycon = pool.this_type(SymbolId::NONE);
        assert_eq!(pool.applied(tycon, Vec::new()), tycon);
    }

    #[test]
    fn lambda_completion_is_one_shot() {
        let mut pool = TypePool::new();
        let lambda = pool.new_lambda(LambdaKind::Poly, vec![Ident::EMPTY]);
        let param = pool.param_ref(lambda, 0);
        pool.complete_lambda(lambda, vec![param], param);
        match pool.get(lambda) {
            TypeKind::Lambda {
                param_infos, result, ..
            } => {
                assert_eq!(param_infos, &[param]);
                assert_eq!(*result, param);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rec_seeding_then_completion() {
        let mut pool = TypePool::new();
        let rec = pool.new_rec();
        let body = pool.constant(Constant::Unit);
        pool.complete_rec(rec, body);
        assert!(matches!(pool.get(rec), TypeKind::Rec { body: b } if *b == body));
    }

    #[test]
    fn alias_is_degenerate_bounds() {
        let mut pool = TypePool::new();
        let t = pool.constant(Constant::Null);
        let alias = pool.alias(t);
        assert!(pool.is_alias(alias));
        let bounds = pool.bounds(TypeId::NONE, t);
        assert!(!pool.is_alias(bounds));
    }

    #[test]
    fn final_result_peels_sections() {
        let mut pool = TypePool::new();
        let unit = pool.constant(Constant::Unit);
        let method = pool.method(Vec::new(), unit, false);
        let nullary = pool.nullary_method(method);
        assert_eq!(pool.final_result(nullary), unit);
    }
}
