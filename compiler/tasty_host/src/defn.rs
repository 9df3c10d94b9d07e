//! Well-known definitions and mirror operations.
//!
//! The mirror owns the package hierarchy and the handful of language-root
//! classes the unpickler must recognize: the value-class root, the
//! reference root and the foreign object class it rewrites to `AnyRef`.

use crate::flags::Flags;
use crate::scope::Space;
use crate::symbol::SymbolId;
use crate::types::TypeId;
use crate::Host;

/// Handles to the well-known symbols, resolved once at host construction.
pub struct Definitions {
    pub root_package: SymbolId,
    pub root_package_class: SymbolId,
    pub empty_package: SymbolId,
    pub empty_package_class: SymbolId,
    pub scala_package: SymbolId,
    pub java_lang_package: SymbolId,
    pub any_class: SymbolId,
    pub any_ref_class: SymbolId,
    pub any_val_class: SymbolId,
    pub object_class: SymbolId,
    pub nothing_class: SymbolId,
    pub int_class: SymbolId,
    pub unit_class: SymbolId,
    pub boolean_class: SymbolId,
}

impl Definitions {
    pub(crate) fn placeholder() -> Definitions {
        Definitions {
            root_package: SymbolId::NONE,
            root_package_class: SymbolId::NONE,
            empty_package: SymbolId::NONE,
            empty_package_class: SymbolId::NONE,
            scala_package: SymbolId::NONE,
            java_lang_package: SymbolId::NONE,
            any_class: SymbolId::NONE,
            any_ref_class: SymbolId::NONE,
            any_val_class: SymbolId::NONE,
            object_class: SymbolId::NONE,
            nothing_class: SymbolId::NONE,
            int_class: SymbolId::NONE,
            unit_class: SymbolId::NONE,
            boolean_class: SymbolId::NONE,
        }
    }
}

impl Host {
    pub(crate) fn bootstrap_definitions(&mut self) {
        // root package is created by hand: it has no owner
        let root_name = self.strings.intern("<root>");
        let root = self.fresh_package_pair(SymbolId::NONE, root_name);
        self.defs.root_package = root;
        self.defs.root_package_class = self.syms.get(root).module_class;

        let empty_name = self.strings.intern("<empty>");
        let empty = self.new_package(self.defs.root_package_class, empty_name);
        self.defs.empty_package = empty;
        self.defs.empty_package_class = self.syms.get(empty).module_class;

        let scala = self.get_or_create_package("scala");
        self.defs.scala_package = scala;
        let java_lang = self.get_or_create_package("java.lang");
        self.defs.java_lang_package = java_lang;

        let scala_class_scope = self.class_scope_of(scala);
        let java_lang_scope = self.class_scope_of(java_lang);
        let scala_class = self.syms.get(scala).module_class;
        let java_lang_class = self.syms.get(java_lang).module_class;

        let any = self.bootstrap_class(scala_class, "Any", Flags::ABSTRACT, &[]);
        self.defs.any_class = any;
        let any_tpe = self.types.type_ref(TypeId::NONE, any);

        let object_class =
            self.bootstrap_class(java_lang_class, "Object", Flags::empty(), &[any_tpe]);
        self.defs.object_class = object_class;

        let any_ref = self.bootstrap_class(scala_class, "AnyRef", Flags::empty(), &[any_tpe]);
        self.defs.any_ref_class = any_ref;
        let any_val =
            self.bootstrap_class(scala_class, "AnyVal", Flags::ABSTRACT, &[any_tpe]);
        self.defs.any_val_class = any_val;
        let nothing = self.bootstrap_class(
            scala_class,
            "Nothing",
            Flags::ABSTRACT | Flags::FINAL,
            &[any_tpe],
        );
        self.defs.nothing_class = nothing;

        let any_val_tpe = self.types.type_ref(TypeId::NONE, any_val);
        let int = self.bootstrap_class(scala_class, "Int", Flags::FINAL, &[any_val_tpe]);
        self.defs.int_class = int;
        let unit = self.bootstrap_class(scala_class, "Unit", Flags::FINAL, &[any_val_tpe]);
        self.defs.unit_class = unit;
        let boolean = self.bootstrap_class(scala_class, "Boolean", Flags::FINAL, &[any_val_tpe]);
        self.defs.boolean_class = boolean;

        self.enter(scala_class_scope, any);
        self.enter(scala_class_scope, any_ref);
        self.enter(scala_class_scope, any_val);
        self.enter(scala_class_scope, nothing);
        self.enter(scala_class_scope, int);
        self.enter(scala_class_scope, unit);
        self.enter(scala_class_scope, boolean);
        self.enter(java_lang_scope, object_class);
    }

    fn fresh_package_pair(&mut self, owner: SymbolId, name: crate::strings::Ident) -> SymbolId {
        // mirrors new_package but tolerates the missing owner of <root>
        if owner.is_none() {
            let flags = Flags::PACKAGE | Flags::MODULE | Flags::FINAL | Flags::STABLE;
            let val = self.syms.alloc(crate::symbol::Symbol {
                name,
                kind: crate::symbol::SymKind::Package,
                owner: SymbolId::NONE,
                flags,
                info: TypeId::NONE,
                private_within: SymbolId::NONE,
                module_class: SymbolId::NONE,
                source_module: SymbolId::NONE,
                decls: crate::scope::ScopeId::NONE,
                type_params: Vec::new(),
                annotations: Vec::new(),
            });
            let decls = self.scopes.new_scope();
            let cls = self.syms.alloc(crate::symbol::Symbol {
                name,
                kind: crate::symbol::SymKind::PackageClass,
                owner: SymbolId::NONE,
                flags: Flags::PACKAGE | Flags::MODULE | Flags::FINAL,
                info: TypeId::NONE,
                private_within: SymbolId::NONE,
                module_class: SymbolId::NONE,
                source_module: val,
                decls,
                type_params: Vec::new(),
                annotations: Vec::new(),
            });
            self.syms.get_mut(val).module_class = cls;
            val
        } else {
            self.new_package(owner, name)
        }
    }

    fn bootstrap_class(
        &mut self,
        owner: SymbolId,
        name: &str,
        flags: Flags,
        parents: &[TypeId],
    ) -> SymbolId {
        let ident = self.strings.intern(name);
        let cls = self.new_class(owner, ident, flags);
        let decls = self.syms.get(cls).decls;
        let info = self
            .types
            .class_info(parents.to_vec(), decls, cls, TypeId::NONE);
        self.set_info(cls, info);
        cls
    }

    /// The package for a dotted path, creating missing segments.
    /// The empty path is the root package.
    pub fn get_or_create_package(&mut self, path: &str) -> SymbolId {
        let mut current = self.defs.root_package;
        if path.is_empty() {
            return current;
        }
        for segment in path.split('.') {
            let scope = self.class_scope_of(current);
            let ident = self.strings.intern(segment);
            current = match self.lookup_ident(scope, ident, Space::Term) {
                Some(existing) => existing,
                None => {
                    let owner_class = self.syms.get(current).module_class;
                    self.new_package(owner_class, ident)
                }
            };
        }
        current
    }

    /// The package for a dotted path, without creating anything.
    pub fn find_package(&self, path: &str) -> Option<SymbolId> {
        let mut current = self.defs.root_package;
        if path.is_empty() {
            return Some(current);
        }
        for segment in path.split('.') {
            let scope = self.class_scope_of(current);
            current = self.lookup_str(scope, segment, Space::Term)?;
        }
        Some(current)
    }

    /// Class lookup by fully qualified name; `None` when absent.
    pub fn get_class_if_defined(&self, path: &str) -> Option<SymbolId> {
        self.qualified_lookup(path, Space::Type)
    }

    /// Module lookup by fully qualified name; `None` when absent.
    pub fn get_module_if_defined(&self, path: &str) -> Option<SymbolId> {
        self.qualified_lookup(path, Space::Term)
    }

    fn qualified_lookup(&self, path: &str, space: Space) -> Option<SymbolId> {
        let (prefix, last) = match path.rsplit_once('.') {
            Some((prefix, last)) => (prefix, last),
            None => ("", path),
        };
        let package = self.find_package(prefix)?;
        let scope = self.class_scope_of(package);
        self.lookup_str(scope, last, space)
    }

    /// The extension-method form of a value-class member's info: the
    /// class's type parameters are re-bound on the extension method and a
    /// leading `$this` value parameter carries the receiver.
    pub fn extension_method_info(
        &mut self,
        cls: SymbolId,
        ext: SymbolId,
        orig: TypeId,
    ) -> TypeId {
        use crate::types::TypeKind;

        let (orig_tparams, orig_rest) = match self.types.get(orig) {
            TypeKind::Poly { params, result } => (params.clone(), *result),
            _ => (Vec::new(), orig),
        };

        let mut tparams = orig_tparams;
        for &class_param in self.syms.get(cls).type_params.clone().iter() {
            let record = self.syms.get(class_param);
            let (name, flags, info) = (record.name, record.flags, record.info);
            let cloned = self.new_type_param(ext, name, flags);
            self.set_info(cloned, info);
            tparams.push(cloned);
        }

        let cls_ref = {
            let tycon = self.types.type_ref(TypeId::NONE, cls);
            let args: Vec<TypeId> = self
                .syms
                .get(cls)
                .type_params
                .clone()
                .iter()
                .map(|&tp| self.types.type_ref(TypeId::NONE, tp))
                .collect();
            self.types.applied(tycon, args)
        };

        let this_name = self.strings.intern("$this");
        let this_param = self.new_value_param(ext, this_name, Flags::PARAM);
        self.set_info(this_param, cls_ref);

        let rest = match self.types.get(orig_rest) {
            TypeKind::NullaryMethod { result } => *result,
            _ => orig_rest,
        };
        let inner = self.types.method(vec![this_param], rest, false);
        self.types.poly(tparams, inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_symbols_exist() {
        let host = Host::new();
        assert!(!host.defs.any_val_class.is_none());
        assert_eq!(host.name_of(host.defs.object_class), "Object");
        assert_eq!(
            host.get_class_if_defined("java.lang.Object"),
            Some(host.defs.object_class)
        );
        assert_eq!(
            host.get_class_if_defined("scala.AnyVal"),
            Some(host.defs.any_val_class)
        );
        assert_eq!(host.get_class_if_defined("scala.Missing"), None);
    }

    #[test]
    fn packages_create_on_demand_and_memoize() {
        let mut host = Host::new();
        let a = host.get_or_create_package("com.acme");
        let b = host.get_or_create_package("com.acme");
        assert_eq!(a, b);
        assert_eq!(host.find_package("com.acme"), Some(a));
        assert_eq!(host.find_package("com.missing"), None);
    }

    #[test]
    fn root_and_empty_packages() {
        let mut host = Host::new();
        assert_eq!(host.get_or_create_package(""), host.defs.root_package);
        assert!(!host.defs.empty_package_class.is_none());
    }

    #[test]
    fn extension_info_prepends_receiver() {
        let mut host = Host::new();
        let owner = host.defs.empty_package_class;
        let cls_name = host.strings.intern("Wrap");
        let cls = host.new_class(owner, cls_name, Flags::FINAL);
        let ext_name = host.strings.intern("plus$extension");
        let ext = host.new_extension_method(owner, ext_name, Flags::empty());

        let int_name = host.strings.intern("y");
        let param = host.new_value_param(ext, int_name, Flags::PARAM);
        let result = host.types.this_type(cls);
        host.set_info(param, result);
        let orig = host.types.method(vec![param], result, false);

        let info = host.extension_method_info(cls, ext, orig);
        match host.types.get(info) {
            crate::types::TypeKind::Method { params, .. } => {
                assert_eq!(host.name_of(params[0]), "$this");
            }
            other => panic!("expected a method type, found {other:?}"),
        }
    }
}
