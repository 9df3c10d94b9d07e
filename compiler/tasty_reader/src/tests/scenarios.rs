//! End-to-end scenarios: complete artifacts through `unpickle`, checked
//! against the resulting symbol table.

use super::builder::{host_with_roots, member, Pickler};
use crate::{unpickle, unpickle_lazy, ErrorKind, ReaderSettings};
use pretty_assertions::assert_eq;
use tasty_format::TastyTag;
use tasty_host::{Flags, Space, TypeKind};

fn settings() -> ReaderSettings {
    ReaderSettings::default()
}

#[test]
fn module_and_companion_class() {
    let mut p = Pickler::new();
    let foo = p.simple("Foo");
    let foo_module = p.module_name("Foo");

    let pkg = p.start(TastyTag::Package);
    p.empty_package_ref();

    // object Foo: the module value, typed by its own module class
    let val = p.start(TastyTag::ValDef);
    p.nat(foo.into());
    p.tag(TastyTag::IdentTpt);
    p.nat(foo.into());
    p.tag(TastyTag::TypeRefDirect);
    let class_addr = p.reserve();
    p.tag(TastyTag::NullConst); // rhs slot; never read
    p.tag(TastyTag::Object);
    p.end(val);

    // the module class
    let typedef_at = p.current();
    p.set(&class_addr, typedef_at);
    let typedef = p.start(TastyTag::TypeDef);
    p.nat(foo_module.into());
    let template = p.start(TastyTag::Template);
    p.object_parent();
    p.primary_ctor();
    p.end(template);
    p.tag(TastyTag::Object);
    p.end(typedef);
    p.end(pkg);

    let (bytes, names) = p.finish();
    let (mut host, class_root, module_root) = host_with_roots("Foo");
    unpickle(
        &bytes,
        &names,
        settings(),
        &mut host,
        class_root,
        module_root,
        "Foo.tasty",
    )
    .unwrap();

    assert!(host
        .flags_of(module_root)
        .contains(Flags::MODULE | Flags::LAZY | Flags::FINAL | Flags::STABLE));
    let module_class = host.syms.get(module_root).module_class;
    assert!(host
        .flags_of(module_class)
        .contains(Flags::MODULE | Flags::FINAL));
    assert_eq!(host.syms.get(module_class).source_module, module_root);

    let scope = host.syms.get(host.defs.empty_package_class).decls;
    assert_eq!(member(&host, scope, "Foo", Space::Term), module_root);
    assert_eq!(member(&host, scope, "Foo", Space::Type), module_class);

    let info = host.info_of(module_class);
    let info = host.types.final_result(info);
    match host.types.get(info) {
        TypeKind::ClassInfo { parents, .. } => {
            assert!(parents
                .iter()
                .any(|&parent| host.type_symbol_of(parent) == host.defs.any_ref_class));
        }
        other => panic!("module class info is {other:?}"),
    }
    assert_eq!(
        host.type_symbol_of(host.info_of(module_root)),
        module_class
    );
}

#[test]
fn constructor_default_getter() {
    let mut p = Pickler::new();
    let c = p.simple("C");
    let c_module = p.module_name("C");
    let getter = p.default_name("<init>", 0);

    let pkg = p.start(TastyTag::Package);
    p.empty_package_ref();

    let val = p.start(TastyTag::ValDef);
    p.nat(c.into());
    p.tag(TastyTag::IdentTpt);
    p.nat(c.into());
    p.tag(TastyTag::TypeRefDirect);
    let class_addr = p.reserve();
    p.tag(TastyTag::NullConst);
    p.tag(TastyTag::Object);
    p.end(val);

    let typedef_at = p.current();
    p.set(&class_addr, typedef_at);
    let typedef = p.start(TastyTag::TypeDef);
    p.nat(c_module.into());
    let template = p.start(TastyTag::Template);
    p.object_parent();
    p.primary_ctor();
    // the constructor-default getter, a plain method in the companion
    let def = p.start(TastyTag::DefDef);
    p.nat(getter.into());
    p.scala_ref("Int");
    p.tag(TastyTag::IntConst);
    p.int(1);
    p.end(def);
    p.end(template);
    p.tag(TastyTag::Object);
    p.end(typedef);
    p.end(pkg);

    let (bytes, names) = p.finish();
    let (mut host, class_root, module_root) = host_with_roots("C");
    let mut unpickler = unpickle_lazy(
        &bytes,
        &names,
        settings(),
        &mut host,
        class_root,
        module_root,
        "C.tasty",
    )
    .unwrap();

    let module_class = host.syms.get(module_root).module_class;
    let scope = host.syms.get(module_class).decls;
    let getter_sym = member(&host, scope, "$lessinit$greater$default$1", Space::Term);
    assert!(host
        .flags_of(getter_sym)
        .contains(Flags::DEFAULT_PARAMETERIZED));

    let info = unpickler.forced_info(getter_sym, &mut host).unwrap();
    match host.types.get(info) {
        TypeKind::NullaryMethod { result } => {
            assert_eq!(host.type_symbol_of(*result), host.defs.int_class);
        }
        other => panic!("default getter info is {other:?}"),
    }
}

#[test]
fn higher_kinded_bound() {
    let mut p = Pickler::new();
    let f = p.simple("F");
    let x = p.simple("X");

    let pkg = p.start(TastyTag::Package);
    p.empty_package_ref();

    let typedef = p.start(TastyTag::TypeDef);
    p.nat(f.into());
    let bounds = p.start(TastyTag::TypeBoundsTpt);
    p.scala_ident_tpt("Nothing");
    let lambda = p.start(TastyTag::LambdaTpt);
    let tparam = p.start(TastyTag::TypeParam);
    p.nat(x.into());
    let tpb = p.start(TastyTag::TypeBounds);
    p.scala_ref("Nothing");
    p.scala_ref("Any");
    p.end(tpb);
    p.end(tparam);
    p.scala_ident_tpt("AnyRef");
    p.end(lambda);
    p.end(bounds);
    p.end(typedef);
    p.end(pkg);

    let (bytes, names) = p.finish();
    let (mut host, class_root, module_root) = host_with_roots("Dummy");
    let mut unpickler = unpickle_lazy(
        &bytes,
        &names,
        settings(),
        &mut host,
        class_root,
        module_root,
        "F.tasty",
    )
    .unwrap();

    let scope = host.syms.get(host.defs.empty_package_class).decls;
    let f_sym = member(&host, scope, "F", Space::Type);
    unpickler.complete(f_sym, &mut host).unwrap();
    assert!(host.flags_of(f_sym).contains(Flags::DEFERRED));

    let info = host.info_of(f_sym);
    let (lo, hi) = match host.types.get(info) {
        TypeKind::Bounds { lo, hi } => (*lo, *hi),
        other => panic!("bound type is {other:?}"),
    };
    assert_eq!(host.type_symbol_of(lo), host.defs.nothing_class);
    match host.types.get(hi) {
        TypeKind::Poly { params, .. } => {
            assert_eq!(params.len(), 1);
            assert_eq!(host.name_of(params[0]), "X");
            let param_info = host.info_of(params[0]);
            assert!(matches!(
                host.types.get(param_info),
                TypeKind::Bounds { .. }
            ));
        }
        other => panic!("upper bound is {other:?}"),
    }
}

#[test]
fn value_class_extension_methods() {
    let mut p = Pickler::new();
    let wrap = p.simple("Wrap");
    let wrap_module = p.module_name("Wrap");
    let x = p.simple("x");
    let y = p.simple("y");
    let init = p.simple("<init>");
    let plus = p.simple("plus");

    let pkg = p.start(TastyTag::Package);
    p.empty_package_ref();

    // companion module value first, so the class finds its companion
    let val = p.start(TastyTag::ValDef);
    p.nat(wrap.into());
    p.tag(TastyTag::IdentTpt);
    p.nat(wrap.into());
    p.tag(TastyTag::TypeRefDirect);
    let module_class_addr = p.reserve();
    p.tag(TastyTag::NullConst);
    p.tag(TastyTag::Object);
    p.end(val);

    // class Wrap(val x: Int) extends AnyVal { def plus(y: Int): Int }
    let typedef = p.start(TastyTag::TypeDef);
    p.nat(wrap.into());
    let template = p.start(TastyTag::Template);
    let accessor = p.start(TastyTag::Param);
    p.nat(x.into());
    p.scala_ref("Int");
    p.end(accessor);
    p.scala_ident_tpt("AnyVal");
    let ctor = p.start(TastyTag::DefDef);
    p.nat(init.into());
    let ctor_param = p.start(TastyTag::Param);
    p.nat(x.into());
    p.scala_ref("Int");
    p.end(ctor_param);
    p.scala_ref("Unit");
    p.end(ctor);
    let meth = p.start(TastyTag::DefDef);
    p.nat(plus.into());
    let meth_param = p.start(TastyTag::Param);
    p.nat(y.into());
    p.scala_ref("Int");
    p.end(meth_param);
    p.scala_ref("Int");
    p.end(meth);
    p.end(template);
    p.end(typedef);

    // the companion module class
    let module_typedef_at = p.current();
    p.set(&module_class_addr, module_typedef_at);
    let module_typedef = p.start(TastyTag::TypeDef);
    p.nat(wrap_module.into());
    let module_template = p.start(TastyTag::Template);
    p.object_parent();
    p.primary_ctor();
    p.end(module_template);
    p.tag(TastyTag::Object);
    p.end(module_typedef);
    p.end(pkg);

    let (bytes, names) = p.finish();
    let (mut host, class_root, module_root) = host_with_roots("Wrap");
    unpickle(
        &bytes,
        &names,
        settings(),
        &mut host,
        class_root,
        module_root,
        "Wrap.tasty",
    )
    .unwrap();

    let class_scope = host.syms.get(class_root).decls;
    let plus_sym = member(&host, class_scope, "plus", Space::Term);
    let orig_info = host.info_of(plus_sym);

    let module_class = host.syms.get(module_root).module_class;
    let module_scope = host.syms.get(module_class).decls;
    let ext = member(&host, module_scope, "plus$extension", Space::Term);
    assert!(host.flags_of(ext).contains(Flags::METHOD | Flags::FINAL));

    // the installed info is exactly the host's extension-method rewrite
    let probe_name = host.intern("probe");
    let probe = host.new_extension_method(module_class, probe_name, Flags::empty());
    let expected = host.extension_method_info(class_root, probe, orig_info);
    assert_eq!(
        host.type_display(host.info_of(ext)),
        host.type_display(expected)
    );

    // the receiver parameter leads
    match host.types.get(host.info_of(ext)) {
        TypeKind::Method { params, .. } => {
            assert_eq!(host.name_of(params[0]), "$this");
        }
        other => panic!("extension info is {other:?}"),
    }
}

#[test]
fn nested_refinements_flatten() {
    let mut p = Pickler::new();
    let t = p.simple("T");
    let a = p.simple("a");
    let b = p.simple("b");

    let pkg = p.start(TastyTag::Package);
    p.empty_package_ref();

    let typedef = p.start(TastyTag::TypeDef);
    p.nat(t.into());
    let outer = p.start(TastyTag::RefinedType);
    p.nat(b.into());
    let inner = p.start(TastyTag::RefinedType);
    p.nat(a.into());
    p.scala_ref("AnyRef");
    p.scala_ref("Int");
    p.end(inner);
    p.scala_ref("Int");
    p.end(outer);
    p.end(typedef);
    p.end(pkg);

    let (bytes, names) = p.finish();
    let (mut host, class_root, module_root) = host_with_roots("Dummy");
    let mut unpickler = unpickle_lazy(
        &bytes,
        &names,
        settings(),
        &mut host,
        class_root,
        module_root,
        "T.tasty",
    )
    .unwrap();

    let scope = host.syms.get(host.defs.empty_package_class).decls;
    let t_sym = member(&host, scope, "T", Space::Type);
    unpickler.complete(t_sym, &mut host).unwrap();

    match host.types.get(host.info_of(t_sym)) {
        TypeKind::Refined { cls, parents, decls } => {
            // one refinement class, both members, innermost parents
            assert_eq!(parents.len(), 1);
            assert_eq!(
                host.type_symbol_of(parents[0]),
                host.defs.any_ref_class
            );
            let names: Vec<&str> = host
                .scopes
                .members(*decls)
                .iter()
                .map(|&sym| host.name_of(sym))
                .collect();
            assert_eq!(names, vec!["a", "b"]);
            for &member_sym in host.scopes.members(*decls) {
                assert_eq!(host.syms.get(member_sym).owner, *cls);
            }
        }
        other => panic!("refined info is {other:?}"),
    }
}

#[test]
fn cyclic_value_definition_is_refused() {
    let mut p = Pickler::new();
    let x = p.simple("x");
    let y = p.simple("y");

    let pkg = p.start(TastyTag::Package);
    p.empty_package_ref();

    //
    let val_at = p.current();
    let val = p.start(TastyTag::ValDef);
    p.nat(x.into());
    p.tag(TastyTag::TermRef);
    p.nat(y.into());
    p.tag(TastyTag::TermRefDirect);
    p.nat(val_at.into());
    p.end(val);
    p.end(pkg);

    let (bytes, names) = p.finish();
    let (mut host, class_root, module_root) = host_with_roots("Dummy");
    let mut unpickler = unpickle_lazy(
        &bytes,
        &names,
        settings(),
        &mut host,
        class_root,
        module_root,
        "x.tasty",
    )
    .unwrap();

    let scope = host.syms.get(host.defs.empty_package_class).decls;
    let x_sym = member(&host, scope, "x", Space::Term);
    let err = unpickler.complete(x_sym, &mut host).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Cyclic { .. }), "{err}");
    assert!(host.info_of(x_sym).is_error());
    assert!(host.flags_of(x_sym).contains(Flags::ERRONEOUS));
    assert!(unpickler.cycle_guard_is_clean());
}
