//! Boundary cases, invariants and idempotence.

use super::builder::{host_with_roots, member, Pickler};
use crate::{unpickle, unpickle_lazy, ErrorKind, ReaderSettings};
use pretty_assertions::assert_eq;
use tasty_format::TastyTag;
use tasty_host::{Constant, Flags, Host, Space, SymbolId, TypeKind};
use tasty_names::NameTable;

fn settings() -> ReaderSettings {
    ReaderSettings::default()
}

/// `class E extends Object` with an empty body.
fn empty_class_stream(name: &str) -> (Vec<u8>, NameTable) {
    let mut p = Pickler::new();
    let e = p.simple(name);
    let pkg = p.start(TastyTag::Package);
    p.empty_package_ref();
    let typedef = p.start(TastyTag::TypeDef);
    p.nat(e.into());
    let template = p.start(TastyTag::Template);
    p.object_parent();
    p.end(template);
    p.end(typedef);
    p.end(pkg);
    p.finish()
}

#[test]
fn empty_template_yields_wellformed_class_info() {
    let (bytes, names) = empty_class_stream("E");
    let (mut host, class_root, module_root) = host_with_roots("E");
    unpickle(
        &bytes,
        &names,
        settings(),
        &mut host,
        class_root,
        module_root,
        "E.tasty",
    )
    .unwrap();

    let info = host.types.final_result(host.info_of(class_root));
    match host.types.get(info) {
        TypeKind::ClassInfo { parents, decls, cls, .. } => {
            assert_eq!(*cls, class_root);
            assert!(host.scopes.members(*decls).is_empty());
            assert_eq!(parents.len(), 1);
            assert_eq!(
                host.type_symbol_of(parents[0]),
                host.defs.any_ref_class
            );
        }
        other => panic!("class info is {other:?}"),
    }
}

#[test]
fn implicit_leading_clause_of_constructor_gets_empty_clause() {
    let mut p = Pickler::new();
    let d = p.simple("D");
    let init = p.simple("<init>");
    let q = p.simple("q");

    let pkg = p.start(TastyTag::Package);
    p.empty_package_ref();
    let typedef = p.start(TastyTag::TypeDef);
    p.nat(d.into());
    let template = p.start(TastyTag::Template);
    p.object_parent();
    let ctor = p.start(TastyTag::DefDef);
    p.nat(init.into());
    let param = p.start(TastyTag::Param);
    p.nat(q.into());
    p.scala_ref("Int");
    p.tag(TastyTag::Implicit);
    p.end(param);
    p.scala_ref("Unit");
    p.end(ctor);
    p.end(template);
    p.end(typedef);
    p.end(pkg);

    let (bytes, names) = p.finish();
    let (mut host, class_root, module_root) = host_with_roots("D");
    let mut unpickler = unpickle_lazy(
        &bytes,
        &names,
        settings(),
        &mut host,
        class_root,
        module_root,
        "D.tasty",
    )
    .unwrap();

    let scope = host.syms.get(class_root).decls;
    let ctor_sym = member(&host, scope, "<init>", Space::Term);
    let info = unpickler.forced_info(ctor_sym, &mut host).unwrap();
    match host.types.get(info) {
        TypeKind::Method {
            params,
            result,
            implicit_params,
        } => {
            assert!(params.is_empty(), "prepended clause must be empty");
            assert!(!implicit_params);
            match host.types.get(*result) {
                TypeKind::Method {
                    params,
                    implicit_params,
                    ..
                } => {
                    assert_eq!(params.len(), 1);
                    assert!(*implicit_params);
                }
                other => panic!("inner clause is {other:?}"),
            }
        }
        other => panic!("constructor info is {other:?}"),
    }
}

#[test]
fn recursive_type_reference_resolves_to_the_seeded_node() {
    let mut p = Pickler::new();
    let r = p.simple("R");
    let m = p.simple("m");

    let pkg = p.start(TastyTag::Package);
    p.empty_package_ref();
    let typedef = p.start(TastyTag::TypeDef);
    p.nat(r.into());
    let rec_at = p.current();
    p.tag(TastyTag::RecType);
    let refined = p.start(TastyTag::RefinedType);
    p.nat(m.into());
    p.scala_ref("AnyRef");
    p.tag(TastyTag::RecThis);
    p.nat(rec_at.into());
    p.end(refined);
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
        "R.tasty",
    )
    .unwrap();

    let scope = host.syms.get(host.defs.empty_package_class).decls;
    let r_sym = member(&host, scope, "R", Space::Type);
    unpickler.complete(r_sym, &mut host).unwrap();

    let rec = host.info_of(r_sym);
    let body = match host.types.get(rec) {
        TypeKind::Rec { body } => *body,
        other => panic!("expected a recursive type, found {other:?}"),
    };
    let decls = match host.types.get(body) {
        TypeKind::Refined { decls, .. } => *decls,
        other => panic!("recursive body is {other:?}"),
    };
    let member_sym = host.scopes.members(decls)[0];
    match host.types.get(host.info_of(member_sym)) {
        TypeKind::NullaryMethod { result } => {
            // the self-reference is the very node seeded before descent
            assert_eq!(*result, rec);
        }
        other => panic!("member info is {other:?}"),
    }
}

#[test]
fn unsupported_parent_poisons_only_its_root() {
    let mut p = Pickler::new();
    let u = p.simple("U");
    let pkg = p.start(TastyTag::Package);
    p.empty_package_ref();
    let typedef = p.start(TastyTag::TypeDef);
    p.nat(u.into());
    let template = p.start(TastyTag::Template);
    let or = p.start(TastyTag::OrTpt);
    p.scala_ref("Any");
    p.scala_ref("Any");
    p.end(or);
    p.end(template);
    p.end(typedef);
    p.end(pkg);

    let (bytes, names) = p.finish();
    let (mut host, class_root, module_root) = host_with_roots("U");
    // the refused construct is reported, not propagated
    unpickle(
        &bytes,
        &names,
        settings(),
        &mut host,
        class_root,
        module_root,
        "U.tasty",
    )
    .unwrap();
    assert!(host.reporter.has_errors());
    assert!(host.reporter.errors()[0].contains("union types"));
    assert!(host.info_of(class_root).is_error());
    assert!(host.flags_of(class_root).contains(Flags::ERRONEOUS));
}

#[test]
fn unsupported_member_type_raises_with_noun() {
    let mut p = Pickler::new();
    let v = p.simple("v");
    let pkg = p.start(TastyTag::Package);
    p.empty_package_ref();
    let val = p.start(TastyTag::ValDef);
    p.nat(v.into());
    let or = p.start(TastyTag::OrTpt);
    p.scala_ref("Any");
    p.scala_ref("Any");
    p.end(or);
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
        "v.tasty",
    )
    .unwrap();

    let scope = host.syms.get(host.defs.empty_package_class).decls;
    let v_sym = member(&host, scope, "v", Space::Term);
    let err = unpickler.complete(v_sym, &mut host).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Unsupported { .. }));
    assert!(err.to_string().contains("union types"), "{err}");
    assert!(host.info_of(v_sym).is_error());
}

#[test]
fn inline_value_with_literal_gets_a_constant_type() {
    let mut p = Pickler::new();
    let v = p.simple("answer");
    let pkg = p.start(TastyTag::Package);
    p.empty_package_ref();
    let val = p.start(TastyTag::ValDef);
    p.nat(v.into());
    p.scala_ref("Int");
    p.tag(TastyTag::IntConst);
    p.int(42);
    p.tag(TastyTag::Inline);
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
        "answer.tasty",
    )
    .unwrap();

    let scope = host.syms.get(host.defs.empty_package_class).decls;
    let v_sym = member(&host, scope, "answer", Space::Term);
    unpickler.complete(v_sym, &mut host).unwrap();
    match host.types.get(host.info_of(v_sym)) {
        TypeKind::ConstantType { value } => assert_eq!(*value, Constant::Int(42)),
        other => panic!("inline value info is {other:?}"),
    }
}

#[test]
fn inline_value_without_literal_is_refused() {
    let mut p = Pickler::new();
    let v = p.simple("bad");
    let pkg = p.start(TastyTag::Package);
    p.empty_package_ref();
    let val = p.start(TastyTag::ValDef);
    p.nat(v.into());
    p.scala_ref("Int");
    p.tag(TastyTag::Inline);
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
        "bad.tasty",
    )
    .unwrap();

    let scope = host.syms.get(host.defs.empty_package_class).decls;
    let v_sym = member(&host, scope, "bad", Space::Term);
    let err = unpickler.complete(v_sym, &mut host).unwrap_err();
    assert!(err.is_unsupported());
    assert!(err.to_string().contains("inline values"), "{err}");
}

fn annotated_value_stream() -> (Vec<u8>, NameTable) {
    let mut p = Pickler::new();
    let v = p.simple("marked");
    let pkg = p.start(TastyTag::Package);
    p.empty_package_ref();
    let val = p.start(TastyTag::ValDef);
    p.nat(v.into());
    p.scala_ref("Int");
    p.tag(TastyTag::NullConst);
    let annot = p.start(TastyTag::Annotation);
    p.scala_ref("Any");
    p.tag(TastyTag::New);
    p.scala_ident_tpt("Any");
    p.end(annot);
    p.end(val);
    p.end(pkg);
    p.finish()
}

#[test]
fn annotations_attach_at_completion() {
    let (bytes, names) = annotated_value_stream();
    let (mut host, class_root, module_root) = host_with_roots("Dummy");
    let mut unpickler = unpickle_lazy(
        &bytes,
        &names,
        settings(),
        &mut host,
        class_root,
        module_root,
        "marked.tasty",
    )
    .unwrap();

    let scope = host.syms.get(host.defs.empty_package_class).decls;
    let v_sym = member(&host, scope, "marked", Space::Term);
    unpickler.complete(v_sym, &mut host).unwrap();
    let annotations = &host.syms.get(v_sym).annotations;
    assert_eq!(annotations.len(), 1);
    assert_eq!(
        host.type_symbol_of(annotations[0].tpe),
        host.defs.any_class
    );
}

#[test]
fn no_annotations_setting_drops_the_thunks() {
    let (bytes, names) = annotated_value_stream();
    let (mut host, class_root, module_root) = host_with_roots("Dummy");
    let mut unpickler = unpickle_lazy(
        &bytes,
        &names,
        ReaderSettings {
            ignore_annotations: true,
            ..ReaderSettings::default()
        },
        &mut host,
        class_root,
        module_root,
        "marked.tasty",
    )
    .unwrap();

    let scope = host.syms.get(host.defs.empty_package_class).decls;
    let v_sym = member(&host, scope, "marked", Space::Term);
    unpickler.complete(v_sym, &mut host).unwrap();
    assert!(host.syms.get(v_sym).annotations.is_empty());
}

#[test]
fn debug_setting_echoes_decisions() {
    let (bytes, names) = empty_class_stream("E");
    let (mut host, class_root, module_root) = host_with_roots("E");
    unpickle(
        &bytes,
        &names,
        ReaderSettings {
            debug_tasty: true,
            ..ReaderSettings::default()
        },
        &mut host,
        class_root,
        module_root,
        "E.tasty",
    )
    .unwrap();
    assert!(!host.reporter.echoes().is_empty());
    assert!(host
        .reporter
        .echoes()
        .iter()
        .any(|line| line.contains("AnyRef")));
}

/// Names and structural renderings of a second run match the first.
#[test]
fn unpickling_twice_is_idempotent() {
    fn run(bytes: &[u8], names: &NameTable) -> (Vec<String>, String, Host, SymbolId) {
        let (mut host, class_root, module_root) = host_with_roots("E");
        unpickle(
            bytes,
            names,
            settings(),
            &mut host,
            class_root,
            module_root,
            "E.tasty",
        )
        .unwrap();
        let scope = host.syms.get(host.defs.empty_package_class).decls;
        let rendered: Vec<String> = host
            .scopes
            .members(scope)
            .iter()
            .map(|&sym| host.name_of(sym).to_string())
            .collect();
        let info = host.type_display(host.info_of(class_root));
        (rendered, info, host, class_root)
    }

    let (bytes, names) = empty_class_stream("E");
    let (names_a, info_a, _host_a, _) = run(&bytes, &names);
    let (names_b, info_b, _host_b, _) = run(&bytes, &names);
    assert_eq!(names_a, names_b);
    assert_eq!(info_a, info_b);
}

#[test]
fn completion_is_idempotent_and_guard_ends_clean() {
    let (bytes, names) = empty_class_stream("E");
    let (mut host, class_root, module_root) = host_with_roots("E");
    let mut unpickler = unpickle_lazy(
        &bytes,
        &names,
        settings(),
        &mut host,
        class_root,
        module_root,
        "E.tasty",
    )
    .unwrap();

    let first = unpickler.forced_info(class_root, &mut host).unwrap();
    let second = unpickler.forced_info(class_root, &mut host).unwrap();
    assert_eq!(first, second);
    assert!(unpickler.cycle_guard_is_clean());
}
