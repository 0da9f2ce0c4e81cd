//! Type resolution and single-value conversion.

mod common;

use std::sync::Arc;

use common::World;
use trellis_bridge::interfacing::registry_classifier;
use trellis_bridge::{
    BridgeDeclaration, BridgeError, Classifier, Environment, Interfacing, UserStrategy, Value,
};
use trellis_core::{
    CodeListFamily, GenericType, InterfaceDesc, InterfaceRegistry, Literal, TypeDesc,
};

fn collection(signature: &str) -> TypeDesc {
    TypeDesc::Collection(GenericType::parse(signature).unwrap())
}

#[test]
fn strings_and_text() {
    let world = World::new();
    let hello = world.rt.str("hello");
    let plain: String = world.env.to(Some(&hello), &TypeDesc::String).unwrap();
    assert_eq!(plain, "hello");
    let text: Literal = world
        .env
        .to(Some(&hello), &TypeDesc::InternationalString)
        .unwrap();
    assert_eq!(text.to_string_in(Some("fr")), "hello");
    assert!(world.env.to_typed(None, &TypeDesc::String).unwrap().is_null());
}

#[test]
fn numbers_and_booleans() {
    let world = World::new();
    let seven = world.rt.int(7);
    let half = world.rt.float(0.5);
    let env = &world.env;
    assert_eq!(env.to::<i64>(Some(&seven), &TypeDesc::Integer { boxed: false }).unwrap(), 7);
    assert_eq!(env.to::<f64>(Some(&half), &TypeDesc::Float { boxed: true }).unwrap(), 0.5);
    assert!(env.to::<bool>(Some(&seven), &TypeDesc::Boolean { boxed: true }).unwrap());
    let zero = world.rt.int(0);
    assert!(!env.to::<bool>(Some(&zero), &TypeDesc::Boolean { boxed: false }).unwrap());
}

#[test]
fn null_handling_depends_on_boxing() {
    let world = World::new();
    let env = &world.env;
    for boxed in [
        TypeDesc::Integer { boxed: true },
        TypeDesc::Float { boxed: true },
        TypeDesc::Boolean { boxed: true },
    ] {
        assert!(env.to_typed(None, &boxed).unwrap().is_null(), "{boxed}");
    }
    assert_eq!(env.to::<i64>(None, &TypeDesc::Integer { boxed: false }).unwrap(), 0);
    assert!(env.to::<f64>(None, &TypeDesc::Float { boxed: false }).unwrap().is_nan());
    assert!(!env.to::<bool>(None, &TypeDesc::Boolean { boxed: false }).unwrap());
}

#[test]
fn collection_targets_are_caller_misuse() {
    let world = World::new();
    let list = world.ints(&[1, 2]);
    let err = world
        .env
        .to_typed(Some(&list), &collection("List<Integer>"))
        .unwrap_err();
    assert!(matches!(err, BridgeError::CollectionRequested { .. }));
    let err = world.env.to_typed(None, &collection("Set<String>")).unwrap_err();
    assert!(matches!(err, BridgeError::CollectionRequested { .. }));
}

#[test]
fn unknown_types_are_unconvertible() {
    let world = World::new();
    let value = world.rt.str("x");
    let target = world.env.type_named("Identifier");
    assert_eq!(target, TypeDesc::Named("Identifier".into()));
    match world.env.to_typed(Some(&value), &target) {
        Err(BridgeError::UnconvertibleType { type_name }) => assert_eq!(type_name, "Identifier"),
        other => panic!("expected UnconvertibleType, got {other:?}"),
    }
}

#[test]
fn resolution_is_deterministic_and_cached() {
    let world = World::new();
    let target = TypeDesc::Interface("Citation".into());
    let first = world.env.resolve(&target).unwrap();
    let second = world.env.resolve(&target).unwrap();
    assert_eq!(first.strategy_name(), second.strategy_name());
    assert_eq!(first.output(), second.output());
    assert_eq!(first.strategy_name(), "bridge");

    let party = world.env.resolve(&TypeDesc::Interface("Party".into())).unwrap();
    assert_eq!(party.strategy_name(), "polymorphic bridge");
    assert_eq!(party.binding().unwrap().interface().name, "Party");
}

#[test]
fn code_list_lookup_slow_path() {
    let world = World::new();
    let role = world.env.code_list("Role").unwrap();
    let target = TypeDesc::CodeList(Arc::clone(&role));
    let padded = world.code("  pointOfContact ");
    let code: trellis_core::Code = world.env.to(Some(&padded), &target).unwrap();
    assert_eq!(code.name(), "POINT_OF_CONTACT");

    let upper = world.code("AUTHOR");
    let author: trellis_core::Code = world.env.to(Some(&upper), &target).unwrap();
    assert_eq!(author.ordinal(), 0);

    let blank = world.code("   ");
    assert!(world.env.to_typed(Some(&blank), &target).unwrap().is_null());
    assert!(world.env.to_typed(None, &target).unwrap().is_null());
}

#[test]
fn closed_code_list_rejects_unknown_names() {
    let world = World::new();
    let role = world.env.code_list("Role").unwrap();
    let publisher = world.code("publisher");
    let err = world
        .env
        .to_typed(Some(&publisher), &TypeDesc::CodeList(Arc::clone(&role)))
        .unwrap_err();
    match err {
        BridgeError::UnknownCode { family, name } => {
            assert_eq!(family, "Role");
            assert_eq!(name, "publisher");
        }
        other => panic!("expected UnknownCode, got {other:?}"),
    }
    assert_eq!(role.len(), 2);
}

#[test]
fn open_code_list_appends_on_miss() {
    let world = World::new();
    let keyword = world.env.code_list("Keyword").unwrap();
    let target = world.env.type_named("Keyword");
    assert_eq!(target, TypeDesc::CodeList(Arc::clone(&keyword)));
    let theme = world.code("theme");
    let first: trellis_core::Code = world.env.to(Some(&theme), &target).unwrap();
    let again: trellis_core::Code = world.env.to(Some(&world.code("THEME")), &target).unwrap();
    assert_eq!(first, again);
    assert_eq!(keyword.len(), 1);
}

#[test]
fn builtin_code_list_families_can_be_process_wide() {
    static SCOPE: once_cell::sync::Lazy<Arc<CodeListFamily>> = once_cell::sync::Lazy::new(|| {
        let family = CodeListFamily::closed("Scope");
        family.declare("DATASET", ["dataset"]);
        family.declare("SERIES", ["series"]);
        Arc::new(family)
    });
    let world = World::new();
    let env = Environment::builder(world.rt.clone())
        .code_list(Arc::clone(&SCOPE))
        .build()
        .unwrap();
    let target = env.type_named("Scope");
    let code: trellis_core::Code = env.to(Some(&world.code("Series")), &target).unwrap();
    assert_eq!(code.name(), "SERIES");
}

fn user_defined_classifier() -> Classifier {
    let fallback = registry_classifier();
    Arc::new(move |registry: &InterfaceRegistry, name: &str| match name {
        "Citation" => Interfacing::UserDefined(UserStrategy::new(|handle, target| {
            assert_eq!(target, &TypeDesc::Interface("Citation".into()));
            Ok(Value::Custom(Arc::new(handle.identity())))
        })),
        "Party" => Interfacing::UserDefined(
            UserStrategy::new(|_, _| Ok(Value::Str("individual".into())))
                .producing(TypeDesc::Interface("Individual".into())),
        ),
        "Organisation" => Interfacing::UserDefined(
            UserStrategy::new(|_, _| Ok(Value::Null))
                .producing(TypeDesc::Interface("Party".into())),
        ),
        "Responsibility" => Interfacing::UserDefined(
            UserStrategy::new(|_, _| Ok(Value::Null)).producing(TypeDesc::String),
        ),
        _ => fallback(registry, name),
    })
}

fn user_defined_world() -> (World, Environment) {
    let world = World::new();
    let decl = BridgeDeclaration::parse(common::METADATA).unwrap();
    let env = Environment::builder(world.rt.clone())
        .registry(decl.to_registry().unwrap())
        .classifier(user_defined_classifier())
        .build()
        .unwrap();
    (world, env)
}

#[test]
fn user_defined_strategy_receives_handle_and_target() {
    let (world, env) = user_defined_world();
    let citation = world.citation("Sample");
    let value = env
        .to_typed(Some(&citation), &TypeDesc::Interface("Citation".into()))
        .unwrap();
    let Value::Custom(custom) = value else {
        panic!("expected a custom value");
    };
    assert_eq!(custom.downcast_ref::<usize>(), Some(&citation.identity()));
    let none = env
        .to_typed(None, &TypeDesc::Interface("Citation".into()))
        .unwrap();
    assert!(none.is_null());
}

#[test]
fn user_defined_output_must_be_assignable() {
    let (world, env) = user_defined_world();
    let party = world.party(&world.classes.party, "Alice");

    let subtype = env
        .to::<String>(Some(&party), &TypeDesc::Interface("Party".into()))
        .unwrap();
    assert_eq!(subtype, "individual");

    let err = env
        .to_typed(Some(&party), &TypeDesc::Interface("Organisation".into()))
        .unwrap_err();
    assert!(matches!(err, BridgeError::UnconvertibleType { ref type_name } if type_name == "Organisation"));

    let err = env
        .resolve(&TypeDesc::Interface("Responsibility".into()))
        .unwrap_err();
    assert!(matches!(err, BridgeError::UnconvertibleType { .. }));
}

#[test]
fn managed_but_unregistered_is_unconvertible() {
    let world = World::new();
    let always_managed: Classifier = Arc::new(|_: &InterfaceRegistry, _: &str| Interfacing::Managed);
    let env = Environment::builder(world.rt.clone())
        .classifier(always_managed)
        .build()
        .unwrap();
    let err = env
        .to_typed(Some(&world.rt.str("x")), &TypeDesc::Interface("Ghost".into()))
        .unwrap_err();
    assert!(matches!(err, BridgeError::UnconvertibleType { .. }));
}

#[test]
fn default_interfacing_passes_through() {
    let world = World::new();
    let citation = world.citation("Sample");
    let value = world
        .env
        .to_typed(Some(&citation), &TypeDesc::Interface("Unregistered".into()))
        .unwrap();
    let Value::Object(object) = value else {
        panic!("expected a bridged object");
    };
    assert!(object.is_pass_through());
    assert_eq!(object.interface(), "Unregistered");
    let title = object.invoke("title", Vec::new()).unwrap();
    let Value::Foreign(raw) = title else {
        panic!("expected a raw handle");
    };
    assert_eq!(world.string(&raw), "Sample");
}

#[test]
fn inconsistent_registry_fails_setup() {
    let world = World::new();
    let mut registry = InterfaceRegistry::new();
    registry
        .register(InterfaceDesc::new("Individual").with_parent("Party"))
        .unwrap();
    let err = Environment::builder(world.rt.clone())
        .registry(registry)
        .build()
        .unwrap_err();
    assert!(matches!(err, BridgeError::Setup { .. }));
    assert!(std::error::Error::source(&err).is_some());
}
