//! Compilation and constructor selection through a container.

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pretty_assertions::assert_eq;
use wire::{
    BuilderRegistry, Capability, CollectionFlavor, CompileContext, Compiler, Container,
    CustomTarget, Delegate, Expr, Instance, Parameter, ResolveError, ResolveResult, Target,
    TargetBuilder, TargetKind, TargetRef, TypeDef,
};

use crate::common::{arg_tags, built, class, counting_ctor, ctor, leaf, Built};

#[test]
fn recompiling_after_registration_yields_an_equivalent_factory() {
    let container = Container::default();
    let dep = leaf(&container, "Dep");
    let foo = class(
        &container,
        TypeDef::class("Foo").with_constructor(ctor("foo", vec![Parameter::new("dep", dep)])),
    );
    container.register(Target::construct(dep));
    container.register(Target::construct(foo));

    let first = container.factory(foo).unwrap().unwrap();
    let cached = container.factory(foo).unwrap().unwrap();
    assert!(first.ptr_eq(&cached));

    // Any registration invalidates compiled factories.
    let unrelated = leaf(&container, "Unrelated");
    container.register(Target::construct(unrelated));
    let second = container.factory(foo).unwrap().unwrap();
    assert!(!first.ptr_eq(&second));

    let a = container.get(foo).unwrap();
    assert_eq!(built(&a).tag, "foo");
    assert_eq!(arg_tags(&a), vec!["Dep"]);
}

#[test]
fn cycle_is_reported_before_any_constructor_runs() {
    let container = Container::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let left = class(&container, TypeDef::interface("Left"));
    let right = class(&container, TypeDef::interface("Right"));
    let a = class(
        &container,
        TypeDef::class("A")
            .implements(left)
            .with_constructor(counting_ctor("a", vec![Parameter::new("right", right)], &calls)),
    );
    let b = class(
        &container,
        TypeDef::class("B")
            .implements(right)
            .with_constructor(counting_ctor("b", vec![Parameter::new("left", left)], &calls)),
    );
    container.register_as(left, Target::construct(a));
    container.register_as(right, Target::construct(b));

    let err = container.get(left).unwrap_err();
    assert!(
        matches!(err, ResolveError::CyclicDependency { .. }),
        "unexpected error: {err:?}"
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn greediest_bindable_constructor_is_selected() {
    let container = Container::default();
    let x = leaf(&container, "X");
    let y = leaf(&container, "Y");
    let foo = class(
        &container,
        TypeDef::class("Foo")
            .with_constructor(ctor("zero", Vec::new()))
            .with_constructor(ctor("one", vec![Parameter::new("x", x)]))
            .with_constructor(ctor(
                "two",
                vec![Parameter::new("x", x), Parameter::new("y", y)],
            )),
    );
    container.register(Target::construct(x));
    container.register(Target::construct(foo));

    let instance = container.get(foo).unwrap();
    assert_eq!(built(&instance).tag, "one");
    assert_eq!(arg_tags(&instance), vec!["X"]);
}

#[test]
fn equally_bindable_constructors_are_ambiguous() {
    let container = Container::default();
    let x = leaf(&container, "X");
    let y = leaf(&container, "Y");
    let foo = class(
        &container,
        TypeDef::class("Foo")
            .with_constructor(ctor("x", vec![Parameter::new("x", x)]))
            .with_constructor(ctor("y", vec![Parameter::new("y", y)])),
    );
    container.register(Target::construct(x));
    container.register(Target::construct(y));
    container.register(Target::construct(foo));

    assert_eq!(
        container.get(foo).unwrap_err(),
        ResolveError::AmbiguousConstructor {
            ty: "Foo".to_owned(),
            arity: 1,
            candidates: 2,
        }
    );
}

#[test]
fn unregistered_type_is_missing() {
    let container = Container::default();
    let foo = leaf(&container, "Foo");
    assert!(container.factory(foo).unwrap().is_none());
    assert_eq!(
        container.get(foo).unwrap_err(),
        ResolveError::MissingDependency {
            ty: "Foo".to_owned()
        }
    );
}

#[test]
fn latest_registration_wins_over_fallbacks() {
    let container = Container::default();
    let svc = class(&container, TypeDef::interface("Svc"));
    let first = class(
        &container,
        TypeDef::class("First").implements(svc).with_constructor(ctor("first", Vec::new())),
    );
    let second = class(
        &container,
        TypeDef::class("Second").implements(svc).with_constructor(ctor("second", Vec::new())),
    );
    let fallback = class(
        &container,
        TypeDef::class("Fallback").implements(svc).with_constructor(ctor("fallback", Vec::new())),
    );
    container.register_as(svc, Target::construct(fallback).as_fallback());
    assert_eq!(built(&container.get(svc).unwrap()).tag, "fallback");

    container.register_as(svc, Target::construct(first));
    container.register_as(svc, Target::construct(second));
    container.register_as(svc, Target::construct(fallback).as_fallback());
    assert_eq!(built(&container.get(svc).unwrap()).tag, "second");
}

#[test]
fn registered_collection_and_delegate_compose() {
    let container = Container::default();
    let svc = class(&container, TypeDef::interface("Svc"));
    let one = class(
        &container,
        TypeDef::class("One").implements(svc).with_constructor(ctor("one", Vec::new())),
    );
    let two = class(
        &container,
        TypeDef::class("Two").implements(svc).with_constructor(ctor("two", Vec::new())),
    );
    let list = container.pool().list(svc);
    container.register(Target::collection(
        container.pool(),
        CollectionFlavor::List,
        svc,
        vec![Target::construct(one).shared(), Target::construct(two).shared()],
    ));

    let report = class(&container, TypeDef::class("Report"));
    container.register(Target::delegate(Delegate::new(
        vec![Parameter::new("services", list)],
        report,
        |call| {
            let items = call.args[0].items().unwrap_or_default().to_vec();
            Ok(Instance::new(
                call.requested,
                Built {
                    tag: "report",
                    args: items,
                },
            ))
        },
    )));

    let instance = container.get(report).unwrap();
    assert_eq!(built(&instance).tag, "report");
    assert_eq!(arg_tags(&instance), vec!["one", "two"]);
}

/// A custom kind carrying a fixed value, compiled by `PresetBuilder`.
struct Preset(Instance);

impl CustomTarget for Preset {
    fn name(&self) -> &str {
        "preset"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct PresetBuilder;

impl TargetBuilder for PresetBuilder {
    fn name(&self) -> &'static str {
        "preset"
    }

    fn build(
        &self,
        target: &TargetRef,
        _ctx: &CompileContext<'_>,
        _compiler: &Compiler,
    ) -> ResolveResult<Expr> {
        let TargetKind::Custom(custom) = target.kind() else {
            unreachable!("registered for the preset kind only");
        };
        let preset = custom.as_any().downcast_ref::<Preset>().unwrap();
        Ok(Expr::Constant(preset.0.clone()))
    }
}

/// A custom kind that only declares itself a wrapper.
struct Labelled(TargetRef);

impl CustomTarget for Labelled {
    fn name(&self) -> &str {
        "labelled"
    }

    fn capabilities(&self) -> &[Capability] {
        &[Capability::Wrapper]
    }

    fn inner(&self) -> Option<&TargetRef> {
        Some(&self.0)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[test]
fn custom_kinds_compile_through_registered_builders() {
    let mut builders = BuilderRegistry::new();
    builders.register_custom::<Preset>(Arc::new(PresetBuilder));
    let container = Container::default().with_builders(builders);

    let config = class(&container, TypeDef::class("Config"));
    let value = Instance::new(config, 42u32);
    container.register(Target::custom(config, Arc::new(Preset(value.clone()))));
    assert!(container.get(config).unwrap().ptr_eq(&value));

    // Capability fallback: a wrapper compiles its inner node.
    let foo = leaf(&container, "Foo");
    container.register(Target::custom(
        foo,
        Arc::new(Labelled(Target::construct(foo).shared())),
    ));
    assert_eq!(built(&container.get(foo).unwrap()).tag, "Foo");
}

#[test]
fn custom_kind_without_builder_is_unsupported() {
    let container = Container::default();
    let config = class(&container, TypeDef::class("Config"));
    container.register(Target::custom(
        config,
        Arc::new(Preset(Instance::new(config, 0u32))),
    ));
    assert_eq!(
        container.get(config).unwrap_err(),
        ResolveError::UnsupportedTargetKind {
            kind: "preset".to_owned()
        }
    );
}

#[test]
fn tracing_init_is_idempotent() {
    wire::init_tracing();
    wire::init_tracing();
}
