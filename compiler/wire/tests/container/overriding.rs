//! Layered containers and dynamic override of compiled factories.

use std::sync::Arc;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use wire::{
    CompileOptions, Container, OverridingContainer, Parameter, ResolveContainer, ResolveContext,
    SharedPool, Target, TypeDef, TypeId,
};

use crate::common::{arg_tags, built, class, ctor, logged};

struct Fixture {
    parent: Arc<Container>,
    dep: TypeId,
    local: TypeId,
    foo: TypeId,
}

/// `Foo(Dep)` with `Dep` served by `Base` in the parent.
fn fixture(options: CompileOptions) -> Fixture {
    let parent = Container::with_options(SharedPool::default(), options);
    let dep = class(&parent, TypeDef::interface("Dep"));
    let base = class(
        &parent,
        TypeDef::class("Base").implements(dep).with_constructor(ctor("base", Vec::new())),
    );
    let local = class(
        &parent,
        TypeDef::class("Local").implements(dep).with_constructor(ctor("local", Vec::new())),
    );
    let foo = class(
        &parent,
        TypeDef::class("Foo").with_constructor(ctor("foo", vec![Parameter::new("dep", dep)])),
    );
    parent.register_as(dep, Target::construct(base));
    parent.register(Target::construct(foo));
    Fixture {
        parent: Arc::new(parent),
        dep,
        local,
        foo,
    }
}

#[test]
fn own_registrations_shadow_the_parent() {
    let Fixture {
        parent,
        dep,
        local,
        foo,
    } = fixture(CompileOptions::default());
    let child = OverridingContainer::new(Arc::clone(&parent)).unwrap();
    child.register_as(dep, Target::construct(local));

    assert_eq!(arg_tags(&child.get(foo).unwrap()), vec!["local"]);
    assert_eq!(arg_tags(&parent.get(foo).unwrap()), vec!["base"]);
    assert!(child.can_resolve(foo));
    assert!(child.parent().can_resolve(dep));
}

#[test]
fn parent_factory_defers_to_the_invoking_container() {
    let Fixture {
        parent,
        dep,
        local,
        foo,
    } = fixture(CompileOptions::default());
    let child = OverridingContainer::new(Arc::clone(&parent)).unwrap();
    child.register_as(dep, Target::construct(local));

    let factory = parent.factory(foo).unwrap().unwrap();
    let own = parent.get(foo).unwrap();
    let overridden = factory
        .invoke(&ResolveContext::new(foo, &child, None))
        .unwrap();
    assert_eq!(arg_tags(&own), vec!["base"]);
    assert_eq!(arg_tags(&overridden), vec!["local"]);
}

#[test]
fn disabled_override_keeps_compiled_dependencies() {
    let Fixture {
        parent,
        dep,
        local,
        foo,
    } = fixture(CompileOptions::with_dynamic_override(false));
    let child = OverridingContainer::new(Arc::clone(&parent)).unwrap();
    child.register_as(dep, Target::construct(local));

    let factory = parent.factory(foo).unwrap().unwrap();
    let kept = factory
        .invoke(&ResolveContext::new(foo, &child, None))
        .unwrap();
    assert_eq!(arg_tags(&kept), vec!["base"]);
}

#[test]
fn singletons_are_shared_with_the_parent() {
    let Fixture { parent, foo, .. } = fixture(CompileOptions::default());
    let shared = class(
        &parent,
        TypeDef::class("Shared").with_constructor(ctor("shared", Vec::new())),
    );
    parent.register(Target::singleton(Target::construct(shared).shared()));
    let child = OverridingContainer::new(Arc::clone(&parent)).unwrap();

    let from_parent = parent.get(shared).unwrap();
    let from_child = child.get(shared).unwrap();
    assert!(from_parent.ptr_eq(&from_child));
    assert_eq!(parent.singleton_count(), 1);
    assert_eq!(built(&child.get(foo).unwrap()).tag, "foo");
}

#[test]
fn disposing_the_parent_disposes_the_child() {
    let Fixture { parent, .. } = fixture(CompileOptions::default());
    let log = Arc::new(Mutex::new(Vec::new()));
    let session = logged(&parent, "session", &log);
    let child = OverridingContainer::new(Arc::clone(&parent)).unwrap();
    child.register(Target::construct(session));

    let scope = child.create_scope().unwrap();
    child.resolve_in(session, &scope).unwrap();
    child.get(session).unwrap();

    parent.dispose();
    assert_eq!(log.lock().len(), 2);
    assert!(scope.is_disposed());
    assert!(child.create_scope().is_err());
}
