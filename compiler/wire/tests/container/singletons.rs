//! Singleton sharing, keyed by closed type and node.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use wire::{Container, Delegate, Parameter, ResolveError, Target, TypeDef};

use crate::common::{arg_tags, built, class, counting_ctor, ctor, leaf, logged};

#[test]
fn singleton_is_shared_between_dependents() {
    let container = Container::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let clock = class(
        &container,
        TypeDef::class("Clock").with_constructor(counting_ctor("clock", Vec::new(), &calls)),
    );
    let a = class(
        &container,
        TypeDef::class("A").with_constructor(ctor("a", vec![Parameter::new("clock", clock)])),
    );
    let b = class(
        &container,
        TypeDef::class("B").with_constructor(ctor("b", vec![Parameter::new("clock", clock)])),
    );
    container.register(Target::singleton(Target::construct(clock).shared()));
    container.register(Target::construct(a));
    container.register(Target::construct(b));

    let a = container.get(a).unwrap();
    let b = container.get(b).unwrap();
    assert!(built(&a).args[0].ptr_eq(&built(&b).args[0]));
    assert!(container.get(clock).unwrap().ptr_eq(&built(&a).args[0]));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(container.singleton_count(), 1);
}

#[test]
fn one_singleton_per_closed_generic_type() {
    let container = Container::default();
    let pool = container.pool();
    let int = leaf(&container, "int");
    let string = leaf(&container, "string");
    let repo = pool.define(
        TypeDef::class("Repo")
            .with_param("T")
            .with_constructor(ctor("repo", Vec::new())),
    );
    container.register(Target::singleton(Target::generic(pool.generic(repo)).shared()));

    let ints = pool.named(repo, &[int]);
    let strings = pool.named(repo, &[string]);
    let a = container.get(ints).unwrap();
    let b = container.get(ints).unwrap();
    let c = container.get(strings).unwrap();
    let d = container.get(strings).unwrap();
    assert!(a.ptr_eq(&b));
    assert!(c.ptr_eq(&d));
    assert!(!a.ptr_eq(&c));
    assert_eq!(container.singleton_count(), 2);
}

#[test]
fn singleton_survives_recompilation() {
    let container = Container::default();
    let foo = leaf(&container, "Foo");
    container.register(Target::singleton(Target::construct(foo).shared()));
    let first = container.get(foo).unwrap();

    let unrelated = leaf(&container, "Unrelated");
    container.register(Target::construct(unrelated));
    assert!(container.get(foo).unwrap().ptr_eq(&first));
}

#[test]
fn reentrant_singleton_is_a_cycle() {
    let container = Container::default();
    let foo = class(&container, TypeDef::class("Foo"));
    container.register(Target::singleton(
        Target::delegate(Delegate::new(Vec::new(), foo, move |call| {
            call.resolver.resolve(foo)
        }))
        .shared(),
    ));

    let err = container.get(foo).unwrap_err();
    assert!(
        matches!(err, ResolveError::CyclicDependency { .. }),
        "unexpected error: {err:?}"
    );
    assert_eq!(container.singleton_count(), 0);
}

#[test]
fn singleton_lives_in_the_root_scope() {
    let container = Container::default();
    let log = Arc::new(Mutex::new(Vec::new()));
    let cache = logged(&container, "cache", &log);
    container.register(Target::singleton(Target::construct(cache).shared()));

    let scope = container.create_scope().unwrap();
    let a = container.resolve_in(cache, &scope).unwrap();
    scope.dispose();
    assert!(log.lock().is_empty());

    let b = container.get(cache).unwrap();
    assert!(a.ptr_eq(&b));
    container.dispose();
    assert_eq!(*log.lock(), vec!["cache"]);
}

#[test]
fn singleton_decorator_wraps_the_decorated_node_once() {
    let container = Container::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let svc = class(&container, TypeDef::interface("Svc"));
    let inner = class(
        &container,
        TypeDef::class("Inner")
            .implements(svc)
            .with_constructor(ctor("inner", Vec::new())),
    );
    let wrap = class(
        &container,
        TypeDef::class("Wrap")
            .implements(svc)
            .with_constructor(counting_ctor("wrap", vec![Parameter::new("inner", svc)], &calls)),
    );
    container.register_as(
        svc,
        Target::decorator(
            Target::singleton(Target::construct(wrap).shared()).shared(),
            Target::construct(inner).shared(),
            svc,
        ),
    );

    let first = container.get(svc).unwrap();
    let second = container.get(svc).unwrap();
    assert_eq!(built(&first).tag, "wrap");
    assert_eq!(arg_tags(&first), vec!["inner"]);
    assert!(first.ptr_eq(&second));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
