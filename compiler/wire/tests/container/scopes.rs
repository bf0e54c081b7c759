//! Lifetime scopes: explicit caching, tracking and disposal order.

use std::sync::Arc;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use wire::{Container, ResolveError, ScopePreference, Target};

use crate::common::logged;

#[test]
fn explicit_scope_shares_within_a_scope_and_disposes_once() {
    let container = Container::default();
    let log = Arc::new(Mutex::new(Vec::new()));
    let session = logged(&container, "session", &log);
    container.register(Target::scoped(Target::construct(session).shared()));

    let first = container.create_scope().unwrap();
    let second = container.create_scope().unwrap();
    let a = container.resolve_in(session, &first).unwrap();
    let b = container.resolve_in(session, &first).unwrap();
    let c = container.resolve_in(session, &second).unwrap();
    assert!(a.ptr_eq(&b));
    assert!(!a.ptr_eq(&c));

    first.dispose();
    first.dispose();
    assert_eq!(log.lock().len(), 1);
    second.dispose();
    assert_eq!(log.lock().len(), 2);
}

#[test]
fn disposal_runs_children_first_then_newest_first() {
    let container = Container::default();
    let log = Arc::new(Mutex::new(Vec::new()));
    let first = logged(&container, "first", &log);
    let second = logged(&container, "second", &log);
    let third = logged(&container, "third", &log);
    container.register(Target::construct(first));
    container.register(Target::construct(second));
    container.register(Target::construct(third));

    let outer = container.create_scope().unwrap();
    container.resolve_in(first, &outer).unwrap();
    let inner = outer.create_child().unwrap();
    container.resolve_in(second, &inner).unwrap();
    container.resolve_in(third, &outer).unwrap();

    outer.dispose();
    assert_eq!(*log.lock(), vec!["second", "third", "first"]);
    assert!(inner.is_disposed());
}

#[test]
fn root_preference_outlives_the_active_scope() {
    let container = Container::default();
    let log = Arc::new(Mutex::new(Vec::new()));
    let pool = logged(&container, "pool", &log);
    container.register(Target::construct(pool).with_scope_preference(ScopePreference::Root));

    let scope = container.create_scope().unwrap();
    container.resolve_in(pool, &scope).unwrap();
    scope.dispose();
    assert!(log.lock().is_empty());

    container.dispose();
    assert_eq!(*log.lock(), vec!["pool"]);
}

#[test]
fn unscoped_instances_are_never_disposed() {
    let container = Container::default();
    let log = Arc::new(Mutex::new(Vec::new()));
    let handle = logged(&container, "handle", &log);
    container.register(Target::unscoped(Target::construct(handle).shared()));

    let scope = container.create_scope().unwrap();
    container.resolve_in(handle, &scope).unwrap();
    assert_eq!(scope.tracked_count(), 0);
    scope.dispose();
    container.dispose();
    assert!(log.lock().is_empty());
}

#[test]
fn disposed_scope_rejects_resolution() {
    let container = Container::default();
    let log = Arc::new(Mutex::new(Vec::new()));
    let session = logged(&container, "session", &log);
    container.register(Target::construct(session));

    let scope = container.create_scope().unwrap();
    scope.dispose();
    assert_eq!(
        container.resolve_in(session, &scope).unwrap_err(),
        ResolveError::ScopeDisposed
    );
    assert_eq!(scope.create_child().unwrap_err(), ResolveError::ScopeDisposed);
}
