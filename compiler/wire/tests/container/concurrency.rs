//! Concurrent resolution from many threads.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier};
use std::time::Duration;

use pretty_assertions::assert_eq;
use rayon::prelude::*;
use wire::{Container, Instance, Parameter, ResolveError, Target, TypeDef};

use crate::common::{built, class, counting_ctor, ctor, leaf};

const THREADS: usize = 16;

#[test]
fn racing_threads_share_one_singleton() {
    let container = Container::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let config = class(
        &container,
        TypeDef::class("Config").with_constructor(counting_ctor("config", Vec::new(), &calls)),
    );
    container.register(Target::singleton(Target::construct(config).shared()));

    let barrier = Barrier::new(THREADS);
    let instances: Vec<Instance> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    container.get(config).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(instances.iter().all(|i| i.ptr_eq(&instances[0])));
}

#[test]
fn parallel_requests_share_one_compiled_factory() {
    let container = Container::default();
    let dep = leaf(&container, "Dep");
    let foo = class(
        &container,
        TypeDef::class("Foo").with_constructor(ctor("foo", vec![Parameter::new("dep", dep)])),
    );
    container.register(Target::construct(dep));
    container.register(Target::construct(foo));

    let factories: Vec<_> = (0..256)
        .into_par_iter()
        .map(|_| container.factory(foo).unwrap().unwrap())
        .collect();
    assert!(factories.iter().all(|f| f.ptr_eq(&factories[0])));

    let tags: Vec<_> = (0..256)
        .into_par_iter()
        .map(|_| built(&container.get(foo).unwrap()).tag)
        .collect();
    assert!(tags.iter().all(|&t| t == "foo"));
}

#[test]
fn parallel_requests_in_one_scope_share_the_scoped_instance() {
    let container = Container::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let session = class(
        &container,
        TypeDef::class("Session").with_constructor(counting_ctor("session", Vec::new(), &calls)),
    );
    container.register(Target::scoped(Target::construct(session).shared()));

    let scope = container.create_scope().unwrap();
    let instances: Vec<_> = (0..256)
        .into_par_iter()
        .map(|_| container.resolve_in(session, &scope).unwrap())
        .collect();
    assert!(instances.iter().all(|i| i.ptr_eq(&instances[0])));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// Two singletons that need each other, requested from both ends at once,
/// fail on both threads instead of waiting on each other.
#[test]
fn racing_threads_on_a_singleton_cycle_both_fail() {
    for _ in 0..64 {
        let container = Arc::new(Container::default());
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
        container.register_as(left, Target::singleton(Target::construct(a).shared()));
        container.register_as(right, Target::singleton(Target::construct(b).shared()));

        let barrier = Arc::new(Barrier::new(2));
        let (tx, rx) = mpsc::channel();
        for ty in [left, right] {
            let (container, barrier, tx) = (Arc::clone(&container), Arc::clone(&barrier), tx.clone());
            // Detached, so a hung thread fails the timeout below instead of the join.
            std::thread::spawn(move || {
                barrier.wait();
                let _ = tx.send(container.get(ty).map(|_| ()));
            });
        }

        for _ in 0..2 {
            let result = rx
                .recv_timeout(Duration::from_secs(10))
                .expect("resolution threads are blocked on each other");
            assert!(
                matches!(result, Err(ResolveError::CyclicDependency { .. })),
                "unexpected result: {result:?}"
            );
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(container.singleton_count(), 0);
    }
}
