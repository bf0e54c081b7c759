//! Singleton cache.
//!
//! Exactly one instance per `InstanceKey` (requested type, target id), across
//! compilations and threads. Two layers share the `OnceMap` primitive:
//!
//! 1. key to factory: filled while the singleton node is compiled, so every
//!    dependent that mentions the node shares one compiled inner factory.
//!    Compiling is pure and may reach other singleton nodes, so no lock is
//!    held while it runs; racing compilations publish first-insert-wins and
//!    cycles are left to each thread's own compile stack;
//! 2. key to instance: filled on first execution, strictly once.
//!
//! Keying on the requested type gives one instance per closed generic type
//! for a single open-generic singleton node. Created instances are handed to
//! the root scope for disposal tracking; the cache itself never disposes.

use std::fmt;

use wire_ir::{Instance, InstanceKey, ResolveError, ResolveResult};

use crate::{LifetimeScope, OnceMap};

/// Two-layer exactly-once cache; `F` is the compiled factory type.
pub struct SingletonCache<F> {
    factories: OnceMap<InstanceKey, F>,
    objects: OnceMap<InstanceKey, Instance>,
}

impl<F: Clone> Default for SingletonCache<F> {
    fn default() -> Self {
        SingletonCache {
            factories: OnceMap::new(),
            objects: OnceMap::new(),
        }
    }
}

fn reentry(key: InstanceKey) -> ResolveError {
    ResolveError::CyclicDependency {
        target: key.target,
        path: vec![key.target, key.target],
    }
}

impl<F: Clone> SingletonCache<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer 1: the factory for `key`, compiled by `provider` unless one is
    /// already published.
    pub fn factory(
        &self,
        key: InstanceKey,
        provider: impl FnOnce() -> ResolveResult<F>,
    ) -> ResolveResult<F> {
        self.factories.get_or_try_publish_with(key, provider)
    }

    /// Layer 2: the instance for `key`, built by `build` on first use and
    /// tracked by `root`.
    pub fn get_object(
        &self,
        key: InstanceKey,
        root: &LifetimeScope,
        build: impl FnOnce() -> ResolveResult<Instance>,
    ) -> ResolveResult<Instance> {
        self.objects.get_or_try_insert_with(
            key,
            || {
                let instance = build()?;
                root.track(&instance)?;
                tracing::debug!(target_id = %key.target, "singleton created");
                Ok(instance)
            },
            || reentry(key),
        )
    }

    /// The instance for `key`, if already created.
    pub fn object(&self, key: &InstanceKey) -> Option<Instance> {
        self.objects.get(key)
    }

    /// Number of created instances.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl<F> fmt::Debug for SingletonCache<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingletonCache").finish_non_exhaustive()
    }
}
