//! Lifetime scopes.
//!
//! A scope tracks the disposable instances produced while it is active and
//! disposes them when the scope itself is disposed. Scopes form a tree: the
//! container owns the root, and `create_child` opens nested scopes. A child
//! keeps its parent alive; a parent only holds weak references to its
//! children, so dropping an undisposed child simply forgets it.
//!
//! # Disposal Order
//!
//! Disposal is LIFO relative to creation: live children first, newest first,
//! then the scope's own instances, newest first. Each tracked instance is
//! disposed exactly once, and disposing a scope twice is a no-op.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use wire_ir::{Instance, InstanceKey, ResolveError, ResolveResult, ScopeBehaviour};

use crate::OnceMap;

#[derive(Default)]
struct Tracked {
    instances: Vec<Instance>,
    addresses: FxHashSet<usize>,
}

struct ScopeInner {
    parent: Option<LifetimeScope>,
    depth: usize,
    children: Mutex<Vec<Weak<ScopeInner>>>,
    tracked: Mutex<Tracked>,
    explicit: OnceMap<InstanceKey, Instance>,
    disposed: AtomicBool,
}

/// A node of the lifetime scope tree. Cheap to clone.
#[derive(Clone)]
pub struct LifetimeScope(Arc<ScopeInner>);

impl LifetimeScope {
    /// A new root scope.
    pub fn new_root() -> Self {
        LifetimeScope::with_parent(None, 0)
    }

    fn with_parent(parent: Option<LifetimeScope>, depth: usize) -> Self {
        LifetimeScope(Arc::new(ScopeInner {
            parent,
            depth,
            children: Mutex::new(Vec::new()),
            tracked: Mutex::new(Tracked::default()),
            explicit: OnceMap::new(),
            disposed: AtomicBool::new(false),
        }))
    }

    /// Open a nested scope.
    pub fn create_child(&self) -> ResolveResult<LifetimeScope> {
        self.ensure_live()?;
        let child = LifetimeScope::with_parent(Some(self.clone()), self.0.depth + 1);
        let mut children = self.0.children.lock();
        children.retain(|w| w.strong_count() > 0);
        children.push(Arc::downgrade(&child.0));
        Ok(child)
    }

    /// The root of this scope's tree.
    pub fn root(&self) -> LifetimeScope {
        let mut scope = self;
        while let Some(parent) = &scope.0.parent {
            scope = parent;
        }
        scope.clone()
    }

    pub fn parent(&self) -> Option<&LifetimeScope> {
        self.0.parent.as_ref()
    }

    /// Nesting depth; the root is 0.
    #[inline]
    pub fn depth(&self) -> usize {
        self.0.depth
    }

    #[inline]
    pub fn ptr_eq(&self, other: &LifetimeScope) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.0.disposed.load(Ordering::Acquire)
    }

    fn ensure_live(&self) -> ResolveResult<()> {
        if self.is_disposed() {
            Err(ResolveError::ScopeDisposed)
        } else {
            Ok(())
        }
    }

    /// Produce an instance under `behaviour`.
    ///
    /// - `None`: `create` runs, nothing is tracked.
    /// - `Implicit`: `create` runs on every call; the result is tracked.
    /// - `Explicit`: `create` runs once per `key` in this scope; the result is
    ///   tracked and returned to every later call.
    pub fn resolve(
        &self,
        key: InstanceKey,
        behaviour: ScopeBehaviour,
        create: impl FnOnce() -> ResolveResult<Instance>,
    ) -> ResolveResult<Instance> {
        self.ensure_live()?;
        match behaviour {
            ScopeBehaviour::None => create(),
            ScopeBehaviour::Implicit => {
                let instance = create()?;
                self.track(&instance)?;
                Ok(instance)
            }
            ScopeBehaviour::Explicit => self.0.explicit.get_or_try_insert_with(
                key,
                || {
                    let instance = create()?;
                    self.track(&instance)?;
                    Ok(instance)
                },
                || ResolveError::CyclicDependency {
                    target: key.target,
                    path: vec![key.target, key.target],
                },
            ),
        }
    }

    /// Take ownership of `instance` for disposal.
    ///
    /// Non-disposable instances are ignored; an instance already tracked by
    /// this scope is not tracked twice. A disposable instance handed to a
    /// disposed scope, including one that loses a race with `dispose`, is
    /// disposed on the spot and `ScopeDisposed` is returned.
    pub fn track(&self, instance: &Instance) -> ResolveResult<()> {
        if !instance.is_disposable() {
            return self.ensure_live();
        }
        {
            // `dispose` sets the flag before it drains this list, so a live
            // flag seen under the lock means the drain has not happened yet.
            let mut tracked = self.0.tracked.lock();
            if !self.is_disposed() {
                if tracked.addresses.insert(instance.address()) {
                    tracked.instances.push(instance.clone());
                }
                return Ok(());
            }
        }
        tracing::debug!(depth = self.0.depth, "instance created in a disposed scope");
        instance.dispose();
        Err(ResolveError::ScopeDisposed)
    }

    /// Number of instances awaiting disposal.
    pub fn tracked_count(&self) -> usize {
        self.0.tracked.lock().instances.len()
    }

    /// Dispose live children and every tracked instance.
    pub fn dispose(&self) {
        if self.0.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        let children = std::mem::take(&mut *self.0.children.lock());
        for child in children.iter().rev().filter_map(Weak::upgrade) {
            LifetimeScope(child).dispose();
        }

        let tracked = std::mem::take(&mut *self.0.tracked.lock());
        tracing::debug!(
            depth = self.0.depth,
            instances = tracked.instances.len(),
            "dispose scope"
        );
        for instance in tracked.instances.iter().rev() {
            instance.dispose();
        }
        self.0.explicit.clear();
    }
}

impl std::fmt::Debug for LifetimeScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifetimeScope")
            .field("depth", &self.0.depth)
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}
