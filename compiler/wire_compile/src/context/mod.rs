//! Compile context.
//!
//! A `CompileContext` is the state of one step of compiling a target graph:
//! the requested type, policy overrides for the node compiled with it, and
//! dependency overrides visible to its whole subtree. Children are derived
//! with `new_context` and never mutate their parent. A nested compilation
//! starts from a fresh root that inherits the outer context's dependency
//! overrides (`with_dependencies_of`).
//!
//! # Shared State
//!
//! `CompileState` is what every context of one compilation shares:
//!
//! - the cyclic-dependency stack, keyed by `(target, requested type)`. It is
//!   behind an `Rc` so the nested compilation of a singleton's inner factory
//!   pushes onto the same stack and cycles through singletons are still
//!   caught;
//! - the shared-fragment table: local slots of the compiled factory being
//!   built, each computed once per invocation and reused by every node that
//!   asks for the same `FragmentKey`.
//!
//! Both live in `RefCell`s, so contexts are single-threaded by construction.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};
use wire_graph::{KindKey, TargetRef};
use wire_ir::{
    ResolveError, ResolveResult, ScopeBehaviour, ScopePreference, TargetId, TypeId,
};

use crate::expr::{LocalId, LocalInit};

/// Cache key of a shared fragment.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FragmentKey {
    pub kind: &'static str,
    pub name: &'static str,
    /// The node kind that owns the fragment, when it is kind-specific.
    pub owner: Option<KindKey>,
}

/// Stack of targets being compiled.
pub struct CompileStack {
    entries: Vec<(TargetId, TypeId)>,
    members: FxHashSet<(TargetId, TypeId)>,
    max_depth: usize,
}

impl CompileStack {
    fn new(max_depth: usize) -> Self {
        CompileStack {
            entries: Vec::new(),
            members: FxHashSet::default(),
            max_depth,
        }
    }

    fn path_to(&self, target: TargetId) -> Vec<TargetId> {
        let start = self
            .entries
            .iter()
            .position(|&(id, _)| id == target)
            .unwrap_or(0);
        self.entries[start..]
            .iter()
            .map(|&(id, _)| id)
            .chain(std::iter::once(target))
            .collect()
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.entries.len()
    }
}

/// Pops its entry from the compile stack when dropped.
#[must_use = "the target is popped as soon as the guard is dropped"]
pub struct StackGuard {
    stack: Rc<RefCell<CompileStack>>,
}

impl std::fmt::Debug for StackGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackGuard").finish_non_exhaustive()
    }
}

impl Drop for StackGuard {
    fn drop(&mut self) {
        let mut stack = self.stack.borrow_mut();
        if let Some(entry) = stack.entries.pop() {
            stack.members.remove(&entry);
        }
    }
}

#[derive(Default)]
struct SharedFragments {
    slots: FxHashMap<FragmentKey, LocalId>,
    locals: Vec<LocalInit>,
}

/// State shared by all contexts of one compiled factory.
pub struct CompileState {
    stack: Rc<RefCell<CompileStack>>,
    fragments: RefCell<SharedFragments>,
}

impl CompileState {
    pub fn new(max_depth: usize) -> Self {
        CompileState {
            stack: Rc::new(RefCell::new(CompileStack::new(max_depth))),
            fragments: RefCell::new(SharedFragments::default()),
        }
    }

    /// State for a nested compiled factory: same stack, fresh fragments.
    pub fn nested(&self) -> Self {
        CompileState {
            stack: Rc::clone(&self.stack),
            fragments: RefCell::new(SharedFragments::default()),
        }
    }

    /// The local slots allocated so far, in `LocalId` order.
    pub fn into_locals(self) -> Vec<LocalInit> {
        self.fragments.into_inner().locals
    }

    pub fn depth(&self) -> usize {
        self.stack.borrow().depth()
    }
}

/// Per-step compilation state. See the module docs.
pub struct CompileContext<'a> {
    parent: Option<&'a CompileContext<'a>>,
    requested: TypeId,
    scope_behaviour: Option<ScopeBehaviour>,
    scope_preference: Option<ScopePreference>,
    /// The wrapper node that owns the explicit-scope cache key, if any.
    scope_owner: Option<TargetId>,
    dependencies: FxHashMap<TypeId, TargetRef>,
    state: &'a CompileState,
}

impl<'a> CompileContext<'a> {
    /// The context a compilation starts from.
    pub fn root(requested: TypeId, state: &'a CompileState) -> Self {
        CompileContext {
            parent: None,
            requested,
            scope_behaviour: None,
            scope_preference: None,
            scope_owner: None,
            dependencies: FxHashMap::default(),
            state,
        }
    }

    /// A child context for compiling a dependency as `requested`.
    ///
    /// Dependency overrides are visible to the child; scope overrides are
    /// not.
    pub fn new_context(&self, requested: TypeId) -> CompileContext<'_> {
        CompileContext {
            parent: Some(self),
            requested,
            scope_behaviour: None,
            scope_preference: None,
            scope_owner: None,
            dependencies: FxHashMap::default(),
            state: self.state,
        }
    }

    #[must_use]
    pub fn with_scope_behaviour(mut self, behaviour: ScopeBehaviour) -> Self {
        self.scope_behaviour = Some(behaviour);
        self
    }

    #[must_use]
    pub fn with_scope_preference(mut self, preference: ScopePreference) -> Self {
        self.scope_preference = Some(preference);
        self
    }

    /// Key explicit-scope caching of the node compiled with this context by
    /// `owner` rather than by the node itself.
    #[must_use]
    pub fn with_scope_owner(mut self, owner: TargetId) -> Self {
        self.scope_owner = Some(owner);
        self
    }

    /// Carry every dependency override visible from `outer` into this
    /// context, nearest first.
    #[must_use]
    pub fn with_dependencies_of(mut self, outer: &CompileContext<'_>) -> Self {
        let mut ctx = Some(outer);
        while let Some(current) = ctx {
            for (&ty, target) in &current.dependencies {
                self.dependencies
                    .entry(ty)
                    .or_insert_with(|| TargetRef::clone(target));
            }
            ctx = current.parent;
        }
        self
    }

    /// Redirect requests for `ty` in this subtree to `target`.
    #[must_use]
    pub fn with_dependency(mut self, ty: TypeId, target: TargetRef) -> Self {
        self.dependencies.insert(ty, target);
        self
    }

    #[inline]
    pub fn requested(&self) -> TypeId {
        self.requested
    }

    #[inline]
    pub fn scope_behaviour(&self) -> Option<ScopeBehaviour> {
        self.scope_behaviour
    }

    #[inline]
    pub fn scope_preference(&self) -> Option<ScopePreference> {
        self.scope_preference
    }

    #[inline]
    pub fn scope_owner(&self) -> Option<TargetId> {
        self.scope_owner
    }

    #[inline]
    pub fn state(&self) -> &'a CompileState {
        self.state
    }

    /// The nearest dependency override for `ty`.
    pub fn dependency(&self, ty: TypeId) -> Option<TargetRef> {
        let mut ctx = Some(self);
        while let Some(current) = ctx {
            if let Some(target) = current.dependencies.get(&ty) {
                return Some(TargetRef::clone(target));
            }
            ctx = current.parent;
        }
        None
    }

    /// Push `target` compiled as this context's requested type.
    ///
    /// Fails if the same pair is already being compiled or the stack is at
    /// its maximum depth.
    pub fn push_compile_stack(&self, target: TargetId) -> ResolveResult<StackGuard> {
        let mut stack = self.state.stack.borrow_mut();
        let entry = (target, self.requested);
        if stack.members.contains(&entry) || stack.entries.len() >= stack.max_depth {
            let path = stack.path_to(target);
            tracing::debug!(%target, depth = stack.entries.len(), "cyclic dependency");
            return Err(ResolveError::CyclicDependency { target, path });
        }
        stack.entries.push(entry);
        stack.members.insert(entry);
        Ok(StackGuard {
            stack: Rc::clone(&self.state.stack),
        })
    }

    /// The local slot for `key`, allocating it with `init` on first use.
    pub fn get_or_add_shared_fragment(
        &self,
        key: FragmentKey,
        init: impl FnOnce() -> LocalInit,
    ) -> LocalId {
        let mut fragments = self.state.fragments.borrow_mut();
        if let Some(&id) = fragments.slots.get(&key) {
            return id;
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "a factory has a handful of locals"
        )]
        let id = LocalId(fragments.locals.len() as u32);
        fragments.locals.push(init());
        fragments.slots.insert(key, id);
        id
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
