//! Target registry.
//!
//! The compiler consumes registrations through `TargetSource::fetch`. The
//! `TargetTable` here is a minimal reference registry: registration order,
//! fallback demotion, open generic lookup and variance matching. There is no
//! fluent registration surface on top of it.
//!
//! # Lookup Order
//!
//! 1. Registrations for the exact type, latest first, non-fallback first.
//! 2. For a closed generic request, registrations for its open definition.
//! 3. Any closed registration of the same definition that is assignable to
//!    the request under variance, wrapped in a `VarianceMatch` node.
//!
//! Variance wrappers are memoized per `(requested type, inner node)` so the
//! same request always yields the same node identity, which keeps singleton
//! and scope caching stable.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use wire_ir::{SharedPool, TargetId, TypeId};

use crate::{Target, TargetRef};

/// Source of registered targets.
pub trait TargetSource: Send + Sync {
    /// The target registered for `ty`, if any.
    fn fetch(&self, ty: TypeId) -> Option<TargetRef>;
}

/// One registration, ordered by `seq`.
struct Registration {
    seq: u64,
    target: TargetRef,
}

#[derive(Default)]
struct TableState {
    by_type: FxHashMap<TypeId, Vec<Registration>>,
    next_seq: u64,
}

/// Reference registry of targets by type.
pub struct TargetTable {
    pool: SharedPool,
    state: RwLock<TableState>,
    variance: RwLock<FxHashMap<(TypeId, TargetId), TargetRef>>,
}

impl TargetTable {
    pub fn new(pool: SharedPool) -> Self {
        TargetTable {
            pool,
            state: RwLock::new(TableState::default()),
            variance: RwLock::new(FxHashMap::default()),
        }
    }

    /// Register `target` under its declared type.
    pub fn register(&self, target: TargetRef) {
        self.register_as(target.declared_type(), target);
    }

    /// Register `target` under `ty`.
    pub fn register_as(&self, ty: TypeId, target: TargetRef) {
        tracing::debug!(
            ty = %self.pool.display(ty),
            target = %target.id(),
            kind = target.kind_name(),
            fallback = target.use_fallback(),
            "register target"
        );
        let mut state = self.state.write();
        let seq = state.next_seq;
        state.next_seq += 1;
        state
            .by_type
            .entry(ty)
            .or_default()
            .push(Registration { seq, target });
    }

    /// Number of registrations for exactly `ty`.
    pub fn count(&self, ty: TypeId) -> usize {
        self.state.read().by_type.get(&ty).map_or(0, Vec::len)
    }

    /// Latest non-fallback registration, else latest fallback.
    fn pick(registrations: &[Registration]) -> Option<&Registration> {
        registrations
            .iter()
            .rev()
            .find(|r| !r.target.use_fallback())
            .or_else(|| registrations.last())
    }

    fn fetch_exact(state: &TableState, ty: TypeId) -> Option<TargetRef> {
        state
            .by_type
            .get(&ty)
            .and_then(|regs| Self::pick(regs))
            .map(|r| Arc::clone(&r.target))
    }

    fn fetch_variant(&self, state: &TableState, ty: TypeId) -> Option<(TypeId, TargetRef)> {
        let want = self.pool.def_of(ty)?;
        state
            .by_type
            .iter()
            .filter(|&(&registered, _)| {
                registered != ty
                    && self.pool.def_of(registered) == Some(want)
                    && !self.pool.is_open(registered)
                    && self.pool.is_assignable(registered, ty)
            })
            .filter_map(|(&registered, regs)| Self::pick(regs).map(|r| (registered, r)))
            .max_by_key(|(_, r)| r.seq)
            .map(|(registered, r)| (registered, Arc::clone(&r.target)))
    }

    fn variance_wrapper(&self, requested: TypeId, registered: TypeId, inner: TargetRef) -> TargetRef {
        let key = (requested, inner.id());
        if let Some(existing) = self.variance.read().get(&key) {
            return Arc::clone(existing);
        }
        let mut memo = self.variance.write();
        Arc::clone(memo.entry(key).or_insert_with(|| {
            tracing::debug!(
                requested = %self.pool.display(requested),
                registered = %self.pool.display(registered),
                "variance match"
            );
            Target::variance_match(inner, registered, requested).shared()
        }))
    }
}

impl TargetSource for TargetTable {
    fn fetch(&self, ty: TypeId) -> Option<TargetRef> {
        let state = self.state.read();
        if let Some(found) = Self::fetch_exact(&state, ty) {
            return Some(found);
        }
        if let Some(found) = self
            .pool
            .generic_definition(ty)
            .and_then(|open| Self::fetch_exact(&state, open))
        {
            return Some(found);
        }
        let (registered, inner) = self.fetch_variant(&state, ty)?;
        drop(state);
        Some(self.variance_wrapper(ty, registered, inner))
    }
}

/// Two sources searched in order: `top` shadows `parent`.
pub struct LayeredSource {
    top: Arc<dyn TargetSource>,
    parent: Arc<dyn TargetSource>,
}

impl LayeredSource {
    pub fn new(top: Arc<dyn TargetSource>, parent: Arc<dyn TargetSource>) -> Self {
        LayeredSource { top, parent }
    }
}

impl TargetSource for LayeredSource {
    fn fetch(&self, ty: TypeId) -> Option<TargetRef> {
        self.top.fetch(ty).or_else(|| self.parent.fetch(ty))
    }
}
