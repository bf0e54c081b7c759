//! Builder registry: node kind to compilation strategy.
//!
//! Lookup for a target, first match wins:
//!
//! 1. a builder registered for the exact kind (`KindKey`);
//! 2. a builder registered for one of the kind's capabilities, most
//!    specific capability first;
//! 3. the direct-value builder, when the kind declares
//!    `Capability::DirectValue`.
//!
//! Results are memoized per kind. The lookup is pure, so two threads racing
//! on the same kind compute the same answer and either insert is fine.
//! New kinds plug in through `register_exact`, `register_custom` and
//! `register_capability` without touching the compiler core.

use std::sync::Arc;

use dashmap::DashMap;
use rustc_hash::{FxBuildHasher, FxHashMap};
use smallvec::SmallVec;
use wire_graph::{Capability, CustomTarget, KindKey, Target, TargetRef};
use wire_ir::{ResolveError, ResolveResult};

use crate::builders::{
    CollectionBuilder, ConstructBuilder, DecoratorBuilder, DelegateBuilder, DirectValueBuilder,
    GenericConstructBuilder, PassThroughBuilder, ResolvedBuilder, ScopedBuilder,
    SingletonBuilder, TypeChangeBuilder, UnscopedBuilder,
};
use crate::{CompileContext, Compiler, Expr};

/// A compilation strategy for one kind of target.
pub trait TargetBuilder: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Emit the IR for `target` as `ctx.requested()`.
    ///
    /// Children are compiled through `compiler` with contexts derived from
    /// `ctx`.
    fn build(
        &self,
        target: &TargetRef,
        ctx: &CompileContext<'_>,
        compiler: &Compiler,
    ) -> ResolveResult<Expr>;

    /// Whether the core should wrap the result with scope handling.
    fn applies_scoping(&self) -> bool {
        true
    }
}

/// Registry of target builders. See the module docs.
pub struct BuilderRegistry {
    exact: FxHashMap<KindKey, Arc<dyn TargetBuilder>>,
    capabilities: FxHashMap<Capability, Arc<dyn TargetBuilder>>,
    direct_value: Arc<dyn TargetBuilder>,
    memo: DashMap<KindKey, Arc<dyn TargetBuilder>, FxBuildHasher>,
}

impl Default for BuilderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BuilderRegistry {
    /// A registry with builders for every built-in kind.
    pub fn new() -> Self {
        let mut registry = BuilderRegistry::empty();
        registry.register_exact(KindKey::Construct, Arc::new(ConstructBuilder));
        registry.register_exact(KindKey::GenericConstruct, Arc::new(GenericConstructBuilder));
        registry.register_exact(KindKey::Resolved, Arc::new(ResolvedBuilder));
        registry.register_exact(KindKey::Singleton, Arc::new(SingletonBuilder));
        registry.register_exact(KindKey::Scoped, Arc::new(ScopedBuilder));
        registry.register_exact(KindKey::Unscoped, Arc::new(UnscopedBuilder));
        registry.register_exact(KindKey::Decorator, Arc::new(DecoratorBuilder));
        registry.register_exact(KindKey::Collection, Arc::new(CollectionBuilder));
        registry.register_exact(KindKey::Delegate, Arc::new(DelegateBuilder));
        registry.register_exact(KindKey::ChangeType, Arc::new(TypeChangeBuilder));
        registry.register_exact(KindKey::VarianceMatch, Arc::new(TypeChangeBuilder));
        registry.register_capability(Capability::Wrapper, Arc::new(PassThroughBuilder));
        registry
    }

    /// A registry with only the direct-value catch-all.
    pub fn empty() -> Self {
        BuilderRegistry {
            exact: FxHashMap::default(),
            capabilities: FxHashMap::default(),
            direct_value: Arc::new(DirectValueBuilder),
            memo: DashMap::with_hasher(FxBuildHasher),
        }
    }

    /// Register `builder` for exactly `kind`.
    pub fn register_exact(&mut self, kind: KindKey, builder: Arc<dyn TargetBuilder>) {
        self.exact.insert(kind, builder);
        self.memo.clear();
    }

    /// Register `builder` for the custom kind implemented by `T`.
    pub fn register_custom<T: CustomTarget>(&mut self, builder: Arc<dyn TargetBuilder>) {
        self.register_exact(KindKey::custom::<T>(), builder);
    }

    /// Register `builder` for every kind declaring `capability` that has no
    /// exact builder.
    pub fn register_capability(&mut self, capability: Capability, builder: Arc<dyn TargetBuilder>) {
        self.capabilities.insert(capability, builder);
        self.memo.clear();
    }

    /// The builder for `target`.
    pub fn get(&self, target: &Target) -> ResolveResult<Arc<dyn TargetBuilder>> {
        let kind = target.kind_key();
        if let Some(found) = self.memo.get(&kind) {
            return Ok(Arc::clone(found.value()));
        }

        let builder = self.lookup(kind, target.capabilities()).ok_or_else(|| {
            ResolveError::UnsupportedTargetKind {
                kind: target.kind_name().to_owned(),
            }
        })?;
        tracing::debug!(%kind, builder = builder.name(), "builder resolved");
        self.memo.insert(kind, Arc::clone(&builder));
        Ok(builder)
    }

    fn lookup(&self, kind: KindKey, capabilities: &[Capability]) -> Option<Arc<dyn TargetBuilder>> {
        if let Some(exact) = self.exact.get(&kind) {
            return Some(Arc::clone(exact));
        }

        let mut ordered: SmallVec<[Capability; 4]> = capabilities.iter().copied().collect();
        ordered.sort_unstable();
        if let Some(by_capability) = ordered.iter().find_map(|c| self.capabilities.get(c)) {
            return Some(Arc::clone(by_capability));
        }

        ordered
            .contains(&Capability::DirectValue)
            .then(|| Arc::clone(&self.direct_value))
    }
}
