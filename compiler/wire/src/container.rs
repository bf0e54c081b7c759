//! Reference containers.
//!
//! `Container` owns a target table, the compiler for it, a root lifetime
//! scope and one compiled factory per requested type. `OverridingContainer`
//! layers its own table over a parent's and shares the parent's singleton
//! cache.
//!
//! Both hand themselves to the factories they invoke, so a factory compiled
//! by one container and invoked through another defers registered
//! dependencies to the invoking one.

use std::sync::Arc;

use wire_compile::{BuilderRegistry, CompileOptions, CompiledFactory, Compiler};
use wire_graph::{LayeredSource, Target, TargetRef, TargetSource, TargetTable};
use wire_ir::{
    ContainerId, Instance, ResolveError, ResolveResult, SharedPool, TargetId, TypeId,
};
use wire_runtime::{LifetimeScope, OnceMap, ResolveContainer, ResolveContext};

/// What both container flavours are built from.
struct Core {
    pool: SharedPool,
    table: Arc<TargetTable>,
    source: Arc<dyn TargetSource>,
    compiler: Compiler,
    root: LifetimeScope,
    factories: OnceMap<TypeId, CompiledFactory>,
}

impl Core {
    fn register(&self, ty: TypeId, target: Target) -> TargetRef {
        let target = target.shared();
        self.table.register_as(ty, TargetRef::clone(&target));
        // Factories compiled against the old registrations are stale.
        self.factories.clear();
        target
    }

    fn factory(&self, ty: TypeId) -> ResolveResult<Option<CompiledFactory>> {
        let Some(target) = self.source.fetch(ty) else {
            return Ok(None);
        };
        let id = target.id();
        self.factories
            .get_or_try_insert_with(ty, || self.compiler.compile(&target, ty), || reentry(id))
            .map(Some)
    }

    fn try_resolve(
        &self,
        container: &dyn ResolveContainer,
        ty: TypeId,
        scope: Option<&LifetimeScope>,
    ) -> ResolveResult<Option<Instance>> {
        let Some(factory) = self.factory(ty)? else {
            return Ok(None);
        };
        let scope = scope.unwrap_or(&self.root);
        factory
            .invoke(&ResolveContext::new(ty, container, Some(scope)))
            .map(Some)
    }

    fn resolve(
        &self,
        container: &dyn ResolveContainer,
        ty: TypeId,
        scope: Option<&LifetimeScope>,
    ) -> ResolveResult<Instance> {
        self.try_resolve(container, ty, scope)?
            .ok_or_else(|| ResolveError::MissingDependency {
                ty: self.pool.display(ty),
            })
    }
}

#[cold]
fn reentry(target: TargetId) -> ResolveError {
    ResolveError::CyclicDependency {
        target,
        path: vec![target, target],
    }
}

/// A container with its own registrations. See the module docs.
pub struct Container {
    core: Core,
}

impl Default for Container {
    fn default() -> Self {
        Container::new(SharedPool::default())
    }
}

impl Container {
    /// A container over `pool` with default options.
    pub fn new(pool: SharedPool) -> Self {
        Container::with_options(pool, CompileOptions::default())
    }

    pub fn with_options(pool: SharedPool, options: CompileOptions) -> Self {
        let table = Arc::new(TargetTable::new(pool.clone()));
        let source: Arc<dyn TargetSource> = Arc::clone(&table) as Arc<dyn TargetSource>;
        let compiler = Compiler::new(pool.clone(), Arc::clone(&source), ContainerId::next())
            .with_options(options);
        tracing::debug!(container = ?compiler.owner(), "container created");
        Container {
            core: Core {
                pool,
                table,
                source,
                compiler,
                root: LifetimeScope::new_root(),
                factories: OnceMap::new(),
            },
        }
    }

    /// Replace the builder registry, e.g. to add builders for custom kinds.
    #[must_use]
    pub fn with_builders(mut self, builders: BuilderRegistry) -> Self {
        self.core.compiler = self.core.compiler.with_builders(Arc::new(builders));
        self.core.factories.clear();
        self
    }

    #[inline]
    pub fn pool(&self) -> &SharedPool {
        &self.core.pool
    }

    #[inline]
    pub fn options(&self) -> &CompileOptions {
        self.core.compiler.options()
    }

    /// Register `target` for its declared type.
    pub fn register(&self, target: Target) -> TargetRef {
        let ty = target.declared_type();
        self.core.register(ty, target)
    }

    /// Register `target` for `ty`, which it must be able to produce.
    pub fn register_as(&self, ty: TypeId, target: Target) -> TargetRef {
        self.core.register(ty, target)
    }

    /// The compiled factory for `ty`, compiling it on first use.
    pub fn factory(&self, ty: TypeId) -> ResolveResult<Option<CompiledFactory>> {
        self.core.factory(ty)
    }

    /// Resolve `ty` with the root scope active.
    pub fn get(&self, ty: TypeId) -> ResolveResult<Instance> {
        self.core.resolve(self, ty, None)
    }

    /// Resolve `ty` with `scope` active.
    pub fn resolve_in(&self, ty: TypeId, scope: &LifetimeScope) -> ResolveResult<Instance> {
        self.core.resolve(self, ty, Some(scope))
    }

    /// Open a lifetime scope under the root.
    pub fn create_scope(&self) -> ResolveResult<LifetimeScope> {
        self.core.root.create_child()
    }

    /// Dispose the root scope and everything tracked under it.
    pub fn dispose(&self) {
        self.core.root.dispose();
    }

    /// Number of singleton instances created so far.
    pub fn singleton_count(&self) -> usize {
        self.core.compiler.singletons().len()
    }
}

impl ResolveContainer for Container {
    fn id(&self) -> ContainerId {
        self.core.compiler.owner()
    }

    fn resolve(&self, ty: TypeId, scope: Option<&LifetimeScope>) -> ResolveResult<Instance> {
        self.core.resolve(self, ty, scope)
    }

    fn try_resolve(
        &self,
        ty: TypeId,
        scope: Option<&LifetimeScope>,
    ) -> ResolveResult<Option<Instance>> {
        self.core.try_resolve(self, ty, scope)
    }

    fn can_resolve(&self, ty: TypeId) -> bool {
        self.core.source.fetch(ty).is_some()
    }

    fn root_scope(&self) -> LifetimeScope {
        self.core.root.clone()
    }
}

/// A container layered over a parent. See the module docs.
///
/// Its own registrations shadow the parent's; everything else is served
/// from the parent's registrations, compiled by this container. Its root
/// scope is a child of the parent's root, so disposing the parent disposes
/// it too.
pub struct OverridingContainer {
    parent: Arc<Container>,
    core: Core,
}

impl OverridingContainer {
    pub fn new(parent: Arc<Container>) -> ResolveResult<Self> {
        let pool = parent.core.pool.clone();
        let table = Arc::new(TargetTable::new(pool.clone()));
        let source: Arc<dyn TargetSource> = Arc::new(LayeredSource::new(
            Arc::clone(&table) as Arc<dyn TargetSource>,
            Arc::clone(&parent.core.source),
        ));
        let base = &parent.core.compiler;
        let compiler = Compiler::new(pool.clone(), Arc::clone(&source), ContainerId::next())
            .with_options(*base.options())
            .with_builders(Arc::clone(base.builders()))
            .with_singletons(Arc::clone(base.singletons()));
        let root = parent.core.root.create_child()?;
        tracing::debug!(
            container = ?compiler.owner(),
            parent = ?base.owner(),
            "overriding container created"
        );
        Ok(OverridingContainer {
            core: Core {
                pool,
                table,
                source,
                compiler,
                root,
                factories: OnceMap::new(),
            },
            parent,
        })
    }

    pub fn parent(&self) -> &Arc<Container> {
        &self.parent
    }

    /// Register `target` for its declared type in this layer only.
    pub fn register(&self, target: Target) -> TargetRef {
        let ty = target.declared_type();
        self.core.register(ty, target)
    }

    pub fn register_as(&self, ty: TypeId, target: Target) -> TargetRef {
        self.core.register(ty, target)
    }

    pub fn get(&self, ty: TypeId) -> ResolveResult<Instance> {
        self.core.resolve(self, ty, None)
    }

    pub fn resolve_in(&self, ty: TypeId, scope: &LifetimeScope) -> ResolveResult<Instance> {
        self.core.resolve(self, ty, Some(scope))
    }

    pub fn create_scope(&self) -> ResolveResult<LifetimeScope> {
        self.core.root.create_child()
    }

    pub fn dispose(&self) {
        self.core.root.dispose();
    }
}

impl ResolveContainer for OverridingContainer {
    fn id(&self) -> ContainerId {
        self.core.compiler.owner()
    }

    fn resolve(&self, ty: TypeId, scope: Option<&LifetimeScope>) -> ResolveResult<Instance> {
        self.core.resolve(self, ty, scope)
    }

    fn try_resolve(
        &self,
        ty: TypeId,
        scope: Option<&LifetimeScope>,
    ) -> ResolveResult<Option<Instance>> {
        self.core.try_resolve(self, ty, scope)
    }

    fn can_resolve(&self, ty: TypeId) -> bool {
        self.core.source.fetch(ty).is_some()
    }

    fn root_scope(&self) -> LifetimeScope {
        self.core.root.clone()
    }
}
