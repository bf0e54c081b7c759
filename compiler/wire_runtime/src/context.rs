//! The container façade compiled factories run against.

use wire_ir::{ContainerId, Instance, ResolveResult, Resolver, TypeId};

use crate::LifetimeScope;

/// What a compiled factory needs from the container that invokes it.
pub trait ResolveContainer: Send + Sync {
    /// Identity of this container.
    fn id(&self) -> ContainerId;

    /// Resolve `ty`, failing if nothing can produce it.
    fn resolve(&self, ty: TypeId, scope: Option<&LifetimeScope>) -> ResolveResult<Instance>;

    /// Resolve `ty`, returning `None` if nothing is registered for it.
    fn try_resolve(
        &self,
        ty: TypeId,
        scope: Option<&LifetimeScope>,
    ) -> ResolveResult<Option<Instance>>;

    /// Returns `true` if something is registered that can produce `ty`.
    fn can_resolve(&self, ty: TypeId) -> bool;

    /// The container's root lifetime scope.
    fn root_scope(&self) -> LifetimeScope;
}

/// One invocation of a compiled factory.
#[derive(Clone, Copy)]
pub struct ResolveContext<'a> {
    pub requested: TypeId,
    pub container: &'a dyn ResolveContainer,
    /// The active lifetime scope, if any.
    pub scope: Option<&'a LifetimeScope>,
}

impl<'a> ResolveContext<'a> {
    pub fn new(
        requested: TypeId,
        container: &'a dyn ResolveContainer,
        scope: Option<&'a LifetimeScope>,
    ) -> Self {
        ResolveContext {
            requested,
            container,
            scope,
        }
    }

    /// The root of the active scope's tree, else the container's root scope.
    pub fn root_scope(&self) -> LifetimeScope {
        self.scope
            .map_or_else(|| self.container.root_scope(), LifetimeScope::root)
            .root()
    }
}

impl Resolver for ResolveContext<'_> {
    fn resolve(&self, ty: TypeId) -> ResolveResult<Instance> {
        self.container.resolve(ty, self.scope)
    }

    fn try_resolve(&self, ty: TypeId) -> ResolveResult<Option<Instance>> {
        self.container.try_resolve(ty, self.scope)
    }
}
