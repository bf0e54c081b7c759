//! Compiled factories.

use std::fmt;
use std::sync::Arc;

use wire_ir::{Instance, ResolveResult, TargetId, TypeId};
use wire_runtime::{LifetimeScope, ResolveContext};

use crate::expr::LocalInit;
use crate::lower::{Frame, Thunk};

struct FactoryInner {
    target: TargetId,
    requested: TypeId,
    locals: Vec<LocalInit>,
    thunk: Thunk,
}

/// The executable form of one target compiled as one type.
///
/// Cheap to clone and safe to invoke concurrently. Shared fragments are
/// computed once at the start of every invocation.
#[derive(Clone)]
pub struct CompiledFactory(Arc<FactoryInner>);

impl CompiledFactory {
    pub(crate) fn new(
        target: TargetId,
        requested: TypeId,
        locals: Vec<LocalInit>,
        thunk: Thunk,
    ) -> Self {
        CompiledFactory(Arc::new(FactoryInner {
            target,
            requested,
            locals,
            thunk,
        }))
    }

    #[inline]
    pub fn target(&self) -> TargetId {
        self.0.target
    }

    #[inline]
    pub fn requested(&self) -> TypeId {
        self.0.requested
    }

    /// Whether both handles share one compilation.
    pub fn ptr_eq(&self, other: &CompiledFactory) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Produce an instance for `ctx`.
    pub fn invoke(&self, ctx: &ResolveContext<'_>) -> ResolveResult<Instance> {
        let locals: Vec<Option<LifetimeScope>> = self
            .0
            .locals
            .iter()
            .map(|init| match init {
                LocalInit::ActiveScope => ctx.scope.cloned(),
                LocalInit::RootScope => ctx.scope.map(LifetimeScope::root),
            })
            .collect();
        (self.0.thunk)(&Frame {
            ctx,
            locals: &locals,
        })
    }
}

impl fmt::Debug for CompiledFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledFactory")
            .field("target", &self.0.target)
            .field("requested", &self.0.requested)
            .field("locals", &self.0.locals.len())
            .finish_non_exhaustive()
    }
}
