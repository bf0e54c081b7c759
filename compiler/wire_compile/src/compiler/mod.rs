//! Code generator core.
//!
//! `Compiler::compile` turns one target, requested as one type, into a
//! `CompiledFactory`. Every node of the graph goes through the same steps in
//! `compile_target`:
//!
//! 1. check that the node supports the requested type (`TypeMismatch`);
//! 2. push the `(node, type)` pair on the cyclic stack (`CyclicDependency`);
//! 3. hand the node to the builder registered for its kind, which compiles
//!    children through child contexts;
//! 4. expand `Deferred` placeholders the builder left behind;
//! 5. wrap in `Convert` when the fragment's static type is not the request;
//! 6. apply the scope injector, unless the builder opts out;
//! 7. pop the stack (the guard does this on every exit path).
//!
//! Compile errors abort the whole request. There is no partial factory and no
//! retry.

use std::sync::Arc;

use wire_graph::{TargetRef, TargetSource};
use wire_ir::{ContainerId, ResolveError, ResolveResult, SharedPool, TypeId};
use wire_runtime::SingletonCache;

use crate::context::{CompileContext, CompileState};
use crate::lower::lower;
use crate::registry::BuilderRegistry;
use crate::stack::ensure_sufficient_stack;
use crate::{scope_injector, CompileOptions, CompiledFactory, Expr};

/// Compiles targets into factories for one container.
pub struct Compiler {
    pool: SharedPool,
    targets: Arc<dyn TargetSource>,
    builders: Arc<BuilderRegistry>,
    singletons: Arc<SingletonCache<CompiledFactory>>,
    options: CompileOptions,
    owner: ContainerId,
}

impl Compiler {
    /// A compiler with the built-in builders, default options and a fresh
    /// singleton cache.
    pub fn new(pool: SharedPool, targets: Arc<dyn TargetSource>, owner: ContainerId) -> Self {
        Compiler {
            pool,
            targets,
            builders: Arc::new(BuilderRegistry::new()),
            singletons: Arc::new(SingletonCache::new()),
            options: CompileOptions::default(),
            owner,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_builders(mut self, builders: Arc<BuilderRegistry>) -> Self {
        self.builders = builders;
        self
    }

    /// Share an existing singleton cache (keys are globally unique).
    #[must_use]
    pub fn with_singletons(mut self, singletons: Arc<SingletonCache<CompiledFactory>>) -> Self {
        self.singletons = singletons;
        self
    }

    #[inline]
    pub fn pool(&self) -> &SharedPool {
        &self.pool
    }

    #[inline]
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    #[inline]
    pub fn owner(&self) -> ContainerId {
        self.owner
    }

    #[inline]
    pub fn singletons(&self) -> &Arc<SingletonCache<CompiledFactory>> {
        &self.singletons
    }

    #[inline]
    pub fn builders(&self) -> &Arc<BuilderRegistry> {
        &self.builders
    }

    /// The node that serves `ty` in `ctx`: a dependency override, else the
    /// registry's answer.
    pub fn lookup(&self, ctx: &CompileContext<'_>, ty: TypeId) -> Option<TargetRef> {
        ctx.dependency(ty).or_else(|| self.targets.fetch(ty))
    }

    /// Compile `target` as `requested` into a fresh factory.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(target = %target.id(), requested = %self.pool.display(requested))
    )]
    pub fn compile(&self, target: &TargetRef, requested: TypeId) -> ResolveResult<CompiledFactory> {
        let state = CompileState::new(self.options.max_depth);
        self.compile_with_state(target, requested, state, None)
    }

    /// Compile `target` into its own factory while an outer compilation is in
    /// progress. The cyclic stack and the dependency overrides are shared
    /// with `ctx`.
    pub fn compile_nested(
        &self,
        target: &TargetRef,
        requested: TypeId,
        ctx: &CompileContext<'_>,
    ) -> ResolveResult<CompiledFactory> {
        self.compile_with_state(target, requested, ctx.state().nested(), Some(ctx))
    }

    fn compile_with_state(
        &self,
        target: &TargetRef,
        requested: TypeId,
        state: CompileState,
        outer: Option<&CompileContext<'_>>,
    ) -> ResolveResult<CompiledFactory> {
        let expr = {
            let mut ctx = CompileContext::root(requested, &state);
            if let Some(outer) = outer {
                ctx = ctx.with_dependencies_of(outer);
            }
            self.compile_target(target, &ctx)?
        };
        tracing::trace!(?expr, "compiled");
        let thunk = lower(&expr, &self.pool)?;
        Ok(CompiledFactory::new(
            target.id(),
            requested,
            state.into_locals(),
            thunk,
        ))
    }

    /// Compile `target` as `ctx.requested()`. See the module docs.
    pub fn compile_target(&self, target: &TargetRef, ctx: &CompileContext<'_>) -> ResolveResult<Expr> {
        ensure_sufficient_stack(|| {
            let requested = ctx.requested();
            if !target.supports_type(&self.pool, requested) {
                return Err(ResolveError::TypeMismatch {
                    target: target.id(),
                    declared: self.pool.display(target.declared_type()),
                    requested: self.pool.display(requested),
                });
            }

            let _guard = ctx.push_compile_stack(target.id())?;
            let builder = self.builders.get(target)?;
            tracing::trace!(
                target = %target.id(),
                builder = builder.name(),
                requested = %self.pool.display(requested),
                "build"
            );

            let expr = builder
                .build(target, ctx, self)?
                .expand_deferred(&mut |inner, ty| self.compile_child(&inner, ty, ctx))?;

            let expr = if expr.static_type() == requested {
                expr
            } else {
                Expr::Convert {
                    inner: Box::new(expr),
                    ty: requested,
                }
            };

            Ok(if builder.applies_scoping() {
                scope_injector::inject(expr, target, ctx)
            } else {
                expr
            })
        })
    }

    /// Compile a child node as `ty` in a context derived from `ctx`.
    pub fn compile_child(
        &self,
        target: &TargetRef,
        ty: TypeId,
        ctx: &CompileContext<'_>,
    ) -> ResolveResult<Expr> {
        self.compile_target(target, &ctx.new_context(ty))
    }
}
