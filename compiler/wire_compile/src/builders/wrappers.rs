use std::sync::Arc;

use wire_graph::{TargetKind, TargetRef};
use wire_ir::{InstanceKey, ResolveResult, ScopeBehaviour};

use super::unexpected_kind;
use crate::{CompileContext, Compiler, Expr, TargetBuilder};

/// Builds `Singleton` targets.
///
/// The inner node is compiled once per `(requested type, node)` into its own
/// factory, kept in the container's singleton cache, and executed at most
/// once. Singletons are never routed through a lifetime scope.
pub struct SingletonBuilder;

impl TargetBuilder for SingletonBuilder {
    fn name(&self) -> &'static str {
        "singleton"
    }

    fn build(
        &self,
        target: &TargetRef,
        ctx: &CompileContext<'_>,
        compiler: &Compiler,
    ) -> ResolveResult<Expr> {
        let TargetKind::Singleton(inner) = target.kind() else {
            return Err(unexpected_kind(target));
        };
        let requested = ctx.requested();
        let key = InstanceKey::new(requested, target.id());
        let factory = compiler
            .singletons()
            .factory(key, || compiler.compile_nested(inner, requested, ctx))?;
        Ok(Expr::Singleton {
            key,
            cache: Arc::clone(compiler.singletons()),
            factory,
        })
    }

    fn applies_scoping(&self) -> bool {
        false
    }
}

/// Builds `Scoped` targets: the inner node, cached once per lifetime scope.
pub struct ScopedBuilder;

impl TargetBuilder for ScopedBuilder {
    fn name(&self) -> &'static str {
        "scoped"
    }

    fn build(
        &self,
        target: &TargetRef,
        ctx: &CompileContext<'_>,
        compiler: &Compiler,
    ) -> ResolveResult<Expr> {
        let TargetKind::Scoped(inner) = target.kind() else {
            return Err(unexpected_kind(target));
        };
        let child = ctx
            .new_context(ctx.requested())
            .with_scope_behaviour(ScopeBehaviour::Explicit)
            .with_scope_owner(target.id());
        compiler.compile_target(inner, &child)
    }

    fn applies_scoping(&self) -> bool {
        false
    }
}

/// Builds `Unscoped` targets: the inner node, never routed through a scope.
pub struct UnscopedBuilder;

impl TargetBuilder for UnscopedBuilder {
    fn name(&self) -> &'static str {
        "unscoped"
    }

    fn build(
        &self,
        target: &TargetRef,
        ctx: &CompileContext<'_>,
        compiler: &Compiler,
    ) -> ResolveResult<Expr> {
        let TargetKind::Unscoped(inner) = target.kind() else {
            return Err(unexpected_kind(target));
        };
        let child = ctx
            .new_context(ctx.requested())
            .with_scope_behaviour(ScopeBehaviour::None);
        compiler.compile_target(inner, &child)
    }

    fn applies_scoping(&self) -> bool {
        false
    }
}

/// Builds `ChangeType` and `VarianceMatch` targets.
///
/// The inner node is compiled as the type it can actually produce; the core
/// then converts the result to the request.
pub struct TypeChangeBuilder;

impl TargetBuilder for TypeChangeBuilder {
    fn name(&self) -> &'static str {
        "type change"
    }

    fn build(
        &self,
        target: &TargetRef,
        ctx: &CompileContext<'_>,
        compiler: &Compiler,
    ) -> ResolveResult<Expr> {
        let (inner, ty) = match target.kind() {
            TargetKind::ChangeType(inner) => {
                let requested = ctx.requested();
                let ty = if inner.supports_type(compiler.pool(), requested) {
                    requested
                } else {
                    inner.declared_type()
                };
                (inner, ty)
            }
            TargetKind::VarianceMatch { inner, registered } => (inner, *registered),
            _ => return Err(unexpected_kind(target)),
        };
        Ok(Expr::Deferred {
            target: TargetRef::clone(inner),
            ty,
        })
    }
}

/// Fallback for kinds declaring `Capability::Wrapper`: compiles the wrapped
/// node as the request.
pub struct PassThroughBuilder;

impl TargetBuilder for PassThroughBuilder {
    fn name(&self) -> &'static str {
        "pass-through"
    }

    fn build(
        &self,
        target: &TargetRef,
        ctx: &CompileContext<'_>,
        compiler: &Compiler,
    ) -> ResolveResult<Expr> {
        let inner = target.inner().ok_or_else(|| unexpected_kind(target))?;
        compiler.compile_child(inner, ctx.requested(), ctx)
    }
}
