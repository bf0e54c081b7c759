use wire_graph::{ConstructTarget, TargetKind, TargetRef};
use wire_ir::{ResolveResult, TypeId};

use super::unexpected_kind;
use crate::{binder, mapper, CompileContext, Compiler, Expr, TargetBuilder};

/// Builds `Construct` targets: constructor selection on the declared type.
pub struct ConstructBuilder;

/// Builds `GenericConstruct` targets: the open definition is closed for the
/// request first.
pub struct GenericConstructBuilder;

fn construct(
    compiler: &Compiler,
    ctx: &CompileContext<'_>,
    ty: TypeId,
    spec: &ConstructTarget,
) -> ResolveResult<Expr> {
    let bound = binder::bind(compiler, ctx, ty, spec)?;
    Ok(Expr::Construct {
        ty: bound.ty,
        type_name: compiler.pool().display(bound.ty).into(),
        ctor: bound.ctor,
        args: bound.args,
        members: bound.members,
    })
}

impl TargetBuilder for ConstructBuilder {
    fn name(&self) -> &'static str {
        "construct"
    }

    fn build(
        &self,
        target: &TargetRef,
        ctx: &CompileContext<'_>,
        compiler: &Compiler,
    ) -> ResolveResult<Expr> {
        let TargetKind::Construct(spec) = target.kind() else {
            return Err(unexpected_kind(target));
        };
        construct(compiler, ctx, target.declared_type(), spec)
    }
}

impl TargetBuilder for GenericConstructBuilder {
    fn name(&self) -> &'static str {
        "generic construct"
    }

    fn build(
        &self,
        target: &TargetRef,
        ctx: &CompileContext<'_>,
        compiler: &Compiler,
    ) -> ResolveResult<Expr> {
        let TargetKind::GenericConstruct(spec) = target.kind() else {
            return Err(unexpected_kind(target));
        };
        let closed = mapper::close_generic(compiler.pool(), target.declared_type(), ctx.requested())?;
        construct(compiler, ctx, closed, spec)
    }
}
