use wire_graph::{TargetKind, TargetRef};
use wire_ir::ResolveResult;

use super::unexpected_kind;
use crate::{binder, CompileContext, Compiler, Expr, TargetBuilder};

/// Builds `Delegate` targets: a user factory invoked with bound arguments.
pub struct DelegateBuilder;

impl TargetBuilder for DelegateBuilder {
    fn name(&self) -> &'static str {
        "delegate"
    }

    fn build(
        &self,
        target: &TargetRef,
        ctx: &CompileContext<'_>,
        compiler: &Compiler,
    ) -> ResolveResult<Expr> {
        let TargetKind::Delegate(delegate) = target.kind() else {
            return Err(unexpected_kind(target));
        };
        Ok(Expr::Invoke {
            requested: ctx.requested(),
            delegate: delegate.clone(),
            args: binder::bind_parameters(compiler, ctx, &delegate.params),
        })
    }
}
