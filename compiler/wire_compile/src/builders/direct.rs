use wire_graph::TargetRef;
use wire_ir::ResolveResult;

use super::unexpected_kind;
use crate::{CompileContext, Compiler, Expr, TargetBuilder};

/// Catch-all for kinds declaring `Capability::DirectValue`.
pub struct DirectValueBuilder;

impl TargetBuilder for DirectValueBuilder {
    fn name(&self) -> &'static str {
        "direct value"
    }

    fn build(
        &self,
        target: &TargetRef,
        _ctx: &CompileContext<'_>,
        _compiler: &Compiler,
    ) -> ResolveResult<Expr> {
        target
            .direct_value()
            .map(Expr::Constant)
            .ok_or_else(|| unexpected_kind(target))
    }
}
