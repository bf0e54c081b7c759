use wire_graph::{TargetKind, TargetRef};
use wire_ir::ResolveResult;

use super::unexpected_kind;
use crate::{CompileContext, Compiler, Expr, TargetBuilder};

/// Builds `Decorator` targets.
///
/// The decorator node is compiled with requests for the decorated type
/// redirected, for its whole subtree, to the decorated node.
pub struct DecoratorBuilder;

impl TargetBuilder for DecoratorBuilder {
    fn name(&self) -> &'static str {
        "decorator"
    }

    fn build(
        &self,
        target: &TargetRef,
        ctx: &CompileContext<'_>,
        compiler: &Compiler,
    ) -> ResolveResult<Expr> {
        let TargetKind::Decorator {
            decorator,
            decorated,
            decorated_type,
        } = target.kind()
        else {
            return Err(unexpected_kind(target));
        };
        tracing::debug!(
            decorator = %decorator.id(),
            decorated = %decorated.id(),
            "decorating"
        );
        let child = ctx
            .new_context(ctx.requested())
            .with_dependency(*decorated_type, TargetRef::clone(decorated));
        compiler.compile_target(decorator, &child)
    }
}
