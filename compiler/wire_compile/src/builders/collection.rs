use wire_graph::{TargetKind, TargetRef};
use wire_ir::ResolveResult;

use super::unexpected_kind;
use crate::{CompileContext, Compiler, Expr, TargetBuilder};

/// Builds `Collection` targets: every item compiled as the element type.
pub struct CollectionBuilder;

impl TargetBuilder for CollectionBuilder {
    fn name(&self) -> &'static str {
        "collection"
    }

    fn build(
        &self,
        target: &TargetRef,
        _ctx: &CompileContext<'_>,
        _compiler: &Compiler,
    ) -> ResolveResult<Expr> {
        let TargetKind::Collection { element, items, .. } = target.kind() else {
            return Err(unexpected_kind(target));
        };
        Ok(Expr::Sequence {
            ty: target.declared_type(),
            items: items
                .iter()
                .map(|item| Expr::Deferred {
                    target: TargetRef::clone(item),
                    ty: *element,
                })
                .collect(),
        })
    }
}
