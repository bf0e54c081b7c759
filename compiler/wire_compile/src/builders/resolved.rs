use wire_graph::{TargetKind, TargetRef};
use wire_ir::ResolveResult;

use super::unexpected_kind;
use crate::{CompileContext, Compiler, Expr, TargetBuilder};

/// Builds `Resolved` targets: whatever serves the declared type.
///
/// In order: a dependency override of the context; the registered node,
/// which another invoking container may override at run time; a run-time
/// lookup ending in the node's fallback; a run-time lookup alone. With
/// dynamic overrides switched off the run-time lookups are dropped and a
/// missing dependency compiles to `Expr::Missing`.
pub struct ResolvedBuilder;

impl TargetBuilder for ResolvedBuilder {
    fn name(&self) -> &'static str {
        "resolved"
    }

    fn build(
        &self,
        target: &TargetRef,
        ctx: &CompileContext<'_>,
        compiler: &Compiler,
    ) -> ResolveResult<Expr> {
        let TargetKind::Resolved { fallback } = target.kind() else {
            return Err(unexpected_kind(target));
        };
        let ty = target.declared_type();
        let dynamic = compiler.options().dynamic_override;

        if let Some(overridden) = ctx.dependency(ty) {
            return Ok(Expr::Deferred {
                target: overridden,
                ty,
            });
        }

        if let Some(registered) = compiler.lookup(ctx, ty) {
            let body = Expr::Deferred {
                target: registered,
                ty,
            };
            return Ok(if dynamic {
                Expr::Override {
                    ty,
                    owner: compiler.owner(),
                    body: Box::new(body),
                }
            } else {
                body
            });
        }

        let fallback = fallback.as_ref().map(|f| {
            Box::new(Expr::Deferred {
                target: TargetRef::clone(f),
                ty,
            })
        });
        Ok(match (dynamic, fallback) {
            (true, fallback) => Expr::Resolve { ty, fallback },
            (false, Some(fallback)) => *fallback,
            (false, None) => Expr::Missing { ty },
        })
    }
}
