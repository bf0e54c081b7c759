//! Lowering: `Expr` trees into closures.
//!
//! Each IR node becomes one boxed closure over an invocation `Frame`. The
//! frame carries the resolve context and the factory's local slots, which
//! `CompiledFactory::invoke` fills once at the start of every invocation.
//! Everything captured is `Send + Sync`, so the resulting factory can be
//! invoked from any thread.

use std::sync::Arc;

use wire_ir::{
    Activation, DelegateCall, Instance, ResolveError, ResolveResult, SharedPool,
};
use wire_runtime::{LifetimeScope, ResolveContext};

use crate::Expr;

/// Evaluation state of one factory invocation.
pub struct Frame<'a> {
    pub ctx: &'a ResolveContext<'a>,
    pub locals: &'a [Option<LifetimeScope>],
}

/// A lowered expression.
pub type Thunk = Arc<dyn Fn(&Frame<'_>) -> ResolveResult<Instance> + Send + Sync>;

fn lower_all(exprs: &[Expr], pool: &SharedPool) -> ResolveResult<Vec<Thunk>> {
    exprs.iter().map(|e| lower(e, pool)).collect()
}

fn eval_all(thunks: &[Thunk], frame: &Frame<'_>) -> ResolveResult<Vec<Instance>> {
    thunks.iter().map(|t| t(frame)).collect()
}

/// Lower `expr` into a closure.
///
/// Fails only on `Deferred` placeholders the core did not expand.
pub fn lower(expr: &Expr, pool: &SharedPool) -> ResolveResult<Thunk> {
    Ok(match expr {
        Expr::Constant(value) => {
            let value = value.clone();
            Arc::new(move |_| Ok(value.clone()))
        }

        Expr::Construct {
            ty,
            type_name,
            ctor,
            args,
            members,
        } => {
            let ty = *ty;
            let type_name = Arc::clone(type_name);
            let activate = Arc::clone(&ctor.activate);
            let args = lower_all(args, pool)?;
            let members = members
                .iter()
                .map(|(member, value)| Ok((Arc::clone(&member.assign), lower(value, pool)?)))
                .collect::<ResolveResult<Vec<_>>>()?;
            Arc::new(move |frame| {
                let values = eval_all(&args, frame)?;
                let instance = activate(&Activation {
                    ty,
                    type_name: &type_name,
                    args: &values,
                })?;
                for (assign, value) in &members {
                    assign(&instance, value(frame)?)?;
                }
                Ok(instance)
            })
        }

        Expr::Invoke {
            requested,
            delegate,
            args,
        } => {
            let requested = *requested;
            let body = Arc::clone(&delegate.body);
            let args = lower_all(args, pool)?;
            Arc::new(move |frame| {
                let values = eval_all(&args, frame)?;
                body(&DelegateCall {
                    requested,
                    args: &values,
                    resolver: frame.ctx,
                })
            })
        }

        Expr::Sequence { ty, items } => {
            let ty = *ty;
            let items = lower_all(items, pool)?;
            Arc::new(move |frame| Ok(Instance::sequence(ty, eval_all(&items, frame)?)))
        }

        Expr::Convert { inner, ty } => {
            let ty = *ty;
            let inner = lower(inner, pool)?;
            let pool = pool.clone();
            Arc::new(move |frame| {
                let value = inner(frame)?;
                if pool.is_assignable(value.ty(), ty) {
                    Ok(value)
                } else {
                    Err(ResolveError::InvalidCast {
                        expected: pool.display(ty),
                        found: pool.display(value.ty()),
                    })
                }
            })
        }

        Expr::Resolve { ty, fallback } => {
            let ty = *ty;
            let fallback = fallback.as_deref().map(|f| lower(f, pool)).transpose()?;
            let pool = pool.clone();
            Arc::new(move |frame| {
                if let Some(found) = frame.ctx.container.try_resolve(ty, frame.ctx.scope)? {
                    return Ok(found);
                }
                match &fallback {
                    Some(fallback) => fallback(frame),
                    None => Err(ResolveError::MissingDependency {
                        ty: pool.display(ty),
                    }),
                }
            })
        }

        Expr::Override { ty, owner, body } => {
            let ty = *ty;
            let owner = *owner;
            let body = lower(body, pool)?;
            Arc::new(move |frame| {
                let container = frame.ctx.container;
                if container.id() != owner && container.can_resolve(ty) {
                    if let Some(found) = container.try_resolve(ty, frame.ctx.scope)? {
                        return Ok(found);
                    }
                }
                body(frame)
            })
        }

        Expr::Scoped {
            body,
            behaviour,
            scope,
            key,
        } => {
            let (behaviour, key, slot) = (*behaviour, *key, scope.index());
            let body = lower(body, pool)?;
            Arc::new(move |frame| match frame.locals.get(slot).and_then(Option::as_ref) {
                Some(scope) => scope.resolve(key, behaviour, || body(frame)),
                None => body(frame),
            })
        }

        Expr::Singleton {
            key,
            cache,
            factory,
        } => {
            let key = *key;
            let cache = Arc::clone(cache);
            let factory = factory.clone();
            Arc::new(move |frame| {
                let root = frame.ctx.root_scope();
                cache.get_object(key, &root, || {
                    let ctx = ResolveContext::new(key.ty, frame.ctx.container, Some(&root));
                    factory.invoke(&ctx)
                })
            })
        }

        Expr::Missing { ty } => {
            let ty = pool.display(*ty);
            Arc::new(move |_| Err(ResolveError::MissingDependency { ty: ty.clone() }))
        }

        Expr::Deferred { target, .. } => {
            return Err(ResolveError::UnexpandedPlaceholder {
                target: target.id(),
            })
        }
    })
}
