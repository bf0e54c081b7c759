//! Constructor binder.
//!
//! Picks the constructor a construction target is built with and binds every
//! parameter to a node. Each parameter tries, in order:
//!
//! 1. a named argument node that supports the parameter type;
//! 2. a registered dependency, bound through a `Resolved` node so late
//!    overrides still apply (a fallback binding if the registered node is
//!    itself a fallback);
//! 3. the parameter's default value (a fallback binding);
//!
//! and is otherwise unbound.
//!
//! # Selection
//!
//! Candidates are grouped by arity, highest first. The first group with a
//! fully bound candidate wins; inside it the candidate with the fewest
//! fallback bindings. A tie is an `AmbiguousConstructor` error. When no
//! candidate binds fully, the single highest-arity constructor is used and its
//! unbound parameters resolve dynamically, failing only when executed.

use rustc_hash::FxHashSet;
use wire_graph::{ConstructTarget, MemberBinding, Target, TargetRef};
use wire_ir::{Constructor, Member, Parameter, ResolveError, ResolveResult, TypeId};

use crate::{CompileContext, Compiler, Expr};

/// A constructor with every argument and member bound to IR.
#[derive(Debug)]
pub struct BoundConstructor {
    pub ty: TypeId,
    pub ctor: Constructor,
    /// One expression per parameter, in parameter order.
    pub args: Vec<Expr>,
    pub members: Vec<(Member, Expr)>,
    pub fallback_count: usize,
}

/// How one parameter got bound.
enum Binding {
    Bound { expr: Expr, fallback: bool },
    Unbound,
}

struct Candidate {
    ctor: Constructor,
    bindings: Vec<Binding>,
}

impl Candidate {
    fn is_complete(&self) -> bool {
        self.bindings
            .iter()
            .all(|b| matches!(b, Binding::Bound { .. }))
    }

    fn fallback_count(&self) -> usize {
        self.bindings
            .iter()
            .filter(|b| matches!(b, Binding::Bound { fallback: true, .. }))
            .count()
    }

    /// Bind the remaining parameters to dynamic lookups.
    fn finish(self, ty: TypeId) -> (Constructor, Vec<Expr>, usize) {
        let fallback_count = self.fallback_count();
        let args = self
            .bindings
            .into_iter()
            .zip(&self.ctor.params)
            .map(|(binding, param)| match binding {
                Binding::Bound { expr, .. } => expr,
                Binding::Unbound => resolved(param.ty, None),
            })
            .collect();
        tracing::trace!(ty = ?ty, arity = self.ctor.arity(), fallback_count, "constructor bound");
        (self.ctor, args, fallback_count)
    }
}

fn resolved(ty: TypeId, fallback: Option<TargetRef>) -> Expr {
    Expr::Deferred {
        target: Target::resolved(ty, fallback).shared(),
        ty,
    }
}

/// Bind a constructor and members for the closed type `ty`.
pub fn bind(
    compiler: &Compiler,
    ctx: &CompileContext<'_>,
    ty: TypeId,
    spec: &ConstructTarget,
) -> ResolveResult<BoundConstructor> {
    let pool = compiler.pool();
    let no_ctor = || ResolveError::NoApplicableConstructor {
        ty: pool.display(ty),
    };
    if pool.is_abstract(ty) {
        return Err(no_ctor());
    }

    let candidate = match &spec.ctor {
        Some(explicit) => {
            let args = pool.args(ty);
            let ctor = explicit.close(|p| pool.substitute(p, &args));
            bind_candidate(compiler, ctx, spec, ctor)
        }
        None => {
            let ctors = pool.constructors(ty);
            if ctors.is_empty() {
                return Err(no_ctor());
            }
            select(compiler, ctx, spec, ty, ctors)?
        }
    };

    let (ctor, args, fallback_count) = candidate.finish(ty);
    let members = bind_members(compiler, ctx, spec, ty)?;
    Ok(BoundConstructor {
        ty,
        ctor,
        args,
        members,
        fallback_count,
    })
}

/// Bind a delegate's parameters. Unbound parameters resolve dynamically.
pub fn bind_parameters(
    compiler: &Compiler,
    ctx: &CompileContext<'_>,
    params: &[Parameter],
) -> Vec<Expr> {
    let spec = ConstructTarget::default();
    params
        .iter()
        .map(|param| match bind_parameter(compiler, ctx, &spec, param) {
            Binding::Bound { expr, .. } => expr,
            Binding::Unbound => resolved(param.ty, None),
        })
        .collect()
}

fn select(
    compiler: &Compiler,
    ctx: &CompileContext<'_>,
    spec: &ConstructTarget,
    ty: TypeId,
    mut ctors: Vec<Constructor>,
) -> ResolveResult<Candidate> {
    let pool = compiler.pool();
    ctors.sort_by_key(|c| std::cmp::Reverse(c.arity()));

    let mut groups: Vec<Vec<Candidate>> = Vec::new();
    for ctor in ctors {
        let candidate = bind_candidate(compiler, ctx, spec, ctor);
        match groups.last_mut() {
            Some(group) if group[0].ctor.arity() == candidate.ctor.arity() => group.push(candidate),
            _ => groups.push(vec![candidate]),
        }
    }

    let ambiguous = |arity: usize, candidates: usize| ResolveError::AmbiguousConstructor {
        ty: pool.display(ty),
        arity,
        candidates,
    };

    if let Some(index) = groups
        .iter()
        .position(|group| group.iter().any(Candidate::is_complete))
    {
        let group = groups.swap_remove(index);
        let arity = group[0].ctor.arity();
        let mut complete: Vec<Candidate> = group.into_iter().filter(Candidate::is_complete).collect();
        let fewest = complete
            .iter()
            .map(Candidate::fallback_count)
            .min()
            .unwrap_or_default();
        complete.retain(|c| c.fallback_count() == fewest);
        tracing::debug!(
            ty = %pool.display(ty),
            arity,
            fallbacks = fewest,
            candidates = complete.len(),
            "constructor group selected"
        );
        return match complete.len() {
            1 => Ok(complete.swap_remove(0)),
            n => Err(ambiguous(arity, n)),
        };
    }

    // Nothing binds fully; the greediest constructor fails at run time.
    let mut greediest = groups.swap_remove(0);
    let arity = greediest[0].ctor.arity();
    tracing::debug!(ty = %pool.display(ty), arity, "no fully bound constructor");
    match greediest.len() {
        1 => Ok(greediest.swap_remove(0)),
        n => Err(ambiguous(arity, n)),
    }
}

fn bind_candidate(
    compiler: &Compiler,
    ctx: &CompileContext<'_>,
    spec: &ConstructTarget,
    ctor: Constructor,
) -> Candidate {
    let bindings = ctor
        .params
        .iter()
        .map(|param| bind_parameter(compiler, ctx, spec, param))
        .collect();
    Candidate { ctor, bindings }
}

fn bind_parameter(
    compiler: &Compiler,
    ctx: &CompileContext<'_>,
    spec: &ConstructTarget,
    param: &Parameter,
) -> Binding {
    if let Some(named) = spec.named_arg(&param.name) {
        if named.supports_type(compiler.pool(), param.ty) {
            return Binding::Bound {
                expr: Expr::Deferred {
                    target: TargetRef::clone(named),
                    ty: param.ty,
                },
                fallback: false,
            };
        }
    }

    let default = param
        .default
        .as_ref()
        .map(|value| Target::object(value.clone()).shared());

    if let Some(registered) = compiler.lookup(ctx, param.ty) {
        return Binding::Bound {
            expr: resolved(param.ty, default),
            fallback: registered.use_fallback(),
        };
    }

    match default {
        Some(default) => Binding::Bound {
            expr: resolved(param.ty, Some(default)),
            fallback: true,
        },
        None => Binding::Unbound,
    }
}

fn bind_members(
    compiler: &Compiler,
    ctx: &CompileContext<'_>,
    spec: &ConstructTarget,
    ty: TypeId,
) -> ResolveResult<Vec<(Member, Expr)>> {
    let pool = compiler.pool();
    let binding = spec
        .members
        .clone()
        .unwrap_or_else(|| compiler.options().member_binding.to_binding());

    let members = pool.members(ty);
    let chosen: Vec<Member> = match binding {
        MemberBinding::None => return Ok(Vec::new()),
        MemberBinding::All => members
            .into_iter()
            .filter(|m| compiler.lookup(ctx, m.ty).is_some())
            .collect(),
        MemberBinding::Explicit(names) => {
            let wanted: FxHashSet<&str> = names.iter().map(String::as_str).collect();
            if let Some(unknown) = names
                .iter()
                .find(|name| !members.iter().any(|m| &m.name == *name))
            {
                return Err(ResolveError::BindingError {
                    requested: pool.display(ctx.requested()),
                    target_type: pool.display(ty),
                    reason: format!("no member named `{unknown}`"),
                });
            }
            members
                .into_iter()
                .filter(|m| wanted.contains(m.name.as_str()))
                .collect()
        }
    };

    Ok(chosen
        .into_iter()
        .map(|m| {
            let value = resolved(m.ty, None);
            (m, value)
        })
        .collect())
}
