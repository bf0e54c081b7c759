//! Generic type mapper.
//!
//! Closes an open generic definition for a closed request. When the request
//! names the definition itself, its arguments are substituted directly.
//! Otherwise the request names a supertype, e.g. `Base<string, int>` for
//! `Derived<T, U> : Base<U, T>`. Every supertype of the definition with the
//! request's definition is then tried: each of the definition's parameters
//! is located inside the supertype's arguments by a depth-first search, the
//! same position is read from the request, and the closed candidate is kept
//! only if it really is assignable to the request.

use smallvec::SmallVec;
use wire_ir::{ResolveError, ResolveResult, TypeData, TypeId, TypePool};

/// One step from a type to one of its components.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Step {
    /// The i-th generic argument.
    Arg(usize),
    /// The element type of an array.
    Element,
}

type Path = SmallVec<[Step; 4]>;

fn binding_error(pool: &TypePool, open: TypeId, requested: TypeId, reason: String) -> ResolveError {
    ResolveError::BindingError {
        requested: pool.display(requested),
        target_type: pool.display(open),
        reason,
    }
}

/// Close the open generic definition `open` so that it serves `requested`.
pub fn close_generic(pool: &TypePool, open: TypeId, requested: TypeId) -> ResolveResult<TypeId> {
    if pool.is_open(requested) {
        return Err(binding_error(
            pool,
            open,
            requested,
            "the requested type is not closed".to_owned(),
        ));
    }
    let (Some(open_def), Some(want)) = (pool.def_of(open), pool.def_of(requested)) else {
        return Err(binding_error(
            pool,
            open,
            requested,
            "not a generic type".to_owned(),
        ));
    };

    if open_def == want {
        return Ok(pool.substitute(open, &pool.args(requested)));
    }

    let arity = pool.def(open_def).arity();
    let mut closings: SmallVec<[TypeId; 2]> = SmallVec::new();
    let mut last_reason = format!("`{}` does not derive from it", pool.display(requested));

    for sup in pool
        .supertypes(open)
        .into_iter()
        .filter(|&sup| pool.def_of(sup) == Some(want))
    {
        match close_through(pool, open, sup, requested, arity) {
            Ok(closed) => {
                if !closings.contains(&closed) {
                    closings.push(closed);
                }
            }
            Err(reason) => last_reason = reason,
        }
    }

    match closings.as_slice() {
        [] => Err(binding_error(pool, open, requested, last_reason)),
        [closed] => {
            tracing::trace!(
                open = %pool.display(open),
                closed = %pool.display(*closed),
                "generic definition closed"
            );
            Ok(*closed)
        }
        many => Err(ResolveError::AmbiguousBestMatch {
            requested: pool.display(requested),
            candidates: many.iter().map(|&t| pool.display(t)).collect(),
        }),
    }
}

/// Close `open` by matching its supertype `sup` against `requested`.
fn close_through(
    pool: &TypePool,
    open: TypeId,
    sup: TypeId,
    requested: TypeId,
    arity: usize,
) -> Result<TypeId, String> {
    let mut args = Vec::with_capacity(arity);
    for index in 0..arity {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "generic arity is far below u32::MAX"
        )]
        let param = pool.param(index as u32);
        let mut path = Path::new();
        if !find_param(pool, sup, param, &mut path) {
            return Err(format!(
                "parameter {index} does not appear in `{}`",
                pool.display(sup)
            ));
        }
        let arg = follow(pool, requested, &path).ok_or_else(|| {
            format!(
                "`{}` does not have the shape of `{}`",
                pool.display(requested),
                pool.display(sup)
            )
        })?;
        args.push(arg);
    }

    let closed = pool.substitute(open, &args);
    if pool.is_assignable(closed, requested) {
        Ok(closed)
    } else {
        Err(format!(
            "`{}` is not assignable to `{}`",
            pool.display(closed),
            pool.display(requested)
        ))
    }
}

/// Depth-first search for `param` inside `ty`, recording the path in `path`.
fn find_param(pool: &TypePool, ty: TypeId, param: TypeId, path: &mut Path) -> bool {
    if ty == param {
        return true;
    }
    match pool.data(ty) {
        TypeData::Named { args, .. } => {
            for (i, &arg) in args.iter().enumerate() {
                path.push(Step::Arg(i));
                if find_param(pool, arg, param, path) {
                    return true;
                }
                path.pop();
            }
            false
        }
        TypeData::Array(elem) => {
            path.push(Step::Element);
            if find_param(pool, elem, param, path) {
                return true;
            }
            path.pop();
            false
        }
        TypeData::Object | TypeData::Param(_) => false,
    }
}

/// The component of `ty` at `path`, if `ty` has that shape.
fn follow(pool: &TypePool, ty: TypeId, path: &[Step]) -> Option<TypeId> {
    path.iter().try_fold(ty, |current, step| match (step, pool.data(current)) {
        (Step::Arg(i), TypeData::Named { args, .. }) => args.get(*i).copied(),
        (Step::Element, TypeData::Array(elem)) => Some(elem),
        _ => None,
    })
}
