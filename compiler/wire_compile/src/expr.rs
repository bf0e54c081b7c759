//! Intermediate representation emitted by target builders.
//!
//! Builders return an `Expr` tree per target; the core wraps it with
//! conversions and scoping, and `lower` turns the finished tree into
//! closures. Every node has a static type, the type its value is known to
//! be assignable to.

use std::sync::Arc;

use wire_graph::TargetRef;
use wire_ir::{
    Constructor, ContainerId, Delegate, Instance, InstanceKey, Member, ResolveResult,
    ScopeBehaviour, TypeId,
};
use wire_runtime::SingletonCache;

use crate::CompiledFactory;

/// Index of a per-invocation local slot of a compiled factory.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct LocalId(pub(crate) u32);

impl LocalId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// How a local slot is initialized at the start of each invocation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LocalInit {
    /// The active lifetime scope.
    ActiveScope,
    /// The root of the active scope's tree.
    RootScope,
}

#[derive(Debug)]
pub enum Expr {
    /// A ready-made instance.
    Constant(Instance),
    /// Call a constructor, then assign members.
    Construct {
        ty: TypeId,
        type_name: Arc<str>,
        ctor: Constructor,
        args: Vec<Expr>,
        members: Vec<(Member, Expr)>,
    },
    /// Call a user delegate producing `requested`.
    Invoke {
        requested: TypeId,
        delegate: Delegate,
        args: Vec<Expr>,
    },
    /// Assemble a collection instance of type `ty`.
    Sequence { ty: TypeId, items: Vec<Expr> },
    /// Check that `inner`'s value is assignable to `ty`.
    Convert { inner: Box<Expr>, ty: TypeId },
    /// Ask the invoking container for `ty`, else evaluate `fallback`, else fail
    /// with `MissingDependency`.
    Resolve {
        ty: TypeId,
        fallback: Option<Box<Expr>>,
    },
    /// Defer to the invoking container when it is not `owner` and can supply
    /// `ty`; otherwise evaluate `body`.
    Override {
        ty: TypeId,
        owner: ContainerId,
        body: Box<Expr>,
    },
    /// Route `body` through the lifetime scope held in local `scope`.
    Scoped {
        body: Box<Expr>,
        behaviour: ScopeBehaviour,
        scope: LocalId,
        key: InstanceKey,
    },
    /// Fetch or create the singleton for `key`.
    Singleton {
        key: InstanceKey,
        cache: Arc<SingletonCache<CompiledFactory>>,
        factory: CompiledFactory,
    },
    /// Placeholder for `target` compiled as `ty`; expanded by the core.
    Deferred { target: TargetRef, ty: TypeId },
    /// Always fails with `MissingDependency`.
    Missing { ty: TypeId },
}

impl Expr {
    /// The type this expression's value is known to be assignable to.
    pub fn static_type(&self) -> TypeId {
        match self {
            Expr::Constant(value) => value.ty(),
            Expr::Construct { ty, .. }
            | Expr::Sequence { ty, .. }
            | Expr::Convert { ty, .. }
            | Expr::Resolve { ty, .. }
            | Expr::Override { ty, .. }
            | Expr::Deferred { ty, .. }
            | Expr::Missing { ty } => *ty,
            Expr::Invoke { delegate, .. } => delegate.return_type,
            Expr::Scoped { body, .. } => body.static_type(),
            Expr::Singleton { key, .. } => key.ty,
        }
    }

    /// Replace every `Deferred` placeholder with `expand(target, ty)`.
    ///
    /// Singleton factories are already compiled and are not visited.
    pub fn expand_deferred<F>(self, expand: &mut F) -> ResolveResult<Expr>
    where
        F: FnMut(TargetRef, TypeId) -> ResolveResult<Expr>,
    {
        Ok(match self {
            Expr::Deferred { target, ty } => expand(target, ty)?,
            Expr::Construct {
                ty,
                type_name,
                ctor,
                args,
                members,
            } => Expr::Construct {
                ty,
                type_name,
                ctor,
                args: expand_all(args, expand)?,
                members: members
                    .into_iter()
                    .map(|(m, e)| Ok((m, e.expand_deferred(expand)?)))
                    .collect::<ResolveResult<_>>()?,
            },
            Expr::Invoke {
                requested,
                delegate,
                args,
            } => Expr::Invoke {
                requested,
                delegate,
                args: expand_all(args, expand)?,
            },
            Expr::Sequence { ty, items } => Expr::Sequence {
                ty,
                items: expand_all(items, expand)?,
            },
            Expr::Convert { inner, ty } => Expr::Convert {
                inner: Box::new(inner.expand_deferred(expand)?),
                ty,
            },
            Expr::Resolve { ty, fallback } => Expr::Resolve {
                ty,
                fallback: match fallback {
                    Some(f) => Some(Box::new(f.expand_deferred(expand)?)),
                    None => None,
                },
            },
            Expr::Override { ty, owner, body } => Expr::Override {
                ty,
                owner,
                body: Box::new(body.expand_deferred(expand)?),
            },
            Expr::Scoped {
                body,
                behaviour,
                scope,
                key,
            } => Expr::Scoped {
                body: Box::new(body.expand_deferred(expand)?),
                behaviour,
                scope,
                key,
            },
            leaf @ (Expr::Constant(_) | Expr::Singleton { .. } | Expr::Missing { .. }) => leaf,
        })
    }
}

fn expand_all<F>(items: Vec<Expr>, expand: &mut F) -> ResolveResult<Vec<Expr>>
where
    F: FnMut(TargetRef, TypeId) -> ResolveResult<Expr>,
{
    items.into_iter().map(|e| e.expand_deferred(expand)).collect()
}
