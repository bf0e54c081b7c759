//! Callable descriptors: constructors, settable members and user delegates.
//!
//! The pipeline never calls user code while compiling. It only inspects the
//! declared parameter types here and captures the callables into the
//! compiled factory, which invokes them with already resolved arguments.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::{Instance, ResolveError, ResolveResult, TypeId};

/// Activation callable of a constructor.
pub type ActivateFn = dyn Fn(&Activation<'_>) -> ResolveResult<Instance> + Send + Sync;

/// Assignment callable of a member: `(target, value)`.
pub type AssignFn = dyn Fn(&Instance, Instance) -> ResolveResult<()> + Send + Sync;

/// Body of a user factory delegate.
pub type DelegateFn = dyn Fn(&DelegateCall<'_>) -> ResolveResult<Instance> + Send + Sync;

/// Arguments handed to a constructor's activation callable.
pub struct Activation<'a> {
    /// The closed type being constructed.
    pub ty: TypeId,
    /// Rendered name of `ty`, for error messages.
    pub type_name: &'a str,
    /// Arguments in parameter order.
    pub args: &'a [Instance],
}

impl Activation<'_> {
    /// The argument at `index`.
    pub fn arg(&self, index: usize) -> ResolveResult<&Instance> {
        self.args.get(index).ok_or_else(|| {
            ResolveError::activation(
                self.type_name,
                format!("missing constructor argument {index}"),
            )
        })
    }

    /// The argument at `index`, downcast to `T`.
    pub fn get<T: Any + Send + Sync>(&self, index: usize) -> ResolveResult<Arc<T>> {
        self.arg(index)?.downcast::<T>()
    }
}

/// A constructor parameter.
#[derive(Clone)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeId,
    /// Value used when nothing is registered for `ty`.
    pub default: Option<Instance>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: TypeId) -> Self {
        Parameter {
            name: name.into(),
            ty,
            default: None,
        }
    }

    #[must_use]
    pub fn with_default(mut self, value: Instance) -> Self {
        self.default = Some(value);
        self
    }

    #[inline]
    pub fn is_optional(&self) -> bool {
        self.default.is_some()
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("optional", &self.is_optional())
            .finish()
    }
}

/// A constructor: ordered parameters plus the callable that activates it.
#[derive(Clone)]
pub struct Constructor {
    pub params: Vec<Parameter>,
    pub activate: Arc<ActivateFn>,
}

impl Constructor {
    pub fn new(
        params: Vec<Parameter>,
        activate: impl Fn(&Activation<'_>) -> ResolveResult<Instance> + Send + Sync + 'static,
    ) -> Self {
        Constructor {
            params,
            activate: Arc::new(activate),
        }
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Copy of this constructor with every parameter type mapped by `close`.
    #[must_use]
    pub fn close(&self, close: impl Fn(TypeId) -> TypeId) -> Self {
        Constructor {
            params: self
                .params
                .iter()
                .map(|p| Parameter {
                    ty: close(p.ty),
                    ..p.clone()
                })
                .collect(),
            activate: Arc::clone(&self.activate),
        }
    }

    /// Returns `true` if both values share the same activation callable.
    pub fn same_callable(&self, other: &Constructor) -> bool {
        Arc::ptr_eq(&self.activate, &other.activate)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// A member that can be assigned after construction.
#[derive(Clone)]
pub struct Member {
    pub name: String,
    pub ty: TypeId,
    pub assign: Arc<AssignFn>,
}

impl Member {
    pub fn new(
        name: impl Into<String>,
        ty: TypeId,
        assign: impl Fn(&Instance, Instance) -> ResolveResult<()> + Send + Sync + 'static,
    ) -> Self {
        Member {
            name: name.into(),
            ty,
            assign: Arc::new(assign),
        }
    }

    #[must_use]
    pub fn close(&self, close: impl Fn(TypeId) -> TypeId) -> Self {
        Member {
            name: self.name.clone(),
            ty: close(self.ty),
            assign: Arc::clone(&self.assign),
        }
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .finish_non_exhaustive()
    }
}

/// Runtime access to the requesting container, handed to delegates.
pub trait Resolver {
    /// Resolve `ty`, failing if nothing can produce it.
    fn resolve(&self, ty: TypeId) -> ResolveResult<Instance>;

    /// Resolve `ty`, returning `None` if nothing is registered for it.
    fn try_resolve(&self, ty: TypeId) -> ResolveResult<Option<Instance>>;
}

/// Arguments handed to a delegate body.
pub struct DelegateCall<'a> {
    /// The type the delegate is being asked to produce.
    pub requested: TypeId,
    /// Resolved arguments in parameter order.
    pub args: &'a [Instance],
    pub resolver: &'a dyn Resolver,
}

impl DelegateCall<'_> {
    /// The argument at `index`, downcast to `T`.
    pub fn get<T: Any + Send + Sync>(&self, index: usize) -> ResolveResult<Arc<T>> {
        self.args
            .get(index)
            .ok_or_else(|| {
                ResolveError::activation("delegate", format!("missing argument {index}"))
            })?
            .downcast::<T>()
    }
}

/// A user factory callable with declared parameters and return type.
#[derive(Clone)]
pub struct Delegate {
    pub params: Vec<Parameter>,
    pub return_type: TypeId,
    pub body: Arc<DelegateFn>,
}

impl Delegate {
    pub fn new(
        params: Vec<Parameter>,
        return_type: TypeId,
        body: impl Fn(&DelegateCall<'_>) -> ResolveResult<Instance> + Send + Sync + 'static,
    ) -> Self {
        Delegate {
            params,
            return_type,
            body: Arc::new(body),
        }
    }
}

impl fmt::Debug for Delegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delegate")
            .field("params", &self.params)
            .field("return_type", &self.return_type)
            .finish_non_exhaustive()
    }
}
