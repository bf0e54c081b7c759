//! Runtime values produced by compiled factories.
//!
//! An `Instance` is a reference-counted, type-tagged value. Cloning an
//! instance clones the handle, never the value, so identity comparisons
//! (`ptr_eq`) are how tests and the scopes tell instances apart.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::{ResolveError, ResolveResult, TypeId};

/// Values that release resources when their owning scope is disposed.
pub trait Dispose: Send + Sync {
    fn dispose(&self);
}

/// Payload of array, list and enumerable instances.
#[derive(Clone, Debug, Default)]
pub struct Sequence(pub Vec<Instance>);

/// A produced value tagged with its runtime type.
#[derive(Clone)]
pub struct Instance {
    ty: TypeId,
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
    disposer: Option<Arc<dyn Dispose>>,
}

impl Instance {
    /// Wrap a plain value.
    pub fn new<T: Any + Send + Sync>(ty: TypeId, value: T) -> Self {
        Instance::from_arc(ty, Arc::new(value))
    }

    /// Wrap an already shared value.
    pub fn from_arc<T: Any + Send + Sync>(ty: TypeId, value: Arc<T>) -> Self {
        Instance {
            ty,
            value,
            type_name: std::any::type_name::<T>(),
            disposer: None,
        }
    }

    /// Wrap a value that must be disposed with its scope.
    pub fn disposable<T: Any + Dispose>(ty: TypeId, value: T) -> Self {
        let value = Arc::new(value);
        let disposer: Arc<dyn Dispose> = Arc::clone(&value) as Arc<dyn Dispose>;
        Instance {
            disposer: Some(disposer),
            ..Instance::from_arc(ty, value)
        }
    }

    /// A sequence instance of collection type `ty`.
    pub fn sequence(ty: TypeId, items: Vec<Instance>) -> Self {
        Instance::new(ty, Sequence(items))
    }

    /// The runtime type tag.
    #[inline]
    pub fn ty(&self) -> TypeId {
        self.ty
    }

    /// Name of the Rust type behind the value.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Shared handle to the value as `T`.
    pub fn downcast<T: Any + Send + Sync>(&self) -> ResolveResult<Arc<T>> {
        Arc::clone(&self.value)
            .downcast::<T>()
            .map_err(|_| ResolveError::InvalidCast {
                expected: std::any::type_name::<T>().to_owned(),
                found: self.type_name.to_owned(),
            })
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Items of a sequence instance.
    pub fn items(&self) -> Option<&[Instance]> {
        self.downcast_ref::<Sequence>().map(|s| s.0.as_slice())
    }

    /// Returns `true` if both handles point at the same value.
    #[inline]
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.value), Arc::as_ptr(&other.value))
    }

    /// Address of the value, stable for the value's lifetime.
    #[inline]
    pub fn address(&self) -> usize {
        Arc::as_ptr(&self.value).cast::<()>() as usize
    }

    #[inline]
    pub fn is_disposable(&self) -> bool {
        self.disposer.is_some()
    }

    /// Run the value's disposer, if any.
    pub fn dispose(&self) {
        if let Some(disposer) = &self.disposer {
            disposer.dispose();
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("ty", &self.ty)
            .field("type_name", &self.type_name)
            .field("address", &format_args!("{:#x}", self.address()))
            .finish()
    }
}
