//! Wire IR - shared vocabulary for the wire resolution compiler.
//!
//! This crate provides:
//! - The runtime type model (`TypePool`, `TypeId`, `TypeData`, `TypeDef`)
//! - Callable descriptors (`Constructor`, `Member`, `Delegate`)
//! - Runtime values (`Instance`, `Dispose`, `Sequence`)
//! - Identity handles (`TargetId`, `ContainerId`, `InstanceKey`)
//! - Lifetime vocabulary (`ScopeBehaviour`, `ScopePreference`)
//! - The error taxonomy (`ResolveError`, `ResolveResult`)
//!
//! # Why a Type Model
//!
//! Resolution targets describe *how* to produce an instance of a type:
//! which constructor to call, which generic arguments to close over, which
//! interfaces a type can stand in for. Rust has no runtime reflection, so the
//! type graph the compiler reasons about is described explicitly here and
//! interned for O(1) equality, the same way the compiler front end interns
//! names and types.

mod callable;
mod def;
mod error;
mod ids;
mod instance;
mod lifetime;
mod pool;

pub use callable::{
    Activation, ActivateFn, AssignFn, Constructor, Delegate, DelegateCall, DelegateFn, Member,
    Parameter, Resolver,
};
pub use def::{GenericParam, TypeDef, TypeFlags, Variance};
pub use error::{ResolveError, ResolveResult};
pub use ids::{ContainerId, InstanceKey, TargetId};
pub use instance::{Dispose, Instance, Sequence};
pub use lifetime::{ScopeBehaviour, ScopePreference};
pub use pool::{DefId, SharedPool, TypeData, TypeId, TypeInternError, TypePool};
