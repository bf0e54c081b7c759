//! Wire Runtime - the execution-side state of the wire resolution compiler.
//!
//! This crate provides:
//! - `OnceMap`: the exactly-once concurrent map every cache is built on
//! - `LifetimeScope`: the disposal-tracking scope tree
//! - `SingletonCache`: two-layer, per-(type, node) singleton memoization
//! - `ResolveContainer`, `ResolveContext`: what compiled factories run
//!   against
//!
//! Nothing here knows how targets are compiled; the singleton cache is
//! generic over the compiled factory type.

mod context;
mod once;
mod scope;
mod singleton;

pub use context::{ResolveContainer, ResolveContext};
pub use once::OnceMap;
pub use scope::LifetimeScope;
pub use singleton::SingletonCache;
