//! Built-in target builders.
//!
//! One strategy per built-in target kind, plus two capability-level
//! fallbacks: `PassThroughBuilder` for wrapper kinds and `DirectValueBuilder`
//! for kinds that carry a ready-made value. `BuilderRegistry::new` wires
//! them up.

mod collection;
mod construct;
mod decorator;
mod delegate;
mod direct;
mod resolved;
mod wrappers;

pub use collection::CollectionBuilder;
pub use construct::{ConstructBuilder, GenericConstructBuilder};
pub use decorator::DecoratorBuilder;
pub use delegate::DelegateBuilder;
pub use direct::DirectValueBuilder;
pub use resolved::ResolvedBuilder;
pub use wrappers::{
    PassThroughBuilder, ScopedBuilder, SingletonBuilder, TypeChangeBuilder, UnscopedBuilder,
};

use wire_graph::Target;
use wire_ir::ResolveError;

/// A builder was handed a target of a kind it does not handle.
#[cold]
fn unexpected_kind(target: &Target) -> ResolveError {
    ResolveError::UnsupportedTargetKind {
        kind: target.kind_name().to_owned(),
    }
}
