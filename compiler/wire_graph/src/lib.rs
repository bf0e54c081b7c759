//! Wire Graph - the resolution target graph.
//!
//! This crate provides:
//! - `Target`, `TargetKind`: immutable nodes describing how to produce an
//!   instance of a type
//! - `KindKey`, `Capability`: how the builder registry classifies nodes
//! - `CustomTarget`: extension point for kinds defined elsewhere
//! - `TargetSource`: the registry interface the compiler consumes, with the
//!   reference `TargetTable` and the `LayeredSource` used by overriding
//!   containers

mod table;
mod target;

pub use table::{LayeredSource, TargetSource, TargetTable};
pub use target::{
    Capability, CollectionFlavor, ConstructTarget, CustomTarget, KindKey, MemberBinding, Target,
    TargetKind, TargetRef,
};
