//! Wire - a compiling dependency-resolution container.
//!
//! Register targets describing how each type is produced, then resolve
//! types. The first request for a type compiles its target graph into a
//! factory (`wire_compile`); later requests only invoke it.
//!
//! ```text
//! Container::register  ->  TargetTable
//! Container::get       ->  Compiler::compile (once per type)
//!                      ->  CompiledFactory::invoke (every request)
//! ```
//!
//! The building blocks are re-exported so a container can be used without
//! naming the underlying crates.

mod container;

use std::sync::Once;

pub use container::{Container, OverridingContainer};
pub use wire_compile::{
    BuilderRegistry, CompileContext, CompileOptions, CompiledFactory, Compiler, Expr,
    MemberBindingBehaviour, TargetBuilder,
};
pub use wire_graph::{
    Capability, CollectionFlavor, ConstructTarget, CustomTarget, MemberBinding, Target,
    TargetKind, TargetRef,
};
pub use wire_ir::{
    Constructor, Delegate, DelegateCall, Dispose, Instance, Member, Parameter, ResolveError,
    ResolveResult, Resolver, ScopeBehaviour, ScopePreference, SharedPool, TypeDef, TypeId,
    TypePool, Variance,
};
pub use wire_runtime::{LifetimeScope, ResolveContainer, ResolveContext};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Safe to call multiple times. Does nothing unless `RUST_LOG` is set, e.g.
/// `RUST_LOG=wire_compile=debug` or `RUST_LOG=wire_runtime=trace`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(EnvFilter::from_default_env())
                .with(
                    tracing_tree::HierarchicalLayer::new(2)
                        .with_targets(true)
                        .with_bracketed_fields(true),
                )
                .init();
        }
    });
}
