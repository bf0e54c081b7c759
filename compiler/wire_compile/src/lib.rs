//! Wire Compile - compiles resolution target graphs into factories.
//!
//! This crate provides:
//! - `Compiler`: the code generator core, one per container
//! - `CompileContext`: per-step compilation state with cycle detection and
//!   shared fragments
//! - `BuilderRegistry`, `TargetBuilder`: the per-kind compilation strategies
//! - the constructor binder, the generic type mapper and the scope injector
//! - `Expr` and its lowering into closures
//! - `CompiledFactory`: the executable result
//!
//! # Pipeline
//!
//! ```text
//! Target graph -> Compiler (builders, binder, mapper, scope injector)
//!              -> Expr -> lower -> CompiledFactory -> Instance
//! ```
//!
//! Compilation never runs user code. Constructors, members and delegates are
//! captured into the factory and only called when it is invoked.

pub mod binder;
mod builders;
mod compiler;
mod context;
mod expr;
mod factory;
mod lower;
pub mod mapper;
mod options;
mod registry;
mod scope_injector;
mod stack;

pub use builders::{
    CollectionBuilder, ConstructBuilder, DecoratorBuilder, DelegateBuilder, DirectValueBuilder,
    GenericConstructBuilder, PassThroughBuilder, ResolvedBuilder, ScopedBuilder,
    SingletonBuilder, TypeChangeBuilder, UnscopedBuilder,
};
pub use compiler::Compiler;
pub use context::{CompileContext, CompileState, FragmentKey, StackGuard};
pub use expr::{Expr, LocalId, LocalInit};
pub use factory::CompiledFactory;
pub use lower::{Frame, Thunk};
pub use options::{CompileOptions, MemberBindingBehaviour, MAX_DEPTH};
pub use registry::{BuilderRegistry, TargetBuilder};
