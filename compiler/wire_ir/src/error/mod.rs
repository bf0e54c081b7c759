//! Error taxonomy for compilation and execution of resolution targets.
//!
//! Compile-time errors abort compilation of a request synchronously; there is
//! no partial output. `MissingDependency` is the only execution-time failure
//! produced by the pipeline itself; user callables surface as `Activation`.
//!
//! Errors carry rendered type names rather than `TypeId` handles so that they
//! stay readable after the pool that produced them is gone.

use crate::TargetId;

/// Result alias used throughout the pipeline.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Everything that can go wrong while compiling or executing a target.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// The requested type is incompatible with the node.
    #[error("target {target} of type `{declared}` cannot produce `{requested}`")]
    TypeMismatch {
        target: TargetId,
        declared: String,
        requested: String,
    },

    /// A node was re-entered while it was still being compiled.
    #[error("cyclic dependency detected at target {target}: {}", format_path(.path))]
    CyclicDependency { target: TargetId, path: Vec<TargetId> },

    /// More than one constructor binds equally well.
    #[error(
        "ambiguous constructor for `{ty}`: {candidates} constructors with {arity} parameter(s) bind equally well"
    )]
    AmbiguousConstructor {
        ty: String,
        arity: usize,
        candidates: usize,
    },

    /// More than one candidate matches equally well.
    #[error("ambiguous match for `{requested}`: {}", .candidates.join(", "))]
    AmbiguousBestMatch {
        requested: String,
        candidates: Vec<String>,
    },

    /// The type has no usable constructor.
    #[error("no applicable constructor for `{ty}`")]
    NoApplicableConstructor { ty: String },

    /// No builder strategy handles the node's kind.
    #[error("no builder registered for target kind `{kind}`")]
    UnsupportedTargetKind { kind: String },

    /// Generic parameters or members could not be bound.
    #[error("cannot bind `{target_type}` for `{requested}`: {reason}")]
    BindingError {
        requested: String,
        target_type: String,
        reason: String,
    },

    /// Execution-time only: a dependency used as last resort was unavailable.
    #[error("no target available for dependency `{ty}`")]
    MissingDependency { ty: String },

    /// A user constructor, member assignment or delegate failed.
    #[error("activation of `{ty}` failed: {message}")]
    Activation { ty: String, message: String },

    /// A value is not of the expected type.
    #[error("expected `{expected}`, found `{found}`")]
    InvalidCast { expected: String, found: String },

    /// Resolution through a lifetime scope that has already been disposed.
    #[error("lifetime scope has been disposed")]
    ScopeDisposed,

    /// A deferred placeholder survived code generation.
    #[error("deferred placeholder for target {target} reached lowering unexpanded")]
    UnexpandedPlaceholder { target: TargetId },
}

impl ResolveError {
    /// Construct an `Activation` error.
    #[cold]
    pub fn activation(ty: impl Into<String>, message: impl Into<String>) -> Self {
        ResolveError::Activation {
            ty: ty.into(),
            message: message.into(),
        }
    }

    /// Returns `true` for errors raised while compiling (as opposed to running)
    /// a target.
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            ResolveError::TypeMismatch { .. }
                | ResolveError::CyclicDependency { .. }
                | ResolveError::AmbiguousConstructor { .. }
                | ResolveError::AmbiguousBestMatch { .. }
                | ResolveError::NoApplicableConstructor { .. }
                | ResolveError::UnsupportedTargetKind { .. }
                | ResolveError::BindingError { .. }
                | ResolveError::UnexpandedPlaceholder { .. }
        )
    }
}

fn format_path(path: &[TargetId]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests;
