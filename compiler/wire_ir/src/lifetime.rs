//! Lifetime vocabulary shared by targets, the scope injector and scopes.

/// How a target's result participates in lifetime scope tracking.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum ScopeBehaviour {
    /// Not tracked; the fragment is evaluated directly.
    #[default]
    None,
    /// A new instance per resolution, tracked by the scope for disposal.
    Implicit,
    /// One instance per scope (per instance key), tracked for disposal.
    Explicit,
}

impl ScopeBehaviour {
    /// Returns `true` unless this is `None`.
    #[inline]
    pub fn is_scoped(self) -> bool {
        !matches!(self, ScopeBehaviour::None)
    }
}

/// Which scope a scoped target prefers when one is active.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum ScopePreference {
    /// The active scope.
    #[default]
    Current,
    /// The root of the active scope's tree.
    Root,
}
