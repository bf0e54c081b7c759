//! Compilation options.

use wire_graph::MemberBinding;

/// Default limit on nested target compilations.
pub const MAX_DEPTH: usize = 256;

/// Member binding applied to constructions that do not choose their own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum MemberBindingBehaviour {
    /// Assign nothing after construction (default).
    #[default]
    None,
    /// Assign every member whose type is registered.
    All,
}

impl MemberBindingBehaviour {
    pub fn to_binding(self) -> MemberBinding {
        match self {
            MemberBindingBehaviour::None => MemberBinding::None,
            MemberBindingBehaviour::All => MemberBinding::All,
        }
    }
}

/// Options for compiling targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompileOptions {
    /// Let a container other than the compiling one supply registered
    /// dependencies at run time.
    /// Defaults to `true`.
    pub dynamic_override: bool,

    /// Member binding for constructions without an explicit choice.
    /// Defaults to `None`.
    pub member_binding: MemberBindingBehaviour,

    /// Maximum depth of the compile stack before compilation fails with a
    /// cyclic dependency.
    /// Defaults to 256.
    pub max_depth: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            dynamic_override: true,
            member_binding: MemberBindingBehaviour::None,
            max_depth: MAX_DEPTH,
        }
    }
}

impl CompileOptions {
    /// Create options with dynamic overrides switched on or off.
    pub fn with_dynamic_override(dynamic_override: bool) -> Self {
        Self {
            dynamic_override,
            ..Default::default()
        }
    }

    /// Create options with the given default member binding.
    pub fn with_member_binding(member_binding: MemberBindingBehaviour) -> Self {
        Self {
            member_binding,
            ..Default::default()
        }
    }

    /// Create options with the given maximum compile depth.
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth,
            ..Default::default()
        }
    }
}
