//! Identity handles shared across the pipeline.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::TypeId;

/// Next target id. Starts at 1 so that a zeroed id is never a real node.
static NEXT_TARGET: AtomicU32 = AtomicU32::new(1);

/// Next container id.
static NEXT_CONTAINER: AtomicU32 = AtomicU32::new(1);

/// Process-unique identity of a resolution target.
///
/// Assigned once when the target is created, monotonically increasing and
/// never reused. The singleton cache and explicit scope caching key on it, so
/// two logically different registrations never share an id.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct TargetId(u32);

impl TargetId {
    /// Allocate a fresh id.
    #[inline]
    pub fn next() -> Self {
        TargetId(NEXT_TARGET.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TargetId({})", self.0)
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of a container.
///
/// Compiled factories remember which container compiled them; when invoked
/// through a different container, dynamic overrides become possible.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub struct ContainerId(u32);

impl ContainerId {
    /// Allocate a fresh id.
    #[inline]
    pub fn next() -> Self {
        ContainerId(NEXT_CONTAINER.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Cache key for a produced instance: (requested type, node identity).
///
/// Each distinct closed type gets its own entry, so a single singleton node
/// registered for an open generic produces one instance per closed type.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct InstanceKey {
    pub ty: TypeId,
    pub target: TargetId,
}

impl InstanceKey {
    #[inline]
    pub const fn new(ty: TypeId, target: TargetId) -> Self {
        InstanceKey { ty, target }
    }
}
