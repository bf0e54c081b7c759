//! Stack safety for deep target graphs.
//!
//! Compiling a target recurses once per edge of the target graph. Long
//! dependency chains are legal, so the compiler grows the native stack on
//! demand instead of relying on the thread's default size.

/// Minimum stack space to keep available (100KB red zone).
const RED_ZONE: usize = 100 * 1024;

/// Stack space to allocate when growing (1MB).
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Ensure sufficient stack space is available before executing `f`.
#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
