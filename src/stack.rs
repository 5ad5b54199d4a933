//! Stack growth for the recursive passes.
//!
//! Parser, resolver, printer and evaluator all recurse once per nesting
//! level of the program. Each recursive entry point runs through
//! [`ensure_sufficient_stack`], which moves onto a freshly allocated segment
//! when the current one is nearly exhausted, so nesting depth is bounded by
//! memory rather than by the thread's stack size.

/// Grow when less than this remains.
const RED_ZONE: usize = 128 * 1024;

/// Size of each new stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
