use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Process-wide identity for a [`TVar`](crate::TVar).
///
/// Distinct TVars always receive distinct ids; ids are never recycled within
/// a run, so equality of ids is equality of identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(u64);

/// Monotone, process-wide id generator.
///
/// Allocation only ever happens while a task holds the scheduler's baton
/// (§4.1), so there is no *logical* race on `next`. The counter still has to
/// be safe to touch from whichever OS thread currently holds that baton
/// (§11), so it is backed by an atomic rather than a plain integer.
///
/// `FreshId` is cheap to clone: the counter itself is shared, so the demo
/// harness (§6, §13) can allocate a single source and hand clones of it to
/// every `scheduler` run it starts, preserving process-wide uniqueness
/// across runs rather than just within one.
#[derive(Debug, Default, Clone)]
pub struct FreshId {
    next: Arc<AtomicU64>,
}

impl FreshId {
    /// Create a source starting at id `0`.
    pub fn new() -> FreshId {
        FreshId {
            next: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Return the next id and advance the counter.
    pub fn fresh(&self) -> Id {
        Id(self.next.fetch_add(1, Ordering::Relaxed))
    }
}
