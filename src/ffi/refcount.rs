//! Reference accounting for foreign handles
//!
//! Counts handles created and finalized on this thread. A Lua state is
//! single-threaded, so the counters live in thread-local cells.

use std::cell::Cell;

use pyo3::PyAny;

thread_local! {
    static CREATED: Cell<u64> = const { Cell::new(0) };
    static FINALIZED: Cell<u64> = const { Cell::new(0) };
}

/// Snapshot of handle lifetimes on the current thread
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifetimeStats {
    pub created: u64,
    pub finalized: u64,
}

impl LifetimeStats {
    /// Handles still owned by Lua
    pub fn live(&self) -> u64 {
        self.created - self.finalized
    }
}

#[inline]
pub(crate) fn record_wrap() {
    CREATED.with(|c| c.set(c.get() + 1));
}

#[inline]
pub(crate) fn record_finalize() {
    FINALIZED.with(|c| c.set(c.get() + 1));
}

pub fn stats() -> LifetimeStats {
    LifetimeStats {
        created: CREATED.with(Cell::get),
        finalized: FINALIZED.with(Cell::get),
    }
}

/// Current Python reference count (for debugging/testing)
#[inline]
pub fn refcount(obj: &PyAny) -> isize {
    obj.get_refcnt()
}
