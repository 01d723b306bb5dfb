//! Foreign handles - ownership of Python references held by Lua
//!
//! Design: a Lua userdata owns exactly one strong Python reference:
//! 1. Wrapping donates the reference to the handle
//! 2. Unwrapping borrows it, or clones it (incref) when Python keeps it
//! 3. Lua's collector finalizes the userdata, which releases it under the GIL

mod handle;
pub mod refcount;

#[cfg(test)]
mod tests;

pub use handle::{describe, handle_of, PyHandle};
pub use refcount::{refcount, stats, LifetimeStats};
