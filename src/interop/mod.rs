//! Interop layer - classification, dispatch tables and value routing
//!
//! Design:
//! 1. `kind` classifies a Python object by capability
//! 2. `registry` maps each kind to a static dispatcher table
//! 3. `proxy` wires Lua metamethods to those tables
//! 4. `marshal` routes values across the boundary
//! 5. `call` invokes Python callables with Lua arguments

pub mod call;
mod kind;
pub mod library;
pub mod marshal;
mod proxy;
pub mod registry;

#[cfg(test)]
mod tests;

pub use kind::ForeignKind;
pub use library::Library;
pub use marshal::{is_sequence_table, push_foreign, to_foreign, wrap};
pub use registry::{CapabilityRegistry, Operator, ProxyVTable};
