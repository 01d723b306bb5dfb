//! luapy - Lua <-> Python value bridge
//!
//! Lua scripts import Python modules and work with Python objects through proxy
//! userdata: arithmetic, indexing, calls, iteration and comparison on a proxy
//! are forwarded to the Python object. Python code receives Lua values as
//! freshly converted Python values.
//!
//! Architecture:
//! - `ffi`: handles owning Python references and their lifetime accounting
//! - `builtins`: per-kind converters and operator dispatchers
//! - `interop`: classification, dispatcher registry, value router, call invoker
//! - `bridge`: per-state context and the `python` table exposed to Lua
//!
//! ```no_run
//! let lua = mlua::Lua::new();
//! let python = luapy::open(&lua)?;
//! lua.globals().set("python", python)?;
//! lua.load(r#"
//!     local math = python.import("math")
//!     assert(math.floor(2.5) == 2)
//! "#).exec()?;
//! # Ok::<(), mlua::Error>(())
//! ```

pub mod bridge;
pub mod builtins;
pub mod config;
pub mod errors;
pub mod ffi;
pub mod interop;
pub mod logging;

use mlua::{Lua, Table};

pub use bridge::Bridge;
pub use config::BridgeConfig;
pub use errors::{BridgeError, BridgeResult};
pub use ffi::PyHandle;
pub use interop::{push_foreign, to_foreign, ForeignKind};

/// Install the bridge with default configuration and return the `python` table
pub fn open(lua: &Lua) -> mlua::Result<Table> {
    open_with_config(lua, BridgeConfig::default())
}

/// Install the bridge into `lua` and return the `python` table
pub fn open_with_config(lua: &Lua, config: BridgeConfig) -> mlua::Result<Table> {
    Ok(Bridge::install(lua, config)?)
}
