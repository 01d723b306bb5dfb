//! Iterator proxies
//!
//! Calling an iterator handle advances it, so a handle works directly as the
//! generator of a generic `for`:
//!
//! ```lua
//! for x in python.iter(python.list{1, 2, 3}) do print(x) end
//! ```
//!
//! A `None` item reads as nil and therefore also ends such a loop.

use mlua::{Lua, MultiValue, Value};
use pyo3::{ffi, AsPyPointer, Python, ToPyObject};

use crate::errors::{BridgeError, BridgeResult, ForeignResultExt};
use crate::ffi::PyHandle;
use crate::interop::{marshal, ForeignKind, ProxyVTable};
use crate::logging::trace;

pub static VTABLE: ProxyVTable = ProxyVTable {
    call: Some(next),
    pairs: Some(super::object::pairs),
    ..ProxyVTable::base(ForeignKind::Iterator)
};

/// Advance the iterator: the next item, or nil once exhausted
pub fn next(lua: &Lua, this: &PyHandle, _args: MultiValue) -> BridgeResult<Value> {
    Python::with_gil(|py| {
        let iterator = this.get(py);
        // SAFETY: `iterator` is live for this GIL scope. PyIter_Next returns a
        // new reference, or null with no error set on exhaustion.
        let item = unsafe { py.from_owned_ptr_or_opt::<pyo3::PyAny>(ffi::PyIter_Next(iterator.as_ptr())) };
        match item {
            Some(item) => marshal::push_foreign(lua, py, item),
            None => match pyo3::PyErr::take(py) {
                Some(err) => Err::<Value, _>(err).foreign("iter_next"),
                None => {
                    trace!(target: "ffi", "python iterator exhausted");
                    Ok(Value::Nil)
                }
            },
        }
    })
}

/// `python.iter(v)`: iterator over a Python iterable, nil when `v` isn't one
pub fn make(lua: &Lua, value: Value) -> BridgeResult<Value> {
    Python::with_gil(|py| {
        let obj = marshal::to_foreign(lua, py, value)
            .map_err(|e| BridgeError::conversion("iterator", "argument", e))?;
        match obj.as_ref(py).iter() {
            Ok(iterator) => marshal::wrap(lua, iterator.to_object(py), ForeignKind::Iterator),
            Err(_) => Ok(Value::Nil),
        }
    })
}
