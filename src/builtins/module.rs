//! Module proxies
//!
//! Unlike plain objects, a missing module attribute is an error: a typo in
//! `np.arrya` should fail where it happens, not later on a nil.

use mlua::{Lua, Value};
use pyo3::Python;

use crate::errors::{BridgeError, BridgeResult, ForeignResultExt};
use crate::ffi::{describe, PyHandle};
use crate::interop::{marshal, ForeignKind, ProxyVTable};

use super::object;

pub static VTABLE: ProxyVTable = ProxyVTable {
    index: Some(index),
    newindex: Some(object::newindex),
    ..ProxyVTable::base(ForeignKind::Module)
};

pub fn index(lua: &Lua, this: &PyHandle, key: Value) -> BridgeResult<Value> {
    let Value::String(name) = &key else {
        return Err(BridgeError::type_mismatch(
            "module_index",
            format!("attribute name must be a string, got {}", describe(&key)),
        ));
    };
    let name = std::str::from_utf8(&name.as_bytes())
        .map_err(|_| BridgeError::encoding("module_index"))?
        .to_owned();
    Python::with_gil(|py| {
        let value = this.get(py).getattr(name.as_str()).foreign("module_index")?;
        marshal::push_foreign(lua, py, value)
    })
}
