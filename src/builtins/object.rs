//! Generic object proxies
//!
//! The fallback kind and the source of the behavior shared by every handle:
//! Python equality, `str()` rendering and attribute access.

use mlua::{Function, Lua, Table, Value};
use pyo3::basic::CompareOp;
use pyo3::{PyAny, PyObject, Python, ToPyObject};

use crate::errors::{BridgeError, BridgeResult, ForeignResultExt};
use crate::ffi::{describe, handle_of, PyHandle};
use crate::interop::{marshal, ForeignKind, ProxyVTable};
use crate::logging::trace;

pub static VTABLE: ProxyVTable = ProxyVTable {
    index: Some(index),
    newindex: Some(newindex),
    pairs: Some(pairs),
    ..ProxyVTable::base(ForeignKind::Object)
};

/// None never reaches Lua as a handle; the table exists to keep the registry total
pub static NONE_VTABLE: ProxyVTable = ProxyVTable::base(ForeignKind::None);

/// Python `==` between two handles. A non-handle operand is never equal.
pub fn eq(_lua: &Lua, a: Value, b: Value) -> BridgeResult<bool> {
    let (Some(lhs), Some(rhs)) = (handle_of(&a), handle_of(&b)) else {
        return Ok(false);
    };
    Python::with_gil(|py| {
        lhs.get(py)
            .rich_compare(rhs.get(py), CompareOp::Eq)
            .and_then(|result| result.is_true())
            .foreign("eq")
    })
}

fn type_name(obj: &PyAny) -> String {
    obj.get_type()
        .name()
        .map(str::to_owned)
        .unwrap_or_else(|_| "object".to_string())
}

/// `(typename)str(obj)`
pub fn tostring(_lua: &Lua, this: &PyHandle) -> BridgeResult<String> {
    Python::with_gil(|py| {
        let obj = this.get(py);
        let text = obj.str().foreign("tostring")?;
        Ok(format!("({}){}", type_name(obj), text.to_string_lossy()))
    })
}

/// `str(obj)` with no decoration
pub fn plain_tostring(_lua: &Lua, this: &PyHandle) -> BridgeResult<String> {
    Python::with_gil(|py| {
        let text = this.get(py).str().foreign("tostring")?;
        Ok(text.to_string_lossy().into_owned())
    })
}

fn attribute_name(key: &Value, op: &'static str) -> BridgeResult<String> {
    match key {
        Value::String(name) => std::str::from_utf8(&name.as_bytes())
            .map(str::to_owned)
            .map_err(|_| BridgeError::encoding(op)),
        other => Err(BridgeError::type_mismatch(
            op,
            format!("attribute name must be a string, got {}", describe(other)),
        )),
    }
}

/// String keys read attributes, missing ones as nil. Other keys go through
/// Python item access.
pub fn index(lua: &Lua, this: &PyHandle, key: Value) -> BridgeResult<Value> {
    Python::with_gil(|py| {
        let obj = this.get(py);
        if !matches!(key, Value::String(_)) {
            let key = marshal::to_foreign(lua, py, key)?;
            let item = obj.get_item(key).foreign("object_index")?;
            return marshal::push_foreign(lua, py, item);
        }
        let name = attribute_name(&key, "object_index")?;
        if !obj.hasattr(name.as_str()).foreign("object_index")? {
            trace!(target: "marshal", attribute = %name, "missing attribute reads as nil");
            return Ok(Value::Nil);
        }
        let value = obj.getattr(name.as_str()).foreign("object_index")?;
        marshal::push_foreign(lua, py, value)
    })
}

/// Assigns an attribute; nil deletes it
pub fn newindex(lua: &Lua, this: &PyHandle, key: Value, value: Value) -> BridgeResult<()> {
    let name = attribute_name(&key, "object_newindex")?;
    Python::with_gil(|py| {
        let obj = this.get(py);
        if value.is_nil() {
            return obj.delattr(name.as_str()).foreign("object_newindex");
        }
        let value = marshal::to_foreign(lua, py, value)?;
        obj.setattr(name.as_str(), value).foreign("object_newindex")
    })
}

/// `pairs` over any Python iterable, numbering items from 1
pub fn pairs(lua: &Lua, this: &PyHandle) -> BridgeResult<(Function, Value, Value)> {
    let iterator = Python::with_gil(|py| -> BridgeResult<PyObject> {
        Ok(this.get(py).iter().foreign("pairs")?.to_object(py))
    })?;
    super::iterator_pairs(lua, iterator, false)
}

/// `python.astable(h)`: copy an iterable's items into a sequence table, or a
/// non-iterable's attributes into a string-keyed table
pub fn as_table(lua: &Lua, value: Value) -> BridgeResult<Table> {
    let Some(handle) = handle_of(&value) else {
        return Err(BridgeError::type_mismatch(
            "astable",
            format!("expected a python object, got {}", describe(&value)),
        ));
    };
    Python::with_gil(|py| {
        let obj = handle.get(py);
        let table = lua.create_table()?;
        match obj.iter() {
            Ok(items) => {
                for (i, item) in items.enumerate() {
                    let item = item.foreign("astable")?;
                    table.raw_set(i + 1, marshal::push_foreign(lua, py, item)?)?;
                }
            }
            Err(_) => {
                for name in obj.dir().iter() {
                    let Ok(name) = name.extract::<&str>() else {
                        continue;
                    };
                    let Ok(attr) = obj.getattr(name) else {
                        continue;
                    };
                    // Attributes that can't cross (unencodable names or values) are left out
                    if let Ok(value) = marshal::push_foreign(lua, py, attr) {
                        table.raw_set(name, value)?;
                    }
                }
            }
        }
        Ok(table)
    })
}
