//! List proxies and table -> list conversion
//!
//! Indices are 1-based on the Lua side. Reads outside `1..=#l` yield nil;
//! writes outside that range are errors (lists don't grow by assignment).

use mlua::{Function, Lua, Table, Value};
use pyo3::types::PyList;
use pyo3::{ffi, PyObject, Python, ToPyObject};

use crate::errors::{BridgeError, BridgeResult, ForeignResultExt};
use crate::ffi::{describe, PyHandle};
use crate::interop::{marshal, ForeignKind, ProxyVTable};

use super::{
    collect_sequence, container_operand, handle_kind, integer_key, is_container_operand, object, protocol_binary,
    sequence_get, sequence_pairs, sequence_repeat,
};

pub static VTABLE: ProxyVTable = ProxyVTable {
    add: Some(add),
    mul: Some(repeat),
    len: Some(len),
    index: Some(index),
    newindex: Some(newindex),
    pairs: Some(pairs),
    ..ProxyVTable::base(ForeignKind::List)
};

/// Copy `t[1..=#t]` into a new Python list
pub fn to_foreign(lua: &Lua, py: Python<'_>, table: &Table) -> BridgeResult<PyObject> {
    let items = collect_sequence(lua, py, table, "list")?;
    Ok(PyList::new(py, items).to_object(py))
}

pub fn len(_lua: &Lua, this: &PyHandle) -> BridgeResult<Value> {
    Python::with_gil(|py| {
        let len = this.get(py).len().foreign("list_len")?;
        Ok(Value::Integer(len as i64))
    })
}

pub fn index(lua: &Lua, this: &PyHandle, key: Value) -> BridgeResult<Value> {
    if matches!(key, Value::String(_)) {
        return object::index(lua, this, key);
    }
    let Some(index) = integer_key(&key) else {
        return Err(BridgeError::type_mismatch(
            "list_index",
            format!("list index must be an integer, got {}", describe(&key)),
        ));
    };
    Python::with_gil(|py| sequence_get(lua, py, this.get(py), index, "list_index"))
}

pub fn newindex(lua: &Lua, this: &PyHandle, key: Value, value: Value) -> BridgeResult<()> {
    let Some(index) = integer_key(&key) else {
        return Err(BridgeError::type_mismatch(
            "list_newindex",
            format!("list index must be an integer, got {}", describe(&key)),
        ));
    };
    Python::with_gil(|py| {
        let list = this
            .get(py)
            .downcast::<PyList>()
            .map_err(|_| BridgeError::type_mismatch("list_newindex", "handle does not hold a list"))?;
        let len = list.len();
        if index < 1 || index as usize > len {
            return Err(BridgeError::IndexOutOfRange {
                op: "list_newindex",
                index,
                len,
            });
        }
        let item = marshal::to_foreign(lua, py, value)?;
        list.set_item(index as usize - 1, item).foreign("list_newindex")
    })
}

/// `a + b` concatenates into a new list; tables count as lists
pub fn add(lua: &Lua, a: Value, b: Value) -> BridgeResult<Value> {
    if !is_container_operand(&a, ForeignKind::List) || !is_container_operand(&b, ForeignKind::List) {
        return Err(BridgeError::operands("list_add", "concatenate", &a, &b));
    }
    Python::with_gil(|py| {
        let lhs = container_operand(lua, py, &a, to_foreign)?;
        let rhs = container_operand(lua, py, &b, to_foreign)?;
        let result = protocol_binary(py, ffi::PySequence_Concat, lhs.as_ref(py), rhs.as_ref(py))
            .foreign("list_add")?;
        marshal::push_foreign(lua, py, result)
    })
}

/// `l * n` repeats the list; a negative count gives an empty list
pub fn repeat(lua: &Lua, a: Value, b: Value) -> BridgeResult<Value> {
    let (list, count) = match (&a, &b) {
        (list, Value::Integer(n)) if handle_kind(list) == Some(ForeignKind::List) => (list, *n),
        (Value::Integer(n), list) if handle_kind(list) == Some(ForeignKind::List) => (list, *n),
        _ => return Err(BridgeError::operands("list_mul", "multiply", &a, &b)),
    };
    Python::with_gil(|py| {
        let list = container_operand(lua, py, list, to_foreign)?;
        let result = sequence_repeat(py, list.as_ref(py), count).foreign("list_mul")?;
        marshal::push_foreign(lua, py, result)
    })
}

pub fn pairs(lua: &Lua, this: &PyHandle) -> BridgeResult<(Function, Value, Value)> {
    let list = Python::with_gil(|py| this.to_object(py));
    sequence_pairs(lua, list)
}
