//! Tuple proxies and table -> tuple conversion

use mlua::{Function, Lua, Table, Value};
use pyo3::types::PyTuple;
use pyo3::{ffi, PyObject, Python, ToPyObject};

use crate::errors::{BridgeError, BridgeResult, ForeignResultExt};
use crate::ffi::{describe, PyHandle};
use crate::interop::{marshal, ForeignKind, ProxyVTable};

use super::{
    collect_sequence, container_operand, integer_key, is_container_operand, object, protocol_binary,
    sequence_get, sequence_pairs,
};

pub static VTABLE: ProxyVTable = ProxyVTable {
    add: Some(add),
    len: Some(len),
    index: Some(index),
    newindex: Some(newindex),
    pairs: Some(pairs),
    tostring: object::plain_tostring,
    ..ProxyVTable::base(ForeignKind::Tuple)
};

pub fn to_foreign(lua: &Lua, py: Python<'_>, table: &Table) -> BridgeResult<PyObject> {
    let items = collect_sequence(lua, py, table, "tuple")?;
    Ok(PyTuple::new(py, items).to_object(py))
}

pub fn len(_lua: &Lua, this: &PyHandle) -> BridgeResult<Value> {
    Python::with_gil(|py| {
        let len = this.get(py).len().foreign("tuple_len")?;
        Ok(Value::Integer(len as i64))
    })
}

pub fn index(lua: &Lua, this: &PyHandle, key: Value) -> BridgeResult<Value> {
    if matches!(key, Value::String(_)) {
        return object::index(lua, this, key);
    }
    let Some(index) = integer_key(&key) else {
        return Err(BridgeError::type_mismatch(
            "tuple_index",
            format!("tuple index must be an integer, got {}", describe(&key)),
        ));
    };
    Python::with_gil(|py| sequence_get(lua, py, this.get(py), index, "tuple_index"))
}

/// Tuples are immutable
pub fn newindex(_lua: &Lua, _this: &PyHandle, _key: Value, _value: Value) -> BridgeResult<()> {
    Err(BridgeError::type_mismatch(
        "tuple_newindex",
        "python tuple does not support item assignment",
    ))
}

pub fn add(lua: &Lua, a: Value, b: Value) -> BridgeResult<Value> {
    if !is_container_operand(&a, ForeignKind::Tuple) || !is_container_operand(&b, ForeignKind::Tuple) {
        return Err(BridgeError::operands("tuple_add", "concatenate", &a, &b));
    }
    Python::with_gil(|py| {
        let lhs = container_operand(lua, py, &a, to_foreign)?;
        let rhs = container_operand(lua, py, &b, to_foreign)?;
        let result = protocol_binary(py, ffi::PySequence_Concat, lhs.as_ref(py), rhs.as_ref(py))
            .foreign("tuple_add")?;
        marshal::push_foreign(lua, py, result)
    })
}

pub fn pairs(lua: &Lua, this: &PyHandle) -> BridgeResult<(Function, Value, Value)> {
    let tuple = Python::with_gil(|py| this.to_object(py));
    sequence_pairs(lua, tuple)
}
