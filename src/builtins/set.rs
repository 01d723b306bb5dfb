//! Set proxies and table -> set conversion
//!
//! Operators map onto Python's set algebra and return new sets:
//! `+` union, `*` intersection, `-` difference, `~` symmetric difference.

use mlua::{Lua, Table, Value};
use pyo3::types::PySet;
use pyo3::{ffi, PyObject, Python, ToPyObject};

use crate::errors::{BridgeError, BridgeResult, ForeignResultExt};
use crate::ffi::PyHandle;
use crate::interop::marshal::{self, TableVisit};
use crate::interop::{ForeignKind, Operator, ProxyVTable};

use super::{container_operand, is_container_operand, object, protocol_binary, ProtocolFn};

pub static VTABLE: ProxyVTable = ProxyVTable {
    add: Some(union),
    bor: Some(union),
    mul: Some(intersection),
    band: Some(intersection),
    sub: Some(difference),
    bxor: Some(symmetric_difference),
    len: Some(len),
    index: Some(index),
    newindex: Some(newindex),
    pairs: Some(object::pairs),
    ..ProxyVTable::base(ForeignKind::Set)
};

/// Collect `t[1..=#t]` into a new set; unhashable elements fail
pub fn to_foreign(lua: &Lua, py: Python<'_>, table: &Table) -> BridgeResult<PyObject> {
    let _visit = TableVisit::enter(table, "set")?;
    let set = PySet::empty(py).foreign("set_convert")?;
    let len = table.len()?;
    for i in 1..=len {
        let value: Value = table.get(i)?;
        marshal::to_foreign(lua, py, value)
            .and_then(|item| set.add(item).foreign("set_convert"))
            .map_err(|e| BridgeError::conversion("set", format!("element {}", i), e))?;
    }
    Ok(set.to_object(py))
}

pub fn len(_lua: &Lua, this: &PyHandle) -> BridgeResult<Value> {
    Python::with_gil(|py| {
        let len = this.get(py).len().foreign("set_len")?;
        Ok(Value::Integer(len as i64))
    })
}

pub fn index(_lua: &Lua, _this: &PyHandle, _key: Value) -> BridgeResult<Value> {
    Err(BridgeError::type_mismatch("set_index", "python set does not support indexing"))
}

pub fn newindex(_lua: &Lua, _this: &PyHandle, _key: Value, _value: Value) -> BridgeResult<()> {
    Err(BridgeError::type_mismatch(
        "set_newindex",
        "python set does not support item assignment",
    ))
}

fn algebra(lua: &Lua, op: Operator, name: &'static str, f: ProtocolFn, a: Value, b: Value) -> BridgeResult<Value> {
    if !is_container_operand(&a, ForeignKind::Set) || !is_container_operand(&b, ForeignKind::Set) {
        return Err(BridgeError::operands(name, op.verb(), &a, &b));
    }
    Python::with_gil(|py| {
        let lhs = container_operand(lua, py, &a, to_foreign)?;
        let rhs = container_operand(lua, py, &b, to_foreign)?;
        let result = protocol_binary(py, f, lhs.as_ref(py), rhs.as_ref(py)).foreign(name)?;
        marshal::push_foreign(lua, py, result)
    })
}

pub fn union(lua: &Lua, a: Value, b: Value) -> BridgeResult<Value> {
    algebra(lua, Operator::BOr, "set_union", ffi::PyNumber_Or, a, b)
}

pub fn intersection(lua: &Lua, a: Value, b: Value) -> BridgeResult<Value> {
    algebra(lua, Operator::BAnd, "set_intersection", ffi::PyNumber_And, a, b)
}

pub fn difference(lua: &Lua, a: Value, b: Value) -> BridgeResult<Value> {
    algebra(lua, Operator::Sub, "set_difference", ffi::PyNumber_Subtract, a, b)
}

pub fn symmetric_difference(lua: &Lua, a: Value, b: Value) -> BridgeResult<Value> {
    algebra(lua, Operator::BXor, "set_symmetric_difference", ffi::PyNumber_Xor, a, b)
}
