//! Dict proxies and table -> dict conversion
//!
//! Only string keys survive conversion; other keys are skipped. Assigning nil
//! through a proxy deletes the key.
//!
//! Operators build new dicts and never touch their operands:
//! - `a + b`: merge, right operand wins on shared keys
//! - `a * b`: keys present in both, values from the left
//! - `a - b`: keys of the left absent from the right

use mlua::{Function, Lua, Table, Value};
use pyo3::types::PyDict;
use pyo3::{PyObject, Python, ToPyObject};

use crate::errors::{BridgeError, BridgeResult, ForeignResultExt};
use crate::ffi::PyHandle;
use crate::interop::marshal::{self, TableVisit};
use crate::interop::{ForeignKind, ProxyVTable};
use crate::logging::trace;

use super::{container_operand, is_container_operand, iterator_pairs, object, string};

pub static VTABLE: ProxyVTable = ProxyVTable {
    add: Some(merge),
    mul: Some(intersect),
    sub: Some(difference),
    len: Some(len),
    index: Some(index),
    newindex: Some(newindex),
    pairs: Some(pairs),
    tostring: object::plain_tostring,
    ..ProxyVTable::base(ForeignKind::Dict)
};

/// Copy the string-keyed entries of `table` into a new Python dict
pub fn to_foreign(lua: &Lua, py: Python<'_>, table: &Table) -> BridgeResult<PyObject> {
    let _visit = TableVisit::enter(table, "dict")?;
    let dict = PyDict::new(py);
    let mut skipped = 0usize;
    for pair in table.pairs::<Value, Value>() {
        let (key, value) = pair?;
        let Value::String(key) = key else {
            skipped += 1;
            continue;
        };
        let position = format!("key '{}'", key.to_string_lossy());
        let key = string::to_foreign(py, &key).map_err(|e| BridgeError::conversion("dict", position.clone(), e))?;
        let value = marshal::to_foreign(lua, py, value).map_err(|e| BridgeError::conversion("dict", position, e))?;
        dict.set_item(key, value).foreign("dict_convert")?;
    }
    if skipped > 0 {
        trace!(target: "marshal", skipped, "dropped non-string table keys");
    }
    Ok(dict.to_object(py))
}

fn dict_of<'py>(py: Python<'py>, obj: &'py PyObject, op: &'static str) -> BridgeResult<&'py PyDict> {
    obj.as_ref(py)
        .downcast::<PyDict>()
        .map_err(|_| BridgeError::type_mismatch(op, "operand is not a dict"))
}

pub fn len(_lua: &Lua, this: &PyHandle) -> BridgeResult<Value> {
    Python::with_gil(|py| {
        let len = this.get(py).len().foreign("dict_len")?;
        Ok(Value::Integer(len as i64))
    })
}

/// Missing keys read as nil; unhashable keys raise
pub fn index(lua: &Lua, this: &PyHandle, key: Value) -> BridgeResult<Value> {
    Python::with_gil(|py| {
        let dict = this
            .get(py)
            .downcast::<PyDict>()
            .map_err(|_| BridgeError::type_mismatch("dict_index", "handle does not hold a dict"))?;
        let key = marshal::to_foreign(lua, py, key)?;
        match dict.get_item(key).foreign("dict_index")? {
            Some(value) => marshal::push_foreign(lua, py, value),
            None => Ok(Value::Nil),
        }
    })
}

pub fn newindex(lua: &Lua, this: &PyHandle, key: Value, value: Value) -> BridgeResult<()> {
    Python::with_gil(|py| {
        let dict = this
            .get(py)
            .downcast::<PyDict>()
            .map_err(|_| BridgeError::type_mismatch("dict_newindex", "handle does not hold a dict"))?;
        let key = marshal::to_foreign(lua, py, key)?;
        if value.is_nil() {
            if dict.contains(&key).foreign("dict_newindex")? {
                dict.del_item(key).foreign("dict_newindex")?;
            }
            return Ok(());
        }
        let value = marshal::to_foreign(lua, py, value)?;
        dict.set_item(key, value).foreign("dict_newindex")
    })
}

fn operands(lua: &Lua, py: Python<'_>, a: &Value, b: &Value, op: &'static str, verb: &str) -> BridgeResult<(PyObject, PyObject)> {
    if !is_container_operand(a, ForeignKind::Dict) || !is_container_operand(b, ForeignKind::Dict) {
        return Err(BridgeError::operands(op, verb, a, b));
    }
    Ok((
        container_operand(lua, py, a, to_foreign)?,
        container_operand(lua, py, b, to_foreign)?,
    ))
}

pub fn merge(lua: &Lua, a: Value, b: Value) -> BridgeResult<Value> {
    Python::with_gil(|py| {
        let (lhs, rhs) = operands(lua, py, &a, &b, "dict_add", "merge")?;
        let result = dict_of(py, &lhs, "dict_add")?.copy().foreign("dict_add")?;
        for (key, value) in dict_of(py, &rhs, "dict_add")?.iter() {
            result.set_item(key, value).foreign("dict_add")?;
        }
        marshal::push_foreign(lua, py, result)
    })
}

pub fn intersect(lua: &Lua, a: Value, b: Value) -> BridgeResult<Value> {
    Python::with_gil(|py| {
        let (lhs, rhs) = operands(lua, py, &a, &b, "dict_mul", "intersect")?;
        let right = dict_of(py, &rhs, "dict_mul")?;
        let result = PyDict::new(py);
        for (key, value) in dict_of(py, &lhs, "dict_mul")?.iter() {
            if right.contains(key).foreign("dict_mul")? {
                result.set_item(key, value).foreign("dict_mul")?;
            }
        }
        marshal::push_foreign(lua, py, result)
    })
}

pub fn difference(lua: &Lua, a: Value, b: Value) -> BridgeResult<Value> {
    Python::with_gil(|py| {
        let (lhs, rhs) = operands(lua, py, &a, &b, "dict_sub", "subtract")?;
        let right = dict_of(py, &rhs, "dict_sub")?;
        let result = PyDict::new(py);
        for (key, value) in dict_of(py, &lhs, "dict_sub")?.iter() {
            if !right.contains(key).foreign("dict_sub")? {
                result.set_item(key, value).foreign("dict_sub")?;
            }
        }
        marshal::push_foreign(lua, py, result)
    })
}

/// Iterate `(key, value)` entries; resizing the dict mid-iteration raises
pub fn pairs(lua: &Lua, this: &PyHandle) -> BridgeResult<(Function, Value, Value)> {
    let items = Python::with_gil(|py| -> BridgeResult<PyObject> {
        let items = this.get(py).call_method0("items").foreign("dict_pairs")?;
        Ok(items.iter().foreign("dict_pairs")?.to_object(py))
    })?;
    iterator_pairs(lua, items, true)
}
