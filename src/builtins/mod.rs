//! Per-kind converters and operator dispatchers
//!
//! Design: each kind module exposes a static `VTABLE` plus its converters.
//! Dispatchers validate operand shapes first, then normalize both operands to
//! Python objects and defer to the corresponding Python protocol entry point.

pub mod boolean;
pub mod callable;
pub mod dict;
pub mod iter;
pub mod list;
pub mod module;
pub mod number;
pub mod object;
pub mod set;
pub mod string;
pub mod tuple;


use mlua::{Function, Lua, Table, Value};
use pyo3::{ffi, AsPyPointer, PyAny, PyObject, PyResult, Python};

use crate::errors::{BridgeError, BridgeResult, ForeignResultExt};
use crate::ffi::handle_of;
use crate::interop::marshal::{self, TableVisit};
use crate::interop::ForeignKind;
use crate::logging::trace;

/// Two-argument entry point of the Python C API
pub(crate) type ProtocolFn = unsafe extern "C" fn(*mut ffi::PyObject, *mut ffi::PyObject) -> *mut ffi::PyObject;

/// Call a binary protocol function, taking ownership of its new reference
pub(crate) fn protocol_binary<'py>(
    py: Python<'py>,
    f: ProtocolFn,
    lhs: &PyAny,
    rhs: &PyAny,
) -> PyResult<&'py PyAny> {
    // SAFETY: both operands are live for this GIL scope; the result is a new
    // reference or null with the error indicator set
    unsafe { py.from_owned_ptr_or_err(f(lhs.as_ptr(), rhs.as_ptr())) }
}

pub(crate) fn protocol_unary<'py>(
    py: Python<'py>,
    f: unsafe extern "C" fn(*mut ffi::PyObject) -> *mut ffi::PyObject,
    operand: &PyAny,
) -> PyResult<&'py PyAny> {
    // SAFETY: as for `protocol_binary`
    unsafe { py.from_owned_ptr_or_err(f(operand.as_ptr())) }
}

/// `seq * count` through the sequence protocol
pub(crate) fn sequence_repeat<'py>(py: Python<'py>, seq: &PyAny, count: i64) -> PyResult<&'py PyAny> {
    let count = count.clamp(ffi::Py_ssize_t::MIN as i64, ffi::Py_ssize_t::MAX as i64) as ffi::Py_ssize_t;
    // SAFETY: as for `protocol_binary`
    unsafe { py.from_owned_ptr_or_err(ffi::PySequence_Repeat(seq.as_ptr(), count)) }
}

/// Kind of the handle inside `value`, if it holds one
pub(crate) fn handle_kind(value: &Value) -> Option<ForeignKind> {
    handle_of(value).map(|handle| handle.kind())
}

/// Container operand: a Lua table or a handle of the given kind
pub(crate) fn is_container_operand(value: &Value, kind: ForeignKind) -> bool {
    matches!(value, Value::Table(_)) || handle_kind(value) == Some(kind)
}

/// Normalize a validated container operand to a Python object.
/// Tables go through `convert`; handles yield their object.
pub(crate) fn container_operand(
    lua: &Lua,
    py: Python<'_>,
    value: &Value,
    convert: fn(&Lua, Python<'_>, &Table) -> BridgeResult<PyObject>,
) -> BridgeResult<PyObject> {
    match value {
        Value::Table(table) => convert(lua, py, table),
        other => match handle_of(other) {
            Some(handle) => Ok(handle.to_object(py)),
            None => Err(BridgeError::unsupported("operand", other)),
        },
    }
}

/// Integer view of an index key; integral floats count
pub(crate) fn integer_key(key: &Value) -> Option<i64> {
    match *key {
        Value::Integer(i) => Some(i),
        Value::Number(n) if n.fract() == 0.0 && n.is_finite() => Some(n as i64),
        _ => None,
    }
}

/// Convert table elements `1..=#t` into Python objects
pub(crate) fn collect_sequence(
    lua: &Lua,
    py: Python<'_>,
    table: &Table,
    target: &'static str,
) -> BridgeResult<Vec<PyObject>> {
    let _visit = TableVisit::enter(table, target)?;
    let len = table.len()?;
    let mut items = Vec::with_capacity(len.max(0) as usize);
    for i in 1..=len {
        let value: Value = table.get(i)?;
        let item = marshal::to_foreign(lua, py, value)
            .map_err(|e| BridgeError::conversion(target, format!("element {}", i), e))?;
        items.push(item);
    }
    Ok(items)
}

/// 1-based read from a Python sequence; out-of-range reads yield nil
pub(crate) fn sequence_get(lua: &Lua, py: Python<'_>, seq: &PyAny, index: i64, op: &str) -> BridgeResult<Value> {
    let len = seq.len().foreign(op)?;
    if index < 1 || index as usize > len {
        return Ok(Value::Nil);
    }
    let item = seq.get_item(index as usize - 1).foreign(op)?;
    marshal::push_foreign(lua, py, item)
}

/// `pairs` over a Python sequence: yields `(i, seq[i])` for `i` in `1..=len`,
/// re-reading the length each step
pub(crate) fn sequence_pairs(lua: &Lua, seq: PyObject) -> BridgeResult<(Function, Value, Value)> {
    let next = lua.create_function(move |lua, (_, control): (Value, Value)| {
        let index = match control {
            Value::Integer(i) => i + 1,
            _ => 1,
        };
        let step = Python::with_gil(|py| -> BridgeResult<(Value, Value)> {
            let seq = seq.as_ref(py);
            if index as usize > seq.len().foreign("pairs")? {
                return Ok((Value::Nil, Value::Nil));
            }
            let item = seq.get_item(index as usize - 1).foreign("pairs")?;
            Ok((Value::Integer(index), marshal::push_foreign(lua, py, item)?))
        })?;
        Ok(step)
    })?;
    Ok((next, Value::Nil, Value::Nil))
}

/// `pairs` driven by a Python iterator. With `entries`, each item is a
/// `(key, value)` pair; otherwise items are numbered from 1. Entries whose key
/// is `None` are skipped, since a nil key would end the loop.
pub(crate) fn iterator_pairs(lua: &Lua, iterator: PyObject, entries: bool) -> BridgeResult<(Function, Value, Value)> {
    let next = lua.create_function(move |lua, (_, control): (Value, Value)| {
        let step = Python::with_gil(|py| -> BridgeResult<(Value, Value)> {
            let Ok(mut iterator) = iterator.as_ref(py).downcast::<pyo3::types::PyIterator>() else {
                return Err(BridgeError::type_mismatch("pairs", "iteration state is not an iterator"));
            };
            loop {
                let item = match iterator.next() {
                    Some(item) => item.foreign("pairs")?,
                    None => return Ok((Value::Nil, Value::Nil)),
                };
                if !entries {
                    let position = match control {
                        Value::Integer(i) => i + 1,
                        _ => 1,
                    };
                    return Ok((Value::Integer(position), marshal::push_foreign(lua, py, item)?));
                }
                let key = item.get_item(0).foreign("pairs")?;
                if key.is_none() {
                    trace!(target: "marshal", "skipping None key in pairs");
                    continue;
                }
                let value = item.get_item(1).foreign("pairs")?;
                return Ok((marshal::push_foreign(lua, py, key)?, marshal::push_foreign(lua, py, value)?));
            }
        })?;
        Ok(step)
    })?;
    Ok((next, Value::Nil, Value::Nil))
}
