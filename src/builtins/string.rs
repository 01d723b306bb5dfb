//! String conversion and string proxies
//!
//! Python `str` crosses as a Lua string holding its UTF-8 encoding. A `str`
//! that has no UTF-8 encoding (lone surrogates) is an encoding error, or a
//! string proxy when `strings.wrap_unencodable` is set.

use mlua::{Lua, Value};
use pyo3::basic::CompareOp;
use pyo3::types::PyString;
use pyo3::{ffi, PyAny, PyObject, Python, ToPyObject};

use crate::bridge::Bridge;
use crate::errors::{BridgeError, BridgeResult, ForeignResultExt};
use crate::ffi::{handle_of, PyHandle};
use crate::interop::{marshal, ForeignKind, ProxyVTable};
use crate::logging::debug;

use super::{handle_kind, object, protocol_binary, sequence_repeat};

pub static VTABLE: ProxyVTable = ProxyVTable {
    concat: Some(concat),
    mul: Some(repeat),
    len: Some(len),
    eq,
    lt: Some(lt),
    le: Some(le),
    index: Some(super::object::index),
    tostring: super::object::plain_tostring,
    ..ProxyVTable::base(ForeignKind::String)
};

/// Router entry for Python `str`
pub fn push(lua: &Lua, py: Python<'_>, obj: &PyAny) -> BridgeResult<Value> {
    let text = obj
        .downcast::<PyString>()
        .map_err(|_| BridgeError::type_mismatch("string_push", "expected python str"))?;
    match text.to_str() {
        Ok(text) => Ok(Value::String(lua.create_string(text)?)),
        Err(err) => {
            if Bridge::get(lua)?.config().strings.wrap_unencodable {
                debug!(target: "marshal", error = %err, "wrapping unencodable python str");
                marshal::wrap(lua, obj.to_object(py), ForeignKind::String)
            } else {
                Err(BridgeError::encoding("python str"))
            }
        }
    }
}

/// Lua string to Python `str`. Bytes must be valid UTF-8.
pub fn to_foreign(py: Python<'_>, value: &mlua::String) -> BridgeResult<PyObject> {
    let bytes = value.as_bytes();
    let text = std::str::from_utf8(&bytes).map_err(|_| BridgeError::encoding("lua string"))?;
    Ok(PyString::new(py, text).to_object(py))
}

/// Python view of a string operand. Numbers are coerced the way Lua coerces
/// them for concatenation.
fn operand(lua: &Lua, py: Python<'_>, value: &Value) -> BridgeResult<PyObject> {
    if let Some(handle) = handle_of(value) {
        return Ok(handle.to_object(py));
    }
    match lua.coerce_string(value.clone())? {
        Some(text) => to_foreign(py, &text),
        None => Err(BridgeError::unsupported("string", value)),
    }
}

fn is_handle(value: &Value) -> bool {
    handle_kind(value) == Some(ForeignKind::String)
}

fn is_text(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Integer(_) | Value::Number(_)) || is_handle(value)
}

pub fn concat(lua: &Lua, a: Value, b: Value) -> BridgeResult<Value> {
    if !is_text(&a) || !is_text(&b) {
        return Err(BridgeError::operands("string_concat", "concatenate", &a, &b));
    }
    if !is_handle(&a) && !is_handle(&b) {
        let mut joined = Vec::new();
        for value in [&a, &b] {
            if let Some(text) = lua.coerce_string(value.clone())? {
                joined.extend_from_slice(&text.as_bytes());
            }
        }
        return Ok(Value::String(lua.create_string(joined)?));
    }
    Python::with_gil(|py| {
        let lhs = operand(lua, py, &a)?;
        let rhs = operand(lua, py, &b)?;
        let result = protocol_binary(py, ffi::PyUnicode_Concat, lhs.as_ref(py), rhs.as_ref(py))
            .foreign("string_concat")?;
        marshal::push_foreign(lua, py, result)
    })
}

/// `s * n` repeats the string
pub fn repeat(lua: &Lua, a: Value, b: Value) -> BridgeResult<Value> {
    let (text, count) = match (&a, &b) {
        (text, Value::Integer(n)) if is_text(text) => (text, *n),
        (Value::Integer(n), text) if is_text(text) => (text, *n),
        _ => return Err(BridgeError::operands("string_mul", "multiply", &a, &b)),
    };
    Python::with_gil(|py| {
        let text = operand(lua, py, text)?;
        let result = sequence_repeat(py, text.as_ref(py), count).foreign("string_mul")?;
        marshal::push_foreign(lua, py, result)
    })
}

pub fn len(_lua: &Lua, this: &PyHandle) -> BridgeResult<Value> {
    Python::with_gil(|py| {
        let len = this.get(py).len().foreign("string_len")?;
        Ok(Value::Integer(len as i64))
    })
}

fn is_comparable(value: &Value) -> bool {
    matches!(value, Value::String(_)) || is_handle(value)
}

fn compare(lua: &Lua, op: CompareOp, name: &'static str, a: Value, b: Value) -> BridgeResult<bool> {
    if !is_comparable(&a) || !is_comparable(&b) {
        return Err(BridgeError::operands(name, "compare", &a, &b));
    }
    Python::with_gil(|py| {
        let lhs = operand(lua, py, &a)?;
        let rhs = operand(lua, py, &b)?;
        lhs.as_ref(py)
            .rich_compare(rhs, op)
            .and_then(|result| result.is_true())
            .foreign(name)
    })
}

pub fn eq(lua: &Lua, a: Value, b: Value) -> BridgeResult<bool> {
    if !is_comparable(&a) || !is_comparable(&b) {
        return object::eq(lua, a, b);
    }
    compare(lua, CompareOp::Eq, "string_eq", a, b)
}

pub fn lt(lua: &Lua, a: Value, b: Value) -> BridgeResult<bool> {
    compare(lua, CompareOp::Lt, "string_lt", a, b)
}

pub fn le(lua: &Lua, a: Value, b: Value) -> BridgeResult<bool> {
    compare(lua, CompareOp::Le, "string_le", a, b)
}
