//! Boolean proxies
//!
//! Python booleans normally cross as Lua booleans. `python.bool(v)` creates an
//! explicit proxy for callers that need the Python object itself; its truth is
//! read by identity with the `True` singleton.

use mlua::{Lua, Value};
use pyo3::types::PyBool;
use pyo3::{PyAny, Python, ToPyObject};

use crate::errors::{BridgeError, BridgeResult};
use crate::ffi::{handle_of, PyHandle};
use crate::interop::{marshal, ForeignKind, ProxyVTable};

use super::object;

pub static VTABLE: ProxyVTable = ProxyVTable {
    band: Some(and),
    bor: Some(or),
    bnot: Some(not),
    eq,
    tostring,
    ..ProxyVTable::base(ForeignKind::Boolean)
};

pub fn to_native(obj: &PyAny) -> Value {
    Value::Boolean(is_true(obj))
}

fn is_true(obj: &PyAny) -> bool {
    obj.is(PyBool::new(obj.py(), true))
}

/// `python.bool(v)`: Lua truthiness (only nil and false are false)
pub fn make(lua: &Lua, value: Value) -> BridgeResult<Value> {
    let truth = !matches!(value, Value::Nil | Value::Boolean(false));
    Python::with_gil(|py| marshal::wrap(lua, PyBool::new(py, truth).to_object(py), ForeignKind::Boolean))
}

/// Truth of a boolean operand, or `None` if it isn't one
fn truth(py: Python<'_>, value: &Value) -> Option<bool> {
    match value {
        Value::Boolean(b) => Some(*b),
        other => handle_of(other)
            .filter(|handle| handle.kind() == ForeignKind::Boolean)
            .map(|handle| is_true(handle.get(py))),
    }
}

fn operands(a: &Value, b: &Value, name: &'static str, verb: &str) -> BridgeResult<(bool, bool)> {
    Python::with_gil(|py| match (truth(py, a), truth(py, b)) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => Err(BridgeError::operands(name, verb, a, b)),
    })
}

/// Handles of another kind compare by Python equality instead of failing
pub fn eq(lua: &Lua, a: Value, b: Value) -> BridgeResult<bool> {
    let truths = Python::with_gil(|py| (truth(py, &a), truth(py, &b)));
    match truths {
        (Some(x), Some(y)) => Ok(x == y),
        _ => object::eq(lua, a, b),
    }
}

pub fn and(_lua: &Lua, a: Value, b: Value) -> BridgeResult<Value> {
    let (x, y) = operands(&a, &b, "boolean_and", "perform bitwise operation on")?;
    Ok(Value::Boolean(x && y))
}

pub fn or(_lua: &Lua, a: Value, b: Value) -> BridgeResult<Value> {
    let (x, y) = operands(&a, &b, "boolean_or", "perform bitwise operation on")?;
    Ok(Value::Boolean(x || y))
}

pub fn not(_lua: &Lua, this: &PyHandle) -> BridgeResult<Value> {
    Python::with_gil(|py| Ok(Value::Boolean(!is_true(this.get(py)))))
}

pub fn tostring(_lua: &Lua, this: &PyHandle) -> BridgeResult<String> {
    Python::with_gil(|py| Ok(is_true(this.get(py)).to_string()))
}
