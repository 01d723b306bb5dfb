//! Value router - moves values across the boundary in both directions
//!
//! Lua -> Python: natives convert by value, tables are copied into a list or
//! dict by shape, handles unwrap to the object they hold.
//!
//! Python -> Lua: None, booleans, machine-sized numbers and strings become
//! Lua natives; every other kind is wrapped in a handle.

use std::cell::RefCell;
use std::ffi::c_void;

use mlua::{Lua, Table, Value};
use pyo3::{PyAny, PyObject, Python, ToPyObject};

use crate::bridge::Bridge;
use crate::builtins::{boolean, dict, list, number, string};
use crate::errors::{BridgeError, BridgeResult};
use crate::ffi::{handle_of, PyHandle};
use crate::logging::trace;

use super::ForeignKind;

thread_local! {
    /// Tables whose conversion is in progress on this thread
    static CONVERTING: RefCell<Vec<*const c_void>> = const { RefCell::new(Vec::new()) };
}

/// Marks a table as being converted until dropped
pub(crate) struct TableVisit(*const c_void);

impl TableVisit {
    /// Fails when `table` already contains itself through the current path
    pub(crate) fn enter(table: &Table, target: &'static str) -> BridgeResult<Self> {
        let ptr = table.to_pointer();
        CONVERTING.with(|active| {
            let mut active = active.borrow_mut();
            if active.contains(&ptr) {
                trace!(target: "marshal", depth = active.len(), "table contains itself");
                return Err(BridgeError::conversion(
                    target,
                    "table",
                    BridgeError::type_mismatch("to_foreign", "table contains itself"),
                ));
            }
            active.push(ptr);
            Ok(Self(ptr))
        })
    }
}

impl Drop for TableVisit {
    fn drop(&mut self) {
        CONVERTING.with(|active| {
            let mut active = active.borrow_mut();
            if let Some(pos) = active.iter().rposition(|&ptr| ptr == self.0) {
                active.remove(pos);
            }
        });
    }
}

/// Push a Python object to Lua, copying natives and proxying the rest
pub fn push_foreign(lua: &Lua, py: Python<'_>, obj: &PyAny) -> BridgeResult<Value> {
    match ForeignKind::classify(obj) {
        ForeignKind::None => Ok(Value::Nil),
        ForeignKind::Boolean => Ok(boolean::to_native(obj)),
        ForeignKind::Number => number::push(lua, py, obj),
        ForeignKind::String => string::push(lua, py, obj),
        kind => wrap(lua, obj.to_object(py), kind),
    }
}

/// Wrap `obj` in a handle of the given kind. The reference is donated.
pub fn wrap(lua: &Lua, obj: PyObject, kind: ForeignKind) -> BridgeResult<Value> {
    let vtable = Bridge::get(lua)?.registry().get(kind);
    let handle = PyHandle::wrap(obj, vtable);
    Ok(Value::UserData(lua.create_userdata(handle)?))
}

/// Convert a Lua value to a new Python reference
pub fn to_foreign(lua: &Lua, py: Python<'_>, value: Value) -> BridgeResult<PyObject> {
    match value {
        Value::Nil => Ok(py.None()),
        Value::Boolean(b) => Ok(b.to_object(py)),
        Value::Integer(i) => Ok(i.to_object(py)),
        Value::Number(n) => Ok(n.to_object(py)),
        Value::String(s) => string::to_foreign(py, &s),
        Value::Table(table) => {
            if is_sequence_table(&table)? {
                list::to_foreign(lua, py, &table)
            } else {
                dict::to_foreign(lua, py, &table)
            }
        }
        Value::UserData(_) => match handle_of(&value) {
            Some(handle) => Ok(handle.to_object(py)),
            None => Err(BridgeError::unsupported("to_foreign", &value)),
        },
        other => Err(BridgeError::unsupported("to_foreign", &other)),
    }
}

/// A table is a sequence when its keys are exactly `1..=#t`.
/// The empty table counts as a sequence.
pub fn is_sequence_table(table: &Table) -> BridgeResult<bool> {
    let len = table.raw_len();
    let mut count = 0usize;
    for pair in table.pairs::<Value, Value>() {
        let (key, _) = pair?;
        let in_range = match key {
            Value::Integer(i) => i >= 1 && (i as usize) <= len,
            _ => false,
        };
        if !in_range {
            trace!(target: "marshal", len, "table has non-sequence keys");
            return Ok(false);
        }
        count += 1;
    }
    Ok(count == len)
}
