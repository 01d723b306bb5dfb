//! Callable invoker
//!
//! Design: arguments are converted left to right into a fresh tuple. A single
//! table argument whose string keys all name parameters of the callee is
//! spread into keyword arguments instead (integer keys `1..=n` stay
//! positional). Signature lookup failures fall back to the plain path.
//!
//! Methods are called with dot syntax. `obj:m(x)` reaches Python as
//! `obj.m(obj, x)` because Lua cannot tell the two forms apart.

use mlua::{Lua, MultiValue, Table, Value};
use pyo3::types::{PyDict, PyTuple};
use pyo3::{PyAny, PyObject, PyResult, Python};

use crate::bridge::{Bridge, ForeignHelpers};
use crate::errors::{BridgeError, BridgeResult};
use crate::ffi::PyHandle;
use crate::logging::{debug, trace};

use super::marshal;

/// Parameter names accepted by a callee
struct Signature {
    names: Vec<String>,
    var_keyword: bool,
}

impl Signature {
    fn inspect(py: Python<'_>, helpers: &ForeignHelpers, callable: &PyAny) -> PyResult<Self> {
        let signature = helpers.signature.as_ref(py).call1((callable,))?;
        let parameters = signature.getattr("parameters")?.call_method0("values")?;
        let var_keyword = helpers.var_keyword.as_ref(py);

        let mut names = Vec::new();
        let mut accepts_any = false;
        for parameter in parameters.iter()? {
            let parameter = parameter?;
            if parameter.getattr("kind")?.is(var_keyword) {
                accepts_any = true;
            }
            names.push(parameter.getattr("name")?.extract::<String>()?);
        }
        Ok(Self {
            names,
            var_keyword: accepts_any,
        })
    }

    fn accepts(&self, name: &str) -> bool {
        self.var_keyword || self.names.iter().any(|n| n == name)
    }
}

/// `__call` for callable handles
pub fn invoke(lua: &Lua, this: &PyHandle, args: MultiValue) -> BridgeResult<Value> {
    let bridge = Bridge::get(lua)?;
    Python::with_gil(|py| {
        let callable = this.get(py);
        let args: Vec<Value> = args.into_iter().collect();

        let op = callable_name(callable);
        trace!(target: "ffi", callee = %op, args = args.len(), "calling python");

        if let [Value::Table(table)] = args.as_slice() {
            if let Some((positional, keywords)) = keyword_arguments(lua, py, bridge.helpers(), callable, table)? {
                let result = callable.call(positional, Some(keywords));
                return finish(lua, py, &bridge, &op, result);
            }
        }

        let mut converted: Vec<PyObject> = Vec::with_capacity(args.len());
        for (i, arg) in args.into_iter().enumerate() {
            let obj = marshal::to_foreign(lua, py, arg)
                .map_err(|e| BridgeError::conversion("argument", format!("argument #{}", i + 1), e))?;
            converted.push(obj);
        }
        let result = callable.call1(PyTuple::new(py, converted));
        finish(lua, py, &bridge, &op, result)
    })
}

fn finish(
    lua: &Lua,
    py: Python<'_>,
    bridge: &Bridge,
    op: &str,
    result: PyResult<&PyAny>,
) -> BridgeResult<Value> {
    match result {
        Ok(value) => marshal::push_foreign(lua, py, value),
        Err(err) => Err(bridge.drain(py, op, err)),
    }
}

/// Split a single table argument into positional and keyword arguments.
/// `None` means the table should be passed as one positional argument.
fn keyword_arguments<'py>(
    lua: &Lua,
    py: Python<'py>,
    helpers: &ForeignHelpers,
    callable: &'py PyAny,
    table: &Table,
) -> BridgeResult<Option<(&'py PyTuple, &'py PyDict)>> {
    let len = table.raw_len();
    let mut names = Vec::new();
    let mut positional = 0usize;
    for pair in table.pairs::<Value, Value>() {
        let (key, _) = pair?;
        match key {
            Value::String(name) => match std::str::from_utf8(&name.as_bytes()) {
                Ok(name) => names.push(name.to_owned()),
                Err(_) => return Ok(None),
            },
            Value::Integer(i) if i >= 1 && (i as usize) <= len => positional += 1,
            _ => return Ok(None),
        }
    }
    if names.is_empty() || positional != len {
        return Ok(None);
    }

    let signature = match Signature::inspect(py, helpers, callable) {
        Ok(signature) => signature,
        Err(err) => {
            debug!(target: "ffi", error = %err, "signature unavailable, passing table positionally");
            return Ok(None);
        }
    };
    if let Some(unknown) = names.iter().find(|name| !signature.accepts(name)) {
        debug!(target: "ffi", parameter = %unknown, "not a declared parameter, passing table positionally");
        return Ok(None);
    }

    let mut args = Vec::with_capacity(len);
    for i in 1..=len {
        let value: Value = table.raw_get(i)?;
        let obj = marshal::to_foreign(lua, py, value)
            .map_err(|e| BridgeError::conversion("argument", format!("argument #{}", i), e))?;
        args.push(obj);
    }
    let keywords = PyDict::new(py);
    for name in &names {
        let value: Value = table.raw_get(name.as_str())?;
        let obj = marshal::to_foreign(lua, py, value)
            .map_err(|e| BridgeError::conversion("argument", format!("keyword '{}'", name), e))?;
        keywords
            .set_item(name.as_str(), obj)
            .map_err(|err| BridgeError::ForeignCall {
                op: "call".to_string(),
                message: err.to_string(),
            })?;
    }

    trace!(target: "ffi", positional = len, keywords = names.len(), "spreading table into keyword call");
    Ok(Some((PyTuple::new(py, args), keywords)))
}

/// Qualified name of a callable for error messages
pub fn callable_name(callable: &PyAny) -> String {
    callable
        .getattr("__qualname__")
        .or_else(|_| callable.getattr("__name__"))
        .and_then(|name| name.extract::<String>())
        .or_else(|_| callable.get_type().name().map(str::to_owned))
        .unwrap_or_else(|_| "<callable>".to_string())
}
