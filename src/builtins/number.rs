//! Number proxies
//!
//! Python ints that fit in an i64 and all floats cross as Lua numbers. What
//! remains (big ints beyond f64 range, complex, Decimal, Fraction, ...) stays
//! wrapped and routes arithmetic to the PyNumber protocol.
//!
//! Performance: when both operands are Lua numbers the operation is computed
//! natively with Lua 5.4 semantics and never touches the interpreter.

use mlua::{Lua, Value};
use pyo3::basic::CompareOp;
use pyo3::ffi;
use pyo3::types::{PyFloat, PyLong};
use pyo3::{AsPyPointer, PyAny, PyObject, Python, ToPyObject};

use crate::errors::{BridgeError, BridgeResult, ForeignResultExt};
use crate::ffi::{handle_of, PyHandle};
use crate::interop::{marshal, ForeignKind, Operator, ProxyVTable};

use super::{handle_kind, object, protocol_binary, protocol_unary, ProtocolFn};

pub static VTABLE: ProxyVTable = ProxyVTable {
    add: Some(add),
    sub: Some(sub),
    mul: Some(mul),
    div: Some(div),
    mod_: Some(modulo),
    pow: Some(pow),
    idiv: Some(idiv),
    band: Some(band),
    bor: Some(bor),
    bxor: Some(bxor),
    shl: Some(shl),
    shr: Some(shr),
    concat: Some(concat),
    unm: Some(unm),
    bnot: Some(bnot),
    len: Some(len),
    eq,
    lt: Some(lt),
    le: Some(le),
    tostring: super::object::plain_tostring,
    ..ProxyVTable::base(ForeignKind::Number)
};

/// Lua-native rendering of a Python number, if it has one
pub fn to_native(obj: &PyAny) -> Option<Value> {
    if let Ok(float) = obj.downcast::<PyFloat>() {
        return Some(Value::Number(float.value()));
    }
    if obj.is_instance_of::<PyLong>() {
        if let Ok(int) = obj.extract::<i64>() {
            return Some(Value::Integer(int));
        }
        if let Ok(float) = obj.extract::<f64>() {
            return Some(Value::Number(float));
        }
    }
    None
}

/// Router entry: native when representable, otherwise a number handle
pub fn push(lua: &Lua, py: Python<'_>, obj: &PyAny) -> BridgeResult<Value> {
    match to_native(obj) {
        Some(value) => Ok(value),
        None => marshal::wrap(lua, obj.to_object(py), ForeignKind::Number),
    }
}

#[derive(Debug, Clone, Copy)]
enum Native {
    Int(i64),
    Float(f64),
}

impl Native {
    fn of(value: &Value) -> Option<Self> {
        match *value {
            Value::Integer(i) => Some(Self::Int(i)),
            Value::Number(n) => Some(Self::Float(n)),
            _ => None,
        }
    }

    fn float(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }

    fn integer(self) -> BridgeResult<i64> {
        match self {
            Self::Int(i) => Ok(i),
            Self::Float(f) if f.fract() == 0.0 && f >= -(2f64.powi(63)) && f < 2f64.powi(63) => Ok(f as i64),
            Self::Float(_) => Err(lua_error("number has no integer representation")),
        }
    }
}

fn lua_error(message: &str) -> BridgeError {
    BridgeError::Lua(mlua::Error::RuntimeError(message.to_string()))
}

fn lua_mod_float(a: f64, b: f64) -> f64 {
    let m = a % b;
    if (m > 0.0 && b < 0.0) || (m < 0.0 && b > 0.0) {
        m + b
    } else {
        m
    }
}

fn lua_shift_left(x: i64, n: i64) -> i64 {
    if n <= -64 || n >= 64 {
        0
    } else if n >= 0 {
        ((x as u64) << n) as i64
    } else {
        ((x as u64) >> -n) as i64
    }
}

/// Lua 5.4 arithmetic on two native numbers
fn native(op: Operator, a: Native, b: Native) -> BridgeResult<Value> {
    use Native::{Float, Int};

    let value = match (op, a, b) {
        (Operator::Add, Int(x), Int(y)) => Value::Integer(x.wrapping_add(y)),
        (Operator::Sub, Int(x), Int(y)) => Value::Integer(x.wrapping_sub(y)),
        (Operator::Mul, Int(x), Int(y)) => Value::Integer(x.wrapping_mul(y)),
        (Operator::Add, ..) => Value::Number(a.float() + b.float()),
        (Operator::Sub, ..) => Value::Number(a.float() - b.float()),
        (Operator::Mul, ..) => Value::Number(a.float() * b.float()),
        (Operator::Div, ..) => Value::Number(a.float() / b.float()),
        (Operator::Pow, ..) => Value::Number(a.float().powf(b.float())),
        (Operator::Mod, Int(_), Int(0)) => return Err(lua_error("attempt to perform 'n%0'")),
        (Operator::Mod, Int(x), Int(y)) => {
            let m = x.wrapping_rem(y);
            Value::Integer(if m != 0 && (m ^ y) < 0 { m + y } else { m })
        }
        (Operator::Mod, ..) => Value::Number(lua_mod_float(a.float(), b.float())),
        (Operator::IDiv, Int(_), Int(0)) => return Err(lua_error("attempt to perform 'n//0'")),
        (Operator::IDiv, Int(x), Int(y)) => {
            let q = x.wrapping_div(y);
            Value::Integer(if x.wrapping_rem(y) != 0 && (x ^ y) < 0 { q - 1 } else { q })
        }
        (Operator::IDiv, ..) => Value::Number((a.float() / b.float()).floor()),
        (Operator::BAnd, ..) => Value::Integer(a.integer()? & b.integer()?),
        (Operator::BOr, ..) => Value::Integer(a.integer()? | b.integer()?),
        (Operator::BXor, ..) => Value::Integer(a.integer()? ^ b.integer()?),
        (Operator::Shl, ..) => Value::Integer(lua_shift_left(a.integer()?, b.integer()?)),
        (Operator::Shr, ..) => Value::Integer(lua_shift_left(a.integer()?, b.integer()?.wrapping_neg())),
        (Operator::Concat, ..) => return Err(BridgeError::type_mismatch("number_concat", "attempt to concatenate numbers")),
    };
    Ok(value)
}

fn is_operand(value: &Value) -> bool {
    matches!(value, Value::Integer(_) | Value::Number(_)) || handle_kind(value) == Some(ForeignKind::Number)
}

fn operand(py: Python<'_>, value: &Value) -> BridgeResult<PyObject> {
    match *value {
        Value::Integer(i) => Ok(i.to_object(py)),
        Value::Number(n) => Ok(n.to_object(py)),
        _ => match handle_of(value) {
            Some(handle) => Ok(handle.to_object(py)),
            None => Err(BridgeError::unsupported("number", value)),
        },
    }
}

fn protocol(op: Operator) -> Option<ProtocolFn> {
    let f: ProtocolFn = match op {
        Operator::Add => ffi::PyNumber_Add,
        Operator::Sub => ffi::PyNumber_Subtract,
        Operator::Mul => ffi::PyNumber_Multiply,
        Operator::Div => ffi::PyNumber_TrueDivide,
        Operator::Mod => ffi::PyNumber_Remainder,
        Operator::IDiv => ffi::PyNumber_FloorDivide,
        Operator::BAnd => ffi::PyNumber_And,
        Operator::BOr => ffi::PyNumber_Or,
        Operator::BXor => ffi::PyNumber_Xor,
        Operator::Shl => ffi::PyNumber_Lshift,
        Operator::Shr => ffi::PyNumber_Rshift,
        Operator::Pow | Operator::Concat => return None,
    };
    Some(f)
}

fn arith(lua: &Lua, op: Operator, name: &'static str, a: Value, b: Value) -> BridgeResult<Value> {
    if !is_operand(&a) || !is_operand(&b) {
        return Err(BridgeError::operands(name, op.verb(), &a, &b));
    }
    if let (Some(x), Some(y)) = (Native::of(&a), Native::of(&b)) {
        return native(op, x, y);
    }
    if op == Operator::Concat {
        return Err(BridgeError::operands(name, op.verb(), &a, &b));
    }

    Python::with_gil(|py| {
        let lhs = operand(py, &a)?;
        let rhs = operand(py, &b)?;
        let (lhs, rhs) = (lhs.as_ref(py), rhs.as_ref(py));
        let result = match protocol(op) {
            Some(f) => protocol_binary(py, f, lhs, rhs),
            // SAFETY: operands live for the GIL scope; result is a new reference or null
            None => unsafe { py.from_owned_ptr_or_err(ffi::PyNumber_Power(lhs.as_ptr(), rhs.as_ptr(), ffi::Py_None())) },
        }
        .foreign(name)?;
        marshal::push_foreign(lua, py, result)
    })
}

pub fn add(lua: &Lua, a: Value, b: Value) -> BridgeResult<Value> {
    arith(lua, Operator::Add, "number_add", a, b)
}

pub fn sub(lua: &Lua, a: Value, b: Value) -> BridgeResult<Value> {
    arith(lua, Operator::Sub, "number_sub", a, b)
}

pub fn mul(lua: &Lua, a: Value, b: Value) -> BridgeResult<Value> {
    arith(lua, Operator::Mul, "number_mul", a, b)
}

pub fn div(lua: &Lua, a: Value, b: Value) -> BridgeResult<Value> {
    arith(lua, Operator::Div, "number_div", a, b)
}

pub fn modulo(lua: &Lua, a: Value, b: Value) -> BridgeResult<Value> {
    arith(lua, Operator::Mod, "number_mod", a, b)
}

pub fn pow(lua: &Lua, a: Value, b: Value) -> BridgeResult<Value> {
    arith(lua, Operator::Pow, "number_pow", a, b)
}

pub fn idiv(lua: &Lua, a: Value, b: Value) -> BridgeResult<Value> {
    arith(lua, Operator::IDiv, "number_idiv", a, b)
}

pub fn band(lua: &Lua, a: Value, b: Value) -> BridgeResult<Value> {
    arith(lua, Operator::BAnd, "number_band", a, b)
}

pub fn bor(lua: &Lua, a: Value, b: Value) -> BridgeResult<Value> {
    arith(lua, Operator::BOr, "number_bor", a, b)
}

pub fn bxor(lua: &Lua, a: Value, b: Value) -> BridgeResult<Value> {
    arith(lua, Operator::BXor, "number_bxor", a, b)
}

pub fn shl(lua: &Lua, a: Value, b: Value) -> BridgeResult<Value> {
    arith(lua, Operator::Shl, "number_shl", a, b)
}

pub fn shr(lua: &Lua, a: Value, b: Value) -> BridgeResult<Value> {
    arith(lua, Operator::Shr, "number_shr", a, b)
}

pub fn concat(lua: &Lua, a: Value, b: Value) -> BridgeResult<Value> {
    arith(lua, Operator::Concat, "number_concat", a, b)
}

pub fn unm(lua: &Lua, this: &PyHandle) -> BridgeResult<Value> {
    Python::with_gil(|py| {
        let result = protocol_unary(py, ffi::PyNumber_Negative, this.get(py)).foreign("number_unm")?;
        marshal::push_foreign(lua, py, result)
    })
}

pub fn bnot(lua: &Lua, this: &PyHandle) -> BridgeResult<Value> {
    Python::with_gil(|py| {
        let result = protocol_unary(py, ffi::PyNumber_Invert, this.get(py)).foreign("number_bnot")?;
        marshal::push_foreign(lua, py, result)
    })
}

pub fn len(_lua: &Lua, this: &PyHandle) -> BridgeResult<Value> {
    Python::with_gil(|py| {
        let len = this.get(py).len().foreign("number_len")?;
        Ok(Value::Integer(len as i64))
    })
}

fn compare(op: CompareOp, name: &'static str, a: Value, b: Value) -> BridgeResult<bool> {
    if !is_operand(&a) || !is_operand(&b) {
        return Err(BridgeError::operands(name, "compare", &a, &b));
    }
    if let (Some(x), Some(y)) = (Native::of(&a), Native::of(&b)) {
        let ordering = match (x, y) {
            (Native::Int(x), Native::Int(y)) => Some(x.cmp(&y)),
            _ => x.float().partial_cmp(&y.float()),
        };
        return Ok(match op {
            CompareOp::Eq => ordering == Some(std::cmp::Ordering::Equal),
            CompareOp::Lt => ordering == Some(std::cmp::Ordering::Less),
            _ => matches!(ordering, Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)),
        });
    }
    Python::with_gil(|py| {
        let lhs = operand(py, &a)?;
        let rhs = operand(py, &b)?;
        lhs.as_ref(py)
            .rich_compare(rhs, op)
            .and_then(|result| result.is_true())
            .foreign(name)
    })
}

/// Handles of another kind compare by Python equality instead of failing
pub fn eq(lua: &Lua, a: Value, b: Value) -> BridgeResult<bool> {
    if !is_operand(&a) || !is_operand(&b) {
        return object::eq(lua, a, b);
    }
    compare(CompareOp::Eq, "number_eq", a, b)
}

pub fn lt(_lua: &Lua, a: Value, b: Value) -> BridgeResult<bool> {
    compare(CompareOp::Lt, "number_lt", a, b)
}

pub fn le(_lua: &Lua, a: Value, b: Value) -> BridgeResult<bool> {
    compare(CompareOp::Le, "number_le", a, b)
}
