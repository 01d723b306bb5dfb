//! Lua metamethod glue for foreign handles
//!
//! Every metamethod is registered on every handle; the handle's dispatcher
//! table decides whether the operation is supported. Binary metamethods may
//! see the handle as either operand, so the first operand that is a handle
//! selects the table.

use mlua::{MetaMethod, MultiValue, UserData, UserDataMethods, Value};

use crate::errors::BridgeError;
use crate::ffi::{handle_of, PyHandle};

use super::registry::{CompareOp, Operator, ProxyVTable, UnaryOp};

impl UserData for PyHandle {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        for op in Operator::ALL {
            methods.add_meta_function(op.metamethod(), move |lua, (a, b): (Value, Value)| {
                let table = operand_table(&a, &b);
                let Some(dispatch) = table.and_then(|t| t.binary(op)) else {
                    return Err(BridgeError::operands("binary", op.verb(), &a, &b).into());
                };
                Ok(dispatch(lua, a, b)?)
            });
        }

        methods.add_meta_method(MetaMethod::Unm, |lua, this, _: MultiValue| {
            Ok(unary(lua, this, this.vtable().unm, "negate")?)
        });
        methods.add_meta_method(MetaMethod::BNot, |lua, this, _: MultiValue| {
            Ok(unary(lua, this, this.vtable().bnot, "perform bitwise operation on")?)
        });
        methods.add_meta_method(MetaMethod::Len, |lua, this, _: MultiValue| {
            Ok(unary(lua, this, this.vtable().len, "get length of")?)
        });

        methods.add_meta_function(MetaMethod::Eq, |lua, (a, b): (Value, Value)| {
            match operand_table(&a, &b) {
                Some(table) => Ok((table.eq)(lua, a, b)?),
                None => Ok(false),
            }
        });
        methods.add_meta_function(MetaMethod::Lt, |lua, (a, b): (Value, Value)| {
            Ok(compare(lua, a, b, |t| t.lt)?)
        });
        methods.add_meta_function(MetaMethod::Le, |lua, (a, b): (Value, Value)| {
            Ok(compare(lua, a, b, |t| t.le)?)
        });

        methods.add_meta_method(MetaMethod::Index, |lua, this, key: Value| {
            match this.vtable().index {
                Some(index) => Ok(index(lua, this, key)?),
                None => Err(BridgeError::type_mismatch(
                    "index",
                    format!("attempt to index a python {} value", this.kind().name()),
                )
                .into()),
            }
        });
        methods.add_meta_method(MetaMethod::NewIndex, |lua, this, (key, value): (Value, Value)| {
            match this.vtable().newindex {
                Some(newindex) => Ok(newindex(lua, this, key, value)?),
                None => Err(BridgeError::type_mismatch(
                    "newindex",
                    format!("python {} does not support item assignment", this.kind().name()),
                )
                .into()),
            }
        });
        methods.add_meta_method(MetaMethod::Call, |lua, this, args: MultiValue| {
            match this.vtable().call {
                Some(call) => Ok(call(lua, this, args)?),
                None => Err(BridgeError::type_mismatch(
                    "call",
                    format!("attempt to call a python {} value", this.kind().name()),
                )
                .into()),
            }
        });
        methods.add_meta_method(MetaMethod::Pairs, |lua, this, ()| {
            match this.vtable().pairs {
                Some(pairs) => Ok(pairs(lua, this)?),
                None => Err(BridgeError::type_mismatch(
                    "pairs",
                    format!("python {} is not iterable with pairs", this.kind().name()),
                )
                .into()),
            }
        });
        methods.add_meta_method(MetaMethod::ToString, |lua, this, ()| {
            Ok((this.vtable().tostring)(lua, this)?)
        });
    }
}

fn operand_table(a: &Value, b: &Value) -> Option<&'static ProxyVTable> {
    handle_of(a)
        .or_else(|| handle_of(b))
        .map(|handle| handle.vtable())
}

fn unary(
    lua: &mlua::Lua,
    this: &PyHandle,
    op: Option<UnaryOp>,
    verb: &str,
) -> Result<Value, BridgeError> {
    match op {
        Some(dispatch) => dispatch(lua, this),
        None => Err(BridgeError::type_mismatch(
            "unary",
            format!("attempt to {} a python {} value", verb, this.kind().name()),
        )),
    }
}

fn compare(
    lua: &mlua::Lua,
    a: Value,
    b: Value,
    select: fn(&ProxyVTable) -> Option<CompareOp>,
) -> Result<bool, BridgeError> {
    match operand_table(&a, &b).and_then(select) {
        Some(dispatch) => dispatch(lua, a, b),
        None => Err(BridgeError::operands("compare", "compare", &a, &b)),
    }
}
