//! Callable proxies: functions, methods, classes and objects with `__call__`

use crate::interop::{call, ForeignKind, ProxyVTable};

use super::object;

pub static VTABLE: ProxyVTable = ProxyVTable {
    call: Some(call::invoke),
    index: Some(object::index),
    newindex: Some(object::newindex),
    ..ProxyVTable::base(ForeignKind::Callable)
};
