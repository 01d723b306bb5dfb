//! Opaque handle wrapping one Python reference

use std::mem::ManuallyDrop;

use mlua::{UserDataRef, Value};
use pyo3::{PyAny, PyObject, Python};

use crate::interop::{ForeignKind, ProxyVTable};
use crate::logging::trace;

use super::refcount;

/// Lua-side owner of a Python reference.
///
/// The kind tag is the vtable's kind; it is fixed when the handle is created
/// and selects which metamethods do something useful.
pub struct PyHandle {
    obj: ManuallyDrop<PyObject>,
    vtable: &'static ProxyVTable,
}

impl PyHandle {
    /// Take ownership of `obj`. The handle releases it when finalized.
    pub fn wrap(obj: PyObject, vtable: &'static ProxyVTable) -> Self {
        refcount::record_wrap();
        trace!(target: "ffi", kind = vtable.kind.name(), ptr = ?obj.as_ptr(), "wrapped python reference");
        Self {
            obj: ManuallyDrop::new(obj),
            vtable,
        }
    }

    #[inline]
    pub fn kind(&self) -> ForeignKind {
        self.vtable.kind
    }

    #[inline]
    pub fn vtable(&self) -> &'static ProxyVTable {
        self.vtable
    }

    /// Borrow the wrapped object for the duration of a GIL scope
    #[inline]
    pub fn get<'py>(&'py self, py: Python<'py>) -> &'py PyAny {
        self.obj.as_ref(py)
    }

    /// New strong reference for Python to keep
    #[inline]
    pub fn to_object(&self, py: Python<'_>) -> PyObject {
        self.obj.clone_ref(py)
    }
}

impl Drop for PyHandle {
    fn drop(&mut self) {
        // SAFETY: `obj` is never touched again after this point
        let obj = unsafe { ManuallyDrop::take(&mut self.obj) };
        trace!(target: "ffi", kind = self.vtable.kind.name(), ptr = ?obj.as_ptr(), "released python reference");
        // Release while holding the GIL so the decref happens now rather than
        // being queued in pyo3's pending pool.
        Python::with_gil(|_py| drop(obj));
        refcount::record_finalize();
    }
}

/// Borrow the handle inside a Lua value, if it is one
pub fn handle_of(value: &Value) -> Option<UserDataRef<PyHandle>> {
    match value {
        Value::UserData(ud) => ud.borrow::<PyHandle>().ok(),
        _ => None,
    }
}

/// Short type description used in error messages
pub fn describe(value: &Value) -> String {
    match handle_of(value) {
        Some(handle) => format!("python {}", handle.kind().name()),
        None => value.type_name().to_string(),
    }
}
