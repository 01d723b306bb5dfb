//! Handle lifetime tests

use super::*;
use crate::interop::{push_foreign, ForeignKind};
use mlua::{Lua, Value};
use pyo3::types::{PyDict, PyList};
use pyo3::{PyObject, Python, ToPyObject};

fn bridge() -> Lua {
    let lua = Lua::new();
    let python = crate::open(&lua).unwrap();
    lua.globals().set("python", python).unwrap();
    lua
}

fn fresh_list() -> PyObject {
    Python::with_gil(|py| PyList::new(py, [1, 2, 3]).to_object(py))
}

fn current_refcount(obj: &PyObject) -> isize {
    Python::with_gil(|py| refcount(obj.as_ref(py)))
}

#[test]
fn test_wrap_increments_created() {
    let lua = bridge();
    let obj = fresh_list();
    let before = stats();

    let value = Python::with_gil(|py| push_foreign(&lua, py, obj.as_ref(py))).unwrap();
    assert!(matches!(value, Value::UserData(_)));

    let after = stats();
    assert_eq!(after.created, before.created + 1);
    assert_eq!(after.live(), before.live() + 1);
}

#[test]
fn test_handle_kind_and_describe() {
    let lua = bridge();
    let value = Python::with_gil(|py| {
        let dict = PyDict::new(py);
        push_foreign(&lua, py, dict)
    })
    .unwrap();

    let handle = handle_of(&value).unwrap();
    assert_eq!(handle.kind(), ForeignKind::Dict);
    assert_eq!(describe(&value), "python dict");
    assert_eq!(describe(&Value::Integer(1)), "integer");
    assert!(handle_of(&Value::Nil).is_none());
}

#[test]
fn test_collection_releases_every_reference() {
    let lua = bridge();
    let obj = fresh_list();
    let baseline = current_refcount(&obj);
    let before = stats();

    let mut handles = Vec::new();
    for _ in 0..5 {
        let value = Python::with_gil(|py| push_foreign(&lua, py, obj.as_ref(py))).unwrap();
        handles.push(value);
    }
    assert_eq!(current_refcount(&obj), baseline + 5);

    drop(handles);
    lua.gc_collect().unwrap();
    lua.gc_collect().unwrap();

    assert_eq!(current_refcount(&obj), baseline);
    let after = stats();
    assert_eq!(after.created - before.created, 5);
    assert_eq!(after.finalized - before.finalized, 5);
}

#[test]
fn test_unwrap_for_python_adds_a_reference() {
    let lua = bridge();
    let obj = fresh_list();
    let value = Python::with_gil(|py| push_foreign(&lua, py, obj.as_ref(py))).unwrap();
    let baseline = current_refcount(&obj);

    let kept = Python::with_gil(|py| handle_of(&value).unwrap().to_object(py));
    assert_eq!(current_refcount(&obj), baseline + 1);

    Python::with_gil(|_py| drop(kept));
    assert_eq!(current_refcount(&obj), baseline);
}

#[test]
fn test_lua_side_collection_after_script() {
    let lua = bridge();
    let before = stats();
    lua.load(
        r#"
        for i = 1, 10 do
            local l = python.list({i, i + 1})
            assert(#l == 2)
        end
        "#,
    )
    .exec()
    .unwrap();
    lua.gc_collect().unwrap();
    lua.gc_collect().unwrap();

    let after = stats();
    assert_eq!(after.created - before.created, after.finalized - before.finalized);
}
