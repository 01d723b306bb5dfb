//! End-to-end properties of the Lua/Python bridge

use std::io::Write;

use luapy::ffi::{refcount, stats};
use luapy::{push_foreign, to_foreign, BridgeConfig, BridgeError};
use mlua::{Lua, Value};
use proptest::prelude::*;
use pyo3::types::PyModule;
use pyo3::{Python, ToPyObject};

const FIXTURES: &str = r#"
def mutate(value):
    if isinstance(value, list):
        value.append("added")
    elif isinstance(value, dict):
        value["added"] = True
    return value

def append_to(target, item):
    target.append(item)

def divide(a, b):
    return a / b
"#;

fn bridge_with(config: BridgeConfig) -> Lua {
    let lua = Lua::new();
    let python = luapy::open_with_config(&lua, config).unwrap();
    lua.globals().set("python", python).unwrap();
    Python::with_gil(|py| {
        let module = PyModule::from_code(py, FIXTURES, "bridge_fixtures.py", "bridge_fixtures").unwrap();
        let value = push_foreign(&lua, py, module).unwrap();
        lua.globals().set("fx", value).unwrap();
    });
    lua
}

fn bridge() -> Lua {
    bridge_with(BridgeConfig::default())
}

fn round_trip(lua: &Lua, value: Value) -> Value {
    Python::with_gil(|py| {
        let obj = to_foreign(lua, py, value).unwrap();
        push_foreign(lua, py, obj.as_ref(py)).unwrap()
    })
}

proptest! {
    #[test]
    fn test_integers_round_trip(n in any::<i64>()) {
        let lua = Lua::new();
        prop_assert_eq!(round_trip(&lua, Value::Integer(n)), Value::Integer(n));
    }

    #[test]
    fn test_floats_round_trip(x in any::<f64>().prop_filter("finite", |x| x.is_finite())) {
        let lua = Lua::new();
        prop_assert_eq!(round_trip(&lua, Value::Number(x)), Value::Number(x));
    }

    #[test]
    fn test_strings_round_trip(text in "\\PC*") {
        let lua = Lua::new();
        let value = Value::String(lua.create_string(&text).unwrap());
        let back = round_trip(&lua, value);
        let back_str = back.as_str();
        prop_assert_eq!(back_str.as_deref(), Some(text.as_str()));
    }

    #[test]
    fn test_booleans_round_trip(b in any::<bool>()) {
        let lua = Lua::new();
        prop_assert_eq!(round_trip(&lua, Value::Boolean(b)), Value::Boolean(b));
    }
}

#[test]
fn test_nil_round_trips() {
    let lua = Lua::new();
    assert_eq!(round_trip(&lua, Value::Nil), Value::Nil);
}

#[test]
fn test_tables_are_copied_not_shared() {
    let lua = bridge();
    lua.load(
        r#"
        local t = {1, 2}
        local result = fx.mutate(t)
        assert(#t == 2, "lua table must not change")
        assert(#result == 3 and result[3] == "added")

        local d = {k = "v"}
        local copy = fx.mutate(d)
        assert(d.added == nil)
        assert(copy.added == true)
        "#,
    )
    .exec()
    .unwrap();
}

#[test]
fn test_handles_share_the_python_object() {
    let lua = bridge();
    lua.load(
        r#"
        local l = python.list({})
        fx.append_to(l, 1)
        fx.append_to(l, "two")
        assert(#l == 2 and l[2] == "two")
        "#,
    )
    .exec()
    .unwrap();
}

#[test]
fn test_errors_leave_the_bridge_usable() {
    let lua = bridge();
    for _ in 0..3 {
        let ok: bool = lua
            .load(
                r#"
                local ok, err = pcall(fx.divide, 1, 0)
                assert(not ok)
                assert(tostring(err):find("ZeroDivisionError", 1, true))
                return fx.divide(6, 3) == 2
                "#,
            )
            .eval()
            .unwrap();
        assert!(ok);
    }
}

#[test]
fn test_no_references_leak_across_a_script() {
    let lua = bridge();
    lua.gc_collect().unwrap();
    let before = stats();
    lua.load(
        r#"
        local total = 0
        for i = 1, 50 do
            local d = python.dict({n = i})
            local l = python.list({i, i})
            total = total + d.n + #l
        end
        assert(total == 1275 + 100)
        "#,
    )
    .exec()
    .unwrap();
    lua.gc_collect().unwrap();
    lua.gc_collect().unwrap();

    let after = stats();
    assert!(after.created - before.created >= 100);
    assert_eq!(after.live(), before.live());
}

#[test]
fn test_failed_conversion_releases_partial_results() {
    let lua = bridge();
    let held = Python::with_gil(|py| {
        let held = py.eval("[object()]", None, None).unwrap();
        lua.globals().set("h", push_foreign(&lua, py, held).unwrap()).unwrap();
        held.to_object(py)
    });
    lua.gc_collect().unwrap();
    let before = (Python::with_gil(|py| refcount(held.as_ref(py))), stats().live());

    for src in [
        "return python.list({h, function() end})",
        "return python.dict({a = h, b = function() end})",
        "return python.set({h})",
        "local t = {h}; t[2] = t; return python.tuple(t)",
    ] {
        let err = lua.load(src).exec().unwrap_err();
        assert!(err.to_string().contains("cannot convert"), "{src}: {err}");
    }
    lua.gc_collect().unwrap();
    lua.gc_collect().unwrap();

    let after = (Python::with_gil(|py| refcount(held.as_ref(py))), stats().live());
    assert_eq!(after, before);
}

#[test]
fn test_self_referencing_table_is_a_conversion_error() {
    let lua = bridge();
    let ok: bool = lua
        .load(
            r#"
            local t = {1}
            t[2] = t
            local ok, err = pcall(python.list, t)
            assert(not ok)
            assert(tostring(err):find("contains itself", 1, true))
            return #python.list({1, {2}}) == 2
            "#,
        )
        .eval()
        .unwrap();
    assert!(ok);
}

#[test]
fn test_config_file_drives_installation() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        [errors]
        print_tracebacks = true

        [strings]
        wrap_unencodable = true
        "#
    )
    .unwrap();

    let config = BridgeConfig::from_file(file.path()).unwrap();
    assert!(config.errors.print_tracebacks);
    assert!(config.strings.wrap_unencodable);

    let lua = bridge_with(config);
    let err = lua.load("fx.divide(1, 0)").exec().unwrap_err();
    assert!(err.to_string().contains("ZeroDivisionError"));
}

#[test]
fn test_missing_config_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = BridgeConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, BridgeError::Config(_)));
}

#[test]
fn test_invalid_python_library_fails_installation() {
    let lua = Lua::new();
    let mut config = BridgeConfig::default();
    config.runtime.python_library = Some("libpython-does-not-exist.so".to_string());
    let err = luapy::open_with_config(&lua, config).unwrap_err();
    assert!(err.to_string().contains("load failure"));
}
