//! Classification, routing and invocation tests

use super::*;
use crate::errors::BridgeError;
use crate::ffi::handle_of;
use mlua::{Lua, MultiValue, Table, Value};
use pyo3::types::{PyDict, PyFrozenSet, PyList, PyModule, PySet, PyTuple};
use pyo3::{PyAny, Python, ToPyObject};

const FIXTURES: &str = r#"
class Point:
    def __init__(self, x, y):
        self.x = x
        self.y = y

    def norm2(self):
        return self.x * self.x + self.y * self.y

def describe(a, b=2, *, c=3):
    return f"{a}-{b}-{c}"

def kind_of(value):
    return type(value).__name__

def collect(**kw):
    return ",".join(sorted(kw))

def fail():
    raise ValueError("boom")

def countdown(n):
    while n > 0:
        yield n
        n -= 1
"#;

fn bridge() -> Lua {
    let lua = Lua::new();
    let python = crate::open(&lua).unwrap();
    lua.globals().set("python", python).unwrap();
    Python::with_gil(|py| {
        let module = PyModule::from_code(py, FIXTURES, "interop_fixtures.py", "interop_fixtures").unwrap();
        let value = push_foreign(&lua, py, module).unwrap();
        lua.globals().set("fx", value).unwrap();
    });
    lua
}

fn eval<'py>(py: Python<'py>, code: &str) -> &'py PyAny {
    py.eval(code, None, None).unwrap()
}

fn bridge_error(err: &mlua::Error) -> Option<&BridgeError> {
    match err {
        mlua::Error::CallbackError { cause, .. } => bridge_error(cause),
        mlua::Error::ExternalError(inner) => inner.downcast_ref::<BridgeError>(),
        _ => None,
    }
}

#[test]
fn test_classify_builtin_kinds() {
    Python::with_gil(|py| {
        assert_eq!(ForeignKind::classify(py.None().as_ref(py)), ForeignKind::None);
        assert_eq!(ForeignKind::classify(eval(py, "True")), ForeignKind::Boolean);
        assert_eq!(ForeignKind::classify(eval(py, "3")), ForeignKind::Number);
        assert_eq!(ForeignKind::classify(eval(py, "2.5")), ForeignKind::Number);
        assert_eq!(ForeignKind::classify(eval(py, "1+2j")), ForeignKind::Number);
        assert_eq!(ForeignKind::classify(eval(py, "'text'")), ForeignKind::String);
        assert_eq!(ForeignKind::classify(PySet::empty(py).unwrap()), ForeignKind::Set);
        assert_eq!(ForeignKind::classify(PyFrozenSet::empty(py).unwrap()), ForeignKind::Set);
        assert_eq!(ForeignKind::classify(PyDict::new(py)), ForeignKind::Dict);
        assert_eq!(ForeignKind::classify(PyTuple::empty(py)), ForeignKind::Tuple);
        assert_eq!(ForeignKind::classify(PyList::empty(py)), ForeignKind::List);
        assert_eq!(ForeignKind::classify(py.import("math").unwrap()), ForeignKind::Module);
        assert_eq!(ForeignKind::classify(eval(py, "len")), ForeignKind::Callable);
        assert_eq!(ForeignKind::classify(eval(py, "iter([1])")), ForeignKind::Iterator);
        assert_eq!(ForeignKind::classify(eval(py, "range(3)")), ForeignKind::Object);
    });
}

#[test]
fn test_classify_numeric_extension_types() {
    Python::with_gil(|py| {
        let decimal = py.import("decimal").unwrap().getattr("Decimal").unwrap().call1(("1.5",)).unwrap();
        assert_eq!(ForeignKind::classify(decimal), ForeignKind::Number);
        // a class object is callable, not a number
        assert_eq!(ForeignKind::classify(eval(py, "int")), ForeignKind::Callable);
    });
}

#[test]
fn test_registry_tables_match_kinds() {
    let registry = CapabilityRegistry::new();
    for kind in ForeignKind::ALL {
        assert_eq!(registry.get(kind).kind, kind);
    }
    assert!(registry.get(ForeignKind::Callable).call.is_some());
    assert!(registry.get(ForeignKind::Iterator).call.is_some());
    assert!(registry.get(ForeignKind::List).call.is_none());
    assert!(registry.get(ForeignKind::Set).binary(Operator::BXor).is_some());
    assert!(registry.get(ForeignKind::Dict).binary(Operator::BXor).is_none());
}

#[test]
fn test_sequence_table_shape() {
    let lua = Lua::new();
    let check = |src: &str| -> bool {
        let table: Table = lua.load(src).eval().unwrap();
        is_sequence_table(&table).unwrap()
    };
    assert!(check("{}"));
    assert!(check("{10, 20, 30}"));
    assert!(check("{[1] = 'a', [2] = 'b'}"));
    assert!(!check("{x = 1}"));
    assert!(!check("{1, 2, x = 3}"));
    assert!(!check("{[2] = 'b'}"));
    assert!(!check("{'a', nil, 'c', x = 1}"));
    assert!(!check("{[1.5] = true}"));
}

#[test]
fn test_natives_cross_by_value() {
    let lua = bridge();
    Python::with_gil(|py| {
        assert_eq!(push_foreign(&lua, py, eval(py, "None")).unwrap(), Value::Nil);
        assert_eq!(push_foreign(&lua, py, eval(py, "False")).unwrap(), Value::Boolean(false));
        assert_eq!(push_foreign(&lua, py, eval(py, "42")).unwrap(), Value::Integer(42));
        assert_eq!(push_foreign(&lua, py, eval(py, "0.5")).unwrap(), Value::Number(0.5));
        assert_eq!(push_foreign(&lua, py, eval(py, "2**70")).unwrap(), Value::Number(2f64.powi(70)));

        let text = push_foreign(&lua, py, eval(py, "'héllo'")).unwrap();
        assert_eq!(text.as_str().as_deref(), Some("héllo"));

        let huge = push_foreign(&lua, py, eval(py, "10**400")).unwrap();
        assert_eq!(handle_of(&huge).unwrap().kind(), ForeignKind::Number);
    });
}

#[test]
fn test_to_foreign_natives_and_tables() {
    let lua = bridge();
    Python::with_gil(|py| {
        let convert = |value: Value| to_foreign(&lua, py, value).unwrap();
        assert!(convert(Value::Nil).is_none(py));
        assert_eq!(convert(Value::Integer(7)).extract::<i64>(py).unwrap(), 7);
        assert_eq!(convert(Value::Number(1.25)).extract::<f64>(py).unwrap(), 1.25);
        assert!(convert(Value::Boolean(true)).extract::<bool>(py).unwrap());

        let list: Table = lua.load("{1, 'two', {3}}").eval().unwrap();
        let converted = convert(Value::Table(list));
        assert_eq!(converted.as_ref(py).str().unwrap().to_str().unwrap(), "[1, 'two', [3]]");

        let dict: Table = lua.load("{a = 1, [5] = 'skipped'}").eval().unwrap();
        let converted = convert(Value::Table(dict));
        assert_eq!(converted.as_ref(py).str().unwrap().to_str().unwrap(), "{'a': 1}");
    });
}

#[test]
fn test_to_foreign_rejects_tables_that_contain_themselves() {
    let lua = bridge();
    Python::with_gil(|py| {
        for src in [
            "local t = {1}; t[2] = t; return t",
            "local d = {}; d.me = d; return d",
            "local a, b = {}, {}; a[1] = b; b[1] = a; return a",
        ] {
            let table: Table = lua.load(src).eval().unwrap();
            let err = to_foreign(&lua, py, Value::Table(table)).unwrap_err();
            assert!(matches!(err, BridgeError::Conversion { .. }), "{src}: {err}");
        }

        // the same table twice on different branches is not a cycle
        let shared: Table = lua.load("local s = {1}; return {s, s}").eval().unwrap();
        let converted = to_foreign(&lua, py, Value::Table(shared)).unwrap();
        assert_eq!(converted.as_ref(py).str().unwrap().to_str().unwrap(), "[[1], [1]]");

        // a failed conversion leaves no table marked
        let table: Table = lua.load("local t = {1}; t[2] = t; return t").eval().unwrap();
        assert!(to_foreign(&lua, py, Value::Table(table.clone())).is_err());
        table.raw_set(2, 2).unwrap();
        let converted = to_foreign(&lua, py, Value::Table(table)).unwrap();
        assert_eq!(converted.as_ref(py).str().unwrap().to_str().unwrap(), "[1, 2]");
    });
}

#[test]
fn test_to_foreign_rejects_invalid_utf8_and_functions() {
    let lua = bridge();
    Python::with_gil(|py| {
        let bytes = lua.create_string(&[0xff, 0xfe]).unwrap();
        let err = to_foreign(&lua, py, Value::String(bytes)).unwrap_err();
        assert!(matches!(err, BridgeError::Encoding { .. }));

        let function = lua.create_function(|_, ()| Ok(())).unwrap();
        let err = to_foreign(&lua, py, Value::Function(function)).unwrap_err();
        assert!(matches!(err, BridgeError::UnsupportedType { .. }));

        let nested: Table = lua.load("{1, print}").eval().unwrap();
        let err = to_foreign(&lua, py, Value::Table(nested)).unwrap_err();
        match err {
            BridgeError::Conversion { target, position, .. } => {
                assert_eq!(target, "list");
                assert_eq!(position, "element 2");
            }
            other => panic!("unexpected error: {other}"),
        }
    });
}

#[test]
fn test_handle_round_trip_preserves_identity() {
    let lua = bridge();
    Python::with_gil(|py| {
        let list = PyList::new(py, [1, 2]);
        let value = push_foreign(&lua, py, list).unwrap();
        let back = to_foreign(&lua, py, value).unwrap();
        assert!(back.as_ref(py).is(list));
    });
}

#[test]
fn test_positional_call() {
    let lua = bridge();
    let result: String = lua.load("return fx.describe(1, 5)").eval().unwrap();
    assert_eq!(result, "1-5-3");
}

#[test]
fn test_keyword_call_from_table() {
    let lua = bridge();
    let result: String = lua.load("return fx.describe{a = 'x', c = 9}").eval().unwrap();
    assert_eq!(result, "x-2-9");

    let result: String = lua.load("return fx.describe{'p', 'q', c = 0}").eval().unwrap();
    assert_eq!(result, "p-q-0");
}

#[test]
fn test_unknown_keyword_falls_back_to_positional() {
    let lua = bridge();
    let result: String = lua.load("return fx.kind_of{unknown = 1}").eval().unwrap();
    assert_eq!(result, "dict");

    let result: String = lua.load("return fx.kind_of{1, 2, 3}").eval().unwrap();
    assert_eq!(result, "list");

    let result: String = lua.load("return fx.kind_of{}").eval().unwrap();
    assert_eq!(result, "list");
}

#[test]
fn test_var_keyword_accepts_any_name() {
    let lua = bridge();
    let result: String = lua.load("return fx.collect{zeta = 1, alpha = 2}").eval().unwrap();
    assert_eq!(result, "alpha,zeta");
}

#[test]
fn test_undeclared_keywords_pass_table_whole() {
    let lua = bridge();
    // `a` and `b` are not parameters of len, so the table goes through as a dict
    let result: i64 = lua.load("return python.builtins.len{a = 1, b = 2}").eval().unwrap();
    assert_eq!(result, 2);
}

#[test]
fn test_method_call_with_dot_syntax() {
    let lua = bridge();
    let result: i64 = lua.load("return fx.Point(3, 4).norm2()").eval().unwrap();
    assert_eq!(result, 25);
}

#[test]
fn test_receiver_passed_as_argument_is_kept() {
    let lua = bridge();
    let len: i64 = lua
        .load(
            r#"
            local l = python.list({1, 2})
            l.extend(l)
            return #l
            "#,
        )
        .eval()
        .unwrap();
    assert_eq!(len, 4);

    // module-level builtins carry the module as their receiver
    let text: String = lua
        .load("local b = python.builtins; return b.repr(b)")
        .eval()
        .unwrap();
    assert!(text.starts_with("<module 'builtins'"), "{text}");

    let listed: bool = lua
        .load(
            r#"
            local b = python.builtins
            local names = b.dir(b)
            local found = false
            for _, name in pairs(names) do found = found or name == "len" end
            return found
            "#,
        )
        .eval()
        .unwrap();
    assert!(listed);
}

#[test]
fn test_foreign_exception_becomes_error() {
    let lua = bridge();
    let err = lua.load("fx.fail()").exec().unwrap_err();
    match bridge_error(&err) {
        Some(BridgeError::ForeignCall { op, message }) => {
            assert_eq!(op, "fail");
            assert_eq!(message, "ValueError: boom");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // the interpreter is still usable afterwards
    let ok: bool = lua.load("return fx.describe(0) == '0-2-3'").eval().unwrap();
    assert!(ok);
}

#[test]
fn test_invoke_converts_arguments_in_order() {
    let lua = bridge();
    let callable = lua.load("return fx.kind_of").eval::<Value>().unwrap();
    let handle = handle_of(&callable).unwrap();
    let args: MultiValue = vec![Value::Boolean(true)].into_iter().collect();
    let result = call::invoke(&lua, &handle, args).unwrap();
    assert_eq!(result.as_str().as_deref(), Some("bool"));

    let function = lua.create_function(|_, ()| Ok(())).unwrap();
    let args: MultiValue = vec![Value::Integer(1), Value::Function(function)].into_iter().collect();
    let err = call::invoke(&lua, &handle, args).unwrap_err();
    match err {
        BridgeError::Conversion { position, .. } => assert_eq!(position, "argument #2"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_generator_is_an_iterator() {
    let lua = bridge();
    let total: i64 = lua
        .load(
            r#"
            local sum = 0
            for n in fx.countdown(4) do sum = sum + n end
            return sum
            "#,
        )
        .eval()
        .unwrap();
    assert_eq!(total, 10);
}

#[test]
fn test_missing_bridge_is_a_load_failure() {
    let lua = Lua::new();
    Python::with_gil(|py| {
        let err = push_foreign(&lua, py, PyList::empty(py)).unwrap_err();
        assert!(matches!(err, BridgeError::LoadFailure(_)));
        // natives never need the bridge context
        assert_eq!(push_foreign(&lua, py, 3i64.to_object(py).as_ref(py)).unwrap(), Value::Integer(3));
    });
}

#[test]
fn test_library_load_failure() {
    let err = Library::load_global("libdefinitely-not-here.so").err().unwrap();
    assert!(matches!(err, BridgeError::LoadFailure(_)));
}

#[cfg(target_os = "linux")]
#[test]
fn test_library_load_global_resolves_symbols() {
    let library = Library::load_global("libc.so.6").unwrap();
    assert_eq!(library.name(), "libc.so.6");
    assert!(library.has_symbol("strlen"));
    assert!(!library.has_symbol("definitely_not_a_symbol"));
}
