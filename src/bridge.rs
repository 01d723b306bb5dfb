//! Bridge context and the Lua-facing `python` table
//!
//! One `Bridge` is installed per Lua state as app data. It owns the capability
//! registry, the configuration and the few Python helpers the invoker needs,
//! so nothing about the bridge lives in process-global state.

use mlua::{AppDataRef, Lua, Table, Value};
use pyo3::{PyErr, PyObject, Python, ToPyObject};

use crate::builtins::{boolean, iter, object};
use crate::config::BridgeConfig;
use crate::errors::{BridgeError, BridgeResult, ForeignResultExt};
use crate::ffi::describe;
use crate::interop::{marshal, CapabilityRegistry, ForeignKind, Library};
use crate::logging::{debug, info};

/// Python objects resolved once at install time
pub struct ForeignHelpers {
    /// `inspect.signature`
    pub signature: PyObject,
    /// `inspect.Parameter.VAR_KEYWORD`
    pub var_keyword: PyObject,
}

impl ForeignHelpers {
    fn load(py: Python<'_>) -> BridgeResult<Self> {
        let inspect = py.import("inspect").foreign("install")?;
        let signature = inspect.getattr("signature").foreign("install")?.to_object(py);
        let var_keyword = inspect
            .getattr("Parameter")
            .and_then(|parameter| parameter.getattr("VAR_KEYWORD"))
            .foreign("install")?
            .to_object(py);
        Ok(Self {
            signature,
            var_keyword,
        })
    }
}

pub struct Bridge {
    config: BridgeConfig,
    registry: CapabilityRegistry,
    helpers: ForeignHelpers,
    _library: Option<Library>,
}

impl Bridge {
    /// Start Python if needed, attach a bridge to `lua` and build the `python` table
    pub fn install(lua: &Lua, config: BridgeConfig) -> BridgeResult<Table> {
        let library = match config.runtime.python_library.as_deref() {
            Some(name) => Some(Library::load_global(name)?),
            None => None,
        };

        pyo3::prepare_freethreaded_python();
        let helpers = Python::with_gil(ForeignHelpers::load)
            .map_err(|e| BridgeError::LoadFailure(e.to_string()))?;

        let version = Python::with_gil(|py| py.version().to_string());
        info!(target: "bridge", python = %version, "installing lua/python bridge");

        let _previous = lua.set_app_data(Bridge {
            config,
            registry: CapabilityRegistry::new(),
            helpers,
            _library: library,
        });

        exports(lua)
    }

    /// The bridge attached to `lua`
    pub fn get(lua: &Lua) -> BridgeResult<AppDataRef<'_, Bridge>> {
        lua.app_data_ref::<Bridge>()
            .ok_or_else(|| BridgeError::LoadFailure("bridge is not installed in this Lua state".into()))
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn helpers(&self) -> &ForeignHelpers {
        &self.helpers
    }

    /// Turn a raised Python exception into a bridge error, printing the
    /// traceback first when configured to
    pub fn drain(&self, py: Python<'_>, op: &str, err: PyErr) -> BridgeError {
        if self.config.errors.print_tracebacks {
            err.clone_ref(py).print(py);
        }
        let message = err.to_string();
        debug!(target: "ffi", op, %message, "python raised");
        BridgeError::ForeignCall {
            op: op.to_string(),
            message,
        }
    }
}

fn exports(lua: &Lua) -> BridgeResult<Table> {
    let python = lua.create_table()?;

    python.set("import", lua.create_function(|lua, name: Value| Ok(import(lua, name)?))?)?;
    python.set(
        "set",
        lua.create_function(|lua, value: Value| Ok(container(lua, value, ForeignKind::Set)?))?,
    )?;
    python.set(
        "dict",
        lua.create_function(|lua, value: Value| Ok(container(lua, value, ForeignKind::Dict)?))?,
    )?;
    python.set(
        "tuple",
        lua.create_function(|lua, value: Value| Ok(container(lua, value, ForeignKind::Tuple)?))?,
    )?;
    python.set(
        "list",
        lua.create_function(|lua, value: Value| Ok(container(lua, value, ForeignKind::List)?))?,
    )?;
    python.set("bool", lua.create_function(|lua, value: Value| Ok(boolean::make(lua, value)?))?)?;
    python.set("iter", lua.create_function(|lua, value: Value| Ok(iter::make(lua, value)?))?)?;
    python.set(
        "astable",
        lua.create_function(|lua, value: Value| Ok(object::as_table(lua, value)?))?,
    )?;

    let builtins = Python::with_gil(|py| {
        let module = py.import("builtins").foreign("install")?;
        marshal::push_foreign(lua, py, module)
    })?;
    python.set("builtins", builtins)?;

    Ok(python)
}

/// `python.import(name)`
fn import(lua: &Lua, name: Value) -> BridgeResult<Value> {
    let Value::String(name) = &name else {
        return Err(BridgeError::type_mismatch(
            "import",
            format!("module name must be a string, got {}", describe(&name)),
        ));
    };
    let name = std::str::from_utf8(&name.as_bytes())
        .map_err(|_| BridgeError::encoding("import"))?
        .to_owned();

    let bridge = Bridge::get(lua)?;
    Python::with_gil(|py| match py.import(name.as_str()) {
        Ok(module) => {
            debug!(target: "bridge", module = %name, "imported python module");
            marshal::push_foreign(lua, py, module)
        }
        Err(err) => Err(bridge.drain(py, &format!("import '{}'", name), err)),
    })
}

/// `python.set/dict/tuple/list(t)` - explicit container constructors
fn container(lua: &Lua, value: Value, kind: ForeignKind) -> BridgeResult<Value> {
    use crate::builtins::{dict, list, set, tuple};

    let Value::Table(table) = &value else {
        return Err(BridgeError::type_mismatch(
            kind.name(),
            format!("expected a table, got {}", describe(&value)),
        ));
    };
    Python::with_gil(|py| {
        let obj = match kind {
            ForeignKind::Set => set::to_foreign(lua, py, table)?,
            ForeignKind::Dict => dict::to_foreign(lua, py, table)?,
            ForeignKind::Tuple => tuple::to_foreign(lua, py, table)?,
            _ => list::to_foreign(lua, py, table)?,
        };
        marshal::wrap(lua, obj, kind)
    })
}
