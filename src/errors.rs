//! Bridge error taxonomy
//!
//! Every dispatcher validates operand shapes before doing conversion work and
//! reports a `BridgeError`. Errors cross into Lua as `mlua::Error::ExternalError`
//! so a failed operation aborts the running Lua chunk with a readable message.

use mlua::Value;
use pyo3::PyResult;
use thiserror::Error;

use crate::ffi::describe;

pub type BridgeResult<T> = Result<T, BridgeError>;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// Operand shape doesn't match any supported kind for the operator
    #[error("{op}: {detail}")]
    TypeMismatch { op: &'static str, detail: String },

    /// Text that cannot round-trip as UTF-8
    #[error("{context}: text is not valid UTF-8")]
    Encoding { context: String },

    /// A nested container element failed to convert
    #[error("cannot convert {position} to python {target}: {source}")]
    Conversion {
        target: &'static str,
        position: String,
        #[source]
        source: Box<BridgeError>,
    },

    /// The foreign callable (or protocol entry point) raised
    #[error("{op}: {message}")]
    ForeignCall { op: String, message: String },

    /// No converter or dispatcher for this kind
    #[error("{op}: unsupported type {type_name}")]
    UnsupportedType { op: &'static str, type_name: String },

    #[error("{op}: index {index} out of range (length {len})")]
    IndexOutOfRange { op: &'static str, index: i64, len: usize },

    /// Python runtime or shared library failed to initialize
    #[error("load failure: {0}")]
    LoadFailure(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Lua(#[from] mlua::Error),
}

impl BridgeError {
    pub fn type_mismatch(op: &'static str, detail: impl Into<String>) -> Self {
        Self::TypeMismatch { op, detail: detail.into() }
    }

    /// Mismatch naming both operands of a binary operator
    pub fn operands(op: &'static str, verb: &str, lhs: &Value, rhs: &Value) -> Self {
        Self::type_mismatch(
            op,
            format!("attempt to {} {} and {}", verb, describe(lhs), describe(rhs)),
        )
    }

    /// Mismatch naming the single operand of a unary operator
    pub fn operand(op: &'static str, verb: &str, value: &Value) -> Self {
        Self::type_mismatch(op, format!("attempt to {} {}", verb, describe(value)))
    }

    pub fn conversion(target: &'static str, position: impl Into<String>, source: BridgeError) -> Self {
        Self::Conversion {
            target,
            position: position.into(),
            source: Box::new(source),
        }
    }

    pub fn unsupported(op: &'static str, value: &Value) -> Self {
        Self::UnsupportedType { op, type_name: describe(value) }
    }

    pub fn encoding(context: impl Into<String>) -> Self {
        Self::Encoding { context: context.into() }
    }
}

impl From<BridgeError> for mlua::Error {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Lua(inner) => inner,
            other => mlua::Error::external(other),
        }
    }
}

/// Attach operator context to a Python failure.
///
/// The exception is fetched when pyo3 builds the `PyErr`, so the interpreter's
/// error indicator is already clear by the time this runs.
pub trait ForeignResultExt<T> {
    fn foreign(self, op: &str) -> BridgeResult<T>;
}

impl<T> ForeignResultExt<T> for PyResult<T> {
    #[inline]
    fn foreign(self, op: &str) -> BridgeResult<T> {
        self.map_err(|err| BridgeError::ForeignCall {
            op: op.to_string(),
            message: err.to_string(),
        })
    }
}
