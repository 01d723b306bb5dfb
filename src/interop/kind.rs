//! Foreign kind classification

use pyo3::ffi;
use pyo3::types::{PyBool, PyDict, PyFrozenSet, PyIterator, PyList, PyModule, PySet, PyString, PyTuple};
use pyo3::{AsPyPointer, PyAny};

/// Capability class of a Python object. Decides which dispatcher table a
/// handle gets and whether the value crosses by copy or by proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ForeignKind {
    None,
    Boolean,
    Number,
    String,
    Set,
    Dict,
    Tuple,
    List,
    Module,
    Callable,
    Iterator,
    Object,
}

impl ForeignKind {
    pub const COUNT: usize = 12;

    pub const ALL: [ForeignKind; Self::COUNT] = [
        Self::None,
        Self::Boolean,
        Self::Number,
        Self::String,
        Self::Set,
        Self::Dict,
        Self::Tuple,
        Self::List,
        Self::Module,
        Self::Callable,
        Self::Iterator,
        Self::Object,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::Set => "set",
            Self::Dict => "dict",
            Self::Tuple => "tuple",
            Self::List => "list",
            Self::Module => "module",
            Self::Callable => "callable",
            Self::Iterator => "iterator",
            Self::Object => "object",
        }
    }

    /// Classify by capability, first match wins.
    ///
    /// Booleans come before numbers since `bool` is an `int` subclass, and
    /// numbers come before everything else so numeric extension types (Decimal,
    /// Fraction, complex) are treated as numbers.
    pub fn classify(obj: &PyAny) -> Self {
        if obj.is_none() {
            Self::None
        } else if obj.is_instance_of::<PyBool>() {
            Self::Boolean
        } else if is_number(obj) {
            Self::Number
        } else if obj.is_instance_of::<PyString>() {
            Self::String
        } else if obj.is_instance_of::<PySet>() || obj.is_instance_of::<PyFrozenSet>() {
            Self::Set
        } else if obj.is_instance_of::<PyDict>() {
            Self::Dict
        } else if obj.is_instance_of::<PyTuple>() {
            Self::Tuple
        } else if obj.is_instance_of::<PyList>() {
            Self::List
        } else if obj.is_instance_of::<PyModule>() {
            Self::Module
        } else if obj.is_callable() {
            Self::Callable
        } else if obj.downcast::<PyIterator>().is_ok() {
            Self::Iterator
        } else {
            Self::Object
        }
    }
}

#[inline]
fn is_number(obj: &PyAny) -> bool {
    // SAFETY: `obj` is a live reference for the current GIL scope
    unsafe { ffi::PyNumber_Check(obj.as_ptr()) == 1 }
}
