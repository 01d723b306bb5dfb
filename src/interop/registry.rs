//! Capability registry - one dispatcher table per foreign kind
//!
//! Design: static tables, built once per kind with struct-update syntax over
//! [`ProxyVTable::base`]. A handle carries a `&'static` pointer to its kind's
//! table, so metamethod dispatch is a field load and an indirect call.
//! Absent entries surface as type-mismatch errors naming the operand kinds.

use mlua::{Function, Lua, MetaMethod, MultiValue, Value};

use crate::builtins;
use crate::errors::BridgeResult;
use crate::ffi::PyHandle;

use super::ForeignKind;

pub type BinaryOp = fn(&Lua, Value, Value) -> BridgeResult<Value>;
pub type UnaryOp = fn(&Lua, &PyHandle) -> BridgeResult<Value>;
pub type CompareOp = fn(&Lua, Value, Value) -> BridgeResult<bool>;
pub type IndexOp = fn(&Lua, &PyHandle, Value) -> BridgeResult<Value>;
pub type NewIndexOp = fn(&Lua, &PyHandle, Value, Value) -> BridgeResult<()>;
pub type CallOp = fn(&Lua, &PyHandle, MultiValue) -> BridgeResult<Value>;
pub type PairsOp = fn(&Lua, &PyHandle) -> BridgeResult<(Function, Value, Value)>;
pub type ToStringOp = fn(&Lua, &PyHandle) -> BridgeResult<String>;

/// Binary operators a proxy can overload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    IDiv,
    BAnd,
    BOr,
    BXor,
    Shl,
    Shr,
    Concat,
}

impl Operator {
    pub const ALL: [Operator; 13] = [
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::Div,
        Self::Mod,
        Self::Pow,
        Self::IDiv,
        Self::BAnd,
        Self::BOr,
        Self::BXor,
        Self::Shl,
        Self::Shr,
        Self::Concat,
    ];

    pub const fn metamethod(self) -> MetaMethod {
        match self {
            Self::Add => MetaMethod::Add,
            Self::Sub => MetaMethod::Sub,
            Self::Mul => MetaMethod::Mul,
            Self::Div => MetaMethod::Div,
            Self::Mod => MetaMethod::Mod,
            Self::Pow => MetaMethod::Pow,
            Self::IDiv => MetaMethod::IDiv,
            Self::BAnd => MetaMethod::BAnd,
            Self::BOr => MetaMethod::BOr,
            Self::BXor => MetaMethod::BXor,
            Self::Shl => MetaMethod::Shl,
            Self::Shr => MetaMethod::Shr,
            Self::Concat => MetaMethod::Concat,
        }
    }

    /// Verb used in "attempt to ..." messages
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "subtract",
            Self::Mul => "multiply",
            Self::Div => "divide",
            Self::Mod => "take the modulo of",
            Self::Pow => "exponentiate",
            Self::IDiv => "floor-divide",
            Self::BAnd | Self::BOr | Self::BXor => "perform bitwise operation on",
            Self::Shl | Self::Shr => "shift",
            Self::Concat => "concatenate",
        }
    }
}

/// Dispatcher table for one foreign kind
pub struct ProxyVTable {
    pub kind: ForeignKind,
    pub add: Option<BinaryOp>,
    pub sub: Option<BinaryOp>,
    pub mul: Option<BinaryOp>,
    pub div: Option<BinaryOp>,
    pub mod_: Option<BinaryOp>,
    pub pow: Option<BinaryOp>,
    pub idiv: Option<BinaryOp>,
    pub band: Option<BinaryOp>,
    pub bor: Option<BinaryOp>,
    pub bxor: Option<BinaryOp>,
    pub shl: Option<BinaryOp>,
    pub shr: Option<BinaryOp>,
    pub concat: Option<BinaryOp>,
    pub unm: Option<UnaryOp>,
    pub bnot: Option<UnaryOp>,
    pub len: Option<UnaryOp>,
    pub eq: CompareOp,
    pub lt: Option<CompareOp>,
    pub le: Option<CompareOp>,
    pub index: Option<IndexOp>,
    pub newindex: Option<NewIndexOp>,
    pub call: Option<CallOp>,
    pub pairs: Option<PairsOp>,
    pub tostring: ToStringOp,
}

impl ProxyVTable {
    /// Table with nothing but identity-level behavior: Python equality and
    /// a `(typename)str` rendering
    pub const fn base(kind: ForeignKind) -> Self {
        Self {
            kind,
            add: None,
            sub: None,
            mul: None,
            div: None,
            mod_: None,
            pow: None,
            idiv: None,
            band: None,
            bor: None,
            bxor: None,
            shl: None,
            shr: None,
            concat: None,
            unm: None,
            bnot: None,
            len: None,
            eq: builtins::object::eq,
            lt: None,
            le: None,
            index: None,
            newindex: None,
            call: None,
            pairs: None,
            tostring: builtins::object::tostring,
        }
    }

    pub fn binary(&self, op: Operator) -> Option<BinaryOp> {
        match op {
            Operator::Add => self.add,
            Operator::Sub => self.sub,
            Operator::Mul => self.mul,
            Operator::Div => self.div,
            Operator::Mod => self.mod_,
            Operator::Pow => self.pow,
            Operator::IDiv => self.idiv,
            Operator::BAnd => self.band,
            Operator::BOr => self.bor,
            Operator::BXor => self.bxor,
            Operator::Shl => self.shl,
            Operator::Shr => self.shr,
            Operator::Concat => self.concat,
        }
    }
}

/// Kind-indexed lookup of dispatcher tables, owned by the bridge context
pub struct CapabilityRegistry {
    tables: [&'static ProxyVTable; ForeignKind::COUNT],
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        let tables = ForeignKind::ALL.map(Self::table_for);
        debug_assert!(ForeignKind::ALL
            .iter()
            .all(|kind| tables[*kind as usize].kind == *kind));
        Self { tables }
    }

    #[inline]
    pub fn get(&self, kind: ForeignKind) -> &'static ProxyVTable {
        self.tables[kind as usize]
    }

    fn table_for(kind: ForeignKind) -> &'static ProxyVTable {
        match kind {
            // None crosses as nil and never gets a handle
            ForeignKind::None => &builtins::object::NONE_VTABLE,
            ForeignKind::Boolean => &builtins::boolean::VTABLE,
            ForeignKind::Number => &builtins::number::VTABLE,
            ForeignKind::String => &builtins::string::VTABLE,
            ForeignKind::Set => &builtins::set::VTABLE,
            ForeignKind::Dict => &builtins::dict::VTABLE,
            ForeignKind::Tuple => &builtins::tuple::VTABLE,
            ForeignKind::List => &builtins::list::VTABLE,
            ForeignKind::Module => &builtins::module::VTABLE,
            ForeignKind::Callable => &builtins::callable::VTABLE,
            ForeignKind::Iterator => &builtins::iter::VTABLE,
            ForeignKind::Object => &builtins::object::VTABLE,
        }
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
