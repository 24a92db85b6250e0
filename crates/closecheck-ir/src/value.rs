// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! SSA values and their def-use edges.

use crate::{FuncId, InstrId, TypeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ValueId(pub u32);

/// An SSA value: a typed operand with the set of instructions consuming it.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Value {
    pub ty: TypeId,
    /// Source-level name, or a synthesized `tN` for temporaries.
    pub name: String,
    pub kind: ValueKind,
    /// Reverse def-use edges. Filled once when the program is linked.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub(crate) referrers: Vec<InstrId>,
}

/// Where a value comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ValueKind {
    /// Formal parameter `index` of `func`.
    Param { func: FuncId, index: u32 },
    /// Captured variable `index` of closure `func`.
    FreeVar { func: FuncId, index: u32 },
    /// Result of an instruction.
    Instr(InstrId),
    /// A function used as a value.
    Func(FuncId),
    /// Package-level variable (its address).
    Global { package: String },
    /// Literal, kept as source text.
    Const(String),
}
