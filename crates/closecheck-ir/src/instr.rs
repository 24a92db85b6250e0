// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Instructions.

use crate::{BlockId, FuncId, MethodId, Pos, ValueId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct InstrId(pub u32);

/// An instruction and where it lives.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Instr {
    pub kind: InstrKind,
    pub func: FuncId,
    pub block: BlockId,
    pub pos: Pos,
    /// The value this instruction defines, if any.
    #[cfg_attr(feature = "serde", serde(default))]
    pub result: Option<ValueId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum InstrKind {
    /// Call; defines a value (a tuple when the callee has several results).
    Call(CallCommon),
    /// Deferred call, runs when the enclosing function returns.
    Defer(CallCommon),
    /// Projection of element `index` out of a tuple.
    Extract { tuple: ValueId, index: u32 },
    /// Address of field `field` of the struct `base` points to.
    FieldAddr { base: ValueId, field: u32 },
    /// Load through a pointer.
    Deref { addr: ValueId },
    /// `*addr = value`.
    Store { addr: ValueId, value: ValueId },
    /// Conversion of a value to an interface type.
    InterfaceUpcast { value: ValueId },
    /// Closure creation; `bindings[i]` is bound to free variable `i` of `func`.
    MakeClosure { func: FuncId, bindings: Vec<ValueId> },
    /// Storage cell for a variable whose address is taken or captured.
    Alloc { heap: bool },
    Return { results: Vec<ValueId> },
    /// Anything the analysis has no rule for (branches, phis, arithmetic).
    Other { op: String, operands: Vec<ValueId> },
}

/// Shared part of `Call` and `Defer`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CallCommon {
    pub callee: Callee,
    /// Arguments; for static method calls the receiver comes first.
    pub args: Vec<ValueId>,
}

/// What a call invokes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Callee {
    /// Direct reference to a function or concrete method.
    Static(FuncId),
    /// Call of a function-typed value (closures, function variables).
    Value(ValueId),
    /// Dynamic dispatch of an interface method on `recv`.
    Invoke { recv: ValueId, method: MethodId },
}

impl InstrKind {
    /// Values this instruction consumes, in operand order, without duplicates.
    pub fn operands(&self) -> Vec<ValueId> {
        let mut ops = Vec::new();
        match self {
            InstrKind::Call(call) | InstrKind::Defer(call) => {
                match call.callee {
                    Callee::Static(_) => {}
                    Callee::Value(v) => ops.push(v),
                    Callee::Invoke { recv, .. } => ops.push(recv),
                }
                ops.extend(call.args.iter().copied());
            }
            InstrKind::Extract { tuple, .. } => ops.push(*tuple),
            InstrKind::FieldAddr { base, .. } => ops.push(*base),
            InstrKind::Deref { addr } => ops.push(*addr),
            InstrKind::Store { addr, value } => {
                ops.push(*addr);
                ops.push(*value);
            }
            InstrKind::InterfaceUpcast { value } => ops.push(*value),
            InstrKind::MakeClosure { bindings, .. } => ops.extend(bindings.iter().copied()),
            InstrKind::Alloc { .. } => {}
            InstrKind::Return { results } => ops.extend(results.iter().copied()),
            InstrKind::Other { operands, .. } => ops.extend(operands.iter().copied()),
        }
        let mut seen = Vec::with_capacity(ops.len());
        ops.retain(|v| {
            if seen.contains(v) {
                false
            } else {
                seen.push(*v);
                true
            }
        });
        ops
    }

    pub fn call_common(&self) -> Option<&CallCommon> {
        match self {
            InstrKind::Call(call) | InstrKind::Defer(call) => Some(call),
            _ => None,
        }
    }

    pub fn mnemonic(&self) -> &str {
        match self {
            InstrKind::Call(_) => "call",
            InstrKind::Defer(_) => "defer",
            InstrKind::Extract { .. } => "extract",
            InstrKind::FieldAddr { .. } => "fieldaddr",
            InstrKind::Deref { .. } => "deref",
            InstrKind::Store { .. } => "store",
            InstrKind::InterfaceUpcast { .. } => "upcast",
            InstrKind::MakeClosure { .. } => "makeclosure",
            InstrKind::Alloc { .. } => "alloc",
            InstrKind::Return { .. } => "return",
            InstrKind::Other { op, .. } => op,
        }
    }
}
