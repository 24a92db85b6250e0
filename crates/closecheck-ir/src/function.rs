// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Function representation - control-flow graph of basic blocks.

use crate::{InstrId, Pos, TypeId, ValueId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct FuncId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct BlockId(pub u32);

/// A function, method, or closure body.
///
/// Functions without blocks are external: declared (so they can be called
/// and their signature is known) but not analyzable.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Function {
    pub id: FuncId,
    pub package: String,
    pub name: String,
    pub signature: TypeId,
    pub params: Vec<ValueId>,
    /// Captured storage cells of a closure, in binding order.
    #[cfg_attr(feature = "serde", serde(default))]
    pub free_vars: Vec<ValueId>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub blocks: Vec<Block>,
    /// Enclosing function of an anonymous function.
    #[cfg_attr(feature = "serde", serde(default))]
    pub parent: Option<FuncId>,
    pub pos: Pos,
}

impl Function {
    pub fn has_body(&self) -> bool {
        !self.blocks.is_empty()
    }

    /// All instructions in block order.
    pub fn instrs(&self) -> impl Iterator<Item = InstrId> + '_ {
        self.blocks.iter().flat_map(|b| b.instrs.iter().copied())
    }

    /// `package.name`, or just `name` for the unnamed package.
    pub fn qualified_name(&self) -> String {
        if self.package.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.package, self.name)
        }
    }
}

/// Basic block - straight-line sequence of instructions.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Block {
    pub id: BlockId,
    pub instrs: Vec<InstrId>,
}
