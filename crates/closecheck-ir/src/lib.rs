// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Program representation consumed by the release analysis.
//!
//! A static-single-assignment view of a whole program: functions made of
//! basic blocks of instructions, values carrying a static type and their
//! reverse def-use edges (referrers), and a type table with identities that
//! can be compared by id. A front end produces it, either through
//! [`ProgramBuilder`] or as JSON (`serde` feature).

mod builder;
mod display;
mod error;
mod function;
mod instr;
mod program;
mod types;
mod value;

pub use builder::{FunctionBuilder, ProgramBuilder};
pub use display::{FunctionDisplay, InstrDisplay};
pub use error::LoadError;
pub use function::{Block, BlockId, FuncId, Function};
pub use instr::{CallCommon, Callee, Instr, InstrId, InstrKind};
pub use program::{FileId, Location, Pos, Program};
pub use types::{Field, FieldId, Method, MethodId, TypeId, TypeKind, TypeTable};
pub use value::{Value, ValueId, ValueKind};
