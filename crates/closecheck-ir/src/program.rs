// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Whole-program container and source positions.

#[cfg(feature = "serde")]
use std::collections::HashSet;
use std::fmt;

use crate::{
    CallCommon, Callee, FuncId, Function, Instr, InstrId, InstrKind, TypeId, TypeTable, Value, ValueId,
    ValueKind,
};
#[cfg(feature = "serde")]
use crate::{LoadError, TypeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct FileId(pub u32);

/// Source position. Ordering is file, then line, then column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pos {
    pub file: FileId,
    /// 1-based; 0 when the front end had no position.
    pub line: u32,
    pub column: u32,
}

impl Pos {
    pub fn new(file: FileId, line: u32, column: u32) -> Self {
        Self { file, line, column }
    }

    pub fn is_known(&self) -> bool {
        self.line != 0
    }
}

/// A position resolved against the program's file table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location<'a> {
    pub file: &'a str,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Location<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{}", self.file)
        } else {
            write!(f, "{}:{}:{}", self.file, self.line, self.column)
        }
    }
}

/// A fully built program. Immutable once constructed: referrer sets are
/// computed exactly once, by [`crate::ProgramBuilder::finish`] or by
/// loading.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Program {
    pub types: TypeTable,
    pub(crate) files: Vec<String>,
    pub(crate) values: Vec<Value>,
    pub(crate) instrs: Vec<Instr>,
    pub(crate) funcs: Vec<Function>,
}

impl Program {
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.funcs.iter()
    }

    pub fn function(&self, id: FuncId) -> &Function {
        &self.funcs[id.0 as usize]
    }

    pub fn function_count(&self) -> usize {
        self.funcs.len()
    }

    pub fn value(&self, id: ValueId) -> &Value {
        &self.values[id.0 as usize]
    }

    pub fn instr(&self, id: InstrId) -> &Instr {
        &self.instrs[id.0 as usize]
    }

    pub fn type_of(&self, id: ValueId) -> TypeId {
        self.value(id).ty
    }

    /// Instructions consuming `id`.
    pub fn referrers(&self, id: ValueId) -> &[InstrId] {
        &self.value(id).referrers
    }

    pub fn file_name(&self, id: FileId) -> &str {
        self.files
            .get(id.0 as usize)
            .map(String::as_str)
            .unwrap_or("<unknown>")
    }

    pub fn location(&self, pos: Pos) -> Location<'_> {
        Location {
            file: self.file_name(pos.file),
            line: pos.line,
            column: pos.column,
        }
    }

    /// Function a call statically resolves to: a direct reference, or a
    /// closure created in place.
    pub fn static_callee(&self, call: &CallCommon) -> Option<FuncId> {
        match &call.callee {
            Callee::Static(f) => Some(*f),
            Callee::Value(v) => match &self.value(*v).kind {
                ValueKind::Func(f) => Some(*f),
                ValueKind::Instr(i) => match &self.instr(*i).kind {
                    InstrKind::MakeClosure { func, .. } => Some(*func),
                    _ => None,
                },
                _ => None,
            },
            Callee::Invoke { .. } => None,
        }
    }

    /// True for methods (functions whose signature has a receiver).
    pub fn has_receiver(&self, id: FuncId) -> bool {
        self.types
            .signature(self.function(id).signature)
            .is_some_and(|(recv, _, _)| recv.is_some())
    }

    /// Compute referrer sets from instruction operands.
    pub(crate) fn link(&mut self) {
        for value in &mut self.values {
            value.referrers.clear();
        }
        for func in &self.funcs {
            for block in &func.blocks {
                for &id in &block.instrs {
                    for op in self.instrs[id.0 as usize].kind.operands() {
                        self.values[op.0 as usize].referrers.push(id);
                    }
                }
            }
        }
    }

    /// Check that every id points into its table and that structural types
    /// are unique, so identity comparisons stay meaningful.
    #[cfg(feature = "serde")]
    pub(crate) fn validate(&self) -> Result<(), LoadError> {
        let types = self.types.types.len();
        let fields = self.types.fields.len();
        let methods = self.types.methods.len();
        let check = |what: &'static str, id: u32, len: usize| {
            if (id as usize) < len {
                Ok(())
            } else {
                Err(LoadError::DanglingId { what, id })
            }
        };

        let mut structural = HashSet::new();
        for (id, kind) in self.types.iter() {
            if kind.is_structural() && !structural.insert(kind) {
                return Err(LoadError::DuplicateType { id: id.0 });
            }
            match kind {
                TypeKind::Basic(_) => {}
                TypeKind::Named { underlying, methods: ms, .. } => {
                    if let Some(u) = underlying {
                        check("type", u.0, types)?;
                    }
                    for m in ms {
                        check("method", m.0, methods)?;
                    }
                }
                TypeKind::Alias { target, .. } => check("type", target.0, types)?,
                TypeKind::Pointer(t) | TypeKind::Slice(t) => check("type", t.0, types)?,
                TypeKind::Struct(fs) => {
                    for f in fs {
                        check("field", f.0, fields)?;
                    }
                }
                TypeKind::Interface(ms) => {
                    for m in ms {
                        check("method", m.0, methods)?;
                    }
                }
                TypeKind::Tuple(ts) => {
                    for t in ts {
                        check("type", t.0, types)?;
                    }
                }
                TypeKind::Signature { recv, params, results } => {
                    for t in recv.iter().chain(params).chain(results) {
                        check("type", t.0, types)?;
                    }
                }
                TypeKind::Map { key, value } => {
                    check("type", key.0, types)?;
                    check("type", value.0, types)?;
                }
            }
        }
        // Named and alias layers must bottom out in a type literal.
        for (id, _) in self.types.iter() {
            let mut seen = HashSet::new();
            let mut at = id;
            loop {
                if !seen.insert(at) {
                    return Err(LoadError::CyclicType { id: id.0 });
                }
                at = match self.types.get(at) {
                    TypeKind::Named { underlying: Some(u), .. } => *u,
                    TypeKind::Alias { target, .. } => *target,
                    _ => break,
                };
            }
        }
        for field in &self.types.fields {
            check("type", field.ty.0, types)?;
        }
        for method in &self.types.methods {
            check("type", method.signature.0, types)?;
            if let Some(f) = method.func {
                check("function", f.0, self.funcs.len())?;
            }
        }

        for value in &self.values {
            check("type", value.ty.0, types)?;
            match &value.kind {
                ValueKind::Param { func, .. } | ValueKind::FreeVar { func, .. } | ValueKind::Func(func) => {
                    check("function", func.0, self.funcs.len())?
                }
                ValueKind::Instr(i) => check("instruction", i.0, self.instrs.len())?,
                ValueKind::Global { .. } | ValueKind::Const(_) => {}
            }
        }

        for instr in &self.instrs {
            check("function", instr.func.0, self.funcs.len())?;
            check("file", instr.pos.file.0, self.files.len().max(1))?;
            if let Some(r) = instr.result {
                check("value", r.0, self.values.len())?;
            }
            for op in instr.kind.operands() {
                check("value", op.0, self.values.len())?;
            }
            match &instr.kind {
                InstrKind::Call(call) | InstrKind::Defer(call) => match &call.callee {
                    Callee::Static(f) => check("function", f.0, self.funcs.len())?,
                    Callee::Invoke { method, .. } => check("method", method.0, methods)?,
                    Callee::Value(_) => {}
                },
                InstrKind::MakeClosure { func, .. } => check("function", func.0, self.funcs.len())?,
                _ => {}
            }
        }

        for (index, func) in self.funcs.iter().enumerate() {
            if func.id.0 as usize != index {
                return Err(LoadError::Misnumbered { what: "function", id: func.id.0 });
            }
            check("type", func.signature.0, types)?;
            for v in func.params.iter().chain(&func.free_vars) {
                check("value", v.0, self.values.len())?;
            }
            for block in &func.blocks {
                for i in &block.instrs {
                    check("instruction", i.0, self.instrs.len())?;
                }
            }
        }
        Ok(())
    }

    /// Load a program serialized by a front end.
    #[cfg(feature = "serde")]
    pub fn from_json(text: &str) -> Result<Program, LoadError> {
        let mut program: Program = serde_json::from_str(text)?;
        program.validate()?;
        program.link();
        Ok(program)
    }

    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, LoadError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
