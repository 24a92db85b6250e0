// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Textual dump of functions and instructions.

use std::fmt;

use crate::{Callee, FuncId, InstrId, InstrKind, Program, ValueId};

/// Displays one instruction, e.g. `t3 = deref t2`.
pub struct InstrDisplay<'a> {
    program: &'a Program,
    id: InstrId,
}

/// Displays a whole function with its blocks.
pub struct FunctionDisplay<'a> {
    program: &'a Program,
    id: FuncId,
}

impl Program {
    pub fn display_instr(&self, id: InstrId) -> InstrDisplay<'_> {
        InstrDisplay { program: self, id }
    }

    pub fn display_function(&self, id: FuncId) -> FunctionDisplay<'_> {
        FunctionDisplay { program: self, id }
    }

    fn value_name(&self, id: ValueId) -> &str {
        &self.value(id).name
    }
}

fn write_values(f: &mut fmt::Formatter<'_>, program: &Program, values: &[ValueId]) -> fmt::Result {
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", program.value_name(*v))?;
    }
    Ok(())
}

impl fmt::Display for InstrDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.program;
        let instr = p.instr(self.id);
        if let Some(r) = instr.result {
            write!(f, "{} = ", p.value_name(r))?;
        }
        match &instr.kind {
            InstrKind::Call(call) | InstrKind::Defer(call) => {
                if matches!(instr.kind, InstrKind::Defer(_)) {
                    write!(f, "defer ")?;
                }
                match &call.callee {
                    Callee::Static(func) => write!(f, "{}", p.function(*func).qualified_name())?,
                    Callee::Value(v) => write!(f, "{}", p.value_name(*v))?,
                    Callee::Invoke { recv, method } => {
                        write!(f, "invoke {}.{}", p.value_name(*recv), p.types.method(*method).name)?
                    }
                }
                write!(f, "(")?;
                write_values(f, p, &call.args)?;
                write!(f, ")")?;
            }
            InstrKind::Extract { tuple, index } => write!(f, "extract {} #{}", p.value_name(*tuple), index)?,
            InstrKind::FieldAddr { base, field } => {
                let name = p
                    .types
                    .field_at(p.type_of(*base), *field)
                    .map(|id| p.types.field(id).name.as_str())
                    .unwrap_or("?");
                write!(f, "&{}.{} [#{}]", p.value_name(*base), name, field)?
            }
            InstrKind::Deref { addr } => write!(f, "*{}", p.value_name(*addr))?,
            InstrKind::Store { addr, value } => {
                write!(f, "*{} = {}", p.value_name(*addr), p.value_name(*value))?
            }
            InstrKind::InterfaceUpcast { value } => write!(f, "change interface {}", p.value_name(*value))?,
            InstrKind::MakeClosure { func, bindings } => {
                write!(f, "make closure {} [", p.function(*func).qualified_name())?;
                write_values(f, p, bindings)?;
                write!(f, "]")?;
            }
            InstrKind::Alloc { heap } => write!(f, "{}", if *heap { "new" } else { "local" })?,
            InstrKind::Return { results } => {
                write!(f, "return")?;
                if !results.is_empty() {
                    write!(f, " ")?;
                    write_values(f, p, results)?;
                }
            }
            InstrKind::Other { op, operands } => {
                write!(f, "{}", op)?;
                if !operands.is_empty() {
                    write!(f, " ")?;
                    write_values(f, p, operands)?;
                }
            }
        }
        if let Some(r) = instr.result {
            write!(f, " : {}", p.types.type_string(p.type_of(r)))?;
        }
        Ok(())
    }
}

impl fmt::Display for FunctionDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.program;
        let func = p.function(self.id);
        write!(f, "func {}(", func.qualified_name())?;
        for (i, param) in func.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {}", p.value_name(*param), p.types.type_string(p.type_of(*param)))?;
        }
        write!(f, ")")?;
        if let Some(parent) = func.parent {
            write!(f, " // in {}", p.function(parent).qualified_name())?;
        }
        writeln!(f)?;
        if !func.has_body() {
            return writeln!(f, "  (external)");
        }
        for fv in &func.free_vars {
            writeln!(f, "  # free {} {}", p.value_name(*fv), p.types.type_string(p.type_of(*fv)))?;
        }
        for block in &func.blocks {
            writeln!(f, "{}:", block.id.0)?;
            for &id in &block.instrs {
                let pos = p.instr(id).pos;
                writeln!(f, "  {:<48} ; {}", p.display_instr(id).to_string(), p.location(pos))?;
            }
        }
        Ok(())
    }
}
