// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Candidate call site discovery.

use closecheck_ir::{FuncId, InstrId, InstrKind, Pos, Program, TypeId};

use crate::TargetDescriptor;

/// A call whose result includes a container-typed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallSite {
    pub instr: InstrId,
    pub func: FuncId,
    pub pos: Pos,
}

/// The call if `instr` is a candidate: a plain call (not a defer) whose
/// result is the container type, or a tuple with a container-typed element.
/// Types are compared by identity.
pub fn candidate_call(program: &Program, target: &TargetDescriptor, instr: InstrId) -> Option<CallSite> {
    let ins = program.instr(instr);
    if !matches!(ins.kind, InstrKind::Call(_)) {
        return None;
    }
    let result = ins.result?;
    if produces_container(program, target.container, program.type_of(result)) {
        Some(CallSite {
            instr,
            func: ins.func,
            pos: ins.pos,
        })
    } else {
        None
    }
}

fn produces_container(program: &Program, container: TypeId, ty: TypeId) -> bool {
    ty == container
        || program
            .types
            .tuple_elems(ty)
            .is_some_and(|elems| elems.contains(&container))
}

/// Candidate call sites of one function, in block order.
pub fn candidates_in(program: &Program, target: &TargetDescriptor, func: FuncId) -> Vec<CallSite> {
    program
        .function(func)
        .instrs()
        .filter_map(|id| candidate_call(program, target, id))
        .collect()
}

/// Candidate call sites of the whole program, function by function.
pub fn scan(program: &Program, target: &TargetDescriptor) -> Vec<CallSite> {
    let mut sites = Vec::new();
    for func in program.functions() {
        if !func.has_body() {
            continue;
        }
        let found = candidates_in(program, target, func.id);
        if !found.is_empty() {
            tracing::debug!(func = %func.qualified_name(), sites = found.len(), "candidate calls");
            for site in &found {
                let referrers = program.instr(site.instr).result.map_or(0, |r| program.referrers(r).len());
                tracing::debug!(
                    at = %program.location(site.pos),
                    referrers,
                    "{}",
                    program.display_instr(site.instr)
                );
            }
        }
        sites.extend(found);
    }
    sites
}
