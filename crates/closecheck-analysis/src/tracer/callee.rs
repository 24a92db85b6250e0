// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Crossing function boundaries: callee checks, parameter forwarding and
//! captured cells. Each crossing pushes a frame on the active path, and a
//! frame that is already active fails instead of recursing again.

use closecheck_ir::{Callee, CallCommon, FuncId, InstrId, InstrKind, ValueId};

use super::{Frame, Tracer};
use crate::scanner;
use crate::sink::StepKind;
use crate::CallSite;

impl Tracer<'_> {
    fn guarded(&mut self, frame: Frame, f: impl FnOnce(&mut Self) -> bool) -> bool {
        if self.frames.contains(&frame) {
            self.step(StepKind::Reentry, None);
            return false;
        }
        if self.depth >= self.max_depth {
            self.step(StepKind::DepthLimit, None);
            return false;
        }
        self.frames.push(frame);
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        self.frames.pop();
        result
    }

    /// True if every candidate call inside `func` is released by `func`
    /// itself. A function without candidate calls proves nothing.
    pub(super) fn callee_releases(&mut self, func: FuncId) -> bool {
        let program = self.program;
        if !program.function(func).has_body() {
            return false;
        }
        self.step(StepKind::CalleeCheck(func), None);
        self.guarded(Frame::Callee(func), |t| {
            let sites = scanner::candidates_in(program, t.target, func);
            !sites.is_empty() && sites.iter().all(|site| t.candidate_releases(site))
        })
    }

    fn candidate_releases(&mut self, site: &CallSite) -> bool {
        let program = self.program;
        let nested = program
            .instr(site.instr)
            .kind
            .call_common()
            .and_then(|call| program.static_callee(call));
        if let Some(callee) = nested {
            if self.callee_releases(callee) {
                return true;
            }
        }
        self.result_releases(site.instr)
    }

    /// Follow `value` into each parameter it is passed to. Only statically
    /// resolved functions without a receiver are followed; bound methods
    /// never are.
    pub(super) fn forward(&mut self, value: ValueId, at: InstrId, call: &CallCommon) -> bool {
        let program = self.program;
        let Some(callee) = program.static_callee(call) else {
            return self.dead_end(at);
        };
        let func = program.function(callee);
        if program.has_receiver(callee) || !func.has_body() {
            return self.dead_end(at);
        }
        let indices: Vec<usize> = call
            .args
            .iter()
            .enumerate()
            .filter(|(_, a)| **a == value)
            .map(|(i, _)| i)
            .collect();
        if indices.is_empty() {
            return self.dead_end(at);
        }
        self.step(StepKind::Forward(callee), Some(at));
        indices.into_iter().any(|index| match func.params.get(index) {
            Some(param) => {
                let param = *param;
                self.guarded(Frame::Param(callee, index), |t| t.releases(param))
            }
            None => false,
        })
    }

    /// The value was stored into `cell`; follow closures capturing the cell.
    pub(super) fn cell_releases(&mut self, cell: ValueId) -> bool {
        let program = self.program;
        program.referrers(cell).iter().any(|r| {
            matches!(program.instr(*r).kind, InstrKind::MakeClosure { .. }) && self.closure_releases(*r, cell)
        })
    }

    /// `make_closure` binds `bound`. If the closure is invoked, trace the
    /// matching free variables inside its body.
    pub(super) fn closure_releases(&mut self, make_closure: InstrId, bound: ValueId) -> bool {
        let program = self.program;
        let instr = program.instr(make_closure);
        let (InstrKind::MakeClosure { func, bindings }, Some(closure)) = (&instr.kind, instr.result) else {
            return false;
        };
        let func = *func;
        let invoked = program.referrers(closure).iter().any(|r| {
            program
                .instr(*r)
                .kind
                .call_common()
                .is_some_and(|call| call.callee == Callee::Value(closure))
        });
        if !invoked {
            return self.dead_end(make_closure);
        }
        let free_vars = &program.function(func).free_vars;
        self.step(StepKind::Closure(func), Some(make_closure));
        bindings
            .iter()
            .enumerate()
            .filter(|(_, b)| **b == bound)
            .any(|(index, _)| match free_vars.get(index) {
                Some(fv) => {
                    let fv = *fv;
                    self.guarded(Frame::Closure(func, index), |t| t.releases(fv))
                }
                None => false,
            })
    }
}
