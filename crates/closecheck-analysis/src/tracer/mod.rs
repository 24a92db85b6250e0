// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Use-graph tracer.
//!
//! Decides whether a traced value is guaranteed to reach the release
//! method. The raw result of a candidate call is checked in ALL-mode: every
//! container-typed projection of it has to be released, and when the call
//! returns the container itself every field address taken on it has to lead
//! to the release unless the whole value is handed on. Every derived node
//! (projection, field address, dereference, captured cell, upcast, forwarded
//! parameter) is checked in ANY-mode over its referrers.
//!
//! Each step follows the referrer table:
//!
//! | Referrer                               | Outcome                          |
//! |----------------------------------------|----------------------------------|
//! | extract of the container type          | follow the projection            |
//! | address of the resource field          | follow the field                 |
//! | any other field address                | dead end                         |
//! | deref of a container or resource cell  | follow the loaded value          |
//! | store into a cell                      | follow invoked closures' capture |
//! | interface upcast                       | follow the upcast value          |
//! | release method on the value            | released                         |
//! | argument of a plain function           | follow the parameter             |
//! | return of container or resource        | released in transfer mode        |
//! | anything else                          | dead end                         |

mod callee;

use closecheck_ir::{Callee, CallCommon, FuncId, InstrId, InstrKind, Program, ValueId};

use crate::sink::{StepKind, TraceStep};
use crate::{CallSite, TargetDescriptor};

/// Outcome for one candidate call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Every acquired container is released (or handed back to a caller).
    Released,
    /// Skipped: the static callee releases everything it acquires itself.
    ReleasedByCallee(FuncId),
    NotReleased,
}

impl Verdict {
    pub fn is_released(&self) -> bool {
        !matches!(self, Verdict::NotReleased)
    }
}

/// How a `return` of the traced value counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Returning hands the obligation to the caller, whose own call site is
    /// checked separately.
    Transfer,
    /// Inside a callee check the function must release by itself; returning
    /// is not a release.
    Retain,
}

/// An entry of the active recursion path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Callee(FuncId),
    Param(FuncId, usize),
    Closure(FuncId, usize),
}

/// Per-call-site tracer. Holds nothing but the active path and the optional
/// breadcrumbs, so independent sites can use independent tracers.
pub struct Tracer<'a> {
    program: &'a Program,
    target: &'a TargetDescriptor,
    max_depth: usize,
    mode: Mode,
    frames: Vec<Frame>,
    depth: usize,
    steps: Option<Vec<TraceStep>>,
}

impl<'a> Tracer<'a> {
    pub fn new(program: &'a Program, target: &'a TargetDescriptor, max_depth: usize) -> Self {
        Self {
            program,
            target,
            max_depth,
            mode: Mode::Transfer,
            frames: Vec::new(),
            depth: 0,
            steps: None,
        }
    }

    /// Collect breadcrumbs from now on.
    pub fn with_steps(mut self) -> Self {
        self.steps = Some(Vec::new());
        self
    }

    pub fn take_steps(&mut self) -> Vec<TraceStep> {
        self.steps.take().unwrap_or_default()
    }

    /// Verdict for one candidate call site.
    ///
    /// A statically known callee that releases every container it acquires
    /// makes the site safe without looking at the result. This skip does
    /// not notice callees that release only on some paths, or that reopen a
    /// handle into the variable they already released.
    pub fn verify(&mut self, site: &CallSite) -> Verdict {
        let program = self.program;
        let Some(call) = program.instr(site.instr).kind.call_common() else {
            return Verdict::NotReleased;
        };
        if let Some(callee) = program.static_callee(call) {
            if self.in_mode(Mode::Retain, |t| t.callee_releases(callee)) {
                return Verdict::ReleasedByCallee(callee);
            }
        }
        if self.in_mode(Mode::Transfer, |t| t.result_releases(site.instr)) {
            Verdict::Released
        } else {
            Verdict::NotReleased
        }
    }

    fn in_mode(&mut self, mode: Mode, f: impl FnOnce(&mut Self) -> bool) -> bool {
        let saved = std::mem::replace(&mut self.mode, mode);
        let result = f(self);
        self.mode = saved;
        result
    }

    fn step(&mut self, kind: StepKind, instr: Option<InstrId>) {
        let depth = self.depth;
        if let Some(steps) = &mut self.steps {
            steps.push(TraceStep { depth, kind, instr });
        }
    }

    /// ALL-mode over the container-typed projections of a call result.
    /// Every tuple slot of the container type needs at least one projection,
    /// and each projection has to be released.
    fn result_releases(&mut self, call: InstrId) -> bool {
        self.step(StepKind::CallResult, Some(call));
        let program = self.program;
        let Some(result) = program.instr(call).result else {
            return false;
        };
        let container = self.target.container;
        let ty = program.type_of(result);

        if ty == container {
            return self.container_releases(result);
        }
        let projections = {
            let Some(elems) = program.types.tuple_elems(ty) else {
                return false;
            };
            let mut projections = Vec::new();
            for (index, _) in elems.iter().enumerate().filter(|(_, e)| **e == container) {
                let extracts: Vec<ValueId> = program
                    .referrers(result)
                    .iter()
                    .filter_map(|r| {
                        let instr = program.instr(*r);
                        match instr.kind {
                            InstrKind::Extract { index: i, .. } if i as usize == index => instr.result,
                            _ => None,
                        }
                    })
                    .collect();
                if extracts.is_empty() {
                    self.step(StepKind::DeadEnd, Some(call));
                    return false;
                }
                projections.extend(extracts);
            }
            projections
        };

        !projections.is_empty() && projections.into_iter().all(|p| self.releases(p))
    }

    /// A single container result. Field addresses taken directly on it are
    /// checked in ALL-mode, so reading `StatusCode` next to a release does not
    /// count as releasing. Handing the whole value on (release call,
    /// forwarding, capture, return) is checked in ANY-mode.
    fn container_releases(&mut self, result: ValueId) -> bool {
        if self.depth >= self.max_depth {
            self.step(StepKind::DepthLimit, None);
            return false;
        }
        let program = self.program;
        let (fields, handoffs): (Vec<InstrId>, Vec<InstrId>) = program
            .referrers(result)
            .iter()
            .copied()
            .partition(|r| matches!(&program.instr(*r).kind, InstrKind::FieldAddr { base, .. } if *base == result));

        self.depth += 1;
        let released = handoffs.iter().any(|r| self.referrer_releases(result, *r))
            || (!fields.is_empty() && fields.iter().all(|r| self.referrer_releases(result, *r)));
        self.depth -= 1;
        released
    }

    /// ANY-mode: true if one referrer of `value` leads to a release.
    fn releases(&mut self, value: ValueId) -> bool {
        if self.depth >= self.max_depth {
            self.step(StepKind::DepthLimit, None);
            return false;
        }
        self.depth += 1;
        let program = self.program;
        let found = program
            .referrers(value)
            .iter()
            .any(|r| self.referrer_releases(value, *r));
        self.depth -= 1;
        found
    }

    fn referrer_releases(&mut self, value: ValueId, at: InstrId) -> bool {
        let program = self.program;
        let target = self.target;
        let instr = program.instr(at);
        match &instr.kind {
            InstrKind::Extract { .. } => match instr.result {
                Some(r) if program.type_of(r) == target.container => {
                    self.step(StepKind::Projection, Some(at));
                    self.releases(r)
                }
                _ => self.dead_end(at),
            },
            InstrKind::FieldAddr { base, field } => {
                let is_resource = *base == value
                    && program.types.field_at(program.type_of(*base), *field) == Some(target.resource_field);
                match instr.result {
                    Some(r) if is_resource => {
                        self.step(StepKind::ResourceField, Some(at));
                        self.releases(r)
                    }
                    _ => self.dead_end(at),
                }
            }
            InstrKind::Deref { addr } => {
                let pointee = program.types.pointer_elem(program.type_of(*addr));
                let tracked = pointee.is_some_and(|t| t == target.container || t == target.resource);
                match instr.result {
                    Some(r) if tracked => {
                        self.step(StepKind::Deref, Some(at));
                        self.releases(r)
                    }
                    _ => self.dead_end(at),
                }
            }
            InstrKind::Store { addr, value: stored } if *stored == value => {
                self.step(StepKind::Store, Some(at));
                self.cell_releases(*addr)
            }
            InstrKind::MakeClosure { .. } => self.closure_releases(at, value),
            InstrKind::InterfaceUpcast { .. } => match instr.result {
                Some(r) => {
                    self.step(StepKind::Upcast, Some(at));
                    self.releases(r)
                }
                None => self.dead_end(at),
            },
            InstrKind::Call(call) | InstrKind::Defer(call) => self.call_releases(value, at, call),
            InstrKind::Return { .. } => {
                let ty = program.type_of(value);
                if self.mode == Mode::Transfer && (ty == target.container || ty == target.resource) {
                    self.step(StepKind::Return, Some(at));
                    true
                } else {
                    self.dead_end(at)
                }
            }
            _ => self.dead_end(at),
        }
    }

    fn dead_end(&mut self, at: InstrId) -> bool {
        self.step(StepKind::DeadEnd, Some(at));
        false
    }

    /// The value is the receiver of the release method, or an argument of
    /// a plain function that releases it.
    fn call_releases(&mut self, value: ValueId, at: InstrId, call: &CallCommon) -> bool {
        let target = self.target;
        let released = match call.callee {
            Callee::Invoke { recv, method } => recv == value && method == target.release,
            Callee::Static(f) => Some(f) == target.release_func && call.args.first() == Some(&value),
            Callee::Value(_) => false,
        };
        if released {
            self.step(StepKind::Release, Some(at));
            return true;
        }
        self.forward(value, at, call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_release_states() {
        assert!(Verdict::Released.is_released());
        assert!(Verdict::ReleasedByCallee(FuncId(3)).is_released());
        assert!(!Verdict::NotReleased.is_released());
    }
}
