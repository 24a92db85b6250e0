// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Trace sinks.
//!
//! A sink receives the breadcrumbs of each verified call site after its
//! verdict is fixed. Breadcrumbs are only collected when the installed sink
//! is enabled, and nothing a sink sees can change a verdict.

use std::fmt;
use std::sync::Mutex;

use closecheck_ir::{FuncId, InstrId, Program};

use crate::{CallSite, Verdict};

/// What the tracer did at one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Started on the result of a candidate call.
    CallResult,
    /// Followed a tuple projection of the container.
    Projection,
    /// Followed the address of the resource field.
    ResourceField,
    Deref,
    /// Value stored into a cell.
    Store,
    /// Entered an invoked closure through a captured cell.
    Closure(FuncId),
    Upcast,
    /// Reached the release method.
    Release,
    /// Followed the value into a parameter of a plain function.
    Forward(FuncId),
    /// Value returned to the caller.
    Return,
    /// Asked whether a callee releases everything it acquires.
    CalleeCheck(FuncId),
    DeadEnd,
    /// Frame already on the active path.
    Reentry,
    DepthLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceStep {
    pub depth: usize,
    pub kind: StepKind,
    /// Instruction the step was taken at, when there is one.
    pub instr: Option<InstrId>,
}

impl StepKind {
    fn label(&self, program: &Program) -> String {
        let name = |f: &FuncId| program.function(*f).qualified_name();
        match self {
            StepKind::CallResult => "call result".to_string(),
            StepKind::Projection => "projection".to_string(),
            StepKind::ResourceField => "resource field".to_string(),
            StepKind::Deref => "deref".to_string(),
            StepKind::Store => "store".to_string(),
            StepKind::Closure(f) => format!("closure {}", name(f)),
            StepKind::Upcast => "upcast".to_string(),
            StepKind::Release => "release".to_string(),
            StepKind::Forward(f) => format!("forward into {}", name(f)),
            StepKind::Return => "return".to_string(),
            StepKind::CalleeCheck(f) => format!("callee check {}", name(f)),
            StepKind::DeadEnd => "dead end".to_string(),
            StepKind::Reentry => "re-entry".to_string(),
            StepKind::DepthLimit => "depth limit".to_string(),
        }
    }
}

impl TraceStep {
    pub fn display<'a>(&'a self, program: &'a Program) -> StepDisplay<'a> {
        StepDisplay { step: self, program }
    }
}

pub struct StepDisplay<'a> {
    step: &'a TraceStep,
    program: &'a Program,
}

impl fmt::Display for StepDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indent = self.step.depth.min(32) * 2;
        write!(f, "{:indent$}{}", "", self.step.kind.label(self.program), indent = indent)?;
        if let Some(instr) = self.step.instr {
            write!(f, "  [{}]", self.program.display_instr(instr))?;
        }
        Ok(())
    }
}

pub trait TraceSink: Sync {
    /// Called once per verified call site.
    fn record(&self, program: &Program, site: &CallSite, verdict: Verdict, steps: &[TraceStep]);

    /// Whether breadcrumbs should be collected at all.
    fn enabled(&self) -> bool {
        true
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl TraceSink for NoopSink {
    fn record(&self, _: &Program, _: &CallSite, _: Verdict, _: &[TraceStep]) {}

    fn enabled(&self) -> bool {
        false
    }
}

/// Emits breadcrumbs as `tracing` events at trace level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TraceSink for TracingSink {
    fn record(&self, program: &Program, site: &CallSite, verdict: Verdict, steps: &[TraceStep]) {
        let location = program.location(site.pos);
        tracing::trace!(site = %location, ?verdict, steps = steps.len(), "call site traced");
        for step in steps {
            tracing::trace!(site = %location, "{}", step.display(program));
        }
    }

    fn enabled(&self) -> bool {
        tracing::enabled!(tracing::Level::TRACE)
    }
}

/// One recorded call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteTrace {
    pub site: CallSite,
    pub verdict: Verdict,
    pub steps: Vec<TraceStep>,
}

/// Keeps every trace in memory, for tests and `--explain`.
#[derive(Debug, Default)]
pub struct CollectingSink {
    traces: Mutex<Vec<SiteTrace>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded traces in source-position order.
    pub fn take(&self) -> Vec<SiteTrace> {
        let mut traces = match self.traces.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        traces.sort_by_key(|t| (t.site.pos, t.site.instr));
        traces
    }
}

impl TraceSink for CollectingSink {
    fn record(&self, _: &Program, site: &CallSite, verdict: Verdict, steps: &[TraceStep]) {
        let trace = SiteTrace {
            site: *site,
            verdict,
            steps: steps.to_vec(),
        };
        match self.traces.lock() {
            Ok(mut guard) => guard.push(trace),
            Err(poisoned) => poisoned.into_inner().push(trace),
        }
    }
}
