// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Release analysis for resource-owning values.
//!
//! Finds every call that produces the configured container type (by default
//! `*net/http.Response`) and reports those whose resource field is not
//! guaranteed to reach its release method.

mod config;
mod error;
pub mod report;
pub mod scanner;
pub mod sink;
pub mod target;
pub mod tracer;

pub use config::{AnalyzerOptions, TargetConfig};
pub use error::ConfigError;
pub use report::{Finding, Report, ReportSummary};
pub use scanner::CallSite;
pub use sink::{CollectingSink, NoopSink, SiteTrace, StepKind, TraceSink, TraceStep, TracingSink};
pub use target::TargetDescriptor;
pub use tracer::{Tracer, Verdict};

use closecheck_ir::Program;
use rayon::prelude::*;

static NOOP: NoopSink = NoopSink;

/// Analysis of one program against one target. The descriptor is resolved
/// once, in [`Analyzer::new`], and shared by every call site.
pub struct Analyzer<'a> {
    program: &'a Program,
    target: TargetDescriptor,
    message: String,
    options: AnalyzerOptions,
    sink: &'a dyn TraceSink,
}

impl<'a> Analyzer<'a> {
    pub fn new(program: &'a Program, config: &TargetConfig) -> Result<Self, ConfigError> {
        let target = TargetDescriptor::resolve(program, config)?;
        Ok(Self {
            program,
            target,
            message: config.message(),
            options: AnalyzerOptions::default(),
            sink: &NOOP,
        })
    }

    pub fn with_options(mut self, options: AnalyzerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_sink(mut self, sink: &'a dyn TraceSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn target(&self) -> &TargetDescriptor {
        &self.target
    }

    pub fn sites(&self) -> Vec<CallSite> {
        scanner::scan(self.program, &self.target)
    }

    /// Verdict for one call site, reported to the sink.
    pub fn verify(&self, site: &CallSite) -> Verdict {
        let mut tracer = Tracer::new(self.program, &self.target, self.options.max_depth);
        if self.sink.enabled() {
            tracer = tracer.with_steps();
        }
        let verdict = tracer.verify(site);
        self.sink.record(self.program, site, verdict, &tracer.take_steps());
        verdict
    }

    pub fn run(&self) -> Report {
        let sites = self.sites();
        tracing::debug!(
            sites = sites.len(),
            parallel = self.options.parallel,
            "verifying candidate calls"
        );
        let verdicts: Vec<(CallSite, Verdict)> = if self.options.parallel {
            sites.par_iter().map(|s| (*s, self.verify(s))).collect()
        } else {
            sites.iter().map(|s| (*s, self.verify(s))).collect()
        };

        let mut skipped = 0;
        let mut findings = Vec::new();
        for (site, verdict) in &verdicts {
            match verdict {
                Verdict::Released => {}
                Verdict::ReleasedByCallee(callee) => {
                    skipped += 1;
                    tracing::debug!(
                        site = %self.program.location(site.pos),
                        callee = %self.program.function(*callee).qualified_name(),
                        "callee releases what it acquires"
                    );
                }
                Verdict::NotReleased => {
                    tracing::debug!(site = %self.program.location(site.pos), "not released");
                    findings.push(Finding {
                        pos: site.pos,
                        func: site.func,
                        instr: site.instr,
                        message: self.message.clone(),
                    });
                }
            }
        }
        Report::new(findings, verdicts.len(), skipped)
    }
}

/// Resolve `config` against `program` and check every call site.
pub fn analyze(program: &Program, config: &TargetConfig) -> Result<Report, ConfigError> {
    Ok(Analyzer::new(program, config)?.run())
}
