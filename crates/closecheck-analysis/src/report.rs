// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Findings produced by a run.

use closecheck_ir::{FuncId, InstrId, Pos, Program};
use serde::Serialize;

/// A call site whose resource is not guaranteed to be released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub pos: Pos,
    /// Function containing the call.
    pub func: FuncId,
    pub instr: InstrId,
    pub message: String,
}

impl Finding {
    /// `location: message`, the one-line form drivers print.
    pub fn render(&self, program: &Program) -> String {
        format!("{}: {}", program.location(self.pos), self.message)
    }
}

/// All findings of a run, in source-position order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub findings: Vec<Finding>,
    /// Candidate call sites looked at.
    pub sites_checked: usize,
    /// Sites skipped because their callee releases by itself.
    pub sites_skipped: usize,
}

impl Report {
    pub(crate) fn new(mut findings: Vec<Finding>, sites_checked: usize, sites_skipped: usize) -> Self {
        findings.sort_by_key(|f| (f.pos, f.instr));
        Self {
            findings,
            sites_checked,
            sites_skipped,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            findings: self.findings.len(),
            sites_checked: self.sites_checked,
            sites_skipped: self.sites_skipped,
        }
    }
}

/// Counts only, for JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub findings: usize,
    pub sites_checked: usize,
    pub sites_skipped: usize,
}
