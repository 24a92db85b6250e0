// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! closecheck diagnostics.
//!
//! A single diagnostic type for everything the driver prints: findings,
//! configuration failures and program load failures. Each source type is
//! converted through `ToDiagnostic`, so the analysis crates stay free of
//! presentation concerns.

pub mod codes;
pub mod convert;
pub mod formatter;
pub mod json;

use closecheck_ir::{Pos, Program};
use serde::Serialize;

// ============================================================================
// Core Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: Option<ErrorCode>,
    pub message: String,
    pub location: Option<SourceLocation>,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Note,
}

/// A code like C0001.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ErrorCode(pub String);

/// A resolved source position. Line and column are 1-based; a zero line
/// means the front end had no position for the instruction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn from_pos(program: &Program, pos: Pos) -> Self {
        let loc = program.location(pos);
        Self {
            file: loc.file.to_string(),
            line: loc.line,
            column: loc.column,
        }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.line == 0 {
            write!(f, "{}", self.file)
        } else {
            write!(f, "{}:{}:{}", self.file, self.line, self.column)
        }
    }
}

// ============================================================================
// Builder API
// ============================================================================

impl Diagnostic {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: None,
            message: message.into(),
            location: None,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(ErrorCode(code.into()));
        self
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn at(self, program: &Program, pos: Pos) -> Self {
        self.with_location(SourceLocation::from_pos(program, pos))
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

// ============================================================================
// Conversion Trait
// ============================================================================

/// Convert a finding or error into a diagnostic. The program resolves
/// positions and function names.
pub trait ToDiagnostic {
    fn to_diagnostic(&self, program: &Program) -> Diagnostic;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_every_part() {
        let diag = Diagnostic::warning("response body must be closed")
            .with_code("C0001")
            .with_location(SourceLocation {
                file: "a/func.go".to_string(),
                line: 9,
                column: 2,
            })
            .with_note("in function a.f")
            .with_help("defer resp.Body.Close()");
        assert_eq!(diag.severity, Severity::Warning);
        assert_eq!(diag.code, Some(ErrorCode("C0001".to_string())));
        assert_eq!(diag.location.as_ref().map(|l| l.to_string()).as_deref(), Some("a/func.go:9:2"));
        assert_eq!(diag.notes.len(), 1);
        assert!(!diag.is_error());
    }

    #[test]
    fn unknown_position_prints_file_only() {
        let loc = SourceLocation {
            file: "net/http/client.go".to_string(),
            line: 0,
            column: 0,
        };
        assert_eq!(loc.to_string(), "net/http/client.go");
    }
}
