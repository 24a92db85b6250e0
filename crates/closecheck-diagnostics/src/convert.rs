// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Conversions from analysis results and errors to `Diagnostic`.

use closecheck_analysis::{ConfigError, Finding};
use closecheck_ir::{LoadError, Program};

use crate::codes;
use crate::{Diagnostic, SourceLocation, ToDiagnostic};

// ============================================================================
// Findings
// ============================================================================

impl ToDiagnostic for Finding {
    fn to_diagnostic(&self, program: &Program) -> Diagnostic {
        let func = program.function(self.func).qualified_name();
        Diagnostic::warning(&self.message)
            .with_code(codes::RESOURCE_NOT_RELEASED)
            .at(program, self.pos)
            .with_note(format!("acquired in `{}`", func))
            .with_help("release it on every path, usually with a deferred call right after acquiring it")
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

impl ToDiagnostic for ConfigError {
    fn to_diagnostic(&self, _program: &Program) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string());
        match self {
            ConfigError::PackageNotFound { .. } => diag
                .with_code(codes::PACKAGE_NOT_FOUND)
                .with_help("the program must include the package declaring the container type"),
            ConfigError::TypeNotFound { .. } => diag
                .with_code(codes::TYPE_NOT_FOUND)
                .with_help("a leading `*` selects the pointer type; it must occur in the program"),
            ConfigError::NotAStruct { .. } => diag.with_code(codes::NOT_A_STRUCT),
            ConfigError::FieldNotFound { .. } => diag.with_code(codes::FIELD_NOT_FOUND),
            ConfigError::MethodNotFound { .. } => diag
                .with_code(codes::METHOD_NOT_FOUND)
                .with_help("the method is looked up on the field's declared type and its underlying type"),
        }
    }
}

// ============================================================================
// Load Errors
// ============================================================================

/// Diagnostic for a program file that could not be loaded. There is no
/// program to resolve positions against, so the file itself is the location.
pub fn load_error(err: &LoadError, file: &str) -> Diagnostic {
    let code = match err {
        LoadError::Json(_) => codes::MALFORMED_PROGRAM,
        LoadError::DanglingId { .. } => codes::DANGLING_ID,
        LoadError::DuplicateType { .. } => codes::DUPLICATE_TYPE,
        LoadError::Misnumbered { .. } => codes::MISNUMBERED,
        LoadError::CyclicType { .. } => codes::CYCLIC_TYPE,
    };
    Diagnostic::error(err.to_string())
        .with_code(code)
        .with_location(SourceLocation {
            file: file.to_string(),
            line: 0,
            column: 0,
        })
}
