// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! JSON diagnostic output for machine consumption.
//!
//! Use `--format json` to get one report per analyzed program.

use serde::Serialize;

use crate::{codes::ErrorCodeRegistry, Diagnostic, Severity, SourceLocation};

/// Diagnostics for one analyzed program.
#[derive(Debug, Serialize)]
pub struct DiagnosticReport {
    /// Schema version for forward compatibility.
    pub version: u32,
    /// The program file that was analyzed.
    pub program: String,
    /// No errors and no findings.
    pub success: bool,
    pub diagnostics: Vec<JsonDiagnostic>,
    pub error_count: usize,
    pub warning_count: usize,
    /// Candidate call sites verified, when the analysis ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sites_checked: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct JsonDiagnostic {
    /// "error", "warning" or "note".
    pub severity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Code category, e.g. "Leak" or "Config".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

pub fn to_json_report(diagnostics: &[Diagnostic], program: &str, sites_checked: Option<usize>) -> DiagnosticReport {
    let registry = ErrorCodeRegistry::default();
    let mut error_count = 0;
    let mut warning_count = 0;

    let json_diags: Vec<JsonDiagnostic> = diagnostics
        .iter()
        .map(|d| {
            match d.severity {
                Severity::Error => error_count += 1,
                Severity::Warning => warning_count += 1,
                Severity::Note => {}
            }
            to_json_diagnostic(d, &registry)
        })
        .collect();

    DiagnosticReport {
        version: 1,
        program: program.to_string(),
        success: error_count == 0 && warning_count == 0,
        diagnostics: json_diags,
        error_count,
        warning_count,
        sites_checked,
    }
}

fn to_json_diagnostic(diag: &Diagnostic, registry: &ErrorCodeRegistry) -> JsonDiagnostic {
    let severity = match diag.severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Note => "note",
    };
    let code = diag.code.as_ref().map(|c| c.0.clone());
    let category = code
        .as_ref()
        .and_then(|c| registry.get(c))
        .map(|info| info.category.to_string());

    JsonDiagnostic {
        severity: severity.to_string(),
        code,
        category,
        message: diag.message.clone(),
        location: diag.location.clone(),
        notes: diag.notes.clone(),
        help: diag.help.clone(),
    }
}

/// Serialize reports to pretty JSON.
pub fn to_json_string<T: Serialize>(report: &T) -> String {
    serde_json::to_string_pretty(report).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_counts_and_categories() {
        let diags = vec![
            Diagnostic::warning("response body must be closed")
                .with_code("C0001")
                .with_location(SourceLocation {
                    file: "a/func.go".to_string(),
                    line: 4,
                    column: 2,
                }),
            Diagnostic::warning("response body must be closed").with_code("C0001"),
        ];
        let report = to_json_report(&diags, "prog.json", Some(3));
        assert!(!report.success);
        assert_eq!(report.warning_count, 2);
        assert_eq!(report.error_count, 0);
        assert_eq!(report.diagnostics[0].category.as_deref(), Some("Leak"));

        let value: serde_json::Value = serde_json::from_str(&to_json_string(&report)).unwrap();
        assert_eq!(value["diagnostics"][0]["location"]["line"], 4);
        assert_eq!(value["sites_checked"], 3);
        assert!(value["diagnostics"][1].get("location").is_none());
    }

    #[test]
    fn empty_report_is_success() {
        let report = to_json_report(&[], "prog.json", Some(0));
        assert!(report.success);
        assert!(report.diagnostics.is_empty());
    }
}
