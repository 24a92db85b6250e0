// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Terminal formatters for diagnostics.
//!
//! The short form is the classic vet line:
//!
//! ```text
//! a/func.go:9:14: response body must be closed
//! ```
//!
//! The rich form adds the code, the source line when it is available, and
//! any notes:
//!
//! ```text
//! warning[C0001]: response body must be closed
//!   --> a/func.go:9:14
//!     |
//!   9 |     resp, err := http.Get("https://example.com")
//!     |                  ^
//!     = note: acquired in `a.func_test1`
//!     = help: release it on every path, usually with a deferred call right after acquiring it
//! ```

use std::collections::HashMap;

use colored::Colorize;

use crate::{Diagnostic, Severity};

/// `location: message`, or just the message when there is no location.
pub fn format_short(diagnostic: &Diagnostic) -> String {
    match &diagnostic.location {
        Some(loc) => format!("{}: {}", loc, diagnostic.message),
        None => diagnostic.message.clone(),
    }
}

/// Formats diagnostics with source context for terminal output.
#[derive(Default)]
pub struct DiagnosticFormatter {
    sources: HashMap<String, String>,
}

impl DiagnosticFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the text of `file` available for source excerpts.
    pub fn with_source(mut self, file: impl Into<String>, text: impl Into<String>) -> Self {
        self.sources.insert(file.into(), text.into());
        self
    }

    pub fn add_source(&mut self, file: impl Into<String>, text: impl Into<String>) {
        self.sources.insert(file.into(), text.into());
    }

    pub fn format(&self, diagnostic: &Diagnostic) -> String {
        let mut out = String::new();
        self.format_header(&mut out, diagnostic);

        let gutter_width = diagnostic
            .location
            .as_ref()
            .map(|l| l.line.to_string().len().max(2))
            .unwrap_or(2);

        if let Some(loc) = &diagnostic.location {
            out.push_str(&format!("  {} {}\n", "-->".blue(), loc));
            if let Some(line) = self.line(&loc.file, loc.line) {
                out.push_str(&format!("{} {}\n", " ".repeat(gutter_width + 1), "|".blue()));
                out.push_str(&format!(
                    "{:>width$} {} {}\n",
                    loc.line.to_string().blue().bold(),
                    "|".blue(),
                    expand_tabs(line),
                    width = gutter_width + 1,
                ));
                let caret = match diagnostic.severity {
                    Severity::Error => "^".red().bold(),
                    Severity::Warning => "^".yellow().bold(),
                    Severity::Note => "^".blue().bold(),
                };
                out.push_str(&format!(
                    "{} {} {}{}\n",
                    " ".repeat(gutter_width + 1),
                    "|".blue(),
                    " ".repeat(display_width(line, loc.column)),
                    caret,
                ));
            }
        }

        self.format_footer(&mut out, diagnostic, gutter_width);
        out
    }

    fn format_header(&self, out: &mut String, diagnostic: &Diagnostic) {
        let severity_str = match diagnostic.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
            Severity::Note => "note".blue().bold(),
        };

        if let Some(ref code) = diagnostic.code {
            out.push_str(&format!(
                "{}[{}]: {}\n",
                severity_str,
                code.0.clone().bold(),
                diagnostic.message.bold()
            ));
        } else {
            out.push_str(&format!("{}: {}\n", severity_str, diagnostic.message.bold()));
        }
    }

    fn format_footer(&self, out: &mut String, diagnostic: &Diagnostic, gutter_width: usize) {
        for note in &diagnostic.notes {
            out.push_str(&format!(
                "{} {} {}: {}\n",
                " ".repeat(gutter_width + 1),
                "=".cyan(),
                "note".cyan().bold(),
                note
            ));
        }
        if let Some(ref help) = diagnostic.help {
            out.push_str(&format!(
                "{} {} {}: {}\n",
                " ".repeat(gutter_width + 1),
                "=".cyan(),
                "help".cyan().bold(),
                help
            ));
        }
    }

    /// Source line by 1-based number.
    fn line(&self, file: &str, line: u32) -> Option<&str> {
        if line == 0 {
            return None;
        }
        self.sources.get(file)?.lines().nth(line as usize - 1)
    }
}

const TAB_WIDTH: usize = 4;

fn expand_tabs(line: &str) -> String {
    line.replace('\t', &" ".repeat(TAB_WIDTH))
}

/// Columns taken by the text before 1-based byte column `column`.
fn display_width(line: &str, column: u32) -> usize {
    let end = (column as usize).saturating_sub(1).min(line.len());
    line.char_indices()
        .take_while(|(i, _)| *i < end)
        .map(|(_, c)| if c == '\t' { TAB_WIDTH } else { 1 })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SourceLocation;

    fn leak() -> Diagnostic {
        Diagnostic::warning("response body must be closed")
            .with_code("C0001")
            .with_location(SourceLocation {
                file: "a/func.go".to_string(),
                line: 2,
                column: 15,
            })
            .with_note("acquired in `a.f`")
    }

    #[test]
    fn short_form_is_location_and_message() {
        assert_eq!(format_short(&leak()), "a/func.go:2:15: response body must be closed");
        assert_eq!(format_short(&Diagnostic::error("no program")), "no program");
    }

    #[test]
    fn rich_form_shows_source_line_and_caret() {
        colored::control::set_override(false);
        let source = "func f() {\n\tresp, err := http.Get(url)\n}\n";
        let formatter = DiagnosticFormatter::new().with_source("a/func.go", source);
        let text = formatter.format(&leak());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "warning[C0001]: response body must be closed");
        assert_eq!(lines[1], "  --> a/func.go:2:15");
        assert_eq!(lines[3], "  2 |     resp, err := http.Get(url)");
        // Under the `h` of `http`, past the expanded tab.
        assert_eq!(lines[4], "    |                  ^");
        assert!(text.contains("= note: acquired in `a.f`"));
    }

    #[test]
    fn rich_form_without_source_skips_excerpt() {
        colored::control::set_override(false);
        let text = DiagnosticFormatter::new().format(&leak());
        assert_eq!(text.lines().count(), 3);
    }
}
