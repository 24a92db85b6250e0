// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! CLI output styling.
//!
//! Respects NO_COLOR and FORCE_COLOR unless `--color` says otherwise.
//! Colors are automatically disabled when output is piped.

use colored::{ColoredString, Colorize};

use crate::cli::ColorMode;

/// Initialize color support. Call once at startup.
pub fn init(mode: ColorMode) {
    match mode {
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Auto => {
            // colored handles NO_COLOR itself; FORCE_COLOR needs the override
            if std::env::var("NO_COLOR").is_ok() {
                colored::control::set_override(false);
            } else if std::env::var("FORCE_COLOR").is_ok() {
                colored::control::set_override(true);
            }
        }
    }
}

pub fn error_label() -> ColoredString {
    "error".red().bold()
}

pub fn file_path(path: &str) -> ColoredString {
    path.underline()
}

// === Summary ===

pub fn banner_ok(program: &str, sites: usize) -> String {
    format!(
        "{} {} {}",
        "===".dimmed(),
        format!("{}: {} checked, all released", program, plural(sites, "call site")).green().bold(),
        "===".dimmed()
    )
}

pub fn banner_fail(program: &str, findings: usize) -> String {
    format!(
        "{} {} {}",
        "===".dimmed(),
        format!("{}: {}", program, plural(findings, "finding")).red().bold(),
        "===".dimmed()
    )
}

// === Explain ===

pub fn verdict_released(text: &str) -> ColoredString {
    text.green()
}

pub fn verdict_leaked(text: &str) -> ColoredString {
    text.red().bold()
}

pub fn step(text: &str) -> ColoredString {
    text.dimmed()
}

// === Codes ===

pub fn code(code: &str) -> ColoredString {
    code.bold()
}

pub fn category(name: &str) -> ColoredString {
    name.cyan()
}

fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("1 {}", noun)
    } else {
        format!("{} {}s", n, noun)
    }
}
