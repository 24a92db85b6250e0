// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Reports resources acquired through a container value that are not
/// released on every path.
///
/// Quick start:
///   closecheck prog.json               Check for unclosed response bodies
///   closecheck dump prog.json          Print the program's IR
///   closecheck codes                   List diagnostic codes
#[derive(Parser, Debug)]
#[command(name = "closecheck")]
#[command(version)]
#[command(about = "Checks that resources owned by returned values are released", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
#[command(after_help = "\
TARGETS:\n\
  By default closecheck looks for *net/http.Response values whose Body is\n\
  never closed. --config loads one target object or a list of them; the\n\
  --package, --type, --field, --method and --message flags override\n\
  entries of every loaded target.\n\
\n\
EXIT STATUS:\n\
  0  no findings\n\
  1  at least one finding\n\
  2  a program or configuration could not be loaded\n\
\n\
EXAMPLES:\n\
  closecheck prog.json --format human --source-root ~/src/app\n\
  closecheck check a.json b.json --parallel\n\
  closecheck prog.json --package database/sql --type '*Rows' --field rowsi\n\
  closecheck prog.json --explain")]
pub struct Cli {
    /// Show progress messages (info level).
    #[arg(short, long, global = true, help_heading = "Global Options")]
    pub verbose: bool,

    /// Show per-function and per-candidate logging.
    #[arg(long, global = true, help_heading = "Global Options")]
    pub debug: bool,

    /// Log every tracer step.
    #[arg(long, global = true, help_heading = "Global Options")]
    pub trace: bool,

    /// When to use ANSI color in output.
    #[arg(
        long,
        value_enum,
        global = true,
        default_value = "auto",
        help_heading = "Global Options"
    )]
    pub color: ColorMode,

    #[command(subcommand)]
    pub command: Option<Commands>,

    /// `check` arguments when no subcommand is given.
    #[command(flatten)]
    pub check: CheckArgs,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check programs for unreleased resources (default).
    Check(CheckArgs),

    /// Print the IR of a program.
    Dump {
        /// Program file in JSON form.
        program: PathBuf,

        /// Only print functions whose qualified name contains this text.
        #[arg(long)]
        function: Option<String>,
    },

    /// List diagnostic codes.
    Codes,
}

#[derive(Args, Debug, Default, Clone)]
pub struct CheckArgs {
    /// Program files in JSON form.
    pub programs: Vec<PathBuf>,

    /// Output format for diagnostics.
    #[arg(long, value_enum, default_value = "short")]
    pub format: OutputFormat,

    /// Target configuration file (one object or a list).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Import path of the package declaring the container type.
    #[arg(long, help_heading = "Target")]
    pub package: Option<String>,

    /// Container type name; a leading `*` selects the pointer type.
    #[arg(long = "type", help_heading = "Target")]
    pub type_name: Option<String>,

    /// Resource field of the container.
    #[arg(long, help_heading = "Target")]
    pub field: Option<String>,

    /// Release method of the resource.
    #[arg(long, help_heading = "Target")]
    pub method: Option<String>,

    /// Finding text.
    #[arg(long, help_heading = "Target")]
    pub message: Option<String>,

    /// Verify call sites in parallel.
    #[arg(long)]
    pub parallel: bool,

    /// Recursion bound per call site.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_depth: Option<u32>,

    /// Print how each call site was decided.
    #[arg(long)]
    pub explain: bool,

    /// Directory that source file names in the program are relative to.
    #[arg(long)]
    pub source_root: Option<PathBuf>,
}

impl CheckArgs {
    pub fn has_target_overrides(&self) -> bool {
        self.package.is_some()
            || self.type_name.is_some()
            || self.field.is_some()
            || self.method.is_some()
            || self.message.is_some()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One `file:line:col: message` line per finding.
    #[default]
    Short,
    /// Colored diagnostics with source excerpts.
    Human,
    /// A JSON report per program.
    Json,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}
