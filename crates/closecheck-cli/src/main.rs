// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! closecheck - reports resources that are not released on every path.

mod cli;
mod output;

use std::fs;
use std::path::Path;
use std::process;

use clap::{CommandFactory, Parser};
use closecheck_analysis::{
    Analyzer, AnalyzerOptions, CollectingSink, SiteTrace, TargetConfig, TraceSink, TracingSink, Verdict,
};
use closecheck_diagnostics::{
    codes::ErrorCodeRegistry,
    convert,
    formatter::{format_short, DiagnosticFormatter},
    json::{to_json_report, to_json_string, DiagnosticReport},
    Diagnostic, Severity, ToDiagnostic,
};
use closecheck_ir::Program;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use cli::{CheckArgs, Cli, Commands, OutputFormat};

const EXIT_CLEAN: i32 = 0;
const EXIT_FINDINGS: i32 = 1;
const EXIT_SETUP: i32 = 2;

static TRACING: TracingSink = TracingSink;

fn main() {
    let cli = Cli::parse();
    output::init(cli.color);
    init_logging(&cli);

    let code = match cli.command {
        Some(Commands::Check(args)) => cmd_check(&args),
        Some(Commands::Dump { program, function }) => cmd_dump(&program, function.as_deref()),
        Some(Commands::Codes) => cmd_codes(),
        None if cli.check.programs.is_empty() => {
            if let Err(e) = Cli::command().print_help() {
                eprintln!("{}: cannot print usage: {}", output::error_label(), e);
            }
            EXIT_SETUP
        }
        None => cmd_check(&cli.check),
    };
    process::exit(code);
}

fn init_logging(cli: &Cli) {
    let level = if cli.trace {
        Some("trace")
    } else if cli.debug {
        Some("debug")
    } else if cli.verbose {
        Some("info")
    } else {
        None
    };
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// ============================================================================
// check
// ============================================================================

/// Everything produced for one program file.
struct ProgramResult {
    name: String,
    diagnostics: Vec<Diagnostic>,
    sites_checked: Option<usize>,
    traces: Vec<SiteTrace>,
    program: Option<Program>,
}

impl ProgramResult {
    fn failed(name: String, diagnostic: Diagnostic) -> Self {
        Self {
            name,
            diagnostics: vec![diagnostic],
            sites_checked: None,
            traces: Vec::new(),
            program: None,
        }
    }

    fn exit_code(&self) -> i32 {
        if self.diagnostics.iter().any(Diagnostic::is_error) {
            EXIT_SETUP
        } else if self.diagnostics.iter().any(|d| d.severity == Severity::Warning) {
            EXIT_FINDINGS
        } else {
            EXIT_CLEAN
        }
    }
}

fn cmd_check(args: &CheckArgs) -> i32 {
    let targets = match load_targets(args) {
        Ok(targets) => targets,
        Err(diag) => {
            emit_setup_error(args.format, &diag);
            return EXIT_SETUP;
        }
    };
    let mut options = AnalyzerOptions {
        parallel: args.parallel,
        ..AnalyzerOptions::default()
    };
    if let Some(depth) = args.max_depth {
        options.max_depth = depth as usize;
    }

    let results: Vec<ProgramResult> = args
        .programs
        .iter()
        .map(|path| check_program(path, &targets, options, args.explain))
        .collect();

    match args.format {
        OutputFormat::Human => print_human(&results, args),
        OutputFormat::Short => print_short(&results),
        OutputFormat::Json => print_json(&results),
    }

    results.iter().map(ProgramResult::exit_code).max().unwrap_or(EXIT_CLEAN)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TargetFile {
    Many(Vec<TargetConfig>),
    One(TargetConfig),
}

/// Targets from `--config` (or the default), with flag overrides applied.
fn load_targets(args: &CheckArgs) -> Result<Vec<TargetConfig>, Diagnostic> {
    let mut targets = match &args.config {
        None => vec![TargetConfig::default()],
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| Diagnostic::error(format!("cannot read config `{}`: {}", path.display(), e)))?;
            match serde_json::from_str::<TargetFile>(&text) {
                Ok(TargetFile::Many(targets)) => targets,
                Ok(TargetFile::One(target)) => vec![target],
                Err(e) => {
                    return Err(Diagnostic::error(format!("invalid config `{}`: {}", path.display(), e))
                        .with_help("expected a target object or a list of them"))
                }
            }
        }
    };
    if targets.is_empty() {
        return Err(Diagnostic::error("config lists no targets"));
    }

    for target in &mut targets {
        if let Some(package) = &args.package {
            target.package = package.clone();
        }
        if let Some(type_name) = &args.type_name {
            target.type_name = type_name.clone();
        }
        if let Some(field) = &args.field {
            target.field = field.clone();
        }
        if let Some(method) = &args.method {
            target.method = method.clone();
        }
        if args.message.is_some() {
            target.message = args.message.clone();
        }
    }
    if args.has_target_overrides() {
        tracing::debug!(targets = targets.len(), "target overrides applied");
    }
    Ok(targets)
}

fn check_program(path: &Path, targets: &[TargetConfig], options: AnalyzerOptions, explain: bool) -> ProgramResult {
    let name = path.display().to_string();
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => return ProgramResult::failed(name.clone(), Diagnostic::error(format!("cannot read `{}`: {}", name, e))),
    };
    let program = match Program::from_json(&text) {
        Ok(program) => program,
        Err(e) => {
            let diag = convert::load_error(&e, &name);
            return ProgramResult::failed(name, diag);
        }
    };
    tracing::info!(program = %name, functions = program.function_count(), "loaded");

    let mut diagnostics = Vec::new();
    let mut sites_checked = 0;
    let mut traces = Vec::new();
    for target in targets {
        let collector = CollectingSink::new();
        let sink: &dyn TraceSink = if explain { &collector } else { &TRACING };
        let analyzer = match Analyzer::new(&program, target) {
            Ok(analyzer) => analyzer.with_options(options).with_sink(sink),
            Err(e) => {
                diagnostics.push(e.to_diagnostic(&program));
                continue;
            }
        };
        let report = analyzer.run();
        tracing::info!(
            program = %name,
            container = %format!("{}.{}", target.package, target.type_name),
            findings = report.findings.len(),
            "checked"
        );
        sites_checked += report.sites_checked;
        diagnostics.extend(report.findings.iter().map(|f| f.to_diagnostic(&program)));
        traces.extend(collector.take());
    }

    ProgramResult {
        name,
        diagnostics,
        sites_checked: Some(sites_checked),
        traces,
        program: Some(program),
    }
}

fn print_human(results: &[ProgramResult], args: &CheckArgs) {
    for result in results {
        let mut formatter = DiagnosticFormatter::new();
        for diag in &result.diagnostics {
            if let Some(loc) = &diag.location {
                let file = match &args.source_root {
                    Some(root) => root.join(&loc.file),
                    None => Path::new(&loc.file).to_path_buf(),
                };
                // excerpts are best effort
                if let Ok(text) = fs::read_to_string(&file) {
                    formatter.add_source(loc.file.clone(), text);
                }
            }
        }

        for diag in &result.diagnostics {
            if diag.is_error() {
                eprintln!("{}", formatter.format(diag));
            } else {
                println!("{}", formatter.format(diag));
            }
        }
        if let Some(program) = &result.program {
            for trace in &result.traces {
                print_trace(program, trace);
            }
        }
        if let Some(sites) = result.sites_checked {
            let findings = result.diagnostics.iter().filter(|d| d.severity == Severity::Warning).count();
            if findings == 0 {
                eprintln!("{}", output::banner_ok(&result.name, sites));
            } else {
                eprintln!("{}", output::banner_fail(&result.name, findings));
            }
        }
    }
}

fn print_short(results: &[ProgramResult]) {
    for result in results {
        for diag in &result.diagnostics {
            if diag.is_error() {
                eprintln!("{}: {}", output::error_label(), format_short(diag));
            } else {
                println!("{}", format_short(diag));
            }
        }
        if let Some(program) = &result.program {
            for trace in &result.traces {
                print_trace(program, trace);
            }
        }
    }
}

fn print_json(results: &[ProgramResult]) {
    let reports: Vec<DiagnosticReport> = results
        .iter()
        .map(|r| to_json_report(&r.diagnostics, &r.name, r.sites_checked))
        .collect();
    match reports.as_slice() {
        [single] => println!("{}", to_json_string(single)),
        _ => println!("{}", to_json_string(&reports)),
    }
}

fn print_trace(program: &Program, trace: &SiteTrace) {
    let location = program.location(trace.site.pos);
    let verdict = match trace.verdict {
        Verdict::Released => output::verdict_released("released"),
        Verdict::ReleasedByCallee(callee) => output::verdict_released(&format!(
            "released by callee {}",
            program.function(callee).qualified_name()
        )),
        Verdict::NotReleased => output::verdict_leaked("not released"),
    };
    println!("{}: {}: {}", location, program.display_instr(trace.site.instr), verdict);
    for step in &trace.steps {
        println!("    {}", output::step(&step.display(program).to_string()));
    }
}

fn emit_setup_error(format: OutputFormat, diag: &Diagnostic) {
    match format {
        OutputFormat::Json => println!("{}", to_json_string(&to_json_report(std::slice::from_ref(diag), "", None))),
        OutputFormat::Short => eprintln!("{}: {}", output::error_label(), format_short(diag)),
        OutputFormat::Human => eprintln!("{}", DiagnosticFormatter::new().format(diag)),
    }
}

// ============================================================================
// dump
// ============================================================================

fn cmd_dump(path: &Path, filter: Option<&str>) -> i32 {
    let name = path.display().to_string();
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("{}: cannot read {}: {}", output::error_label(), output::file_path(&name), e);
            return EXIT_SETUP;
        }
    };
    let program = match Program::from_json(&text) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("{}", DiagnosticFormatter::new().format(&convert::load_error(&e, &name)));
            return EXIT_SETUP;
        }
    };

    let mut printed = 0;
    for func in program.functions() {
        if let Some(filter) = filter {
            if !func.qualified_name().contains(filter) {
                continue;
            }
        }
        println!("{}", program.display_function(func.id));
        printed += 1;
    }
    tracing::debug!(functions = printed, "dumped");
    EXIT_CLEAN
}

// ============================================================================
// codes
// ============================================================================

fn cmd_codes() -> i32 {
    let registry = ErrorCodeRegistry::default();
    for info in registry.all() {
        println!(
            "{}  {} {}",
            output::code(info.code),
            output::category(&format!("{:<7}", info.category)),
            info.title
        );
    }
    EXIT_CLEAN
}
