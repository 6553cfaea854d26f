use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use hmts_core::diagnostic::Diagnostic;
use hmts_core::{check_source, format, parse_source, tokenize};
use log::{LevelFilter, debug, info};
use walkdir::WalkDir;

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(version, about = "Check, tokenize or format hmts sources", long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "PATH",
        help = "Source file, or directory searched for .hmts files (reads stdin when absent)"
    )]
    input: Option<PathBuf>,

    #[arg(
        short,
        long,
        value_name = "PATH",
        help = "Write the report to this file instead of stdout"
    )]
    output: Option<PathBuf>,

    #[arg(
        long,
        value_name = "FORMAT",
        default_value = "check",
        help = "Output format: check, tokens, format, types"
    )]
    emit: String,

    #[arg(short, long, action = ArgAction::Count, help = "Increase log verbosity (-v, -vv, -vvv)")]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    execute(cli)
}

struct SourceUnit {
    name: String,
    text: String,
}

fn execute(cli: Cli) -> Result<()> {
    let emit = cli.emit.as_str();
    if !matches!(emit, "check" | "tokens" | "format" | "types") {
        bail!("unsupported emit format: {emit}");
    }

    let units = collect_sources(cli.input.as_deref())?;
    info!("processing {} source(s) with --emit {emit}", units.len());

    let mut report = String::new();
    let mut failed = 0usize;
    for unit in &units {
        if units.len() > 1 {
            report.push_str(&format!("// {}\n", unit.name));
        }
        let clean = match emit {
            "tokens" => emit_tokens(unit, &mut report),
            "format" => emit_format(unit, &mut report),
            _ => emit_check(unit, emit == "types", &mut report),
        };
        if !clean {
            failed += 1;
        }
    }

    write_output(cli.output.as_deref(), report.as_bytes())?;

    if failed > 0 {
        bail!("{failed} of {} source(s) had errors", units.len());
    }
    Ok(())
}

fn collect_sources(input: Option<&Path>) -> Result<Vec<SourceUnit>> {
    let Some(path) = input else {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("failed to read source from stdin")?;
        return Ok(vec![SourceUnit {
            name: "<stdin>".to_string(),
            text,
        }]);
    };

    if !path.is_dir() {
        return Ok(vec![read_unit(path)?]);
    }

    let mut units = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", path.display()))?;
        let is_source = entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == "hmts");
        if is_source {
            units.push(read_unit(entry.path())?);
        }
    }
    if units.is_empty() {
        bail!("no .hmts files found under {}", path.display());
    }
    debug!("found {} source file(s) under {}", units.len(), path.display());
    Ok(units)
}

fn read_unit(path: &Path) -> Result<SourceUnit> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read input file {}", path.display()))?;
    Ok(SourceUnit {
        name: path.display().to_string(),
        text,
    })
}

fn render(unit: &SourceUnit, diagnostics: &[Diagnostic], report: &mut String) {
    for diagnostic in diagnostics {
        report.push_str(&diagnostic.render(&unit.name, &unit.text));
        report.push('\n');
    }
}

fn emit_tokens(unit: &SourceUnit, report: &mut String) -> bool {
    match tokenize(&unit.text) {
        Ok(tokens) => {
            for token in tokens {
                report.push_str(&format!(
                    "{} {:?} @{}\n",
                    token.kind,
                    token.text(),
                    token.position()
                ));
            }
            true
        }
        Err(err) => {
            render(unit, &[err.to_diagnostic()], report);
            false
        }
    }
}

fn emit_format(unit: &SourceUnit, report: &mut String) -> bool {
    match parse_source(&unit.text) {
        Ok(output) if output.errors.is_empty() => {
            report.push_str(&format(&output.program));
            true
        }
        Ok(output) => {
            let diagnostics: Vec<Diagnostic> =
                output.errors.iter().map(|err| err.to_diagnostic()).collect();
            render(unit, &diagnostics, report);
            false
        }
        Err(err) => {
            render(unit, &[err.to_diagnostic()], report);
            false
        }
    }
}

fn emit_check(unit: &SourceUnit, with_types: bool, report: &mut String) -> bool {
    let checked = match check_source(&unit.text) {
        Ok(checked) => checked,
        Err(err) => {
            render(unit, &[err.to_diagnostic()], report);
            return false;
        }
    };
    render(unit, &checked.diagnostics(), report);
    if with_types {
        for (name, ty) in checked.top_level_types() {
            report.push_str(&format!("{name}: {ty}\n"));
        }
    } else if checked.is_ok() {
        report.push_str(&format!("{}: ok\n", unit.name));
    }
    checked.is_ok()
}

fn write_output(path: Option<&Path>, bytes: &[u8]) -> Result<()> {
    let Some(path) = path else {
        let mut stdout = io::stdout().lock();
        stdout.write_all(bytes).context("failed to write to stdout")?;
        return stdout.flush().context("failed to flush stdout");
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {parent:?}"))?;
        }
    }
    fs::write(path, bytes)
        .with_context(|| format!("failed to write output file {}", path.display()))?;
    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    // Only the first logger installed in a process wins.
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .try_init();
    debug!("log level {level}");
}
