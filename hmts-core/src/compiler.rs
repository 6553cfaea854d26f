//! Pipeline orchestration: lex, parse, name check and type check.

use std::path::Path;

use log::debug;

use crate::ast::{Program, Stmt};
use crate::diagnostic::Diagnostic;
use crate::error::{CoreError, LexError, NameError, ParseError, TypeError};
use crate::lexer::tokenize;
use crate::name_resolve::{NameCheckResult, name_check};
use crate::parser::{ParseOutput, parse};
use crate::typecheck::{TypeCheckResult, type_check};

/// Lex and parse `source`; any parse error fails the whole compile.
pub fn compile(source: &str) -> Result<Program, CoreError> {
    let output = parse_source(source)?;
    if output.errors.is_empty() {
        Ok(output.program)
    } else {
        Err(CoreError::Parse(output.errors))
    }
}

/// Lex and parse with per-statement recovery, keeping every parse error
/// next to the partial tree.
pub fn parse_source(source: &str) -> Result<ParseOutput, LexError> {
    let tokens = tokenize(source)?;
    Ok(parse(tokens))
}

/// Everything the checker found in one source text.
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub program: Program,
    pub parse_errors: Vec<ParseError>,
    pub names: NameCheckResult,
    pub types: TypeCheckResult,
}

impl CheckReport {
    pub fn name_errors(&self) -> &[NameError] {
        &self.names.errors
    }

    pub fn type_errors(&self) -> &[TypeError] {
        &self.types.errors
    }

    pub fn error_count(&self) -> usize {
        self.parse_errors.len() + self.names.errors.len() + self.types.errors.len()
    }

    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }

    /// All errors as diagnostics, ordered by position in the source.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut diagnostics: Vec<Diagnostic> = self
            .parse_errors
            .iter()
            .map(ParseError::to_diagnostic)
            .chain(self.names.errors.iter().map(NameError::to_diagnostic))
            .chain(self.types.errors.iter().map(TypeError::to_diagnostic))
            .collect();
        diagnostics.sort_by_key(|d| (d.span.start, d.span.end));
        diagnostics
    }

    /// Error messages in diagnostic order.
    pub fn messages(&self) -> Vec<String> {
        self.diagnostics().into_iter().map(|d| d.message).collect()
    }

    /// Inferred type of each top-level `const`, in declaration order.
    pub fn top_level_types(&self) -> Vec<(String, String)> {
        self.program
            .body
            .iter()
            .filter_map(|stmt| match stmt {
                Stmt::Const(decl) => {
                    let ty = self.types.display_type(decl.id)?;
                    Some((decl.name.clone(), ty))
                }
                Stmt::Return(_) | Stmt::Expr(_) => None,
            })
            .collect()
    }
}

/// Run every stage. Only a lexing failure stops the pipeline; the name and
/// type checks run on whatever the parser recovered.
pub fn check_source(source: &str) -> Result<CheckReport, LexError> {
    let ParseOutput { program, errors } = parse_source(source)?;
    let names = name_check(&program);
    let types = type_check(&program);
    debug!(
        "check: {} parse, {} name, {} type error(s)",
        errors.len(),
        names.errors.len(),
        types.errors.len()
    );
    Ok(CheckReport {
        program,
        parse_errors: errors,
        names,
        types,
    })
}

/// Read and check a file, returning its text alongside the report.
pub fn check_file(path: impl AsRef<Path>) -> Result<(String, CheckReport), CoreError> {
    let path = path.as_ref();
    debug!("reading {}", path.display());
    let source = std::fs::read_to_string(path)?;
    let report = check_source(&source)?;
    Ok((source, report))
}
