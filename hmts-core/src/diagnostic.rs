//! Diagnostics shared by every stage of the pipeline.
//!
//! Each stage keeps its own typed error (`ParseError`, `NameError`,
//! `TypeError`); they are lowered into a [`Diagnostic`] when a driver
//! wants to print or sort them together.

use std::fmt;

use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: Option<&'static str>,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Diagnostic {
            severity: Severity::Error,
            code: None,
            message: message.into(),
            span,
        }
    }

    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            code: None,
            message: message.into(),
            span,
        }
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Render as `path:line:col: error[CODE]: message`.
    pub fn render(&self, path: &str, source: &str) -> String {
        let (line, column) = line_col(source, self.span.start as usize);
        match self.code {
            Some(code) => format!(
                "{path}:{line}:{column}: {}[{code}]: {}",
                self.severity, self.message
            ),
            None => format!("{path}:{line}:{column}: {}: {}", self.severity, self.message),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{}[{code}]: {}", self.severity, self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

/// 1-based line and column of a byte offset.
///
/// Offsets past the end of `source` are clamped to its length.
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = &source.as_bytes()[..offset];
    let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
    let line_start = before
        .iter()
        .rposition(|&b| b == b'\n')
        .map(|idx| idx + 1)
        .unwrap_or(0);
    (line, offset - line_start + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_line_and_column() {
        let src = "const x = 1;\nconst y = z;\n";
        assert_eq!(line_col(src, 0), (1, 1));
        assert_eq!(line_col(src, 6), (1, 7));
        assert_eq!(line_col(src, 23), (2, 11));
        assert_eq!(line_col(src, 1000), (3, 1));
    }

    #[test]
    fn renders_with_code_and_location() {
        let src = "const x = 1;\nconst y = z;";
        let diag = Diagnostic::error("Undeclared reference 'z'", Span::new(23, 24))
            .with_code("E0103");
        assert_eq!(
            diag.render("main.hmts", src),
            "main.hmts:2:11: error[E0103]: Undeclared reference 'z'"
        );
    }

    #[test]
    fn renders_without_code() {
        let diag = Diagnostic::warning("unused", Span::point(0));
        assert_eq!(diag.render("a", "x"), "a:1:1: warning: unused");
        assert!(!diag.is_error());
    }
}
