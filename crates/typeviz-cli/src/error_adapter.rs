//! Error adapter for converting TypevizError to miette diagnostics.
//!
//! This module provides the bridge between the library's standard error types
//! and miette's rich diagnostic formatting used in the CLI.
//!
//! # Multi-Error Support
//!
//! When a render fails with several engine diagnostics, each diagnostic is
//! rendered independently. Schema errors point at the offending JSON.

use std::fmt;

use miette::{
    Diagnostic as MietteDiagnostic, LabeledSpan, Severity as MietteSeverity, SourceSpan,
};

use typeviz::{
    RenderError, TypeGraphError, TypevizError,
    worker::{Diagnostic, Severity},
};

/// Adapter for a single render engine diagnostic.
pub struct DiagnosticAdapter<'a> {
    diag: &'a Diagnostic,
}

impl<'a> DiagnosticAdapter<'a> {
    /// Create a new diagnostic adapter.
    pub fn new(diag: &'a Diagnostic) -> Self {
        Self { diag }
    }
}

impl fmt::Debug for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticAdapter")
            .field("diag", &self.diag)
            .finish()
    }
}

impl fmt::Display for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.diag.message)
    }
}

impl std::error::Error for DiagnosticAdapter<'_> {}

impl MietteDiagnostic for DiagnosticAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new("typeviz::render"))
    }

    fn severity(&self) -> Option<MietteSeverity> {
        Some(match self.diag.level {
            Severity::Error => MietteSeverity::Error,
            Severity::Warning => MietteSeverity::Warning,
        })
    }
}

/// Adapter for [`TypevizError`] variants without engine diagnostics.
pub struct ErrorAdapter<'a>(pub &'a TypevizError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            TypevizError::Io(_) => "typeviz::io",
            TypevizError::Schema { .. } => "typeviz::schema",
            TypevizError::Graph(_) => "typeviz::graph",
            TypevizError::Render(_) => "typeviz::render",
            TypevizError::Config(_) => "typeviz::config",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let help = match &self.0 {
            TypevizError::Graph(TypeGraphError::UnknownRootType(_)) => {
                "pick an existing type with --root-type"
            }
            TypevizError::Render(RenderError::Timeout(_)) => {
                "raise worker.request_timeout_ms in the configuration"
            }
            _ => return None,
        };
        Some(Box::new(help))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        match &self.0 {
            TypevizError::Schema { src, .. } => Some(src as &dyn miette::SourceCode),
            _ => None,
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let TypevizError::Schema { err, src } = &self.0 else {
            return None;
        };
        let offset = json_offset(src, err.line(), err.column());
        let span = SourceSpan::new(offset.into(), 0);
        Some(Box::new(std::iter::once(LabeledSpan::new_primary_with_span(
            Some("here".to_string()),
            span,
        ))))
    }
}

/// A reportable error that can be rendered by miette.
#[derive(Debug)]
pub enum Reportable<'a> {
    /// A diagnostic reported by the render engine.
    Diagnostic(DiagnosticAdapter<'a>),
    /// Any other error.
    Error(ErrorAdapter<'a>),
}

impl fmt::Display for Reportable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reportable::Diagnostic(d) => fmt::Display::fmt(d, f),
            Reportable::Error(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for Reportable<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Reportable::Diagnostic(_) => None,
            Reportable::Error(e) => e.source(),
        }
    }
}

impl MietteDiagnostic for Reportable<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.code(),
            Reportable::Error(e) => e.code(),
        }
    }

    fn severity(&self) -> Option<MietteSeverity> {
        match self {
            Reportable::Diagnostic(d) => d.severity(),
            Reportable::Error(e) => e.severity(),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.help(),
            Reportable::Error(e) => e.help(),
        }
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        match self {
            Reportable::Diagnostic(d) => d.source_code(),
            Reportable::Error(e) => e.source_code(),
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        match self {
            Reportable::Diagnostic(d) => d.labels(),
            Reportable::Error(e) => e.labels(),
        }
    }
}

/// Byte offset of a 1-based line and column reported by serde_json.
fn json_offset(src: &str, line: usize, column: usize) -> usize {
    let line_start: usize = src
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(src.len())
}

/// Convert a [`TypevizError`] into a list of reportable errors.
///
/// A render rejected with engine diagnostics yields one [`Reportable`] per
/// diagnostic. Every other error yields a single [`Reportable`].
pub fn to_reportables(err: &TypevizError) -> Vec<Reportable<'_>> {
    match err {
        TypevizError::Render(RenderError::Diagnostics(diagnostics)) if !diagnostics.is_empty() => {
            diagnostics
                .iter()
                .map(|d| Reportable::Diagnostic(DiagnosticAdapter::new(d)))
                .collect()
        }
        _ => vec![Reportable::Error(ErrorAdapter(err))],
    }
}

#[cfg(test)]
mod tests {
    use typeviz::DiagramBuilder;

    use super::*;

    #[test]
    fn test_one_reportable_per_diagnostic() {
        let err = TypevizError::Render(RenderError::Diagnostics(vec![
            Diagnostic::new(Severity::Error, "syntax error in line 3"),
            Diagnostic::new(Severity::Warning, "unknown attribute"),
        ]));

        let reportables = to_reportables(&err);

        assert_eq!(reportables.len(), 2);
        assert_eq!(reportables[0].to_string(), "syntax error in line 3");
        assert_eq!(reportables[1].to_string(), "unknown attribute");
        assert_eq!(reportables[0].severity(), Some(MietteSeverity::Error));
        assert_eq!(reportables[1].severity(), Some(MietteSeverity::Warning));
    }

    #[test]
    fn test_non_diagnostic_error() {
        let err = TypevizError::Graph(TypeGraphError::UnknownRootType("Root".to_string()));

        let reportables = to_reportables(&err);

        assert_eq!(reportables.len(), 1);
        match &reportables[0] {
            Reportable::Error(e) => {
                assert_eq!(e.code().unwrap().to_string(), "typeviz::graph");
                assert!(e.help().is_some());
            }
            Reportable::Diagnostic(_) => panic!("Expected Error"),
        }
    }

    #[test]
    fn test_schema_error_points_at_json() {
        let json = "{\n  \"queryType\": \"Query\",\n  \"types\": [ nope ]\n}";
        let err = DiagramBuilder::default().parse_schema(json).unwrap_err();

        let reportables = to_reportables(&err);
        let labels: Vec<_> = reportables[0].labels().unwrap().collect();

        assert_eq!(labels.len(), 1);
        assert!(reportables[0].source_code().is_some());

        let types_line = json.find("\"types\"").unwrap();
        let last_line = json.rfind('\n').unwrap();
        assert!((types_line..last_line).contains(&labels[0].offset()));
    }

    #[test]
    fn test_json_offset() {
        let src = "ab\ncd\nef";
        assert_eq!(json_offset(src, 1, 1), 0);
        assert_eq!(json_offset(src, 2, 2), 4);
        assert_eq!(json_offset(src, 3, 1), 6);
        assert_eq!(json_offset(src, 9, 9), src.len());
    }
}
