//! Diagnostics produced while analysing LPC source.
//!
//! A [`Diagnostic`] is plain data (severity, range, message) so it can be
//! stored on a source unit and handed to an editor layer. [`Report`] pairs a
//! diagnostic with the text it points into and implements
//! [`miette::Diagnostic`] so the command line can render it with source
//! context.

use std::fmt;

use miette::{LabeledSpan, NamedSource, SourceSpan};

use crate::position::{LineIndex, Range};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

impl From<Severity> for miette::Severity {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Error => miette::Severity::Error,
            Severity::Warning => miette::Severity::Warning,
            Severity::Information | Severity::Hint => miette::Severity::Advice,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Information => "info",
            Severity::Hint => "hint",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub range: Range,
    pub message: String,
    /// Stable identifier such as `lpc::missing_method_name`.
    pub code: Option<&'static str>,
}

impl Diagnostic {
    pub fn new(severity: Severity, range: Range, message: impl Into<String>) -> Self {
        Self {
            severity,
            range,
            message: message.into(),
            code: None,
        }
    }

    pub fn error(range: Range, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, range, message)
    }

    pub fn warning(range: Range, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, range, message)
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Attach the file text so the diagnostic can be rendered by miette.
    pub fn report(self, name: impl AsRef<str>, text: &str) -> Report {
        let index = LineIndex::new(text);
        let span = index.span(text, &self.range);
        Report {
            source_code: NamedSource::new(name, text.to_string()),
            span,
            diagnostic: self,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.range.start.line, self.range.start.column, self.severity, self.message
        )
    }
}

/// A diagnostic bundled with its source text for rich rendering.
#[derive(Debug)]
pub struct Report {
    source_code: NamedSource<String>,
    span: SourceSpan,
    diagnostic: Diagnostic,
}

impl Report {
    pub fn diagnostic(&self) -> &Diagnostic {
        &self.diagnostic
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.diagnostic.message)
    }
}

impl std::error::Error for Report {}

impl miette::Diagnostic for Report {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diagnostic
            .code
            .map(|code| Box::new(code) as Box<dyn fmt::Display + 'a>)
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(self.diagnostic.severity.into())
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.source_code)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(
            Some(self.diagnostic.severity.to_string()),
            self.span,
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;

    #[test]
    fn test_report_span_follows_range() {
        let text = "void f() {\n  obj->;\n}\n";
        let range = Range::new(Position::new(2, 2), Position::new(2, 7));
        let report = Diagnostic::error(range, "missing method name").report("a.c", text);
        assert_eq!(report.span.offset(), 13);
        assert_eq!(report.span.len(), 5);
        assert_eq!(report.to_string(), "missing method name");
    }

    #[test]
    fn test_display_includes_severity() {
        let diag = Diagnostic::warning(Range::at(3, 1), "could not load source: x.c");
        assert_eq!(diag.to_string(), "3:1: warning: could not load source: x.c");
    }
}
