//! Diagnostics carried as data through the generation pipeline.
//!
//! Every stage returns its value paired with a (possibly empty) list of
//! diagnostics; nothing is thrown. A value whose own diagnostics include an
//! error is excluded from stages that need a fully resolved value, but its
//! diagnostics are still reported.

use std::fmt;
use std::path::{Path, PathBuf};

use proc_macro2::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Companion code was generated for a wrapper. Informational audit
    /// trail, not an error signal.
    CodeGenerated,
    /// A wrapper declaration (or its single field) is not `pub`, so the
    /// generated module cannot reach it.
    MissingPubVisibility,
    /// A wrapper declaration does not have exactly one field.
    MissingInnerField,
    /// The conventions declaration is unusable: duplicated, unparsable, or
    /// carrying an invalid pattern.
    InvalidConfiguration,
    /// A setting is not recognized; it is ignored.
    UnsupportedConfiguration,
    /// An encoded generic reference is malformed.
    InvalidGenericType,
    /// `named_args` does not consist of name/value pairs.
    InvalidNamedArgumentList,
    /// A `named_args` name entry is not a string.
    NamedArgumentNameMustBeString,
    /// A scanned file could not be parsed as Rust and was skipped.
    UnparsableFile,
}

impl DiagnosticKind {
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticKind::CodeGenerated => "BRND000",
            DiagnosticKind::MissingPubVisibility => "BRND001",
            DiagnosticKind::MissingInnerField => "BRND002",
            DiagnosticKind::InvalidConfiguration => "BRND003",
            DiagnosticKind::UnsupportedConfiguration => "BRND004",
            DiagnosticKind::InvalidGenericType => "BRND005",
            DiagnosticKind::InvalidNamedArgumentList => "BRND006",
            DiagnosticKind::NamedArgumentNameMustBeString => "BRND007",
            DiagnosticKind::UnparsableFile => "BRND008",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticKind::CodeGenerated => Severity::Info,
            DiagnosticKind::UnsupportedConfiguration | DiagnosticKind::UnparsableFile => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }
}

/// Where a diagnostic points. Line numbers are 1-based, columns too.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(file: impl Into<PathBuf>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// Location of a span within a parsed file.
    pub fn from_span(file: &Path, span: Span) -> Self {
        let start = span.start();
        Self::new(file, start.line, start.column + 1)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub location: Location,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, location: Location, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location,
        }
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}]: {} ({})",
            self.severity(),
            self.kind.code(),
            self.message,
            self.location
        )
    }
}

/// A stage result: a value (when one could be produced) plus the
/// diagnostics the stage attached to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub value: Option<T>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Outcome<T> {
    pub fn ok(value: T) -> Self {
        Self {
            value: Some(value),
            diagnostics: Vec::new(),
        }
    }

    pub fn new(value: Option<T>, diagnostics: Vec<Diagnostic>) -> Self {
        Self { value, diagnostics }
    }

    /// A failed stage: no usable value, one diagnostic.
    pub fn error(diagnostic: Diagnostic) -> Self {
        Self {
            value: None,
            diagnostics: vec![diagnostic],
        }
    }

    /// A value that exists but must not be consumed downstream, such as a
    /// malformed candidate kept around so its location stays reportable.
    pub fn flawed(value: T, diagnostic: Diagnostic) -> Self {
        Self {
            value: Some(value),
            diagnostics: vec![diagnostic],
        }
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity() == Severity::Error)
    }

    /// The value, unless error diagnostics disqualify it.
    pub fn usable(&self) -> Option<&T> {
        if self.has_errors() { None } else { self.value.as_ref() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn here() -> Location {
        Location::new("src/lib.rs", 3, 1)
    }

    #[test]
    fn severity_follows_kind() {
        assert_eq!(DiagnosticKind::CodeGenerated.severity(), Severity::Info);
        assert_eq!(
            DiagnosticKind::UnsupportedConfiguration.severity(),
            Severity::Warning
        );
        assert_eq!(
            DiagnosticKind::InvalidConfiguration.severity(),
            Severity::Error
        );
    }

    #[test]
    fn flawed_values_are_not_usable() {
        let outcome = Outcome::flawed(
            7,
            Diagnostic::new(DiagnosticKind::MissingInnerField, here(), "no field"),
        );
        assert!(outcome.has_errors());
        assert_eq!(outcome.usable(), None);
        assert_eq!(outcome.value, Some(7));
    }

    #[test]
    fn warnings_do_not_disqualify_values() {
        let outcome = Outcome::new(
            Some(7),
            vec![Diagnostic::new(
                DiagnosticKind::UnsupportedConfiguration,
                here(),
                "ignored",
            )],
        );
        assert_eq!(outcome.usable(), Some(&7));
    }

    #[test]
    fn diagnostics_render_with_code_and_location() {
        let diagnostic = Diagnostic::new(
            DiagnosticKind::InvalidConfiguration,
            here(),
            "the configuration is invalid: boom",
        );
        assert_eq!(
            diagnostic.to_string(),
            "error[BRND003]: the configuration is invalid: boom (src/lib.rs:3:1)"
        );
    }
}
