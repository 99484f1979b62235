//! Diagnostics accumulated while running operations
//!
//! Lifecycle calls never fail outright: everything that goes wrong, and
//! everything worth a warning, is collected here and returned alongside the
//! (possibly partial) state.

use crate::state::AttributePath;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

/// What part of the pipeline produced a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Schema could not be turned into attributes (resource-type wide)
    Classification,
    /// State and schema disagree (per call)
    Conversion,
    /// The service call failed (per call)
    Execution,
    /// The result does not match its declared schema (warning only)
    ResultMismatch,
    /// No setter available for an attribute transition (per attribute)
    PropertySetter,
    /// The call was cancelled or timed out
    Cancelled,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Classification => "classification",
            Self::Conversion => "conversion",
            Self::Execution => "execution",
            Self::ResultMismatch => "result mismatch",
            Self::PropertySetter => "property setter",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub summary: String,
    pub detail: String,
    /// Attribute the diagnostic is attached to, if any
    pub path: Option<AttributePath>,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            summary: summary.into(),
            detail: detail.into(),
            path: None,
        }
    }

    pub fn warning(
        kind: DiagnosticKind,
        summary: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(kind, summary, detail)
        }
    }

    /// Attach the diagnostic to an attribute path
    pub fn at(mut self, path: AttributePath) -> Self {
        self.path = Some(path);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{level} ({}): {}", self.kind, self.summary)?;
        if let Some(path) = &self.path {
            write!(f, " at {path}")?;
        }
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        Ok(())
    }
}

/// Ordered collection of diagnostics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn extend(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    /// Append `other` and report whether it contained an error
    pub fn append_check_error(&mut self, other: Self) -> bool {
        let had_error = other.has_error();
        self.extend(other);
        had_error
    }

    pub fn has_error(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| !d.is_error())
    }

    /// Diagnostics of the given kind
    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(move |d| d.kind == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Self(vec![diagnostic])
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
