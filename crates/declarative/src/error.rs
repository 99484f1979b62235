//! Error types for the declarative crate

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while running operations
#[derive(Error, Debug)]
pub enum Error {
    /// The underlying service call failed
    #[error("{resource}: {operation} failed: {source:#}")]
    Execution {
        resource: String,
        operation: String,
        #[source]
        source: anyhow::Error,
    },

    /// The call was cancelled through its run context
    #[error("{resource}: {operation} was cancelled")]
    Cancelled { resource: String, operation: String },

    /// The call exceeded the configured timeout
    #[error("{resource}: {operation} timed out after {}s", .after.as_secs())]
    TimedOut {
        resource: String,
        operation: String,
        after: Duration,
    },

    /// A polled call never reached its terminal state
    #[error("{executor} did not terminate after {attempts} attempts")]
    TerminationNotReached { executor: String, attempts: u32 },

    /// Invalid read or write of a state path
    #[error("invalid state access at {path}: {reason}")]
    State { path: String, reason: String },
}

impl Error {
    /// Diagnostic category of this error
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Self::Cancelled { .. } | Self::TimedOut { .. } => DiagnosticKind::Cancelled,
            Self::Execution { .. } | Self::TerminationNotReached { .. } => {
                DiagnosticKind::Execution
            }
            Self::State { .. } => DiagnosticKind::Conversion,
        }
    }

    /// Convert into an error diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        let summary = match self {
            Self::Execution { .. } | Self::TerminationNotReached { .. } => "operation failed",
            Self::Cancelled { .. } => "operation cancelled",
            Self::TimedOut { .. } => "operation timed out",
            Self::State { .. } => "state update failed",
        };
        Diagnostic::error(self.kind(), summary, self.to_string())
    }
}

/// Result type for declarative operations
pub type Result<T> = std::result::Result<T, Error>;
