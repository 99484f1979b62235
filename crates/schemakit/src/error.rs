//! Error types for the schemakit crate

use thiserror::Error;

/// Errors produced while inspecting or validating schemas
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Type outside string/number/integer/boolean/array/object
    #[error("unsupported schema type {type_name:?} at {path}")]
    UnsupportedType { path: String, type_name: String },

    /// `oneOf`/`anyOf`/`allOf` alternatives that cannot be merged into one node
    #[error("incompatible combinator alternatives at {path}: {reason}")]
    IncompatibleCombinator { path: String, reason: String },

    /// Two schemas differ structurally
    #[error("schemas differ at {path}: {reason}")]
    Mismatch { path: String, reason: String },

    /// A value does not conform to a schema
    #[error("value does not match schema at {path}: {reason}")]
    Validation { path: String, reason: String },
}

impl Error {
    /// Path (dotted, `$` for the root) the error refers to
    pub fn path(&self) -> &str {
        match self {
            Self::UnsupportedType { path, .. }
            | Self::IncompatibleCombinator { path, .. }
            | Self::Mismatch { path, .. }
            | Self::Validation { path, .. } => path,
        }
    }
}

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, Error>;

/// Extend a dotted path with a child segment
pub(crate) fn child_path(path: &str, segment: &str) -> String {
    format!("{path}.{segment}")
}
