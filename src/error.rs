//! Error types for resource mapping

use declarative::{AttributePath, Diagnostic, DiagnosticKind};
use thiserror::Error;

/// A resource type's schemas cannot be turned into an attribute tree
///
/// Detected once, when the resource model is first built; never per call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("{resource}: attribute {attribute:?} has unsupported type {type_name:?}")]
    UnsupportedType {
        resource: String,
        attribute: String,
        type_name: String,
    },

    #[error("{resource}: attribute {attribute:?} declares no type")]
    MissingType { resource: String, attribute: String },

    #[error("{resource}: array attribute {attribute:?} declares no items")]
    MissingItems { resource: String, attribute: String },

    #[error("{resource}: attribute {attribute:?}: {source}")]
    Schema {
        resource: String,
        attribute: String,
        #[source]
        source: schemakit::Error,
    },

    /// Two attributes claim the same external name with incompatible schemas
    #[error("{resource}: {first:?} and {second:?} both map to {external_name:?} with incompatible schemas")]
    Conflict {
        resource: String,
        external_name: String,
        first: String,
        second: String,
    },

    /// Property setter links of one attribute disagree on their extra parameters
    #[error("{resource}: property setters for {attribute:?} declare different parameter counts {counts:?}")]
    SetterArity {
        resource: String,
        attribute: String,
        counts: Vec<usize>,
    },
}

impl ClassificationError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(
            DiagnosticKind::Classification,
            "unable to build resource schema",
            self.to_string(),
        )
    }
}

/// State and schema disagree while converting values
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("{path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: AttributePath,
        expected: String,
        found: String,
    },

    #[error("{path}: required attribute is missing")]
    MissingRequired { path: AttributePath },

    #[error("{path}: null given for a non-nullable attribute")]
    NullNotAllowed { path: AttributePath },

    #[error("{path}: value is not known yet")]
    UnknownValue { path: AttributePath },

    #[error("{path}: no attribute information for property {property:?}")]
    MissingAttribute {
        path: AttributePath,
        property: String,
    },

    #[error("{path}: {value} cannot be represented as an integer")]
    LostPrecision { path: AttributePath, value: f64 },

    #[error("{path}: {reason}")]
    State { path: AttributePath, reason: String },
}

impl ConversionError {
    pub fn path(&self) -> &AttributePath {
        match self {
            Self::TypeMismatch { path, .. }
            | Self::MissingRequired { path }
            | Self::NullNotAllowed { path }
            | Self::UnknownValue { path }
            | Self::MissingAttribute { path, .. }
            | Self::LostPrecision { path, .. }
            | Self::State { path, .. } => path,
        }
    }

    /// Attribute-scoped error diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diagnostic = Diagnostic::error(
            DiagnosticKind::Conversion,
            "unable to convert attribute value",
            self.to_string(),
        );
        if self.path().is_root() {
            diagnostic
        } else {
            diagnostic.at(self.path().clone())
        }
    }
}

/// A property setter cannot perform the requested change
#[derive(Error, Debug)]
pub enum PropertySetterError {
    #[error("no setter for {attribute:?} accepts the value {target}")]
    MissingTarget { attribute: String, target: String },

    #[error("no setter for {attribute:?} transitions from {from} to {to}")]
    MissingTransition {
        attribute: String,
        from: String,
        to: String,
    },

    #[error("unable to create setter for {attribute:?}: {source:#}")]
    Link {
        attribute: String,
        #[source]
        source: anyhow::Error,
    },
}

impl PropertySetterError {
    pub fn to_diagnostic(&self, path: AttributePath) -> Diagnostic {
        Diagnostic::error(
            DiagnosticKind::PropertySetter,
            "property setter failed",
            self.to_string(),
        )
        .at(path)
    }
}

/// Errors surfaced while registering resources or loading settings
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error("cannot register resource {resource:?}: {reason}")]
    Registration { resource: String, reason: String },

    #[error("invalid settings: {0:#}")]
    Config(anyhow::Error),
}

/// Result type for resource mapping
pub type Result<T> = std::result::Result<T, Error>;
