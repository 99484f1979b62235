//! Core types shared by executors, operations and the runner

use crate::diagnostics::Diagnostics;
use serde::Serialize;
use serde_json::Value;

/// Parameters handed to an executor, keyed by api name
pub type Parameters = serde_json::Map<String, Value>;

/// Configuration values handed to an executor (region, environment, ...)
pub type Configs = serde_json::Map<String, Value>;

/// What produced an [`ExecutionResult`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSource {
    pub executor: String,
    pub parameters: Parameters,
    pub configs: Configs,
}

/// Value returned by an executor together with its inputs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    pub source: ResultSource,
    pub value: Value,
}

impl ExecutionResult {
    pub fn new(source: ResultSource, value: Value) -> Self {
        Self { source, value }
    }

    /// Result with no value, for steps that do not call any executor
    pub fn empty(executor: impl Into<String>) -> Self {
        Self {
            source: ResultSource {
                executor: executor.into(),
                ..ResultSource::default()
            },
            value: Value::Null,
        }
    }

    /// Null, or an empty object/array
    pub fn is_empty(&self) -> bool {
        match &self.value {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            Value::Array(items) => items.is_empty(),
            _ => false,
        }
    }

    pub fn as_object(&self) -> Option<&serde_json::Map<String, Value>> {
        self.value.as_object()
    }
}

/// Outcome of running an operation and its chain
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Operations whose run step executed
    pub completed: usize,
    /// Operations skipped because they had nothing to do
    pub skipped: usize,
    pub diagnostics: Diagnostics,
}

impl RunSummary {
    /// Check if the whole chain ran without errors
    pub fn is_success(&self) -> bool {
        !self.diagnostics.has_error()
    }

    /// Total number of operations visited
    pub fn total(&self) -> usize {
        self.completed + self.skipped
    }
}
